use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Limits the review and winner-selection workflows validate against.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowConfig {
    pub max_winners: usize,
    pub announcement_min_len: usize,
    pub announcement_max_len: usize,
    pub min_feedback_len: usize,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("database.url", "sqlite://crucible.db?mode=rwc")?
            .set_default("database.max_connections", 10)?
            .set_default("workflow.max_winners", 10)?
            .set_default("workflow.announcement_min_len", 50)?
            .set_default("workflow.announcement_max_len", 1000)?
            .set_default("workflow.min_feedback_len", 20)?
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (with CRUCIBLE__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("CRUCIBLE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://crucible.db?mode=rwc".to_string(),
                max_connections: 10,
            },
            workflow: WorkflowConfig::default(),
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_winners: 10,
            announcement_min_len: 50,
            announcement_max_len: 1000,
            min_feedback_len: 20,
        }
    }
}
