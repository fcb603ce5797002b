pub mod audit;
pub mod authz;
pub mod config;
pub mod domain;
pub mod eligibility;
pub mod error;
pub mod notify;
pub mod repository;
pub mod scoring;
pub mod service;
pub mod stats;
