#![forbid(unsafe_code)]

pub mod config;
pub mod driver;
pub mod errors;
pub mod gate;
pub mod inbound;
pub mod models;
pub mod notify;
pub mod orchestrator;
pub mod persistence;
pub mod rendezvous;
pub mod strategy;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
