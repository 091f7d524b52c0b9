pub mod config;
pub mod discover;
pub mod errors;
pub mod orchestrator;
pub mod progress;
pub mod report;
pub mod runner;
pub mod sampler;
pub mod stats;
pub mod types;
