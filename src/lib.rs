pub mod analysis;
pub mod audit;
pub mod cli;
pub mod config;
pub mod errors;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod reporting;
pub mod runner;
pub mod utils;

pub use errors::HawxError;
