pub mod config;
pub mod engine;
pub mod error;
pub mod report;

pub use error::{EngineError, Result};
