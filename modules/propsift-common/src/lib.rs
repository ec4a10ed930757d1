pub mod config;
pub mod error;
pub mod types;

pub use config::{LlmConfig, PipelineConfig};
pub use error::PropsiftError;
pub use types::*;
