pub mod config;
pub mod envelope;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use envelope::ApiEnvelope;
pub use error::{ConfigError, ConfigResult};
pub use types::*;
