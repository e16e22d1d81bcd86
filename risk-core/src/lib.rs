pub mod config;
pub mod error;

pub use config::{ConsumerConfig, ProviderConfig, RegistryConfig};
pub use error::{Result, RiskErr};
