#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "server")]
pub mod app;

pub mod discover;
pub mod risk;
pub mod shutdown;

#[cfg(feature = "client")]
pub use client::*;

#[cfg(feature = "server")]
pub use app::*;

pub use discover::{InMemoryRegistry, RegistryClient, RegistryError, ServiceInstance};
#[cfg(feature = "nacos")]
pub use discover::NacosRegistry;
pub use shutdown::cancel_on_signal;
