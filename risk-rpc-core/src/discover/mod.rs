mod discover;
mod memory;
#[cfg(feature = "nacos")]
pub mod nacos;
mod registry;

pub use discover::{LoadBalanceStrategy, LoadBalancer};
pub use memory::InMemoryRegistry;
pub use registry::{RegistryClient, RegistryError, ServiceInstance};

#[cfg(feature = "nacos")]
pub use nacos::NacosRegistry;
