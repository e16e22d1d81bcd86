mod invoker;
mod poller;

pub use invoker::{GrpcTransport, InvocationClient, InvokeError, Transport};
pub use poller::{DiscoveryPoller, Invocation, PollerConfig};
