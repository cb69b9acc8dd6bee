pub mod context;
pub mod id;
pub mod registry;

pub use context::HostContext;
pub use id::HostId;
pub use registry::{HostCallback, HostFunction, HostRegistry};
