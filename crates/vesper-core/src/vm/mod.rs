pub(crate) mod builtins;
pub mod loops;
pub mod memory;
pub mod ops;
pub mod stack;
pub mod value;
pub mod vm;

pub use value::Value;
pub use vm::{RunStatus, State, VirtualMachine};
