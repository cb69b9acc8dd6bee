//! Runtime Environment
//!
//! Everything the compiler and the VMs share: the host function registry and
//! the global variable store. The host builds one, registers its callbacks,
//! sizes the globals and then hands out `Rc` clones.

use crate::host::{HostContext, HostId, HostRegistry};
use crate::error::{Fault, RegistryError};
use crate::vm::memory::Globals;
use crate::vm::Value;

/// Shared runtime configuration
#[derive(Debug, Default)]
pub struct Environment {
    hosts: HostRegistry,
    globals: Globals,
}

impl Environment {
    /// Environment with the built-in keywords and no globals
    pub fn new() -> Self {
        Environment {
            hosts: HostRegistry::new(),
            globals: Globals::new(0),
        }
    }

    /// Environment with `globals` uninitialized global slots
    pub fn with_globals(globals: usize) -> Self {
        let env = Self::new();
        env.init_globals(globals);
        env
    }

    /// Register a host function; see [`HostRegistry::register`].
    pub fn register<F>(&mut self, name: &str, callback: F, arity: usize) -> Result<HostId, RegistryError>
    where
        F: Fn(&mut HostContext<'_>) -> Result<(), Fault> + 'static,
    {
        self.hosts.register(name, callback, arity)
    }

    pub fn hosts(&self) -> &HostRegistry {
        &self.hosts
    }

    /// Size the global store; previous contents are dropped.
    pub fn init_globals(&self, count: usize) {
        self.globals.reset(count);
    }

    pub fn clear_globals(&self) {
        self.globals.clear();
    }

    pub fn global_count(&self) -> usize {
        self.globals.len()
    }

    pub fn global(&self, index: usize) -> Option<Value> {
        self.globals.load(index).ok()
    }

    pub fn set_global(&self, index: usize, value: impl Into<Value>) -> Result<(), Fault> {
        self.globals.store(index, value.into())
    }

    pub(crate) fn globals(&self) -> &Globals {
        &self.globals
    }
}
