//! VM Memory Model
//!
//! Index-based storage used during execution: per-frame slot vectors for
//! locals and registers, and the shared global store.

use std::cell::RefCell;

use super::value::Value;
use crate::error::Fault;

/// Shared global variable storage. Sized by the host; single-threaded,
/// so interior mutability is enough for sharing between VMs.
#[derive(Debug, Default)]
pub struct Globals {
    values: RefCell<Vec<Value>>,
}

impl Globals {
    pub fn new(size: usize) -> Self {
        Globals {
            values: RefCell::new(vec![Value::Uninit; size]),
        }
    }

    /// Resize to `size` slots, all uninitialized.
    pub fn reset(&self, size: usize) {
        *self.values.borrow_mut() = vec![Value::Uninit; size];
    }

    pub fn clear(&self) {
        self.values.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn load(&self, index: usize) -> Result<Value, Fault> {
        self.values
            .borrow()
            .get(index)
            .cloned()
            .ok_or(Fault::InvalidGlobal(index))
    }

    pub fn store(&self, index: usize, value: Value) -> Result<(), Fault> {
        let mut values = self.values.borrow_mut();
        let slot = values.get_mut(index).ok_or(Fault::InvalidGlobal(index))?;
        *slot = value;
        Ok(())
    }
}

/// Fixed-size slot vector owned by one frame (locals or registers)
#[derive(Debug, Default)]
pub struct Slots {
    values: Vec<Value>,
}

impl Slots {
    pub fn new(size: usize) -> Self {
        Slots {
            values: vec![Value::Uninit; size],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stored value, which may still be uninitialized
    pub fn get(&self, index: usize) -> Result<&Value, Fault> {
        self.values.get(index).ok_or(Fault::InvalidOperand)
    }

    pub fn store(&mut self, index: usize, value: Value) -> Result<(), Fault> {
        let slot = self.values.get_mut(index).ok_or(Fault::InvalidOperand)?;
        *slot = value;
        Ok(())
    }
}
