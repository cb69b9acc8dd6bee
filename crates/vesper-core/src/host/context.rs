//! Host Call Context
//!
//! What a native callback sees when the script calls it: the operand list of
//! the calling instruction and access to the VM it runs in. Callbacks are
//! responsible for validating and dereferencing their own operands; these
//! helpers cover the common cases.

use crate::bytecode::{Line, Operand};
use crate::env::Environment;
use crate::error::Fault;
use crate::vm::{Value, VirtualMachine};

/// Context passed to every host callback
pub struct HostContext<'a> {
    vm: &'a mut VirtualMachine,
    line: &'a Line,
    name: &'a str,
}

impl<'a> HostContext<'a> {
    pub(crate) fn new(vm: &'a mut VirtualMachine, line: &'a Line, name: &'a str) -> Self {
        HostContext { vm, line, name }
    }

    /// Name the callback was registered under
    pub fn name(&self) -> &str {
        self.name
    }

    /// Number of arguments at the call site
    pub fn argc(&self) -> usize {
        self.line.argc()
    }

    /// Raw argument operands, destination excluded
    pub fn operands(&self) -> &[Operand] {
        self.line.inputs()
    }

    /// Dereferenced argument
    pub fn arg(&self, index: usize) -> Result<Value, Fault> {
        let operand = self.operands().get(index).ok_or(Fault::ArityMismatch {
            expected: index + 1,
            found: self.argc(),
        })?;
        self.vm.read(operand)
    }

    /// Integer argument; floats are truncated toward zero.
    pub fn arg_int(&self, index: usize) -> Result<i32, Fault> {
        match self.arg(index)? {
            Value::Int(i) => Ok(i),
            Value::Float(x) => Ok(x as i32),
            other => Err(self.raise(format!(
                "{}: argument {} must be a number, got {}",
                self.name,
                index,
                other.type_name()
            ))),
        }
    }

    pub fn arg_float(&self, index: usize) -> Result<f32, Fault> {
        match self.arg(index)? {
            Value::Int(i) => Ok(i as f32),
            Value::Float(x) => Ok(x),
            other => Err(self.raise(format!(
                "{}: argument {} must be a number, got {}",
                self.name,
                index,
                other.type_name()
            ))),
        }
    }

    pub fn arg_str(&self, index: usize) -> Result<String, Fault> {
        match self.arg(index)? {
            Value::Str(s) => Ok(s),
            other => Err(self.raise(format!(
                "{}: argument {} must be a string, got {}",
                self.name,
                index,
                other.type_name()
            ))),
        }
    }

    /// Whether the call site stores the result somewhere
    pub fn has_result(&self) -> bool {
        self.line.has_result
    }

    /// Store the call's result. Does nothing when no result was requested.
    pub fn set_result(&mut self, value: impl Into<Value>) -> Result<(), Fault> {
        match self.line.destination() {
            Some(dest) => self.vm.write(dest, value.into()),
            None => Ok(()),
        }
    }

    /// Fail if the call site expects a value from a statement-like function.
    pub fn reject_result(&self) -> Result<(), Fault> {
        if self.has_result() {
            Err(Fault::NoResult(self.name.to_string()))
        } else {
            Ok(())
        }
    }

    /// Suspend the script after this call returns.
    pub fn pause(&mut self) {
        self.vm.pause();
    }

    /// Build the fault a callback returns to stop the script.
    pub fn raise(&self, message: impl Into<String>) -> Fault {
        Fault::Host(message.into())
    }

    /// Shared environment (globals and registry)
    pub fn env(&self) -> &Environment {
        self.vm.env()
    }

    pub(crate) fn vm(&mut self) -> &mut VirtualMachine {
        self.vm
    }
}
