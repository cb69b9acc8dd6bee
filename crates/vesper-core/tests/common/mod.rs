//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use vesper_core::{compile, Environment, RunStatus, RuntimeError, VirtualMachine};

/// `print` sink that can be inspected after the VM took ownership of it
#[derive(Clone, Default)]
pub struct Output(Rc<RefCell<Vec<u8>>>);

impl Output {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A VM with a compiled script loaded and its output captured
pub struct Script {
    pub vm: VirtualMachine,
    pub out: Output,
}

impl Script {
    pub fn run(&mut self) -> Result<RunStatus, RuntimeError> {
        self.vm.run()
    }
}

pub fn load_in(source: &str, env: Rc<Environment>) -> Script {
    let program = compile(source, &env).expect("compile failed");
    let out = Output::default();
    let mut vm = VirtualMachine::new(env);
    vm.set_output(out.clone());
    vm.load_program(program).expect("load failed");
    Script { vm, out }
}

pub fn load(source: &str) -> Script {
    load_in(source, Rc::new(Environment::new()))
}

/// Run a script to completion and return what it printed
pub fn run(source: &str) -> String {
    let mut script = load(source);
    assert_eq!(script.run().expect("script failed"), RunStatus::Finished);
    script.out.text()
}

/// Run a script that is expected to fault
pub fn run_err(source: &str) -> RuntimeError {
    let mut script = load(source);
    script.run().expect_err("script should have failed")
}
