//! Vesper Script Engine - Core Library
//!
//! Public API surface: compile scripts to bytecode, load bytecode into a
//! virtual machine and run it cooperatively alongside host callbacks.

pub mod bytecode;
pub mod compiler;
pub mod config;
pub mod env;
pub mod error;
pub mod host;
pub mod loader;
pub mod vm;

// Re-export commonly used types
pub use bytecode::{BytecodeWriter, OpCode, Program};
pub use compiler::{compile, compile_file};
pub use config::{CompileOptions, VmConfig};
pub use env::Environment;
pub use error::{CompileError, Fault, LoadError, RuntimeError, VesperError, VesperResult};
pub use host::{HostContext, HostId};
pub use loader::BytecodeLoader;
pub use vm::{RunStatus, State, Value, VirtualMachine};

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn run(source: &str) -> VirtualMachine {
        let env = Rc::new(Environment::new());
        let program = compile(source, &env).expect("compile failed");
        let mut vm = VirtualMachine::new(env);
        vm.load_program(program).expect("load failed");
        assert_eq!(vm.run().expect("run failed"), RunStatus::Finished);
        vm
    }

    #[test]
    fn locals_survive_the_finished_run() {
        let vm = run("a = 2; b = a * 21;");
        assert_eq!(vm.local(1), Some(&Value::Int(42)));
        assert_eq!(vm.state(), State::Stopped);
    }

    #[test]
    fn bytes_round_trip_through_the_loader() {
        let env = Environment::new();
        let program = compile("x = 1; while(x < 10){ x *= 2; }", &env).unwrap();
        let bytes = BytecodeWriter::write(&program, env.hosts()).unwrap();
        let loaded = BytecodeLoader::load(&bytes, env.hosts(), &VmConfig::new()).unwrap();
        assert_eq!(loaded, program);
    }

    #[test]
    fn running_without_a_program_is_refused() {
        let mut vm = VirtualMachine::new(Rc::new(Environment::new()));
        let err = vm.run().unwrap_err();
        assert_eq!(err.fault, Fault::NotLoaded);
        assert_eq!(vm.state(), State::Stopped);
    }

    #[test]
    fn second_load_is_refused() {
        let env = Rc::new(Environment::new());
        let mut vm = VirtualMachine::new(Rc::clone(&env));
        vm.load_program(compile("x = 1;", &env).unwrap()).unwrap();
        assert!(matches!(
            vm.load_program(compile("x = 2;", &env).unwrap()),
            Err(LoadError::AlreadyLoaded)
        ));
    }
}
