//! Bytecode files: write, load back, run.

mod common;

use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use common::Output;
use vesper_core::{
    compile, compile_file, BytecodeLoader, BytecodeWriter, CompileError, CompileOptions,
    Environment, LoadError, RunStatus, VirtualMachine, VmConfig,
};

const SCRIPT: &str = "
    // sum of squares, with a helper
    def square(n){
        return(n * n);
    }

    /* loop /* nested */ comment */
    i = 1;
    total = 0;
    while(i <= 4){
        total += square(i);
        i++;
    }
    if(total == 30){
        print(\"total \" + total);
    } else {
        print(\"wrong\");
    }
    ratio = total / 4.0;
    print(ratio);
";

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("vesper-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[test]
fn compiled_file_runs_after_loading() {
    let src = scratch("squares.vsp");
    let out = scratch("squares.vbc");
    fs::write(&src, SCRIPT).unwrap();

    let env = Rc::new(Environment::new());
    let program = compile_file(&src, &out, &env, CompileOptions::default()).unwrap();

    let output = Output::default();
    let mut vm = VirtualMachine::new(env);
    vm.set_output(output.clone());
    vm.load(&out).unwrap();
    assert_eq!(vm.program(), Some(&program));
    assert_eq!(vm.run().unwrap(), RunStatus::Finished);
    assert_eq!(output.text(), "total 30\n7.5\n");
}

#[test]
fn reserialized_bytes_are_identical() {
    let env = Environment::new();
    let program = compile(SCRIPT, &env).unwrap();
    let first = BytecodeWriter::write(&program, env.hosts()).unwrap();
    let loaded = BytecodeLoader::load(&first, env.hosts(), &VmConfig::new()).unwrap();
    let second = BytecodeWriter::write(&loaded, env.hosts()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn every_truncation_is_rejected() {
    let env = Environment::new();
    let program = compile("def f(a){ return(a); } x = f(\"s\"); print(x);", &env).unwrap();
    let bytes = BytecodeWriter::write(&program, env.hosts()).unwrap();
    for len in 0..bytes.len() {
        let res = BytecodeLoader::load(&bytes[..len], env.hosts(), &VmConfig::new());
        assert!(res.is_err(), "prefix of {} bytes was accepted", len);
    }
}

#[test]
fn trace_lists_every_function() {
    let env = Environment::new();
    let program = compile("def inc(n){ return(n + 1); } x = inc(1 + 2);", &env).unwrap();
    let trace = program.trace(env.hosts()).to_string();
    let expected = "\
# main
# variable count: 1
# register count: 1
0 -> + [1] 1 2 r0
1 -> inc [1] r0 v0

# function: inc
# variable count: 1
# register count: 1
0 -> + [1] v0 1 r0
1 -> return [0] r0

";
    assert_eq!(trace, expected);
}

#[test]
fn compile_errors_write_nothing() {
    let src = scratch("broken.vsp");
    let out = scratch("broken.vbc");
    fs::write(&src, "x = (1 + 2;").unwrap();
    let _ = fs::remove_file(&out);

    let env = Environment::new();
    let res = compile_file(&src, &out, &env, CompileOptions::default());
    assert!(matches!(res, Err(CompileError::UnmatchedBracket { line: 1 })));
    assert!(!out.exists());
}

#[test]
fn missing_bytecode_file_is_an_io_error() {
    let mut vm = VirtualMachine::new(Rc::new(Environment::new()));
    assert!(matches!(
        vm.load(scratch("does-not-exist.vbc")),
        Err(LoadError::Io(_))
    ));
}
