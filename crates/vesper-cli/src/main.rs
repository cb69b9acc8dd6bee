//! Vesper Script Engine - CLI
//!
//! Command-line front end: compile scripts to bytecode, run bytecode, or do
//! both in one step.

mod logger;

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};

use vesper_core::{
    compile, compile_file, BytecodeLoader, CompileOptions, Environment, RunStatus, VirtualMachine,
    VmConfig,
};

/// Frames to run before giving up on a script that keeps pausing
const DEFAULT_FRAMES: usize = 1_000_000;

#[derive(Debug)]
enum Command {
    Compile { src: PathBuf, out: PathBuf, print: bool },
    Run { bytecode: PathBuf },
    Exec { src: PathBuf, print: bool },
    Dump { bytecode: PathBuf },
}

#[derive(Debug)]
struct Args {
    command: Command,
    globals: usize,
    frames: usize,
    verbose: usize,
}

fn main() {
    let argv: Vec<String> = env::args().collect();
    let program = argv.first().map(String::as_str).unwrap_or("vesper");

    let args = match parse_args(&argv[1.min(argv.len())..]) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(program);
            process::exit(2);
        }
    };

    logger::init(args.verbose);

    if let Err(e) = execute(args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn parse_args(argv: &[String]) -> Result<Args> {
    let mut positional = Vec::new();
    let mut print = false;
    let mut globals = 0;
    let mut frames = DEFAULT_FRAMES;
    let mut verbose = 0;

    let mut iter = argv.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--print" | "-p" => print = true,
            "--globals" | "-g" => globals = number(iter.next(), "--globals")?,
            "--frames" | "-f" => frames = number(iter.next(), "--frames")?,
            "--verbose" => verbose += 1,
            flag if flag.starts_with("-v") && flag[1..].chars().all(|c| c == 'v') => {
                verbose += flag.len() - 1;
            }
            flag if flag.starts_with('-') => bail!("unknown option '{}'", flag),
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    let mut positional = positional.into_iter();
    let name = positional
        .next()
        .ok_or_else(|| anyhow!("missing command"))?;
    let mut path = |what: &str| {
        positional
            .next()
            .ok_or_else(|| anyhow!("missing {} path", what))
    };

    let command = match name.to_str() {
        Some("compile") => Command::Compile {
            src: path("source")?,
            out: path("output")?,
            print,
        },
        Some("run") => Command::Run {
            bytecode: path("bytecode")?,
        },
        Some("exec") => Command::Exec {
            src: path("source")?,
            print,
        },
        Some("dump") => Command::Dump {
            bytecode: path("bytecode")?,
        },
        _ => bail!("unknown command '{}'", name.display()),
    };
    if let Some(extra) = positional.next() {
        bail!("unexpected argument '{}'", extra.display());
    }

    Ok(Args {
        command,
        globals,
        frames,
        verbose,
    })
}

fn number(value: Option<&String>, flag: &str) -> Result<usize> {
    let value = value.ok_or_else(|| anyhow!("{} needs a value", flag))?;
    value
        .parse()
        .with_context(|| format!("{} expects a number, got '{}'", flag, value))
}

fn execute(args: Args) -> Result<()> {
    let env = Rc::new(Environment::with_globals(args.globals));

    match args.command {
        Command::Compile { src, out, print } => {
            compile_file(&src, &out, &env, CompileOptions { trace: print })?;
        }
        Command::Run { bytecode } => {
            let mut vm = VirtualMachine::new(Rc::clone(&env));
            vm.load(&bytecode)
                .with_context(|| format!("failed to load {}", bytecode.display()))?;
            drive(&mut vm, args.frames)?;
        }
        Command::Exec { src, print } => {
            let source = fs::read_to_string(&src)
                .with_context(|| format!("failed to read {}", src.display()))?;
            let program = compile(&source, &env)?;
            if print {
                print!("{}", program.trace(env.hosts()));
            }
            let mut vm = VirtualMachine::new(Rc::clone(&env));
            vm.load_program(program)?;
            drive(&mut vm, args.frames)?;
        }
        Command::Dump { bytecode } => {
            let program = BytecodeLoader::load_file(&bytecode, env.hosts(), &VmConfig::new())
                .with_context(|| format!("failed to load {}", bytecode.display()))?;
            print!("{}", program.trace(env.hosts()));
        }
    }
    Ok(())
}

/// Call `run()` once per frame until the script finishes.
fn drive(vm: &mut VirtualMachine, frames: usize) -> Result<()> {
    for frame in 1..=frames {
        match vm.run()? {
            RunStatus::Finished => {
                log::info!("script finished after {} frame(s)", frame);
                return Ok(());
            }
            RunStatus::Paused => log::debug!("frame {} paused", frame),
        }
    }
    bail!("script still running after {} frames", frames)
}

fn print_usage(program: &str) {
    eprintln!("Vesper Script Engine");
    eprintln!("Usage:");
    eprintln!("  {} compile <source> <output> [--print] [--globals N]", program);
    eprintln!("  {} run <bytecode> [--globals N] [--frames N]", program);
    eprintln!("  {} exec <source> [--print] [--globals N] [--frames N]", program);
    eprintln!("  {} dump <bytecode>", program);
    eprintln!("Options:");
    eprintln!("  -v, --verbose   more log output (repeatable); VESPER_LOG=<level> also works");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Result<Args> {
        let argv: Vec<String> = line.split_whitespace().map(String::from).collect();
        parse_args(&argv)
    }

    #[test]
    fn parses_commands_and_options() {
        let parsed = args("compile a.vsp a.vbc --print -g 4 -vv").unwrap();
        assert!(matches!(parsed.command, Command::Compile { print: true, .. }));
        assert_eq!(parsed.globals, 4);
        assert_eq!(parsed.verbose, 2);

        let parsed = args("run a.vbc --frames 10").unwrap();
        assert!(matches!(parsed.command, Command::Run { .. }));
        assert_eq!(parsed.frames, 10);
    }

    #[test]
    fn rejects_bad_invocations() {
        assert!(args("").is_err());
        assert!(args("launch a.vsp").is_err());
        assert!(args("compile a.vsp").is_err());
        assert!(args("run a.vbc extra").is_err());
        assert!(args("run a.vbc --globals many").is_err());
        assert!(args("run a.vbc --bogus").is_err());
    }
}
