//! Virtual Machine Core
//!
//! Executes a loaded program one instruction at a time. Execution is
//! cooperative: `run()` returns when the script pauses (`break` or a host
//! callback), finishes, or faults. A paused VM resumes at the instruction
//! after the one that paused it.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::mem;
use std::path::Path;
use std::rc::Rc;

use super::loops::loop_restart_point;
use super::ops;
use super::stack::{BlockExit, CallStack, Frame, SavedFrame};
use super::value::Value;
use crate::bytecode::{Line, Op, OpCode, Operand, Program};
use crate::config::VmConfig;
use crate::env::Environment;
use crate::error::{Fault, LoadError, LoadResult, RuntimeError};
use crate::host::{HostContext, HostId};
use crate::loader::BytecodeLoader;

/// Execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Stopped,
    Error,
    Paused,
    Running,
}

/// Why a successful `run()` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Suspended; the next `run()` resumes in place
    Paused,

    /// The entry point returned; the next `run()` starts over
    Finished,
}

/// Vesper Virtual Machine
pub struct VirtualMachine {
    env: Rc<Environment>,
    config: VmConfig,
    program: Option<Rc<Program>>,
    state: State,

    frame: Frame,
    call_stack: CallStack,

    /// Memoized loop restart points, keyed by (function, instruction)
    restart_points: HashMap<(usize, usize), usize>,

    output: Box<dyn Write>,
    last_error: Option<RuntimeError>,
}

impl VirtualMachine {
    /// Create a VM with default limits
    pub fn new(env: Rc<Environment>) -> Self {
        Self::with_config(env, VmConfig::default())
    }

    pub fn with_config(env: Rc<Environment>, config: VmConfig) -> Self {
        VirtualMachine {
            env,
            call_stack: CallStack::new(config.max_call_depth),
            config,
            program: None,
            state: State::Stopped,
            frame: Frame::default(),
            restart_points: HashMap::new(),
            output: Box::new(io::stdout()),
            last_error: None,
        }
    }

    /// Load a bytecode file
    pub fn load(&mut self, path: impl AsRef<Path>) -> LoadResult<()> {
        if self.program.is_some() {
            return Err(LoadError::AlreadyLoaded);
        }
        let bytes = fs::read(path)?;
        self.load_bytes(&bytes)
    }

    /// Load bytecode from memory
    pub fn load_bytes(&mut self, bytes: &[u8]) -> LoadResult<()> {
        if self.program.is_some() {
            return Err(LoadError::AlreadyLoaded);
        }
        let program = BytecodeLoader::load(bytes, self.env.hosts(), &self.config)?;
        self.install(program);
        Ok(())
    }

    /// Load an already compiled program. It is validated like bytecode.
    pub fn load_program(&mut self, program: Program) -> LoadResult<()> {
        if self.program.is_some() {
            return Err(LoadError::AlreadyLoaded);
        }
        BytecodeLoader::validate(&program, self.env.hosts(), &self.config)?;
        self.install(program);
        Ok(())
    }

    fn install(&mut self, program: Program) {
        self.program = Some(Rc::new(program));
        self.restart_points.clear();
        self.state = State::Stopped;
    }

    /// Redirect `print` output
    pub fn set_output(&mut self, output: impl Write + 'static) {
        self.output = Box::new(output);
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Error that moved the VM into the Error state, if any
    pub fn last_error(&self) -> Option<&RuntimeError> {
        self.last_error.as_ref()
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn program(&self) -> Option<&Program> {
        self.program.as_deref()
    }

    /// Number of suspended caller frames
    pub fn call_depth(&self) -> usize {
        self.call_stack.depth()
    }

    /// Local variable of the current frame. After the script finishes this is
    /// the entry point's frame.
    pub fn local(&self, index: usize) -> Option<&Value> {
        self.frame.locals.get(index).ok()
    }

    /// Temporary register of the current frame
    pub fn register(&self, index: usize) -> Option<&Value> {
        self.frame.registers.get(index).ok()
    }

    /// Run until the script pauses, finishes or faults.
    ///
    /// Starts from the entry point when Stopped and resumes when Paused.
    /// Any other state, or a VM without a program, is refused without
    /// changing state.
    pub fn run(&mut self) -> Result<RunStatus, RuntimeError> {
        let Some(program) = self.program.clone() else {
            return Err(self.locate(Fault::NotLoaded));
        };

        match self.state {
            State::Stopped => {
                if let Err(fault) = self.start(&program) {
                    return Err(self.fail(fault));
                }
            }
            State::Paused => {}
            other => return Err(self.locate(Fault::NotRunnable(other))),
        }

        self.state = State::Running;
        loop {
            if let Err(fault) = self.step(&program) {
                return Err(self.fail(fault));
            }
            match self.state {
                State::Paused => return Ok(RunStatus::Paused),
                State::Stopped => return Ok(RunStatus::Finished),
                _ => {}
            }
        }
    }

    /// Return to Stopped so the next `run()` starts over.
    pub fn reset(&mut self) {
        if self.state != State::Running {
            self.state = State::Stopped;
            self.call_stack.clear();
        }
    }

    /// Suspend after the current instruction
    pub fn pause(&mut self) {
        if self.state == State::Running {
            self.state = State::Paused;
        }
    }

    fn start(&mut self, program: &Program) -> Result<(), Fault> {
        let entry = program.function(program.entry).ok_or(Fault::NotLoaded)?;
        self.frame = Frame::new(program.entry, entry.varn as usize, entry.regn as usize);
        self.call_stack.clear();
        Ok(())
    }

    fn locate(&self, fault: Fault) -> RuntimeError {
        RuntimeError {
            fault,
            function: self.frame.function,
            pc: self.frame.pc.saturating_sub(1),
            scope: self.frame.scope,
        }
    }

    fn fail(&mut self, fault: Fault) -> RuntimeError {
        let error = self.locate(fault);
        self.state = State::Error;
        log::error!(
            "script error in function {} at pc {} (scope {}): {}",
            error.function,
            error.pc,
            error.scope,
            error.fault
        );
        self.last_error = Some(error.clone());
        error
    }

    /// Execute a single instruction (dispatch only)
    fn step(&mut self, program: &Program) -> Result<(), Fault> {
        let function = program
            .function(self.frame.function)
            .ok_or(Fault::InvalidOperand)?;

        let at = self.frame.pc;
        let Some(line) = function.lines.get(at) else {
            // Falling off the end is a value-less return
            return self.ret(None);
        };
        self.frame.pc += 1;

        log::trace!("fn {} pc {} scope {}: {:?}", self.frame.function, at, self.frame.scope, line.op);

        match &line.op {
            Op::Host(id) => self.call_host(*id, line),
            Op::Call(index) => self.call(program, *index as usize, line),
            Op::Code(code) => self.apply(*code, line),
            Op::BlockStart => Err(Fault::UnexpectedBlockStart),
            Op::BlockEnd => self.end_block(),
        }
    }

    fn call_host(&mut self, id: HostId, line: &Line) -> Result<(), Fault> {
        let env = Rc::clone(&self.env);
        let host = env.hosts().get(id).ok_or(Fault::InvalidOperand)?;
        let mut ctx = HostContext::new(self, line, host.name());
        (host.callback())(&mut ctx)
    }

    fn call(&mut self, program: &Program, index: usize, line: &Line) -> Result<(), Fault> {
        let callee = program.function(index).ok_or(Fault::InvalidOperand)?;
        if line.argc() != callee.argn as usize {
            return Err(Fault::ArityMismatch {
                expected: callee.argn as usize,
                found: line.argc(),
            });
        }

        let mut frame = Frame::new(index, callee.varn as usize, callee.regn as usize);
        for (slot, operand) in line.inputs().iter().enumerate() {
            frame.locals.store(slot, self.read(operand)?)?;
        }

        let return_to = match line.destination() {
            Some(dest) if dest.is_addressable() => Some(dest.clone()),
            Some(_) => return Err(Fault::NotAssignable),
            None => None,
        };

        if self.call_stack.is_full() {
            return Err(Fault::CallDepthExceeded(self.config.max_call_depth));
        }
        let caller = mem::replace(&mut self.frame, frame);
        self.call_stack.push(SavedFrame {
            frame: caller,
            return_to,
        })
    }

    /// Unwind one call frame, delivering `value` to the caller if it asked.
    pub(crate) fn ret(&mut self, value: Option<Value>) -> Result<(), Fault> {
        match self.call_stack.pop() {
            Some(saved) => {
                self.frame = saved.frame;
                match (saved.return_to, value) {
                    (Some(dest), Some(value)) => self.write(&dest, value),
                    (Some(_), None) => Err(Fault::MissingReturnValue),
                    (None, _) => Ok(()),
                }
            }
            None => {
                let entry = self.program.as_ref().map(|p| p.entry);
                if entry == Some(self.frame.function) {
                    self.state = State::Stopped;
                    Ok(())
                } else {
                    Err(Fault::ReturnOutsideCall)
                }
            }
        }
    }

    fn apply(&mut self, code: OpCode, line: &Line) -> Result<(), Fault> {
        let inputs = line.inputs();
        let first = inputs.first().ok_or(Fault::InvalidOperand)?;

        match code {
            OpCode::Assign => {
                let source = inputs.get(1).ok_or(Fault::InvalidOperand)?;
                let value = self.read(source)?;
                self.write(first, value.clone())?;
                self.store_result(line, value)
            }
            OpCode::Inc | OpCode::Dec => {
                let value = ops::step(code, &self.read(first)?)?;
                match line.destination() {
                    Some(dest) => self.write(dest, value),
                    None => self.write(first, value),
                }
            }
            _ if !line.has_result && !code.is_compound_assign() => Ok(()),
            OpCode::Not => {
                let value = ops::not(&self.read(first)?)?;
                self.store_result(line, value)
            }
            OpCode::Sub if inputs.len() == 1 => {
                let value = ops::negate(&self.read(first)?)?;
                self.store_result(line, value)
            }
            _ => {
                let rhs = inputs.get(1).ok_or(Fault::InvalidOperand)?;
                let value = ops::binary(code, &self.read(first)?, &self.read(rhs)?)?;
                if code.is_compound_assign() {
                    self.write(first, value.clone())?;
                }
                self.store_result(line, value)
            }
        }
    }

    fn store_result(&mut self, line: &Line, value: Value) -> Result<(), Fault> {
        match line.destination() {
            Some(dest) => self.write(dest, value),
            None => Ok(()),
        }
    }

    /// Dereference an operand. Reading an uninitialized slot faults.
    pub(crate) fn read(&self, operand: &Operand) -> Result<Value, Fault> {
        let value = self.peek(operand)?;
        if value.is_uninit() {
            return Err(Fault::Uninitialized);
        }
        Ok(value)
    }

    fn peek(&self, operand: &Operand) -> Result<Value, Fault> {
        match operand {
            Operand::Int(i) => Ok(Value::Int(*i)),
            Operand::Float(x) => Ok(Value::Float(*x)),
            Operand::Str(s) => Ok(Value::Str(s.clone())),
            Operand::Register(r) => self.frame.registers.get(*r as usize).cloned(),
            Operand::Local(v) => self.frame.locals.get(*v as usize).cloned(),
            Operand::Global(g) => self.env.globals().load(*g as usize),
        }
    }

    pub(crate) fn write(&mut self, operand: &Operand, value: Value) -> Result<(), Fault> {
        match operand {
            Operand::Register(r) => self.frame.registers.store(*r as usize, value),
            Operand::Local(v) => self.frame.locals.store(*v as usize, value),
            Operand::Global(g) => self.env.globals().store(*g as usize, value),
            _ => Err(Fault::NotAssignable),
        }
    }

    /// Human-readable operand and its current content
    pub(crate) fn describe(&self, operand: &Operand) -> String {
        let content = match self.peek(operand) {
            Ok(value) if !value.is_uninit() => value.to_string(),
            Ok(_) => "uninitialized".to_string(),
            Err(fault) => format!("<{}>", fault),
        };
        match operand {
            Operand::Register(r) => format!("register [{}] -> {}", r, content),
            Operand::Local(v) => format!("variable [{}] -> {}", v, content),
            Operand::Global(g) => format!("variable [G{}] -> {}", g, content),
            _ => format!("value -> {}", content),
        }
    }

    pub(crate) fn print(&mut self, value: &Value) -> Result<(), Fault> {
        writeln!(self.output, "{}", value).map_err(|e| Fault::Host(e.to_string()))
    }

    pub(crate) fn can_else(&self) -> bool {
        self.frame.can_else
    }

    /// Lines of the executing function and the index of the current instruction
    fn current(&self) -> Result<(Rc<Program>, usize), Fault> {
        let program = self.program.clone().ok_or(Fault::NotLoaded)?;
        let at = self.frame.pc.checked_sub(1).ok_or(Fault::MissingBlock)?;
        Ok((program, at))
    }

    /// Enter the block following the current instruction.
    pub(crate) fn enter_block(&mut self, looping: bool) -> Result<(), Fault> {
        let (program, at) = self.current()?;
        let function = self.frame.function;
        let lines = &program.function(function).ok_or(Fault::InvalidOperand)?.lines;
        if !matches!(lines.get(at + 1).map(|l| &l.op), Some(Op::BlockStart)) {
            return Err(Fault::MissingBlock);
        }

        self.frame.can_else = false;
        if looping {
            let restart = *self
                .restart_points
                .entry((function, at))
                .or_insert_with(|| {
                    let restart = loop_restart_point(lines, at);
                    log::debug!("loop at fn {} pc {} restarts at {}", function, at, restart);
                    restart
                });
            self.frame.block_exits.push(BlockExit {
                scope: self.frame.scope,
                restart,
            });
        }

        self.frame.pc = at + 2;
        self.frame.scope += 1;
        Ok(())
    }

    /// Jump past the block following the current instruction.
    pub(crate) fn skip_block(&mut self, can_else: bool) -> Result<(), Fault> {
        let (program, at) = self.current()?;
        let lines = &program
            .function(self.frame.function)
            .ok_or(Fault::InvalidOperand)?
            .lines;
        if !matches!(lines.get(at + 1).map(|l| &l.op), Some(Op::BlockStart)) {
            return Err(Fault::MissingBlock);
        }

        let mut depth = 0usize;
        for (index, line) in lines.iter().enumerate().skip(at + 1) {
            match line.op {
                Op::BlockStart => depth += 1,
                Op::BlockEnd => {
                    depth -= 1;
                    if depth == 0 {
                        self.frame.pc = index + 1;
                        self.frame.can_else = can_else;
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(Fault::MalformedBlock)
    }

    fn end_block(&mut self) -> Result<(), Fault> {
        if self.frame.scope == 0 {
            return Err(Fault::UnexpectedBlockEnd);
        }
        self.frame.scope -= 1;
        self.frame.can_else = false;

        if let Some(exit) = self.frame.block_exits.last().copied() {
            if exit.scope == self.frame.scope {
                self.frame.pc = exit.restart;
                self.frame.block_exits.pop();
            }
        }
        Ok(())
    }
}
