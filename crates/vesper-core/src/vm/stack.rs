//! Call Frames and Call Stack
//!
//! A frame owns the locals and registers of one function invocation plus
//! its control-flow bookkeeping. Calling a function moves the caller's frame
//! onto the call stack; returning moves it back.

use super::memory::Slots;
use crate::bytecode::Operand;
use crate::error::Fault;

/// Pending loop back-edge: when a block end brings the scope back to
/// `scope`, execution jumps to `restart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockExit {
    pub scope: usize,
    pub restart: usize,
}

/// State of one active function invocation
#[derive(Debug, Default)]
pub struct Frame {
    /// Index of the executing function
    pub function: usize,

    /// Index of the next instruction
    pub pc: usize,

    /// Block nesting depth
    pub scope: usize,

    /// Set when the last conditional branch was skipped, so a following
    /// `elif`/`else` may run
    pub can_else: bool,

    pub block_exits: Vec<BlockExit>,
    pub locals: Slots,
    pub registers: Slots,
}

impl Frame {
    pub fn new(function: usize, locals: usize, registers: usize) -> Self {
        Frame {
            function,
            pc: 0,
            scope: 0,
            can_else: false,
            block_exits: Vec::new(),
            locals: Slots::new(locals),
            registers: Slots::new(registers),
        }
    }
}

/// Caller frame parked for the duration of a call
#[derive(Debug)]
pub struct SavedFrame {
    pub frame: Frame,

    /// Caller-side destination of the return value, if the call site wants one
    pub return_to: Option<Operand>,
}

/// Stack of suspended caller frames
#[derive(Debug)]
pub struct CallStack {
    frames: Vec<SavedFrame>,
    max_depth: usize,
}

impl CallStack {
    /// Create new call stack with maximum depth
    pub fn new(max_depth: usize) -> Self {
        CallStack {
            frames: Vec::new(),
            max_depth,
        }
    }

    pub fn push(&mut self, saved: SavedFrame) -> Result<(), Fault> {
        if self.is_full() {
            return Err(Fault::CallDepthExceeded(self.max_depth));
        }
        self.frames.push(saved);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<SavedFrame> {
        self.frames.pop()
    }

    /// Whether another push would exceed the depth limit
    pub fn is_full(&self) -> bool {
        self.frames.len() >= self.max_depth
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_limit_is_enforced() {
        let mut stack = CallStack::new(1);
        let saved = || SavedFrame {
            frame: Frame::new(0, 0, 0),
            return_to: None,
        };
        assert!(stack.push(saved()).is_ok());
        assert_eq!(stack.push(saved()), Err(Fault::CallDepthExceeded(1)));
        assert_eq!(stack.depth(), 1);
        assert!(stack.pop().is_some());
        assert!(stack.is_empty());
    }
}
