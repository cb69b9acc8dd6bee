//! Built-in Keywords
//!
//! Control-flow and diagnostic keywords are ordinary host functions with
//! privileged access to the VM. All of them are statements: a call site that
//! asks for their result faults.

use std::rc::Rc;

use crate::error::Fault;
use crate::host::{HostContext, HostRegistry};

/// Register every keyword with its fixed argument count.
pub(crate) fn install(registry: &mut HostRegistry) {
    registry.insert("if", Rc::new(if_), 1);
    registry.insert("else", Rc::new(else_), 0);
    registry.insert("elif", Rc::new(elif), 1);
    registry.insert("return", Rc::new(return_), 1);
    registry.insert("while", Rc::new(while_), 1);
    registry.insert("print", Rc::new(print), 1);
    registry.insert("debug", Rc::new(debug), 1);
    registry.insert("break", Rc::new(break_), 0);
}

fn condition(ctx: &HostContext<'_>) -> Result<bool, Fault> {
    ctx.arg(0)?.truthy().ok_or(Fault::Uninitialized)
}

fn if_(ctx: &mut HostContext<'_>) -> Result<(), Fault> {
    ctx.reject_result()?;
    if condition(ctx)? {
        ctx.vm().enter_block(false)
    } else {
        ctx.vm().skip_block(true)
    }
}

fn elif(ctx: &mut HostContext<'_>) -> Result<(), Fault> {
    ctx.reject_result()?;
    if !ctx.vm().can_else() {
        return ctx.vm().skip_block(false);
    }
    if_(ctx)
}

fn else_(ctx: &mut HostContext<'_>) -> Result<(), Fault> {
    ctx.reject_result()?;
    if ctx.vm().can_else() {
        ctx.vm().enter_block(false)
    } else {
        ctx.vm().skip_block(false)
    }
}

fn while_(ctx: &mut HostContext<'_>) -> Result<(), Fault> {
    ctx.reject_result()?;
    if condition(ctx)? {
        ctx.vm().enter_block(true)
    } else {
        ctx.vm().skip_block(false)
    }
}

fn return_(ctx: &mut HostContext<'_>) -> Result<(), Fault> {
    ctx.reject_result()?;
    let value = ctx.arg(0)?;
    ctx.vm().ret(Some(value))
}

fn print(ctx: &mut HostContext<'_>) -> Result<(), Fault> {
    ctx.reject_result()?;
    let value = ctx.arg(0)?;
    ctx.vm().print(&value)
}

fn debug(ctx: &mut HostContext<'_>) -> Result<(), Fault> {
    ctx.reject_result()?;
    let Some(operand) = ctx.operands().first().cloned() else {
        return Err(Fault::ArityMismatch { expected: 1, found: 0 });
    };
    let description = ctx.vm().describe(&operand);
    log::debug!("{}", description);
    Ok(())
}

fn break_(ctx: &mut HostContext<'_>) -> Result<(), Fault> {
    ctx.reject_result()?;
    ctx.pause();
    Ok(())
}
