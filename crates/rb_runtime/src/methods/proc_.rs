use super::common::*;
use crate::Runtime;
use crate::core::Value;
use crate::errors::RbResult;

pub(super) fn install(rt: &mut Runtime) {
    let c = rt.classes.proc_class.clone();
    def_all(&c, &["call", "()", "yield", "[]", "==="], call);
    def(&c, "to_proc", to_proc);
    def(&c, "lambda?", is_lambda);
    def(&c, "arity", arity);
    def_all(&c, &["inspect", "to_s"], inspect);
    def_singleton(&c, "new", new);
}

/// A `next` in the body ends this call with its value; see `call_block`.
fn call(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    rt.call_block_with(recv, args, block)
}

fn to_proc(_rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(recv.clone())
}

fn is_lambda(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(recv.as_proc().is_some_and(|p| p.lambda)))
}

/// Required count, or `-(required + 1)` with optional or rest parameters.
fn arity(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let n = recv.as_proc().map(|p| p.arity()).unwrap_or(-1);
    Ok(rt.int(n))
}

fn inspect(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let lambda = recv.as_proc().is_some_and(|p| p.lambda);
    let suffix = if lambda { " (lambda)" } else { "" };
    Ok(rt.str(format!("#<Proc:{:#x}{}>", recv.object_id(), suffix)))
}

/// `Proc.new { ... }` is the block itself.
fn new(rt: &mut Runtime, _recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    Ok(blk.clone())
}
