use super::common::*;
use crate::Runtime;
use crate::core::Value;
use crate::errors::RbResult;

pub(super) fn install(rt: &mut Runtime) {
    let c = rt.classes.exception.clone();
    def_private(&c, "initialize", initialize);
    def(&c, "message", message);
    def(&c, "to_s", to_s);
    def(&c, "inspect", inspect);
    def(&c, "full_message", full_message);
    def(&c, "backtrace", backtrace);
    def(&c, "cause", backtrace);
    def(&c, "exception", exception);
    def(&c, "==", eq);
    def_singleton(&c, "exception", class_exception);

    let stop = rt.classes.stop_iteration.clone();
    def(&stop, "result", result);
}

/// A nil message leaves `@message` unset so `to_s` falls back to the class name.
fn initialize(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    if let Some(msg) = args.first() {
        if !msg.is_nil() {
            let text = rt.to_s(msg)?;
            recv.set_ivar("@message", rt.str(text));
        }
    }
    Ok(rt.nil())
}

fn text(rt: &Runtime, recv: &Value) -> String {
    rt.exception_message(recv)
}

/// `message` goes through `to_s`, so subclasses overriding `to_s` change it.
fn message(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    rt.send(recv, "to_s", &[], None)
}

fn to_s(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(text(rt, recv)))
}

/// `#<RuntimeError: boom>`, or the bare class name for an empty message.
fn inspect(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let msg = rt.to_s(recv)?;
    let class = recv.class_name();
    Ok(rt.str(if msg.is_empty() {
        class
    } else {
        format!("#<{class}: {msg}>")
    }))
}

/// `boom (RuntimeError)`
fn full_message(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let msg = rt.to_s(recv)?;
    Ok(rt.str(format!("{} ({})", msg, recv.class_name())))
}

fn backtrace(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.nil())
}

/// `exc.exception` is `exc`; `exc.exception(msg)` a copy carrying `msg`.
fn exception(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    match args.first() {
        None => Ok(recv.clone()),
        Some(msg) => {
            let copy = rt.send(recv, "dup", &[], None)?;
            let text = rt.to_s(msg)?;
            copy.set_ivar("@message", rt.str(text));
            Ok(copy)
        }
    }
}

fn eq(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let other = &args[0];
    if recv.ptr_eq(other) {
        return Ok(rt.bool(true));
    }
    let same = recv.class().ptr_eq(&other.class()) && text(rt, recv) == text(rt, other);
    Ok(rt.bool(same))
}

fn class_exception(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    rt.send(recv, "new", args, None)
}

/// Value carried out of a finished iteration, surfaced by `loop`.
fn result(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(recv.ivar("@result").unwrap_or_else(|| rt.nil()))
}
