//! `Comparable`, written against `<=>`.

use std::cmp::Ordering;

use super::common::*;
use crate::Runtime;
use crate::core::Value;
use crate::errors::RbResult;

pub(super) fn install(rt: &mut Runtime) {
    let c = rt.classes.comparable.clone();
    def(&c, "<", lt);
    def(&c, "<=", le);
    def(&c, ">", gt);
    def(&c, ">=", ge);
    def(&c, "==", eq);
    def(&c, "between?", between);
    def(&c, "clamp", clamp);
}

/// `<=>` through dispatch; a nil result is an ArgumentError.
fn order(rt: &mut Runtime, a: &Value, b: &Value) -> RbResult<Ordering> {
    let r = rt.send(a, "<=>", std::slice::from_ref(b), None)?;
    match r.as_i64() {
        Some(n) => Ok(n.cmp(&0)),
        None => Err(rt.arg_error(format!(
            "comparison of {} with {} failed",
            a.class_name(),
            type_label(b)
        ))),
    }
}

fn test(
    rt: &mut Runtime,
    recv: &Value,
    args: &[Value],
    pred: fn(Ordering) -> bool,
) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let o = order(rt, recv, &args[0])?;
    Ok(rt.bool(pred(o)))
}

fn lt(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    test(rt, recv, args, Ordering::is_lt)
}

fn le(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    test(rt, recv, args, Ordering::is_le)
}

fn gt(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    test(rt, recv, args, Ordering::is_gt)
}

fn ge(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    test(rt, recv, args, Ordering::is_ge)
}

/// Identity first; an incomparable pair is unequal rather than an error.
fn eq(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    if recv.ptr_eq(&args[0]) {
        return Ok(rt.bool(true));
    }
    let r = rt.send(recv, "<=>", &args[..1], None)?;
    Ok(rt.bool(r.as_i64() == Some(0)))
}

fn between(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 2, 2)?;
    let above = order(rt, recv, &args[0])? != Ordering::Less;
    let below = order(rt, recv, &args[1])? != Ordering::Greater;
    Ok(rt.bool(above && below))
}

/// `clamp(min, max)` or `clamp(range)`.
fn clamp(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 2)?;
    let (lo, hi) = match (args, args[0].as_range()) {
        ([_], Some(r)) => (r.start.clone(), r.end.clone()),
        ([lo, hi], _) => (lo.clone(), hi.clone()),
        _ => {
            return Err(rt.type_error(format!(
                "wrong argument type {} (expected Range)",
                type_label(&args[0])
            )));
        }
    };
    if !lo.is_nil() && !hi.is_nil() && order(rt, &lo, &hi)? == Ordering::Greater {
        return Err(rt.arg_error("min argument must be less than or equal to max argument"));
    }
    if !lo.is_nil() && order(rt, recv, &lo)? == Ordering::Less {
        return Ok(lo);
    }
    if !hi.is_nil() && order(rt, recv, &hi)? == Ordering::Greater {
        return Ok(hi);
    }
    Ok(recv.clone())
}
