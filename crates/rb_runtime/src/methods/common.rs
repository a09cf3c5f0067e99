use std::rc::Rc;

use num_bigint::BigInt;

use crate::Runtime;
use crate::core::{ClosureFn, MethodDef, NativeFn, Value, Visibility};
use crate::errors::{RbResult, messages};

/// Public instance method on a class or module.
pub fn def(class: &Value, name: &str, f: NativeFn) {
    def_with(class, name, f, Visibility::Public);
}

pub fn def_private(class: &Value, name: &str, f: NativeFn) {
    def_with(class, name, f, Visibility::Private);
}

fn def_with(class: &Value, name: &str, f: NativeFn, vis: Visibility) {
    if let Some(data) = class.as_class() {
        data.instance_methods_mut()
            .insert(name, MethodDef::native(name, f), vis);
    }
}

/// Same native under several names.
pub fn def_all(class: &Value, names: &[&str], f: NativeFn) {
    for name in names {
        def(class, name, f);
    }
}

/// Method on the object itself (a class method when `obj` is a class).
pub fn def_singleton(obj: &Value, name: &str, f: NativeFn) {
    obj.own_methods_mut()
        .insert(name, MethodDef::native(name, f), Visibility::Public);
}

pub fn closure(name: &str, f: Rc<ClosureFn>) -> Rc<MethodDef> {
    MethodDef::closure(name, f)
}

/// Checks the argument count against `min..=max`.
pub fn validate_arity(rt: &Runtime, len: usize, min: usize, max: usize) -> RbResult<()> {
    if len < min || len > max {
        let expected = if min == max {
            min.to_string()
        } else if max == usize::MAX {
            format!("{min}+")
        } else {
            format!("{min}..{max}")
        };
        return Err(rt.arg_error(format!(
            "wrong number of arguments (given {len}, expected {expected})"
        )));
    }
    Ok(())
}

/// Largest Array or String a repeat or sized constructor may build.
pub const MAX_BUILT_LEN: usize = 1 << 30;

/// Length of `n` copies of a `unit`-long run.
pub fn repeat_len(rt: &Runtime, unit: usize, n: i64) -> RbResult<usize> {
    usize::try_from(n)
        .ok()
        .and_then(|n| unit.checked_mul(n))
        .filter(|len| *len <= MAX_BUILT_LEN)
        .ok_or_else(|| rt.arg_error(messages::ARGUMENT_TOO_BIG))
}

pub fn arg(rt: &Runtime, args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_else(|| rt.nil())
}

pub fn expect_block<'a>(rt: &Runtime, block: Option<&'a Value>) -> RbResult<&'a Value> {
    block.ok_or_else(|| rt.local_jump(messages::NO_BLOCK_GIVEN))
}

pub fn expect_int(rt: &Runtime, v: &Value) -> RbResult<BigInt> {
    match v.as_int() {
        Some(i) => Ok(i.clone()),
        None => Err(rt.type_error(format!(
            "no implicit conversion of {} into Integer",
            type_label(v)
        ))),
    }
}

pub fn expect_i64(rt: &Runtime, v: &Value) -> RbResult<i64> {
    if let Some(i) = v.as_i64() {
        return Ok(i);
    }
    if let Some(f) = v.as_f64() {
        return Ok(f as i64);
    }
    if v.as_int().is_some() {
        return Err(rt.error(&rt.classes.argument_error, "integer out of range"));
    }
    Err(rt.type_error(format!(
        "no implicit conversion of {} into Integer",
        type_label(v)
    )))
}

pub fn expect_str(rt: &Runtime, v: &Value) -> RbResult<String> {
    match v.as_str() {
        Some(s) => Ok(s.clone()),
        None => Err(rt.type_error(format!(
            "no implicit conversion of {} into String",
            type_label(v)
        ))),
    }
}

pub fn expect_array(rt: &Runtime, v: &Value) -> RbResult<Vec<Value>> {
    match v.as_array() {
        Some(a) => Ok(a.borrow().clone()),
        None => Err(rt.type_error(format!(
            "no implicit conversion of {} into Array",
            type_label(v)
        ))),
    }
}

/// `nil`, `true`, `false` by name; the class name otherwise.
pub fn type_label(v: &Value) -> String {
    match v.data() {
        crate::core::Data::Nil => "nil".to_string(),
        crate::core::Data::True => "true".to_string(),
        crate::core::Data::False => "false".to_string(),
        _ => v.class_name(),
    }
}

/// Resolves a possibly negative index against `len`.
pub fn norm_index(i: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let idx = if i < 0 { i + len } else { i };
    (0..len).contains(&idx).then_some(idx as usize)
}

/// Half-open bounds for `start, count`, clamped to `len`. `None` when the
/// start lies outside `0..=len`.
pub fn slice_bounds(start: i64, count: i64, len: usize) -> Option<(usize, usize)> {
    let ilen = len as i64;
    let s = if start < 0 { start + ilen } else { start };
    if s < 0 || s > ilen || count < 0 {
        return None;
    }
    let e = (s + count).min(ilen);
    Some((s as usize, e as usize))
}

/// Half-open index bounds a Range argument selects out of `len` elements.
pub fn range_bounds(rt: &Runtime, range: &Value, len: usize) -> RbResult<Option<(usize, usize)>> {
    let Some(r) = range.as_range() else {
        return Ok(None);
    };
    let ilen = len as i64;
    let start = if r.start.is_nil() { 0 } else { expect_i64(rt, &r.start)? };
    let mut end = if r.end.is_nil() { ilen - 1 } else { expect_i64(rt, &r.end)? };
    let start = if start < 0 { start + ilen } else { start };
    if end < 0 {
        end += ilen;
    }
    if r.exclusive && !r.end.is_nil() {
        end -= 1;
    }
    if start < 0 || start > ilen {
        return Ok(None);
    }
    let count = (end - start + 1).max(0);
    Ok(slice_bounds(start, count, len))
}
