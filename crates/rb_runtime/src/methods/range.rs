//! `Range`: endpoints plus an exclusive flag, iterated lazily.

use std::cmp::Ordering;

use super::common::*;
use super::string::str_succ;
use crate::Runtime;
use crate::core::{RangeData, Value};
use crate::errors::RbResult;

pub(super) fn install(rt: &mut Runtime) {
    let c = rt.classes.range.clone();
    def_all(&c, &["first", "begin"], first);
    def_all(&c, &["last", "end"], last);
    def(&c, "min", first_value);
    def(&c, "max", max);
    def(&c, "exclude_end?", exclude_end);
    def(&c, "each", each);
    def_all(&c, &["to_a", "entries"], to_a);
    def_all(&c, &["size", "count"], size);
    def_all(&c, &["include?", "member?", "cover?", "==="], include);
    def(&c, "step", step);
    def(&c, "sum", sum);
    def(&c, "==", eq);
    def(&c, "hash", hash);
    def(&c, "to_s", to_s);
    def(&c, "inspect", inspect);
}

fn data<'a>(rt: &Runtime, v: &'a Value) -> RbResult<&'a RangeData> {
    v.as_range()
        .ok_or_else(|| rt.type_error(format!("{} is not a Range", type_label(v))))
}

/// Integer bounds as `[lo, hi]` inclusive; `hi` is `None` for an endless range.
fn int_bounds(rt: &Runtime, r: &RangeData) -> RbResult<Option<(i64, Option<i64>)>> {
    let Some(lo) = r.start.as_i64() else {
        return Ok(None);
    };
    if r.end.is_nil() {
        return Ok(Some((lo, None)));
    }
    let hi = match (r.end.as_i64(), r.end.as_f64()) {
        (Some(hi), _) => hi,
        (None, Some(f)) => f.floor() as i64,
        (None, None) => {
            return Err(rt.type_error(format!(
                "can't iterate from {}",
                r.start.class_name()
            )));
        }
    };
    let hi = if r.exclusive && r.end.as_i64().is_some() { hi - 1 } else { hi };
    Ok(Some((lo, Some(hi))))
}

/// Visits each element in order until `f` returns `false`.
fn walk(
    rt: &mut Runtime,
    r: &RangeData,
    f: &mut dyn FnMut(&mut Runtime, Value) -> RbResult<bool>,
) -> RbResult<()> {
    if let Some((lo, hi)) = int_bounds(rt, r)? {
        let mut i = lo;
        while hi.is_none_or(|hi| i <= hi) {
            let v = rt.int(i);
            if !f(rt, v)? {
                break;
            }
            match i.checked_add(1) {
                Some(n) => i = n,
                None => break,
            }
        }
        return Ok(());
    }
    let start = r.start.as_str().map(|s| s.clone());
    let end = r.end.as_str().map(|s| s.clone());
    if let (Some(mut cur), Some(end)) = (start, end) {
        let width = end.chars().count();
        loop {
            if cur.chars().count() > width {
                break;
            }
            let last = cur == end;
            if last && r.exclusive {
                break;
            }
            let v = rt.str(cur.clone());
            if !f(rt, v)? || last {
                break;
            }
            cur = str_succ(&cur);
        }
        return Ok(());
    }
    Err(rt.type_error(format!("can't iterate from {}", r.start.class_name())))
}

fn elements(rt: &mut Runtime, r: &RangeData) -> RbResult<Vec<Value>> {
    if r.end.is_nil() {
        return Err(rt.runtime_error("cannot convert endless range to an array"));
    }
    let mut out = Vec::new();
    walk(rt, r, &mut |_, v| {
        out.push(v);
        Ok(true)
    })?;
    Ok(out)
}

fn first(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let r = data(rt, recv)?;
    let Some(n) = args.first() else {
        return Ok(r.start.clone());
    };
    let n = expect_i64(rt, n)?;
    if n < 0 {
        return Err(rt.arg_error("negative array size (or size too big)"));
    }
    let mut out = Vec::new();
    if n > 0 {
        walk(rt, r, &mut |_, v| {
            out.push(v);
            Ok((out.len() as i64) < n)
        })?;
    }
    Ok(rt.array(out))
}

fn first_value(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let r = data(rt, recv)?;
    if let Some((lo, Some(hi))) = int_bounds(rt, r)? {
        return Ok(if hi < lo { rt.nil() } else { rt.int(lo) });
    }
    if rt.compare(&r.start, &r.end)? == Ordering::Greater {
        return Ok(rt.nil());
    }
    Ok(r.start.clone())
}

fn last(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let r = data(rt, recv)?;
    let Some(n) = args.first() else {
        return Ok(r.end.clone());
    };
    let n = expect_i64(rt, n)?.max(0) as usize;
    let all = elements(rt, r)?;
    let at = all.len().saturating_sub(n);
    Ok(rt.array(all[at..].to_vec()))
}

fn max(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let r = data(rt, recv)?;
    if let Some((lo, Some(hi))) = int_bounds(rt, r)? {
        return Ok(if hi < lo { rt.nil() } else { rt.int(hi) });
    }
    if rt.compare(&r.start, &r.end)? == Ordering::Greater {
        return Ok(rt.nil());
    }
    Ok(r.end.clone())
}

fn exclude_end(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let r = data(rt, recv)?;
    Ok(rt.bool(r.exclusive))
}

fn each(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let r = data(rt, recv)?;
    let Some(blk) = block else {
        let items = elements(rt, r)?;
        return Ok(rt.array(items));
    };
    walk(rt, r, &mut |rt, v| {
        rt.call_block(blk, &[v])?;
        Ok(true)
    })?;
    Ok(recv.clone())
}

fn to_a(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let r = data(rt, recv)?;
    let items = elements(rt, r)?;
    Ok(rt.array(items))
}

/// Element count for Integer ranges, nil otherwise.
fn size(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let r = data(rt, recv)?;
    if r.start.as_i64().is_none() {
        return Ok(rt.nil());
    }
    Ok(match int_bounds(rt, r)? {
        Some((lo, Some(hi))) => rt.int(hi.saturating_sub(lo).saturating_add(1).max(0)),
        Some((_, None)) => rt.float(f64::INFINITY),
        None => rt.nil(),
    })
}

/// `start <= v` and `v <= end` (`v < end` when exclusive). Incomparable
/// values are simply outside.
fn include(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let r = data(rt, recv)?;
    let v = &args[0];
    let inside = (|| -> RbResult<bool> {
        if !r.start.is_nil() && rt.compare(&r.start, v)? == Ordering::Greater {
            return Ok(false);
        }
        if r.end.is_nil() {
            return Ok(true);
        }
        Ok(match rt.compare(v, &r.end)? {
            Ordering::Less => true,
            Ordering::Equal => !r.exclusive,
            Ordering::Greater => false,
        })
    })();
    match inside {
        Ok(b) => Ok(rt.bool(b)),
        Err(crate::Unwind::Raise(e)) if crate::core::dispatch::is_a(&e, &rt.classes.argument_error) => {
            Ok(rt.bool(false))
        }
        Err(e) => Err(e),
    }
}

/// `(1..10).step(3) { |i| }`; Float steps walk Float values.
fn step(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let r = data(rt, recv)?;
    let by = &args[0];
    if let (Some(lo), Some(n)) = (r.start.as_i64(), by.as_i64()) {
        if n <= 0 {
            return Err(rt.arg_error("step can't be negative or zero"));
        }
        let hi = int_bounds(rt, r)?.and_then(|(_, hi)| hi);
        let mut out = Vec::new();
        let mut i = lo;
        while hi.is_none_or(|hi| i <= hi) {
            let v = rt.int(i);
            match block {
                Some(blk) => {
                    rt.call_block(blk, &[v])?;
                }
                None => out.push(v),
            }
            match i.checked_add(n) {
                Some(next) => i = next,
                None => break,
            }
        }
        return Ok(if block.is_some() { recv.clone() } else { rt.array(out) });
    }
    let (Some(lo), Some(hi), Some(n)) = (rt.number(&r.start), rt.number(&r.end), rt.number(by)) else {
        return Err(rt.type_error(format!("can't iterate from {}", r.start.class_name())));
    };
    if n <= 0.0 {
        return Err(rt.arg_error("step can't be negative or zero"));
    }
    let count = ((hi - lo) / n + 1e-9).floor() as i64;
    let mut out = Vec::new();
    for k in 0..=count.max(-1) {
        let x = lo + k as f64 * n;
        if r.exclusive && x >= hi {
            break;
        }
        let v = rt.float(x);
        match block {
            Some(blk) => {
                rt.call_block(blk, &[v])?;
            }
            None => out.push(v),
        }
    }
    Ok(if block.is_some() { recv.clone() } else { rt.array(out) })
}

/// Integer ranges sum in closed form.
fn sum(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let r = data(rt, recv)?;
    if block.is_none() && args.is_empty() {
        if let Some((lo, Some(hi))) = int_bounds(rt, r)? {
            if hi < lo {
                return Ok(rt.int(0));
            }
            let n = num_bigint::BigInt::from(hi) - lo + 1;
            let total = (num_bigint::BigInt::from(lo) + hi) * n / 2;
            return Ok(rt.integer(total));
        }
    }
    let items = elements(rt, r)?;
    let list = rt.array(items);
    rt.send(&list, "sum", args, block)
}

fn eq(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let a = data(rt, recv)?;
    let Some(b) = args[0].as_range() else {
        return Ok(rt.bool(false));
    };
    let same = a.exclusive == b.exclusive
        && rt.equals(&a.start, &b.start)?
        && rt.equals(&a.end, &b.end)?;
    Ok(rt.bool(same))
}

fn hash(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let r = data(rt, recv)?;
    let h = rt.hash_code(&r.start) ^ rt.hash_code(&r.end).rotate_left(7) ^ r.exclusive as i64;
    Ok(rt.int(h))
}

fn render(rt: &mut Runtime, recv: &Value, inspect: bool) -> RbResult<Value> {
    let r = data(rt, recv)?;
    let show = |rt: &mut Runtime, v: &Value| -> RbResult<String> {
        if v.is_nil() {
            return Ok(if inspect { "nil".to_string() } else { String::new() });
        }
        if inspect { rt.inspect(v) } else { rt.to_s(v) }
    };
    let start = if r.start.is_nil() && inspect { String::new() } else { show(rt, &r.start)? };
    let end = if r.end.is_nil() && inspect { String::new() } else { show(rt, &r.end)? };
    let dots = if r.exclusive { "..." } else { ".." };
    Ok(rt.str(format!("{start}{dots}{end}")))
}

fn to_s(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    render(rt, recv, false)
}

fn inspect(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    render(rt, recv, true)
}
