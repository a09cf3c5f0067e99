use std::cmp::Ordering;

use super::common::*;
use super::enumerable::{sorted, uniq_values};
use crate::Runtime;
use crate::core::{Value, key_eql};
use crate::errors::RbResult;

pub(super) fn install(rt: &mut Runtime) {
    let c = rt.classes.array.clone();
    def(&c, "initialize", initialize);
    def(&c, "+", plus);
    def(&c, "-", minus);
    def(&c, "*", times);
    def(&c, "&", intersect);
    def(&c, "|", union);
    def(&c, "==", eq);
    def(&c, "eql?", eql);
    def(&c, "<=>", cmp);
    def(&c, "hash", hash);
    def_all(&c, &["<<", "push", "append"], push);
    def(&c, "pop", pop);
    def(&c, "shift", shift);
    def_all(&c, &["unshift", "prepend"], unshift);
    def(&c, "insert", insert);
    def(&c, "concat", concat);
    def_all(&c, &["[]", "slice"], index);
    def(&c, "[]=", index_set);
    def(&c, "at", at);
    def(&c, "dig", dig);
    def(&c, "fetch", fetch);
    def(&c, "values_at", values_at);
    def_all(&c, &["length", "size"], length);
    def(&c, "empty?", empty);
    def(&c, "first", first);
    def(&c, "last", last);
    def(&c, "take", take);
    def(&c, "drop", drop_);
    def(&c, "take_while", take_while);
    def(&c, "drop_while", drop_while);
    def(&c, "each", each);
    def(&c, "each_index", each_index);
    def(&c, "reverse_each", reverse_each);
    def_all(&c, &["index", "find_index"], index_of);
    def(&c, "rindex", rindex);
    def(&c, "join", join);
    def(&c, "reverse", reverse);
    def(&c, "reverse!", reverse_bang);
    def(&c, "rotate", rotate);
    def(&c, "compact", compact);
    def(&c, "compact!", compact_bang);
    def(&c, "flatten", flatten);
    def(&c, "uniq", uniq);
    def(&c, "uniq!", uniq_bang);
    def(&c, "sort!", sort_bang);
    def_all(&c, &["map!", "collect!"], map_bang);
    def_all(&c, &["select!", "keep_if", "filter!"], select_bang);
    def_all(&c, &["reject!", "delete_if"], reject_bang);
    def(&c, "delete", delete);
    def(&c, "delete_at", delete_at);
    def(&c, "clear", clear);
    def(&c, "replace", replace);
    def(&c, "fill", fill);
    def(&c, "include?", include);
    def(&c, "count", count);
    def(&c, "transpose", transpose);
    def(&c, "product", product);
    def(&c, "assoc", assoc);
    def(&c, "to_a", to_a);
    def(&c, "entries", to_a);
    def_all(&c, &["inspect", "to_s"], inspect);
}

fn items(v: &Value) -> Vec<Value> {
    v.as_array().map(|a| a.borrow().clone()).unwrap_or_default()
}

fn len(v: &Value) -> usize {
    v.as_array().map(|a| a.borrow().len()).unwrap_or(0)
}

fn set_items(v: &Value, new: Vec<Value>) {
    if let Some(a) = v.as_array() {
        *a.borrow_mut() = new;
    }
}

/// `Array.new(n)`, `Array.new(n, v)`, `Array.new(n) { |i| }`, `Array.new(ary)`.
fn initialize(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 2)?;
    let Some(first) = args.first() else {
        return Ok(rt.nil());
    };
    if first.as_array().is_some() && args.len() == 1 {
        set_items(recv, items(first));
        return Ok(rt.nil());
    }
    let n = expect_i64(rt, first)?;
    if n < 0 {
        return Err(rt.arg_error("negative array size"));
    }
    let mut out = Vec::with_capacity(repeat_len(rt, 1, n)?);
    for i in 0..n {
        let v = match block {
            Some(blk) => {
                let idx = rt.int(i);
                rt.call_block(blk, &[idx])?
            }
            None => arg(rt, args, 1),
        };
        out.push(v);
    }
    set_items(recv, out);
    Ok(rt.nil())
}

fn array_arg(rt: &Runtime, args: &[Value]) -> RbResult<Vec<Value>> {
    validate_arity(rt, args.len(), 1, 1)?;
    expect_array(rt, &args[0])
}

fn plus(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let rhs = array_arg(rt, args)?;
    let mut out = items(recv);
    out.extend(rhs);
    Ok(rt.array(out))
}

fn contains(list: &[Value], v: &Value) -> bool {
    list.iter().any(|x| key_eql(x, v))
}

fn minus(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let rhs = array_arg(rt, args)?;
    let out = items(recv).into_iter().filter(|v| !contains(&rhs, v)).collect();
    Ok(rt.array(out))
}

/// `ary * n` repeats, `ary * ","` joins.
fn times(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    if args[0].as_str().is_some() {
        return join(rt, recv, args, block);
    }
    let n = expect_i64(rt, &args[0])?;
    if n < 0 {
        return Err(rt.arg_error("negative argument"));
    }
    let base = items(recv);
    let total = repeat_len(rt, base.len(), n)?;
    let out = base.iter().cycle().take(total).cloned().collect();
    Ok(rt.array(out))
}

fn intersect(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let rhs = array_arg(rt, args)?;
    let kept = items(recv).into_iter().filter(|v| contains(&rhs, v)).collect();
    let out = uniq_values(rt, kept, None)?;
    Ok(rt.array(out))
}

fn union(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let mut all = items(recv);
    all.extend(array_arg(rt, args)?);
    let out = uniq_values(rt, all, None)?;
    Ok(rt.array(out))
}

fn eq(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let Some(other) = args[0].as_array().map(|a| a.borrow().clone()) else {
        return Ok(rt.bool(false));
    };
    let mine = items(recv);
    if mine.len() != other.len() {
        return Ok(rt.bool(false));
    }
    for (a, b) in mine.iter().zip(other.iter()) {
        if !rt.equals(a, b)? {
            return Ok(rt.bool(false));
        }
    }
    Ok(rt.bool(true))
}

fn eql(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(rt.bool(key_eql(recv, &args[0])))
}

fn cmp(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let Some(other) = args[0].as_array().map(|a| a.borrow().clone()) else {
        return Ok(rt.nil());
    };
    let mine = items(recv);
    for (a, b) in mine.iter().zip(other.iter()) {
        match rt.compare(a, b)? {
            Ordering::Equal => {}
            o => return Ok(rt.int(o as i64)),
        }
    }
    Ok(rt.int(mine.len().cmp(&other.len()) as i64))
}

fn hash(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.int(rt.hash_code(recv)))
}

fn push(_rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    if let Some(a) = recv.as_array() {
        a.borrow_mut().extend(args.iter().cloned());
    }
    Ok(recv.clone())
}

fn count_arg(rt: &Runtime, args: &[Value]) -> RbResult<Option<usize>> {
    validate_arity(rt, args.len(), 0, 1)?;
    match args.first() {
        Some(n) => {
            let n = expect_i64(rt, n)?;
            if n < 0 {
                return Err(rt.arg_error("negative array size"));
            }
            Ok(Some(n as usize))
        }
        None => Ok(None),
    }
}

fn pop(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let n = count_arg(rt, args)?;
    let Some(a) = recv.as_array() else {
        return Ok(rt.nil());
    };
    let mut a = a.borrow_mut();
    Ok(match n {
        None => a.pop().unwrap_or_else(|| rt.nil()),
        Some(n) => {
            let at = a.len().saturating_sub(n);
            rt.array(a.split_off(at))
        }
    })
}

fn shift(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let n = count_arg(rt, args)?;
    let Some(a) = recv.as_array() else {
        return Ok(rt.nil());
    };
    let mut a = a.borrow_mut();
    Ok(match n {
        None if a.is_empty() => rt.nil(),
        None => a.remove(0),
        Some(n) => {
            let n = n.min(a.len());
            rt.array(a.drain(..n).collect())
        }
    })
}

fn unshift(_rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    if let Some(a) = recv.as_array() {
        a.borrow_mut().splice(0..0, args.iter().cloned());
    }
    Ok(recv.clone())
}

fn insert(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, usize::MAX)?;
    let i = expect_i64(rt, &args[0])?;
    let n = len(recv) as i64;
    let at = if i < 0 { i + n + 1 } else { i };
    if at < 0 {
        return Err(rt.index_error(format!("index {} too small for array; minimum: -{}", i, n + 1)));
    }
    let at = at as usize;
    if let Some(a) = recv.as_array() {
        let mut a = a.borrow_mut();
        if at > a.len() {
            let nil = rt.nil();
            a.resize(at, nil);
        }
        a.splice(at..at, args[1..].iter().cloned());
    }
    Ok(recv.clone())
}

fn concat(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let mut tail = Vec::new();
    for a in args {
        tail.extend(expect_array(rt, a)?);
    }
    if let Some(a) = recv.as_array() {
        a.borrow_mut().extend(tail);
    }
    Ok(recv.clone())
}

/// `a[i]`, `a[start, len]`, `a[range]`.
fn index(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 2)?;
    let list = items(recv);
    let bounds = if let Some(count) = args.get(1) {
        let start = expect_i64(rt, &args[0])?;
        let count = expect_i64(rt, count)?;
        slice_bounds(start, count, list.len())
    } else if args[0].as_range().is_some() {
        range_bounds(rt, &args[0], list.len())?
    } else {
        let i = expect_i64(rt, &args[0])?;
        return Ok(norm_index(i, list.len())
            .map(|i| list[i].clone())
            .unwrap_or_else(|| rt.nil()));
    };
    Ok(match bounds {
        Some((s, e)) => rt.array(list[s..e].to_vec()),
        None => rt.nil(),
    })
}

/// `a[i] = v` grows the array with nils; `a[start, len] = v` and
/// `a[range] = v` splice, spreading an Array value.
fn index_set(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 2, 3)?;
    let value = args[args.len() - 1].clone();
    let n = len(recv);
    let (start, end, splice) = if args.len() == 3 {
        let start = expect_i64(rt, &args[0])?;
        let count = expect_i64(rt, &args[1])?;
        let s = if start < 0 { start + n as i64 } else { start };
        if s < 0 || count < 0 {
            return Err(rt.index_error(format!("index {start} too small for array")));
        }
        (s as usize, (s + count) as usize, true)
    } else if let Some(r) = args[0].as_range() {
        let s = expect_i64(rt, &r.start)?;
        let s = if s < 0 { s + n as i64 } else { s };
        let e = if r.end.is_nil() { n as i64 - 1 } else { expect_i64(rt, &r.end)? };
        let e = if e < 0 { e + n as i64 } else { e };
        let e = if r.exclusive && !r.end.is_nil() { e } else { e + 1 };
        if s < 0 {
            return Err(rt.index_error("range out of array"));
        }
        (s as usize, e.max(s) as usize, true)
    } else {
        let i = expect_i64(rt, &args[0])?;
        let at = if i < 0 { i + n as i64 } else { i };
        if at < 0 {
            return Err(rt.index_error(format!(
                "index {} too small for array; minimum: -{}",
                i, n
            )));
        }
        (at as usize, at as usize + 1, false)
    };
    if let Some(a) = recv.as_array() {
        let mut a = a.borrow_mut();
        if start > a.len() {
            let nil = rt.nil();
            a.resize(start, nil);
        }
        let end = end.min(a.len()).max(start);
        let replacement = match (splice, value.as_array()) {
            (true, Some(v)) => v.borrow().clone(),
            _ => vec![value.clone()],
        };
        if !splice && start == a.len() {
            a.push(value.clone());
        } else {
            a.splice(start..end, replacement);
        }
    }
    Ok(value)
}

fn at(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let i = expect_i64(rt, &args[0])?;
    let list = items(recv);
    Ok(norm_index(i, list.len()).map(|i| list[i].clone()).unwrap_or_else(|| rt.nil()))
}

fn dig(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, usize::MAX)?;
    let mut cur = recv.clone();
    for key in args {
        if cur.is_nil() {
            break;
        }
        cur = rt.send(&cur, "[]", std::slice::from_ref(key), None)?;
    }
    Ok(cur)
}

fn fetch(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 2)?;
    let i = expect_i64(rt, &args[0])?;
    let list = items(recv);
    if let Some(idx) = norm_index(i, list.len()) {
        return Ok(list[idx].clone());
    }
    if let Some(blk) = block {
        return rt.call_block(blk, &args[..1]);
    }
    if let Some(default) = args.get(1) {
        return Ok(default.clone());
    }
    Err(rt.index_error(format!(
        "index {} outside of array bounds: {}...{}",
        i,
        -(list.len() as i64),
        list.len()
    )))
}

fn values_at(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let list = items(recv);
    let mut out = Vec::with_capacity(args.len());
    for a in args {
        let i = expect_i64(rt, a)?;
        out.push(norm_index(i, list.len()).map(|i| list[i].clone()).unwrap_or_else(|| rt.nil()));
    }
    Ok(rt.array(out))
}

fn length(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.int(len(recv) as i64))
}

fn empty(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(len(recv) == 0))
}

fn first(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let list = items(recv);
    Ok(match count_arg(rt, args)? {
        None => list.first().cloned().unwrap_or_else(|| rt.nil()),
        Some(n) => rt.array(list.into_iter().take(n).collect()),
    })
}

fn last(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let list = items(recv);
    Ok(match count_arg(rt, args)? {
        None => list.last().cloned().unwrap_or_else(|| rt.nil()),
        Some(n) => {
            let at = list.len().saturating_sub(n);
            rt.array(list[at..].to_vec())
        }
    })
}

fn take(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let n = count_arg(rt, args)?.unwrap_or(0);
    Ok(rt.array(items(recv).into_iter().take(n).collect()))
}

fn drop_(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let n = count_arg(rt, args)?.unwrap_or(0);
    Ok(rt.array(items(recv).into_iter().skip(n).collect()))
}

/// Index of the first element the block rejects.
fn prefix_len(rt: &mut Runtime, list: &[Value], blk: &Value) -> RbResult<usize> {
    for (i, v) in list.iter().enumerate() {
        if !rt.call_block(blk, std::slice::from_ref(v))?.truthy() {
            return Ok(i);
        }
    }
    Ok(list.len())
}

fn take_while(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    let list = items(recv);
    let n = prefix_len(rt, &list, blk)?;
    Ok(rt.array(list[..n].to_vec()))
}

fn drop_while(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    let list = items(recv);
    let n = prefix_len(rt, &list, blk)?;
    Ok(rt.array(list[n..].to_vec()))
}

/// Re-reads the length every step, so the block may grow or shrink the array.
fn each(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let Some(blk) = block else {
        return Ok(recv.clone());
    };
    let mut i = 0;
    loop {
        let item = recv.as_array().and_then(|a| a.borrow().get(i).cloned());
        let Some(item) = item else { break };
        rt.call_block(blk, &[item])?;
        i += 1;
    }
    Ok(recv.clone())
}

fn each_index(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    for i in 0..len(recv) {
        let idx = rt.int(i as i64);
        rt.call_block(blk, &[idx])?;
    }
    Ok(recv.clone())
}

fn reverse_each(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    for item in items(recv).into_iter().rev() {
        rt.call_block(blk, &[item])?;
    }
    Ok(recv.clone())
}

fn position(
    rt: &mut Runtime,
    list: &[Value],
    args: &[Value],
    block: Option<&Value>,
    order: impl Iterator<Item = usize>,
) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    for i in order {
        let hit = match (args.first(), block) {
            (Some(target), _) => rt.equals(&list[i], target)?,
            (None, Some(blk)) => rt.call_block(blk, &list[i..=i])?.truthy(),
            (None, None) => return Err(rt.arg_error("wrong number of arguments (given 0, expected 1)")),
        };
        if hit {
            return Ok(rt.int(i as i64));
        }
    }
    Ok(rt.nil())
}

fn index_of(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let list = items(recv);
    position(rt, &list, args, block, 0..list.len())
}

fn rindex(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let list = items(recv);
    position(rt, &list, args, block, (0..list.len()).rev())
}

fn join_into(rt: &mut Runtime, list: &[Value], sep: &str, out: &mut String, first: &mut bool) -> RbResult<()> {
    for v in list {
        if let Some(inner) = v.as_array() {
            let inner = inner.borrow().clone();
            join_into(rt, &inner, sep, out, first)?;
            continue;
        }
        if !*first {
            out.push_str(sep);
        }
        *first = false;
        out.push_str(&rt.to_s(v)?);
    }
    Ok(())
}

fn join(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let sep = match args.first() {
        Some(s) if !s.is_nil() => expect_str(rt, s)?,
        _ => String::new(),
    };
    let mut out = String::new();
    join_into(rt, &items(recv), &sep, &mut out, &mut true)?;
    Ok(rt.str(out))
}

fn reverse(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let mut list = items(recv);
    list.reverse();
    Ok(rt.array(list))
}

fn reverse_bang(_rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    if let Some(a) = recv.as_array() {
        a.borrow_mut().reverse();
    }
    Ok(recv.clone())
}

fn rotate(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let n = match args.first() {
        Some(v) => expect_i64(rt, v)?,
        None => 1,
    };
    let mut list = items(recv);
    if !list.is_empty() {
        let k = n.rem_euclid(list.len() as i64) as usize;
        list.rotate_left(k);
    }
    Ok(rt.array(list))
}

fn compact(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let list = items(recv).into_iter().filter(|v| !v.is_nil()).collect();
    Ok(rt.array(list))
}

fn compact_bang(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let before = len(recv);
    if let Some(a) = recv.as_array() {
        a.borrow_mut().retain(|v| !v.is_nil());
    }
    Ok(if len(recv) == before { rt.nil() } else { recv.clone() })
}

fn flatten_into(list: Vec<Value>, depth: Option<i64>, out: &mut Vec<Value>) {
    for v in list {
        match v.as_array() {
            Some(inner) if depth.is_none_or(|d| d > 0) => {
                let inner = inner.borrow().clone();
                flatten_into(inner, depth.map(|d| d - 1), out);
            }
            _ => out.push(v),
        }
    }
}

fn flatten(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let depth = match args.first() {
        Some(d) if !d.is_nil() => Some(expect_i64(rt, d)?),
        _ => None,
    };
    let mut out = Vec::new();
    flatten_into(items(recv), depth, &mut out);
    Ok(rt.array(out))
}

fn uniq(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let out = uniq_values(rt, items(recv), block)?;
    Ok(rt.array(out))
}

fn uniq_bang(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let before = len(recv);
    let out = uniq_values(rt, items(recv), block)?;
    let changed = out.len() != before;
    set_items(recv, out);
    Ok(if changed { recv.clone() } else { rt.nil() })
}

fn sort_bang(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let out = sorted(rt, items(recv), block)?;
    set_items(recv, out);
    Ok(recv.clone())
}

fn map_bang(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    let mut out = Vec::new();
    for v in items(recv) {
        out.push(rt.call_block(blk, &[v])?);
    }
    set_items(recv, out);
    Ok(recv.clone())
}

fn retain_by(rt: &mut Runtime, recv: &Value, block: Option<&Value>, keep: bool) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    let mut out = Vec::new();
    for v in items(recv) {
        if rt.call_block(blk, std::slice::from_ref(&v))?.truthy() == keep {
            out.push(v);
        }
    }
    set_items(recv, out);
    Ok(recv.clone())
}

fn select_bang(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    retain_by(rt, recv, block, true)
}

fn reject_bang(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    retain_by(rt, recv, block, false)
}

/// Removes every element `==` to the argument; returns it, or nil if absent.
fn delete(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let mut kept = Vec::new();
    let mut found = None;
    for v in items(recv) {
        if rt.equals(&v, &args[0])? {
            found = Some(v);
        } else {
            kept.push(v);
        }
    }
    set_items(recv, kept);
    Ok(found.unwrap_or_else(|| rt.nil()))
}

fn delete_at(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let i = expect_i64(rt, &args[0])?;
    let Some(a) = recv.as_array() else {
        return Ok(rt.nil());
    };
    let mut a = a.borrow_mut();
    Ok(match norm_index(i, a.len()) {
        Some(i) => a.remove(i),
        None => rt.nil(),
    })
}

fn clear(_rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    set_items(recv, Vec::new());
    Ok(recv.clone())
}

fn replace(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let new = array_arg(rt, args)?;
    set_items(recv, new);
    Ok(recv.clone())
}

/// `fill(v)` or `fill { |i| }` over the whole array.
fn fill(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    if block.is_none() && args.is_empty() {
        return Err(rt.arg_error("wrong number of arguments (given 0, expected 1..3)"));
    }
    let n = len(recv);
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        out.push(match block {
            Some(blk) => {
                let idx = rt.int(i as i64);
                rt.call_block(blk, &[idx])?
            }
            None => arg(rt, args, 0),
        });
    }
    set_items(recv, out);
    Ok(recv.clone())
}

fn include(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    for v in items(recv) {
        if rt.equals(&v, &args[0])? {
            return Ok(rt.bool(true));
        }
    }
    Ok(rt.bool(false))
}

fn count(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let mut n = 0;
    for v in items(recv) {
        let hit = match (args.first(), block) {
            (Some(target), _) => rt.equals(&v, target)?,
            (None, Some(blk)) => rt.call_block(blk, &[v])?.truthy(),
            (None, None) => true,
        };
        if hit {
            n += 1;
        }
    }
    Ok(rt.int(n))
}

fn transpose(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let mut rows = Vec::new();
    for r in items(recv) {
        rows.push(expect_array(rt, &r)?);
    }
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if rows.iter().any(|r| r.len() != width) {
        return Err(rt.index_error("element size differs"));
    }
    let cols = (0..width)
        .map(|c| rt.array(rows.iter().map(|r| r[c].clone()).collect()))
        .collect();
    Ok(rt.array(cols))
}

fn product(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let mut acc: Vec<Vec<Value>> = items(recv).into_iter().map(|v| vec![v]).collect();
    for a in args {
        let other = expect_array(rt, a)?;
        acc = acc
            .into_iter()
            .flat_map(|prefix| {
                other.iter().map(move |v| {
                    let mut row = prefix.clone();
                    row.push(v.clone());
                    row
                })
            })
            .collect();
    }
    let rows = acc.into_iter().map(|r| rt.array(r)).collect();
    Ok(rt.array(rows))
}

fn assoc(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    for v in items(recv) {
        let key = v.as_array().and_then(|a| a.borrow().first().cloned());
        if let Some(k) = key {
            if rt.equals(&k, &args[0])? {
                return Ok(v);
            }
        }
    }
    Ok(rt.nil())
}

fn to_a(_rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(recv.clone())
}

/// `[1, "a", :b]`
fn inspect(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let mut parts = Vec::new();
    for v in items(recv) {
        if v.ptr_eq(recv) {
            parts.push("[...]".to_string());
            continue;
        }
        parts.push(rt.inspect(&v)?);
    }
    Ok(rt.str(format!("[{}]", parts.join(", "))))
}
