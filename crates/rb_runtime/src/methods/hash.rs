use super::common::*;
use crate::Runtime;
use crate::core::{HashData, Value};
use crate::errors::RbResult;

pub(super) fn install(rt: &mut Runtime) {
    let c = rt.classes.hash.clone();
    def(&c, "initialize", initialize);
    def(&c, "[]", get);
    def_all(&c, &["[]=", "store"], set);
    def(&c, "default", default);
    def(&c, "default=", set_default);
    def(&c, "fetch", fetch);
    def(&c, "dig", dig);
    def_all(&c, &["key?", "has_key?", "include?", "member?"], has_key);
    def_all(&c, &["value?", "has_value?"], has_value);
    def(&c, "key", key_for);
    def(&c, "keys", keys);
    def(&c, "values", values);
    def(&c, "values_at", values_at);
    def_all(&c, &["length", "size"], length);
    def(&c, "empty?", empty);
    def_all(&c, &["each", "each_pair"], each);
    def(&c, "each_key", each_key);
    def(&c, "each_value", each_value);
    def(&c, "delete", delete);
    def_all(&c, &["delete_if", "reject!"], delete_if);
    def_all(&c, &["keep_if", "select!"], keep_if);
    def(&c, "merge", merge);
    def_all(&c, &["merge!", "update"], merge_bang);
    def(&c, "transform_values", transform_values);
    def(&c, "transform_keys", transform_keys);
    def(&c, "invert", invert);
    def(&c, "clear", clear);
    def(&c, "to_a", to_a);
    def(&c, "to_h", to_h);
    def(&c, "==", eq);
    def(&c, "hash", hash);
    def_all(&c, &["inspect", "to_s"], inspect);
}

fn pairs(v: &Value) -> Vec<(Value, Value)> {
    v.as_hash().map(|h| h.borrow().pairs()).unwrap_or_default()
}

fn lookup(v: &Value, key: &Value) -> Option<Value> {
    v.as_hash().and_then(|h| h.borrow().get(key))
}

fn pair(rt: &Runtime, k: Value, v: Value) -> Value {
    rt.array(vec![k, v])
}

/// `Hash.new`, `Hash.new(default)`, `Hash.new { |hash, key| ... }`.
fn initialize(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    if let Some(h) = recv.as_hash() {
        let mut h = h.borrow_mut();
        h.default = args.first().cloned();
        h.default_proc = block.cloned();
    }
    Ok(rt.nil())
}

/// Missing keys fall back to the default proc, then the default value.
fn get(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    if let Some(v) = lookup(recv, &args[0]) {
        return Ok(v);
    }
    let (default, default_proc) = match recv.as_hash() {
        Some(h) => {
            let h = h.borrow();
            (h.default.clone(), h.default_proc.clone())
        }
        None => (None, None),
    };
    if let Some(p) = default_proc {
        return rt.call_block(&p, &[recv.clone(), args[0].clone()]);
    }
    Ok(default.unwrap_or_else(|| rt.nil()))
}

/// String keys are copied so later mutation of the original leaves the key alone.
fn set(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 2, 2)?;
    let key = match args[0].as_str() {
        Some(s) => rt.str(s.clone()),
        None => args[0].clone(),
    };
    if let Some(h) = recv.as_hash() {
        h.borrow_mut().insert(key, args[1].clone());
    }
    Ok(args[1].clone())
}

fn default(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let d = recv.as_hash().and_then(|h| h.borrow().default.clone());
    Ok(d.unwrap_or_else(|| rt.nil()))
}

fn set_default(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    if let Some(h) = recv.as_hash() {
        h.borrow_mut().default = Some(args[0].clone());
    }
    Ok(args[0].clone())
}

fn fetch(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 2)?;
    if let Some(v) = lookup(recv, &args[0]) {
        return Ok(v);
    }
    if let Some(blk) = block {
        return rt.call_block(blk, &args[..1]);
    }
    if let Some(d) = args.get(1) {
        return Ok(d.clone());
    }
    let shown = rt.inspect(&args[0])?;
    Err(rt.key_error(format!("key not found: {shown}")))
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

fn has_key(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let found = recv.as_hash().is_some_and(|h| h.borrow().position(&args[0]).is_some());
    Ok(rt.bool(found))
}

fn has_value(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    for (_, v) in pairs(recv) {
        if rt.equals(&v, &args[0])? {
            return Ok(rt.bool(true));
        }
    }
    Ok(rt.bool(false))
}

fn key_for(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    for (k, v) in pairs(recv) {
        if rt.equals(&v, &args[0])? {
            return Ok(k);
        }
    }
    Ok(rt.nil())
}

fn keys(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let ks = recv.as_hash().map(|h| h.borrow().keys.clone()).unwrap_or_default();
    Ok(rt.array(ks))
}

fn values(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let vs = recv.as_hash().map(|h| h.borrow().values.clone()).unwrap_or_default();
    Ok(rt.array(vs))
}

fn values_at(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let mut out = Vec::with_capacity(args.len());
    for k in args {
        out.push(get(rt, recv, std::slice::from_ref(k), None)?);
    }
    Ok(rt.array(out))
}

fn length(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let n = recv.as_hash().map(|h| h.borrow().len()).unwrap_or(0);
    Ok(rt.int(n as i64))
}

fn empty(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let e = recv.as_hash().is_none_or(|h| h.borrow().is_empty());
    Ok(rt.bool(e))
}

/// Yields one `[key, value]` Array per entry; `|k, v|` blocks spread it.
fn each(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    for (k, v) in pairs(recv) {
        let kv = pair(rt, k, v);
        rt.call_block(blk, &[kv])?;
    }
    Ok(recv.clone())
}

fn each_key(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    for (k, _) in pairs(recv) {
        rt.call_block(blk, &[k])?;
    }
    Ok(recv.clone())
}

fn each_value(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    for (_, v) in pairs(recv) {
        rt.call_block(blk, &[v])?;
    }
    Ok(recv.clone())
}

fn delete(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let removed = recv.as_hash().and_then(|h| h.borrow_mut().remove(&args[0]));
    match (removed, block) {
        (Some(v), _) => Ok(v),
        (None, Some(blk)) => rt.call_block(blk, &args[..1]),
        (None, None) => Ok(rt.nil()),
    }
}

fn retain(rt: &mut Runtime, recv: &Value, block: Option<&Value>, keep: bool) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    let mut kept = HashData::new(None);
    for (k, v) in pairs(recv) {
        let kv = pair(rt, k.clone(), v.clone());
        if rt.call_block(blk, &[kv])?.truthy() == keep {
            kept.insert(k, v);
        }
    }
    if let Some(h) = recv.as_hash() {
        let mut h = h.borrow_mut();
        h.keys = kept.keys;
        h.values = kept.values;
    }
    Ok(recv.clone())
}

fn delete_if(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    retain(rt, recv, block, false)
}

fn keep_if(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    retain(rt, recv, block, true)
}

/// Entries of `other` into `into`; a block resolves keys present in both.
fn merge_into(rt: &mut Runtime, into: &mut HashData, other: &Value, block: Option<&Value>) -> RbResult<()> {
    if other.as_hash().is_none() {
        return Err(rt.type_error(format!(
            "no implicit conversion of {} into Hash",
            type_label(other)
        )));
    }
    for (k, v) in pairs(other) {
        let v = match (into.get(&k), block) {
            (Some(old), Some(blk)) => rt.call_block(blk, &[k.clone(), old, v])?,
            _ => v,
        };
        into.insert(k, v);
    }
    Ok(())
}

fn copy_of(recv: &Value) -> HashData {
    let mut out = HashData::new(None);
    if let Some(h) = recv.as_hash() {
        let h = h.borrow();
        out.keys = h.keys.clone();
        out.values = h.values.clone();
        out.default = h.default.clone();
        out.default_proc = h.default_proc.clone();
    }
    out
}

fn merge(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let mut out = copy_of(recv);
    for other in args {
        merge_into(rt, &mut out, other, block)?;
    }
    Ok(rt.hash(out))
}

fn merge_bang(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let mut out = copy_of(recv);
    for other in args {
        merge_into(rt, &mut out, other, block)?;
    }
    if let Some(h) = recv.as_hash() {
        let mut h = h.borrow_mut();
        h.keys = out.keys;
        h.values = out.values;
    }
    Ok(recv.clone())
}

fn transform_values(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    let mut out = HashData::new(None);
    for (k, v) in pairs(recv) {
        let nv = rt.call_block(blk, &[v])?;
        out.insert(k, nv);
    }
    Ok(rt.hash(out))
}

fn transform_keys(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    let mut out = HashData::new(None);
    for (k, v) in pairs(recv) {
        let nk = rt.call_block(blk, &[k])?;
        out.insert(nk, v);
    }
    Ok(rt.hash(out))
}

fn invert(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let mut out = HashData::new(None);
    for (k, v) in pairs(recv) {
        out.insert(v, k);
    }
    Ok(rt.hash(out))
}

fn clear(_rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    if let Some(h) = recv.as_hash() {
        let mut h = h.borrow_mut();
        h.keys.clear();
        h.values.clear();
    }
    Ok(recv.clone())
}

fn to_a(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let items = pairs(recv).into_iter().map(|(k, v)| pair(rt, k, v)).collect();
    Ok(rt.array(items))
}

fn to_h(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let Some(blk) = block else {
        return Ok(recv.clone());
    };
    let mut out = HashData::new(None);
    for (k, v) in pairs(recv) {
        let kv = pair(rt, k, v);
        let r = rt.call_block(blk, &[kv])?;
        let r = expect_array(rt, &r)?;
        out.insert(arg(rt, &r, 0), arg(rt, &r, 1));
    }
    Ok(rt.hash(out))
}

/// Same entries regardless of insertion order.
fn eq(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let other = &args[0];
    let (Some(a), Some(b)) = (recv.as_hash(), other.as_hash()) else {
        return Ok(rt.bool(false));
    };
    if a.borrow().len() != b.borrow().len() {
        return Ok(rt.bool(false));
    }
    for (k, v) in pairs(recv) {
        let Some(w) = lookup(other, &k) else {
            return Ok(rt.bool(false));
        };
        if !rt.equals(&v, &w)? {
            return Ok(rt.bool(false));
        }
    }
    Ok(rt.bool(true))
}

fn hash(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.int(rt.hash_code(recv)))
}

/// `{1=>2, :b=>"c"}`
fn inspect(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let mut parts = Vec::new();
    for (k, v) in pairs(recv) {
        let ks = rt.inspect(&k)?;
        let vs = if v.ptr_eq(recv) { "{...}".to_string() } else { rt.inspect(&v)? };
        parts.push(format!("{ks}=>{vs}"));
    }
    Ok(rt.str(format!("{{{}}}", parts.join(", "))))
}
