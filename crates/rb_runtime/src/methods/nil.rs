//! `nil`, `true` and `false`.

use super::common::*;
use crate::Runtime;
use crate::core::Value;
use crate::errors::RbResult;

pub(super) fn install(rt: &mut Runtime) {
    let n = rt.classes.nil_class.clone();
    def(&n, "nil?", yes);
    def(&n, "to_s", nil_to_s);
    def(&n, "to_a", nil_to_a);
    def(&n, "to_h", nil_to_h);
    def(&n, "to_i", nil_to_i);
    def(&n, "to_f", nil_to_f);
    def(&n, "inspect", nil_inspect);
    def(&n, "&", and);
    def(&n, "|", or);
    def(&n, "^", or);

    for c in [rt.classes.true_class.clone(), rt.classes.false_class.clone()] {
        def_all(&c, &["to_s", "inspect"], bool_to_s);
        def(&c, "&", and);
        def(&c, "|", or);
        def(&c, "^", xor);
        def(&c, "!", not);
        def(&c, "===", same);
        def(&c, "hash", bool_hash);
    }
}

fn yes(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(true))
}

fn nil_to_s(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(""))
}

fn nil_to_a(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.array(Vec::new()))
}

fn nil_to_h(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.hash(crate::core::HashData::new(None)))
}

fn nil_to_i(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.int(0))
}

fn nil_to_f(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.float(0.0))
}

fn nil_inspect(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str("nil"))
}

fn and(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(rt.bool(recv.truthy() && args[0].truthy()))
}

fn or(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(rt.bool(recv.truthy() || args[0].truthy()))
}

fn xor(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(rt.bool(recv.truthy() != args[0].truthy()))
}

fn not(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(!recv.truthy()))
}

fn same(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(rt.bool(recv.ptr_eq(&args[0])))
}

fn bool_to_s(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(if recv.truthy() { "true" } else { "false" }))
}

fn bool_hash(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.int(rt.hash_code(recv)))
}
