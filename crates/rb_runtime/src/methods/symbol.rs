use std::rc::Rc;

use super::common::*;
use crate::Runtime;
use crate::core::{CallerContext, NativeBlockFn, Value};
use crate::errors::RbResult;
use crate::runtime::format;

pub(super) fn install(rt: &mut Runtime) {
    let c = rt.classes.symbol.clone();
    def_all(&c, &["to_s", "id2name", "name"], to_s);
    def(&c, "to_sym", itself);
    def(&c, "inspect", inspect);
    def(&c, "to_proc", to_proc);
    def_all(&c, &["length", "size"], length);
    def(&c, "<=>", cmp);
    def_all(&c, &["==", "==="], eq);
    def(&c, "upcase", upcase);
    def(&c, "downcase", downcase);
    def(&c, "succ", succ);
    def(&c, "[]", index);
    def(&c, "empty?", empty);
    def(&c, "start_with?", start_with);
    def(&c, "end_with?", end_with);
    def(&c, "hash", hash);
}

fn name(v: &Value) -> &str {
    v.as_symbol().unwrap_or_default()
}

fn to_s(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(name(recv)))
}

fn itself(_rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(recv.clone())
}

fn inspect(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(format::inspect_symbol(name(recv))))
}

/// `:upcase.to_proc` calls `upcase` on its first argument, passing the rest.
/// The send is made from outside the receiver, so private methods miss.
fn to_proc(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let method = name(recv).to_string();
    let f: Rc<NativeBlockFn> = Rc::new(move |rt: &mut Runtime, args: &[Value]| {
        let Some((target, rest)) = args.split_first() else {
            return Err(rt.arg_error("no receiver given"));
        };
        rt.send_with(target, &method, rest, None, CallerContext::PUBLIC)
    });
    Ok(rt.native_proc(f))
}

fn length(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.int(name(recv).chars().count() as i64))
}

fn cmp(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(match args[0].as_symbol() {
        Some(other) => rt.int(name(recv).cmp(other) as i64),
        None => rt.nil(),
    })
}

fn eq(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(rt.bool(args[0].as_symbol() == Some(name(recv))))
}

fn upcase(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let up = name(recv).to_uppercase();
    Ok(rt.sym(&up))
}

fn downcase(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let down = name(recv).to_lowercase();
    Ok(rt.sym(&down))
}

fn succ(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let next = super::string::str_succ(name(recv));
    Ok(rt.sym(&next))
}

fn index(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let s = rt.str(name(recv));
    rt.send(&s, "[]", args, block)
}

fn empty(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(name(recv).is_empty()))
}

fn start_with(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let s = rt.str(name(recv));
    rt.send(&s, "start_with?", args, block)
}

fn end_with(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let s = rt.str(name(recv));
    rt.send(&s, "end_with?", args, block)
}

fn hash(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.int(rt.hash_code(recv)))
}
