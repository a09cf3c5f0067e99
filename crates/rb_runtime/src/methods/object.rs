use std::cell::RefCell;

use super::common::*;
use crate::Runtime;
use crate::core::dispatch::{self, CallerContext};
use crate::core::{Data, HashData, Holder, Value, Visibility, key_eql};
use crate::errors::RbResult;

pub(super) fn install(rt: &mut Runtime) {
    let b = rt.classes.basic_object.clone();
    def_private(&b, "initialize", initialize);
    def_private(&b, "method_missing", method_missing);
    def(&b, "==", identical);
    def(&b, "equal?", identical);
    def(&b, "!", not);
    def(&b, "!=", not_equal);
    def(&b, "__send__", send);
    def(&b, "__id__", object_id);
    def(&b, "instance_eval", instance_eval);
    def(&b, "instance_exec", instance_exec);

    let o = rt.classes.object.clone();
    def(&o, "class", class);
    def(&o, "eql?", eql);
    def(&o, "===", case_eq);
    def_all(&o, &["is_a?", "kind_of?"], is_a);
    def(&o, "instance_of?", instance_of);
    def(&o, "nil?", nil_p);
    def(&o, "respond_to?", respond_to);
    def(&o, "send", send);
    def(&o, "public_send", public_send);
    def(&o, "to_s", to_s);
    def(&o, "inspect", inspect);
    def(&o, "object_id", object_id);
    def(&o, "hash", hash);
    def(&o, "extend", extend);
    def(&o, "instance_variable_get", ivar_get);
    def(&o, "instance_variable_set", ivar_set);
    def(&o, "instance_variables", ivar_names);
    def(&o, "instance_variable_defined?", ivar_defined);
    def(&o, "tap", tap);
    def(&o, "then", then);
    def(&o, "itself", itself);
    def(&o, "singleton_methods", singleton_methods);
    def(&o, "methods", methods);
    def(&o, "public_methods", methods);
    def(&o, "define_singleton_method", define_singleton_method);
    def_all(&o, &["dup", "clone"], dup);
    def(&o, "freeze", itself);
    def(&o, "frozen?", frozen);
    def(&o, "=~", nil_result);
    def(&o, "!~", not_match);

    let main = rt.main_object();
    def_singleton(&main, "to_s", main_to_s);
    def_singleton(&main, "inspect", main_to_s);
}

fn initialize(rt: &mut Runtime, _recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 0)?;
    Ok(rt.nil())
}

fn method_missing(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let name = match args.first() {
        Some(n) => rt.name_of(n)?,
        None => return Err(rt.arg_error("no method name given")),
    };
    Err(rt.missing_method_error(recv, &name, dispatch::Miss::Undefined))
}

fn identical(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(rt.bool(recv.ptr_eq(&args[0])))
}

fn not(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(!recv.truthy()))
}

fn not_equal(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let eq = rt.equals(recv, &args[0])?;
    Ok(rt.bool(!eq))
}

/// `send` sees private methods, and top-level functions when sent to self.
fn send(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let Some(first) = args.first() else {
        return Err(rt.arg_error("no method name given"));
    };
    let name = rt.name_of(first)?;
    if recv.ptr_eq(&rt.self_value()) {
        if let Some(def) = rt.scope().find_method(&name) {
            return rt.run_method(&def, Holder::Own(recv.clone()), recv, &args[1..], block);
        }
    }
    rt.send(recv, &name, &args[1..], block)
}

fn public_send(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let Some(first) = args.first() else {
        return Err(rt.arg_error("no method name given"));
    };
    let name = rt.name_of(first)?;
    rt.send_with(recv, &name, &args[1..], block, CallerContext::PUBLIC)
}

fn instance_eval(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    rt.call_block_as(blk, recv, &[recv.clone()])
}

fn instance_exec(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    rt.call_block_as(blk, recv, args)
}

fn class(_rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(recv.class())
}

fn eql(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(rt.bool(key_eql(recv, &args[0])))
}

fn case_eq(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let eq = rt.equals(recv, &args[0])?;
    Ok(rt.bool(eq))
}

fn is_a(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    if !args[0].is_module_like() {
        return Err(rt.type_error("class or module required"));
    }
    Ok(rt.bool(dispatch::is_a(recv, &args[0])))
}

fn instance_of(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(rt.bool(recv.class().ptr_eq(&args[0])))
}

fn nil_p(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(recv.is_nil()))
}

fn respond_to(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 2)?;
    let name = rt.name_of(&args[0])?;
    let include_all = args.get(1).is_some_and(|v| v.truthy());
    Ok(rt.bool(rt.respond_to(recv, &name, include_all)))
}

fn to_s(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let s = rt.builtin_to_s(recv).unwrap_or_else(|| rt.default_to_s(recv));
    Ok(rt.str(s))
}

/// `#<Foo>` or `#<Foo @a=1, @b="x">`.
fn inspect(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let names = recv.ivar_names();
    if names.is_empty() {
        return to_s(rt, recv, &[], None);
    }
    let mut parts = Vec::with_capacity(names.len());
    for n in names {
        let v = recv.ivar(&n).unwrap_or_else(|| rt.nil());
        parts.push(format!("{}={}", n, rt.inspect(&v)?));
    }
    Ok(rt.str(format!("#<{} {}>", recv.class_name(), parts.join(", "))))
}

fn main_to_s(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str("main"))
}

fn object_id(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.int((recv.object_id() >> 3) as i64))
}

fn hash(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.int(rt.hash_code(recv)))
}

fn extend(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, usize::MAX)?;
    for m in args.iter().rev() {
        rt.extend_object(recv, m)?;
    }
    Ok(recv.clone())
}

fn ivar_name(rt: &Runtime, v: &Value) -> RbResult<String> {
    let name = rt.name_of(v)?;
    if !name.starts_with('@') || name.starts_with("@@") {
        return Err(rt.name_error(format!(
            "'{name}' is not allowed as an instance variable name"
        )));
    }
    Ok(name)
}

fn ivar_get(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let name = ivar_name(rt, &args[0])?;
    Ok(recv.ivar(&name).unwrap_or_else(|| rt.nil()))
}

fn ivar_set(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 2, 2)?;
    let name = ivar_name(rt, &args[0])?;
    recv.set_ivar(&name, args[1].clone());
    Ok(args[1].clone())
}

fn ivar_names(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let names: Vec<Value> = recv.ivar_names().iter().map(|n| rt.sym(n)).collect();
    Ok(rt.array(names))
}

fn ivar_defined(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let name = ivar_name(rt, &args[0])?;
    Ok(rt.bool(recv.ivar(&name).is_some()))
}

fn tap(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    rt.call_block(blk, &[recv.clone()])?;
    Ok(recv.clone())
}

fn then(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    rt.call_block(blk, &[recv.clone()])
}

fn itself(_rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(recv.clone())
}

fn frozen(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let immediate = matches!(
        recv.data(),
        Data::Nil | Data::True | Data::False | Data::Integer(_) | Data::Float(_) | Data::Symbol(_)
    );
    Ok(rt.bool(immediate))
}

fn nil_result(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.nil())
}

fn not_match(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let r = rt.send(recv, "=~", args, None)?;
    Ok(rt.bool(!r.truthy()))
}

/// Own public methods plus those of extended modules.
fn singleton_methods(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let mut names = recv.own_methods().names(Visibility::Public);
    for m in recv.extended().iter() {
        for n in dispatch::instance_method_names(m, true, &[Visibility::Public]) {
            if !names.contains(&n) {
                names.push(n);
            }
        }
    }
    let syms = names.iter().map(|n| rt.sym(n)).collect();
    Ok(rt.array(syms))
}

fn methods(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let ctx = CallerContext {
        private: false,
        protected: true,
    };
    let syms = dispatch::method_names(recv, ctx)
        .iter()
        .map(|n| rt.sym(n))
        .collect();
    Ok(rt.array(syms))
}

fn define_singleton_method(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 2)?;
    let name = rt.name_of(&args[0])?;
    let body = match args.get(1) {
        Some(p) => p.clone(),
        None => expect_block(rt, block)?.clone(),
    };
    let def = std::rc::Rc::new(crate::core::MethodDef {
        name: name.clone(),
        body: crate::core::Callable::Proc(body),
        source_defined: true,
    });
    Ok(rt.define_singleton(recv, &name, def))
}

/// Shallow copy: same class, same instance variables, copied payload for
/// strings and containers.
fn dup(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let class = recv.class();
    let payload = match recv.data() {
        Data::Object => Data::Object,
        Data::Str(s) => Data::Str(RefCell::new(s.borrow().clone())),
        Data::Array(a) => Data::Array(RefCell::new(a.borrow().clone())),
        Data::Hash(h) => {
            let h = h.borrow();
            let mut copy = HashData::new(h.default.clone());
            copy.default_proc = h.default_proc.clone();
            copy.keys = h.keys.clone();
            copy.values = h.values.clone();
            Data::Hash(RefCell::new(copy))
        }
        Data::Class(_) => {
            return crate::core::class::copy(recv).map_err(|e| rt.model_error(e));
        }
        _ => return Ok(recv.clone()),
    };
    let out = Value::alloc(Some(&class), payload);
    for n in recv.ivar_names() {
        if let Some(v) = recv.ivar(&n) {
            out.set_ivar(&n, v);
        }
    }
    Ok(out)
}
