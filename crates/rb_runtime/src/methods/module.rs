use std::rc::Rc;

use super::common::*;
use crate::Runtime;
use crate::core::class::{self, AllocKind};
use crate::core::dispatch;
use crate::core::{Callable, ClosureFn, MethodDef, Value, Visibility};
use crate::errors::RbResult;

pub(super) fn install(rt: &mut Runtime) {
    let m = rt.classes.module.clone();
    def_all(&m, &["name", "to_s", "inspect"], name);
    def(&m, "include", include);
    def(&m, "include?", include_p);
    def(&m, "ancestors", ancestors);
    def(&m, "instance_methods", instance_methods);
    def(&m, "public_instance_methods", instance_methods);
    def(&m, "private_instance_methods", private_instance_methods);
    def(&m, "method_defined?", method_defined);
    def(&m, "public_method_defined?", public_method_defined);
    def(&m, "private_method_defined?", private_method_defined);
    def(&m, "protected_method_defined?", protected_method_defined);
    def(&m, "instance_method_visibility", instance_method_visibility);
    def(&m, "attr_reader", attr_reader);
    def(&m, "attr", attr_reader);
    def(&m, "attr_writer", attr_writer);
    def(&m, "attr_accessor", attr_accessor);
    def_private(&m, "private", private);
    def_private(&m, "public", public);
    def_private(&m, "protected", protected);
    def(&m, "private_class_method", private_class_method);
    def(&m, "public_class_method", public_class_method);
    def(&m, "private_constant", private_constant);
    def(&m, "module_function", module_function);
    def(&m, "alias_method", alias_method);
    def(&m, "define_method", define_method);
    def(&m, "remove_method", remove_method);
    def(&m, "const_get", const_get);
    def(&m, "const_set", const_set);
    def(&m, "const_defined?", const_defined);
    def(&m, "constants", constants);
    def(&m, "class_variable_get", cvar_get);
    def(&m, "class_variable_set", cvar_set);
    def_all(&m, &["class_eval", "module_eval", "class_exec"], class_eval);
    def(&m, "===", case_eq);
    def(&m, "==", same);
    def(&m, "<", lt);
    def(&m, "<=", le);
    def(&m, ">", gt);
    def(&m, ">=", ge);
    def(&m, "hash", module_hash);

    let c = rt.classes.class.clone();
    def(&c, "new", new);
    def(&c, "allocate", allocate);
    def(&c, "superclass", superclass);
    def(&c, "subclass", subclass);
    def(&c, "copy", copy);
}

fn name(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    match recv.module_name() {
        Some(n) if !n.is_empty() => Ok(rt.str(n)),
        _ => Ok(rt.str(rt.default_to_s(recv))),
    }
}

/// `include A, B` puts A ahead of B in the lookup.
fn include(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, usize::MAX)?;
    for m in args.iter().rev() {
        rt.include_module(recv, m)?;
    }
    Ok(recv.clone())
}

fn include_p(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let m = &args[0];
    let hit = m.is_module() && !recv.ptr_eq(m) && dispatch::inherits(recv, m);
    Ok(rt.bool(hit))
}

fn ancestors(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.array(dispatch::ancestors(recv)))
}

fn names_to_syms(rt: &mut Runtime, names: Vec<String>) -> Value {
    let syms = names.iter().map(|n| rt.sym(n)).collect();
    rt.array(syms)
}

fn instance_methods(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let inherited = args.first().is_none_or(|v| v.truthy());
    let names = dispatch::instance_method_names(
        recv,
        inherited,
        &[Visibility::Public, Visibility::Protected],
    );
    Ok(names_to_syms(rt, names))
}

fn private_instance_methods(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let inherited = args.first().is_none_or(|v| v.truthy());
    let names = dispatch::instance_method_names(recv, inherited, &[Visibility::Private]);
    Ok(names_to_syms(rt, names))
}

fn visibility_of(rt: &Runtime, recv: &Value, args: &[Value]) -> RbResult<Option<Visibility>> {
    validate_arity(rt, args.len(), 1, 2)?;
    let name = rt.name_of(&args[0])?;
    Ok(dispatch::find_instance_method(recv, &name).map(|(_, v)| v))
}

fn method_defined(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let vis = visibility_of(rt, recv, args)?;
    Ok(rt.bool(matches!(vis, Some(Visibility::Public | Visibility::Protected))))
}

fn public_method_defined(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let vis = visibility_of(rt, recv, args)?;
    Ok(rt.bool(vis == Some(Visibility::Public)))
}

fn private_method_defined(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let vis = visibility_of(rt, recv, args)?;
    Ok(rt.bool(vis == Some(Visibility::Private)))
}

fn protected_method_defined(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let vis = visibility_of(rt, recv, args)?;
    Ok(rt.bool(vis == Some(Visibility::Protected)))
}

/// `:public`, `:protected`, `:private` or nil.
fn instance_method_visibility(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(match visibility_of(rt, recv, args)? {
        Some(v) => rt.sym(v.as_str()),
        None => rt.nil(),
    })
}

fn attr_names(rt: &Runtime, args: &[Value]) -> RbResult<Vec<String>> {
    args.iter().map(|a| rt.name_of(a)).collect()
}

fn install_reader(rt: &mut Runtime, module: &Value, name: &str) {
    let ivar = format!("@{name}");
    let f: Rc<ClosureFn> = Rc::new(move |rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>| {
        Ok(recv.ivar(&ivar).unwrap_or_else(|| rt.nil()))
    });
    rt.define_instance_method(module, name, closure(name, f));
}

fn install_writer(rt: &mut Runtime, module: &Value, name: &str) {
    let ivar = format!("@{name}");
    let setter = format!("{name}=");
    let f: Rc<ClosureFn> = Rc::new(move |rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>| {
        validate_arity(rt, args.len(), 1, 1)?;
        recv.set_ivar(&ivar, args[0].clone());
        Ok(args[0].clone())
    });
    rt.define_instance_method(module, &setter, closure(&setter, f));
}

fn attr_reader(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let names = attr_names(rt, args)?;
    for n in &names {
        install_reader(rt, recv, n);
    }
    Ok(names_to_syms(rt, names))
}

fn attr_writer(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let names = attr_names(rt, args)?;
    for n in &names {
        install_writer(rt, recv, n);
    }
    let setters = names.iter().map(|n| format!("{n}=")).collect();
    Ok(names_to_syms(rt, setters))
}

fn attr_accessor(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let names = attr_names(rt, args)?;
    let mut out = Vec::new();
    for n in &names {
        install_reader(rt, recv, n);
        install_writer(rt, recv, n);
        out.push(n.clone());
        out.push(format!("{n}="));
    }
    Ok(names_to_syms(rt, out))
}

/// Names from symbol arguments, or from a single Array of them
/// (`private attr_reader :a, :b`).
fn visibility_names(rt: &Runtime, args: &[Value]) -> RbResult<Vec<String>> {
    let flat: Vec<Value> = match args {
        [one] if one.as_array().is_some() => rt.to_ary(one),
        _ => args.to_vec(),
    };
    flat.iter().map(|a| rt.name_of(a)).collect()
}

fn change_visibility(rt: &mut Runtime, recv: &Value, args: &[Value], vis: Visibility) -> RbResult<Value> {
    let names = visibility_names(rt, args)?;
    rt.set_visibility(recv, vis, &names)?;
    Ok(match args {
        [] => rt.nil(),
        [one] => one.clone(),
        _ => rt.array(args.to_vec()),
    })
}

fn private(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    change_visibility(rt, recv, args, Visibility::Private)
}

fn public(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    change_visibility(rt, recv, args, Visibility::Public)
}

fn protected(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    change_visibility(rt, recv, args, Visibility::Protected)
}

fn class_method_visibility(rt: &mut Runtime, recv: &Value, args: &[Value], vis: Visibility) -> RbResult<Value> {
    for n in visibility_names(rt, args)? {
        if !recv.own_methods_mut().set_visibility(&n, vis) {
            return Err(rt.name_error(format!(
                "undefined method '{}' for {}",
                n,
                rt.describe(recv)
            )));
        }
    }
    Ok(rt.nil())
}

fn private_class_method(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    class_method_visibility(rt, recv, args, Visibility::Private)
}

fn public_class_method(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    class_method_visibility(rt, recv, args, Visibility::Public)
}

fn private_constant(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.nil())
}

/// With names: copies those instance methods onto the module itself.
fn module_function(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    for n in visibility_names(rt, args)? {
        match dispatch::find_instance_method(recv, &n) {
            Some((def, _)) => recv.own_methods_mut().insert(&n, def, Visibility::Public),
            None => {
                return Err(rt.name_error(format!(
                    "undefined method '{}' for {}",
                    n,
                    rt.describe(recv)
                )));
            }
        }
    }
    Ok(rt.nil())
}

fn alias_method(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 2, 2)?;
    let new = rt.name_of(&args[0])?;
    let old = rt.name_of(&args[1])?;
    rt.alias_in(recv, &new, &old)?;
    Ok(rt.sym(&new))
}

fn define_method(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 2)?;
    let name = rt.name_of(&args[0])?;
    let body = match args.get(1) {
        Some(p) if p.as_proc().is_some() => p.clone(),
        Some(other) => {
            return Err(rt.type_error(format!(
                "wrong argument type {} (expected Proc)",
                other.class_name()
            )));
        }
        None => expect_block(rt, block)?.clone(),
    };
    let def = Rc::new(MethodDef {
        name: name.clone(),
        body: Callable::Proc(body),
        source_defined: true,
    });
    rt.define_instance_method(recv, &name, def);
    Ok(rt.sym(&name))
}

fn remove_method(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    for a in args {
        let n = rt.name_of(a)?;
        let removed = recv
            .as_class()
            .and_then(|c| c.instance_methods_mut().remove(&n));
        if removed.is_none() {
            return Err(rt.name_error(format!(
                "method '{}' not defined in {}",
                n,
                recv.module_name().unwrap_or_default()
            )));
        }
    }
    Ok(recv.clone())
}

fn const_get(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 2)?;
    let path = rt.name_of(&args[0])?;
    let mut cur = recv.clone();
    for part in path.split("::").filter(|p| !p.is_empty()) {
        cur = match rt.scoped_const(&cur, part) {
            Ok(v) => v,
            Err(_) if cur.ptr_eq(recv) => rt.top_const(part)?,
            Err(e) => return Err(e),
        };
    }
    Ok(cur)
}

fn const_set(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 2, 2)?;
    let name = rt.name_of(&args[0])?;
    if !name.starts_with(|c: char| c.is_ascii_uppercase()) {
        return Err(rt.name_error(format!("wrong constant name {name}")));
    }
    rt.set_const_in(recv, &name, args[1].clone())
}

fn const_defined(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 2)?;
    let name = rt.name_of(&args[0])?;
    Ok(rt.bool(rt.scoped_const(recv, &name).is_ok()))
}

fn constants(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let names = recv.as_class().map(|c| c.const_names()).unwrap_or_default();
    Ok(names_to_syms(rt, names))
}

fn cvar_get(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let name = rt.name_of(&args[0])?;
    for c in dispatch::ancestors(recv) {
        if let Some(v) = c.as_class().and_then(|d| d.cvars.borrow().get(&name).cloned()) {
            return Ok(v);
        }
    }
    Err(rt.name_error(format!(
        "uninitialized class variable {} in {}",
        name,
        recv.module_name().unwrap_or_default()
    )))
}

fn cvar_set(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 2, 2)?;
    let name = rt.name_of(&args[0])?;
    if let Some(d) = recv.as_class() {
        d.cvars.borrow_mut().insert(name, args[1].clone());
    }
    Ok(args[1].clone())
}

fn class_eval(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    rt.call_block_as(blk, recv, &[recv.clone()])
}

fn case_eq(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(rt.bool(dispatch::is_a(&args[0], recv)))
}

fn same(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(rt.bool(recv.ptr_eq(&args[0])))
}

fn module_hash(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.int((recv.object_id() >> 3) as i64))
}

/// `a < b` is true when `a` inherits from `b`, false when `b` inherits from
/// `a`, nil when they are unrelated.
fn relation(rt: &Runtime, a: &Value, b: &Value, strict: bool) -> RbResult<Value> {
    if !b.is_module_like() {
        return Err(rt.type_error("compared with non class/module"));
    }
    if a.ptr_eq(b) {
        return Ok(rt.bool(!strict));
    }
    if dispatch::inherits(a, b) {
        return Ok(rt.bool(true));
    }
    if dispatch::inherits(b, a) {
        return Ok(rt.bool(false));
    }
    Ok(rt.nil())
}

fn lt(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    relation(rt, recv, &args[0], true)
}

fn le(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    relation(rt, recv, &args[0], false)
}

fn gt(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    relation(rt, &args[0], recv, true)
}

fn ge(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    relation(rt, &args[0], recv, false)
}

/// `Class#new`: allocates and runs `initialize`. On `Class` itself it makes
/// an anonymous class, on `Module` an anonymous module.
fn new(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let kind = recv.as_class().map(|c| c.alloc_kind());
    match kind {
        Some(AllocKind::Class) => {
            let base = match args.first() {
                Some(b) => b.clone(),
                None => rt.classes.object.clone(),
            };
            let c = class::subclass(&base, "").map_err(|e| rt.model_error(e))?;
            if let Some(blk) = block {
                rt.call_block_as(blk, &c, &[c.clone()])?;
            }
            Ok(c)
        }
        Some(AllocKind::Module) => {
            let m = rt.new_module("");
            if let Some(blk) = block {
                rt.call_block_as(blk, &m, &[m.clone()])?;
            }
            Ok(m)
        }
        _ => {
            let obj = rt.allocate(recv)?;
            rt.send(&obj, "initialize", args, block)?;
            Ok(obj)
        }
    }
}

fn allocate(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    rt.allocate(recv)
}

fn superclass(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(recv
        .as_class()
        .and_then(|c| c.base().cloned())
        .unwrap_or_else(|| rt.nil()))
}

/// `Base.subclass("Name")`: a new class with `Base` as its base, not
/// registered as a constant.
fn subclass(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let name = match args.first() {
        Some(n) => rt.name_of(n)?,
        None => String::new(),
    };
    class::subclass(recv, &name).map_err(|e| rt.model_error(e))
}

fn copy(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    class::copy(recv).map_err(|e| rt.model_error(e))
}
