mod common;

use common::{code, raised_class, runtime};
use rb_runtime::core::Scope;
use rb_runtime::{ExecError, ScopeKind, Unwind};

#[test]
fn stacks_are_balanced_after_a_raise() {
    let mut rt = runtime();
    let before = rt.stack_depths();
    let class = rt.classes.object.clone();
    let body = code(|rt| Err(rt.runtime_error("boom")));
    let out = rt.open_class(Some(class), "Exploding", None, Some(&body));
    assert_eq!(raised_class(out), "RuntimeError");
    assert_eq!(rt.stack_depths(), before);
}

#[test]
fn top_level_return_ends_the_program_with_its_value() {
    let mut rt = runtime();
    let program = code(|rt| {
        Err(Unwind::Return {
            target: rt.frame().return_target(),
            value: rt.int(7),
        })
    });
    let v = rt.run_program(&program).unwrap();
    assert_eq!(v.as_i64(), Some(7));
}

#[test]
fn stray_break_becomes_local_jump_error() {
    let mut rt = runtime();
    let program = code(|rt| {
        Err(Unwind::Break {
            site: 99,
            value: rt.nil(),
        })
    });
    let err = rt.run_program(&program).unwrap_err();
    assert_eq!(err.class_name(), "LocalJumpError");
    let ExecError::Uncaught { message, .. } = err;
    assert_eq!(message, "break from proc-closure");
}

#[test]
fn uncaught_exception_keeps_class_and_message() {
    let mut rt = runtime();
    let program = code(|rt| Err(rt.arg_error("bad input")));
    let err = rt.run_program(&program).unwrap_err();
    assert_eq!(err.to_string(), "ArgumentError: bad input");
}

#[test]
fn unset_instance_variables_read_as_nil() {
    let rt = runtime();
    assert!(rt.get_ivar("@missing").is_nil());
    rt.set_ivar("@x", rt.int(3));
    assert_eq!(rt.get_ivar("@x").as_i64(), Some(3));
    assert_eq!(rt.main_object().ivar("@x").and_then(|v| v.as_i64()), Some(3));
}

#[test]
fn constants_cannot_be_redefined_in_the_same_holder() {
    let rt = runtime();
    rt.set_const("LIMIT", rt.int(1)).unwrap();
    assert_eq!(rt.get_const("LIMIT").unwrap().as_i64(), Some(1));
    assert_eq!(raised_class(rt.set_const("LIMIT", rt.int(2))), "NameError");
    assert_eq!(raised_class(rt.get_const("Nope")), "NameError");
}

#[test]
fn constants_resolve_innermost_body_first() {
    let mut rt = runtime();
    rt.set_const("X", rt.str("outer")).unwrap();
    let object = rt.classes.object.clone();
    let body = code(|rt| {
        rt.set_const("X", rt.str("inner"))?;
        rt.get_const("X")
    });
    let v = rt.open_module(Some(object), "Inner", Some(&body)).unwrap();
    assert_eq!(v.as_str().unwrap().as_str(), "inner");
    assert_eq!(rt.get_const("X").unwrap().as_str().unwrap().as_str(), "outer");
    let inner = rt.get_const("Inner").unwrap();
    let scoped = rt.scoped_const(&inner, "X").unwrap();
    assert_eq!(scoped.as_str().unwrap().as_str(), "inner");
}

#[test]
fn block_scopes_see_and_rebind_outer_locals() {
    let rt = runtime();
    let top = Scope::top();
    top.set("x", rt.int(1));
    let block = Scope::new(ScopeKind::Block, Some(top.clone()));
    assert_eq!(block.get("x").and_then(|v| v.as_i64()), Some(1));
    block.set("x", rt.int(2));
    block.set("y", rt.int(3));
    assert_eq!(top.get("x").and_then(|v| v.as_i64()), Some(2));
    assert!(top.get("y").is_none());

    let method = Scope::new(ScopeKind::Method, Some(top.clone()));
    assert!(method.get("x").is_none());
}

#[test]
fn globals_default_to_nil_and_stdout_is_preset() {
    let mut rt = runtime();
    assert!(rt.get_global("$unset").is_nil());
    let twelve = rt.int(12);
    rt.set_global("$count", twelve);
    assert_eq!(rt.get_global("$count").as_i64(), Some(12));
    assert!(!rt.get_global("$stdout").is_nil());
}

#[test]
fn runaway_recursion_raises_system_stack_error() {
    use std::rc::Rc;

    use rb_runtime::core::ClosureFn;
    use rb_runtime::{MethodDef, Runtime, RuntimeConfig, Value};

    let cfg = RuntimeConfig {
        max_call_depth: 50,
        ..RuntimeConfig::default()
    };
    let mut rt = Runtime::with_config(cfg);
    let f: Rc<ClosureFn> = Rc::new(|rt: &mut Runtime, recv: &Value, _: &[Value], _: Option<&Value>| {
        rt.send(recv, "recur", &[], None)
    });
    let object = rt.classes.object.clone();
    rt.define_instance_method(&object, "recur", MethodDef::closure("recur", f));
    let before = rt.stack_depths();
    let main = rt.main_object();
    assert_eq!(raised_class(rt.send(&main, "recur", &[], None)), "SystemStackError");
    assert_eq!(rt.stack_depths(), before);
}
