#![allow(dead_code)]

use std::rc::Rc;

use rb_runtime::core::{ClosureFn, class};
use rb_runtime::{Code, MethodDef, RbResult, Runtime, Value};

pub fn runtime() -> Runtime {
    Runtime::new()
}

/// `class Name < Object` without running a body.
pub fn class_under_object(rt: &Runtime, name: &str) -> Value {
    class::subclass(&rt.classes.object, name).unwrap()
}

/// A builtin method returning a fixed string, so tests can tell
/// definitions apart by what a call yields.
pub fn tagged(name: &str, tag: &'static str) -> Rc<MethodDef> {
    let f: Rc<ClosureFn> =
        Rc::new(move |rt: &mut Runtime, _: &Value, _: &[Value], _: Option<&Value>| Ok(rt.str(tag)));
    MethodDef::closure(name, f)
}

/// Sends `name` and reads the String result.
pub fn call_str(rt: &mut Runtime, recv: &Value, name: &str) -> String {
    let v = rt.send(recv, name, &[], None).unwrap();
    v.as_str().map(|s| s.clone()).unwrap_or_else(|| panic!("{name} did not return a String"))
}

pub fn inspect(rt: &mut Runtime, v: &Value) -> String {
    rt.inspect(v).unwrap()
}

pub fn code(f: impl Fn(&mut Runtime) -> RbResult<Value> + 'static) -> Code {
    Rc::new(f)
}

/// Class name of the exception `out` raised.
pub fn raised_class(out: RbResult<Value>) -> String {
    match out {
        Err(rb_runtime::Unwind::Raise(exc)) => exc.class_name(),
        Err(other) => panic!("expected a raise, got {other:?}"),
        Ok(v) => panic!("expected a raise, got {v:?}"),
    }
}
