//! The `STDOUT` object. Output goes to the runtime's host.

use super::common::*;
use crate::Runtime;
use crate::core::{Data, Value};
use crate::errors::RbResult;

pub(super) fn install(rt: &mut Runtime) {
    let c = rt.classes.io.clone();
    def(&c, "puts", puts);
    def(&c, "print", print);
    def(&c, "write", write);
    def(&c, "<<", append);
    def(&c, "flush", flush);
    def(&c, "sync", yes);
    def(&c, "sync=", set_sync);
    def(&c, "tty?", no);
    def_all(&c, &["to_s", "inspect"], inspect);

    let stdout = Value::alloc(Some(&c), Data::Object);
    if let Some(object) = rt.classes.object.as_class() {
        object.const_set("STDOUT", stdout.clone());
    }
    rt.set_global("$stdout", stdout);
}

fn puts(rt: &mut Runtime, _recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let mut out = String::new();
    if args.is_empty() {
        out.push('\n');
    }
    for a in args {
        super::puts_value(rt, a, &mut out)?;
    }
    rt.write(&out);
    Ok(rt.nil())
}

fn print(rt: &mut Runtime, _recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    for a in args {
        let s = rt.to_s(a)?;
        rt.write(&s);
    }
    Ok(rt.nil())
}

/// Returns the number of bytes written.
fn write(rt: &mut Runtime, _recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let mut n = 0;
    for a in args {
        let s = rt.to_s(a)?;
        n += s.len();
        rt.write(&s);
    }
    Ok(rt.int(n as i64))
}

fn append(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let s = rt.to_s(&args[0])?;
    rt.write(&s);
    Ok(recv.clone())
}

fn flush(_rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(recv.clone())
}

fn yes(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(true))
}

fn no(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(false))
}

fn set_sync(rt: &mut Runtime, _recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(arg(rt, args, 0))
}

fn inspect(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str("#<IO:<STDOUT>>"))
}
