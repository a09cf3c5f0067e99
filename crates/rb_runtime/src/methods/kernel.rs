use super::common::*;
use crate::Runtime;
use crate::core::{Data, ProcBody, ProcData, Value};
use crate::errors::{RbResult, Unwind};

pub(super) fn install(rt: &mut Runtime) {
    let k = rt.classes.kernel.clone();
    def_private(&k, "puts", puts);
    def_private(&k, "print", print);
    def_private(&k, "p", p);
    def_private(&k, "gets", gets);
    def_private(&k, "raise", raise);
    def_private(&k, "fail", raise);
    def_private(&k, "loop", loop_);
    def_private(&k, "block_given?", block_given);
    def_private(&k, "proc", proc_);
    def_private(&k, "lambda", lambda);
    def_private(&k, "require", require);
    def_private(&k, "require_relative", require);
    def_private(&k, "Integer", to_integer);
    def_private(&k, "Float", to_float);
    def_private(&k, "String", to_string);
    def_private(&k, "Array", to_array);
    def_private(&k, "format", format);
    def_private(&k, "sprintf", format);
    def_private(&k, "printf", printf);
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
    let mut out = String::new();
    for a in args {
        out.push_str(&rt.to_s(a)?);
    }
    rt.write(&out);
    Ok(rt.nil())
}

fn p(rt: &mut Runtime, _recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let mut out = String::new();
    for a in args {
        out.push_str(&rt.inspect(a)?);
        out.push('\n');
    }
    rt.write(&out);
    Ok(match args.len() {
        0 => rt.nil(),
        1 => args[0].clone(),
        _ => rt.array(args.to_vec()),
    })
}

fn format(rt: &mut Runtime, _recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, usize::MAX)?;
    let fmt = expect_str(rt, &args[0])?;
    let text = super::string::sprintf(rt, &fmt, &args[1..])?;
    Ok(rt.str(text))
}

fn printf(rt: &mut Runtime, _recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, usize::MAX)?;
    let fmt = expect_str(rt, &args[0])?;
    let text = super::string::sprintf(rt, &fmt, &args[1..])?;
    rt.write(&text);
    Ok(rt.nil())
}

fn gets(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(match rt.read_line() {
        Some(mut line) => {
            line.push('\n');
            rt.str(line)
        }
        None => rt.nil(),
    })
}

/// `raise`, `raise "msg"`, `raise Class`, `raise Class, "msg"`, `raise exc`.
fn raise(rt: &mut Runtime, _recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 2)?;
    let exc = match args.first() {
        None => match rt.get_global("$!") {
            v if !v.is_nil() => v,
            _ => rt.exception(&rt.classes.runtime_error, "unhandled exception"),
        },
        Some(msg) if msg.as_str().is_some() => {
            let text = expect_str(rt, msg)?;
            rt.exception(&rt.classes.runtime_error, text)
        }
        Some(class) if class.is_class() => {
            let rest: Vec<Value> = args[1..].to_vec();
            rt.send(class, "new", &rest, None)?
        }
        Some(obj) if crate::core::dispatch::is_a(obj, &rt.classes.exception) => {
            if let Some(msg) = args.get(1) {
                obj.set_ivar("@message", msg.clone());
            }
            obj.clone()
        }
        Some(_) => return Err(rt.type_error("exception class/object expected")),
    };
    Err(Unwind::Raise(exc))
}

/// Calls the block until it breaks; a StopIteration ends the loop quietly.
fn loop_(rt: &mut Runtime, _recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    loop {
        match rt.call_block(blk, &[]) {
            Ok(_) => {}
            Err(Unwind::Raise(exc))
                if crate::core::dispatch::is_a(&exc, &rt.classes.stop_iteration) =>
            {
                return Ok(exc.ivar("@result").unwrap_or_else(|| rt.nil()));
            }
            Err(e) => return Err(e),
        }
    }
}

fn block_given(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(rt.block_given()))
}

fn proc_(rt: &mut Runtime, _recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    Ok(expect_block(rt, block)?.clone())
}

fn lambda(rt: &mut Runtime, _recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let blk = expect_block(rt, block)?;
    Ok(as_lambda(rt, blk))
}

/// A lambda sharing the block's code and environment.
pub(crate) fn as_lambda(rt: &Runtime, blk: &Value) -> Value {
    match blk.as_proc() {
        Some(ProcData {
            body: ProcBody::Compiled(code),
            lambda: false,
        }) => {
            let copy = crate::core::BlockCode {
                params: code.params.clone(),
                body: code.body.clone(),
                scope: code.scope.clone(),
                frame: code.frame.clone(),
                site: code.site,
            };
            Value::alloc(
                Some(&rt.classes.proc_class),
                Data::Proc(ProcData {
                    body: ProcBody::Compiled(copy),
                    lambda: true,
                }),
            )
        }
        _ => blk.clone(),
    }
}

fn require(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(false))
}

fn to_integer(rt: &mut Runtime, _recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 2)?;
    let v = &args[0];
    match v.data() {
        Data::Integer(_) => Ok(v.clone()),
        Data::Float(f) if f.is_finite() => Ok(super::float::float_to_int(rt, *f)),
        Data::Str(s) => {
            let text = s.borrow().trim().replace('_', "");
            match text.parse::<num_bigint::BigInt>() {
                Ok(i) => Ok(rt.integer(i)),
                Err(_) => Err(rt.arg_error(format!(
                    "invalid value for Integer(): {}",
                    crate::runtime::format::inspect_str(&s.borrow())
                ))),
            }
        }
        _ => Err(rt.type_error(format!(
            "can't convert {} into Integer",
            type_label(v)
        ))),
    }
}

fn to_float(rt: &mut Runtime, _recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let v = &args[0];
    if let Some(f) = rt.number(v) {
        return Ok(rt.float(f));
    }
    if let Some(s) = v.as_str() {
        if let Ok(f) = s.trim().replace('_', "").parse::<f64>() {
            return Ok(rt.float(f));
        }
        return Err(rt.arg_error(format!(
            "invalid value for Float(): {}",
            crate::runtime::format::inspect_str(&s)
        )));
    }
    Err(rt.type_error(format!("can't convert {} into Float", type_label(v))))
}

fn to_string(rt: &mut Runtime, _recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let s = rt.to_s(&args[0])?;
    Ok(rt.str(s))
}

fn to_array(rt: &mut Runtime, _recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let v = &args[0];
    if v.as_array().is_some() {
        return Ok(v.clone());
    }
    if v.is_nil() {
        return Ok(rt.array(Vec::new()));
    }
    if rt.respond_to(v, "to_a", false) {
        return rt.send(v, "to_a", &[], None);
    }
    Ok(rt.array(vec![v.clone()]))
}
