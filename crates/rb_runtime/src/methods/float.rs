use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};

use super::common::*;
use crate::Runtime;
use crate::core::{Data, Value};
use crate::errors::RbResult;
use crate::runtime::format;

pub(super) fn install(rt: &mut Runtime) {
    let c = rt.classes.float.clone();
    def(&c, "+", add);
    def(&c, "-", sub);
    def(&c, "*", mul);
    def(&c, "/", div);
    def_all(&c, &["%", "modulo"], modulo);
    def_all(&c, &["**", "pow"], pow);
    def(&c, "divmod", divmod);
    def(&c, "-@", neg);
    def(&c, "+@", itself);
    def_all(&c, &["==", "==="], eq);
    def(&c, "eql?", eql);
    def(&c, "<=>", cmp);
    def(&c, "<", lt);
    def(&c, "<=", le);
    def(&c, ">", gt);
    def(&c, ">=", ge);
    def_all(&c, &["to_i", "to_int", "truncate"], to_i);
    def(&c, "to_f", itself);
    def(&c, "floor", floor);
    def(&c, "ceil", ceil);
    def(&c, "round", round);
    def_all(&c, &["abs", "magnitude"], abs);
    def(&c, "nan?", nan);
    def(&c, "infinite?", infinite);
    def(&c, "finite?", finite);
    def(&c, "zero?", zero);
    def(&c, "positive?", positive);
    def(&c, "negative?", negative);
    def_all(&c, &["to_s", "inspect"], to_s);
    def(&c, "hash", hash);

    if let Some(data) = c.as_class() {
        data.const_set("INFINITY", rt.float(f64::INFINITY));
        data.const_set("NAN", rt.float(f64::NAN));
        data.const_set("EPSILON", rt.float(f64::EPSILON));
        data.const_set("MAX", rt.float(f64::MAX));
        data.const_set("MIN", rt.float(f64::MIN_POSITIVE));
    }
}

fn float(v: &Value) -> f64 {
    v.as_f64().unwrap_or(f64::NAN)
}

/// Truncates toward zero. Non-finite input maps to 0.
pub(crate) fn float_to_int(rt: &Runtime, f: f64) -> Value {
    match f.trunc().to_i64() {
        Some(i) => rt.int(i),
        None => rt.integer(BigInt::from_f64(f.trunc()).unwrap_or_default()),
    }
}

/// `%` with the sign of the divisor.
pub(crate) fn float_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r }
}

fn other(rt: &Runtime, v: &Value) -> RbResult<f64> {
    match v.data() {
        Data::Float(f) => Ok(*f),
        Data::Integer(i) => Ok(i.to_f64().unwrap_or(f64::NAN)),
        _ => Err(rt.type_error(format!(
            "{} can't be coerced into Float",
            type_label(v)
        ))),
    }
}

fn binary(rt: &Runtime, recv: &Value, args: &[Value], op: fn(f64, f64) -> f64) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let b = other(rt, &args[0])?;
    Ok(rt.float(op(float(recv), b)))
}

fn add(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    binary(rt, recv, args, |a, b| a + b)
}

fn sub(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    binary(rt, recv, args, |a, b| a - b)
}

fn mul(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    binary(rt, recv, args, |a, b| a * b)
}

fn div(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    binary(rt, recv, args, |a, b| a / b)
}

fn modulo(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    binary(rt, recv, args, float_mod)
}

fn pow(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    binary(rt, recv, args, f64::powf)
}

fn divmod(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let (a, b) = (float(recv), other(rt, &args[0])?);
    if b == 0.0 {
        return Err(rt.zero_division());
    }
    let q = float_to_int(rt, (a / b).floor());
    Ok(rt.array(vec![q, rt.float(float_mod(a, b))]))
}

fn neg(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.float(-float(recv)))
}

fn itself(_rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(recv.clone())
}

fn partial(recv: &Value, v: &Value) -> Option<Ordering> {
    let a = float(recv);
    match v.data() {
        Data::Float(b) => a.partial_cmp(b),
        Data::Integer(i) => a.partial_cmp(&i.to_f64()?),
        _ => None,
    }
}

fn eq(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(rt.bool(partial(recv, &args[0]) == Some(Ordering::Equal)))
}

fn eql(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(rt.bool(args[0].as_f64() == Some(float(recv))))
}

fn cmp(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(match partial(recv, &args[0]) {
        Some(o) => rt.int(o as i64),
        None => rt.nil(),
    })
}

fn relate(rt: &Runtime, recv: &Value, args: &[Value], test: fn(Ordering) -> bool) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    if rt.number(&args[0]).is_none() {
        return Err(rt.arg_error(format!(
            "comparison of Float with {} failed",
            type_label(&args[0])
        )));
    }
    Ok(rt.bool(partial(recv, &args[0]).is_some_and(test)))
}

fn lt(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    relate(rt, recv, args, Ordering::is_lt)
}

fn le(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    relate(rt, recv, args, Ordering::is_le)
}

fn gt(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    relate(rt, recv, args, Ordering::is_gt)
}

fn ge(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    relate(rt, recv, args, Ordering::is_ge)
}

fn check_finite(rt: &Runtime, f: f64) -> RbResult<()> {
    if f.is_nan() {
        return Err(rt.error(&rt.classes.argument_error, "NaN"));
    }
    if f.is_infinite() {
        let text = if f > 0.0 { "Infinity" } else { "-Infinity" };
        return Err(rt.error(&rt.classes.argument_error, text));
    }
    Ok(())
}

fn to_i(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let f = float(recv);
    check_finite(rt, f)?;
    Ok(float_to_int(rt, f))
}

/// `floor` / `ceil` / `round` with an optional digit count. Positive digit
/// counts keep a Float, otherwise the result is an Integer.
fn rounded(rt: &Runtime, recv: &Value, args: &[Value], op: fn(f64) -> f64) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let f = float(recv);
    let digits = match args.first() {
        Some(d) => expect_i64(rt, d)?,
        None => 0,
    };
    if digits > 0 {
        let scale = 10f64.powi(digits.min(300) as i32);
        return Ok(rt.float(op(f * scale) / scale));
    }
    check_finite(rt, f)?;
    let scale = 10f64.powi(digits.saturating_neg().min(300) as i32);
    Ok(float_to_int(rt, op(f / scale) * scale))
}

fn floor(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    rounded(rt, recv, args, f64::floor)
}

fn ceil(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    rounded(rt, recv, args, f64::ceil)
}

/// Half away from zero, as `f64::round` does.
fn round(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    rounded(rt, recv, args, f64::round)
}

fn abs(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.float(float(recv).abs()))
}

fn nan(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(float(recv).is_nan()))
}

/// `1`, `-1` or nil.
fn infinite(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let f = float(recv);
    Ok(if f.is_infinite() {
        rt.int(if f > 0.0 { 1 } else { -1 })
    } else {
        rt.nil()
    })
}

fn finite(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(float(recv).is_finite()))
}

fn zero(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(float(recv) == 0.0))
}

fn positive(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(float(recv) > 0.0))
}

fn negative(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(float(recv) < 0.0))
}

fn to_s(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.str(format::float_to_s(float(recv))))
}

fn hash(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.int(rt.hash_code(recv)))
}
