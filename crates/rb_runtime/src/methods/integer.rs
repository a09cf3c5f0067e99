use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use super::common::*;
use super::float::float_mod;
use crate::Runtime;
use crate::core::{Data, Value};
use crate::errors::RbResult;
use crate::runtime::format;

pub(super) fn install(rt: &mut Runtime) {
    let c = rt.classes.integer.clone();
    def(&c, "+", add);
    def(&c, "-", sub);
    def(&c, "*", mul);
    def_all(&c, &["/", "div"], div);
    def_all(&c, &["%", "modulo"], modulo);
    def_all(&c, &["**", "pow"], pow);
    def(&c, "divmod", divmod);
    def(&c, "fdiv", fdiv);
    def(&c, "-@", neg);
    def(&c, "+@", itself);
    def(&c, "~", bit_not);
    def(&c, "&", bit_and);
    def(&c, "|", bit_or);
    def(&c, "^", bit_xor);
    def(&c, "<<", shl);
    def(&c, ">>", shr);
    def_all(&c, &["==", "==="], eq);
    def(&c, "eql?", eql);
    def(&c, "<=>", cmp);
    def(&c, "<", lt);
    def(&c, "<=", le);
    def(&c, ">", gt);
    def(&c, ">=", ge);
    def(&c, "times", times);
    def(&c, "upto", upto);
    def(&c, "downto", downto);
    def_all(&c, &["succ", "next"], succ);
    def(&c, "pred", pred);
    def_all(&c, &["abs", "magnitude"], abs);
    def(&c, "zero?", zero);
    def(&c, "positive?", positive);
    def(&c, "negative?", negative);
    def(&c, "even?", even);
    def(&c, "odd?", odd);
    def(&c, "integer?", integer_p);
    def_all(&c, &["to_i", "to_int", "floor", "ceil", "round", "truncate"], itself);
    def(&c, "to_f", to_f);
    def(&c, "to_s", to_s);
    def(&c, "inspect", to_s);
    def(&c, "chr", chr);
    def(&c, "hash", hash);
    def(&c, "gcd", gcd);
    def(&c, "lcm", lcm);
    def(&c, "digits", digits);
    def(&c, "bit_length", bit_length);
}

fn int(v: &Value) -> &BigInt {
    static ZERO: std::sync::OnceLock<BigInt> = std::sync::OnceLock::new();
    v.as_int().unwrap_or_else(|| ZERO.get_or_init(BigInt::zero))
}

/// Integer argument, or the Float it should be promoted with.
enum Operand {
    Int(BigInt),
    Float(f64),
}

fn operand(rt: &Runtime, v: &Value) -> RbResult<Operand> {
    match v.data() {
        Data::Integer(i) => Ok(Operand::Int(i.clone())),
        Data::Float(f) => Ok(Operand::Float(*f)),
        _ => Err(rt.type_error(format!(
            "{} can't be coerced into Integer",
            type_label(v)
        ))),
    }
}

fn to_f64(i: &BigInt) -> f64 {
    i.to_f64().unwrap_or(f64::NAN)
}

/// Quotient and remainder rounded toward negative infinity.
pub(crate) fn floor_divmod(a: &BigInt, b: &BigInt) -> (BigInt, BigInt) {
    let mut q = a / b;
    let mut r = a % b;
    if !r.is_zero() && (r.is_negative() != b.is_negative()) {
        q -= 1;
        r += b;
    }
    (q, r)
}

fn add(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(match operand(rt, &args[0])? {
        Operand::Int(b) => rt.integer(int(recv) + b),
        Operand::Float(f) => rt.float(to_f64(int(recv)) + f),
    })
}

fn sub(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(match operand(rt, &args[0])? {
        Operand::Int(b) => rt.integer(int(recv) - b),
        Operand::Float(f) => rt.float(to_f64(int(recv)) - f),
    })
}

fn mul(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(match operand(rt, &args[0])? {
        Operand::Int(b) => rt.integer(int(recv) * b),
        Operand::Float(f) => rt.float(to_f64(int(recv)) * f),
    })
}

fn div(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    match operand(rt, &args[0])? {
        Operand::Int(b) if b.is_zero() => Err(rt.zero_division()),
        Operand::Int(b) => Ok(rt.integer(floor_divmod(int(recv), &b).0)),
        Operand::Float(f) => Ok(rt.float(to_f64(int(recv)) / f)),
    }
}

fn modulo(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    match operand(rt, &args[0])? {
        Operand::Int(b) if b.is_zero() => Err(rt.zero_division()),
        Operand::Int(b) => Ok(rt.integer(floor_divmod(int(recv), &b).1)),
        Operand::Float(f) => Ok(rt.float(float_mod(to_f64(int(recv)), f))),
    }
}

fn divmod(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    match operand(rt, &args[0])? {
        Operand::Int(b) if b.is_zero() => Err(rt.zero_division()),
        Operand::Int(b) => {
            let (q, r) = floor_divmod(int(recv), &b);
            Ok(rt.array(vec![rt.integer(q), rt.integer(r)]))
        }
        Operand::Float(f) => {
            let a = to_f64(int(recv));
            let q = (a / f).floor();
            Ok(rt.array(vec![rt.float(q), rt.float(float_mod(a, f))]))
        }
    }
}

fn fdiv(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let b = match operand(rt, &args[0])? {
        Operand::Int(b) => to_f64(&b),
        Operand::Float(f) => f,
    };
    Ok(rt.float(to_f64(int(recv)) / b))
}

/// Negative integer exponents produce a Float.
fn pow(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let base = int(recv);
    match operand(rt, &args[0])? {
        Operand::Int(e) if e.is_negative() => Ok(rt.float(to_f64(base).powf(to_f64(&e)))),
        Operand::Int(e) => match e.to_u32() {
            Some(e) => Ok(rt.integer(base.pow(e))),
            None => Ok(rt.float(f64::INFINITY)),
        },
        Operand::Float(f) => Ok(rt.float(to_f64(base).powf(f))),
    }
}

fn neg(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.integer(-int(recv)))
}

fn itself(_rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(recv.clone())
}

fn bit_not(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.integer(-int(recv) - 1))
}

fn int_arg(rt: &Runtime, args: &[Value]) -> RbResult<BigInt> {
    validate_arity(rt, args.len(), 1, 1)?;
    expect_int(rt, &args[0])
}

fn bit_and(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let b = int_arg(rt, args)?;
    Ok(rt.integer(int(recv) & b))
}

fn bit_or(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let b = int_arg(rt, args)?;
    Ok(rt.integer(int(recv) | b))
}

fn bit_xor(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let b = int_arg(rt, args)?;
    Ok(rt.integer(int(recv) ^ b))
}

fn shift(rt: &Runtime, recv: &Value, by: i64) -> Value {
    let a = int(recv);
    if by >= 0 {
        rt.integer(a << (by as usize))
    } else {
        rt.integer(a >> (by.unsigned_abs() as usize))
    }
}

fn shl(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let by = expect_i64(rt, &args[0])?;
    Ok(shift(rt, recv, by))
}

fn shr(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let by = expect_i64(rt, &args[0])?;
    Ok(shift(rt, recv, -by))
}

/// Ordering against an Integer or Float; `None` for anything else or NaN.
fn num_cmp(recv: &Value, other: &Value) -> Option<Ordering> {
    let a = int(recv);
    match other.data() {
        Data::Integer(b) => Some(a.cmp(b)),
        Data::Float(f) => to_f64(a).partial_cmp(f),
        _ => None,
    }
}

fn eq(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    if args[0].as_int().is_none() && args[0].as_f64().is_none() {
        let r = rt.send(&args[0], "==", &[recv.clone()], None)?;
        return Ok(rt.bool(r.truthy()));
    }
    Ok(rt.bool(num_cmp(recv, &args[0]) == Some(Ordering::Equal)))
}

fn eql(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(rt.bool(args[0].as_int() == Some(int(recv))))
}

fn cmp(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    Ok(match num_cmp(recv, &args[0]) {
        Some(o) => rt.int(o as i64),
        None => rt.nil(),
    })
}

fn relate(rt: &Runtime, recv: &Value, args: &[Value], test: fn(Ordering) -> bool) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    match num_cmp(recv, &args[0]) {
        Some(o) => Ok(rt.bool(test(o))),
        None if args[0].as_f64().is_some() => Ok(rt.bool(false)),
        None => Err(rt.arg_error(format!(
            "comparison of Integer with {} failed",
            match args[0].data() {
                Data::Nil => "nil".to_string(),
                _ => args[0].class_name(),
            }
        ))),
    }
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

/// Yields each of `from..=to` stepping by `step`. Without a block the values
/// are returned as an Array.
fn count_through(
    rt: &mut Runtime,
    from: i64,
    to: i64,
    step: i64,
    block: Option<&Value>,
) -> RbResult<Option<Vec<Value>>> {
    let mut i = from;
    let mut collected = block.is_none().then(Vec::new);
    while (step > 0 && i <= to) || (step < 0 && i >= to) {
        let v = rt.int(i);
        match (&mut collected, block) {
            (Some(out), _) => out.push(v),
            (None, Some(blk)) => {
                rt.call_block(blk, &[v])?;
            }
            (None, None) => {}
        }
        match i.checked_add(step) {
            Some(next) => i = next,
            None => break,
        }
    }
    Ok(collected)
}

fn times(rt: &mut Runtime, recv: &Value, _args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    let n = expect_i64(rt, recv)?;
    match count_through(rt, 0, n.saturating_sub(1), 1, block)? {
        Some(items) => Ok(rt.array(items)),
        None => Ok(recv.clone()),
    }
}

fn upto(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let from = expect_i64(rt, recv)?;
    let to = expect_i64(rt, &args[0])?;
    match count_through(rt, from, to, 1, block)? {
        Some(items) => Ok(rt.array(items)),
        None => Ok(recv.clone()),
    }
}

fn downto(rt: &mut Runtime, recv: &Value, args: &[Value], block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 1, 1)?;
    let from = expect_i64(rt, recv)?;
    let to = expect_i64(rt, &args[0])?;
    match count_through(rt, from, to, -1, block)? {
        Some(items) => Ok(rt.array(items)),
        None => Ok(recv.clone()),
    }
}

fn succ(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.integer(int(recv) + 1))
}

fn pred(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.integer(int(recv) - 1))
}

fn abs(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.integer(int(recv).abs()))
}

fn zero(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(int(recv).is_zero()))
}

fn positive(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(int(recv).is_positive()))
}

fn negative(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(int(recv).is_negative()))
}

fn even(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool((int(recv) % 2u32).is_zero()))
}

fn odd(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(!(int(recv) % 2u32).is_zero()))
}

fn integer_p(rt: &mut Runtime, _recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.bool(true))
}

fn to_f(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.float(to_f64(int(recv))))
}

/// `to_s` with an optional radix in `2..=36`.
fn to_s(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    validate_arity(rt, args.len(), 0, 1)?;
    let text = match args.first() {
        None => format::int_to_s(int(recv)),
        Some(r) => {
            let radix = expect_i64(rt, r)?;
            if !(2..=36).contains(&radix) {
                return Err(rt.arg_error(format!("invalid radix {radix}")));
            }
            int(recv).to_str_radix(radix as u32)
        }
    };
    Ok(rt.str(text))
}

fn chr(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let c = int(recv)
        .to_u32()
        .and_then(char::from_u32)
        .ok_or_else(|| rt.error(&rt.classes.argument_error, format!("{} out of char range", int(recv))))?;
    Ok(rt.str(c.to_string()))
}

fn hash(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    Ok(rt.int(rt.hash_code(recv)))
}

fn euclid(a: &BigInt, b: &BigInt) -> BigInt {
    let (mut a, mut b) = (a.abs(), b.abs());
    while !b.is_zero() {
        let r = &a % &b;
        a = std::mem::replace(&mut b, r);
    }
    a
}

fn gcd(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let b = int_arg(rt, args)?;
    Ok(rt.integer(euclid(int(recv), &b)))
}

fn lcm(rt: &mut Runtime, recv: &Value, args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let b = int_arg(rt, args)?;
    let a = int(recv);
    if a.is_zero() || b.is_zero() {
        return Ok(rt.int(0));
    }
    let g = euclid(a, &b);
    Ok(rt.integer((a * &b).abs() / g))
}

/// Base-10 digits, least significant first.
fn digits(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let a = int(recv);
    if a.is_negative() {
        return Err(rt.error(&rt.classes.argument_error, "out of domain"));
    }
    let text = a.to_str_radix(10);
    let items = text
        .bytes()
        .rev()
        .map(|b| rt.int(i64::from(b - b'0')))
        .collect();
    Ok(rt.array(items))
}

fn bit_length(rt: &mut Runtime, recv: &Value, _args: &[Value], _block: Option<&Value>) -> RbResult<Value> {
    let a = int(recv);
    let bits = if a.is_negative() { (-a - 1u32).bits() } else { a.bits() };
    Ok(rt.int(bits as i64))
}
