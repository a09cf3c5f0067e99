//! Conversions and comparisons that builtins share.

use std::cmp::Ordering;
use std::hash::{BuildHasher, Hash, Hasher};

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use super::Runtime;
use super::format;
use crate::core::{Data, Value};
use crate::errors::RbResult;

impl Runtime {
    /// `to_s` as text. Strings short-circuit; anything else is dispatched.
    pub fn to_s(&mut self, v: &Value) -> RbResult<String> {
        if let Some(s) = v.as_str() {
            return Ok(s.clone());
        }
        let out = self.send(v, "to_s", &[], None)?;
        Ok(match out.as_str() {
            Some(s) => s.clone(),
            None => self.default_to_s(v),
        })
    }

    pub fn inspect(&mut self, v: &Value) -> RbResult<String> {
        let out = self.send(v, "inspect", &[], None)?;
        Ok(match out.as_str() {
            Some(s) => s.clone(),
            None => self.default_to_s(v),
        })
    }

    /// `#<Foo>`
    pub fn default_to_s(&self, v: &Value) -> String {
        format!("#<{}>", v.class_name())
    }

    /// Text of builtin scalar values without dispatch.
    pub fn builtin_to_s(&self, v: &Value) -> Option<String> {
        Some(match v.data() {
            Data::Nil => String::new(),
            Data::True => "true".to_string(),
            Data::False => "false".to_string(),
            Data::Integer(i) => format::int_to_s(i),
            Data::Float(f) => format::float_to_s(*f),
            Data::Str(s) => s.borrow().clone(),
            Data::Symbol(s) => s.to_string(),
            _ => return None,
        })
    }

    /// `==` with fast paths for builtin scalars.
    pub fn equals(&mut self, a: &Value, b: &Value) -> RbResult<bool> {
        if a.ptr_eq(b) {
            return Ok(true);
        }
        match (a.data(), b.data()) {
            (Data::Integer(x), Data::Integer(y)) => Ok(x == y),
            (Data::Float(x), Data::Float(y)) => Ok(x == y),
            (Data::Integer(x), Data::Float(y)) | (Data::Float(y), Data::Integer(x)) => {
                Ok(x.to_f64() == Some(*y))
            }
            (Data::Str(x), Data::Str(y)) => Ok(*x.borrow() == *y.borrow()),
            (Data::Symbol(x), Data::Symbol(y)) => Ok(x == y),
            (Data::Nil | Data::True | Data::False, _) => Ok(false),
            _ => {
                let r = self.send(a, "==", &[b.clone()], None)?;
                Ok(r.truthy())
            }
        }
    }

    /// Ordering through `<=>`. An incomparable pair raises ArgumentError.
    pub fn compare(&mut self, a: &Value, b: &Value) -> RbResult<Ordering> {
        let fast = match (a.data(), b.data()) {
            (Data::Integer(x), Data::Integer(y)) => Some(x.cmp(y)),
            (Data::Str(x), Data::Str(y)) => Some(x.borrow().as_str().cmp(y.borrow().as_str())),
            _ => match (self.number(a), self.number(b)) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        };
        if let Some(o) = fast {
            return Ok(o);
        }
        let r = self.send(a, "<=>", &[b.clone()], None)?;
        if let Some(n) = r.as_i64() {
            return Ok(n.cmp(&0));
        }
        let shown = self.inspect_or_class(b);
        Err(self.arg_error(format!("comparison of {} with {} failed", a.class_name(), shown)))
    }

    fn inspect_or_class(&mut self, v: &Value) -> String {
        match v.data() {
            Data::Integer(_) | Data::Float(_) | Data::Nil => {
                self.inspect(v).unwrap_or_else(|_| v.class_name())
            }
            _ => v.class_name(),
        }
    }

    /// Integer or Float as `f64`.
    pub fn number(&self, v: &Value) -> Option<f64> {
        match v.data() {
            Data::Integer(i) => i.to_f64(),
            Data::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// `===` as used by `case` and `rescue`.
    pub fn case_eq(&mut self, pattern: &Value, v: &Value) -> RbResult<bool> {
        let r = self.send(pattern, "===", &[v.clone()], None)?;
        Ok(r.truthy())
    }

    /// Elements of an Array, or the value alone.
    pub fn to_ary(&self, v: &Value) -> Vec<Value> {
        match v.as_array() {
            Some(a) => a.borrow().clone(),
            None => vec![v.clone()],
        }
    }

    /// Symbol or String argument as a name.
    pub fn name_of(&self, v: &Value) -> RbResult<String> {
        if let Some(s) = v.as_symbol() {
            return Ok(s.to_string());
        }
        if let Some(s) = v.as_str() {
            return Ok(s.clone());
        }
        Err(self.type_error(format!(
            "{} is not a symbol nor a string",
            self.builtin_to_s(v).unwrap_or_else(|| self.default_to_s(v))
        )))
    }

    /// Hash code agreeing with `eql?` on builtin values.
    pub fn hash_code(&self, v: &Value) -> i64 {
        let mut h = ahash::RandomState::with_seeds(0x5eed, 0x0b1e, 0xc7a5, 0x11).build_hasher();
        hash_into(v, &mut h);
        h.finish() as i64 >> 2
    }

    pub fn bigint(&self, v: &Value) -> Option<BigInt> {
        v.as_int().cloned()
    }
}

fn hash_into(v: &Value, h: &mut impl Hasher) {
    match v.data() {
        Data::Integer(i) => i.hash(h),
        Data::Float(f) => f.to_bits().hash(h),
        Data::Str(s) => s.borrow().hash(h),
        Data::Symbol(s) => {
            ':'.hash(h);
            s.hash(h);
        }
        Data::Nil => 0u8.hash(h),
        Data::True => 1u8.hash(h),
        Data::False => 2u8.hash(h),
        Data::Array(a) => {
            for item in a.borrow().iter() {
                hash_into(item, h);
            }
        }
        _ => v.object_id().hash(h),
    }
}
