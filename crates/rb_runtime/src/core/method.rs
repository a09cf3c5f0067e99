//! Method definitions and parameter lists.

use std::rc::Rc;

use super::env::Scope;
use crate::Value;
use crate::errors::RbResult;
use crate::runtime::Runtime;

/// A builtin method: receiver, positional arguments, block.
pub type NativeFn = fn(&mut Runtime, &Value, &[Value], Option<&Value>) -> RbResult<Value>;

/// A builtin method that closes over data fixed at definition time
/// (`attr_reader :x` needs to know `x`).
pub type ClosureFn = dyn Fn(&mut Runtime, &Value, &[Value], Option<&Value>) -> RbResult<Value>;

/// One compiled routine. Runs against whatever frame and scope are current.
pub type Code = Rc<dyn Fn(&mut Runtime) -> RbResult<Value>>;

pub struct MethodDef {
    pub name: String,
    pub body: Callable,
    /// Declared by program text rather than installed by the runtime.
    pub source_defined: bool,
}

#[derive(Clone)]
pub enum Callable {
    Native(NativeFn),
    Closure(Rc<ClosureFn>),
    Compiled(Rc<CompiledMethod>),
    /// `define_method(:x) { ... }`: the proc runs with the receiver as self.
    Proc(Value),
}

pub struct CompiledMethod {
    pub params: Rc<Params>,
    pub body: Code,
    /// Scope the `def` executed in; callable lookup continues through it.
    pub scope: Option<Rc<Scope>>,
}

/// A positional parameter, either a plain name or a nested destructuring
/// pattern such as `|(a, b), c|`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pattern {
    Name(String),
    Nested(Vec<Pattern>),
}

/// Parameter list shared by methods, blocks and lambdas.
#[derive(Default)]
pub struct Params {
    pub required: Vec<Pattern>,
    /// Optional parameters with their default expressions, evaluated in the
    /// callee scope left to right.
    pub optional: Vec<(String, Code)>,
    pub rest: Option<String>,
    /// Anonymous `*` still absorbs arguments.
    pub anonymous_rest: bool,
    pub post: Vec<Pattern>,
    pub block: Option<String>,
    /// A block written `|a|` with a single `procarg0` does not auto-splat.
    pub single_arg: bool,
}

impl Params {
    pub fn required_count(&self) -> usize {
        self.required.len() + self.post.len()
    }

    pub fn has_rest(&self) -> bool {
        self.rest.is_some() || self.anonymous_rest
    }

    /// `Proc#arity` / `Method#arity` convention.
    pub fn arity(&self) -> i64 {
        let req = self.required_count() as i64;
        if self.has_rest() || !self.optional.is_empty() {
            -(req + 1)
        } else {
            req
        }
    }

    pub fn accepts(&self, argc: usize) -> bool {
        let req = self.required_count();
        argc >= req && (self.has_rest() || argc <= req + self.optional.len())
    }
}

impl MethodDef {
    pub fn native(name: &str, f: NativeFn) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            body: Callable::Native(f),
            source_defined: false,
        })
    }

    pub fn closure(name: &str, f: Rc<ClosureFn>) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            body: Callable::Closure(f),
            source_defined: false,
        })
    }

    pub fn compiled(name: &str, method: CompiledMethod) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            body: Callable::Compiled(Rc::new(method)),
            source_defined: true,
        })
    }

    /// Same body under another name, as `alias` produces.
    pub fn renamed(&self, name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            body: self.body.clone(),
            source_defined: self.source_defined,
        })
    }

    pub fn arity(&self) -> i64 {
        match &self.body {
            Callable::Compiled(m) => m.params.arity(),
            Callable::Proc(p) => p.as_proc().map(|p| p.arity()).unwrap_or(-1),
            _ => -1,
        }
    }
}
