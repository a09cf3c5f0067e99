//! Lexical scopes and call frames.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::class::Visibility;
use super::dispatch::Holder;
use super::method::MethodDef;
use super::value::{OrderedMap, Value, ordered_map_new};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Top,
    Method,
    Block,
    ClassBody,
}

/// A callable bound in a scope by a receiver-less `def`, waiting for the
/// enclosing class body to promote it.
#[derive(Clone)]
pub struct PendingMethod {
    pub def: Rc<MethodDef>,
    pub visibility: Visibility,
}

/// One local-variable scope. Block scopes see through to their parent;
/// method, class-body and top scopes are variable boundaries.
pub struct Scope {
    pub kind: ScopeKind,
    parent: Option<Rc<Scope>>,
    vars: RefCell<OrderedMap<Value>>,
    methods: RefCell<OrderedMap<PendingMethod>>,
}

impl Scope {
    pub fn new(kind: ScopeKind, parent: Option<Rc<Scope>>) -> Rc<Self> {
        Rc::new(Self {
            kind,
            parent,
            vars: RefCell::new(ordered_map_new()),
            methods: RefCell::new(ordered_map_new()),
        })
    }

    pub fn top() -> Rc<Self> {
        Self::new(ScopeKind::Top, None)
    }

    pub fn parent(&self) -> Option<&Rc<Scope>> {
        self.parent.as_ref()
    }

    /// Scope holding `name`, searching outward through block scopes only.
    fn holder_of(self: &Rc<Self>, name: &str) -> Option<Rc<Scope>> {
        let mut cur = Some(self.clone());
        while let Some(scope) = cur {
            if scope.vars.borrow().contains_key(name) {
                return Some(scope);
            }
            if scope.kind != ScopeKind::Block {
                return None;
            }
            cur = scope.parent.clone();
        }
        None
    }

    pub fn get(self: &Rc<Self>, name: &str) -> Option<Value> {
        self.holder_of(name)
            .and_then(|s| s.vars.borrow().get(name).cloned())
    }

    pub fn is_defined(self: &Rc<Self>, name: &str) -> bool {
        self.holder_of(name).is_some()
    }

    /// Rebinds an existing visible variable, or creates it here.
    pub fn set(self: &Rc<Self>, name: &str, value: Value) {
        let target = self.holder_of(name).unwrap_or_else(|| self.clone());
        target.vars.borrow_mut().insert(name.to_string(), value);
    }

    /// Binds `name` in this scope, shadowing any outer variable.
    pub fn declare(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    pub fn local_names(self: &Rc<Self>) -> Vec<String> {
        let mut out = Vec::new();
        let mut cur = Some(self.clone());
        while let Some(scope) = cur {
            for k in scope.vars.borrow().keys() {
                if !out.contains(k) {
                    out.push(k.clone());
                }
            }
            if scope.kind != ScopeKind::Block {
                break;
            }
            cur = scope.parent.clone();
        }
        out
    }

    pub fn define_method(&self, name: &str, pending: PendingMethod) {
        self.methods.borrow_mut().insert(name.to_string(), pending);
    }

    /// Callable bound in this scope or any enclosing one.
    pub fn find_method(self: &Rc<Self>, name: &str) -> Option<Rc<MethodDef>> {
        let mut cur = Some(self.clone());
        while let Some(scope) = cur {
            if let Some(p) = scope.methods.borrow().get(name) {
                return Some(p.def.clone());
            }
            cur = scope.parent.clone();
        }
        None
    }

    /// Callable bound directly in this scope.
    pub fn pending(&self, name: &str) -> Option<PendingMethod> {
        self.methods.borrow().get(name).cloned()
    }

    pub fn pending_visibility(&self, name: &str, vis: Visibility) -> bool {
        match self.methods.borrow_mut().get_mut(name) {
            Some(p) => {
                p.visibility = vis;
                true
            }
            None => false,
        }
    }

    /// Removes and returns every callable bound directly in this scope.
    pub fn take_methods(&self) -> Vec<(String, PendingMethod)> {
        self.methods.borrow_mut().drain(..).collect()
    }
}

pub struct MethodInfo {
    pub name: String,
    /// Where the running definition was found; `super` resumes after it.
    pub owner: Holder,
}

/// One method invocation.
pub struct Activation {
    pub id: u64,
    pub method: Option<MethodInfo>,
    pub args: Vec<Value>,
    pub block: Option<Value>,
}

/// Current self plus the activation it belongs to. Blocks capture and
/// restore the whole frame.
#[derive(Clone)]
pub struct Frame {
    pub slf: Value,
    pub activation: Option<Rc<Activation>>,
    /// Default visibility for `def`s in a class body.
    pub visibility: Rc<Cell<Visibility>>,
    /// Set while a lambda body runs; `return` targets it first.
    pub lambda: Option<u64>,
}

impl Frame {
    pub fn new(slf: Value, activation: Option<Rc<Activation>>) -> Self {
        Self {
            slf,
            activation,
            visibility: Rc::new(Cell::new(Visibility::Public)),
            lambda: None,
        }
    }

    pub fn block(&self) -> Option<&Value> {
        self.activation.as_ref().and_then(|a| a.block.as_ref())
    }

    /// Activation id a `return` in this frame unwinds to.
    pub fn return_target(&self) -> Option<u64> {
        self.lambda.or_else(|| self.activation.as_ref().map(|a| a.id))
    }
}
