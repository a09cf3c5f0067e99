//! Method resolution.
//!
//! For a receiver `r` the holders are visited in this order:
//!
//! 1. `r`'s own tables (public, then protected and private when the caller
//!    context allows them),
//! 2. each module `r` was extended with, in list order, with that module's
//!    own included modules after it (public methods only),
//! 3. when `r` is a class, steps 1 and 2 again for its base, up to the root,
//! 4. the instance-method chain of `r`'s class: the class, its included
//!    modules (most recent first), then its base, up to the root.
//!
//! Class-level methods therefore reach subclasses through step 3 but never
//! reach instances.

use std::ops::ControlFlow;
use std::rc::Rc;

use tracing::trace;

use super::class::{MethodTables, Visibility};
use super::method::MethodDef;
use super::value::Value;

/// Which private/protected entries a send may see.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallerContext {
    pub private: bool,
    pub protected: bool,
}

impl CallerContext {
    pub const PUBLIC: Self = Self {
        private: false,
        protected: false,
    };
    pub const ALL: Self = Self {
        private: true,
        protected: true,
    };

    pub fn allows(self, vis: Visibility) -> bool {
        match vis {
            Visibility::Public => true,
            Visibility::Protected => self.protected,
            Visibility::Private => self.private,
        }
    }
}

/// A method table in the lookup chain.
#[derive(Clone, Debug)]
pub enum Holder {
    /// The object's own (singleton) tables.
    Own(Value),
    /// The instance-method tables of a class or module.
    Instance(Value),
}

impl Holder {
    pub fn value(&self) -> &Value {
        match self {
            Holder::Own(v) | Holder::Instance(v) => v,
        }
    }

    pub fn same(&self, other: &Holder) -> bool {
        match (self, other) {
            (Holder::Own(a), Holder::Own(b)) | (Holder::Instance(a), Holder::Instance(b)) => {
                a.ptr_eq(b)
            }
            _ => false,
        }
    }

    fn with_tables<T>(&self, f: impl FnOnce(&MethodTables) -> T) -> Option<T> {
        match self {
            Holder::Own(v) => Some(f(&v.own_methods())),
            Holder::Instance(v) => v.as_class().map(|c| f(&c.instance_methods())),
        }
    }
}

pub struct Resolved {
    pub def: Rc<MethodDef>,
    pub holder: Holder,
    pub visibility: Visibility,
}

/// Outcome of a lookup that found nothing callable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Miss {
    Undefined,
    /// Present, but not visible to this caller.
    Hidden(Visibility),
}

/// The chain ran past the root without a hit. Never leaves this module.
struct Exhausted;

/// A holder as seen by the walk; `extended` entries only expose public methods.
struct Step<'a> {
    holder: &'a Holder,
    extended: bool,
}

type Visitor<'f, T> = dyn FnMut(Step<'_>) -> ControlFlow<T> + 'f;

fn walk<T>(recv: &Value, f: &mut Visitor<'_, T>) -> Result<T, Exhausted> {
    match walk_object(recv, f) {
        ControlFlow::Break(t) => Ok(t),
        ControlFlow::Continue(()) => Err(Exhausted),
    }
}

fn walk_object<T>(recv: &Value, f: &mut Visitor<'_, T>) -> ControlFlow<T> {
    let mut cur = Some(recv.clone());
    while let Some(obj) = cur {
        f(Step {
            holder: &Holder::Own(obj.clone()),
            extended: false,
        })?;
        let extended: Vec<Value> = obj.extended().clone();
        for m in &extended {
            walk_module(m, true, f)?;
        }
        cur = if obj.is_class() {
            obj.as_class().and_then(|c| c.base().cloned())
        } else {
            None
        };
    }
    walk_instances(&recv.class(), f)
}

fn walk_module<T>(module: &Value, extended: bool, f: &mut Visitor<'_, T>) -> ControlFlow<T> {
    f(Step {
        holder: &Holder::Instance(module.clone()),
        extended,
    })?;
    let included: Vec<Value> = match module.as_class() {
        Some(c) => c.included().clone(),
        None => Vec::new(),
    };
    for m in included.iter().rev() {
        walk_module(m, extended, f)?;
    }
    ControlFlow::Continue(())
}

fn walk_instances<T>(class: &Value, f: &mut Visitor<'_, T>) -> ControlFlow<T> {
    let mut cur = Some(class.clone());
    while let Some(c) = cur {
        walk_module(&c, false, f)?;
        cur = c.as_class().and_then(|d| d.base().cloned());
    }
    ControlFlow::Continue(())
}

fn probe(step: &Step<'_>, name: &str, ctx: CallerContext, hidden: &mut Option<Visibility>) -> ControlFlow<Resolved> {
    let hit = step.holder.with_tables(|t| t.lookup(name)).flatten();
    match hit {
        Some((def, vis)) if ctx.allows(vis) && !(step.extended && vis != Visibility::Public) => {
            ControlFlow::Break(Resolved {
                def,
                holder: step.holder.clone(),
                visibility: vis,
            })
        }
        Some((_, vis)) => {
            hidden.get_or_insert(vis);
            ControlFlow::Continue(())
        }
        None => ControlFlow::Continue(()),
    }
}

/// Resolves `name` on `recv` for a caller with context `ctx`.
pub fn find_method(recv: &Value, name: &str, ctx: CallerContext) -> Result<Resolved, Miss> {
    let mut hidden = None;
    let found = walk(recv, &mut |step| probe(&step, name, ctx, &mut hidden));
    found.map_err(|Exhausted| {
        trace!(method = name, "method resolution exhausted the chain");
        match hidden {
            Some(vis) => Miss::Hidden(vis),
            None => Miss::Undefined,
        }
    })
}

/// Next definition of `name` after `after` in `recv`'s chain, any visibility.
pub fn find_super_method(recv: &Value, name: &str, after: &Holder) -> Option<Resolved> {
    let mut passed = false;
    let mut hidden = None;
    walk(recv, &mut |step| {
        if !passed {
            passed = step.holder.same(after);
            return ControlFlow::Continue(());
        }
        probe(&step, name, CallerContext::ALL, &mut hidden)
    })
    .ok()
}

/// Only the receiver's own three tables: no modules, no base.
pub fn has_method(recv: &Value, name: &str) -> bool {
    recv.own_methods().contains(name)
}

/// True when `recv` resolves `name` under `ctx`.
pub fn responds_to(recv: &Value, name: &str, ctx: CallerContext) -> bool {
    find_method(recv, name, ctx).is_ok()
}

/// Class and modules in instance lookup order, starting at `class`.
pub fn ancestors(class: &Value) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    let _ = walk_instances::<()>(class, &mut |step| {
        let v = step.holder.value();
        if !out.iter().any(|o| o.ptr_eq(v)) {
            out.push(v.clone());
        }
        ControlFlow::Continue(())
    });
    out
}

/// `is_a?`: `module` appears in the class chain of `obj` or among the
/// modules `obj` itself was extended with.
pub fn is_a(obj: &Value, module: &Value) -> bool {
    if obj
        .extended()
        .iter()
        .any(|m| m.ptr_eq(module) || ancestors(m).iter().any(|a| a.ptr_eq(module)))
    {
        return true;
    }
    ancestors(&obj.class()).iter().any(|a| a.ptr_eq(module))
}

/// `a <= b` on classes and modules.
pub fn inherits(a: &Value, b: &Value) -> bool {
    ancestors(a).iter().any(|x| x.ptr_eq(b))
}

/// Names reachable from `recv` under `ctx`, in first-seen order.
pub fn method_names(recv: &Value, ctx: CallerContext) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let _ = walk::<()>(recv, &mut |step| {
        let names = step
            .holder
            .with_tables(|t| {
                let mut v = t.names(Visibility::Public);
                if ctx.protected && !step.extended {
                    v.extend(t.names(Visibility::Protected));
                }
                if ctx.private && !step.extended {
                    v.extend(t.names(Visibility::Private));
                }
                v
            })
            .unwrap_or_default();
        for n in names {
            if !out.contains(&n) {
                out.push(n);
            }
        }
        ControlFlow::Continue(())
    });
    out
}

/// Instance methods of `class` and its ancestors visible under `vis`.
pub fn instance_method_names(class: &Value, inherited: bool, vis: &[Visibility]) -> Vec<String> {
    let chain = if inherited { ancestors(class) } else { vec![class.clone()] };
    let mut out: Vec<String> = Vec::new();
    for c in &chain {
        if let Some(data) = c.as_class() {
            let tables = data.instance_methods();
            for v in vis {
                for n in tables.names(*v) {
                    if !out.contains(&n) {
                        out.push(n);
                    }
                }
            }
        }
    }
    out
}

/// Definition of instance method `name` on `class` or its ancestors, for
/// `method_defined?` and `alias_method`.
pub fn find_instance_method(class: &Value, name: &str) -> Option<(Rc<MethodDef>, Visibility)> {
    ancestors(class)
        .iter()
        .find_map(|c| c.as_class().and_then(|d| d.instance_methods().lookup(name)))
}
