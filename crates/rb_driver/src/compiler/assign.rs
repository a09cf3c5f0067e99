//! Assignment targets: `masgn`, `op_asgn`, `||=` and `&&=`, plus the
//! value-less target forms used by `for` and `rescue => e`.

use std::rc::Rc;

use rb_ir::{Node, NodeTag};
use rb_runtime::{Code, RbResult, Runtime, Unwind, Value};

use super::calls::{Elem, Values, eval_elems};
use super::vars::ConstScope;
use super::{CResult, Compiler, code, name_at, node_at};
use crate::error::CompileError;

/// Stores a value computed elsewhere into one target.
pub(super) type Writer = Rc<dyn Fn(&mut Runtime, Value) -> RbResult<()>>;

fn writer_fn(f: impl Fn(&mut Runtime, Value) -> RbResult<()> + 'static) -> Writer {
    Rc::new(f)
}

/// Right-hand side of a destructuring assignment as a list.
fn destructure(rt: &mut Runtime, v: Value) -> RbResult<Vec<Value>> {
    if let Some(items) = v.as_array() {
        return Ok(items.borrow().clone());
    }
    if !v.is_nil() && rt.respond_to(&v, "to_ary", true) {
        let a = rt.send(&v, "to_ary", &[], None)?;
        if let Some(items) = a.as_array() {
            return Ok(items.borrow().clone());
        }
    }
    Ok(vec![v])
}

fn setter_name(name: &str) -> String {
    if name.ends_with('=') {
        name.to_string()
    } else {
        format!("{name}=")
    }
}

/// Receiver of an attribute target; `None` in the tree means self.
fn eval_recv(rt: &mut Runtime, recv: &Option<Code>) -> RbResult<Value> {
    match recv {
        Some(c) => c(rt),
        None => Ok(rt.self_value()),
    }
}

enum Slot {
    One(Writer),
    /// `*rest`, or a bare `*` that discards.
    Rest(Option<Writer>),
}

/// A readable and writable location for the read-modify-write forms.
enum Place {
    Local(String),
    Ivar(String),
    Gvar(String),
    Cvar(String),
    Const(ConstScope, String),
    Attr {
        recv: Option<Code>,
        reader: String,
        setter: String,
        safe: bool,
    },
    Index {
        recv: Code,
        args: Rc<[Elem]>,
    },
}

/// Receiver and indexes evaluated once per assignment.
enum Bound {
    Plain,
    Attr(Value),
    Index(Value, Values),
}

impl Place {
    /// `None` when a safe-navigation receiver is nil.
    fn bind(&self, rt: &mut Runtime) -> RbResult<Option<Bound>> {
        match self {
            Place::Attr { recv, safe, .. } => {
                let r = eval_recv(rt, recv)?;
                if *safe && r.is_nil() {
                    return Ok(None);
                }
                Ok(Some(Bound::Attr(r)))
            }
            Place::Index { recv, args } => {
                let r = recv(rt)?;
                let argv = eval_elems(rt, args)?;
                Ok(Some(Bound::Index(r, argv)))
            }
            _ => Ok(Some(Bound::Plain)),
        }
    }

    fn read(&self, rt: &mut Runtime, b: &Bound) -> RbResult<Value> {
        match (self, b) {
            (Place::Local(n), _) => Ok(rt.get_local(n)),
            (Place::Ivar(n), _) => Ok(rt.get_ivar(n)),
            (Place::Gvar(n), _) => Ok(rt.get_global(n)),
            (Place::Cvar(n), _) => rt.get_cvar(n),
            (Place::Const(scope, n), _) => scope.get(rt, n),
            (Place::Attr { reader, .. }, Bound::Attr(r)) => rt.call_method(r, reader, &[], None),
            (Place::Index { .. }, Bound::Index(r, argv)) => rt.call_method(r, "[]", argv, None),
            _ => Ok(rt.nil()),
        }
    }

    /// Read for `||=`/`&&=`: an undefined class variable or constant is nil.
    fn read_or_nil(&self, rt: &mut Runtime, b: &Bound) -> RbResult<Value> {
        match self {
            Place::Const(ConstScope::Lexical, n) if !rt.const_defined(n) => Ok(rt.nil()),
            Place::Cvar(_) | Place::Const(..) => match self.read(rt, b) {
                Err(Unwind::Raise(_)) => Ok(rt.nil()),
                other => other,
            },
            _ => self.read(rt, b),
        }
    }

    fn write(&self, rt: &mut Runtime, b: &Bound, v: Value) -> RbResult<()> {
        match (self, b) {
            (Place::Local(n), _) => rt.set_local(n, v),
            (Place::Ivar(n), _) => rt.set_ivar(n, v),
            (Place::Gvar(n), _) => rt.set_global(n, v),
            (Place::Cvar(n), _) => rt.set_cvar(n, v),
            (Place::Const(scope, n), _) => {
                scope.set(rt, n, v)?;
            }
            (Place::Attr { setter, .. }, Bound::Attr(r)) => {
                rt.call_method(r, setter, &[v], None)?;
            }
            (Place::Index { .. }, Bound::Index(r, argv)) => {
                let mut full: Vec<Value> = argv.to_vec();
                full.push(v);
                rt.call_method(r, "[]=", &full, None)?;
            }
            _ => {}
        }
        Ok(())
    }
}

impl Compiler {
    /// A value-less assignment node as a [`Writer`].
    pub(super) fn writer(&mut self, target: &Node) -> CResult<Writer> {
        match target.kind() {
            Some(NodeTag::Lvasgn) => {
                let name = name_at(target, 0)?.to_string();
                Ok(writer_fn(move |rt, v| {
                    rt.set_local(&name, v);
                    Ok(())
                }))
            }
            Some(NodeTag::Ivasgn) => {
                let name = name_at(target, 0)?.to_string();
                Ok(writer_fn(move |rt, v| {
                    rt.set_ivar(&name, v);
                    Ok(())
                }))
            }
            Some(NodeTag::Gvasgn) => {
                let name = name_at(target, 0)?.to_string();
                Ok(writer_fn(move |rt, v| {
                    rt.set_global(&name, v);
                    Ok(())
                }))
            }
            Some(NodeTag::Cvasgn) => {
                let name = name_at(target, 0)?.to_string();
                Ok(writer_fn(move |rt, v| {
                    rt.set_cvar(&name, v);
                    Ok(())
                }))
            }
            Some(NodeTag::Casgn) => {
                let scope = self.const_scope(target, 0)?;
                let name = name_at(target, 1)?.to_string();
                Ok(writer_fn(move |rt, v| scope.set(rt, &name, v).map(|_| ())))
            }
            Some(NodeTag::Send) | Some(NodeTag::CSend) => {
                let recv = self.opt_child(target, 0)?;
                let setter = setter_name(name_at(target, 1)?);
                let args = self.elems(target, 2)?;
                let safe = target.is(NodeTag::CSend);
                Ok(writer_fn(move |rt, v| {
                    let r = eval_recv(rt, &recv)?;
                    if safe && r.is_nil() {
                        return Ok(());
                    }
                    let mut argv = eval_elems(rt, &args)?;
                    argv.push(v);
                    rt.call_method(&r, &setter, &argv, None).map(|_| ())
                }))
            }
            Some(NodeTag::IndexAsgn) => {
                let recv = self.child_expr(target, 0)?;
                let args = self.elems(target, 1)?;
                Ok(writer_fn(move |rt, v| {
                    let r = recv(rt)?;
                    let mut argv = eval_elems(rt, &args)?;
                    argv.push(v);
                    rt.call_method(&r, "[]=", &argv, None).map(|_| ())
                }))
            }
            Some(NodeTag::Mlhs) => self.mlhs(target),
            _ => Err(CompileError::malformed(target, "not an assignment target")),
        }
    }

    /// `a, (b, *c), d = value`
    fn mlhs(&mut self, node: &Node) -> CResult<Writer> {
        let mut slots = Vec::new();
        for t in node.nodes_from(0) {
            if t.is(NodeTag::Splat) {
                if slots.iter().any(|s| matches!(s, Slot::Rest(_))) {
                    return Err(CompileError::malformed(node, "more than one splat target"));
                }
                let inner = match t.node(0) {
                    Some(n) => Some(self.writer(n)?),
                    None => None,
                };
                slots.push(Slot::Rest(inner));
            } else {
                slots.push(Slot::One(self.writer(t)?));
            }
        }
        let rest_at = slots.iter().position(|s| matches!(s, Slot::Rest(_)));
        let pre = rest_at.unwrap_or(slots.len());
        let post = rest_at.map_or(0, |r| slots.len() - r - 1);
        Ok(writer_fn(move |rt, v| {
            let values = destructure(rt, v)?;
            let n = values.len();
            let post_start = pre.max(n.saturating_sub(post));
            let at = |i: usize| values.get(i).cloned();
            let mut post_i = post_start;
            for (i, slot) in slots.iter().enumerate() {
                match slot {
                    Slot::One(w) if i < pre => {
                        let v = at(i).unwrap_or_else(|| rt.nil());
                        w(rt, v)?;
                    }
                    Slot::One(w) => {
                        let v = at(post_i).unwrap_or_else(|| rt.nil());
                        post_i += 1;
                        w(rt, v)?;
                    }
                    Slot::Rest(w) => {
                        let middle = values
                            .get(pre.min(n)..post_start.min(n))
                            .map(<[Value]>::to_vec)
                            .unwrap_or_default();
                        if let Some(w) = w {
                            let arr = rt.array(middle);
                            w(rt, arr)?;
                        }
                    }
                }
            }
            Ok(())
        }))
    }

    pub(super) fn masgn(&mut self, node: &Node) -> CResult<Code> {
        let target = node_at(node, 0)?;
        if !target.is(NodeTag::Mlhs) {
            return Err(CompileError::malformed(node, "expected 'mlhs' target"));
        }
        let assign = self.mlhs(target)?;
        let value = self.child_expr(node, 1)?;
        Ok(code(move |rt| {
            let v = value(rt)?;
            assign(rt, v.clone())?;
            Ok(v)
        }))
    }

    fn place(&mut self, target: &Node) -> CResult<Place> {
        let own_name = || name_at(target, 0).map(str::to_string);
        Ok(match target.kind() {
            Some(NodeTag::Lvasgn) => Place::Local(own_name()?),
            Some(NodeTag::Ivasgn) => Place::Ivar(own_name()?),
            Some(NodeTag::Gvasgn) => Place::Gvar(own_name()?),
            Some(NodeTag::Cvasgn) => Place::Cvar(own_name()?),
            Some(NodeTag::Casgn) => {
                let scope = self.const_scope(target, 0)?;
                Place::Const(scope, name_at(target, 1)?.to_string())
            }
            Some(NodeTag::IndexAsgn) | Some(NodeTag::Index) => Place::Index {
                recv: self.child_expr(target, 0)?,
                args: self.elems(target, 1)?,
            },
            Some(NodeTag::Send) if target.name(1) == Some("[]") => Place::Index {
                recv: self.child_expr(target, 0)?,
                args: self.elems(target, 2)?,
            },
            Some(NodeTag::Send) | Some(NodeTag::CSend) => {
                let reader = name_at(target, 1)?.trim_end_matches('=').to_string();
                Place::Attr {
                    recv: self.opt_child(target, 0)?,
                    setter: setter_name(&reader),
                    reader,
                    safe: target.is(NodeTag::CSend),
                }
            }
            _ => return Err(CompileError::malformed(target, "not an assignment target")),
        })
    }

    /// `target op= value`
    pub(super) fn op_asgn(&mut self, node: &Node) -> CResult<Code> {
        let place = self.place(node_at(node, 0)?)?;
        let op = name_at(node, 1)?.to_string();
        let value = self.child_expr(node, 2)?;
        Ok(code(move |rt| {
            let Some(b) = place.bind(rt)? else {
                return Ok(rt.nil());
            };
            let cur = place.read(rt, &b)?;
            let rhs = value(rt)?;
            let v = rt.call_method(&cur, &op, &[rhs], None)?;
            place.write(rt, &b, v.clone())?;
            Ok(v)
        }))
    }

    /// `target ||= value` / `target &&= value`: assigns only when the
    /// current value is falsy / truthy.
    pub(super) fn logical_asgn(&mut self, node: &Node, is_and: bool) -> CResult<Code> {
        let place = self.place(node_at(node, 0)?)?;
        let value = self.child_expr(node, 1)?;
        Ok(code(move |rt| {
            let Some(b) = place.bind(rt)? else {
                return Ok(rt.nil());
            };
            let cur = place.read_or_nil(rt, &b)?;
            if cur.truthy() != is_and {
                return Ok(cur);
            }
            let v = value(rt)?;
            place.write(rt, &b, v.clone())?;
            Ok(v)
        }))
    }
}
