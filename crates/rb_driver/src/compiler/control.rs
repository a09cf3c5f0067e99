//! Sequencing, conditionals, loops, jumps and exception handling.

use std::rc::Rc;

use rb_ir::{Child, Node, NodeTag};
use rb_runtime::core::NativeBlockFn;
use rb_runtime::{Code, RbResult, Runtime, Unwind, Value};
use tracing::trace;

use super::assign::Writer;
use super::calls::{Elem, eval_elems, splat_values};
use super::{CResult, Compiler, Jump, code, nil_code, node_at};
use crate::error::CompileError;

/// One `rescue` clause.
struct Clause {
    /// `None` rescues StandardError.
    classes: Option<Rc<[Elem]>>,
    bind: Option<Writer>,
    body: Code,
}

impl Clause {
    fn matches(&self, rt: &mut Runtime, exc: &Value) -> RbResult<bool> {
        let Some(classes) = &self.classes else {
            let standard = rt.classes.standard_error.clone();
            return rt.case_eq(&standard, exc);
        };
        let classes = eval_elems(rt, classes)?;
        for class in &classes {
            if rt.case_eq(class, exc)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Result of one loop-body pass: `Some` when the loop is over.
fn loop_step(site: u32, out: RbResult<Value>) -> RbResult<Option<Value>> {
    match out {
        Ok(_) | Err(Unwind::Next(_)) => Ok(None),
        Err(Unwind::Break { site: s, value }) if s == site => {
            trace!(site, "break caught at loop");
            Ok(Some(value))
        }
        Err(e) => Err(e),
    }
}

impl Compiler {
    pub(super) fn if_(&mut self, node: &Node) -> CResult<Code> {
        let cond = self.child_expr(node, 0)?;
        let then = self.child_expr(node, 1)?;
        let els = self.child_expr(node, 2)?;
        Ok(code(move |rt| {
            if cond(rt)?.truthy() { then(rt) } else { els(rt) }
        }))
    }

    /// `while`/`until`; the `_post` forms run the body once before testing.
    pub(super) fn while_(&mut self, node: &Node, negate: bool, post: bool) -> CResult<Code> {
        let cond = self.child_expr(node, 0)?;
        let site = self.new_site();
        let body = self.within(Jump::Loop(site), |c| c.child_expr(node, 1))?;
        Ok(code(move |rt| {
            let mut skip_test = post;
            loop {
                if !skip_test && cond(rt)?.truthy() == negate {
                    return Ok(rt.nil());
                }
                skip_test = false;
                if let Some(v) = loop_step(site, body(rt))? {
                    return Ok(v);
                }
            }
        }))
    }

    /// `for x in iterable`: drives the iterable's `each`, assigning the
    /// target in the enclosing scope on every pass.
    pub(super) fn for_(&mut self, node: &Node) -> CResult<Code> {
        let target = self.writer(node_at(node, 0)?)?;
        let iterable = self.child_expr(node, 1)?;
        let site = self.new_site();
        let body = self.within(Jump::Loop(site), |c| c.child_expr(node, 2))?;
        Ok(code(move |rt| {
            let iter = iterable(rt)?;
            let frame = rt.frame().clone();
            let scope = rt.scope();
            let target = target.clone();
            let body = body.clone();
            let step: Rc<NativeBlockFn> = Rc::new(move |rt: &mut Runtime, args: &[Value]| {
                let v = match args {
                    [one] => one.clone(),
                    _ => rt.array(args.to_vec()),
                };
                rt.with_frame_and_scope(frame.clone(), scope.clone(), |rt| {
                    target(rt, v)?;
                    body(rt)
                })
            });
            let blk = rt.native_proc(step);
            match rt.send(&iter, "each", &[], Some(&blk)) {
                Ok(_) => Ok(iter),
                Err(Unwind::Break { site: s, value }) if s == site => Ok(value),
                Err(e) => Err(e),
            }
        }))
    }

    pub(super) fn and_or(&mut self, node: &Node, is_and: bool) -> CResult<Code> {
        let lhs = self.child_expr(node, 0)?;
        let rhs = self.child_expr(node, 1)?;
        Ok(code(move |rt| {
            let l = lhs(rt)?;
            if l.truthy() == is_and { rhs(rt) } else { Ok(l) }
        }))
    }

    pub(super) fn not(&mut self, node: &Node) -> CResult<Code> {
        let operand = self.child_expr(node, 0)?;
        Ok(code(move |rt| {
            let v = operand(rt)?;
            Ok(rt.bool(!v.truthy()))
        }))
    }

    pub(super) fn case(&mut self, node: &Node) -> CResult<Code> {
        let subject = self.opt_child(node, 0)?;
        let mut arms: Vec<(Vec<Elem>, Code)> = Vec::new();
        let mut els = nil_code();
        let last = node.len().saturating_sub(1);
        for i in 1..node.len() {
            match node.child(i) {
                Some(Child::Node(w)) if w.is(NodeTag::When) => {
                    if w.is_empty() {
                        return Err(CompileError::malformed(w, "missing tests"));
                    }
                    let body_at = w.len() - 1;
                    let mut tests = Vec::with_capacity(body_at);
                    for j in 0..body_at {
                        let t = node_at(w, j)?;
                        tests.push(if t.is(NodeTag::Splat) {
                            Elem::Splat(self.child_expr(t, 0)?)
                        } else {
                            Elem::Plain(self.expr(t)?)
                        });
                    }
                    let body = self.child_expr(w, body_at)?;
                    arms.push((tests, body));
                }
                _ if i == last => els = self.child_expr(node, i)?,
                _ => return Err(CompileError::malformed(node, "expected 'when'")),
            }
        }
        Ok(code(move |rt| {
            let s = match &subject {
                Some(c) => Some(c(rt)?),
                None => None,
            };
            for (tests, body) in &arms {
                for test in tests {
                    let candidates = match test {
                        Elem::Plain(c) => vec![c(rt)?],
                        Elem::Splat(c) => {
                            let v = c(rt)?;
                            splat_values(rt, v)?
                        }
                    };
                    for pattern in &candidates {
                        let hit = match &s {
                            Some(s) => rt.case_eq(pattern, s)?,
                            None => pattern.truthy(),
                        };
                        if hit {
                            return body(rt);
                        }
                    }
                }
            }
            els(rt)
        }))
    }

    /// Payload of `next`/`break`/`return`: nil, one value, or an Array.
    fn jump_value(&mut self, node: &Node) -> CResult<Code> {
        match node.node(0) {
            Some(n) if node.len() == 1 && !n.is(NodeTag::Splat) => self.expr(n),
            None if node.len() <= 1 => Ok(nil_code()),
            _ => self.array(node),
        }
    }

    pub(super) fn next(&mut self, node: &Node) -> CResult<Code> {
        if self.jumps.is_empty() {
            return Err(CompileError::malformed(node, "next used outside of a loop or block"));
        }
        let value = self.jump_value(node)?;
        Ok(code(move |rt| Err(Unwind::Next(value(rt)?))))
    }

    pub(super) fn break_(&mut self, node: &Node) -> CResult<Code> {
        let Some(site) = self.jumps.last().map(|j| j.site()) else {
            return Err(CompileError::malformed(node, "break used outside of a loop or block"));
        };
        let value = self.jump_value(node)?;
        Ok(code(move |rt| {
            let value = value(rt)?;
            Err(Unwind::Break { site, value })
        }))
    }

    pub(super) fn return_(&mut self, node: &Node) -> CResult<Code> {
        let value = self.jump_value(node)?;
        Ok(code(move |rt| {
            let value = value(rt)?;
            Err(Unwind::Return {
                target: rt.frame().return_target(),
                value,
            })
        }))
    }

    pub(super) fn rescue(&mut self, node: &Node) -> CResult<Code> {
        let body = self.child_expr(node, 0)?;
        let mut clauses = Vec::new();
        let mut els = None;
        let last = node.len().saturating_sub(1);
        for i in 1..node.len() {
            match node.child(i) {
                Some(Child::Node(r)) if r.is(NodeTag::ResBody) => {
                    let classes = match r.node(0) {
                        Some(list) => Some(self.elems(list, 0)?),
                        None => None,
                    };
                    let bind = match r.node(1) {
                        Some(target) => Some(self.writer(target)?),
                        None => None,
                    };
                    let body = self.child_expr(r, 2)?;
                    clauses.push(Clause { classes, bind, body });
                }
                _ if i == last => els = self.opt_child(node, i)?,
                _ => return Err(CompileError::malformed(node, "expected 'resbody'")),
            }
        }
        Ok(code(move |rt| {
            let exc = match body(rt) {
                Err(Unwind::Raise(exc)) => exc,
                Ok(v) => {
                    return match &els {
                        Some(e) => e(rt),
                        None => Ok(v),
                    };
                }
                Err(other) => return Err(other),
            };
            for clause in &clauses {
                if !clause.matches(rt, &exc)? {
                    continue;
                }
                trace!(class = %exc.class_name(), "exception rescued");
                let saved = rt.get_global("$!");
                rt.set_global("$!", exc.clone());
                let out = match &clause.bind {
                    Some(w) => w(rt, exc.clone()).and_then(|_| (clause.body)(rt)),
                    None => (clause.body)(rt),
                };
                rt.set_global("$!", saved);
                return out;
            }
            Err(Unwind::Raise(exc))
        }))
    }

    /// The ensure body runs on every exit; its own failure supersedes.
    pub(super) fn ensure(&mut self, node: &Node) -> CResult<Code> {
        let body = self.child_expr(node, 0)?;
        let cleanup = self.child_expr(node, 1)?;
        Ok(code(move |rt| {
            let out = body(rt);
            cleanup(rt)?;
            out
        }))
    }
}
