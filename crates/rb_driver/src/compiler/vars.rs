//! Variable and constant reads and writes.

use rb_ir::{Node, NodeTag};
use rb_runtime::{Code, RbResult, Runtime, Value};

use super::{CResult, Compiler, code, name_at};
use crate::error::CompileError;

/// Where a constant reference is looked up.
#[derive(Clone)]
pub(super) enum ConstScope {
    /// `Name`: enclosing bodies innermost first.
    Lexical,
    /// `::Name`
    Top,
    /// `Expr::Name`
    Expr(Code),
}

impl ConstScope {
    pub(super) fn get(&self, rt: &mut Runtime, name: &str) -> RbResult<Value> {
        match self {
            ConstScope::Lexical => rt.get_const(name),
            ConstScope::Top => rt.top_const(name),
            ConstScope::Expr(c) => {
                let scope = c(rt)?;
                rt.scoped_const(&scope, name)
            }
        }
    }

    pub(super) fn set(&self, rt: &mut Runtime, name: &str, value: Value) -> RbResult<Value> {
        match self {
            ConstScope::Lexical => rt.set_const(name, value),
            ConstScope::Top => {
                let object = rt.classes.object.clone();
                rt.set_const_in(&object, name, value)
            }
            ConstScope::Expr(c) => {
                let holder = c(rt)?;
                rt.set_const_in(&holder, name, value)
            }
        }
    }

    /// The container a `class`/`module` definition lands in; `None` means
    /// the lexically enclosing one.
    pub(super) fn container(&self, rt: &mut Runtime) -> RbResult<Option<Value>> {
        match self {
            ConstScope::Lexical => Ok(None),
            ConstScope::Top => Ok(Some(rt.classes.object.clone())),
            ConstScope::Expr(c) => c(rt).map(Some),
        }
    }
}

impl Compiler {
    /// Scope child `i` of a `const`/`casgn`.
    pub(super) fn const_scope(&mut self, node: &Node, i: usize) -> CResult<ConstScope> {
        match node.node(i) {
            None => Ok(ConstScope::Lexical),
            Some(n) if n.is(NodeTag::Cbase) => Ok(ConstScope::Top),
            Some(n) => Ok(ConstScope::Expr(self.expr(n)?)),
        }
    }

    pub(super) fn lvar(&mut self, node: &Node) -> CResult<Code> {
        let name = name_at(node, 0)?.to_string();
        Ok(code(move |rt| Ok(rt.get_local(&name))))
    }

    pub(super) fn lvasgn(&mut self, node: &Node) -> CResult<Code> {
        let name = name_at(node, 0)?.to_string();
        let value = self.assigned(node, 1)?;
        Ok(code(move |rt| {
            let v = value(rt)?;
            rt.set_local(&name, v.clone());
            Ok(v)
        }))
    }

    pub(super) fn ivar(&mut self, node: &Node) -> CResult<Code> {
        let name = name_at(node, 0)?.to_string();
        Ok(code(move |rt| Ok(rt.get_ivar(&name))))
    }

    pub(super) fn ivasgn(&mut self, node: &Node) -> CResult<Code> {
        let name = name_at(node, 0)?.to_string();
        let value = self.assigned(node, 1)?;
        Ok(code(move |rt| {
            let v = value(rt)?;
            rt.set_ivar(&name, v.clone());
            Ok(v)
        }))
    }

    pub(super) fn gvar(&mut self, node: &Node) -> CResult<Code> {
        let name = name_at(node, 0)?.to_string();
        Ok(code(move |rt| Ok(rt.get_global(&name))))
    }

    pub(super) fn gvasgn(&mut self, node: &Node) -> CResult<Code> {
        let name = name_at(node, 0)?.to_string();
        let value = self.assigned(node, 1)?;
        Ok(code(move |rt| {
            let v = value(rt)?;
            rt.set_global(&name, v.clone());
            Ok(v)
        }))
    }

    pub(super) fn cvar(&mut self, node: &Node) -> CResult<Code> {
        let name = name_at(node, 0)?.to_string();
        Ok(code(move |rt| rt.get_cvar(&name)))
    }

    pub(super) fn cvasgn(&mut self, node: &Node) -> CResult<Code> {
        let name = name_at(node, 0)?.to_string();
        let value = self.assigned(node, 1)?;
        Ok(code(move |rt| {
            let v = value(rt)?;
            rt.set_cvar(&name, v.clone());
            Ok(v)
        }))
    }

    pub(super) fn const_(&mut self, node: &Node) -> CResult<Code> {
        let scope = self.const_scope(node, 0)?;
        let name = name_at(node, 1)?.to_string();
        Ok(code(move |rt| scope.get(rt, &name)))
    }

    pub(super) fn casgn(&mut self, node: &Node) -> CResult<Code> {
        let scope = self.const_scope(node, 0)?;
        let name = name_at(node, 1)?.to_string();
        let value = self.assigned(node, 2)?;
        Ok(code(move |rt| {
            let v = value(rt)?;
            scope.set(rt, &name, v)
        }))
    }

    pub(super) fn nth_ref(&mut self, node: &Node) -> CResult<Code> {
        let n = node
            .int(0)
            .filter(|n| *n >= 0)
            .ok_or_else(|| CompileError::malformed(node, "expected a group number"))?
            as usize;
        Ok(code(move |rt| Ok(rt.nth_ref(n))))
    }

    /// The value slot of an assignment used as an expression.
    fn assigned(&mut self, node: &Node, i: usize) -> CResult<Code> {
        self.opt_child(node, i)?
            .ok_or_else(|| CompileError::malformed(node, "missing assigned value"))
    }
}
