//! Sends, blocks, `super` and `yield`.

use std::rc::Rc;

use rb_ir::{Node, NodeTag};
use rb_runtime::{Code, Params, RbResult, Runtime, Unwind, Value};
use smallvec::SmallVec;
use tracing::trace;

use super::{CResult, Compiler, Jump, code, name_at, node_at};
use crate::error::CompileError;

pub(super) type Values = SmallVec<[Value; 4]>;

/// One element of an argument list or array literal.
pub(super) enum Elem {
    Plain(Code),
    Splat(Code),
}

pub(super) fn eval_elems(rt: &mut Runtime, elems: &[Elem]) -> RbResult<Values> {
    let mut out = Values::new();
    for e in elems {
        match e {
            Elem::Plain(c) => out.push(c(rt)?),
            Elem::Splat(c) => {
                let v = c(rt)?;
                out.extend(splat_values(rt, v)?);
            }
        }
    }
    Ok(out)
}

/// `*v`: an Array's elements, nothing for nil, `to_a` when the value has
/// one, otherwise the value alone.
pub(super) fn splat_values(rt: &mut Runtime, v: Value) -> RbResult<Vec<Value>> {
    if let Some(items) = v.as_array() {
        return Ok(items.borrow().clone());
    }
    if v.is_nil() {
        return Ok(Vec::new());
    }
    if rt.respond_to(&v, "to_a", true) {
        let a = rt.send(&v, "to_a", &[], None)?;
        if let Some(items) = a.as_array() {
            return Ok(items.borrow().clone());
        }
    }
    Ok(vec![v])
}

/// `x.name = v` evaluates to `v`, whatever the setter returns.
fn is_setter(name: &str) -> bool {
    name == "[]="
        || (name.ends_with('=')
            && name
                .chars()
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_'))
}

/// A `do ... end` / `{ ... }` literal attached to a call.
pub(super) struct BlockLit {
    params: Rc<Params>,
    body: Code,
    site: u32,
}

/// Block handed to a call at run time.
enum BlockArg {
    None,
    Literal(BlockLit),
    /// `&expr`
    Pass(Code),
    /// Bare `&`: forwards the running method's block.
    Forward,
}

impl BlockArg {
    fn resolve(&self, rt: &mut Runtime) -> RbResult<Option<Value>> {
        match self {
            BlockArg::None => Ok(None),
            BlockArg::Literal(lit) => Ok(Some(rt.make_block(
                lit.params.clone(),
                lit.body.clone(),
                lit.site,
                false,
            ))),
            BlockArg::Pass(c) => {
                let v = c(rt)?;
                if v.is_nil() {
                    Ok(None)
                } else if v.as_proc().is_some() {
                    Ok(Some(v))
                } else {
                    rt.send(&v, "to_proc", &[], None).map(Some)
                }
            }
            BlockArg::Forward => Ok(rt.frame().block().cloned()),
        }
    }

    /// A `break` in a literal block ends the call the block was given to.
    fn catch_break(&self, out: RbResult<Value>) -> RbResult<Value> {
        let BlockArg::Literal(lit) = self else {
            return out;
        };
        match out {
            Err(Unwind::Break { site, value }) if site == lit.site => {
                trace!(site, "break caught at call site");
                Ok(value)
            }
            other => other,
        }
    }
}

impl Compiler {
    pub(super) fn elems(&mut self, node: &Node, from: usize) -> CResult<Rc<[Elem]>> {
        let mut out = Vec::new();
        for n in node.nodes_from(from) {
            if n.is(NodeTag::BlockPass) {
                return Err(CompileError::malformed(n, "block argument outside a call"));
            }
            out.push(self.elem(n)?);
        }
        Ok(out.into())
    }

    fn elem(&mut self, n: &Node) -> CResult<Elem> {
        if n.is(NodeTag::Splat) {
            Ok(Elem::Splat(self.child_expr(n, 0)?))
        } else {
            Ok(Elem::Plain(self.expr(n)?))
        }
    }

    /// Arguments from child `from` on; a trailing `block_pass` becomes the block.
    fn call_args(
        &mut self,
        node: &Node,
        from: usize,
        lit: Option<BlockLit>,
    ) -> CResult<(Rc<[Elem]>, BlockArg)> {
        let nodes: Vec<&Rc<Node>> = node.nodes_from(from).collect();
        let mut elems = Vec::with_capacity(nodes.len());
        let mut block = lit.map_or(BlockArg::None, BlockArg::Literal);
        for (i, n) in nodes.iter().enumerate() {
            if !n.is(NodeTag::BlockPass) {
                elems.push(self.elem(n)?);
                continue;
            }
            if i + 1 != nodes.len() {
                return Err(CompileError::malformed(node, "block argument must come last"));
            }
            if !matches!(block, BlockArg::None) {
                return Err(CompileError::malformed(node, "both block argument and literal block given"));
            }
            block = match self.opt_child(n, 0)? {
                Some(c) => BlockArg::Pass(c),
                None => BlockArg::Forward,
            };
        }
        Ok((elems.into(), block))
    }

    /// `send`, `csend`, `super` and `zsuper`, optionally with a literal block.
    pub(super) fn call(&mut self, node: &Node, lit: Option<BlockLit>) -> CResult<Code> {
        match node.kind() {
            Some(NodeTag::Send) => self.send(node, lit, false),
            Some(NodeTag::CSend) => self.send(node, lit, true),
            Some(NodeTag::Super) => {
                let (args, block) = self.call_args(node, 0, lit)?;
                Ok(code(move |rt| {
                    let argv = eval_elems(rt, &args)?;
                    let blk = block.resolve(rt)?;
                    let out = rt.call_super(Some(&argv), blk.as_ref());
                    block.catch_break(out)
                }))
            }
            Some(NodeTag::ZSuper) => {
                let block = lit.map_or(BlockArg::None, BlockArg::Literal);
                Ok(code(move |rt| {
                    let blk = block.resolve(rt)?;
                    let out = rt.call_super(None, blk.as_ref());
                    block.catch_break(out)
                }))
            }
            Some(NodeTag::Index) if lit.is_none() => self.index(node),
            _ => Err(CompileError::malformed(node, "cannot take a block")),
        }
    }

    fn send(&mut self, node: &Node, lit: Option<BlockLit>, safe: bool) -> CResult<Code> {
        let recv = self.opt_child(node, 0)?;
        let name = name_at(node, 1)?.to_string();
        let (args, block) = self.call_args(node, 2, lit)?;
        let setter = is_setter(&name);
        Ok(code(move |rt| {
            let r = match &recv {
                Some(c) => Some(c(rt)?),
                None => None,
            };
            if safe && r.as_ref().is_some_and(Value::is_nil) {
                return Ok(rt.nil());
            }
            let argv = eval_elems(rt, &args)?;
            let blk = block.resolve(rt)?;
            let out = match &r {
                Some(r) => rt.call_method(r, &name, &argv, blk.as_ref()),
                None => rt.send_local_or_self(&name, &argv, blk.as_ref()),
            };
            let out = block.catch_break(out)?;
            if setter {
                return Ok(argv.last().cloned().unwrap_or(out));
            }
            Ok(out)
        }))
    }

    pub(super) fn block(&mut self, node: &Node) -> CResult<Code> {
        let call = node_at(node, 0)?;
        let args = node_at(node, 1)?;
        let site = self.new_site();
        let params = Rc::new(self.params(args)?);
        let body = self.within(Jump::Block(site), |c| c.child_expr(node, 2))?;
        if call.is(NodeTag::Lambda) {
            return Ok(code(move |rt| Ok(rt.make_block(params.clone(), body.clone(), site, true))));
        }
        self.call(call, Some(BlockLit { params, body, site }))
    }

    pub(super) fn yield_(&mut self, node: &Node) -> CResult<Code> {
        let args = self.elems(node, 0)?;
        Ok(code(move |rt| {
            let argv = eval_elems(rt, &args)?;
            rt.yield_block(&argv)
        }))
    }

    pub(super) fn index(&mut self, node: &Node) -> CResult<Code> {
        let recv = self.child_expr(node, 0)?;
        let args = self.elems(node, 1)?;
        Ok(code(move |rt| {
            let r = recv(rt)?;
            let argv = eval_elems(rt, &args)?;
            rt.call_method(&r, "[]", &argv, None)
        }))
    }

    pub(super) fn index_asgn(&mut self, node: &Node) -> CResult<Code> {
        if node.len() < 2 {
            return Err(CompileError::malformed(node, "missing assigned value"));
        }
        let recv = self.child_expr(node, 0)?;
        let args = self.elems(node, 1)?;
        Ok(code(move |rt| {
            let r = recv(rt)?;
            let argv = eval_elems(rt, &args)?;
            rt.call_method(&r, "[]=", &argv, None)?;
            Ok(argv.last().cloned().unwrap_or_else(|| rt.nil()))
        }))
    }

    /// A splat outside an argument list evaluates to an Array.
    pub(super) fn splat(&mut self, node: &Node) -> CResult<Code> {
        let inner = self.child_expr(node, 0)?;
        Ok(code(move |rt| {
            let v = inner(rt)?;
            let items = splat_values(rt, v)?;
            Ok(rt.array(items))
        }))
    }
}
