//! Node to closure lowering.
//!
//! Every node becomes one [`Code`] closure that evaluates to a value, so
//! conditionals, loops, `begin` sequences and `case` can all sit in value
//! position. The tag table in `rb_ir` is closed: a tag outside it fails the
//! whole compile before any closure is produced.

use std::rc::Rc;

use rb_ir::{Child, Node, NodeTag};
use rb_runtime::{Code, RbResult, Runtime, Value};
use tracing::debug;

use crate::error::CompileError;
use crate::program::Program;

mod assign;
mod calls;
mod control;
mod defs;
mod literals;
mod vars;

pub(crate) type CResult<T> = Result<T, CompileError>;

/// Lowers a whole program tree.
pub fn compile(root: &Node) -> Result<Program, CompileError> {
    let mut c = Compiler::new();
    let code = c.expr(root)?;
    debug!(root = %root.tag, sites = c.next_site - 1, "compiled program");
    Ok(Program::new(code))
}

/// Target of `next` / `break` in the code being compiled.
#[derive(Clone, Copy, Debug)]
enum Jump {
    Loop(u32),
    Block(u32),
}

impl Jump {
    fn site(self) -> u32 {
        match self {
            Jump::Loop(s) | Jump::Block(s) => s,
        }
    }
}

pub(crate) struct Compiler {
    /// Site ids are unique within one compile and start at 1.
    next_site: u32,
    jumps: Vec<Jump>,
}

impl Compiler {
    fn new() -> Self {
        Self {
            next_site: 1,
            jumps: Vec::new(),
        }
    }

    fn new_site(&mut self) -> u32 {
        let site = self.next_site;
        self.next_site += 1;
        site
    }

    /// Compiles `f` with `jump` as the innermost `next`/`break` target.
    fn within<T>(&mut self, jump: Jump, f: impl FnOnce(&mut Self) -> CResult<T>) -> CResult<T> {
        self.jumps.push(jump);
        let out = f(self);
        self.jumps.pop();
        out
    }

    /// Method, class and module bodies see no enclosing loop or block.
    fn detached<T>(&mut self, f: impl FnOnce(&mut Self) -> CResult<T>) -> CResult<T> {
        let saved = std::mem::take(&mut self.jumps);
        let out = f(self);
        self.jumps = saved;
        out
    }

    pub(crate) fn expr(&mut self, node: &Node) -> CResult<Code> {
        let Some(tag) = node.kind() else {
            return Err(CompileError::unsupported(node));
        };
        match tag {
            NodeTag::Send | NodeTag::CSend | NodeTag::Super | NodeTag::ZSuper => {
                self.call(node, None)
            }
            NodeTag::Index => self.index(node),
            NodeTag::IndexAsgn => self.index_asgn(node),
            NodeTag::Yield => self.yield_(node),
            NodeTag::Block => self.block(node),
            NodeTag::Splat => self.splat(node),
            NodeTag::BlockPass => Err(CompileError::malformed(node, "only valid as a call argument")),
            NodeTag::Lambda => Err(CompileError::malformed(node, "only valid as the call of a block")),

            NodeTag::Begin | NodeTag::KwBegin => self.seq(node.nodes_from(0)),
            NodeTag::If => self.if_(node),
            NodeTag::While => self.while_(node, false, false),
            NodeTag::Until => self.while_(node, true, false),
            NodeTag::WhilePost => self.while_(node, false, true),
            NodeTag::UntilPost => self.while_(node, true, true),
            NodeTag::For => self.for_(node),
            NodeTag::And => self.and_or(node, true),
            NodeTag::Or => self.and_or(node, false),
            NodeTag::Not => self.not(node),
            NodeTag::Case => self.case(node),
            NodeTag::Next => self.next(node),
            NodeTag::Break => self.break_(node),
            NodeTag::Return => self.return_(node),
            NodeTag::Rescue => self.rescue(node),
            NodeTag::Ensure => self.ensure(node),
            NodeTag::When => Err(CompileError::malformed(node, "only valid inside 'case'")),
            NodeTag::ResBody => Err(CompileError::malformed(node, "only valid inside 'rescue'")),

            NodeTag::Lvar => self.lvar(node),
            NodeTag::Lvasgn => self.lvasgn(node),
            NodeTag::Ivar => self.ivar(node),
            NodeTag::Ivasgn => self.ivasgn(node),
            NodeTag::Gvar => self.gvar(node),
            NodeTag::Gvasgn => self.gvasgn(node),
            NodeTag::Cvar => self.cvar(node),
            NodeTag::Cvasgn => self.cvasgn(node),
            NodeTag::Const => self.const_(node),
            NodeTag::Casgn => self.casgn(node),
            NodeTag::Cbase => Ok(code(|rt| Ok(rt.classes.object.clone()))),
            NodeTag::NthRef => self.nth_ref(node),
            NodeTag::OpAsgn => self.op_asgn(node),
            NodeTag::OrAsgn => self.logical_asgn(node, false),
            NodeTag::AndAsgn => self.logical_asgn(node, true),
            NodeTag::Masgn => self.masgn(node),
            NodeTag::Mlhs => Err(CompileError::malformed(node, "only valid as an assignment target")),

            NodeTag::Int => self.int(node),
            NodeTag::Float => self.float(node),
            NodeTag::Str => self.str(node),
            NodeTag::Dstr => self.dstr(node),
            NodeTag::Sym => self.sym(node),
            NodeTag::Dsym => self.dsym(node),
            NodeTag::Regexp => self.regexp(node),
            NodeTag::Array => self.array(node),
            NodeTag::Hash => self.hash(node),
            NodeTag::IRange => self.range(node, false),
            NodeTag::ERange => self.range(node, true),
            NodeTag::Nil => Ok(nil_code()),
            NodeTag::True => Ok(code(|rt| Ok(rt.bool(true)))),
            NodeTag::False => Ok(code(|rt| Ok(rt.bool(false)))),
            NodeTag::SelfRef => Ok(code(|rt| Ok(rt.self_value()))),
            NodeTag::Pair => Err(CompileError::malformed(node, "only valid inside 'hash'")),
            NodeTag::RegOpt => Err(CompileError::malformed(node, "only valid inside 'regexp'")),

            NodeTag::Def => self.def(node),
            NodeTag::Defs => self.defs(node),
            NodeTag::Class => self.class(node),
            NodeTag::Module => self.module(node),
            NodeTag::SClass => self.sclass(node),
            NodeTag::Alias => self.alias(node),
            NodeTag::Args
            | NodeTag::Arg
            | NodeTag::OptArg
            | NodeTag::RestArg
            | NodeTag::BlockArg
            | NodeTag::ProcArg0
            | NodeTag::KwArg
            | NodeTag::KwOptArg => Err(CompileError::malformed(node, "only valid in a parameter list")),
        }
    }

    /// Child `i` compiled, nil when the slot is absent or missing.
    fn child_expr(&mut self, node: &Node, i: usize) -> CResult<Code> {
        Ok(self.opt_child(node, i)?.unwrap_or_else(nil_code))
    }

    fn opt_child(&mut self, node: &Node, i: usize) -> CResult<Option<Code>> {
        match node.child(i) {
            None | Some(Child::Absent) => Ok(None),
            Some(Child::Node(n)) => self.expr(n).map(Some),
            Some(_) => Err(CompileError::malformed(node, format!("child {i} must be a node"))),
        }
    }

    /// Statements run in order; the last value is the sequence's value.
    fn seq<'a>(&mut self, nodes: impl Iterator<Item = &'a Rc<Node>>) -> CResult<Code> {
        let mut parts = nodes.map(|n| self.expr(n)).collect::<CResult<Vec<_>>>()?;
        Ok(match parts.len() {
            0 => nil_code(),
            1 => parts.remove(0),
            _ => code(move |rt| {
                let mut last = rt.nil();
                for part in &parts {
                    last = part(rt)?;
                }
                Ok(last)
            }),
        })
    }
}

pub(crate) fn code(f: impl Fn(&mut Runtime) -> RbResult<Value> + 'static) -> Code {
    Rc::new(f)
}

pub(crate) fn nil_code() -> Code {
    code(|rt| Ok(rt.nil()))
}

pub(crate) fn name_at<'a>(node: &'a Node, i: usize) -> CResult<&'a str> {
    node.name(i)
        .ok_or_else(|| CompileError::malformed(node, format!("child {i} must be a name")))
}

pub(crate) fn node_at(node: &Node, i: usize) -> CResult<&Rc<Node>> {
    node.node(i)
        .ok_or_else(|| CompileError::malformed(node, format!("child {i} must be a node")))
}
