//! Literal nodes.

use std::rc::Rc;

use num_bigint::BigInt;
use rb_ir::{Child, Node, NodeTag};
use rb_runtime::{Code, HashData, RbResult, Runtime};

use super::calls::eval_elems;
use super::{CResult, Compiler, code, name_at, node_at};
use crate::error::CompileError;

/// One piece of an interpolated string, symbol or regexp.
enum Part {
    Lit(String),
    Expr(Code),
}

fn render(rt: &mut Runtime, parts: &[Part]) -> RbResult<String> {
    let mut out = String::new();
    for part in parts {
        match part {
            Part::Lit(s) => out.push_str(s),
            Part::Expr(c) => {
                let v = c(rt)?;
                out.push_str(&rt.to_s(&v)?);
            }
        }
    }
    Ok(out)
}

impl Compiler {
    pub(super) fn int(&mut self, node: &Node) -> CResult<Code> {
        match node.child(0) {
            Some(Child::Int(v)) => {
                let v = *v;
                Ok(code(move |rt| Ok(rt.int(v))))
            }
            // Literals outside i64 arrive as their digit string.
            Some(Child::Str(digits)) => {
                let big: BigInt = digits
                    .parse()
                    .map_err(|_| CompileError::malformed(node, format!("bad integer literal '{digits}'")))?;
                Ok(code(move |rt| Ok(rt.integer(big.clone()))))
            }
            _ => Err(CompileError::malformed(node, "expected an integer literal")),
        }
    }

    pub(super) fn float(&mut self, node: &Node) -> CResult<Code> {
        let f = node
            .float(0)
            .ok_or_else(|| CompileError::malformed(node, "expected a float literal"))?;
        Ok(code(move |rt| Ok(rt.float(f))))
    }

    /// A fresh String object on every evaluation; strings are mutable.
    pub(super) fn str(&mut self, node: &Node) -> CResult<Code> {
        let s = node.name(0).unwrap_or_default().to_string();
        Ok(code(move |rt| Ok(rt.str(s.as_str()))))
    }

    pub(super) fn dstr(&mut self, node: &Node) -> CResult<Code> {
        let parts = self.parts(node, node.len())?;
        Ok(code(move |rt| {
            let s = render(rt, &parts)?;
            Ok(rt.str(s))
        }))
    }

    pub(super) fn sym(&mut self, node: &Node) -> CResult<Code> {
        let name = name_at(node, 0)?.to_string();
        Ok(code(move |rt| Ok(rt.sym(&name))))
    }

    pub(super) fn dsym(&mut self, node: &Node) -> CResult<Code> {
        let parts = self.parts(node, node.len())?;
        Ok(code(move |rt| {
            let s = render(rt, &parts)?;
            Ok(rt.sym(&s))
        }))
    }

    pub(super) fn regexp(&mut self, node: &Node) -> CResult<Code> {
        let (end, flags) = match node.children.last() {
            Some(Child::Node(opt)) if opt.is(NodeTag::RegOpt) => {
                let flags: String = opt
                    .children
                    .iter()
                    .filter_map(|c| match c {
                        Child::Str(s) => Some(s.as_str()),
                        _ => None,
                    })
                    .collect();
                (node.len() - 1, flags)
            }
            _ => (node.len(), String::new()),
        };
        let parts = self.parts(node, end)?;
        Ok(code(move |rt| {
            let source = render(rt, &parts)?;
            rt.regexp(&source, &flags)
        }))
    }

    /// Children `0..end` as interpolation parts.
    fn parts(&mut self, node: &Node, end: usize) -> CResult<Vec<Part>> {
        let mut parts = Vec::new();
        for i in 0..end {
            match node.child(i) {
                Some(Child::Node(n)) if n.is(NodeTag::Str) => {
                    parts.push(Part::Lit(n.name(0).unwrap_or_default().to_string()));
                }
                Some(Child::Node(n)) => parts.push(Part::Expr(self.expr(n)?)),
                Some(Child::Str(s)) => parts.push(Part::Lit(s.clone())),
                _ => {}
            }
        }
        Ok(parts)
    }

    pub(super) fn array(&mut self, node: &Node) -> CResult<Code> {
        let elems = self.elems(node, 0)?;
        Ok(code(move |rt| {
            let items = eval_elems(rt, &elems)?;
            Ok(rt.array(items.into_vec()))
        }))
    }

    pub(super) fn hash(&mut self, node: &Node) -> CResult<Code> {
        let mut pairs = Vec::new();
        for pair in node.nodes_from(0) {
            if !pair.is(NodeTag::Pair) {
                return Err(CompileError::malformed(node, format!("unexpected '{}' entry", pair.tag)));
            }
            let key = self.expr(node_at(pair, 0)?)?;
            let value = self.expr(node_at(pair, 1)?)?;
            pairs.push((key, value));
        }
        let pairs: Rc<[(Code, Code)]> = pairs.into();
        Ok(code(move |rt| {
            let mut data = HashData::new(None);
            for (k, v) in pairs.iter() {
                let key = k(rt)?;
                let value = v(rt)?;
                data.insert(key, value);
            }
            Ok(rt.hash(data))
        }))
    }

    pub(super) fn range(&mut self, node: &Node, exclusive: bool) -> CResult<Code> {
        let start = self.child_expr(node, 0)?;
        let end = self.child_expr(node, 1)?;
        Ok(code(move |rt| {
            let s = start(rt)?;
            let e = end(rt)?;
            Ok(rt.range(s, e, exclusive))
        }))
    }
}
