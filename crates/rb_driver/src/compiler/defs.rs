//! Method, class, module and singleton-class definitions.

use std::rc::Rc;

use rb_ir::{Child, Node, NodeTag};
use rb_runtime::{Code, CompiledMethod, MethodDef, Params, Pattern, ScopeKind};

use super::{CResult, Compiler, code, name_at, node_at};
use crate::error::CompileError;

impl Compiler {
    /// An `args` node as a parameter list.
    pub(super) fn params(&mut self, args: &Node) -> CResult<Params> {
        if !args.is(NodeTag::Args) {
            return Err(CompileError::malformed(args, "expected a parameter list"));
        }
        let mut p = Params::default();
        for a in args.nodes_from(0) {
            // Required parameters after an optional or rest one are post parameters.
            let post = p.has_rest() || !p.optional.is_empty();
            let required = match a.kind() {
                Some(NodeTag::Arg) => Some(Pattern::Name(name_at(a, 0)?.to_string())),
                Some(NodeTag::Mlhs) => Some(Pattern::Nested(self.nested_pattern(a)?)),
                Some(NodeTag::ProcArg0) => {
                    p.single_arg = true;
                    Some(self.procarg0(a)?)
                }
                Some(NodeTag::OptArg) => {
                    let name = name_at(a, 0)?.to_string();
                    let default = self.expr(node_at(a, 1)?)?;
                    p.optional.push((name, default));
                    None
                }
                Some(NodeTag::RestArg) => {
                    match a.name(0) {
                        Some(n) => p.rest = Some(n.to_string()),
                        None => p.anonymous_rest = true,
                    }
                    None
                }
                Some(NodeTag::BlockArg) => {
                    p.block = a.name(0).map(str::to_string);
                    None
                }
                Some(NodeTag::KwArg) | Some(NodeTag::KwOptArg) => {
                    return Err(CompileError::malformed(a, "keyword arguments are not supported"));
                }
                _ => {
                    return Err(CompileError::malformed(args, format!("unexpected parameter '{}'", a.tag)));
                }
            };
            if let Some(pattern) = required {
                if post { p.post.push(pattern) } else { p.required.push(pattern) }
            }
        }
        Ok(p)
    }

    /// `|a|` carries its name directly or as one `arg`; `|(a, b)|` as several.
    fn procarg0(&mut self, node: &Node) -> CResult<Pattern> {
        if let Some(Child::Str(name)) = node.child(0) {
            return Ok(Pattern::Name(name.clone()));
        }
        let inner = self.nested_pattern(node)?;
        match <[Pattern; 1]>::try_from(inner) {
            Ok([one]) => Ok(one),
            Err(many) => Ok(Pattern::Nested(many)),
        }
    }

    fn nested_pattern(&mut self, node: &Node) -> CResult<Vec<Pattern>> {
        node.nodes_from(0)
            .map(|n| match n.kind() {
                Some(NodeTag::Arg) => Ok(Pattern::Name(name_at(n, 0)?.to_string())),
                Some(NodeTag::Mlhs) => Ok(Pattern::Nested(self.nested_pattern(n)?)),
                _ => Err(CompileError::malformed(n, "unsupported nested parameter")),
            })
            .collect()
    }

    /// Parameters and body of a `def`/`defs`, compiled outside any loop.
    fn method_parts(&mut self, node: &Node, args_at: usize) -> CResult<(Rc<Params>, Code)> {
        self.detached(|c| {
            let params = c.params(node_at(node, args_at)?)?;
            let body = c.child_expr(node, args_at + 1)?;
            Ok((Rc::new(params), body))
        })
    }

    /// Receiver-less `def`. In a class body or at top level the method is
    /// bound in the scope and promoted when the body ends; inside a block or
    /// method it goes straight onto the current class.
    pub(super) fn def(&mut self, node: &Node) -> CResult<Code> {
        let name = name_at(node, 0)?.to_string();
        let (params, body) = self.method_parts(node, 1)?;
        Ok(code(move |rt| {
            let method = CompiledMethod {
                params: params.clone(),
                body: body.clone(),
                scope: Some(rt.scope()),
            };
            let def = MethodDef::compiled(&name, method);
            let slf = rt.self_value();
            match rt.scope().kind {
                ScopeKind::ClassBody | ScopeKind::Top => Ok(rt.define_pending(&name, def)),
                _ => {
                    let owner = if slf.is_module_like() { slf } else { slf.class() };
                    rt.define_instance_method(&owner, &name, def);
                    Ok(rt.sym(&name))
                }
            }
        }))
    }

    /// `def target.name`
    pub(super) fn defs(&mut self, node: &Node) -> CResult<Code> {
        let target = self.child_expr(node, 0)?;
        let name = name_at(node, 1)?.to_string();
        let (params, body) = self.method_parts(node, 2)?;
        Ok(code(move |rt| {
            let t = target(rt)?;
            let method = CompiledMethod {
                params: params.clone(),
                body: body.clone(),
                scope: Some(rt.scope()),
            };
            let def = MethodDef::compiled(&name, method);
            Ok(rt.define_singleton(&t, &name, def))
        }))
    }

    pub(super) fn class(&mut self, node: &Node) -> CResult<Code> {
        let path = node_at(node, 0)?;
        let scope = self.const_scope(path, 0)?;
        let name = name_at(path, 1)?.to_string();
        let superclass = self.opt_child(node, 1)?;
        let body = self.detached(|c| c.opt_child(node, 2))?;
        Ok(code(move |rt| {
            let container = scope.container(rt)?;
            let base = match &superclass {
                Some(c) => Some(c(rt)?),
                None => None,
            };
            rt.open_class(container, &name, base, body.as_ref())
        }))
    }

    pub(super) fn module(&mut self, node: &Node) -> CResult<Code> {
        let path = node_at(node, 0)?;
        let scope = self.const_scope(path, 0)?;
        let name = name_at(path, 1)?.to_string();
        let body = self.detached(|c| c.opt_child(node, 1))?;
        Ok(code(move |rt| {
            let container = scope.container(rt)?;
            rt.open_module(container, &name, body.as_ref())
        }))
    }

    /// `class << target`
    pub(super) fn sclass(&mut self, node: &Node) -> CResult<Code> {
        let target = self.child_expr(node, 0)?;
        let body = self.detached(|c| c.opt_child(node, 1))?;
        Ok(code(move |rt| {
            let t = target(rt)?;
            rt.open_singleton(&t, body.as_ref())
        }))
    }

    pub(super) fn alias(&mut self, node: &Node) -> CResult<Code> {
        for i in 0..2 {
            let n = node_at(node, i)?;
            if !(n.is(NodeTag::Sym) || n.is(NodeTag::Dsym)) {
                return Err(CompileError::malformed(node, "only method names can be aliased"));
            }
        }
        let new = self.child_expr(node, 0)?;
        let old = self.child_expr(node, 1)?;
        Ok(code(move |rt| {
            let n = new(rt)?;
            let o = old(rt)?;
            let n = rt.name_of(&n)?;
            let o = rt.name_of(&o)?;
            rt.alias(&n, &o)?;
            Ok(rt.nil())
        }))
    }
}
