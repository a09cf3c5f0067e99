//! Method sends, activations, blocks and `super`.

use std::rc::Rc;

use smallvec::SmallVec;
use tracing::trace;

use super::Runtime;
use crate::core::dispatch::{self, CallerContext, Holder, Miss, Resolved};
use crate::core::{
    Activation, Callable, Frame, MethodDef, MethodInfo, Params, Pattern, ProcBody, Scope,
    ScopeKind, Value,
};
use crate::errors::{RbResult, Unwind, messages};

type ArgVec = SmallVec<[Value; 4]>;

/// Runs a proc body as if it were a method of `slf`.
struct Rebind {
    slf: Value,
    activation: Rc<Activation>,
    lambda: bool,
}

impl Runtime {
    /// Visibility a send to `recv` may see from the current self.
    pub fn caller_context(&self, recv: &Value) -> CallerContext {
        let slf = self.self_value();
        if recv.ptr_eq(&slf) {
            return CallerContext::ALL;
        }
        CallerContext {
            private: false,
            protected: dispatch::is_a(&slf, &recv.class()),
        }
    }

    /// Send from the runtime itself (`to_s` for `puts`, `each` for
    /// `Enumerable`, `send`). Sees every visibility.
    pub fn send(
        &mut self,
        recv: &Value,
        name: &str,
        args: &[Value],
        block: Option<&Value>,
    ) -> RbResult<Value> {
        self.send_with(recv, name, args, block, CallerContext::ALL)
    }

    /// Send with an explicit receiver written in program text.
    pub fn call_method(
        &mut self,
        recv: &Value,
        name: &str,
        args: &[Value],
        block: Option<&Value>,
    ) -> RbResult<Value> {
        let ctx = self.caller_context(recv);
        self.send_with(recv, name, args, block, ctx)
    }

    pub fn send_with(
        &mut self,
        recv: &Value,
        name: &str,
        args: &[Value],
        block: Option<&Value>,
        ctx: CallerContext,
    ) -> RbResult<Value> {
        match dispatch::find_method(recv, name, ctx) {
            Ok(res) => self.run_method(&res.def, res.holder, recv, args, block),
            Err(miss) => self.method_missing(recv, name, args, block, miss),
        }
    }

    /// A receiver-less call: a callable bound in the scope chain first, then
    /// a method on the current self.
    pub fn send_local_or_self(
        &mut self,
        name: &str,
        args: &[Value],
        block: Option<&Value>,
    ) -> RbResult<Value> {
        let slf = self.self_value();
        if let Some(def) = self.scope().find_method(name) {
            return self.run_method(&def, Holder::Own(slf.clone()), &slf, args, block);
        }
        match dispatch::find_method(&slf, name, CallerContext::ALL) {
            Ok(res) => self.run_method(&res.def, res.holder, &slf, args, block),
            Err(_) if self.user_method_missing(&slf).is_some() => {
                self.method_missing(&slf, name, args, block, Miss::Undefined)
            }
            Err(_) if args.is_empty() && block.is_none() => Err(self.name_error(format!(
                "undefined local variable or method '{}' for {}",
                name,
                self.describe(&slf)
            ))),
            Err(miss) => Err(self.missing_method_error(&slf, name, miss)),
        }
    }

    pub fn respond_to(&self, recv: &Value, name: &str, include_private: bool) -> bool {
        let ctx = if include_private {
            CallerContext::ALL
        } else {
            CallerContext::PUBLIC
        };
        dispatch::responds_to(recv, name, ctx)
    }

    fn user_method_missing(&self, recv: &Value) -> Option<Resolved> {
        let res = dispatch::find_method(recv, "method_missing", CallerContext::ALL).ok()?;
        match &res.holder {
            Holder::Instance(c) if c.ptr_eq(&self.classes.basic_object) => None,
            _ => Some(res),
        }
    }

    fn method_missing(
        &mut self,
        recv: &Value,
        name: &str,
        args: &[Value],
        block: Option<&Value>,
        miss: Miss,
    ) -> RbResult<Value> {
        if let Some(mm) = self.user_method_missing(recv) {
            let mut full: ArgVec = SmallVec::with_capacity(args.len() + 1);
            full.push(self.sym(name));
            full.extend(args.iter().cloned());
            return self.run_method(&mm.def, mm.holder, recv, &full, block);
        }
        Err(self.missing_method_error(recv, name, miss))
    }

    pub(crate) fn missing_method_error(&self, recv: &Value, name: &str, miss: Miss) -> Unwind {
        trace!(method = name, ?miss, "no method");
        match miss {
            Miss::Hidden(vis) => self.no_method_error(format!(
                "{} method '{}' called for {}",
                vis.as_str(),
                name,
                self.describe(recv)
            )),
            Miss::Undefined => self.no_method_error(format!(
                "undefined method '{}' for {}",
                name,
                self.describe(recv)
            )),
        }
    }

    fn enter_call(&mut self) -> RbResult<()> {
        if self.depth >= self.config.max_call_depth {
            return Err(self.error(&self.classes.system_stack_error, messages::STACK_TOO_DEEP));
        }
        self.depth += 1;
        Ok(())
    }

    /// Invokes a resolved definition with `recv` as self.
    pub fn run_method(
        &mut self,
        def: &Rc<MethodDef>,
        holder: Holder,
        recv: &Value,
        args: &[Value],
        block: Option<&Value>,
    ) -> RbResult<Value> {
        self.enter_call()?;
        let out = match &def.body {
            Callable::Native(f) => f(self, recv, args, block),
            Callable::Closure(f) => f(self, recv, args, block),
            Callable::Compiled(m) => {
                let id = self.next_activation_id();
                let activation = Rc::new(Activation {
                    id,
                    method: Some(MethodInfo {
                        name: def.name.clone(),
                        owner: holder,
                    }),
                    args: args.to_vec(),
                    block: block.cloned(),
                });
                let frame = Frame::new(recv.clone(), Some(activation));
                let scope = Scope::new(ScopeKind::Method, m.scope.clone());
                let out = self.with_frame_and_scope(frame, scope, |rt| {
                    rt.bind_params(&def.name, &m.params, args, block, true)?;
                    (m.body)(rt)
                });
                match out {
                    Err(Unwind::Return {
                        target: Some(t),
                        value,
                    }) if t == id => Ok(value),
                    other => other,
                }
            }
            Callable::Proc(p) => {
                let id = self.next_activation_id();
                let activation = Rc::new(Activation {
                    id,
                    method: Some(MethodInfo {
                        name: def.name.clone(),
                        owner: holder,
                    }),
                    args: args.to_vec(),
                    block: block.cloned(),
                });
                let rebind = Rebind {
                    slf: recv.clone(),
                    activation,
                    lambda: true,
                };
                self.call_proc(p, args, block, Some(rebind))
            }
        };
        self.depth -= 1;
        out
    }

    /// Calls a block or proc with `args`. `next` inside it ends this call.
    pub fn call_block(&mut self, blk: &Value, args: &[Value]) -> RbResult<Value> {
        self.call_proc(blk, args, None, None)
    }

    pub fn call_block_with(
        &mut self,
        blk: &Value,
        args: &[Value],
        block: Option<&Value>,
    ) -> RbResult<Value> {
        self.call_proc(blk, args, block, None)
    }

    /// Runs a block with another self (`instance_eval`, `class_eval`).
    pub fn call_block_as(&mut self, blk: &Value, slf: &Value, args: &[Value]) -> RbResult<Value> {
        let activation = Rc::new(Activation {
            id: self.next_activation_id(),
            method: None,
            args: Vec::new(),
            block: None,
        });
        let rebind = Rebind {
            slf: slf.clone(),
            activation,
            lambda: false,
        };
        self.call_proc(blk, args, None, Some(rebind))
    }

    fn call_proc(
        &mut self,
        blk: &Value,
        args: &[Value],
        block: Option<&Value>,
        rebind: Option<Rebind>,
    ) -> RbResult<Value> {
        let Some(p) = blk.as_proc() else {
            return Err(self.type_error(format!(
                "wrong argument type {} (expected Proc)",
                blk.class_name()
            )));
        };
        let code = match &p.body {
            ProcBody::Native(f) => {
                let f = f.clone();
                return match f(self, args) {
                    Err(Unwind::Next(v)) => Ok(v),
                    other => other,
                };
            }
            ProcBody::Compiled(code) => code,
        };
        let mut frame = code.frame.clone();
        let strict = p.lambda || rebind.as_ref().is_some_and(|r| r.lambda);
        let own_return = match rebind {
            Some(Rebind {
                slf,
                activation,
                lambda,
            }) => {
                let id = activation.id;
                frame = Frame::new(slf, Some(activation));
                if lambda {
                    frame.lambda = Some(id);
                    Some(id)
                } else {
                    // `return` still leaves the method that owns the block.
                    frame.lambda = code.frame.return_target();
                    None
                }
            }
            None if p.lambda => {
                let id = self.next_activation_id();
                frame.lambda = Some(id);
                Some(id)
            }
            None => None,
        };
        let scope = Scope::new(ScopeKind::Block, Some(code.scope.clone()));
        let params = code.params.clone();
        let body = code.body.clone();
        let site = code.site;
        self.enter_call()?;
        let out = self.with_frame_and_scope(frame, scope, |rt| {
            rt.bind_params("block", &params, args, block, strict)?;
            body(rt)
        });
        self.depth -= 1;
        match out {
            Err(Unwind::Next(v)) => {
                trace!("next caught at block boundary");
                Ok(v)
            }
            Err(Unwind::Return {
                target: Some(t),
                value,
            }) if Some(t) == own_return => Ok(value),
            Err(Unwind::Break { site: s, value }) if strict && s == site => Ok(value),
            other => other,
        }
    }

    pub fn block_given(&self) -> bool {
        self.frame().block().is_some()
    }

    /// `yield`: calls the running activation's block.
    pub fn yield_block(&mut self, args: &[Value]) -> RbResult<Value> {
        match self.frame().block().cloned() {
            Some(blk) => self.call_block(&blk, args),
            None => Err(self.local_jump(messages::NO_BLOCK_GIVEN)),
        }
    }

    /// `super` / bare `super`. `None` args forwards the activation's
    /// arguments; without an explicit block the activation's block is passed.
    pub fn call_super(&mut self, args: Option<&[Value]>, block: Option<&Value>) -> RbResult<Value> {
        let frame = self.frame().clone();
        let Some(info) = frame.activation.as_ref().and_then(|a| a.method.as_ref()) else {
            return Err(self.runtime_error("super called outside of method"));
        };
        let Some(activation) = frame.activation.as_ref() else {
            return Err(self.runtime_error("super called outside of method"));
        };
        let args: Vec<Value> = match args {
            Some(a) => a.to_vec(),
            None => activation.args.clone(),
        };
        let block = block.cloned().or_else(|| activation.block.clone());
        match dispatch::find_super_method(&frame.slf, &info.name, &info.owner) {
            Some(res) => self.run_method(&res.def, res.holder, &frame.slf, &args, block.as_ref()),
            None => Err(self.no_method_error(format!(
                "super: no superclass method '{}' for {}",
                info.name,
                self.describe(&frame.slf)
            ))),
        }
    }

    /// Binds arguments into the current scope, which the caller has just
    /// pushed. `strict` applies method/lambda arity rules; otherwise missing
    /// arguments become nil, extras are dropped and a lone Array argument is
    /// spread over several parameters.
    pub(crate) fn bind_params(
        &mut self,
        name: &str,
        params: &Params,
        args: &[Value],
        block: Option<&Value>,
        strict: bool,
    ) -> RbResult<()> {
        let spread;
        let mut args = args;
        if !strict && !params.single_arg && args.len() == 1 {
            let positional = params.required_count() + params.optional.len();
            if positional > 1 || (positional == 1 && params.has_rest()) {
                if let Some(items) = args[0].as_array() {
                    spread = items.borrow().clone();
                    args = &spread;
                }
            }
        }
        let n = args.len();
        if strict && !params.accepts(n) {
            let req = params.required_count();
            let expected = if params.has_rest() {
                format!("{req}+")
            } else if params.optional.is_empty() {
                req.to_string()
            } else {
                format!("{}..{}", req, req + params.optional.len())
            };
            trace!(method = name, given = n, "arity mismatch");
            return Err(self.arg_error(format!(
                "wrong number of arguments (given {n}, expected {expected})"
            )));
        }

        let scope = self.scope();
        let fixed = params.required_count();
        let n_opt = n.saturating_sub(fixed).min(params.optional.len());
        let n_rest = n.saturating_sub(fixed + n_opt);
        let mut idx = 0;
        for p in &params.required {
            let v = args.get(idx).cloned().unwrap_or_else(|| self.nil());
            self.bind_pattern(&scope, p, v);
            idx += 1;
        }
        for (i, (opt, default)) in params.optional.iter().enumerate() {
            if i < n_opt {
                scope.declare(opt, args[idx].clone());
                idx += 1;
            } else {
                let v = default(self)?;
                scope.declare(opt, v);
            }
        }
        if params.has_rest() {
            let end = (idx + n_rest).min(n);
            let rest = self.array(args[idx.min(n)..end].to_vec());
            if let Some(r) = &params.rest {
                scope.declare(r, rest);
            }
            idx = end;
        }
        for p in &params.post {
            let v = args.get(idx).cloned().unwrap_or_else(|| self.nil());
            self.bind_pattern(&scope, p, v);
            idx += 1;
        }
        if let Some(b) = &params.block {
            let v = block.cloned().unwrap_or_else(|| self.nil());
            scope.declare(b, v);
        }
        Ok(())
    }

    fn bind_pattern(&self, scope: &Rc<Scope>, pattern: &Pattern, value: Value) {
        match pattern {
            Pattern::Name(n) => scope.declare(n, value),
            Pattern::Nested(parts) => {
                let items = match value.as_array() {
                    Some(a) => a.borrow().clone(),
                    None => vec![value],
                };
                for (i, p) in parts.iter().enumerate() {
                    let v = items.get(i).cloned().unwrap_or_else(|| self.nil());
                    self.bind_pattern(scope, p, v);
                }
            }
        }
    }
}
