//! Class, module and singleton bodies; method installation.

use std::rc::Rc;

use tracing::debug;

use super::Runtime;
use crate::core::class::{self, AllocKind, ModelError, new_class};
use crate::core::{
    Code, Frame, MethodDef, PendingMethod, Scope, ScopeKind, Value, Visibility, dispatch,
};
use crate::errors::{RbResult, Unwind, messages};

impl Runtime {
    pub(crate) fn model_error(&self, e: ModelError) -> Unwind {
        self.type_error(e.to_string())
    }

    fn container_or_lexical(&self, container: Option<Value>) -> RbResult<Value> {
        let container = container.unwrap_or_else(|| self.lexical_module());
        if !container.is_module_like() {
            return Err(self.type_error(format!(
                "{} is not a class/module",
                self.describe(&container)
            )));
        }
        Ok(container)
    }

    /// `class Name < Base; body; end`. Looks up or creates `Name` under
    /// `container` (the lexical module when `None`) and runs the body with the
    /// class as self. Returns the body's value.
    pub fn open_class(
        &mut self,
        container: Option<Value>,
        name: &str,
        base: Option<Value>,
        body: Option<&Code>,
    ) -> RbResult<Value> {
        let container = self.container_or_lexical(container)?;
        let existing = container.as_class().and_then(|c| c.const_get(name));
        let class = match existing {
            Some(c) => {
                if !c.is_class() {
                    return Err(self.type_error(format!("{name} {}", messages::NOT_A_CLASS)));
                }
                if let Some(b) = &base {
                    let same = c.as_class().and_then(|d| d.base()).is_some_and(|x| x.ptr_eq(b));
                    if !same {
                        return Err(self.type_error(format!("superclass mismatch for class {name}")));
                    }
                }
                debug!(class = %name, "reopening class");
                c
            }
            None => {
                let base = base.unwrap_or_else(|| self.classes.object.clone());
                if !base.is_class() {
                    return Err(self.type_error(messages::SUPERCLASS_MUST_BE_CLASS));
                }
                let full = self.qualified_name(&container, name);
                let c = class::subclass(&base, &full).map_err(|e| self.model_error(e))?;
                if let Some(d) = container.as_class() {
                    d.const_set(name, c.clone());
                }
                debug!(class = %full, base = %base.module_name().unwrap_or_default(), "defined class");
                if dispatch::has_method(&base, "inherited") {
                    self.send(&base, "inherited", &[c.clone()], None)?;
                }
                c
            }
        };
        self.run_body(&class, false, body)
    }

    /// `module Name; body; end`.
    pub fn open_module(
        &mut self,
        container: Option<Value>,
        name: &str,
        body: Option<&Code>,
    ) -> RbResult<Value> {
        let container = self.container_or_lexical(container)?;
        let existing = container.as_class().and_then(|c| c.const_get(name));
        let module = match existing {
            Some(m) => {
                if !m.is_module() {
                    return Err(self.type_error(format!("{name} {}", messages::NOT_A_MODULE)));
                }
                debug!(module = %name, "reopening module");
                m
            }
            None => {
                let full = self.qualified_name(&container, name);
                let m = self.new_module(&full);
                if let Some(d) = container.as_class() {
                    d.const_set(name, m.clone());
                }
                debug!(module = %full, "defined module");
                m
            }
        };
        self.run_body(&module, false, body)
    }

    /// `class << target; body; end`: definitions land on `target` itself.
    pub fn open_singleton(&mut self, target: &Value, body: Option<&Code>) -> RbResult<Value> {
        self.run_body(target, true, body)
    }

    pub fn new_module(&self, name: &str) -> Value {
        new_class(Some(&self.classes.module), name, true, None, AllocKind::None)
    }

    fn run_body(&mut self, target: &Value, singleton: bool, body: Option<&Code>) -> RbResult<Value> {
        let frame = Frame::new(target.clone(), None);
        let scope = Scope::new(ScopeKind::ClassBody, Some(self.scope()));
        let out = self.with_frame_and_scope(frame, scope.clone(), |rt| match body {
            Some(code) => code(rt),
            None => Ok(rt.nil()),
        });
        self.promote_methods(target, singleton, &scope);
        out
    }

    /// Moves source-defined callables bound in a finished body scope onto
    /// the class (or, for a singleton body, onto the object itself).
    fn promote_methods(&self, target: &Value, singleton: bool, scope: &Rc<Scope>) {
        for (name, pending) in scope.take_methods() {
            if !pending.def.source_defined {
                continue;
            }
            if singleton {
                let redefined = dispatch::has_method(target, &name);
                target
                    .own_methods_mut()
                    .insert(&name, pending.def, pending.visibility);
                debug!(method = %name, redefined, "promoted singleton method");
            } else if let Some(data) = target.as_class() {
                let redefined = data.has_instance_method(&name);
                data.instance_methods_mut()
                    .insert(&name, pending.def, pending.visibility);
                debug!(
                    class = %data.name(),
                    method = %name,
                    visibility = pending.visibility.as_str(),
                    redefined,
                    "promoted method"
                );
            }
        }
    }

    /// Receiver-less `def`: binds the callable in the innermost scope with
    /// the frame's default visibility.
    pub fn define_pending(&mut self, name: &str, def: Rc<MethodDef>) -> Value {
        let visibility = self.frame().visibility.get();
        self.scope()
            .define_method(name, PendingMethod { def, visibility });
        self.sym(name)
    }

    /// `def target.name`: straight into the target's own public table.
    pub fn define_singleton(&mut self, target: &Value, name: &str, def: Rc<MethodDef>) -> Value {
        target
            .own_methods_mut()
            .insert(name, def, Visibility::Public);
        self.sym(name)
    }

    /// Installs an instance method on `module` with the default visibility
    /// of the body currently defining it.
    pub fn define_instance_method(&self, module: &Value, name: &str, def: Rc<MethodDef>) {
        let vis = if self.frame().slf.ptr_eq(module) {
            self.frame().visibility.get()
        } else {
            Visibility::Public
        };
        if let Some(data) = module.as_class() {
            data.instance_methods_mut().insert(name, def, vis);
        }
    }

    /// The current scope when it is the body scope of `module`.
    fn body_scope_of(&self, module: &Value) -> Option<Rc<Scope>> {
        let scope = self.scope();
        (scope.kind == ScopeKind::ClassBody && self.frame().slf.ptr_eq(module)).then_some(scope)
    }

    /// `alias_method new, old` on `module`.
    pub fn alias_in(&mut self, module: &Value, new: &str, old: &str) -> RbResult<()> {
        if let Some(scope) = self.body_scope_of(module) {
            if let Some(p) = scope.pending(old) {
                scope.define_method(
                    new,
                    PendingMethod {
                        def: p.def.renamed(new),
                        visibility: p.visibility,
                    },
                );
                return Ok(());
            }
        }
        match dispatch::find_instance_method(module, old) {
            Some((def, vis)) => {
                if let Some(data) = module.as_class() {
                    data.instance_methods_mut().insert(new, def.renamed(new), vis);
                }
                Ok(())
            }
            None => Err(self.name_error(format!(
                "undefined method '{}' for {}",
                old,
                self.describe(module)
            ))),
        }
    }

    /// The `alias` keyword: the enclosing class, or top-level callables.
    pub fn alias(&mut self, new: &str, old: &str) -> RbResult<()> {
        let slf = self.self_value();
        if slf.is_module_like() {
            return self.alias_in(&slf, new, old);
        }
        if let Some(def) = self.scope().find_method(old) {
            self.define_pending(new, def.renamed(new));
            return Ok(());
        }
        self.alias_in(&slf.class(), new, old)
    }

    /// `private` / `protected` / `public`. Without names, changes the default
    /// for later `def`s in the body; with names, moves those methods.
    pub fn set_visibility(&mut self, module: &Value, vis: Visibility, names: &[String]) -> RbResult<()> {
        if names.is_empty() {
            if self.frame().slf.ptr_eq(module) {
                self.frame().visibility.set(vis);
            }
            return Ok(());
        }
        let body = self.body_scope_of(module);
        for name in names {
            if body.as_ref().is_some_and(|s| s.pending_visibility(name, vis)) {
                continue;
            }
            let Some(data) = module.as_class() else {
                continue;
            };
            if data.instance_methods_mut().set_visibility(name, vis) {
                continue;
            }
            match dispatch::find_instance_method(module, name) {
                Some((def, _)) => data.instance_methods_mut().insert(name, def, vis),
                None => {
                    return Err(self.name_error(format!(
                        "undefined method '{}' for {}",
                        name,
                        self.describe(module)
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn include_module(&mut self, target: &Value, module: &Value) -> RbResult<()> {
        class::include(target, module).map_err(|e| self.model_error(e))?;
        debug!(target = %target.module_name().unwrap_or_default(), module = %module.module_name().unwrap_or_default(), "included module");
        if dispatch::has_method(module, "included") {
            self.send(module, "included", &[target.clone()], None)?;
        }
        Ok(())
    }

    pub fn extend_object(&mut self, obj: &Value, module: &Value) -> RbResult<()> {
        class::extend(obj, module).map_err(|e| self.model_error(e))?;
        if dispatch::has_method(module, "extended") {
            self.send(module, "extended", &[obj.clone()], None)?;
        }
        Ok(())
    }
}
