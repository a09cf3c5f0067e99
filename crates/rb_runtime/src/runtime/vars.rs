//! Locals, instance/class/global variables and constants.

use super::Runtime;
use crate::core::{Data, Value, dispatch};
use crate::errors::RbResult;

impl Runtime {
    // ==== locals ====

    /// An unset local reads as nil.
    pub fn get_local(&self, name: &str) -> Value {
        self.scope().get(name).unwrap_or_else(|| self.nil())
    }

    pub fn set_local(&self, name: &str, value: Value) {
        self.scope().set(name, value);
    }

    pub fn local_defined(&self, name: &str) -> bool {
        self.scope().is_defined(name)
    }

    // ==== instance variables ====

    /// Reads from the object on top of the self stack; unset reads as nil.
    pub fn get_ivar(&self, name: &str) -> Value {
        self.frame().slf.ivar(name).unwrap_or_else(|| self.nil())
    }

    pub fn set_ivar(&self, name: &str, value: Value) {
        self.frame().slf.set_ivar(name, value);
    }

    // ==== globals ====

    pub fn get_global(&self, name: &str) -> Value {
        if name == "$~" {
            return match &self.last_match {
                Some(groups) => {
                    let items = groups
                        .iter()
                        .map(|g| g.as_ref().map(|s| self.str(s.clone())).unwrap_or_else(|| self.nil()))
                        .collect();
                    self.array(items)
                }
                None => self.nil(),
            };
        }
        self.globals.get(name).cloned().unwrap_or_else(|| self.nil())
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_string(), value);
    }

    /// `$1`, `$2`... from the last successful match.
    pub fn nth_ref(&self, n: usize) -> Value {
        self.last_match
            .as_ref()
            .and_then(|groups| groups.get(n).cloned().flatten())
            .map(|s| self.str(s))
            .unwrap_or_else(|| self.nil())
    }

    // ==== class variables ====

    /// Class or module a class-variable access in the current frame refers to.
    fn cvar_base(&self) -> Value {
        let slf = self.self_value();
        if slf.is_module_like() { slf } else { slf.class() }
    }

    fn cvar_owner(&self, name: &str) -> Option<Value> {
        let base = self.cvar_base();
        dispatch::ancestors(&base).into_iter().find(|c| {
            c.as_class()
                .is_some_and(|d| d.cvars.borrow().contains_key(name))
        })
    }

    pub fn get_cvar(&self, name: &str) -> RbResult<Value> {
        let found = self
            .cvar_owner(name)
            .and_then(|c| c.as_class().and_then(|d| d.cvars.borrow().get(name).cloned()));
        found.ok_or_else(|| {
            self.name_error(format!(
                "uninitialized class variable {} in {}",
                name,
                self.cvar_base().module_name().unwrap_or_default()
            ))
        })
    }

    pub fn set_cvar(&self, name: &str, value: Value) {
        let owner = self.cvar_owner(name).unwrap_or_else(|| self.cvar_base());
        if let Some(d) = owner.as_class() {
            d.cvars.borrow_mut().insert(name.to_string(), value);
        }
    }

    // ==== constants ====

    /// Class or module that holds constants for a frame whose self is `v`.
    fn const_holder(&self, v: &Value) -> Value {
        if v.is_module_like() { v.clone() } else { v.class() }
    }

    /// Unqualified constant: the self stack innermost to outermost, then the
    /// ancestors of the innermost holder, then `Object`.
    pub fn get_const(&self, name: &str) -> RbResult<Value> {
        for frame in self.frames.iter().rev() {
            let holder = self.const_holder(&frame.slf);
            if let Some(v) = holder.as_class().and_then(|c| c.const_get(name)) {
                return Ok(v);
            }
        }
        let innermost = self.const_holder(&self.self_value());
        for c in dispatch::ancestors(&innermost) {
            if let Some(v) = c.as_class().and_then(|d| d.const_get(name)) {
                return Ok(v);
            }
        }
        self.top_const(name)
    }

    /// `::Name`
    pub fn top_const(&self, name: &str) -> RbResult<Value> {
        self.classes
            .object
            .as_class()
            .and_then(|o| o.const_get(name))
            .ok_or_else(|| self.name_error(format!("uninitialized constant {name}")))
    }

    /// `Scope::Name`: the scope module and its ancestors.
    pub fn scoped_const(&self, scope: &Value, name: &str) -> RbResult<Value> {
        let Some(data) = scope.as_class() else {
            return Err(self.type_error(format!(
                "{} is not a class/module",
                self.describe(scope)
            )));
        };
        for c in dispatch::ancestors(scope) {
            if let Some(v) = c.as_class().and_then(|d| d.const_get(name)) {
                return Ok(v);
            }
        }
        Err(self.name_error(format!("uninitialized constant {}::{}", data.name(), name)))
    }

    pub fn const_defined(&self, name: &str) -> bool {
        self.get_const(name).is_ok()
    }

    /// Class or module a definition in the current frame lands in.
    pub fn lexical_module(&self) -> Value {
        self.const_holder(&self.self_value())
    }

    /// Defines `name` in the innermost holder. Fails when already defined there.
    pub fn set_const(&self, name: &str, value: Value) -> RbResult<Value> {
        let holder = self.lexical_module();
        self.set_const_in(&holder, name, value)
    }

    pub fn set_const_in(&self, holder: &Value, name: &str, value: Value) -> RbResult<Value> {
        let Some(data) = holder.as_class() else {
            return Err(self.type_error(format!(
                "{} is not a class/module",
                self.describe(holder)
            )));
        };
        if data.const_get(name).is_some() {
            return Err(self.name_error(format!("already initialized constant {name}")));
        }
        if let Data::Class(c) = value.data() {
            if c.name().is_empty() {
                c.set_name(&self.qualified_name(holder, name));
            }
        }
        data.const_set(name, value.clone());
        Ok(value)
    }

    /// `Outer::Inner`, or just `Inner` directly under `Object`.
    pub(crate) fn qualified_name(&self, container: &Value, name: &str) -> String {
        if container.ptr_eq(&self.classes.object) {
            return name.to_string();
        }
        match container.module_name() {
            Some(outer) if !outer.is_empty() => format!("{outer}::{name}"),
            _ => name.to_string(),
        }
    }
}
