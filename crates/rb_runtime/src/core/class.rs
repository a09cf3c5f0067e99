//! Classes, modules and visibility-partitioned method tables.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use thiserror::Error;

use super::method::MethodDef;
use super::value::{Data, FastHashMap, OrderedMap, Value, fast_map_new, ordered_map_new};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }
}

/// Three method maps, one per visibility. A name lives in at most one.
#[derive(Clone)]
pub struct MethodTables {
    public: FastHashMap<String, Rc<MethodDef>>,
    protected: FastHashMap<String, Rc<MethodDef>>,
    private: FastHashMap<String, Rc<MethodDef>>,
}

impl Default for MethodTables {
    fn default() -> Self {
        Self {
            public: fast_map_new(),
            protected: fast_map_new(),
            private: fast_map_new(),
        }
    }
}

impl MethodTables {
    fn table(&self, vis: Visibility) -> &FastHashMap<String, Rc<MethodDef>> {
        match vis {
            Visibility::Public => &self.public,
            Visibility::Protected => &self.protected,
            Visibility::Private => &self.private,
        }
    }

    fn table_mut(&mut self, vis: Visibility) -> &mut FastHashMap<String, Rc<MethodDef>> {
        match vis {
            Visibility::Public => &mut self.public,
            Visibility::Protected => &mut self.protected,
            Visibility::Private => &mut self.private,
        }
    }

    pub fn insert(&mut self, name: &str, def: Rc<MethodDef>, vis: Visibility) {
        self.remove(name);
        self.table_mut(vis).insert(name.to_string(), def);
    }

    pub fn get(&self, name: &str, vis: Visibility) -> Option<Rc<MethodDef>> {
        self.table(vis).get(name).cloned()
    }

    /// The definition and the partition it sits in.
    pub fn lookup(&self, name: &str) -> Option<(Rc<MethodDef>, Visibility)> {
        [Visibility::Public, Visibility::Protected, Visibility::Private]
            .into_iter()
            .find_map(|vis| self.get(name, vis).map(|d| (d, vis)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Rc<MethodDef>> {
        let a = self.public.remove(name);
        let b = self.protected.remove(name);
        let c = self.private.remove(name);
        a.or(b).or(c)
    }

    /// Moves an existing entry to another partition. False if absent.
    pub fn set_visibility(&mut self, name: &str, vis: Visibility) -> bool {
        match self.remove(name) {
            Some(def) => {
                self.table_mut(vis).insert(name.to_string(), def);
                true
            }
            None => false,
        }
    }

    pub fn names(&self, vis: Visibility) -> Vec<String> {
        let mut out: Vec<String> = self.table(vis).keys().cloned().collect();
        out.sort();
        out
    }

    pub fn is_empty(&self) -> bool {
        self.public.is_empty() && self.protected.is_empty() && self.private.is_empty()
    }
}

/// What `Class#new` allocates for instances of a class and its subclasses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocKind {
    Object,
    Array,
    Hash,
    Str,
    Class,
    Module,
    /// Instances only come from literals or dedicated constructors.
    None,
}

pub struct ClassData {
    name: RefCell<String>,
    module: bool,
    base: Option<Value>,
    alloc: AllocKind,
    pub(crate) imethods: RefCell<MethodTables>,
    pub(crate) included: RefCell<Vec<Value>>,
    pub(crate) consts: RefCell<OrderedMap<Value>>,
    pub(crate) cvars: RefCell<OrderedMap<Value>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("can't make subclass of module {0}")]
    SubclassOfModule(String),
    #[error("wrong argument type {0} (expected Module)")]
    NotAModule(String),
    #[error("wrong argument type {0} (expected Class)")]
    NotAClass(String),
}

impl ClassData {
    pub fn name(&self) -> String {
        self.name.borrow().clone()
    }

    pub(crate) fn set_name(&self, name: &str) {
        *self.name.borrow_mut() = name.to_string();
    }

    pub fn is_module(&self) -> bool {
        self.module
    }

    pub fn base(&self) -> Option<&Value> {
        self.base.as_ref()
    }

    pub fn alloc_kind(&self) -> AllocKind {
        self.alloc
    }

    pub fn instance_methods(&self) -> Ref<'_, MethodTables> {
        self.imethods.borrow()
    }

    pub(crate) fn instance_methods_mut(&self) -> RefMut<'_, MethodTables> {
        self.imethods.borrow_mut()
    }

    pub fn included(&self) -> Ref<'_, Vec<Value>> {
        self.included.borrow()
    }

    pub fn has_instance_method(&self, name: &str) -> bool {
        self.imethods.borrow().contains(name)
    }

    pub fn const_get(&self, name: &str) -> Option<Value> {
        self.consts.borrow().get(name).cloned()
    }

    pub fn const_set(&self, name: &str, value: Value) {
        self.consts.borrow_mut().insert(name.to_string(), value);
    }

    pub fn const_names(&self) -> Vec<String> {
        self.consts.borrow().keys().cloned().collect()
    }
}

/// Allocates a class (or module) object whose type is `meta`.
pub fn new_class(
    meta: Option<&Value>,
    name: &str,
    module: bool,
    base: Option<&Value>,
    alloc: AllocKind,
) -> Value {
    Value::alloc(
        meta,
        Data::Class(ClassData {
            name: RefCell::new(name.to_string()),
            module,
            base: base.cloned(),
            alloc,
            imethods: RefCell::new(MethodTables::default()),
            included: RefCell::new(Vec::new()),
            consts: RefCell::new(ordered_map_new()),
            cvars: RefCell::new(ordered_map_new()),
        }),
    )
}

/// New empty class whose base is `parent`. Inherited methods are found by
/// traversal, never copied.
pub fn subclass(parent: &Value, name: &str) -> Result<Value, ModelError> {
    let data = parent
        .as_class()
        .ok_or_else(|| ModelError::NotAClass(parent.class_name()))?;
    if data.is_module() {
        return Err(ModelError::SubclassOfModule(data.name()));
    }
    let meta = parent.class();
    Ok(new_class(Some(&meta), name, false, Some(parent), data.alloc_kind()))
}

/// Same name and base, with shallow copies of the three instance-method
/// tables. Methods inherited from the base are not flattened in.
pub fn copy(class: &Value) -> Result<Value, ModelError> {
    let data = class
        .as_class()
        .ok_or_else(|| ModelError::NotAClass(class.class_name()))?;
    let meta = class.class();
    let out = new_class(
        Some(&meta),
        &data.name(),
        data.is_module(),
        data.base(),
        data.alloc_kind(),
    );
    if let Some(new) = out.as_class() {
        *new.imethods.borrow_mut() = data.imethods.borrow().clone();
        *new.included.borrow_mut() = data.included.borrow().clone();
    }
    Ok(out)
}

/// Adds `module` to the instance lookup of `target`, between it and its base.
pub fn include(target: &Value, module: &Value) -> Result<(), ModelError> {
    let data = target
        .as_class()
        .ok_or_else(|| ModelError::NotAClass(target.class_name()))?;
    if !module.is_module() {
        return Err(ModelError::NotAModule(module.class_name()));
    }
    let mut list = data.included.borrow_mut();
    if !list.iter().any(|m| m.ptr_eq(module)) {
        list.push(module.clone());
    }
    Ok(())
}

/// Adds `module` to the lookup of `obj` itself.
pub fn extend(obj: &Value, module: &Value) -> Result<(), ModelError> {
    if !module.is_module() {
        return Err(ModelError::NotAModule(module.class_name()));
    }
    let mut list = obj.extended_mut();
    if !list.iter().any(|m| m.ptr_eq(module)) {
        list.push(module.clone());
    }
    Ok(())
}
