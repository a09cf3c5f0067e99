//! Runtime value representation.
//!
//! Every runtime value is a reference-counted object with exactly one type
//! (its class), its own visibility-partitioned method tables, a list of
//! extended modules, and an instance-variable map. Builtin payloads (numbers,
//! strings, containers, procs, classes) ride along in [`Data`].

use std::cell::{OnceCell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use ahash::RandomState;
use indexmap::IndexMap;
use num_bigint::BigInt;

use super::class::{ClassData, MethodTables};
use super::env::{Frame, Scope};
use super::method::{Code, Params};
use crate::errors::RbResult;
use crate::runtime::Runtime;

pub type FastHashMap<K, V> = hashbrown::HashMap<K, V, RandomState>;

#[inline]
pub fn fast_map_new<K, V>() -> FastHashMap<K, V> {
    FastHashMap::with_hasher(RandomState::new())
}

/// Insertion-ordered map used for instance variables, constants and locals.
pub type OrderedMap<V> = IndexMap<String, V, RandomState>;

#[inline]
pub fn ordered_map_new<V>() -> OrderedMap<V> {
    IndexMap::with_hasher(RandomState::new())
}

#[derive(Clone)]
pub struct Value(Rc<RObject>);

pub struct RObject {
    class: OnceCell<Value>,
    pub(crate) own: RefCell<MethodTables>,
    pub(crate) extended: RefCell<Vec<Value>>,
    pub(crate) ivars: RefCell<OrderedMap<Value>>,
    pub(crate) data: Data,
}

/// Builtin payload carried by an object.
pub enum Data {
    Object,
    Class(ClassData),
    Nil,
    True,
    False,
    Integer(BigInt),
    Float(f64),
    Str(RefCell<String>),
    Symbol(Rc<str>),
    Array(RefCell<Vec<Value>>),
    Hash(RefCell<HashData>),
    Range(RangeData),
    Proc(ProcData),
    Regexp(RegexpData),
}

/// Parallel key/value sequences with linear-scan lookup.
pub struct HashData {
    pub keys: Vec<Value>,
    pub values: Vec<Value>,
    pub default: Option<Value>,
    /// `Hash.new { |h, k| ... }`, called for missing keys.
    pub default_proc: Option<Value>,
}

pub struct RangeData {
    pub start: Value,
    pub end: Value,
    pub exclusive: bool,
}

pub struct RegexpData {
    pub regex: regex::Regex,
    pub source: String,
    pub flags: String,
}

pub type NativeBlockFn = dyn Fn(&mut Runtime, &[Value]) -> RbResult<Value>;

pub struct ProcData {
    pub body: ProcBody,
    pub lambda: bool,
}

impl ProcData {
    pub fn arity(&self) -> i64 {
        match &self.body {
            ProcBody::Compiled(code) => code.params.arity(),
            ProcBody::Native(_) => -1,
        }
    }
}

pub enum ProcBody {
    Compiled(BlockCode),
    Native(Rc<NativeBlockFn>),
}

/// A compiled block together with the environment it closes over.
pub struct BlockCode {
    pub params: Rc<Params>,
    pub body: Code,
    pub scope: Rc<Scope>,
    pub frame: Frame,
    /// Compile-time site of the block node; `break` inside targets it.
    pub site: u32,
}

impl Value {
    pub(crate) fn alloc(class: Option<&Value>, data: Data) -> Self {
        let cell = OnceCell::new();
        if let Some(c) = class {
            let _ = cell.set(c.clone());
        }
        Value(Rc::new(RObject {
            class: cell,
            own: RefCell::new(MethodTables::default()),
            extended: RefCell::new(Vec::new()),
            ivars: RefCell::new(ordered_map_new()),
            data,
        }))
    }

    /// Assigns the type of an object built before its class existed. Only the
    /// bootstrap classes go through this; the type is fixed afterwards.
    pub(crate) fn bind_class(&self, class: &Value) {
        let _ = self.0.class.set(class.clone());
    }

    /// The owning type. Unset only while the root classes are being wired.
    pub fn class(&self) -> Value {
        self.0.class.get().cloned().unwrap_or_else(|| self.clone())
    }

    #[inline]
    pub fn data(&self) -> &Data {
        &self.0.data
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity for the lifetime of the object.
    pub fn object_id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn own_methods(&self) -> Ref<'_, MethodTables> {
        self.0.own.borrow()
    }

    pub(crate) fn own_methods_mut(&self) -> RefMut<'_, MethodTables> {
        self.0.own.borrow_mut()
    }

    pub fn extended(&self) -> Ref<'_, Vec<Value>> {
        self.0.extended.borrow()
    }

    pub(crate) fn extended_mut(&self) -> RefMut<'_, Vec<Value>> {
        self.0.extended.borrow_mut()
    }

    pub fn ivar(&self, name: &str) -> Option<Value> {
        self.0.ivars.borrow().get(name).cloned()
    }

    pub fn set_ivar(&self, name: &str, value: Value) {
        self.0.ivars.borrow_mut().insert(name.to_string(), value);
    }

    pub fn ivar_names(&self) -> Vec<String> {
        self.0.ivars.borrow().keys().cloned().collect()
    }

    pub fn as_class(&self) -> Option<&ClassData> {
        match &self.0.data {
            Data::Class(c) => Some(c),
            _ => None,
        }
    }

    /// True for classes and modules alike.
    pub fn is_module_like(&self) -> bool {
        matches!(self.0.data, Data::Class(_))
    }

    pub fn is_class(&self) -> bool {
        self.as_class().is_some_and(|c| !c.is_module())
    }

    pub fn is_module(&self) -> bool {
        self.as_class().is_some_and(|c| c.is_module())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.0.data, Data::Nil)
    }

    pub fn truthy(&self) -> bool {
        !matches!(self.0.data, Data::Nil | Data::False)
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match &self.0.data {
            Data::Integer(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        use num_traits::ToPrimitive;
        self.as_int().and_then(|i| i.to_i64())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match &self.0.data {
            Data::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<Ref<'_, String>> {
        match &self.0.data {
            Data::Str(s) => Some(s.borrow()),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match &self.0.data {
            Data::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&RefCell<Vec<Value>>> {
        match &self.0.data {
            Data::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&RefCell<HashData>> {
        match &self.0.data {
            Data::Hash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_range(&self) -> Option<&RangeData> {
        match &self.0.data {
            Data::Range(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_proc(&self) -> Option<&ProcData> {
        match &self.0.data {
            Data::Proc(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_regexp(&self) -> Option<&RegexpData> {
        match &self.0.data {
            Data::Regexp(r) => Some(r),
            _ => None,
        }
    }

    /// Name of the class or module this value is, for classes and modules only.
    pub fn module_name(&self) -> Option<String> {
        self.as_class().map(|c| c.name())
    }

    /// Display name of the owning type.
    pub fn class_name(&self) -> String {
        self.class().module_name().unwrap_or_default()
    }
}

impl HashData {
    pub fn new(default: Option<Value>) -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            default,
            default_proc: None,
        }
    }

    pub fn position(&self, key: &Value) -> Option<usize> {
        self.keys.iter().position(|k| key_eql(k, key))
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.position(key).map(|i| self.values[i].clone())
    }

    pub fn insert(&mut self, key: Value, value: Value) {
        match self.position(&key) {
            Some(i) => self.values[i] = value,
            None => {
                self.keys.push(key);
                self.values.push(value);
            }
        }
    }

    pub fn remove(&mut self, key: &Value) -> Option<Value> {
        let i = self.position(key)?;
        self.keys.remove(i);
        Some(self.values.remove(i))
    }

    pub fn pairs(&self) -> Vec<(Value, Value)> {
        self.keys.iter().cloned().zip(self.values.iter().cloned()).collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// `eql?` for hash keys: by value for builtin scalars, strings and arrays,
/// by identity for everything else.
pub fn key_eql(a: &Value, b: &Value) -> bool {
    if a.ptr_eq(b) {
        return true;
    }
    match (a.data(), b.data()) {
        (Data::Integer(x), Data::Integer(y)) => x == y,
        (Data::Float(x), Data::Float(y)) => x == y,
        (Data::Str(x), Data::Str(y)) => *x.borrow() == *y.borrow(),
        (Data::Symbol(x), Data::Symbol(y)) => x == y,
        (Data::Nil, Data::Nil) | (Data::True, Data::True) | (Data::False, Data::False) => true,
        (Data::Array(x), Data::Array(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| key_eql(p, q))
        }
        _ => false,
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data() {
            Data::Nil => write!(f, "nil"),
            Data::True => write!(f, "true"),
            Data::False => write!(f, "false"),
            Data::Integer(i) => write!(f, "{}", i),
            Data::Float(x) => write!(f, "{}", x),
            Data::Str(s) => write!(f, "{:?}", s.borrow()),
            Data::Symbol(s) => write!(f, ":{}", s),
            Data::Class(c) => write!(f, "{}", c.name()),
            Data::Array(a) => f.debug_list().entries(a.borrow().iter()).finish(),
            _ => write!(f, "#<{}:{:#x}>", self.class_name(), self.object_id()),
        }
    }
}
