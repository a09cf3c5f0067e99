//! Per-run execution state and the primitives compiled code calls.

use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use crate::config::RuntimeConfig;
use crate::core::class::{AllocKind, new_class};
use crate::core::{
    BlockCode, Code, Data, FastHashMap, Frame, HashData, NativeBlockFn, Params, ProcBody,
    ProcData, RangeData, Scope, Value, fast_map_new,
};
use crate::errors::{ExecError, RbResult, Unwind, messages};
use crate::host::{CaptureHost, Host};
use crate::methods;

mod classes;
mod convert;
pub(crate) mod format;
mod send;
mod vars;

/// Handles to the builtin classes and modules.
pub struct CoreClasses {
    pub basic_object: Value,
    pub object: Value,
    pub module: Value,
    pub class: Value,
    pub kernel: Value,
    pub comparable: Value,
    pub enumerable: Value,
    pub nil_class: Value,
    pub true_class: Value,
    pub false_class: Value,
    pub integer: Value,
    pub float: Value,
    pub string: Value,
    pub symbol: Value,
    pub array: Value,
    pub hash: Value,
    pub range: Value,
    pub proc_class: Value,
    pub regexp: Value,
    pub io: Value,
    pub exception: Value,
    pub standard_error: Value,
    pub runtime_error: Value,
    pub name_error: Value,
    pub no_method_error: Value,
    pub type_error: Value,
    pub argument_error: Value,
    pub zero_division_error: Value,
    pub index_error: Value,
    pub key_error: Value,
    pub stop_iteration: Value,
    pub local_jump_error: Value,
    pub system_stack_error: Value,
}

impl CoreClasses {
    fn build() -> Self {
        let basic_object = new_class(None, "BasicObject", false, None, AllocKind::Object);
        let object = new_class(None, "Object", false, Some(&basic_object), AllocKind::Object);
        let module = new_class(None, "Module", false, Some(&object), AllocKind::Module);
        let class = new_class(None, "Class", false, Some(&module), AllocKind::Class);
        for c in [&basic_object, &object, &module, &class] {
            c.bind_class(&class);
        }

        let def_class = |name: &str, base: &Value, alloc: AllocKind| {
            new_class(Some(&class), name, false, Some(base), alloc)
        };
        let def_module = |name: &str| new_class(Some(&module), name, true, None, AllocKind::None);

        let kernel = def_module("Kernel");
        let comparable = def_module("Comparable");
        let enumerable = def_module("Enumerable");
        let exception = def_class("Exception", &object, AllocKind::Object);
        let standard_error = def_class("StandardError", &exception, AllocKind::Object);
        let name_error = def_class("NameError", &standard_error, AllocKind::Object);
        let index_error = def_class("IndexError", &standard_error, AllocKind::Object);

        Self {
            nil_class: def_class("NilClass", &object, AllocKind::None),
            true_class: def_class("TrueClass", &object, AllocKind::None),
            false_class: def_class("FalseClass", &object, AllocKind::None),
            integer: def_class("Integer", &object, AllocKind::None),
            float: def_class("Float", &object, AllocKind::None),
            string: def_class("String", &object, AllocKind::Str),
            symbol: def_class("Symbol", &object, AllocKind::None),
            array: def_class("Array", &object, AllocKind::Array),
            hash: def_class("Hash", &object, AllocKind::Hash),
            range: def_class("Range", &object, AllocKind::None),
            proc_class: def_class("Proc", &object, AllocKind::None),
            regexp: def_class("Regexp", &object, AllocKind::None),
            io: def_class("IO", &object, AllocKind::None),
            runtime_error: def_class("RuntimeError", &standard_error, AllocKind::Object),
            no_method_error: def_class("NoMethodError", &name_error, AllocKind::Object),
            type_error: def_class("TypeError", &standard_error, AllocKind::Object),
            argument_error: def_class("ArgumentError", &standard_error, AllocKind::Object),
            zero_division_error: def_class("ZeroDivisionError", &standard_error, AllocKind::Object),
            key_error: def_class("KeyError", &index_error, AllocKind::Object),
            stop_iteration: def_class("StopIteration", &index_error, AllocKind::Object),
            local_jump_error: def_class("LocalJumpError", &standard_error, AllocKind::Object),
            system_stack_error: def_class("SystemStackError", &exception, AllocKind::Object),
            basic_object,
            object,
            module,
            class,
            kernel,
            comparable,
            enumerable,
            exception,
            standard_error,
            name_error,
            index_error,
        }
    }

    fn all(&self) -> Vec<&Value> {
        vec![
            &self.basic_object,
            &self.object,
            &self.module,
            &self.class,
            &self.kernel,
            &self.comparable,
            &self.enumerable,
            &self.nil_class,
            &self.true_class,
            &self.false_class,
            &self.integer,
            &self.float,
            &self.string,
            &self.symbol,
            &self.array,
            &self.hash,
            &self.range,
            &self.proc_class,
            &self.regexp,
            &self.io,
            &self.exception,
            &self.standard_error,
            &self.runtime_error,
            &self.name_error,
            &self.no_method_error,
            &self.type_error,
            &self.argument_error,
            &self.zero_division_error,
            &self.index_error,
            &self.key_error,
            &self.stop_iteration,
            &self.local_jump_error,
            &self.system_stack_error,
        ]
    }
}

pub struct Runtime {
    pub(crate) config: RuntimeConfig,
    pub(crate) host: Box<dyn Host>,
    pub classes: CoreClasses,
    pub(crate) scopes: Vec<Rc<Scope>>,
    /// The self stack. Constant lookup scans it innermost first.
    pub(crate) frames: Vec<Frame>,
    pub(crate) globals: FastHashMap<String, Value>,
    symbols: FastHashMap<String, Value>,
    int_cache: Vec<Value>,
    nil: Value,
    true_: Value,
    false_: Value,
    main: Value,
    top_frame: Frame,
    top_scope: Rc<Scope>,
    /// Capture groups of the last successful regexp match, for `$1`...
    pub(crate) last_match: Option<Vec<Option<String>>>,
    pub(crate) depth: usize,
    next_activation: u64,
    /// Break sites for runtime-driven walks, counting down from the top of
    /// the range so they never meet the compiler's sites.
    next_stop_site: u32,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self::with_host(config, Box::new(CaptureHost::new()))
    }

    pub fn with_host(config: RuntimeConfig, host: Box<dyn Host>) -> Self {
        let classes = CoreClasses::build();
        let nil = Value::alloc(Some(&classes.nil_class), Data::Nil);
        let true_ = Value::alloc(Some(&classes.true_class), Data::True);
        let false_ = Value::alloc(Some(&classes.false_class), Data::False);
        let main = Value::alloc(Some(&classes.object), Data::Object);
        let int_cache = (config.integer_cache_min..=config.integer_cache_max)
            .map(|i| Value::alloc(Some(&classes.integer), Data::Integer(BigInt::from(i))))
            .collect();
        let top_scope = Scope::top();
        let top_frame = Frame::new(main.clone(), None);
        let mut rt = Self {
            config,
            host,
            scopes: vec![top_scope.clone()],
            frames: vec![top_frame.clone()],
            globals: fast_map_new(),
            symbols: fast_map_new(),
            int_cache,
            nil,
            true_,
            false_,
            main,
            top_frame,
            top_scope,
            classes,
            last_match: None,
            depth: 0,
            next_activation: 0,
            next_stop_site: u32::MAX,
        };
        let names: Vec<(String, Value)> = rt
            .classes
            .all()
            .into_iter()
            .filter_map(|c| c.module_name().map(|n| (n, c.clone())))
            .collect();
        if let Some(object) = rt.classes.object.as_class() {
            for (name, c) in names {
                object.const_set(&name, c);
            }
        }
        methods::bootstrap(&mut rt);
        rt
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // ==== values ====

    #[inline]
    pub fn nil(&self) -> Value {
        self.nil.clone()
    }

    #[inline]
    pub fn bool(&self, b: bool) -> Value {
        if b { self.true_.clone() } else { self.false_.clone() }
    }

    pub fn main_object(&self) -> Value {
        self.main.clone()
    }

    /// Integers inside the configured range come from the interned cache.
    pub fn int(&self, i: i64) -> Value {
        if i >= self.config.integer_cache_min && i <= self.config.integer_cache_max {
            let idx = (i - self.config.integer_cache_min) as usize;
            if let Some(v) = self.int_cache.get(idx) {
                return v.clone();
            }
        }
        Value::alloc(Some(&self.classes.integer), Data::Integer(BigInt::from(i)))
    }

    pub fn integer(&self, i: BigInt) -> Value {
        match i.to_i64() {
            Some(small) => self.int(small),
            None => Value::alloc(Some(&self.classes.integer), Data::Integer(i)),
        }
    }

    pub fn float(&self, f: f64) -> Value {
        Value::alloc(Some(&self.classes.float), Data::Float(f))
    }

    pub fn str(&self, s: impl Into<String>) -> Value {
        Value::alloc(
            Some(&self.classes.string),
            Data::Str(std::cell::RefCell::new(s.into())),
        )
    }

    pub fn sym(&mut self, name: &str) -> Value {
        if let Some(v) = self.symbols.get(name) {
            return v.clone();
        }
        let v = Value::alloc(Some(&self.classes.symbol), Data::Symbol(Rc::from(name)));
        self.symbols.insert(name.to_string(), v.clone());
        v
    }

    pub fn array(&self, items: Vec<Value>) -> Value {
        Value::alloc(
            Some(&self.classes.array),
            Data::Array(std::cell::RefCell::new(items)),
        )
    }

    pub fn hash(&self, data: HashData) -> Value {
        Value::alloc(
            Some(&self.classes.hash),
            Data::Hash(std::cell::RefCell::new(data)),
        )
    }

    pub fn range(&self, start: Value, end: Value, exclusive: bool) -> Value {
        Value::alloc(
            Some(&self.classes.range),
            Data::Range(RangeData {
                start,
                end,
                exclusive,
            }),
        )
    }

    pub fn regexp(&self, source: &str, flags: &str) -> RbResult<Value> {
        let data = format::compile_regexp(source, flags)
            .map_err(|e| self.error(&self.classes.runtime_error, e))?;
        Ok(Value::alloc(Some(&self.classes.regexp), Data::Regexp(data)))
    }

    /// Wraps compiled block code as a Proc closing over the current frame
    /// and scope.
    pub fn make_block(&self, params: Rc<Params>, body: Code, site: u32, lambda: bool) -> Value {
        let code = BlockCode {
            params,
            body,
            scope: self.scope(),
            frame: self.frame().clone(),
            site,
        };
        Value::alloc(
            Some(&self.classes.proc_class),
            Data::Proc(ProcData {
                body: ProcBody::Compiled(code),
                lambda,
            }),
        )
    }

    /// A Proc backed by a host closure, used by builtins that hand a block
    /// to another method.
    pub fn native_proc(&self, f: Rc<NativeBlockFn>) -> Value {
        Value::alloc(
            Some(&self.classes.proc_class),
            Data::Proc(ProcData {
                body: ProcBody::Native(f),
                lambda: false,
            }),
        )
    }

    /// `Class#new` allocation for `class`, before `initialize` runs.
    pub fn allocate(&self, class: &Value) -> RbResult<Value> {
        let Some(data) = class.as_class() else {
            return Err(self.type_error(format!("{} {}", class.class_name(), messages::NOT_A_CLASS)));
        };
        if data.is_module() {
            return Err(self.no_method_error(format!(
                "undefined method 'new' for module {}",
                data.name()
            )));
        }
        let payload = match data.alloc_kind() {
            AllocKind::Object => Data::Object,
            AllocKind::Array => Data::Array(Default::default()),
            AllocKind::Hash => Data::Hash(std::cell::RefCell::new(HashData::new(None))),
            AllocKind::Str => Data::Str(Default::default()),
            AllocKind::Class | AllocKind::Module | AllocKind::None => {
                return Err(self.no_method_error(format!(
                    "undefined method 'new' for class {}",
                    data.name()
                )));
            }
        };
        Ok(Value::alloc(Some(class), payload))
    }

    // ==== errors ====

    /// A new exception object of `class` carrying `message`.
    pub fn exception(&self, class: &Value, message: impl Into<String>) -> Value {
        let exc = Value::alloc(Some(class), Data::Object);
        exc.set_ivar("@message", self.str(message));
        exc
    }

    pub fn error(&self, class: &Value, message: impl Into<String>) -> Unwind {
        Unwind::Raise(self.exception(class, message))
    }

    pub fn runtime_error(&self, message: impl Into<String>) -> Unwind {
        self.error(&self.classes.runtime_error, message)
    }

    pub fn type_error(&self, message: impl Into<String>) -> Unwind {
        self.error(&self.classes.type_error, message)
    }

    pub fn arg_error(&self, message: impl Into<String>) -> Unwind {
        self.error(&self.classes.argument_error, message)
    }

    pub fn name_error(&self, message: impl Into<String>) -> Unwind {
        self.error(&self.classes.name_error, message)
    }

    pub fn no_method_error(&self, message: impl Into<String>) -> Unwind {
        self.error(&self.classes.no_method_error, message)
    }

    pub fn index_error(&self, message: impl Into<String>) -> Unwind {
        self.error(&self.classes.index_error, message)
    }

    pub fn key_error(&self, message: impl Into<String>) -> Unwind {
        self.error(&self.classes.key_error, message)
    }

    pub fn zero_division(&self) -> Unwind {
        self.error(&self.classes.zero_division_error, messages::DIVIDED_BY_ZERO)
    }

    pub fn local_jump(&self, message: impl Into<String>) -> Unwind {
        self.error(&self.classes.local_jump_error, message)
    }

    /// Message of an exception object, empty when it has none.
    pub fn exception_message(&self, exc: &Value) -> String {
        match exc.ivar("@message") {
            Some(m) => m.as_str().map(|s| s.clone()).unwrap_or_default(),
            None => exc.class_name(),
        }
    }

    /// `an instance of Foo`, `class Foo`, `nil`, `main:Object`...
    pub fn describe(&self, v: &Value) -> String {
        match v.data() {
            Data::Nil => "nil".to_string(),
            Data::True => "true".to_string(),
            Data::False => "false".to_string(),
            Data::Class(c) if c.is_module() => format!("module {}", c.name()),
            Data::Class(c) => format!("class {}", c.name()),
            _ if v.ptr_eq(&self.main) => "main:Object".to_string(),
            _ => format!("an instance of {}", v.class_name()),
        }
    }

    // ==== host I/O ====

    pub fn write(&mut self, text: &str) {
        self.host.write(text);
    }

    pub fn read_line(&mut self) -> Option<String> {
        self.host.read_line()
    }

    pub fn take_output(&mut self) -> String {
        self.host.take_output()
    }

    // ==== frames and scopes ====

    pub fn frame(&self) -> &Frame {
        self.frames.last().unwrap_or(&self.top_frame)
    }

    pub fn self_value(&self) -> Value {
        self.frame().slf.clone()
    }

    pub fn scope(&self) -> Rc<Scope> {
        self.scopes
            .last()
            .cloned()
            .unwrap_or_else(|| self.top_scope.clone())
    }

    /// Runs `f` with `frame` on top of the self stack. Popped on every exit.
    pub fn with_frame<T>(&mut self, frame: Frame, f: impl FnOnce(&mut Self) -> T) -> T {
        self.frames.push(frame);
        let out = f(self);
        self.frames.pop();
        out
    }

    /// Runs `f` with `scope` as the innermost local scope.
    pub fn with_scope<T>(&mut self, scope: Rc<Scope>, f: impl FnOnce(&mut Self) -> T) -> T {
        self.scopes.push(scope);
        let out = f(self);
        self.scopes.pop();
        out
    }

    pub fn with_frame_and_scope<T>(
        &mut self,
        frame: Frame,
        scope: Rc<Scope>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.with_frame(frame, |rt| rt.with_scope(scope, f))
    }

    /// Self-stack and scope-stack heights. Both are 1 between runs.
    pub fn stack_depths(&self) -> (usize, usize) {
        (self.frames.len(), self.scopes.len())
    }

    pub(crate) fn next_activation_id(&mut self) -> u64 {
        self.next_activation += 1;
        self.next_activation
    }

    pub(crate) fn next_stop_site(&mut self) -> u32 {
        let site = self.next_stop_site;
        self.next_stop_site = site.checked_sub(1).filter(|s| *s > u32::MAX / 2).unwrap_or(u32::MAX);
        site
    }

    // ==== program boundary ====

    /// Runs a compiled program. A top-level `return` ends it with its value;
    /// an escaping exception or stray control signal becomes an [`ExecError`].
    pub fn run_program(&mut self, code: &Code) -> Result<Value, ExecError> {
        let lje = self.classes.local_jump_error.clone();
        let exc = match code(self) {
            Ok(v) => return Ok(v),
            Err(Unwind::Return { target: None, value }) => return Ok(value),
            Err(Unwind::Raise(exc)) => exc,
            Err(Unwind::Return { .. }) => self.exception(&lje, messages::UNEXPECTED_RETURN),
            Err(Unwind::Next(_)) => self.exception(&lje, messages::UNEXPECTED_NEXT),
            Err(Unwind::Break { .. }) => self.exception(&lje, messages::BREAK_FROM_PROC),
        };
        Err(self.uncaught(exc))
    }

    fn uncaught(&self, exc: Value) -> ExecError {
        ExecError::Uncaught {
            class: exc.class_name(),
            message: self.exception_message(&exc),
            exception: exc,
        }
    }
}
