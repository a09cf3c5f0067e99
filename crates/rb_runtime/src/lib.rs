//! Object model, execution environment and builtin class library for the
//! Ruby-subset runtime.
//!
//! The compiler crate lowers AST nodes into [`Code`] closures; everything
//! those closures need at run time lives here.

#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::new_without_default)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::unnecessary_cast)]
#![allow(clippy::len_zero)]
#![allow(clippy::ptr_arg)]

pub mod config;
pub mod core;
pub mod errors;
pub mod host;
mod methods;
pub mod runtime;

pub use config::{ExecResult, RuntimeConfig};
pub use crate::core::{
    CallerContext, Callable, Code, CompiledMethod, Data, HashData, MethodDef, Params, Pattern,
    ScopeKind, Value, Visibility,
};
pub use errors::{ExecError, RbResult, Unwind};
pub use host::{CaptureHost, Host, StdHost};
pub use runtime::{CoreClasses, Runtime};
