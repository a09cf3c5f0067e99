//! Lowers parser-gem ASTs to closures over the `rb_runtime` environment.
//!
//! ```text
//! let root = rb_ir::sexp::parse("(send nil :puts (int 1))")?;
//! let program = rb_driver::compile(&root)?;
//! let mut rt = rb_runtime::Runtime::new();
//! program.run(&mut rt)?;
//! assert_eq!(rt.take_output(), "1\n");
//! ```
mod compiler;
mod error;
mod program;

pub use compiler::compile;
pub use error::{CompileError, Error};
pub use program::{Program, eval};
