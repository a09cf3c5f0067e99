//! AST contract shared by the compiler and its fixture sources.
//!
//! Trees arrive from an external parser as `{tag, children}` nodes. This crate
//! only describes and loads them; it never interprets them.
mod ast;
pub mod sexp;
mod tag;

pub use ast::*;
pub use tag::*;
