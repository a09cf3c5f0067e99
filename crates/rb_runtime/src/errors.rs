//! Unwinding carriers and program-boundary errors.

use thiserror::Error;

use crate::Value;

/// Everything that leaves a primitive or compiled routine other than a value.
///
/// `Raise` carries a language exception object and is the only variant that
/// represents a failure. The other variants are control-flow signals with a
/// fixed catch site each; a site that does not own a signal passes it on
/// unchanged.
#[derive(Clone, Debug)]
pub enum Unwind {
    Raise(Value),
    /// `next`: caught at the nearest block invocation or loop iteration.
    Next(Value),
    /// `break`: caught at the loop or block call whose compile-time site matches.
    Break { site: u32, value: Value },
    /// `return`: caught by the activation with the matching id, or by the
    /// program boundary when `target` is `None`.
    Return { target: Option<u64>, value: Value },
}

pub type RbResult<T> = Result<T, Unwind>;

/// Failure of a whole program run.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{class}: {message}")]
    Uncaught {
        class: String,
        message: String,
        exception: Value,
    },
}

impl ExecError {
    pub fn class_name(&self) -> &str {
        match self {
            ExecError::Uncaught { class, .. } => class,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ExecError::Uncaught { message, .. } => message,
        }
    }
}

pub mod messages {
    pub const NO_BLOCK_GIVEN: &str = "no block given (yield)";
    pub const BREAK_FROM_PROC: &str = "break from proc-closure";
    pub const UNEXPECTED_NEXT: &str = "next used outside of block";
    pub const UNEXPECTED_RETURN: &str = "unexpected return";
    pub const DIVIDED_BY_ZERO: &str = "divided by 0";
    pub const ARGUMENT_TOO_BIG: &str = "argument too big";
    pub const STACK_TOO_DEEP: &str = "stack level too deep";
    pub const NOT_A_CLASS: &str = "is not a class";
    pub const NOT_A_MODULE: &str = "is not a module";
    pub const SUPERCLASS_MUST_BE_CLASS: &str = "superclass must be a Class";
}
