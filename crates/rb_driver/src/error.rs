use rb_ir::Node;
use thiserror::Error;

/// Why a tree could not be lowered. The first error aborts the whole compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("unsupported node type '{tag}'")]
    UnsupportedNode { tag: String },
    #[error("malformed '{tag}' node: {reason}")]
    Malformed { tag: String, reason: String },
}

impl CompileError {
    pub(crate) fn unsupported(node: &Node) -> Self {
        CompileError::UnsupportedNode {
            tag: node.tag.clone(),
        }
    }

    pub(crate) fn malformed(node: &Node, reason: impl Into<String>) -> Self {
        CompileError::Malformed {
            tag: node.tag.clone(),
            reason: reason.into(),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            CompileError::UnsupportedNode { tag } | CompileError::Malformed { tag, .. } => tag,
        }
    }
}

/// Either stage failing, for callers that compile and run in one go.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Exec(#[from] rb_runtime::ExecError),
}
