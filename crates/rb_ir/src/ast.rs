use std::fmt;
use std::rc::Rc;

use serde::Deserialize;

use crate::NodeTag;

/// One AST node: a type tag plus ordered children.
///
/// Nodes are immutable once built. Subtrees are reference counted so that
/// desugaring can splice an existing subtree into a synthetic node without
/// copying it.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default)]
    pub children: Vec<Child>,
}

/// A child slot: a nested node, a literal, or nothing.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Child {
    Node(Rc<Node>),
    Int(i64),
    Float(f64),
    Str(String),
    Absent,
}

impl Node {
    pub fn new(tag: impl Into<String>, children: Vec<Child>) -> Self {
        Self {
            tag: tag.into(),
            children,
        }
    }

    pub fn leaf(tag: impl Into<String>) -> Self {
        Self::new(tag, Vec::new())
    }

    /// The tag resolved against the closed tag table, `None` if unknown.
    pub fn kind(&self) -> Option<NodeTag> {
        NodeTag::lookup(&self.tag)
    }

    pub fn is(&self, tag: NodeTag) -> bool {
        self.kind() == Some(tag)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, i: usize) -> Option<&Child> {
        self.children.get(i)
    }

    /// Child `i` as a node; `None` when absent, a literal, or out of range.
    pub fn node(&self, i: usize) -> Option<&Rc<Node>> {
        match self.children.get(i) {
            Some(Child::Node(n)) => Some(n),
            _ => None,
        }
    }

    /// Child `i` as a name or string literal.
    pub fn name(&self, i: usize) -> Option<&str> {
        match self.children.get(i) {
            Some(Child::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn int(&self, i: usize) -> Option<i64> {
        match self.children.get(i) {
            Some(Child::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, i: usize) -> Option<f64> {
        match self.children.get(i) {
            Some(Child::Float(v)) => Some(*v),
            Some(Child::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    /// Node children starting at `from`, skipping literals and absent slots.
    pub fn nodes_from(&self, from: usize) -> impl Iterator<Item = &Rc<Node>> {
        self.children.iter().skip(from).filter_map(|c| match c {
            Child::Node(n) => Some(n),
            _ => None,
        })
    }
}

impl Child {
    pub fn node(node: Node) -> Self {
        Child::Node(Rc::new(node))
    }

    pub fn name(s: impl Into<String>) -> Self {
        Child::Str(s.into())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Child::Absent)
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::node(node)
    }
}

impl From<Rc<Node>> for Child {
    fn from(node: Rc<Node>) -> Self {
        Child::Node(node)
    }
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Child::Str(s.to_string())
    }
}

impl From<i64> for Child {
    fn from(v: i64) -> Self {
        Child::Int(v)
    }
}

impl From<Option<Node>> for Child {
    fn from(node: Option<Node>) -> Self {
        node.map(Child::node).unwrap_or(Child::Absent)
    }
}

/// Prints the parser's s-expression dump format, readable by [`crate::sexp::parse`].
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.tag)?;
        for c in &self.children {
            write!(f, " {}", c)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Child::Node(n) => write!(f, "{}", n),
            Child::Int(v) => write!(f, "{}", v),
            Child::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            Child::Str(s) => write!(f, "{:?}", s),
            Child::Absent => write!(f, "nil"),
        }
    }
}
