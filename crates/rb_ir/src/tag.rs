use phf::phf_map;

/// Every node tag the compiler knows how to lower.
///
/// The set is closed: a tag string outside [`TAGS`] has no variant and is
/// rejected by the compiler before any code is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeTag {
    // calls
    Send,
    CSend,
    Super,
    ZSuper,
    Yield,
    Block,
    BlockPass,
    Lambda,
    Splat,
    Index,
    IndexAsgn,

    // sequences and control flow
    Begin,
    KwBegin,
    If,
    While,
    WhilePost,
    Until,
    UntilPost,
    For,
    And,
    Or,
    Not,
    Case,
    When,
    Next,
    Break,
    Return,
    Rescue,
    ResBody,
    Ensure,

    // variables
    Lvar,
    Lvasgn,
    Ivar,
    Ivasgn,
    Gvar,
    Gvasgn,
    Cvar,
    Cvasgn,
    Const,
    Casgn,
    Cbase,
    NthRef,
    OpAsgn,
    OrAsgn,
    AndAsgn,
    Masgn,
    Mlhs,

    // literals
    Int,
    Float,
    Str,
    Dstr,
    Sym,
    Dsym,
    Regexp,
    RegOpt,
    Array,
    Hash,
    Pair,
    IRange,
    ERange,
    Nil,
    True,
    False,
    SelfRef,

    // definitions
    Def,
    Defs,
    Args,
    Arg,
    OptArg,
    RestArg,
    BlockArg,
    ProcArg0,
    KwArg,
    KwOptArg,
    Class,
    Module,
    SClass,
    Alias,
}

pub static TAGS: phf::Map<&'static str, NodeTag> = phf_map! {
    "send" => NodeTag::Send,
    "csend" => NodeTag::CSend,
    "super" => NodeTag::Super,
    "zsuper" => NodeTag::ZSuper,
    "yield" => NodeTag::Yield,
    "block" => NodeTag::Block,
    "block_pass" => NodeTag::BlockPass,
    "lambda" => NodeTag::Lambda,
    "splat" => NodeTag::Splat,
    "index" => NodeTag::Index,
    "indexasgn" => NodeTag::IndexAsgn,
    "begin" => NodeTag::Begin,
    "kwbegin" => NodeTag::KwBegin,
    "if" => NodeTag::If,
    "while" => NodeTag::While,
    "while_post" => NodeTag::WhilePost,
    "until" => NodeTag::Until,
    "until_post" => NodeTag::UntilPost,
    "for" => NodeTag::For,
    "and" => NodeTag::And,
    "or" => NodeTag::Or,
    "not" => NodeTag::Not,
    "case" => NodeTag::Case,
    "when" => NodeTag::When,
    "next" => NodeTag::Next,
    "break" => NodeTag::Break,
    "return" => NodeTag::Return,
    "rescue" => NodeTag::Rescue,
    "resbody" => NodeTag::ResBody,
    "ensure" => NodeTag::Ensure,
    "lvar" => NodeTag::Lvar,
    "lvasgn" => NodeTag::Lvasgn,
    "ivar" => NodeTag::Ivar,
    "ivasgn" => NodeTag::Ivasgn,
    "gvar" => NodeTag::Gvar,
    "gvasgn" => NodeTag::Gvasgn,
    "cvar" => NodeTag::Cvar,
    "cvasgn" => NodeTag::Cvasgn,
    "const" => NodeTag::Const,
    "casgn" => NodeTag::Casgn,
    "cbase" => NodeTag::Cbase,
    "nth_ref" => NodeTag::NthRef,
    "op_asgn" => NodeTag::OpAsgn,
    "or_asgn" => NodeTag::OrAsgn,
    "and_asgn" => NodeTag::AndAsgn,
    "masgn" => NodeTag::Masgn,
    "mlhs" => NodeTag::Mlhs,
    "int" => NodeTag::Int,
    "float" => NodeTag::Float,
    "str" => NodeTag::Str,
    "dstr" => NodeTag::Dstr,
    "sym" => NodeTag::Sym,
    "dsym" => NodeTag::Dsym,
    "regexp" => NodeTag::Regexp,
    "regopt" => NodeTag::RegOpt,
    "array" => NodeTag::Array,
    "hash" => NodeTag::Hash,
    "pair" => NodeTag::Pair,
    "irange" => NodeTag::IRange,
    "erange" => NodeTag::ERange,
    "nil" => NodeTag::Nil,
    "true" => NodeTag::True,
    "false" => NodeTag::False,
    "self" => NodeTag::SelfRef,
    "def" => NodeTag::Def,
    "defs" => NodeTag::Defs,
    "args" => NodeTag::Args,
    "arg" => NodeTag::Arg,
    "optarg" => NodeTag::OptArg,
    "restarg" => NodeTag::RestArg,
    "blockarg" => NodeTag::BlockArg,
    "procarg0" => NodeTag::ProcArg0,
    "kwarg" => NodeTag::KwArg,
    "kwoptarg" => NodeTag::KwOptArg,
    "class" => NodeTag::Class,
    "module" => NodeTag::Module,
    "sclass" => NodeTag::SClass,
    "alias" => NodeTag::Alias,
};

impl NodeTag {
    pub fn lookup(tag: &str) -> Option<Self> {
        TAGS.get(tag).copied()
    }

    pub fn name(self) -> &'static str {
        TAGS.entries()
            .find(|(_, t)| **t == self)
            .map(|(name, _)| *name)
            .unwrap_or("?")
    }
}
