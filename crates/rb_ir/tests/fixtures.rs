use proptest::prelude::*;
use rb_ir::{Child, Node, NodeTag, sexp};

#[test]
fn sexp_reads_nested_sends() {
    let node = sexp::parse("(send nil :puts (send (int 1) :+ (int 2)))").unwrap();
    assert_eq!(node.tag, "send");
    assert_eq!(node.child(0), Some(&Child::Absent));
    assert_eq!(node.name(1), Some("puts"));
    let arg = node.node(2).unwrap();
    assert!(arg.is(NodeTag::Send));
    assert_eq!(arg.node(0).unwrap().int(0), Some(1));
    assert_eq!(arg.name(1), Some("+"));
}

#[test]
fn sexp_reads_literals() {
    let node = sexp::parse(r#"(array (str "a\nb") (float 1.5) (int -3) (sym :"odd name"))"#).unwrap();
    let items: Vec<_> = node.nodes_from(0).collect();
    assert_eq!(items[0].name(0), Some("a\nb"));
    assert_eq!(items[1].float(0), Some(1.5));
    assert_eq!(items[2].int(0), Some(-3));
    assert_eq!(items[3].name(0), Some("odd name"));
}

#[test]
fn sexp_keeps_huge_integers_as_digits() {
    let node = sexp::parse("(int 123456789012345678901234567890)").unwrap();
    assert_eq!(node.name(0), Some("123456789012345678901234567890"));
}

#[test]
fn sexp_rejects_bad_input() {
    assert!(sexp::parse("(send nil :x").is_err());
    assert!(sexp::parse("(int 1) (int 2)").is_err());
    let err = sexp::parse("(int @)").unwrap_err();
    assert_eq!(err.offset, 5);
}

#[test]
fn json_fixture_deserializes() {
    let json = r#"{"type": "lvasgn", "children": ["x", {"type": "int", "children": [7]}]}"#;
    let node: Node = serde_json::from_str(json).unwrap();
    assert!(node.is(NodeTag::Lvasgn));
    assert_eq!(node.name(0), Some("x"));
    assert_eq!(node.node(1).unwrap().int(0), Some(7));
}

#[test]
fn json_null_child_is_absent() {
    let json = r#"{"type": "send", "children": [null, "foo"]}"#;
    let node: Node = serde_json::from_str(json).unwrap();
    assert!(node.child(0).unwrap().is_absent());
}

#[test]
fn json_leaf_without_children() {
    let node: Node = serde_json::from_str(r#"{"type": "self"}"#).unwrap();
    assert!(node.is(NodeTag::SelfRef));
    assert!(node.is_empty());
}

#[test]
fn unknown_tags_have_no_kind() {
    assert_eq!(Node::leaf("flip_flop").kind(), None);
    assert_eq!(NodeTag::lookup("while_post"), Some(NodeTag::WhilePost));
    assert_eq!(NodeTag::Return.name(), "return");
}

#[test]
fn display_round_trips_through_sexp() {
    let text = r#"(def "f" (args (arg "a")) (send (lvar "a") "*" (float 2.0)))"#;
    let node = sexp::parse(text).unwrap();
    assert_eq!(node.to_string(), text);
    assert_eq!(sexp::parse(&node.to_string()).unwrap(), node);
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 16, ..ProptestConfig::default() })]

    #[test]
    fn every_tag_name_resolves_back(i in 0usize..rb_ir::TAGS.len()) {
        let (name, tag) = rb_ir::TAGS.entries().nth(i).unwrap();
        prop_assert_eq!(NodeTag::lookup(name), Some(*tag));
        prop_assert_eq!(tag.name(), *name);
    }

    #[test]
    fn integer_literals_parse(v in any::<i64>()) {
        let node = sexp::parse(&format!("(int {v})")).unwrap();
        prop_assert_eq!(node.int(0), Some(v));
    }
}
