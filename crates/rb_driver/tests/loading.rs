mod common;

use common::*;
use proptest::prelude::*;
use rb_driver::{CompileError, Error};
use rb_ir::{Child, Node};
use rb_runtime::{Runtime, RuntimeConfig};

#[test]
fn json_tree_runs_like_sexp() {
    let json = r#"
        {"type": "begin", "children": [
          {"type": "lvasgn", "children": ["x", {"type": "int", "children": [20]}]},
          {"type": "send", "children": [null, "puts",
            {"type": "send", "children": [{"type": "lvar", "children": ["x"]}, "+",
              {"type": "int", "children": [22]}]}]}
        ]}"#;
    let r = run_json(json);
    assert_eq!(r.output, "42\n");
    assert_eq!(r.result.unwrap(), "nil");
}

#[test]
fn gets_reads_host_input_then_nil() {
    let src = r#"
        (begin
          (lvasgn :a (send nil :gets))
          (lvasgn :b (send nil :gets))
          (lvasgn :c (send nil :gets))
          (array (send (lvar :a) :chomp) (send (lvar :b) :to_i) (lvar :c)))"#;
    let r = run_full(RuntimeConfig::default(), src, &["hello", "41"]);
    assert_eq!(r.result.unwrap(), r#"["hello", 41, nil]"#);
}

#[test]
fn unknown_tag_is_rejected_before_running() {
    let err = compile_error(r#"(begin (send nil :puts (str "never")) (frobnicate (int 1)))"#);
    assert_eq!(
        err,
        CompileError::UnsupportedNode {
            tag: "frobnicate".into()
        }
    );
    assert_eq!(err.to_string(), "unsupported node type 'frobnicate'");
}

#[test]
fn keyword_parameters_are_malformed() {
    let err = compile_error(r#"(def :f (args (kwarg :k)) (lvar :k))"#);
    assert!(matches!(&err, CompileError::Malformed { tag, .. } if tag == "kwarg"));
}

#[test]
fn jumps_outside_loops_are_malformed() {
    for src in ["(next)", "(break (int 1))", "(def :f (args) (next))"] {
        let err = compile_error(src);
        assert!(matches!(err, CompileError::Malformed { .. }), "{src}: {err}");
    }
}

#[test]
fn jump_inside_def_inside_loop_is_still_malformed() {
    let err = compile_error(r#"(while (true) (def :f (args) (break)))"#);
    assert_eq!(err.tag(), "break");
}

#[test]
fn context_only_nodes_are_malformed_alone() {
    for src in [
        "(when (int 1) (int 2))",
        "(pair (int 1) (int 2))",
        r#"(block_pass (sym :x))"#,
        "(arg :x)",
    ] {
        assert!(matches!(compile_error(src), CompileError::Malformed { .. }), "{src}");
    }
}

#[test]
fn eval_reports_both_stages() {
    let mut rt = Runtime::new();
    let bad = Node::new("frob", vec![]);
    assert!(matches!(rb_driver::eval(&bad, &mut rt), Err(Error::Compile(_))));

    let raising = Node::new(
        "send",
        vec![Child::Absent, Child::name("raise"), Child::node(Node::new("str", vec![Child::name("x")]))],
    );
    match rb_driver::eval(&raising, &mut rt) {
        Err(Error::Exec(e)) => assert_eq!(e.to_string(), "RuntimeError: x"),
        other => panic!("unexpected {:?}", other.map(|v| v.class_name())),
    }
}

#[test]
fn exec_drains_output() {
    init_tracing();
    let root = rb_ir::sexp::parse(r#"(begin (send nil :print (str "a")) (int 1))"#).unwrap();
    let program = rb_driver::compile(&root).unwrap();
    let mut rt = Runtime::new();
    let first = program.exec(&mut rt).unwrap();
    assert_eq!(first.output, "a");
    assert_eq!(first.value.as_i64(), Some(1));
    let second = program.exec(&mut rt).unwrap();
    assert_eq!(second.output, "a");
}

#[test]
fn uncaught_error_keeps_earlier_output() {
    let r = run(r#"(begin (send nil :puts (str "before")) (send nil :raise (str "stop")))"#);
    assert_eq!(r.output, "before\n");
    assert_eq!(r.result.unwrap_err(), ("RuntimeError".to_string(), "stop".to_string()));
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 16, ..ProptestConfig::default() })]

    #[test]
    fn addition_never_overflows(a in any::<i64>(), b in any::<i64>()) {
        let src = format!("(send (int {a}) :+ (int {b}))");
        prop_assert_eq!(value(&src), (a as i128 + b as i128).to_string());
    }

    #[test]
    fn loop_sum_matches(n in 0u32..40) {
        let src = format!(
            "(begin (lvasgn :s (int 0)) (block (send (int {n}) :times) (args (procarg0 (arg :i))) (op_asgn (lvasgn :s) :+ (lvar :i))) (lvar :s))"
        );
        let expected: u32 = (0..n).sum();
        prop_assert_eq!(value(&src), expected.to_string());
    }
}
