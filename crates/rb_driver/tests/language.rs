mod common;

use common::*;

#[test]
fn method_call_with_arguments() {
    let src = r#"
        (begin
          (def :add (args (arg :a) (arg :b)) (send (lvar :a) :+ (lvar :b)))
          (send nil :add (int 1) (int 2)))"#;
    assert_eq!(value(src), "3");
}

#[test]
fn puts_writes_through_the_host() {
    let src = r#"(send nil :puts (send (int 1) :+ (int 2)) (str "done"))"#;
    assert_eq!(output(src), "3\ndone\n");
}

#[test]
fn super_with_empty_parens_adds_to_base() {
    let src = r#"
        (begin
          (class (const nil :Base) nil (def :val (args) (int 1)))
          (class (const nil :Child) (const nil :Base)
            (def :val (args) (send (super) :+ (int 1))))
          (send (send (const nil :Child) :new) :val))"#;
    assert_eq!(value(src), "2");
}

#[test]
fn implicit_super_forwards_arguments() {
    let src = r#"
        (begin
          (class (const nil :Base) nil
            (def :add (args (arg :a) (arg :b)) (send (lvar :a) :+ (lvar :b))))
          (class (const nil :Child) (const nil :Base)
            (def :add (args (arg :a) (arg :b)) (send (zsuper) :* (int 10))))
          (send (send (const nil :Child) :new) :add (int 1) (int 2)))"#;
    assert_eq!(value(src), "30");
}

#[test]
fn interpolated_string() {
    let src = r#"
        (begin
          (lvasgn :n (int 3))
          (dstr (str "n=") (begin (lvar :n)) (str "!")))"#;
    assert_eq!(value(src), r#""n=3!""#);
}

#[test]
fn string_literal_is_fresh_each_evaluation() {
    let src = r#"
        (begin
          (lvasgn :out (array))
          (block (send (int 2) :times) (args)
            (send (lvar :out) :<< (send (str "a") :<< (str "b"))))
          (lvar :out))"#;
    assert_eq!(value(src), r#"["ab", "ab"]"#);
}

#[test]
fn op_assign_on_local() {
    let src = r#"
        (begin
          (lvasgn :x (int 5))
          (op_asgn (lvasgn :x) :+ (int 2))
          (lvar :x))"#;
    assert_eq!(value(src), "7");
}

#[test]
fn or_assign_sets_ivar_only_once() {
    let src = r#"
        (begin
          (or_asgn (ivasgn :@x) (int 5))
          (or_asgn (ivasgn :@x) (int 9))
          (ivar :@x))"#;
    assert_eq!(value(src), "5");
}

#[test]
fn or_assign_on_hash_index() {
    let src = r#"
        (begin
          (lvasgn :h (hash))
          (or_asgn (indexasgn (lvar :h) (sym :a)) (int 1))
          (or_asgn (indexasgn (lvar :h) (sym :a)) (int 2))
          (op_asgn (indexasgn (lvar :h) (sym :b)) :+ (int 0)))"#;
    let r = run(src);
    // :b has no entry yet, so nil + 0 raises.
    assert_eq!(r.result.unwrap_err().0, "NoMethodError");

    let src = r#"
        (begin
          (lvasgn :h (hash))
          (or_asgn (indexasgn (lvar :h) (sym :a)) (int 1))
          (or_asgn (indexasgn (lvar :h) (sym :a)) (int 2))
          (lvar :h))"#;
    assert_eq!(value(src), "{:a=>1}");
}

#[test]
fn attribute_op_assign_goes_through_reader_and_writer() {
    let src = r#"
        (begin
          (class (const nil :Counter) nil
            (begin
              (send nil :attr_accessor (sym :n))
              (def :initialize (args) (ivasgn :@n (int 0)))))
          (lvasgn :c (send (const nil :Counter) :new))
          (op_asgn (send (lvar :c) :n) :+ (int 4))
          (op_asgn (send (lvar :c) :n) :* (int 3))
          (send (lvar :c) :n))"#;
    assert_eq!(value(src), "12");
}

#[test]
fn attribute_assignment_returns_assigned_value() {
    let src = r#"
        (begin
          (class (const nil :Box) nil
            (def :v= (args (arg :x)) (begin (ivasgn :@v (lvar :x)) (int 99))))
          (send (send (const nil :Box) :new) :v= (int 7)))"#;
    assert_eq!(value(src), "7");
}

#[test]
fn multiple_assignment_swaps() {
    let src = r#"
        (begin
          (lvasgn :a (int 1))
          (lvasgn :b (int 2))
          (masgn (mlhs (lvasgn :a) (lvasgn :b)) (array (lvar :b) (lvar :a)))
          (array (lvar :a) (lvar :b)))"#;
    assert_eq!(value(src), "[2, 1]");
}

#[test]
fn multiple_assignment_with_splat_in_the_middle() {
    let src = r#"
        (begin
          (masgn (mlhs (lvasgn :a) (splat (lvasgn :b)) (lvasgn :c))
            (array (int 1) (int 2) (int 3) (int 4)))
          (array (lvar :a) (lvar :b) (lvar :c)))"#;
    assert_eq!(value(src), "[1, [2, 3], 4]");
}

#[test]
fn case_when_with_range_class_and_splat() {
    let src = r#"
        (begin
          (def :kind (args (arg :x))
            (case (lvar :x)
              (when (irange (int 1) (int 5)) (str "small"))
              (when (const nil :String) (str "text"))
              (when (splat (array (int 10) (int 20))) (str "round"))
              (str "other")))
          (array
            (send nil :kind (int 3))
            (send nil :kind (str "hi"))
            (send nil :kind (int 20))
            (send nil :kind (int 7))))"#;
    assert_eq!(value(src), r#"["small", "text", "round", "other"]"#);
}

#[test]
fn case_without_subject_tests_truthiness() {
    let src = r#"
        (begin
          (lvasgn :x (int 4))
          (case nil
            (when (send (lvar :x) :> (int 10)) (sym :big))
            (when (send (lvar :x) :> (int 2)) (sym :medium))
            nil))"#;
    assert_eq!(value(src), ":medium");
}

#[test]
fn for_loop_variable_survives_the_loop() {
    let src = r#"
        (begin
          (lvasgn :s (int 0))
          (for (lvasgn :i) (irange (int 1) (int 4))
            (op_asgn (lvasgn :s) :+ (lvar :i)))
          (array (lvar :s) (lvar :i)))"#;
    assert_eq!(value(src), "[10, 4]");
}

#[test]
fn regexp_match_sets_numbered_groups() {
    let src = r#"
        (begin
          (send (regexp (str "([a-z]+)(\\d+)") (regopt)) :=~ (str "  abc42"))
          (array (nth_ref 1) (nth_ref 2)))"#;
    assert_eq!(value(src), r#"["abc", "42"]"#);
}

#[test]
fn scoped_constant_lookup() {
    let src = r#"
        (begin
          (module (const nil :Outer) (casgn nil :B (int 7)))
          (array (const (const nil :Outer) :B) (const (const (cbase) :Outer) :B)))"#;
    assert_eq!(value(src), "[7, 7]");
}

#[test]
fn globals_and_class_variables() {
    let src = r#"
        (begin
          (gvasgn :$count (int 1))
          (class (const nil :Tally) nil
            (begin
              (cvasgn :@@total (int 0))
              (defs (self) :bump (args)
                (op_asgn (cvasgn :@@total) :+ (gvar :$count)))))
          (send (const nil :Tally) :bump)
          (send (const nil :Tally) :bump))"#;
    assert_eq!(value(src), "2");
}

#[test]
fn big_integer_literal_from_digits() {
    let src = r#"(send (int 99999999999999999999) :+ (int 1))"#;
    assert_eq!(value(src), "100000000000000000000");
}

#[test]
fn safe_navigation_skips_nil_receiver() {
    let src = r#"
        (begin
          (lvasgn :x (nil))
          (csend (lvar :x) :length))"#;
    assert_eq!(value(src), "nil");
}

#[test]
fn block_pass_with_symbol() {
    let src = r#"(send (array (int 1) (int 2) (int 3)) :map (block_pass (sym :to_s)))"#;
    assert_eq!(value(src), r#"["1", "2", "3"]"#);
}

#[test]
fn splat_arguments_and_rest_params() {
    let src = r#"
        (begin
          (def :gather (args (arg :first) (restarg :rest)) (array (lvar :first) (lvar :rest)))
          (send nil :gather (int 1) (splat (array (int 2) (int 3)))))"#;
    assert_eq!(value(src), "[1, [2, 3]]");
}

#[test]
fn optional_parameter_default_sees_earlier_params() {
    let src = r#"
        (begin
          (def :pair (args (arg :a) (optarg :b (send (lvar :a) :* (int 2))))
            (array (lvar :a) (lvar :b)))
          (array (send nil :pair (int 3)) (send nil :pair (int 3) (int 4))))"#;
    assert_eq!(value(src), "[[3, 6], [3, 4]]");
}

#[test]
fn alias_keeps_old_body() {
    let src = r#"
        (begin
          (class (const nil :Greeter) nil
            (begin
              (def :hi (args) (str "hi"))
              (alias (sym :hello) (sym :hi))
              (def :hi (args) (str "changed"))))
          (lvasgn :g (send (const nil :Greeter) :new))
          (array (send (lvar :g) :hello) (send (lvar :g) :hi)))"#;
    assert_eq!(value(src), r#"["hi", "changed"]"#);
}

#[test]
fn compiled_program_reruns_on_fresh_runtimes() {
    use rb_runtime::Runtime;

    let root = rb_ir::sexp::parse(
        r#"(begin (gvasgn :$n (op_asgn (gvasgn :$n) :+ (int 0))) (send nil :puts (str "run")))"#,
    )
    .unwrap();
    let program = rb_driver::compile(&root).unwrap();
    // $n is nil on a fresh runtime, so every run fails the same way.
    for _ in 0..2 {
        let mut rt = Runtime::new();
        let err = program.run(&mut rt).unwrap_err();
        assert_eq!(err.class_name(), "NoMethodError");
    }

    let root = rb_ir::sexp::parse(r#"(send nil :puts (str "run"))"#).unwrap();
    let first = rb_driver::compile(&root).unwrap();
    let second = rb_driver::compile(&root).unwrap();
    let mut rt = Runtime::new();
    first.run(&mut rt).unwrap();
    second.run(&mut rt).unwrap();
    first.run(&mut rt).unwrap();
    assert_eq!(rt.take_output(), "run\nrun\nrun\n");
}
