mod common;

use common::*;
use rb_runtime::RuntimeConfig;

#[test]
fn next_skips_one_iteration() {
    let src = r#"
        (begin
          (lvasgn :s (int 0))
          (block (send (array (int 1) (int 2) (int 3)) :each) (args (procarg0 (arg :x)))
            (begin
              (if (send (lvar :x) :== (int 2)) (next) nil)
              (op_asgn (lvasgn :s) :+ (lvar :x))))
          (lvar :s))"#;
    assert_eq!(value(src), "4");
}

#[test]
fn next_value_becomes_block_result() {
    let src = r#"
        (block (send (array (int 1) (int 2) (int 3)) :map) (args (procarg0 (arg :x)))
          (begin
            (if (send (lvar :x) :odd?) (next (int 0)) nil)
            (lvar :x)))"#;
    assert_eq!(value(src), "[0, 2, 0]");
}

#[test]
fn break_stops_iteration_early() {
    let src = r#"
        (block (send (array (int 1) (int 2) (int 3)) :each) (args (procarg0 (arg :x)))
          (begin
            (if (send (lvar :x) :== (int 3)) (break) nil)
            (send nil :puts (lvar :x))))"#;
    let r = run(src);
    assert_eq!(r.output, "1\n2\n");
    assert_eq!(r.result.unwrap(), "nil");
    assert!(r.balanced);
}

#[test]
fn break_with_value_from_while() {
    let src = r#"
        (begin
          (lvasgn :i (int 0))
          (while (true)
            (begin
              (op_asgn (lvasgn :i) :+ (int 1))
              (if (send (lvar :i) :== (int 3)) (break (send (lvar :i) :* (int 10))) nil))))"#;
    assert_eq!(value(src), "30");
}

#[test]
fn while_without_break_is_nil() {
    let src = r#"
        (begin
          (lvasgn :i (int 0))
          (while (send (lvar :i) :< (int 3)) (op_asgn (lvasgn :i) :+ (int 1))))"#;
    assert_eq!(value(src), "nil");
}

#[test]
fn post_condition_loop_runs_body_first() {
    let src = r#"
        (begin
          (lvasgn :i (int 10))
          (until_post (true) (kwbegin (op_asgn (lvasgn :i) :+ (int 1))))
          (lvar :i))"#;
    assert_eq!(value(src), "11");
}

#[test]
fn break_out_of_a_user_iterator() {
    let src = r#"
        (begin
          (def :each_num (args)
            (begin (yield (int 1)) (yield (int 2)) (yield (int 3)) (sym :finished)))
          (block (send nil :each_num) (args (procarg0 (arg :n)))
            (if (send (lvar :n) :== (int 3)) (break (send (lvar :n) :* (int 10))) nil)))"#;
    let r = run(src);
    assert_eq!(r.result.unwrap(), "30");
    assert!(r.balanced);
}

#[test]
fn break_inside_nested_loop_only_leaves_inner_loop() {
    let src = r#"
        (begin
          (lvasgn :hits (array))
          (block (send (array (int 1) (int 2)) :each) (args (procarg0 (arg :a)))
            (block (send (array (int 10) (int 20)) :each) (args (procarg0 (arg :b)))
              (begin
                (if (send (lvar :b) :== (int 20)) (break) nil)
                (send (lvar :hits) :<< (send (lvar :a) :+ (lvar :b))))))
          (lvar :hits))"#;
    assert_eq!(value(src), "[11, 12]");
}

#[test]
fn return_from_block_leaves_enclosing_method() {
    let src = r#"
        (begin
          (def :find_big (args)
            (begin
              (block (send (array (int 1) (int 2) (int 3) (int 4)) :each) (args (procarg0 (arg :x)))
                (if (send (lvar :x) :> (int 3)) (return (lvar :x)) nil))
              nil))
          (send nil :find_big))"#;
    let r = run(src);
    assert_eq!(r.result.unwrap(), "4");
    assert!(r.balanced);
}

#[test]
fn lambda_return_stays_in_lambda() {
    let src = r#"
        (begin
          (def :outer (args)
            (begin
              (lvasgn :l (block (lambda) (args (arg :x)) (begin (return (send (lvar :x) :* (int 2))) (int 0))))
              (send (send (lvar :l) :call (int 3)) :+ (int 1))))
          (send nil :outer))"#;
    assert_eq!(value(src), "7");
}

#[test]
fn lambda_checks_arity() {
    let src = r#"
        (begin
          (lvasgn :l (block (lambda) (args (arg :x) (arg :y)) (lvar :x)))
          (send (lvar :l) :call (int 1)))"#;
    let (class, msg) = error(src);
    assert_eq!(class, "ArgumentError");
    assert_eq!(msg, "wrong number of arguments (given 1, expected 2)");
}

#[test]
fn proc_is_lenient_about_arity() {
    let src = r#"
        (begin
          (lvasgn :pr (block (send nil :proc) (args (arg :x) (arg :y)) (array (lvar :x) (lvar :y))))
          (array (send (lvar :pr) :call (int 1)) (send (lvar :pr) :call (array (int 1) (int 2)))))"#;
    assert_eq!(value(src), "[[1, nil], [1, 2]]");
}

#[test]
fn method_arity_is_strict() {
    let src = r#"
        (begin
          (def :one (args (arg :a)) (lvar :a))
          (send nil :one (int 1) (int 2)))"#;
    let (class, msg) = error(src);
    assert_eq!(class, "ArgumentError");
    assert_eq!(msg, "wrong number of arguments (given 2, expected 1)");
}

#[test]
fn yield_without_block_is_local_jump_error() {
    let src = r#"
        (begin
          (def :needs_block (args) (yield))
          (send nil :needs_block))"#;
    let (class, msg) = error(src);
    assert_eq!(class, "LocalJumpError");
    assert_eq!(msg, "no block given (yield)");
}

#[test]
fn block_given_reflects_caller() {
    let src = r#"
        (begin
          (def :probe (args) (send nil :block_given?))
          (array (send nil :probe) (block (send nil :probe) (args) nil)))"#;
    assert_eq!(value(src), "[false, true]");
}

#[test]
fn rescue_binds_exception_and_reads_message() {
    let src = r#"
        (kwbegin
          (rescue
            (send nil :raise (const nil :ArgumentError) (str "bad"))
            (resbody (array (const nil :ArgumentError)) (lvasgn :e)
              (send (lvar :e) :message))
            nil))"#;
    assert_eq!(value(src), r#""bad""#);
}

#[test]
fn bare_rescue_catches_standard_errors_only() {
    let src = r#"
        (kwbegin
          (rescue
            (send (int 1) :/ (int 0))
            (resbody nil nil (sym :rescued))
            nil))"#;
    assert_eq!(value(src), ":rescued");

    let src = r#"
        (kwbegin
          (rescue
            (send nil :raise (const nil :Exception) (str "fatal"))
            (resbody nil nil (sym :rescued))
            nil))"#;
    assert_eq!(error(src), ("Exception".to_string(), "fatal".to_string()));
}

#[test]
fn unmatched_rescue_reraises() {
    let src = r#"
        (kwbegin
          (rescue
            (send nil :raise (const nil :TypeError) (str "nope"))
            (resbody (array (const nil :ArgumentError)) nil (int 1))
            nil))"#;
    assert_eq!(error(src), ("TypeError".to_string(), "nope".to_string()));
}

#[test]
fn rescue_else_runs_only_without_error() {
    let src = r#"
        (kwbegin
          (rescue
            (int 1)
            (resbody nil nil (sym :rescued))
            (sym :clean)))"#;
    assert_eq!(value(src), ":clean");
}

#[test]
fn ensure_runs_in_order_and_keeps_body_value() {
    let src = r#"
        (begin
          (def :work (args)
            (kwbegin
              (ensure
                (rescue
                  (begin (send nil :puts (str "body")) (send nil :raise (str "boom")))
                  (resbody nil (lvasgn :e) (begin (send nil :puts (send (lvar :e) :message)) (sym :handled)))
                  nil)
                (send nil :puts (str "cleanup")))))
          (send nil :work))"#;
    let r = run(src);
    assert_eq!(r.output, "body\nboom\ncleanup\n");
    assert_eq!(r.result.unwrap(), ":handled");
}

#[test]
fn ensure_runs_when_returning_early() {
    let src = r#"
        (begin
          (def :early (args)
            (kwbegin
              (ensure
                (return (int 5))
                (send nil :puts (str "cleanup")))))
          (send nil :early))"#;
    let r = run(src);
    assert_eq!(r.output, "cleanup\n");
    assert_eq!(r.result.unwrap(), "5");
}

#[test]
fn custom_exception_hierarchy() {
    let src = r#"
        (begin
          (class (const nil :AppError) (const nil :StandardError) nil)
          (class (const nil :DbError) (const nil :AppError) nil)
          (kwbegin
            (rescue
              (send nil :raise (const nil :DbError) (str "lost"))
              (resbody (array (const nil :AppError)) (lvasgn :e)
                (array (send (send (lvar :e) :class) :name) (send (lvar :e) :message)))
              nil)))"#;
    assert_eq!(value(src), r#"["DbError", "lost"]"#);
}

#[test]
fn stacks_balance_after_raise_break_and_return() {
    for src in [
        r#"(begin (def :f (args) (send nil :raise (str "x"))) (send nil :f))"#,
        r#"(block (send (irange (int 1) (int 9)) :each) (args) (break (int 1)))"#,
        r#"(begin (def :f (args) (return (int 1))) (send nil :f))"#,
    ] {
        assert!(run(src).balanced, "unbalanced after {src}");
    }
}

#[test]
fn deep_recursion_raises_system_stack_error() {
    let src = r#"
        (begin
          (def :down (args (arg :n)) (send nil :down (send (lvar :n) :+ (int 1))))
          (send nil :down (int 0)))"#;
    let cfg = RuntimeConfig {
        max_call_depth: 200,
        ..RuntimeConfig::default()
    };
    let r = run_full(cfg, src, &[]);
    assert_eq!(r.result.unwrap_err().0, "SystemStackError");
    assert!(r.balanced);
}

#[test]
fn stack_error_is_rescuable_by_exception() {
    let src = r#"
        (begin
          (def :down (args) (send nil :down))
          (kwbegin
            (rescue
              (send nil :down)
              (resbody (array (const nil :SystemStackError)) (lvasgn :e) (send (lvar :e) :message))
              nil)))"#;
    let cfg = RuntimeConfig {
        max_call_depth: 100,
        ..RuntimeConfig::default()
    };
    let r = run_full(cfg, src, &[]);
    assert_eq!(r.result.unwrap(), r#""stack level too deep""#);
}

#[test]
fn loop_ends_on_stop_iteration_and_break() {
    let src = r#"
        (begin
          (lvasgn :n (int 0))
          (block (send nil :loop) (args)
            (begin
              (op_asgn (lvasgn :n) :+ (int 1))
              (if (send (lvar :n) :>= (int 4)) (break (lvar :n)) nil))))"#;
    assert_eq!(value(src), "4");
}
