mod common;

use common::*;

const MIXINS: &str = r#"
    (begin
      (module (const nil :Loud) (def :speak (args) (str "LOUD")))
      (class (const nil :Animal) nil
        (begin
          (def :speak (args) (str "..."))
          (def :name (args) (str "animal"))))
      (class (const nil :Dog) (const nil :Animal)
        (begin
          (send nil :include (const nil :Loud))
          (def :name (args) (str "dog"))))
      (lvasgn :d (send (const nil :Dog) :new))
      (array (send (lvar :d) :speak) (send (lvar :d) :name)
        (send (const nil :Dog) :ancestors)))"#;

#[test]
fn included_module_sits_between_class_and_superclass() {
    assert_eq!(
        value(MIXINS),
        r#"["LOUD", "dog", [Dog, Loud, Animal, Object, Kernel, BasicObject]]"#
    );
}

#[test]
fn later_include_is_searched_first() {
    let src = r#"
        (begin
          (module (const nil :A) (def :who (args) (str "A")))
          (module (const nil :B) (def :who (args) (str "B")))
          (class (const nil :Host) nil
            (begin
              (send nil :include (const nil :A))
              (send nil :include (const nil :B))))
          (send (send (const nil :Host) :new) :who))"#;
    assert_eq!(value(src), r#""B""#);
}

#[test]
fn reopened_class_gains_methods() {
    let src = r#"
        (begin
          (class (const nil :Pt) nil (def :x (args) (int 1)))
          (class (const nil :Pt) nil (def :y (args) (int 2)))
          (lvasgn :p (send (const nil :Pt) :new))
          (send (send (lvar :p) :x) :+ (send (lvar :p) :y)))"#;
    assert_eq!(value(src), "3");
}

#[test]
fn reopening_with_other_superclass_fails() {
    let src = r#"
        (begin
          (class (const nil :Pt) nil nil)
          (class (const nil :Pt) (const nil :String) nil))"#;
    assert_eq!(
        error(src),
        ("TypeError".to_string(), "superclass mismatch for class Pt".to_string())
    );
}

#[test]
fn extend_affects_only_that_object() {
    let src = r#"
        (begin
          (module (const nil :Shout) (def :shout (args) (str "HEY")))
          (lvasgn :a (send (const nil :Object) :new))
          (lvasgn :b (send (const nil :Object) :new))
          (send (lvar :a) :extend (const nil :Shout))
          (array
            (send (lvar :a) :shout)
            (send (lvar :b) :respond_to? (sym :shout))))"#;
    assert_eq!(value(src), r#"["HEY", false]"#);
}

#[test]
fn class_methods_are_inherited_but_not_seen_by_instances() {
    let src = r#"
        (begin
          (class (const nil :Model) nil
            (defs (self) :create (args) (send (self) :new)))
          (class (const nil :User) (const nil :Model) nil)
          (array
            (send (send (send (const nil :User) :create) :class) :name)
            (send (send (const nil :User) :new) :respond_to? (sym :create))))"#;
    assert_eq!(value(src), r#"["User", false]"#);
}

#[test]
fn singleton_class_body_defines_class_methods() {
    let src = r#"
        (begin
          (class (const nil :Config) nil
            (sclass (self)
              (def :default (args) (sym :on))))
          (send (const nil :Config) :default))"#;
    assert_eq!(value(src), ":on");
}

#[test]
fn private_methods_need_implicit_receiver() {
    let src = r#"
        (begin
          (class (const nil :Vault) nil
            (begin
              (def :open (args) (send nil :secret))
              (send nil :private)
              (def :secret (args) (int 42))))
          (lvasgn :v (send (const nil :Vault) :new))
          (send (lvar :v) :open))"#;
    assert_eq!(value(src), "42");

    let src = r#"
        (begin
          (class (const nil :Vault) nil
            (begin
              (send nil :private)
              (def :secret (args) (int 42))))
          (send (send (const nil :Vault) :new) :secret))"#;
    let (class, msg) = error(src);
    assert_eq!(class, "NoMethodError");
    assert_eq!(msg, "private method 'secret' called for an instance of Vault");
}

#[test]
fn protected_methods_answer_only_to_their_kind() {
    let class = r#"
          (class (const nil :A) nil
            (begin
              (def :peek (args (arg :o)) (send (lvar :o) :v))
              (send nil :protected)
              (def :v (args) (int 1))))"#;
    let inside = format!("(begin {class} (send (send (const nil :A) :new) :peek (send (const nil :A) :new)))");
    assert_eq!(value(&inside), "1");

    let outside = format!("(begin {class} (send (send (const nil :A) :new) :v))");
    let (kind, msg) = error(&outside);
    assert_eq!(kind, "NoMethodError");
    assert_eq!(msg, "protected method 'v' called for an instance of A");
}

#[test]
fn private_with_names_after_definition() {
    let src = r#"
        (begin
          (class (const nil :Vault) nil
            (begin
              (def :secret (args) (int 1))
              (send nil :private (sym :secret))))
          (send (send (const nil :Vault) :new) :respond_to? (sym :secret)))"#;
    assert_eq!(value(src), "false");
}

#[test]
fn accessors_and_initialize() {
    let src = r#"
        (begin
          (class (const nil :Person) nil
            (begin
              (send nil :attr_accessor (sym :name) (sym :age))
              (def :initialize (args (arg :name) (arg :age))
                (begin (ivasgn :@name (lvar :name)) (ivasgn :@age (lvar :age))))))
          (lvasgn :p (send (const nil :Person) :new (str "Ann") (int 30)))
          (send (lvar :p) :age= (send (send (lvar :p) :age) :+ (int 1)))
          (array (send (lvar :p) :name) (send (lvar :p) :age)))"#;
    assert_eq!(value(src), r#"["Ann", 31]"#);
}

#[test]
fn new_checks_initialize_arity() {
    let src = r#"
        (begin
          (class (const nil :Pair) nil
            (def :initialize (args (arg :a) (arg :b)) nil))
          (send (const nil :Pair) :new (int 1)))"#;
    assert_eq!(error(src).0, "ArgumentError");
}

#[test]
fn define_method_closes_over_locals() {
    let src = r#"
        (begin
          (class (const nil :Dyn) nil
            (block (send (array (sym :a) (sym :b)) :each) (args (procarg0 (arg :n)))
              (block (send nil :define_method (send (str "get_") :+ (send (lvar :n) :to_s))) (args)
                (lvar :n))))
          (lvasgn :d (send (const nil :Dyn) :new))
          (array (send (lvar :d) :get_a) (send (lvar :d) :get_b)))"#;
    assert_eq!(value(src), "[:a, :b]");
}

#[test]
fn method_missing_receives_name_and_args() {
    let src = r#"
        (begin
          (class (const nil :Ghost) nil
            (def :method_missing (args (arg :name) (restarg :rest))
              (array (lvar :name) (lvar :rest))))
          (send (send (const nil :Ghost) :new) :anything (int 1) (int 2)))"#;
    assert_eq!(value(src), "[:anything, [1, 2]]");
}

#[test]
fn undefined_method_names_receiver() {
    let src = r#"(send (int 5) :frobnicate)"#;
    assert_eq!(
        error(src),
        (
            "NoMethodError".to_string(),
            "undefined method 'frobnicate' for an instance of Integer".to_string()
        )
    );
}

#[test]
fn comparable_from_spaceship() {
    let src = r#"
        (begin
          (class (const nil :Ver) nil
            (begin
              (send nil :include (const nil :Comparable))
              (send nil :attr_reader (sym :n))
              (def :initialize (args (arg :n)) (ivasgn :@n (lvar :n)))
              (def :<=> (args (arg :o)) (send (ivar :@n) :<=> (send (lvar :o) :n)))))
          (lvasgn :a (send (const nil :Ver) :new (int 1)))
          (lvasgn :b (send (const nil :Ver) :new (int 2)))
          (array
            (send (lvar :a) :< (lvar :b))
            (send (lvar :a) :== (send (const nil :Ver) :new (int 1)))
            (send (lvar :b) :between? (lvar :a) (lvar :b))))"#;
    assert_eq!(value(src), "[true, true, true]");
}

#[test]
fn enumerable_from_each() {
    let src = r#"
        (begin
          (class (const nil :Trio) nil
            (begin
              (send nil :include (const nil :Enumerable))
              (def :each (args)
                (begin (yield (int 3)) (yield (int 1)) (yield (int 2)) (self)))))
          (lvasgn :t (send (const nil :Trio) :new))
          (array
            (block (send (lvar :t) :map) (args (procarg0 (arg :x))) (send (lvar :x) :* (int 2)))
            (send (lvar :t) :sort)
            (block (send (lvar :t) :select) (args (procarg0 (arg :x))) (send (lvar :x) :odd?))
            (send (lvar :t) :include? (int 2))
            (send (lvar :t) :min)))"#;
    assert_eq!(value(src), "[[6, 2, 4], [1, 2, 3], [3, 1], true, 1]");
}

#[test]
fn enumerable_blocks_run_as_each_yields() {
    let src = r#"
        (begin
          (class (const nil :Noisy) nil
            (begin
              (send nil :include (const nil :Enumerable))
              (def :each (args)
                (begin
                  (send nil :puts (str "y1")) (yield (int 1))
                  (send nil :puts (str "y2")) (yield (int 2))
                  (self)))))
          (block (send (send (const nil :Noisy) :new) :map) (args (procarg0 (arg :x)))
            (send nil :puts (lvar :x))))"#;
    assert_eq!(output(src), "y1\n1\ny2\n2\n");
}

#[test]
fn break_from_each_with_index_stops_each() {
    let src = r#"
        (begin
          (class (const nil :Noisy) nil
            (begin
              (send nil :include (const nil :Enumerable))
              (def :each (args)
                (begin
                  (send nil :puts (str "y1")) (yield (int 1))
                  (send nil :puts (str "y2")) (yield (int 2))
                  (self)))))
          (block (send (send (const nil :Noisy) :new) :each_with_index) (args (arg :x) (arg :i))
            (break (lvar :x))))"#;
    let r = run(src);
    assert_eq!(r.output, "y1\n");
    assert_eq!(r.result.unwrap(), "1");
    assert!(r.balanced);
}

#[test]
fn answered_queries_leave_each_early() {
    let src = r#"
        (begin
          (class (const nil :Once) nil
            (begin
              (send nil :include (const nil :Enumerable))
              (def :each (args)
                (begin (yield (int 1)) (send nil :raise (str "walked too far")) (self)))))
          (lvasgn :t (send (const nil :Once) :new))
          (array
            (block (send (lvar :t) :find) (args (procarg0 (arg :x))) (true))
            (send (lvar :t) :first)
            (send (lvar :t) :first (int 1))
            (send (lvar :t) :take (int 1))
            (send (lvar :t) :include? (int 1))
            (send (lvar :t) :find_index (int 1))
            (block (send (lvar :t) :any?) (args (procarg0 (arg :x))) (true))
            (block (send (lvar :t) :all?) (args (procarg0 (arg :x))) (false))
            (block (send (lvar :t) :none?) (args (procarg0 (arg :x))) (true))))"#;
    let r = run(src);
    assert_eq!(r.result.unwrap(), "[1, 1, [1], [1], true, 0, true, false, false]");
    assert!(r.balanced);
}

#[test]
fn find_over_a_long_range_returns_at_the_hit() {
    let src = r#"
        (block (send (irange (int 1) (int 3000000000)) :find) (args (procarg0 (arg :x)))
          (send (lvar :x) :== (int 2)))"#;
    assert_eq!(value(src), "2");
}

#[test]
fn nested_walks_stop_only_the_one_that_answered() {
    let src = r#"
        (begin
          (class (const nil :Trio) nil
            (begin
              (send nil :include (const nil :Enumerable))
              (def :each (args)
                (begin (yield (int 3)) (yield (int 1)) (yield (int 2)) (self)))))
          (class (const nil :Wrap) nil
            (begin
              (send nil :include (const nil :Enumerable))
              (def :each (args)
                (begin
                  (block (send (send (const nil :Trio) :new) :each_with_index) (args (arg :x) (arg :i))
                    (yield (lvar :x)))
                  (send nil :puts (str "after"))
                  (self)))))
          (block (send (send (const nil :Wrap) :new) :find) (args (procarg0 (arg :x)))
            (send (lvar :x) :== (int 1))))"#;
    let r = run(src);
    assert_eq!(r.output, "");
    assert_eq!(r.result.unwrap(), "1");
    assert!(r.balanced);
}

#[test]
fn class_eval_defines_instance_methods() {
    let src = r#"
        (begin
          (class (const nil :Open) nil nil)
          (block (send (const nil :Open) :class_eval) (args)
            (def :late (args) (sym :added)))
          (send (send (const nil :Open) :new) :late))"#;
    assert_eq!(value(src), ":added");
}

#[test]
fn instance_variables_are_per_object() {
    let src = r#"
        (begin
          (class (const nil :Cell) nil
            (begin
              (def :set (args (arg :v)) (ivasgn :@v (lvar :v)))
              (def :get (args) (ivar :@v))))
          (lvasgn :a (send (const nil :Cell) :new))
          (lvasgn :b (send (const nil :Cell) :new))
          (send (lvar :a) :set (int 1))
          (array (send (lvar :a) :get) (send (lvar :b) :get)))"#;
    assert_eq!(value(src), "[1, nil]");
}

#[test]
fn class_body_sees_enclosing_module_constants() {
    let src = r#"
        (begin
          (module (const nil :Geo)
            (begin
              (casgn nil :ORIGIN (int 0))
              (class (const nil :Point) nil
                (begin
                  (casgn nil :START (const nil :ORIGIN))
                  (def :origin (args) (const nil :START))))))
          (array
            (send (send (const (const nil :Geo) :Point) :new) :origin)
            (send (const (const nil :Geo) :Point) :name)))"#;
    assert_eq!(value(src), r#"[0, "Geo::Point"]"#);
}
