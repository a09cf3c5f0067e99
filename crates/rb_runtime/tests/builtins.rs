mod common;

use common::{inspect, raised_class, runtime};
use rb_runtime::{HashData, Runtime, Value};

fn ints(rt: &Runtime, xs: &[i64]) -> Value {
    rt.array(xs.iter().map(|x| rt.int(*x)).collect())
}

#[test]
fn array_concatenation_difference_and_repetition() {
    let mut rt = runtime();
    let a = ints(&rt, &[1, 2, 3, 2]);
    let b = ints(&rt, &[2, 4]);
    let sum = rt.send(&a, "+", &[b.clone()], None).unwrap();
    assert_eq!(inspect(&mut rt, &sum), "[1, 2, 3, 2, 2, 4]");
    let diff = rt.send(&a, "-", &[b], None).unwrap();
    assert_eq!(inspect(&mut rt, &diff), "[1, 3]");
    let two = rt.int(2);
    let rep = rt.send(&diff, "*", &[two], None).unwrap();
    assert_eq!(inspect(&mut rt, &rep), "[1, 3, 1, 3]");
    let sep = rt.str(",");
    let joined = rt.send(&rep, "*", &[sep], None).unwrap();
    assert_eq!(joined.as_str().unwrap().as_str(), "1,3,1,3");
}

#[test]
fn array_indexing_and_growth() {
    let mut rt = runtime();
    let a = ints(&rt, &[10, 20, 30]);
    let neg = rt.int(-1);
    assert_eq!(rt.send(&a, "[]", &[neg], None).unwrap().as_i64(), Some(30));
    let far = rt.int(10);
    assert!(rt.send(&a, "[]", &[far], None).unwrap().is_nil());
    let at = rt.int(5);
    let v = rt.int(60);
    rt.send(&a, "[]=", &[at, v], None).unwrap();
    assert_eq!(inspect(&mut rt, &a), "[10, 20, 30, nil, nil, 60]");
    let r = rt.range(rt.int(1), rt.int(2), false);
    let slice = rt.send(&a, "[]", &[r], None).unwrap();
    assert_eq!(inspect(&mut rt, &slice), "[20, 30]");
    let missing = rt.int(99);
    assert_eq!(raised_class(rt.send(&a, "fetch", &[missing], None)), "IndexError");
}

#[test]
fn array_inspect_handles_self_reference() {
    let mut rt = runtime();
    let a = ints(&rt, &[1]);
    rt.send(&a, "push", &[a.clone()], None).unwrap();
    assert_eq!(inspect(&mut rt, &a), "[1, [...]]");
}

#[test]
fn hash_keeps_insertion_order_and_defaults() {
    let mut rt = runtime();
    let mut data = HashData::new(Some(rt.int(0)));
    data.insert(rt.str("b"), rt.int(2));
    data.insert(rt.str("a"), rt.int(1));
    let h = rt.hash(data);
    assert_eq!(inspect(&mut rt, &h), r#"{"b"=>2, "a"=>1}"#);
    let missing = rt.str("zzz");
    assert_eq!(rt.send(&h, "[]", &[missing.clone()], None).unwrap().as_i64(), Some(0));
    assert_eq!(raised_class(rt.send(&h, "fetch", &[missing], None)), "KeyError");
    let key = rt.str("b");
    let nine = rt.int(9);
    rt.send(&h, "[]=", &[key, nine], None).unwrap();
    assert_eq!(inspect(&mut rt, &h), r#"{"b"=>9, "a"=>1}"#);
    let keys = rt.send(&h, "keys", &[], None).unwrap();
    assert_eq!(inspect(&mut rt, &keys), r#"["b", "a"]"#);
}

#[test]
fn hash_keys_compare_by_value() {
    let mut rt = runtime();
    let mut data = HashData::new(None);
    data.insert(ints(&rt, &[1, 2]), rt.str("pair"));
    data.insert(rt.float(1.0), rt.str("float"));
    let h = rt.hash(data);
    let probe = ints(&rt, &[1, 2]);
    let hit = rt.send(&h, "[]", &[probe], None).unwrap();
    assert_eq!(hit.as_str().unwrap().as_str(), "pair");
    let int_one = rt.int(1);
    assert!(rt.send(&h, "[]", &[int_one], None).unwrap().is_nil());
}

#[test]
fn range_iteration_and_membership() {
    let mut rt = runtime();
    let r = rt.range(rt.int(1), rt.int(5), true);
    let items = rt.send(&r, "to_a", &[], None).unwrap();
    assert_eq!(inspect(&mut rt, &items), "[1, 2, 3, 4]");
    assert_eq!(inspect(&mut rt, &r), "1...5");
    let five = rt.int(5);
    assert!(!rt.send(&r, "include?", &[five], None).unwrap().truthy());
    let sum = rt.send(&r, "sum", &[], None).unwrap();
    assert_eq!(sum.as_i64(), Some(10));
    let letters = rt.range(rt.str("a"), rt.str("e"), false);
    let all = rt.send(&letters, "to_a", &[], None).unwrap();
    assert_eq!(inspect(&mut rt, &all), r#"["a", "b", "c", "d", "e"]"#);
}

#[test]
fn string_operations() {
    let mut rt = runtime();
    let s = rt.str("Hello");
    let world = rt.str(", world");
    let joined = rt.send(&s, "+", &[world], None).unwrap();
    assert_eq!(joined.as_str().unwrap().as_str(), "Hello, world");
    let up = rt.send(&joined, "upcase", &[], None).unwrap();
    assert_eq!(up.as_str().unwrap().as_str(), "HELLO, WORLD");
    let quoted = rt.str("a\"b\n");
    assert_eq!(inspect(&mut rt, &quoted), r#""a\"b\n""#);
    let sym = rt.send(&s, "to_sym", &[], None).unwrap();
    assert!(sym.ptr_eq(&rt.sym("Hello")));
    let n = rt.int(3);
    let mismatch = rt.send(&s, "+", &[n], None);
    assert_eq!(raised_class(mismatch), "TypeError");
}

#[test]
fn nil_and_booleans_print_like_ruby() {
    let mut rt = runtime();
    let nil = rt.nil();
    assert_eq!(rt.to_s(&nil).unwrap(), "");
    assert_eq!(inspect(&mut rt, &nil), "nil");
    let t = rt.bool(true);
    assert_eq!(rt.to_s(&t).unwrap(), "true");
    assert!(rt.nil().ptr_eq(&rt.nil()));
}

#[test]
fn comparison_through_spaceship() {
    let mut rt = runtime();
    let a = rt.int(3);
    let b = rt.float(3.5);
    assert!(rt.compare(&a, &b).unwrap().is_lt());
    let (two, two_f) = (rt.int(2), rt.float(2.0));
    assert!(rt.equals(&two, &two_f).unwrap());
    let s = rt.str("x");
    let err = rt.compare(&a, &s).unwrap_err();
    let rb_runtime::Unwind::Raise(exc) = err else {
        panic!("expected a raise");
    };
    assert_eq!(exc.class_name(), "ArgumentError");
    assert_eq!(rt.exception_message(&exc), "comparison of Integer with String failed");
}

#[test]
fn comparison_failure_shows_plain_operands() {
    let mut rt = runtime();
    let s = rt.str("x");
    let three = rt.int(3);
    let err = rt.compare(&s, &three).unwrap_err();
    let rb_runtime::Unwind::Raise(exc) = err else {
        panic!("expected a raise");
    };
    assert_eq!(rt.exception_message(&exc), "comparison of String with 3 failed");
}

#[test]
fn oversized_repeats_are_refused() {
    let mut rt = runtime();
    let huge = rt.int(4_611_686_018_427_387_904);
    let a = ints(&rt, &[1]);
    let err = rt.send(&a, "*", &[huge.clone()], None).unwrap_err();
    let rb_runtime::Unwind::Raise(exc) = err else {
        panic!("expected a raise");
    };
    assert_eq!(exc.class_name(), "ArgumentError");
    assert_eq!(rt.exception_message(&exc), "argument too big");

    let s = rt.str("a");
    assert_eq!(raised_class(rt.send(&s, "*", &[huge.clone()], None)), "ArgumentError");
    let array = rt.classes.array.clone();
    assert_eq!(raised_class(rt.send(&array, "new", &[huge.clone()], None)), "ArgumentError");

    // Nothing to repeat stays cheap at any count.
    let empty = ints(&rt, &[]);
    let out = rt.send(&empty, "*", &[huge.clone()], None).unwrap();
    assert_eq!(inspect(&mut rt, &out), "[]");
    let blank = rt.str("");
    let out = rt.send(&blank, "*", &[huge], None).unwrap();
    assert_eq!(inspect(&mut rt, &out), "\"\"");
}

#[test]
fn fill_needs_a_value_or_block() {
    let mut rt = runtime();
    let a = ints(&rt, &[1, 2]);
    let err = rt.send(&a, "fill", &[], None).unwrap_err();
    let rb_runtime::Unwind::Raise(exc) = err else {
        panic!("expected a raise");
    };
    assert_eq!(exc.class_name(), "ArgumentError");
    assert_eq!(inspect(&mut rt, &a), "[1, 2]");
    let zero = rt.int(0);
    rt.send(&a, "fill", &[zero], None).unwrap();
    assert_eq!(inspect(&mut rt, &a), "[0, 0]");
}
