mod common;

use common::{inspect, raised_class, runtime};
use num_bigint::BigInt;
use proptest::prelude::*;
use rb_runtime::{Runtime, RuntimeConfig};

proptest! {
    #![proptest_config(ProptestConfig { cases: 16, ..ProptestConfig::default() })]

    #[test]
    fn cached_integers_share_identity(v in -1000i64..=1000) {
        let rt = runtime();
        prop_assert!(rt.int(v).ptr_eq(&rt.int(v)));
        prop_assert!(rt.integer(BigInt::from(v)).ptr_eq(&rt.int(v)));
    }

    #[test]
    fn uncached_integers_are_fresh(v in prop_oneof![i64::MIN..-1000i64, 1001i64..i64::MAX]) {
        let rt = runtime();
        let a = rt.int(v);
        let b = rt.int(v);
        prop_assert!(!a.ptr_eq(&b));
        prop_assert_eq!(a.as_i64(), b.as_i64());
    }

    #[test]
    fn addition_agrees_with_host_integers(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let mut rt = runtime();
        let x = rt.int(a);
        let y = rt.int(b);
        let sum = rt.send(&x, "+", &[y.clone()], None).unwrap();
        prop_assert_eq!(sum.as_i64(), Some(a + b));
        let prod = rt.send(&x, "*", &[y], None).unwrap();
        prop_assert_eq!(prod.as_i64(), Some(a * b));
    }

    #[test]
    fn floor_division_matches_ruby(a in -500i64..500, b in prop_oneof![-50i64..-1, 1i64..50]) {
        let mut rt = runtime();
        let x = rt.int(a);
        let y = rt.int(b);
        let q = rt.send(&x, "/", &[y.clone()], None).unwrap().as_i64().unwrap();
        let r = rt.send(&x, "%", &[y], None).unwrap().as_i64().unwrap();
        prop_assert_eq!(q * b + r, a);
        prop_assert!(r == 0 || (r < 0) == (b < 0));
    }
}

#[test]
fn custom_cache_range() {
    let cfg = RuntimeConfig {
        integer_cache_min: 0,
        integer_cache_max: 10,
        ..RuntimeConfig::default()
    };
    let rt = Runtime::with_config(cfg);
    assert!(rt.int(10).ptr_eq(&rt.int(10)));
    assert!(!rt.int(-1).ptr_eq(&rt.int(-1)));
    assert!(!rt.int(11).ptr_eq(&rt.int(11)));
}

#[test]
fn overflow_promotes_to_bignum() {
    let mut rt = runtime();
    let big = rt.int(i64::MAX);
    let one = rt.int(1);
    let sum = rt.send(&big, "+", &[one], None).unwrap();
    assert_eq!(sum.as_i64(), None);
    assert_eq!(inspect(&mut rt, &sum), "9223372036854775808");
    let two = rt.int(2);
    let p = rt.send(&two, "**", &[rt.int(100)], None).unwrap();
    assert_eq!(inspect(&mut rt, &p), "1267650600228229401496703205376");
}

#[test]
fn division_by_zero_raises() {
    let mut rt = runtime();
    let x = rt.int(1);
    let zero = rt.int(0);
    assert_eq!(raised_class(rt.send(&x, "/", &[zero.clone()], None)), "ZeroDivisionError");
    assert_eq!(raised_class(rt.send(&x, "%", &[zero], None)), "ZeroDivisionError");
}

#[test]
fn float_text_forms() {
    let mut rt = runtime();
    let cases = [(1.0, "1.0"), (2.5, "2.5"), (1e20, "1.0e+20"), (f64::INFINITY, "Infinity")];
    for (f, text) in cases {
        let v = rt.float(f);
        assert_eq!(inspect(&mut rt, &v), text);
    }
    let third = rt.float(1.0);
    let three = rt.int(3);
    let q = rt.send(&third, "/", &[three], None).unwrap();
    assert_eq!(inspect(&mut rt, &q), "0.3333333333333333");
}
