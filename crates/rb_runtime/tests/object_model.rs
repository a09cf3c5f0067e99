mod common;

use common::{call_str, class_under_object, raised_class, runtime, tagged};
use proptest::prelude::*;
use rb_runtime::core::{class, dispatch};
use rb_runtime::{CallerContext, Visibility};

#[test]
fn own_definition_wins_over_later_include() {
    let mut rt = runtime();
    let a = class_under_object(&rt, "A");
    let m = rt.new_module("M");
    rt.define_instance_method(&a, "m", tagged("m", "from A"));
    rt.define_instance_method(&m, "m", tagged("m", "from M"));
    class::include(&a, &m).unwrap();
    let obj = rt.allocate(&a).unwrap();
    assert_eq!(call_str(&mut rt, &obj, "m"), "from A");
}

#[test]
fn include_sits_between_class_and_base() {
    let mut rt = runtime();
    let base = class_under_object(&rt, "Base");
    let child = class::subclass(&base, "Child").unwrap();
    let m = rt.new_module("M");
    rt.define_instance_method(&base, "who", tagged("who", "base"));
    rt.define_instance_method(&m, "who", tagged("who", "mixin"));
    class::include(&child, &m).unwrap();
    let obj = rt.allocate(&child).unwrap();
    assert_eq!(call_str(&mut rt, &obj, "who"), "mixin");

    let names: Vec<String> = dispatch::ancestors(&child)
        .iter()
        .filter_map(|c| c.module_name())
        .take(3)
        .collect();
    assert_eq!(names, ["Child", "M", "Base"]);
}

#[test]
fn later_include_is_searched_first() {
    let mut rt = runtime();
    let a = class_under_object(&rt, "A");
    let m1 = rt.new_module("M1");
    let m2 = rt.new_module("M2");
    rt.define_instance_method(&m1, "x", tagged("x", "m1"));
    rt.define_instance_method(&m2, "x", tagged("x", "m2"));
    class::include(&a, &m1).unwrap();
    class::include(&a, &m2).unwrap();
    let obj = rt.allocate(&a).unwrap();
    assert_eq!(call_str(&mut rt, &obj, "x"), "m2");
}

#[test]
fn extend_affects_only_the_receiver() {
    let mut rt = runtime();
    let a = class_under_object(&rt, "A");
    let m = rt.new_module("Greet");
    rt.define_instance_method(&m, "hi", tagged("hi", "hello"));
    let one = rt.allocate(&a).unwrap();
    let other = rt.allocate(&a).unwrap();
    class::extend(&one, &m).unwrap();
    assert_eq!(call_str(&mut rt, &one, "hi"), "hello");
    assert_eq!(raised_class(rt.send(&other, "hi", &[], None)), "NoMethodError");
}

#[test]
fn extended_class_methods_reach_subclasses_not_instances() {
    let mut rt = runtime();
    let b = class_under_object(&rt, "B");
    let sub = class::subclass(&b, "Sub").unwrap();
    let m = rt.new_module("ClassMethods");
    rt.define_instance_method(&m, "build", tagged("build", "built"));
    class::extend(&b, &m).unwrap();
    assert_eq!(call_str(&mut rt, &b, "build"), "built");
    assert_eq!(call_str(&mut rt, &sub, "build"), "built");
    let inst = rt.allocate(&b).unwrap();
    assert_eq!(raised_class(rt.send(&inst, "build", &[], None)), "NoMethodError");
}

#[test]
fn singleton_methods_are_not_visible_from_instances() {
    let mut rt = runtime();
    let a = class_under_object(&rt, "A");
    rt.define_singleton(&a, "create", tagged("create", "made"));
    assert_eq!(call_str(&mut rt, &a, "create"), "made");
    let inst = rt.allocate(&a).unwrap();
    assert!(!rt.respond_to(&inst, "create", true));
}

#[test]
fn private_methods_need_an_implicit_receiver() {
    let mut rt = runtime();
    let a = class_under_object(&rt, "A");
    rt.define_instance_method(&a, "secret", tagged("secret", "s"));
    rt.set_visibility(&a, Visibility::Private, &["secret".to_string()])
        .unwrap();
    let obj = rt.allocate(&a).unwrap();
    let out = rt.send_with(&obj, "secret", &[], None, CallerContext::PUBLIC);
    assert_eq!(raised_class(out), "NoMethodError");
    assert_eq!(call_str(&mut rt, &obj, "secret"), "s");
}

#[test]
fn including_a_class_is_rejected() {
    let rt = runtime();
    let a = class_under_object(&rt, "A");
    let b = class_under_object(&rt, "B");
    assert!(class::include(&a, &b).is_err());
    assert!(class::subclass(&rt.new_module("M"), "X").is_err());
}

#[test]
fn copy_keeps_methods_but_not_identity() {
    let mut rt = runtime();
    let a = class_under_object(&rt, "A");
    rt.define_instance_method(&a, "v", tagged("v", "one"));
    let c = class::copy(&a).unwrap();
    assert!(!c.ptr_eq(&a));
    let obj = rt.allocate(&c).unwrap();
    assert_eq!(call_str(&mut rt, &obj, "v"), "one");
    rt.define_instance_method(&c, "v", tagged("v", "two"));
    let orig = rt.allocate(&a).unwrap();
    assert_eq!(call_str(&mut rt, &orig, "v"), "one");
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 16, ..ProptestConfig::default() })]

    #[test]
    fn inherited_methods_resolve_through_any_depth(depth in 1usize..12) {
        let mut rt = runtime();
        let root = class_under_object(&rt, "C0");
        rt.define_instance_method(&root, "origin", tagged("origin", "root"));
        let mut leaf = root.clone();
        for i in 1..=depth {
            leaf = class::subclass(&leaf, &format!("C{i}")).unwrap();
        }
        let obj = rt.allocate(&leaf).unwrap();
        prop_assert_eq!(call_str(&mut rt, &obj, "origin"), "root");
        prop_assert!(dispatch::is_a(&obj, &root));
        prop_assert!(dispatch::ancestors(&leaf).len() > depth);
    }
}
