use shnap::scope::{BindingFlags, Scope, ScopeError};
use shnap::value::Value;

fn int_of(scope: &Scope, name: &str) -> String {
    scope.lookup(name).unwrap().to_string()
}

#[test]
fn lookup_walks_the_parent_chain() {
    let root = Scope::new();
    root.set_locally("a", Value::int(1)).unwrap();

    let child = Scope::child_of(&root);
    assert_eq!(int_of(&child, "a"), "1");
    assert_eq!(child.get_local("a").map(|v| v.to_string()), None);
    assert_eq!(
        child.lookup("missing").unwrap_err(),
        ScopeError::Absent("missing".into())
    );
}

#[test]
fn set_updates_the_nearest_owner() {
    let root = Scope::new();
    root.set_locally("a", Value::int(1)).unwrap();

    let child = Scope::child_of(&root);
    child.set("a", Value::int(2)).unwrap();
    child.set("b", Value::int(3)).unwrap();

    assert_eq!(int_of(&root, "a"), "2");
    assert!(child.contains_local("b"));
    assert!(root.lookup("b").is_err());
}

#[test]
fn set_locally_shadows() {
    let root = Scope::new();
    root.set_locally("a", Value::int(1)).unwrap();

    let child = Scope::child_of(&root);
    child.set_locally("a", Value::int(9)).unwrap();

    assert_eq!(int_of(&root, "a"), "1");
    assert_eq!(int_of(&child, "a"), "9");
}

#[test]
fn private_bindings_need_a_descendant_accessor() {
    let root = Scope::new();
    let object = Scope::child_of(&root);
    object.set_locally("secret", Value::int(7)).unwrap();
    object.set_flag("secret", BindingFlags::PRIVATE);

    let method = Scope::child_of(&object);
    assert_eq!(object.lookup_from("secret", &method).unwrap().to_string(), "7");
    assert_eq!(
        object.lookup_from("secret", &root).unwrap_err(),
        ScopeError::Private("secret".into())
    );
    assert!(object
        .set_locally_from("secret", Value::int(8), &root)
        .is_err());
}

#[test]
fn finalized_bindings_accept_one_write_while_void() {
    let scope = Scope::new();
    scope.set_flag("x", BindingFlags::FINALIZED);
    assert!(scope.get_local("x").is_some_and(|v| v.is_void()));

    scope.set("x", Value::int(1)).unwrap();
    assert_eq!(
        scope.set("x", Value::int(2)).unwrap_err(),
        ScopeError::Finalized("x".into())
    );
    assert_eq!(int_of(&scope, "x"), "1");
}

#[test]
fn merge_skips_private_and_dont_import() {
    let source = Scope::new();
    source.set_locally("shared", Value::int(1)).unwrap();
    source.set_locally("hidden", Value::int(2)).unwrap();
    source.set_flag("hidden", BindingFlags::PRIVATE);
    source.set_locally("native", Value::int(3)).unwrap();
    source.set_flag("native", BindingFlags::DONT_IMPORT);
    source.set_locally("constant", Value::int(4)).unwrap();
    source.set_flag("constant", BindingFlags::FINALIZED);

    let target = Scope::new();
    source.merge_into(&target).unwrap();

    assert_eq!(target.names(), vec!["constant", "shared"]);
    assert!(target.has_flag("constant", BindingFlags::FINALIZED));

    // A second merge would overwrite the finalized binding.
    assert!(source.merge_into(&target).is_err());
}

#[test]
fn merge_with_a_finalized_conflict_changes_nothing() {
    let source = Scope::new();
    for (name, value) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
        source.set_locally(name, Value::int(value)).unwrap();
    }

    let target = Scope::new();
    target.set_locally("c", Value::int(30)).unwrap();
    target.set_flag("c", BindingFlags::FINALIZED);
    target.set_locally("b", Value::int(20)).unwrap();
    target.set_flag("b", BindingFlags::FINALIZED);

    assert_eq!(
        source.merge_into(&target).unwrap_err(),
        ScopeError::Finalized("b".into())
    );
    assert_eq!(target.names(), vec!["b", "c"]);
    assert_eq!(int_of(&target, "b"), "20");
    assert_eq!(int_of(&target, "c"), "30");
}

#[test]
fn copy_is_a_sibling_with_separate_bindings() {
    let root = Scope::new();
    let original = Scope::child_of(&root);
    original.set_locally("v", Value::int(1)).unwrap();

    let copy = original.copy();
    copy.set_locally("v", Value::int(2)).unwrap();

    assert_eq!(int_of(&original, "v"), "1");
    assert_eq!(int_of(&copy, "v"), "2");
    assert!(copy.parent().is_some_and(|p| p.ptr_eq(&root)));
    assert!(!copy.ptr_eq(&original));
}

#[test]
fn del_removes_only_own_bindings() {
    let root = Scope::new();
    root.set_locally("a", Value::int(1)).unwrap();
    let child = Scope::child_of(&root);

    assert!(!child.del("a"));
    assert!(root.del("a"));
    assert!(root.lookup("a").is_err());
}

#[test]
fn descendant_check_includes_self() {
    let root = Scope::new();
    let child = Scope::child_of(&root);
    let other = Scope::new();

    assert!(child.is_descendant_of(&child));
    assert!(child.is_descendant_of(&root));
    assert!(!root.is_descendant_of(&child));
    assert!(!child.is_descendant_of(&other));
}
