#![allow(missing_docs)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use treecode::{
    BoxContext, Encode, EncodeError, EncodeOptions, Encoder, Mapping, NativeTransform, Result,
    Transform, TreeEncoder, Value, encode_tree,
};

fn native<V: Encode + ?Sized>(value: &V) -> Result<Value> {
    encode_tree(value, &NativeTransform, &EncodeOptions::new())
}

fn keys(map: &Mapping) -> Vec<&str> {
    map.keys().filter_map(Value::as_str).collect()
}

// --- Helpers ---

struct Overwrites;

impl Encode for Overwrites {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        let mut container = encoder.keyed_container()?;
        container.encode("b", &1)?;
        container.encode("a", &2)?;
        container.encode("b", &3)
    }
}

struct Silent;

impl Encode for Silent {
    fn encode(&self, _encoder: &mut Encoder<'_, '_>) -> Result<()> {
        Ok(())
    }
}

struct TwoContainers;

impl Encode for TwoContainers {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        encoder.keyed_container()?;
        encoder.unkeyed_container()?;
        Ok(())
    }
}

struct DoubleWrite;

impl Encode for DoubleWrite {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        let mut single = encoder.single_value_container()?;
        single.encode_bool(true)?;
        single.encode_bool(false)
    }
}

/// Records the coding path it was encoded at.
#[derive(Default)]
struct Probe {
    seen: RefCell<Option<String>>,
}

impl Encode for Probe {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        *self.seen.borrow_mut() = Some(encoder.coding_path().to_string());
        encoder.single_value_container()?.encode_nil()
    }
}

impl Probe {
    fn seen(&self) -> Option<String> {
        self.seen.borrow().clone()
    }
}

#[derive(Default)]
struct Counting {
    boxed: AtomicUsize,
    folded: AtomicUsize,
}

impl Counting {
    fn tick(&self) {
        self.boxed.fetch_add(1, Ordering::SeqCst);
    }
}

impl Transform for Counting {
    fn box_nil(&self, cx: &BoxContext<'_>) -> Result<Value> {
        self.tick();
        NativeTransform.box_nil(cx)
    }

    fn box_bool(&self, value: bool, cx: &BoxContext<'_>) -> Result<Value> {
        self.tick();
        NativeTransform.box_bool(value, cx)
    }

    fn box_i64(&self, value: i64, cx: &BoxContext<'_>) -> Result<Value> {
        self.tick();
        NativeTransform.box_i64(value, cx)
    }

    fn box_u64(&self, value: u64, cx: &BoxContext<'_>) -> Result<Value> {
        self.tick();
        NativeTransform.box_u64(value, cx)
    }

    fn box_f64(&self, value: f64, cx: &BoxContext<'_>) -> Result<Value> {
        self.tick();
        NativeTransform.box_f64(value, cx)
    }

    fn box_str(&self, value: &str, cx: &BoxContext<'_>) -> Result<Value> {
        self.tick();
        NativeTransform.box_str(value, cx)
    }

    fn keyed_to_value(&self, entries: Vec<(String, Value)>, cx: &BoxContext<'_>) -> Result<Value> {
        self.folded.fetch_add(1, Ordering::SeqCst);
        NativeTransform.keyed_to_value(entries, cx)
    }
}

/// Refuses to fold any keyed container holding the key `poison`.
struct Strict;

impl Transform for Strict {
    fn box_nil(&self, cx: &BoxContext<'_>) -> Result<Value> {
        NativeTransform.box_nil(cx)
    }

    fn box_bool(&self, value: bool, cx: &BoxContext<'_>) -> Result<Value> {
        NativeTransform.box_bool(value, cx)
    }

    fn box_i64(&self, value: i64, cx: &BoxContext<'_>) -> Result<Value> {
        NativeTransform.box_i64(value, cx)
    }

    fn box_u64(&self, value: u64, cx: &BoxContext<'_>) -> Result<Value> {
        NativeTransform.box_u64(value, cx)
    }

    fn box_f64(&self, value: f64, cx: &BoxContext<'_>) -> Result<Value> {
        NativeTransform.box_f64(value, cx)
    }

    fn box_str(&self, value: &str, cx: &BoxContext<'_>) -> Result<Value> {
        NativeTransform.box_str(value, cx)
    }

    fn keyed_to_value(&self, entries: Vec<(String, Value)>, cx: &BoxContext<'_>) -> Result<Value> {
        if entries.iter().any(|(k, _)| k == "poison") {
            return Err(cx.invalid_value("poisoned container"));
        }
        NativeTransform.keyed_to_value(entries, cx)
    }
}

// --- TESTS ---

#[test]
fn test_overwrite_keeps_first_insertion_position() -> Result<()> {
    let tree = native(&Overwrites)?;
    let map = tree.as_mapping().expect("keyed container folds to a mapping");

    assert_eq!(keys(map), ["b", "a"]);
    assert_eq!(map.get("b"), Some(&Value::Integer(3)));
    assert_eq!(map.get("a"), Some(&Value::Integer(2)));
    Ok(())
}

#[test]
fn test_untouched_nested_scopes_resolve_to_empty_keyed() -> Result<()> {
    struct Reserving;

    impl Encode for Reserving {
        fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
            let mut container = encoder.keyed_container()?;
            container.nested_keyed_container("sub", |_| Ok(()))?;
            container.super_encoder(|_| Ok(()))?;
            container.encode("silent", &Silent)
        }
    }

    let tree = native(&Reserving)?;
    let map = tree.as_mapping().expect("mapping");

    assert_eq!(keys(map), ["sub", "super", "silent"]);
    for value in map.values() {
        assert_eq!(value, &Value::empty_mapping());
    }
    Ok(())
}

#[test]
fn test_nested_scopes_resolve_into_reserved_slots() -> Result<()> {
    struct Outer;

    impl Encode for Outer {
        fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
            let mut container = encoder.keyed_container()?;
            container.encode("first", &1)?;
            container.nested_unkeyed_container("list", |list| {
                list.encode(&"x")?;
                list.nested_keyed_container(|item| item.encode("deep", &true))?;
                list.encode_nil()
            })?;
            container.encode("last", &2)
        }
    }

    let tree = native(&Outer)?;
    let map = tree.as_mapping().expect("mapping");
    assert_eq!(keys(map), ["first", "list", "last"]);

    let list = map.get("list").and_then(Value::as_sequence).expect("list");
    assert_eq!(list.len(), 3);
    assert_eq!(list[0].as_str(), Some("x"));
    assert_eq!(
        list[1].as_mapping().and_then(|m| m.get("deep")),
        Some(&Value::Bool(true))
    );
    assert!(list[2].is_null());
    Ok(())
}

#[test]
fn test_value_passthrough_makes_no_boxing_calls() -> Result<()> {
    let mut inner = Mapping::new();
    inner.insert("k", Value::from("v"));
    let tree = Value::sequence(vec![Value::Integer(1), Value::Mapping(inner), Value::Null]);

    let encoder = TreeEncoder::new(Counting::default());
    let out = encoder.encode(&tree)?;

    assert_eq!(out, tree);
    assert_eq!(encoder.transform().boxed.load(Ordering::SeqCst), 0);
    assert_eq!(encoder.transform().folded.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn test_each_primitive_is_boxed_once() -> Result<()> {
    let encoder = TreeEncoder::new(Counting::default());
    encoder.encode(&Overwrites)?;

    assert_eq!(encoder.transform().boxed.load(Ordering::SeqCst), 3);
    assert_eq!(encoder.transform().folded.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_second_container_request_faults() {
    let err = native(&TwoContainers).expect_err("second container must fault");
    assert!(matches!(err, EncodeError::InvariantViolation { .. }));
    assert!(err.is_fault());

    let err = native(&DoubleWrite).expect_err("second write must fault");
    assert!(matches!(err, EncodeError::InvariantViolation { .. }));
}

#[test]
fn test_invariant_fault_is_codec_independent() {
    let json = treecode::codec::json::to_string(&TwoContainers);
    let cbor = treecode::codec::cbor::to_vec(&TwoContainers);
    let strict = encode_tree(&TwoContainers, &Strict, &EncodeOptions::new());

    for outcome in [json.err(), cbor.err(), strict.err()] {
        assert!(matches!(outcome, Some(EncodeError::InvariantViolation { .. })));
    }
}

#[test]
fn test_empty_top_level_is_an_error() {
    let err = native(&Silent).expect_err("nothing was written");
    match err {
        EncodeError::EmptyTopLevel { type_name } => assert!(type_name.ends_with("Silent")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_coding_paths_follow_traversal() -> Result<()> {
    struct Holder {
        items: Vec<Probe>,
        scoped: Probe,
        based: Probe,
    }

    impl Encode for Holder {
        fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
            let mut container = encoder.keyed_container()?;
            container.encode("items", &self.items)?;
            container.nested_unkeyed_container("list", |list| list.encode(&self.scoped))?;
            container.super_encoder(|encoder| self.based.encode(encoder))
        }
    }

    let holder = Holder {
        items: vec![Probe::default(), Probe::default()],
        scoped: Probe::default(),
        based: Probe::default(),
    };
    native(&holder)?;

    assert_eq!(holder.items[1].seen().as_deref(), Some("$.items[1]"));
    assert_eq!(holder.scoped.seen().as_deref(), Some("$.list[0]"));
    assert_eq!(holder.based.seen().as_deref(), Some("$.super"));
    Ok(())
}

#[test]
fn test_fold_failure_inside_nested_scope_surfaces() {
    struct Nested;

    impl Encode for Nested {
        fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
            let mut container = encoder.keyed_container()?;
            container.encode("ok", &1)?;
            container.nested_keyed_container("inner", |inner| inner.encode("poison", &true))
        }
    }

    let err = encode_tree(&Nested, &Strict, &EncodeOptions::new()).expect_err("fold fails");
    assert!(matches!(err, EncodeError::InvalidValue { .. }));
    assert_eq!(err.path().map(ToString::to_string).as_deref(), Some("$.inner"));
}

#[test]
fn test_fold_failure_inside_super_encoder_surfaces() {
    struct Derived;

    impl Encode for Derived {
        fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
            let mut container = encoder.keyed_container()?;
            container.super_encoder(|encoder| {
                let mut base = encoder.keyed_container()?;
                base.encode("poison", &0)
            })?;
            container.encode("unreached", &1)
        }
    }

    let err = encode_tree(&Derived, &Strict, &EncodeOptions::new()).expect_err("fold fails");
    assert_eq!(err.path().map(ToString::to_string).as_deref(), Some("$.super"));
}

#[test]
fn test_custom_errors_carry_the_path() {
    struct Picky;

    impl Encode for Picky {
        fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
            Err(EncodeError::custom(encoder.coding_path(), "refused"))
        }
    }

    let err = native(&vec![Picky]).expect_err("custom failure");
    assert_eq!(err.to_string(), "Encoding Failed at $[0]: refused");
}

#[test]
fn test_user_info_is_visible_to_values() -> Result<()> {
    struct Versioned;

    impl Encode for Versioned {
        fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
            let version = encoder.user_info::<u32>("version").copied().unwrap_or(0);
            encoder.single_value_container()?.encode_u64(u64::from(version))
        }
    }

    let options = EncodeOptions::new().with_user_info("version", 7u32);
    let tree = encode_tree(&Versioned, &NativeTransform, &options)?;
    assert_eq!(tree, Value::Integer(7));
    Ok(())
}

#[test]
fn test_large_data_map_keeps_every_entry_in_order() -> Result<()> {
    let count = 100_000u32;
    let map: BTreeMap<String, u32> = (0..count).map(|i| (format!("key{i:06}"), i)).collect();

    let tree = native(&map)?;
    let mapping = tree.as_mapping().expect("data map folds to a mapping");

    assert_eq!(mapping.len(), count as usize);
    assert_eq!(mapping.keys().next().and_then(Value::as_str), Some("key000000"));
    assert_eq!(mapping.keys().last().and_then(Value::as_str), Some("key099999"));
    assert_eq!(mapping.get("key054321"), Some(&Value::Integer(54_321)));
    Ok(())
}

#[test]
fn test_ignored_invariant_fault_still_fails_the_call() {
    struct Stubborn;

    impl Encode for Stubborn {
        fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
            {
                let mut container = encoder.keyed_container()?;
                container.encode("a", &1)?;
            }
            let second = encoder.unkeyed_container().map(|_| ());
            assert!(second.is_err());
            Ok(())
        }
    }

    let err = native(&Stubborn).expect_err("a swallowed fault must not yield a tree");
    assert!(matches!(err, EncodeError::InvariantViolation { .. }));

    let err = native(&vec![Stubborn]).expect_err("also when nested in a sequence");
    assert_eq!(err.path().map(ToString::to_string).as_deref(), Some("$[0]"));
}

#[test]
fn test_ignored_nested_scope_failure_still_fails_the_call() {
    struct Careless;

    impl Encode for Careless {
        fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
            let mut container = encoder.keyed_container()?;
            let inner = container.nested_keyed_container("inner", |inner| {
                inner.encode("x", &f64::NAN)
            });
            assert!(inner.is_err());
            container.encode("after", &2)
        }
    }

    let err = treecode::codec::json::to_string(&Careless).expect_err("truncated tree");
    assert!(matches!(err, EncodeError::InvalidValue { .. }));
    assert_eq!(
        err.path().map(ToString::to_string).as_deref(),
        Some("$.inner.x")
    );
}

#[test]
fn test_ignored_fault_inside_super_scope_fails_the_call() {
    struct Sloppy;

    impl Encode for Sloppy {
        fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
            let mut container = encoder.keyed_container()?;
            container.super_encoder(|encoder| {
                encoder.single_value_container()?.encode_bool(true)?;
                let _ = encoder.keyed_container().map(|_| ());
                Ok(())
            })?;
            container.encode("after", &1)
        }
    }

    let err = native(&Sloppy).expect_err("fault inside the scope");
    assert!(matches!(err, EncodeError::InvariantViolation { .. }));
    assert_eq!(err.path().map(ToString::to_string).as_deref(), Some("$.super"));
}

#[test]
fn test_failed_child_is_unwound_and_siblings_continue() -> Result<()> {
    struct HalfDone;

    impl Encode for HalfDone {
        fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
            let mut list = encoder.unkeyed_container()?;
            list.encode(&1)?;
            Err(EncodeError::custom(list.coding_path(), "gave up"))
        }
    }

    struct Recovering;

    impl Encode for Recovering {
        fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
            let mut container = encoder.keyed_container()?;
            let failed = container.encode("bad", &HalfDone);
            assert!(matches!(failed, Err(EncodeError::Custom { .. })));
            container.encode("good", &vec![3])
        }
    }

    let tree = native(&Recovering)?;
    let map = tree.as_mapping().expect("mapping");

    assert_eq!(keys(map), ["good"]);
    assert_eq!(
        map.get("good"),
        Some(&Value::sequence(vec![Value::Integer(3)]))
    );
    Ok(())
}
