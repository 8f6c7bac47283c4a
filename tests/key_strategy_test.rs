#![allow(missing_docs)]

use std::collections::{BTreeMap, HashMap};

use treecode::key_strategy::to_snake_case;
use treecode::{
    Encode, EncodeOptions, Encoder, KeyStrategy, Mapping, NativeTransform, Result, Value,
    encode_tree,
};

fn keys(map: &Mapping) -> Vec<&str> {
    map.keys().filter_map(Value::as_str).collect()
}

fn snake() -> EncodeOptions {
    EncodeOptions::new().with_key_strategy(KeyStrategy::SnakeCase)
}

struct Settings {
    tags: BTreeMap<String, u8>,
}

impl Encode for Settings {
    fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
        let mut container = encoder.keyed_container()?;
        container.encode("myValue", &1)?;
        container.encode("tagMap", &self.tags)?;
        container.nested_keyed_container("innerBox", |inner| inner.encode("deepKey", &true))
    }
}

#[test]
fn test_field_names_are_converted_once() -> Result<()> {
    let mut tags = BTreeMap::new();
    tags.insert("someKey".to_string(), 1);
    let tree = encode_tree(&Settings { tags }, &NativeTransform, &snake())?;
    let map = tree.as_mapping().expect("mapping");

    assert_eq!(keys(map), ["my_value", "tag_map", "inner_box"]);

    let inner = map.get("inner_box").and_then(Value::as_mapping).expect("inner");
    assert_eq!(keys(inner), ["deep_key"]);
    Ok(())
}

#[test]
fn test_data_map_keys_are_never_converted() -> Result<()> {
    let mut tags = BTreeMap::new();
    tags.insert("someKey".to_string(), 1);
    let tree = encode_tree(&Settings { tags }, &NativeTransform, &snake())?;

    let tag_map = tree
        .as_mapping()
        .and_then(|m| m.get("tag_map"))
        .and_then(Value::as_mapping)
        .expect("tag map");
    assert_eq!(keys(tag_map), ["someKey"]);

    let mut top: HashMap<&str, u8> = HashMap::new();
    top.insert("zetaKey", 1);
    top.insert("alphaKey", 2);
    let tree = encode_tree(&top, &NativeTransform, &snake())?;
    assert_eq!(keys(tree.as_mapping().expect("mapping")), ["alphaKey", "zetaKey"]);
    Ok(())
}

#[test]
fn test_custom_strategy_sees_container_path() -> Result<()> {
    struct Inner;

    impl Encode for Inner {
        fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
            encoder.keyed_container()?.encode("b", &0)
        }
    }

    struct Outer;

    impl Encode for Outer {
        fn encode(&self, encoder: &mut Encoder<'_, '_>) -> Result<()> {
            let mut container = encoder.keyed_container()?;
            container.encode("a", &0)?;
            container.encode("outer", &Inner)
        }
    }

    let strategy = KeyStrategy::custom(|path, key| format!("{}:{key}", path.len()));
    let options = EncodeOptions::new().with_key_strategy(strategy);
    let tree = encode_tree(&Outer, &NativeTransform, &options)?;
    let map = tree.as_mapping().expect("mapping");

    assert_eq!(keys(map), ["0:a", "0:outer"]);
    let inner = map.get("0:outer").and_then(Value::as_mapping).expect("inner");
    assert_eq!(keys(inner), ["1:b"]);
    Ok(())
}

#[test]
fn test_snake_case_conversion() {
    let cases = [
        ("myValue", "my_value"),
        ("already_snake", "already_snake"),
        ("HTTPServer", "http_server"),
        ("myURLValue", "my_url_value"),
        ("version2Name", "version2_name"),
        ("_privateKey_", "_private_key_"),
        ("__", "__"),
        ("", ""),
    ];
    for (input, expected) in cases {
        assert_eq!(to_snake_case(input), expected, "converting {input:?}");
    }
}
