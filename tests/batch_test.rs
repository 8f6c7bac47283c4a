#![allow(missing_docs)]

use treecode::codec::json::JsonTransform;
use treecode::{EncodeError, NativeTransform, TreeEncoder, Value};

#[test]
fn test_encode_many_keeps_input_order() {
    let values: Vec<u32> = (0..1_000).collect();
    let results = TreeEncoder::new(NativeTransform).encode_many(&values);

    assert_eq!(results.len(), values.len());
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.as_ref().ok(), Some(&Value::Integer(i as i128)));
    }
}

#[test]
fn test_encode_many_isolates_failures() {
    let values = vec![1.0, f64::NAN, 3.0];
    let results = TreeEncoder::new(JsonTransform::new()).encode_many(&values);

    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(EncodeError::InvalidValue { .. })));
    assert_eq!(results[2].as_ref().ok(), Some(&Value::Float(3.0)));
}
