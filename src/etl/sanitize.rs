use serde_json::Value;

/// Recursively replace unrepresentable numeric leaves with `null` so the
/// document always serializes under strict JSON. Maps keep their keys,
/// sequences keep their order, everything else passes through.
///
/// `serde_json` already maps a NaN float to `Null` when a record is
/// converted to a `Value`; this walk is the final guard over the whole
/// assembled document.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::Number(num) => match num.as_f64() {
            Some(f) if !f.is_finite() => Value::Null,
            _ => Value::Number(num),
        },
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, sanitize(v))).collect()),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finite_structures_pass_through_unchanged() {
        let input = json!({
            "a": 1.5,
            "b": [1, 2, {"c": "text", "d": null}],
            "e": {"f": true, "g": 0.0},
        });
        assert_eq!(sanitize(input.clone()), input);
    }

    #[test]
    fn nan_hours_leave_no_trace_in_a_serialized_record() {
        let mut rec = crate::etl::model::test_record("2024-01-01", "Work", f64::NAN);
        rec.notes = Some("n/a hours import".to_string());

        let value = sanitize(serde_json::to_value(&rec).expect("serialize"));
        assert_eq!(value.get("hours"), Some(&Value::Null));
        assert_eq!(
            value.get("notes").and_then(Value::as_str),
            Some("n/a hours import")
        );
    }

    #[test]
    fn nested_sequences_keep_order() {
        let input = json!([{"a": [3, 1, 2]}, {"b": ["z", "a"]}]);
        let out = sanitize(input.clone());
        assert_eq!(out, input);
    }
}
