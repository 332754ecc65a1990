//! Numeric ranges implied by OpenAPI `format` values.

use serde_json::{Map, Number, Value};

/// `(minimum, maximum)` for a numeric `format`, as JSON numbers.
///
/// `int64`/`uint64` keep exact integer representations; `float`/`double`
/// are expressed as `f64`.
#[must_use]
pub fn format_bounds(format: &str) -> Option<(Value, Value)> {
    let (min, max): (Value, Value) = match format {
        "int8" => (i8::MIN.into(), i8::MAX.into()),
        "int16" => (i16::MIN.into(), i16::MAX.into()),
        "int32" => (i32::MIN.into(), i32::MAX.into()),
        "int64" => (i64::MIN.into(), i64::MAX.into()),
        "uint8" => (0.into(), u8::MAX.into()),
        "uint16" => (0.into(), u16::MAX.into()),
        "uint32" => (0.into(), u32::MAX.into()),
        "uint64" => (0.into(), u64::MAX.into()),
        "float" => {
            let edge = 2f64.powi(128);
            (float(-edge)?, float(edge - 1.0)?)
        }
        "double" => (float(-f64::MAX)?, float(f64::MAX)?),
        _ => return None,
    };
    Some((min, max))
}

fn float(value: f64) -> Option<Value> {
    Number::from_f64(value).map(Value::Number)
}

/// Inject or clamp `minimum`/`maximum` on an integer/number schema with a known format.
///
/// Returns `true` when anything changed.
pub(crate) fn apply_format_bounds(schema: &mut Map<String, Value>) -> bool {
    let Some((min, max)) = schema
        .get("format")
        .and_then(Value::as_str)
        .and_then(format_bounds)
    else {
        return false;
    };

    let mut changed = false;
    let floor = min.as_f64().unwrap_or(f64::MIN);
    let ceiling = max.as_f64().unwrap_or(f64::MAX);

    let below = schema
        .get("minimum")
        .and_then(Value::as_f64)
        .is_none_or(|current| current < floor);
    if below {
        schema.insert("minimum".into(), min);
        changed = true;
    }

    let above = schema
        .get("maximum")
        .and_then(Value::as_f64)
        .is_none_or(|current| current > ceiling);
    if above {
        schema.insert("maximum".into(), max);
        changed = true;
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bounded(schema: Value) -> Value {
        let Value::Object(mut map) = schema else {
            unreachable!()
        };
        apply_format_bounds(&mut map);
        Value::Object(map)
    }

    #[test]
    fn injects_missing_bounds() {
        assert_eq!(
            bounded(json!({"type": "integer", "format": "int8"})),
            json!({"type": "integer", "format": "int8", "minimum": -128, "maximum": 127})
        );
        assert_eq!(
            bounded(json!({"type": "integer", "format": "uint64"}))["maximum"],
            json!(u64::MAX)
        );
    }

    #[test]
    fn clamps_out_of_range_bounds() {
        let out = bounded(json!({
            "type": "integer", "format": "int16", "minimum": -1e90, "maximum": 65534
        }));
        assert_eq!(out["minimum"], json!(-32768));
        assert_eq!(out["maximum"], json!(32767));
    }

    #[test]
    fn leaves_in_range_bounds_alone() {
        for format in ["int8", "int32", "int64", "uint8", "uint32", "float", "double"] {
            let out = bounded(json!({
                "type": "number",
                "format": format,
                "minimum": 0,
                "maximum": 100
            }));
            assert_eq!(out["minimum"], json!(0), "{format}");
            assert_eq!(out["maximum"], json!(100), "{format}");
        }
    }

    #[test]
    fn unknown_formats_are_ignored() {
        assert!(format_bounds("uuid").is_none());
        assert_eq!(
            bounded(json!({"type": "string", "format": "date"})),
            json!({"type": "string", "format": "date"})
        );
    }
}
