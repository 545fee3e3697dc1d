// Serialize-then-flatten: any StatRecord becomes a field -> u64 map.

use crate::error::CollectError;
use crate::models::{NormalizedStats, StatRecord};
use serde_json::{Map, Number, Value};

/// Flattens `record` into numeric fields, dropping its identity field.
///
/// Nested objects are joined with `_`; a joined key that collides with another
/// field is an error. Strings, booleans, nulls and arrays are not counters and
/// are skipped. A negative or non-finite number means the
/// record does not fit the counter model, which fails the whole record.
pub fn normalize<R: StatRecord>(record: &R) -> Result<NormalizedStats, CollectError> {
    let device = record.device_name();
    let value = serde_json::to_value(record)
        .map_err(|e| CollectError::normalization(device, e.to_string()))?;
    let Value::Object(mut fields) = value else {
        return Err(CollectError::normalization(
            device,
            "record did not serialize to an object",
        ));
    };
    fields.remove(R::NAME_FIELD);

    let mut stats = NormalizedStats::new();
    flatten(device, None, &fields, &mut stats)?;
    Ok(stats)
}

fn flatten(
    device: &str,
    prefix: Option<&str>,
    fields: &Map<String, Value>,
    out: &mut NormalizedStats,
) -> Result<(), CollectError> {
    for (key, value) in fields {
        let key = match prefix {
            Some(p) => format!("{p}_{key}"),
            None => key.clone(),
        };
        match value {
            Value::Number(n) => {
                let v = as_counter(n).ok_or_else(|| {
                    CollectError::normalization(device, format!("field {key} = {n} is not unsigned"))
                })?;
                if out.contains_key(&key) {
                    return Err(CollectError::normalization(
                        device,
                        format!("field {key} appears twice after flattening"),
                    ));
                }
                out.insert(key, v);
            }
            Value::Object(inner) => flatten(device, Some(&key), inner, out)?,
            _ => {}
        }
    }
    Ok(())
}

fn as_counter(n: &Number) -> Option<u64> {
    if let Some(v) = n.as_u64() {
        return Some(v);
    }
    if let Some(v) = n.as_i64() {
        return u64::try_from(v).ok();
    }
    n.as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f as u64)
}
