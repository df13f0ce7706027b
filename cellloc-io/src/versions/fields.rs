use serde_json::Value;

use super::ConvertError;

/// 取出对象中的必需字段；非对象或缺失都视为格式不匹配。
pub(crate) fn field<'a>(value: &'a Value, key: &str) -> Result<&'a Value, ConvertError> {
    value
        .as_object()
        .and_then(|object| object.get(key))
        .ok_or_else(|| ConvertError::mismatch(key))
}

/// 可选字段：缺失或 `null` 返回 `None`。宿主必须是对象。
pub(crate) fn optional<'a>(value: &'a Value, key: &str) -> Result<Option<&'a Value>, ConvertError> {
    let object = value.as_object().ok_or_else(|| ConvertError::mismatch(key))?;
    Ok(object.get(key).filter(|inner| !inner.is_null()))
}

pub(crate) fn number(value: &Value, key: &str) -> Result<f64, ConvertError> {
    field(value, key)?
        .as_f64()
        .ok_or_else(|| ConvertError::mismatch(key))
}

pub(crate) fn integer(value: &Value, key: &str) -> Result<i64, ConvertError> {
    let raw = field(value, key)?;
    if let Some(int) = raw.as_i64() {
        return Ok(int);
    }
    match raw.as_f64() {
        Some(float) if float.fract() == 0.0 => Ok(float as i64),
        _ => Err(ConvertError::mismatch(key)),
    }
}

pub(crate) fn index(value: &Value, key: &str) -> Result<usize, ConvertError> {
    usize::try_from(integer(value, key)?).map_err(|_| ConvertError::mismatch(key))
}

pub(crate) fn string<'a>(value: &'a Value, key: &str) -> Result<&'a str, ConvertError> {
    field(value, key)?
        .as_str()
        .ok_or_else(|| ConvertError::mismatch(key))
}

pub(crate) fn array<'a>(value: &'a Value, key: &str) -> Result<&'a [Value], ConvertError> {
    field(value, key)?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ConvertError::mismatch(key))
}

/// 定长数值数组，例如位置（3）或姿态矩阵（16）。
pub(crate) fn floats<const N: usize>(value: &Value, key: &str) -> Result<[f64; N], ConvertError> {
    let items = array(value, key)?;
    if items.len() != N {
        return Err(ConvertError::mismatch(key));
    }
    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f64().ok_or_else(|| ConvertError::mismatch(key))?;
    }
    Ok(out)
}

/// 旧格式的 0/1 或布尔标志。
pub(crate) fn truthy(value: &Value, key: &str) -> Result<bool, ConvertError> {
    match field(value, key)? {
        Value::Bool(flag) => Ok(*flag),
        Value::Number(number) => Ok(number.as_f64().is_some_and(|n| n != 0.0)),
        Value::String(text) => Ok(!text.is_empty()),
        Value::Null => Ok(false),
        _ => Err(ConvertError::mismatch(key)),
    }
}

/// 读取枚举字符串。字段缺失属于格式不匹配，取值未知则是致命错误。
pub(crate) fn enumeration<T>(
    value: &Value,
    key: &str,
    kind: &'static str,
    parse: fn(&str) -> Option<T>,
) -> Result<T, ConvertError> {
    let raw = string(value, key)?;
    parse(raw).ok_or_else(|| ConvertError::InvalidValue {
        kind,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_and_mistyped_fields_are_mismatches() {
        let data = json!({"a": "text", "b": [1, 2], "n": 3});
        assert!(field(&data, "z").unwrap_err().is_schema_mismatch());
        assert!(number(&data, "a").unwrap_err().is_schema_mismatch());
        assert!(floats::<3>(&data, "b").unwrap_err().is_schema_mismatch());
        assert!(field(&json!([1, 2]), "a").unwrap_err().is_schema_mismatch());
        assert_eq!(integer(&data, "n").unwrap(), 3);
    }

    #[test]
    fn integer_accepts_whole_floats_only() {
        let data = json!({"a": 2.0, "b": 2.5, "c": -1});
        assert_eq!(integer(&data, "a").unwrap(), 2);
        assert!(integer(&data, "b").is_err());
        assert!(index(&data, "c").is_err());
    }

    #[test]
    fn truthy_follows_legacy_flags() {
        let data = json!({"one": 1, "zero": 0, "yes": true, "null": null});
        assert!(truthy(&data, "one").unwrap());
        assert!(!truthy(&data, "zero").unwrap());
        assert!(truthy(&data, "yes").unwrap());
        assert!(!truthy(&data, "null").unwrap());
    }

    #[test]
    fn optional_treats_null_as_absent() {
        let data = json!({"structure": null});
        assert!(optional(&data, "structure").unwrap().is_none());
        assert!(optional(&data, "other").unwrap().is_none());
    }

    #[test]
    fn unknown_enum_value_is_not_a_mismatch() {
        let data = json!({"view": "Oblique"});
        let err = enumeration(&data, "view", "reference view", |s| {
            (s == "Axial").then_some(())
        })
        .unwrap_err();
        assert!(!err.is_schema_mismatch());
    }
}
