//! `serde`-backed field access.
//!
//! Any type that round-trips through a JSON object can implement
//! [`Accessor`](super::Accessor) by delegating to these two helpers.

use crate::core::{DbError, FieldMap, Result, Value};
use serde::{Serialize, de::DeserializeOwned};

/// Snapshots a serializable entity into a flat field map.
pub fn json_fields<T: Serialize>(entity: &T) -> Result<FieldMap> {
    let json = serde_json::to_value(entity)?;
    let object = json.as_object().ok_or_else(|| {
        DbError::TypeMismatch(format!(
            "{} must serialize to a JSON object",
            std::any::type_name::<T>()
        ))
    })?;

    Ok(object
        .iter()
        .map(|(name, value)| (name.clone(), Value::from_json(value)))
        .collect())
}

/// Writes one field by patching the JSON form and deserializing it back.
///
/// Nested fields accept the JSON text produced by [`json_fields`].
pub fn set_json_field<T>(entity: &mut T, name: &str, value: Value) -> Result<()>
where
    T: Serialize + DeserializeOwned,
{
    let mut json = serde_json::to_value(&*entity)?;
    let type_name = std::any::type_name::<T>();
    let object = json.as_object_mut().ok_or_else(|| {
        DbError::TypeMismatch(format!("{} must serialize to a JSON object", type_name))
    })?;

    let current = object
        .get(name)
        .ok_or_else(|| DbError::ColumnNotFound(name.to_string(), type_name.to_string()))?;

    let replacement = match (current, &value) {
        (serde_json::Value::Array(_) | serde_json::Value::Object(_), Value::Text(text)) => {
            serde_json::from_str(text)?
        }
        _ => value.to_json(),
    };

    object.insert(name.to_string(), replacement);
    *entity = serde_json::from_value(json)?;
    Ok(())
}
