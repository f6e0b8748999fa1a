//! Dot-separated key access over serde-serializable settings.

use serde_json::Value;

use crate::error::ConfigError;

/// Follow `a.b.c` through nested JSON objects.
pub(crate) fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    if key.is_empty() {
        return None;
    }
    key.split('.').try_fold(root, |node, part| node.get(part))
}

/// Render a leaf for display; strings lose their quotes.
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Overwrite an existing leaf, parsing `raw` according to the leaf's current
/// JSON type. Unknown keys are refused rather than created.
pub(crate) fn assign(root: &mut Value, key: &str, raw: &str) -> Result<(), ConfigError> {
    let unknown = || ConfigError::UnknownKey(key.to_string());
    let (parent_key, leaf) = match key.rsplit_once('.') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, key),
    };
    if leaf.is_empty() {
        return Err(unknown());
    }

    let parent = match parent_key {
        Some(p) => p
            .split('.')
            .try_fold(&mut *root, |node, part| node.get_mut(part))
            .ok_or_else(unknown)?,
        None => root,
    };
    let obj = parent.as_object_mut().ok_or_else(unknown)?;
    let existing = obj.get(leaf).ok_or_else(unknown)?;

    let parsed = match existing {
        Value::Bool(_) => raw
            .parse::<bool>()
            .map(Value::Bool)
            .map_err(|_| ConfigError::invalid(key, format!("'{raw}' is not true/false")))?,
        Value::Number(_) => raw
            .parse::<u64>()
            .map(|n| Value::Number(n.into()))
            .map_err(|_| ConfigError::invalid(key, format!("'{raw}' is not a whole number")))?,
        Value::Object(_) | Value::Array(_) => serde_json::from_str(raw)
            .map_err(|e| ConfigError::invalid(key, e.to_string()))?,
        // Strings and unset optionals take the raw text.
        Value::String(_) | Value::Null => Value::String(raw.to_string()),
    };
    obj.insert(leaf.to_string(), parsed);
    Ok(())
}
