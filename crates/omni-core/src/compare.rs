//! Semantic YAML comparison

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{CoreError, Result};

/// Whether two YAML streams hold the same documents
///
/// Key order, quoting style and whitespace are ignored. Null documents (for
/// example a trailing `---`) do not count.
pub fn yaml_equivalent(a: &str, b: &str) -> Result<bool> {
    Ok(documents(a)? == documents(b)?)
}

fn documents(stream: &str) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(stream).enumerate() {
        let value = Value::deserialize(document)
            .map_err(|e| CoreError::parse(format!("document {}", index), e))?;
        if !value.is_null() {
            values.push(value);
        }
    }
    Ok(values)
}
