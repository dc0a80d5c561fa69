//! Request parameters
//!
//! ArcGIS operations take flat string parameters. Structured values
//! (geometries, feature arrays, option objects) are sent JSON-encoded.

use crate::error::Result;
use crate::types::JsonObject;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Ordered parameter map sent as a query string, form body or multipart text parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: BTreeMap<String, String>,
}

impl Params {
    /// Create an empty parameter map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter (builder style)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Add an optional parameter (builder style)
    #[must_use]
    pub fn with_opt<V: Into<Value>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.set_opt(key, value);
        self
    }

    /// Set a parameter. Null values remove the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        match to_param_string(&value.into()) {
            Some(v) => {
                self.inner.insert(key, v);
            }
            None => {
                self.inner.remove(&key);
            }
        }
        self
    }

    /// Set a parameter when a value is present
    pub fn set_opt<V: Into<Value>>(&mut self, key: impl Into<String>, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    /// Set a parameter to the JSON encoding of a serializable value
    pub fn set_json<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<&mut Self> {
        let encoded = serde_json::to_string(value)?;
        self.inner.insert(key.into(), encoded);
        Ok(self)
    }

    /// Set a parameter unless it is already present
    pub fn set_default(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.inner
            .entry(key.to_string())
            .or_insert_with(|| value.into());
        self
    }

    /// Merge all keys of a JSON object
    pub fn extend_object(&mut self, object: &JsonObject) -> &mut Self {
        for (key, value) in object {
            self.set(key.clone(), value.clone());
        }
        self
    }

    /// Merge another parameter map, overwriting existing keys
    pub fn merge(&mut self, other: &Params) -> &mut Self {
        for (key, value) in &other.inner {
            self.inner.insert(key.clone(), value.clone());
        }
        self
    }

    /// Get a parameter value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    /// Remove a parameter
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.inner.remove(key)
    }

    /// Check if a parameter is set
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if there are no parameters
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate over key/value pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Borrow as pairs for reqwest query/form encoding
    pub(crate) fn as_pairs(&self) -> Vec<(&str, &str)> {
        self.iter().collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (key, value) in iter {
            params.set(key, value);
        }
        params
    }
}

/// Convert a JSON value to its parameter string form
///
/// Strings are sent verbatim, booleans as `true`/`false`, numbers in their
/// JSON form, arrays and objects JSON-encoded. Null has no representation.
pub fn to_param_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}
