use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Path-keyed value store
///
/// Lookups never fail: a path that was never reported (or was reported as
/// null) reads back as `None`.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct ValueStore {
    values: HashMap<String, Value>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, value: Value) {
        self.values.insert(path.to_string(), value);
    }

    /// Value at `path`; JSON null is reported as missing
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(path).filter(|v| !v.is_null())
    }

    pub fn get_f64(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(Value::as_f64)
    }

    /// `{latitude, longitude}` object at `path`
    pub fn get_lat_lon(&self, path: &str) -> Option<(f64, f64)> {
        let value = self.get(path)?;
        let lat = value.get("latitude").and_then(Value::as_f64)?;
        let lon = value.get("longitude").and_then(Value::as_f64)?;
        Some((lat, lon))
    }

    /// Loose truthiness: `true`, non-zero numbers, non-empty strings,
    /// arrays and objects
    pub fn is_truthy(&self, path: &str) -> bool {
        match self.get(path) {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
