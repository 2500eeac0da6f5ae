//! Untyped application options and their coercion rules.
//!
//! Options arrive from flags, environment and config files as loosely typed
//! values. Lookups never fail: an absent key, or a value that cannot be
//! coerced, yields the zero value of the requested type.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

pub const FLAG_HOME: &str = "home";
pub const FLAG_APP_DB_BACKEND: &str = "app-db-backend";
pub const FLAG_INTER_BLOCK_CACHE: &str = "inter-block-cache";
pub const FLAG_UNSAFE_SKIP_UPGRADES: &str = "unsafe-skip-upgrades";
pub const FLAG_PRUNING: &str = "pruning";
pub const FLAG_PRUNING_KEEP_RECENT: &str = "pruning-keep-recent";
pub const FLAG_PRUNING_INTERVAL: &str = "pruning-interval";
pub const FLAG_MIN_GAS_PRICES: &str = "minimum-gas-prices";
pub const FLAG_HALT_HEIGHT: &str = "halt-height";
pub const FLAG_HALT_TIME: &str = "halt-time";
pub const FLAG_MIN_RETAIN_BLOCKS: &str = "min-retain-blocks";
pub const FLAG_TRACE: &str = "trace";
pub const FLAG_INDEX_EVENTS: &str = "index-events";
pub const FLAG_SNAPSHOT_INTERVAL: &str = "state-sync.snapshot-interval";
pub const FLAG_SNAPSHOT_KEEP_RECENT: &str = "state-sync.snapshot-keep-recent";

/// A key-value source of application options.
pub trait AppOptions {
    fn get(&self, key: &str) -> Option<Value>;
}

impl AppOptions for HashMap<String, Value> {
    fn get(&self, key: &str) -> Option<Value> {
        HashMap::get(self, key).cloned()
    }
}

impl AppOptions for BTreeMap<String, Value> {
    fn get(&self, key: &str) -> Option<Value> {
        BTreeMap::get(self, key).cloned()
    }
}

impl<T: AppOptions + ?Sized> AppOptions for &T {
    fn get(&self, key: &str) -> Option<Value> {
        (**self).get(key)
    }
}

/// In-memory options with a fluent setter.
///
/// # Example
///
/// ```rust
/// use appwire::{AppOptionsExt, MapOptions};
///
/// let opts = MapOptions::new()
///     .set("pruning", "nothing")
///     .set("halt-height", 100);
///
/// assert_eq!(opts.get_string("pruning"), "nothing");
/// assert_eq!(opts.get_u64("halt-height"), 100);
/// assert_eq!(opts.get_u64("min-retain-blocks"), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapOptions {
    values: BTreeMap<String, Value>,
}

impl MapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }
}

impl AppOptions for MapOptions {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
}

/// Typed accessors over any options source.
pub trait AppOptionsExt: AppOptions {
    fn get_string(&self, key: &str) -> String {
        self.get(key).map(|v| cast::to_string(&v)).unwrap_or_default()
    }

    fn get_bool(&self, key: &str) -> bool {
        self.get(key).map(|v| cast::to_bool(&v)).unwrap_or_default()
    }

    fn get_u64(&self, key: &str) -> u64 {
        self.get(key).map(|v| cast::to_u64(&v)).unwrap_or_default()
    }

    fn get_u32(&self, key: &str) -> u32 {
        self.get(key).map(|v| cast::to_u32(&v)).unwrap_or_default()
    }

    fn get_int_list(&self, key: &str) -> Vec<i64> {
        self.get(key).map(|v| cast::to_int_list(&v)).unwrap_or_default()
    }

    fn get_string_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| cast::to_string_list(&v))
            .unwrap_or_default()
    }
}

impl<T: AppOptions + ?Sized> AppOptionsExt for T {}

/// Lenient value coercion.
pub mod cast {
    use serde_json::Value;

    pub fn to_string(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => String::new(),
        }
    }

    pub fn to_bool(value: &Value) -> bool {
        match value {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            Value::String(s) => matches!(s.trim(), "1" | "t" | "T" | "true" | "TRUE" | "True"),
            _ => false,
        }
    }

    /// Negative, fractional-negative and unparsable values coerce to 0.
    pub fn to_u64(value: &Value) -> u64 {
        match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .unwrap_or(0),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            Value::Bool(b) => u64::from(*b),
            _ => 0,
        }
    }

    pub fn to_u32(value: &Value) -> u32 {
        u32::try_from(to_u64(value)).unwrap_or(0)
    }

    pub fn to_i64(value: &Value) -> i64 {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            Value::Bool(b) => i64::from(*b),
            _ => 0,
        }
    }

    /// Arrays coerce element-wise; a string is split on whitespace and commas.
    pub fn to_int_list(value: &Value) -> Vec<i64> {
        match value {
            Value::Array(items) => items.iter().map(to_i64).collect(),
            Value::String(s) => s
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|part| !part.is_empty())
                .map(|part| part.parse().unwrap_or(0))
                .collect(),
            Value::Number(_) => vec![to_i64(value)],
            _ => Vec::new(),
        }
    }

    /// Arrays coerce element-wise; a string is split on whitespace.
    pub fn to_string_list(value: &Value) -> Vec<String> {
        match value {
            Value::Array(items) => items.iter().map(to_string).collect(),
            Value::String(s) => s.split_whitespace().map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_keys_are_zero() {
        let opts = MapOptions::new();
        assert_eq!(opts.get_string(FLAG_PRUNING), "");
        assert!(!opts.get_bool(FLAG_TRACE));
        assert_eq!(opts.get_u64(FLAG_HALT_HEIGHT), 0);
        assert_eq!(opts.get_u32(FLAG_SNAPSHOT_KEEP_RECENT), 0);
        assert!(opts.get_int_list(FLAG_UNSAFE_SKIP_UPGRADES).is_empty());
        assert!(opts.get_string_list(FLAG_INDEX_EVENTS).is_empty());
    }

    #[test]
    fn test_string_coercion() {
        assert_eq!(cast::to_string(&json!(42)), "42");
        assert_eq!(cast::to_string(&json!(true)), "true");
        assert_eq!(cast::to_string(&json!(null)), "");
    }

    #[test]
    fn test_bool_coercion() {
        assert!(cast::to_bool(&json!("true")));
        assert!(cast::to_bool(&json!("1")));
        assert!(cast::to_bool(&json!(1)));
        assert!(!cast::to_bool(&json!("yes")));
        assert!(!cast::to_bool(&json!(0)));
    }

    #[test]
    fn test_unsigned_coercion() {
        assert_eq!(cast::to_u64(&json!("1500")), 1500);
        assert_eq!(cast::to_u64(&json!(-3)), 0);
        assert_eq!(cast::to_u64(&json!(7.9)), 7);
        assert_eq!(cast::to_u64(&json!("abc")), 0);
        assert_eq!(cast::to_u32(&json!(u64::MAX)), 0);
    }

    #[test]
    fn test_list_coercion() {
        assert_eq!(cast::to_int_list(&json!([10, "20", 30])), vec![10, 20, 30]);
        assert_eq!(cast::to_int_list(&json!("5 6,7")), vec![5, 6, 7]);
        assert_eq!(
            cast::to_string_list(&json!("message.sender  tx.height")),
            vec!["message.sender", "tx.height"]
        );
        assert_eq!(cast::to_string_list(&json!(["a", 1])), vec!["a", "1"]);
    }

    #[test]
    fn test_hash_map_source() {
        let mut opts: HashMap<String, Value> = HashMap::new();
        opts.insert(FLAG_MIN_GAS_PRICES.to_string(), json!("0stake"));
        assert_eq!(opts.get_string(FLAG_MIN_GAS_PRICES), "0stake");
    }
}
