//! Request parameters and their resolution against a descriptor.

use std::collections::HashMap;

use crate::registry::ApiDescriptor;

/// Raw name/value pairs from a request, in the order they arrived.
///
/// Repeated names keep every pair; lookups return the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestArguments {
    pairs: Vec<(String, String)>,
}

impl RequestArguments {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First value supplied for `name`. A bare key (`?dry_run`) yields `Some("")`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Value for `name` if it is present and not blank.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Echo form used in response envelopes (first value per name).
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (key, value) in &self.pairs {
            map.entry(key.clone())
                .or_insert_with(|| serde_json::Value::String(value.clone()));
        }
        serde_json::Value::Object(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestArguments {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The values a request supplies for one descriptor's declared arguments.
///
/// Arguments the request does not mention are absent, never empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedArguments {
    values: HashMap<String, String>,
}

impl ResolvedArguments {
    /// Pick out the descriptor's arguments from the request.
    pub fn resolve(descriptor: &ApiDescriptor, request: &RequestArguments) -> Self {
        let values = descriptor
            .arguments
            .iter()
            .filter_map(|spec| {
                request
                    .get(spec.name)
                    .map(|value| (spec.name.to_string(), value.to_string()))
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ResolvedArguments {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ApiRegistry;

    #[test]
    fn test_first_value_wins() {
        let args: RequestArguments = [("dag_id", "a"), ("dag_id", "b")].into_iter().collect();
        assert_eq!(args.get("dag_id"), Some("a"));
        assert_eq!(args.to_json()["dag_id"], "a");
    }

    #[test]
    fn test_bare_key_is_present_but_not_non_empty() {
        let args: RequestArguments = [("dry_run", "")].into_iter().collect();
        assert!(args.contains("dry_run"));
        assert_eq!(args.non_empty("dry_run"), None);
    }

    #[test]
    fn test_resolve_keeps_only_declared_arguments() {
        let registry = ApiRegistry::builtin();
        let list_tasks = registry.lookup("list_tasks").unwrap();
        let request: RequestArguments = [
            ("api", "list_tasks"),
            ("dag_id", "sample_dag"),
            ("tree", ""),
            ("unrelated", "x"),
        ]
        .into_iter()
        .collect();

        let resolved = ResolvedArguments::resolve(list_tasks, &request);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.get("dag_id"), Some("sample_dag"));
        assert_eq!(resolved.get("tree"), Some(""));
        assert!(!resolved.contains("subdir"));
        assert!(!resolved.contains("api"));
    }
}
