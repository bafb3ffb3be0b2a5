// Copyright 2026 the Scopekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Persistent settings.
//!
//! Scopes persist a handful of flags and tunables as opaque strings grouped
//! by `"Scope_<name>"`. The storage backend is abstracted by [`ConfigStore`];
//! [`MemoryConfig`] is the in-memory implementation used by tests and
//! embedders without a settings system.

use std::collections::BTreeMap;
use std::str::FromStr;

/// Key for the auto-refresh flag.
pub const KEY_AUTO_REFRESH: &str = "autoRefresh";
/// Key for the realtime flag.
pub const KEY_REALTIME: &str = "realtime";

/// Returns the settings group for the widget called `name`.
#[must_use]
pub fn group_name(name: &str) -> String {
    format!("Scope_{name}")
}

/// Grouped string key-value storage.
pub trait ConfigStore {
    /// Returns the value stored under `group`/`key`, if any.
    fn read(&self, group: &str, key: &str) -> Option<String>;

    /// Stores `value` under `group`/`key`, replacing any previous value.
    fn write(&mut self, group: &str, key: &str, value: String);
}

/// Reads and parses a value, falling back to `default` when it is missing or
/// malformed.
///
/// Malformed values are reported with `log::warn!`.
pub fn read_parsed<T: FromStr>(store: &dyn ConfigStore, group: &str, key: &str, default: T) -> T {
    let Some(raw) = store.read(group, key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            log::warn!("ignoring malformed setting {group}/{key} = {raw:?}");
            default
        }
    }
}

/// In-memory [`ConfigStore`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryConfig {
    entries: BTreeMap<(String, String), String>,
}

impl MemoryConfig {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ConfigStore for MemoryConfig {
    fn read(&self, group: &str, key: &str) -> Option<String> {
        self.entries
            .get(&(group.to_owned(), key.to_owned()))
            .cloned()
    }

    fn write(&mut self, group: &str, key: &str, value: String) {
        self.entries.insert((group.to_owned(), key.to_owned()), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_names_are_prefixed() {
        assert_eq!(group_name("Histogram"), "Scope_Histogram");
    }

    #[test]
    fn read_parsed_falls_back_on_missing_and_malformed() {
        let mut store = MemoryConfig::new();
        assert!(read_parsed(&store, "g", "k", true));

        store.write("g", "k", "false".into());
        assert!(!read_parsed(&store, "g", "k", true));

        store.write("g", "k", "maybe".into());
        assert!(read_parsed(&store, "g", "k", true), "malformed → default");
    }

    #[test]
    fn groups_are_independent() {
        let mut store = MemoryConfig::new();
        store.write("a", "x", "1".into());
        store.write("b", "x", "2".into());
        assert_eq!(store.read("a", "x").as_deref(), Some("1"));
        assert_eq!(store.read("b", "x").as_deref(), Some("2"));
        assert_eq!(store.len(), 2);
    }
}
