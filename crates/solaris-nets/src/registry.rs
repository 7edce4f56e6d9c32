//! Name-keyed loss tables.

use std::{collections::HashMap, fmt};

/// A table of losses keyed by canonical lowercase name.
///
/// Names are lowercased on insertion and on lookup, so `"Dice"`, `"DICE"` and
/// `"dice"` all refer to the same entry. Losses that are not built in are
/// added with [`register`](Self::register) before resolution.
#[derive(Clone)]
pub struct LossRegistry<E> {
    entries: HashMap<String, E>,
}

impl<E> LossRegistry<E> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Add or replace the entry for `name`, returning the previous one.
    pub fn register(&mut self, name: impl AsRef<str>, entry: E) -> Option<E> {
        let key = canonical(name.as_ref());
        tracing::debug!(loss = %key, "registering loss");
        self.entries.insert(key, entry)
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, name: impl AsRef<str>, entry: E) -> Self {
        self.register(name, entry);
        self
    }

    /// Remove the entry for `name`.
    pub fn unregister(&mut self, name: &str) -> Option<E> {
        self.entries.remove(&canonical(name))
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&E> {
        self.entries.get(&canonical(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for LossRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for LossRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LossRegistry")
            .field("names", &self.names())
            .finish()
    }
}

fn canonical(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup_ignores_case() {
        let registry = LossRegistry::new().with("Dice", 1);

        assert_eq!(registry.get("dice"), Some(&1));
        assert_eq!(registry.get("DICE"), Some(&1));
        assert!(registry.contains("dIcE"));
        assert!(!registry.contains("focal"));
    }

    #[test]
    fn registry_register_replaces_existing_entry() {
        let mut registry = LossRegistry::new();
        assert_eq!(registry.register("focal", 1), None);
        assert_eq!(registry.register("FOCAL", 2), Some(1));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("focal"), Some(&2));
    }

    #[test]
    fn registry_names_are_sorted() {
        let mut registry = LossRegistry::new().with("mse", ()).with("bce", ()).with("dice", ());
        assert_eq!(registry.names(), vec!["bce", "dice", "mse"]);

        registry.unregister("Dice");
        assert_eq!(registry.names(), vec!["bce", "mse"]);
    }
}
