//! # CSV Event Handler
//!
//! ClusterServiceVersions are created by OLM, not by the operator, so they
//! carry no owner reference to route events back to an Addon. The OLM phase
//! registers the CSV each Addon currently depends on here, and the CSV watch
//! resolves events through this reverse index.

use crate::crd::Addon;
use kube::runtime::reflector::ObjectRef;
use kube::{Resource, ResourceExt};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

/// Namespaced name of a ClusterServiceVersion
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsvKey {
    pub namespace: String,
    pub name: String,
}

impl CsvKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Default)]
struct CsvIndex {
    by_addon: HashMap<ObjectRef<Addon>, BTreeSet<CsvKey>>,
    by_csv: HashMap<CsvKey, HashSet<ObjectRef<Addon>>>,
}

#[derive(Debug, Default)]
pub struct CsvEventHandler {
    index: Mutex<CsvIndex>,
}

impl CsvEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the CSVs associated with `addon`; returns whether the set changed
    pub fn replace_map(
        &self,
        addon: &ObjectRef<Addon>,
        keys: impl IntoIterator<Item = CsvKey>,
    ) -> bool {
        let keys: BTreeSet<CsvKey> = keys.into_iter().collect();
        let mut index = self.index.lock().unwrap_or_else(PoisonError::into_inner);

        if index.by_addon.get(addon) == Some(&keys) {
            return false;
        }

        index.unlink(addon);
        for key in &keys {
            index
                .by_csv
                .entry(key.clone())
                .or_default()
                .insert(addon.clone());
        }
        if !keys.is_empty() {
            index.by_addon.insert(addon.clone(), keys);
        }
        true
    }

    /// Forget every CSV associated with `addon`
    pub fn free(&self, addon: &ObjectRef<Addon>) {
        self.index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unlink(addon);
    }

    /// Addons that registered the CSV `key`
    pub fn map_to_addons(&self, key: &CsvKey) -> Vec<ObjectRef<Addon>> {
        let index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        index
            .by_csv
            .get(key)
            .map(|addons| addons.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Watch mapper: resolve a CSV event to the Addons that depend on it
    pub fn map_csv<K: Resource>(&self, csv: &K) -> Vec<ObjectRef<Addon>> {
        let Some(namespace) = csv.namespace() else {
            return Vec::new();
        };
        self.map_to_addons(&CsvKey::new(namespace, csv.name_any()))
    }

    /// Number of CSVs currently tracked
    pub fn tracked_csvs(&self) -> usize {
        self.index
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_csv
            .len()
    }
}

impl CsvIndex {
    fn unlink(&mut self, addon: &ObjectRef<Addon>) {
        let Some(keys) = self.by_addon.remove(addon) else {
            return;
        };
        for key in keys {
            if let Some(addons) = self.by_csv.get_mut(&key) {
                addons.remove(addon);
                if addons.is_empty() {
                    self.by_csv.remove(&key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::{ApiResource, DynamicObject};

    fn addon(name: &str) -> ObjectRef<Addon> {
        ObjectRef::new(name)
    }

    #[test]
    fn test_replace_map_reports_changes() {
        let handler = CsvEventHandler::new();
        let key = CsvKey::new("ns", "op.v1");

        assert!(handler.replace_map(&addon("a"), [key.clone()]));
        assert!(!handler.replace_map(&addon("a"), [key.clone()]));
        assert!(handler.replace_map(&addon("a"), [CsvKey::new("ns", "op.v2")]));

        assert!(handler.map_to_addons(&key).is_empty());
        assert_eq!(
            handler.map_to_addons(&CsvKey::new("ns", "op.v2")),
            vec![addon("a")]
        );
    }

    #[test]
    fn test_shared_csv_resolves_to_every_referencing_addon() {
        let handler = CsvEventHandler::new();
        let key = CsvKey::new("ns", "shared.v1");
        handler.replace_map(&addon("a"), [key.clone()]);
        handler.replace_map(&addon("b"), [key.clone()]);

        let mut names: Vec<String> = handler
            .map_to_addons(&key)
            .into_iter()
            .map(|r| r.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);

        handler.free(&addon("a"));
        assert_eq!(handler.map_to_addons(&key), vec![addon("b")]);
    }

    #[test]
    fn test_free_prevents_index_growth() {
        let handler = CsvEventHandler::new();
        handler.replace_map(&addon("a"), [CsvKey::new("ns", "op.v1")]);
        assert_eq!(handler.tracked_csvs(), 1);
        handler.free(&addon("a"));
        assert_eq!(handler.tracked_csvs(), 0);
        handler.free(&addon("a"));
    }

    #[test]
    fn test_map_csv_from_watched_object() {
        let handler = CsvEventHandler::new();
        handler.replace_map(&addon("a"), [CsvKey::new("ns", "op.v1")]);

        let ar = crate::crd::external::cluster_service_version();
        let csv = DynamicObject::new("op.v1", &ar).within("ns");
        assert_eq!(handler.map_csv(&csv), vec![addon("a")]);

        let other = DynamicObject::new("op.v1", &ApiResource::erase::<Addon>(&()));
        assert!(handler.map_csv(&other).is_empty());
    }
}
