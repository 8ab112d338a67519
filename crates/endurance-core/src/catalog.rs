//! Preset catalog: the shipped presets plus user-created ones.
//!
//! Both lists are persisted as JSON under versioned keys in the key-value
//! store. Built-ins may be retuned in place and restored with
//! [`PresetCatalog::reset_to_factory`]; they can never be removed.

use std::collections::HashSet;
use std::rc::Rc;

use uuid::Uuid;

use crate::error::{StoreError, ValidationError};
use crate::storage::KvStore;
use crate::timer::{builtin_presets, Preset};

pub const BUILTIN_KEY: &str = "presets.builtin.v1";
pub const CUSTOM_KEY: &str = "presets.custom.v1";

/// Keys written by earlier catalog layouts. Their contents are not read back.
const LEGACY_KEYS: &[&str] = &[
    "customPresets",
    "defaultPresets",
    "presets.builtin",
    "presets.custom",
];

pub struct PresetCatalog {
    builtins: Vec<Preset>,
    custom: Vec<Preset>,
    store: Rc<dyn KvStore>,
}

impl PresetCatalog {
    /// Load the catalog. Never fails: unreadable data falls back to the
    /// shipped presets and an empty custom list.
    pub fn load(store: Rc<dyn KvStore>) -> Self {
        let mut catalog = Self {
            builtins: builtin_presets(),
            custom: Vec::new(),
            store,
        };

        if catalog.discard_legacy() {
            tracing::info!("discarded presets from an older catalog layout, re-seeding");
            catalog.persist();
            return catalog;
        }

        let stored_builtins = catalog.read_list(BUILTIN_KEY);
        let stored_custom = catalog.read_list(CUSTOM_KEY);
        let mut dirty = false;

        match stored_builtins {
            Some(list) => {
                let (reconciled, changed) = reconcile_builtins(list);
                catalog.builtins = reconciled;
                dirty |= changed;
            }
            None => dirty = true,
        }
        match stored_custom {
            Some(list) => {
                let before = list.len();
                catalog.custom = sanitize_custom(list, &catalog.builtins);
                dirty |= catalog.custom.len() != before;
            }
            None => dirty = true,
        }

        if dirty {
            catalog.persist();
        }
        catalog
    }

    /// Built-ins first in shipped order, then custom presets in insertion order.
    pub fn list(&self) -> Vec<Preset> {
        self.builtins.iter().chain(self.custom.iter()).cloned().collect()
    }

    pub fn builtins(&self) -> &[Preset] {
        &self.builtins
    }

    pub fn custom(&self) -> &[Preset] {
        &self.custom
    }

    pub fn get(&self, id: Uuid) -> Option<&Preset> {
        self.builtins
            .iter()
            .chain(self.custom.iter())
            .find(|p| p.id == id)
    }

    /// The first built-in, used when no configuration has been chosen yet.
    pub fn default_preset(&self) -> Preset {
        self.builtins.first().cloned().unwrap_or_default()
    }

    /// Append a user preset and return its id.
    ///
    /// A nil or already-taken id is replaced with a fresh one.
    ///
    /// # Errors
    /// Returns an error if the preset fails validation.
    pub fn add(&mut self, mut preset: Preset) -> Result<Uuid, ValidationError> {
        preset.validate()?;
        if preset.id.is_nil() || self.get(preset.id).is_some() {
            preset.id = Uuid::new_v4();
        }
        preset.is_default = false;
        let id = preset.id;
        tracing::info!(%id, name = %preset.name, "preset added");
        self.custom.push(preset);
        self.persist();
        Ok(id)
    }

    /// Replace the entry with the same id. Returns `false` (and changes
    /// nothing) for unknown ids or invalid presets.
    pub fn update(&mut self, mut preset: Preset) -> bool {
        if let Err(e) = preset.validate() {
            tracing::warn!(id = %preset.id, error = %e, "ignoring invalid preset update");
            return false;
        }
        if let Some(slot) = self.builtins.iter_mut().find(|p| p.id == preset.id) {
            preset.is_default = true;
            *slot = preset;
        } else if let Some(slot) = self.custom.iter_mut().find(|p| p.id == preset.id) {
            preset.is_default = false;
            *slot = preset;
        } else {
            return false;
        }
        self.persist();
        true
    }

    /// Remove a custom preset. Built-ins are refused.
    pub fn remove(&mut self, id: Uuid) -> bool {
        if self.builtins.iter().any(|p| p.id == id) {
            tracing::warn!(%id, "refusing to remove a built-in preset");
            return false;
        }
        let before = self.custom.len();
        self.custom.retain(|p| p.id != id);
        if self.custom.len() == before {
            return false;
        }
        self.persist();
        true
    }

    /// Restore a built-in to its shipped values. Returns `false` if `id` is
    /// not a built-in.
    pub fn reset_to_factory(&mut self, id: Uuid) -> bool {
        let Some(shipped) = builtin_presets().into_iter().find(|p| p.id == id) else {
            return false;
        };
        let Some(slot) = self.builtins.iter_mut().find(|p| p.id == id) else {
            return false;
        };
        *slot = shipped;
        self.persist();
        true
    }

    fn discard_legacy(&self) -> bool {
        let mut found = false;
        for key in LEGACY_KEYS {
            match self.store.kv_get(key) {
                Ok(Some(_)) => {
                    found = true;
                    if let Err(e) = self.store.kv_remove(key) {
                        tracing::warn!(key, error = %e, "failed to remove legacy preset key");
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(key, error = %e, "failed to read legacy preset key"),
            }
        }
        found
    }

    fn read_list(&self, key: &str) -> Option<Vec<Preset>> {
        let raw = match self.store.kv_get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to read presets");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(list) => Some(list),
            Err(e) => {
                tracing::warn!(key, error = %e, "corrupt preset list, using defaults");
                None
            }
        }
    }

    fn persist(&self) {
        if let Err(e) = self.try_persist() {
            tracing::warn!(error = %e, "failed to persist preset catalog");
        }
    }

    fn try_persist(&self) -> Result<(), StoreError> {
        let encode = |key: &str, list: &[Preset]| {
            serde_json::to_string(list)
                .map(|json| (key.to_string(), json))
                .map_err(|e| StoreError::Corrupt {
                    key: key.to_string(),
                    message: e.to_string(),
                })
        };
        let entries = [
            encode(BUILTIN_KEY, &self.builtins)?,
            encode(CUSTOM_KEY, &self.custom)?,
        ];
        self.store.kv_set_many(&entries)
    }
}

/// Keep stored customisations of shipped presets, in shipped order. Unknown
/// ids are dropped, missing or invalid entries restored from the shipped set.
fn reconcile_builtins(stored: Vec<Preset>) -> (Vec<Preset>, bool) {
    let shipped = builtin_presets();
    let mut changed = stored.len() != shipped.len();
    let reconciled = shipped
        .into_iter()
        .enumerate()
        .map(|(i, factory)| {
            let kept = stored
                .iter()
                .find(|p| p.id == factory.id && p.validate().is_ok())
                .cloned();
            match kept {
                Some(mut preset) => {
                    changed |= stored.get(i).map(|p| p.id) != Some(factory.id);
                    preset.is_default = true;
                    preset
                }
                None => {
                    changed = true;
                    factory
                }
            }
        })
        .collect();
    (reconciled, changed)
}

fn sanitize_custom(stored: Vec<Preset>, builtins: &[Preset]) -> Vec<Preset> {
    let mut seen: HashSet<Uuid> = builtins.iter().map(|p| p.id).collect();
    stored
        .into_iter()
        .filter(|p| p.validate().is_ok() && seen.insert(p.id))
        .map(|mut p| {
            p.is_default = false;
            p
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn catalog() -> (PresetCatalog, Rc<MemoryStore>) {
        let store = Rc::new(MemoryStore::new());
        (PresetCatalog::load(store.clone()), store)
    }

    #[test]
    fn first_run_seeds_builtins() {
        let (catalog, store) = catalog();
        let names: Vec<_> = catalog.list().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["Focus", "Deep Work", "Sprint", "Marathon"]);
        assert!(store.kv_get(BUILTIN_KEY).unwrap().is_some());
        assert_eq!(store.kv_get(CUSTOM_KEY).unwrap().as_deref(), Some("[]"));
        assert_eq!(catalog.default_preset().name, "Focus");
    }

    #[test]
    fn add_assigns_ids_and_persists() {
        let (mut catalog, store) = catalog();
        let first = catalog.add(Preset::new("Reading", 1200, 300, 3)).unwrap();
        assert!(!first.is_nil());

        let mut clash = Preset::new("Clash", 600, 60, 1);
        clash.id = first;
        clash.is_default = true;
        let second = catalog.add(clash).unwrap();
        assert_ne!(first, second);
        assert!(!catalog.get(second).unwrap().is_default);

        let reloaded = PresetCatalog::load(store);
        assert_eq!(reloaded.custom().len(), 2);
        assert_eq!(reloaded.list().last().unwrap().name, "Clash");
    }

    #[test]
    fn add_rejects_invalid() {
        let (mut catalog, _) = catalog();
        assert!(catalog.add(Preset::new("", 600, 60, 1)).is_err());
        assert!(catalog.add(Preset::new("Zero", 0, 60, 1)).is_err());
        assert!(catalog.custom().is_empty());
    }

    #[test]
    fn builtins_can_be_retuned_and_reset() {
        let (mut catalog, store) = catalog();
        let mut focus = catalog.default_preset();
        focus.focus_duration = 30 * 60;
        assert!(catalog.update(focus.clone()));
        assert!(catalog.get(focus.id).unwrap().is_default);

        let reloaded = PresetCatalog::load(store.clone());
        assert_eq!(reloaded.get(focus.id).unwrap().focus_duration, 1800);

        let mut catalog = reloaded;
        assert!(catalog.reset_to_factory(focus.id));
        assert_eq!(catalog.get(focus.id).unwrap().focus_duration, 1500);
        assert!(!catalog.remove(focus.id));
        assert_eq!(catalog.builtins().len(), 4);
    }

    #[test]
    fn update_unknown_is_ignored() {
        let (mut catalog, _) = catalog();
        let before = catalog.list();
        assert!(!catalog.update(Preset::new("Ghost", 600, 60, 1)));
        assert_eq!(catalog.list(), before);
    }

    #[test]
    fn remove_custom() {
        let (mut catalog, _) = catalog();
        let id = catalog.add(Preset::new("Temp", 600, 60, 1)).unwrap();
        assert!(catalog.remove(id));
        assert!(!catalog.remove(id));
        assert!(catalog.get(id).is_none());
    }

    #[test]
    fn legacy_keys_trigger_reseed() {
        let store = Rc::new(MemoryStore::new());
        store.kv_set("customPresets", "[{\"old\":true}]").unwrap();
        store.kv_set(CUSTOM_KEY, "[]").unwrap();
        let catalog = PresetCatalog::load(store.clone());
        assert!(store.kv_get("customPresets").unwrap().is_none());
        assert_eq!(catalog.builtins().len(), 4);
        assert!(catalog.custom().is_empty());
    }

    #[test]
    fn corrupt_lists_fall_back() {
        let store = Rc::new(MemoryStore::new());
        store.kv_set(BUILTIN_KEY, "not json").unwrap();
        store.kv_set(CUSTOM_KEY, "{\"also\": \"wrong\"}").unwrap();
        let catalog = PresetCatalog::load(store);
        assert_eq!(catalog.builtins(), builtin_presets().as_slice());
        assert!(catalog.custom().is_empty());
    }

    #[test]
    fn stored_builtins_are_reconciled() {
        let mut shipped = builtin_presets();
        shipped.reverse();
        shipped[0].break_duration = 7 * 60;
        let marathon_id = shipped[0].id;
        shipped.push(Preset::new("Stray", 600, 60, 1));
        shipped.remove(1);

        let (reconciled, changed) = reconcile_builtins(shipped);
        assert!(changed);
        let names: Vec<_> = reconciled.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Focus", "Deep Work", "Sprint", "Marathon"]);
        let marathon = reconciled.iter().find(|p| p.id == marathon_id).unwrap();
        assert_eq!(marathon.break_duration, 420);
    }

    #[test]
    fn failed_writes_keep_memory_state() {
        let (mut catalog, store) = catalog();
        store.fail_writes(true);
        let id = catalog.add(Preset::new("Offline", 600, 60, 1)).unwrap();
        assert!(catalog.get(id).is_some());
    }
}
