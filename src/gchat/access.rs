//! Who gets auto-responses.
//!
//! Precedence: an explicit disable beats everything, an explicit enable beats
//! the global default, otherwise `gchat_for_all` decides.

use std::collections::BTreeSet;

use tracing::info;

use crate::gchat::store::{self, Store, StoreError};

/// Store collection holding all gchat state.
pub const COLLECTION: &str = "custom.gchat";

const ENABLED_USERS: &str = "enabled_users";
const DISABLED_USERS: &str = "disabled_users";
const GCHAT_FOR_ALL: &str = "gchat_for_all";

/// Per-user and global enablement flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessControl {
    enabled_users: BTreeSet<i64>,
    disabled_users: BTreeSet<i64>,
    gchat_for_all: bool,
}

impl AccessControl {
    /// Load flags from the store, defaulting anything absent.
    pub fn load(store: &dyn Store) -> Result<Self, StoreError> {
        let access = Self {
            enabled_users: store::load(store, COLLECTION, ENABLED_USERS)?.unwrap_or_default(),
            disabled_users: store::load(store, COLLECTION, DISABLED_USERS)?.unwrap_or_default(),
            gchat_for_all: store::load(store, COLLECTION, GCHAT_FOR_ALL)?.unwrap_or(false),
        };
        info!(
            "gchat access: {} enabled, {} disabled, for_all={}",
            access.enabled_users.len(),
            access.disabled_users.len(),
            access.gchat_for_all
        );
        Ok(access)
    }

    pub fn allows(&self, user_id: i64) -> bool {
        if self.disabled_users.contains(&user_id) {
            return false;
        }
        self.gchat_for_all || self.enabled_users.contains(&user_id)
    }

    /// Move `user_id` from the disabled set to the enabled set and persist.
    pub fn enable(&mut self, store: &dyn Store, user_id: i64) -> Result<(), StoreError> {
        let mut enabled = self.enabled_users.clone();
        let mut disabled = self.disabled_users.clone();
        disabled.remove(&user_id);
        enabled.insert(user_id);
        self.commit(store, enabled, disabled)
    }

    /// Move `user_id` from the enabled set to the disabled set and persist.
    pub fn disable(&mut self, store: &dyn Store, user_id: i64) -> Result<(), StoreError> {
        let mut enabled = self.enabled_users.clone();
        let mut disabled = self.disabled_users.clone();
        enabled.remove(&user_id);
        disabled.insert(user_id);
        self.commit(store, enabled, disabled)
    }

    /// Flip the global default, returning the new value.
    pub fn toggle_all(&mut self, store: &dyn Store) -> Result<bool, StoreError> {
        let next = !self.gchat_for_all;
        store::save(store, COLLECTION, GCHAT_FOR_ALL, &next)?;
        self.gchat_for_all = next;
        Ok(next)
    }

    fn commit(
        &mut self,
        store: &dyn Store,
        enabled: BTreeSet<i64>,
        disabled: BTreeSet<i64>,
    ) -> Result<(), StoreError> {
        if disabled != self.disabled_users {
            store::save(store, COLLECTION, DISABLED_USERS, &disabled)?;
            self.disabled_users = disabled;
        }
        if enabled != self.enabled_users {
            store::save(store, COLLECTION, ENABLED_USERS, &enabled)?;
            self.enabled_users = enabled;
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn enabled_users(&self) -> &BTreeSet<i64> {
        &self.enabled_users
    }

    #[cfg(test)]
    pub fn disabled_users(&self) -> &BTreeSet<i64> {
        &self.disabled_users
    }

    #[cfg(test)]
    pub fn for_all(&self) -> bool {
        self.gchat_for_all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gchat::store::SqliteStore;
    use serde_json::json;

    fn store() -> SqliteStore {
        SqliteStore::in_memory().unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let access = AccessControl::load(&store()).unwrap();
        assert!(!access.for_all());
        assert!(access.enabled_users().is_empty());
        assert!(!access.allows(42));
    }

    #[test]
    fn test_loads_legacy_lists() {
        let s = store();
        s.set(COLLECTION, "enabled_users", json!([1, 2])).unwrap();
        s.set(COLLECTION, "disabled_users", json!([3])).unwrap();
        s.set(COLLECTION, "gchat_for_all", json!(true)).unwrap();

        let access = AccessControl::load(&s).unwrap();
        assert!(access.allows(1));
        assert!(!access.allows(3));
        assert!(access.allows(99));
    }

    #[test]
    fn test_disable_beats_global() {
        let s = store();
        let mut access = AccessControl::load(&s).unwrap();
        access.toggle_all(&s).unwrap();
        access.disable(&s, 7).unwrap();
        assert!(!access.allows(7));
        assert!(access.allows(8));
    }

    #[test]
    fn test_enable_beats_global_off() {
        let s = store();
        let mut access = AccessControl::load(&s).unwrap();
        access.enable(&s, 7).unwrap();
        assert!(!access.for_all());
        assert!(access.allows(7));
        assert!(!access.allows(8));
    }

    #[test]
    fn test_sets_stay_disjoint() {
        let s = store();
        let mut access = AccessControl::load(&s).unwrap();
        access.disable(&s, 5).unwrap();
        access.enable(&s, 5).unwrap();
        assert!(access.enabled_users().contains(&5));
        assert!(!access.disabled_users().contains(&5));

        access.disable(&s, 5).unwrap();
        assert!(!access.enabled_users().contains(&5));
        assert!(access.disabled_users().contains(&5));
    }

    #[test]
    fn test_changes_are_persisted() {
        let s = store();
        let mut access = AccessControl::load(&s).unwrap();
        access.enable(&s, 11).unwrap();
        access.disable(&s, 12).unwrap();
        assert!(access.toggle_all(&s).unwrap());

        let reloaded = AccessControl::load(&s).unwrap();
        assert_eq!(reloaded, access);
    }

    #[test]
    fn test_toggle_all_flips_back() {
        let s = store();
        let mut access = AccessControl::load(&s).unwrap();
        assert!(access.toggle_all(&s).unwrap());
        assert!(!access.toggle_all(&s).unwrap());
        assert_eq!(s.get(COLLECTION, "gchat_for_all").unwrap(), Some(json!(false)));
    }
}
