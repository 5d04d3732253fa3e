// wright-core/src/application/store.rs
//
// Keyed storage of mart configs. The outer lock guards the key set only;
// each config has its own lock, so unrelated names never contend.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use crate::domain::error::DomainError;
use crate::domain::mart::{JoinPattern, MartConfig, config_key};
use crate::error::WrightError;

type Entry = Arc<RwLock<MartConfig>>;

#[derive(Debug, Default)]
pub struct ConfigStore {
    configs: RwLock<BTreeMap<String, Entry>>,
}

fn poisoned(what: &str) -> WrightError {
    WrightError::InternalError(format!("Config store lock poisoned ({})", what))
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_index(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Entry>>, WrightError> {
        self.configs.read().map_err(|_| poisoned("index"))
    }

    fn write_index(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Entry>>, WrightError> {
        self.configs.write().map_err(|_| poisoned("index"))
    }

    fn entry(&self, name: &str) -> Result<Entry, WrightError> {
        self.read_index()?
            .get(&config_key(name))
            .cloned()
            .ok_or_else(|| DomainError::ConfigNotFound(name.to_string()).into())
    }

    pub fn create(&self, config: MartConfig) -> Result<(), WrightError> {
        let key = config.key();
        let mut index = self.write_index()?;
        if index.contains_key(&key) {
            return Err(DomainError::DuplicateConfig(config.project_name).into());
        }
        info!(config = %key, patterns = config.join_patterns.len(), "Mart config created");
        index.insert(key, Arc::new(RwLock::new(config)));
        Ok(())
    }

    /// Snapshot of the current config.
    pub fn get(&self, name: &str) -> Result<MartConfig, WrightError> {
        let entry = self.entry(name)?;
        let config = entry.read().map_err(|_| poisoned(name))?;
        Ok(config.clone())
    }

    /// Project names in key order.
    pub fn list(&self) -> Result<Vec<String>, WrightError> {
        let index = self.read_index()?;
        let mut names = Vec::with_capacity(index.len());
        for entry in index.values() {
            let config = entry.read().map_err(|_| poisoned("list"))?;
            names.push(config.project_name.clone());
        }
        Ok(names)
    }

    pub fn delete(&self, name: &str) -> Result<MartConfig, WrightError> {
        let entry = self
            .write_index()?
            .remove(&config_key(name))
            .ok_or_else(|| DomainError::ConfigNotFound(name.to_string()))?;
        info!(config = %config_key(name), "Mart config deleted");
        let config = entry.read().map_err(|_| poisoned(name))?;
        Ok(config.clone())
    }

    pub fn add_join_pattern(&self, name: &str, pattern: JoinPattern) -> Result<(), WrightError> {
        let entry = self.entry(name)?;
        let mut config = entry.write().map_err(|_| poisoned(name))?;

        if !pattern.keys_balanced() {
            return Err(DomainError::InvalidPattern {
                config: config.project_name.clone(),
                pattern: pattern.name,
                join_keys: pattern.join_keys.len(),
                fact_keys: pattern.fact_keys.len(),
            }
            .into());
        }
        if config.find_pattern(&pattern.name).is_some() {
            return Err(DomainError::DuplicatePattern {
                config: config.project_name.clone(),
                pattern: pattern.name,
            }
            .into());
        }

        debug!(config = %config.key(), pattern = %pattern.name, "Join pattern added");
        config.join_patterns.push(pattern);
        Ok(())
    }

    pub fn remove_join_pattern(&self, name: &str, pattern: &str) -> Result<JoinPattern, WrightError> {
        let entry = self.entry(name)?;
        let mut config = entry.write().map_err(|_| poisoned(name))?;

        let position = config
            .join_patterns
            .iter()
            .position(|p| p.name == pattern)
            .ok_or_else(|| DomainError::PatternNotFound {
                config: config.project_name.clone(),
                pattern: pattern.to_string(),
            })?;

        debug!(config = %config.key(), pattern, "Join pattern removed");
        Ok(config.join_patterns.remove(position))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::thread;

    fn config(name: &str) -> MartConfig {
        MartConfig::new(name, "gl", "SRC.HIER", "SRC.MAPPING", "SRC.FACT")
    }

    #[test]
    fn test_create_get_list_delete() -> Result<()> {
        let store = ConfigStore::new();
        store.create(config("beta"))?;
        store.create(config("alpha"))?;

        assert_eq!(store.list()?, vec!["alpha", "beta"]);
        assert_eq!(store.get("ALPHA")?.project_name, "alpha");

        let removed = store.delete("beta")?;
        assert_eq!(removed.project_name, "beta");
        assert_eq!(store.list()?, vec!["alpha"]);
        Ok(())
    }

    #[test]
    fn test_duplicate_names_differ_only_by_case() -> Result<()> {
        let store = ConfigStore::new();
        store.create(config("gl_mart"))?;

        let err = store.create(config("GL_MART")).unwrap_err();
        assert!(matches!(
            err,
            WrightError::Domain(DomainError::DuplicateConfig(_))
        ));
        Ok(())
    }

    #[test]
    fn test_missing_config() {
        let store = ConfigStore::new();
        assert!(matches!(
            store.get("nope"),
            Err(WrightError::Domain(DomainError::ConfigNotFound(_)))
        ));
        assert!(store.delete("nope").is_err());
        assert!(store.add_join_pattern("nope", JoinPattern::new("p", ["A"], ["A"])).is_err());
    }

    #[test]
    fn test_join_pattern_lifecycle() -> Result<()> {
        let store = ConfigStore::new();
        store.create(config("gl_mart"))?;

        store.add_join_pattern("gl_mart", JoinPattern::new("by_account", ["A"], ["A"]))?;
        let err = store
            .add_join_pattern("gl_mart", JoinPattern::new("broken", ["A", "B"], ["A"]))
            .unwrap_err();
        assert!(matches!(
            err,
            WrightError::Domain(DomainError::InvalidPattern { join_keys: 2, fact_keys: 1, .. })
        ));
        let err = store
            .add_join_pattern("gl_mart", JoinPattern::new("by_account", ["B"], ["B"]))
            .unwrap_err();
        assert!(matches!(
            err,
            WrightError::Domain(DomainError::DuplicatePattern { .. })
        ));

        assert_eq!(store.get("gl_mart")?.join_patterns.len(), 1);

        let removed = store.remove_join_pattern("gl_mart", "by_account")?;
        assert_eq!(removed.name, "by_account");
        assert!(matches!(
            store.remove_join_pattern("gl_mart", "by_account"),
            Err(WrightError::Domain(DomainError::PatternNotFound { .. }))
        ));
        Ok(())
    }

    #[test]
    fn test_concurrent_pattern_adds_are_serialized() -> Result<()> {
        let store = Arc::new(ConfigStore::new());
        store.create(config("gl_mart"))?;
        store.create(config("other"))?;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let target = if i % 2 == 0 { "gl_mart" } else { "other" };
                    store.add_join_pattern(
                        target,
                        JoinPattern::new(format!("p{}", i), ["A"], ["A"]),
                    )
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap()?;
        }

        assert_eq!(store.get("gl_mart")?.join_patterns.len(), 4);
        assert_eq!(store.get("other")?.join_patterns.len(), 4);
        Ok(())
    }
}
