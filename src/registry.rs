//! Versioned module registry.
//!
//! Registered modules live in a pretty-printed JSON file tracked inside the
//! vault repository itself; every mutation is committed (`+name` / `-name`),
//! so the registry carries its own audit trail independent of the snapshot
//! history.

use crate::{Result, VaultError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File at the repository root holding the registry.
pub const REGISTRY_FILE: &str = ".modules";

/// One registered backup module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub name: String,
    pub script: PathBuf,
    /// Free-form attributes (group, description, ...), kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ModuleConfig {
    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(VaultError::Config {
                reason: "module name is required".to_string(),
            });
        }
        if self.script.as_os_str().is_empty() {
            return Err(VaultError::Config {
                reason: format!("module {}: script is required", self.name),
            });
        }
        Ok(())
    }
}

/// In-memory view of the registry file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Registry {
    modules: BTreeMap<String, ModuleConfig>,
}

impl Registry {
    /// Load the registry from a repository root; a missing file means an
    /// empty registry.
    pub fn load(repo_root: &Path) -> Result<Self> {
        let path = repo_root.join(REGISTRY_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let modules: BTreeMap<String, ModuleConfig> = serde_json::from_str(content)?;
        Ok(Self { modules })
    }

    pub fn to_json(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&self.modules)?;
        out.push('\n');
        Ok(out)
    }

    pub fn modules(&self) -> &BTreeMap<String, ModuleConfig> {
        &self.modules
    }

    pub fn get(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Add a module; fails on missing fields or a duplicate name.
    pub fn insert(&mut self, config: ModuleConfig) -> Result<()> {
        config.validate()?;
        if self.modules.contains_key(&config.name) {
            return Err(VaultError::Config {
                reason: format!("module {} is already registered", config.name),
            });
        }
        self.modules.insert(config.name.clone(), config);
        Ok(())
    }

    /// Remove a module by name; fails when the name is not registered.
    pub fn remove(&mut self, name: &str) -> Result<ModuleConfig> {
        self.modules.remove(name).ok_or_else(|| VaultError::Config {
            reason: format!("module {} is not registered", name),
        })
    }

    /// Persist the registry to the repository root.
    pub fn save(&self, repo_root: &Path) -> Result<()> {
        fs::write(repo_root.join(REGISTRY_FILE), self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config(name: &str) -> ModuleConfig {
        ModuleConfig {
            name: name.to_string(),
            script: PathBuf::from(format!("/usr/share/{}/hook", name)),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn test_json_round_trip_keeps_extra_fields() -> Result<()> {
        let mut registry = Registry::default();
        let mut contacts = config("contacts");
        contacts
            .extra
            .insert("group".to_string(), "pim".to_string());
        registry.insert(contacts)?;
        registry.insert(config("gallery"))?;

        let json = registry.to_json()?;
        let loaded = Registry::from_json(&json)?;
        assert_eq!(loaded, registry);
        assert_eq!(
            loaded.get("contacts").and_then(|m| m.extra.get("group")),
            Some(&"pim".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_insert_rejects_missing_fields() {
        let mut registry = Registry::default();

        let nameless = ModuleConfig {
            name: String::new(),
            script: PathBuf::from("/bin/hook"),
            extra: BTreeMap::new(),
        };
        assert!(matches!(
            registry.insert(nameless),
            Err(VaultError::Config { .. })
        ));

        let scriptless = ModuleConfig {
            name: "contacts".to_string(),
            script: PathBuf::new(),
            extra: BTreeMap::new(),
        };
        assert!(matches!(
            registry.insert(scriptless),
            Err(VaultError::Config { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_insert_rejects_duplicate_name() -> Result<()> {
        let mut registry = Registry::default();
        registry.insert(config("contacts"))?;
        assert!(matches!(
            registry.insert(config("contacts")),
            Err(VaultError::Config { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_remove_unknown_module_fails() {
        let mut registry = Registry::default();
        assert!(matches!(
            registry.remove("ghost"),
            Err(VaultError::Config { .. })
        ));
    }

    #[test]
    fn test_load_missing_file_is_empty() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let registry = Registry::load(dir.path())?;
        assert!(registry.is_empty());
        Ok(())
    }
}
