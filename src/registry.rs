// Copyright (C) 2024 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

use crate::legacy::{LegacyCheck, LegacyCheckInfo};
use crate::plugin::{CheckDefinition, CheckPlugin, Plugin};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("check {0} is already registered")]
    Duplicate(String),
}

/// Catalog of all known checks, built once at startup and passed around.
#[derive(Default)]
pub struct Registry {
    definitions: BTreeMap<String, Box<dyn CheckDefinition>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All checks shipped with this crate.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        crate::checks::register_all(&mut registry)?;
        Ok(registry)
    }

    pub fn register(&mut self, definition: Box<dyn CheckDefinition>) -> Result<(), RegistryError> {
        let name = definition.name().to_string();
        if self.definitions.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        log::trace!("registered check {name}");
        self.definitions.insert(name, definition);
        Ok(())
    }

    pub fn register_plugin<P: CheckPlugin>(&mut self, plugin: P) -> Result<(), RegistryError> {
        self.register(Box::new(Plugin::new(plugin)))
    }

    pub fn register_legacy(&mut self, info: LegacyCheckInfo) -> Result<(), RegistryError> {
        self.register(Box::new(LegacyCheck::new(info)))
    }

    pub fn get(&self, name: &str) -> Option<&dyn CheckDefinition> {
        self.definitions.get(name).map(AsRef::as_ref)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &dyn CheckDefinition> {
        self.definitions.values().map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec![
                "akcp_drycontact",
                "akcp_humidity",
                "akcp_temp",
                "decitemp",
                "eltek_fans",
                "if_octets",
                "legacy_psu"
            ]
        );
        assert!(registry.get("decitemp").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_duplicate() {
        let mut registry = Registry::new();
        crate::checks::register_all(&mut registry).unwrap();
        assert_eq!(
            crate::checks::register_all(&mut registry),
            Err(RegistryError::Duplicate("decitemp".to_string()))
        );
    }
}
