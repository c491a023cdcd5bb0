//! Pre-seal provider storage.
//!
//! Two independent namespaces: at most one unnamed provider per output type,
//! at most one provider per name. A type may have both an unnamed provider
//! and any number of named ones.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ArborError, ProviderSlot, Result};
use crate::key::TypeKey;
use crate::provider::ProviderRecord;

/// Stores all provider records until the container seals.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    providers: HashMap<TypeKey, ProviderRecord>,
    named: HashMap<String, ProviderRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record into its namespace.
    ///
    /// # Errors
    /// [`ArborError::DuplicateProvider`] if the type slot or name is taken.
    pub fn register(&mut self, record: ProviderRecord) -> Result<()> {
        match record.name.clone() {
            Some(name) => {
                if self.named.contains_key(&name) {
                    return Err(ArborError::DuplicateProvider(ProviderSlot::Name(name)));
                }
                debug!(name = %name, key = %record.key, lifetime = %record.lifetime, "registered named provider");
                self.named.insert(name, record);
            }
            None => {
                if self.providers.contains_key(&record.key) {
                    return Err(ArborError::DuplicateProvider(ProviderSlot::Type(record.key)));
                }
                debug!(key = %record.key, lifetime = %record.lifetime, "registered provider");
                self.providers.insert(record.key, record);
            }
        }
        Ok(())
    }

    /// Looks up the unnamed provider for a type.
    pub fn get(&self, key: &TypeKey) -> Option<&ProviderRecord> {
        self.providers.get(key)
    }

    /// Looks up a named provider.
    pub fn get_named(&self, name: &str) -> Option<&ProviderRecord> {
        self.named.get(name)
    }

    /// All unnamed providers, for the build pass.
    pub fn providers(&self) -> &HashMap<TypeKey, ProviderRecord> {
        &self.providers
    }

    /// All named providers, for build-time validation.
    pub fn named_providers(&self) -> impl Iterator<Item = (&str, &ProviderRecord)> {
        self.named.iter().map(|(name, record)| (name.as_str(), record))
    }

    /// Total number of registered providers, unnamed plus named.
    pub fn len(&self) -> usize {
        self.providers.len() + self.named.len()
    }
}
