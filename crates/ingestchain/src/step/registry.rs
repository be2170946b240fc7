use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use log::debug;

use super::Step;
use crate::error::RegistryError;

type StepFactory = Box<dyn Fn() -> Arc<dyn Step> + Send + Sync>;

struct Entry {
    factory: StepFactory,
    instance: OnceLock<Arc<dyn Step>>,
}

/// Name-to-step table populated once at startup.
///
/// Registration needs `&mut self`, so once the registry is shared behind an
/// `Arc` it is read-only. Instances are built on first lookup and the same
/// handle is returned to every caller afterwards, whichever thread asks first.
#[derive(Default)]
pub struct StepRegistry {
    entries: HashMap<String, Entry>,
    discovered: bool,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a step factory. A later registration under the same name
    /// replaces the earlier one.
    pub fn register<F, S>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: Step + 'static,
    {
        let name = name.into();
        let boxed: StepFactory = Box::new(move || Arc::new(factory()) as Arc<dyn Step>);
        if self
            .entries
            .insert(
                name.clone(),
                Entry {
                    factory: boxed,
                    instance: OnceLock::new(),
                },
            )
            .is_some()
        {
            debug!("Replaced step registration '{}'", name);
        }
        self
    }

    /// Marks discovery as finished. Lookups fail with
    /// [`RegistryError::NotInitialized`] until this has been called.
    pub fn seal(&mut self) -> &mut Self {
        self.discovered = true;
        debug!("Step registry sealed with {} entries", self.entries.len());
        self
    }

    pub fn is_discovered(&self) -> bool {
        self.discovered
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Step>, RegistryError> {
        if !self.discovered {
            return Err(RegistryError::NotInitialized);
        }

        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| RegistryError::UnknownStep(name.to_string()))?;

        Ok(Arc::clone(entry.instance.get_or_init(|| (entry.factory)())))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Fails on the first name that is not registered.
    pub fn ensure_registered<'a, I>(&self, names: I) -> Result<(), RegistryError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if !self.discovered {
            return Err(RegistryError::NotInitialized);
        }
        for name in names {
            if !self.contains(name) {
                return Err(RegistryError::UnknownStep(name.to_string()));
            }
        }
        Ok(())
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

impl std::fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepRegistry")
            .field("steps", &self.names())
            .field("discovered", &self.discovered)
            .finish()
    }
}
