// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process registry of discovered unit classes.
//!
//! A `MiddlewareRegistry` is rebuilt wholesale by every discovery pass and
//! never patched afterwards. Holders of an older registry keep seeing the
//! units they were handed until they ask the host for the current one.

use tracing::{debug, warn};

use crate::unit::UnitClass;

/// What happened to a class passed to [`MiddlewareRegistry::register`].
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterOutcome {
    /// The identifier was new.
    Added,
    /// A class with the same identifier was dropped in favour of the new one.
    Replaced(UnitClass),
    /// The class holds the reserved base identifier and was not registered.
    SkippedBase,
}

/// Ordered collection of unit classes with unique identifiers.
#[derive(Debug, Clone, Default)]
pub struct MiddlewareRegistry {
    units: Vec<UnitClass>,
}

impl MiddlewareRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self { units: Vec::new() }
    }

    /// Registers a unit class.
    ///
    /// The base unit is never registered. A duplicate identifier replaces the
    /// earlier class, and the new class takes the later position.
    pub fn register(&mut self, class: UnitClass) -> RegisterOutcome {
        if class.is_base() {
            debug!(module = %class.module.path, "skipping base middleware");
            return RegisterOutcome::SkippedBase;
        }

        match self.units.iter().position(|u| u.uid() == class.uid()) {
            Some(index) => {
                let previous = self.units.remove(index);
                warn!(
                    uid = %class.uid(),
                    previous_module = %previous.module.path,
                    module = %class.module.path,
                    "duplicate middleware uid, last discovered wins"
                );
                self.units.push(class);
                RegisterOutcome::Replaced(previous)
            }
            None => {
                self.units.push(class);
                RegisterOutcome::Added
            }
        }
    }

    /// Looks up a unit class by identifier.
    pub fn get(&self, uid: &str) -> Option<&UnitClass> {
        self.units.iter().find(|u| u.uid() == uid)
    }

    /// Unit classes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitClass> {
        self.units.iter()
    }

    /// Identifiers in registration order.
    pub fn uids(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.uid()).collect()
    }

    /// Returns the number of registered units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if no units are registered.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl FromIterator<UnitClass> for MiddlewareRegistry {
    fn from_iter<I: IntoIterator<Item = UnitClass>>(iter: I) -> Self {
        let mut registry = MiddlewareRegistry::new();
        for class in iter {
            registry.register(class);
        }
        registry
    }
}
