// Copyright 2025 the chassis authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Priority-ordered registry of long-lived modules.
//!
//! Modules are singleton-per-type services ordered by descending
//! priority. `update` runs front to back (highest priority first);
//! `shutdown` tears down back to front, so the modules others depend on
//! stay alive longest.

use crate::collections::{NodeId, RecyclableList};
use crate::error::FrameworkError;
use std::any::Any;
use std::time::Duration;

/// A long-lived singleton-per-type service driven by the registry tick.
pub trait Module: Any + Send {
    /// Tick and shutdown ordering; higher runs earlier on update and
    /// later on shutdown.
    fn priority(&self) -> i32 {
        0
    }

    /// Called once, when the module enters the registry.
    fn init(&mut self) {}

    /// Per-frame tick, forwarded by the registry in priority order.
    fn update(&mut self, elapsed: Duration, real_elapsed: Duration);

    /// Teardown, called once by the registry shutdown.
    fn shutdown(&mut self);

    /// Concrete-type access for registry lookups.
    fn as_any(&self) -> &dyn Any;

    /// Mutable concrete-type access for registry lookups.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Holds at most one module per concrete type, ordered by descending
/// priority with insertion-order tie-break.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: RecyclableList<Box<dyn Module>>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of registered modules.
    #[must_use]
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Whether a module of type `M` is registered.
    #[must_use]
    pub fn has_module<M: Module>(&self) -> bool {
        self.position_of::<M>().is_some()
    }

    /// Registers a module instance, initializing it and inserting it at
    /// its priority position. Fails if a module of the same concrete type
    /// is already present.
    pub fn register<M: Module>(&mut self, module: M) -> Result<(), FrameworkError> {
        if self.has_module::<M>() {
            return Err(FrameworkError::DuplicateModule {
                type_name: std::any::type_name::<M>(),
            });
        }
        self.insert_ordered(Box::new(module));
        Ok(())
    }

    /// Returns the module of type `M`, constructing and registering a
    /// default instance on first lookup.
    pub fn get_or_insert<M: Module + Default>(&mut self) -> &mut M {
        let node = match self.position_of::<M>() {
            Some(node) => node,
            None => self.insert_ordered(Box::new(M::default())),
        };
        match self
            .modules
            .get_mut(node)
            .and_then(|module| module.as_any_mut().downcast_mut::<M>())
        {
            Some(module) => module,
            None => unreachable!("node resolved from the module's own type"),
        }
    }

    /// Borrows the module of type `M`, if registered.
    #[must_use]
    pub fn get<M: Module>(&self) -> Option<&M> {
        let node = self.position_of::<M>()?;
        self.modules
            .get(node)
            .and_then(|module| module.as_any().downcast_ref::<M>())
    }

    /// Mutably borrows the module of type `M`, if registered.
    pub fn get_mut<M: Module>(&mut self) -> Option<&mut M> {
        let node = self.position_of::<M>()?;
        self.modules
            .get_mut(node)
            .and_then(|module| module.as_any_mut().downcast_mut::<M>())
    }

    /// Forwards the tick to every module, highest priority first.
    pub fn update(&mut self, elapsed: Duration, real_elapsed: Duration) {
        let mut cursor = self.modules.front();
        while let Some(node) = cursor {
            let next = self.modules.next(node);
            if let Some(module) = self.modules.get_mut(node) {
                module.update(elapsed, real_elapsed);
            }
            cursor = next;
        }
    }

    /// Shuts every module down, lowest priority first, and empties the
    /// registry.
    pub fn shutdown(&mut self) {
        while let Some(mut module) = self.modules.pop_back() {
            module.shutdown();
        }
        self.modules.clear();
    }

    fn position_of<M: Module>(&self) -> Option<NodeId> {
        let mut cursor = self.modules.front();
        while let Some(node) = cursor {
            if self.modules.get(node).is_some_and(|m| m.as_any().is::<M>()) {
                return Some(node);
            }
            cursor = self.modules.next(node);
        }
        None
    }

    fn insert_ordered(&mut self, mut module: Box<dyn Module>) -> NodeId {
        module.init();
        let priority = module.priority();
        let mut anchor = None;
        let mut cursor = self.modules.back();
        while let Some(node) = cursor {
            let at_least = self
                .modules
                .get(node)
                .is_some_and(|m| m.priority() >= priority);
            if at_least {
                anchor = Some(node);
                break;
            }
            cursor = self.modules.prev(node);
        }
        match anchor {
            Some(node) => self.modules.insert_after(node, module),
            None => self.modules.push_front(module),
        }
    }
}
