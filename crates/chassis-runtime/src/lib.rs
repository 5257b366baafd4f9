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

//! The application root over the chassis kernel.
//!
//! A [`Kernel`] owns the shared reference pool and the module registry
//! and exposes the single `update`/`shutdown` surface the host frame
//! loop drives. [`EventModule`] and [`TaskModule`] wrap the core pools
//! as registry modules so they tick in priority order with everything
//! else.

#![warn(missing_docs)]

use chassis_core::event::{EventPool, EventPoolMode, PoolEvent};
use chassis_core::module::{Module, ModuleRegistry};
use chassis_core::pool::ReferencePool;
use chassis_core::task::{Task, TaskPool};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

/// The application root: one reference pool shared by every subsystem
/// and a registry of modules ticked in priority order.
///
/// The host calls [`update`](Self::update) once per logical frame with
/// monotonically non-decreasing elapsed times, and
/// [`shutdown`](Self::shutdown) exactly once at teardown.
pub struct Kernel {
    refs: Arc<ReferencePool>,
    registry: ModuleRegistry,
}

impl Kernel {
    /// Creates a kernel with an empty registry and a fresh pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            refs: Arc::new(ReferencePool::new()),
            registry: ModuleRegistry::new(),
        }
    }

    /// The process-wide reference pool.
    #[must_use]
    pub fn reference_pool(&self) -> &Arc<ReferencePool> {
        &self.refs
    }

    /// The module registry.
    #[must_use]
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Mutable access to the module registry.
    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    /// Ticks every module, highest priority first.
    pub fn update(&mut self, elapsed: Duration, real_elapsed: Duration) {
        self.registry.update(elapsed, real_elapsed);
    }

    /// Shuts modules down lowest priority first, then drops every pooled
    /// object process-wide.
    pub fn shutdown(&mut self) {
        log::info!("kernel shutting down");
        self.registry.shutdown();
        self.refs.clear_all();
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

/// An [`EventPool`] mounted as a registry module, so deferred dispatch
/// happens at this module's position in the tick order.
pub struct EventModule<E: PoolEvent> {
    pool: EventPool<E>,
    priority: i32,
}

impl<E: PoolEvent> EventModule<E> {
    /// Creates the module with the given dispatch policy and tick
    /// priority, releasing payloads into `refs`.
    #[must_use]
    pub fn new(mode: EventPoolMode, refs: Arc<ReferencePool>, priority: i32) -> Self {
        Self {
            pool: EventPool::new(mode, refs),
            priority,
        }
    }

    /// The wrapped event pool.
    #[must_use]
    pub fn pool(&self) -> &EventPool<E> {
        &self.pool
    }

    /// Mutable access to the wrapped event pool.
    pub fn pool_mut(&mut self) -> &mut EventPool<E> {
        &mut self.pool
    }
}

impl<E: PoolEvent> Module for EventModule<E> {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn update(&mut self, elapsed: Duration, real_elapsed: Duration) {
        self.pool.update(elapsed, real_elapsed);
    }

    fn shutdown(&mut self) {
        self.pool.shutdown();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A [`TaskPool`] mounted as a registry module.
pub struct TaskModule<T: Task> {
    pool: TaskPool<T>,
    priority: i32,
}

impl<T: Task> TaskModule<T> {
    /// Creates the module with the given tick priority, releasing
    /// finished tasks into `refs`.
    #[must_use]
    pub fn new(refs: Arc<ReferencePool>, priority: i32) -> Self {
        Self {
            pool: TaskPool::new(refs),
            priority,
        }
    }

    /// The wrapped task pool.
    #[must_use]
    pub fn pool(&self) -> &TaskPool<T> {
        &self.pool
    }

    /// Mutable access to the wrapped task pool.
    pub fn pool_mut(&mut self) -> &mut TaskPool<T> {
        &mut self.pool
    }
}

impl<T: Task> Module for TaskModule<T> {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn update(&mut self, elapsed: Duration, real_elapsed: Duration) {
        self.pool.update(elapsed, real_elapsed);
    }

    fn shutdown(&mut self) {
        self.pool.shutdown();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
