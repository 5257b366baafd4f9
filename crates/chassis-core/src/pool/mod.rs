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

//! The reference pool: a type-keyed store of reusable objects.
//!
//! Every poolable type implements [`Reference`], whose `clear` operation
//! must leave an object indistinguishable from a freshly constructed one.
//! The pool keeps one [`collection`](self) per concrete type, each with its
//! own unused-object queue, mutex, and diagnostic counters.

mod collection;
mod reference;

pub use collection::ReferencePoolInfo;
pub use reference::Reference;

use crate::error::FrameworkError;
use collection::ReferenceCollection;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Factory used by the dynamic (type-token) acquire path.
type ReferenceFactory = fn() -> Box<dyn Reference>;

/// A process-wide store of reusable objects, keyed by concrete type.
///
/// The pool is an explicit context object rather than hidden global state:
/// the application root owns one and shares it (behind an [`Arc`]) with the
/// event and task pools that release payloads into it. All operations are
/// thread-safe; any thread may acquire or release concurrently with the
/// tick thread.
///
/// # Example
///
/// ```rust
/// use chassis_core::pool::{Reference, ReferencePool};
/// use std::any::Any;
///
/// #[derive(Default)]
/// struct Message {
///     text: String,
/// }
///
/// impl Reference for Message {
///     fn clear(&mut self) {
///         self.text.clear();
///     }
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
///     fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
///         self
///     }
/// }
///
/// let pool = ReferencePool::new();
/// let mut msg = pool.acquire::<Message>();
/// msg.text.push_str("hello");
/// pool.release(msg).unwrap();
///
/// // The cleared instance is handed out again.
/// let msg = pool.acquire::<Message>();
/// assert!(msg.text.is_empty());
/// ```
pub struct ReferencePool {
    collections: Mutex<HashMap<TypeId, Arc<ReferenceCollection>>>,
    factories: Mutex<HashMap<TypeId, (ReferenceFactory, &'static str)>>,
    strict_check: AtomicBool,
}

impl ReferencePool {
    /// Creates an empty pool with strict checking disabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            factories: Mutex::new(HashMap::new()),
            strict_check: AtomicBool::new(false),
        }
    }

    /// Enables or disables strict checking.
    ///
    /// Strict checking trades an O(n) scan of the unused queue on every
    /// release for early detection of double releases.
    pub fn set_strict_check(&self, enabled: bool) {
        self.strict_check.store(enabled, Ordering::Relaxed);
    }

    /// Returns whether strict checking is enabled.
    #[must_use]
    pub fn strict_check(&self) -> bool {
        self.strict_check.load(Ordering::Relaxed)
    }

    /// Returns the number of per-type collections created so far.
    #[must_use]
    pub fn collection_count(&self) -> usize {
        self.collections.lock().expect("reference pool poisoned").len()
    }

    /// Acquires an instance of `T`, reusing a pooled one when available.
    ///
    /// Pops from `T`'s unused queue if it is non-empty; otherwise
    /// constructs a new default instance.
    pub fn acquire<T: Reference + Default>(&self) -> Box<T> {
        let collection = self.collection_for(TypeId::of::<T>(), std::any::type_name::<T>());
        let boxed = collection.acquire(|| Box::new(T::default()));
        match boxed.into_any().downcast::<T>() {
            Ok(value) => value,
            Err(_) => unreachable!("collection is keyed by TypeId"),
        }
    }

    /// Releases an object back to its type's pool.
    ///
    /// The object is cleared before it re-enters the unused queue. With
    /// strict checking enabled, releasing an object whose allocation is
    /// already in the queue fails with
    /// [`FrameworkError::DoubleRelease`]; the object is intentionally
    /// leaked in that case, because the queue already owns the allocation.
    pub fn release<T: Reference>(&self, obj: Box<T>) -> Result<(), FrameworkError> {
        let collection = self.collection_for(TypeId::of::<T>(), std::any::type_name::<T>());
        collection.release(obj, self.strict_check())
    }

    /// Registers the factory that backs the dynamic acquire path for `T`.
    ///
    /// This is the registration-time capability the type-token overloads
    /// require: only registered types can be acquired through
    /// [`acquire_dyn`](Self::acquire_dyn).
    pub fn register_factory<T: Reference + Default>(&self) {
        let mut factories = self.factories.lock().expect("reference pool poisoned");
        factories.insert(
            TypeId::of::<T>(),
            (
                || Box::new(T::default()) as Box<dyn Reference>,
                std::any::type_name::<T>(),
            ),
        );
    }

    /// Acquires an instance by runtime type token.
    ///
    /// Fails with [`FrameworkError::UnregisteredType`] if no factory was
    /// registered for `type_id`.
    pub fn acquire_dyn(&self, type_id: TypeId) -> Result<Box<dyn Reference>, FrameworkError> {
        let (factory, type_name) = {
            let factories = self.factories.lock().expect("reference pool poisoned");
            *factories
                .get(&type_id)
                .ok_or(FrameworkError::UnregisteredType { type_id })?
        };
        let collection = self.collection_for(type_id, type_name);
        Ok(collection.acquire(factory))
    }

    /// Releases an object acquired through the dynamic path.
    pub fn release_dyn(&self, obj: Box<dyn Reference>) -> Result<(), FrameworkError> {
        let type_id = obj.as_any().type_id();
        let type_name = {
            let factories = self.factories.lock().expect("reference pool poisoned");
            factories
                .get(&type_id)
                .map(|(_, name)| *name)
                .ok_or(FrameworkError::UnregisteredType { type_id })?
        };
        let collection = self.collection_for(type_id, type_name);
        collection.release_boxed(obj, self.strict_check())
    }

    /// Pre-warms `T`'s unused queue with `count` default instances.
    pub fn add<T: Reference + Default>(&self, count: usize) {
        let collection = self.collection_for(TypeId::of::<T>(), std::any::type_name::<T>());
        collection.add(count, || Box::new(T::default()));
    }

    /// Drops up to `count` instances from `T`'s unused queue.
    ///
    /// `count` is clamped to the queue's current size.
    pub fn remove<T: Reference>(&self, count: usize) {
        if let Some(collection) = self.existing_collection(TypeId::of::<T>()) {
            collection.remove(count);
        }
    }

    /// Drops every instance from `T`'s unused queue.
    pub fn remove_all<T: Reference>(&self) {
        if let Some(collection) = self.existing_collection(TypeId::of::<T>()) {
            collection.remove_unused();
        }
    }

    /// Drops every per-type collection.
    ///
    /// Intended for full-system teardown only; not safe to call while any
    /// pooled object is still in use.
    pub fn clear_all(&self) {
        let mut collections = self.collections.lock().expect("reference pool poisoned");
        for collection in collections.values() {
            collection.remove_unused();
        }
        collections.clear();
    }

    /// Returns a point-in-time snapshot of every collection's counters,
    /// sorted by type name.
    #[must_use]
    pub fn pool_infos(&self) -> Vec<ReferencePoolInfo> {
        let collections = self.collections.lock().expect("reference pool poisoned");
        let mut infos: Vec<ReferencePoolInfo> =
            collections.values().map(|c| c.info()).collect();
        infos.sort_by(|a, b| a.type_name.cmp(b.type_name));
        infos
    }

    fn collection_for(&self, type_id: TypeId, type_name: &'static str) -> Arc<ReferenceCollection> {
        let mut collections = self.collections.lock().expect("reference pool poisoned");
        collections
            .entry(type_id)
            .or_insert_with(|| Arc::new(ReferenceCollection::new(type_name)))
            .clone()
    }

    fn existing_collection(&self, type_id: TypeId) -> Option<Arc<ReferenceCollection>> {
        let collections = self.collections.lock().expect("reference pool poisoned");
        collections.get(&type_id).cloned()
    }
}

impl Default for ReferencePool {
    fn default() -> Self {
        Self::new()
    }
}
