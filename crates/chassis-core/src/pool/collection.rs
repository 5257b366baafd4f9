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

//! The homogeneous per-type pool behind the [`ReferencePool`](super::ReferencePool).

use crate::error::FrameworkError;
use crate::pool::Reference;
use serde::Serialize;
use std::any::Any;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A point-in-time snapshot of one collection's counters.
///
/// The counters exist purely for introspection; they never gate
/// correctness.
#[derive(Debug, Clone, Serialize)]
pub struct ReferencePoolInfo {
    /// Name of the pooled concrete type.
    pub type_name: &'static str,
    /// Instances sitting in the unused queue.
    pub unused_count: usize,
    /// Instances currently handed out. Signed because releasing objects
    /// that were constructed outside the pool can drive it negative.
    pub using_count: i64,
    /// Total acquires so far.
    pub acquired_count: u64,
    /// Total releases so far.
    pub released_count: u64,
    /// Total instances constructed (on acquire miss or pre-warm).
    pub added_count: u64,
    /// Total instances dropped from the unused queue.
    pub removed_count: u64,
}

struct CollectionInner {
    unused: VecDeque<Box<dyn Reference>>,
    using_count: i64,
    acquired_count: u64,
    released_count: u64,
    added_count: u64,
    removed_count: u64,
}

/// One type's unused-object queue plus its counters, guarded by a
/// dedicated mutex.
pub(super) struct ReferenceCollection {
    type_name: &'static str,
    inner: Mutex<CollectionInner>,
}

fn data_ptr(any: &dyn Any) -> *const () {
    any as *const dyn Any as *const ()
}

impl ReferenceCollection {
    pub(super) fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            inner: Mutex::new(CollectionInner {
                unused: VecDeque::new(),
                using_count: 0,
                acquired_count: 0,
                released_count: 0,
                added_count: 0,
                removed_count: 0,
            }),
        }
    }

    /// Pops a pooled instance or constructs a new one via `factory`.
    pub(super) fn acquire(
        &self,
        factory: impl FnOnce() -> Box<dyn Reference>,
    ) -> Box<dyn Reference> {
        let mut inner = self.lock();
        inner.acquired_count += 1;
        inner.using_count += 1;
        if let Some(obj) = inner.unused.pop_front() {
            return obj;
        }
        inner.added_count += 1;
        drop(inner);
        log::trace!("constructing new pooled instance of {}", self.type_name);
        factory()
    }

    pub(super) fn release<T: Reference>(
        &self,
        obj: Box<T>,
        strict: bool,
    ) -> Result<(), FrameworkError> {
        self.release_boxed(obj, strict)
    }

    /// Clears the object and returns it to the unused queue.
    ///
    /// With `strict` set, an object whose allocation already sits in the
    /// queue is rejected and leaked instead of enqueued a second time —
    /// the queue already owns that allocation.
    pub(super) fn release_boxed(
        &self,
        mut obj: Box<dyn Reference>,
        strict: bool,
    ) -> Result<(), FrameworkError> {
        obj.clear();
        let mut inner = self.lock();
        if strict {
            let released = data_ptr(obj.as_any());
            if inner
                .unused
                .iter()
                .any(|queued| data_ptr(queued.as_any()) == released)
            {
                std::mem::forget(obj);
                return Err(FrameworkError::DoubleRelease {
                    type_name: self.type_name,
                });
            }
        }
        inner.unused.push_back(obj);
        inner.released_count += 1;
        inner.using_count -= 1;
        Ok(())
    }

    /// Pre-warms the queue with `count` fresh instances.
    pub(super) fn add(&self, count: usize, factory: impl Fn() -> Box<dyn Reference>) {
        let mut inner = self.lock();
        inner.added_count += count as u64;
        for _ in 0..count {
            inner.unused.push_back(factory());
        }
    }

    /// Drops up to `count` instances from the queue, clamped to its size.
    pub(super) fn remove(&self, count: usize) {
        let mut inner = self.lock();
        let count = count.min(inner.unused.len());
        inner.removed_count += count as u64;
        for _ in 0..count {
            inner.unused.pop_front();
        }
    }

    /// Drops every queued instance.
    pub(super) fn remove_unused(&self) {
        let mut inner = self.lock();
        inner.removed_count += inner.unused.len() as u64;
        inner.unused.clear();
    }

    pub(super) fn info(&self) -> ReferencePoolInfo {
        let inner = self.lock();
        ReferencePoolInfo {
            type_name: self.type_name,
            unused_count: inner.unused.len(),
            using_count: inner.using_count,
            acquired_count: inner.acquired_count,
            released_count: inner.released_count,
            added_count: inner.added_count,
            removed_count: inner.removed_count,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CollectionInner> {
        self.inner.lock().expect("reference collection poisoned")
    }
}
