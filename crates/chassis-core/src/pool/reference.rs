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

//! The capability contract for poolable objects.

use std::any::Any;

/// A reusable object that can live in a [`ReferencePool`](super::ReferencePool).
///
/// `clear` is invoked by the pool on release and must leave the object
/// indistinguishable from a freshly constructed one; the next acquirer
/// sees no trace of the previous use.
///
/// The `Any` conversions allow the pool to store objects type-erased and
/// hand them back as their concrete type.
pub trait Reference: Any + Send {
    /// Resets the object to its freshly-constructed state.
    fn clear(&mut self);

    /// Upcast for type-id queries and identity checks.
    fn as_any(&self) -> &dyn Any;

    /// Upcast consuming the box, for downcasting back to the concrete type.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl std::fmt::Debug for dyn Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reference").finish_non_exhaustive()
    }
}
