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

//! # Chassis Core
//!
//! The runtime kernel of a component-based application framework: a
//! type-keyed reference pool, a deferred/immediate event pool, a priority
//! task pool with pluggable execution agents, and the recyclable linked
//! list the other three build on.
//!
//! The kernel is host-agnostic. An external driver owns the frame loop and
//! calls [`module::ModuleRegistry::update`] once per logical tick with
//! monotonically non-decreasing elapsed-time values; arbitrary background
//! threads may acquire or release pooled objects and fire deferred events
//! concurrently with that tick.

#![warn(missing_docs)]

pub mod collections;
pub mod error;
pub mod event;
pub mod module;
pub mod pool;
pub mod task;

pub use error::FrameworkError;
pub use pool::{Reference, ReferencePool};
