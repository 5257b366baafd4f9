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

//! The typed error surface of the kernel.
//!
//! Contract violations (bad arguments, duplicate subscriptions, pool
//! misuse) are reported synchronously at the call site through
//! [`FrameworkError`]. Policy outcomes — an unhandled event on a pool that
//! forbids that, a task agent reporting an unknown error — are logged and
//! surfaced through status values instead, so a single bad event or task
//! never aborts the tick that processes it.

use crate::event::EventId;
use std::any::TypeId;
use std::fmt;

/// An error raised by a kernel component when one of its contracts is
/// violated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameworkError {
    /// A catch-all contract violation with a descriptive message.
    InvalidOperation {
        /// What the caller did wrong.
        message: String,
    },
    /// A second handler was subscribed to an event id on a pool that
    /// requires at most one handler per id.
    MultiHandlerNotAllowed {
        /// The event id that already has a handler.
        event_id: EventId,
    },
    /// The exact same handler was subscribed twice to one event id on a
    /// pool that disallows duplicates.
    DuplicateHandler {
        /// The event id the handler is already registered for.
        event_id: EventId,
    },
    /// An unsubscribe did not find the given handler in the id's chain.
    HandlerNotFound {
        /// The event id that was searched.
        event_id: EventId,
    },
    /// An event was dispatched, no handler (specific or default) existed,
    /// and the pool does not allow unhandled events.
    UnhandledEvent {
        /// The id of the unhandled event.
        event_id: EventId,
    },
    /// Strict checking found the released object already sitting in its
    /// type's unused queue.
    DoubleRelease {
        /// The name of the offending reference type.
        type_name: &'static str,
    },
    /// A dynamic acquire or release hit a type that was never registered
    /// with a factory.
    UnregisteredType {
        /// The type id that has no registered factory.
        type_id: TypeId,
    },
    /// A module of the same concrete type is already present in the
    /// registry.
    DuplicateModule {
        /// The name of the module type.
        type_name: &'static str,
    },
}

impl fmt::Display for FrameworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameworkError::InvalidOperation { message } => {
                write!(f, "invalid operation: {message}")
            }
            FrameworkError::MultiHandlerNotAllowed { event_id } => {
                write!(f, "event '{event_id}' does not allow multiple handlers")
            }
            FrameworkError::DuplicateHandler { event_id } => {
                write!(f, "event '{event_id}' does not allow duplicate handlers")
            }
            FrameworkError::HandlerNotFound { event_id } => {
                write!(f, "event '{event_id}' has no such handler registered")
            }
            FrameworkError::UnhandledEvent { event_id } => {
                write!(f, "event '{event_id}' does not allow having no handler")
            }
            FrameworkError::DoubleRelease { type_name } => {
                write!(f, "reference of type '{type_name}' was already released")
            }
            FrameworkError::UnregisteredType { type_id } => {
                write!(f, "no reference factory registered for {type_id:?}")
            }
            FrameworkError::DuplicateModule { type_name } => {
                write!(f, "module '{type_name}' is already registered")
            }
        }
    }
}

impl std::error::Error for FrameworkError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_descriptive() {
        let err = FrameworkError::DuplicateHandler { event_id: 7 };
        assert_eq!(err.to_string(), "event '7' does not allow duplicate handlers");

        let err = FrameworkError::DoubleRelease { type_name: "Foo" };
        assert!(err.to_string().contains("Foo"));
    }
}
