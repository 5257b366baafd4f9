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

//! Mode flags controlling how strict an event pool is about handlers.

use std::ops::BitOr;

/// Flags selecting an event pool's handler policy.
///
/// The default mode requires exactly one handler per event id: no-handler
/// dispatches are errors, and so are second or duplicate subscriptions.
/// Multiple flags can be combined with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventPoolMode {
    bits: u8,
}

impl EventPoolMode {
    /// Exactly one handler required per event id.
    pub const DEFAULT: Self = Self { bits: 0 };
    /// Dispatching an event with no handler is allowed.
    pub const ALLOW_NO_HANDLER: Self = Self { bits: 1 << 0 };
    /// More than one handler may subscribe to the same event id.
    pub const ALLOW_MULTI_HANDLER: Self = Self { bits: 1 << 1 };
    /// The same handler may subscribe to one event id more than once.
    pub const ALLOW_DUPLICATE_HANDLER: Self = Self { bits: 1 << 2 };

    /// Creates a mode from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self { bits }
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(&self) -> u8 {
        self.bits
    }

    /// Combines two modes.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Checks whether every flag in `other` is set.
    #[must_use]
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }
}

impl Default for EventPoolMode {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BitOr for EventPoolMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine_and_query() {
        let mode = EventPoolMode::ALLOW_MULTI_HANDLER | EventPoolMode::ALLOW_NO_HANDLER;
        assert!(mode.contains(EventPoolMode::ALLOW_MULTI_HANDLER));
        assert!(mode.contains(EventPoolMode::ALLOW_NO_HANDLER));
        assert!(!mode.contains(EventPoolMode::ALLOW_DUPLICATE_HANDLER));
        assert!(EventPoolMode::DEFAULT.contains(EventPoolMode::DEFAULT));
    }
}
