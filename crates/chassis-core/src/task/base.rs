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

use crate::pool::Reference;
use std::any::Any;

/// Pool-assigned unique identifier of a task.
pub type TaskSerialId = u64;

/// Priority used when a task does not set one explicitly.
pub const DEFAULT_TASK_PRIORITY: i32 = 0;

/// The bookkeeping every task carries: serial id, tag, priority, user
/// data, and the completion flag.
///
/// Embed one in each concrete task type and expose it through [`Task`].
/// The serial id is assigned by the owning pool when the task is added;
/// everything else belongs to the caller.
#[derive(Default)]
pub struct TaskBase {
    serial_id: TaskSerialId,
    tag: Option<String>,
    priority: i32,
    user_data: Option<Box<dyn Any + Send>>,
    done: bool,
}

impl TaskBase {
    /// The pool-assigned serial id, or 0 before the task is added.
    #[must_use]
    pub fn serial_id(&self) -> TaskSerialId {
        self.serial_id
    }

    pub(crate) fn set_serial_id(&mut self, id: TaskSerialId) {
        self.serial_id = id;
    }

    /// The optional caller-supplied tag.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Sets the tag used by tag-based lookups and removal.
    pub fn set_tag(&mut self, tag: Option<String>) {
        self.tag = tag;
    }

    /// The scheduling priority; higher starts earlier.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Sets the scheduling priority. Must be set before the task is
    /// added; the pool does not re-sort on later changes.
    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }

    /// Attaches opaque user data carried alongside the task.
    pub fn set_user_data(&mut self, data: Option<Box<dyn Any + Send>>) {
        self.user_data = data;
    }

    /// Borrows the attached user data, if any.
    #[must_use]
    pub fn user_data(&self) -> Option<&(dyn Any + Send)> {
        self.user_data.as_deref()
    }

    /// Takes the attached user data out of the task.
    pub fn take_user_data(&mut self) -> Option<Box<dyn Any + Send>> {
        self.user_data.take()
    }

    /// Whether the task has finished. A done working task is swept by the
    /// pool on its next update.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Marks the task finished.
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    /// Resets every field to its freshly-constructed state.
    pub fn clear(&mut self) {
        self.serial_id = 0;
        self.tag = None;
        self.priority = DEFAULT_TASK_PRIORITY;
        self.user_data = None;
        self.done = false;
    }
}

/// A schedulable unit of work owned by a [`TaskPool`](crate::task::TaskPool)
/// from add until completion or removal, then released back to the
/// reference pool.
pub trait Task: Reference {
    /// The task's shared bookkeeping.
    fn base(&self) -> &TaskBase;

    /// Mutable access to the shared bookkeeping.
    fn base_mut(&mut self) -> &mut TaskBase;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_restores_fresh_state() {
        let mut base = TaskBase::default();
        base.set_serial_id(42);
        base.set_tag(Some("load".to_string()));
        base.set_priority(7);
        base.set_user_data(Some(Box::new(3usize)));
        base.mark_done();

        base.clear();
        assert_eq!(base.serial_id(), 0);
        assert_eq!(base.tag(), None);
        assert_eq!(base.priority(), DEFAULT_TASK_PRIORITY);
        assert!(base.user_data().is_none());
        assert!(!base.is_done());
    }
}
