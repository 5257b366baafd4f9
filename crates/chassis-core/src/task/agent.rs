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

use crate::task::Task;
use std::time::Duration;

/// The outcome an agent reports from [`TaskAgent::start`].
///
/// Ownership of the task moves with the status: every variant except
/// `CanResume` hands the task back to the pool, which decides whether to
/// release it or keep it queued. `CanResume` means the agent kept the
/// task and is now working.
pub enum StartStatus<T: Task> {
    /// The task finished synchronously inside `start`.
    Done(Box<T>),
    /// The agent accepted the task and will drive it across updates.
    CanResume,
    /// The agent cannot proceed right now; the task goes back to the
    /// waiting queue at its old position.
    HasToWait(Box<T>),
    /// Unrecoverable failure. The pool releases the task and surfaces the
    /// failure to the caller.
    UnknownError(Box<T>),
}

/// A reusable execution slot bound to at most one task at a time.
///
/// The pool guarantees an agent is either on the free stack or in the
/// working list, never both, and that [`task`](Self::task) returns `Some`
/// exactly while the agent is working.
pub trait TaskAgent<T: Task>: Send {
    /// Called once when the agent is added to a pool.
    fn initialize(&mut self);

    /// Attempts to bind and begin `task`. On `CanResume` the agent must
    /// hold the task until [`reset`](Self::reset) takes it back.
    fn start(&mut self, task: Box<T>) -> StartStatus<T>;

    /// Per-tick update while working. The agent marks its task done via
    /// [`TaskBase::mark_done`](crate::task::TaskBase::mark_done); the pool
    /// sweeps done tasks on the following update.
    fn update(&mut self, elapsed: Duration, real_elapsed: Duration);

    /// Unbinds and returns the held task, leaving the agent ready for
    /// reuse. Returns `None` if the agent holds no task.
    fn reset(&mut self) -> Option<Box<T>>;

    /// Called once when the owning pool shuts down.
    fn shutdown(&mut self);

    /// The task currently bound to this agent, if any.
    fn task(&self) -> Option<&T>;
}
