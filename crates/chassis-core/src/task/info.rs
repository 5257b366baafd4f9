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

use crate::task::TaskSerialId;
use serde::Serialize;

/// Where a task sits in the pool at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskStatus {
    /// Waiting in the queue, not yet bound to an agent.
    Todo,
    /// Bound to a working agent and still running.
    Doing,
    /// Finished but not yet swept off its agent.
    Done,
}

/// A point-in-time snapshot of one task, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct TaskInfo {
    /// The pool-assigned serial id.
    pub serial_id: TaskSerialId,
    /// The caller-supplied tag, if any.
    pub tag: Option<String>,
    /// The scheduling priority.
    pub priority: i32,
    /// The task's status at snapshot time.
    pub status: TaskStatus,
}
