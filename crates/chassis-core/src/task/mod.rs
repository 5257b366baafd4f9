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

//! Priority task scheduling over a bounded set of execution agents.
//!
//! A [`TaskPool`] keeps a priority-ordered waiting queue of tasks and a
//! stack of free [`TaskAgent`]s; each tick it sweeps finished work and
//! binds free agents to waiting tasks. Tasks are poolable payloads
//! (data + priority); agents are the reusable execution slots they run
//! in, so the number of in-flight tasks stays bounded by the agent count
//! no matter how deep the queue gets.

mod agent;
mod base;
mod info;
mod pool;

pub use agent::{StartStatus, TaskAgent};
pub use base::{Task, TaskBase, TaskSerialId, DEFAULT_TASK_PRIORITY};
pub use info::{TaskInfo, TaskStatus};
pub use pool::TaskPool;
