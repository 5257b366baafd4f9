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

use crate::collections::RecyclableList;
use crate::pool::ReferencePool;
use crate::task::{StartStatus, Task, TaskAgent, TaskBase, TaskInfo, TaskSerialId, TaskStatus};
use std::sync::Arc;
use std::time::Duration;

/// A priority scheduler matching waiting tasks against a bounded set of
/// reusable agents.
///
/// The waiting queue is kept in descending priority order with FIFO
/// tie-break. Each update runs two passes: a running pass that ticks
/// working agents and sweeps the ones whose task finished, then a waiting
/// pass that binds free agents to queued tasks. Finished and removed
/// tasks are released back to the shared [`ReferencePool`].
///
/// All mutation belongs to the single tick thread; the pool takes no
/// locks of its own. Callers on other threads must route additions
/// through their own serialization.
pub struct TaskPool<T: Task> {
    paused: bool,
    next_serial: TaskSerialId,
    free_agents: Vec<Box<dyn TaskAgent<T>>>,
    working_agents: RecyclableList<Box<dyn TaskAgent<T>>>,
    waiting_tasks: RecyclableList<Box<T>>,
    failures: Vec<TaskInfo>,
    refs: Arc<ReferencePool>,
}

impl<T: Task> TaskPool<T> {
    /// Creates an empty pool releasing finished tasks into `refs`.
    #[must_use]
    pub fn new(refs: Arc<ReferencePool>) -> Self {
        Self {
            paused: false,
            next_serial: 0,
            free_agents: Vec::new(),
            working_agents: RecyclableList::new(),
            waiting_tasks: RecyclableList::new(),
            failures: Vec::new(),
            refs,
        }
    }

    /// Whether updates are currently suspended.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Suspends or resumes task processing. While paused, `update` is a
    /// no-op; queues and agents keep their state.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// The number of agents on the free stack.
    #[must_use]
    pub fn free_agent_count(&self) -> usize {
        self.free_agents.len()
    }

    /// The number of agents currently bound to a task.
    #[must_use]
    pub fn working_agent_count(&self) -> usize {
        self.working_agents.len()
    }

    /// Free plus working agents.
    #[must_use]
    pub fn total_agent_count(&self) -> usize {
        self.free_agent_count() + self.working_agent_count()
    }

    /// The number of tasks waiting for an agent.
    #[must_use]
    pub fn waiting_task_count(&self) -> usize {
        self.waiting_tasks.len()
    }

    /// The number of tasks bound to working agents.
    #[must_use]
    pub fn working_task_count(&self) -> usize {
        self.working_agents.len()
    }

    /// Waiting plus working tasks.
    #[must_use]
    pub fn total_task_count(&self) -> usize {
        self.waiting_task_count() + self.working_task_count()
    }

    /// Registers an agent and pushes it onto the free stack.
    pub fn add_agent(&mut self, mut agent: Box<dyn TaskAgent<T>>) {
        agent.initialize();
        self.free_agents.push(agent);
    }

    /// Enqueues a task, assigning and returning its serial id.
    ///
    /// The task is inserted after the last queued task whose priority is
    /// greater than or equal to its own, which keeps the queue in
    /// descending priority order with FIFO tie-break.
    pub fn add_task(&mut self, mut task: Box<T>) -> TaskSerialId {
        self.next_serial += 1;
        let serial_id = self.next_serial;
        task.base_mut().set_serial_id(serial_id);

        let priority = task.base().priority();
        let mut anchor = None;
        let mut cursor = self.waiting_tasks.back();
        while let Some(node) = cursor {
            let at_least = self
                .waiting_tasks
                .get(node)
                .is_some_and(|t| t.base().priority() >= priority);
            if at_least {
                anchor = Some(node);
                break;
            }
            cursor = self.waiting_tasks.prev(node);
        }
        match anchor {
            Some(node) => {
                self.waiting_tasks.insert_after(node, task);
            }
            None => {
                self.waiting_tasks.push_front(task);
            }
        }
        serial_id
    }

    /// Progresses the pool by one tick: sweeps finished work, ticks the
    /// agents still running, then binds free agents to waiting tasks.
    ///
    /// An agent reporting [`StartStatus::UnknownError`] is logged, its
    /// task released, and the failure recorded for
    /// [`take_failures`](Self::take_failures); the pass continues with
    /// the next task.
    pub fn update(&mut self, elapsed: Duration, real_elapsed: Duration) {
        if self.paused {
            return;
        }
        self.run_working_pass(elapsed, real_elapsed);
        self.run_waiting_pass();
    }

    fn run_working_pass(&mut self, elapsed: Duration, real_elapsed: Duration) {
        let mut cursor = self.working_agents.front();
        while let Some(node) = cursor {
            let next = self.working_agents.next(node);
            let done = self
                .working_agents
                .get(node)
                .and_then(|agent| agent.task())
                .is_some_and(|task| task.base().is_done());
            if done {
                if let Some(mut agent) = self.working_agents.remove_node(node) {
                    if let Some(task) = agent.reset() {
                        self.release_task(task);
                    }
                    self.free_agents.push(agent);
                }
            } else if let Some(agent) = self.working_agents.get_mut(node) {
                agent.update(elapsed, real_elapsed);
            }
            cursor = next;
        }
    }

    fn run_waiting_pass(&mut self) {
        let mut cursor = self.waiting_tasks.front();
        while let Some(node) = cursor {
            if self.free_agents.is_empty() {
                break;
            }
            let next = self.waiting_tasks.next(node);
            let task = match self.waiting_tasks.remove_node(node) {
                Some(task) => task,
                None => break,
            };
            let mut agent = match self.free_agents.pop() {
                Some(agent) => agent,
                None => break,
            };
            match agent.start(task) {
                StartStatus::Done(task) => {
                    self.release_task(task);
                    self.free_agents.push(agent);
                }
                StartStatus::CanResume => {
                    self.working_agents.push_back(agent);
                }
                StartStatus::HasToWait(task) => {
                    // Back to its old queue position for the next pass.
                    match next {
                        Some(anchor) => {
                            self.waiting_tasks.insert_before(anchor, task);
                        }
                        None => {
                            self.waiting_tasks.push_back(task);
                        }
                    }
                    self.free_agents.push(agent);
                }
                StartStatus::UnknownError(task) => {
                    log::warn!(
                        "task {} (tag {:?}) failed to start",
                        task.base().serial_id(),
                        task.base().tag()
                    );
                    self.failures
                        .push(Self::snapshot(task.base(), TaskStatus::Done));
                    self.release_task(task);
                    self.free_agents.push(agent);
                }
            }
            cursor = next;
        }
    }

    /// Removes the task with the given serial id from the waiting queue
    /// or from its working agent. A working agent is reset and returned
    /// to the free stack. Returns whether a task was removed.
    pub fn remove_task(&mut self, serial_id: TaskSerialId) -> bool {
        let mut cursor = self.waiting_tasks.front();
        while let Some(node) = cursor {
            let hit = self
                .waiting_tasks
                .get(node)
                .is_some_and(|task| task.base().serial_id() == serial_id);
            if hit {
                if let Some(task) = self.waiting_tasks.remove_node(node) {
                    self.release_task(task);
                }
                return true;
            }
            cursor = self.waiting_tasks.next(node);
        }

        let mut cursor = self.working_agents.front();
        while let Some(node) = cursor {
            let hit = self
                .working_agents
                .get(node)
                .and_then(|agent| agent.task())
                .is_some_and(|task| task.base().serial_id() == serial_id);
            if hit {
                if let Some(mut agent) = self.working_agents.remove_node(node) {
                    if let Some(task) = agent.reset() {
                        self.release_task(task);
                    }
                    self.free_agents.push(agent);
                }
                return true;
            }
            cursor = self.working_agents.next(node);
        }
        false
    }

    /// Removes every task carrying the given tag. Returns how many were
    /// removed.
    pub fn remove_tasks(&mut self, tag: &str) -> usize {
        self.remove_where(|base| base.tag() == Some(tag))
    }

    /// Removes every task in the pool. Returns how many were removed.
    pub fn remove_all_tasks(&mut self) -> usize {
        self.remove_where(|_| true)
    }

    fn remove_where<F: Fn(&TaskBase) -> bool>(&mut self, matches: F) -> usize {
        let mut removed = 0;

        let mut cursor = self.waiting_tasks.front();
        while let Some(node) = cursor {
            let next = self.waiting_tasks.next(node);
            let hit = self
                .waiting_tasks
                .get(node)
                .is_some_and(|task| matches(task.base()));
            if hit {
                if let Some(task) = self.waiting_tasks.remove_node(node) {
                    self.release_task(task);
                    removed += 1;
                }
            }
            cursor = next;
        }

        let mut cursor = self.working_agents.front();
        while let Some(node) = cursor {
            let next = self.working_agents.next(node);
            let hit = self
                .working_agents
                .get(node)
                .and_then(|agent| agent.task())
                .is_some_and(|task| matches(task.base()));
            if hit {
                if let Some(mut agent) = self.working_agents.remove_node(node) {
                    if let Some(task) = agent.reset() {
                        self.release_task(task);
                        removed += 1;
                    }
                    self.free_agents.push(agent);
                }
            }
            cursor = next;
        }
        removed
    }

    /// Snapshots the task with the given serial id, if present.
    #[must_use]
    pub fn task_info(&self, serial_id: TaskSerialId) -> Option<TaskInfo> {
        self.infos_where(|base| base.serial_id() == serial_id)
            .into_iter()
            .next()
    }

    /// Snapshots every task carrying the given tag.
    #[must_use]
    pub fn task_infos(&self, tag: &str) -> Vec<TaskInfo> {
        self.infos_where(|base| base.tag() == Some(tag))
    }

    /// Snapshots every task in the pool, working tasks first.
    #[must_use]
    pub fn all_task_infos(&self) -> Vec<TaskInfo> {
        self.infos_where(|_| true)
    }

    fn infos_where<F: Fn(&TaskBase) -> bool>(&self, matches: F) -> Vec<TaskInfo> {
        let mut infos = Vec::new();
        for agent in self.working_agents.iter() {
            if let Some(task) = agent.task() {
                if matches(task.base()) {
                    let status = if task.base().is_done() {
                        TaskStatus::Done
                    } else {
                        TaskStatus::Doing
                    };
                    infos.push(Self::snapshot(task.base(), status));
                }
            }
        }
        for task in self.waiting_tasks.iter() {
            if matches(task.base()) {
                infos.push(Self::snapshot(task.base(), TaskStatus::Todo));
            }
        }
        infos
    }

    /// Drains the failures recorded since the last call, oldest first.
    pub fn take_failures(&mut self) -> Vec<TaskInfo> {
        std::mem::take(&mut self.failures)
    }

    /// Removes and releases every task, then shuts every agent down.
    pub fn shutdown(&mut self) {
        self.remove_all_tasks();
        while let Some(mut agent) = self.free_agents.pop() {
            agent.shutdown();
        }
        self.working_agents.clear();
        self.waiting_tasks.clear();
    }

    fn release_task(&self, task: Box<T>) {
        if let Err(err) = self.refs.release(task) {
            log::error!("failed to release task: {err}");
        }
    }

    fn snapshot(base: &TaskBase, status: TaskStatus) -> TaskInfo {
        TaskInfo {
            serial_id: base.serial_id(),
            tag: base.tag().map(str::to_string),
            priority: base.priority(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Reference;
    use std::any::Any;
    use std::sync::Mutex;

    #[derive(Default, Clone, Copy, PartialEq)]
    enum Behavior {
        /// Finish synchronously inside start.
        #[default]
        Finish,
        /// Accept the task and run for this many updates.
        Run(u32),
        /// Refuse to start this tick.
        Wait,
        /// Fail to start.
        Fail,
    }

    #[derive(Default)]
    struct ScriptTask {
        base: TaskBase,
        behavior: Behavior,
    }

    impl Reference for ScriptTask {
        fn clear(&mut self) {
            self.base.clear();
            self.behavior = Behavior::Finish;
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
            self
        }
    }

    impl Task for ScriptTask {
        fn base(&self) -> &TaskBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut TaskBase {
            &mut self.base
        }
    }

    type StartLog = Arc<Mutex<Vec<TaskSerialId>>>;

    struct ScriptAgent {
        task: Option<Box<ScriptTask>>,
        started: StartLog,
    }

    impl TaskAgent<ScriptTask> for ScriptAgent {
        fn initialize(&mut self) {}

        fn start(&mut self, task: Box<ScriptTask>) -> StartStatus<ScriptTask> {
            match task.behavior {
                Behavior::Wait => StartStatus::HasToWait(task),
                Behavior::Fail => StartStatus::UnknownError(task),
                Behavior::Finish => {
                    self.started.lock().unwrap().push(task.base().serial_id());
                    StartStatus::Done(task)
                }
                Behavior::Run(_) => {
                    self.started.lock().unwrap().push(task.base().serial_id());
                    self.task = Some(task);
                    StartStatus::CanResume
                }
            }
        }

        fn update(&mut self, _elapsed: Duration, _real_elapsed: Duration) {
            if let Some(task) = &mut self.task {
                if let Behavior::Run(remaining) = &mut task.behavior {
                    *remaining = remaining.saturating_sub(1);
                    if *remaining == 0 {
                        task.base.mark_done();
                    }
                }
            }
        }

        fn reset(&mut self) -> Option<Box<ScriptTask>> {
            self.task.take()
        }

        fn shutdown(&mut self) {}

        fn task(&self) -> Option<&ScriptTask> {
            self.task.as_deref()
        }
    }

    fn pool_with_agents(count: usize) -> (TaskPool<ScriptTask>, Arc<ReferencePool>, StartLog) {
        let refs = Arc::new(ReferencePool::new());
        let mut pool = TaskPool::new(Arc::clone(&refs));
        let started: StartLog = Arc::default();
        for _ in 0..count {
            pool.add_agent(Box::new(ScriptAgent {
                task: None,
                started: Arc::clone(&started),
            }));
        }
        (pool, refs, started)
    }

    fn add(
        pool: &mut TaskPool<ScriptTask>,
        refs: &ReferencePool,
        priority: i32,
        behavior: Behavior,
        tag: Option<&str>,
    ) -> TaskSerialId {
        let mut task = refs.acquire::<ScriptTask>();
        task.behavior = behavior;
        task.base_mut().set_priority(priority);
        task.base_mut().set_tag(tag.map(str::to_string));
        pool.add_task(task)
    }

    fn tick(pool: &mut TaskPool<ScriptTask>) {
        pool.update(Duration::from_millis(16), Duration::from_millis(16));
    }

    #[test]
    fn tasks_start_in_descending_priority_with_stable_tie_break() {
        let (mut pool, refs, started) = pool_with_agents(1);
        let s1 = add(&mut pool, &refs, 5, Behavior::Finish, None);
        let s2 = add(&mut pool, &refs, 10, Behavior::Finish, None);
        let s3 = add(&mut pool, &refs, 5, Behavior::Finish, None);
        let s4 = add(&mut pool, &refs, 10, Behavior::Finish, None);

        tick(&mut pool);
        assert_eq!(*started.lock().unwrap(), vec![s2, s4, s1, s3]);
        assert_eq!(pool.total_task_count(), 0);
    }

    #[test]
    fn single_agent_serializes_long_running_tasks() {
        let (mut pool, refs, started) = pool_with_agents(1);
        let s1 = add(&mut pool, &refs, 0, Behavior::Run(1), None);
        let s2 = add(&mut pool, &refs, 0, Behavior::Run(1), None);

        tick(&mut pool);
        assert_eq!(*started.lock().unwrap(), vec![s1]);
        assert_eq!(pool.working_task_count(), 1);
        assert_eq!(pool.waiting_task_count(), 1);

        // Second tick drives the first task to done; the sweep and the
        // second start happen on the tick after.
        tick(&mut pool);
        assert_eq!(*started.lock().unwrap(), vec![s1]);

        tick(&mut pool);
        assert_eq!(*started.lock().unwrap(), vec![s1, s2]);
        assert_eq!(pool.waiting_task_count(), 0);
    }

    #[test]
    fn has_to_wait_keeps_the_task_queued_and_frees_the_agent() {
        let (mut pool, refs, started) = pool_with_agents(1);
        let s1 = add(&mut pool, &refs, 0, Behavior::Wait, None);
        let s2 = add(&mut pool, &refs, 0, Behavior::Finish, None);

        tick(&mut pool);
        // The waiting task keeps its queue position; the pass moves on
        // and the freed agent still serves the next task this tick.
        assert_eq!(*started.lock().unwrap(), vec![s2]);
        assert_eq!(pool.waiting_task_count(), 1);
        assert_eq!(pool.free_agent_count(), 1);
        assert_eq!(pool.task_info(s1).unwrap().status, TaskStatus::Todo);
    }

    #[test]
    fn unknown_error_releases_the_task_and_surfaces_the_failure() {
        let (mut pool, refs, _started) = pool_with_agents(1);
        let s1 = add(&mut pool, &refs, 0, Behavior::Fail, Some("dl"));

        tick(&mut pool);
        assert_eq!(pool.total_task_count(), 0);
        assert_eq!(pool.free_agent_count(), 1);

        let failures = pool.take_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].serial_id, s1);
        assert_eq!(failures[0].tag.as_deref(), Some("dl"));
        assert!(pool.take_failures().is_empty());

        let info = &refs.pool_infos()[0];
        assert_eq!(info.using_count, 0);
    }

    #[test]
    fn remove_working_task_frees_its_agent_immediately() {
        let (mut pool, refs, _started) = pool_with_agents(1);
        let s1 = add(&mut pool, &refs, 0, Behavior::Run(10), None);
        tick(&mut pool);
        assert_eq!(pool.working_agent_count(), 1);
        assert_eq!(pool.free_agent_count(), 0);

        assert!(pool.remove_task(s1));
        assert_eq!(pool.working_agent_count(), 0);
        assert_eq!(pool.free_agent_count(), 1);
        assert_eq!(refs.pool_infos()[0].using_count, 0);

        assert!(!pool.remove_task(s1), "already gone");
    }

    #[test]
    fn remove_tasks_by_tag_spans_waiting_and_working() {
        let (mut pool, refs, _started) = pool_with_agents(1);
        add(&mut pool, &refs, 0, Behavior::Run(10), Some("load"));
        tick(&mut pool);
        add(&mut pool, &refs, 0, Behavior::Finish, Some("load"));
        add(&mut pool, &refs, 0, Behavior::Finish, Some("other"));

        assert_eq!(pool.remove_tasks("load"), 2);
        assert_eq!(pool.total_task_count(), 1);
        assert_eq!(pool.free_agent_count(), 1);
    }

    #[test]
    fn task_infos_report_todo_doing_and_done() {
        let (mut pool, refs, _started) = pool_with_agents(1);
        let s1 = add(&mut pool, &refs, 10, Behavior::Run(1), None);
        let s2 = add(&mut pool, &refs, 0, Behavior::Run(1), None);

        tick(&mut pool);
        assert_eq!(pool.task_info(s1).unwrap().status, TaskStatus::Doing);
        assert_eq!(pool.task_info(s2).unwrap().status, TaskStatus::Todo);

        // Done but not yet swept.
        tick(&mut pool);
        assert_eq!(pool.task_info(s1).unwrap().status, TaskStatus::Done);

        let all = pool.all_task_infos();
        assert_eq!(all.len(), 2);
        assert!(pool.task_info(999).is_none());
    }

    #[test]
    fn paused_pool_does_not_progress() {
        let (mut pool, refs, started) = pool_with_agents(1);
        add(&mut pool, &refs, 0, Behavior::Finish, None);

        pool.set_paused(true);
        tick(&mut pool);
        assert!(started.lock().unwrap().is_empty());
        assert_eq!(pool.waiting_task_count(), 1);

        pool.set_paused(false);
        tick(&mut pool);
        assert_eq!(started.lock().unwrap().len(), 1);
    }

    #[test]
    fn shutdown_releases_tasks_and_drops_agents() {
        let (mut pool, refs, _started) = pool_with_agents(2);
        add(&mut pool, &refs, 0, Behavior::Run(10), None);
        add(&mut pool, &refs, 0, Behavior::Run(10), None);
        add(&mut pool, &refs, 0, Behavior::Finish, None);
        tick(&mut pool);

        pool.shutdown();
        assert_eq!(pool.total_task_count(), 0);
        assert_eq!(pool.total_agent_count(), 0);
        assert_eq!(refs.pool_infos()[0].using_count, 0);
    }
}
