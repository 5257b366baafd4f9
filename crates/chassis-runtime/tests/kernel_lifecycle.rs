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

//! End-to-end kernel lifecycle: modules ticking in priority order,
//! pooled payloads flowing through events and tasks, and a clean
//! teardown.

use chassis_core::event::{EventHandler, EventId, EventPoolMode, PoolEvent};
use chassis_core::pool::Reference;
use chassis_core::task::{StartStatus, Task, TaskAgent, TaskBase};
use chassis_runtime::{EventModule, Kernel, TaskModule};
use std::any::Any;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TICK_EVENT: EventId = 7;

#[derive(Default)]
struct TickEvent {
    frame: u32,
}

impl Reference for TickEvent {
    fn clear(&mut self) {
        self.frame = 0;
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

impl PoolEvent for TickEvent {
    fn id(&self) -> EventId {
        TICK_EVENT
    }
}

#[derive(Default)]
struct BurnTask {
    base: TaskBase,
    ticks_left: u32,
}

impl Reference for BurnTask {
    fn clear(&mut self) {
        self.base.clear();
        self.ticks_left = 0;
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

impl Task for BurnTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }
}

#[derive(Default)]
struct BurnAgent {
    task: Option<Box<BurnTask>>,
}

impl TaskAgent<BurnTask> for BurnAgent {
    fn initialize(&mut self) {}

    fn start(&mut self, task: Box<BurnTask>) -> StartStatus<BurnTask> {
        if task.ticks_left == 0 {
            return StartStatus::Done(task);
        }
        self.task = Some(task);
        StartStatus::CanResume
    }

    fn update(&mut self, _elapsed: Duration, _real_elapsed: Duration) {
        if let Some(task) = &mut self.task {
            task.ticks_left -= 1;
            if task.ticks_left == 0 {
                task.base_mut().mark_done();
            }
        }
    }

    fn reset(&mut self) -> Option<Box<BurnTask>> {
        self.task.take()
    }

    fn shutdown(&mut self) {}

    fn task(&self) -> Option<&BurnTask> {
        self.task.as_deref()
    }
}

fn step(kernel: &mut Kernel) {
    kernel.update(Duration::from_millis(16), Duration::from_millis(16));
}

#[test]
fn kernel_drives_events_and_tasks_to_completion() {
    let mut kernel = Kernel::new();
    let refs = Arc::clone(kernel.reference_pool());

    let dispatched = Arc::new(AtomicU32::new(0));
    let mut events =
        EventModule::<TickEvent>::new(EventPoolMode::DEFAULT, Arc::clone(&refs), 20);
    let handler: EventHandler<TickEvent> = {
        let dispatched = Arc::clone(&dispatched);
        Arc::new(move |_pool, _sender, _event| {
            dispatched.fetch_add(1, Ordering::SeqCst);
        })
    };
    events.pool_mut().subscribe(TICK_EVENT, handler).unwrap();
    kernel.registry_mut().register(events).unwrap();

    let mut tasks = TaskModule::<BurnTask>::new(Arc::clone(&refs), 10);
    tasks.pool_mut().add_agent(Box::new(BurnAgent::default()));
    for ticks in [2u32, 1] {
        let mut task = refs.acquire::<BurnTask>();
        task.ticks_left = ticks;
        tasks.pool_mut().add_task(task);
    }
    kernel.registry_mut().register(tasks).unwrap();
    assert_eq!(kernel.registry().module_count(), 2);

    for frame in 0..10u32 {
        let events = kernel
            .registry_mut()
            .get_mut::<EventModule<TickEvent>>()
            .unwrap();
        let mut tick = refs.acquire::<TickEvent>();
        tick.frame = frame;
        events.pool().fire(None, tick);
        step(&mut kernel);
    }

    assert_eq!(dispatched.load(Ordering::SeqCst), 10);
    let tasks = kernel.registry().get::<TaskModule<BurnTask>>().unwrap();
    assert_eq!(tasks.pool().total_task_count(), 0, "both tasks drained");
    assert_eq!(tasks.pool().free_agent_count(), 1);

    // Every pooled payload is back in its unused queue.
    for info in refs.pool_infos() {
        assert_eq!(info.using_count, 0, "{} still in use", info.type_name);
    }

    kernel.shutdown();
    assert_eq!(kernel.registry().module_count(), 0);
    assert_eq!(refs.collection_count(), 0);
}

#[test]
fn shutdown_is_clean_with_work_still_queued() {
    let mut kernel = Kernel::new();
    let refs = Arc::clone(kernel.reference_pool());

    let mut events =
        EventModule::<TickEvent>::new(EventPoolMode::ALLOW_NO_HANDLER, Arc::clone(&refs), 20);
    events.pool().fire(None, refs.acquire::<TickEvent>());
    kernel.registry_mut().register(events).unwrap();

    let mut tasks = TaskModule::<BurnTask>::new(Arc::clone(&refs), 10);
    tasks.pool_mut().add_agent(Box::new(BurnAgent::default()));
    let mut task = refs.acquire::<BurnTask>();
    task.ticks_left = 100;
    tasks.pool_mut().add_task(task);
    kernel.registry_mut().register(tasks).unwrap();

    kernel.shutdown();
    assert_eq!(kernel.registry().module_count(), 0);
    assert_eq!(refs.collection_count(), 0);
}
