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

//! A small host driving the kernel through a fixed-step frame loop:
//! pooled ping events dispatched per frame and a batch of countdown
//! tasks drained through a bounded set of agents.

use anyhow::{Context, Result};
use chassis_core::event::{EventHandler, EventId, EventPoolMode, PoolEvent};
use chassis_core::pool::Reference;
use chassis_core::task::{StartStatus, Task, TaskAgent, TaskBase};
use chassis_runtime::{EventModule, Kernel, TaskModule};
use serde::Deserialize;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

const PING_EVENT: EventId = 1;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RuntimeConfig {
    frames: u32,
    step_ms: u64,
    agents: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frames: 8,
            step_ms: 16,
            agents: 2,
        }
    }
}

fn load_config() -> Result<RuntimeConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file '{path}'"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing config file '{path}'"))
        }
        None => Ok(RuntimeConfig::default()),
    }
}

#[derive(Default)]
struct PingEvent {
    frame: u32,
}

impl Reference for PingEvent {
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

impl PoolEvent for PingEvent {
    fn id(&self) -> EventId {
        PING_EVENT
    }
}

#[derive(Default)]
struct CountdownTask {
    base: TaskBase,
    remaining: u32,
}

impl Reference for CountdownTask {
    fn clear(&mut self) {
        self.base.clear();
        self.remaining = 0;
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}

impl Task for CountdownTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }
    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }
}

#[derive(Default)]
struct CountdownAgent {
    task: Option<Box<CountdownTask>>,
}

impl TaskAgent<CountdownTask> for CountdownAgent {
    fn initialize(&mut self) {}

    fn start(&mut self, task: Box<CountdownTask>) -> StartStatus<CountdownTask> {
        if task.remaining == 0 {
            return StartStatus::Done(task);
        }
        log::debug!(
            "countdown {} starts at {}",
            task.base().serial_id(),
            task.remaining
        );
        self.task = Some(task);
        StartStatus::CanResume
    }

    fn update(&mut self, _elapsed: Duration, _real_elapsed: Duration) {
        if let Some(task) = &mut self.task {
            task.remaining -= 1;
            if task.remaining == 0 {
                log::debug!("countdown {} finished", task.base().serial_id());
                task.base_mut().mark_done();
            }
        }
    }

    fn reset(&mut self) -> Option<Box<CountdownTask>> {
        self.task.take()
    }

    fn shutdown(&mut self) {}

    fn task(&self) -> Option<&CountdownTask> {
        self.task.as_deref()
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let config = load_config()?;
    log::info!("starting kernel demo: {config:?}");

    let mut kernel = Kernel::new();
    let refs = Arc::clone(kernel.reference_pool());
    refs.set_strict_check(true);

    let mut events =
        EventModule::<PingEvent>::new(EventPoolMode::DEFAULT, Arc::clone(&refs), 20);
    let handler: EventHandler<PingEvent> = Arc::new(|_pool, _sender, event| {
        log::info!("ping dispatched for frame {}", event.frame);
    });
    events.pool_mut().subscribe(PING_EVENT, handler)?;
    kernel.registry_mut().register(events)?;

    let mut tasks = TaskModule::<CountdownTask>::new(Arc::clone(&refs), 10);
    for _ in 0..config.agents {
        tasks.pool_mut().add_agent(Box::new(CountdownAgent::default()));
    }
    for ticks in 1..=4u32 {
        let mut task = refs.acquire::<CountdownTask>();
        task.remaining = ticks;
        task.base_mut().set_priority(ticks as i32);
        task.base_mut().set_tag(Some("countdown".to_string()));
        tasks.pool_mut().add_task(task);
    }
    kernel.registry_mut().register(tasks)?;

    let step = Duration::from_millis(config.step_ms);
    for frame in 0..config.frames {
        let events = kernel
            .registry_mut()
            .get_mut::<EventModule<PingEvent>>()
            .context("event module is registered")?;
        let mut ping = refs.acquire::<PingEvent>();
        ping.frame = frame;
        events.pool().fire(None, ping);

        kernel.update(step, step);
    }

    if let Some(tasks) = kernel.registry().get::<TaskModule<CountdownTask>>() {
        println!(
            "{}",
            serde_json::to_string_pretty(&tasks.pool().all_task_infos())?
        );
    }
    println!("{}", serde_json::to_string_pretty(&refs.pool_infos())?);

    kernel.shutdown();
    Ok(())
}
