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

//! Deferred and immediate event dispatch over per-id handler chains.
//!
//! Deferred fires go through a thread-safe FIFO and are dispatched on the
//! next tick; immediate fires dispatch on the calling stack. Handler
//! chains are recyclable lists walked through an explicit cursor stack so
//! a handler may unsubscribe — itself or any other handler — while its
//! event is being dispatched.

use crate::collections::{NodeId, RecyclableList};
use crate::error::FrameworkError;
use crate::event::{EventId, EventPoolMode};
use crate::pool::{Reference, ReferencePool};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// A poolable event payload with a numeric event id.
pub trait PoolEvent: Reference {
    /// The event id this payload dispatches under.
    fn id(&self) -> EventId;
}

/// The sender reference carried alongside an event payload.
pub type EventSender = Option<Arc<dyn Any + Send + Sync>>;

/// A subscriber callback.
///
/// Handlers receive the dispatching pool so they can subscribe or
/// unsubscribe re-entrantly. Handler identity (for duplicate detection and
/// unsubscription) is the `Arc` allocation: keep a clone of the `Arc` you
/// subscribed if you intend to unsubscribe it later.
pub type EventHandler<E> = Arc<dyn Fn(&mut EventPool<E>, &EventSender, &E) + Send + Sync>;

struct Envelope<E> {
    sender: EventSender,
    payload: Box<E>,
}

/// One in-flight dispatch walk. `next` is the node that runs after the
/// current handler returns; unsubscription redirects it when that node is
/// removed mid-dispatch.
struct DispatchCursor {
    event_id: EventId,
    next: Option<NodeId>,
}

/// A cloneable, thread-safe handle for firing deferred events from any
/// thread.
pub struct FireHandle<E: PoolEvent> {
    tx: flume::Sender<Envelope<E>>,
}

impl<E: PoolEvent> Clone for FireHandle<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E: PoolEvent> FireHandle<E> {
    /// Enqueues an event for dispatch on the owning pool's next update.
    pub fn fire(&self, sender: EventSender, payload: Box<E>) {
        if self.tx.send(Envelope { sender, payload }).is_err() {
            log::error!("failed to fire event: the owning event pool is gone");
        }
    }
}

/// Per-event-type registry of subscribers with deferred and immediate
/// dispatch.
///
/// Subscription, unsubscription, `fire_now` and `update` belong to the
/// tick thread; deferred fires may come from any thread through
/// [`fire_handle`](Self::fire_handle). Payloads are acquired from the
/// shared [`ReferencePool`] by producers and released back by the pool
/// after dispatch, in every branch.
pub struct EventPool<E: PoolEvent> {
    mode: EventPoolMode,
    handlers: HashMap<EventId, RecyclableList<EventHandler<E>>>,
    default_handler: Option<EventHandler<E>>,
    tx: flume::Sender<Envelope<E>>,
    rx: flume::Receiver<Envelope<E>>,
    cursors: Vec<DispatchCursor>,
    refs: Arc<ReferencePool>,
}

impl<E: PoolEvent> EventPool<E> {
    /// Creates an event pool with the given handler policy, releasing
    /// dispatched payloads into `refs`.
    #[must_use]
    pub fn new(mode: EventPoolMode, refs: Arc<ReferencePool>) -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            mode,
            handlers: HashMap::new(),
            default_handler: None,
            tx,
            rx,
            cursors: Vec::new(),
            refs,
        }
    }

    /// Returns the pool's mode flags.
    #[must_use]
    pub fn mode(&self) -> EventPoolMode {
        self.mode
    }

    /// Returns the number of events waiting in the deferred queue.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.rx.len()
    }

    /// Returns the number of handlers subscribed to `id`.
    #[must_use]
    pub fn handler_count(&self, id: EventId) -> usize {
        self.handlers.get(&id).map_or(0, RecyclableList::len)
    }

    /// Checks whether `handler` is subscribed to `id`.
    #[must_use]
    pub fn is_subscribed(&self, id: EventId, handler: &EventHandler<E>) -> bool {
        self.handlers
            .get(&id)
            .is_some_and(|chain| chain.iter().any(|h| Arc::ptr_eq(h, handler)))
    }

    /// Subscribes `handler` to event `id`.
    ///
    /// Fails with [`FrameworkError::MultiHandlerNotAllowed`] if the id
    /// already has a handler and the pool forbids multiples, and with
    /// [`FrameworkError::DuplicateHandler`] if this exact handler is
    /// already registered and duplicates are forbidden.
    pub fn subscribe(&mut self, id: EventId, handler: EventHandler<E>) -> Result<(), FrameworkError> {
        let chain = self.handlers.entry(id).or_default();
        if chain.is_empty() {
            chain.push_back(handler);
            return Ok(());
        }
        if !self.mode.contains(EventPoolMode::ALLOW_MULTI_HANDLER) {
            return Err(FrameworkError::MultiHandlerNotAllowed { event_id: id });
        }
        if !self.mode.contains(EventPoolMode::ALLOW_DUPLICATE_HANDLER)
            && chain.iter().any(|h| Arc::ptr_eq(h, &handler))
        {
            return Err(FrameworkError::DuplicateHandler { event_id: id });
        }
        chain.push_back(handler);
        Ok(())
    }

    /// Unsubscribes `handler` from event `id`.
    ///
    /// Safe to call from inside a handler for the event currently being
    /// dispatched: any in-flight dispatch cursor pointing at the removed
    /// node is redirected to its successor before the node leaves the
    /// chain, so dispatch never reads a removed node.
    pub fn unsubscribe(&mut self, id: EventId, handler: &EventHandler<E>) -> Result<(), FrameworkError> {
        let chain = self
            .handlers
            .get_mut(&id)
            .ok_or(FrameworkError::HandlerNotFound { event_id: id })?;

        let mut target = None;
        let mut cursor = chain.front();
        while let Some(node) = cursor {
            if chain.get(node).is_some_and(|h| Arc::ptr_eq(h, handler)) {
                target = Some(node);
                break;
            }
            cursor = chain.next(node);
        }
        let node = target.ok_or(FrameworkError::HandlerNotFound { event_id: id })?;

        let successor = chain.next(node);
        for cursor in &mut self.cursors {
            if cursor.event_id == id && cursor.next == Some(node) {
                cursor.next = successor;
            }
        }
        chain.remove_node(node);
        Ok(())
    }

    /// Replaces the fallback handler invoked when an event's id has no
    /// subscribed handlers.
    pub fn set_default_handler(&mut self, handler: Option<EventHandler<E>>) {
        self.default_handler = handler;
    }

    /// Enqueues an event for deferred dispatch on the next update.
    ///
    /// Thread-safe with respect to other fires; the payload is dispatched
    /// on the tick thread in FIFO order relative to other deferred fires.
    pub fn fire(&self, sender: EventSender, payload: Box<E>) {
        if self.tx.send(Envelope { sender, payload }).is_err() {
            log::error!("failed to fire event: queue receiver is gone");
        }
    }

    /// Returns a cloneable handle that background threads can use to fire
    /// deferred events into this pool.
    #[must_use]
    pub fn fire_handle(&self) -> FireHandle<E> {
        FireHandle {
            tx: self.tx.clone(),
        }
    }

    /// Dispatches an event synchronously on the calling stack.
    ///
    /// By contract this is restricted to the thread that owns the pool.
    /// Returns [`FrameworkError::UnhandledEvent`] when nothing handled the
    /// event and the pool forbids that; the payload is released either way.
    pub fn fire_now(&mut self, sender: EventSender, payload: Box<E>) -> Result<(), FrameworkError> {
        self.handle_event(sender, payload)
    }

    /// Drains the deferred queue as of this call and dispatches every
    /// event in FIFO order.
    ///
    /// An unhandled event on a pool that forbids no-handler dispatch is
    /// logged and the drain continues; one bad event never aborts the
    /// tick.
    pub fn update(&mut self, _elapsed: Duration, _real_elapsed: Duration) {
        let pending: Vec<Envelope<E>> = self.rx.try_iter().collect();
        for envelope in pending {
            if let Err(err) = self.handle_event(envelope.sender, envelope.payload) {
                log::error!("event dispatch failed: {err}");
            }
        }
    }

    /// Drops every queued event, releasing the payloads back to the
    /// reference pool without dispatching them.
    pub fn clear_pending(&mut self) {
        let drained: Vec<Envelope<E>> = self.rx.drain().collect();
        for envelope in drained {
            self.release_payload(envelope.payload);
        }
    }

    /// Clears pending events, all handler chains, and the default handler.
    pub fn shutdown(&mut self) {
        self.clear_pending();
        self.handlers.clear();
        self.default_handler = None;
        self.cursors.clear();
    }

    fn handle_event(&mut self, sender: EventSender, payload: Box<E>) -> Result<(), FrameworkError> {
        let id = payload.id();
        let mut outcome = Ok(());

        if self.handler_count(id) > 0 {
            let first = self.handlers.get(&id).and_then(RecyclableList::front);
            self.cursors.push(DispatchCursor {
                event_id: id,
                next: first,
            });
            let depth = self.cursors.len() - 1;
            loop {
                let current = match self.cursors[depth].next {
                    Some(node) => node,
                    None => break,
                };
                let handler = match self.handlers.get(&id).and_then(|chain| chain.get(current)) {
                    Some(handler) => handler.clone(),
                    None => break,
                };
                // Park the successor before invoking; unsubscription
                // redirects it if that node is removed mid-call.
                self.cursors[depth].next =
                    self.handlers.get(&id).and_then(|chain| chain.next(current));
                (*handler)(&mut *self, &sender, &*payload);
            }
            self.cursors.pop();
        } else if let Some(default) = self.default_handler.clone() {
            (*default)(&mut *self, &sender, &*payload);
        } else if !self.mode.contains(EventPoolMode::ALLOW_NO_HANDLER) {
            outcome = Err(FrameworkError::UnhandledEvent { event_id: id });
        }

        self.release_payload(payload);
        outcome
    }

    fn release_payload(&self, payload: Box<E>) {
        if let Err(err) = self.refs.release(payload) {
            log::error!("failed to release event payload: {err}");
        }
    }
}
