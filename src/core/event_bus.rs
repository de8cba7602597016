//! Event bus between run workers and the UI thread.
//!
//! Workers hold an [`EventEmitter`]; the UI thread owns the [`EventBus`].
//! Every emitted event is handed to the typed subscribers right away (on
//! the emitting thread) and also parked in a bounded queue that the UI
//! drains with [`EventBus::poll`] once per frame.
//!
//! Subscribers of one event type are called in subscription order. There
//! is no ordering guarantee between different event types for callbacks;
//! the queue itself keeps emission order.
//!
//! Node UIs redraw when these events arrive instead of polling node state
//! on a timer.

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use log::{trace, warn};

/// Queue cap; on overflow the oldest half is dropped
const QUEUE_CAP: usize = 1000;

/// Anything that can travel over the bus.
pub trait Event: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn event_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn event_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

pub type BoxedEvent = Box<dyn Event>;

type Handler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// State shared by the bus and all of its emitters.
#[derive(Default)]
struct Shared {
    handlers: RwLock<HashMap<TypeId, Vec<Handler>>>,
    pending: Mutex<VecDeque<BoxedEvent>>,
}

impl Shared {
    fn dispatch(&self, event: BoxedEvent) {
        // Deref the box first: `Box<dyn Event>` is itself an `Event`
        let any = (*event).as_any();
        trace!("bus: {}", (*event).event_name());

        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&any.type_id())
            .cloned()
            .unwrap_or_default();
        for handler in &handlers {
            handler(any);
        }

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if pending.len() >= QUEUE_CAP {
            let drop_count = pending.len() / 2;
            warn!("event queue full ({} pending), dropping oldest {}", pending.len(), drop_count);
            pending.drain(..drop_count);
        }
        pending.push_back(event);
    }
}

/// UI-side end of the bus.
#[derive(Clone, Default)]
pub struct EventBus {
    shared: Arc<Shared>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every event of type `E`, on the emitting thread.
    pub fn subscribe<E, F>(&self, handler: F)
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                handler(event);
            }
        });
        self.shared
            .handlers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(TypeId::of::<E>())
            .or_default()
            .push(handler);
    }

    pub fn emit<E: Event>(&self, event: E) {
        self.shared.dispatch(Box::new(event));
    }

    /// Queued events, oldest first. Empties the queue.
    pub fn poll(&self) -> Vec<BoxedEvent> {
        let mut pending = self.shared.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.drain(..).collect()
    }

    /// Sending end for worker threads.
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Worker-side end of an [`EventBus`].
#[derive(Clone)]
pub struct EventEmitter {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self.shared.pending.lock().map(|q| q.len()).unwrap_or(0);
        f.debug_struct("EventEmitter").field("pending", &pending).finish()
    }
}

impl EventEmitter {
    pub fn emit<E: Event>(&self, event: E) {
        self.shared.dispatch(Box::new(event));
    }
}

/// Emitter a runner may be built without (headless runs).
#[derive(Clone, Default, Debug)]
pub struct RunEventEmitter {
    inner: Option<EventEmitter>,
}

impl RunEventEmitter {
    /// Drops every event
    pub fn dummy() -> Self {
        Self { inner: None }
    }

    pub fn from_emitter(emitter: EventEmitter) -> Self {
        Self { inner: Some(emitter) }
    }

    pub fn emit<E: Event>(&self, event: E) {
        if let Some(emitter) = &self.inner {
            emitter.emit(event);
        }
    }
}

/// Borrow a queued event as its concrete type.
///
/// Goes through `**event`: calling `as_any()` on the box itself would pick
/// the blanket impl for `Box<dyn Event>` and never match `E`.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::run_events::{NodeProgressChangedEvent, RunFinishedEvent, RunId};
    use crate::entities::{NodeId, ProgressState};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn progress(state: ProgressState) -> NodeProgressChangedEvent {
        NodeProgressChangedEvent {
            node: NodeId::new(),
            state,
        }
    }

    #[test]
    fn test_handlers_see_only_their_type() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        bus.subscribe::<NodeProgressChangedEvent, _>(move |e| {
            if e.state == ProgressState::Clean {
                h.fetch_add(1, Ordering::SeqCst);
            }
        });

        bus.emit(progress(ProgressState::Clean));
        bus.emit(progress(ProgressState::Queued));
        bus.emit(RunFinishedEvent {
            run: RunId::new(),
            target: NodeId::new(),
            nodes: Vec::new(),
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_poll_keeps_emission_order() {
        let bus = EventBus::new();
        bus.emit(progress(ProgressState::Queued));
        bus.emit(RunFinishedEvent {
            run: RunId::new(),
            target: NodeId::new(),
            nodes: Vec::new(),
        });

        let events = bus.poll();
        assert_eq!(events.len(), 2);
        assert_eq!(
            downcast_event::<NodeProgressChangedEvent>(&events[0]).map(|e| e.state),
            Some(ProgressState::Queued)
        );
        assert!(downcast_event::<RunFinishedEvent>(&events[1]).is_some());
        assert!(bus.poll().is_empty());
    }

    #[test]
    fn test_worker_emitter_reaches_ui_queue() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        bus.subscribe::<NodeProgressChangedEvent, _>(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        let emitter = RunEventEmitter::from_emitter(bus.emitter());
        std::thread::Builder::new()
            .name("bus-test".into())
            .spawn(move || emitter.emit(progress(ProgressState::Processing)))
            .unwrap()
            .join()
            .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.poll().len(), 1);
    }

    #[test]
    fn test_overflow_drops_oldest_half() {
        let bus = EventBus::new();
        for i in 0..=QUEUE_CAP {
            bus.emit(i);
        }
        let events = bus.poll();
        assert_eq!(events.len(), QUEUE_CAP / 2 + 1);
        assert_eq!(downcast_event::<usize>(&events[0]), Some(&(QUEUE_CAP / 2)));
    }

    #[test]
    fn test_dummy_emitter_drops_events() {
        RunEventEmitter::dummy().emit(progress(ProgressState::Dirty));
    }
}
