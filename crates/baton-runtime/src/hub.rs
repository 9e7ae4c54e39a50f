//! Per-task pub/sub with a coalescing token buffer.
//!
//! Publishing is non-blocking: each subscriber gets a bounded channel and a
//! full channel drops the event for that subscriber only. Slow subscribers
//! lose fidelity; they never stall the orchestrator.
//!
//! Fine-grained token deltas from streaming tools are buffered per
//! (task, step) and flushed every 100 ms as one coalesced `token` event, so
//! chunk-per-byte model output does not saturate the wire.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use baton_core::TokenCallback;

/// Bounded capacity of each subscriber channel.
pub const SUBSCRIBER_CHANNEL_CAPACITY: usize = 16;

const TOKEN_FLUSH_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);

/// Event kinds carried over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TaskStatus,
    Plan,
    StepStatus,
    Result,
    Token,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TaskStatus => "task_status",
            EventKind::Plan => "plan",
            EventKind::StepStatus => "step_status",
            EventKind::Result => "result",
            EventKind::Token => "token",
        }
    }
}

/// The event envelope subscribers receive, delivered by value.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub event: EventKind,
    pub task_id: String,
    pub payload: Value,
}

impl Event {
    pub fn new(event: EventKind, task_id: impl Into<String>, payload: Value) -> Self {
        Self {
            event,
            task_id: task_id.into(),
            payload,
        }
    }
}

struct SubscriberSlot {
    id: u64,
    tx: mpsc::Sender<Event>,
}

struct TokenFlusher {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct TokenState {
    /// task id -> step id -> pending concatenated chunks
    buffers: HashMap<String, HashMap<String, String>>,
    flushers: HashMap<String, TokenFlusher>,
}

/// Per-task event fan-out.
#[derive(Default)]
pub struct EventHub {
    subscribers: RwLock<HashMap<String, Vec<SubscriberSlot>>>,
    next_subscriber_id: AtomicU64,
    tokens: Mutex<TokenState>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for one task. Dropping the returned
    /// subscription unsubscribes.
    pub fn subscribe(self: &Arc<Self>, task_id: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .entry(task_id.to_string())
            .or_default()
            .push(SubscriberSlot { id, tx });
        Subscription {
            hub: Arc::clone(self),
            task_id: task_id.to_string(),
            id,
            rx,
        }
    }

    fn unsubscribe(&self, task_id: &str, id: u64) {
        let mut subscribers = self.subscribers.write();
        if let Some(slots) = subscribers.get_mut(task_id) {
            slots.retain(|slot| slot.id != id);
            if slots.is_empty() {
                subscribers.remove(task_id);
            }
        }
    }

    /// Fan an event out to every subscriber of its task, without blocking.
    pub fn publish(&self, event: Event) {
        let subscribers = self.subscribers.read();
        let Some(slots) = subscribers.get(&event.task_id) else {
            return;
        };
        for slot in slots {
            if slot.tx.try_send(event.clone()).is_err() {
                // Full or closed channel: drop for this subscriber only.
                tracing::trace!(task_id = %event.task_id, "subscriber channel full, event dropped");
            }
        }
    }

    /// Start (or reuse) the token coalescer for a task and hand back an
    /// appender for streaming tools.
    pub fn token_appender(self: &Arc<Self>, task_id: &str) -> TokenAppender {
        let mut state = self.tokens.lock();
        state.buffers.entry(task_id.to_string()).or_default();
        if !state.flushers.contains_key(task_id) {
            let stop = CancellationToken::new();
            let hub = Arc::clone(self);
            let task = task_id.to_string();
            let stopped = stop.clone();
            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(TOKEN_FLUSH_INTERVAL);
                loop {
                    tokio::select! {
                        _ = stopped.cancelled() => break,
                        _ = ticker.tick() => hub.flush_tokens(&task),
                    }
                }
            });
            state
                .flushers
                .insert(task_id.to_string(), TokenFlusher { stop, handle });
        }
        TokenAppender {
            hub: Arc::clone(self),
            task_id: task_id.to_string(),
        }
    }

    fn flush_tokens(&self, task_id: &str) {
        let pending: Vec<(String, String)> = {
            let mut state = self.tokens.lock();
            match state.buffers.get_mut(task_id) {
                Some(buffer) if !buffer.is_empty() => {
                    buffer.drain().filter(|(_, s)| !s.is_empty()).collect()
                }
                _ => return,
            }
        };
        for (step_id, chunk) in pending {
            self.publish(Event::new(
                EventKind::Token,
                task_id,
                json!({"step_id": step_id, "chunk": chunk}),
            ));
        }
    }

    /// Stop the coalescer for a task and synchronously flush any remainder.
    pub fn stop_token_appender(&self, task_id: &str) {
        let (flusher, remainder) = {
            let mut state = self.tokens.lock();
            (
                state.flushers.remove(task_id),
                state.buffers.remove(task_id),
            )
        };
        if let Some(flusher) = flusher {
            flusher.stop.cancel();
            drop(flusher.handle);
        }
        for (step_id, chunk) in remainder.unwrap_or_default() {
            if chunk.is_empty() {
                continue;
            }
            self.publish(Event::new(
                EventKind::Token,
                task_id,
                json!({"step_id": step_id, "chunk": chunk}),
            ));
        }
    }
}

/// Buffers token chunks per (task, step) for the coalescer.
#[derive(Clone)]
pub struct TokenAppender {
    hub: Arc<EventHub>,
    task_id: String,
}

impl TokenAppender {
    /// Append a chunk for a step. Empty step ids and chunks are ignored.
    pub fn append(&self, step_id: &str, chunk: &str) {
        if step_id.is_empty() || chunk.is_empty() {
            return;
        }
        let mut state = self.hub.tokens.lock();
        state
            .buffers
            .entry(self.task_id.clone())
            .or_default()
            .entry(step_id.to_string())
            .or_default()
            .push_str(chunk);
    }

    /// A token callback bound to one step, suitable for a `RunContext`.
    pub fn step_callback(&self, step_id: &str) -> TokenCallback {
        let appender = self.clone();
        let step_id = step_id.to_string();
        Arc::new(move |chunk: String| appender.append(&step_id, &chunk))
    }
}

/// A live subscription; dropping it unsubscribes and closes the channel.
pub struct Subscription {
    hub: Arc<EventHub>,
    task_id: String,
    id: u64,
    rx: mpsc::Receiver<Event>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.unsubscribe(&self.task_id, self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_publish_reaches_subscriber() {
        tokio_test::block_on(async {
            let hub = Arc::new(EventHub::new());
            let mut sub = hub.subscribe("t1");
            hub.publish(Event::new(EventKind::TaskStatus, "t1", json!({"status": "PENDING"})));
            let event = sub.recv().await.expect("event");
            assert_eq!(event.event, EventKind::TaskStatus);
            assert_eq!(event.task_id, "t1");
        });
    }

    #[test]
    fn test_publish_is_scoped_per_task() {
        tokio_test::block_on(async {
            let hub = Arc::new(EventHub::new());
            let mut sub = hub.subscribe("t1");
            hub.publish(Event::new(EventKind::TaskStatus, "t2", Value::Null));
            assert!(sub.try_recv().is_none());
        });
    }

    #[test]
    fn test_publish_never_blocks_on_slow_subscriber() {
        tokio_test::block_on(async {
            let hub = Arc::new(EventHub::new());
            let _sub = hub.subscribe("t1");
            // Far more events than the channel holds; publish must return.
            for i in 0..SUBSCRIBER_CHANNEL_CAPACITY * 20 {
                hub.publish(Event::new(EventKind::Token, "t1", json!({"i": i})));
            }
        });
    }

    #[test]
    fn test_drop_unsubscribes_and_clears_task_entry() {
        tokio_test::block_on(async {
            let hub = Arc::new(EventHub::new());
            let sub = hub.subscribe("t1");
            assert_eq!(hub.subscribers.read().len(), 1);
            drop(sub);
            assert!(hub.subscribers.read().is_empty());
        });
    }

    #[test]
    fn test_tokens_coalesce_into_one_event_per_step() {
        tokio_test::block_on(async {
            let hub = Arc::new(EventHub::new());
            let mut sub = hub.subscribe("t1");
            let appender = hub.token_appender("t1");
            appender.append("step1", "a");
            appender.append("step1", "b");
            appender.append("step1", "c");

            tokio::time::sleep(Duration::from_millis(250)).await;
            let event = sub.recv().await.expect("coalesced token event");
            assert_eq!(event.event, EventKind::Token);
            assert_eq!(event.payload.get("step_id"), Some(&json!("step1")));
            assert_eq!(event.payload.get("chunk"), Some(&json!("abc")));
            assert!(sub.try_recv().is_none());
            hub.stop_token_appender("t1");
        });
    }

    #[test]
    fn test_stop_flushes_remainder_synchronously() {
        tokio_test::block_on(async {
            let hub = Arc::new(EventHub::new());
            let mut sub = hub.subscribe("t1");
            let appender = hub.token_appender("t1");
            appender.append("step9", "tail");
            // No flush window has elapsed; stop must emit the remainder.
            hub.stop_token_appender("t1");
            let event = sub.recv().await.expect("flushed remainder");
            assert_eq!(event.payload.get("chunk"), Some(&json!("tail")));
        });
    }

    #[test]
    fn test_empty_chunks_and_step_ids_are_ignored() {
        tokio_test::block_on(async {
            let hub = Arc::new(EventHub::new());
            let mut sub = hub.subscribe("t1");
            let appender = hub.token_appender("t1");
            appender.append("", "chunk");
            appender.append("step1", "");
            hub.stop_token_appender("t1");
            assert!(sub.try_recv().is_none());
        });
    }

    #[test]
    fn test_step_callback_feeds_the_buffer() {
        tokio_test::block_on(async {
            let hub = Arc::new(EventHub::new());
            let mut sub = hub.subscribe("t1");
            let appender = hub.token_appender("t1");
            let callback = appender.step_callback("step1");
            callback("hel".to_string());
            callback("lo".to_string());
            hub.stop_token_appender("t1");
            let event = sub.recv().await.expect("token event");
            assert_eq!(event.payload.get("chunk"), Some(&json!("hello")));
        });
    }
}
