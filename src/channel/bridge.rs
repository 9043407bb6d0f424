//! Event Bridge
//!
//! Two FIFO queues shared between the channel pump and the UI:
//!
//! - **inbound**: events produced by the protocol engine, consumed by the UI
//! - **outbound**: requests produced by the UI, consumed by the next pump call
//!
//! Every event is delivered at most once; whoever pops it owns it. Consumers
//! may busy-poll with [`EventBridge::pop_inbound`], block with
//! [`EventBridge::wait_inbound`], or await [`EventBridge::next_inbound`].
//! All three drain the same queue.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;
use tracing::{trace, warn};

use crate::channel::error::{ChannelError, Result};
use crate::cliprdr::{CliprdrError, InboundEvent, OutboundEvent};

/// Invoked once an outbound request has been written, or with the reason it
/// was rejected
pub type CompletionCallback = Box<dyn FnOnce(std::result::Result<(), CliprdrError>) + Send + 'static>;

/// UI request waiting for the pump
pub struct OutboundRequest {
    /// The requested action
    pub event: OutboundEvent,
    callback: Option<CompletionCallback>,
}

impl OutboundRequest {
    /// Request without a completion callback
    pub fn new(event: OutboundEvent) -> Self {
        Self { event, callback: None }
    }

    /// Request that reports its completion
    pub fn with_callback<F>(event: OutboundEvent, callback: F) -> Self
    where
        F: FnOnce(std::result::Result<(), CliprdrError>) + Send + 'static,
    {
        Self {
            event,
            callback: Some(Box::new(callback)),
        }
    }

    /// Split into the event and its callback
    pub fn into_parts(self) -> (OutboundEvent, Option<CompletionCallback>) {
        (self.event, self.callback)
    }
}

impl fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundRequest")
            .field("event", &self.event)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Mutex-protected FIFO with blocking and async wake-ups
struct EventQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
    notify: Notify,
    capacity: usize,
}

impl<T> EventQueue<T> {
    fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
            notify: Notify::new(),
            capacity,
        }
    }

    fn push(&self, item: T) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(CliprdrError::ChannelClosed.into());
            }
            if self.capacity > 0 && state.items.len() >= self.capacity {
                return Err(ChannelError::QueueOverflow {
                    capacity: self.capacity,
                });
            }
            state.items.push_back(item);
        }

        self.available.notify_one();
        self.notify.notify_one();
        Ok(())
    }

    fn pop(&self) -> Option<T> {
        self.state.lock().items.pop_front()
    }

    fn wait(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();

        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            if self.available.wait_until(&mut state, deadline).timed_out() {
                return state.items.pop_front();
            }
        }
    }

    async fn next(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock();
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    fn close(&self) -> usize {
        let dropped = {
            let mut state = self.state.lock();
            state.closed = true;
            state.items.len()
        };
        self.available.notify_all();
        self.notify.notify_waiters();
        dropped
    }

    fn drain(&self) -> Vec<T> {
        self.state.lock().items.drain(..).collect()
    }

    fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

/// Thread-safe event queues connecting the pump and the UI
pub struct EventBridge {
    inbound: EventQueue<InboundEvent>,
    outbound: EventQueue<OutboundRequest>,
}

impl EventBridge {
    /// Create a bridge whose queues each hold at most `capacity` events
    ///
    /// A capacity of 0 means unbounded.
    pub fn new(capacity: usize) -> Self {
        Self {
            inbound: EventQueue::new(capacity),
            outbound: EventQueue::new(capacity),
        }
    }

    /// Create a bridge with unbounded queues
    pub fn unbounded() -> Self {
        Self::new(0)
    }

    /// Queue an event for the UI (never blocks)
    ///
    /// # Errors
    ///
    /// `QueueOverflow` if the inbound queue is full, `ChannelClosed` after
    /// [`EventBridge::close`].
    pub fn push_inbound(&self, event: InboundEvent) -> Result<()> {
        trace!("Inbound event queued: {:?}", event);
        self.inbound.push(event)
    }

    /// Take the oldest inbound event, if any (never blocks)
    pub fn pop_inbound(&self) -> Option<InboundEvent> {
        self.inbound.pop()
    }

    /// Wait up to `timeout` for an inbound event
    ///
    /// # Returns
    ///
    /// Some(event) if one arrived in time, None on timeout or when the bridge
    /// is closed and drained
    pub fn wait_inbound(&self, timeout: Duration) -> Option<InboundEvent> {
        self.inbound.wait(timeout)
    }

    /// Await the next inbound event
    ///
    /// Resolves to None once the bridge is closed and drained.
    pub async fn next_inbound(&self) -> Option<InboundEvent> {
        self.inbound.next().await
    }

    /// Queue a UI request for the next pump call
    pub fn push_outbound(&self, event: OutboundEvent) -> Result<()> {
        self.push_request(OutboundRequest::new(event))
    }

    /// Queue a UI request and get told when it was written or rejected
    ///
    /// If this call itself fails the callback is dropped without being
    /// invoked; the error is returned here instead.
    pub fn push_outbound_with_callback<F>(&self, event: OutboundEvent, callback: F) -> Result<()>
    where
        F: FnOnce(std::result::Result<(), CliprdrError>) + Send + 'static,
    {
        self.push_request(OutboundRequest::with_callback(event, callback))
    }

    fn push_request(&self, request: OutboundRequest) -> Result<()> {
        trace!("Outbound request queued: {:?}", request);
        self.outbound.push(request)
    }

    /// Take the oldest outbound request, if any
    pub fn pop_outbound(&self) -> Option<OutboundRequest> {
        self.outbound.pop()
    }

    /// Pending inbound events
    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }

    /// Pending outbound requests
    pub fn outbound_len(&self) -> usize {
        self.outbound.len()
    }

    /// True once [`EventBridge::close`] was called
    pub fn is_closed(&self) -> bool {
        self.inbound.is_closed()
    }

    /// Close both directions and wake every waiter
    ///
    /// Queued inbound events stay available to the UI. Queued outbound
    /// requests are dropped and their callbacks told the channel closed.
    pub fn close(&self) {
        self.inbound.close();
        self.outbound.close();

        let abandoned = self.outbound.drain();
        if !abandoned.is_empty() {
            warn!("Dropping {} outbound requests on close", abandoned.len());
        }
        for request in abandoned {
            if let (_, Some(callback)) = request.into_parts() {
                callback(Err(CliprdrError::ChannelClosed));
            }
        }
    }
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBridge")
            .field("inbound", &self.inbound_len())
            .field("outbound", &self.outbound_len())
            .field("capacity", &self.inbound.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}
