//! Mock real-time feed connection.
//!
//! Models the lifecycle of one streaming connection without doing any I/O:
//! `idle → connecting → connected`, dropping to `error` on a simulated fault
//! and retrying with linear backoff until the attempt budget is spent. A
//! manual [`ConnectionSimulator::disconnect`] is terminal until the next
//! manual [`ConnectionSimulator::connect`].
//!
//! Timers are tokio tasks. Each scheduled task carries the epoch it was
//! created in; bumping the epoch (any state change that supersedes the timer)
//! makes a late-firing task a no-op even if `abort` lost the race.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Automatic reconnects allowed before the simulator stays in `error`.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Connect latency is drawn uniformly from `[MIN, MAX)` milliseconds.
pub const CONNECT_DELAY_MIN_MS: u64 = 500;
pub const CONNECT_DELAY_MAX_MS: u64 = 1500;

/// Reconnect delay grows by this much per attempt.
pub const RECONNECT_BACKOFF_STEP_MS: u64 = 2000;

pub const CONNECTION_LOST_MESSAGE: &str = "Connection lost";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Error,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConnectionEvent {
    Connected {
        target: String,
        timestamp: DateTime<Utc>,
    },
    Disconnected {
        target: String,
        timestamp: DateTime<Utc>,
    },
    Error {
        target: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

/// Handle returned by [`ConnectionSimulator::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&ConnectionEvent) + Send + Sync>;

struct Inner {
    state: ConnectionState,
    reconnect_attempts: u32,
    epoch: u64,
    pending: Option<JoinHandle<()>>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl Inner {
    /// Invalidate any scheduled timer and return the new epoch.
    fn supersede_pending(&mut self) -> u64 {
        self.epoch += 1;
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.epoch
    }
}

/// Cloneable handle to one simulated connection. Clones share state.
#[derive(Clone)]
pub struct ConnectionSimulator {
    target: Arc<str>,
    max_reconnect_attempts: u32,
    inner: Arc<Mutex<Inner>>,
}

impl ConnectionSimulator {
    pub fn new(target: impl Into<String>, max_reconnect_attempts: u32) -> Self {
        Self {
            target: Arc::from(target.into()),
            max_reconnect_attempts,
            inner: Arc::new(Mutex::new(Inner {
                state: ConnectionState::Idle,
                reconnect_attempts: 0,
                epoch: 0,
                pending: None,
                listeners: Vec::new(),
                next_subscription: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.lock().reconnect_attempts
    }

    pub fn max_reconnect_attempts(&self) -> u32 {
        self.max_reconnect_attempts
    }

    /// True while an automatic reconnect is waiting out its backoff.
    pub fn is_reconnect_scheduled(&self) -> bool {
        let inner = self.lock();
        inner.state == ConnectionState::Error && inner.pending.is_some()
    }

    /// Register a listener. Events are delivered synchronously in registration order.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_subscription);
        inner.next_subscription += 1;
        inner.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(sid, _)| *sid != id);
        inner.listeners.len() != before
    }

    /// Manual connect. Resets the reconnect budget.
    pub fn connect(&self) {
        let mut inner = self.lock();
        inner.reconnect_attempts = 0;
        self.start_connecting(&mut inner);
    }

    /// Manual, immediate disconnect. Cancels any pending connect or reconnect.
    pub fn disconnect(&self) {
        {
            let mut inner = self.lock();
            inner.supersede_pending();
            inner.state = ConnectionState::Disconnected;
        }
        info!(target_url = %self.target, "Feed disconnected");
        self.emit(&ConnectionEvent::Disconnected {
            target: self.target.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Drop a live connection as if the remote end failed.
    ///
    /// No-op unless connected. Schedules an automatic reconnect while the
    /// attempt budget lasts; afterwards the simulator stays in `error` until
    /// a manual [`connect`](Self::connect).
    pub fn simulate_disconnection(&self) {
        let attempt = {
            let mut inner = self.lock();
            if inner.state != ConnectionState::Connected {
                return;
            }
            let epoch = inner.supersede_pending();
            inner.state = ConnectionState::Error;

            if inner.reconnect_attempts < self.max_reconnect_attempts {
                inner.reconnect_attempts += 1;
                let attempt = inner.reconnect_attempts;
                let backoff = Duration::from_millis(RECONNECT_BACKOFF_STEP_MS * attempt as u64);
                let this = self.clone();
                inner.pending = Some(tokio::spawn(async move {
                    tokio::time::sleep(backoff).await;
                    this.reconnect(epoch);
                }));
                Some((attempt, backoff))
            } else {
                None
            }
        };

        match attempt {
            Some((attempt, backoff)) => warn!(
                target_url = %self.target,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "Feed connection lost, reconnect scheduled"
            ),
            None => warn!(
                target_url = %self.target,
                max_attempts = self.max_reconnect_attempts,
                "Feed connection lost, reconnect budget exhausted"
            ),
        }

        self.emit(&ConnectionEvent::Error {
            target: self.target.to_string(),
            message: CONNECTION_LOST_MESSAGE.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Cancel outstanding timers without emitting anything. State is left as is.
    pub fn shutdown(&self) {
        self.lock().supersede_pending();
    }

    fn start_connecting(&self, inner: &mut Inner) {
        let epoch = inner.supersede_pending();
        inner.state = ConnectionState::Connecting;

        let delay = Duration::from_millis(
            rand::thread_rng().gen_range(CONNECT_DELAY_MIN_MS..CONNECT_DELAY_MAX_MS),
        );
        debug!(target_url = %self.target, delay_ms = delay.as_millis() as u64, "Connecting");

        let this = self.clone();
        inner.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.finish_connect(epoch);
        }));
    }

    fn finish_connect(&self, epoch: u64) {
        {
            let mut inner = self.lock();
            if inner.epoch != epoch || inner.state != ConnectionState::Connecting {
                return;
            }
            inner.state = ConnectionState::Connected;
            inner.pending = None;
        }
        info!(target_url = %self.target, "Feed connected");
        self.emit(&ConnectionEvent::Connected {
            target: self.target.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn reconnect(&self, epoch: u64) {
        let mut inner = self.lock();
        if inner.epoch != epoch || inner.state != ConnectionState::Error {
            return;
        }
        // Detach our own handle so start_connecting doesn't abort the running task.
        inner.pending = None;
        debug!(
            target_url = %self.target,
            attempt = inner.reconnect_attempts,
            "Reconnecting"
        );
        self.start_connecting(&mut inner);
    }

    /// Deliver to a snapshot of listeners, outside the lock so listeners may
    /// (un)subscribe re-entrantly.
    fn emit(&self, event: &ConnectionEvent) {
        let listeners: Vec<Listener> = self
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for ConnectionSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("ConnectionSimulator")
            .field("target", &self.target)
            .field("state", &inner.state)
            .field("reconnect_attempts", &inner.reconnect_attempts)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}
