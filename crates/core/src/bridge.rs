// Thread-safe bridge from engine callbacks to the single registered observer.
// Engine threads are not the observer's threads, so every delivery attaches the
// observer's execution context on demand and releases it again before returning.

use crate::config::BridgeConfig;
use crate::engine::EngineEvent;
use crate::error::{Result, SessionError};
use crate::events::{EventPayload, EventRecord};
use log::{debug, error};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Observer of normalized events.
/// Implementations should be lightweight and non-blocking: they run on engine threads.
pub trait EventObserver: Send + Sync {
    /// Called once per event with its wire form.
    /// Return `MissingCallbackEntry` if the observer cannot take the call.
    fn notify(&self, event_type: i32, payload: &EventPayload) -> Result<()>;
}

/// The observer's execution context (for a JVM: the thread's attachment to it)
pub trait ExecutionContext: Send + Sync {
    /// Whether the calling thread already has the context
    fn is_attached(&self) -> bool;

    fn attach(&self) -> Result<()>;

    fn detach(&self);
}

/// Context for in-process observers: every thread already has it
pub struct InProcessContext;

impl ExecutionContext for InProcessContext {
    fn is_attached(&self) -> bool {
        true
    }

    fn attach(&self) -> Result<()> {
        Ok(())
    }

    fn detach(&self) {}
}

/// Holds the context for the current call; detaches on drop only if it attached
pub struct ContextGuard<'a> {
    context: &'a dyn ExecutionContext,
    acquired: bool,
}

impl<'a> ContextGuard<'a> {
    pub fn enter(context: &'a dyn ExecutionContext) -> Result<Self> {
        if context.is_attached() {
            return Ok(Self {
                context,
                acquired: false,
            });
        }
        context.attach()?;
        Ok(Self {
            context,
            acquired: true,
        })
    }

    /// True if this guard attached the thread and will detach it
    pub fn acquired(&self) -> bool {
        self.acquired
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if self.acquired {
            self.context.detach();
        }
    }
}

/// Prevents excessive position deliveries; other events pass through
struct PositionThrottle {
    last_delivery: Mutex<Option<Instant>>,
    interval: Duration,
}

impl PositionThrottle {
    fn new(interval: Duration) -> Self {
        Self {
            last_delivery: Mutex::new(None),
            interval,
        }
    }

    fn admit(&self, record: &EventRecord) -> bool {
        if self.interval.is_zero() || !matches!(record, EventRecord::PositionChanged(_)) {
            return true;
        }
        let mut last = self.last_delivery.lock();
        match *last {
            Some(at) if at.elapsed() < self.interval => false,
            _ => {
                *last = Some(Instant::now());
                true
            }
        }
    }
}

/// Delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub delivered: u64,
    /// No observer registered, or throttled
    pub dropped: u64,
    /// Observer registered but the call could not be made
    pub failed: u64,
}

pub struct EventBridge {
    observer: RwLock<Option<Arc<dyn EventObserver>>>,
    context: Arc<dyn ExecutionContext>,
    throttle: PositionThrottle,
    delivered: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

impl EventBridge {
    pub fn new(context: Arc<dyn ExecutionContext>, config: BridgeConfig) -> Self {
        Self {
            observer: RwLock::new(None),
            context,
            throttle: PositionThrottle::new(config.position_interval),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Bridge for observers living in this process
    pub fn in_process() -> Self {
        Self::new(Arc::new(InProcessContext), BridgeConfig::default())
    }

    /// Register the observer, replacing any previous one
    pub fn set_observer(&self, observer: Arc<dyn EventObserver>) {
        if self.observer.write().replace(observer).is_some() {
            debug!("Replaced previous event observer");
        }
    }

    pub fn clear_observer(&self) {
        self.observer.write().take();
    }

    pub fn has_observer(&self) -> bool {
        self.observer.read().is_some()
    }

    /// Deliver one record. Never fails: problems are logged and the event dropped.
    pub fn deliver(&self, record: EventRecord) {
        match self.try_deliver(&record) {
            Ok(true) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(SessionError::MissingObserver) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("EventBridge: no observer, dropping {:?}", record);
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                error!("EventBridge: dropping {:?}: {}", record, e);
            }
        }
    }

    /// Normalize and deliver a player event
    pub fn forward(&self, event: &EngineEvent) {
        if let Some(record) = EventRecord::from_engine(event) {
            self.deliver(record);
        }
    }

    /// Ok(false) when throttled
    fn try_deliver(&self, record: &EventRecord) -> Result<bool> {
        // Clone out so clear_observer never waits on a delivery
        let observer = self.observer.read().clone();
        let Some(observer) = observer else {
            return Err(SessionError::MissingObserver);
        };

        if !self.throttle.admit(record) {
            return Ok(false);
        }

        let guard = ContextGuard::enter(self.context.as_ref())?;
        if guard.acquired() {
            debug!("EventBridge: attached context for {}", record.event_type());
        }

        let payload = record.to_payload();
        let result = observer.notify(record.event_type(), &payload);
        drop(payload);
        drop(guard);

        result.map(|_| true)
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Records everything it is notified of; for tests
#[cfg(test)]
pub struct TestObserver {
    events: Mutex<Vec<EventRecord>>,
}

#[cfg(test)]
impl TestObserver {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn get_events(&self) -> Vec<EventRecord> {
        self.events.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[cfg(test)]
impl EventObserver for TestObserver {
    fn notify(&self, event_type: i32, payload: &EventPayload) -> Result<()> {
        let record = EventRecord::from_wire(event_type, payload).ok_or_else(|| {
            SessionError::MissingCallbackEntry(format!("unknown event {}", event_type))
        })?;
        self.events.lock().push(record);
        Ok(())
    }
}
