use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::config::GateConfig;
use crate::core::observability::{self, SignalClass};
use crate::events::{InteractionKind, ListenerOptions, Subscriptions, Window};
use crate::log;
use crate::logging::LogLevel;

/// Evidence of human-like activity gathered so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSnapshot {
    pub moved: bool,
    pub scrolled: bool,
    pub typed: bool,
    pub seconds_elapsed: u64,
}

impl SignalSnapshot {
    pub fn gate(&self, threshold_seconds: u64) -> GateDecision {
        GateDecision::evaluate(self, threshold_seconds)
    }
}

/// What is still missing before the gate opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSignals {
    pub pointer: bool,
    pub scroll: bool,
    pub key: bool,
    pub seconds_remaining: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Ready,
    Locked(PendingSignals),
}

impl GateDecision {
    pub fn evaluate(snapshot: &SignalSnapshot, threshold_seconds: u64) -> Self {
        let pending = PendingSignals {
            pointer: !snapshot.moved,
            scroll: !snapshot.scrolled,
            key: !snapshot.typed,
            seconds_remaining: threshold_seconds.saturating_sub(snapshot.seconds_elapsed),
        };
        if pending.pointer || pending.scroll || pending.key || pending.seconds_remaining > 0 {
            GateDecision::Locked(pending)
        } else {
            GateDecision::Ready
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, GateDecision::Ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

/// Accumulates interaction signals and a dwell-time tick.
pub struct SignalCollector {
    config: GateConfig,
    snapshot: Arc<watch::Sender<SignalSnapshot>>,
    active: Arc<AtomicBool>,
    subscriptions: Subscriptions,
    ticker: Option<JoinHandle<()>>,
    lifecycle: Lifecycle,
}

impl SignalCollector {
    pub fn new(config: GateConfig) -> Self {
        if let Err(e) = config.validate() {
            log!(LogLevel::Error, "gate config out of range ({e}); tick interval will be clamped");
        }
        let (snapshot, _) = watch::channel(SignalSnapshot::default());
        Self {
            config,
            snapshot: Arc::new(snapshot),
            active: Arc::new(AtomicBool::new(false)),
            subscriptions: Subscriptions::new(),
            ticker: None,
            lifecycle: Lifecycle::Idle,
        }
    }

    /// Registers one-shot listeners on `window` and starts the tick.
    ///
    /// Outside a Tokio runtime nothing is registered and the collector stays
    /// idle, so a later call from inside a runtime can still start it.
    pub fn start(&mut self, window: &Window) {
        match self.lifecycle {
            Lifecycle::Running => {
                log!(LogLevel::Debug, "signal collector already running");
                return;
            }
            Lifecycle::Stopped => {
                log!(LogLevel::Info, "signal collector was stopped; start ignored");
                return;
            }
            Lifecycle::Idle => {}
        }
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                log!(LogLevel::Error, "signal collector not started: {e}");
                return;
            }
        };

        self.active.store(true, Ordering::SeqCst);
        for kind in [InteractionKind::PointerMove, InteractionKind::Scroll, InteractionKind::KeyPress] {
            let snapshot = Arc::clone(&self.snapshot);
            let active = Arc::clone(&self.active);
            let subscription = window.add_listener(kind, ListenerOptions::once(), move |_| {
                if !active.load(Ordering::SeqCst) {
                    return;
                }
                let captured = snapshot.send_if_modified(|s| mark(s, kind));
                if captured {
                    observability::record_signal(signal_class(kind));
                    log!(LogLevel::Debug, "captured {:?} signal", kind);
                }
            });
            self.subscriptions.push(subscription);
        }

        let period = self.config.tick_interval();
        let snapshot = Arc::clone(&self.snapshot);
        let active = Arc::clone(&self.active);
        self.ticker = Some(runtime.spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            loop {
                ticks.tick().await;
                if !active.load(Ordering::SeqCst) {
                    break;
                }
                snapshot.send_modify(|s| s.seconds_elapsed = s.seconds_elapsed.saturating_add(1));
                observability::record_tick();
            }
        }));

        self.lifecycle = Lifecycle::Running;
        log!(
            LogLevel::Info,
            "signal collector started (threshold {}s)",
            self.config.ready_threshold_seconds
        );
    }

    pub fn current_snapshot(&self) -> SignalSnapshot {
        *self.snapshot.borrow()
    }

    pub fn gate(&self) -> GateDecision {
        self.current_snapshot().gate(self.config.ready_threshold_seconds)
    }

    pub fn is_ready(&self) -> bool {
        self.gate().is_ready()
    }

    /// Receiver notified on every snapshot change.
    pub fn watch(&self) -> watch::Receiver<SignalSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn threshold_seconds(&self) -> u64 {
        self.config.ready_threshold_seconds
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    /// Deregisters listeners and cancels the tick. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        self.subscriptions.dispose_all();
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if self.lifecycle == Lifecycle::Running {
            log!(LogLevel::Info, "signal collector stopped");
        }
        self.lifecycle = Lifecycle::Stopped;
    }
}

impl Drop for SignalCollector {
    fn drop(&mut self) {
        self.stop();
    }
}

fn mark(snapshot: &mut SignalSnapshot, kind: InteractionKind) -> bool {
    let flag = match kind {
        InteractionKind::PointerMove => &mut snapshot.moved,
        InteractionKind::Scroll => &mut snapshot.scrolled,
        InteractionKind::KeyPress => &mut snapshot.typed,
    };
    if *flag {
        return false;
    }
    *flag = true;
    true
}

fn signal_class(kind: InteractionKind) -> SignalClass {
    match kind {
        InteractionKind::PointerMove => SignalClass::POINTER,
        InteractionKind::Scroll => SignalClass::SCROLL,
        InteractionKind::KeyPress => SignalClass::KEY,
    }
}
