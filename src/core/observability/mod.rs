#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservabilityLevel {
    OBS_NONE,
    OBS_SAFE,
    OBS_DEV,
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionClass {
    HONEYPOT_FILLED,
    INCOMPLETE_FIELDS,
    CONTROL_DISABLED,
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalClass {
    POINTER,
    SCROLL,
    KEY,
}

#[cfg(feature = "obs_none")]
pub const OBS_LEVEL: ObservabilityLevel = ObservabilityLevel::OBS_NONE;

#[cfg(all(feature = "obs_dev", not(feature = "obs_none")))]
pub const OBS_LEVEL: ObservabilityLevel = ObservabilityLevel::OBS_DEV;

#[cfg(all(not(feature = "obs_none"), not(feature = "obs_dev")))]
pub const OBS_LEVEL: ObservabilityLevel = ObservabilityLevel::OBS_SAFE;

pub const OBS_NONE: bool = matches!(OBS_LEVEL, ObservabilityLevel::OBS_NONE);
pub const OBS_SAFE: bool = matches!(OBS_LEVEL, ObservabilityLevel::OBS_SAFE);
pub const OBS_DEV: bool = matches!(OBS_LEVEL, ObservabilityLevel::OBS_DEV);

use std::sync::atomic::{AtomicU64, Ordering};

static FORMS_CONSTRUCTED: AtomicU64 = AtomicU64::new(0);
static FORMS_TORN_DOWN: AtomicU64 = AtomicU64::new(0);
static SUBMISSIONS_ACCEPTED: AtomicU64 = AtomicU64::new(0);
static TICKS: AtomicU64 = AtomicU64::new(0);
static DEFERRED_CANCELLED: AtomicU64 = AtomicU64::new(0);

const REJECTION_CLASSES: usize = 3;
static REJECTIONS: [AtomicU64; REJECTION_CLASSES] = [const { AtomicU64::new(0) }; REJECTION_CLASSES];

const SIGNAL_CLASSES: usize = 3;
static SIGNALS_CAPTURED: [AtomicU64; SIGNAL_CLASSES] = [const { AtomicU64::new(0) }; SIGNAL_CLASSES];

#[inline]
pub fn record_form_constructed() {
    if OBS_NONE {
        return;
    }
    FORMS_CONSTRUCTED.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_form_torn_down() {
    if OBS_NONE {
        return;
    }
    FORMS_TORN_DOWN.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_submission_accepted() {
    if OBS_NONE {
        return;
    }
    SUBMISSIONS_ACCEPTED.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_rejection(class: RejectionClass) {
    if OBS_NONE {
        return;
    }
    REJECTIONS[rejection_index(class)].fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_signal(class: SignalClass) {
    if OBS_NONE {
        return;
    }
    SIGNALS_CAPTURED[signal_index(class)].fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_tick() {
    if OBS_NONE {
        return;
    }
    TICKS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_deferred_cancelled() {
    if OBS_NONE {
        return;
    }
    DEFERRED_CANCELLED.fetch_add(1, Ordering::Relaxed);
}

#[inline]
const fn rejection_index(class: RejectionClass) -> usize {
    match class {
        RejectionClass::HONEYPOT_FILLED => 0,
        RejectionClass::INCOMPLETE_FIELDS => 1,
        RejectionClass::CONTROL_DISABLED => 2,
    }
}

#[inline]
const fn signal_index(class: SignalClass) -> usize {
    match class {
        SignalClass::POINTER => 0,
        SignalClass::SCROLL => 1,
        SignalClass::KEY => 2,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilitySnapshot {
    pub forms_constructed: u64,
    pub forms_torn_down: u64,
    pub submissions_accepted: u64,
    pub honeypot_rejections: u64,
    pub incomplete_rejections: u64,
    pub disabled_rejections: u64,
    pub signals_captured: [u64; SIGNAL_CLASSES],
    pub ticks: u64,
    pub deferred_cancelled: u64,
}

pub fn snapshot() -> ObservabilitySnapshot {
    ObservabilitySnapshot {
        forms_constructed: FORMS_CONSTRUCTED.load(Ordering::Relaxed),
        forms_torn_down: FORMS_TORN_DOWN.load(Ordering::Relaxed),
        submissions_accepted: SUBMISSIONS_ACCEPTED.load(Ordering::Relaxed),
        honeypot_rejections: REJECTIONS[0].load(Ordering::Relaxed),
        incomplete_rejections: REJECTIONS[1].load(Ordering::Relaxed),
        disabled_rejections: REJECTIONS[2].load(Ordering::Relaxed),
        signals_captured: SIGNALS_CAPTURED.each_ref().map(|c| c.load(Ordering::Relaxed)),
        ticks: TICKS.load(Ordering::Relaxed),
        deferred_cancelled: DEFERRED_CANCELLED.load(Ordering::Relaxed),
    }
}
