//! Behaviorally gated lead form.
//!
//! A [`signals::SignalCollector`] watches for pointer, scroll and key
//! activity plus dwell time. Once its gate opens, a [`gated_form::GatedForm`]
//! builds an encapsulated form with randomized field markers and a honeypot,
//! and hands accepted submissions to the host as [`lead::LeadData`].

pub mod logging;

pub mod config;
pub mod core;
pub mod deferred;
pub mod dom;
pub mod events;
pub mod gated_form;
pub mod lead;
pub mod page;
pub mod registry;
pub mod shadow;
pub mod signals;
pub mod tokens;


pub use config::{DemoConfig, FormConfig, GateConfig, READY_THRESHOLD_SECONDS};
pub use gated_form::GatedForm;
pub use lead::LeadData;
pub use signals::{GateDecision, SignalCollector, SignalSnapshot};
