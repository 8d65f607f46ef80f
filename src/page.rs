use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use crate::config::DemoConfig;
use crate::dom::{Document, Element};
use crate::events::{InteractionEvent, Window};
use crate::gated_form::GatedForm;
use crate::lead::LeadData;
use crate::log;
use crate::logging::LogLevel;
use crate::shadow::MountPoint;
use crate::signals::{SignalCollector, SignalSnapshot};

/// Landing page wiring the collector's gate into the gated form.
pub struct LandingPage {
    window: Window,
    collector: SignalCollector,
    snapshots: watch::Receiver<SignalSnapshot>,
    form: GatedForm,
    submitted: Arc<Mutex<Option<LeadData>>>,
    document: Document,
}

impl LandingPage {
    /// Builds the page and starts collecting signals.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(config: &DemoConfig) -> Self {
        let window = Window::new();
        let mut collector = SignalCollector::new(config.gate.clone());
        let snapshots = collector.watch();
        collector.start(&window);

        let submitted = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&submitted);
        let form = GatedForm::new(config.form.clone(), move |lead: LeadData| {
            log!(LogLevel::Info, "lead captured for {}", lead.name);
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(lead);
        });

        let mut page = Self {
            window,
            collector,
            snapshots,
            form,
            submitted,
            document: Document::new(),
        };
        page.rerender();
        page
    }

    pub fn dispatch(&self, event: InteractionEvent) {
        self.window.dispatch(&event);
    }

    pub fn snapshot(&self) -> SignalSnapshot {
        self.collector.current_snapshot()
    }

    /// Forwards the current gate into the form and re-renders.
    pub fn sync_gate(&mut self) -> bool {
        let ready = self.collector.is_ready();
        self.form.set_ready(ready);
        self.rerender();
        ready
    }

    /// Waits for the gate to open, re-rendering on every snapshot change.
    pub async fn wait_until_ready(&mut self) {
        loop {
            if self.sync_gate() {
                return;
            }
            if self.snapshots.changed().await.is_err() {
                log!(LogLevel::Error, "signal collector went away before the gate opened");
                return;
            }
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn form(&mut self) -> Option<&mut MountPoint> {
        self.form.mount_point_mut()
    }

    pub fn submitted(&self) -> Option<LeadData> {
        self.submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Thank-you line shown after an accepted submission.
    pub fn confirmation(&self) -> Option<String> {
        self.submitted()
            .map(|lead| format!("Thanks {}! We logged your request in the console.", lead.name))
    }

    pub fn teardown(&mut self) {
        self.collector.stop();
        self.form.unmount();
        self.rerender();
    }

    fn rerender(&mut self) {
        let panel = Element::new("div")
            .with_attr("class", "glass-panel")
            .with_child(Element::new("h2").with_text("Request a demo"))
            .with_child(self.form.render());
        let panel = match self.confirmation() {
            Some(text) => panel.with_child(Element::new("p").with_attr("class", "confirmation").with_text(text)),
            None => panel,
        };
        self.document = Document::with_body(Element::new("body").with_child(panel));
    }

    /// Re-renders after the host observed a submission.
    pub fn refresh(&mut self) {
        self.rerender();
    }
}
