use std::sync::Arc;

use crate::config::FormConfig;
use crate::dom::Element;
use crate::events::Subscription;
use crate::lead::LeadData;
use crate::log;
use crate::logging::LogLevel;
use crate::registry::{self, ANTI_BOT_FORM};
use crate::shadow::{EncapsulatedForm, MountPoint};
use crate::tokens::FieldTokenSet;

pub type SubmitCallback = Arc<dyn Fn(LeadData) + Send + Sync>;

enum FormState {
    Locked,
    Constructed {
        form: EncapsulatedForm,
        link: Subscription,
    },
}

/// Withholds the form until the gate opens, then builds it once.
pub struct GatedForm {
    config: FormConfig,
    on_submit: SubmitCallback,
    state: FormState,
    constructions: u64,
}

impl GatedForm {
    pub fn new<F>(config: FormConfig, on_submit: F) -> Self
    where
        F: Fn(LeadData) + Send + Sync + 'static,
    {
        registry::define_anti_bot_form();
        if let Err(e) = config.validate() {
            log!(LogLevel::Error, "form config out of range ({e}); token length will be clamped");
        }
        Self {
            config,
            on_submit: Arc::new(on_submit),
            state: FormState::Locked,
            constructions: 0,
        }
    }

    /// Feeds the current gate value in.
    ///
    /// The first `true` builds the form; further `true`s change nothing. A
    /// `false` after construction unmounts, and the next `true` builds a
    /// new instance with fresh markers.
    pub fn set_ready(&mut self, ready: bool) {
        match (self.is_constructed(), ready) {
            (false, true) => self.construct(),
            (true, false) => self.unmount(),
            _ => {}
        }
    }

    fn construct(&mut self) {
        let tokens = FieldTokenSet::generate(self.config.token_length);
        let form = match registry::construct(ANTI_BOT_FORM, tokens, &self.config) {
            Ok(form) => form,
            Err(e) => {
                log!(LogLevel::Error, "form stays locked: {e}");
                return;
            }
        };

        let on_submit = Arc::clone(&self.on_submit);
        let link = form
            .notifications()
            .connect(move |note| on_submit(note.detail.clone()));

        self.constructions += 1;
        self.state = FormState::Constructed { form, link };
        log!(LogLevel::Info, "gate open: form constructed (#{})", self.constructions);
    }

    /// Tears the constructed form down, cancelling anything it scheduled.
    pub fn unmount(&mut self) {
        if let FormState::Constructed { form, mut link } =
            std::mem::replace(&mut self.state, FormState::Locked)
        {
            link.dispose();
            drop(form);
            log!(LogLevel::Debug, "form unmounted");
        }
    }

    pub fn is_constructed(&self) -> bool {
        matches!(self.state, FormState::Constructed { .. })
    }

    /// Number of constructions over this instance's life.
    pub fn constructions(&self) -> u64 {
        self.constructions
    }

    /// Light-tree output: the placeholder while locked, the childless host
    /// element once constructed.
    pub fn render(&self) -> Element {
        match &self.state {
            FormState::Locked => Element::new("div")
                .with_attr("class", "form-placeholder")
                .with_attr("data-ready", "locked")
                .with_child(Element::new("p").with_text(self.config.copy.locked_title.clone()))
                .with_child(Element::new("p").with_text(self.config.copy.locked_body.clone())),
            FormState::Constructed { form, .. } => form.mount_point().element(),
        }
    }

    pub fn mount_point(&self) -> Option<&MountPoint> {
        match &self.state {
            FormState::Constructed { form, .. } => Some(form.mount_point()),
            FormState::Locked => None,
        }
    }

    pub fn mount_point_mut(&mut self) -> Option<&mut MountPoint> {
        match &mut self.state {
            FormState::Constructed { form, .. } => Some(form.mount_point_mut()),
            FormState::Locked => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn tokens(&self) -> Option<&FieldTokenSet> {
        match &self.state {
            FormState::Constructed { form, .. } => Some(form.tokens()),
            FormState::Locked => None,
        }
    }
}

impl Drop for GatedForm {
    fn drop(&mut self) {
        self.unmount();
    }
}
