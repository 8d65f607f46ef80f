//! Encapsulated form construction.
//!
//! Everything inside [`ClosedRoot`] is private to this module: the element
//! tree, the field markers and the field values. From outside, a form is a
//! [`MountPoint`] (the host element plus the rendered controls a person can
//! perceive and operate) and a [`NotificationChannel`] that carries accepted
//! submissions out.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use crate::config::FormConfig;
use crate::core::observability::{self, RejectionClass};
use crate::deferred::DeferredTask;
use crate::dom::Element;
use crate::events::{EventTarget, ListenerOptions, Subscription};
use crate::lead::{LeadData, NotificationKind, SubmitNotification};
use crate::log;
use crate::logging::LogLevel;
use crate::tokens::{marker_attribute, FieldTokenSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractionError {
    NoSuchControl(usize),
    NoPerceivableControl(String),
}

impl std::fmt::Display for InteractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InteractionError::NoSuchControl(index) => write!(f, "no rendered control at index {index}"),
            InteractionError::NoPerceivableControl(label) => {
                write!(f, "no perceivable control labelled {label:?}")
            }
        }
    }
}

impl std::error::Error for InteractionError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Text,
    Email,
    TextArea,
}

/// A control as a renderer presents it. Carries no marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedControl {
    pub index: usize,
    pub label: String,
    pub kind: ControlKind,
    pub placeholder: Option<String>,
    pub tab_index: i32,
    pub aria_hidden: bool,
    pub offscreen: bool,
    pub value: String,
}

impl RenderedControl {
    /// Whether a person (or assistive technology) can reach this control.
    pub fn is_perceivable(&self) -> bool {
        !self.aria_hidden && !self.offscreen && self.tab_index >= 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitButton {
    pub label: String,
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Lead emitted and fields cleared.
    Accepted,
    /// Honeypot was filled; the control is disabled for good.
    Blocked,
    /// A required field was blank; label reverts after a delay.
    Incomplete,
    /// The control is disabled; nothing happened.
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldRole {
    Honeypot,
    Name,
    Email,
    Message,
}

struct Control {
    role: FieldRole,
    marker: String,
    label: String,
    kind: ControlKind,
    placeholder: Option<String>,
    tab_index: i32,
    aria_hidden: bool,
    offscreen: bool,
    value: String,
}

struct ClosedRoot {
    hint: String,
    footnote: String,
    controls: Vec<Control>,
    tokens: FieldTokenSet,
    button: Arc<Mutex<SubmitButton>>,
    submit_label: String,
    blocked_label: String,
    incomplete_label: String,
    revert_delay: Duration,
    pending_revert: Option<DeferredTask>,
    outbound: EventTarget<SubmitNotification>,
}

impl ClosedRoot {
    fn build(tokens: FieldTokenSet, config: &FormConfig, outbound: EventTarget<SubmitNotification>) -> Self {
        let copy = &config.copy;
        let controls = vec![
            Control {
                role: FieldRole::Honeypot,
                marker: marker_attribute(tokens.honeypot()),
                label: copy.honeypot_label.clone(),
                kind: ControlKind::Text,
                placeholder: None,
                tab_index: -1,
                aria_hidden: true,
                offscreen: true,
                value: String::new(),
            },
            Control {
                role: FieldRole::Name,
                marker: marker_attribute(tokens.name()),
                label: copy.name_label.clone(),
                kind: ControlKind::Text,
                placeholder: Some(copy.name_placeholder.clone()),
                tab_index: 0,
                aria_hidden: false,
                offscreen: false,
                value: String::new(),
            },
            Control {
                role: FieldRole::Email,
                marker: marker_attribute(tokens.email()),
                label: copy.email_label.clone(),
                kind: ControlKind::Email,
                placeholder: Some(copy.email_placeholder.clone()),
                tab_index: 0,
                aria_hidden: false,
                offscreen: false,
                value: String::new(),
            },
            Control {
                role: FieldRole::Message,
                marker: marker_attribute(tokens.message()),
                label: copy.message_label.clone(),
                kind: ControlKind::TextArea,
                placeholder: Some(copy.message_placeholder.clone()),
                tab_index: 0,
                aria_hidden: false,
                offscreen: false,
                value: String::new(),
            },
        ];

        Self {
            hint: copy.hint.clone(),
            footnote: copy.footnote.clone(),
            controls,
            tokens,
            button: Arc::new(Mutex::new(SubmitButton {
                label: copy.submit_label.clone(),
                disabled: false,
            })),
            submit_label: copy.submit_label.clone(),
            blocked_label: copy.blocked_label.clone(),
            incomplete_label: copy.incomplete_label.clone(),
            revert_delay: config.revert_delay(),
            pending_revert: None,
            outbound,
        }
    }

    fn value_of(&self, token: &str) -> &str {
        let marker = marker_attribute(token);
        self.controls
            .iter()
            .find(|c| c.marker == marker)
            .map(|c| c.value.as_str())
            .unwrap_or("")
    }

    fn button(&self) -> std::sync::MutexGuard<'_, SubmitButton> {
        self.button.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_revert(&mut self) {
        if let Some(mut task) = self.pending_revert.take() {
            task.cancel();
        }
    }

    fn submit(&mut self) -> SubmitOutcome {
        if self.button().disabled {
            observability::record_rejection(RejectionClass::CONTROL_DISABLED);
            return SubmitOutcome::Disabled;
        }

        if !self.value_of(self.tokens.honeypot()).trim().is_empty() {
            self.cancel_revert();
            {
                let mut button = self.button();
                button.label = self.blocked_label.clone();
                button.disabled = true;
            }
            observability::record_rejection(RejectionClass::HONEYPOT_FILLED);
            log!(LogLevel::Info, "submission blocked: decoy field was filled");
            return SubmitOutcome::Blocked;
        }

        let lead = LeadData::from_raw(
            self.value_of(self.tokens.name()),
            self.value_of(self.tokens.email()),
            self.value_of(self.tokens.message()),
        );
        let Some(lead) = lead else {
            self.button().label = self.incomplete_label.clone();
            self.schedule_revert();
            observability::record_rejection(RejectionClass::INCOMPLETE_FIELDS);
            log!(LogLevel::Debug, "submission incomplete");
            return SubmitOutcome::Incomplete;
        };

        self.cancel_revert();
        self.button().label = self.submit_label.clone();
        self.outbound.dispatch(&SubmitNotification::new(lead));
        for control in &mut self.controls {
            control.value.clear();
        }
        observability::record_submission_accepted();
        SubmitOutcome::Accepted
    }

    fn schedule_revert(&mut self) {
        self.cancel_revert();
        let button: Weak<Mutex<SubmitButton>> = Arc::downgrade(&self.button);
        let incomplete = self.incomplete_label.clone();
        let restore = self.submit_label.clone();
        self.pending_revert = DeferredTask::schedule(self.revert_delay, move || {
            let Some(button) = button.upgrade() else {
                return;
            };
            let mut button = button.lock().unwrap_or_else(PoisonError::into_inner);
            if button.label == incomplete {
                button.label = restore;
            }
        });
    }
}

impl Drop for ClosedRoot {
    fn drop(&mut self) {
        self.cancel_revert();
    }
}

impl ClosedRoot {
    /// Renders the inner tree from the current control values and button state.
    fn tree(&self) -> Element {
        let field = |control: &Control| {
            let mut input = match control.kind {
                ControlKind::TextArea => Element::new("textarea"),
                ControlKind::Text => Element::new("input").with_attr("type", "text"),
                ControlKind::Email => Element::new("input").with_attr("type", "email"),
            };
            input = input.with_attr(control.marker.clone(), "1");
            if let Some(placeholder) = &control.placeholder {
                input = input.with_attr("placeholder", placeholder.clone());
            }
            if !control.value.is_empty() {
                input = match control.kind {
                    ControlKind::TextArea => input.with_text(control.value.clone()),
                    _ => input.with_attr("value", control.value.clone()),
                };
            }
            match control.role {
                FieldRole::Honeypot => input
                    .with_attr("tabindex", "-1")
                    .with_attr("autocomplete", "off")
                    .with_attr("aria-hidden", "true"),
                FieldRole::Name => input.with_attr("autocomplete", "name").with_attr("required", ""),
                FieldRole::Email => input.with_attr("autocomplete", "email").with_attr("required", ""),
                FieldRole::Message => input.with_attr("required", ""),
            }
        };

        let mut row = Element::new("div").with_attr("class", "row");
        let mut honeypot = None;
        for control in &self.controls {
            let label = Element::new("label")
                .with_text(control.label.clone())
                .with_child(field(control));
            if control.role == FieldRole::Honeypot {
                honeypot = Some(label.with_attr("class", "hp"));
            } else {
                row = row.with_child(label);
            }
        }

        let button = {
            let state = self.button();
            let mut button = Element::new("button")
                .with_attr("type", "submit")
                .with_text(state.label.clone());
            if state.disabled {
                button = button.with_attr("disabled", "");
            }
            button
        };
        let actions = Element::new("div")
            .with_attr("class", "actions")
            .with_child(
                Element::new("div")
                    .with_attr("class", "footnote")
                    .with_text(self.footnote.clone()),
            )
            .with_child(button);

        let mut form = Element::new("form")
            .with_attr("autocomplete", "on")
            .with_attr("novalidate", "");
        if let Some(honeypot) = honeypot {
            form = form.with_child(honeypot);
        }
        form = form.with_child(row).with_child(actions);

        Element::new("div")
            .with_attr("class", "wrapper")
            .with_child(Element::new("div").with_attr("class", "hint").with_text(self.hint.clone()))
            .with_child(form)
    }
}

/// Host element of a constructed form and its operable surface.
pub struct MountPoint {
    element_name: &'static str,
    root: ClosedRoot,
}

impl MountPoint {
    pub fn element_name(&self) -> &'static str {
        self.element_name
    }

    /// The host as it appears in the light tree: no reachable children.
    pub fn element(&self) -> Element {
        Element::new(self.element_name).with_attr("data-ready", "ready")
    }

    pub fn controls(&self) -> Vec<RenderedControl> {
        self.root
            .controls
            .iter()
            .enumerate()
            .map(|(index, c)| RenderedControl {
                index,
                label: c.label.clone(),
                kind: c.kind,
                placeholder: c.placeholder.clone(),
                tab_index: c.tab_index,
                aria_hidden: c.aria_hidden,
                offscreen: c.offscreen,
                value: c.value.clone(),
            })
            .collect()
    }

    /// Sets a control's value by render position, whatever its visibility.
    pub fn fill(&mut self, index: usize, value: &str) -> Result<(), InteractionError> {
        let control = self
            .root
            .controls
            .get_mut(index)
            .ok_or(InteractionError::NoSuchControl(index))?;
        control.value = value.to_string();
        Ok(())
    }

    /// Sets the perceivable control whose label reads `label`.
    pub fn fill_by_label(&mut self, label: &str, value: &str) -> Result<(), InteractionError> {
        let index = self
            .controls()
            .into_iter()
            .find(|c| c.is_perceivable() && c.label == label)
            .map(|c| c.index)
            .ok_or_else(|| InteractionError::NoPerceivableControl(label.to_string()))?;
        self.fill(index, value)
    }

    pub fn submit_button(&self) -> SubmitButton {
        self.root.button().clone()
    }

    /// Runs the submit protocol synchronously.
    pub fn submit(&mut self) -> SubmitOutcome {
        self.root.submit()
    }

    /// Text a reader of the rendered form would see, excluding hidden parts.
    pub fn visible_text(&self) -> String {
        let tree = self.root.tree();
        let text_of = |selector: &str| {
            tree.query_selector(selector)
                .ok()
                .flatten()
                .and_then(Element::text)
                .map(str::to_string)
        };
        let mut parts: Vec<String> = text_of("[class=hint]").into_iter().collect();
        for control in self.controls().into_iter().filter(RenderedControl::is_perceivable) {
            parts.push(control.label);
        }
        parts.extend(text_of("[class=footnote]"));
        parts.extend(text_of("button"));
        parts.join("\n")
    }
}

/// Outbound side of a closed form: the single way data leaves it.
pub struct NotificationChannel {
    target: EventTarget<SubmitNotification>,
}

impl NotificationChannel {
    pub fn connect<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SubmitNotification) + Send + Sync + 'static,
    {
        self.target
            .add_listener(NotificationKind::Submit, ListenerOptions::persistent(), handler)
    }

    pub fn listener_count(&self) -> usize {
        self.target.listener_count()
    }
}

/// Sealed result of a form construction.
pub struct EncapsulatedForm {
    mount: MountPoint,
    notifications: NotificationChannel,
}

impl EncapsulatedForm {
    /// Builds a form whose fields are tagged with `tokens`.
    pub fn build(element_name: &'static str, tokens: FieldTokenSet, config: &FormConfig) -> Self {
        let outbound = EventTarget::new();
        let root = ClosedRoot::build(tokens, config, outbound.clone());
        observability::record_form_constructed();
        Self {
            mount: MountPoint { element_name, root },
            notifications: NotificationChannel { target: outbound },
        }
    }

    pub fn mount_point(&self) -> &MountPoint {
        &self.mount
    }

    pub fn mount_point_mut(&mut self) -> &mut MountPoint {
        &mut self.mount
    }

    pub fn notifications(&self) -> &NotificationChannel {
        &self.notifications
    }

    #[cfg(test)]
    pub(crate) fn tokens(&self) -> &FieldTokenSet {
        &self.mount.root.tokens
    }

    #[cfg(test)]
    pub(crate) fn inner_tree(&self) -> Element {
        self.mount.root.tree()
    }
}

impl Drop for EncapsulatedForm {
    fn drop(&mut self) {
        observability::record_form_torn_down();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> EncapsulatedForm {
        EncapsulatedForm::build("anti-bot-form", FieldTokenSet::generate(8), &FormConfig::default())
    }

    fn collect(form: &EncapsulatedForm) -> (Arc<Mutex<Vec<LeadData>>>, Subscription) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let sub = form.notifications().connect(move |note| {
            sink.lock().unwrap().push(note.detail.clone());
        });
        (received, sub)
    }

    fn fill_visible(form: &mut EncapsulatedForm, name: &str, email: &str, message: &str) {
        let mount = form.mount_point_mut();
        mount.fill_by_label("Name", name).unwrap();
        mount.fill_by_label("Work Email", email).unwrap();
        mount.fill_by_label("Message", message).unwrap();
    }

    #[test]
    fn host_element_exposes_no_children() {
        let form = form();
        let host = form.mount_point().element();
        assert_eq!(host.tag(), "anti-bot-form");
        assert_eq!(host.attribute("data-ready"), Some("ready"));
        assert!(host.children().is_empty());
        assert!(host.query_selector_all("*").unwrap().is_empty());
    }

    #[test]
    fn inner_fields_are_tagged_only_by_markers() {
        let form = form();
        let tree = form.inner_tree();
        for token in form.tokens().all() {
            let selector = format!("[{}]", marker_attribute(token));
            assert_eq!(tree.query_selector_all(&selector).unwrap().len(), 1);
        }
        assert!(tree.query_selector_all("[name]").unwrap().is_empty());
        assert!(tree.query_selector_all("[id]").unwrap().is_empty());
        assert_eq!(tree.query_selector_all("input").unwrap().len(), 3);
        assert_eq!(tree.query_selector_all("textarea").unwrap().len(), 1);
    }

    #[test]
    fn honeypot_comes_first_and_is_hidden() {
        let form = form();
        let tree = form.inner_tree();
        let decoy_selector = format!("[{}]", marker_attribute(form.tokens().honeypot()));
        let decoy = tree.query_selector(&decoy_selector).unwrap().unwrap();
        assert_eq!(decoy.attribute("tabindex"), Some("-1"));
        assert_eq!(decoy.attribute("aria-hidden"), Some("true"));
        assert_eq!(decoy.attribute("autocomplete"), Some("off"));

        let first_input = tree.query_selector("input").unwrap().unwrap();
        assert_eq!(first_input, decoy);

        let hp_label = tree.query_selector("[class=hp]").unwrap().unwrap();
        assert_eq!(hp_label.text(), Some("Company website"));
    }

    #[test]
    fn inner_tree_follows_values_and_button_state() {
        let mut form = form();
        fill_visible(&mut form, "Ada", "ada@x.io", "hi");
        let name_selector = format!("[{}]", marker_attribute(form.tokens().name()));
        let message_selector = format!("[{}]", marker_attribute(form.tokens().message()));
        let tree = form.inner_tree();
        let name = tree.query_selector(&name_selector).unwrap().unwrap();
        assert_eq!(name.attribute("value"), Some("Ada"));
        assert_eq!(tree.query_selector(&message_selector).unwrap().unwrap().text(), Some("hi"));

        form.mount_point_mut().fill(0, "https://spam.example").unwrap();
        assert_eq!(form.mount_point_mut().submit(), SubmitOutcome::Blocked);
        let tree = form.inner_tree();
        let button = tree.query_selector("button").unwrap().unwrap();
        assert_eq!(button.text(), Some("Submission blocked"));
        assert!(button.attribute("disabled").is_some());
    }

    #[test]
    fn controls_expose_visibility_but_not_markers() {
        let form = form();
        let controls = form.mount_point().controls();
        assert_eq!(controls.len(), 4);
        let perceivable: Vec<&str> = controls
            .iter()
            .filter(|c| c.is_perceivable())
            .map(|c| c.label.as_str())
            .collect();
        assert_eq!(perceivable, vec!["Name", "Work Email", "Message"]);
        assert!(!controls[0].is_perceivable());
    }

    #[test]
    fn decoy_cannot_be_reached_by_label() {
        let mut form = form();
        let err = form
            .mount_point_mut()
            .fill_by_label("Company website", "https://spam.example")
            .unwrap_err();
        assert_eq!(err, InteractionError::NoPerceivableControl("Company website".to_string()));
        assert_eq!(
            form.mount_point_mut().fill(9, "x"),
            Err(InteractionError::NoSuchControl(9))
        );
    }

    #[test]
    fn accepted_submission_emits_trimmed_lead_and_clears_fields() {
        let mut form = form();
        let (received, _sub) = collect(&form);
        fill_visible(&mut form, " Ada ", "ada@x.io", "hi");

        assert_eq!(form.mount_point_mut().submit(), SubmitOutcome::Accepted);
        assert_eq!(
            received.lock().unwrap().as_slice(),
            &[LeadData {
                name: "Ada".to_string(),
                email: "ada@x.io".to_string(),
                message: "hi".to_string(),
            }]
        );
        assert!(form.mount_point().controls().iter().all(|c| c.value.is_empty()));
        assert_eq!(form.mount_point().submit_button().label, "Request Demo");
    }

    #[test]
    fn filled_honeypot_blocks_and_disables() {
        let mut form = form();
        let (received, _sub) = collect(&form);
        fill_visible(&mut form, "Ada", "ada@x.io", "hi");
        form.mount_point_mut().fill(0, "https://spam.example").unwrap();

        assert_eq!(form.mount_point_mut().submit(), SubmitOutcome::Blocked);
        let button = form.mount_point().submit_button();
        assert_eq!(button.label, "Submission blocked");
        assert!(button.disabled);
        assert!(received.lock().unwrap().is_empty());
        // Values are left in place.
        assert_eq!(form.mount_point().controls()[1].value, "Ada");

        // Clearing the decoy does not re-enable the control.
        form.mount_point_mut().fill(0, "").unwrap();
        assert_eq!(form.mount_point_mut().submit(), SubmitOutcome::Disabled);
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn whitespace_honeypot_is_treated_as_empty() {
        let mut form = form();
        let (received, _sub) = collect(&form);
        fill_visible(&mut form, "Ada", "ada@x.io", "hi");
        form.mount_point_mut().fill(0, "  \t").unwrap();

        assert_eq!(form.mount_point_mut().submit(), SubmitOutcome::Accepted);
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn incomplete_submission_relabels_then_reverts() {
        let mut form = form();
        let (received, _sub) = collect(&form);
        fill_visible(&mut form, "Ada", "   ", "hi");

        assert_eq!(form.mount_point_mut().submit(), SubmitOutcome::Incomplete);
        assert_eq!(form.mount_point().submit_button().label, "Complete all fields");
        assert!(!form.mount_point().submit_button().disabled);
        assert_eq!(form.mount_point().controls()[1].value, "Ada");

        tokio::time::sleep(Duration::from_millis(1_600)).await;
        assert_eq!(form.mount_point().submit_button().label, "Request Demo");
        assert!(received.lock().unwrap().is_empty());

        // Retry right away succeeds.
        form.mount_point_mut().fill_by_label("Work Email", "ada@x.io").unwrap();
        assert_eq!(form.mount_point_mut().submit(), SubmitOutcome::Accepted);
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn honeypot_after_incomplete_keeps_blocked_label() {
        let mut form = form();
        assert_eq!(form.mount_point_mut().submit(), SubmitOutcome::Incomplete);

        form.mount_point_mut().fill(0, "bot").unwrap();
        assert_eq!(form.mount_point_mut().submit(), SubmitOutcome::Blocked);

        tokio::time::sleep(Duration::from_secs(3)).await;
        let button = form.mount_point().submit_button();
        assert_eq!(button.label, "Submission blocked");
        assert!(button.disabled);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_form_cancels_pending_revert() {
        let mut form = form();
        assert_eq!(form.mount_point_mut().submit(), SubmitOutcome::Incomplete);
        let button = Arc::clone(&form.mount.root.button);
        drop(form);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(button.lock().unwrap().label, "Complete all fields");
    }

    #[test]
    fn visible_text_omits_the_decoy() {
        let form = form();
        let text = form.mount_point().visible_text();
        assert!(text.contains("Work Email"));
        assert!(text.contains("Request Demo"));
        assert!(!text.contains("Company website"));
    }

    #[test]
    fn visible_text_tracks_the_button_label() {
        let mut form = form();
        form.mount_point_mut().fill(0, "https://spam.example").unwrap();
        assert_eq!(form.mount_point_mut().submit(), SubmitOutcome::Blocked);
        let text = form.mount_point().visible_text();
        assert!(text.ends_with("Submission blocked"));
        assert!(!text.contains("Request Demo"));
    }
}
