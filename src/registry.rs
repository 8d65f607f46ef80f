use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use lazy_static::lazy_static;

use crate::config::FormConfig;
use crate::log;
use crate::logging::LogLevel;
use crate::shadow::EncapsulatedForm;
use crate::tokens::FieldTokenSet;

pub const ANTI_BOT_FORM: &str = "anti-bot-form";

pub type ElementBuilder = fn(&'static str, FieldTokenSet, &FormConfig) -> EncapsulatedForm;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    Undefined(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::Undefined(name) => write!(f, "element `{name}` is not defined"),
        }
    }
}

impl std::error::Error for RegistryError {}

lazy_static! {
    static ref ELEMENTS: Mutex<HashMap<&'static str, ElementBuilder>> = Mutex::new(HashMap::new());
}

/// Registers `builder` under `name` unless something is already there.
/// Returns whether this call registered it.
pub fn define(name: &'static str, builder: ElementBuilder) -> bool {
    let mut elements = ELEMENTS.lock().unwrap_or_else(PoisonError::into_inner);
    if elements.contains_key(name) {
        return false;
    }
    elements.insert(name, builder);
    log!(LogLevel::Debug, "defined element `{name}`");
    true
}

pub fn is_defined(name: &str) -> bool {
    ELEMENTS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(name)
}

pub fn construct(
    name: &str,
    tokens: FieldTokenSet,
    config: &FormConfig,
) -> Result<EncapsulatedForm, RegistryError> {
    let entry = ELEMENTS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_key_value(name)
        .map(|(name, builder)| (*name, *builder));
    let (name, builder) = entry.ok_or_else(|| RegistryError::Undefined(name.to_string()))?;
    Ok(builder(name, tokens, config))
}

/// Idempotent guard run by every gated form.
pub fn define_anti_bot_form() {
    define(ANTI_BOT_FORM, EncapsulatedForm::build);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn other_builder(_: &'static str, tokens: FieldTokenSet, config: &FormConfig) -> EncapsulatedForm {
        EncapsulatedForm::build("replaced-form", tokens, config)
    }

    #[test]
    fn repeated_definition_is_a_no_op() {
        define_anti_bot_form();
        assert!(is_defined(ANTI_BOT_FORM));
        assert!(!define(ANTI_BOT_FORM, other_builder));

        let form = construct(ANTI_BOT_FORM, FieldTokenSet::generate(8), &FormConfig::default())
            .expect("defined");
        assert_eq!(form.mount_point().element_name(), ANTI_BOT_FORM);
    }

    #[test]
    fn unknown_element_is_an_error() {
        let result = construct("never-defined", FieldTokenSet::generate(8), &FormConfig::default());
        assert_eq!(
            result.err(),
            Some(RegistryError::Undefined("never-defined".to_string()))
        );
    }

    #[test]
    fn custom_elements_can_be_registered_once() {
        assert!(define("test-only-form", other_builder));
        assert!(!define("test-only-form", EncapsulatedForm::build));
        let form = construct("test-only-form", FieldTokenSet::generate(8), &FormConfig::default())
            .expect("defined");
        assert_eq!(form.mount_point().element_name(), "replaced-form");
    }
}
