//! Light element tree answering generic structural queries.
//!
//! This is what a scraper sees of the page. Closed roots are not part of it:
//! the host element of an encapsulated form is a childless leaf here.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    Empty,
    Unterminated(String),
    Unsupported(String),
}

impl std::fmt::Display for SelectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectorError::Empty => write!(f, "empty selector"),
            SelectorError::Unterminated(s) => write!(f, "unterminated attribute selector: {s}"),
            SelectorError::Unsupported(s) => write!(f, "unsupported selector: {s}"),
        }
    }
}

impl std::error::Error for SelectorError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Any,
    Tag(String),
    HasAttr(String),
    AttrEquals { name: String, value: String },
    AttrPrefix { name: String, prefix: String },
}

impl Selector {
    pub fn parse(text: &str) -> Result<Self, SelectorError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SelectorError::Empty);
        }
        if text == "*" {
            return Ok(Selector::Any);
        }

        if let Some(rest) = text.strip_prefix('[') {
            let Some(body) = rest.strip_suffix(']') else {
                return Err(SelectorError::Unterminated(text.to_string()));
            };
            return parse_attribute(body, text);
        }

        if text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Ok(Selector::Tag(text.to_ascii_lowercase()));
        }
        Err(SelectorError::Unsupported(text.to_string()))
    }

    pub fn matches(&self, element: &Element) -> bool {
        match self {
            Selector::Any => true,
            Selector::Tag(tag) => element.tag == *tag,
            Selector::HasAttr(name) => element.attributes.contains_key(name),
            Selector::AttrEquals { name, value } => element.attribute(name) == Some(value.as_str()),
            Selector::AttrPrefix { name, prefix } => element
                .attribute(name)
                .map(|v| v.starts_with(prefix.as_str()))
                .unwrap_or(false),
        }
    }
}

fn parse_attribute(body: &str, original: &str) -> Result<Selector, SelectorError> {
    let unquote = |v: &str| v.trim().trim_matches(|c: char| c == '"' || c == '\'').to_string();

    if let Some((name, prefix)) = body.split_once("^=") {
        return Ok(Selector::AttrPrefix {
            name: name.trim().to_string(),
            prefix: unquote(prefix),
        });
    }
    if let Some((name, value)) = body.split_once('=') {
        return Ok(Selector::AttrEquals {
            name: name.trim().to_string(),
            value: unquote(value),
        });
    }
    let name = body.trim();
    if name.is_empty() {
        return Err(SelectorError::Unsupported(original.to_string()));
    }
    Ok(Selector::HasAttr(name.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: Option<String>,
    children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Concatenated text of this element and its descendants, in order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Depth-first matches among this element's descendants.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<&Element>, SelectorError> {
        let selector = Selector::parse(selector)?;
        let mut found = Vec::new();
        for child in &self.children {
            child.collect_matches(&selector, &mut found);
        }
        Ok(found)
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<&Element>, SelectorError> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    fn collect_matches<'a>(&'a self, selector: &Selector, found: &mut Vec<&'a Element>) {
        if selector.matches(self) {
            found.push(self);
        }
        for child in &self.children {
            child.collect_matches(selector, found);
        }
    }
}

/// Top-level document of the landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    body: Element,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            body: Element::new("body"),
        }
    }

    pub fn with_body(body: Element) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &Element {
        &self.body
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<&Element>, SelectorError> {
        self.body.query_selector_all(selector)
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<&Element>, SelectorError> {
        self.body.query_selector(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::with_body(
            Element::new("body")
                .with_child(
                    Element::new("section")
                        .with_attr("id", "hero")
                        .with_child(Element::new("input").with_attr("name", "email"))
                        .with_child(Element::new("p").with_text("Request a demo")),
                )
                .with_child(Element::new("anti-bot-form").with_attr("data-ready", "ready")),
        )
    }

    #[test]
    fn tag_selector_finds_nested_elements() {
        let doc = sample();
        let inputs = doc.query_selector_all("input").unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].attribute("name"), Some("email"));
    }

    #[test]
    fn attribute_selectors() {
        let doc = sample();
        assert_eq!(doc.query_selector_all("[data-ready]").unwrap().len(), 1);
        assert_eq!(doc.query_selector_all("[name=\"email\"]").unwrap().len(), 1);
        assert_eq!(doc.query_selector_all("[id^=he]").unwrap().len(), 1);
        assert!(doc.query_selector("[name=phone]").unwrap().is_none());
    }

    #[test]
    fn universal_selector_walks_depth_first() {
        let doc = sample();
        let tags: Vec<&str> = doc
            .query_selector_all("*")
            .unwrap()
            .into_iter()
            .map(Element::tag)
            .collect();
        assert_eq!(tags, vec!["section", "input", "p", "anti-bot-form"]);
    }

    #[test]
    fn malformed_selectors_are_errors() {
        assert_eq!(Selector::parse("  "), Err(SelectorError::Empty));
        assert!(matches!(Selector::parse("[data-x"), Err(SelectorError::Unterminated(_))));
        assert!(matches!(Selector::parse("div > input"), Err(SelectorError::Unsupported(_))));
        assert!(matches!(Selector::parse("[]"), Err(SelectorError::Unsupported(_))));
    }

    #[test]
    fn text_content_joins_descendants() {
        let doc = sample();
        assert_eq!(doc.body().text_content(), "Request a demo");
    }
}
