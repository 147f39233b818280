//! DomElement - host-independent element model for markup export/import
//!
//! Entities export to and import from this small element model. The JS
//! binding bridges it to real `web_sys::Element`s; native callers can render
//! it with [`DomElement::to_html`].

use serde::{Deserialize, Serialize};

// =============================================================================
// DomElement
// =============================================================================

/// A single element with ordered attributes and flat text content.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomElement {
    pub tag_name: String,
    /// Attributes in insertion order
    pub attributes: Vec<(String, String)>,
    pub text_content: String,
}

impl DomElement {
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            text_content: String::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = text.into();
        self
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Set or overwrite an attribute, keeping its original position.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }

    /// Serialize as a single HTML element.
    pub fn to_html(&self) -> String {
        let mut html = format!("<{}", self.tag_name);
        for (name, value) in &self.attributes {
            html.push(' ');
            html.push_str(name);
            html.push_str("=\"");
            html.push_str(&escape_html(value, true));
            html.push('"');
        }
        html.push('>');
        html.push_str(&escape_html(&self.text_content, false));
        html.push_str("</");
        html.push_str(&self.tag_name);
        html.push('>');
        html
    }
}

pub(crate) fn escape_html(raw: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// =============================================================================
// Import conversion map
// =============================================================================

/// A claimed element: how to convert it and how strongly it is claimed.
pub struct DomConversion<N> {
    pub priority: u8,
    pub conversion: fn(&DomElement) -> Option<N>,
}

/// Decides whether an element of the rule's tag is claimed.
pub type DomClaim<N> = fn(&DomElement) -> Option<DomConversion<N>>;

/// Tag-keyed import rules. Hosts register every node kind's rules here and
/// convert incoming elements through it.
pub struct DomConversionMap<N> {
    rules: Vec<(String, DomClaim<N>)>,
}

impl<N> Default for DomConversionMap<N> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<N> DomConversionMap<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a claim for elements named `tag`.
    pub fn register(&mut self, tag: &str, claim: DomClaim<N>) {
        self.rules.push((tag.to_ascii_lowercase(), claim));
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Highest-priority conversion claiming `element`, if any.
    pub fn claim(&self, element: &DomElement) -> Option<DomConversion<N>> {
        let tag = element.tag_name.to_ascii_lowercase();
        self.rules
            .iter()
            .filter(|(t, _)| *t == tag)
            .filter_map(|(_, claim)| claim(element))
            .max_by_key(|c| c.priority)
    }

    /// Convert `element`. `None` means no importer claimed it or the
    /// claimed conversion rejected it; the host falls back to plain text.
    pub fn convert(&self, element: &DomElement) -> Option<N> {
        let conversion = self.claim(element)?;
        (conversion.conversion)(element)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_html_escapes() {
        let el = DomElement::new("SPAN")
            .with_attribute("title", "a \"b\" & <c>")
            .with_text("1 < 2 & \"q\"");

        assert_eq!(
            el.to_html(),
            "<span title=\"a &quot;b&quot; &amp; &lt;c&gt;\">1 &lt; 2 &amp; \"q\"</span>"
        );
    }

    #[test]
    fn test_set_attribute_overwrites_in_place() {
        let mut el = DomElement::new("span")
            .with_attribute("a", "1")
            .with_attribute("b", "2");
        el.set_attribute("a", "3");

        assert_eq!(el.get_attribute("a"), Some("3"));
        assert_eq!(el.attributes[0].0, "a");
        assert_eq!(el.attributes.len(), 2);
    }

    #[test]
    fn test_conversion_map_priority_and_tag() {
        fn low(_: &DomElement) -> Option<DomConversion<&'static str>> {
            Some(DomConversion { priority: 0, conversion: |_| Some("low") })
        }
        fn high(el: &DomElement) -> Option<DomConversion<&'static str>> {
            if !el.has_attribute("data-x") {
                return None;
            }
            Some(DomConversion { priority: 1, conversion: |_| Some("high") })
        }

        let mut map = DomConversionMap::new();
        map.register("span", low);
        map.register("span", high);

        let plain = DomElement::new("span");
        let marked = DomElement::new("span").with_attribute("data-x", "");
        let other_tag = DomElement::new("div").with_attribute("data-x", "");

        assert_eq!(map.convert(&plain), Some("low"));
        assert_eq!(map.convert(&marked), Some("high"));
        assert_eq!(map.convert(&other_tag), None);
    }
}
