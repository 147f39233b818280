//! TypeaheadEntity - the committed inline typeahead node
//!
//! An entity remembers what it resolved to (`typeahead_type`, `content`,
//! `trigger`) independently of the text it displays. It is atomic in the
//! document: segmented edit mode, no text insertion directly before or after
//! it, and never merged with neighbouring text.
//!
//! Three representations must agree:
//! - in memory ([`TypeaheadEntity`])
//! - JSON snapshot ([`SerializedTypeaheadEntity`])
//! - markup ([`DomElement`] via [`InlineEntity::export_dom`] / [`InlineEntity::import_dom`])

use bitflags::bitflags;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::dom::{DomConversion, DomConversionMap, DomElement};
use super::error::{Result, TypeaheadError};

// =============================================================================
// Constants
// =============================================================================

/// Node type tag used in snapshots.
pub const TYPEAHEAD_NODE_TYPE: &str = "typeahead";

/// Snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

pub const ATTR_MARKER: &str = "data-lexical-typeahead";
pub const ATTR_TYPE: &str = "data-lexical-typeahead-type";
pub const ATTR_TRIGGER: &str = "data-lexical-typeahead-trigger";
pub const ATTR_CONTENT: &str = "data-lexical-typeahead-content";

bitflags! {
    /// Inline text formatting carried by the base text node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextFormat: u32 {
        const BOLD = 1;
        const ITALIC = 1 << 1;
        const STRIKETHROUGH = 1 << 2;
        const UNDERLINE = 1 << 3;
        const CODE = 1 << 4;
        const SUBSCRIPT = 1 << 5;
        const SUPERSCRIPT = 1 << 6;
        const HIGHLIGHT = 1 << 7;
    }
}

bitflags! {
    /// Layout/editing detail bits of the base text node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextDetail: u32 {
        /// Ignored when resolving bidirectional text direction
        const DIRECTIONLESS = 1;
        const UNMERGEABLE = 1 << 1;
    }
}

/// Edit granularity of a text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMode {
    #[default]
    Normal,
    Token,
    Segmented,
}

// =============================================================================
// Snapshot types
// =============================================================================

/// Base text-node fields shared by every text-like snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedTextNode {
    #[serde(rename = "type")]
    pub node_type: String,
    pub version: u32,
    pub text: String,
    #[serde(default)]
    pub format: u32,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub detail: u32,
    #[serde(default)]
    pub mode: TextMode,
}

/// Snapshot of a [`TypeaheadEntity`]: base text fields plus the typeahead triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedTypeaheadEntity {
    #[serde(flatten)]
    pub base: SerializedTextNode,
    pub typeahead_type: String,
    pub content: String,
    pub trigger: String,
}

// =============================================================================
// InlineEntity capability set
// =============================================================================

/// What a custom inline node must provide to live in a document:
/// snapshot, markup and atomicity hooks.
pub trait InlineEntity: Sized {
    type Snapshot: Serialize + DeserializeOwned;

    /// Node type tag written into snapshots.
    fn node_type() -> &'static str;

    fn export_json(&self) -> Self::Snapshot;

    fn import_json(snapshot: &Self::Snapshot) -> Result<Self>;

    fn export_dom(&self) -> DomElement;

    /// Markup importers for this node kind.
    fn import_dom() -> DomConversionMap<Self>;

    /// Whether the node is edited and deleted as one unit.
    fn is_atomic(&self) -> bool;

    fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.export_json())?)
    }

    fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self::Snapshot = serde_json::from_str(json)?;
        Self::import_json(&snapshot)
    }
}

// =============================================================================
// TypeaheadEntity
// =============================================================================

/// Committed typeahead node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeaheadEntity {
    typeahead_type: String,
    content: String,
    trigger: String,
    text: String,
    format: TextFormat,
    style: String,
    detail: TextDetail,
}

impl TypeaheadEntity {
    /// Create an entity. Display text defaults to `trigger + content`.
    pub fn create(
        typeahead_type: &str,
        content: &str,
        trigger: &str,
        display_text: Option<&str>,
    ) -> Result<Self> {
        let text = match display_text {
            Some(text) => text.to_string(),
            None => format!("{}{}", trigger, content),
        };
        if text.is_empty() {
            return Err(TypeaheadError::EmptyDisplayText);
        }

        Ok(Self {
            typeahead_type: typeahead_type.to_string(),
            content: content.to_string(),
            trigger: trigger.to_string(),
            text,
            format: TextFormat::empty(),
            style: String::new(),
            detail: TextDetail::DIRECTIONLESS,
        })
    }

    pub fn typeahead_type(&self) -> &str {
        &self.typeahead_type
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    pub fn display_text(&self) -> &str {
        &self.text
    }

    pub fn format(&self) -> TextFormat {
        self.format
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    pub fn detail(&self) -> TextDetail {
        self.detail
    }

    pub fn mode(&self) -> TextMode {
        TextMode::Segmented
    }

    /// Deleted as a unit, never character by character.
    pub fn is_segmented(&self) -> bool {
        self.mode() == TextMode::Segmented
    }

    pub fn is_directionless(&self) -> bool {
        self.detail.contains(TextDetail::DIRECTIONLESS)
    }

    pub fn is_text_entity(&self) -> bool {
        true
    }

    pub fn can_insert_text_before(&self) -> bool {
        false
    }

    pub fn can_insert_text_after(&self) -> bool {
        false
    }

    /// Display text differs from the resolved value.
    pub fn has_custom_display(&self) -> bool {
        self.text != self.content && self.text != format!("{}{}", self.trigger, self.content)
    }

    // Entities are never mutated in place; every change yields a new node.

    pub fn with_display_text(&self, text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(TypeaheadError::EmptyDisplayText);
        }
        Ok(Self {
            text: text.to_string(),
            ..self.clone()
        })
    }

    pub fn with_format(&self, format: TextFormat) -> Self {
        Self {
            format,
            ..self.clone()
        }
    }

    pub fn with_style(&self, style: &str) -> Self {
        Self {
            style: style.to_string(),
            ..self.clone()
        }
    }

    /// Apply base text fields from a snapshot.
    fn update_from_json(mut self, base: &SerializedTextNode) -> Result<Self> {
        if base.text.is_empty() {
            return Err(TypeaheadError::EmptyDisplayText);
        }
        self.text = base.text.clone();
        self.format = TextFormat::from_bits_retain(base.format);
        self.style = base.style.clone();
        self.detail = TextDetail::from_bits_retain(base.detail) | TextDetail::DIRECTIONLESS;
        Ok(self)
    }

    /// Element for the live editor view.
    pub fn create_dom(&self) -> DomElement {
        DomElement::new("span")
            .with_attribute("class", format!("typeahead typeahead-{}", self.typeahead_type))
            .with_attribute("spellcheck", "false")
            .with_text(self.text.clone())
    }
}

/// Claim `span`s carrying the typeahead marker.
fn claim_typeahead_span(element: &DomElement) -> Option<DomConversion<TypeaheadEntity>> {
    if !element.has_attribute(ATTR_MARKER) {
        return None;
    }
    Some(DomConversion {
        priority: 1,
        conversion: convert_typeahead_element,
    })
}

/// Rebuild an entity from exported markup. Missing type/trigger or empty
/// text leaves the element unconverted.
///
/// Export drops the content attribute when the text is `trigger + content`,
/// so without it the content is the text minus a leading trigger.
fn convert_typeahead_element(element: &DomElement) -> Option<TypeaheadEntity> {
    let typeahead_type = element.get_attribute(ATTR_TYPE)?;
    let trigger = element.get_attribute(ATTR_TRIGGER)?;
    let text = element.text_content.as_str();
    if text.is_empty() {
        return None;
    }
    let content = match element.get_attribute(ATTR_CONTENT) {
        Some(content) => content,
        None => text.strip_prefix(trigger).unwrap_or(text),
    };

    TypeaheadEntity::create(typeahead_type, content, trigger, Some(text)).ok()
}

impl InlineEntity for TypeaheadEntity {
    type Snapshot = SerializedTypeaheadEntity;

    fn node_type() -> &'static str {
        TYPEAHEAD_NODE_TYPE
    }

    fn export_json(&self) -> SerializedTypeaheadEntity {
        SerializedTypeaheadEntity {
            base: SerializedTextNode {
                node_type: Self::node_type().to_string(),
                version: SNAPSHOT_VERSION,
                text: self.text.clone(),
                format: self.format.bits(),
                style: self.style.clone(),
                detail: self.detail.bits(),
                mode: TextMode::Segmented,
            },
            typeahead_type: self.typeahead_type.clone(),
            content: self.content.clone(),
            trigger: self.trigger.clone(),
        }
    }

    fn import_json(snapshot: &SerializedTypeaheadEntity) -> Result<Self> {
        if snapshot.base.node_type != Self::node_type() {
            return Err(TypeaheadError::UnexpectedNodeType(snapshot.base.node_type.clone()));
        }
        Self::create(
            &snapshot.typeahead_type,
            &snapshot.content,
            &snapshot.trigger,
            None,
        )?
        .update_from_json(&snapshot.base)
    }

    fn export_dom(&self) -> DomElement {
        let mut element = DomElement::new("span")
            .with_attribute(ATTR_MARKER, "true")
            .with_attribute(ATTR_TYPE, self.typeahead_type.clone())
            .with_attribute(ATTR_TRIGGER, self.trigger.clone());
        if self.has_custom_display() {
            element.set_attribute(ATTR_CONTENT, self.content.clone());
        }
        element.with_text(self.text.clone())
    }

    fn import_dom() -> DomConversionMap<Self> {
        let mut map = DomConversionMap::new();
        map.register("span", claim_typeahead_span);
        map
    }

    fn is_atomic(&self) -> bool {
        self.is_segmented()
    }
}

// =============================================================================
// Tests
// =============================================================================
