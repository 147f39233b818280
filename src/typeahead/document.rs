//! Document seam + in-memory TextDocument
//!
//! The typeahead core never owns the editor. It reads text before the caret
//! and asks the document to swap a span for an entity through
//! [`TypeaheadDocument`].
//!
//! [`TextDocument`] is a single-paragraph implementation of that seam. It
//! holds text runs and typeahead entities and enforces segmented-atomic
//! editing for the entities:
//! - text typed next to an entity goes into a neighbouring text run
//! - deleting any character of an entity removes the whole entity
//! - entities are never merged with adjacent text

use serde::{Deserialize, Serialize};

use super::dom::{escape_html, DomConversionMap, DomElement};
use super::entity::{
    InlineEntity, SerializedTextNode, SerializedTypeaheadEntity, TextMode, TypeaheadEntity,
};
use super::error::{Result, TypeaheadError};

pub type NodeKey = u32;

// =============================================================================
// Document seam
// =============================================================================

/// The span to replace on commit: the last `len_chars` characters before
/// the caret, which must read `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaretSpan {
    pub len_chars: usize,
    pub text: String,
}

impl CaretSpan {
    pub fn new(text: &str) -> Self {
        Self {
            len_chars: text.chars().count(),
            text: text.to_string(),
        }
    }
}

/// Editing surface consumed by the typeahead core.
pub trait TypeaheadDocument {
    /// At most `window` characters before the caret, from the text run the
    /// caret sits in. `None` when the caret is not inside plain text.
    fn text_before_caret(&self, window: usize) -> Option<String>;

    /// Replace `span` (ending at the caret) with `entity`.
    fn replace_span(&mut self, span: &CaretSpan, entity: TypeaheadEntity) -> Result<NodeKey>;

    /// Move the selection onto `key`.
    fn select_node(&mut self, key: NodeKey);
}

// =============================================================================
// Inline nodes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineNode {
    Text { key: NodeKey, text: String },
    Typeahead { key: NodeKey, entity: TypeaheadEntity },
}

impl InlineNode {
    pub fn key(&self) -> NodeKey {
        match self {
            InlineNode::Text { key, .. } | InlineNode::Typeahead { key, .. } => *key,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            InlineNode::Text { text, .. } => text,
            InlineNode::Typeahead { entity, .. } => entity.display_text(),
        }
    }

    fn len_chars(&self) -> usize {
        self.text().chars().count()
    }

    pub fn as_entity(&self) -> Option<&TypeaheadEntity> {
        match self {
            InlineNode::Typeahead { entity, .. } => Some(entity),
            InlineNode::Text { .. } => None,
        }
    }
}

/// One child in a paragraph snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedInlineNode {
    Typeahead(SerializedTypeaheadEntity),
    Text(SerializedTextNode),
}

/// Paragraph snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub children: Vec<SerializedInlineNode>,
}

/// Incoming markup child for [`TextDocument::import_dom`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNode {
    Text(String),
    Element(DomElement),
}

// =============================================================================
// TextDocument
// =============================================================================

/// Single-paragraph document with a collapsed caret.
#[derive(Debug, Clone, Default)]
pub struct TextDocument {
    nodes: Vec<InlineNode>,
    /// Caret as a character offset over the whole paragraph
    caret: usize,
    selected: Option<NodeKey>,
    next_key: NodeKey,
}

impl TextDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document holding `text` with the caret at the end.
    pub fn from_text(text: &str) -> Self {
        let mut doc = Self::new();
        doc.insert_text(text);
        doc
    }

    pub fn nodes(&self) -> &[InlineNode] {
        &self.nodes
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn selected_node(&self) -> Option<NodeKey> {
        self.selected
    }

    /// Every node's visible text, concatenated.
    pub fn text_content(&self) -> String {
        self.nodes.iter().map(InlineNode::text).collect()
    }

    pub fn entities(&self) -> impl Iterator<Item = &TypeaheadEntity> {
        self.nodes.iter().filter_map(InlineNode::as_entity)
    }

    fn len_chars(&self) -> usize {
        self.nodes.iter().map(InlineNode::len_chars).sum()
    }

    fn alloc_key(&mut self) -> NodeKey {
        let key = self.next_key;
        self.next_key += 1;
        key
    }

    /// Move the caret. An offset inside an entity moves to the entity's end.
    pub fn set_caret(&mut self, offset: usize) {
        let offset = offset.min(self.len_chars());
        let mut start = 0;
        self.caret = offset;
        for node in &self.nodes {
            let end = start + node.len_chars();
            if node.as_entity().is_some() && offset > start && offset < end {
                self.caret = end;
                break;
            }
            start = end;
        }
        self.selected = None;
    }

    /// Node the caret is anchored in and the local offset. At a boundary
    /// the caret belongs to the node before it.
    fn anchor(&self) -> Option<(usize, usize)> {
        let mut start = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            let end = start + node.len_chars();
            if self.caret <= end && (self.caret > start || idx == 0) {
                return Some((idx, self.caret - start));
            }
            start = end;
        }
        None
    }

    /// Start offset of node `idx`.
    fn node_start(&self, idx: usize) -> usize {
        self.nodes[..idx].iter().map(InlineNode::len_chars).sum()
    }

    /// Insert text at the caret. Text never enters an entity: at an
    /// entity's edge it lands in the neighbouring text run.
    pub fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.selected = None;
        let inserted = text.chars().count();

        match self.anchor() {
            None => {
                let key = self.alloc_key();
                self.nodes.push(InlineNode::Text {
                    key,
                    text: text.to_string(),
                });
            }
            Some((idx, offset)) => {
                if let InlineNode::Text { text: run, .. } = &mut self.nodes[idx] {
                    let at = byte_offset(run, offset);
                    run.insert_str(at, text);
                } else {
                    // offset is 0 only for a leading entity at caret 0
                    let start = self.node_start(idx);
                    let (at, edge) = if offset == 0 {
                        (idx, start)
                    } else {
                        (idx + 1, start + self.nodes[idx].len_chars())
                    };
                    self.caret = edge;
                    let key = self.alloc_key();
                    self.nodes.insert(
                        at,
                        InlineNode::Text {
                            key,
                            text: text.to_string(),
                        },
                    );
                }
            }
        }

        self.caret += inserted;
        self.normalize();
    }

    /// Backspace. Removes a whole entity when the previous character
    /// belongs to one.
    pub fn delete_backward(&mut self) {
        self.selected = None;
        if self.caret == 0 {
            return;
        }
        let Some((idx, offset)) = self.anchor() else {
            return;
        };

        if let InlineNode::Text { text, .. } = &mut self.nodes[idx] {
            let from = byte_offset(text, offset - 1);
            let to = byte_offset(text, offset);
            text.replace_range(from..to, "");
            self.caret -= 1;
        } else {
            self.caret = self.node_start(idx);
            self.nodes.remove(idx);
        }
        self.normalize();
    }

    /// Drop empty text runs and merge adjacent ones. Entities are left as
    /// they are.
    fn normalize(&mut self) {
        let mut merged: Vec<InlineNode> = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.drain(..) {
            match node {
                InlineNode::Text { ref text, .. } if text.is_empty() => {}
                InlineNode::Text { key, text } => match merged.last_mut() {
                    Some(InlineNode::Text { text: prev, .. }) => prev.push_str(&text),
                    _ => merged.push(InlineNode::Text { key, text }),
                },
                entity => merged.push(entity),
            }
        }
        self.nodes = merged;
        self.caret = self.caret.min(self.len_chars());
    }

    // -------------------------------------------------------------------------
    // Snapshot / markup
    // -------------------------------------------------------------------------

    pub fn export_json(&self) -> DocumentSnapshot {
        let children = self
            .nodes
            .iter()
            .map(|node| match node {
                InlineNode::Text { text, .. } => SerializedInlineNode::Text(SerializedTextNode {
                    node_type: "text".to_string(),
                    version: 1,
                    text: text.clone(),
                    format: 0,
                    style: String::new(),
                    detail: 0,
                    mode: TextMode::Normal,
                }),
                InlineNode::Typeahead { entity, .. } => {
                    SerializedInlineNode::Typeahead(entity.export_json())
                }
            })
            .collect();
        DocumentSnapshot { children }
    }

    /// Rebuild a document from a snapshot, caret at the end.
    pub fn import_json(snapshot: &DocumentSnapshot) -> Result<Self> {
        let mut doc = Self::new();
        for child in &snapshot.children {
            match child {
                SerializedInlineNode::Typeahead(entity) => {
                    let entity = TypeaheadEntity::import_json(entity)?;
                    doc.push_entity(entity);
                }
                SerializedInlineNode::Text(text) => {
                    if text.node_type != "text" {
                        return Err(TypeaheadError::UnexpectedNodeType(text.node_type.clone()));
                    }
                    doc.push_text(&text.text);
                }
            }
        }
        doc.normalize();
        doc.caret = doc.len_chars();
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.export_json())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: DocumentSnapshot = serde_json::from_str(json)?;
        Self::import_json(&snapshot)
    }

    /// Paragraph contents as HTML: text escaped, entities as exported spans.
    pub fn to_html(&self) -> String {
        self.nodes
            .iter()
            .map(|node| match node {
                InlineNode::Text { text, .. } => escape_html(text, false),
                InlineNode::Typeahead { entity, .. } => entity.export_dom().to_html(),
            })
            .collect()
    }

    /// Build a document from markup children. Elements no importer claims
    /// (or whose conversion fails) become plain text.
    pub fn import_dom(children: &[DomNode], importers: &DomConversionMap<TypeaheadEntity>) -> Self {
        let mut doc = Self::new();
        for child in children {
            match child {
                DomNode::Text(text) => doc.push_text(text),
                DomNode::Element(element) => match importers.convert(element) {
                    Some(entity) => doc.push_entity(entity),
                    None => doc.push_text(&element.text_content),
                },
            }
        }
        doc.normalize();
        doc.caret = doc.len_chars();
        doc
    }

    fn push_text(&mut self, text: &str) {
        let key = self.alloc_key();
        self.nodes.push(InlineNode::Text {
            key,
            text: text.to_string(),
        });
    }

    fn push_entity(&mut self, entity: TypeaheadEntity) {
        let key = self.alloc_key();
        self.nodes.push(InlineNode::Typeahead { key, entity });
    }
}

impl TypeaheadDocument for TextDocument {
    fn text_before_caret(&self, window: usize) -> Option<String> {
        let (idx, offset) = match self.anchor() {
            Some(anchor) => anchor,
            None => return Some(String::new()),
        };
        let InlineNode::Text { text, .. } = &self.nodes[idx] else {
            return None;
        };
        let before = &text[..byte_offset(text, offset)];
        let skip = offset.saturating_sub(window);
        Some(before.chars().skip(skip).collect())
    }

    fn replace_span(&mut self, span: &CaretSpan, entity: TypeaheadEntity) -> Result<NodeKey> {
        let (idx, offset) = self
            .anchor()
            .ok_or_else(|| TypeaheadError::Document("caret is not in text".to_string()))?;
        let InlineNode::Text { text, .. } = &self.nodes[idx] else {
            return Err(TypeaheadError::Document("caret is not in text".to_string()));
        };
        if span.len_chars > offset {
            return Err(TypeaheadError::Document("span extends past the text run".to_string()));
        }

        let span_start = byte_offset(text, offset - span.len_chars);
        let caret_at = byte_offset(text, offset);
        if text[span_start..caret_at] != span.text {
            return Err(TypeaheadError::Document(format!(
                "expected `{}` before the caret, found `{}`",
                span.text,
                &text[span_start..caret_at]
            )));
        }

        let before = text[..span_start].to_string();
        let after = text[caret_at..].to_string();
        let node_start = self.node_start(idx);
        let entity_len = entity.display_text().chars().count();

        let before_key = self.nodes[idx].key();
        let entity_key = self.alloc_key();
        let after_key = self.alloc_key();
        self.nodes.splice(
            idx..=idx,
            [
                InlineNode::Text {
                    key: before_key,
                    text: before,
                },
                InlineNode::Typeahead {
                    key: entity_key,
                    entity,
                },
                InlineNode::Text {
                    key: after_key,
                    text: after,
                },
            ],
        );
        self.caret = node_start + (offset - span.len_chars) + entity_len;
        self.normalize();
        Ok(entity_key)
    }

    fn select_node(&mut self, key: NodeKey) {
        let mut end = 0;
        for node in &self.nodes {
            end += node.len_chars();
            if node.key() == key {
                self.caret = end;
                self.selected = Some(key);
                return;
            }
        }
    }
}

/// Byte index of the `chars`-th character of `text`.
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

// =============================================================================
// Tests
// =============================================================================
