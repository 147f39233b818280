//! WASM bindings for the JS editor host.
//!
//! The JS side owns the editor, the menu rendering and the search callbacks.
//! Rust owns matching, sessions, and the entity model:
//! - `onTextChange(text)` runs arbitration and fires the search callback
//! - results come back through the `onResults` callback as a menu state
//! - `selectOption(value)` returns the entity snapshot and span to replace

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use super::conductor::TypeaheadConductor;
use super::config::TypeaheadPluginParams;
use super::document::{CaretSpan, NodeKey, TypeaheadDocument};
use super::dom::DomElement;
use super::entity::{InlineEntity, SerializedTypeaheadEntity, TypeaheadEntity};
use super::error::{ProviderError, Result as TypeaheadResult, TypeaheadError};
use super::provider::{dispatch, QueryTicket, SearchProvider, SearchResult};
use super::session::ResolveOutcome;
use crate::logging::ta_debug;

fn to_js_error(e: TypeaheadError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn describe_js(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

// =============================================================================
// JS search provider
// =============================================================================

/// `(query: string) => Promise<string[]> | string[]`
struct JsSearchProvider {
    callback: js_sys::Function,
}

impl SearchProvider for JsSearchProvider {
    fn search(&self, query: &str) -> LocalBoxFuture<'static, SearchResult> {
        let called = self.callback.call1(&JsValue::NULL, &JsValue::from_str(query));
        async move {
            let value = called.map_err(|e| ProviderError(describe_js(&e)))?;
            let value = match value.dyn_into::<js_sys::Promise>() {
                Ok(promise) => JsFuture::from(promise)
                    .await
                    .map_err(|e| ProviderError(describe_js(&e)))?,
                Err(value) => value,
            };
            serde_wasm_bindgen::from_value::<Vec<String>>(value)
                .map_err(|e| ProviderError(format!("expected string[]: {}", e)))
        }
        .boxed_local()
    }
}

// =============================================================================
// Commit capture
// =============================================================================

/// Stand-in document for commits: the JS editor performs the actual
/// replacement, so this only records what was requested.
#[derive(Default)]
struct PendingReplacement {
    replaced: Option<(CaretSpan, TypeaheadEntity)>,
}

impl TypeaheadDocument for PendingReplacement {
    fn text_before_caret(&self, _window: usize) -> Option<String> {
        None
    }

    fn replace_span(&mut self, span: &CaretSpan, entity: TypeaheadEntity) -> TypeaheadResult<NodeKey> {
        self.replaced = Some((span.clone(), entity));
        Ok(0)
    }

    fn select_node(&mut self, _key: NodeKey) {}
}

// =============================================================================
// JS payloads
// =============================================================================

/// Active match as reported to JS. `leadOffset` is in UTF-16 code units.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsTextMatch {
    type_name: String,
    lead_offset: usize,
    matching_string: String,
    replaceable_string: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsCommit {
    replaceable_string: String,
    node: SerializedTypeaheadEntity,
}

fn utf16_offset(text: &str, byte_offset: usize) -> usize {
    text.get(..byte_offset)
        .map(|prefix| prefix.encode_utf16().count())
        .unwrap_or(0)
}

// =============================================================================
// TypeaheadPlugin
// =============================================================================

/// Multi-trigger typeahead for one editor.
#[wasm_bindgen]
pub struct TypeaheadPlugin {
    conductor: Rc<RefCell<TypeaheadConductor>>,
    on_results: Rc<RefCell<Option<js_sys::Function>>>,
}

impl TypeaheadPlugin {
    fn with_conductor(conductor: TypeaheadConductor) -> Self {
        Self {
            conductor: Rc::new(RefCell::new(conductor)),
            on_results: Rc::new(RefCell::new(None)),
        }
    }

    /// Push the current menu (or null) to the results callback.
    fn notify(conductor: &RefCell<TypeaheadConductor>, on_results: &RefCell<Option<js_sys::Function>>) {
        let Some(callback) = on_results.borrow().clone() else {
            return;
        };
        let menu = conductor.borrow().menu();
        let payload = serde_wasm_bindgen::to_value(&menu).unwrap_or(JsValue::NULL);
        if let Err(e) = callback.call1(&JsValue::NULL, &payload) {
            web_sys::console::error_1(&format!("[TypeaheadPlugin] onResults threw: {}", describe_js(&e)).into());
        }
    }

    /// Run `ticket` in the background and apply its response if still current.
    fn spawn_query(&self, ticket: QueryTicket) {
        let Some(provider) = self.conductor.borrow().provider_for(&ticket) else {
            ta_debug!("TypeaheadPlugin", "no search callback for {}", ticket.type_name);
            return;
        };
        let conductor = Rc::clone(&self.conductor);
        let on_results = Rc::clone(&self.on_results);

        wasm_bindgen_futures::spawn_local(async move {
            let response = dispatch(&*provider, ticket).await;
            let outcome = conductor.borrow_mut().resolve(response);
            if outcome != ResolveOutcome::Stale {
                Self::notify(&conductor, &on_results);
            }
        });
    }
}

#[wasm_bindgen]
impl TypeaheadPlugin {
    /// Create from `{ configs: [{ type, trigger, maxResults?, className? }] }`
    #[wasm_bindgen(constructor)]
    pub fn js_new(params: JsValue) -> Result<TypeaheadPlugin, JsValue> {
        let params: TypeaheadPluginParams = serde_wasm_bindgen::from_value(params)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse typeahead params: {}", e)))?;
        let conductor = TypeaheadConductor::from_params(params).map_err(to_js_error)?;
        Ok(Self::with_conductor(conductor))
    }

    /// Create from a JSON params string
    #[wasm_bindgen(js_name = fromJson)]
    pub fn js_from_json(json: &str) -> Result<TypeaheadPlugin, JsValue> {
        let params = TypeaheadPluginParams::from_json(json).map_err(to_js_error)?;
        let conductor = TypeaheadConductor::from_params(params).map_err(to_js_error)?;
        Ok(Self::with_conductor(conductor))
    }

    /// Register the search callback for one typeahead type
    #[wasm_bindgen(js_name = setSearchCallback)]
    pub fn js_set_search_callback(&self, type_name: &str, callback: js_sys::Function) -> Result<(), JsValue> {
        self.conductor
            .borrow_mut()
            .set_provider(type_name, Rc::new(JsSearchProvider { callback }))
            .map_err(to_js_error)
    }

    /// Register the menu callback, called with a menu state or null
    #[wasm_bindgen(js_name = onResults)]
    pub fn js_on_results(&self, callback: js_sys::Function) {
        *self.on_results.borrow_mut() = Some(callback);
    }

    /// Feed the text before the caret. Returns the active match or null.
    #[wasm_bindgen(js_name = onTextChange)]
    pub fn js_on_text_change(&self, text: &str) -> JsValue {
        let change = self.conductor.borrow_mut().on_text_change(text);

        if let Some(ticket) = change.ticket {
            self.spawn_query(ticket);
        }
        if change.active.is_none() {
            Self::notify(&self.conductor, &self.on_results);
        }

        let conductor = self.conductor.borrow();
        let Some(session) = conductor.active_session() else {
            return JsValue::NULL;
        };
        let Some(candidate) = session.candidate() else {
            return JsValue::NULL;
        };
        let payload = JsTextMatch {
            type_name: session.type_name().to_string(),
            lead_offset: utf16_offset(text, candidate.lead_offset),
            matching_string: candidate.matching_string.clone(),
            replaceable_string: candidate.replaceable_string.clone(),
        };
        serde_wasm_bindgen::to_value(&payload).unwrap_or(JsValue::NULL)
    }

    /// Current menu state or null
    #[wasm_bindgen(js_name = menu)]
    pub fn js_menu(&self) -> JsValue {
        let menu = self.conductor.borrow().menu();
        serde_wasm_bindgen::to_value(&menu).unwrap_or(JsValue::NULL)
    }

    #[wasm_bindgen(js_name = setHighlightedIndex)]
    pub fn js_set_highlighted_index(&self, index: usize) -> bool {
        let changed = self.conductor.borrow_mut().set_highlighted_index(index);
        if changed {
            Self::notify(&self.conductor, &self.on_results);
        }
        changed
    }

    #[wasm_bindgen(js_name = highlightNext)]
    pub fn js_highlight_next(&self) {
        self.conductor.borrow_mut().highlight_next();
        Self::notify(&self.conductor, &self.on_results);
    }

    #[wasm_bindgen(js_name = highlightPrevious)]
    pub fn js_highlight_previous(&self) {
        self.conductor.borrow_mut().highlight_previous();
        Self::notify(&self.conductor, &self.on_results);
    }

    /// Commit `value`. Returns `{ replaceableString, node }`; the host
    /// replaces the span with a node built from the snapshot.
    #[wasm_bindgen(js_name = selectOption)]
    pub fn js_select_option(&self, value: &str) -> Result<JsValue, JsValue> {
        let mut pending = PendingReplacement::default();
        self.conductor
            .borrow_mut()
            .select_option(value, &mut pending)
            .map_err(to_js_error)?;
        Self::notify(&self.conductor, &self.on_results);

        let (span, entity) = pending
            .replaced
            .ok_or_else(|| JsValue::from_str("selection produced no replacement"))?;
        let commit = JsCommit {
            replaceable_string: span.text,
            node: entity.export_json(),
        };
        serde_wasm_bindgen::to_value(&commit)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Close any open menu
    #[wasm_bindgen(js_name = cancel)]
    pub fn js_cancel(&self) {
        self.conductor.borrow_mut().cancel();
        Self::notify(&self.conductor, &self.on_results);
    }
}

// =============================================================================
// Entity helpers
// =============================================================================

fn snapshot_from_js(snapshot: JsValue) -> Result<TypeaheadEntity, JsValue> {
    let snapshot: SerializedTypeaheadEntity = serde_wasm_bindgen::from_value(snapshot)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse typeahead node: {}", e)))?;
    TypeaheadEntity::import_json(&snapshot).map_err(to_js_error)
}

fn snapshot_to_js(entity: &TypeaheadEntity) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&entity.export_json())
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn element_from_dom(element: &DomElement) -> Result<web_sys::Element, JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document available"))?;
    let out = document.create_element(&element.tag_name)?;
    for (name, value) in &element.attributes {
        out.set_attribute(name, value)?;
    }
    out.set_text_content(Some(&element.text_content));
    Ok(out)
}

fn dom_from_element(element: &web_sys::Element) -> DomElement {
    let mut dom = DomElement::new(element.tag_name());
    for name in element.get_attribute_names().iter() {
        if let Some(name) = name.as_string() {
            if let Some(value) = element.get_attribute(&name) {
                dom.set_attribute(&name, value);
            }
        }
    }
    dom.with_text(element.text_content().unwrap_or_default())
}

/// Build a typeahead node snapshot
#[wasm_bindgen(js_name = createTypeaheadNode)]
pub fn js_create_typeahead_node(
    typeahead_type: &str,
    content: &str,
    trigger: &str,
    text: Option<String>,
) -> Result<JsValue, JsValue> {
    let entity = TypeaheadEntity::create(typeahead_type, content, trigger, text.as_deref())
        .map_err(to_js_error)?;
    snapshot_to_js(&entity)
}

/// Exported markup element for a node snapshot
#[wasm_bindgen(js_name = exportTypeaheadDom)]
pub fn js_export_typeahead_dom(snapshot: JsValue) -> Result<web_sys::Element, JsValue> {
    let entity = snapshot_from_js(snapshot)?;
    element_from_dom(&entity.export_dom())
}

/// Live editor element for a node snapshot
#[wasm_bindgen(js_name = createTypeaheadDom)]
pub fn js_create_typeahead_dom(snapshot: JsValue) -> Result<web_sys::Element, JsValue> {
    let entity = snapshot_from_js(snapshot)?;
    element_from_dom(&entity.create_dom())
}

/// Exported markup as an HTML string
#[wasm_bindgen(js_name = exportTypeaheadHtml)]
pub fn js_export_typeahead_html(snapshot: JsValue) -> Result<String, JsValue> {
    let entity = snapshot_from_js(snapshot)?;
    Ok(entity.export_dom().to_html())
}

/// Node snapshot for a claimed element, or null when the element is not a
/// typeahead span
#[wasm_bindgen(js_name = importTypeaheadDom)]
pub fn js_import_typeahead_dom(element: &web_sys::Element) -> JsValue {
    let dom = dom_from_element(element);
    match TypeaheadEntity::import_dom().convert(&dom) {
        Some(entity) => snapshot_to_js(&entity).unwrap_or(JsValue::NULL),
        None => JsValue::NULL,
    }
}
