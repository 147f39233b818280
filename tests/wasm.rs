//! Browser tests for the JS bindings.
//!
//! Run with `wasm-pack test --headless --chrome`.

#![cfg(target_arch = "wasm32")]

use js_sys::{Array, Function, Reflect};
use typeahead_core::{
    js_create_typeahead_node, js_export_typeahead_dom, js_export_typeahead_html, js_import_typeahead_dom,
    TypeaheadPlugin,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn plugin() -> TypeaheadPlugin {
    TypeaheadPlugin::js_from_json(
        r##"{"configs":[{"type":"mention","trigger":"@","maxResults":2},{"type":"hashtag","trigger":"#"}]}"##,
    )
    .unwrap()
}

fn get(value: &JsValue, key: &str) -> JsValue {
    Reflect::get(value, &JsValue::from_str(key)).unwrap()
}

/// Wait one macrotask so spawned provider futures settle.
async fn tick() {
    let promise = js_sys::Promise::new(&mut |resolve, _| {
        web_sys::window()
            .unwrap()
            .set_timeout_with_callback(&resolve)
            .unwrap();
    });
    JsFuture::from(promise).await.unwrap();
}

#[wasm_bindgen_test]
fn test_plugin_rejects_duplicate_types() {
    let result = TypeaheadPlugin::js_from_json(
        r##"{"configs":[{"type":"mention","trigger":"@"},{"type":"mention","trigger":"#"}]}"##,
    );
    assert!(result.is_err());
}

#[wasm_bindgen_test]
fn test_text_change_reports_utf16_offset() {
    let plugin = plugin();
    let found = plugin.js_on_text_change("😀 @al");

    assert_eq!(get(&found, "typeName").as_string().as_deref(), Some("mention"));
    assert_eq!(get(&found, "matchingString").as_string().as_deref(), Some("al"));
    // Surrogate pair (2) + space (1)
    assert_eq!(get(&found, "leadOffset").as_f64(), Some(3.0));

    assert!(plugin.js_on_text_change("😀 @al ").is_null());
}

#[wasm_bindgen_test]
async fn test_search_results_reach_callback() {
    let plugin = plugin();
    let search = Function::new_with_args("q", "return Promise.resolve([q + 'ice', q + 'bert', q + 'fred']);");
    plugin.js_set_search_callback("mention", search).unwrap();

    let sink = Array::new();
    let on_results = Function::new_with_args("sink", "return (menu) => sink.push(menu);")
        .call1(&JsValue::NULL, &sink)
        .unwrap();
    plugin.js_on_results(on_results.unchecked_into());

    plugin.js_on_text_change("hi @al");
    tick().await;

    let menu = sink.pop();
    let options: Array = get(&menu, "options").unchecked_into();
    assert_eq!(options.length(), 2);
    assert_eq!(get(&options.get(0), "value").as_string().as_deref(), Some("alice"));

    let commit = plugin.js_select_option("alice").unwrap();
    assert_eq!(get(&commit, "replaceableString").as_string().as_deref(), Some("@al"));
    let node = get(&commit, "node");
    assert_eq!(get(&node, "text").as_string().as_deref(), Some("@alice"));
    assert!(plugin.js_menu().is_null());
}

#[wasm_bindgen_test]
fn test_dom_export_import() {
    let node = js_create_typeahead_node("mention", "bob", "@", None).unwrap();

    let html = js_export_typeahead_html(node.clone()).unwrap();
    assert!(html.starts_with("<span data-lexical-typeahead=\"true\""));

    let element = js_export_typeahead_dom(node).unwrap();
    assert_eq!(element.text_content().as_deref(), Some("@bob"));

    let imported = js_import_typeahead_dom(&element);
    assert_eq!(get(&imported, "content").as_string().as_deref(), Some("bob"));
    assert_eq!(get(&imported, "typeaheadType").as_string().as_deref(), Some("mention"));
}
