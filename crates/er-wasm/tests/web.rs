#![cfg(target_arch = "wasm32")]

use er_core::Document;
use er_wasm::WebDocument;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;
use web_sys::Element;

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> web_sys::Document {
    web_sys::window().unwrap().document().unwrap()
}

/// Append `<div class="chat-entry" id=..><img data-emote-name=..></div>` to a
/// fresh chat list and return the list.
fn chat_list(list_id: &str, entries: &[(&str, Option<&str>)]) -> Element {
    let doc = document();
    let list = doc.create_element("div").unwrap();
    list.set_id(list_id);
    for (id, emote) in entries {
        let entry = doc.create_element("div").unwrap();
        entry.set_id(id);
        entry.set_class_name("chat-entry");
        if let Some(emote) = emote {
            let img = doc.create_element("img").unwrap();
            img.set_attribute("data-emote-name", emote).unwrap();
            entry.append_child(&img).unwrap();
        }
        list.append_child(&entry).unwrap();
    }
    doc.body().unwrap().append_child(&list).unwrap();
    list
}

fn child_ids(list: &Element) -> Vec<String> {
    let children = list.children();
    (0..children.length())
        .filter_map(|i| children.item(i))
        .map(|e| e.id())
        .collect()
}

fn ensure_init() {
    if !er_wasm::is_initialized() {
        er_wasm::init(None).unwrap();
    }
}

#[wasm_bindgen_test]
fn test_node_identity_is_stable() {
    let list = chat_list("identity", &[("i1", Some("IdentityEmote"))]);
    let web = WebDocument::new(document());

    let a = web.wrap(list.clone().into());
    let b = web.wrap(list.into());
    assert_eq!(a, b);

    let found = web.elements_with_attribute("data-emote-name", Some("IdentityEmote"));
    assert_eq!(found.len(), 1);
    let entry = web.closest_with_class(&found[0], "chat-entry").unwrap();
    assert_eq!(web.parent(&entry), Some(a));
}

#[wasm_bindgen_test]
fn test_start_and_stop_restore_in_place() {
    ensure_init();
    let list = chat_list(
        "start-stop",
        &[("s1", Some("WasmX")), ("s2", Some("WasmY")), ("s3", None)],
    );

    let keys = js_sys::Array::of1(&JsValue::from_str("WasmX"));
    assert_eq!(er_wasm::start(keys.into()).unwrap(), 1);
    assert_eq!(child_ids(&list), vec!["s2", "s3"]);

    assert_eq!(er_wasm::stop("WasmX").unwrap(), 1);
    assert_eq!(child_ids(&list), vec!["s1", "s2", "s3"]);
}

#[wasm_bindgen_test]
fn test_start_rejects_a_bare_string() {
    ensure_init();
    let list = chat_list("bare-string", &[("b1", Some("K"))]);

    assert!(er_wasm::start(JsValue::from_str("Kappa")).is_err());
    let active = js_sys::Array::from(&er_wasm::active_keys());
    assert!(!active.includes(&JsValue::from_str("K"), 0));
    assert_eq!(child_ids(&list), vec!["b1"]);
}

#[wasm_bindgen_test]
fn test_stored_list_edits() {
    let storage = web_sys::window().unwrap().local_storage().unwrap().unwrap();
    storage.set_item("emoteList", "not json").unwrap();

    let keys = js_sys::Array::from(&er_wasm::stored_keys().unwrap());
    assert_eq!(keys.length(), 0);

    er_wasm::add_stored_key("  StoredEmote ").unwrap();
    let keys = js_sys::Array::from(&er_wasm::add_stored_key("StoredEmote").unwrap());
    assert_eq!(keys.length(), 1);
    assert_eq!(storage.get_item("emoteList").unwrap().as_deref(), Some(r#"["StoredEmote"]"#));

    let keys = js_sys::Array::from(&er_wasm::remove_stored_key_at(0).unwrap());
    assert_eq!(keys.length(), 0);
}
