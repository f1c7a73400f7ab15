//! Tiny toast / notification helper.
//! Creates a `#th-toast-root` container once per page and appends toast divs
//! that fade out after a few seconds.

use gloo_timers::future::TimeoutFuture;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, HtmlElement};

const DISMISS_AFTER_MS: u32 = 4_000;

#[derive(Debug, Clone, Copy)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

pub fn success(msg: &str) {
    show(msg, ToastKind::Success);
}

pub fn error(msg: &str) {
    show(msg, ToastKind::Error);
}

pub fn info(msg: &str) {
    show(msg, ToastKind::Info);
}

pub fn show(message: &str, kind: ToastKind) {
    let window = match web_sys::window() {
        Some(w) => w,
        None => return,
    };
    let document = match window.document() {
        Some(d) => d,
        None => return,
    };

    let root = ensure_root(&document);

    let toast = document.create_element("div").unwrap();
    toast.set_class_name("th-toast");
    match kind {
        ToastKind::Success => toast.class_list().add_1("th-toast-success").unwrap(),
        ToastKind::Error => toast.class_list().add_1("th-toast-error").unwrap(),
        ToastKind::Info => toast.class_list().add_1("th-toast-info").unwrap(),
    };
    toast.set_text_content(Some(message));

    // Prepend so newest appears on top.
    let _ = root.prepend_with_node_1(&toast);

    let toast_el: HtmlElement = toast.unchecked_into();
    spawn_local(async move {
        TimeoutFuture::new(DISMISS_AFTER_MS).await;
        if let Some(parent) = toast_el.parent_node() {
            let _ = parent.remove_child(&toast_el);
        }
    });

    ensure_styles(&document);
}

fn ensure_root(document: &Document) -> Element {
    if let Some(el) = document.get_element_by_id("th-toast-root") {
        el
    } else {
        let root = document.create_element("div").unwrap();
        root.set_id("th-toast-root");
        root.set_class_name("th-toast-root");
        document.body().unwrap().append_child(&root).unwrap();
        root
    }
}

fn ensure_styles(document: &Document) {
    if document.get_element_by_id("th-toast-styles").is_some() {
        return;
    }

    let css = "
.th-toast-root{position:fixed;bottom:16px;right:16px;display:flex;flex-direction:column-reverse;gap:8px;z-index:9999;font-family:system-ui,sans-serif}
.th-toast{padding:10px 16px;border-radius:6px;color:#fff;box-shadow:0 2px 6px rgba(0,0,0,.15);opacity:0;animation:th-toast-in .2s forwards}
.th-toast-success{background:#15803d}
.th-toast-error{background:#b91c1c}
.th-toast-info{background:#1d4ed8}
@keyframes th-toast-in{to{opacity:1}}
";

    let style = document.create_element("style").unwrap();
    style.set_id("th-toast-styles");
    style.set_text_content(Some(css));
    if let Ok(Some(head)) = document.query_selector("head") {
        let _ = head.append_child(&style);
    } else {
        let _ = document.body().map(|b| b.append_child(&style));
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn show_creates_root_and_classed_toast() {
        show("saved", ToastKind::Success);

        let document = web_sys::window().unwrap().document().unwrap();
        let root = document.get_element_by_id("th-toast-root").unwrap();
        let toast = root.first_element_child().unwrap();
        assert!(toast.class_list().contains("th-toast-success"));
        assert_eq!(toast.text_content().as_deref(), Some("saved"));
    }
}
