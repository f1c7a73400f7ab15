pub mod chat;

/// Signal the presentational layer that a section of state changed. The
/// render layer listens for these DOM events and re-reads state; nothing in
/// this crate renders directly.
#[cfg(target_arch = "wasm32")]
pub fn notify_render(section: &str) {
    if let Some(document) = web_sys::window().and_then(|w| w.document()) {
        if let Ok(event) = web_sys::Event::new(&format!("taskhive:render:{section}")) {
            let _ = document.dispatch_event(&event);
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn notify_render(_section: &str) {}
