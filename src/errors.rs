//! User-facing error taxonomy.
//!
//! Every backend-call failure is caught at the call site and converted into
//! one of these notices; nothing propagates as an uncaught fault and nothing
//! is fatal to the session.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// A read from the backend failed (network or server). The operation is
    /// abandoned; no automatic retry.
    #[error("Could not load {what}: {detail}")]
    Fetch { what: &'static str, detail: String },

    /// A write (message send, task create, read-acknowledgment) failed. The
    /// local model was not touched before the write succeeded, so nothing
    /// needs rolling back.
    #[error("Could not save {what}: {detail}")]
    Write { what: &'static str, detail: String },

    /// A username could not be resolved to a profile.
    #[error("No user named \"{username}\" was found")]
    Lookup { username: String },
}

impl ApiError {
    pub fn fetch(what: &'static str, detail: impl Into<String>) -> Self {
        ApiError::Fetch {
            what,
            detail: detail.into(),
        }
    }

    pub fn write(what: &'static str, detail: impl Into<String>) -> Self {
        ApiError::Write {
            what,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_render_for_toast_display() {
        let e = ApiError::fetch("conversations", "HTTP 500");
        assert_eq!(e.to_string(), "Could not load conversations: HTTP 500");

        let e = ApiError::Lookup {
            username: "ghost".into(),
        };
        assert!(e.to_string().contains("ghost"));
    }
}
