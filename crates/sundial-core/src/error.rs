use thiserror::Error;

/// Failure taxonomy for store actions and the gateway.
///
/// `NotFoundLocal` is not a user error: it means an id the server just
/// acknowledged is missing from the local cache, i.e. cache/server
/// divergence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No HTTP response reached the client.
    #[error("network unreachable: {0}")]
    Network(String),

    /// The server answered with an error status.
    #[error("api error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// HTTP 400 on a uniqueness constraint (tag/category title).
    #[error("title already exists")]
    Conflict,

    /// An id expected in cache is absent.
    #[error("{kind} {id} not found in local cache")]
    NotFoundLocal { kind: &'static str, id: i64 },

    /// Token refresh failed; re-authentication is required.
    #[error("authentication expired, login required")]
    Auth,
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict)
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, StoreError::Auth)
    }

    /// HTTP status carried by the error, when one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Api { status, .. } => Some(*status),
            StoreError::Conflict => Some(400),
            StoreError::Auth => Some(401),
            StoreError::Network(_) | StoreError::NotFoundLocal { .. } => None,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_reports_status_400() {
        assert_eq!(StoreError::Conflict.status(), Some(400));
        assert!(StoreError::Conflict.is_conflict());
    }

    #[test]
    fn network_error_has_no_status() {
        let err = StoreError::Network("connection refused".into());
        assert_eq!(err.status(), None);
        assert!(!err.is_conflict());
    }

    #[test]
    fn not_found_local_names_kind_and_id() {
        let err = StoreError::NotFoundLocal { kind: "task", id: 9 };
        assert_eq!(err.to_string(), "task 9 not found in local cache");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StoreError>();
    }
}
