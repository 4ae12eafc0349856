//! Request context.
//!
//! Identity and authorization are resolved once per request and threaded
//! explicitly through every later step - no repeated role lookups, no
//! hidden globals.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::logging::LogContext;

/// Who is calling, as resolved by the host's authentication layer.
///
/// `user_id` is `None` for anonymous callers. The IP is used for hashing
/// only and never persisted in plaintext.
#[derive(Debug, Clone, Default)]
pub struct CallerIdentity {
    pub user_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl CallerIdentity {
    pub fn authenticated(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            ip: None,
            user_agent: None,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Privileges resolved from the role store, once per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authorization {
    pub is_admin: bool,
}

/// Context for one operation invocation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub user_id: String,
    pub authorization: Authorization,
    pub now: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(user_id: &str, authorization: Authorization, now: DateTime<Utc>) -> Self {
        let request_id = format!("req-{}", &Uuid::new_v4().to_string()[..8]);
        Self {
            request_id,
            user_id: user_id.to_string(),
            authorization,
            now,
        }
    }

    pub fn log_context(&self) -> LogContext {
        LogContext::new(&self.request_id).with_user(&self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let now = Utc::now();
        let a = RequestContext::new("u", Authorization::default(), now);
        let b = RequestContext::new("u", Authorization::default(), now);
        assert_ne!(a.request_id, b.request_id);
        assert!(a.request_id.starts_with("req-"));
    }

    #[test]
    fn test_log_context_carries_user() {
        let ctx = RequestContext::new("user-9", Authorization { is_admin: true }, Utc::now());
        let rendered = format!("{}", ctx.log_context());
        assert!(rendered.contains("[user=user-9]"));
    }
}
