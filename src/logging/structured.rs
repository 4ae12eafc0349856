//! Request-scoped log context.
//!
//! Every decision point in the pipeline logs through a `LogContext`
//! prefix, so grepping one request id yields the full trail of a
//! submission or analysis: received, limited, flagged, stored.

use std::fmt;

/// Prefix carried through one operation invocation.
///
/// The user id is attached once identity resolution has happened;
/// before that point only the request id is known.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub request_id: String,
    pub user_id: Option<String>,
}

impl LogContext {
    pub fn new(request_id: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            user_id: None,
        }
    }

    /// A copy of this context with the user attached.
    pub fn with_user(&self, user_id: &str) -> Self {
        Self {
            request_id: self.request_id.clone(),
            user_id: Some(user_id.to_string()),
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[request={}]", self.request_id)?;
        if let Some(uid) = &self.user_id {
            write!(f, " [user={}]", uid)?;
        }
        Ok(())
    }
}
