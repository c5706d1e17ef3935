//! Security Event Classification
//!
//! Maps (HTTP method, path, response status) to a semantic event type and
//! log severity via an ordered rule table evaluated most-specific-first.

use serde::{Deserialize, Serialize};

/// Semantic event types. The audit entry field is an open-ended string;
/// these constants cover the routes the CRM exposes today.
pub mod event_types {
    pub const USER_LOGIN: &str = "USER_LOGIN";
    pub const USER_LOGOUT: &str = "USER_LOGOUT";
    pub const PASSWORD_CHANGE: &str = "PASSWORD_CHANGE";
    pub const PASSWORD_RESET: &str = "PASSWORD_RESET";
    pub const MFA_ENROLL: &str = "MFA_ENROLL";
    pub const MFA_VERIFY: &str = "MFA_VERIFY";
    pub const ADMIN_ACTION: &str = "ADMIN_ACTION";
    pub const USER_CREATE: &str = "USER_CREATE";
    pub const USER_DELETE: &str = "USER_DELETE";
    pub const CONTACT_MUTATION: &str = "CONTACT_MUTATION";
    pub const COMPANY_MUTATION: &str = "COMPANY_MUTATION";
    pub const PROPERTY_CREATE: &str = "PROPERTY_CREATE";
    pub const PROPERTY_MUTATION: &str = "PROPERTY_MUTATION";
    pub const DEAL_MUTATION: &str = "DEAL_MUTATION";
    pub const DATA_EXPORT: &str = "DATA_EXPORT";
    pub const API_REQUEST: &str = "API_REQUEST";
}

/// Event types that always log at `warn` and feed the parallel
/// security-event stream.
pub const CRITICAL_EVENT_TYPES: &[&str] = &[
    event_types::USER_LOGIN,
    event_types::PASSWORD_CHANGE,
    event_types::PASSWORD_RESET,
    event_types::MFA_ENROLL,
    event_types::MFA_VERIFY,
    event_types::ADMIN_ACTION,
    event_types::USER_DELETE,
    event_types::DATA_EXPORT,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

/// One classification rule: method match (None = any) plus path prefix.
#[derive(Debug, Clone, Copy)]
struct Rule {
    method: Option<&'static str>,
    path_prefix: &'static str,
    event_type: &'static str,
}

/// Ordered most-specific-first; first match wins.
const RULES: &[Rule] = &[
    Rule {
        method: Some("POST"),
        path_prefix: "/api/auth/login",
        event_type: event_types::USER_LOGIN,
    },
    Rule {
        method: Some("POST"),
        path_prefix: "/api/auth/logout",
        event_type: event_types::USER_LOGOUT,
    },
    Rule {
        method: None,
        path_prefix: "/api/auth/password/reset",
        event_type: event_types::PASSWORD_RESET,
    },
    Rule {
        method: None,
        path_prefix: "/api/auth/password",
        event_type: event_types::PASSWORD_CHANGE,
    },
    Rule {
        method: Some("POST"),
        path_prefix: "/api/auth/mfa/verify",
        event_type: event_types::MFA_VERIFY,
    },
    Rule {
        method: None,
        path_prefix: "/api/auth/mfa",
        event_type: event_types::MFA_ENROLL,
    },
    Rule {
        method: Some("POST"),
        path_prefix: "/api/users",
        event_type: event_types::USER_CREATE,
    },
    Rule {
        method: Some("DELETE"),
        path_prefix: "/api/users",
        event_type: event_types::USER_DELETE,
    },
    Rule {
        method: None,
        path_prefix: "/api/admin",
        event_type: event_types::ADMIN_ACTION,
    },
    Rule {
        method: None,
        path_prefix: "/api/export",
        event_type: event_types::DATA_EXPORT,
    },
    Rule {
        method: Some("POST"),
        path_prefix: "/api/properties",
        event_type: event_types::PROPERTY_CREATE,
    },
    Rule {
        method: None,
        path_prefix: "/api/properties",
        event_type: event_types::PROPERTY_MUTATION,
    },
    Rule {
        method: None,
        path_prefix: "/api/contacts",
        event_type: event_types::CONTACT_MUTATION,
    },
    Rule {
        method: None,
        path_prefix: "/api/companies",
        event_type: event_types::COMPANY_MUTATION,
    },
    Rule {
        method: None,
        path_prefix: "/api/deals",
        event_type: event_types::DEAL_MUTATION,
    },
];

#[derive(Debug, Clone, Default)]
pub struct SecurityEventClassifier;

impl SecurityEventClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Derive the semantic event type for a request. Falls back to
    /// `API_REQUEST` when no rule matches, so classification is total.
    pub fn event_type(&self, method: &str, path: &str) -> &'static str {
        for rule in RULES {
            let method_ok = rule
                .method
                .map(|m| m.eq_ignore_ascii_case(method))
                .unwrap_or(true);
            if method_ok && path.starts_with(rule.path_prefix) {
                return rule.event_type;
            }
        }
        event_types::API_REQUEST
    }

    /// Severity policy: critical event types always log at warn; otherwise
    /// the response status decides.
    pub fn severity(&self, event_type: &str, status: u16) -> Severity {
        if CRITICAL_EVENT_TYPES.contains(&event_type) {
            Severity::Warn
        } else if status >= 500 {
            Severity::Error
        } else if status >= 400 {
            Severity::Warn
        } else {
            Severity::Info
        }
    }

    pub fn classify(&self, method: &str, path: &str, status: u16) -> (&'static str, Severity) {
        let event_type = self.event_type(method, path);
        (event_type, self.severity(event_type, status))
    }

    /// Whether this event type also feeds the non-chained security stream.
    pub fn is_high_value(&self, event_type: &str) -> bool {
        CRITICAL_EVENT_TYPES.contains(&event_type)
    }
}
