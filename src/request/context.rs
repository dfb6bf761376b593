//! Request context
//!
//! Tenant and header data passed through to the catalog and fetchers
//! without being interpreted by the planner.

use std::collections::BTreeMap;

use uuid::Uuid;

/// Context carried through planning and fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Request ID for log correlation
    pub request_id: Uuid,

    /// Tenant the request runs for
    pub tenant_id: String,

    /// Headers forwarded to backends
    pub headers: BTreeMap<String, String>,
}

impl RequestContext {
    /// Create a context for a tenant with a fresh request id
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            tenant_id: tenant_id.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Add a forwarded header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn request_id_string(&self) -> String {
        self.request_id.to_string()
    }
}
