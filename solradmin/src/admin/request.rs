//! Query string building for admin calls

/// Which admin handler a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminEndpoint {
    Collections,
    Cores,
}

impl AdminEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            AdminEndpoint::Collections => "/admin/collections",
            AdminEndpoint::Cores => "/admin/cores",
        }
    }
}

/// An admin action plus its parameters.
///
/// `action` always leads the query, absent parameters are dropped and
/// `wt=json` is appended last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRequest {
    endpoint: AdminEndpoint,
    action: &'static str,
    params: Vec<(&'static str, String)>,
}

impl AdminRequest {
    pub fn collections(action: &'static str) -> Self {
        Self {
            endpoint: AdminEndpoint::Collections,
            action,
            params: Vec::new(),
        }
    }

    pub fn cores(action: &'static str) -> Self {
        Self {
            endpoint: AdminEndpoint::Cores,
            action,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.params.push((key, value.into()));
        self
    }

    /// Add `key` only when a non-empty value is present
    pub fn opt_param(self, key: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => self.param(key, v),
            _ => self,
        }
    }

    /// Add `key=true` only when set
    pub fn flag(self, key: &'static str, set: bool) -> Self {
        if set {
            self.param(key, "true")
        } else {
            self
        }
    }

    pub fn action(&self) -> &'static str {
        self.action
    }

    pub fn endpoint(&self) -> AdminEndpoint {
        self.endpoint
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(self.params.len() + 2);
        pairs.push(("action", self.action.to_string()));
        pairs.extend(self.params.iter().cloned());
        pairs.push(("wt", "json".to_string()));
        pairs
    }
}
