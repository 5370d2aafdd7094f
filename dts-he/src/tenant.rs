//! Tenant context
//!
//! The tenant (`country_accounts_id`) arrives in the `x-country-accounts-id`
//! header, set by the authenticating front end. Every data handler takes a
//! [`Tenant`] so queries cannot run unscoped.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// Header carrying the tenant id
pub const TENANT_HEADER: &str = "x-country-accounts-id";

/// Authorised tenant of the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant(pub String);

impl Tenant {
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Missing tenant context".to_string()))?;

        Ok(Tenant(value.to_string()))
    }
}
