//! # Identity Extraction
//!
//! Login happens upstream; requests arrive with the authenticated identity in
//! the `x-identity-id` header. The extractor resolves it to the business
//! account it acts for.
//!
//! ```text
//! x-identity-id: alice
//!        │
//!        ▼
//! account_members: alice → farm-1      (no row: identity is its own account)
//!        │
//!        ▼
//! CurrentActor(Actor { identity_id: "alice", account_id: "farm-1" })
//! ```

use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;
use harvest_core::Actor;

/// Header carrying the authenticated identity.
pub const IDENTITY_HEADER: &str = "x-identity-id";

const MAX_IDENTITY_LENGTH: usize = 128;

/// The resolved caller of a request.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

impl Deref for CurrentActor {
    type Target = Actor;

    fn deref(&self) -> &Actor {
        &self.0
    }
}

impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let identity = parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::unauthorized(format!("Missing {IDENTITY_HEADER} header")))?;

        if identity.len() > MAX_IDENTITY_LENGTH {
            return Err(ApiError::unauthorized("Identity is too long"));
        }

        let actor = state.db.accounts().resolve(identity).await?;
        debug!(identity = %actor.identity_id, account = %actor.account_id, "Resolved actor");

        Ok(CurrentActor(actor))
    }
}
