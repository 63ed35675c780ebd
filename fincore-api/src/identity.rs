//! Trusted-header identity extraction (spec.md §6).
//!
//! The engine never authenticates a caller itself; it trusts
//! `X-Kratos-Authenticated-Identity-Id` as set by the gateway in front
//! of it, and only when the request arrived from that gateway's
//! configured address. Anything else is `AUTH_001` before a
//! transaction is ever opened.

use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use chrono::Utc;
use uuid::Uuid;

use fincore_coordinator::RequestContext;

use crate::error::ApiError;
use crate::AppState;

pub const IDENTITY_HEADER: &str = "x-kratos-authenticated-identity-id";

/// The caller extracted from the trusted header, plus the connection
/// metadata that ends up on the [`RequestContext`] audit trail.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Identity {
    /// Builds the [`RequestContext`] the coordinator expects, stamping a
    /// fresh correlation id and the current time.
    pub fn request_context(&self) -> RequestContext {
        RequestContext {
            user_id: self.user_id,
            request_id: Uuid::new_v4().to_string(),
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
            now: Utc::now(),
        }
    }
}

fn trusted_ip(trusted_gateway_addr: &str) -> Option<IpAddr> {
    if let Ok(addr) = trusted_gateway_addr.parse::<SocketAddr>() {
        return Some(addr.ip());
    }
    trusted_gateway_addr.parse::<IpAddr>().ok()
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let peer = parts.extensions.get::<ConnectInfo<SocketAddr>>().copied();

        if let Some(expected) = trusted_ip(&state.config.trusted_gateway_addr) {
            match peer {
                Some(ConnectInfo(addr)) if addr.ip() == expected => {}
                _ => return Err(ApiError(fincore_error::Error::auth_missing_identity())),
            }
        }

        let header = parts
            .headers
            .get(IDENTITY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError(fincore_error::Error::auth_missing_identity()))?;
        let user_id = Uuid::parse_str(header).map_err(|_| ApiError(fincore_error::Error::auth_missing_identity()))?;

        let user_agent = parts
            .headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(Identity {
            user_id,
            ip_address: peer.map(|ConnectInfo(addr)| addr.ip().to_string()),
            user_agent,
        })
    }
}
