//! Client IP extraction.
//!
//! The API usually runs behind Cloudflare or Fly.io, so the socket peer is
//! the proxy. Proxy headers are checked first, in this order:
//!
//! 1. `CF-Connecting-IP`
//! 2. `X-Forwarded-For` (first entry)
//! 3. `X-Real-IP`
//! 4. `Fly-Client-IP`
//!
//! and the peer address from [`ConnectInfo`] is the fallback.

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

use crate::error::AppError;

/// The requesting client's IP address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ip) = ip_from_headers(&parts.headers) {
            return Ok(Self(ip));
        }

        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| Self(addr.ip()))
            .ok_or_else(|| AppError::BadRequest("unable to determine client address".to_string()))
    }
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

/// Client IP as reported by an upstream proxy, if any.
#[must_use]
pub fn ip_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    ["cf-connecting-ip", "x-forwarded-for", "x-real-ip", "fly-client-ip"]
        .into_iter()
        .find_map(|name| header_ip(headers, name))
}
