use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::libs::error::{EditorError, Result};
use crate::libs::session::{Clock, Session, SessionStore};

/// Loopback and any-local (unspecified) addresses, including IPv4-mapped IPv6.
pub fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_unspecified(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback() || v4.is_unspecified())
        }
    }
}

pub fn require_loopback(remote: SocketAddr) -> Result<()> {
    if is_loopback(remote.ip()) {
        Ok(())
    } else {
        warn!("editor request from non-loopback address {}", remote);
        Err(EditorError::Forbidden("forbidden".to_string()))
    }
}

/// Extracts the token from an `Authorization` header. The `Bearer ` prefix is optional.
///
/// A bare `Bearer` with nothing after it is taken as the token itself and so
/// fails authorization as an invalid token.
pub fn bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    (!token.is_empty()).then_some(token)
}

/// Root-password login and token checks for the editor.
pub struct EditorAuth {
    root_password: String,
    ttl: Duration,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
}

impl EditorAuth {
    pub fn new(
        root_password: impl Into<String>,
        ttl: Duration,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            root_password: root_password.into(),
            ttl,
            sessions,
            clock,
        }
    }

    /// Mints a fresh token, superseding any earlier session.
    pub async fn login(&self, password: Option<&str>) -> Result<Session> {
        if password != Some(self.root_password.as_str()) {
            warn!("editor login rejected");
            return Err(EditorError::unauthorized("invalid password"));
        }
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(self.ttl)
            .ok_or_else(|| EditorError::Config("token TTL overflows the clock".to_string()))?;
        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            expires_at,
        };
        self.sessions.set(session.clone()).await;
        info!("editor session issued, expires at {}", session.expires_at);
        Ok(session)
    }

    pub async fn authorize(&self, header: Option<&str>) -> Result<()> {
        let token = header
            .and_then(bearer_token)
            .ok_or_else(|| EditorError::unauthorized("missing token"))?;
        match self.sessions.get().await {
            Some(current) if current.token == token && !current.is_expired(self.clock.now()) => Ok(()),
            _ => {
                warn!("editor request with invalid or expired token");
                Err(EditorError::unauthorized("invalid token"))
            }
        }
    }
}
