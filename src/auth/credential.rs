//! Cached credential.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};

/// Safety margin before expiry at which a credential counts as stale.
pub const REFRESH_BUFFER: Duration = Duration::from_secs(30);

/// A secret plus its expiry. `expires_at == None` never expires.
#[derive(Clone)]
pub struct Credential {
    secret: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(secret: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            expires_at,
        }
    }

    /// Credential without expiry (static API keys).
    pub fn permanent(secret: impl Into<String>) -> Self {
        Self::new(secret, None)
    }

    /// Credential valid for `ttl` from now.
    pub fn expiring_in(secret: impl Into<String>, ttl: Duration) -> Self {
        Self::new(secret, Utc::now().checked_add_signed(delta(ttl)))
    }

    pub fn secret(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Utc::now() >= exp)
    }

    /// True when less than `buffer` remains before expiry.
    pub fn is_stale(&self, buffer: Duration) -> bool {
        self.expires_at
            .is_some_and(|exp| exp - Utc::now() < delta(buffer))
    }

    /// Time left before expiry, `None` for permanent credentials.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|exp| (exp - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }
}

fn delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
