//! Bearer credential and the provider that yields it.

use std::fmt;
use std::future::Future;

use zeroize::Zeroizing;

/// Bearer token attached to every gateway call.
///
/// The inner string is zeroized on drop. `Debug` is redacted to prevent
/// credential leakage in log output.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(Zeroizing<String>);

impl BearerToken {
    /// Wrap a raw token. Blank input yields `None`: a blank token is the
    /// same as no token.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = Zeroizing::new(raw.into());
        if raw.trim().is_empty() {
            return None;
        }
        Some(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The `Authorization` header value for this token.
    pub fn authorization_value(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("Bearer {}", self.0.as_str()))
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// External collaborator supplying the session credential.
///
/// Returning `None` signals that no credential is stored; callers decide
/// what absence means for them.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> impl Future<Output = Option<BearerToken>> + Send;
}
