// Confirmation Token Issuer Port

/// A freshly issued confirmation token with its absolute expiry instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub value: String,
    pub expires_at: i64, // epoch ms
}

/// Token issuer interface (allows deterministic tokens in tests)
///
/// Tokens must be effectively unguessable and unique among live tokens.
/// They are single-use in effect: confirmation moves the owning ticket out
/// of CALLED, after which the same value can never match again.
pub trait TokenIssuer: Send + Sync {
    /// Issue a fresh token expiring at `now_millis + ttl`
    fn issue(&self, now_millis: i64) -> IssuedToken;
}

/// UUID v4 token issuer (production)
pub struct UuidTokenIssuer {
    ttl_ms: i64,
}

impl UuidTokenIssuer {
    pub fn new(ttl_ms: i64) -> Self {
        Self { ttl_ms }
    }
}

impl TokenIssuer for UuidTokenIssuer {
    fn issue(&self, now_millis: i64) -> IssuedToken {
        IssuedToken {
            value: uuid::Uuid::new_v4().simple().to_string(),
            expires_at: now_millis + self.ttl_ms,
        }
    }
}
