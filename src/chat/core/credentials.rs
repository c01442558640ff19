//! Bearer credential handed over by the authentication flow.

use std::fmt;

use crate::chat::core::errors::{ChatError, ChatResult};

/// Environment variable holding the bearer token.
pub const ENV_TOKEN: &str = "ENTERPRISEGPT_TOKEN";

/// Bearer token used for REST calls and the socket handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a token.
    ///
    /// # Errors
    /// Returns [`ChatError::MissingToken`] if the token is blank.
    pub fn new(token: impl Into<String>) -> ChatResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ChatError::MissingToken);
        }
        Ok(Self(token))
    }

    /// Read the token from `ENTERPRISEGPT_TOKEN`.
    ///
    /// # Errors
    /// Returns [`ChatError::MissingToken`] if the variable is unset or blank.
    pub fn from_env() -> ChatResult<Self> {
        std::env::var(ENV_TOKEN)
            .map_err(|_| ChatError::MissingToken)
            .and_then(Self::new)
    }

    /// Raw token value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}
