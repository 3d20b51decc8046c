use std::fmt;

/// Environment variable holding the session token
pub const SESSION_TOKEN_ENV: &str = "FAKKU_ZID";

/// Session token issued to the reader (the `fakku_zid` cookie).
///
/// It is a capability secret, so `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken {
    token: String,
}

impl SessionToken {
    /// create new session token
    pub fn new(token: &str) -> Self {
        Self {
            token: token.trim().to_string(),
        }
    }

    /// get the raw token value
    pub fn value(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let token = SessionToken::new("deadbeef");
        let debug = format!("{:?}", token);
        assert!(!debug.contains("deadbeef"));
        assert_eq!(token.value(), "deadbeef");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(SessionToken::new(" abc\n").value(), "abc");
    }
}
