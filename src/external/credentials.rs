use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Opaque bearer token obtained through the client-credentials grant
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Holds the token shared by every call made through the same client
///
/// Clones share the slot. A refresh replaces the token; the last write wins.
/// Callers read the token once per attempt and never hold the lock across I/O.
#[derive(Debug, Clone, Default)]
pub struct CredentialHolder {
    token: Arc<RwLock<Option<AccessToken>>>,
}

impl CredentialHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token))),
        }
    }

    pub async fn current(&self) -> Option<AccessToken> {
        self.token.read().await.clone()
    }

    pub async fn is_set(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub async fn replace(&self, token: AccessToken) {
        *self.token.write().await = Some(token);
    }

    pub async fn clear(&self) {
        *self.token.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_holder_starts_empty() {
        let holder = CredentialHolder::new();

        assert!(!holder.is_set().await);
        assert_eq!(holder.current().await, None);
    }

    #[tokio::test]
    async fn test_replace_overwrites_previous_token() {
        let holder = CredentialHolder::with_token(AccessToken::new("old"));
        holder.replace(AccessToken::new("new")).await;

        assert_eq!(holder.current().await, Some(AccessToken::new("new")));
    }

    #[tokio::test]
    async fn test_clones_share_the_same_slot() {
        let holder = CredentialHolder::new();
        let shared = holder.clone();

        shared.replace(AccessToken::new("abc")).await;
        assert_eq!(holder.current().await.unwrap().secret(), "abc");

        holder.clear().await;
        assert!(!shared.is_set().await);
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AccessToken::new("abc");

        assert_eq!(format!("{token:?}"), "AccessToken(***)");
        assert_eq!(token.bearer(), "Bearer abc");
    }
}
