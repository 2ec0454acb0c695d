//! Credential checking

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::session::Session;

/// A fixed login entry
#[derive(Debug, Clone, Copy)]
pub struct Credential {
    pub username: &'static str,
    pub password: &'static str,
    pub email: &'static str,
}

/// Mock identity table; not a real credential system
pub const CREDENTIALS: &[Credential] = &[
    Credential {
        username: "admin",
        password: "admin123",
        email: "admin@example.com",
    },
    Credential {
        username: "user",
        password: "user123",
        email: "user@example.com",
    },
];

/// Validates a username/password pair and issues the resulting session
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Returns the session for a matching pair, `None` otherwise
    async fn validate(&self, username: &str, password: &str) -> Option<Session>;
}

/// Checks against [`CREDENTIALS`] after a simulated network delay
#[derive(Debug, Clone)]
pub struct StaticAuthenticator {
    credentials: &'static [Credential],
    delay: Duration,
}

impl StaticAuthenticator {
    pub fn new(delay: Duration) -> Self {
        Self {
            credentials: CREDENTIALS,
            delay,
        }
    }

    pub fn with_credentials(credentials: &'static [Credential], delay: Duration) -> Self {
        Self { credentials, delay }
    }

    fn find(&self, username: &str, password: &str) -> Option<&Credential> {
        self.credentials
            .iter()
            .find(|c| c.username == username && c.password == password)
    }
}

impl Default for StaticAuthenticator {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn validate(&self, username: &str, password: &str) -> Option<Session> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let found = self.find(username, password);
        debug!(username, matched = found.is_some(), "Checked credentials");
        found.map(|c| Session::new(c.username, Some(c.email.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_table_entry_validates() {
        let auth = StaticAuthenticator::new(Duration::ZERO);
        for cred in CREDENTIALS {
            let session = auth.validate(cred.username, cred.password).await.unwrap();
            assert_eq!(session.username, cred.username);
            assert_eq!(session.email.as_deref(), Some(cred.email));
        }
    }

    #[tokio::test]
    async fn test_mismatches_are_rejected() {
        let auth = StaticAuthenticator::new(Duration::ZERO);
        assert!(auth.validate("admin", "user123").await.is_none());
        assert!(auth.validate("user", "admin123").await.is_none());
        assert!(auth.validate("Admin", "admin123").await.is_none());
        assert!(auth.validate("admin", "admin123 ").await.is_none());
        assert!(auth.validate("", "").await.is_none());
    }

    #[tokio::test]
    async fn test_custom_table() {
        static TABLE: &[Credential] = &[Credential {
            username: "ana",
            password: "secreto",
            email: "ana@example.com",
        }];
        let auth = StaticAuthenticator::with_credentials(TABLE, Duration::ZERO);
        assert!(auth.validate("ana", "secreto").await.is_some());
        assert!(auth.validate("admin", "admin123").await.is_none());
    }
}
