//! Resolves request credentials to a session, refreshing it lazily.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use gatehouse_core::error::AppError;
use gatehouse_core::result::AppResult;
use gatehouse_core::traits::Clock;
use gatehouse_entity::Session;

use crate::credentials::{CredentialBackend, Credentials};

/// A session that survived resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    /// The verified session.
    pub session: Session,
    /// Whether the token pair was replaced during this resolution and must be
    /// written back to the client.
    pub refreshed: bool,
}

/// Obtains the caller's session from request credentials.
///
/// Every failure resolves to anonymous. A refresh is attempted at most once
/// per call and every backend call is bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct SessionResolver {
    backend: Arc<dyn CredentialBackend>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl SessionResolver {
    /// Creates a resolver.
    pub fn new(backend: Arc<dyn CredentialBackend>, clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self {
            backend,
            clock,
            timeout,
        }
    }

    /// Resolve `credentials` to a session, or `None` for an anonymous caller.
    pub async fn resolve(&self, credentials: &Credentials) -> Option<ResolvedSession> {
        if credentials.is_empty() {
            return None;
        }
        let now = self.clock.now();

        let Some(access_token) = credentials.access_token.as_deref() else {
            return self.refresh(None, credentials, now).await;
        };

        let inspected = match self.bounded(self.backend.inspect(access_token)).await {
            Ok(inspected) => inspected,
            Err(e) => {
                debug!(error = %e, "Access token rejected");
                return None;
            }
        };

        let session = Session {
            subject_id: inspected.subject_id,
            access_token: access_token.to_string(),
            refresh_token: credentials.refresh_token.clone().unwrap_or_default(),
            expires_at_epoch_seconds: inspected.expires_at_epoch_seconds,
        };

        if session.is_expired_at(now) {
            return self.refresh(Some(session), credentials, now).await;
        }

        Some(ResolvedSession {
            session,
            refreshed: false,
        })
    }

    /// The single refresh attempt of this resolution.
    async fn refresh(
        &self,
        expired: Option<Session>,
        credentials: &Credentials,
        now: DateTime<Utc>,
    ) -> Option<ResolvedSession> {
        let Some(refresh_token) = credentials.refresh_token.as_deref() else {
            debug!("Session expired and no refresh token present");
            return None;
        };

        let fresh = match self.bounded(self.backend.refresh(refresh_token, now)).await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(error = %e, "Session refresh failed");
                return None;
            }
        };

        let session = match expired {
            Some(mut session) => {
                if session.subject_id != fresh.subject_id {
                    warn!(
                        subject_id = %session.subject_id,
                        refreshed_subject_id = %fresh.subject_id,
                        "Refresh token belongs to a different subject"
                    );
                    return None;
                }
                session.replace_tokens(
                    fresh.access_token,
                    fresh.refresh_token,
                    fresh.expires_at_epoch_seconds,
                );
                session
            }
            None => fresh,
        };

        info!(subject_id = %session.subject_id, "Session refreshed");
        Some(ResolvedSession {
            session,
            refreshed: true,
        })
    }

    async fn bounded<T>(&self, call: impl Future<Output = AppResult<T>>) -> AppResult<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| AppError::store_failure("Credential backend timed out"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use gatehouse_core::ManualClock;
    use gatehouse_core::config::AuthConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    use crate::credentials::{InspectedToken, JwtCredentialBackend};
    use crate::jwt::JwtEncoder;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn resolver(clock: &ManualClock) -> SessionResolver {
        SessionResolver::new(
            Arc::new(JwtCredentialBackend::new(&AuthConfig::default())),
            Arc::new(clock.clone()),
            Duration::from_secs(1),
        )
    }

    fn credentials(subject: Uuid, issued_at: DateTime<Utc>) -> Credentials {
        let pair = JwtEncoder::new(&AuthConfig::default())
            .generate_token_pair(subject, issued_at)
            .unwrap();
        Credentials {
            access_token: Some(pair.access_token),
            refresh_token: Some(pair.refresh_token),
        }
    }

    #[tokio::test]
    async fn test_no_credentials_is_anonymous() {
        let clock = ManualClock::new(t0());
        assert!(resolver(&clock).resolve(&Credentials::default()).await.is_none());
    }

    #[tokio::test]
    async fn test_unexpired_session_is_returned_unchanged() {
        let clock = ManualClock::new(t0());
        let subject = Uuid::new_v4();
        let creds = credentials(subject, t0());

        let resolved = resolver(&clock).resolve(&creds).await.unwrap();
        assert!(!resolved.refreshed);
        assert_eq!(resolved.session.subject_id, subject);
        assert_eq!(Some(resolved.session.access_token), creds.access_token);
    }

    #[tokio::test]
    async fn test_expired_session_is_refreshed_once() {
        let clock = ManualClock::new(t0());
        let subject = Uuid::new_v4();
        let creds = credentials(subject, t0());
        clock.advance(ChronoDuration::minutes(61));

        let resolved = resolver(&clock).resolve(&creds).await.unwrap();
        assert!(resolved.refreshed);
        assert_eq!(resolved.session.subject_id, subject);
        assert_ne!(Some(resolved.session.access_token.clone()), creds.access_token);
        assert!(!resolved.session.is_expired_at(clock.now()));
    }

    #[tokio::test]
    async fn test_expired_session_without_refresh_token_fails_closed() {
        let clock = ManualClock::new(t0());
        let mut creds = credentials(Uuid::new_v4(), t0());
        creds.refresh_token = None;
        clock.advance(ChronoDuration::minutes(61));

        assert!(resolver(&clock).resolve(&creds).await.is_none());
    }

    #[tokio::test]
    async fn test_refresh_token_alone_restores_session() {
        let clock = ManualClock::new(t0());
        let subject = Uuid::new_v4();
        let mut creds = credentials(subject, t0());
        creds.access_token = None;

        let resolved = resolver(&clock).resolve(&creds).await.unwrap();
        assert!(resolved.refreshed);
        assert_eq!(resolved.session.subject_id, subject);
    }

    #[tokio::test]
    async fn test_tampered_access_token_is_anonymous() {
        let clock = ManualClock::new(t0());
        let mut creds = credentials(Uuid::new_v4(), t0());
        creds.access_token = Some("not-a-jwt".to_string());
        assert!(resolver(&clock).resolve(&creds).await.is_none());
    }

    #[derive(Debug, Default)]
    struct StuckBackend {
        refresh_calls: AtomicUsize,
    }

    #[async_trait]
    impl CredentialBackend for StuckBackend {
        async fn inspect(&self, _access_token: &str) -> AppResult<InspectedToken> {
            Ok(InspectedToken {
                subject_id: Uuid::nil(),
                expires_at_epoch_seconds: 0,
            })
        }

        async fn refresh(&self, _refresh_token: &str, _now: DateTime<Utc>) -> AppResult<Session> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_backend_times_out_to_anonymous() {
        let backend = Arc::new(StuckBackend::default());
        let resolver = SessionResolver::new(
            backend.clone(),
            Arc::new(ManualClock::new(t0())),
            Duration::from_millis(50),
        );
        let creds = Credentials {
            access_token: Some("a".into()),
            refresh_token: Some("r".into()),
        };

        assert!(resolver.resolve(&creds).await.is_none());
        assert_eq!(backend.refresh_calls.load(Ordering::SeqCst), 1);
    }
}
