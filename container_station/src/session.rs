use std::future::Future;

use tokio::sync::RwLock;
use tracing::debug;

use crate::error::ApiError;

/// Authentication token shared by every request of one client.
///
/// Readers take the current token concurrently. A refresh takes the write
/// lock and only logs in again if the token it was handed is still the
/// current one, so concurrent requests that hit an expired token trigger a
/// single login.
#[derive(Debug, Default)]
pub(crate) struct Session {
    token: RwLock<Option<String>>,
}

impl Session {
    pub(crate) async fn current(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Replaces `stale` with a fresh token obtained from `login`.
    ///
    /// `login` is only awaited when no other task refreshed the token in the
    /// meantime.
    pub(crate) async fn refresh<F>(&self, stale: Option<&str>, login: F) -> Result<String, ApiError>
    where
        F: Future<Output = Result<String, ApiError>>,
    {
        let mut token = self.token.write().await;
        if let Some(current) = token.as_deref() {
            if Some(current) != stale {
                return Ok(current.to_string());
            }
        }
        debug!("logging in to container station");
        let fresh = login.await?;
        *token = Some(fresh.clone());
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[tokio::test]
    async fn test_refresh_logs_in_once() -> anyhow::Result<()> {
        let session = Arc::new(Session::default());
        let logins = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let session = session.clone();
            let logins = logins.clone();
            handles.push(tokio::spawn(async move {
                session
                    .refresh(None, async {
                        logins.fetch_add(1, Ordering::SeqCst);
                        Ok("token-1".to_string())
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await??, "token-1");
        }
        assert_eq!(logins.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_replaces_stale_token() -> anyhow::Result<()> {
        let session = Session::default();
        session.refresh(None, async { Ok("old".to_string()) }).await?;

        let fresh = session
            .refresh(Some("old"), async { Ok("new".to_string()) })
            .await?;
        assert_eq!(fresh, "new");
        assert_eq!(session.current().await.as_deref(), Some("new"));

        // A caller still holding "old" gets the refreshed token back.
        let again = session
            .refresh(Some("old"), async { Ok("newer".to_string()) })
            .await?;
        assert_eq!(again, "new");
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_login_keeps_no_token() {
        let session = Session::default();
        let result = session
            .refresh(None, async {
                Err(ApiError::Authentication("bad credentials".to_string()))
            })
            .await;
        assert!(result.is_err());
        assert!(session.current().await.is_none());
    }
}
