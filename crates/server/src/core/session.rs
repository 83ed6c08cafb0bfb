//! Server-side sessions
//!
//! Sessions live in the `sessions` table with an in-memory cache in front.
//! The browser only holds `{token}.{signature}` in a cookie.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use headers::HeaderMapExt;
use http::{HeaderMap, HeaderValue};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::models::SessionUser;

/// How often expired rows are swept from the table.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// A live login session
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
    /// Unix seconds
    pub created_at: i64,
    /// Unix seconds
    pub expires_at: i64,
}

impl Session {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

pub struct SessionStore {
    pool: SqlitePool,
    cookie_name: String,
    secret: String,
    ttl: Duration,
    secure: bool,
    cache: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(pool: SqlitePool, config: &ServerConfig) -> Self {
        Self {
            pool,
            cookie_name: config.session_key.clone(),
            secret: config.session_secret.clone(),
            ttl: config.session_ttl,
            secure: config.cookie_secure,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Start a new session for `user`.
    pub async fn create(&self, user: &SessionUser) -> Result<Session, sqlx::Error> {
        let now = Utc::now().timestamp();
        let session = Session {
            token: Uuid::new_v4().to_string(),
            user: user.clone(),
            created_at: now,
            expires_at: now + self.ttl.as_secs() as i64,
        };

        let data = serde_json::to_string(&session.user)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        sqlx::query(
            "INSERT INTO sessions (token, user_id, data, created_at, expires_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(session.user.id)
        .bind(data)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;

        self.cache
            .write()
            .insert(session.token.clone(), session.clone());

        debug!("[Session] Created for user {}", user.id);
        Ok(session)
    }

    /// Look up a session by token. Expired sessions are removed.
    pub async fn load(&self, token: &str) -> Result<Option<Session>, sqlx::Error> {
        let now = Utc::now().timestamp();

        let cached = self.cache.read().get(token).cloned();
        let session = match cached {
            Some(session) => Some(session),
            None => self.load_from_db(token).await?,
        };

        match session {
            Some(session) if session.is_expired(now) => {
                self.destroy(token).await?;
                Ok(None)
            }
            Some(session) => {
                self.cache
                    .write()
                    .entry(token.to_string())
                    .or_insert_with(|| session.clone());
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn load_from_db(&self, token: &str) -> Result<Option<Session>, sqlx::Error> {
        let row: Option<(String, String, i64, i64)> = sqlx::query_as(
            "SELECT token, data, created_at, expires_at FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some((token, data, created_at, expires_at)) = row else {
            return Ok(None);
        };

        match serde_json::from_str::<SessionUser>(&data) {
            Ok(user) => Ok(Some(Session {
                token,
                user,
                created_at,
                expires_at,
            })),
            Err(e) => {
                warn!("[Session] Discarding unreadable session data: {}", e);
                Ok(None)
            }
        }
    }

    /// Invalidate a session.
    pub async fn destroy(&self, token: &str) -> Result<(), sqlx::Error> {
        self.cache.write().remove(token);

        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        debug!("[Session] Invalidated");
        Ok(())
    }

    /// Drop every session of a user, e.g. after the account is changed.
    pub async fn destroy_for_user(&self, user_id: i64) -> Result<(), sqlx::Error> {
        self.cache.write().retain(|_, s| s.user.id != user_id);

        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete expired sessions, returning how many rows were removed.
    pub async fn purge_expired(&self) -> Result<u64, sqlx::Error> {
        let now = Utc::now().timestamp();
        self.cache.write().retain(|_, s| !s.is_expired(now));

        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Periodically purge expired sessions in the background.
    pub fn spawn_cleanup(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                match store.purge_expired().await {
                    Ok(0) => {}
                    Ok(n) => info!("[Session] Purged {} expired sessions", n),
                    Err(e) => warn!("[Session] Cleanup failed: {}", e),
                }
            }
        })
    }

    fn digest(&self, token: &str) -> Vec<u8> {
        Sha256::digest(format!("{}:{}", self.secret, token).as_bytes()).to_vec()
    }

    pub fn sign(&self, token: &str) -> String {
        hex::encode(self.digest(token))
    }

    /// Return the token of a correctly signed cookie value.
    pub fn verify<'a>(&self, cookie_value: &'a str) -> Option<&'a str> {
        let (token, signature) = cookie_value.rsplit_once('.')?;
        if token.is_empty() {
            return None;
        }
        let provided = hex::decode(signature).ok()?;
        if constant_time_eq(&self.digest(token), &provided) {
            Some(token)
        } else {
            None
        }
    }

    /// Extract and verify the session token from request headers.
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        let cookie = headers.typed_get::<headers::Cookie>()?;
        let value = cookie.get(&self.cookie_name)?;
        self.verify(value).map(str::to_string)
    }

    /// `Set-Cookie` value carrying a signed session token.
    pub fn set_cookie(&self, session: &Session) -> HeaderValue {
        let value = format!("{}.{}", session.token, self.sign(&session.token));
        self.cookie_header(&value, self.ttl.as_secs())
    }

    /// `Set-Cookie` value that removes the session cookie.
    pub fn clear_cookie(&self) -> HeaderValue {
        self.cookie_header("", 0)
    }

    fn cookie_header(&self, value: &str, max_age: u64) -> HeaderValue {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
    }
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header;
    use sqlx::sqlite::SqlitePoolOptions;

    fn store() -> SessionStore {
        let pool = SqlitePoolOptions::new()
            .connect_lazy("sqlite::memory:")
            .unwrap();
        let config = ServerConfig {
            session_secret: "segredo".into(),
            ..ServerConfig::default()
        };
        SessionStore::new(pool, &config)
    }

    #[tokio::test]
    async fn test_signed_cookie_roundtrip() {
        let store = store();
        let signed = format!("abc-123.{}", store.sign("abc-123"));
        assert_eq!(store.verify(&signed), Some("abc-123"));
    }

    #[tokio::test]
    async fn test_tampered_cookie_rejected() {
        let store = store();
        let signature = store.sign("abc-123");
        assert_eq!(store.verify(&format!("abc-124.{}", signature)), None);
        assert_eq!(store.verify("abc-123"), None);
        assert_eq!(store.verify(&format!(".{}", store.sign(""))), None);
    }

    #[tokio::test]
    async fn test_signature_must_be_full_hex_digest() {
        let store = store();
        let signature = store.sign("abc-123");
        assert_eq!(store.verify(&format!("abc-123.{}", &signature[..62])), None);
        assert_eq!(store.verify(&format!("abc-123.{}00", signature)), None);
        assert_eq!(store.verify("abc-123.not-hex"), None);
        assert_eq!(
            store.verify(&format!("abc-123.{}", signature.to_uppercase())),
            Some("abc-123")
        );
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }

    #[tokio::test]
    async fn test_token_from_headers() {
        let store = store();
        let mut headers = HeaderMap::new();
        let value = format!(
            "other=1; agrovale_sess=tok.{}",
            store.sign("tok")
        );
        headers.insert(header::COOKIE, HeaderValue::from_str(&value).unwrap());
        assert_eq!(store.token_from_headers(&headers), Some("tok".to_string()));
    }

    #[tokio::test]
    async fn test_clear_cookie_expires_immediately() {
        let store = store();
        let cookie = store.clear_cookie();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("agrovale_sess=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("HttpOnly"));
    }
}
