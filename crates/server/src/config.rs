//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::core::auth::AuthManager;
use crate::core::session::SessionStore;

pub const DEFAULT_SESSION_KEY: &str = "agrovale_sess";
pub const DEFAULT_SESSION_SECRET: &str = "altera_no_env";
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60 * 4);

/// Configuration for the Agrovale server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// sqlx connection URL for the SQLite database
    pub database_url: String,
    /// Address to bind the HTTP listener to
    pub bind_addr: IpAddr,
    /// HTTP port
    pub port: u16,
    /// Name of the session cookie
    pub session_key: String,
    /// Secret used to sign session cookies
    pub session_secret: String,
    /// Lifetime of a login session
    pub session_ttl: Duration,
    /// Add the `Secure` attribute to the session cookie
    pub cookie_secure: bool,
    /// Directory with static assets
    pub public_dir: PathBuf,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
    /// Admin account created at startup when no admin exists
    pub admin_user: Option<String>,
    pub admin_password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: sqlite_url(Path::new("agrovale.sqlite")),
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            session_key: DEFAULT_SESSION_KEY.to_string(),
            session_secret: DEFAULT_SESSION_SECRET.to_string(),
            session_ttl: DEFAULT_SESSION_TTL,
            cookie_secure: false,
            public_dir: PathBuf::from("public"),
            bcrypt_cost: 10,
            admin_user: None,
            admin_password: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment (and `.env`).
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("DATABASE_URL") {
            config.database_url = url;
        } else if let Some(name) = get("DB_NAME") {
            config.database_url = sqlite_url(Path::new(&format!("{}.sqlite", name)));
        }

        // Leftovers from the MySQL deployment; SQLite has no use for them.
        for key in ["DB_HOST", "DB_PORT", "DB_USER", "DB_PASS"] {
            if get(key).is_some() {
                debug!("{} is set but ignored by the SQLite backend", key);
            }
        }

        if let Some(addr) = get("BIND_ADDR").and_then(|v| v.parse().ok()) {
            config.bind_addr = addr;
        }
        if let Some(port) = get("PORT").and_then(|v| v.parse().ok()) {
            config.port = port;
        }
        if let Some(key) = get("SESSION_KEY") {
            config.session_key = key;
        }
        match get("SESSION_SECRET") {
            Some(secret) => config.session_secret = secret,
            None => warn!("SESSION_SECRET not set, using the built-in default"),
        }
        if let Some(secs) = get("SESSION_TTL_SECS").and_then(|v| v.parse().ok()) {
            config.session_ttl = Duration::from_secs(secs);
        }
        if let Some(flag) = get("COOKIE_SECURE") {
            config.cookie_secure = matches!(flag.trim(), "1" | "true" | "TRUE" | "yes");
        }
        if let Some(dir) = get("PUBLIC_DIR") {
            config.public_dir = PathBuf::from(dir);
        }
        if let Some(cost) = get("BCRYPT_COST").and_then(|v| v.parse().ok()) {
            config.bcrypt_cost = cost;
        }
        config.admin_user = get("ADMIN_USER");
        config.admin_password = get("ADMIN_PASSWORD");

        config
    }

    /// Config pointing at a specific database file, other values default.
    pub fn with_database_file(path: impl AsRef<Path>) -> Self {
        Self {
            database_url: sqlite_url(path.as_ref()),
            ..Self::default()
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.to_string_lossy().replace('\\', "/"))
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub pool: SqlitePool,
    pub sessions: Arc<SessionStore>,
    pub auth: Arc<AuthManager>,
}

impl AppState {
    pub fn new(config: ServerConfig, pool: SqlitePool) -> Self {
        let sessions = Arc::new(SessionStore::new(pool.clone(), &config));
        let auth = Arc::new(AuthManager::new(pool.clone(), config.bcrypt_cost));
        Self {
            config: Arc::new(config),
            pool,
            sessions,
            auth,
        }
    }
}
