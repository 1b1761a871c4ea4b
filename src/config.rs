//! Runtime settings loaded from the environment
//!
//! Values are read once at startup (after `.env` has been loaded by `main`)
//! and shared with every handler through `AppState`.

use std::env;

/// Default header set by Cloudflare with the visitor's ISO country code
pub const DEFAULT_COUNTRY_HEADER: &str = "cf-ipcountry";

/// Service configuration
#[derive(Debug, Clone)]
pub struct Settings {
    /// Port the HTTP server listens on
    pub port: u16,

    /// Path of the redb database file
    pub database_path: String,

    /// Origin used when building short URLs (e.g. "https://snip.example")
    pub public_url: String,

    /// Shared secret the identity gateway must present in `Authorization`.
    /// `None` disables the check.
    pub gateway_secret: Option<String>,

    /// Request header carrying the visitor's country code
    pub country_header: String,

    /// Where visitors are sent when a link is missing or disabled
    pub not_found_path: String,

    /// Fallback `tracing` filter when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 8080,
            database_path: "data.db".to_string(),
            public_url: "http://localhost:8080".to_string(),
            gateway_secret: None,
            country_header: DEFAULT_COUNTRY_HEADER.to_string(),
            not_found_path: "/404".to_string(),
            log_filter: "clipsnip=debug,tower_http=debug".to_string(),
        }
    }
}

impl Settings {
    /// Reads settings from environment variables, falling back to defaults
    ///
    /// - `PORT` - Server port number (default: 8080)
    /// - `DATABASE_URL` - Path to database file (default: "data.db")
    /// - `PUBLIC_URL` - Origin for short URLs (default: "http://localhost:{PORT}")
    /// - `AUTHORIZATION` - Gateway secret; unset or empty disables the check
    /// - `COUNTRY_HEADER` - Visitor country header (default: "cf-ipcountry")
    /// - `NOT_FOUND_PATH` - Not-found redirect target (default: "/404")
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let public_url = env::var("PUBLIC_URL")
            .ok()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        Self {
            port,
            database_path: env::var("DATABASE_URL").unwrap_or(defaults.database_path),
            public_url,
            gateway_secret: env::var("AUTHORIZATION").ok().filter(|s| !s.is_empty()),
            country_header: env::var("COUNTRY_HEADER")
                .map(|h| h.to_ascii_lowercase())
                .unwrap_or(defaults.country_header),
            not_found_path: env::var("NOT_FOUND_PATH").unwrap_or(defaults.not_found_path),
            log_filter: defaults.log_filter,
        }
    }

    /// Builds the public short URL for a slug
    pub fn short_url(&self, slug: &str) -> String {
        format!("{}/{}", self.public_url.trim_end_matches('/'), slug)
    }
}
