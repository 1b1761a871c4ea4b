//! Data models for the link shortener
//!
//! This module defines the stored link record, the request/response
//! payloads of the API, and the validation applied to incoming links.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Length of generated slugs
pub const SLUG_LENGTH: usize = 6;

/// Longest accepted destination URL
pub const MAX_URL_LENGTH: usize = 700;

/// Longest accepted description or custom slug
pub const MAX_FIELD_LENGTH: usize = 256;

/// Path segments the router already uses; a link cannot claim them
pub const RESERVED_SLUGS: &[&str] = &["api", "404"];

/// A shortened link as stored in the database
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    /// Sequential identifier assigned at creation
    pub id: u64,

    /// Destination the slug redirects to
    pub long_url: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Unique key used in the redirect path
    pub short_slug: String,

    /// Identity of the user who created the link
    pub owner_id: String,

    /// Starts at 1, so real visits are `total_visit_count - 1`
    pub total_visit_count: u64,

    #[serde(default)]
    pub disabled: bool,

    /// ISO country code -> visits
    #[serde(default)]
    pub visit_count_by_country: BTreeMap<String, u64>,

    /// UTC day ("YYYY-MM-DD") -> visits
    #[serde(default)]
    pub visit_count_by_date: BTreeMap<String, u64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LinkRecord {
    /// Counts one visit. Callers must not call this on a disabled link.
    pub fn register_visit(&mut self, country: &str, day: NaiveDate, at: DateTime<Utc>) {
        self.total_visit_count += 1;
        *self
            .visit_count_by_country
            .entry(country.to_string())
            .or_insert(0) += 1;
        *self
            .visit_count_by_date
            .entry(day.format("%Y-%m-%d").to_string())
            .or_insert(0) += 1;
        self.updated_at = at;
    }

    /// Visits recorded on top of the initial offset
    pub fn visits(&self) -> u64 {
        self.total_visit_count.saturating_sub(1)
    }
}

/// A validated link ready to be persisted
#[derive(Debug, Clone)]
pub struct NewLink {
    pub owner_id: String,
    pub long_url: String,
    pub description: Option<String>,
    /// `None` asks the store to generate a slug
    pub slug: Option<String>,
    pub enabled: bool,
}

/// Request payload for creating a new link
///
/// # Example
/// ```json
/// {
///   "link": "https://example.com/very/long/url",
///   "description": "Docs",   // Optional
///   "slug": "docs",          // Optional
///   "enabled": true          // Optional, defaults to true
/// }
/// ```
#[derive(Deserialize, Debug)]
pub struct CreateLinkRequest {
    pub link: String,
    pub description: Option<String>,
    pub slug: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl CreateLinkRequest {
    /// Validates the payload and attaches the caller as owner
    pub fn into_new_link(self, owner_id: &str) -> Result<NewLink, AppError> {
        let long_url = self.link.trim().to_string();
        validate_url(&long_url)?;

        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if let Some(d) = &description {
            if d.chars().count() > MAX_FIELD_LENGTH {
                return Err(AppError::Validation(format!(
                    "Description must be at most {} characters",
                    MAX_FIELD_LENGTH
                )));
            }
        }

        // Blank slugs mean "generate one for me"
        let slug = self
            .slug
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if let Some(s) = &slug {
            validate_slug(s)?;
        }

        Ok(NewLink {
            owner_id: owner_id.to_string(),
            long_url,
            description,
            slug,
            enabled: self.enabled,
        })
    }
}

fn validate_url(raw: &str) -> Result<(), AppError> {
    if raw.len() > MAX_URL_LENGTH {
        return Err(AppError::Validation(format!(
            "Link must be at most {} characters",
            MAX_URL_LENGTH
        )));
    }

    // The raw string ends up in a Location header
    if raw.chars().any(char::is_control) {
        return Err(AppError::Validation("Link contains control characters".to_string()));
    }

    match url::Url::parse(raw) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(AppError::Validation(format!("Invalid link: {}", raw))),
    }
}

/// Checks a user-supplied slug
pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    if slug.is_empty() || slug.len() > MAX_FIELD_LENGTH {
        return Err(AppError::Validation(format!(
            "Slug must be between 1 and {} characters",
            MAX_FIELD_LENGTH
        )));
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(
            "Slug may only contain letters, digits, '-' and '_'".to_string(),
        ));
    }

    if is_reserved(slug) {
        return Err(AppError::Validation(format!("Slug '{}' is reserved", slug)));
    }

    Ok(())
}

pub fn is_reserved(slug: &str) -> bool {
    RESERVED_SLUGS.iter().any(|r| r.eq_ignore_ascii_case(slug))
}

/// Response returned after creating a link
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateLinkResponse {
    pub slug: String,

    /// Fully qualified short URL, ready to copy
    pub short_url: String,
}

/// What the resolver tells the caller about a slug
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLink {
    pub destination_url: String,
    pub disabled: bool,
}

impl From<&LinkRecord> for ResolvedLink {
    fn from(record: &LinkRecord) -> Self {
        Self {
            destination_url: record.long_url.clone(),
            disabled: record.disabled,
        }
    }
}

/// Query parameters for listing the caller's links
///
/// # Example
/// Query string: `?page=2&limit=20`
#[derive(Deserialize, Debug, Default)]
pub struct ListParams {
    /// Page number for pagination (starts from 1)
    pub page: Option<usize>,

    /// Items per page, defaults to 10, maximum is 100
    pub limit: Option<usize>,
}

impl ListParams {
    /// Returns (page, limit) with defaults and bounds applied
    pub fn normalized(&self) -> (usize, usize) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = self.limit.unwrap_or(10).clamp(1, 100);
        (page, limit)
    }
}
