//! Client configuration resolved from the environment.
//!
//! Values are read through a lookup closure so parsing can be exercised in
//! tests without touching the process environment.

use std::env;

use crate::storage::R2Config;
use crate::util::{normalize_base_url, normalize_text_option};
use crate::{Error, Result};

pub const ENV_SUPABASE_URL: &str = "SCRIBE_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SCRIBE_SUPABASE_ANON_KEY";
const ENV_NOTES_TABLE: &str = "SCRIBE_NOTES_TABLE";
const ENV_ATTACHMENTS_BUCKET: &str = "SCRIBE_ATTACHMENTS_BUCKET";
const ENV_STORAGE_BACKEND: &str = "SCRIBE_STORAGE_BACKEND";

pub const DEFAULT_NOTES_TABLE: &str = "notes";
pub const DEFAULT_ATTACHMENTS_BUCKET: &str = "attachments";

/// Which object storage service holds attachment blobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Supabase Storage bucket on the same project as the notes table.
    Supabase { bucket: String },
    /// Cloudflare R2 bucket served from a public base URL.
    R2(R2Config),
}

/// Supabase project address and public key, shared by the auth and data clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectCredentials {
    /// Project URL, without trailing slash.
    pub url: String,
    pub anon_key: String,
}

impl ProjectCredentials {
    /// `None` when neither variable is set; an error when only one of them is.
    pub fn from_env() -> Result<Option<Self>> {
        parse_project(|key| env::var(key).ok())
    }
}

/// Endpoints and names needed to reach the managed backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Supabase project URL, without trailing slash.
    pub supabase_url: String,
    /// Public anon key sent as `apikey` on every request.
    pub supabase_anon_key: String,
    /// `PostgREST` table holding note rows.
    pub notes_table: String,
    pub storage: StorageBackend,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        parse_config(|key| env::var(key).ok())
    }

    #[must_use]
    pub fn project(&self) -> ProjectCredentials {
        ProjectCredentials {
            url: self.supabase_url.clone(),
            anon_key: self.supabase_anon_key.clone(),
        }
    }
}

fn missing_project_error(missing: &[&str]) -> Error {
    Error::Configuration(format!(
        "Supabase is not configured. Missing: {}",
        missing.join(", ")
    ))
}

pub(crate) fn parse_project(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<ProjectCredentials>> {
    let url = normalize_text_option(lookup(ENV_SUPABASE_URL));
    let anon_key = normalize_text_option(lookup(ENV_SUPABASE_ANON_KEY));

    match (url, anon_key) {
        (None, None) => Ok(None),
        (Some(url), Some(anon_key)) => Ok(Some(ProjectCredentials {
            url: normalize_base_url(&url, ENV_SUPABASE_URL)?,
            anon_key,
        })),
        (None, Some(_)) => Err(missing_project_error(&[ENV_SUPABASE_URL])),
        (Some(_), None) => Err(missing_project_error(&[ENV_SUPABASE_ANON_KEY])),
    }
}

pub(crate) fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<ClientConfig> {
    let Some(project) = parse_project(&lookup)? else {
        return Err(missing_project_error(&[
            ENV_SUPABASE_URL,
            ENV_SUPABASE_ANON_KEY,
        ]));
    };

    let notes_table = normalize_text_option(lookup(ENV_NOTES_TABLE))
        .unwrap_or_else(|| DEFAULT_NOTES_TABLE.to_string());
    let bucket = normalize_text_option(lookup(ENV_ATTACHMENTS_BUCKET))
        .unwrap_or_else(|| DEFAULT_ATTACHMENTS_BUCKET.to_string());

    let backend = normalize_text_option(lookup(ENV_STORAGE_BACKEND))
        .map(|value| value.to_ascii_lowercase());
    let storage = match backend.as_deref() {
        None | Some("supabase") => StorageBackend::Supabase { bucket },
        Some("r2") => {
            let r2 = R2Config::from_lookup(&lookup)?.ok_or_else(|| {
                Error::Configuration(format!(
                    "{ENV_STORAGE_BACKEND}=r2 requires the R2_* variables"
                ))
            })?;
            if r2.public_base_url.is_none() {
                return Err(Error::Configuration(
                    "R2_PUBLIC_BASE_URL is required so attachment URLs are public".to_string(),
                ));
            }
            StorageBackend::R2(r2)
        }
        Some(other) => {
            return Err(Error::Configuration(format!(
                "Unknown {ENV_STORAGE_BACKEND} '{other}' (expected supabase or r2)"
            )));
        }
    };

    Ok(ClientConfig {
        supabase_url: project.url,
        supabase_anon_key: project.anon_key,
        notes_table,
        storage,
    })
}
