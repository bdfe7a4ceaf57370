//! Object storage backends for attachment blobs.

mod memory;
mod r2;
mod supabase;

use std::future::Future;

pub use memory::MemoryObjectStore;
pub use r2::{R2Config, R2Storage};
pub use supabase::SupabaseStorage;

use crate::auth::AuthSession;
use crate::config::{ClientConfig, StorageBackend};
use crate::Result;

/// Bucket of publicly readable blobs addressed by generated name.
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `name`.
    ///
    /// Fails with [`crate::Error::Conflict`] when the name is already taken;
    /// existing objects are never overwritten.
    fn put_object(
        &self,
        auth: &AuthSession,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Public URL an object is served from. Deterministic in `name`.
    fn public_url(&self, name: &str) -> String;

    /// Remove objects by name and return the names that were actually removed.
    ///
    /// Names that do not exist are skipped rather than reported as errors.
    /// An object that still exists but could not be removed by `auth` fails
    /// the call with [`crate::Error::AccessDenied`].
    fn remove_objects(
        &self,
        auth: &AuthSession,
        names: &[String],
    ) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Object store selected by [`ClientConfig`] at runtime.
#[derive(Debug, Clone)]
pub enum ConfiguredStorage {
    Supabase(SupabaseStorage),
    R2(R2Storage),
}

impl ConfiguredStorage {
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        match &config.storage {
            StorageBackend::Supabase { bucket } => Ok(Self::Supabase(SupabaseStorage::new(
                &config.supabase_url,
                config.supabase_anon_key.clone(),
                bucket.clone(),
            )?)),
            StorageBackend::R2(r2) => Ok(Self::R2(R2Storage::new(r2.clone())?)),
        }
    }

    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Supabase(_) => "supabase",
            Self::R2(_) => "r2",
        }
    }
}

impl ObjectStore for ConfiguredStorage {
    async fn put_object(
        &self,
        auth: &AuthSession,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<()> {
        match self {
            Self::Supabase(storage) => storage.put_object(auth, name, bytes, content_type).await,
            Self::R2(storage) => storage.put_object(auth, name, bytes, content_type).await,
        }
    }

    fn public_url(&self, name: &str) -> String {
        match self {
            Self::Supabase(storage) => storage.public_url(name),
            Self::R2(storage) => storage.public_url(name),
        }
    }

    async fn remove_objects(&self, auth: &AuthSession, names: &[String]) -> Result<Vec<String>> {
        match self {
            Self::Supabase(storage) => storage.remove_objects(auth, names).await,
            Self::R2(storage) => storage.remove_objects(auth, names).await,
        }
    }
}
