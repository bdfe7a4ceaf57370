//! In-process object store with owner checks and fault injection.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use super::ObjectStore;
use crate::auth::AuthSession;
use crate::models::file_extension;
use crate::{Error, Result};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
    owner: String,
}

#[derive(Debug, Default)]
struct State {
    objects: HashMap<String, StoredObject>,
    failing_extensions: HashSet<String>,
    failing_removals: HashSet<String>,
    forced_conflicts: usize,
    put_calls: usize,
}

/// Object store kept in memory, used by tests and local demos.
///
/// Objects are owned by the user that uploaded them; removal by anyone else
/// is denied the way bucket policies deny it remotely.
#[derive(Debug)]
pub struct MemoryObjectStore {
    base_url: String,
    state: Mutex<State>,
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Mutex::new(State::default()),
        }
    }

    /// Fail every upload whose name has this extension with a transport error.
    pub fn fail_uploads_with_extension(&self, extension: &str) {
        if let Ok(mut state) = self.lock() {
            state
                .failing_extensions
                .insert(extension.to_ascii_lowercase());
        }
    }

    /// Fail removal of this object name with a transport error.
    pub fn fail_removal_of(&self, name: &str) {
        if let Ok(mut state) = self.lock() {
            state.failing_removals.insert(name.to_string());
        }
    }

    /// Report the next `count` uploads as name collisions.
    pub fn force_conflicts(&self, count: usize) {
        if let Ok(mut state) = self.lock() {
            state.forced_conflicts = count;
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lock()
            .is_ok_and(|state| state.objects.contains_key(name))
    }

    #[must_use]
    pub fn object_names(&self) -> Vec<String> {
        let mut names = self
            .lock()
            .map(|state| state.objects.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Stored bytes and content type of an object.
    #[must_use]
    pub fn object(&self, name: &str) -> Option<(Vec<u8>, String)> {
        self.lock().ok().and_then(|state| {
            state
                .objects
                .get(name)
                .map(|object| (object.bytes.clone(), object.content_type.clone()))
        })
    }

    /// Number of upload calls received, including failed ones.
    #[must_use]
    pub fn put_calls(&self) -> usize {
        self.lock().map_or(0, |state| state.put_calls)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::Transport("object store lock poisoned".to_string()))
    }
}

impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        auth: &AuthSession,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<()> {
        let mut state = self.lock()?;
        state.put_calls += 1;

        if state.forced_conflicts > 0 {
            state.forced_conflicts -= 1;
            return Err(Error::Conflict(name.to_string()));
        }
        if file_extension(name).is_some_and(|ext| state.failing_extensions.contains(&ext)) {
            return Err(Error::Transport(format!("upload of {name} was interrupted")));
        }
        if state.objects.contains_key(name) {
            return Err(Error::Conflict(name.to_string()));
        }

        state.objects.insert(
            name.to_string(),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
                owner: auth.user_id().to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, urlencoding::encode(name))
    }

    async fn remove_objects(&self, auth: &AuthSession, names: &[String]) -> Result<Vec<String>> {
        let mut state = self.lock()?;

        for name in names {
            if state.failing_removals.contains(name) {
                return Err(Error::Transport(format!("removal of {name} was interrupted")));
            }
            if let Some(object) = state.objects.get(name) {
                if object.owner != auth.user_id() {
                    return Err(Error::AccessDenied(format!(
                        "{name} belongs to another user"
                    )));
                }
            }
        }

        Ok(names
            .iter()
            .filter(|name| state.objects.remove(name.as_str()).is_some())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;

    fn auth(user: &str) -> AuthSession {
        AuthSession {
            access_token: format!("{user}-token"),
            refresh_token: String::new(),
            expires_at: i64::MAX,
            user: AuthUser {
                id: user.to_string(),
                email: None,
            },
        }
    }

    #[tokio::test]
    async fn put_rejects_existing_name() {
        let store = MemoryObjectStore::new("https://files.test/");
        store
            .put_object(&auth("a"), "x.pdf", b"1", "application/pdf")
            .await
            .unwrap();
        let error = store
            .put_object(&auth("a"), "x.pdf", b"2", "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Conflict(_)));
        assert_eq!(store.object("x.pdf").unwrap().0, b"1");
        assert_eq!(store.public_url("x.pdf"), "https://files.test/x.pdf");
    }

    #[tokio::test]
    async fn remove_skips_missing_and_checks_owner() {
        let store = MemoryObjectStore::new("https://files.test");
        store
            .put_object(&auth("a"), "x.pdf", b"1", "application/pdf")
            .await
            .unwrap();

        let denied = store
            .remove_objects(&auth("b"), &["x.pdf".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(denied, Error::AccessDenied(_)));
        assert!(store.contains("x.pdf"));

        let removed = store
            .remove_objects(&auth("a"), &["x.pdf".to_string(), "gone.pdf".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, vec!["x.pdf"]);
        assert!(store.object_names().is_empty());
    }
}
