//! In-process note store that mimics row ownership policies.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::NoteStore;
use crate::auth::AuthSession;
use crate::models::{Note, NoteDraft, NoteId};
use crate::{Error, Result};

#[derive(Debug, Default)]
struct State {
    rows: BTreeMap<u64, Note>,
    next_id: u64,
    offline: bool,
}

/// Note store kept in memory, used by tests and local demos.
///
/// Rows owned by another user are invisible to `load` and `list`, and
/// mutations on them are denied.
#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    state: Mutex<State>,
}

impl MemoryNoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a transport error until reset.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.offline = offline;
        }
    }

    /// Number of stored rows, regardless of owner.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().map_or(0, |state| state.rows.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn connect(&self) -> Result<MutexGuard<'_, State>> {
        let state = self
            .state
            .lock()
            .map_err(|_| Error::Transport("note store lock poisoned".to_string()))?;
        if state.offline {
            return Err(Error::Transport("note store is unreachable".to_string()));
        }
        Ok(state)
    }
}

fn row_key(id: &NoteId) -> Option<u64> {
    id.as_str().parse().ok()
}

fn owned_row<'a>(state: &'a mut State, auth: &AuthSession, id: &NoteId) -> Result<&'a mut Note> {
    let row = row_key(id)
        .and_then(|key| state.rows.get_mut(&key))
        .ok_or_else(|| Error::NotFound(format!("note {id}")))?;
    if row.user_id != auth.user_id() {
        return Err(Error::AccessDenied(format!("note {id} belongs to another user")));
    }
    Ok(row)
}

impl NoteStore for MemoryNoteStore {
    async fn load(&self, auth: &AuthSession, id: &NoteId) -> Result<Note> {
        let state = self.connect()?;
        row_key(id)
            .and_then(|key| state.rows.get(&key))
            .filter(|note| note.user_id == auth.user_id())
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("note {id}")))
    }

    async fn list(&self, auth: &AuthSession) -> Result<Vec<Note>> {
        let state = self.connect()?;
        Ok(state
            .rows
            .values()
            .rev()
            .filter(|note| note.user_id == auth.user_id())
            .cloned()
            .collect())
    }

    async fn create(&self, auth: &AuthSession, draft: &NoteDraft) -> Result<Note> {
        draft.validate()?;
        let draft = draft.normalized();
        let mut state = self.connect()?;

        state.next_id += 1;
        let key = state.next_id;
        let note = Note {
            id: NoteId::new(key.to_string())?,
            title: draft.title,
            content: draft.content,
            category: draft.category,
            tags: draft.tags,
            attachments: draft.attachments,
            user_id: auth.user_id().to_string(),
            created_at: Some(Utc::now()),
        };
        state.rows.insert(key, note.clone());
        Ok(note)
    }

    async fn update(&self, auth: &AuthSession, id: &NoteId, draft: &NoteDraft) -> Result<()> {
        let draft = draft.normalized();
        let mut state = self.connect()?;
        let row = owned_row(&mut state, auth, id)?;

        row.title = draft.title;
        row.content = draft.content;
        row.category = draft.category;
        row.tags = draft.tags;
        row.attachments = draft.attachments;
        Ok(())
    }

    async fn delete(&self, auth: &AuthSession, id: &NoteId) -> Result<()> {
        let mut state = self.connect()?;
        let exists = match owned_row(&mut state, auth, id) {
            Ok(_) => true,
            Err(Error::NotFound(_)) => false,
            Err(error) => return Err(error),
        };

        if let Some(key) = row_key(id).filter(|_| exists) {
            state.rows.remove(&key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::auth::AuthUser;
    use crate::ErrorKind;

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

    fn draft(title: &str) -> NoteDraft {
        NoteDraft {
            title: title.to_string(),
            category: "Biology".to_string(),
            ..NoteDraft::default()
        }
    }

    #[tokio::test]
    async fn create_then_load_roundtrips_fields() {
        let store = MemoryNoteStore::new();
        let created = store.create(&auth("a"), &draft(" Cells ")).await.unwrap();
        let loaded = store.load(&auth("a"), &created.id).await.unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.title, "Cells");
    }

    #[tokio::test]
    async fn other_users_rows_are_hidden_and_protected() {
        let store = MemoryNoteStore::new();
        let note = store.create(&auth("a"), &draft("Cells")).await.unwrap();

        let hidden = store.load(&auth("b"), &note.id).await.unwrap_err();
        assert_eq!(hidden.kind(), ErrorKind::NotFound);
        assert!(store.list(&auth("b")).await.unwrap().is_empty());

        let denied = store
            .update(&auth("b"), &note.id, &draft("Mine"))
            .await
            .unwrap_err();
        assert_eq!(denied.kind(), ErrorKind::AccessDenied);

        let denied = store.delete(&auth("b"), &note.id).await.unwrap_err();
        assert_eq!(denied.kind(), ErrorKind::AccessDenied);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = MemoryNoteStore::new();
        store.create(&auth("a"), &draft("First")).await.unwrap();
        store.create(&auth("a"), &draft("Second")).await.unwrap();

        let titles = store
            .list(&auth("a"))
            .await
            .unwrap()
            .into_iter()
            .map(|note| note.title)
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Second", "First"]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryNoteStore::new();
        let note = store.create(&auth("a"), &draft("Cells")).await.unwrap();
        store.delete(&auth("a"), &note.id).await.unwrap();
        store.delete(&auth("a"), &note.id).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn offline_store_fails_with_transport_error() {
        let store = MemoryNoteStore::new();
        store.set_offline(true);
        let error = store.create(&auth("a"), &draft("Cells")).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Transport);
    }
}
