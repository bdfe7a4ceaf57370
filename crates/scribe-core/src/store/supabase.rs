//! Note rows on a Supabase `PostgREST` table.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::NoteStore;
use crate::auth::AuthSession;
use crate::config::ClientConfig;
use crate::models::{Note, NoteDraft, NoteId};
use crate::util::{normalize_base_url, status_error};
use crate::{Error, Result};

/// `PostgREST` client for the notes table.
///
/// Row visibility and ownership are enforced by the table's policies; this
/// client only stamps `user_id` on insert.
#[derive(Debug, Clone)]
pub struct SupabaseNoteStore {
    table_url: String,
    anon_key: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct NotePayload<'a> {
    title: &'a str,
    content: &'a str,
    category: &'a str,
    tags: &'a [String],
    attachments: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

impl<'a> NotePayload<'a> {
    fn from_draft(draft: &'a NoteDraft, user_id: Option<&'a str>) -> Self {
        Self {
            title: &draft.title,
            content: &draft.content,
            category: &draft.category,
            tags: &draft.tags,
            attachments: &draft.attachments,
            user_id,
        }
    }
}

impl SupabaseNoteStore {
    pub fn new(supabase_url: &str, anon_key: impl Into<String>, table: &str) -> Result<Self> {
        let base = normalize_base_url(supabase_url, "Supabase URL")?;
        let table = table.trim();
        if table.is_empty() {
            return Err(Error::Configuration(
                "Notes table name must not be empty".to_string(),
            ));
        }

        Ok(Self {
            table_url: format!("{base}/rest/v1/{table}"),
            anon_key: anon_key.into(),
            client: Client::builder().build()?,
        })
    }

    /// Store for the notes table named in `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(
            &config.supabase_url,
            config.supabase_anon_key.clone(),
            &config.notes_table,
        )
    }

    fn authorized(&self, request: RequestBuilder, auth: &AuthSession) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&auth.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    fn id_filter(id: &NoteId) -> [(&'static str, String); 1] {
        [("id", format!("eq.{id}"))]
    }

    async fn rows<T: DeserializeOwned>(response: Response, target: &str) -> Result<Vec<T>> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, target, &body));
        }
        Ok(response.json::<Vec<T>>().await?)
    }
}

impl NoteStore for SupabaseNoteStore {
    async fn load(&self, auth: &AuthSession, id: &NoteId) -> Result<Note> {
        let request = self
            .authorized(self.client.get(&self.table_url), auth)
            .query(&[("select", "*")])
            .query(&Self::id_filter(id));

        let response = request.send().await?;
        let rows = Self::rows::<Note>(response, &format!("load note {id}")).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("note {id}")))
    }

    async fn list(&self, auth: &AuthSession) -> Result<Vec<Note>> {
        let request = self
            .authorized(self.client.get(&self.table_url), auth)
            .query(&[
                ("select", "*".to_string()),
                ("user_id", format!("eq.{}", auth.user_id())),
                ("order", "created_at.desc".to_string()),
            ]);

        let response = request.send().await?;
        Self::rows(response, "list notes").await
    }

    async fn create(&self, auth: &AuthSession, draft: &NoteDraft) -> Result<Note> {
        draft.validate()?;
        let draft = draft.normalized();
        let payload = NotePayload::from_draft(&draft, Some(auth.user_id()));

        let request = self
            .authorized(self.client.post(&self.table_url), auth)
            .header("Prefer", "return=representation")
            .json(&payload);

        tracing::debug!(title = %draft.title, "Creating note row");
        let response = request.send().await?;
        let rows = Self::rows::<Note>(response, "create note").await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::Transport("create note returned no row".to_string()))
    }

    async fn update(&self, auth: &AuthSession, id: &NoteId, draft: &NoteDraft) -> Result<()> {
        let draft = draft.normalized();
        let payload = NotePayload::from_draft(&draft, None);

        let request = self
            .authorized(self.client.patch(&self.table_url), auth)
            .query(&Self::id_filter(id))
            .header("Prefer", "return=representation")
            .json(&payload);

        let response = request.send().await?;
        let rows = Self::rows::<serde_json::Value>(response, &format!("update note {id}")).await?;
        if rows.is_empty() {
            // Row policies hide both deleted rows and rows owned by others.
            return Err(Error::NotFound(format!("note {id}")));
        }
        Ok(())
    }

    async fn delete(&self, auth: &AuthSession, id: &NoteId) -> Result<()> {
        let request = self
            .authorized(self.client.delete(&self.table_url), auth)
            .query(&Self::id_filter(id))
            .header("Prefer", "return=representation");

        let response = request.send().await?;
        let rows = Self::rows::<serde_json::Value>(response, &format!("delete note {id}")).await?;
        if rows.is_empty() {
            tracing::debug!(note_id = %id, "Delete matched no row; treating as already deleted");
        }
        Ok(())
    }
}
