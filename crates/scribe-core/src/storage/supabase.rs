//! Supabase Storage bucket client.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use super::ObjectStore;
use crate::auth::AuthSession;
use crate::util::{normalize_base_url, status_error};
use crate::{Error, Result};

/// Attachment bucket on a Supabase project.
///
/// Objects are uploaded with `x-upsert: false` so an existing name is
/// rejected, and served from the bucket's public URL.
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    storage_url: String,
    anon_key: String,
    bucket: String,
    client: Client,
}

impl SupabaseStorage {
    pub fn new(
        supabase_url: &str,
        anon_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Result<Self> {
        let base = normalize_base_url(supabase_url, "Supabase URL")?;
        let bucket = bucket.into().trim().trim_matches('/').to_string();
        if bucket.is_empty() {
            return Err(Error::Configuration(
                "Attachment bucket name must not be empty".to_string(),
            ));
        }

        Ok(Self {
            storage_url: format!("{base}/storage/v1"),
            anon_key: anon_key.into(),
            bucket,
            client: Client::builder().build()?,
        })
    }

    fn authorized(&self, request: RequestBuilder, auth: &AuthSession) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&auth.access_token)
    }

    fn object_url(&self, name: &str) -> String {
        format!(
            "{}/object/{}/{}",
            self.storage_url,
            self.bucket,
            urlencoding::encode(name)
        )
    }
}

impl ObjectStore for SupabaseStorage {
    async fn put_object(
        &self,
        auth: &AuthSession,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<()> {
        let request = self
            .authorized(self.client.post(self.object_url(name)), auth)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes.to_vec());

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        // Older storage servers report duplicates as 400 with an embedded 409.
        if status == StatusCode::BAD_REQUEST && is_duplicate_body(&body) {
            return Err(Error::Conflict(format!("{}/{name}", self.bucket)));
        }
        Err(status_error(status, &format!("upload {}/{name}", self.bucket), &body))
    }

    fn public_url(&self, name: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.storage_url,
            self.bucket,
            urlencoding::encode(name)
        )
    }

    async fn remove_objects(&self, auth: &AuthSession, names: &[String]) -> Result<Vec<String>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/object/{}", self.storage_url, self.bucket);
        let request = self
            .authorized(self.client.delete(url), auth)
            .json(&serde_json::json!({ "prefixes": names }));

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(
                status,
                &format!("remove from {}", self.bucket),
                &body,
            ));
        }

        let removed = response
            .json::<Vec<RemovedObject>>()
            .await?
            .into_iter()
            .map(|object| object.name)
            .collect::<Vec<_>>();

        // Row-level security filters a forbidden delete down to an empty
        // result, so a skipped name that is still served was not ours to remove.
        for name in names.iter().filter(|name| !removed.contains(name)) {
            if self.object_exists(name).await? {
                return Err(Error::AccessDenied(format!(
                    "not allowed to remove {}/{name}",
                    self.bucket
                )));
            }
        }
        Ok(removed)
    }
}

impl SupabaseStorage {
    async fn object_exists(&self, name: &str) -> Result<bool> {
        let response = self.client.head(self.public_url(name)).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        // Missing public objects come back as 404, or 400 on older servers.
        if matches!(status, StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST) {
            return Ok(false);
        }
        Err(status_error(
            status,
            &format!("look up {}/{name}", self.bucket),
            "",
        ))
    }
}

#[derive(Debug, Deserialize)]
struct RemovedObject {
    name: String,
}

fn is_duplicate_body(body: &str) -> bool {
    #[derive(Deserialize)]
    struct StorageErrorBody {
        #[serde(rename = "statusCode")]
        status_code: Option<String>,
        error: Option<String>,
    }

    serde_json::from_str::<StorageErrorBody>(body).is_ok_and(|payload| {
        payload.status_code.as_deref() == Some("409")
            || payload
                .error
                .is_some_and(|error| error.eq_ignore_ascii_case("duplicate"))
    })
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::attachments::AttachmentManager;
    use crate::auth::AuthUser;
    use crate::ErrorKind;

    fn auth() -> AuthSession {
        AuthSession {
            access_token: "token".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: i64::MAX,
            user: AuthUser {
                id: "user-1".to_string(),
                email: None,
            },
        }
    }

    #[test]
    fn public_url_is_deterministic() {
        let storage = SupabaseStorage::new("https://demo.supabase.co/", "anon", "files").unwrap();
        assert_eq!(
            storage.public_url("abc.pdf"),
            "https://demo.supabase.co/storage/v1/object/public/files/abc.pdf"
        );
        assert_eq!(storage.public_url("abc.pdf"), storage.public_url("abc.pdf"));
    }

    #[test]
    fn new_rejects_empty_bucket() {
        assert!(SupabaseStorage::new("https://demo.supabase.co", "anon", " / ").is_err());
    }

    #[tokio::test]
    async fn put_object_sends_authorized_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/files/abc.pdf"))
            .and(header("apikey", "anon"))
            .and(header("authorization", "Bearer token"))
            .and(header("x-upsert", "false"))
            .and(header("content-type", "application/pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Key": "files/abc.pdf"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let storage = SupabaseStorage::new(&server.uri(), "anon", "files").unwrap();
        storage
            .put_object(&auth(), "abc.pdf", b"%PDF", "application/pdf")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn put_object_maps_duplicate_to_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "statusCode": "409",
                "error": "Duplicate",
                "message": "The resource already exists"
            })))
            .mount(&server)
            .await;

        let storage = SupabaseStorage::new(&server.uri(), "anon", "files").unwrap();
        let error = storage
            .put_object(&auth(), "abc.pdf", b"%PDF", "application/pdf")
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn put_object_maps_server_failure_to_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let storage = SupabaseStorage::new(&server.uri(), "anon", "files").unwrap();
        let error = storage
            .put_object(&auth(), "abc.pdf", b"%PDF", "application/pdf")
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn remove_objects_returns_removed_names() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/object/files"))
            .and(body_json(serde_json::json!({ "prefixes": ["a.pdf", "b.pdf"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "name": "a.pdf", "bucket_id": "files" }
            ])))
            .mount(&server)
            .await;

        let storage = SupabaseStorage::new(&server.uri(), "anon", "files").unwrap();
        let removed = storage
            .remove_objects(&auth(), &["a.pdf".to_string(), "b.pdf".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, vec!["a.pdf"]);
    }

    #[tokio::test]
    async fn remove_objects_skips_names_that_are_gone() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/storage/v1/object/public/files/gone.pdf"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let storage = SupabaseStorage::new(&server.uri(), "anon", "files").unwrap();
        let removed = storage
            .remove_objects(&auth(), &["gone.pdf".to_string()])
            .await
            .unwrap();
        assert!(removed.is_empty());
    }

    #[tokio::test]
    async fn filtered_delete_of_existing_object_is_access_denied() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/storage/v1/object/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/storage/v1/object/public/files/theirs.pdf"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let storage = SupabaseStorage::new(&server.uri(), "anon", "files").unwrap();
        let url = storage.public_url("theirs.pdf");
        let manager = AttachmentManager::new(storage);

        let error = manager.remove(&auth(), &url).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::AccessDenied);
    }

    #[tokio::test]
    async fn remove_objects_maps_forbidden_to_access_denied() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let storage = SupabaseStorage::new(&server.uri(), "anon", "files").unwrap();
        let error = storage
            .remove_objects(&auth(), &["a.pdf".to_string()])
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::AccessDenied);
    }
}
