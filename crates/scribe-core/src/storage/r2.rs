//! Cloudflare R2 attachment storage over the S3-compatible API.

use std::env;

use aws_credential_types::Credentials;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::{primitives::ByteStream, Client};
use aws_types::region::Region;

use super::ObjectStore;
use crate::auth::AuthSession;
use crate::util::{normalize_base_url, normalize_text_option};
use crate::{Error, Result};

const ENV_ACCOUNT_ID: &str = "R2_ACCOUNT_ID";
const ENV_BUCKET: &str = "R2_BUCKET";
const ENV_ACCESS_KEY_ID: &str = "R2_ACCESS_KEY_ID";
const ENV_SECRET_ACCESS_KEY: &str = "R2_SECRET_ACCESS_KEY";
const ENV_PUBLIC_BASE_URL: &str = "R2_PUBLIC_BASE_URL";

const HTTP_PRECONDITION_FAILED: u16 = 412;

/// Credentials and addressing for the R2 attachment bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct R2Config {
    pub account_id: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Public origin attachments are served from (custom domain or r2.dev).
    /// Required by [`R2Storage`], since notes only keep public URLs.
    pub public_base_url: Option<String>,
}

impl R2Config {
    /// `None` when no `R2_*` variable is set at all.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        parse_config(lookup)
    }

    #[must_use]
    pub fn endpoint_url(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }
}

/// R2-backed attachment storage.
///
/// Access is governed by the configured credentials rather than the caller's
/// session, so ownership of individual objects is not checked here.
#[derive(Clone, Debug)]
pub struct R2Storage {
    config: R2Config,
    public_base_url: String,
    client: Client,
}

impl R2Storage {
    pub fn new(config: R2Config) -> Result<Self> {
        let public_base_url = config.public_base_url.clone().ok_or_else(|| {
            Error::Configuration("R2 storage needs R2_PUBLIC_BASE_URL".to_string())
        })?;
        let client = build_s3_client(&config);
        Ok(Self {
            config,
            public_base_url,
            client,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &R2Config {
        &self.config
    }

    async fn object_exists(&self, object_key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(object_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(error)
                if error
                    .as_service_error()
                    .is_some_and(HeadObjectError::is_not_found) =>
            {
                Ok(false)
            }
            Err(error) => Err(sdk_error("head_object", &self.config.bucket, object_key, error)),
        }
    }
}

impl ObjectStore for R2Storage {
    async fn put_object(
        &self,
        _auth: &AuthSession,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<()> {
        let object_key = normalize_object_key(name)?;

        let result = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .if_none_match("*")
            .content_type(content_type)
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(error) if status_of(&error) == Some(HTTP_PRECONDITION_FAILED) => Err(
                Error::Conflict(format!("{}/{object_key}", self.config.bucket)),
            ),
            Err(error) => Err(sdk_error("put_object", &self.config.bucket, &object_key, error)),
        }
    }

    fn public_url(&self, name: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_url,
            urlencoding::encode(name.trim_matches('/'))
        )
    }

    async fn remove_objects(&self, _auth: &AuthSession, names: &[String]) -> Result<Vec<String>> {
        let mut removed = Vec::with_capacity(names.len());

        for name in names {
            let object_key = normalize_object_key(name)?;
            // S3 deletes are idempotent, so absence has to be checked up front.
            if !self.object_exists(&object_key).await? {
                continue;
            }

            self.client
                .delete_object()
                .bucket(&self.config.bucket)
                .key(&object_key)
                .send()
                .await
                .map_err(|error| {
                    sdk_error("delete_object", &self.config.bucket, &object_key, error)
                })?;
            removed.push(name.clone());
        }

        Ok(removed)
    }
}

const REQUIRED_VARS: [&str; 4] = [
    ENV_ACCOUNT_ID,
    ENV_BUCKET,
    ENV_ACCESS_KEY_ID,
    ENV_SECRET_ACCESS_KEY,
];

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<R2Config>> {
    let any_present = REQUIRED_VARS
        .iter()
        .chain([ENV_PUBLIC_BASE_URL].iter())
        .any(|key| lookup(*key).is_some());
    if !any_present {
        return Ok(None);
    }

    let value = |key: &str| normalize_text_option(lookup(key));
    let missing = REQUIRED_VARS
        .into_iter()
        .filter(|key| value(*key).is_none())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(Error::Configuration(format!(
            "R2 configuration is incomplete. Missing: {}",
            missing.join(", ")
        )));
    }

    let required =
        |key: &str| value(key).ok_or_else(|| Error::Configuration(format!("{key} is not set")));
    let public_base_url = value(ENV_PUBLIC_BASE_URL)
        .map(|url| normalize_base_url(&url, ENV_PUBLIC_BASE_URL))
        .transpose()?;

    Ok(Some(R2Config {
        account_id: required(ENV_ACCOUNT_ID)?,
        bucket: required(ENV_BUCKET)?,
        access_key_id: required(ENV_ACCESS_KEY_ID)?,
        secret_access_key: required(ENV_SECRET_ACCESS_KEY)?,
        public_base_url,
    }))
}

fn build_s3_client(config: &R2Config) -> Client {
    let credentials = Credentials::new(
        config.access_key_id.clone(),
        config.secret_access_key.clone(),
        None,
        None,
        "scribe-r2-attachments",
    );

    let sdk_config = aws_sdk_s3::config::Builder::new()
        .region(Region::new("auto"))
        .credentials_provider(credentials)
        .endpoint_url(config.endpoint_url())
        .force_path_style(true)
        .build();

    Client::from_conf(sdk_config)
}

fn status_of<E>(error: &SdkError<E, HttpResponse>) -> Option<u16> {
    error
        .raw_response()
        .map(|response| response.status().as_u16())
}

fn sdk_error(operation: &str, bucket: &str, key: &str, error: impl std::fmt::Display) -> Error {
    Error::Transport(format!("R2 {operation} {bucket}/{key}: {error}"))
}

fn normalize_object_key(name: &str) -> Result<String> {
    let object_key = name.trim().trim_matches('/').to_string();
    if object_key.is_empty() {
        return Err(Error::Validation(
            "Attachment object name cannot be empty".to_string(),
        ));
    }
    Ok(object_key)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn complete_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (ENV_ACCOUNT_ID, "acct"),
            (ENV_BUCKET, "scribe-attachments"),
            (ENV_ACCESS_KEY_ID, "key-id"),
            (ENV_SECRET_ACCESS_KEY, "key-secret"),
            (ENV_PUBLIC_BASE_URL, " https://files.scribe.test/att/ "),
        ])
    }

    fn parse(env: &HashMap<&str, &str>) -> Result<Option<R2Config>> {
        parse_config(|key| env.get(key).map(|value| (*value).to_string()))
    }

    fn storage() -> R2Storage {
        R2Storage::new(R2Config {
            account_id: "acct".to_string(),
            bucket: "scribe-attachments".to_string(),
            access_key_id: "key-id".to_string(),
            secret_access_key: "key-secret".to_string(),
            public_base_url: Some("https://files.scribe.test/att".to_string()),
        })
        .unwrap()
    }

    #[test]
    fn absent_variables_mean_no_r2() {
        assert_eq!(parse(&HashMap::new()).unwrap(), None);
    }

    #[test]
    fn complete_variables_parse() {
        let config = parse(&complete_env()).unwrap().unwrap();
        assert_eq!(config, storage().config().clone());
        assert_eq!(config.endpoint_url(), "https://acct.r2.cloudflarestorage.com");
    }

    #[test]
    fn partial_variables_list_what_is_missing() {
        let mut env = complete_env();
        env.remove(ENV_BUCKET);
        env.insert(ENV_SECRET_ACCESS_KEY, " ");

        let message = parse(&env).unwrap_err().to_string();
        assert!(message.contains(ENV_BUCKET));
        assert!(message.contains(ENV_SECRET_ACCESS_KEY));
        assert!(!message.contains(ENV_ACCOUNT_ID));
    }

    #[test]
    fn public_origin_needs_scheme() {
        let mut env = complete_env();
        env.insert(ENV_PUBLIC_BASE_URL, "files.scribe.test");
        assert!(matches!(parse(&env), Err(Error::Configuration(_))));
    }

    #[test]
    fn storage_without_public_origin_is_rejected() {
        let mut env = complete_env();
        env.remove(ENV_PUBLIC_BASE_URL);
        let config = parse(&env).unwrap().unwrap();
        assert!(matches!(R2Storage::new(config), Err(Error::Configuration(_))));
    }

    #[test]
    fn public_url_encodes_object_name() {
        assert_eq!(
            storage().public_url("/lab notes.pdf"),
            "https://files.scribe.test/att/lab%20notes.pdf"
        );
    }

    #[test]
    fn blank_object_name_is_invalid() {
        assert!(matches!(
            normalize_object_key(" / "),
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "talks to a real R2 bucket configured through R2_* variables"]
    async fn live_bucket_rejects_duplicates_and_tolerates_absent_removal() {
        use crate::auth::AuthUser;

        let _ = dotenvy::dotenv();
        let storage = R2Config::from_env()
            .unwrap()
            .map(R2Storage::new)
            .unwrap()
            .unwrap();
        let auth = AuthSession {
            access_token: String::new(),
            refresh_token: String::new(),
            expires_at: i64::MAX,
            user: AuthUser {
                id: "live-test".to_string(),
                email: None,
            },
        };

        let name = format!("{}.pdf", uuid::Uuid::new_v4().simple());
        storage
            .put_object(&auth, &name, b"%PDF-1.4", "application/pdf")
            .await
            .unwrap();
        let duplicate = storage
            .put_object(&auth, &name, b"%PDF-1.4", "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(duplicate, Error::Conflict(_)));

        let removed = storage.remove_objects(&auth, &[name.clone()]).await.unwrap();
        assert_eq!(removed, vec![name.clone()]);
        assert!(storage.remove_objects(&auth, &[name]).await.unwrap().is_empty());
    }
}
