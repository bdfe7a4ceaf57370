//! Attachment model

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An attachment referenced from a note by its public URL.
///
/// The original upload name is not preserved anywhere; the display name is
/// whatever the trailing URL segment says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Public URL stored in the note's attachment list.
    pub url: String,
    /// Storage object name (trailing URL segment).
    pub object_name: String,
    /// Human-readable name for lists.
    pub display_name: String,
}

impl Attachment {
    /// Parse an attachment URL into its storage object name and display name.
    pub fn from_url(url: &str) -> Result<Self> {
        let url = url.trim();
        let object_name = object_name_from_url(url)?;
        let display_name = urlencoding::decode(&object_name)
            .map_or_else(|_| object_name.clone(), std::borrow::Cow::into_owned);

        Ok(Self {
            url: url.to_string(),
            object_name,
            display_name,
        })
    }

    /// File extension of the stored object, lowercase, if any.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.display_name)
    }
}

/// Storage object name of an attachment URL: its last path segment.
///
/// Query strings and fragments are ignored. A bare origin has no object name.
pub fn object_name_from_url(url: &str) -> Result<String> {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    let name = path.rsplit('/').next().unwrap_or_default().trim();
    let after_authority = path.split_once("://").map_or(path, |(_, rest)| rest);

    if name.is_empty() || !after_authority.contains('/') {
        return Err(Error::Validation(format!(
            "Attachment URL has no file name: {url}"
        )));
    }
    Ok(name.to_string())
}

/// Lowercase extension of a file name, without the dot.
#[must_use]
pub fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.trim().rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_url_takes_trailing_segment() {
        let attachment = Attachment::from_url(
            "https://demo.supabase.co/storage/v1/object/public/attachments/0b9e.pdf",
        )
        .unwrap();
        assert_eq!(attachment.object_name, "0b9e.pdf");
        assert_eq!(attachment.display_name, "0b9e.pdf");
        assert_eq!(attachment.extension().as_deref(), Some("pdf"));
    }

    #[test]
    fn from_url_ignores_query_and_decodes_display_name() {
        let attachment =
            Attachment::from_url("https://cdn.example.com/media/lecture%201.MP4?token=abc")
                .unwrap();
        assert_eq!(attachment.object_name, "lecture%201.MP4");
        assert_eq!(attachment.display_name, "lecture 1.MP4");
        assert_eq!(attachment.extension().as_deref(), Some("mp4"));
    }

    #[test]
    fn object_name_rejects_urls_without_file_segment() {
        assert!(object_name_from_url("").is_err());
        assert!(object_name_from_url("https://").is_err());
        assert!(object_name_from_url("no-slashes").is_err());
        assert!(object_name_from_url("https://host.com").is_err());
        assert!(object_name_from_url("https://host.com/?download=1").is_err());
        assert_eq!(
            object_name_from_url("https://host.com/a.pdf").unwrap(),
            "a.pdf"
        );
    }

    #[test]
    fn file_extension_requires_stem_and_extension() {
        assert_eq!(file_extension("exam.PDF").as_deref(), Some("pdf"));
        assert_eq!(file_extension(".hidden"), None);
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension("archive."), None);
    }
}
