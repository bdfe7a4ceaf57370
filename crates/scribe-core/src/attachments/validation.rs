//! Per-file acceptance rules for attachment uploads.

use std::fmt;
use std::path::Path;

use crate::models::file_extension;
use crate::Result;

/// Largest attachment accepted for upload (25 MiB).
pub const MAX_ATTACHMENT_BYTES: usize = 25 * 1024 * 1024;

const DOCUMENT_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "avi", "mkv", "webm", "wmv", "mpeg", "mpg", "3gp", "ogv",
];

/// A file picked by the user, not yet checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    /// Original file name, used for display and for the extension.
    pub name: String,
    /// Content type declared by the picker, if any.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    /// On-disk size of a file whose bytes were left unread for being too large.
    unread_size: Option<usize>,
}

impl CandidateFile {
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes,
            unread_size: None,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a file from disk; the name is the path's final component.
    ///
    /// Files over [`MAX_ATTACHMENT_BYTES`] are not read; they keep only their
    /// size so [`validate`] can turn them away.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let size = usize::try_from(tokio::fs::metadata(path).await?.len()).unwrap_or(usize::MAX);
        if size > MAX_ATTACHMENT_BYTES {
            return Ok(Self {
                unread_size: Some(size),
                ..Self::new(name, Vec::new())
            });
        }

        Ok(Self::new(name, tokio::fs::read(path).await?))
    }

    /// Size in bytes, whether or not the contents were read.
    #[must_use]
    pub fn size(&self) -> usize {
        self.unread_size.unwrap_or(self.bytes.len())
    }
}

/// A file that passed validation and may be uploaded.
///
/// Only [`validate`] constructs these, so an upload can never be issued for
/// a file that was not checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedFile {
    name: String,
    extension: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl AcceptedFile {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercase extension carried over to the stored object name.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Why a candidate file was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingName,
    TooLarge { size: usize },
    UnsupportedType { detected: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingName => f.write_str("file has no name"),
            Self::TooLarge { size } => write!(
                f,
                "{} exceeds the {} limit",
                format_size(*size),
                format_size(MAX_ATTACHMENT_BYTES)
            ),
            Self::UnsupportedType { detected } => write!(
                f,
                "{detected} is not allowed (PDF, PPT, PPTX, DOC, DOCX or video only)"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub name: String,
    pub reason: RejectReason,
}

impl fmt::Display for RejectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.reason)
    }
}

/// Outcome of checking one candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCheck {
    Accepted(AcceptedFile),
    Rejected(RejectedFile),
}

/// Check a candidate against the size ceiling and the allowed type set.
#[must_use]
pub fn validate(file: CandidateFile) -> FileCheck {
    let name = file.name.trim().to_string();
    if name.is_empty() {
        return reject(name, RejectReason::MissingName);
    }
    let size = file.size();
    if size > MAX_ATTACHMENT_BYTES {
        return reject(name, RejectReason::TooLarge { size });
    }

    let declared = file
        .content_type
        .as_deref()
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty() && value != "application/octet-stream");

    // A declared type only stands in for a missing extension, never overrides one.
    let extension = match file_extension(&name) {
        Some(ext) if is_allowed_extension(&ext) => ext,
        Some(ext) => {
            let detected = format!(".{ext}");
            return reject(name, RejectReason::UnsupportedType { detected });
        }
        None => match declared.as_deref().and_then(extension_for_mime) {
            Some(ext) => ext,
            None => {
                let detected = declared.unwrap_or_else(|| "unknown type".to_string());
                return reject(name, RejectReason::UnsupportedType { detected });
            }
        },
    };

    let content_type = content_type_for(&extension, file.content_type.as_deref());
    FileCheck::Accepted(AcceptedFile {
        name,
        extension,
        content_type,
        bytes: file.bytes,
    })
}

/// Split a batch into uploadable files and rejections, keeping batch order.
#[must_use]
pub fn partition(batch: Vec<CandidateFile>) -> (Vec<AcceptedFile>, Vec<RejectedFile>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for file in batch {
        match validate(file) {
            FileCheck::Accepted(file) => accepted.push(file),
            FileCheck::Rejected(file) => rejected.push(file),
        }
    }

    (accepted, rejected)
}

/// Human-readable byte size.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;

    let value = bytes as f64;
    if value >= MIB {
        format!("{:.1} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.1} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

const fn reject(name: String, reason: RejectReason) -> FileCheck {
    FileCheck::Rejected(RejectedFile { name, reason })
}

fn is_allowed_extension(extension: &str) -> bool {
    DOCUMENT_TYPES.iter().any(|(ext, _)| *ext == extension) || VIDEO_EXTENSIONS.contains(&extension)
}

fn extension_for_mime(mime: &str) -> Option<String> {
    if let Some((ext, _)) = DOCUMENT_TYPES.iter().find(|(_, known)| *known == mime) {
        return Some((*ext).to_string());
    }
    if !mime.starts_with("video/") {
        return None;
    }
    mime_guess::get_mime_extensions_str(mime)?
        .iter()
        .find(|ext| VIDEO_EXTENSIONS.contains(ext))
        .map(|ext| (*ext).to_string())
}

fn content_type_for(extension: &str, declared: Option<&str>) -> String {
    if let Some((_, mime)) = DOCUMENT_TYPES.iter().find(|(ext, _)| *ext == extension) {
        return (*mime).to_string();
    }

    declared
        .map(str::trim)
        .filter(|value| value.to_ascii_lowercase().starts_with("video/"))
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| {
            mime_guess::from_ext(extension)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(check: FileCheck) -> AcceptedFile {
        match check {
            FileCheck::Accepted(file) => file,
            FileCheck::Rejected(rejected) => panic!("unexpected rejection: {rejected}"),
        }
    }

    fn rejected(check: FileCheck) -> RejectedFile {
        match check {
            FileCheck::Rejected(file) => file,
            FileCheck::Accepted(file) => panic!("unexpected acceptance: {}", file.name()),
        }
    }

    #[test]
    fn accepts_documents_and_videos_by_extension() {
        for name in ["exam.pdf", "deck.PPT", "deck.pptx", "essay.doc", "essay.docx"] {
            let file = accepted(validate(CandidateFile::new(name, vec![1, 2, 3])));
            assert_eq!(file.name(), name);
        }

        let video = accepted(validate(CandidateFile::new("lecture.mp4", vec![0])));
        assert_eq!(video.extension(), "mp4");
        assert_eq!(video.content_type(), "video/mp4");
    }

    #[test]
    fn document_content_type_comes_from_extension() {
        let file = accepted(validate(
            CandidateFile::new("exam.pdf", vec![0]).with_content_type("application/octet-stream"),
        ));
        assert_eq!(file.content_type(), "application/pdf");
        assert_eq!(file.extension(), "pdf");
    }

    #[test]
    fn accepts_declared_video_type_without_extension() {
        let file = accepted(validate(
            CandidateFile::new("recording", vec![0]).with_content_type("video/webm"),
        ));
        assert_eq!(file.extension(), "webm");
        assert_eq!(file.content_type(), "video/webm");
    }

    #[test]
    fn rejects_other_types() {
        let file = rejected(validate(CandidateFile::new("photo.png", vec![0])));
        assert_eq!(
            file.reason,
            RejectReason::UnsupportedType {
                detected: ".png".to_string()
            }
        );

        let file = rejected(validate(
            CandidateFile::new("notes", vec![0]).with_content_type("text/plain"),
        ));
        assert_eq!(
            file.reason,
            RejectReason::UnsupportedType {
                detected: "text/plain".to_string()
            }
        );
    }

    #[test]
    fn declared_type_cannot_override_a_disallowed_extension() {
        let file = rejected(validate(
            CandidateFile::new("photo.png", vec![0]).with_content_type("application/pdf"),
        ));
        assert_eq!(
            file.reason,
            RejectReason::UnsupportedType {
                detected: ".png".to_string()
            }
        );

        let file = rejected(validate(
            CandidateFile::new("clip.gif", vec![0]).with_content_type("video/mp4"),
        ));
        assert_eq!(file.name, "clip.gif");
    }

    #[test]
    fn rejects_files_over_the_ceiling() {
        let at_limit = CandidateFile::new("big.pdf", vec![0; MAX_ATTACHMENT_BYTES]);
        assert!(matches!(validate(at_limit), FileCheck::Accepted(_)));

        let over = CandidateFile::new("huge.pdf", vec![0; MAX_ATTACHMENT_BYTES + 1]);
        let file = rejected(validate(over));
        assert_eq!(
            file.reason,
            RejectReason::TooLarge {
                size: MAX_ATTACHMENT_BYTES + 1
            }
        );
        assert!(file.to_string().starts_with("huge.pdf: 25.0 MiB exceeds"));
    }

    #[tokio::test]
    async fn oversized_file_on_disk_is_rejected_without_reading() {
        let dir = std::env::temp_dir().join(format!("scribe-validation-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lecture.mkv");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(MAX_ATTACHMENT_BYTES as u64 + 1).unwrap();

        let candidate = CandidateFile::from_path(&path).await.unwrap();
        assert_eq!(candidate.name, "lecture.mkv");
        assert!(candidate.bytes.is_empty());
        assert_eq!(candidate.size(), MAX_ATTACHMENT_BYTES + 1);

        let file = rejected(validate(candidate));
        assert_eq!(
            file.reason,
            RejectReason::TooLarge {
                size: MAX_ATTACHMENT_BYTES + 1
            }
        );

        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn small_file_on_disk_is_read() {
        let dir = std::env::temp_dir().join(format!("scribe-validation-small-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("exam.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let candidate = CandidateFile::from_path(&path).await.unwrap();
        assert_eq!(candidate.bytes, b"%PDF-1.7");
        assert_eq!(accepted(validate(candidate)).size(), 8);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn rejects_blank_names() {
        let file = rejected(validate(CandidateFile::new("  ", vec![0])));
        assert_eq!(file.reason, RejectReason::MissingName);
    }

    #[test]
    fn partition_keeps_order_and_does_not_block_accepted_files() {
        let (accepted, rejected) = partition(vec![
            CandidateFile::new("a.pdf", vec![0]),
            CandidateFile::new("b.exe", vec![0]),
            CandidateFile::new("c.mov", vec![0]),
            CandidateFile::new("d.docx", vec![0; MAX_ATTACHMENT_BYTES + 1]),
        ]);

        let accepted = accepted.iter().map(AcceptedFile::name).collect::<Vec<_>>();
        let rejected = rejected.iter().map(|file| file.name.as_str()).collect::<Vec<_>>();
        assert_eq!(accepted, vec!["a.pdf", "c.mov"]);
        assert_eq!(rejected, vec!["b.exe", "d.docx"]);
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(2 * 1024 * 1024), "2.0 MiB");
    }
}
