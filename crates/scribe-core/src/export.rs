//! Note rendering shared by the command line and other frontends.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::models::Attachment;
use crate::Note;

/// Output format for rendered notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Markdown,
}

/// Serializable note view with display names resolved for attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportNote {
    pub id: String,
    pub title: String,
    pub category: String,
    pub tags: Vec<String>,
    pub attachments: Vec<ExportAttachment>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportAttachment {
    pub name: String,
    pub url: String,
}

/// Convert a note into its export view.
///
/// Attachment URLs that cannot be parsed keep the raw URL as their name.
#[must_use]
pub fn note_to_export_item(note: &Note) -> ExportNote {
    let attachments = note
        .attachments
        .iter()
        .map(|url| ExportAttachment {
            name: Attachment::from_url(url).map_or_else(|_| url.clone(), |a| a.display_name),
            url: url.clone(),
        })
        .collect();

    ExportNote {
        id: note.id.to_string(),
        title: note.title.clone(),
        category: note.category.clone(),
        tags: note.tags.clone(),
        attachments,
        content: note.content.clone(),
        created_at: note.created_at.map(|at| at.to_rfc3339()),
    }
}

/// Render a note as pretty-printed JSON.
pub fn render_json(note: &Note) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&note_to_export_item(note))
}

/// Render a note in Markdown with a frontmatter block.
#[must_use]
pub fn render_markdown(note: &Note) -> String {
    let export_note = note_to_export_item(note);
    let mut output = String::new();

    let _ = writeln!(output, "---");
    let _ = writeln!(output, "id: {}", export_note.id);
    let _ = writeln!(output, "title: {}", export_note.title);
    let _ = writeln!(output, "category: {}", export_note.category);
    if let Some(created_at) = &export_note.created_at {
        let _ = writeln!(output, "created_at: {created_at}");
    }
    let _ = writeln!(output, "tags:");
    for tag in &export_note.tags {
        let _ = writeln!(output, "  - {tag}");
    }
    let _ = writeln!(output, "attachments:");
    for attachment in &export_note.attachments {
        let _ = writeln!(output, "  - name: {}", attachment.name);
        let _ = writeln!(output, "    url: {}", attachment.url);
    }
    let _ = writeln!(output, "---");
    let _ = writeln!(output);
    output.push_str(&export_note.content);
    if !output.ends_with('\n') {
        output.push('\n');
    }

    output
}

/// Render a note in the selected format.
pub fn render_note(note: &Note, format: ExportFormat) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json(note),
        ExportFormat::Markdown => Ok(render_markdown(note)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoteId;

    fn note() -> Note {
        Note {
            id: NoteId::new("42").unwrap(),
            title: "Midterm Review".to_string(),
            content: "# Cells\n\nMitochondria.".to_string(),
            category: "Biology".to_string(),
            tags: vec!["exam".to_string(), "unit 3".to_string()],
            attachments: vec!["https://files.test/attachments/0b9e%20a.pdf".to_string()],
            user_id: "user-1".to_string(),
            created_at: None,
        }
    }

    #[test]
    fn render_markdown_includes_frontmatter_and_content() {
        let rendered = render_markdown(&note());

        assert!(rendered.starts_with("---\nid: 42\ntitle: Midterm Review\ncategory: Biology\n"));
        assert!(rendered.contains("tags:\n  - exam\n  - unit 3\n"));
        assert!(rendered.contains("  - name: 0b9e a.pdf\n"));
        assert!(rendered.contains("    url: https://files.test/attachments/0b9e%20a.pdf\n"));
        assert!(rendered.ends_with("---\n\n# Cells\n\nMitochondria.\n"));
        assert!(!rendered.contains("created_at"));
    }

    #[test]
    fn render_json_keeps_tag_order() {
        let rendered = render_json(&note()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["id"], "42");
        assert_eq!(value["tags"], serde_json::json!(["exam", "unit 3"]));
        assert_eq!(value["attachments"][0]["name"], "0b9e a.pdf");
    }

    #[test]
    fn render_note_dispatches_on_format() {
        let note = note();
        assert_eq!(
            render_note(&note, ExportFormat::Markdown).unwrap(),
            render_markdown(&note)
        );
        assert!(render_note(&note, ExportFormat::Json)
            .unwrap()
            .starts_with('{'));
    }
}
