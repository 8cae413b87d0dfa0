//! Markdown export of the assembled resume.
//!
//! The document leads with the candidate's name — the first line of the
//! contact section — promoted to the title and stripped from the contact
//! body. Every populated section follows as a `##` heading in the fixed
//! section order. Rendering is a pure function of [`ResumeData`], so
//! exporting twice from the same data is byte-identical.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::AppPaths;
use crate::resume::ResumeData;
use crate::section::Section;

/// Title used when no contact section exists yet.
const DEFAULT_NAME: &str = "Your Name";

/// File name of the exported document.
const EXPORT_FILE: &str = "resume.md";

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render `resume` as a markdown document.
pub fn render_markdown(resume: &ResumeData) -> String {
    let name = resume
        .get(Section::Contact)
        .and_then(|contact| contact.lines().next())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .unwrap_or(DEFAULT_NAME);

    let mut doc = format!("# {name}\n\n");

    for (section, content) in resume.iter() {
        doc.push_str(&format!("## {}\n\n", section.title()));

        if section == Section::Contact {
            // The name is already the document title; keep only the rest.
            let body: Vec<&str> = content.lines().skip(1).collect();
            doc.push_str(&body.join("\n"));
            doc.push_str("\n\n");
        } else {
            doc.push_str(content);
            doc.push_str("\n\n");
        }
    }

    doc
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// Put the rendered markdown on the system clipboard.
pub fn copy_to_clipboard(markdown: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("clipboard unavailable")?;
    clipboard
        .set_text(markdown.to_string())
        .context("failed to write clipboard")?;
    Ok(())
}

/// Write the rendered markdown to `resume.md` in the export directory and
/// return the path.
pub fn save_to_file(markdown: &str) -> Result<PathBuf> {
    let dir = AppPaths::new().export_dir;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(EXPORT_FILE);
    std::fs::write(&path, markdown)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_resume() -> ResumeData {
        let mut resume = ResumeData::new();
        resume.insert(
            Section::Contact,
            "Jane Doe\njane@example.com\nSpringfield, IL".into(),
        );
        resume.insert(Section::Summary, "Engineer with 10 years experience.".into());
        resume.insert(Section::Skills, "- Rust\n- SQL".into());
        resume
    }

    #[test]
    fn name_is_promoted_to_title_and_stripped_from_contact() {
        let doc = render_markdown(&sample_resume());

        assert!(doc.starts_with("# Jane Doe\n\n"));
        let contact_heading = doc.find("## Contact Information").unwrap();
        let contact_body = &doc[contact_heading..];
        assert!(contact_body.contains("jane@example.com"));
        // The name appears only in the title.
        assert_eq!(doc.matches("Jane Doe").count(), 1);
    }

    #[test]
    fn sections_render_in_fixed_order() {
        let doc = render_markdown(&sample_resume());

        let contact = doc.find("## Contact Information").unwrap();
        let summary = doc.find("## Professional Summary").unwrap();
        let skills = doc.find("## Skills").unwrap();
        assert!(contact < summary && summary < skills);
    }

    #[test]
    fn missing_contact_uses_placeholder_name() {
        let mut resume = ResumeData::new();
        resume.insert(Section::Skills, "- Rust".into());

        let doc = render_markdown(&resume);
        assert!(doc.starts_with("# Your Name\n\n"));
    }

    /// Exporting twice from the same data produces byte-identical output.
    #[test]
    fn export_is_idempotent() {
        let resume = sample_resume();
        assert_eq!(render_markdown(&resume), render_markdown(&resume));
    }

    #[test]
    fn empty_resume_renders_title_only() {
        let doc = render_markdown(&ResumeData::new());
        assert_eq!(doc, "# Your Name\n\n");
    }

    #[test]
    fn unpopulated_sections_are_omitted() {
        let doc = render_markdown(&sample_resume());
        assert!(!doc.contains("## Work Experience"));
        assert!(!doc.contains("## Projects"));
    }
}
