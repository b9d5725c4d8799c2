// ABOUTME: Read-side export of a document's included sections
// ABOUTME: Renders Markdown or a minimal standalone HTML page, only once content exists

use serde::{Deserialize, Serialize};
use tracing::info;

use doculens_core::Document;

use crate::error::{DocumentError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Markdown,
    Html,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
        }
    }

    fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "text/markdown",
            ExportFormat::Html => "text/html",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub include_toc: bool,
    /// Front matter with title, version, and review status
    pub include_metadata: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Markdown,
            include_toc: false,
            include_metadata: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResult {
    pub format: ExportFormat,
    pub content: String,
    pub file_name: String,
    pub mime_type: String,
}

/// Export is only offered once at least one included section has content
pub fn can_export(document: &Document) -> bool {
    document.has_any_content()
}

pub fn export_document(document: &Document, options: &ExportOptions) -> Result<ExportResult> {
    if !can_export(document) {
        return Err(DocumentError::Validation(
            "Nothing to export until at least one section has content".to_string(),
        ));
    }

    let markdown = render_markdown(document, options);
    let content = match options.format {
        ExportFormat::Markdown => markdown,
        ExportFormat::Html => render_html(&document.title, &markdown),
    };

    info!(
        "Exported document {} as {:?} ({} bytes)",
        document.id,
        options.format,
        content.len()
    );

    Ok(ExportResult {
        format: options.format,
        file_name: format!("{}.{}", slugify(&document.title), options.format.extension()),
        mime_type: options.format.mime_type().to_string(),
        content,
    })
}

fn render_markdown(document: &Document, options: &ExportOptions) -> String {
    let mut out = String::new();

    if options.include_metadata {
        out.push_str(&format!(
            "---\ntitle: {}\nversion: {}\nreview_status: {}\n---\n\n",
            document.title, document.current_version, document.review_status
        ));
    }

    out.push_str(&format!("# {}\n\n", document.title));

    if options.include_toc {
        out.push_str("## Table of Contents\n\n");
        for section in document.included_sections() {
            out.push_str(&format!("- [{}](#{})\n", section.title, anchor(&section.title)));
        }
        out.push('\n');
    }

    for section in document.included_sections() {
        out.push_str(&format!("## {}\n\n", section.title));
        match section.content.as_deref().map(str::trim) {
            // Generated content usually repeats the section heading
            Some(content) => {
                let body = content
                    .strip_prefix(&format!("## {}", section.title))
                    .unwrap_or(content)
                    .trim_start();
                out.push_str(body);
                out.push_str("\n\n");
            }
            None => out.push_str("_No content yet._\n\n"),
        }
    }

    out.trim_end().to_string() + "\n"
}

fn render_html(title: &str, markdown: &str) -> String {
    let mut body = String::new();
    let mut in_front_matter = false;
    let mut in_code = false;

    for (i, line) in markdown.lines().enumerate() {
        if line == "---" && (i == 0 || in_front_matter) {
            in_front_matter = !in_front_matter;
            continue;
        }
        if in_front_matter {
            continue;
        }
        if line.starts_with("```") {
            body.push_str(if in_code { "</code></pre>\n" } else { "<pre><code>" });
            in_code = !in_code;
            continue;
        }
        if in_code {
            body.push_str(&html_escape(line));
            body.push('\n');
            continue;
        }

        let rendered = if let Some(text) = line.strip_prefix("### ") {
            format!("<h3>{}</h3>", html_escape(text))
        } else if let Some(text) = line.strip_prefix("## ") {
            format!("<h2 id=\"{}\">{}</h2>", anchor(text), html_escape(text))
        } else if let Some(text) = line.strip_prefix("# ") {
            format!("<h1>{}</h1>", html_escape(text))
        } else if let Some(text) = line.strip_prefix("- ") {
            format!("<li>{}</li>", html_escape(text))
        } else if line.trim().is_empty() {
            continue;
        } else {
            format!("<p>{}</p>", html_escape(line))
        };
        body.push_str(&rendered);
        body.push('\n');
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        html_escape(title),
        body
    )
}

fn anchor(title: &str) -> String {
    title
        .to_lowercase()
        .replace(' ', "-")
        .replace(|c: char| !c.is_alphanumeric() && c != '-', "")
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn slugify(text: &str) -> String {
    let slug: String = text
        .to_lowercase()
        .chars()
        .take(50)
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "document".to_string()
    } else {
        slug.to_string()
    }
}
