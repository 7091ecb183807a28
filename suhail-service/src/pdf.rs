//! Transcript export. HTML is rendered from an embedded Tera template and
//! converted with `wkhtmltopdf` when it is installed; otherwise the HTML
//! file itself is kept.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use serde::Serialize;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::transcript::safe_title;

const TRANSCRIPT_TEMPLATE: &str = "transcript.html.tera";

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct MetaItem {
    pub label: String,
    pub value: String,
}

impl MetaItem {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Rendered transcript bytes.
pub enum PdfResult {
    Pdf(Vec<u8>),
    Html(String),
}

impl PdfResult {
    pub fn extension(&self) -> &'static str {
        match self {
            PdfResult::Pdf(_) => "pdf",
            PdfResult::Html(_) => "html",
        }
    }
}

/// Content type to serve a stored export with, from its extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("pdf") => "application/pdf",
        Some("html") => "text/html; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[derive(Clone, Debug)]
pub struct PdfGenerator {
    tera: Tera,
    wkhtmltopdf_path: Option<String>,
}

impl PdfGenerator {
    pub fn new() -> Result<Self, PdfError> {
        let wkhtmltopdf_path = which::which("wkhtmltopdf")
            .ok()
            .map(|p| p.to_string_lossy().to_string());

        match &wkhtmltopdf_path {
            Some(path) => info!(path = %path, "wkhtmltopdf found"),
            None => warn!("wkhtmltopdf not found in PATH - transcripts will be exported as HTML"),
        }

        Self::with_converter(wkhtmltopdf_path)
    }

    /// Generator with an explicit converter path; `None` always exports HTML.
    pub fn with_converter(wkhtmltopdf_path: Option<String>) -> Result<Self, PdfError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html.tera"]);
        tera.add_raw_template(
            TRANSCRIPT_TEMPLATE,
            include_str!("../templates/transcript.html.tera"),
        )
        .map_err(|e| PdfError::Template(e.to_string()))?;

        Ok(Self {
            tera,
            wkhtmltopdf_path,
        })
    }

    pub fn render_html(&self, title: &str, body: &str, meta: &[MetaItem]) -> Result<String, PdfError> {
        let lines: Vec<&str> = body.lines().collect();
        let mut context = Context::new();
        context.insert("title", title);
        context.insert("meta", meta);
        context.insert("lines", &lines);

        self.tera
            .render(TRANSCRIPT_TEMPLATE, &context)
            .map_err(|e| PdfError::Template(e.to_string()))
    }

    pub async fn render(&self, title: &str, body: &str, meta: &[MetaItem]) -> Result<PdfResult, PdfError> {
        let html = self.render_html(title, body, meta)?;

        let Some(wkhtmltopdf) = &self.wkhtmltopdf_path else {
            return Ok(PdfResult::Html(html));
        };
        match convert_html_to_pdf(&html, wkhtmltopdf).await {
            Ok(bytes) => Ok(PdfResult::Pdf(bytes)),
            Err(e) => {
                warn!(error = %e, "PDF conversion failed, falling back to HTML");
                Ok(PdfResult::Html(html))
            }
        }
    }

    /// Render and store a transcript export as `<dir>/<unix time>_<title>.<pdf|html>`.
    pub async fn write_transcript(
        &self,
        dir: &Path,
        title: &str,
        body: &str,
        meta: &[MetaItem],
    ) -> Result<PathBuf, PdfError> {
        tokio::fs::create_dir_all(dir).await?;
        let rendered = self.render(title, body, meta).await?;

        let stamp = chrono::Utc::now().timestamp();
        let path = dir.join(format!("{}_{}.{}", stamp, safe_title(title), rendered.extension()));
        match rendered {
            PdfResult::Pdf(bytes) => tokio::fs::write(&path, bytes).await?,
            PdfResult::Html(html) => tokio::fs::write(&path, html).await?,
        }

        info!(path = %path.display(), "Transcript export written");
        Ok(path)
    }
}

async fn convert_html_to_pdf(html: &str, wkhtmltopdf_path: &str) -> Result<Vec<u8>, PdfError> {
    let temp_dir = std::env::temp_dir();
    let id = uuid::Uuid::new_v4();
    let html_path = temp_dir.join(format!("transcript_{}.html", id));
    let pdf_path = temp_dir.join(format!("transcript_{}.pdf", id));

    tokio::fs::write(&html_path, html).await?;

    let output = Command::new(wkhtmltopdf_path)
        .args(["--page-size", "Letter"])
        .args(["--margin-top", "19mm", "--margin-bottom", "19mm"])
        .args(["--margin-left", "19mm", "--margin-right", "19mm"])
        .args(["--encoding", "utf-8"])
        .arg(&html_path)
        .arg(&pdf_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    let result = match output {
        Ok(output) if output.status.success() => tokio::fs::read(&pdf_path).await.map_err(PdfError::from),
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(stderr = %stderr, "wkhtmltopdf failed");
            Err(PdfError::Conversion(stderr.to_string()))
        }
        Err(e) => Err(PdfError::Io(e)),
    };

    let _ = tokio::fs::remove_file(&html_path).await;
    let _ = tokio::fs::remove_file(&pdf_path).await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html_only() -> PdfGenerator {
        PdfGenerator::with_converter(None).unwrap()
    }

    #[test]
    fn renders_title_meta_and_lines() {
        let html = html_only()
            .render_html(
                "Acme <kick-off>",
                "[00:00:00–00:00:04] Speaker 1: Hello\n\n[00:00:04–00:00:09] Speaker 1: Agenda",
                &[MetaItem::new("Model", "whisper-1"), MetaItem::new("Speakers", "1")],
            )
            .unwrap();

        assert!(html.contains("<h1>Acme &lt;kick-off&gt;</h1>"));
        assert!(html.contains("Model: whisper-1"));
        assert!(html.contains("Speaker 1: Hello</p>"));
        assert!(html.contains(r#"<div class="blank"></div>"#));
    }

    #[tokio::test]
    async fn falls_back_to_html_file() {
        let dir = tempfile::tempdir().unwrap();

        let path = html_only()
            .write_transcript(dir.path(), "Weekly sync!", "line one", &[])
            .await
            .unwrap();

        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("html"));
        assert!(path.file_name().unwrap().to_string_lossy().ends_with("_Weekly sync.html"));
        assert_eq!(content_type_for(&path), "text/html; charset=utf-8");
        assert!(tokio::fs::read_to_string(&path).await.unwrap().contains("line one"));
    }

    #[tokio::test]
    async fn broken_converter_falls_back() {
        let generator = PdfGenerator::with_converter(Some("/nonexistent/wkhtmltopdf".to_string())).unwrap();
        let rendered = generator.render("t", "body", &[]).await.unwrap();
        assert_eq!(rendered.extension(), "html");
    }
}
