//! services/api/src/adapters/pdf_tool.rs
//!
//! Best-effort wrapper around the host's optional `pdftotext` binary,
//! implementing the `PdfTextTool` port. The binary is located once at
//! startup; when it is absent every call reports unavailability and the
//! extractor falls back to a placeholder instead.

use async_trait::async_trait;
use module_assistant_core::ports::{PdfTextTool, PortError, PortResult};
use std::path::PathBuf;
use tokio::process::Command;
use uuid::Uuid;

/// Locates and drives the `pdftotext` command-line tool.
#[derive(Clone)]
pub struct PdftotextTool {
    binary: Option<PathBuf>,
}

impl PdftotextTool {
    /// Probes the host for a `pdftotext` binary on the search path.
    pub fn discover() -> Self {
        let binary = which::which("pdftotext").ok();
        if binary.is_none() {
            tracing::info!("pdftotext not found; PDF uploads will use placeholder text");
        }
        Self { binary }
    }
}

#[async_trait]
impl PdfTextTool for PdftotextTool {
    fn available(&self) -> bool {
        self.binary.is_some()
    }

    /// Writes the PDF bytes to a scratch file and runs
    /// `pdftotext -layout <file> -`, returning stdout.
    async fn extract_text(&self, bytes: &[u8]) -> PortResult<String> {
        let Some(binary) = &self.binary else {
            return Err(PortError::Unsupported(
                "pdftotext is not installed on this host".to_string(),
            ));
        };

        let scratch = std::env::temp_dir().join(format!("modgen-{}.pdf", Uuid::new_v4()));
        tokio::fs::write(&scratch, bytes)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let output = Command::new(binary)
            .arg("-layout")
            .arg(&scratch)
            .arg("-")
            .output()
            .await;

        // The scratch file is gone regardless of how the tool fared.
        let _ = tokio::fs::remove_file(&scratch).await;

        let output = output.map_err(|e| PortError::Unexpected(e.to_string()))?;
        if !output.status.success() {
            return Err(PortError::Unexpected(format!(
                "pdftotext exited with status {}",
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
