use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{instrument, warn};

use super::error::CompressError;
use super::process::run_with_input;
use super::Compressor;

const STRATEGY: &str = "PDF";

/// Default Ghostscript executable for the current platform.
pub fn default_ghostscript_bin() -> String {
    if cfg!(windows) {
        r"C:\Program Files\gs\gs10.05.1\bin\gswin64c.exe".to_string()
    } else {
        "gs".to_string()
    }
}

/// Rewrites a PDF through Ghostscript's `pdfwrite` device.
///
/// The document is piped through stdin/stdout; nothing touches the disk on
/// our side.
#[derive(Debug, Clone)]
pub struct GhostscriptCompressor {
    binary: PathBuf,
    pdf_settings: String,
    timeout: Duration,
}

impl GhostscriptCompressor {
    pub fn new(binary: impl Into<PathBuf>, pdf_settings: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            pdf_settings: pdf_settings.into(),
            timeout,
        }
    }

    fn args(&self) -> Vec<String> {
        vec![
            "-sDEVICE=pdfwrite".to_string(),
            "-dCompatibilityLevel=1.4".to_string(),
            format!("-dPDFSETTINGS={}", self.pdf_settings),
            "-dNOPAUSE".to_string(),
            "-dQUIET".to_string(),
            "-dBATCH".to_string(),
            // Keep PostScript chatter off stdout, which carries the PDF.
            "-sstdout=%stderr".to_string(),
            "-sOutputFile=-".to_string(),
            "-".to_string(),
        ]
    }
}

#[async_trait]
impl Compressor for GhostscriptCompressor {
    fn name(&self) -> &'static str {
        STRATEGY
    }

    #[instrument(skip(self, input), fields(input_bytes = input.len(), binary = %self.binary.display()))]
    async fn compress(&self, input: &[u8]) -> Result<Vec<u8>, CompressError> {
        let output = run_with_input(&self.binary, &self.args(), input, self.timeout)
            .await
            .map_err(|e| CompressError::failed(STRATEGY, e.to_string()))?;

        if !output.status.success() {
            let code = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            let stderr = output.stderr_lossy();
            warn!(exit_code = %code, stderr = %stderr, "Ghostscript exited with failure");
            return Err(CompressError::failed(
                STRATEGY,
                format!("Ghostscript failed (code {code}): {stderr}"),
            ));
        }

        Ok(output.stdout)
    }
}
