use crate::error::GlyphBookError;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// The rasterization collaborator: HTML file in, PDF file out. The layout
/// core never calls this; only the book drivers do.
pub trait HtmlRenderer {
    fn render(&self, html_path: &Path, pdf_path: &Path) -> Result<(), GlyphBookError>;
}

/// Renders through a headless Chromium-family browser
/// (`--headless --print-to-pdf`). The child is polled rather than waited on
/// so a hung navigation can be killed at the timeout.
pub struct ChromiumRenderer {
    binary: PathBuf,
    timeout: Duration,
}

impl ChromiumRenderer {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl HtmlRenderer for ChromiumRenderer {
    fn render(&self, html_path: &Path, pdf_path: &Path) -> Result<(), GlyphBookError> {
        let html_abs = std::path::absolute(html_path)?;
        let pdf_abs = std::path::absolute(pdf_path)?;
        let mut child = Command::new(&self.binary)
            .arg("--headless")
            .arg("--disable-gpu")
            .arg("--no-pdf-header-footer")
            .arg(format!("--print-to-pdf={}", pdf_abs.display()))
            .arg(format!("file://{}", html_abs.display()))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                GlyphBookError::Render(format!(
                    "failed to launch {}: {}",
                    self.binary.display(),
                    err
                ))
            })?;

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if started.elapsed() > self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(GlyphBookError::Render(format!(
                            "rendering {} timed out after {:?}",
                            html_abs.display(),
                            self.timeout
                        )));
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(err) => {
                    let _ = child.kill();
                    return Err(GlyphBookError::Render(err.to_string()));
                }
            }
        };

        if !status.success() {
            return Err(GlyphBookError::Render(format!(
                "{} exited with {} rendering {}",
                self.binary.display(),
                status,
                html_abs.display()
            )));
        }
        if !pdf_abs.exists() {
            return Err(GlyphBookError::Render(format!(
                "renderer produced no output at {}",
                pdf_abs.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_a_render_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let html = dir.path().join("page.html");
        std::fs::write(&html, "<html></html>").expect("write");
        let renderer = ChromiumRenderer::new("/bin/false");
        let err = renderer
            .render(&html, &dir.path().join("page.pdf"))
            .unwrap_err();
        assert!(matches!(err, GlyphBookError::Render(_)));
    }

    #[cfg(unix)]
    #[test]
    fn missing_output_is_a_render_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let html = dir.path().join("page.html");
        std::fs::write(&html, "<html></html>").expect("write");
        // Exits cleanly but writes nothing.
        let renderer = ChromiumRenderer::new("/bin/true");
        let err = renderer
            .render(&html, &dir.path().join("page.pdf"))
            .unwrap_err();
        assert!(matches!(err, GlyphBookError::Render(_)));
    }

    #[test]
    fn missing_binary_is_a_render_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let html = dir.path().join("page.html");
        std::fs::write(&html, "<html></html>").expect("write");
        let renderer = ChromiumRenderer::new("/nonexistent/chromium-binary");
        let err = renderer
            .render(&html, &dir.path().join("page.pdf"))
            .unwrap_err();
        assert!(matches!(err, GlyphBookError::Render(_)));
    }
}
