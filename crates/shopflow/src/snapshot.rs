//! Diagnostic screenshots written at labelled points in a flow.

use crate::driver::{BrowserEngine, PageDriver};
use crate::result::FlowResult;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Writes PNG captures under `<dir>/<scenario>/<label>-<engine>.png`
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    /// Writer rooted at `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where a capture would be written
    #[must_use]
    pub fn path_for(&self, scenario_id: &str, label: &str, engine: BrowserEngine) -> PathBuf {
        self.dir
            .join(sanitize(scenario_id))
            .join(format!("{}-{engine}.png", sanitize(label)))
    }

    /// Capture the page, returning the written path
    ///
    /// Failures are logged and swallowed; a missing snapshot never fails a
    /// scenario.
    pub async fn capture<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        scenario_id: &str,
        label: &str,
    ) -> Option<PathBuf> {
        let path = self.path_for(scenario_id, label, driver.engine());
        match self.write(driver, &path).await {
            Ok(()) => {
                debug!(path = %path.display(), "snapshot written");
                Some(path)
            }
            Err(e) => {
                warn!(label, error = %e, "snapshot failed");
                None
            }
        }
    }

    async fn write<D: PageDriver + ?Sized>(
        &self,
        driver: &D,
        path: &Path,
    ) -> FlowResult<()> {
        let png = driver.screenshot().await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, png).await?;
        Ok(())
    }
}

/// Keep labels usable as a single path component
fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockPage};
    use tempfile::TempDir;

    #[test]
    fn test_path_layout() {
        let writer = SnapshotWriter::new("/tmp/shots");
        assert_eq!(
            writer.path_for("subscription_and_upfront", "order-complete", BrowserEngine::Chromium),
            PathBuf::from("/tmp/shots/subscription_and_upfront/order-complete-chromium.png")
        );
    }

    #[test]
    fn test_label_cannot_escape_directory() {
        let writer = SnapshotWriter::new("/tmp/shots");
        let path = writer.path_for("a", "../../etc/passwd", BrowserEngine::Chromium);
        assert_eq!(path.parent().unwrap(), Path::new("/tmp/shots/a"));
    }

    #[tokio::test]
    async fn test_capture_writes_png() {
        let dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(dir.path());
        let driver = MockDriver::new(BrowserEngine::Chromium, MockPage::new());

        let path = writer.capture(&driver, "upfront_only", "logged-in").await.unwrap();
        assert!(path.ends_with("upfront_only/logged-in-chromium.png"));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], &[0x89, 0x50, 0x4E, 0x47]);
    }

    #[tokio::test]
    async fn test_capture_failure_is_swallowed() {
        let dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(dir.path());
        let page = MockPage::new();
        page.fail_screenshots();
        let driver = MockDriver::new(BrowserEngine::Chromium, page);

        assert!(writer.capture(&driver, "upfront_only", "logged-in").await.is_none());
        assert!(!dir.path().join("upfront_only").exists());
    }
}
