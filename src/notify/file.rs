// src/notify/file.rs
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::ReportSet;

/// Persists the rendered reports as timestamped files, one HTML and one
/// Markdown per run.
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn write(
        &self,
        report: &ReportSet,
        generated_at: DateTime<FixedOffset>,
    ) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating report dir {}", self.dir.display()))?;

        let stamp = generated_at.format("%Y%m%d_%H%M");
        let html_path = self.dir.join(format!("report_{stamp}.html"));
        let md_path = self.dir.join(format!("report_{stamp}.md"));

        fs::write(&html_path, &report.html)
            .with_context(|| format!("writing {}", html_path.display()))?;
        fs::write(&md_path, &report.markdown)
            .with_context(|| format!("writing {}", md_path.display()))?;

        info!(
            target: "notify",
            html = %html_path.display(),
            markdown = %md_path.display(),
            "report files written"
        );
        Ok((html_path, md_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn writes_both_report_files() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(tmp.path());
        let tz = FixedOffset::east_opt(9 * 3600).unwrap();
        let at = tz.with_ymd_and_hms(2024, 1, 10, 9, 5, 0).unwrap();
        let report = ReportSet {
            subject: "s".into(),
            html: "<html></html>".into(),
            markdown: "# md".into(),
        };
        let (html, md) = writer.write(&report, at).unwrap();
        assert!(html.ends_with("report_20240110_0905.html"));
        assert_eq!(fs::read_to_string(md).unwrap(), "# md");
    }
}
