//! Run report export
//!
//! Writes the run accumulation as CSV with a short `#` header.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use probe_protocol::{Endpoint, Sample};
use thiserror::Error;

/// Errors from writing a report
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no samples to export; start a test first")]
    Empty,

    #[error("failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Test metadata written above the samples
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportInfo {
    /// Device the run came from
    pub endpoint: Option<Endpoint>,
    /// Run length as entered
    pub duration_secs: Option<String>,
    /// Sample interval as entered
    pub rate_ms: Option<String>,
}

/// Default report file name inside `dir`
pub fn default_report_path(dir: &Path) -> PathBuf {
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    dir.join(format!("report-{}.csv", secs))
}

/// Format a run as CSV
pub fn format_report(info: &ReportInfo, samples: &[Sample]) -> String {
    let mut output = String::new();
    output.push_str("# Probekit Test Report\n");
    if let Some(endpoint) = &info.endpoint {
        output.push_str(&format!("# Device: {}\n", endpoint));
    }
    if let Some(duration) = &info.duration_secs {
        output.push_str(&format!("# Duration (s): {}\n", duration));
    }
    if let Some(rate) = &info.rate_ms {
        output.push_str(&format!("# Rate (ms): {}\n", rate));
    }
    output.push_str(&format!("# Samples: {}\n", samples.len()));
    output.push_str("time_ms,millivolts,milliamps\n");

    for sample in samples {
        output.push_str(&format!(
            "{},{},{}\n",
            sample.time_ms, sample.millivolts, sample.milliamps
        ));
    }

    output
}

/// Write a run to `path`, creating parent directories
pub fn write_report(path: &Path, info: &ReportInfo, samples: &[Sample]) -> Result<PathBuf, ReportError> {
    if samples.is_empty() {
        return Err(ReportError::Empty);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, format_report(info, samples)).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_report() {
        let info = ReportInfo {
            endpoint: Some(Endpoint::parse("127.0.0.1:49181").unwrap()),
            duration_secs: Some("3".to_string()),
            rate_ms: Some("100".to_string()),
        };
        let samples = [Sample::new(0, 1, 1), Sample::new(100, -2, 3)];
        let text = format_report(&info, &samples);

        assert!(text.contains("# Device: 127.0.0.1:49181\n"));
        assert!(text.contains("# Samples: 2\n"));
        assert!(text.ends_with("time_ms,millivolts,milliamps\n0,1,1\n100,-2,3\n"));
    }

    #[test]
    fn test_empty_run_is_rejected() {
        let path = std::env::temp_dir().join("probekit-empty-report.csv");
        assert!(matches!(
            write_report(&path, &ReportInfo::default(), &[]),
            Err(ReportError::Empty)
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_report_creates_dirs() {
        let dir = std::env::temp_dir().join(format!("probekit-report-{}", std::process::id()));
        let path = default_report_path(&dir.join("nested"));
        let written = write_report(&path, &ReportInfo::default(), &[Sample::new(0, 5, 2)]).unwrap();

        let text = std::fs::read_to_string(&written).unwrap();
        assert!(text.ends_with("0,5,2\n"));
        let _ = std::fs::remove_dir_all(dir);
    }
}
