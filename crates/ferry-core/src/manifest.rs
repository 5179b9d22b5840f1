//! Manifest parsing.
//!
//! Two listing formats describe which remote files to fetch:
//!
//! - the provider's tab-delimited manifest with `run_id`, `ftp_file_path`,
//!   `fileName` and `MD5` columns (header spellings are the provider's wire
//!   format, not ours);
//! - a plain `md5sum`-style listing whose second column is a remote path
//!   containing the run id.
//!
//! Both are normalized into [`ManifestRow`]s, from which transfer requests
//! are produced sorted by run id.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::transfer::{TransferError, TransferRequest};

/// Required columns of the tab-delimited manifest format.
const REQUIRED_COLUMNS: [&str; 4] = ["run_id", "ftp_file_path", "fileName", "MD5"];

/// Wire format of one tab-delimited manifest row.
#[derive(Debug, Deserialize)]
struct RawRow {
    run_id: String,
    ftp_file_path: String,
    #[serde(rename = "fileName")]
    file_name: String,
    #[serde(rename = "MD5")]
    md5: String,
}

/// One normalized manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestRow {
    /// Run/batch identifier.
    pub run_id: String,
    /// Remote path, absolute on the remote host.
    pub remote_path: String,
    /// Destination file name; key in the state snapshot.
    pub file_name: String,
    /// Expected MD5 checksum, lowercase hex.
    pub checksum: String,
}

/// A parsed manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    rows: Vec<ManifestRow>,
}

impl Manifest {
    /// Load and validate a tab-delimited manifest file.
    pub fn load(path: &Path) -> Result<Self, TransferError> {
        if !path.is_file() {
            return Err(TransferError::manifest(format!(
                "manifest file not found: {}",
                path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(path)
            .map_err(|e| TransferError::manifest(format!("{}: {e}", path.display())))?;

        let headers = reader
            .headers()
            .map_err(|e| TransferError::manifest(format!("{}: {e}", path.display())))?;
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !headers.iter().any(|h| h == **col))
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(TransferError::manifest(format!(
                "manifest missing required columns: {}",
                missing.join(", ")
            )));
        }

        let mut rows = Vec::new();
        for result in reader.deserialize::<RawRow>() {
            let raw =
                result.map_err(|e| TransferError::manifest(format!("{}: {e}", path.display())))?;
            rows.push(ManifestRow {
                run_id: raw.run_id,
                remote_path: raw.ftp_file_path,
                file_name: raw.file_name,
                checksum: raw.md5.to_lowercase(),
            });
        }

        debug!(path = %path.display(), rows = rows.len(), "Manifest loaded");
        Ok(Self { rows })
    }

    /// Load an `md5sum`-format listing (`<checksum>  <remote path>`).
    ///
    /// The run id is taken from the second component of the remote path
    /// (`/<project>/<run>/<file>`); lines without one are rejected so a
    /// malformed listing is caught before any transfer starts.
    pub fn from_md5sum_file(path: &Path) -> Result<Self, TransferError> {
        let text = fs::read_to_string(path).map_err(|e| {
            TransferError::manifest(format!("checksum listing {}: {e}", path.display()))
        })?;

        let mut rows = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(checksum), Some(raw_path)) = (parts.next(), parts.next()) else {
                return Err(TransferError::manifest(format!(
                    "{}:{}: expected '<md5> <path>'",
                    path.display(),
                    lineno + 1
                )));
            };
            // md5sum prepends '*' to the name in binary mode
            let remote_path = raw_path.strip_prefix('*').unwrap_or(raw_path);

            let run_id = extract_run_id(remote_path).ok_or_else(|| {
                TransferError::manifest(format!(
                    "{}:{}: no run id in path {remote_path}",
                    path.display(),
                    lineno + 1
                ))
            })?;
            let file_name = remote_path
                .rsplit('/')
                .next()
                .unwrap_or(remote_path)
                .to_string();

            rows.push(ManifestRow {
                run_id,
                remote_path: remote_path.to_string(),
                file_name,
                checksum: checksum.to_lowercase(),
            });
        }

        debug!(path = %path.display(), rows = rows.len(), "Checksum listing loaded");
        Ok(Self { rows })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the manifest has no entries.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The normalized rows, in file order.
    pub fn rows(&self) -> &[ManifestRow] {
        &self.rows
    }

    /// Build transfer requests sorted by run id, prefixing `base_url` onto
    /// each remote path.
    pub fn requests(&self, base_url: &str) -> Vec<TransferRequest> {
        let mut sorted: Vec<&ManifestRow> = self.rows.iter().collect();
        sorted.sort_by(|a, b| a.run_id.cmp(&b.run_id));

        sorted
            .into_iter()
            .map(|row| TransferRequest {
                file_name: row.file_name.clone(),
                remote_url: join_url(base_url, &row.remote_path),
                checksum: Some(row.checksum.clone()),
                run_id: Some(row.run_id.clone()),
            })
            .collect()
    }
}

/// Extract the run id from a remote path like `/<project>/<run>/<file>`.
fn extract_run_id(remote_path: &str) -> Option<String> {
    let mut parts = remote_path.trim_matches('/').split('/');
    parts.next()?;
    let run = parts.next()?;
    (!run.is_empty()).then(|| run.to_string())
}

fn join_url(base_url: &str, remote_path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if remote_path.starts_with('/') {
        format!("{base}{remote_path}")
    } else {
        format!("{base}/{remote_path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_manifest(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_and_sorts_by_run_id() {
        let file = write_manifest(
            "run_id\tftp_file_path\tfileName\tMD5\n\
             RUN2\t/proj/RUN2/b.bam\tb.bam\tBBBB\n\
             RUN1\t/proj/RUN1/a.bam\ta.bam\tAAAA\n",
        );
        let manifest = Manifest::load(file.path()).unwrap();
        assert_eq!(manifest.len(), 2);

        let requests = manifest.requests("sftp://host:44398/");
        assert_eq!(requests[0].file_name, "a.bam");
        assert_eq!(requests[0].remote_url, "sftp://host:44398/proj/RUN1/a.bam");
        assert_eq!(requests[0].checksum.as_deref(), Some("aaaa"));
        assert_eq!(requests[0].run_id.as_deref(), Some("RUN1"));
        assert_eq!(requests[1].file_name, "b.bam");
    }

    #[test]
    fn rejects_missing_columns() {
        let file = write_manifest("run_id\tftp_file_path\tfileName\nRUN1\t/p/r/a\ta\n");
        let err = Manifest::load(file.path()).unwrap_err();
        match err {
            TransferError::Manifest { message } => assert!(message.contains("MD5")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_a_manifest_error() {
        let err = Manifest::load(Path::new("/nonexistent/manifest.txt")).unwrap_err();
        assert!(matches!(err, TransferError::Manifest { .. }));
    }

    #[test]
    fn md5sum_listing_extracts_run_ids() {
        let file = write_manifest(
            "0123abcd  /HRA006113/HRR1458867/sample1.bam\n\
             4567efab  */HRA006113/HRR1458868/sample2.bam\n",
        );
        let manifest = Manifest::from_md5sum_file(file.path()).unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.rows()[0].run_id, "HRR1458867");
        // binary-mode '*' marker stripped
        assert_eq!(manifest.rows()[1].remote_path, "/HRA006113/HRR1458868/sample2.bam");

        let requests = manifest.requests("sftp://human.big.ac.cn");
        assert_eq!(
            requests[0].remote_url,
            "sftp://human.big.ac.cn/HRA006113/HRR1458867/sample1.bam"
        );
    }

    #[test]
    fn md5sum_listing_rejects_pathless_lines() {
        let file = write_manifest("0123abcd\n");
        assert!(Manifest::from_md5sum_file(file.path()).is_err());
    }
}
