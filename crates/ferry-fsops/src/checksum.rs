//! MD5 checksum helpers.
//!
//! Providers publish MD5 sums, so MD5 is the digest here regardless of its
//! cryptographic standing; it is an integrity check against transfer
//! corruption, not an authenticity mechanism.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};

use crate::error::FsOpsError;

/// Compute the MD5 of a file as lowercase hex, streaming in chunks.
pub fn file_md5(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Md5::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// One entry of an `md5sum`-format listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumEntry {
    /// Expected MD5, lowercase hex.
    pub checksum: String,
    /// File name or path as written in the listing.
    pub file_name: String,
}

impl ChecksumEntry {
    /// Resolve the entry against an optional base directory.
    pub fn resolve(&self, base_dir: Option<&Path>) -> PathBuf {
        match base_dir {
            Some(base) => base.join(&self.file_name),
            None => PathBuf::from(&self.file_name),
        }
    }
}

/// A parsed `md5sum`-format file (`<checksum>  <name>` per line).
#[derive(Debug, Clone, Default)]
pub struct ChecksumFile {
    entries: Vec<ChecksumEntry>,
}

impl ChecksumFile {
    /// Load a checksum listing, skipping blank and malformed lines.
    pub fn load(path: &Path) -> Result<Self, FsOpsError> {
        let text = std::fs::read_to_string(path)?;
        let mut entries = Vec::new();

        for line in text.lines() {
            let mut parts = line.split_whitespace();
            let (Some(checksum), Some(name)) = (parts.next(), parts.next()) else {
                continue;
            };
            // md5sum prepends '*' to the name in binary mode
            let name = name.strip_prefix('*').unwrap_or(name);
            entries.push(ChecksumEntry {
                checksum: checksum.to_lowercase(),
                file_name: name.to_string(),
            });
        }

        Ok(Self { entries })
    }

    /// The parsed entries, in file order.
    pub fn entries(&self) -> &[ChecksumEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the listing has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn md5_of_known_content() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();
        file.flush().unwrap();

        let sum = file_md5(file.path()).unwrap();
        assert_eq!(sum, "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn parses_md5sum_format() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"0123ABCD  a.bam\n4567efab  *b.bam\n\nnot-a-line\n")
            .unwrap();
        file.flush().unwrap();

        let listing = ChecksumFile::load(file.path()).unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.entries()[0].checksum, "0123abcd");
        assert_eq!(listing.entries()[1].file_name, "b.bam");
    }

    #[test]
    fn entry_resolves_against_base_dir() {
        let entry = ChecksumEntry {
            checksum: "abc".into(),
            file_name: "sub/a.bam".into(),
        };
        assert_eq!(
            entry.resolve(Some(Path::new("/data"))),
            PathBuf::from("/data/sub/a.bam")
        );
        assert_eq!(entry.resolve(None), PathBuf::from("sub/a.bam"));
    }
}
