//! Input resolution: check the local read files before touching the network.
//!
//! Every file is checked before the first request, so a bad `--fastq2` fails
//! the run before a history is created.

use crate::config::{basename, ReadFiles};
use crate::error::GalaxyError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A read file that exists and can be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRead {
    pub path: PathBuf,
    /// File name, which is also the dataset name Galaxy assigns on upload.
    pub basename: String,
    /// True when the file starts with the gzip magic bytes.
    pub compressed: bool,
}

/// Validate every read file, in upload order.
pub fn resolve_reads(reads: &ReadFiles) -> Result<Vec<ResolvedRead>, GalaxyError> {
    reads.iter().map(resolve_read).collect()
}

fn resolve_read(path: &Path) -> Result<ResolvedRead, GalaxyError> {
    let path = path.to_path_buf();

    if !path.exists() {
        return Err(GalaxyError::FileNotFound { path });
    }
    if !path.is_file() {
        return Err(GalaxyError::NotAFile { path });
    }

    let mut head = [0u8; 2];
    let n = std::fs::File::open(&path)
        .and_then(|mut f| f.read(&mut head))
        .map_err(|e| read_error(&path, e))?;

    let compressed = n == 2 && head == GZIP_MAGIC;
    if n == 0 {
        warn!("Read file {} is empty", path.display());
    } else if !compressed && head[0] != b'@' {
        // Galaxy sniffs the datatype itself; this is only a hint for the user.
        warn!(
            "{} does not start with '@'; it may not be FASTQ",
            path.display()
        );
    }

    debug!("Resolved read file: {} (gzip: {})", path.display(), compressed);
    Ok(ResolvedRead {
        basename: basename(&path),
        path,
        compressed,
    })
}

fn read_error(path: &Path, e: std::io::Error) -> GalaxyError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => GalaxyError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => GalaxyError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => GalaxyError::UnreadableInput {
            path: path.to_path_buf(),
            source: e,
        },
    }
}

/// True when the file starts with the gzip magic bytes.
pub fn is_gzip(path: &Path) -> std::io::Result<bool> {
    let mut head = [0u8; 2];
    let n = std::fs::File::open(path)?.read(&mut head)?;
    Ok(n == 2 && head == GZIP_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_reported() {
        let reads = ReadFiles::new("/definitely/not/here_R1.fastq", None);
        let err = resolve_reads(&reads).unwrap_err();
        assert!(matches!(err, GalaxyError::FileNotFound { .. }));
    }

    #[test]
    fn missing_mate_is_reported_even_when_r1_exists() {
        let dir = tempfile::tempdir().unwrap();
        let r1 = dir.path().join("s_R1.fastq");
        std::fs::write(&r1, "@r1\nACGT\n+\nIIII\n").unwrap();
        let reads = ReadFiles::new(&r1, Some(dir.path().join("s_R2.fastq")));
        match resolve_reads(&reads).unwrap_err() {
            GalaxyError::FileNotFound { path } => assert!(path.ends_with("s_R2.fastq")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_reads(&ReadFiles::new(dir.path(), None)).unwrap_err();
        match err {
            GalaxyError::NotAFile { path } => assert_eq!(path, dir.path()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn directory_as_mate_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let r1 = dir.path().join("s_R1.fastq");
        std::fs::write(&r1, "@r1\nACGT\n+\nIIII\n").unwrap();
        let sub = dir.path().join("s_R2.fastq");
        std::fs::create_dir(&sub).unwrap();
        let err = resolve_reads(&ReadFiles::new(&r1, Some(sub))).unwrap_err();
        assert!(matches!(err, GalaxyError::NotAFile { .. }), "got {err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_is_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let r1 = dir.path().join("locked.fastq");
        std::fs::write(&r1, "@r1\nACGT\n+\nIIII\n").unwrap();
        std::fs::set_permissions(&r1, std::fs::Permissions::from_mode(0o000)).unwrap();
        // Root ignores mode bits.
        if std::fs::File::open(&r1).is_ok() {
            return;
        }
        let err = resolve_reads(&ReadFiles::new(&r1, None)).unwrap_err();
        assert!(matches!(err, GalaxyError::PermissionDenied { .. }), "got {err:?}");
    }

    #[test]
    fn plain_and_gzip_files_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("a.fastq");
        std::fs::write(&plain, "@r1\nACGT\n+\nIIII\n").unwrap();

        let gz = dir.path().join("b.fastq.gz");
        let mut enc = flate2::write::GzEncoder::new(
            std::fs::File::create(&gz).unwrap(),
            flate2::Compression::default(),
        );
        enc.write_all(b"@r1\nACGT\n+\nIIII\n").unwrap();
        enc.finish().unwrap();

        let resolved = resolve_reads(&ReadFiles::new(&plain, Some(gz.clone()))).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].basename, "a.fastq");
        assert!(!resolved[0].compressed);
        assert_eq!(resolved[1].basename, "b.fastq.gz");
        assert!(resolved[1].compressed);
        assert!(is_gzip(&gz).unwrap());
    }
}
