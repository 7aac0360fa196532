//! Single-entry patching for distribution archives
//!
//! [`append_or_replace`] adds one named entry to an existing wheel, zip or tar
//! archive (plain, gzip, bzip2 or xz) while keeping every other entry intact.
//! Rewrites go through a temporary file next to the archive which is then
//! renamed over the original.

pub mod errors;
pub mod tarball;
pub mod zipfile;

pub use errors::ArchiveError;
pub use tarball::TarCompression;

use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, warn};

/// What [`append_or_replace`] did to the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The archive does not exist; nothing was written
    MissingArchive,
    /// The entry was already present and replacing was not requested
    Unchanged,
    Appended,
    Replaced,
}

/// Container format, detected from the file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Tar(TarCompression),
}

impl ArchiveKind {
    pub fn from_path(path: &Path) -> Result<Self, ArchiveError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if name.ends_with(".whl") || name.ends_with(".zip") {
            return Ok(ArchiveKind::Zip);
        }
        TarCompression::from_file_name(&name)
            .map(ArchiveKind::Tar)
            .ok_or_else(|| ArchiveError::UnsupportedArchive(path.to_path_buf()))
    }
}

/// Write `data` as `entry_name` into the archive at `archive_path`.
///
/// A missing archive is a no-op. An existing entry is kept unless
/// `replace_if_present` is set, in which case the archive ends up holding
/// exactly one entry with that name.
pub fn append_or_replace(
    archive_path: &Path,
    entry_name: &str,
    data: &[u8],
    replace_if_present: bool,
) -> Result<PatchOutcome, ArchiveError> {
    if !archive_path.is_file() {
        warn!("Archive {:?} does not exist, skipping", archive_path);
        return Ok(PatchOutcome::MissingArchive);
    }

    let kind = ArchiveKind::from_path(archive_path)?;
    debug!(
        "Patching {:?} ({:?}) with entry {}",
        archive_path, kind, entry_name
    );

    let outcome = match kind {
        ArchiveKind::Zip => {
            zipfile::append_or_replace(archive_path, entry_name, data, replace_if_present)?
        }
        ArchiveKind::Tar(compression) => tarball::append_or_replace(
            archive_path,
            compression,
            entry_name,
            data,
            replace_if_present,
        )?,
    };

    debug!("Patched {:?}: {:?}", archive_path, outcome);
    Ok(outcome)
}

/// Scratch directory on the same filesystem as `archive_path`, removed on drop
fn scratch_dir(archive_path: &Path) -> std::io::Result<TempDir> {
    let parent = archive_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tempfile::Builder::new()
        .prefix(".package-info")
        .tempdir_in(parent)
}

/// Move a rewritten archive over the original, keeping the original's permissions
fn swap_into_place(temp_path: &Path, archive_path: &Path) -> std::io::Result<()> {
    let permissions = std::fs::metadata(archive_path)?.permissions();
    std::fs::set_permissions(temp_path, permissions)?;
    std::fs::rename(temp_path, archive_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_kind_from_path() {
        assert!(matches!(
            ArchiveKind::from_path(Path::new("dist/demo-1.0-py3-none-any.whl")),
            Ok(ArchiveKind::Zip)
        ));
        assert!(matches!(
            ArchiveKind::from_path(Path::new("demo-1.0.TAR.GZ")),
            Ok(ArchiveKind::Tar(TarCompression::Gzip))
        ));
        assert!(matches!(
            ArchiveKind::from_path(Path::new("demo-1.0.txz")),
            Ok(ArchiveKind::Tar(TarCompression::Xz))
        ));
        assert!(matches!(
            ArchiveKind::from_path(Path::new("demo-1.0.rar")),
            Err(ArchiveError::UnsupportedArchive(_))
        ));
    }

    #[test]
    fn test_missing_archive_is_noop() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let missing = temp_dir.path().join("demo-1.0.tar.gz");
        let result = append_or_replace(&missing, "demo/package_info.py", b"x = 1\n", true);
        assert!(matches!(result, Ok(PatchOutcome::MissingArchive)));
        assert!(!missing.exists());

        let missing_wheel = temp_dir.path().join("demo-1.0-py3-none-any.whl");
        let result = append_or_replace(&missing_wheel, "demo/package_info.py", b"x = 1\n", false);
        assert!(matches!(result, Ok(PatchOutcome::MissingArchive)));
    }

    #[test]
    fn test_unsupported_suffix_is_an_error() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let path = temp_dir.path().join("demo-1.0.7z");
        assert!(std::fs::write(&path, b"not an archive").is_ok());
        let result = append_or_replace(&path, "demo/package_info.py", b"x = 1\n", true);
        assert!(matches!(result, Err(ArchiveError::UnsupportedArchive(_))));
    }

    #[test]
    fn test_scratch_dir_is_next_to_archive() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let archive = temp_dir.path().join("demo.tar");
        let Ok(scratch) = scratch_dir(&archive) else {
            panic!("scratch dir should be created");
        };
        assert_eq!(scratch.path().parent(), Some(temp_dir.path()));
        let scratch_path = scratch.path().to_path_buf();
        drop(scratch);
        assert!(!scratch_path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_keeps_archive_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let wheel = temp_dir.path().join("demo-1.0-py3-none-any.whl");
        let sdist = temp_dir.path().join("demo-1.0.tar");
        {
            let Ok(file) = std::fs::File::create(&wheel) else {
                return;
            };
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default();
            assert!(writer.start_file("demo/package_info.py", options).is_ok());
            assert!(writer.finish().is_ok());
        }
        {
            let Ok(file) = std::fs::File::create(&sdist) else {
                return;
            };
            let mut builder = tar::Builder::new(file);
            let mut header = tar::Header::new_gnu();
            header.set_size(0);
            header.set_mode(0o644);
            assert!(builder
                .append_data(&mut header, "demo-1.0/PKG-INFO", std::io::empty())
                .is_ok());
            assert!(builder.finish().is_ok());
        }

        for archive in [&wheel, &sdist] {
            let mode = std::fs::Permissions::from_mode(0o640);
            assert!(std::fs::set_permissions(archive, mode).is_ok());
            let result = append_or_replace(archive, "demo/package_info.py", b"x = 1\n", true);
            assert!(result.is_ok(), "{:?}", archive);
            let mode = std::fs::metadata(archive)
                .map(|m| m.permissions().mode() & 0o777)
                .unwrap_or_default();
            assert_eq!(mode, 0o640, "{:?}", archive);
        }
    }
}
