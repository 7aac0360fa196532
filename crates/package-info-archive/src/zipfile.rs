//! Wheel and zip archives

use crate::errors::ArchiveError;
use crate::{scratch_dir, swap_into_place, PatchOutcome};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644)
}

pub fn contains_entry(archive_path: &Path, entry_name: &str) -> Result<bool, ArchiveError> {
    let archive = ZipArchive::new(File::open(archive_path)?)?;
    let found = archive.file_names().any(|name| name == entry_name);
    Ok(found)
}

pub fn append_or_replace(
    archive_path: &Path,
    entry_name: &str,
    data: &[u8],
    replace_if_present: bool,
) -> Result<PatchOutcome, ArchiveError> {
    if !contains_entry(archive_path, entry_name)? {
        append(archive_path, entry_name, data)?;
        return Ok(PatchOutcome::Appended);
    }

    if !replace_if_present {
        debug!("{} already present in {:?}", entry_name, archive_path);
        return Ok(PatchOutcome::Unchanged);
    }

    replace(archive_path, entry_name, data)?;
    Ok(PatchOutcome::Replaced)
}

fn append(archive_path: &Path, entry_name: &str, data: &[u8]) -> Result<(), ArchiveError> {
    let file = OpenOptions::new().read(true).write(true).open(archive_path)?;
    let mut writer = ZipWriter::new_append(file)?;
    writer.start_file(entry_name, entry_options())?;
    writer.write_all(data)?;
    writer.finish()?;
    Ok(())
}

/// Raw-copy every other entry into a fresh archive, then swap it in
fn replace(archive_path: &Path, entry_name: &str, data: &[u8]) -> Result<(), ArchiveError> {
    let scratch = scratch_dir(archive_path)?;
    let temp_path = scratch.path().join("patched.zip");

    let mut source = ZipArchive::new(File::open(archive_path)?)?;
    let mut writer = ZipWriter::new(File::create(&temp_path)?);

    for index in 0..source.len() {
        let entry = source.by_index_raw(index)?;
        if entry.name() == entry_name {
            continue;
        }
        writer.raw_copy_file(entry)?;
    }

    writer.start_file(entry_name, entry_options())?;
    writer.write_all(data)?;
    writer.finish()?;

    swap_into_place(&temp_path, archive_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    const RECORD: &str = "demo-1.0.dist-info/RECORD";
    const INFO: &str = "demo/package_info.py";

    fn build_wheel(path: &Path, entries: &[(&str, &str)]) {
        let Ok(file) = File::create(path) else {
            panic!("create wheel");
        };
        let mut writer = ZipWriter::new(file);
        for (name, content) in entries {
            assert!(writer.start_file(*name, entry_options()).is_ok());
            assert!(writer.write_all(content.as_bytes()).is_ok());
        }
        assert!(writer.finish().is_ok());
    }

    fn read_entries(path: &Path) -> Vec<(String, String)> {
        let Ok(file) = File::open(path) else {
            return Vec::new();
        };
        let Ok(mut archive) = ZipArchive::new(file) else {
            return Vec::new();
        };
        let mut entries = Vec::new();
        for index in 0..archive.len() {
            let Ok(mut entry) = archive.by_index(index) else {
                continue;
            };
            let mut content = String::new();
            let _ = entry.read_to_string(&mut content);
            entries.push((entry.name().to_string(), content));
        }
        entries
    }

    #[test]
    fn test_append_new_entry() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let wheel = temp_dir.path().join("demo-1.0-py3-none-any.whl");
        build_wheel(&wheel, &[("demo/__init__.py", ""), (RECORD, "rows")]);

        let result = append_or_replace(&wheel, INFO, b"x = 1\n", false);
        assert!(matches!(result, Ok(PatchOutcome::Appended)));

        let entries = read_entries(&wheel);
        assert_eq!(entries.len(), 3);
        assert!(entries.contains(&(INFO.to_string(), "x = 1\n".to_string())));
        assert!(entries.contains(&(RECORD.to_string(), "rows".to_string())));
    }

    #[test]
    fn test_present_entry_kept_without_replace() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let wheel = temp_dir.path().join("demo-1.0-py3-none-any.whl");
        build_wheel(&wheel, &[(INFO, "old = True\n")]);
        let before = fs::read(&wheel).unwrap_or_default();

        let result = append_or_replace(&wheel, INFO, b"new = True\n", false);
        assert!(matches!(result, Ok(PatchOutcome::Unchanged)));
        assert_eq!(fs::read(&wheel).unwrap_or_default(), before);
    }

    #[test]
    fn test_double_patch_leaves_single_latest_entry() {
        let Ok(temp_dir) = TempDir::new() else {
            return;
        };
        let wheel = temp_dir.path().join("demo-1.0-py3-none-any.whl");
        build_wheel(&wheel, &[("demo/__init__.py", "pass\n"), (RECORD, "rows")]);

        assert!(append_or_replace(&wheel, INFO, b"first = 1\n", true).is_ok());
        let second = append_or_replace(&wheel, INFO, b"second = 2\n", true);
        assert!(matches!(second, Ok(PatchOutcome::Replaced)));

        let entries = read_entries(&wheel);
        let matching: Vec<_> = entries.iter().filter(|(name, _)| name == INFO).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].1, "second = 2\n");
        assert!(entries.contains(&("demo/__init__.py".to_string(), "pass\n".to_string())));
        assert!(entries.contains(&(RECORD.to_string(), "rows".to_string())));

        // no scratch directories are left behind
        let leftovers = fs::read_dir(temp_dir.path())
            .map(|dir| dir.count())
            .unwrap_or_default();
        assert_eq!(leftovers, 1);
    }
}
