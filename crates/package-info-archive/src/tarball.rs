//! Tar archives, plain or compressed
//!
//! Tar has no in-place update, so patching streams every kept entry into a
//! new archive with the same compression.

use crate::errors::ArchiveError;
use crate::{scratch_dir, swap_into_place, PatchOutcome};
use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tar::{Archive, Builder, EntryType, Header};
use tracing::debug;
use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

const XZ_PRESET: u32 = 6;

/// PAX keys re-derived from the path passed to the builder
const REWRITTEN_PAX_KEYS: &[&str] = &["path", "linkpath"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TarCompression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

impl TarCompression {
    /// Detect compression from a lowercase file name
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with(".tar") {
            Some(TarCompression::None)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(TarCompression::Gzip)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(TarCompression::Bzip2)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(TarCompression::Xz)
        } else {
            None
        }
    }

    fn reader(self, path: &Path) -> io::Result<Box<dyn Read>> {
        let file = BufReader::new(File::open(path)?);
        Ok(match self {
            TarCompression::None => Box::new(file),
            TarCompression::Gzip => Box::new(MultiGzDecoder::new(file)),
            TarCompression::Bzip2 => Box::new(BzDecoder::new(file)),
            TarCompression::Xz => Box::new(XzDecoder::new(file)),
        })
    }

    fn sink(self, path: &Path) -> io::Result<TarSink> {
        let file = BufWriter::new(File::create(path)?);
        Ok(match self {
            TarCompression::None => TarSink::Plain(file),
            TarCompression::Gzip => {
                TarSink::Gzip(GzEncoder::new(file, flate2::Compression::default()))
            }
            TarCompression::Bzip2 => {
                TarSink::Bzip2(BzEncoder::new(file, bzip2::Compression::default()))
            }
            TarCompression::Xz => TarSink::Xz(XzEncoder::new(file, XZ_PRESET)),
        })
    }
}

/// Output stream of a rewritten archive; `finish` flushes the compressor trailer
enum TarSink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
    Bzip2(BzEncoder<BufWriter<File>>),
    Xz(XzEncoder<BufWriter<File>>),
}

impl TarSink {
    fn finish(self) -> io::Result<()> {
        let mut file = match self {
            TarSink::Plain(file) => file,
            TarSink::Gzip(encoder) => encoder.finish()?,
            TarSink::Bzip2(encoder) => encoder.finish()?,
            TarSink::Xz(encoder) => encoder.finish()?,
        };
        file.flush()?;
        file.get_ref().sync_all()
    }
}

impl Write for TarSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            TarSink::Plain(w) => w.write(buf),
            TarSink::Gzip(w) => w.write(buf),
            TarSink::Bzip2(w) => w.write(buf),
            TarSink::Xz(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            TarSink::Plain(w) => w.flush(),
            TarSink::Gzip(w) => w.flush(),
            TarSink::Bzip2(w) => w.flush(),
            TarSink::Xz(w) => w.flush(),
        }
    }
}

pub fn contains_entry(
    archive_path: &Path,
    compression: TarCompression,
    entry_name: &str,
) -> Result<bool, ArchiveError> {
    let mut archive = Archive::new(compression.reader(archive_path)?);
    for entry in archive.entries()? {
        if entry?.path()?.as_ref() == Path::new(entry_name) {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn append_or_replace(
    archive_path: &Path,
    compression: TarCompression,
    entry_name: &str,
    data: &[u8],
    replace_if_present: bool,
) -> Result<PatchOutcome, ArchiveError> {
    let present = contains_entry(archive_path, compression, entry_name)?;
    if present && !replace_if_present {
        debug!("{} already present in {:?}", entry_name, archive_path);
        return Ok(PatchOutcome::Unchanged);
    }

    rewrite(archive_path, compression, entry_name, data)?;
    Ok(if present {
        PatchOutcome::Replaced
    } else {
        PatchOutcome::Appended
    })
}

fn rewrite(
    archive_path: &Path,
    compression: TarCompression,
    entry_name: &str,
    data: &[u8],
) -> Result<(), ArchiveError> {
    let scratch = scratch_dir(archive_path)?;
    let temp_path = scratch.path().join("patched.tar");

    let mut source = Archive::new(compression.reader(archive_path)?);
    let mut builder = Builder::new(compression.sink(&temp_path)?);
    let mut copied = 0usize;

    for entry in source.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();
        if path == Path::new(entry_name) {
            continue;
        }

        let mut header = entry.header().clone();

        // Global PAX records are copied verbatim; reading them as extensions would consume the data
        if header.entry_type().is_pax_global_extensions() {
            let mut records = Vec::new();
            entry.read_to_end(&mut records)?;
            builder.append(&header, records.as_slice())?;
            copied += 1;
            continue;
        }

        let link_name = entry.link_name()?.map(|l| l.into_owned());
        let pax: Vec<(String, Vec<u8>)> = match entry.pax_extensions()? {
            Some(extensions) => extensions
                .filter_map(Result::ok)
                .filter_map(|ext| {
                    let key = ext.key().ok()?.to_string();
                    (!REWRITTEN_PAX_KEYS.contains(&key.as_str()))
                        .then(|| (key, ext.value_bytes().to_vec()))
                })
                .collect(),
            None => Vec::new(),
        };

        if !pax.is_empty() {
            builder.append_pax_extensions(pax.iter().map(|(k, v)| (k.as_str(), v.as_slice())))?;
        }

        let is_link = matches!(header.entry_type(), EntryType::Symlink | EntryType::Link);
        match link_name {
            Some(target) if is_link => builder.append_link(&mut header, &path, &target)?,
            _ => builder.append_data(&mut header, &path, &mut entry)?,
        }
        copied += 1;
    }

    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(now_secs());
    builder.append_data(&mut header, entry_name, data)?;

    builder.into_inner()?.finish()?;
    swap_into_place(&temp_path, archive_path)?;

    debug!(
        "Rewrote {:?}: {} entries kept, {} written",
        archive_path, copied, entry_name
    );
    Ok(())
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
