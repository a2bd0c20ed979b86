use std::fs;
use std::io;
use std::path::Path;

use flate2::read::GzDecoder;
use log::{debug, info};
use tar::Archive;
use zip::read::ZipArchive;

use crate::error::{Result, UpdateError};

/// Unpacks a downloaded archive next to itself.
pub trait Decoder: Send + Sync {
    fn decode(&self, archive: &Path) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArchiveKind {
    TarGz,
    Zip,
}

/// Zip and tar.gz extraction, chosen by file extension (zip otherwise).
#[derive(Clone, Copy, Debug, Default)]
pub struct ArchiveDecoder;

impl Decoder for ArchiveDecoder {
    fn decode(&self, archive: &Path) -> Result<()> {
        let Some(root) = archive.parent() else {
            return Err(UpdateError::Decode {
                path: archive.to_path_buf(),
                reason: "no root path for archive".into(),
            });
        };
        let kind = guess_archive_kind(archive);
        info!("decode: extracting {} as {:?}", archive.display(), kind);
        match kind {
            ArchiveKind::TarGz => extract_targz(archive, root),
            ArchiveKind::Zip => extract_zip(archive, root),
        }
    }
}

fn guess_archive_kind(path: &Path) -> ArchiveKind {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        ArchiveKind::TarGz
    } else {
        ArchiveKind::Zip
    }
}

fn decode_error(archive: &Path, reason: impl Into<String>) -> UpdateError {
    UpdateError::Decode {
        path: archive.to_path_buf(),
        reason: reason.into(),
    }
}

fn extract_targz(archive_path: &Path, root: &Path) -> Result<()> {
    let file = fs::File::open(archive_path).map_err(|e| UpdateError::io(archive_path, e))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let entries = archive
        .entries()
        .map_err(|e| decode_error(archive_path, format!("tar.gz read error: {e}")))?;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| decode_error(archive_path, format!("tar.gz entry error: {e}")))?;
        let unpacked = entry
            .unpack_in(root)
            .map_err(|e| decode_error(archive_path, format!("tar.gz extract error: {e}")))?;
        if !unpacked {
            return Err(decode_error(archive_path, "tar entry escapes destination"));
        }
    }
    Ok(())
}

fn extract_zip(archive_path: &Path, root: &Path) -> Result<()> {
    let file = fs::File::open(archive_path).map_err(|e| UpdateError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| decode_error(archive_path, format!("zip parse error: {e}")))?;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| decode_error(archive_path, format!("zip entry error: {e}")))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(decode_error(
                archive_path,
                format!("zip entry escapes destination: {}", entry.name()),
            ));
        };
        let out_path = root.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| UpdateError::io(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| UpdateError::io(parent, e))?;
        }
        let mut out_file = fs::File::create(&out_path).map_err(|e| UpdateError::io(&out_path, e))?;
        io::copy(&mut entry, &mut out_file).map_err(|e| UpdateError::io(&out_path, e))?;
        debug!("decode: wrote {}", out_path.display());
    }
    Ok(())
}
