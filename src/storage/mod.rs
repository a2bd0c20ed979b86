use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, UpdateError};

pub const TEMP_PACKAGE_SUFFIX: &str = "_temp";
pub const VERSION_FILENAME: &str = "version.manifest";
pub const TEMP_MANIFEST_FILENAME: &str = "project.manifest.temp";
pub const MANIFEST_FILENAME: &str = "project.manifest";

/// On-disk layout: `<root>/project.manifest` plus a `<root>_temp/` working
/// tree holding the version probe, the resume manifest and in-progress assets.
#[derive(Clone, Debug)]
pub struct StorageManager {
    root: PathBuf,
    temp_root: PathBuf,
}

impl StorageManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let temp_root = temp_root_for(&root);
        Self { root, temp_root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    pub fn cached_manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILENAME)
    }

    pub fn temp_manifest_path(&self) -> PathBuf {
        self.temp_root.join(TEMP_MANIFEST_FILENAME)
    }

    pub fn version_path(&self) -> PathBuf {
        self.temp_root.join(VERSION_FILENAME)
    }

    /// Destination of an asset inside the working tree.
    pub fn temp_asset_path(&self, relative: &str) -> PathBuf {
        self.temp_root.join(relative)
    }

    /// Location of a promoted asset.
    pub fn asset_path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.root, &self.temp_root] {
            fs::create_dir_all(dir).map_err(|e| UpdateError::io(dir, e))?;
        }
        Ok(())
    }

    /// Empty the canonical storage root.
    pub fn reset_root(&self) -> Result<()> {
        remove_dir_if_exists(&self.root)?;
        fs::create_dir_all(&self.root).map_err(|e| UpdateError::io(&self.root, e))
    }

    pub fn purge_temp(&self) -> Result<()> {
        remove_dir_if_exists(&self.temp_root)
    }

    pub fn reset_temp(&self) -> Result<()> {
        self.purge_temp()?;
        fs::create_dir_all(&self.temp_root).map_err(|e| UpdateError::io(&self.temp_root, e))
    }

    pub fn remove_cached_manifest(&self) {
        let path = self.cached_manifest_path();
        if let Err(err) = fs::remove_file(&path)
            && err.kind() != io::ErrorKind::NotFound
        {
            warn!("storage: unable to remove {}: {}", path.display(), err);
        }
    }

    /// Turn the working tree into the canonical one.
    ///
    /// The resume manifest is renamed to the canonical name, every file is
    /// moved over the storage root (replacing existing files) and the working
    /// tree is removed. Not crash-atomic: an interruption leaves a partially
    /// merged root and the remainder in the working tree.
    pub fn promote(&self) -> Result<()> {
        let temp_manifest = self.temp_manifest_path();
        if temp_manifest.exists() {
            let renamed = self.temp_root.join(MANIFEST_FILENAME);
            fs::rename(&temp_manifest, &renamed).map_err(|e| UpdateError::io(&temp_manifest, e))?;
        }
        if !self.temp_root.is_dir() {
            return Ok(());
        }

        // Listed up-front: entries are moved out from under the walk.
        let entries = WalkDir::new(&self.temp_root)
            .min_depth(1)
            .into_iter()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                UpdateError::io(path, io::Error::other(e.to_string()))
            })?;

        let mut moved = 0usize;
        for entry in entries {
            let relative = entry
                .path()
                .strip_prefix(&self.temp_root)
                .map_err(|e| UpdateError::io(entry.path(), io::Error::other(e.to_string())))?;
            let target = self.root.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(|e| UpdateError::io(&target, e))?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| UpdateError::io(parent, e))?;
            }
            if target.exists() {
                fs::remove_file(&target).map_err(|e| UpdateError::io(&target, e))?;
            }
            move_file(entry.path(), &target)?;
            moved += 1;
        }
        debug!("storage: moved {} files into {}", moved, self.root.display());

        self.purge_temp()?;
        info!("storage: promoted working tree into {}", self.root.display());
        Ok(())
    }

    /// Remove both the canonical and the working tree.
    pub fn discard_all(&self) -> Result<()> {
        remove_dir_if_exists(&self.root)?;
        remove_dir_if_exists(&self.temp_root)
    }
}

fn temp_root_for(root: &Path) -> PathBuf {
    match root.file_name() {
        Some(name) => {
            let mut name = name.to_os_string();
            name.push(TEMP_PACKAGE_SUFFIX);
            root.with_file_name(name)
        }
        None => root.join(TEMP_PACKAGE_SUFFIX),
    }
}

fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(UpdateError::io(dir, err)),
    }
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // Fallback to copy if rename crosses devices.
    fs::copy(from, to).map_err(|e| UpdateError::io(to, e))?;
    let _ = fs::remove_file(from);
    Ok(())
}
