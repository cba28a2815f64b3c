//! Debug-symbol archiving
//!
//! The dSYM bundle next to the built app is copied into the destination,
//! zipped in place as `<name>.dSYM.zip`, and the copy removed. Zip entries are
//! rooted at the bundle's own directory name, matching `zip -r` run from the
//! destination.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::settings::ZIP_EXTENSION;

/// Archiving errors
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Debug symbols not found at {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to write {}: {source}", .path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Copy, zip, then remove the copy. Returns the zip path.
pub fn archive_symbols(dsym_path: &Path, copy_path: &Path) -> Result<PathBuf, ArchiveError> {
    copy_bundle(dsym_path, copy_path)?;
    let zip_path = zip_bundle(copy_path)?;
    remove_bundle(copy_path)?;
    Ok(zip_path)
}

/// Recursively copy `source` to `target`, replacing anything already there.
pub fn copy_bundle(source: &Path, target: &Path) -> Result<(), ArchiveError> {
    if !source.is_dir() {
        return Err(ArchiveError::SourceMissing(source.to_path_buf()));
    }
    if target.exists() {
        remove_bundle(target)?;
    }

    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| ArchiveError::SourceMissing(entry.path().to_path_buf()))?;
        let dest = target.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(io_err(&dest))?;
        } else {
            fs::copy(entry.path(), &dest).map_err(io_err(&dest))?;
        }
    }

    Ok(())
}

/// Zip a directory into `<dir>.zip` beside it.
pub fn zip_bundle(bundle: &Path) -> Result<PathBuf, ArchiveError> {
    let mut raw = bundle.as_os_str().to_os_string();
    raw.push(ZIP_EXTENSION);
    let zip_path = PathBuf::from(raw);

    let root_name = bundle
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| ArchiveError::SourceMissing(bundle.to_path_buf()))?;

    let zip_err = |source| ArchiveError::Zip {
        path: zip_path.clone(),
        source,
    };

    let file = File::create(&zip_path).map_err(io_err(&zip_path))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(bundle).sort_by_file_name() {
        let entry = entry?;
        let rel = entry
            .path()
            .strip_prefix(bundle)
            .map_err(|_| ArchiveError::SourceMissing(entry.path().to_path_buf()))?;

        let mut name = root_name.clone();
        for component in rel.components() {
            name.push('/');
            name.push_str(&component.as_os_str().to_string_lossy());
        }

        if entry.file_type().is_dir() {
            writer
                .add_directory(format!("{}/", name), options)
                .map_err(zip_err)?;
        } else {
            writer.start_file(name, options).map_err(zip_err)?;
            let mut input = File::open(entry.path()).map_err(io_err(entry.path()))?;
            io::copy(&mut input, &mut writer).map_err(io_err(entry.path()))?;
        }
    }

    writer.finish().map_err(zip_err)?;
    Ok(zip_path)
}

/// Remove a copied bundle.
pub fn remove_bundle(bundle: &Path) -> Result<(), ArchiveError> {
    fs::remove_dir_all(bundle).map_err(io_err(bundle))
}
