use log::info;
use std::{
    fs::{self, File},
    io,
    path::Path,
};
use thiserror::Error;
use zip::{ZipArchive, result::ZipError};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot open archive: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt archive: {0}")]
    Zip(#[from] ZipError),

    #[error("archive contains no files")]
    Empty,
}

/// Extract a zip bundle into `destination`, creating it if needed.
///
/// Entries whose paths would escape `destination` are rejected by the zip
/// reader. Returns the number of entries extracted.
pub fn extract_archive(
    archive: impl AsRef<Path>,
    destination: impl AsRef<Path>,
) -> Result<usize, ArchiveError> {
    let destination = destination.as_ref();
    let mut zip = ZipArchive::new(File::open(archive.as_ref())?)?;
    if zip.is_empty() {
        return Err(ArchiveError::Empty);
    }

    fs::create_dir_all(destination)?;
    let entries = zip.len();
    zip.extract(destination)?;
    info!(
        "extracted {} entries from {} to {}",
        entries,
        archive.as_ref().display(),
        destination.display()
    );
    Ok(entries)
}
