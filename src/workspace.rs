//! On-disk layout shared by all requests.
//!
//! ```text
//! <root>/uploads/          incoming archives, removed once processed
//! <root>/extracted_data/   one scratch directory per request
//! <root>/processed_data/   the packaged volume (read-only fetch)
//! ```
//!
//! Every request works inside its own [`ScratchSession`], which deletes its
//! directory tree when dropped, on success and on error alike.

use crate::nifti::{self, NiftiError, NiftiVolume};

use log::debug;
use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};
use tempfile::{Builder, NamedTempFile, TempDir};
use thiserror::Error;

const UPLOADS_DIR: &str = "uploads";
const EXTRACTED_DIR: &str = "extracted_data";
const PROCESSED_DIR: &str = "processed_data";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("no file name given for the upload")]
    EmptyFilename,

    #[error("packaged volume {0} does not exist")]
    MissingVolume(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Nifti(#[from] NiftiError),
}

#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
    output_name: String,
}

impl Workspace {
    /// Open (and create if missing) the directory layout under `root`.
    pub fn open(root: impl AsRef<Path>, output_name: &str) -> Result<Self, WorkspaceError> {
        let root = root.as_ref().to_path_buf();
        for dir in [UPLOADS_DIR, EXTRACTED_DIR, PROCESSED_DIR] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self {
            root,
            output_name: output_name.to_string(),
        })
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join(PROCESSED_DIR)
    }

    /// Well-known location of the packaged volume.
    pub fn volume_path(&self) -> PathBuf {
        self.processed_dir().join(&self.output_name)
    }

    /// Copy an incoming archive into the uploads area. The returned file is
    /// deleted when dropped.
    pub fn store_upload(
        &self,
        filename: &str,
        mut contents: impl Read,
    ) -> Result<NamedTempFile, WorkspaceError> {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or(WorkspaceError::EmptyFilename)?;

        let mut upload = Builder::new()
            .prefix(&format!("{stem}-"))
            .suffix(".zip")
            .tempfile_in(self.root.join(UPLOADS_DIR))?;
        io::copy(&mut contents, upload.as_file_mut())?;
        debug!("stored upload {filename} at {}", upload.path().display());
        Ok(upload)
    }

    /// Start a request-scoped scratch area.
    pub fn begin_session(&self) -> Result<ScratchSession, WorkspaceError> {
        let dir = Builder::new()
            .prefix("request-")
            .tempdir_in(self.root.join(EXTRACTED_DIR))?;
        let session = ScratchSession { dir };
        fs::create_dir_all(session.extracted_dir())?;
        fs::create_dir_all(session.rasters_dir())?;
        debug!("opened scratch session {}", session.path().display());
        Ok(session)
    }

    /// Move a finished artifact from a session onto the well-known path.
    pub fn publish_volume(&self, staged: &Path) -> Result<PathBuf, WorkspaceError> {
        let target = self.volume_path();
        fs::rename(staged, &target)?;
        Ok(target)
    }

    /// Names of the files currently in the processed directory, sorted.
    /// A missing directory lists as empty.
    pub fn list_processed(&self) -> Result<Vec<String>, WorkspaceError> {
        let entries = match fs::read_dir(self.processed_dir()) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Raw bytes of the packaged volume.
    pub fn fetch_volume(&self) -> Result<Vec<u8>, WorkspaceError> {
        let path = self.volume_path();
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(WorkspaceError::MissingVolume(path))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The packaged volume decoded back into voxels.
    pub fn read_volume(&self) -> Result<NiftiVolume, WorkspaceError> {
        let path = self.volume_path();
        if !path.is_file() {
            return Err(WorkspaceError::MissingVolume(path));
        }
        Ok(nifti::read_volume(&path)?)
    }
}

/// Request-scoped scratch directory, removed on drop.
pub struct ScratchSession {
    dir: TempDir,
}

impl ScratchSession {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the uploaded archive is unpacked.
    pub fn extracted_dir(&self) -> PathBuf {
        self.dir.path().join("extracted")
    }

    /// Where rasters and their crops live until assembly.
    pub fn rasters_dir(&self) -> PathBuf {
        self.dir.path().join("rasters")
    }

    /// Staging path for the packaged volume before it is published.
    pub fn staged_volume_path(&self) -> PathBuf {
        self.dir.path().join("volume.nii.gz")
    }
}
