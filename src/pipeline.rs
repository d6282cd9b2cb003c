use crate::{
    archive::{ArchiveError, extract_archive},
    bounding_box::BoundingBox,
    config::{ConfigError, PipelineConfig},
    cropper::{BoundingBoxCropper, CropError},
    inference::{Classifier, InferenceAdapter, InferenceError, PredictionResult},
    nifti::{self, NiftiError},
    normalizer::{NormalizeError, VolumeNormalizer},
    rasterizer::{RasterizeError, SliceRasterizer},
    slice_filter::{FilterReport, SliceFilter, SliceFilterError},
    slice_set::SliceSet,
    volume_loader::{VolumeAssembler, VolumeLoaderError},
    workspace::{ScratchSession, Workspace, WorkspaceError},
};

use log::info;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("uploaded archive {0} not found")]
    MissingUpload(PathBuf),

    #[error("archive contains no usable slices")]
    EmptySliceSet,

    #[error("no rasters were produced from the slices")]
    NoRasters,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Filter(#[from] SliceFilterError),

    #[error(transparent)]
    Rasterize(#[from] RasterizeError),

    #[error(transparent)]
    Crop(#[from] CropError),

    #[error(transparent)]
    Assemble(#[from] VolumeLoaderError),

    #[error(transparent)]
    Nifti(#[from] NiftiError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("pipeline worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl PipelineError {
    /// Problems with what the caller sent rather than with the system.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::MissingUpload(_)
                | Self::EmptySliceSet
                | Self::NoRasters
                | Self::Workspace(WorkspaceError::EmptyFilename)
                | Self::Archive(ArchiveError::Empty)
        )
    }
}

/// Outcome of turning one archive into a packaged volume.
#[derive(Clone, Debug, PartialEq)]
pub struct Reconstruction {
    pub volume_path: PathBuf,
    /// (depth, height, width) of the assembled volume.
    pub shape: (usize, usize, usize),
    pub filter: FilterReport,
    pub bounding_box: Option<BoundingBox>,
}

/// Slice archive to packaged volume: extract, filter, rasterize, crop,
/// assemble and write.
#[derive(Clone, Debug)]
pub struct VolumeReconstructor {
    config: PipelineConfig,
    workspace: Workspace,
}

impl VolumeReconstructor {
    pub fn new(config: PipelineConfig, root: impl AsRef<Path>) -> Result<Self, PipelineError> {
        config.validate()?;
        let workspace = Workspace::open(root, &config.output_name)?;
        Ok(Self { config, workspace })
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Rebuild the volume from `archive` and publish it at the workspace's
    /// well-known path.
    pub fn reconstruct(&self, archive: impl AsRef<Path>) -> Result<Reconstruction, PipelineError> {
        let session = self.workspace.begin_session()?;
        let mut reconstruction = self.build_volume(archive.as_ref(), &session)?;
        reconstruction.volume_path = self.workspace.publish_volume(&reconstruction.volume_path)?;
        info!("volume saved at {}", reconstruction.volume_path.display());
        Ok(reconstruction)
    }

    /// Run every stage inside `session`, leaving the volume at the session's
    /// staging path.
    fn build_volume(
        &self,
        archive: &Path,
        session: &ScratchSession,
    ) -> Result<Reconstruction, PipelineError> {
        if !archive.is_file() {
            return Err(PipelineError::MissingUpload(archive.to_path_buf()));
        }
        let policy = self.config.decode_policy;

        extract_archive(archive, session.extracted_dir())?;

        let slices = SliceSet::discover(session.extracted_dir(), &self.config.slice_extension)?;
        if slices.is_empty() {
            return Err(PipelineError::EmptySliceSet);
        }

        let (slices, filter) = SliceFilter::new(policy).remove_black_slices(&slices)?;
        info!(
            "{} of {} slices left after removing black slices",
            slices.len(),
            filter.inspected
        );
        if slices.is_empty() {
            return Err(PipelineError::EmptySliceSet);
        }

        let rasters_dir = session.rasters_dir();
        let rasterized = SliceRasterizer::new(policy).rasterize_set(&slices, &rasters_dir)?;
        if rasterized.written.is_empty() {
            return Err(PipelineError::NoRasters);
        }

        let cropper = BoundingBoxCropper::new(self.config.raster_size, self.config.bottom_band);
        let cropped = cropper.crop_directory(&rasters_dir, &rasters_dir)?;

        let volume = VolumeAssembler::load_from_directory(&rasters_dir)?;
        let staged = session.staged_volume_path();
        nifti::write_volume(&volume, &staged)?;

        Ok(Reconstruction {
            volume_path: staged,
            shape: volume.dim(),
            filter,
            bounding_box: cropped.bounding_box,
        })
    }
}

/// Full request path: reconstruct, normalize, classify.
pub struct Pipeline<C> {
    reconstructor: VolumeReconstructor,
    normalizer: VolumeNormalizer,
    adapter: InferenceAdapter<C>,
}

impl<C: Classifier> Pipeline<C> {
    pub fn new(
        config: PipelineConfig,
        root: impl AsRef<Path>,
        classifier: C,
    ) -> Result<Self, PipelineError> {
        let normalizer = VolumeNormalizer::new(config.target_shape);
        let adapter = InferenceAdapter::new(classifier, normalizer.target_shape());
        Ok(Self {
            reconstructor: VolumeReconstructor::new(config, root)?,
            normalizer,
            adapter,
        })
    }

    pub fn reconstructor(&self) -> &VolumeReconstructor {
        &self.reconstructor
    }

    pub fn workspace(&self) -> &Workspace {
        self.reconstructor.workspace()
    }

    /// Score a packaged volume file.
    pub fn predict_volume_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<PredictionResult, PipelineError> {
        let packaged = nifti::read_volume(path)?;
        let input = self.normalizer.normalize(packaged.data.view())?;
        Ok(self.adapter.predict(input)?)
    }

    /// Reconstruct `archive`, score the packaged volume and publish it.
    ///
    /// The volume is scored from the request's own staging copy, so a
    /// concurrent request publishing in between cannot swap it out.
    pub fn predict_archive(
        &self,
        archive: impl AsRef<Path>,
    ) -> Result<PredictionResult, PipelineError> {
        let workspace = self.reconstructor.workspace();
        let session = workspace.begin_session()?;
        let reconstruction = self.reconstructor.build_volume(archive.as_ref(), &session)?;
        let prediction = self.predict_volume_file(&reconstruction.volume_path)?;
        let published = workspace.publish_volume(&reconstruction.volume_path)?;
        info!("volume saved at {}", published.display());
        Ok(prediction)
    }

    /// Hold an uploaded archive in the uploads area for the duration of the
    /// request, then score it. The upload is removed afterwards either way.
    pub fn predict_upload(
        &self,
        filename: &str,
        contents: impl Read,
    ) -> Result<PredictionResult, PipelineError> {
        let upload = self.workspace().store_upload(filename, contents)?;
        self.predict_archive(upload.path())
    }
}

impl<C> Pipeline<C>
where
    C: Classifier + Send + Sync + 'static,
{
    /// Run [`Pipeline::predict_archive`] on the blocking thread pool.
    pub async fn predict_archive_async(
        self: Arc<Self>,
        archive: PathBuf,
    ) -> Result<PredictionResult, PipelineError> {
        tokio::task::spawn_blocking(move || self.predict_archive(&archive)).await?
    }
}
