use dicom::{
    object::{DefaultDicomObject, open_file},
    pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, s};
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum SliceDecodeError {
    #[error("cannot read DICOM file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: dicom::object::ReadError,
    },

    #[error("cannot decode pixel data of {path}: {source}")]
    Pixels {
        path: PathBuf,
        #[source]
        source: dicom::pixeldata::Error,
    },
}

/// One raw slice file, identified by its file stem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceFile {
    pub id: String,
    pub path: PathBuf,
}

/// Stored pixel values of a slice plus the series it claims to belong to.
pub struct DecodedSlice {
    pub pixels: Array2<f32>,
    pub series_uid: Option<String>,
}

impl DecodedSlice {
    pub fn max(&self) -> f32 {
        self.pixels.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }
}

/// The raw slice files of one scan session.
#[derive(Clone, Debug, Default)]
pub struct SliceSet {
    slices: Vec<SliceFile>,
}

impl SliceSet {
    /// Collect every file under `dir` (recursively) whose extension matches
    /// `extension`, case-insensitively. Files are listed in path order so the
    /// result does not depend on directory iteration order.
    pub fn discover(dir: impl AsRef<Path>, extension: &str) -> io::Result<Self> {
        let mut slices = Vec::new();
        for entry in WalkDir::new(dir.as_ref()) {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            let matches = path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
            if !matches {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            slices.push(SliceFile {
                id: id.to_string(),
                path,
            });
        }
        slices.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Self { slices })
    }

    pub fn from_files(slices: Vec<SliceFile>) -> Self {
        Self { slices }
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SliceFile> {
        self.slices.iter()
    }
}

/// Decode the first frame and first sample of a slice as raw stored values.
///
/// No rescale slope/intercept or VOI window is applied; the rasterizer does
/// its own per-slice min/max normalization.
pub fn decode_slice(path: impl AsRef<Path>) -> Result<DecodedSlice, SliceDecodeError> {
    let path = path.as_ref();
    let object = open_file(path).map_err(|source| SliceDecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let pixels = decode_pixels(&object).map_err(|source| SliceDecodeError::Pixels {
        path: path.to_path_buf(),
        source,
    })?;
    let series_uid = object
        .element(tags::SERIES_INSTANCE_UID)
        .ok()
        .and_then(|element| element.to_str().ok())
        .map(|uid| uid.trim_end_matches(['\0', ' ']).to_string());

    Ok(DecodedSlice { pixels, series_uid })
}

fn decode_pixels(object: &DefaultDicomObject) -> Result<Array2<f32>, dicom::pixeldata::Error> {
    let pixel_data = object.decode_pixel_data()?;
    let options = ConvertOptions::new().with_modality_lut(ModalityLutOption::None);
    pixel_data
        .to_ndarray_with_options::<f32>(&options)
        .map(|arr| arr.slice_move(s![0, .., .., 0]))
}
