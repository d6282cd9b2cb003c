mod common;

use dicom_volume_classifier::{
    config::PipelineConfig,
    inference::ModelError,
    nifti,
    pipeline::{Pipeline, PipelineError, VolumeReconstructor},
};
use ndarray::{Array2, ArrayView4};
use std::{fs, path::Path, sync::Arc};
use tempfile::tempdir;

/// Scores a batch by its mean intensity after checking the model contract.
fn mean_model(batch: ArrayView4<'_, f32>) -> Result<Array2<f32>, ModelError> {
    assert_eq!(batch.dim(), (1, 64, 64, 64));
    assert!(batch.iter().all(|v| (0.0..=1.0).contains(v)));
    let mean = batch.mean().unwrap_or(0.0);
    Ok(Array2::from_shape_vec((1, 2), vec![1.0 - mean, mean])?)
}

fn square_archive(dir: &Path, count: usize) -> std::path::PathBuf {
    let slices = dir.join("slices");
    common::write_square_series(&slices, count, 100);
    let archive = dir.join("scan.zip");
    common::zip_directory(&slices, &archive, "scan");
    archive
}

fn scratch_is_empty(root: &Path) -> bool {
    fs::read_dir(root.join("extracted_data"))
        .unwrap()
        .next()
        .is_none()
}

#[test]
fn sixty_four_slices_become_a_64_cube() {
    let inputs = tempdir().unwrap();
    let root = tempdir().unwrap();
    let archive = square_archive(inputs.path(), 64);

    let reconstructor = VolumeReconstructor::new(PipelineConfig::default(), root.path()).unwrap();
    let reconstruction = reconstructor.reconstruct(&archive).unwrap();

    assert_eq!(reconstruction.shape, (64, 64, 64));
    assert_eq!(reconstruction.filter.removed, 0);
    assert_eq!(
        reconstruction.volume_path,
        root.path().join("processed_data").join("output.nii.gz")
    );
    let bbox = reconstruction.bounding_box.unwrap();
    assert_eq!((bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax), (25, 25, 74, 74));

    let packaged = nifti::read_volume(&reconstruction.volume_path).unwrap();
    assert_eq!(packaged.data.dim(), (64, 64, 64));
    assert!(scratch_is_empty(root.path()));
}

#[test]
fn end_to_end_prediction_uses_normalized_volume() {
    let inputs = tempdir().unwrap();
    let root = tempdir().unwrap();
    let archive = square_archive(inputs.path(), 64);

    let pipeline = Pipeline::new(PipelineConfig::default(), root.path(), mean_model).unwrap();
    let prediction = pipeline.predict_archive(&archive).unwrap();

    assert_eq!(prediction.scores.len(), 2);
    let mean = prediction.scores[1];
    assert!(mean > 0.0 && mean < 1.0, "mean {mean}");
    assert!((prediction.scores[0] + mean - 1.0).abs() < 1e-6);

    assert_eq!(
        pipeline.workspace().list_processed().unwrap(),
        vec!["output.nii.gz".to_string()]
    );
    let fetched = pipeline.workspace().read_volume().unwrap();
    assert_eq!(fetched.data.dim(), (64, 64, 64));
    assert!(scratch_is_empty(root.path()));
}

#[test]
fn fewer_slices_are_resampled_along_depth() {
    let inputs = tempdir().unwrap();
    let root = tempdir().unwrap();
    let archive = square_archive(inputs.path(), 12);

    let pipeline = Pipeline::new(PipelineConfig::default(), root.path(), mean_model).unwrap();
    pipeline.predict_archive(&archive).unwrap();

    let fetched = pipeline.workspace().read_volume().unwrap();
    assert_eq!(fetched.data.dim(), (12, 64, 64));
}

#[test]
fn black_slices_are_dropped_before_assembly() {
    let inputs = tempdir().unwrap();
    let root = tempdir().unwrap();
    let slices = inputs.path().join("slices");
    common::write_square_series(&slices, 10, 100);
    common::write_slice(&slices.join("slice11.dcm"), 100, 100, &vec![0; 10_000]);
    let archive = inputs.path().join("scan.zip");
    common::zip_directory(&slices, &archive, "scan");

    let reconstructor = VolumeReconstructor::new(PipelineConfig::default(), root.path()).unwrap();
    let reconstruction = reconstructor.reconstruct(&archive).unwrap();
    assert_eq!(reconstruction.filter.removed, 1);
    assert_eq!(reconstruction.shape, (10, 64, 64));
}

#[test]
fn all_black_archive_is_an_input_error() {
    let inputs = tempdir().unwrap();
    let root = tempdir().unwrap();
    let slices = inputs.path().join("slices");
    fs::create_dir_all(&slices).unwrap();
    for n in 1..=3 {
        common::write_slice(&slices.join(format!("slice{n}.dcm")), 8, 8, &[0; 64]);
    }
    let archive = inputs.path().join("scan.zip");
    common::zip_directory(&slices, &archive, "scan");

    let reconstructor = VolumeReconstructor::new(PipelineConfig::default(), root.path()).unwrap();
    let err = reconstructor.reconstruct(&archive).unwrap_err();
    assert!(matches!(err, PipelineError::EmptySliceSet));
    assert!(err.is_input_error());
    assert!(scratch_is_empty(root.path()));
    assert!(reconstructor.workspace().list_processed().unwrap().is_empty());
}

#[test]
fn missing_archive_is_an_input_error() {
    let root = tempdir().unwrap();
    let reconstructor = VolumeReconstructor::new(PipelineConfig::default(), root.path()).unwrap();
    let err = reconstructor
        .reconstruct(root.path().join("nope.zip"))
        .unwrap_err();
    assert!(matches!(err, PipelineError::MissingUpload(_)));
    assert!(err.is_input_error());
}

#[test]
fn model_failure_is_fatal_and_publishes_nothing() {
    let inputs = tempdir().unwrap();
    let root = tempdir().unwrap();
    let archive = square_archive(inputs.path(), 4);

    let failing = |_: ArrayView4<'_, f32>| -> Result<Array2<f32>, ModelError> {
        Err("model unavailable".into())
    };
    let pipeline = Pipeline::new(PipelineConfig::default(), root.path(), failing).unwrap();
    let err = pipeline.predict_archive(&archive).unwrap_err();
    assert!(matches!(err, PipelineError::Inference(_)));
    assert!(!err.is_input_error());
    assert!(pipeline.workspace().list_processed().unwrap().is_empty());
    assert!(scratch_is_empty(root.path()));
}

#[test]
fn upload_is_removed_after_processing() {
    let inputs = tempdir().unwrap();
    let root = tempdir().unwrap();
    let archive = square_archive(inputs.path(), 4);

    let pipeline = Pipeline::new(PipelineConfig::default(), root.path(), mean_model).unwrap();
    let bytes = fs::read(&archive).unwrap();
    pipeline.predict_upload("scan.zip", bytes.as_slice()).unwrap();

    let uploads = fs::read_dir(root.path().join("uploads")).unwrap().count();
    assert_eq!(uploads, 0);

    let err = pipeline.predict_upload("", bytes.as_slice()).unwrap_err();
    assert!(err.is_input_error());
}

#[tokio::test]
async fn async_entry_point_runs_off_the_runtime() {
    let inputs = tempdir().unwrap();
    let root = tempdir().unwrap();
    let archive = square_archive(inputs.path(), 4);

    let pipeline =
        Arc::new(Pipeline::new(PipelineConfig::default(), root.path(), mean_model).unwrap());
    let prediction = pipeline.predict_archive_async(archive).await.unwrap();
    assert_eq!(prediction.scores.len(), 2);
}
