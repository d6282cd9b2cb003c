use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dicom_volume_classifier::{
    config::PipelineConfig, enums::DecodePolicy, nifti, normalizer::VolumeNormalizer,
    pipeline::VolumeReconstructor,
};

#[derive(Parser)]
#[command(author, version, about = "Rebuild a normalized volume from a DICOM slice archive")]
struct Args {
    /// Zip archive holding one scan session's slices
    archive: PathBuf,
    /// Directory holding uploads/, extracted_data/ and processed_data/
    #[arg(long, default_value = ".")]
    workspace: PathBuf,
    /// Load pipeline settings from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Abort on the first undecodable slice instead of skipping it
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if args.strict {
        config.decode_policy = DecodePolicy::Fail;
    }
    let target_shape = config.target_shape;

    let reconstructor = VolumeReconstructor::new(config, &args.workspace)
        .with_context(|| format!("opening workspace {}", args.workspace.display()))?;
    let archive = args.archive.clone();
    let reconstruction =
        tokio::task::spawn_blocking(move || reconstructor.reconstruct(&archive))
            .await?
            .with_context(|| format!("reconstructing {}", args.archive.display()))?;

    let packaged = nifti::read_volume(&reconstruction.volume_path)?;
    let input = VolumeNormalizer::new(target_shape).normalize(packaged.data.view())?;
    let (min, max) = input
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    println!(
        "Volume {:?} -> {} (removed {} black slices, crop {:?}); model input {:?} in [{min}, {max}]",
        reconstruction.shape,
        reconstruction.volume_path.display(),
        reconstruction.filter.removed,
        reconstruction.bounding_box,
        input.dim(),
    );
    Ok(())
}
