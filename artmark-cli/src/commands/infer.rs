use anyhow::Result;
use artmark::{Annotator, MistralRsBackend, PredictionOutput, VisionBackend};
use std::path::{Path, PathBuf};
use tracing::info;

use super::require_exists;
use crate::args::{InferArgs, InferInput};
use crate::config::ArtmarkConfig;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Source {
    Image(PathBuf),
    Folder(PathBuf),
    TestSet(PathBuf),
}

impl Source {
    /// The single input the user picked, checked to exist.
    fn resolve(input: InferInput) -> Result<Self> {
        let source = match (input.image, input.folder, input.test_set) {
            (Some(image), None, None) => Self::Image(image),
            (None, Some(folder), None) => Self::Folder(folder),
            (None, None, Some(test_set)) => Self::TestSet(test_set),
            _ => anyhow::bail!("Exactly one of --image, --folder or --test-set is required"),
        };
        match &source {
            Source::Image(path) if !path.is_file() => {
                anyhow::bail!("Image not found: {}", path.display())
            }
            Source::Folder(path) if !path.is_dir() => {
                anyhow::bail!("Folder not found: {}", path.display())
            }
            Source::TestSet(path) => require_exists(path, "Test set")?,
            _ => {}
        }
        Ok(source)
    }
}

async fn annotate<B: VisionBackend>(
    annotator: &Annotator<B>,
    source: &Source,
    image_root: Option<&Path>,
) -> Result<PredictionOutput> {
    Ok(match source {
        Source::Image(path) => PredictionOutput::One(annotator.annotate_one(path).await?),
        Source::Folder(path) => PredictionOutput::Many(annotator.annotate_folder(path).await?),
        Source::TestSet(path) => {
            PredictionOutput::Many(annotator.annotate_test_set(path, image_root).await?)
        }
    })
}

pub async fn run_infer(args: InferArgs, mut config: ArtmarkConfig, quiet: bool) -> Result<()> {
    let source = Source::resolve(args.input)?;
    args.model.apply(&mut config.model);
    args.generation.apply(&mut config.generation);
    config.generation.validate()?;

    let backend = MistralRsBackend::load(&config.model).await?;
    let annotator = Annotator::new(backend, config.generation).quiet(quiet);

    let output = annotate(&annotator, &source, args.image_root.as_deref()).await?;
    output.write(&args.output)?;
    if let PredictionOutput::Many(predictions) = &output {
        info!(
            "Saved {} predictions to {}",
            predictions.len(),
            args.output.display()
        );
    } else {
        info!("Saved prediction to {}", args.output.display());
    }
    Ok(())
}
