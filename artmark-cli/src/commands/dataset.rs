use anyhow::{Context, Result};
use artmark_core::{
    dataset::{
        build_metadata, merge_annotations, select_balanced_subset, split_dataset, write_splits,
        write_subset, AnnotationEntry, CatalogEntry, SplitRatios, TrainingRecord,
    },
    io::{read_jsonl, write_jsonl},
};
use rand::{rngs::StdRng, SeedableRng};
use std::path::Path;
use tracing::info;

use super::require_exists;
use crate::args::{MergeArgs, SplitArgs, SubsetArgs};

pub fn run_subset(args: SubsetArgs) -> Result<()> {
    require_exists(&args.catalog, "Catalog")?;
    let catalog: Vec<CatalogEntry> = read_jsonl(&args.catalog)?;
    info!("Loaded {} catalog entries", catalog.len());

    let catalog_root = match &args.catalog_root {
        Some(root) => root.clone(),
        None => args
            .catalog
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf(),
    };

    let mut rng = StdRng::seed_from_u64(args.seed);
    let selected = select_balanced_subset(&catalog, args.total, &mut rng);
    let entries = write_subset(
        &catalog,
        &selected,
        &catalog_root,
        &args.image_dir,
        &args.output,
    )?;
    info!(
        "Copied {} images to {} and wrote {}",
        entries.len(),
        args.image_dir.display(),
        args.output.display()
    );
    Ok(())
}

pub fn run_merge(args: MergeArgs) -> Result<()> {
    require_exists(&args.watermarks, "Watermark folder")?;
    require_exists(&args.annotations, "Annotations")?;

    let metadata = build_metadata(&args.watermarks).with_context(|| {
        format!(
            "Failed to read watermark sidecars from {}",
            args.watermarks.display()
        )
    })?;
    info!("Loaded watermark metadata for {} images", metadata.len());
    let annotations: Vec<AnnotationEntry> = read_jsonl(&args.annotations)?;

    let records = merge_annotations(&metadata, &annotations);
    let written = write_jsonl(&args.output, &records)?;
    info!("Wrote {written} training records to {}", args.output.display());
    Ok(())
}

pub fn run_split(args: SplitArgs) -> Result<()> {
    require_exists(&args.input, "Training records")?;
    let ratios = SplitRatios {
        train: args.train_ratio,
        val: args.val_ratio,
        test: args.test_ratio,
    };
    ratios.validate()?;

    let records: Vec<TrainingRecord> = read_jsonl(&args.input)?;
    info!("Loaded {} training records", records.len());
    let splits = split_dataset(&records, ratios, args.seed)?;
    write_splits(&splits, &args.output_dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_ratios_fail_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("records.jsonl");
        std::fs::write(&input, "").unwrap();
        let out = dir.path().join("splits");
        let args = SplitArgs {
            input,
            output_dir: out.clone(),
            train_ratio: 0.9,
            val_ratio: 0.1,
            test_ratio: 0.1,
            seed: 42,
        };
        assert!(run_split(args).is_err());
        assert!(!out.exists());
    }

    #[test]
    fn missing_annotations_fail_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("merged.jsonl");
        let args = MergeArgs {
            watermarks: dir.path().to_path_buf(),
            annotations: dir.path().join("missing.jsonl"),
            output: out.clone(),
        };
        assert!(run_merge(args).is_err());
        assert!(!out.exists());
    }
}
