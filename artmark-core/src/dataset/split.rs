use std::path::Path;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    conversation::Conversation,
    error::{Error, Result},
    io::write_json_pretty,
};

use super::TrainingRecord;

const RATIO_TOLERANCE: f64 = 1e-5;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitRatios {
    pub train: f64,
    pub val: f64,
    pub test: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.8,
            val: 0.1,
            test: 0.1,
        }
    }
}

impl SplitRatios {
    pub fn validate(&self) -> Result<()> {
        for (name, ratio) in [("train", self.train), ("val", self.val), ("test", self.test)] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(Error::Dataset(format!(
                    "{name} ratio must be in [0, 1], got {ratio}"
                )));
            }
        }
        let sum = self.train + self.val + self.test;
        if (sum - 1.0).abs() >= RATIO_TOLERANCE {
            return Err(Error::Dataset(format!("ratios must sum to 1, got {sum}")));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Splits {
    pub train: Vec<Conversation>,
    pub val: Vec<Conversation>,
    pub test: Vec<Conversation>,
}

impl Splits {
    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn named(&self) -> [(&'static str, &[Conversation]); 3] {
        [
            ("train", self.train.as_slice()),
            ("val", self.val.as_slice()),
            ("test", self.test.as_slice()),
        ]
    }
}

/// Convert records to conversations, shuffle with `seed` and split.
///
/// Train and validation sizes are `floor(n * ratio)`; the test split takes
/// the remainder.
pub fn split_dataset(records: &[TrainingRecord], ratios: SplitRatios, seed: u64) -> Result<Splits> {
    ratios.validate()?;

    let mut conversations = records
        .iter()
        .map(|r| Conversation::training_example(r.image_path.clone(), &r.annotation))
        .collect::<Result<Vec<_>>>()?;
    conversations.shuffle(&mut StdRng::seed_from_u64(seed));

    let total = conversations.len();
    let train_size = (total as f64 * ratios.train).floor() as usize;
    let val_size = ((total as f64 * ratios.val).floor() as usize).min(total - train_size);

    let test = conversations.split_off(train_size + val_size);
    let val = conversations.split_off(train_size);
    Ok(Splits {
        train: conversations,
        val,
        test,
    })
}

/// Write `train.json`, `val.json` and `test.json` into `out_dir`.
pub fn write_splits(splits: &Splits, out_dir: &Path) -> Result<()> {
    for (name, split) in splits.named() {
        let path = out_dir.join(format!("{name}.json"));
        write_json_pretty(&path, split)?;
        info!("Saved {} samples to {}", split.len(), path.display());
    }

    let total = splits.len().max(1) as f64;
    info!(
        "Dataset split complete: {} samples (train {:.1}%, val {:.1}%, test {:.1}%)",
        splits.len(),
        splits.train.len() as f64 / total * 100.0,
        splits.val.len() as f64 / total * 100.0,
        splits.test.len() as f64 / total * 100.0,
    );
    Ok(())
}
