use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::split::{ShufflePolicy, SplitRatio};
use crate::trainer::TrainConfig;
use crate::types::{Categories, Dimensions, DEFAULT_EMOTIONS};

/// Settings for one load / split / train / evaluate run.
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "dataset_root": "/data/ck", "categories": ["happy", "sadness"], "seed": 7 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Directory containing `dataset/<category>/`.
    pub dataset_root: PathBuf,
    pub categories: Vec<String>,
    pub image_width: u32,
    pub image_height: u32,
    /// Fraction of each category used for training.
    pub split_ratio: f64,
    /// Shuffle seed; `None` shuffles from OS entropy.
    pub seed: Option<u64>,
    /// Keep each category's files in name order instead of shuffling.
    pub preserve_order: bool,
    pub max_components: Option<usize>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            dataset_root: PathBuf::from("."),
            categories: DEFAULT_EMOTIONS.iter().map(|s| s.to_string()).collect(),
            image_width: 350,
            image_height: 350,
            split_ratio: 0.8,
            seed: None,
            preserve_order: false,
            max_components: None,
        }
    }
}

impl RecognizerConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        Ok(config)
    }

    /// Check every field; call before starting a run.
    pub fn validate(&self) -> Result<()> {
        self.categories()?;
        self.split_ratio()?;
        if self.image_width == 0 || self.image_height == 0 {
            return Err(Error::InvalidConfig(format!(
                "image size {}x{} is empty",
                self.image_width, self.image_height
            )));
        }
        if self.max_components == Some(0) {
            return Err(Error::InvalidConfig("max_components must be at least 1".into()));
        }
        Ok(())
    }

    pub fn categories(&self) -> Result<Categories> {
        Categories::new(&self.categories)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.image_width, self.image_height)
    }

    pub fn split_ratio(&self) -> Result<SplitRatio> {
        SplitRatio::new(self.split_ratio)
    }

    pub fn shuffle_policy(&self) -> ShufflePolicy {
        match (self.preserve_order, self.seed) {
            (true, _) => ShufflePolicy::Preserve,
            (false, Some(seed)) => ShufflePolicy::Seeded(seed),
            (false, None) => ShufflePolicy::Random,
        }
    }

    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            max_components: self.max_components,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_seven_emotions_at_350() {
        let config = RecognizerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.dimensions(), Dimensions::new(350, 350));
        assert_eq!(config.categories().unwrap().len(), 7);
        assert_eq!(config.split_ratio().unwrap().value(), 0.8);
        assert_eq!(config.shuffle_policy(), ShufflePolicy::Random);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{ "categories": ["happy", "sad"], "image_width": 4, "image_height": 4, "seed": 3 }"#;
        let config: RecognizerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.categories, vec!["happy", "sad"]);
        assert_eq!(config.dimensions(), Dimensions::new(4, 4));
        assert_eq!(config.split_ratio, 0.8);
        assert_eq!(config.shuffle_policy(), ShufflePolicy::Seeded(3));
    }

    #[test]
    fn preserve_order_wins_over_seed() {
        let config = RecognizerConfig {
            seed: Some(1),
            preserve_order: true,
            ..Default::default()
        };
        assert_eq!(config.shuffle_policy(), ShufflePolicy::Preserve);
    }

    #[test]
    fn invalid_values_are_reported() {
        let bad_ratio = RecognizerConfig {
            split_ratio: 1.5,
            ..Default::default()
        };
        assert!(matches!(bad_ratio.validate(), Err(Error::InvalidConfig(_))));

        let no_pixels = RecognizerConfig {
            image_width: 0,
            ..Default::default()
        };
        assert!(matches!(no_pixels.validate(), Err(Error::InvalidConfig(_))));

        let duplicate = RecognizerConfig {
            categories: vec!["happy".into(), "happy".into()],
            ..Default::default()
        };
        assert!(matches!(duplicate.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!("emotion-face-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "split_ratio": 0.5, "preserve_order": true }"#).unwrap();

        let config = RecognizerConfig::from_json_file(&path).unwrap();
        assert_eq!(config.split_ratio, 0.5);
        assert_eq!(config.shuffle_policy(), ShufflePolicy::Preserve);

        std::fs::remove_file(path).ok();
    }
}
