//! Loading labelled face images from disk.
//!
//! The expected layout is `<root>/dataset/<category>/<image-file>`, one
//! directory per category. Every image is decoded to grayscale and kept only
//! when its size equals the configured input size; anything else is dropped.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::frame::{GrayImage, ImageAccess};
use crate::types::{Categories, Dimensions};

/// Name of the directory under the root that holds one folder per category.
pub const DATASET_DIR: &str = "dataset";

/// One labelled training or evaluation image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSample {
    pub image: GrayImage,
    /// Index into the corpus categories.
    pub category: usize,
    /// Where the image came from (file path or caller-defined identifier).
    pub source: String,
}

/// All labelled samples available for one training run, grouped by category.
#[derive(Debug, Clone)]
pub struct Corpus {
    categories: Categories,
    dimensions: Dimensions,
    samples: Vec<Vec<ImageSample>>,
}

impl Corpus {
    /// Read the corpus under `root` for the given categories.
    ///
    /// Files are visited in name order. Images that fail to decode or whose
    /// size differs from `dimensions` are skipped.
    pub fn load<P: AsRef<Path>>(
        root: P,
        categories: &Categories,
        dimensions: Dimensions,
    ) -> Result<Self> {
        let dataset = root.as_ref().join(DATASET_DIR);
        let mut samples = Vec::with_capacity(categories.len());

        for category in categories {
            let dir = dataset.join(&category.name);
            let files = list_files(&dir)?;

            let mut kept = Vec::with_capacity(files.len());
            let mut dropped = 0usize;
            for path in files {
                match GrayImage::open(&path) {
                    Ok(image) if image.dimensions() == dimensions => kept.push(ImageSample {
                        image,
                        category: category.index,
                        source: path.display().to_string(),
                    }),
                    Ok(image) => {
                        log::debug!(
                            "Skipping {:?}: {} does not match {}",
                            path,
                            image.dimensions(),
                            dimensions
                        );
                        dropped += 1;
                    }
                    Err(e) => {
                        log::debug!("Skipping {:?}: {}", path, e);
                        dropped += 1;
                    }
                }
            }

            log::info!(
                "Loaded {} image(s) for '{}' ({} dropped)",
                kept.len(),
                category.name,
                dropped
            );
            samples.push(kept);
        }

        Ok(Self {
            categories: categories.clone(),
            dimensions,
            samples,
        })
    }

    /// Build a corpus from samples already in memory.
    ///
    /// Every sample must have `dimensions` and a category index that exists
    /// in `categories`.
    pub fn from_samples(
        categories: Categories,
        dimensions: Dimensions,
        samples: Vec<ImageSample>,
    ) -> Result<Self> {
        let mut grouped: Vec<Vec<ImageSample>> = vec![Vec::new(); categories.len()];
        for sample in samples {
            if sample.image.dimensions() != dimensions {
                return Err(Error::DimensionMismatch {
                    expected: dimensions,
                    actual: sample.image.dimensions(),
                });
            }
            let slot = grouped.get_mut(sample.category).ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "sample '{}' has unknown category index {}",
                    sample.source, sample.category
                ))
            })?;
            slot.push(sample);
        }

        Ok(Self {
            categories,
            dimensions,
            samples: grouped,
        })
    }

    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Samples of one category, in load order.
    pub fn samples(&self, category: usize) -> &[ImageSample] {
        self.samples.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.samples.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn into_groups(self) -> (Categories, Dimensions, Vec<Vec<ImageSample>>) {
        (self.categories, self.dimensions, self.samples)
    }
}

/// Regular files in `dir`, sorted by file name.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let unavailable = |source| Error::CorpusUnavailable {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(unavailable)? {
        let entry = entry.map_err(unavailable)?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("emotion-face-corpus-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn write_png(path: &Path, size: u32, value: u8) {
        GrayImage::from_fn(size, size, |_, _| value)
            .to_luma()
            .save(path)
            .unwrap();
    }

    #[test]
    fn load_filters_by_size_and_format() {
        let root = scratch_dir("filter");
        let happy = root.join(DATASET_DIR).join("happy");
        let sad = root.join(DATASET_DIR).join("sad");
        fs::create_dir_all(&happy).unwrap();
        fs::create_dir_all(&sad).unwrap();

        write_png(&happy.join("b.png"), 4, 200);
        write_png(&happy.join("a.png"), 4, 210);
        write_png(&happy.join("big.png"), 8, 200);
        fs::write(happy.join("notes.txt"), b"not an image").unwrap();
        // Nested directories are not descended into, even if named like images
        let nested = happy.join("c.png");
        fs::create_dir_all(&nested).unwrap();
        write_png(&nested.join("d.png"), 4, 200);
        write_png(&sad.join("a.png"), 4, 20);

        let cats = Categories::new(&["happy", "sad"]).unwrap();
        let corpus = Corpus::load(&root, &cats, Dimensions::new(4, 4)).unwrap();

        assert_eq!(corpus.len(), 3);
        let happy_samples = corpus.samples(0);
        assert_eq!(happy_samples.len(), 2);
        assert!(happy_samples[0].source.ends_with("a.png"));
        assert!(happy_samples[1].source.ends_with("b.png"));
        assert!(happy_samples.iter().all(|s| s.category == 0));
        assert_eq!(corpus.samples(1).len(), 1);
        assert_eq!(corpus.samples(1)[0].category, 1);

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn missing_category_directory_is_unavailable() {
        let root = scratch_dir("missing");
        fs::create_dir_all(root.join(DATASET_DIR).join("happy")).unwrap();

        let cats = Categories::new(&["happy", "sad"]).unwrap();
        let err = Corpus::load(&root, &cats, Dimensions::new(4, 4)).unwrap_err();
        match err {
            Error::CorpusUnavailable { path, .. } => assert!(path.ends_with("sad")),
            other => panic!("unexpected error: {other}"),
        }

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn from_samples_checks_dimensions() {
        let cats = Categories::new(&["happy", "sad"]).unwrap();
        let sample = ImageSample {
            image: GrayImage::from_fn(3, 3, |_, _| 0),
            category: 0,
            source: "mem".into(),
        };
        let err = Corpus::from_samples(cats, Dimensions::new(4, 4), vec![sample]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn from_samples_groups_by_category() {
        let cats = Categories::new(&["happy", "sad"]).unwrap();
        let samples = (0..5)
            .map(|i| ImageSample {
                image: GrayImage::from_fn(2, 2, |_, _| i as u8),
                category: i % 2,
                source: format!("mem-{i}"),
            })
            .collect();
        let corpus = Corpus::from_samples(cats, Dimensions::new(2, 2), samples).unwrap();
        assert_eq!(corpus.samples(0).len(), 3);
        assert_eq!(corpus.samples(1).len(), 2);
        assert!(corpus.samples(5).is_empty());
    }
}
