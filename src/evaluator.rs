//! Accuracy measurement over a held-out set.

use std::fmt;

use serde::Serialize;

use crate::classifier::Classify;
use crate::corpus::ImageSample;
use crate::error::{Error, Result};
use crate::types::Categories;

/// Prediction counts indexed by (true category, predicted category).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    size: usize,
    counts: Vec<usize>,
}

impl ConfusionMatrix {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            counts: vec![0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn offset(&self, truth: usize, predicted: usize) -> Option<usize> {
        (truth < self.size && predicted < self.size).then(|| truth * self.size + predicted)
    }

    /// Count one prediction. Returns `false`, recording nothing, when either
    /// index is outside the matrix.
    pub fn record(&mut self, truth: usize, predicted: usize) -> bool {
        match self.offset(truth, predicted) {
            Some(i) => {
                self.counts[i] += 1;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, truth: usize, predicted: usize) -> Option<usize> {
        self.offset(truth, predicted).map(|i| self.counts[i])
    }

    /// How samples of `truth` were classified.
    pub fn row(&self, truth: usize) -> Option<&[usize]> {
        (truth < self.size).then(|| &self.counts[truth * self.size..(truth + 1) * self.size])
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.size).filter_map(|i| self.get(i, i)).sum()
    }
}

/// Result of running a classifier over an evaluation set.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    categories: Categories,
    confusion: ConfusionMatrix,
}

impl EvaluationReport {
    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    pub fn confusion(&self) -> &ConfusionMatrix {
        &self.confusion
    }

    pub fn total(&self) -> usize {
        self.confusion.total()
    }

    pub fn correct(&self) -> usize {
        self.confusion.correct()
    }

    pub fn incorrect(&self) -> usize {
        self.total() - self.correct()
    }

    /// Fraction of correct predictions, in [0, 1].
    pub fn accuracy(&self) -> f64 {
        self.correct() as f64 / self.total() as f64
    }

    /// Accuracy as a whole percentage, rounded down.
    pub fn accuracy_percent(&self) -> usize {
        100 * self.correct() / self.total()
    }

    /// Fraction of `category`'s samples classified correctly, `None` if the
    /// evaluation set had none or the category is unknown.
    pub fn recall(&self, category: usize) -> Option<f64> {
        let row = self.confusion.row(category)?;
        let n: usize = row.iter().sum();
        (n > 0).then(|| row[category] as f64 / n as f64)
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Accuracy: {:.1}% ({} of {} correct)",
            self.accuracy() * 100.0,
            self.correct(),
            self.total()
        )?;

        let width = self.categories.names().map(str::len).max().unwrap_or(0).max(5);
        write!(f, "\n{:>width$}", "", width = width)?;
        for name in self.categories.names() {
            write!(f, " {:>width$}", name, width = width)?;
        }
        writeln!(f, " {:>8}", "recall")?;

        for category in &self.categories {
            write!(f, "{:>width$}", category.name, width = width)?;
            for &count in self.confusion.row(category.index).unwrap_or(&[]) {
                write!(f, " {:>width$}", count, width = width)?;
            }
            match self.recall(category.index) {
                Some(r) => writeln!(f, " {:>7.1}%", r * 100.0)?,
                None => writeln!(f, " {:>8}", "-")?,
            }
        }
        Ok(())
    }
}

/// Classify every sample and tally the outcome against its label.
///
/// Fails with [`Error::EmptyEvaluationSet`] when `samples` is empty, and
/// with the classifier's error if any sample cannot be classified.
pub fn evaluate<C: Classify>(
    classifier: &C,
    samples: &[ImageSample],
    categories: &Categories,
) -> Result<EvaluationReport> {
    if samples.is_empty() {
        return Err(Error::EmptyEvaluationSet);
    }

    let size = categories.len();
    let mut confusion = ConfusionMatrix::new(size);

    for sample in samples {
        if sample.category >= size {
            return Err(Error::InvalidConfig(format!(
                "sample '{}' has unknown category index {}",
                sample.source, sample.category
            )));
        }
        let prediction = classifier.classify(&sample.image)?;
        if prediction.category >= size {
            return Err(Error::InvalidModel(format!(
                "predicted category {} outside {} categories",
                prediction.category, size
            )));
        }
        log::trace!(
            "{}: expected {}, predicted {} (distance {:.3})",
            sample.source,
            sample.category,
            prediction.category,
            prediction.distance
        );
        confusion.record(sample.category, prediction.category);
    }

    let report = EvaluationReport {
        categories: categories.clone(),
        confusion,
    };
    log::info!(
        "Classifier accuracy is {}% ({} correct, {} incorrect)",
        report.accuracy_percent(),
        report.correct(),
        report.incorrect()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{GrayImage, ImageAccess};
    use crate::types::Prediction;

    /// Predicts category 1 for bright images, 0 otherwise.
    struct Threshold;

    impl Classify for Threshold {
        fn classify<I: ImageAccess>(&self, image: &I) -> Result<Prediction> {
            let category = usize::from(image.get_pixel(0, 0) > 127);
            Ok(Prediction {
                category,
                distance: 0.0,
            })
        }
    }

    fn sample(category: usize, value: u8) -> ImageSample {
        ImageSample {
            image: GrayImage::from_fn(2, 2, move |_, _| value),
            category,
            source: format!("{category}-{value}"),
        }
    }

    fn cats() -> Categories {
        Categories::new(&["happy", "sad"]).unwrap()
    }

    #[test]
    fn empty_set_is_an_error() {
        let err = evaluate(&Threshold, &[], &cats()).unwrap_err();
        assert!(matches!(err, Error::EmptyEvaluationSet));
    }

    #[test]
    fn counts_and_accuracy() {
        let samples = vec![
            sample(0, 10),
            sample(0, 20),
            sample(0, 200), // wrong
            sample(1, 250),
            sample(1, 30), // wrong
        ];
        let report = evaluate(&Threshold, &samples, &cats()).unwrap();

        assert_eq!(report.total(), 5);
        assert_eq!(report.correct(), 3);
        assert_eq!(report.incorrect(), 2);
        assert!((report.accuracy() - 0.6).abs() < 1e-12);
        assert_eq!(report.accuracy_percent(), 60);

        assert_eq!(report.confusion().row(0), Some(&[2, 1][..]));
        assert_eq!(report.confusion().row(1), Some(&[1, 1][..]));
        assert_eq!(report.confusion().get(0, 1), Some(1));
        assert_eq!(report.recall(0), Some(2.0 / 3.0));
        assert_eq!(report.recall(1), Some(0.5));
    }

    #[test]
    fn recall_without_samples_is_none() {
        let three = Categories::new(&["happy", "sad", "fear"]).unwrap();
        let report = evaluate(&Threshold, &[sample(0, 0)], &three).unwrap();
        assert_eq!(report.recall(2), None);
        assert_eq!(report.accuracy(), 1.0);
    }

    #[test]
    fn out_of_range_indices_are_refused() {
        let report = evaluate(&Threshold, &[sample(0, 0), sample(1, 255)], &cats()).unwrap();
        assert_eq!(report.recall(5), None);
        assert_eq!(report.confusion().row(2), None);
        assert_eq!(report.confusion().get(0, 2), None);
        assert_eq!(report.confusion().get(7, 0), None);

        let mut matrix = ConfusionMatrix::new(2);
        assert!(matrix.record(1, 0));
        assert!(!matrix.record(2, 0));
        assert!(!matrix.record(0, 9));
        assert_eq!(matrix.total(), 1);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = evaluate(&Threshold, &[sample(4, 0)], &cats()).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn report_renders_table() {
        let report = evaluate(&Threshold, &[sample(0, 0), sample(1, 255)], &cats()).unwrap();
        let text = report.to_string();
        assert!(text.starts_with("Accuracy: 100.0% (2 of 2 correct)"));
        assert!(text.contains("happy"));
        assert!(text.contains("recall"));
    }
}
