//! The full training run: load, partition, train, evaluate.

use std::sync::Arc;

use crate::config::RecognizerConfig;
use crate::corpus::Corpus;
use crate::error::Result;
use crate::evaluator::{evaluate, EvaluationReport};
use crate::model::FisherModel;
use crate::split::{partition, Split};
use crate::trainer::SubspaceTrainer;

/// Everything a training run produces.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub model: Arc<FisherModel>,
    pub report: EvaluationReport,
    pub training_size: usize,
    pub evaluation_size: usize,
}

/// Train on a split and evaluate on its held-out part.
pub fn train_on_split(split: &Split, trainer: &SubspaceTrainer) -> Result<TrainingRun> {
    let model = Arc::new(trainer.train(split.training())?);
    let report = evaluate(&model, split.evaluation(), split.categories())?;
    Ok(TrainingRun {
        model,
        report,
        training_size: split.training().len(),
        evaluation_size: split.evaluation().len(),
    })
}

/// Run the whole pipeline described by `config`.
///
/// Stops at the first failure; nothing is trained on a corpus that could not
/// be read completely.
pub fn train_and_evaluate(config: &RecognizerConfig) -> Result<TrainingRun> {
    config.validate()?;
    let categories = config.categories()?;
    let dimensions = config.dimensions();

    log::info!("Loading corpus from {:?}", config.dataset_root);
    let corpus = Corpus::load(&config.dataset_root, &categories, dimensions)?;

    let split = partition(corpus, config.split_ratio()?, config.shuffle_policy());
    log::info!(
        "Training set: {} image(s), evaluation set: {} image(s)",
        split.training().len(),
        split.evaluation().len()
    );

    let trainer = SubspaceTrainer::for_split(&split).with_config(config.train_config());
    train_on_split(&split, &trainer)
}
