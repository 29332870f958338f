use std::env;
use std::num::NonZeroUsize;
use std::process;

use log::{error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use trainer::arch::activations::ActFn;
use trainer::arch::layers::Dense;
use trainer::arch::loss::SoftmaxCrossEntropy;
use trainer::arch::Sequential;
use trainer::config::TrainConfig;
use trainer::dataset::{Dataset, CLASSES};
use trainer::export::ModelBuffer;
use trainer::optimization::Adam;
use trainer::training::Trainer;
use trainer::{Result, TrainerError};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        error!("training failed: {e}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = match env::args().nth(1) {
        Some(path) => TrainConfig::load(path)?,
        None => TrainConfig::default(),
    };
    config.validate()?;

    let batch_size = NonZeroUsize::new(config.batch_size)
        .ok_or(TrainerError::InvalidConfig("batch_size must be non-zero"))?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let dataset = Dataset::from_csv(&config.csv_path)?;
    info!(
        "loaded {} samples from {}",
        dataset.len(),
        config.csv_path.display()
    );

    let (train_set, valid_set) = dataset.split(config.valid_ratio, &mut rng);
    info!(
        "split into {} train / {} validation rows",
        train_set.len(),
        valid_set.len()
    );

    let model = Sequential::new([
        Dense::new((1, config.hidden_dim), Some(ActFn::Relu)),
        Dense::new((config.hidden_dim, CLASSES), None),
    ]);
    let mut params: Vec<f32> = (0..model.size())
        .map(|_| (rng.random::<f32>() - 0.5) * 0.5)
        .collect();

    let mut trainer = Trainer::new(
        model,
        Adam::new(config.learning_rate),
        SoftmaxCrossEntropy::new(),
        train_set,
        valid_set,
        config.epochs,
        batch_size,
        rng,
    );
    let history = trainer.train(&mut params)?;

    if let Some(last) = history.last() {
        info!(
            "done: loss {:.4}, val_loss {:.4}, val_accuracy {:.4}",
            last.train_loss(),
            last.valid_loss(),
            last.valid_accuracy()
        );
    }

    let model = trainer.into_model();
    let buffer = ModelBuffer::from_model(&model, &params)?;
    let written = buffer.write_to(&config.model_path)?;
    info!(
        "exported quantized model ({written} bytes) to {}",
        config.model_path.display()
    );

    Ok(())
}
