use anyhow::Context;
use log::info;
use rand::{ Rng, SeedableRng, rngs::StdRng };
use tracing_subscriber::EnvFilter;

use mnist_mlp::{
  config::TrainingConfig,
  dataset::{ BatchLoader, Dataset, MnistDataset },
  evaluate::evaluate,
  model::Mlp,
  train::Trainer,
};


fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info") ))
    .with_writer(std::io::stderr)
    .init();

  let config = TrainingConfig::from_env().context("Invalid environment override")?;
  info!("{config:?}");
  let mut rng = config.rng();

  let train = MnistDataset::train(&config.data_dir, &config.mirrors)
    .context("Could not load the training set")?;
  let test = MnistDataset::test(&config.data_dir, &config.mirrors)
    .context("Could not load the test set")?;
  info!("{} training and {} test samples", train.len(), test.len());

  let model = Mlp::new(&mut rng);
  info!("Model summary\n{model}");

  let mut train_loader = BatchLoader::new(train, config.batch_size, true, StdRng::seed_from_u64(rng.gen()));
  let mut test_loader = BatchLoader::new(test, config.batch_size, false, StdRng::seed_from_u64(rng.gen()));

  let mut trainer = Trainer::new(model, config.learning_rate);
  trainer.fit(&mut train_loader, config.num_epochs);

  let accuracy = evaluate(trainer.model(), &mut test_loader);
  println!("{accuracy}");
  Ok(())
}
