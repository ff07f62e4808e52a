use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{info, warn};

use sentio::dataset::read_examples;
use sentio::service::evaluate;
use sentio::{
    create_router, train_from_files, AppState, ArtifactStore, BootstrapPolicy, DatasetPreparer,
    EmotionService, HttpTranslator, PreparationConfig, ServiceConfig, SplitRatios, TrainingConfig,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize raw labeled files into processed CSVs and a label mapping
    Prepare {
        /// Raw CSV/TSV files sharing one header
        #[arg(short, long = "input", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,
        #[arg(short, long, default_value = "data/processed")]
        output_dir: PathBuf,
        /// Also write stratified train/val/test files (80/10/10)
        #[arg(long)]
        split: bool,
        /// Seed for the row shuffle; random when omitted
        #[arg(long)]
        shuffle_seed: Option<u64>,
        #[arg(long, default_value_t = 42)]
        split_seed: u64,
    },
    /// Fit the classifier and persist it
    Train {
        /// Training files, in any supported label encoding
        #[arg(short, long, required = true, num_args = 1..)]
        data: Vec<PathBuf>,
        #[arg(long)]
        model_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 10_000)]
        max_features: usize,
        /// Inverse regularization strength
        #[arg(long, default_value_t = 1.0)]
        c: f64,
        #[arg(long, default_value_t = 100)]
        max_iter: usize,
        /// Seed for the training row order; random when omitted
        #[arg(long)]
        shuffle_seed: Option<u64>,
        /// Held-out file to report accuracy on
        #[arg(long)]
        eval: Option<PathBuf>,
    },
    /// Run the HTTP service
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
        #[arg(long)]
        model_dir: Option<PathBuf>,
        /// CSV with `emotion` and `word` columns
        #[arg(long)]
        words: Option<PathBuf>,
        #[arg(long)]
        train_data: Option<PathBuf>,
        /// Train from --train-data when no classifier has been persisted
        #[arg(long)]
        train_if_missing: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sentio::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Command::Prepare {
            inputs,
            output_dir,
            split,
            shuffle_seed,
            split_seed,
        } => {
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("creating {:?}", output_dir))?;
            let preparer = DatasetPreparer::new(PreparationConfig {
                shuffle_seed,
                split: split.then(SplitRatios::default),
                split_seed,
                ..PreparationConfig::default()
            });
            let outcome = preparer.prepare(&inputs, &output_dir)?;
            let report = &outcome.report;
            info!(
                "Kept {} of {} rows (missing labels: {}, empty text: {}, unknown codes: {}, malformed: {})",
                report.kept_rows,
                report.total_rows,
                report.dropped_missing_labels,
                report.dropped_empty_text,
                report.dropped_unknown_codes,
                report.skipped_malformed
            );
            println!("Processed dataset saved to {}", outcome.processed.display());
            println!("Label mapping saved to {}", outcome.mapping.display());
        }
        Command::Train {
            data,
            model_dir,
            max_features,
            c,
            max_iter,
            shuffle_seed,
            eval,
        } => {
            let store = match model_dir {
                Some(dir) => ArtifactStore::new(dir)?,
                None => ArtifactStore::new_default()?,
            };
            let config = TrainingConfig {
                max_features,
                c,
                max_iterations: max_iter,
                shuffle_seed,
                ..TrainingConfig::default()
            };

            let start_time = Instant::now();
            let classifier = train_from_files(&data, &config)?;
            info!("=== Classifier trained (took {:.2?}) ===", start_time.elapsed());
            let path = store.save(&classifier)?;
            println!("Model saved at {}", path.display());

            if let Some(eval_path) = eval {
                let examples = read_examples(&eval_path)?;
                let evaluation = evaluate(&classifier, &examples)?;
                println!(
                    "Accuracy on {}: {:.4} ({} / {}, {} without known terms)",
                    eval_path.display(),
                    evaluation.accuracy(),
                    evaluation.correct,
                    evaluation.total,
                    evaluation.out_of_vocabulary
                );
            }
        }
        Command::Serve {
            host,
            port,
            model_dir,
            words,
            train_data,
            train_if_missing,
        } => {
            let mut config = ServiceConfig::from_env();
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(dir) = model_dir {
                config.model_dir = dir;
            }
            if let Some(path) = words {
                config.words_path = path;
            }
            if let Some(path) = train_data {
                config.training_data = path;
            }
            if train_if_missing {
                config.bootstrap = BootstrapPolicy::LoadOrTrain;
            }
            serve(config).await?;
        }
    }

    Ok(())
}

async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let bootstrap_config = config.clone();
    let service = tokio::task::spawn_blocking(move || EmotionService::bootstrap(&bootstrap_config))
        .await
        .context("bootstrap task panicked")??;
    let info = service.classifier().info();
    info!(
        "Service ready in {:.2?}: {} emotions, {} vocabulary terms",
        start_time.elapsed(),
        info.num_classes,
        info.vocabulary_size
    );

    let translator = Arc::new(HttpTranslator::new(config.translate_url.clone()));
    let state = Arc::new(AppState::new(Arc::new(service), translator));
    let app = create_router(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;
    println!("Server running on http://{}", bind_addr);
    println!("  GET  /                  - Feedback page");
    println!("  POST /translate         - Translate text");
    println!("  POST /analyze-feedback  - Classify feedback");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
