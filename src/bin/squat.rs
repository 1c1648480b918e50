//! Squat CLI - Command-line interface for the squat detector
//!
//! Commands:
//! - train: Train a model on a labeled sample directory and save it
//! - evaluate: Classify one motion sample with a saved model
//! - score: Measure a saved model against a labeled sample directory

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use squat_detector::pipeline::{DEFAULT_SAMPLE_PATH, DEFAULT_TRAINING_DIR};
use squat_detector::trainer::TrainingSummary;
use squat_detector::{
    classify_file, score_directory, train_from_directory, ComputeError, TrainingConfig,
    TrainingHistory, DEFAULT_MODEL_PATH, VERSION,
};

/// Squat - train and run a motion-sample squat classifier
#[derive(Parser)]
#[command(name = "squat")]
#[command(author = "Synheart AI Inc")]
#[command(version = VERSION)]
#[command(about = "Classify phone motion samples as squat / not a squat", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model on a labeled sample directory
    Train {
        /// Directory containing non_squat/ and squat/ sample folders
        #[arg(short, long, default_value = DEFAULT_TRAINING_DIR)]
        data: PathBuf,

        /// Where to write the model artifact (overwritten if present)
        #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,

        /// Training epochs
        #[arg(long, default_value = "100")]
        epochs: usize,

        /// Mini-batch size
        #[arg(long, default_value = "4")]
        batch_size: usize,

        /// Fraction of samples held out for validation
        #[arg(long, default_value = "0.2")]
        validation_split: f64,

        /// Seed for the train/validation split
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Adam learning rate
        #[arg(long, default_value = "0.001")]
        learning_rate: f64,

        /// Output the summary and per-epoch history as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify one motion sample
    Evaluate {
        /// Sample file to classify
        #[arg(short, long, default_value = DEFAULT_SAMPLE_PATH)]
        sample: PathBuf,

        /// Model artifact to load
        #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,

        /// Output the classification as JSON
        #[arg(long)]
        json: bool,
    },

    /// Score a model against a labeled sample directory
    Score {
        /// Directory containing non_squat/ and squat/ sample folders
        #[arg(short, long)]
        data: PathBuf,

        /// Model artifact to load
        #[arg(short, long, default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), ComputeError> {
    match cli.command {
        Commands::Train {
            data,
            model,
            epochs,
            batch_size,
            validation_split,
            seed,
            learning_rate,
            json,
        } => {
            let config = TrainingConfig::default()
                .with_epochs(epochs)
                .with_batch_size(batch_size)
                .with_validation_split(validation_split)
                .with_seeds(seed, seed)
                .with_learning_rate(learning_rate);
            cmd_train(&data, &model, config, json)
        }

        Commands::Evaluate {
            sample,
            model,
            json,
        } => cmd_evaluate(&sample, &model, json),

        Commands::Score { data, model, json } => cmd_score(&data, &model, json),
    }
}

#[derive(Serialize)]
struct TrainReport<'a> {
    model_path: String,
    model_id: String,
    summary: &'a TrainingSummary,
    history: &'a TrainingHistory,
}

fn cmd_train(
    data: &PathBuf,
    model: &PathBuf,
    config: TrainingConfig,
    json: bool,
) -> Result<(), ComputeError> {
    let outcome = train_from_directory(data, model, config)?;
    let summary = &outcome.artifact.summary;

    if json {
        let report = TrainReport {
            model_path: model.display().to_string(),
            model_id: outcome.artifact.model_id.to_string(),
            summary,
            history: &outcome.history,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Training Summary");
    println!("================");
    println!("Train samples:      {}", summary.train_samples);
    println!("Validation samples: {}", summary.validation_samples);
    println!("Epochs:             {}", summary.epochs);
    println!("Final loss:         {:.4}", summary.final_loss);
    println!("Final accuracy:     {:.1}%", summary.final_accuracy * 100.0);
    if let (Some(loss), Some(accuracy)) = (summary.final_val_loss, summary.final_val_accuracy) {
        println!("Validation loss:    {:.4}", loss);
        println!("Validation acc.:    {:.1}%", accuracy * 100.0);
    }
    println!("\nSUCCESS: '{}' has been created", model.display());

    Ok(())
}

fn cmd_evaluate(sample: &PathBuf, model: &PathBuf, json: bool) -> Result<(), ComputeError> {
    let classification = classify_file(model, sample)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
    } else {
        println!("{}", classification);
    }

    Ok(())
}

fn cmd_score(data: &PathBuf, model: &PathBuf, json: bool) -> Result<(), ComputeError> {
    let report = score_directory(model, data)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Score Report");
        println!("============");
        println!(
            "Samples:   {} ({} squat, {} non-squat)",
            report.samples, report.squat_samples, report.non_squat_samples
        );
        println!("Skipped:   {} (too short)", report.skipped);
        println!("Loss:      {:.4}", report.loss);
        println!("Accuracy:  {:.1}%", report.accuracy * 100.0);
        println!("Precision: {:.1}%", report.precision * 100.0);
        println!("Recall:    {:.1}%", report.recall * 100.0);
        println!("F1:        {:.3}", report.f1);
        println!("\nConfusion (actual x predicted):");
        println!(
            "  squat     -> squat: {:4}  not: {:4}",
            report.confusion.true_positives, report.confusion.false_negatives
        );
        println!(
            "  non-squat -> squat: {:4}  not: {:4}",
            report.confusion.false_positives, report.confusion.true_negatives
        );
    }

    Ok(())
}

// Error reporting

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ComputeError> for CliError {
    fn from(e: ComputeError) -> Self {
        let message = e.to_string();
        let (code, hint) = match e {
            ComputeError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
            ComputeError::JsonError(_) => ("JSON_ERROR", Some("Check JSON syntax of the sample or model file")),
            ComputeError::InsufficientReadings { .. } => (
                "SHORT_SAMPLE",
                Some("Samples need at least 20 readings"),
            ),
            ComputeError::EmptyDataset => (
                "EMPTY_DATASET",
                Some("Add .json samples under non_squat/ and squat/"),
            ),
            ComputeError::InsufficientSamples(_) => ("TOO_FEW_SAMPLES", Some("Record more samples")),
            ComputeError::ModelFormat(_) => (
                "MODEL_FORMAT",
                Some("Retrain with 'squat train' and check samples for out-of-range values"),
            ),
            ComputeError::ShapeMismatch(_) => ("SHAPE_MISMATCH", None),
            ComputeError::InvalidConfig(_) => ("INVALID_CONFIG", Some("Check training flags")),
        };

        CliError {
            code: code.to_string(),
            message,
            hint: hint.map(str::to_string),
        }
    }
}
