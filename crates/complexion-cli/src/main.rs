use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use complexion_core::report::SkinToneReport;
use complexion_core::{
    AnalysisReport, FaceAnalysisResult, FaceAnalyzer, FaceMeasurements, FaceShapeClassifier,
    LabColor, Measure, Season, SkinToneClassifier,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;
mod input;

use config::Config;
use input::InputError;

#[derive(Parser)]
#[command(name = "complexion", about = "Skin tone, face shape and hair coverage analysis")]
struct Cli {
    /// TOML config file (default: $COMPLEXION_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one face photo
    Analyze {
        image: PathBuf,
        /// Landmark JSON file (default: sidecar next to the image)
        #[arg(long)]
        landmarks: Option<PathBuf>,
    },
    /// Analyze several photos concurrently, using sidecar landmark files
    Batch {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Classify face shape from measurements
    Shape {
        #[arg(long)]
        length_width: f32,
        #[arg(long)]
        forehead_jaw: f32,
        /// Jawline angle in degrees
        #[arg(long)]
        jawline_angle: f32,
        #[arg(long)]
        forehead_width: Option<f32>,
        #[arg(long)]
        jaw_width: Option<f32>,
        #[arg(long)]
        cheekbone_width: Option<f32>,
    },
    /// Classify a mean L*a*b* skin color
    Tone {
        #[arg(long)]
        l: f32,
        #[arg(long, allow_negative_numbers = true)]
        a: f32,
        #[arg(long, allow_negative_numbers = true)]
        b: f32,
    },
}

/// One analysis as printed to stdout.
#[derive(Serialize)]
struct Envelope {
    id: Uuid,
    analyzed_at: DateTime<Utc>,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<AnalysisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct ToneOutput {
    #[serde(flatten)]
    tone: SkinToneReport,
    color_season: Season,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    config.pretty |= cli.pretty;

    match cli.command {
        Commands::Analyze { image, landmarks } => {
            let analyzer = FaceAnalyzer::new();
            let id = Uuid::new_v4();
            let job_config = config.clone();
            let result = tokio::task::spawn_blocking(move || {
                run_analysis(id, &analyzer, &image, landmarks.as_deref(), &job_config)
            })
            .await??;

            let envelope = Envelope {
                id,
                analyzed_at: Utc::now(),
                success: true,
                image: None,
                analysis: Some(result.to_report()),
                error: None,
            };
            print_json(&envelope, config.pretty)?;
        }
        Commands::Batch { images } => {
            run_batch(images, Arc::new(config)).await?;
        }
        Commands::Shape {
            length_width,
            forehead_jaw,
            jawline_angle,
            forehead_width,
            jaw_width,
            cheekbone_width,
        } => {
            let mut measurements = FaceMeasurements::new()
                .with(Measure::LengthWidthRatio, length_width)
                .with(Measure::ForeheadJawRatio, forehead_jaw)
                .with(Measure::JawlineAngle, jawline_angle);
            let widths = [
                (Measure::ForeheadWidth, forehead_width),
                (Measure::JawWidth, jaw_width),
                (Measure::CheekboneWidth, cheekbone_width),
            ];
            for (measure, value) in widths {
                if let Some(v) = value {
                    measurements.insert(measure, v);
                }
            }
            let result = FaceShapeClassifier::new().classify(&measurements);
            print_json(&result, config.pretty)?;
        }
        Commands::Tone { l, a, b } => {
            let result = SkinToneClassifier::new().classify_lab(LabColor::new(l, a, b));
            let output = ToneOutput {
                tone: (&result).into(),
                color_season: result.season(),
            };
            print_json(&output, config.pretty)?;
        }
    }

    Ok(())
}

/// Decode, load landmarks and analyze one image. Runs on a blocking thread.
fn run_analysis(
    id: Uuid,
    analyzer: &FaceAnalyzer,
    image_path: &Path,
    landmarks: Option<&Path>,
    config: &Config,
) -> Result<FaceAnalysisResult, InputError> {
    let span = tracing::info_span!("analysis", %id, image = %image_path.display());
    let _guard = span.enter();

    let image = input::load_image(image_path, config.min_resolution)?;
    let provider = input::landmarks_for(image_path, &image, landmarks, config)?;
    let result = analyzer.analyze(&image, &provider);

    if !result.detected && config.reject_undetected {
        return Err(InputError::NoFace);
    }
    Ok(result)
}

async fn run_batch(images: Vec<PathBuf>, config: Arc<Config>) -> Result<()> {
    let analyzer = Arc::new(FaceAnalyzer::new());
    let permits = Arc::new(Semaphore::new(config.batch_concurrency));
    tracing::info!(
        images = images.len(),
        concurrency = config.batch_concurrency,
        "batch started"
    );

    let mut jobs = Vec::with_capacity(images.len());
    for path in images {
        let analyzer = Arc::clone(&analyzer);
        let config = Arc::clone(&config);
        let permits = Arc::clone(&permits);
        let id = Uuid::new_v4();
        let job_path = path.clone();
        let handle = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| format!("batch scheduler closed: {e}"))?;
            settle(tokio::task::spawn_blocking(move || {
                run_analysis(id, &analyzer, &job_path, None, &config)
            }))
            .await
        });
        jobs.push((id, path, handle));
    }

    let mut failures = 0usize;
    for (id, path, handle) in jobs {
        let outcome = settle(handle).await;
        if let Err(e) = &outcome {
            failures += 1;
            tracing::warn!(%id, image = %path.display(), error = %e, "analysis failed");
        }
        print_json(&batch_envelope(id, path, outcome), config.pretty)?;
    }

    tracing::info!(failures, "batch finished");
    Ok(())
}

/// Flatten a job's outcome. A panicked or cancelled task becomes an error
/// for that image only.
async fn settle<E: std::fmt::Display>(
    handle: tokio::task::JoinHandle<Result<FaceAnalysisResult, E>>,
) -> Result<FaceAnalysisResult, String> {
    match handle.await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("analysis task failed: {e}")),
    }
}

fn batch_envelope(id: Uuid, path: PathBuf, outcome: Result<FaceAnalysisResult, String>) -> Envelope {
    let (success, analysis, error) = match outcome {
        Ok(result) => (true, Some(result.to_report()), None),
        Err(e) => (false, None, Some(e)),
    };
    Envelope {
        id,
        analyzed_at: Utc::now(),
        success,
        image: Some(path),
        analysis,
        error,
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}
