//! CLI application for training and running the emotion classifier.
//!
//! Usage:
//!   emotion-face train --root data/ -o model.bin        # Train, evaluate, save
//!   emotion-face classify face.png --model model.bin    # Classify a cropped face
//!   emotion-face detect photo.jpg --model model.bin     # Find and classify faces
//!   emotion-face detect photo.jpg --json                # JSON output

use clap::{Args, Parser, Subcommand};
use emotion_face::locator::{classify_frame, FaceEmotion, RustfaceLocator};
use emotion_face::{
    train_and_evaluate, EmotionRecognizer, GrayImage, ImageAccess, RecognizerConfig,
};
use log::info;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "emotion-face")]
#[command(author, version, about = "Fisherfaces facial emotion classifier", long_about = None)]
struct Cli {
    /// Show debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train on a dataset directory and report held-out accuracy
    Train(TrainArgs),
    /// Classify a face image that already has the model's input size
    Classify(ClassifyArgs),
    /// Detect faces in a photo and classify each one
    Detect(DetectArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory containing dataset/<category>/
    #[arg(long)]
    root: Option<PathBuf>,

    /// Comma-separated category names, in label order
    #[arg(long, value_delimiter = ',')]
    categories: Option<Vec<String>>,

    /// Input image width
    #[arg(long)]
    width: Option<u32>,

    /// Input image height
    #[arg(long)]
    height: Option<u32>,

    /// Fraction of each category used for training
    #[arg(long)]
    ratio: Option<f64>,

    /// Seed for a reproducible shuffle
    #[arg(long)]
    seed: Option<u64>,

    /// Upper bound on principal components
    #[arg(long)]
    max_components: Option<usize>,

    /// Write the trained model here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the model as JSON arrays
    #[arg(long)]
    export: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    /// Cropped grayscale face image
    #[arg(required = true)]
    image: PathBuf,

    /// Trained model path
    #[arg(short, long, default_value = "model.bin")]
    model: PathBuf,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,
}

#[derive(Args, Debug)]
struct DetectArgs {
    /// Input photo
    #[arg(required = true)]
    image: PathBuf,

    /// Trained model path
    #[arg(short, long, default_value = "model.bin")]
    model: PathBuf,

    /// Face detector model path
    #[arg(long, default_value = "seeta_fd_frontal_v1.0.bin")]
    detector: PathBuf,

    /// Minimum face size for detection
    #[arg(long, default_value = "20")]
    min_face_size: u32,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,
}

/// Output structure for `classify --json`
#[derive(Serialize)]
struct ClassifyOutput {
    image: String,
    category: usize,
    label: String,
    distance: f64,
}

/// Output structure for `detect --json`
#[derive(Serialize)]
struct DetectOutput {
    image: String,
    width: u32,
    height: u32,
    faces_detected: usize,
    faces: Vec<FaceEmotion>,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let result = match &cli.command {
        Command::Train(args) => train(args),
        Command::Classify(args) => classify(args),
        Command::Detect(args) => detect(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn train(args: &TrainArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => RecognizerConfig::from_json_file(path)?,
        None => RecognizerConfig::default(),
    };
    if let Some(root) = &args.root {
        config.dataset_root = root.clone();
    }
    if let Some(categories) = &args.categories {
        config.categories = categories.clone();
    }
    if let Some(width) = args.width {
        config.image_width = width;
    }
    if let Some(height) = args.height {
        config.image_height = height;
    }
    if let Some(ratio) = args.ratio {
        config.split_ratio = ratio;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(max) = args.max_components {
        config.max_components = Some(max);
    }

    let run = train_and_evaluate(&config)?;
    println!(
        "Trained on {} image(s), evaluated on {} image(s)\n",
        run.training_size, run.evaluation_size
    );
    println!("{}", run.report);

    if let Some(path) = &args.output {
        run.model.save(path)?;
        info!("Model written to {:?}", path);
    }
    if let Some(path) = &args.export {
        run.model.export_json(path)?;
        info!("Model exported to {:?}", path);
    }
    Ok(())
}

fn classify(args: &ClassifyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let recognizer = EmotionRecognizer::load(&args.model)?;
    let model = recognizer.model()?;

    let face = GrayImage::open(&args.image)?;
    let prediction = model.classify(&face)?;
    let label = model.label(&prediction).unwrap_or("unknown").to_string();

    if args.json {
        let output = ClassifyOutput {
            image: args.image.display().to_string(),
            category: prediction.category,
            label,
            distance: prediction.distance,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{} (distance {:.3})", label, prediction.distance);
    }
    Ok(())
}

fn detect(args: &DetectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let recognizer = EmotionRecognizer::load(&args.model)?;

    let detector_path = args.detector.to_str().ok_or("Invalid detector path")?;
    let mut locator = RustfaceLocator::load(detector_path, args.min_face_size)?;

    let frame = GrayImage::open(&args.image)?;
    let faces = classify_frame(&frame, &mut locator, &recognizer)?;

    let output = DetectOutput {
        image: args.image.display().to_string(),
        width: frame.width(),
        height: frame.height(),
        faces_detected: faces.len(),
        faces,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", format_human_readable(&output));
    }
    Ok(())
}

fn format_human_readable(output: &DetectOutput) -> String {
    let mut s = String::new();

    s.push_str(&format!("Image: {} ({}x{})\n", output.image, output.width, output.height));
    s.push_str(&format!("Faces classified: {}\n", output.faces_detected));

    if output.faces.is_empty() {
        s.push_str("\nNo faces found.\n");
        return s;
    }

    for (i, face) in output.faces.iter().enumerate() {
        s.push_str(&format!(
            "  Face {}: {} at ({}, {}) {}x{} (distance {:.3})\n",
            i + 1,
            face.label,
            face.region.x,
            face.region.y,
            face.region.width,
            face.region.height,
            face.prediction.distance
        ));
    }

    s
}
