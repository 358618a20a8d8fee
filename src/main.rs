use std::{
    error::Error,
    fs::{self, File},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::distributions::Distribution;
use rand::{thread_rng, Rng};
use runboard::image_grid::{self, grid_error::GridError, GridOptions, ImageBatch};
use runboard::live_plot::DEFAULT_SERVER;
use runboard::metric_logger::{EmbeddingSnapshot, DEFAULT_RUNS_ROOT};
use runboard::{LivePlotClient, MetricLogger};
use serde::{Deserialize, Serialize};
use shuffle::{fy, shuffler::Shuffler};
use statrs::distribution::Normal;

const IMAGE_SIDE: usize = 28;
const PIXELS: usize = IMAGE_SIDE * IMAGE_SIDE;
const CLASSES: usize = 10;

const IDX_IMAGE_MAGIC: u32 = 2051;
const IDX_LABEL_MAGIC: u32 = 2049;

const TRAIN_IMAGES_FILE: &str = "train-images-idx3-ubyte";
const TRAIN_LABELS_FILE: &str = "train-labels-idx1-ubyte";
const TEST_IMAGES_FILE: &str = "t10k-images-idx3-ubyte";
const TEST_LABELS_FILE: &str = "t10k-labels-idx1-ubyte";

/// Demo training loops that exercise the run recorder and the live plotter.
/// Appropriate for datasets that fit in memory.
#[derive(Parser, Debug, Clone)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Train a linear softmax probe on digit images, recording the run and
    /// pushing embedding snapshots for 3D projection
    Projector(ProjectorArgs),
    /// Stream a synthetic loss curve into a live plotting session, no
    /// dataset required
    Live(LiveArgs),
}

#[derive(Args, Clone, Debug)]
struct ProjectorArgs {
    /// directory holding uncompressed MNIST IDX files
    /// (train-images-idx3-ubyte and friends). When omitted, a synthetic
    /// 10-class blob dataset stands in
    #[arg(short = 'd', long = "data-dir")]
    data_dir: Option<PathBuf>,

    /// name of the run; also the live session name when --server is given
    #[arg(long, default_value = "projector")]
    run_name: String,

    /// root directory run directories are created under
    #[arg(long, default_value = DEFAULT_RUNS_ROOT)]
    runs_root: PathBuf,

    /// number of epochs to train the probe for
    #[arg(short = 'e', long, visible_alias = "epochs", default_value = "2")]
    num_epochs: usize,

    /// number of samples per training batch
    #[arg(short = 'b', long, default_value = "256")]
    batch_size: usize,

    /// how many batches between loss records and embedding snapshots
    #[arg(long, default_value = "30")]
    log_every: usize,

    /// how many synthetic samples to generate when no --data-dir is given
    #[arg(long, default_value = "16384")]
    synthetic_samples: usize,

    /// the learning rate used to update the probe weights
    #[arg(long, alias = "lr", default_value = "0.1")]
    learning_rate: f64,

    /// base URL of a live plotting server to mirror the loss curve to
    #[arg(long)]
    server: Option<String>,

    /// path to save the trained probe weights to as JSON
    #[arg(short = 'o', long = "model-out")]
    model_output_file: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
struct LiveArgs {
    /// base URL of the live plotting server
    #[arg(long, default_value = DEFAULT_SERVER)]
    server: String,

    /// session name windows are created under
    #[arg(long, default_value = "demo")]
    env: String,

    /// how many points to stream
    #[arg(long, default_value = "120")]
    points: usize,

    /// milliseconds to sleep between points
    #[arg(long, default_value = "250")]
    interval_ms: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    println!("Using arguments {cli:?}");
    match cli.command {
        Commands::Projector(args) => run_projector(args),
        Commands::Live(args) => run_live(args),
    }
}

fn run_projector(args: ProjectorArgs) -> Result<(), Box<dyn Error>> {
    if args.batch_size == 0 {
        return Err("batch size must be positive".into());
    }
    if args.log_every == 0 {
        return Err("log interval must be positive".into());
    }

    let mut randomness = thread_rng();
    let (training_data, held_out_data) = match &args.data_dir {
        Some(dir) => load_mnist(dir)?,
        None => {
            println!(
                "No --data-dir given; generating {} synthetic samples",
                args.synthetic_samples
            );
            let training_data = synthetic_dataset(args.synthetic_samples, &mut randomness);
            let held_out_data =
                synthetic_dataset((args.synthetic_samples / 6).max(1), &mut randomness);
            (training_data, held_out_data)
        }
    };
    if training_data.count() == 0 {
        return Err("training set is empty".into());
    }
    println!(
        "Data loaded. Training: {}, Held out: {}",
        training_data.count(),
        held_out_data.count()
    );

    let mut logger = MetricLogger::with_root(&args.runs_root, &args.run_name)?;
    println!("Recording run to {:?}", logger.run_dir());
    let mut live_session = match &args.server {
        Some(base_url) => Some(LivePlotClient::connect(&args.run_name, base_url)?),
        None => None,
    };

    // show what one batch of inputs looks like, both in the run and as a
    // plain PNG next to the event file
    let preview = training_data.head_batch(args.batch_size.min(32))?;
    logger.add_image("one_batch", &preview, 0)?;
    let preview_path = logger.run_dir().join("one_batch.png");
    image_grid::make_grid(&preview, &GridOptions::default()).save(&preview_path)?;
    println!("Wrote batch preview to {:?}", preview_path);

    let mut probe = SoftmaxProbe::new();
    let mut order: Vec<usize> = (0..training_data.count()).collect();
    let mut fys = fy::FisherYates::default();
    let batches_per_epoch = training_data.count().div_ceil(args.batch_size);
    let pb = progress_bar((batches_per_epoch * args.num_epochs) as u64);

    let mut snapshot_step: i64 = 0;
    for epoch in 1..=args.num_epochs {
        fys.shuffle(&mut order, &mut randomness)
            .expect("Shuffling can't fail");
        for (batch_idx, chunk) in order.chunks(args.batch_size).enumerate() {
            let (images, labels) = training_data.gather(chunk);
            let loss = probe.train_batch(&images, &labels, args.learning_rate);
            pb.inc(1);

            if (batch_idx + 1) % args.log_every == 0 {
                snapshot_step += 1;
                pb.println(format!(
                    "{} Train Epoch: {} [{}/{} ({:.0}%)]\t Loss: {:.6}",
                    chrono::Local::now(),
                    epoch,
                    batch_idx * chunk.len(),
                    training_data.count(),
                    100.0 * batch_idx as f64 / batches_per_epoch as f64,
                    loss
                ));
                logger.record("loss", loss as f32, None)?;
                if let Some(client) = live_session.as_mut() {
                    client.update_loss(&args.run_name, "train", loss, "LOSS")?;
                }
                let snapshot = embedding_snapshot(&probe, &images, &labels)?;
                logger.add_embedding("default", &snapshot, snapshot_step)?;
            }
        }

        let (average_loss, correct) = evaluate(&probe, &held_out_data);
        pb.println(format!(
            "\n Test set: Average loss: {:.4}, Accuracy: {}/{} ({:.0}%)\n",
            average_loss,
            correct,
            held_out_data.count(),
            100.0 * correct as f64 / held_out_data.count() as f64
        ));
    }
    pb.finish_with_message("Training complete");

    if let Some(model_output_file) = &args.model_output_file {
        serialize_probe(model_output_file, &probe)?;
    }
    Ok(())
}

fn run_live(args: LiveArgs) -> Result<(), Box<dyn Error>> {
    println!(
        "Streaming a synthetic run to {} (session {})",
        args.server, args.env
    );
    let mut client = LivePlotClient::connect(&args.env, &args.server)?;
    client.log(&format!("synthetic stream started: {} points", args.points))?;

    let mut randomness = thread_rng();
    let noise = Normal::new(0.0, 0.05).expect("unable to create normal distribution");
    let pb = progress_bar(args.points as u64);
    for i in 0..args.points {
        let t = i as f64;
        // a decaying curve with noise, shaped like a loss that is going well
        let loss = 2.0 * (-t / 40.0).exp() + noise.sample(&mut randomness).abs();
        let accuracy = 100.0 * (1.0 - 0.9 * (-t / 60.0).exp()) + noise.sample(&mut randomness);
        let learning_rate = 0.1 * 0.98_f64.powf(t);
        client.update_loss("synthetic run", "train", loss, "LOSS")?;
        client.plot_many(&[("accuracy", accuracy), ("lr", learning_rate)])?;
        pb.inc(1);
        thread::sleep(Duration::from_millis(args.interval_ms));
    }
    client.log("synthetic stream finished")?;
    pb.finish_with_message("Stream complete");
    Ok(())
}

fn progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "[{elapsed_precise}] [{bar:40.green/white}] {human_pos}/{human_len} {per_sec} ({eta}) {msg}",
            )
            .unwrap(),
    );
    pb
}

/// In-memory digit dataset: grayscale 28x28 images with pixels in `[0,1]`,
/// stored one image after another, and one label per image.
struct Dataset {
    images: Vec<f32>,
    labels: Vec<u8>,
}

impl Dataset {
    fn count(&self) -> usize {
        self.labels.len()
    }

    fn image(&self, i: usize) -> &[f32] {
        &self.images[i * PIXELS..(i + 1) * PIXELS]
    }

    /// Copies the rows at `indices` into one contiguous batch.
    fn gather(&self, indices: &[usize]) -> (Vec<f32>, Vec<u8>) {
        let mut images = Vec::with_capacity(indices.len() * PIXELS);
        let mut labels = Vec::with_capacity(indices.len());
        for &i in indices {
            images.extend_from_slice(self.image(i));
            labels.push(self.labels[i]);
        }
        (images, labels)
    }

    /// The first `n` images (fewer if the set is smaller) as an image batch.
    fn head_batch(&self, n: usize) -> Result<ImageBatch, GridError> {
        let n = n.min(self.count());
        ImageBatch::from_dims(
            &[n, 1, IMAGE_SIDE, IMAGE_SIDE],
            self.images[..n * PIXELS].to_vec(),
        )
    }
}

fn load_mnist(dir: &Path) -> Result<(Dataset, Dataset), Box<dyn Error>> {
    println!("Loading MNIST from {:?}", dir);
    let training_data = load_idx_pair(&dir.join(TRAIN_IMAGES_FILE), &dir.join(TRAIN_LABELS_FILE))?;
    let held_out_data = load_idx_pair(&dir.join(TEST_IMAGES_FILE), &dir.join(TEST_LABELS_FILE))?;
    Ok((training_data, held_out_data))
}

fn load_idx_pair(images_path: &Path, labels_path: &Path) -> Result<Dataset, Box<dyn Error>> {
    let (images, image_count) = load_idx_images(images_path)?;
    let labels = load_idx_labels(labels_path)?;
    if labels.len() != image_count {
        return Err(format!(
            "{:?} holds {} labels but {:?} holds {} images",
            labels_path,
            labels.len(),
            images_path,
            image_count
        )
        .into());
    }
    Ok(Dataset { images, labels })
}

fn load_idx_images(path: &Path) -> Result<(Vec<f32>, usize), Box<dyn Error>> {
    let bytes = fs::read(path)?;
    if bytes.len() < 16 {
        return Err(format!("{:?} is too short to be an IDX image file", path).into());
    }
    let magic = read_be_u32(&bytes, 0);
    if magic != IDX_IMAGE_MAGIC {
        return Err(format!(
            "{:?}: expected IDX image magic {}, found {}",
            path, IDX_IMAGE_MAGIC, magic
        )
        .into());
    }
    let count = read_be_u32(&bytes, 4) as usize;
    let rows = read_be_u32(&bytes, 8) as usize;
    let cols = read_be_u32(&bytes, 12) as usize;
    if rows != IMAGE_SIDE || cols != IMAGE_SIDE {
        return Err(format!(
            "{:?} holds {}x{} images, expected {}x{}",
            path, rows, cols, IMAGE_SIDE, IMAGE_SIDE
        )
        .into());
    }
    if bytes.len() != 16 + count * rows * cols {
        return Err(format!(
            "{:?} declares {} images but holds {} pixel bytes",
            path,
            count,
            bytes.len() - 16
        )
        .into());
    }
    let pixels = bytes[16..].iter().map(|&b| b as f32 / 255.0).collect();
    Ok((pixels, count))
}

fn load_idx_labels(path: &Path) -> Result<Vec<u8>, Box<dyn Error>> {
    let bytes = fs::read(path)?;
    if bytes.len() < 8 {
        return Err(format!("{:?} is too short to be an IDX label file", path).into());
    }
    let magic = read_be_u32(&bytes, 0);
    if magic != IDX_LABEL_MAGIC {
        return Err(format!(
            "{:?}: expected IDX label magic {}, found {}",
            path, IDX_LABEL_MAGIC, magic
        )
        .into());
    }
    let count = read_be_u32(&bytes, 4) as usize;
    if bytes.len() != 8 + count {
        return Err(format!(
            "{:?} declares {} labels but holds {} bytes",
            path,
            count,
            bytes.len() - 8
        )
        .into());
    }
    Ok(bytes[8..].to_vec())
}

// caller has already checked the buffer is long enough
fn read_be_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// One Gaussian blob per class, centered on a ring, so a linear probe can
/// separate the classes without any feature engineering.
fn synthetic_dataset(count: usize, randomness: &mut impl Rng) -> Dataset {
    let noise = Normal::new(0.0, 0.05).expect("unable to create normal distribution");
    let mut images = Vec::with_capacity(count * PIXELS);
    let mut labels = Vec::with_capacity(count);
    for _ in 0..count {
        let label = randomness.gen_range(0..CLASSES);
        let angle = 2.0 * std::f64::consts::PI * label as f64 / CLASSES as f64;
        let center_row = IMAGE_SIDE as f64 / 2.0 + 8.0 * angle.sin();
        let center_col = IMAGE_SIDE as f64 / 2.0 + 8.0 * angle.cos();
        for row in 0..IMAGE_SIDE {
            for col in 0..IMAGE_SIDE {
                let distance_squared =
                    (row as f64 - center_row).powi(2) + (col as f64 - center_col).powi(2);
                let value = (-distance_squared / 8.0).exp() + noise.sample(randomness);
                images.push(value.clamp(0.0, 1.0) as f32);
            }
        }
        labels.push(label as u8);
    }
    Dataset { images, labels }
}

/// A linear softmax probe: `logits = W x + b`, trained with plain SGD on
/// the mean negative log-likelihood of each batch.
#[derive(Debug, Serialize, Deserialize)]
struct SoftmaxProbe {
    /// `CLASSES * PIXELS` weights, one row per class
    weights: Vec<f64>,
    biases: Vec<f64>,
}

impl SoftmaxProbe {
    fn new() -> SoftmaxProbe {
        // the objective is convex, so zero initialization is safe
        SoftmaxProbe {
            weights: vec![0.0; CLASSES * PIXELS],
            biases: vec![0.0; CLASSES],
        }
    }

    fn logits(&self, pixels: &[f32]) -> [f64; CLASSES] {
        let mut logits = [0.0f64; CLASSES];
        for (class, logit) in logits.iter_mut().enumerate() {
            let row = &self.weights[class * PIXELS..(class + 1) * PIXELS];
            let mut sum = self.biases[class];
            for (&weight, &pixel) in row.iter().zip(pixels) {
                sum += weight * pixel as f64;
            }
            *logit = sum;
        }
        logits
    }

    fn predict(&self, pixels: &[f32]) -> usize {
        let logits = self.logits(pixels);
        let mut best = 0;
        for class in 1..CLASSES {
            if logits[class] > logits[best] {
                best = class;
            }
        }
        best
    }

    /// Runs one SGD step on the batch and returns its mean loss.
    fn train_batch(&mut self, images: &[f32], labels: &[u8], learning_rate: f64) -> f64 {
        let count = labels.len();
        debug_assert_eq!(images.len(), count * PIXELS);
        let mut grad_weights = vec![0.0f64; CLASSES * PIXELS];
        let mut grad_biases = vec![0.0f64; CLASSES];
        let mut loss_sum = 0.0;
        for (i, &label) in labels.iter().enumerate() {
            let pixels = &images[i * PIXELS..(i + 1) * PIXELS];
            let log_probs = log_softmax(&self.logits(pixels));
            loss_sum -= log_probs[label as usize];
            for class in 0..CLASSES {
                let target = if class == label as usize { 1.0 } else { 0.0 };
                let residual = log_probs[class].exp() - target;
                grad_biases[class] += residual;
                let row = &mut grad_weights[class * PIXELS..(class + 1) * PIXELS];
                for (grad, &pixel) in row.iter_mut().zip(pixels) {
                    *grad += residual * pixel as f64;
                }
            }
        }
        let scale = learning_rate / count as f64;
        for (weight, grad) in self.weights.iter_mut().zip(&grad_weights) {
            *weight -= scale * grad;
        }
        for (bias, grad) in self.biases.iter_mut().zip(&grad_biases) {
            *bias -= scale * grad;
        }
        loss_sum / count as f64
    }
}

fn log_softmax(logits: &[f64; CLASSES]) -> [f64; CLASSES] {
    let max = logits.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let log_sum: f64 = logits
        .iter()
        .map(|&logit| (logit - max).exp())
        .sum::<f64>()
        .ln();
    let mut out = [0.0; CLASSES];
    for (entry, &logit) in out.iter_mut().zip(logits) {
        *entry = logit - max - log_sum;
    }
    out
}

/// Sum-reduced NLL over the whole set, then averaged, plus the hit count.
fn evaluate(probe: &SoftmaxProbe, data: &Dataset) -> (f64, usize) {
    let mut loss_sum = 0.0;
    let mut correct = 0;
    for i in 0..data.count() {
        let pixels = data.image(i);
        let log_probs = log_softmax(&probe.logits(pixels));
        loss_sum -= log_probs[data.labels[i] as usize];
        if probe.predict(pixels) == data.labels[i] as usize {
            correct += 1;
        }
    }
    (loss_sum / data.count() as f64, correct)
}

/// The current logits of each batch row, with a constant bias column
/// appended, plus the row's label and source image.
fn embedding_snapshot(
    probe: &SoftmaxProbe,
    images: &[f32],
    labels: &[u8],
) -> Result<EmbeddingSnapshot, GridError> {
    let count = labels.len();
    let mut vectors = Vec::with_capacity(count);
    for i in 0..count {
        let logits = probe.logits(&images[i * PIXELS..(i + 1) * PIXELS]);
        let mut vector: Vec<f32> = logits.iter().map(|&logit| logit as f32).collect();
        vector.push(1.0);
        vectors.push(vector);
    }
    let labels = labels.iter().map(|label| label.to_string()).collect();
    let batch = ImageBatch::from_dims(&[count, 1, IMAGE_SIDE, IMAGE_SIDE], images.to_vec())?;
    Ok(EmbeddingSnapshot {
        vectors,
        labels: Some(labels),
        images: Some(batch),
    })
}

fn serialize_probe(model_output_file: &Path, probe: &SoftmaxProbe) -> Result<(), Box<dyn Error>> {
    println!("Saving probe weights to file: {:?}", model_output_file);
    let out_file = File::create(model_output_file)?;
    serde_json::to_writer(out_file, probe)?;
    Ok(())
}
