use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use texture_features::batch::{self, BatchError, BatchRunner};
use texture_features::config::{self, ConfigError, ExtractConfig};
use texture_features::descriptors::DescriptorKind;
use texture_features::flat::{self, FlatWriter, ReadMode};
use texture_features::labels;
use texture_features::output;
use texture_features::pipeline::{self, PipelineEvent};

/// Shared flags for commands that enumerate images.
#[derive(clap::Args, Clone)]
struct InputArgs {
    /// Glob selecting the input images (overrides `images` in the config)
    #[arg(long)]
    images: Option<String>,
}

#[derive(Parser)]
#[command(name = "texture-features")]
#[command(about = "Batch GLCM, LBP and LPQ texture feature extraction")]
#[command(long_about = "\
Batch GLCM, LBP and LPQ texture feature extraction

Every image matched by the glob becomes one row of texture features, and
its filename becomes its class label:

  BaseDeDados/
  ├── granite1.bmp        → label \"granite\"
  ├── granite2.bmp        → label \"granite\"
  └── marble1.bmp         → label \"marble\"

  DadosExtraidos/
  ├── Y_Resultado.txt     # Labels, one per image, in glob order
  ├── X_TreinoGLCM.txt    # Co-occurrence properties, one row per image
  ├── X_TreinoLBP.txt     # Local binary pattern histograms
  └── X_TreinoLPQ.txt     # Local phase quantization histograms

Labels are the filename with directory, extension and digits removed.
Row i of every feature file describes the image on line i of the labels.

Run 'texture-features gen-config' to generate a documented extract.toml.")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract features for the enabled descriptors (or those given)
    Extract {
        /// Descriptor to run: glcm, lbp or lpq. Repeat for several.
        #[arg(long = "descriptor", short = 'd')]
        descriptors: Vec<DescriptorKind>,
        #[command(flatten)]
        input: InputArgs,
        /// Max parallel workers (overrides processing.max_processes)
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
        /// Skip images that fail instead of aborting (sets processing.keep_going)
        #[arg(long)]
        keep_going: bool,
        /// With --keep-going, give up after this many failed images
        #[arg(long, requires = "keep_going")]
        max_failures: Option<usize>,
    },
    /// Write only the label file
    Labels(InputArgs),
    /// Read a label or feature file back and summarize it
    Inspect {
        /// File to read
        file: PathBuf,
        /// Read mode: f for numeric records, s for strings (labels)
        #[arg(long, default_value = "f")]
        mode: ReadMode,
        /// Shorthand for --mode s
        #[arg(long, conflicts_with = "mode")]
        strings: bool,
        /// Record delimiter (defaults to the configured one)
        #[arg(long)]
        delimiter: Option<String>,
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate the config and list the matched images
    Check(InputArgs),
    /// Print a stock extract.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Extract {
            descriptors,
            input,
            jobs,
            keep_going,
            max_failures,
        } => {
            let mut extract_config = load_config(&cli.config, &input)?;
            if jobs.is_some() {
                extract_config.processing.max_processes = jobs;
                extract_config.validate()?;
            }
            if keep_going {
                extract_config.processing.keep_going = true;
            }
            if max_failures.is_some() {
                extract_config.processing.max_failures = max_failures;
            }
            let runner = build_runner(&extract_config.processing)?;
            let pipelines = extract_config.pipelines(&descriptors);
            let total = pipelines.len();

            for (i, pipeline_config) in pipelines.iter().enumerate() {
                println!(
                    "==> Stage {}/{}: {}",
                    i + 1,
                    total,
                    pipeline_config.output_path.display()
                );
                let (tx, printer) = spawn_printer();
                let result = pipeline::run_pipeline(pipeline_config, &runner, Some(tx));
                join_printer(printer)?;
                let report = result?;
                if !report.skipped.is_empty() {
                    println!("==> Skipped {} image(s)", report.skipped.len());
                }
            }
            println!("==> Extraction complete: {} descriptor(s)", total);
        }
        Command::Labels(input) => {
            let extract_config = load_config(&cli.config, &input)?;
            let writer = FlatWriter::new(extract_config.format, extract_config.delimiter.clone());
            let labels = pipeline::write_labels_for_glob(
                &extract_config.images,
                &extract_config.extension,
                &extract_config.labels,
                &writer,
            )?;
            output::print_labels_output(&extract_config.labels, &labels);
        }
        Command::Inspect {
            file,
            mode,
            strings,
            delimiter,
            json,
        } => {
            let delimiter = match delimiter {
                Some(d) => d,
                None => config::load_config(&cli.config)?.delimiter,
            };
            let mode = if strings { ReadMode::Strings } else { mode };
            let data = flat::read_file(&file, &delimiter, mode)?;
            if json {
                println!("{}", output::inspect_json(&data)?);
            } else {
                output::print_inspect_output(&file, &data);
            }
        }
        Command::Check(input) => {
            let extract_config = load_config(&cli.config, &input)?;
            println!("==> Checking {}", cli.config.display());
            let paths = batch::enumerate(&extract_config.images)?;
            let labels = labels::derive_labels(
                &paths,
                labels::glob_prefix(&extract_config.images),
                &extract_config.extension,
            );
            output::print_check_output(&extract_config, &paths, &labels);
            println!("==> Configuration is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config file and apply command-line overrides.
fn load_config(path: &Path, input: &InputArgs) -> Result<ExtractConfig, ConfigError> {
    let mut extract_config = config::load_config(path)?;
    if let Some(images) = &input.images {
        extract_config.images = images.clone();
        extract_config.validate()?;
    }
    Ok(extract_config)
}

/// Build the batch runner based on processing config.
///
/// Caps at the number of available CPU cores: user can constrain down, not up.
fn build_runner(processing: &config::ProcessingConfig) -> Result<BatchRunner, BatchError> {
    BatchRunner::new(Some(config::effective_threads(processing)))
}

/// Start a thread that prints pipeline events as they arrive.
fn spawn_printer() -> (Sender<PipelineEvent>, JoinHandle<()>) {
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_pipeline_event(&event) {
                println!("{}", line);
            }
        }
    });
    (tx, printer)
}

fn join_printer(printer: JoinHandle<()>) -> Result<(), Box<dyn std::error::Error>> {
    printer.join().map_err(|_| "output printer thread panicked")?;
    Ok(())
}
