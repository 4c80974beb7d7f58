use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value, json};
use shape_cropper::dispatch::{self, CROP_OVAL, Dispatcher, MethodCall, MethodResponse};
use shape_cropper::{batch, config, output};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "shape-cropper")]
#[command(about = "Rotate, center-crop, resample and ellipse-mask images")]
#[command(long_about = "\
Rotate, center-crop, resample and ellipse-mask images

Every crop runs the same pipeline:

  decode → rotate → crop → resample → ellipse mask → encode

The output is exactly WIDTHxHEIGHT (or the rotated source size when omitted),
with everything outside the inscribed ellipse transparent in PNG output or
flattened onto the configured background in JPEG output.

Crop policies:
  zoom-scale   window = target size / scale (scale clamped to 1-5), centered
  aspect-fit   scale the source to cover the target, then center-crop

Defaults come from config.toml in --config-dir. Run 'shape-cropper gen-config'
to print a documented config file.")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Print stage progress and debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    ZoomScale,
    AspectFit,
}

/// Transform flags shared by `crop` and `batch`.
#[derive(clap::Args, Clone)]
struct TransformArgs {
    /// Rotation in degrees, clockwise
    #[arg(long, allow_hyphen_values = true)]
    angle: Option<f64>,
    /// Output width in pixels
    #[arg(long)]
    width: Option<f64>,
    /// Output height in pixels
    #[arg(long)]
    height: Option<f64>,
    /// Crop policy (default from config)
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,
    /// Zoom factor for zoom-scale
    #[arg(long)]
    scale: Option<f64>,
    /// Output format: png, or anything else for jpeg
    #[arg(long)]
    format: Option<String>,
    /// JPEG quality, clamped to 0-100
    #[arg(long, allow_hyphen_values = true)]
    quality: Option<i64>,
}

impl TransformArgs {
    /// The flags as `cropOval` call arguments.
    fn to_arguments(&self) -> Map<String, Value> {
        let mut args = Map::new();
        let mut put = |key: &str, value: Value| {
            args.insert(key.to_string(), value);
        };
        if let Some(v) = self.angle {
            put("angle", json!(v));
        }
        if let Some(v) = self.width {
            put("width", json!(v));
        }
        if let Some(v) = self.height {
            put("height", json!(v));
        }
        if let Some(policy) = self.policy {
            let name = match policy {
                PolicyArg::ZoomScale => "zoomScale",
                PolicyArg::AspectFit => "aspectFit",
            };
            put("policy", json!(name));
        }
        if let Some(v) = self.scale {
            put("scale", json!(v));
        }
        if let Some(v) = &self.format {
            put("compressFormat", json!(v));
        }
        if let Some(v) = self.quality {
            put("compressQuality", json!(v));
        }
        args
    }
}

#[derive(Subcommand)]
enum Command {
    /// Crop a single image
    Crop {
        /// Source image
        source: PathBuf,
        /// Where to write the encoded result
        #[arg(short, long)]
        out: PathBuf,
        #[command(flatten)]
        transform: TransformArgs,
    },
    /// Run a JSON method call: {"method": "cropOval", "arguments": {...}}
    Call {
        /// JSON file with the call, or '-' for stdin
        #[arg(default_value = "-")]
        input: PathBuf,
        /// Where to write the bytes of a successful call
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Crop every image under a directory in parallel
    Batch {
        /// Directory to read images from (recursively)
        input: PathBuf,
        /// Directory to write results to, mirroring subdirectories
        output: PathBuf,
        #[command(flatten)]
        transform: TransformArgs,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Crop {
            source,
            out,
            transform,
        } => {
            let dispatcher = load_dispatcher(&cli.config_dir)?;
            let mut arguments = transform.to_arguments();
            arguments.insert(
                "sourcePath".to_string(),
                json!(source.to_string_lossy()),
            );
            let call = MethodCall::new(CROP_OVAL, Value::Object(arguments));
            let response = handle_with_progress(&dispatcher, &call, cli.verbose);
            finish_call(response, &out)?;
        }
        Command::Call { input, out } => {
            let dispatcher = load_dispatcher(&cli.config_dir)?;
            let call: MethodCall = serde_json::from_str(&read_input(&input)?)?;
            let response = handle_with_progress(&dispatcher, &call, cli.verbose);
            finish_call(response, &out)?;
        }
        Command::Batch {
            input,
            output: output_dir,
            transform,
        } => {
            let cropper_config = config::load_config(&cli.config_dir)?;
            init_thread_pool(&cropper_config.processing);
            let request = dispatch::parse_request(
                &Value::Object(transform.to_arguments()),
                &cropper_config.request_defaults(),
            )?;

            let (tx, rx) = std::sync::mpsc::channel();
            let (input_root, output_root) = (input.clone(), output_dir.clone());
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event, &input_root, &output_root) {
                        println!("{}", line);
                    }
                }
            });
            let report = batch::run_batch(&input, &output_dir, &request, Some(tx))?;
            printer.join().ok();
            println!("{}", output::format_batch_summary(&report));
            if report.failed() > 0 {
                return Err(format!("{} of {} images failed", report.failed(), report.outcomes.len()).into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise warnings, or debug with `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn load_dispatcher(config_dir: &Path) -> Result<Dispatcher, config::ConfigError> {
    let cropper_config = config::load_config(config_dir)?;
    Ok(Dispatcher::new(cropper_config.request_defaults()))
}

/// Handle a call, printing stage lines as they arrive when `verbose`.
fn handle_with_progress(dispatcher: &Dispatcher, call: &MethodCall, verbose: bool) -> MethodResponse {
    if !verbose {
        return dispatcher.handle(call);
    }
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            if let Some(line) = output::format_pipeline_event(&event) {
                println!("{}", line);
            }
        }
    });
    let response = dispatcher.handle_with_events(call, Some(&tx));
    drop(tx);
    printer.join().ok();
    response
}

/// Write success bytes to `out`; print anything else and fail.
fn finish_call(response: MethodResponse, out: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match response {
        MethodResponse::Success(bytes) => {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, &bytes)?;
            println!("Wrote {} ({} bytes)", out.display(), bytes.len());
            Ok(())
        }
        other => {
            output::print_response(&other);
            Err("call did not succeed".into())
        }
    }
}

fn read_input(input: &Path) -> std::io::Result<String> {
    if input.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(input)
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
