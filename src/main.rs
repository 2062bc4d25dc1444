use clap::{Parser, Subcommand};
use imgconv::config::{self, ConverterConfig, Overrides};
use imgconv::imaging::{ImageCodec, RustCodec, resolve_save_params};
use imgconv::{convert, output};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "imgconv")]
#[command(about = "Batch image converter between HEIC, PNG and JPG")]
#[command(long_about = "\
Batch image converter between HEIC, PNG and JPG

Every file in the input directory whose extension matches the input format
is converted into the output directory, keeping its name and switching the
extension. Transparent images are flattened onto a background color when
the target format has no alpha channel (JPG, HEIC).

  file_in/                 file_out/
  ├── IMG_0001.HEIC   →    ├── IMG_0001.jpg
  ├── IMG_0002.heic   →    ├── IMG_0002.jpg
  └── notes.txt            (skipped)

A file that fails to convert is reported and the batch continues. The exit
status is non-zero if any file failed.

Run 'imgconv gen-config' to generate a documented imgconv.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing default file means stock settings)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Append an info-level log of every conversion to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Flags that override the config file.
#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Input directory
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Input format: heic, png or jpg
    #[arg(long)]
    from: Option<String>,

    /// Output format: heic, png or jpg
    #[arg(long)]
    to: Option<String>,

    /// JPG quality (1-100)
    #[arg(long)]
    quality: Option<u32>,

    /// Do not clear the output directory before converting
    #[arg(long)]
    keep_output: bool,
}

impl RunArgs {
    fn overrides(&self) -> Overrides {
        Overrides {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            input_format: self.from.clone(),
            output_format: self.to.clone(),
            quality: self.quality,
            keep_output: self.keep_output,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Convert every matching file in the input directory
    Convert {
        #[command(flatten)]
        args: RunArgs,

        /// Write a JSON report of every result to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Validate config and list the files that would be converted
    Check(RunArgs),
    /// Print the format capability table
    Formats,
    /// Print a stock imgconv.toml with all options documented
    GenConfig,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    match &cli.command {
        Command::Convert { args, report } => {
            let config = load(&cli, args)?;
            let (input_format, output_format) = config.formats()?;
            let settings = config.settings();

            let show_progress = settings.show_progress;
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    let is_file = matches!(event, convert::ConvertEvent::FileFinished { .. });
                    if show_progress || !is_file {
                        for line in output::format_convert_event(&event) {
                            println!("{}", line);
                        }
                    }
                }
            });
            let result = convert::run(
                &config.input_path(),
                &config.output_path(),
                input_format,
                output_format,
                &settings,
                Some(tx),
            );
            if printer.join().is_err() {
                return Err("progress printer thread panicked".into());
            }
            let run_report = result?;

            if let Some(path) = report {
                let json = serde_json::to_string_pretty(&run_report)?;
                std::fs::write(path, json)?;
            }
            output::print_summary(&run_report);

            if !run_report.all_succeeded() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Check(args) => {
            let config = load(&cli, args)?;
            let (input_format, output_format) = config.formats()?;
            let settings = config.settings();
            let (input_dir, output_dir) = (config.input_path(), config.output_path());

            let pairs = convert::plan(
                &input_dir,
                &output_dir,
                input_format,
                output_format,
                &settings,
            )?;
            let codec = RustCodec::new();
            let params = resolve_save_params(output_format, &settings, false);
            let check = output::CheckSummary {
                input_dir: &input_dir,
                output_dir: &output_dir,
                input_format,
                output_format,
                input_extensions: settings.extensions.for_format(input_format),
                params: params.describe(),
                clear_output: settings.clear_output,
                codec_ready: codec.supports(input_format) && codec.supports(output_format),
                pairs: &pairs,
            };
            output::print_check_output(&check);
            if !check.codec_ready {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Formats => {
            let codec = RustCodec::new();
            output::print_capability_table(|f| codec.supports(f));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Load the config file named by `--config` (required) or the default
/// `imgconv.toml` (optional), with command-line flags applied last.
fn load(cli: &Cli, args: &RunArgs) -> Result<ConverterConfig, config::ConfigError> {
    let (path, required) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(config::DEFAULT_CONFIG_FILE), false),
    };
    config::load_config(&path, required, &args.overrides())
}

/// Console logging on stderr, plus an optional plain-text file layer.
///
/// `RUST_LOG` takes precedence over `--verbose` for the console layer.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> std::io::Result<()> {
    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "imgconv=debug" } else { "warn" })
    });

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(EnvFilter::new("imgconv=info")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();
    Ok(())
}
