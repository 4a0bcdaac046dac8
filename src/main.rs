//! Quantized Layers to Systolic Array Compiler CLI
//!
//! Usage:
//!   layers2systolic weights --layers ./model -o weights.txt
//!   layers2systolic instructions --layers ./model --json
//!   layers2systolic input --input test_input.csv --start 28
//!   layers2systolic transfer --layers ./model --input test_input.csv --count 100 \
//!       --output-offset 0 --output-count 10 --embed-weights -o complete.txt
//!   layers2systolic inspect complete.txt

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser as ClapParser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use layers_to_systolic::artifact::write_atomic;
use layers_to_systolic::loader::{load_layers, load_matrix};
use layers_to_systolic::{
    compile_instructions, encode_input, encode_weights, parse_artifact, Block, BlockKind,
    CompileResult, OpCode, SystolicConfig, TransferAssembler,
};

#[derive(ClapParser, Debug)]
#[command(name = "layers2systolic")]
#[command(author = "FPGA Team")]
#[command(version = "0.1.0")]
#[command(about = "Compiles quantized layer stacks to systolic array transfer scripts")]
struct Args {
    /// TOML configuration file
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Systolic array width W (overrides the config file)
    #[arg(short = 'n', long = "tile-width", global = true)]
    tile_width: Option<usize>,

    /// Fail on short input windows instead of zero padding
    #[arg(long = "strict", global = true)]
    strict: bool,

    /// Verbose logging (repeat for more)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode all kernel<N>.csv files into a weights block
    Weights {
        /// Directory holding kernel<N>.csv files
        #[arg(short = 'l', long = "layers", default_value = ".")]
        layers: PathBuf,

        /// Write to file instead of stdout
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// Compile the instruction stream for a layer stack
    Instructions {
        #[arg(short = 'l', long = "layers", default_value = ".")]
        layers: PathBuf,

        /// Output as JSON
        #[arg(short = 'j', long = "json")]
        json_output: bool,

        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// Encode one window of input samples
    Input {
        /// CSV file with one sample per row
        #[arg(short = 'i', long = "input")]
        input: PathBuf,

        /// First row of the window
        #[arg(short = 's', long = "start", default_value = "0")]
        start: usize,

        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// Assemble a complete multi-window transfer
    Transfer {
        #[arg(short = 'l', long = "layers", default_value = ".")]
        layers: PathBuf,

        #[arg(short = 'i', long = "input")]
        input: PathBuf,

        /// Number of input rows to transfer
        #[arg(long = "count")]
        count: usize,

        /// Offset of the results in the output buffer
        #[arg(long = "output-offset", default_value = "0")]
        output_offset: usize,

        /// Number of results per sample
        #[arg(long = "output-count")]
        output_count: usize,

        /// Embed the weights block in the transfer
        #[arg(long = "embed-weights")]
        embed_weights: bool,

        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// Summarize an existing artifact
    Inspect {
        file: PathBuf,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(args: &Args) -> CompileResult<SystolicConfig> {
    let mut config = match &args.config {
        Some(path) => SystolicConfig::from_file(path)?,
        None => SystolicConfig::default(),
    };
    if let Some(width) = args.tile_width {
        config.tile_width = width;
    }
    if args.strict {
        config.strict_windows = true;
    }
    config.validate()?;
    Ok(config)
}

fn emit(text: &str, output: Option<&Path>) -> CompileResult<()> {
    match output {
        Some(path) => write_atomic(path, text),
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}

fn run(args: Args) -> CompileResult<()> {
    let mut config = resolve_config(&args)?;

    match args.command {
        Command::Weights { layers, output } => {
            let layers = load_layers(&layers)?;
            let encoded = encode_weights(&layers, &config)?;
            tracing::info!("encoded {} layer(s)", encoded.layer_shapes.len());
            emit(&encoded.block.to_string(), output.as_deref())
        }

        Command::Instructions {
            layers,
            json_output,
            output,
        } => {
            let layers = load_layers(&layers)?;
            let instructions = compile_instructions(&layers, &config)?;
            let text = if json_output {
                serde_json::to_string_pretty(&instructions).map_err(std::io::Error::from)? + "\n"
            } else {
                Block::from_instructions(&instructions).to_string()
            };
            emit(&text, output.as_deref())
        }

        Command::Input {
            input,
            start,
            output,
        } => {
            let input = load_matrix(&input)?;
            let block = encode_input(&input, start, &config)?;
            emit(&block.to_string(), output.as_deref())
        }

        Command::Transfer {
            layers,
            input,
            count,
            output_offset,
            output_count,
            embed_weights,
            output,
        } => {
            if embed_weights {
                config.embed_weights = true;
            }
            let layers = load_layers(&layers)?;
            let input = load_matrix(&input)?;
            let artifact = TransferAssembler::new(config, &layers)?.assemble(
                &input,
                count,
                output_offset,
                output_count,
            )?;
            match output {
                Some(path) => artifact.write_atomic(&path),
                None => emit(&artifact.render(), None),
            }
        }

        Command::Inspect { file } => {
            let text = fs::read_to_string(&file)?;
            print_summary(&file, &text)
        }
    }
}

fn print_summary(file: &Path, text: &str) -> CompileResult<()> {
    let sections = parse_artifact(text)?;

    println!("{}", "Artifact Summary".bold().green());
    println!("{}", "=".repeat(50));
    println!("{}: {}", "File".cyan(), file.display());
    println!("{}: {}", "Sections".cyan(), sections.len());
    println!();

    for (i, section) in sections.iter().enumerate() {
        println!(
            "{} {} {} ({} entries)",
            "Section".bold(),
            i.to_string().bold(),
            section.kind.name().yellow(),
            section.rows.len()
        );

        match section.kind {
            BlockKind::Instructions => {
                let instructions = section.instructions()?;
                for op in [
                    OpCode::LoadWeight,
                    OpCode::MatMulNoAcc,
                    OpCode::MatMulAcc,
                    OpCode::ActivateSignedSigmoid,
                    OpCode::Sync,
                ] {
                    let count = instructions.iter().filter(|i| i.op() == op).count();
                    println!("  {}: {}", format!("{:?}", op).cyan(), count);
                }
            }
            BlockKind::Results => {
                for row in &section.rows {
                    println!("  {}: {:?}", "Descriptor".cyan(), row);
                }
            }
            BlockKind::Inputs | BlockKind::Weights => {
                let width = section.rows.first().map(Vec::len).unwrap_or(0);
                println!("  {}: {}", "Row width".cyan(), width);
            }
        }
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("{}: {}", "Error".red(), e);
        std::process::exit(1);
    }
}
