use anyhow::{Context, Result};
use clap::Parser;
use heck::ToUpperCamelCase;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wasm2cs::{transpile, TranspileOptions};

/// wasm2cs — WebAssembly to C# transpiler.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Input WebAssembly binary (.wasm)
    input: PathBuf,

    /// Output C# source file
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Module path of the generated code, `/`-separated
    #[arg(long, default_value = "wasm")]
    namespace: String,

    /// Name of the generated class (defaults to the input file stem)
    #[arg(long = "class")]
    class: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn container(&self) -> String {
        self.class
            .clone()
            .unwrap_or_else(|| default_container(&self.input))
    }
}

fn default_container(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_upper_camel_case())
        .unwrap_or_default();
    if stem.is_empty() {
        TranspileOptions::default().container
    } else {
        stem
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    info!(input = %cli.input.display(), "transpiling");

    let wasm_bytes =
        fs::read(&cli.input).with_context(|| format!("failed to read {}", cli.input.display()))?;

    let options = TranspileOptions {
        module_path: cli.namespace.clone(),
        container: cli.container(),
    };

    let source = transpile(&wasm_bytes, &options)
        .with_context(|| format!("failed to transpile {}", cli.input.display()))?;

    if let Some(output_path) = &cli.output {
        fs::write(output_path, &source)
            .with_context(|| format!("failed to write {}", output_path.display()))?;
        info!(output = %output_path.display(), "wrote C# source");
    } else {
        print!("{}", source);
    }

    Ok(())
}
