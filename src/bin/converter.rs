//! MT103 Converter - CLI tool for converting between MT103 and pacs.008.

use clap::Parser;
use mt103_converter::{convert_forward, convert_reverse, Error, Format, Result};
use std::fs::File;
use std::io::{self, Read, Write};

#[derive(Parser)]
#[command(name = "mt103_convert")]
#[command(about = "Convert payment messages between MT103 and pacs.008", long_about = None)]
struct Cli {
    /// Input file path (or stdin if not provided)
    #[arg(short, long)]
    input: Option<String>,

    /// Input format (mt103, pacs008)
    #[arg(long = "input-format")]
    input_format: String,

    /// Output format (mt103, pacs008)
    #[arg(long = "output-format")]
    output_format: String,

    /// Output file path (or stdout if not provided)
    #[arg(short, long)]
    output: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let input_format = cli.input_format.parse::<Format>()?;
    let output_format = cli.output_format.parse::<Format>()?;

    let raw = if let Some(ref input_path) = cli.input {
        let mut content = String::new();
        File::open(input_path)?.read_to_string(&mut content)?;
        content
    } else {
        let mut content = String::new();
        io::stdin().read_to_string(&mut content)?;
        content
    };

    let (payload, errors) = match (input_format, output_format) {
        (Format::Mt103, Format::Pacs008) => {
            let outcome = convert_forward(&raw);
            (outcome.xml, outcome.errors)
        }
        (Format::Pacs008, Format::Mt103) => {
            let outcome = convert_reverse(&raw);
            (outcome.mt103, outcome.errors)
        }
        _ => {
            return Err(Error::InvalidFormat(
                "input and output formats must differ (mt103 -> pacs008 or pacs008 -> mt103)"
                    .to_string(),
            ))
        }
    };

    match payload {
        Some(payload) => {
            if let Some(ref output_path) = cli.output {
                File::create(output_path)?.write_all(payload.as_bytes())?;
            } else {
                io::stdout().write_all(payload.as_bytes())?;
            }
            Ok(())
        }
        None => {
            let mut message = String::from("Conversion failed:");
            for error in &errors {
                message.push_str("\n• ");
                message.push_str(error);
            }
            Err(Error::ConversionError(message))
        }
    }
}
