#[macro_use]
extern crate log;

use std::{fs, path::PathBuf, process::ExitCode, time::Instant};

use anyhow::{Context, Result};
use clap::Parser;
use nscript::{
    builder::{BuildOptions, LoopControlCheck},
    codec::{encode_with_options, EncodeOptions},
    compile_source, display_error,
};

/// Builds the syntax tree of an nscript file and optionally writes its binary encoding
#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// The script to build
    file: PathBuf,

    /// Write the encoded tree to this file
    #[arg(short, long)]
    encode: Option<PathBuf>,

    /// Keep source positions in the encoded tree
    #[arg(long)]
    positions: bool,

    /// Report `break`/`continue` outside a loop as a warning instead of an error
    #[arg(long)]
    lenient_loops: bool,

    /// Skip the position and kind check over the finished tree
    #[arg(long)]
    no_validate: bool,

    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut logger = pretty_env_logger::formatted_builder();
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    if args.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    debug!("{args:#?}");

    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let file_name = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("<input>")
        .to_string();

    let options = BuildOptions {
        validate_tags: !args.no_validate,
        loop_control: if args.lenient_loops {
            LoopControlCheck::Warn
        } else {
            LoopControlCheck::Error
        },
    };

    let start = Instant::now();
    let compilation = match compile_source(&source, Some(file_name), &options) {
        Ok(compilation) => compilation,
        Err(error) => {
            display_error(&error, &source);
            return Ok(ExitCode::FAILURE);
        }
    };
    info!("Built {} in {:?}", args.file.display(), start.elapsed());

    let program = &compilation.program;
    println!(
        "{} procedure(s), {} command(s), {} event handler(s), {} comment(s), {} metadata key(s)",
        program.procedures.len(),
        program.commands.len(),
        program.events.len(),
        program.comment_count(),
        compilation.file_metadata.len(),
    );

    if let Err(errors) = &compilation.result {
        for error in errors.errors() {
            display_error(error, &source);
        }
        eprintln!("{} error(s) found", errors.len());
        return Ok(ExitCode::FAILURE);
    }

    if let Some(out) = &args.encode {
        let bytes = encode_with_options(
            program,
            EncodeOptions {
                include_positions: args.positions,
            },
        );
        fs::write(out, &bytes).with_context(|| format!("failed to write {}", out.display()))?;
        info!("Wrote {} bytes to {}", bytes.len(), out.display());
    }

    Ok(ExitCode::SUCCESS)
}
