use std::path::PathBuf;
use std::process;

use clap::Parser;

/// AmigaDOS hunk object file linker and inspector
#[derive(Parser)]
#[command(name = "hunklink", version, about)]
struct Cli {
    /// Input object files
    files: Vec<PathBuf>,

    /// Output executable file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show the block structure of each input instead of linking
    #[arg(long)]
    info: bool,

    /// Show additional debug information
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::builder()
        .format_target(false)
        .filter_module("hunklink", level)
        .init();

    if cli.files.is_empty() {
        eprintln!("no input files");
        process::exit(1);
    }

    if cli.info {
        inspect(&cli.files);
        return;
    }

    let Some(output) = &cli.output else {
        eprintln!("an output file is required when linking (use -o)");
        process::exit(1);
    };

    match hunklink::link_files(&cli.files, output) {
        Ok(report) => {
            if report.failed_files > 0 {
                eprintln!("{} input file(s) could not be decoded", report.failed_files);
            }
            if report.undefined_symbols > 0 {
                eprintln!("{} undefined symbol reference(s)", report.undefined_symbols);
            }
            if report.unsupported_symbols > 0 {
                eprintln!(
                    "{} unsupported symbol record(s) skipped",
                    report.unsupported_symbols
                );
            }
            if !report.is_clean() {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}

fn inspect(files: &[PathBuf]) {
    let mut failed = false;
    for path in files {
        let data = match std::fs::read(path) {
            Ok(d) => d,
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                process::exit(1);
            }
        };

        println!("{}:", path.display());
        match hunklink::inspect_file(&data) {
            Ok(lines) => {
                for line in lines {
                    println!("  {line}");
                }
            }
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                failed = true;
            }
        }
    }
    if failed {
        process::exit(1);
    }
}
