//! The link driver: reads every input object file into the database, runs
//! the link passes, and writes the output executable.

use std::fs;
use std::path::Path;

use log::{error, info, warn};

use crate::error::Error;
use crate::hunk::reader::read_object;
use crate::hunk::writer::write_executable;
use crate::link::database::Database;
use crate::link::engine;

/// What a whole link run did. The CLI folds this into its exit code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// Units decoded successfully.
    pub units: usize,
    /// Input files abandoned because of a decode error.
    pub failed_files: usize,
    /// References to symbols no unit defines.
    pub undefined_symbols: usize,
    /// EXT records or references with types this linker does not handle.
    pub unsupported_symbols: usize,
    /// Hunks in the output executable.
    pub output_hunks: usize,
}

impl LinkReport {
    /// True when every input decoded cleanly and nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.failed_files == 0 && self.unsupported_symbols == 0
    }
}

/// Link `inputs` into the executable at `output`.
///
/// A file that fails to decode is reported and skipped; the remaining files
/// still link. I/O failures are fatal.
pub fn link_files<P: AsRef<Path>>(inputs: &[P], output: &Path) -> Result<LinkReport, Error> {
    let mut db = Database::new();
    let mut report = LinkReport::default();

    for input in inputs {
        let path = input.as_ref();
        info!("reading object file {}", path.display());
        let bytes = fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match read_object(&bytes, &mut db) {
            Ok(summary) => {
                info!(
                    "unit '{}': {} hunks, {} symbols",
                    summary.name, summary.hunks, summary.symbols
                );
                report.units += 1;
                report.unsupported_symbols += summary.unsupported_symbols;
            }
            Err(e) => {
                error!("{}: {e}", path.display());
                report.failed_files += 1;
            }
        }
    }

    if db.is_empty() {
        warn!("no hunks to link, writing an empty executable");
    }

    let (hunks, resolve_report) = engine::link(&mut db);
    report.undefined_symbols = resolve_report.undefined;
    report.unsupported_symbols += resolve_report.unsupported_width;
    report.output_hunks = hunks.len();

    let bytes = write_executable(&hunks);
    info!(
        "writing {} ({} hunks, {} bytes)",
        output.display(),
        hunks.len(),
        bytes.len()
    );
    fs::write(output, bytes).map_err(|source| Error::Io {
        path: output.to_path_buf(),
        source,
    })?;

    Ok(report)
}
