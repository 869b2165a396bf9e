//! Text export of built matrices in the explicit `.tra` layout.
//!
//! ```text
//! 3 3
//! 0 1 0.4
//! 0 2 0.6
//! 1 1 1
//! ```
//!
//! Nondeterministic matrices add the local choice index after the source and,
//! for labelled choice-rows, the action index at the end of the line.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, info};

use crate::error::Result;
use crate::matrix::SparseMatrix;
use crate::nondet::NdSparseMatrix;

/// Where exported lines go.
#[derive(Debug)]
pub enum ExportTarget {
    File(BufWriter<File>),
    /// Each line is emitted as an `info` log record.
    Log,
}

impl ExportTarget {
    /// Creates (or truncates) the file at `path`.
    pub fn file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        debug!("exporting to {}", path.as_ref().display());
        Ok(ExportTarget::File(BufWriter::new(file)))
    }

    fn line(&mut self, line: std::fmt::Arguments<'_>) -> Result<()> {
        match self {
            ExportTarget::File(w) => writeln!(w, "{}", line)?,
            ExportTarget::Log => info!("{}", line),
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let ExportTarget::File(w) = self {
            w.flush()?;
        }
        Ok(())
    }
}

/// Writes `matrix` as a header line `"<n> <nnz>"` followed by one
/// `"<src> <dst> <weight>"` line per entry, in row order.
pub fn export_matrix(matrix: &SparseMatrix, target: &mut ExportTarget) -> Result<()> {
    target.line(format_args!("{} {}", matrix.num_rows(), matrix.nnz()))?;
    for src in 0..matrix.num_rows() {
        for (dst, w) in matrix.row_unchecked(src) {
            target.line(format_args!("{} {} {}", src, dst, w))?;
        }
    }
    target.flush()
}

/// Writes `matrix` as a header line `"<n> <choices> <nnz>"` followed by one
/// `"<src> <choice> <dst> <weight>[ <action>]"` line per entry.
pub fn export_nd_matrix(matrix: &NdSparseMatrix, target: &mut ExportTarget) -> Result<()> {
    target.line(format_args!(
        "{} {} {}",
        matrix.num_states(),
        matrix.num_choice_rows(),
        matrix.nnz()
    ))?;
    for src in 0..matrix.num_states() {
        for k in 0..matrix.num_choices(src)? {
            let action = matrix.choice_action(src, k)?;
            for (dst, w) in matrix.choice(src, k)? {
                match action {
                    Some(a) => target.line(format_args!("{} {} {} {} {}", src, k, dst, w, a))?,
                    None => target.line(format_args!("{} {} {} {}", src, k, dst, w))?,
                }
            }
        }
    }
    target.flush()
}
