//! Output destination for rendered results
//!
//! Renders go to stdout unless `--out` names a file. Logs never go here.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Where rendered output is written.
pub enum Destination {
    Stdout(io::Stdout),
    File(BufWriter<File>),
}

impl Destination {
    /// Open `path` for writing, truncating it, or fall back to stdout.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output file: {}", path.display()))?;
                Ok(Destination::File(BufWriter::new(file)))
            }
            None => Ok(Destination::Stdout(io::stdout())),
        }
    }
}

impl Write for Destination {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Destination::Stdout(out) => out.write(buf),
            Destination::File(out) => out.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Destination::Stdout(out) => out.flush(),
            Destination::File(out) => out.flush(),
        }
    }
}
