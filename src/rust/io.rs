//! Input handling for alignment, annotation and InterProScan files.
//!
//! Every reader in the crate goes through [`open_input`], so any of the
//! inputs may be gzip-compressed or piped in on stdin.

use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Read},
    path::Path,
};

/// Number of bytes niffler inspects to detect a compression format.
const MAGIC_LEN: u64 = 5;

/// Opens a file with automatic compression detection.
///
/// Files shorter than the compression magic are returned as-is, which keeps
/// tiny inputs such as an empty `{}` annotation file readable.
///
/// # Examples
/// ```no_run
/// use annoseek::io::open_maybe_compressed;
/// use std::io::BufRead;
///
/// let reader = open_maybe_compressed("PF07728_hmmalign.sth.gz")?;
/// for line in reader.lines() {
///     let _line = line?;
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn open_maybe_compressed<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;

    if file.metadata()?.len() < MAGIC_LEN {
        return Ok(Box::new(BufReader::new(file)));
    }

    // niffler autodetects gzip/uncompressed
    let (reader, _format) = niffler::get_reader(Box::new(file))
        .with_context(|| format!("cannot decompress {}", path.display()))?;
    Ok(Box::new(BufReader::new(reader)))
}

/// Creates a buffered reader from stdin for pipeline processing.
pub fn stdin_reader() -> Box<dyn BufRead> {
    Box::new(BufReader::new(io::stdin()))
}

/// Opens a path, or stdin when the path is "-".
pub fn open_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path_str = path.as_ref().to_string_lossy();
    if path_str == "-" {
        Ok(stdin_reader())
    } else {
        open_maybe_compressed(path)
    }
}

/// Reads a whole (possibly compressed) input into memory.
pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let mut reader = open_input(path)?;
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .with_context(|| format!("cannot read {}", path.display()))?;
    Ok(content)
}
