//! Output file naming and scoped cleanup

use log::{debug, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Every file the full pipeline may produce for one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub preprocessed: PathBuf,
    pub assembly: PathBuf,
    pub object: PathBuf,
    pub executable: PathBuf,
}

impl OutputPaths {
    /// Names are derived by byte surgery on the input name, so `prog.c` gives
    /// `prog.i`, `prog.s`, `prog.o` and `prog`. Only one-character extensions
    /// come out right.
    pub fn for_input(input: &Path) -> io::Result<Self> {
        let name = input.to_str().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("input path '{}' is not valid UTF-8", input.display()),
            )
        })?;
        if name.len() < 3 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("input file name '{}' is too short to derive output names", name),
            ));
        }

        let paths = OutputPaths {
            preprocessed: replace_last_byte(name, b'i')?,
            assembly: replace_last_byte(name, b's')?,
            object: replace_last_byte(name, b'o')?,
            executable: drop_last_bytes(name, 2)?,
        };
        // an intermediate guard must never own the input itself
        if [&paths.preprocessed, &paths.assembly, &paths.object].iter().any(|p| p.as_path() == input) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("input file '{}' would be overwritten by an intermediate output", name),
            ));
        }
        Ok(paths)
    }
}

fn replace_last_byte(name: &str, byte: u8) -> io::Result<PathBuf> {
    let mut bytes = name.as_bytes().to_vec();
    if let Some(last) = bytes.last_mut() {
        *last = byte;
    }
    into_path(bytes)
}

fn drop_last_bytes(name: &str, count: usize) -> io::Result<PathBuf> {
    let bytes = name.as_bytes();
    into_path(bytes[..bytes.len().saturating_sub(count)].to_vec())
}

fn into_path(bytes: Vec<u8>) -> io::Result<PathBuf> {
    String::from_utf8(bytes)
        .map(PathBuf::from)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
}

/// A file that is deleted when the guard drops, unless it was kept
#[derive(Debug)]
pub struct ScopedFile {
    path: PathBuf,
    keep: bool,
}

impl ScopedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ScopedFile {
            path: path.into(),
            keep: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarm the guard and hand back the path
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ScopedFile {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("removed {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("could not remove {}: {}", self.path.display(), e),
        }
    }
}
