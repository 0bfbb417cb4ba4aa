use std::io::{self, Write};
use std::path::Path;

use tempfile::{Builder, TempPath};

const PREFIX: &str = "loxrun-";

/// A request's source code on disk.
///
/// The file is removed exactly once: either by [`ScriptFile::remove`], which
/// reports the error, or when the value is dropped on any other path.
#[derive(Debug)]
pub struct ScriptFile {
    path: TempPath,
}

impl ScriptFile {
    pub fn create(dir: Option<&Path>, suffix: &str, code: &str) -> io::Result<Self> {
        let mut builder = Builder::new();
        builder.prefix(PREFIX).suffix(suffix);

        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        file.write_all(code.as_bytes())?;
        file.flush()?;

        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remove(self) -> io::Result<()> {
        self.path.close()
    }
}
