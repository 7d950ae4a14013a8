use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::fmt::MakeWriter;

/// Append-only log file for the file layer; falls back to stderr when the file
/// cannot be opened.
pub struct FileWriter {
    path: PathBuf,
    file: Option<File>,
}

impl FileWriter {
    pub fn new(path: PathBuf) -> Self {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(err) = std::fs::create_dir_all(parent) {
                eprintln!(
                    "e2e-forge: cannot create log directory {}: {}",
                    parent.display(),
                    err
                );
            }
        }
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(file),
            Err(err) => {
                eprintln!("e2e-forge: cannot open log file {}: {}", path.display(), err);
                None
            }
        };
        Self { path, file }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl<'a> MakeWriter<'a> for FileWriter {
    type Writer = Box<dyn Write + Send + Sync + 'a>;

    fn make_writer(&'a self) -> Self::Writer {
        match self.file.as_ref().map(File::try_clone) {
            Some(Ok(file)) => Box::new(file),
            _ => Box::new(std::io::stderr()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_writer_creates_parent_and_appends() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("run.log");
        let writer = FileWriter::new(path.clone());

        writer.make_writer().write_all(b"first\n").unwrap();
        writer.make_writer().write_all(b"second\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
        assert_eq!(writer.path(), &path);
    }
}
