use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
};

use pretty_env_logger::env_logger::{Target, WriteStyle};

/// The filter used when neither `RUST_LOG` nor the config sets one
pub static DEFAULT_FILTER: &str = "info";

/// Initialize the global logger. `RUST_LOG` wins over `level` when set.
///
/// With a `log_file`, every record goes to stderr and is appended to that file.
pub fn init(level: Option<&str>, log_file: Option<&Path>) -> io::Result<()> {
    let mut builder = pretty_env_logger::formatted_timed_builder();

    match std::env::var("RUST_LOG") {
        Ok(filters) => builder.parse_filters(&filters),
        Err(_) => builder.parse_filters(level.unwrap_or(DEFAULT_FILTER)),
    };

    if let Some(path) = log_file {
        builder
            .target(Target::Pipe(Box::new(Tee::open(path)?)))
            .write_style(WriteStyle::Never);
    }

    // A logger may already be installed, e.g. when tests call this repeatedly
    let _ = builder.try_init();

    Ok(())
}

/// Writes everything to stderr and to an append-only log file
struct Tee {
    file: File,
}

impl Tee {
    fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self { file })
    }
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // A closed stderr must not stop the file copy
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_tee_appends_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("app.log");

        Tee::open(&path).unwrap().write_all(b"primera\n").unwrap();
        Tee::open(&path).unwrap().write_all(b"segunda\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "primera\nsegunda\n");
    }

    #[test]
    fn test_unwritable_log_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        assert!(init(None, Some(dir.path())).is_err());
    }
}
