use env_logger::Target;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default log location when neither `--log-file` nor settings name one.
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("uvm")
        .join("uvm.log")
}

/// Initialise logging.
///
/// The wizard owns the terminal, so logs are written to a file. If the file
/// cannot be created (permissions, readonly FS, etc.) we fall back to stderr.
/// `RUST_LOG` overrides the default `info` level.
pub fn init_with(log_file: Option<PathBuf>) {
    let path = log_file.unwrap_or_else(default_log_path);
    let target = open_log_target(&path).unwrap_or(Target::Stderr);

    let _ = env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(target)
        .try_init();
}

fn open_log_target(path: &Path) -> io::Result<Target> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(Target::Pipe(Box::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn log_target_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("uvm.log");
        assert!(open_log_target(&path).is_ok());
        assert!(path.exists());
    }
}
