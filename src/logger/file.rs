//! Log file module.

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::Path,
};

/// Represents a log file rolled over once it gets bigger than its
/// maximum size. Rolled over files are suffixed `.1` (most recent) to
/// `.N` (oldest, N being the backup count).
pub type LogFile = FileRotate<AppendCount>;

/// Opens the given log file in append mode. A `max_bytes` of 0 never
/// rolls the file over on size.
pub fn open(path: &Path, max_bytes: u64, backup_count: usize) -> io::Result<LogFile> {
    // the rotating file opens lazily and hides open errors
    OpenOptions::new().create(true).append(true).open(path)?;

    let limit = match usize::try_from(max_bytes) {
        Ok(0) | Err(_) => ContentLimit::None,
        Ok(bytes) => ContentLimit::BytesSurpassed(bytes),
    };

    Ok(FileRotate::new(
        path,
        AppendCount::new(backup_count),
        limit,
        Compression::None,
        #[cfg(unix)]
        None,
    ))
}

/// Writes log records both to the standard error and to a log file.
pub(crate) struct Tee<W: Write> {
    pub file: W,
}

impl<W: Write> Write for Tee<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, io::Write};

    use super::{open, Tee};

    #[test]
    fn test_rotate_on_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mailbot.log");
        let mut file = open(&path, 10, 2).unwrap();

        for _ in 0..4 {
            file.write_all(b"0123456789abcdef\n").unwrap();
        }
        file.flush().unwrap();

        assert!(dir.path().join("mailbot.log.1").exists());
        assert!(!dir.path().join("mailbot.log.3").exists());
        for name in ["mailbot.log", "mailbot.log.1"] {
            let content = fs::read_to_string(dir.path().join(name)).unwrap();
            assert!(content.lines().all(|line| line == "0123456789abcdef"));
        }
    }

    #[test]
    fn test_rotate_at_start_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mailbot.log");
        fs::write(&path, "previous run\n").unwrap();

        let mut file = open(&path, 0, 5).unwrap();
        file.rotate().unwrap();
        file.write_all(b"new run\n").unwrap();
        file.flush().unwrap();

        assert_eq!("new run\n", fs::read_to_string(&path).unwrap());
        assert_eq!(
            "previous run\n",
            fs::read_to_string(dir.path().join("mailbot.log.1")).unwrap()
        );
    }

    #[test]
    fn test_open_keeps_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mailbot.log");
        fs::write(&path, "previous run\n").unwrap();

        let mut file = open(&path, 0, 5).unwrap();
        file.write_all(b"new run\n").unwrap();
        file.flush().unwrap();

        assert_eq!("previous run\nnew run\n", fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn test_open_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open(&dir.path().join("missing").join("mailbot.log"), 0, 5).is_err());
    }

    #[test]
    fn test_tee_writes_to_file() {
        let mut tee = Tee { file: Vec::new() };
        tee.write_all(b"1500000000: INFO: hello\n").unwrap();
        tee.flush().unwrap();
        assert_eq!(b"1500000000: INFO: hello\n".to_vec(), tee.file);
    }
}
