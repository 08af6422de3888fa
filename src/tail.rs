// Line tailer for a growing text file
// Yields only complete lines appended after opening; survives truncation and rotation

use std::fs::Metadata;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

/// Identity of an opened file: (device, inode) on unix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileId(u64, u64);

#[cfg(unix)]
fn file_id(meta: &Metadata) -> Option<FileId> {
    use std::os::unix::fs::MetadataExt;
    Some(FileId(meta.dev(), meta.ino()))
}

// No stable identity without unix metadata; only shrinking is detected
#[cfg(not(unix))]
fn file_id(_meta: &Metadata) -> Option<FileId> {
    None
}

/// Follows a file the way `tail -F` does.
///
/// Bytes after the last newline are held back until their newline arrives,
/// so a line the writer has only half flushed is never handed out.
pub struct LineTailer {
    path: PathBuf,
    reader: BufReader<File>,
    /// Identity of the handle being read
    id: Option<FileId>,
    /// Bytes consumed from the current file handle
    offset: u64,
    /// Incomplete trailing line
    partial: Vec<u8>,
}

impl LineTailer {
    /// Open `path` positioned at its current end, skipping existing content.
    pub async fn open_at_end(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).await?;
        let id = file_id(&file.metadata().await?);
        let offset = file.seek(SeekFrom::End(0)).await?;
        Ok(LineTailer {
            path,
            reader: BufReader::new(file),
            id,
            offset,
            partial: Vec::new(),
        })
    }

    /// Open `path` positioned at its start.
    pub async fn open_at_start(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await?;
        let id = file_id(&file.metadata().await?);
        Ok(LineTailer {
            path,
            reader: BufReader::new(file),
            id,
            offset: 0,
            partial: Vec::new(),
        })
    }

    /// Current read position in the file.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Next complete line (including its newline), or `None` if no complete
    /// line is available yet.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let n = self.reader.read_until(b'\n', &mut self.partial).await?;
        self.offset += n as u64;

        if self.partial.last() != Some(&b'\n') {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&self.partial).into_owned();
        self.partial.clear();
        Ok(Some(line))
    }

    /// Reopen from the start if the file at `path` is no longer the one being
    /// read (renamed away and recreated) or is shorter than what we have read
    /// (truncated in place).
    ///
    /// Call only after `next_line` reached the end, so nothing left in the old
    /// file is skipped. A missing path (mid-rotation) is not an error; the
    /// current handle is kept and the check runs again next time.
    pub async fn reopen_if_rotated(&mut self) -> io::Result<bool> {
        let meta = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };
        let replaced = matches!((self.id, file_id(&meta)), (Some(old), Some(new)) if old != new);
        if !replaced && meta.len() >= self.offset {
            return Ok(false);
        }
        let path = self.path.clone();
        *self = LineTailer::open_at_start(path).await?;
        Ok(true)
    }
}
