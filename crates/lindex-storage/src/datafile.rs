//! Data-file interface: append-only, newline-delimited records.
//!
//! The engine treats the data file as opaque record storage. Offsets
//! handed to the tree point at the first byte of a record body, never at
//! the newline preceding it.

use lindex_common::layout::MAX_RECORD_LEN;
use lindex_common::Result;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Handle on the record-bearing text file.
///
/// Files are opened per call; the engine owns its files exclusively, so
/// there is no handle to keep warm.
pub struct DataFile {
    path: PathBuf,
}

impl DataFile {
    /// Wraps a data-file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the data-file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Iterates over `(offset, record)` pairs in file order.
    ///
    /// Offsets are the byte position of each line's first character; the
    /// first record sits at offset 0. Trailing newlines are stripped from
    /// the yielded records.
    pub fn records(&self) -> Result<Records> {
        let file = File::open(&self.path)?;
        Ok(Records {
            reader: BufReader::new(file),
            offset: 0,
        })
    }

    /// Appends a record and returns the offset of its first byte.
    ///
    /// The record is written as `"\n" + record`, so the returned offset is
    /// one past the previous end-of-file.
    pub fn append(&self, record: &str) -> Result<i64> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let end = file.seek(SeekFrom::End(0))?;
        file.write_all(b"\n")?;
        file.write_all(record.as_bytes())?;
        file.sync_all()?;

        Ok(end as i64 + 1)
    }

    /// Materializes the record starting at `offset`: the bytes up to the
    /// next newline, bounded by the maximum record length.
    pub fn read_at(&self, offset: i64) -> Result<String> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset as u64))?;

        let mut buf = Vec::with_capacity(MAX_RECORD_LEN);
        file.take(MAX_RECORD_LEN as u64).read_to_end(&mut buf)?;

        let end = buf.iter().position(|&b| b == b'\n').unwrap_or(buf.len());
        Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
    }
}

/// Iterator over the records of a data file.
pub struct Records {
    reader: BufReader<File>,
    offset: u64,
}

impl Iterator for Records {
    type Item = Result<(i64, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(n) => {
                let offset = self.offset as i64;
                self.offset += n as u64;
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Some(Ok((offset, line)))
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}
