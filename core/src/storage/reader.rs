//! Byte-level record cursor shared by the yaml and json stores.
//!
//! A record starts at a line whose first byte is `-`. The cursor accumulates
//! lines until EOF or the next such boundary; the boundary line is pushed
//! back by seeking backward its own byte length so the next call starts on
//! it. This is deliberately specified at the byte level so it works over any
//! line-oriented stream without language-level pushback.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::StoreError;

pub(crate) struct RecordReader {
    path: PathBuf,
    reader: BufReader<File>,
    position: usize,
    is_eof: bool,
    is_valid_position: bool,
}

impl RecordReader {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(RecordReader {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            position: 0,
            is_eof: false,
            is_valid_position: true,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One-based position of the record most recently returned.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn rewind(&mut self) -> Result<(), StoreError> {
        self.reader
            .seek(SeekFrom::Start(0))
            .map_err(|source| self.io_err(source))?;
        self.position = 0;
        self.is_eof = false;
        self.is_valid_position = true;
        Ok(())
    }

    /// The next raw record, boundary line included, or `None` past the end.
    pub fn next_chunk(&mut self) -> Result<Option<String>, StoreError> {
        if self.is_eof {
            self.is_valid_position = false;
        }

        let mut in_record = false;
        let mut chunk = String::new();
        loop {
            let mut line = String::new();
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|source| self.io_err(source))?;
            if read == 0 {
                self.is_eof = true;
                break;
            }

            let is_boundary = line.as_bytes().first() == Some(&b'-');
            if in_record && is_boundary {
                // Push the boundary line back for the next call.
                self.reader
                    .seek_relative(-(read as i64))
                    .map_err(|source| self.io_err(source))?;
                break;
            }
            if !in_record && is_boundary {
                in_record = true;
            }
            if in_record {
                chunk.push_str(&line);
            }
        }

        if chunk.is_empty() || !self.is_valid_position {
            return Ok(None);
        }
        self.position += 1;
        Ok(Some(chunk))
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
