//! Run files
//!
//! A run is a sorted sequence of tagged records on disk:
//! `[len: u32][bincode((position, Record))]` repeated.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{PokedexError, Result};

use super::Tagged;

/// A finished run file
#[derive(Debug)]
pub struct Run {
    pub path: PathBuf,
    pub len: usize,
}

impl Run {
    pub fn remove(self) -> Result<()> {
        fs::remove_file(&self.path)?;
        Ok(())
    }
}

/// Appends tagged records to a run file
pub struct RunWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    len: usize,
}

impl RunWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            len: 0,
        })
    }

    pub fn push(&mut self, item: &Tagged) -> Result<()> {
        let body = bincode::serialize(item)?;
        self.writer.write_all(&(body.len() as u32).to_le_bytes())?;
        self.writer.write_all(&body)?;
        self.len += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn finish(mut self) -> Result<Run> {
        self.writer.flush()?;
        Ok(Run {
            path: self.path,
            len: self.len,
        })
    }
}

/// Streams tagged records back out of a run file
pub struct RunReader {
    reader: BufReader<File>,
}

impl RunReader {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
        })
    }

    fn read_next(&mut self) -> Result<Option<Tagged>> {
        let mut len = [0u8; 4];
        match self.reader.read_exact(&mut len) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let mut body = vec![0u8; u32::from_le_bytes(len) as usize];
        self.reader.read_exact(&mut body).map_err(|e| {
            PokedexError::CorruptStream(format!("truncated run entry: {}", e))
        })?;
        Ok(Some(bincode::deserialize(&body)?))
    }
}

impl Iterator for RunReader {
    type Item = Result<Tagged>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next().transpose()
    }
}
