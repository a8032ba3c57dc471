//! On-disk store files
//!
//! Exactly one of these exists in `data_dir` at a time:
//! ```text
//! pokedex.dat   Normal      PKDX record stream
//! pokedex.huf   Compressed  HUF1 container of the record stream
//! pokedex.lzw   Compressed  LZW1 container of the record stream
//! pokedex.enc   Encrypted   PKC1 container of the record stream
//! ```
//! Every file is written under a temporary name, synced, then renamed over
//! the target.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::compress::CompressionKind;
use crate::crypto::{self, CipherMethod};
use crate::error::Result;
use crate::record::{codec, Record};

use super::state::ModeKind;

const STEM: &str = "pokedex";
const OPEN_EXT: &str = "dat";
const SEALED_EXT: &str = "enc";

/// Directory holding sort runs
pub const TMP_DIR: &str = "tmp";

/// What `open` found on disk
#[derive(Debug)]
pub enum Persisted {
    Empty,
    Normal(Vec<Record>),
    Compressed(CompressionKind, Vec<u8>),
    Encrypted(CipherMethod, Vec<u8>),
}

/// Store file for a mode
pub fn path_for(dir: &Path, mode: ModeKind) -> PathBuf {
    let ext = match mode {
        ModeKind::Normal => OPEN_EXT,
        ModeKind::Compressed(kind) => kind.file_extension(),
        ModeKind::Encrypted(_) => SEALED_EXT,
    };
    dir.join(format!("{}.{}", STEM, ext))
}

fn candidates(dir: &Path) -> Vec<PathBuf> {
    let mut paths = vec![dir.join(format!("{}.{}", STEM, SEALED_EXT))];
    paths.extend(
        CompressionKind::ALL
            .into_iter()
            .map(|kind| path_for(dir, ModeKind::Compressed(kind))),
    );
    paths.push(path_for(dir, ModeKind::Normal));
    paths
}

/// Read whichever store file exists
///
/// Sealed files take precedence over `pokedex.dat` if an interrupted
/// transition left two behind.
pub fn detect(dir: &Path) -> Result<Persisted> {
    let present: Vec<PathBuf> = candidates(dir).into_iter().filter(|p| p.exists()).collect();
    if present.len() > 1 {
        warn!(files = ?present, "Several store files present, using the first");
    }
    let Some(path) = present.first() else {
        return Ok(Persisted::Empty);
    };

    let bytes = fs::read(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Reading store file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();

    if ext == SEALED_EXT {
        let method = crypto::sealed_method(&bytes)?;
        return Ok(Persisted::Encrypted(method, bytes));
    }
    if let Some(kind) = CompressionKind::ALL
        .into_iter()
        .find(|k| k.file_extension() == ext)
    {
        return Ok(Persisted::Compressed(kind, bytes));
    }
    Ok(Persisted::Normal(codec::decode(&bytes)?))
}

/// Persist `bytes` as the store file of `mode` and drop the other files
pub fn write(dir: &Path, mode: ModeKind, bytes: &[u8]) -> Result<()> {
    let target = path_for(dir, mode);
    write_atomic(&target, bytes)?;
    for other in candidates(dir) {
        if other != target && other.exists() {
            fs::remove_file(&other)?;
        }
    }
    Ok(())
}

fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = target.with_extension("partial");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, target)?;
    Ok(())
}
