//! Parts read from a zip container.
//!
//! Entry names are matched case-insensitively. A part may also be stored
//! interleaved as `name/[0].piece`, `name/[1].piece`, ..., `name/[n].last.piece`;
//! the pieces are concatenated in index order.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use zip::ZipArchive;

use super::{normalize_part_name, Part, PartReader};
use crate::error::{Error, Result};

lazy_static! {
    /// Interleaved piece entry: `<part>/[<index>].piece` or `<part>/[<index>].last.piece`
    static ref RE_PIECE: Regex = Regex::new(r"^(.+)/\[(\d+)\](\.last)?\.piece$").unwrap();
}

/// A package backed by a zip archive.
pub struct ZipPackage<R: Read + Seek> {
    archive: ZipArchive<R>,
    entries: HashMap<String, String>,
    pieces: HashMap<String, Vec<(u32, String)>>,
}

impl ZipPackage<BufReader<File>> {
    /// Open a zip container on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> ZipPackage<R> {
    /// Wrap any seekable reader holding a zip archive.
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;

        let mut entries = HashMap::new();
        let mut pieces: HashMap<String, Vec<(u32, String)>> = HashMap::new();
        for raw in archive.file_names() {
            if let Some(caps) = RE_PIECE.captures(raw) {
                let index: u32 = match caps[2].parse() {
                    Ok(index) => index,
                    Err(_) => continue,
                };
                let logical = normalize_part_name(&caps[1]).to_lowercase();
                pieces.entry(logical).or_default().push((index, raw.to_string()));
            } else {
                entries.insert(normalize_part_name(raw).to_lowercase(), raw.to_string());
            }
        }
        for list in pieces.values_mut() {
            list.sort_by_key(|(index, _)| *index);
        }

        log::debug!(
            "opened zip package with {} entries ({} interleaved parts)",
            entries.len(),
            pieces.len()
        );

        Ok(Self {
            archive,
            entries,
            pieces,
        })
    }

    fn read_entry(&mut self, raw_name: &str, out: &mut Vec<u8>) -> Result<()> {
        let mut file = self.archive.by_name(raw_name)?;
        file.read_to_end(out)?;
        Ok(())
    }
}

impl<R: Read + Seek> PartReader for ZipPackage<R> {
    fn read_part(&mut self, name: &str) -> Result<Part> {
        let normalized = normalize_part_name(name);
        let key = normalized.to_lowercase();
        let mut data = Vec::new();

        if let Some(raw) = self.entries.get(&key).cloned() {
            self.read_entry(&raw, &mut data)?;
        } else if let Some(list) = self.pieces.get(&key).cloned() {
            for (_, raw) in &list {
                self.read_entry(raw, &mut data)?;
            }
        } else {
            return Err(Error::PartNotFound(name.to_string()));
        }

        Ok(Part {
            name: normalized,
            data,
        })
    }

    fn has_part(&mut self, name: &str) -> bool {
        let key = normalize_part_name(name).to_lowercase();
        self.entries.contains_key(&key) || self.pieces.contains_key(&key)
    }
}
