//! JSON-lines event files.
//!
//! One event per line:
//!
//! ```text
//! {"raw": [{"energy": 1200.0}, ...], "calib": [{"energy": 640.5, "time": 0.3}, ...]}
//! ```
//!
//! Either source may be `null` or absent. Blank lines are skipped.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::Path;
use towerslope_core::TowerInfo;

/// Both tower sources of one event, index-aligned by channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TowerEvent {
    /// Raw ADC towers.
    #[serde(default)]
    pub raw: Option<Vec<TowerInfo>>,
    /// Calibrated energy towers.
    #[serde(default)]
    pub calib: Option<Vec<TowerInfo>>,
}

impl TowerEvent {
    /// Event with both sources present.
    #[must_use]
    pub fn new(raw: Vec<TowerInfo>, calib: Vec<TowerInfo>) -> Self {
        Self {
            raw: Some(raw),
            calib: Some(calib),
        }
    }

    /// Raw source as a slice.
    #[must_use]
    pub fn raw(&self) -> Option<&[TowerInfo]> {
        self.raw.as_deref()
    }

    /// Calibrated source as a slice.
    #[must_use]
    pub fn calib(&self) -> Option<&[TowerInfo]> {
        self.calib.as_deref()
    }
}

/// Streaming reader over a JSON-lines event file.
pub struct EventFileReader<R> {
    lines: Lines<R>,
    line: usize,
}

impl EventFileReader<BufReader<File>> {
    /// Opens an event file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EventFileReader<R> {
    /// Wraps any buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }

    /// Number of lines consumed so far.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for EventFileReader<R> {
    type Item = Result<TowerEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = match self.lines.next()? {
                Ok(text) => text,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;
            if text.trim().is_empty() {
                continue;
            }
            let line = self.line;
            return Some(
                serde_json::from_str(&text).map_err(|source| Error::EventLine { line, source }),
            );
        }
    }
}

/// Writes `events` as JSON lines.
///
/// # Errors
/// Returns an error if serialization or the write fails.
pub fn write_events<'a, W, I>(mut writer: W, events: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a TowerEvent>,
{
    for event in events {
        serde_json::to_writer(&mut writer, event).map_err(std::io::Error::from)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
