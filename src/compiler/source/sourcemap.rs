use std::{fmt::Display, path::PathBuf};

use super::{Offset, Source, SourceChar};

/// The SourceMap keeps a table of input source units and the range of the
/// Global Offset which maps to each unit.
///
/// When initially created, the SourceMap has no source code units and the Global
/// Offset watermark is 0.  When a unit is added it is assigned a low Global
/// Offset and the watermark is increased by the size of the unit in bytes.
/// A byte range in the global space therefore maps to exactly one unit, which
/// is how diagnostics are turned back into file, line and column.
#[derive(Debug, Default)]
pub struct SourceMap {
    /// The source units, each owning the range from its low up to but not
    /// including its high.
    map: Vec<SourceMapEntry>,

    /// The upper bound of all the source units currently in the SourceMap.
    offset_high: Offset,
}

impl SourceMap {
    pub fn new() -> SourceMap {
        SourceMap {
            offset_high: Offset(0),
            map: Vec::new(),
        }
    }

    /// Reads the file at `path` and adds it to the map.
    pub fn add_file(&mut self, path: PathBuf) -> Result<(), SourceMapError> {
        let text = std::fs::read_to_string(&path)?;
        self.add_string(&text, path)
    }

    /// Adds an in-memory source unit to the map.  `path` is only used to label
    /// diagnostics.
    pub fn add_string(&mut self, text: &str, path: PathBuf) -> Result<(), SourceMapError> {
        if text.len() >= (u32::MAX - self.offset_high.0) as usize {
            return Err(SourceMapError::FileTooBig);
        }

        let low = self.offset_high;
        self.offset_high += text.len() as u32;
        let high = self.offset_high;

        self.map
            .push(SourceMapEntry::new(low, high, path, text.to_string()));

        Ok(())
    }

    /// Returns the number of entries in the [`SourceMap`]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// If `idx` is less than the number of entries, then this will return
    /// a reference to the entry at position `idx`.  Otherwise, this will
    /// return [`None`].
    pub fn get(&self, idx: usize) -> Option<&SourceMapEntry> {
        self.map.get(idx)
    }

    /// Finds the unit which owns `offset` and converts the offset to a line
    /// and column within that unit.  The end offset of a unit is owned by that
    /// unit so that end of file diagnostics can be located.
    pub fn position(&self, offset: Offset) -> Option<Position> {
        self.map
            .iter()
            .find(|e| e.low <= offset && offset <= e.high)
            .map(|e| e.position(offset))
    }

    /// Returns the line number of `offset`, or 0 if the offset is not mapped.
    pub fn line(&self, offset: Offset) -> u32 {
        self.position(offset).map_or(0, |p| p.line)
    }
}

/// Tracks the assignment of a range within the global offset space
#[derive(Debug)]
pub struct SourceMapEntry {
    low: Offset,
    high: Offset,
    path: PathBuf,
    text: String,

    /// Global offset of the first byte of every line.
    line_starts: Vec<Offset>,
}

impl SourceMapEntry {
    fn new(low: Offset, high: Offset, path: PathBuf, text: String) -> SourceMapEntry {
        let mut line_starts = vec![low];
        for (idx, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(Offset(low.0 + idx as u32 + 1));
            }
        }

        SourceMapEntry {
            low,
            high,
            path,
            text,
            line_starts,
        }
    }

    /// Get the file path for the source code that this entry in the [`SourceMap`]
    /// represents
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Returns the characters of this unit, each paired with its global offset.
    pub fn read(&self) -> Source {
        let chars = self
            .text
            .char_indices()
            .map(|(idx, c)| SourceChar::new(Offset(self.low.0 + idx as u32), c))
            .collect();
        Source::new(chars, self.high)
    }

    fn position(&self, offset: Offset) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        Position {
            path: self.path.clone(),
            line: line as u32 + 1,
            column: offset.0 - self.line_starts[line].0 + 1,
        }
    }
}

/// A human readable location in a source unit.  Lines and columns start at 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.path.display(), self.line, self.column)
    }
}

#[derive(Debug)]
pub enum SourceMapError {
    FileTooBig,
    Io(std::io::Error),
}

impl From<std::io::Error> for SourceMapError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl Display for SourceMapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceMapError::FileTooBig => f.write_str("source file is too big"),
            SourceMapError::Io(e) => write!(f, "{}", e),
        }
    }
}
