use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::errors::{CountError, CountResult};
use crate::tally::PartialTally;

/// Options applied while splitting a keyword file into entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordOptions {
    pub trim: bool,
    pub skip_blank: bool,
}

/// The ordered keyword list of a run.
///
/// Entries keep the exact text they were loaded with and define the report order.
/// Entries with identical text share one tally slot. Each slot holds the
/// lower-cased pattern that is searched for in lower-cased lines.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    entries: Vec<String>,
    entry_slots: Vec<usize>,
    patterns: Vec<String>,
}

impl KeywordSet {
    /// Builds a set from keyword entries in list order
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries = Vec::new();
        let mut entry_slots = Vec::new();
        let mut patterns = Vec::new();
        let mut slot_of: HashMap<String, usize> = HashMap::new();

        for keyword in keywords {
            let keyword = keyword.into();
            let slot = *slot_of.entry(keyword.clone()).or_insert_with(|| {
                patterns.push(keyword.to_lowercase());
                patterns.len() - 1
            });
            entries.push(keyword);
            entry_slots.push(slot);
        }

        Self {
            entries,
            entry_slots,
            patterns,
        }
    }

    /// Splits `text` into one keyword per line
    pub fn parse(text: &str, options: KeywordOptions) -> Self {
        let keywords = text
            .lines()
            .map(|line| if options.trim { line.trim() } else { line })
            .filter(|line| !(options.skip_blank && line.trim().is_empty()));
        Self::new(keywords)
    }

    /// Reads the keyword file at `path`
    pub fn load(path: &Path, options: KeywordOptions) -> CountResult<Self> {
        let bytes = fs::read(path).map_err(|e| CountError::keyword_file(path, e))?;
        let set = Self::parse(&String::from_utf8_lossy(&bytes), options);
        debug!(
            "Loaded {} keywords ({} distinct) from {}",
            set.len(),
            set.slot_count(),
            path.display()
        );
        Ok(set)
    }

    /// Number of entries in the list, duplicates included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct keywords, i.e. tally slots
    pub fn slot_count(&self) -> usize {
        self.patterns.len()
    }

    /// Entries in list order, each paired with its tally slot
    pub fn entries(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries
            .iter()
            .map(String::as_str)
            .zip(self.entry_slots.iter().copied())
    }

    /// Counts every keyword in `line`, ignoring case.
    ///
    /// Occurrences are non-overlapping and scanned left to right, so `"aa"` is
    /// found once in `"aaa"`. An empty keyword matches at every character boundary.
    pub fn count_line(&self, line: &str) -> PartialTally {
        let normalized = line.to_lowercase();
        let counts = self
            .patterns
            .iter()
            .map(|pattern| normalized.matches(pattern.as_str()).count() as u64)
            .collect();
        PartialTally::from_counts(counts)
    }
}
