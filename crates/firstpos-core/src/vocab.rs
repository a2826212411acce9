//! # Symbol Vocabulary
//!
//! Maps symbols to dense integer indices. Two entries are reserved:
//! [`PAD`] (by convention index 0) and [`UNK`], which stands in for any
//! symbol the vocabulary does not know.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{FirstPosError, Result};

/// Reserved key for the padding entry.
pub const PAD: &str = "pad";

/// Reserved key for the unknown-symbol entry.
pub const UNK: &str = "unk";

/// Immutable symbol-to-index mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    index: HashMap<String, u32>,
    /// Symbols ordered by index, so `symbols[i]` maps to `i`.
    symbols: Vec<String>,
    pad: u32,
    unk: u32,
}

impl Vocabulary {
    /// Build a vocabulary from an explicit mapping.
    ///
    /// Fails if `pad` or `unk` is missing or if the indices are not
    /// exactly `0..N-1`.
    pub fn from_map(index: HashMap<String, u32>) -> Result<Self> {
        let pad = *index.get(PAD).ok_or(FirstPosError::MissingReservedEntry(PAD))?;
        let unk = *index.get(UNK).ok_or(FirstPosError::MissingReservedEntry(UNK))?;

        let mut slots: Vec<Option<String>> = vec![None; index.len()];
        for (symbol, &idx) in &index {
            let slot = slots.get_mut(idx as usize).ok_or_else(|| {
                FirstPosError::SparseVocabulary(format!(
                    "index {idx} of {symbol:?} exceeds {}",
                    index.len() - 1
                ))
            })?;
            if let Some(other) = slot {
                return Err(FirstPosError::SparseVocabulary(format!(
                    "{symbol:?} and {other:?} share index {idx}"
                )));
            }
            *slot = Some(symbol.clone());
        }
        // With N keys in N slots and no collisions every slot is filled.
        let symbols = slots.into_iter().flatten().collect();

        Ok(Self {
            index,
            symbols,
            pad,
            unk,
        })
    }

    /// Build the conventional vocabulary for an alphabet: `pad` at 0, each
    /// distinct character in order from 1, `unk` last.
    pub fn from_alphabet(alphabet: &str) -> Self {
        let mut index = HashMap::new();
        let mut symbols = vec![PAD.to_string()];
        index.insert(PAD.to_string(), 0);

        for c in alphabet.chars() {
            let key = c.to_string();
            if !index.contains_key(&key) {
                index.insert(key.clone(), symbols.len() as u32);
                symbols.push(key);
            }
        }

        let unk = symbols.len() as u32;
        index.insert(UNK.to_string(), unk);
        symbols.push(UNK.to_string());

        Self {
            index,
            symbols,
            pad: 0,
            unk,
        }
    }

    /// Load a vocabulary from a JSON object of `symbol: index` pairs.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let index: HashMap<String, u32> = serde_json::from_str(&content)?;
        let vocab = Self::from_map(index)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            size = vocab.len(),
            "loaded vocabulary"
        );
        Ok(vocab)
    }

    /// Write the vocabulary as a pretty-printed JSON object.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let sorted: std::collections::BTreeMap<&str, u32> =
            self.index.iter().map(|(s, &i)| (s.as_str(), i)).collect();
        std::fs::write(path, serde_json::to_string_pretty(&sorted)?)?;
        Ok(())
    }

    /// Index of a symbol, or the unknown index if absent.
    pub fn lookup(&self, symbol: &str) -> u32 {
        self.index.get(symbol).copied().unwrap_or(self.unk)
    }

    /// Index of a single character, or the unknown index if absent.
    pub fn lookup_char(&self, c: char) -> u32 {
        let mut buf = [0u8; 4];
        self.lookup(c.encode_utf8(&mut buf))
    }

    /// Encode raw text to exactly `len` indices: the first `len`
    /// characters are kept and the rest padded.
    pub fn encode_text(&self, text: &str, len: usize) -> Vec<u32> {
        let mut ids: Vec<u32> = text.chars().take(len).map(|c| self.lookup_char(c)).collect();
        ids.resize(len, self.pad);
        ids
    }

    /// All symbols in index order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn pad_index(&self) -> u32 {
        self.pad
    }

    pub fn unk_index(&self) -> u32 {
        self.unk
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
