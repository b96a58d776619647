//! Note chunking.
//!
//! Whitespace runs collapse to single spaces, then the text is cut into
//! fixed-size character windows that overlap by a fixed amount. Windows are
//! counted in `char`s, so multi-byte text never splits inside a code point.

use studyplan_config::ContextConfig;

/// A chunk of a pasted note, ready to be indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// `"{source}#{snippet}.{chunk}"`, both 1-based
    pub id: String,
    pub path: String,
    pub text: String,
}

/// Splits note snippets into overlapping windows.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_chars: usize,
    overlap: usize,
    source_name: String,
}

impl Chunker {
    /// `chunk_chars` is raised to at least 1 and `overlap` is kept below it.
    pub fn new(chunk_chars: usize, overlap: usize, source_name: impl Into<String>) -> Self {
        let chunk_chars = chunk_chars.max(1);
        Self {
            chunk_chars,
            overlap: overlap.min(chunk_chars - 1),
            source_name: source_name.into(),
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.chunk_chars, config.chunk_overlap, &config.source_name)
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Split one snippet into windows.
    pub fn split(&self, text: &str) -> Vec<String> {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let chars: Vec<char> = collapsed.chars().collect();
        let step = self.chunk_chars - self.overlap;

        let mut windows = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.chunk_chars).min(chars.len());
            let window: String = chars[start..end].iter().collect();
            if !window.trim().is_empty() {
                windows.push(window);
            }
            start += step;
        }
        windows
    }

    /// Chunk every snippet and assign ids.
    pub fn chunk_all(&self, snippets: &[String]) -> Vec<Chunk> {
        snippets
            .iter()
            .enumerate()
            .flat_map(|(i, snippet)| {
                self.split(snippet)
                    .into_iter()
                    .enumerate()
                    .map(move |(j, text)| Chunk {
                        id: format!("{}#{}.{}", self.source_name, i + 1, j + 1),
                        path: self.source_name.clone(),
                        text,
                    })
            })
            .collect()
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self::from_config(&ContextConfig::default())
    }
}
