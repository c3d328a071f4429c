//! Ordered candidate URL worklist.
//!
//! Scanned front to back. Appends never reorder or drop existing entries and
//! skip URLs already present, so the scan terminates once parsing stops
//! producing new URLs.

/// Ordered, duplicate-free list of candidate download URLs.
#[derive(Debug, Clone, Default)]
pub struct CandidateList {
    urls: Vec<String>,
    cursor: usize,
}

impl CandidateList {
    /// Creates a worklist seeded with `urls` (duplicates dropped, order kept).
    #[must_use]
    pub fn new(urls: impl IntoIterator<Item = String>) -> Self {
        let mut list = Self::default();
        for url in urls {
            list.push_unique(url);
        }
        list
    }

    /// Appends `url` unless already present. Returns true when appended.
    pub fn push_unique(&mut self, url: String) -> bool {
        if self.contains(&url) {
            return false;
        }
        self.urls.push(url);
        true
    }

    /// Appends every URL not already present. Returns how many were added.
    pub fn extend_unique(&mut self, urls: impl IntoIterator<Item = String>) -> usize {
        urls.into_iter()
            .filter(|url| self.push_unique(url.clone()))
            .count()
    }

    /// Inserts `urls` ahead of every untried entry, in the given order.
    ///
    /// Only used before the scan starts, for URLs carrying live tokens from
    /// the probe page. Entries already in the list keep their position.
    pub fn prepend_unique(&mut self, urls: impl IntoIterator<Item = String>) -> usize {
        let mut fresh: Vec<String> = Vec::new();
        for url in urls {
            if !self.contains(&url) && !fresh.contains(&url) {
                fresh.push(url);
            }
        }
        let added = fresh.len();
        let tail = self.urls.split_off(self.cursor);
        self.urls.extend(fresh);
        self.urls.extend(tail);
        added
    }

    /// Returns the next untried URL and advances the cursor.
    pub fn next_candidate(&mut self) -> Option<String> {
        let url = self.urls.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(url)
    }

    /// Returns true if `url` is anywhere in the list (tried or not).
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.urls.iter().any(|existing| existing == url)
    }

    /// Total number of URLs, tried or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Returns true when the list holds no URLs at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Number of URLs not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.urls.len() - self.cursor
    }

    /// All URLs in trial order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.urls
    }
}
