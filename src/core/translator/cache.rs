use std::collections::HashMap;
use chrono::{DateTime, Utc};

/// Cache identity of a translation: source text plus target language code.
///
/// The two parts are kept as separate fields, so no text/code split can
/// collide with another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    text: String,
    lang_code: String,
}

impl CacheKey {
    pub fn new(text: &str, lang_code: &str) -> Self {
        Self {
            text: text.to_string(),
            lang_code: lang_code.to_string(),
        }
    }

    /// Short digest for log lines, so source text never reaches the logs
    pub fn fingerprint(&self) -> String {
        let mut data = Vec::with_capacity(self.text.len() + self.lang_code.len() + 9);
        data.extend_from_slice(&(self.text.len() as u64).to_le_bytes());
        data.extend_from_slice(self.text.as_bytes());
        data.push(0);
        data.extend_from_slice(self.lang_code.as_bytes());
        hex::encode(&md5::compute(data).0[..6])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub translated_text: String,
    pub created_at: DateTime<Utc>,
}

/// In-memory translation store.
///
/// Unbounded unless constructed with a capacity; with a capacity the
/// oldest entry (by `created_at`) is evicted to make room for a new key.
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: HashMap<CacheKey, CacheEntry>,
    max_entries: Option<usize>,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(max_entries: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<&str> {
        self.entries.get(key).map(|entry| entry.translated_text.as_str())
    }

    /// Insert or overwrite; last write wins
    pub fn put(&mut self, key: CacheKey, translated_text: impl Into<String>) {
        if !self.entries.contains_key(&key) {
            self.make_room();
        }
        let entry = CacheEntry {
            key: key.clone(),
            translated_text: translated_text.into(),
            created_at: Utc::now(),
        };
        self.entries.insert(key, entry);
    }

    fn make_room(&mut self) {
        let Some(limit) = self.max_entries else {
            return;
        };
        while self.entries.len() >= limit.max(1) {
            let oldest = self
                .entries
                .values()
                .min_by_key(|entry| entry.created_at)
                .map(|entry| entry.key.clone());
            match oldest {
                Some(key) => {
                    tracing::debug!("[TranslationCache] Evicting {}", key.fingerprint());
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
