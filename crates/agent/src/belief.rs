use serde::Serialize;
use std::collections::HashSet;

/// An atomic fact an agent holds. Identity is the content alone.
#[derive(Debug, Clone, Serialize)]
pub struct Belief {
    pub content: String,
    pub strength: f64,
}

impl Belief {
    pub fn new(content: impl Into<String>, strength: f64) -> Self {
        Self {
            content: content.into(),
            strength,
        }
    }
}

impl PartialEq for Belief {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content
    }
}

impl Eq for Belief {}

impl std::hash::Hash for Belief {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.content.hash(state);
    }
}

/// Monotonic set of beliefs keyed by content, kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct BeliefStore {
    beliefs: Vec<Belief>,
    index: HashSet<String>,
}

impl BeliefStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a belief with strength 1.0. Returns false if the content was already held.
    pub fn add(&mut self, content: impl Into<String>) -> bool {
        self.add_with_strength(content, 1.0)
    }

    pub fn add_with_strength(&mut self, content: impl Into<String>, strength: f64) -> bool {
        let content = content.into();
        if self.index.contains(&content) {
            return false;
        }
        self.index.insert(content.clone());
        self.beliefs.push(Belief::new(content, strength));
        true
    }

    pub fn has(&self, content: &str) -> bool {
        self.index.contains(content)
    }

    pub fn get(&self, content: &str) -> Option<&Belief> {
        if !self.has(content) {
            return None;
        }
        self.beliefs.iter().find(|b| b.content == content)
    }

    /// Owned snapshot, safe to hold while the store keeps changing.
    pub fn all(&self) -> Vec<Belief> {
        self.beliefs.clone()
    }

    pub fn matching<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Belief> + 'a {
        self.beliefs
            .iter()
            .filter(move |b| b.content.starts_with(prefix))
    }

    pub fn count_matching(&self, prefix: &str) -> usize {
        self.matching(prefix).count()
    }

    pub fn len(&self) -> usize {
        self.beliefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beliefs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut store = BeliefStore::new();
        assert!(store.add("video_uploaded(v1, tiktok)"));
        assert!(!store.add("video_uploaded(v1, tiktok)"));
        assert_eq!(store.len(), 1);
        assert!(store.has("video_uploaded(v1, tiktok)"));
    }

    #[test]
    fn test_first_strength_wins() {
        let mut store = BeliefStore::new();
        store.add_with_strength("trend(tiktok)", 0.3);
        store.add_with_strength("trend(tiktok)", 0.9);
        assert_eq!(store.get("trend(tiktok)").map(|b| b.strength), Some(0.3));
    }

    #[test]
    fn test_empty_content_is_valid() {
        let mut store = BeliefStore::new();
        assert!(store.add(""));
        assert!(store.has(""));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut store = BeliefStore::new();
        store.add("a");
        let snapshot = store.all();
        store.add("b");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_count_matching() {
        let mut store = BeliefStore::new();
        store.add("comments_received(v1, ['Loved it!'])");
        store.add("comments_received(v2, ['Nice'])");
        store.add("suggestions_received(v1, ['Looks good!'])");
        assert_eq!(store.count_matching("comments_received(v1,"), 1);
        assert_eq!(store.count_matching("comments_received("), 2);
    }
}
