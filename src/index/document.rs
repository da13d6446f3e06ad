//! Labeled training documents.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::intern::InternPool;

/// Depth of the category hierarchy below the root.
pub const MAX_LEVELS: usize = 4;

/// Numeric identifier of a category name.
///
/// This is the 32-bit polynomial string hash `s[0]*31^(n-1) + ... + s[n-1]`
/// over UTF-16 code units with wrapping arithmetic, so identifiers match the
/// ones stored by existing corpora. Distinct names can collide.
pub fn category_id(name: &str) -> i32 {
    name.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    Active,
    Cancelled,
}

impl DocumentStatus {
    /// Status code used in exported listings.
    pub fn code(self) -> &'static str {
        match self {
            DocumentStatus::Active => "1000",
            DocumentStatus::Cancelled => "2000",
        }
    }
}

/// One populated level of a category path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryLevel {
    pub id: i32,
    pub name: Arc<str>,
}

impl CategoryLevel {
    pub fn new(name: Arc<str>) -> Self {
        CategoryLevel {
            id: category_id(&name),
            name,
        }
    }
}

/// Up to [`MAX_LEVELS`] category levels, root-most first, without gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryPath {
    levels: [Option<CategoryLevel>; MAX_LEVELS],
}

impl CategoryPath {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a path from category names. Names are trimmed; the first empty
    /// name ends the path and names past the fourth are ignored.
    pub fn from_names<I, S>(names: I, pool: Option<&InternPool>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = CategoryPath::default();
        for (slot, name) in path.levels.iter_mut().zip(names) {
            let name = name.as_ref().trim();
            if name.is_empty() {
                break;
            }
            let shared = match pool {
                Some(pool) => pool.intern(name),
                None => Arc::from(name),
            };
            *slot = Some(CategoryLevel::new(shared));
        }
        path
    }

    pub fn level(&self, index: usize) -> Option<&CategoryLevel> {
        self.levels.get(index).and_then(Option::as_ref)
    }

    pub fn id(&self, index: usize) -> Option<i32> {
        self.level(index).map(|level| level.id)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.level(index).map(|level| level.name.as_ref())
    }

    /// Populated levels, root-most first.
    pub fn iter(&self) -> impl Iterator<Item = &CategoryLevel> {
        self.levels.iter().map_while(Option::as_ref)
    }

    pub fn depth(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.levels[0].is_none()
    }

    pub fn ids(&self) -> Vec<i32> {
        self.iter().map(|level| level.id).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|level| level.name.as_ref()).collect()
    }

    /// The first `depth` levels.
    pub fn prefix(&self, depth: usize) -> CategoryPath {
        let mut prefix = CategoryPath::default();
        for (index, level) in self.iter().take(depth).enumerate() {
            prefix.levels[index] = Some(level.clone());
        }
        prefix
    }

    /// Whether every level of `prefix` has the same id at the same depth here.
    /// An empty prefix matches every path.
    pub fn starts_with(&self, prefix: &CategoryPath) -> bool {
        self.starts_with_ids(&prefix.ids())
    }

    pub fn starts_with_ids(&self, ids: &[i32]) -> bool {
        ids.len() <= MAX_LEVELS
            && ids
                .iter()
                .enumerate()
                .all(|(index, id)| self.id(index) == Some(*id))
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(">"))
    }
}

/// A training example stored in a language index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: String,
    pub status: DocumentStatus,
    pub body: String,
    pub path: CategoryPath,
}

impl IndexedDocument {
    /// A new active document with a fresh UUID.
    pub fn new<S: Into<String>>(body: S, path: CategoryPath) -> Self {
        IndexedDocument {
            id: new_document_id(),
            status: DocumentStatus::Active,
            body: body.into(),
            path,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == DocumentStatus::Active
    }

    pub fn has_id(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// Replace the id with a fresh UUID.
    pub fn refresh_id(&mut self) {
        self.id = new_document_id();
    }
}

pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_id_matches_string_hash() {
        assert_eq!(category_id(""), 0);
        assert_eq!(category_id("a"), 97);
        assert_eq!(category_id("hello"), 99162322);
        assert_eq!(category_id("Sport"), 80099156);
        // Wraps around for long names.
        assert_eq!(category_id("polygenelubricants"), i32::MIN);
        // Classic colliding pair.
        assert_eq!(category_id("Aa"), category_id("BB"));
    }

    #[test]
    fn test_path_stops_at_first_empty_name() {
        let path = CategoryPath::from_names(["A", " B ", "", "D", "E"], None);
        assert_eq!(path.depth(), 2);
        assert_eq!(path.names(), vec!["A", "B"]);
        assert!(path.level(2).is_none());
        assert!(path.level(3).is_none());

        let long = CategoryPath::from_names(["A", "B", "C", "D", "E"], None);
        assert_eq!(long.depth(), MAX_LEVELS);
    }

    #[test]
    fn test_prefix_matching() {
        let path = CategoryPath::from_names(["A", "B", "C"], None);
        let prefix = CategoryPath::from_names(["A", "B"], None);
        let other = CategoryPath::from_names(["A", "X"], None);

        assert!(path.starts_with(&prefix));
        assert!(path.starts_with(&CategoryPath::empty()));
        assert!(!path.starts_with(&other));
        assert!(!prefix.starts_with(&path));
        assert_eq!(path.prefix(2), prefix);
        assert_eq!(path.to_string(), "A>B>C");
    }

    #[test]
    fn test_interned_names_are_shared() {
        let pool = InternPool::new();
        let a = CategoryPath::from_names(["Sport", "Calcio"], Some(&pool));
        let b = CategoryPath::from_names(["Sport"], Some(&pool));
        assert!(Arc::ptr_eq(
            &a.level(0).unwrap().name,
            &b.level(0).unwrap().name
        ));
    }

    #[test]
    fn test_new_document() {
        let doc = IndexedDocument::new("foo bar", CategoryPath::from_names(["A"], None));
        assert!(doc.is_active());
        assert!(doc.has_id());
        assert_eq!(doc.status.code(), "1000");
        assert_eq!(DocumentStatus::Cancelled.code(), "2000");
    }
}
