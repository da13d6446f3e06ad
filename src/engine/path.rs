//! Result of a cascading classification.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::index::document::MAX_LEVELS;

/// Classifier family that produced a [`ClassificationPath`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Technology {
    Bayes,
    Knn,
}

impl Technology {
    pub fn from_knn(use_knn: bool) -> Self {
        if use_knn { Technology::Knn } else { Technology::Bayes }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Technology::Bayes => "Bayes",
            Technology::Knn => "Knn",
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified level: the category name and its score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStep {
    pub name: Arc<str>,
    pub score: f64,
}

/// Categories chosen from the first level down, each with its score.
///
/// Slot `i` is filled only when slot `i - 1` is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationPath {
    technology: Technology,
    steps: [Option<PathStep>; MAX_LEVELS],
}

impl ClassificationPath {
    pub fn new(technology: Technology) -> Self {
        ClassificationPath {
            technology,
            steps: Default::default(),
        }
    }

    pub fn technology(&self) -> Technology {
        self.technology
    }

    /// Record the category chosen at `level` (0-based). Levels past the
    /// deepest category level, and levels whose parent level is still empty,
    /// are ignored.
    pub fn add_result(&mut self, name: Arc<str>, score: f64, level: usize) {
        if level > 0 && self.step(level - 1).is_none() {
            return;
        }
        if let Some(slot) = self.steps.get_mut(level) {
            *slot = Some(PathStep { name, score });
        }
    }

    pub fn step(&self, level: usize) -> Option<&PathStep> {
        self.steps.get(level).and_then(Option::as_ref)
    }

    pub fn node_name(&self, level: usize) -> Option<&str> {
        self.step(level).map(|step| step.name.as_ref())
    }

    pub fn node_score(&self, level: usize) -> Option<f64> {
        self.step(level).map(|step| step.score)
    }

    /// Filled steps from the first level down.
    pub fn steps(&self) -> impl Iterator<Item = &PathStep> {
        self.steps.iter().map_while(Option::as_ref)
    }

    pub fn depth(&self) -> usize {
        self.steps().count()
    }

    pub fn is_empty(&self) -> bool {
        self.steps[0].is_none()
    }

    /// Deepest classified step.
    pub fn leaf(&self) -> Option<&PathStep> {
        self.steps().last()
    }

    pub fn names(&self) -> Vec<&str> {
        self.steps().map(|step| step.name.as_ref()).collect()
    }

    /// `"A (0.9)>B (0.8)"`
    pub fn to_small_string(&self) -> String {
        self.steps()
            .map(|step| format!("{} ({})", step.name, format_score(step.score)))
            .collect::<Vec<_>>()
            .join(">")
    }

    /// `"A>B"`
    pub fn to_class_string(&self) -> String {
        self.names().join(">")
    }
}

/// `"Bayes: A (0.9) > B (0.8)"`
impl fmt::Display for ClassificationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.technology)?;
        for (i, step) in self.steps().enumerate() {
            let separator = if i == 0 { " " } else { " > " };
            write!(f, "{separator}{} ({})", step.name, format_score(step.score))?;
        }
        Ok(())
    }
}

/// At most three decimals, trailing zeros dropped.
pub fn format_score(score: f64) -> String {
    let formatted = format!("{score:.3}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClassificationPath {
        let mut path = ClassificationPath::new(Technology::Bayes);
        path.add_result(Arc::from("Sport"), 0.9, 0);
        path.add_result(Arc::from("Calcio"), 0.8126, 1);
        path
    }

    #[test]
    fn test_formats() {
        let path = sample();
        assert_eq!(path.to_string(), "Bayes: Sport (0.9) > Calcio (0.813)");
        assert_eq!(path.to_small_string(), "Sport (0.9)>Calcio (0.813)");
        assert_eq!(path.to_class_string(), "Sport>Calcio");
        assert_eq!(ClassificationPath::new(Technology::Knn).to_string(), "Knn:");
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(1.0), "1");
        assert_eq!(format_score(0.5), "0.5");
        assert_eq!(format_score(0.12345), "0.123");
        assert_eq!(format_score(0.0), "0");
        assert_eq!(format_score(0.0001), "0");
    }

    #[test]
    fn test_levels() {
        let mut path = sample();
        assert_eq!(path.depth(), 2);
        assert_eq!(path.leaf().map(|s| s.name.as_ref()), Some("Calcio"));
        assert_eq!(path.node_name(0), Some("Sport"));
        assert_eq!(path.node_score(1), Some(0.8126));
        assert_eq!(path.node_name(2), None);

        path.add_result(Arc::from("Ignored"), 1.0, MAX_LEVELS);
        assert_eq!(path.depth(), 2);
        assert!(!path.is_empty());
        assert!(ClassificationPath::new(Technology::Bayes).is_empty());
    }

    #[test]
    fn test_levels_stay_contiguous() {
        let mut path = ClassificationPath::new(Technology::Knn);
        path.add_result(Arc::from("Deep"), 0.9, 2);
        assert!(path.is_empty());
        assert_eq!(path.node_name(2), None);

        let mut path = sample();
        path.add_result(Arc::from("Gap"), 0.7, 3);
        assert_eq!(path.depth(), 2);
        assert_eq!(path.node_name(3), None);

        path.add_result(Arc::from("Serie A"), 0.7, 2);
        assert_eq!(path.to_class_string(), "Sport>Calcio>Serie A");
    }
}
