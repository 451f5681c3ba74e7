use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-based residue index in the original (ungapped) sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(pub usize);

impl Position {
    /// Create a new position with validation
    pub fn new(pos: usize) -> Result<Self, String> {
        if pos == 0 {
            Err("Sequence positions are 1-based, got 0".to_string())
        } else {
            Ok(Position(pos))
        }
    }

    /// Get the raw value
    pub fn get(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 1-based index into the domain's match-state coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Column(pub usize);

impl Column {
    /// Get the raw value
    pub fn get(&self) -> usize {
        self.0
    }

    /// Zero-based offset, for indexing per-column vectors; `None` for column 0
    pub fn index(&self) -> Option<usize> {
        self.0.checked_sub(1)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A per-column conservation value in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConservationScore(f64);

impl ConservationScore {
    pub const ZERO: ConservationScore = ConservationScore(0.0);

    /// Create a new score with validation
    pub fn new(value: f64) -> Result<Self, String> {
        if !(0.0..=1.0).contains(&value) {
            Err(format!("Conservation score must lie in [0, 1], got {}", value))
        } else {
            Ok(ConservationScore(value))
        }
    }

    /// Build a score from a modal count over a residue count.
    pub(crate) fn from_counts(modal: usize, total: usize) -> Self {
        if total == 0 {
            Self::ZERO
        } else {
            ConservationScore(modal as f64 / total as f64)
        }
    }

    /// Get the raw value
    pub fn get(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for ConservationScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// Transfer confidence derived from conservation against the configured threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Low,
}

impl Confidence {
    pub fn from_score(score: ConservationScore, threshold: f64) -> Self {
        if score.get() >= threshold {
            Confidence::High
        } else {
            Confidence::Low
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_validation() {
        assert!(Position::new(0).is_err());
        assert_eq!(Position::new(1).unwrap().get(), 1);
        assert_eq!(Position::new(325).unwrap().to_string(), "325");
    }

    #[test]
    fn test_column_index() {
        assert_eq!(Column(1).index(), Some(0));
        assert_eq!(Column(18).index(), Some(17));
        assert_eq!(Column(0).index(), None);
    }

    #[test]
    fn test_conservation_validation() {
        assert!(ConservationScore::new(-0.1).is_err());
        assert!(ConservationScore::new(1.01).is_err());
        assert!(ConservationScore::new(f64::NAN).is_err());
        assert_eq!(ConservationScore::new(1.0).unwrap().get(), 1.0);
        assert_eq!(ConservationScore::from_counts(0, 0), ConservationScore::ZERO);
        assert_eq!(ConservationScore::from_counts(3, 4).get(), 0.75);
    }

    #[test]
    fn test_confidence_threshold() {
        let score = ConservationScore::from_counts(4, 5);
        assert_eq!(Confidence::from_score(score, 0.8), Confidence::High);
        assert_eq!(Confidence::from_score(score, 0.81), Confidence::Low);
        assert_eq!(Confidence::High.to_string(), "high");
    }
}
