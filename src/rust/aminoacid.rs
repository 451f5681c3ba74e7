use crate::errors::{TransferError, TransferResult};

/// Standard amino acids
pub const STANDARD_AA: [char; 20] = [
    'A', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W',
    'Y',
];

/// Ambiguity and non-standard codes that still occupy a residue slot
pub const SPECIAL_AA: [char; 6] = ['X', 'U', 'O', 'B', 'Z', 'J'];

/// Number of distinct residue slots counted per alignment column
pub const RESIDUE_ALPHABET: usize = 26;

/// The state a single aligned character encodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentSymbol {
    /// Residue aligned to a match-state column (uppercase)
    Match(char),
    /// Residue in an insert state (lowercase); no cross-sequence column
    Insertion(char),
    /// Deletion: the match column exists but this sequence has no residue there
    Gap,
    /// Insert-column padding ('.'); advances neither counter
    Padding,
}

impl AlignmentSymbol {
    /// Classify one aligned character
    pub fn classify(c: char) -> TransferResult<Self> {
        match c {
            '-' | '*' | '~' => Ok(AlignmentSymbol::Gap),
            '.' => Ok(AlignmentSymbol::Padding),
            c if c.is_ascii_uppercase() && is_valid_aa(c) => Ok(AlignmentSymbol::Match(c)),
            c if c.is_ascii_lowercase() && is_valid_aa(c.to_ascii_uppercase()) => {
                Ok(AlignmentSymbol::Insertion(c.to_ascii_uppercase()))
            }
            _ => Err(TransferError::Parse(format!("Invalid alignment character '{}'", c))),
        }
    }

    /// Whether this symbol occupies a match-state column
    pub fn is_match_state(&self) -> bool {
        matches!(self, AlignmentSymbol::Match(_) | AlignmentSymbol::Gap)
    }

    /// Whether this symbol consumes a residue of the original sequence
    pub fn is_residue(&self) -> bool {
        matches!(self, AlignmentSymbol::Match(_) | AlignmentSymbol::Insertion(_))
    }

    /// The residue carried, uppercased
    pub fn residue(&self) -> Option<char> {
        match self {
            AlignmentSymbol::Match(c) | AlignmentSymbol::Insertion(c) => Some(*c),
            _ => None,
        }
    }
}

pub fn is_valid_aa(aa: char) -> bool {
    // Put the most common case, of the 20 standard amino acids first
    STANDARD_AA.contains(&aa) || SPECIAL_AA.contains(&aa)
}

/// Slot of a residue in a per-column count array
pub fn residue_slot(aa: char) -> Option<usize> {
    if aa.is_ascii_uppercase() {
        Some((aa as u8 - b'A') as usize)
    } else {
        None
    }
}

/// Validates a residue string and returns an error on the first invalid character
pub fn validate_residues(sequence: &str) -> TransferResult<()> {
    for (i, c) in sequence.chars().enumerate() {
        if !is_valid_aa(c.to_ascii_uppercase()) {
            return Err(TransferError::Parse(format!(
                "Invalid amino acid '{}' found at position {}",
                c,
                i + 1
            )));
        }
    }
    Ok(())
}
