//! Row-aligned domain alignments (Stockholm as written by hmmalign).
//!
//! Each data row is `<name>[/<start>-<end>] <aligned string>`. Rows whose name
//! carries the target marker are novel hits; every other row is a curated seed.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aminoacid::AlignmentSymbol;
use crate::errors::{TransferError, TransferResult, TransferResultExt};
use crate::iterators::AlignedResidues;
use crate::types::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowRole {
    Seed,
    Target,
}

/// Original-sequence interval covered by one aligned row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

impl Region {
    pub fn contains(&self, position: Position) -> bool {
        (self.start..=self.end).contains(&position.get())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// One sequence row of an alignment
#[derive(Debug, Clone)]
pub struct AlignedRow {
    /// Row name exactly as written in the alignment
    pub name: String,
    /// Sequence id with offsets and target marker removed
    pub sequence_id: String,
    pub role: RowRole,
    pub region: Region,
    pub aligned: String,
    symbols: Vec<AlignmentSymbol>,
}

impl AlignedRow {
    fn new(name: &str, aligned: String, marker: &str) -> TransferResult<Self> {
        let (sequence_id, role, declared) = parse_row_name(name, marker)?;
        let symbols = aligned
            .chars()
            .map(AlignmentSymbol::classify)
            .collect::<TransferResult<Vec<_>>>()
            .with_context(|| format!("row {}", name))?;

        let residues = symbols.iter().filter(|s| s.is_residue()).count();
        let region = match declared {
            Some((start, end)) => {
                if end + 1 < start || end + 1 - start != residues {
                    warn!(
                        row = name,
                        declared = %format!("{}-{}", start, end),
                        residues,
                        "Declared range does not match the number of aligned residues"
                    );
                }
                Region { start, end }
            }
            None => Region { start: 1, end: residues },
        };

        Ok(Self { name: name.to_string(), sequence_id, role, region, aligned, symbols })
    }

    pub fn symbols(&self) -> &[AlignmentSymbol] {
        &self.symbols
    }

    /// Walk the row, pairing symbols with original positions and match columns
    pub fn residues(&self) -> AlignedResidues<'_> {
        AlignedResidues::new(&self.symbols, self.region.start)
    }

    /// Number of match-state columns (residues and deletions) in this row
    pub fn match_column_count(&self) -> usize {
        self.symbols.iter().filter(|s| s.is_match_state()).count()
    }

    pub fn is_target(&self) -> bool {
        self.role == RowRole::Target
    }
}

/// Split a row name into (sequence id, role, declared range)
fn parse_row_name(
    name: &str,
    marker: &str,
) -> TransferResult<(String, RowRole, Option<(usize, usize)>)> {
    let (head, declared) = match name.rsplit_once('/') {
        Some((head, range)) => match parse_range(range) {
            Some(range) => (head, Some(range)),
            None => (name, None),
        },
        None => (name, None),
    };

    let (id, role) = match head.find(marker) {
        Some(idx) => (&head[..idx], RowRole::Target),
        None => (head, RowRole::Seed),
    };

    if id.is_empty() {
        return Err(TransferError::Parse(format!("Row name '{}' has an empty sequence id", name)));
    }
    Ok((id.to_string(), role, declared))
}

fn parse_range(range: &str) -> Option<(usize, usize)> {
    let (start, end) = range.split_once('-')?;
    let start: usize = start.trim().parse().ok()?;
    let end: usize = end.trim().parse().ok()?;
    if start == 0 {
        return None;
    }
    Some((start, end))
}

/// An alignment of seed and novel sequences against one domain model
#[derive(Debug, Clone)]
pub struct Alignment {
    pub domain: String,
    pub rows: Vec<AlignedRow>,
    /// `#=GC RF` reference line; 'x' marks match columns
    pub reference: Option<String>,
}

impl Alignment {
    /// Parse Stockholm (or plain row-aligned) text.
    /// Interleaved blocks are joined by row name.
    pub fn parse(domain: &str, text: &str, marker: &str) -> TransferResult<Self> {
        let mut order: Vec<String> = Vec::new();
        let mut pieces: HashMap<String, String> = HashMap::new();
        let mut reference: Option<String> = None;

        for (line_no, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed == "//" {
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("#=GC") {
                let mut fields = rest.split_whitespace();
                if let (Some("RF"), Some(rf)) = (fields.next(), fields.next()) {
                    reference.get_or_insert_with(String::new).push_str(rf);
                }
                continue;
            }
            if trimmed.starts_with('#') {
                continue;
            }

            let mut fields = trimmed.split_whitespace();
            let (name, aligned) = match (fields.next(), fields.next(), fields.next()) {
                (Some(name), Some(aligned), None) => (name, aligned),
                _ => {
                    return Err(TransferError::Parse(format!(
                        "{}: line {} is not a '<name> <aligned sequence>' row",
                        domain,
                        line_no + 1
                    )))
                }
            };

            match pieces.get_mut(name) {
                Some(existing) => existing.push_str(aligned),
                None => {
                    order.push(name.to_string());
                    pieces.insert(name.to_string(), aligned.to_string());
                }
            }
        }

        if order.is_empty() {
            return Err(TransferError::Parse(format!("{}: alignment contains no rows", domain)));
        }

        let rows = order
            .into_iter()
            .map(|name| {
                let aligned = pieces.remove(&name).unwrap_or_default();
                AlignedRow::new(&name, aligned, marker)
            })
            .collect::<TransferResult<Vec<_>>>()
            .with_context(|| format!("domain {}", domain))?;

        debug!(
            domain,
            rows = rows.len(),
            targets = rows.iter().filter(|r| r.is_target()).count(),
            "Parsed alignment"
        );

        Ok(Self { domain: domain.to_string(), rows, reference })
    }

    /// Read and parse an alignment file; the domain defaults to the one in the file name.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        domain: Option<&str>,
        marker: &str,
    ) -> TransferResult<Self> {
        let path = path.as_ref();
        let domain = match domain {
            Some(domain) => domain.to_string(),
            None => domain_from_filename(path).ok_or_else(|| {
                TransferError::Parse(format!("cannot derive a domain id from {}", path.display()))
            })?,
        };
        let text = crate::io::read_to_string(path)?;
        Self::parse(&domain, &text, marker)
    }

    pub fn seeds(&self) -> impl Iterator<Item = (usize, &AlignedRow)> + '_ {
        self.rows.iter().enumerate().filter(|(_, r)| !r.is_target())
    }

    pub fn targets(&self) -> impl Iterator<Item = (usize, &AlignedRow)> + '_ {
        self.rows.iter().enumerate().filter(|(_, r)| r.is_target())
    }

    /// Match-column count declared by the RF line, if any
    pub fn reference_column_count(&self) -> Option<usize> {
        self.reference.as_ref().map(|rf| rf.chars().filter(|&c| c != '.').count())
    }
}

/// Domain id from an hmmalign output name such as `PF07728_hmmalign.sth`
pub fn domain_from_filename<P: AsRef<Path>>(path: P) -> Option<String> {
    let stem = path.as_ref().file_name()?.to_str()?;
    let stem = stem.strip_suffix(".gz").unwrap_or(stem);
    let stem = stem.rsplit_once('.').map(|(s, _)| s).unwrap_or(stem);
    let fields: Vec<&str> = stem.split('_').collect();
    if fields.len() < 2 {
        return None;
    }
    let domain = fields[fields.len() - 2];
    (!domain.is_empty()).then(|| domain.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TARGET_MARKER;

    #[test]
    fn test_parse_row_names() {
        let (id, role, range) = parse_row_name("MCRB_ECOLI/196-350", "target/").unwrap();
        assert_eq!(id, "MCRB_ECOLI");
        assert_eq!(role, RowRole::Seed);
        assert_eq!(range, Some((196, 350)));

        let (id, role, range) =
            parse_row_name("sp|Q9NU22|MDN1_HUMANtarget//325-451", "target/").unwrap();
        assert_eq!(id, "sp|Q9NU22|MDN1_HUMAN");
        assert_eq!(role, RowRole::Target);
        assert_eq!(range, Some((325, 451)));

        let (id, role, range) = parse_row_name("S", "target/").unwrap();
        assert_eq!(id, "S");
        assert_eq!(role, RowRole::Seed);
        assert_eq!(range, None);

        assert!(parse_row_name("target//1-10", "target/").is_err());
    }

    #[test]
    fn test_parse_interleaved_blocks() {
        let text = "# STOCKHOLM 1.0\n\nS/10-13   MK\nTtarget//1-4  MK\n\nS/10-13   VL\nTtarget//1-4  VL\n#=GC RF    xx\n#=GC RF    xx\n//\n";
        let alignment = Alignment::parse("PF00001", text, DEFAULT_TARGET_MARKER).unwrap();

        assert_eq!(alignment.rows.len(), 2);
        assert_eq!(alignment.rows[0].aligned, "MKVL");
        assert_eq!(alignment.rows[0].region, Region { start: 10, end: 13 });
        assert!(alignment.rows[1].is_target());
        assert_eq!(alignment.rows[1].sequence_id, "T");
        assert_eq!(alignment.reference_column_count(), Some(4));
    }

    #[test]
    fn test_region_without_offsets() {
        let alignment = Alignment::parse("D", "S MK.VL\nTtarget/ MKaVL\n", "target/").unwrap();
        assert_eq!(alignment.rows[0].region, Region { start: 1, end: 4 });
        assert_eq!(alignment.rows[1].region, Region { start: 1, end: 5 });
        assert_eq!(alignment.rows[0].match_column_count(), 4);
        assert_eq!(alignment.rows[1].match_column_count(), 4);
        assert_eq!(alignment.seeds().count(), 1);
        assert_eq!(alignment.targets().count(), 1);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(Alignment::parse("D", "# STOCKHOLM 1.0\n//\n", "target/").is_err());
        assert!(Alignment::parse("D", "S MKVL extra\n", "target/").is_err());
        assert!(Alignment::parse("D", "S\n", "target/").is_err());
        let err = Alignment::parse("D", "S MK1L\n", "target/").unwrap_err();
        assert!(err.to_string().contains("row S"));
    }

    #[test]
    fn test_domain_from_filename() {
        assert_eq!(domain_from_filename("/r/PF07728_hmmalign.sth"), Some("PF07728".to_string()));
        assert_eq!(domain_from_filename("PF00244_hmmalign.sth.gz"), Some("PF00244".to_string()));
        assert_eq!(domain_from_filename("alignment.sth"), None);
    }
}
