//! Gene Ontology term sets and their comparison.

use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{TransferResult, TransferResultExt};

/// InterProScan TSV column holding GO annotations (0-based)
const IPRSCAN_GO_COLUMN: usize = 13;

/// An unordered set of GO identifiers, compared by exact equality
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoTermSet(BTreeSet<String>);

impl GoTermSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a term, dropping any `(source)` suffix; `-` and blanks are ignored
    pub fn insert(&mut self, term: &str) -> bool {
        let term = term.trim();
        let term = match term.find('(') {
            Some(idx) => term[..idx].trim_end(),
            None => term,
        };
        if term.is_empty() || term == "-" {
            return false;
        }
        self.0.insert(term.to_string())
    }

    pub fn contains(&self, term: &str) -> bool {
        self.0.contains(term)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> + '_ {
        self.0.iter()
    }

    pub fn extend_from(&mut self, other: &GoTermSet) {
        self.0.extend(other.0.iter().cloned());
    }
}

impl<S: AsRef<str>> FromIterator<S> for GoTermSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = GoTermSet::new();
        for term in iter {
            set.insert(term.as_ref());
        }
        set
    }
}

/// Parse a `GO:0005524(InterPro)|GO:0016887(PANTHER)` column
pub fn parse_go_column(column: &str) -> GoTermSet {
    column.split('|').collect()
}

/// Read GO terms per sequence from a headerless InterProScan TSV report.
/// Terms from every hit line of the same sequence are merged.
pub fn read_iprscan<R: Read>(reader: R) -> TransferResult<HashMap<String, GoTermSet>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut terms: HashMap<String, GoTermSet> = HashMap::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("InterProScan line {}", line + 1))?;
        let Some(sequence) = record.get(0).map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        let set = terms.entry(sequence.to_string()).or_default();
        if let Some(column) = record.get(IPRSCAN_GO_COLUMN) {
            set.extend_from(&parse_go_column(column));
        }
    }

    debug!(sequences = terms.len(), "Read InterProScan GO terms");
    Ok(terms)
}

pub fn read_iprscan_tsv<P: AsRef<Path>>(path: P) -> TransferResult<HashMap<String, GoTermSet>> {
    let path = path.as_ref();
    let reader = crate::io::open_input(path)?;
    read_iprscan(reader).with_context(|| path.display().to_string())
}

/// Result of comparing a curated term set against a target's term set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoTermComparison {
    pub intersection: GoTermSet,
    pub seed_only: GoTermSet,
    pub target_only: GoTermSet,
    /// Jaccard index: |intersection| / |union|
    pub overlap_ratio: f64,
}

/// Compare by exact identifier equality. Two empty sets have a ratio of 0.
pub fn compare(seed: &GoTermSet, target: &GoTermSet) -> GoTermComparison {
    let intersection: GoTermSet = seed.0.intersection(&target.0).collect();
    let seed_only: GoTermSet = seed.0.difference(&target.0).collect();
    let target_only: GoTermSet = target.0.difference(&seed.0).collect();

    let union_size = seed.len() + target.len() - intersection.len();
    let overlap_ratio =
        if union_size == 0 { 0.0 } else { intersection.len() as f64 / union_size as f64 };

    GoTermComparison { intersection, seed_only, target_only, overlap_ratio }
}

/// Comparison against one seed entry's own GO terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedGoComparison {
    pub seed: String,
    #[serde(flatten)]
    pub comparison: GoTermComparison,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(terms: &[&str]) -> GoTermSet {
        terms.iter().collect()
    }

    #[test]
    fn test_compare_partial_overlap() {
        let seed = set(&["GO:0003677", "GO:0005524"]);
        let target = set(&["GO:0003677"]);
        let result = compare(&seed, &target);

        assert_eq!(result.overlap_ratio, 0.5);
        assert_eq!(result.intersection, set(&["GO:0003677"]));
        assert_eq!(result.seed_only, set(&["GO:0005524"]));
        assert!(result.target_only.is_empty());
    }

    #[test]
    fn test_compare_is_symmetric() {
        let a = set(&["GO:1", "GO:2", "GO:3"]);
        let b = set(&["GO:3", "GO:4"]);
        let ab = compare(&a, &b);
        let ba = compare(&b, &a);
        assert_eq!(ab.overlap_ratio, ba.overlap_ratio);
        assert_eq!(ab.seed_only, ba.target_only);
        assert_eq!(ab.intersection, ba.intersection);
    }

    #[test]
    fn test_compare_empty_sets() {
        let result = compare(&GoTermSet::new(), &GoTermSet::new());
        assert_eq!(result.overlap_ratio, 0.0);
        let result = compare(&set(&["GO:1"]), &GoTermSet::new());
        assert_eq!(result.overlap_ratio, 0.0);
        assert_eq!(result.seed_only.len(), 1);
    }

    #[test]
    fn test_parse_go_column() {
        let terms = parse_go_column("GO:0005524(InterPro)|GO:0016887(PANTHER)|GO:0005524");
        assert_eq!(terms.len(), 2);
        assert!(terms.contains("GO:0016887"));
        assert!(parse_go_column("-").is_empty());
        assert!(parse_go_column("").is_empty());
    }

    #[test]
    fn test_read_iprscan() -> TransferResult<()> {
        let tsv = "\
sp|Q9NU22|MDN1_HUMAN\tmd5\t5596\tPfam\tPF07728\tAAA domain\t325\t451\t1.2E-20\tT\t01-01-2024\tIPR011704\tATPase, dynein-related, AAA domain\tGO:0005524(InterPro)|GO:0016887(InterPro)\n\
sp|Q9NU22|MDN1_HUMAN\tmd5\t5596\tGene3D\tG3DSA:3.40.50.300\t-\t300\t480\t1.0E-30\tT\t01-01-2024\t-\t-\t-\n\
sp|P00001|OTHER\tmd5\t100\tPfam\tPF00001\tX\t1\t90\t1E-5\tT\t01-01-2024\n";
        let terms = read_iprscan(tsv.as_bytes())?;

        assert_eq!(terms.len(), 2);
        let mdn1 = &terms["sp|Q9NU22|MDN1_HUMAN"];
        assert_eq!(mdn1, &set(&["GO:0005524", "GO:0016887"]));
        // Short lines without a GO column still register the sequence
        assert!(terms["sp|P00001|OTHER"].is_empty());
        Ok(())
    }
}
