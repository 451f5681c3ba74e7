//! Curated annotation store, read-only once loaded.
//!
//! Each domain lives under `<resource_dir>/<DOMAIN>/`:
//! - `annotations.json`: `{seed: {position: [annotation, ...], "0": {category: {GO:id: name}}}}`
//! - `domain_annotations.json` (optional): `[{kind, value, evidence}, ...]`

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, error, info, warn};

use crate::aminoacid::validate_residues;
use crate::errors::{TransferError, TransferResult, TransferResultExt};
use crate::go_terms::GoTermSet;
use crate::types::Position;

pub const ANNOTATIONS_FILE: &str = "annotations.json";
pub const DOMAIN_ANNOTATIONS_FILE: &str = "domain_annotations.json";

/// Position key reserved for a seed's GO terms
const GO_TERMS_KEY: &str = "0";

/// One evidence item, `ECO:0000269|PubMed:12345`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Evidence {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Evidence {
    /// Parse a comma-separated evidence string
    pub fn parse_list(evidence: &str) -> Vec<Evidence> {
        evidence
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| match item.split_once('|') {
                Some((code, source)) => Evidence {
                    code: code.trim().to_string(),
                    source: Some(source.trim().to_string()).filter(|s| !s.is_empty()),
                },
                None => Evidence { code: item.to_string(), source: None },
            })
            .collect()
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}|{}", self.code, source),
            None => write!(f, "{}", self.code),
        }
    }
}

/// A curated fact about one residue of a seed sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionalAnnotation {
    pub domain: String,
    pub seed: String,
    pub position: Position,
    pub kind: String,
    pub value: Option<String>,
    pub evidence: Vec<Evidence>,
    /// Source entry accession
    pub accession: Option<String>,
    /// Residue the curator recorded at this position
    pub residue: Option<char>,
    /// Partner residue for paired kinds such as disulfide bonds
    pub paired_position: Option<Position>,
    /// Kind-specific fields (ligand ids and the like), passed through untouched
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A curated fact about the domain as a whole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainAnnotation {
    pub domain: String,
    pub kind: String,
    pub value: String,
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPositionEntry {
    Annotations(Vec<RawAnnotation>),
    GoTerms(BTreeMap<String, serde_json::Value>),
}

#[derive(Debug, Deserialize)]
struct RawAnnotation {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    evidence: Option<String>,
    #[serde(default)]
    entry: Option<String>,
    #[serde(default)]
    aminoacid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_position")]
    paired_position: Option<usize>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawDomainAnnotation {
    kind: String,
    value: String,
    #[serde(default)]
    evidence: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(usize),
    Text(String),
}

/// Paired positions appear both as numbers and as decimal strings
fn deserialize_position<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                Ok(None)
            } else {
                text.parse().map(Some).map_err(serde::de::Error::custom)
            }
        }
    }
}

/// Everything curated for one domain
#[derive(Debug, Clone, Default)]
pub struct DomainAnnotations {
    pub domain: String,
    positional: BTreeMap<String, BTreeMap<Position, Vec<PositionalAnnotation>>>,
    pub domain_level: Vec<DomainAnnotation>,
    seed_go_terms: BTreeMap<String, GoTermSet>,
}

impl DomainAnnotations {
    /// A domain with no curated content
    pub fn empty(domain: &str) -> Self {
        Self { domain: domain.to_string(), ..Default::default() }
    }

    /// Parse the contents of an `annotations.json` file
    pub fn from_json(domain: &str, text: &str) -> TransferResult<Self> {
        let mut annotations = Self::empty(domain);
        if text.trim().is_empty() {
            return Ok(annotations);
        }

        let raw: BTreeMap<String, BTreeMap<String, RawPositionEntry>> =
            serde_json::from_str(text).with_context(|| format!("{} {}", domain, ANNOTATIONS_FILE))?;

        for (seed, positions) in raw {
            for (key, entry) in positions {
                match entry {
                    RawPositionEntry::GoTerms(categories) if key == GO_TERMS_KEY => {
                        let terms: GoTermSet = categories
                            .values()
                            .filter_map(|v| v.as_object())
                            .flat_map(|terms| terms.keys())
                            .collect();
                        annotations.seed_go_terms.insert(seed.clone(), terms);
                    }
                    RawPositionEntry::GoTerms(_) => {
                        warn!(domain, seed = %seed, key = %key, "Ignoring non-list annotation entry");
                    }
                    RawPositionEntry::Annotations(_) if key == GO_TERMS_KEY => {
                        warn!(domain, seed = %seed, "Ignoring annotation list under the GO terms key");
                    }
                    RawPositionEntry::Annotations(list) => {
                        let position = parse_position_key(&key).ok_or_else(|| {
                            TransferError::Parse(format!(
                                "{}: seed {} has invalid position key '{}'",
                                domain, seed, key
                            ))
                        })?;
                        for raw in list {
                            let annotation = Self::convert(domain, &seed, position, raw);
                            annotations.add_positional(annotation);
                        }
                    }
                }
            }
        }

        Ok(annotations)
    }

    fn convert(domain: &str, seed: &str, position: Position, raw: RawAnnotation) -> PositionalAnnotation {
        let residue = raw.aminoacid.as_deref().map(str::trim).and_then(|aa| {
            match validate_residues(aa) {
                Ok(()) if aa.chars().count() == 1 => aa.chars().next().map(|c| c.to_ascii_uppercase()),
                _ => {
                    warn!(domain, seed, position = %position, aminoacid = aa, "Ignoring invalid residue");
                    None
                }
            }
        });

        PositionalAnnotation {
            domain: domain.to_string(),
            seed: seed.to_string(),
            position,
            kind: raw.kind,
            value: raw.description,
            evidence: raw.evidence.as_deref().map(Evidence::parse_list).unwrap_or_default(),
            accession: raw.entry,
            residue,
            paired_position: raw.paired_position.and_then(|p| Position::new(p).ok()),
            extra: raw.extra,
        }
    }

    /// Parse the contents of a `domain_annotations.json` file
    pub fn parse_domain_level(domain: &str, text: &str) -> TransferResult<Vec<DomainAnnotation>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<RawDomainAnnotation> = serde_json::from_str(text)
            .with_context(|| format!("{} {}", domain, DOMAIN_ANNOTATIONS_FILE))?;
        Ok(raw
            .into_iter()
            .map(|r| DomainAnnotation {
                domain: domain.to_string(),
                kind: r.kind,
                value: r.value,
                evidence: r.evidence.as_deref().map(Evidence::parse_list).unwrap_or_default(),
            })
            .collect())
    }

    pub fn add_positional(&mut self, annotation: PositionalAnnotation) {
        self.positional
            .entry(annotation.seed.clone())
            .or_default()
            .entry(annotation.position)
            .or_default()
            .push(annotation);
    }

    pub fn add_domain_level(&mut self, annotation: DomainAnnotation) {
        self.domain_level.push(annotation);
    }

    pub fn set_seed_go_terms(&mut self, seed: &str, terms: GoTermSet) {
        self.seed_go_terms.insert(seed.to_string(), terms);
    }

    /// Seeds carrying positional annotations
    pub fn seeds(&self) -> impl Iterator<Item = &str> + '_ {
        self.positional.keys().map(String::as_str)
    }

    pub fn at(&self, seed: &str, position: Position) -> &[PositionalAnnotation] {
        self.positional
            .get(seed)
            .and_then(|positions| positions.get(&position))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All positional annotations of a seed, in ascending position order
    pub fn for_seed<'a>(&'a self, seed: &str) -> impl Iterator<Item = &'a PositionalAnnotation> + 'a {
        self.positional.get(seed).into_iter().flat_map(|positions| positions.values().flatten())
    }

    pub fn positional(&self) -> impl Iterator<Item = &PositionalAnnotation> + '_ {
        self.positional.values().flat_map(|positions| positions.values().flatten())
    }

    pub fn seed_go_terms(&self) -> &BTreeMap<String, GoTermSet> {
        &self.seed_go_terms
    }

    /// Union of every seed's GO terms
    pub fn domain_go_terms(&self) -> GoTermSet {
        let mut terms = GoTermSet::new();
        for set in self.seed_go_terms.values() {
            terms.extend_from(set);
        }
        terms
    }

    pub fn positional_count(&self) -> usize {
        self.positional.values().flat_map(|p| p.values()).map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.domain_level.is_empty() && self.seed_go_terms.is_empty()
    }
}

fn parse_position_key(key: &str) -> Option<Position> {
    key.trim().parse::<usize>().ok().and_then(|p| Position::new(p).ok())
}

/// Path of a domain's curated annotation file
pub fn annotation_path(resource_dir: &Path, domain: &str) -> PathBuf {
    resource_dir.join(domain).join(ANNOTATIONS_FILE)
}

/// Load one domain from a resource directory
pub fn load_domain(resource_dir: &Path, domain: &str) -> TransferResult<DomainAnnotations> {
    let path = annotation_path(resource_dir, domain);
    if !path.is_file() {
        return Err(TransferError::MissingDomainData { domain: domain.to_string(), path });
    }

    let text = crate::io::read_to_string(&path)?;
    let mut annotations = DomainAnnotations::from_json(domain, &text)?;

    let domain_path = resource_dir.join(domain).join(DOMAIN_ANNOTATIONS_FILE);
    if domain_path.is_file() {
        let text = crate::io::read_to_string(&domain_path)?;
        annotations.domain_level = DomainAnnotations::parse_domain_level(domain, &text)?;
    }

    debug!(
        domain,
        seeds = annotations.positional.len(),
        positional = annotations.positional_count(),
        domain_level = annotations.domain_level.len(),
        "Loaded curated annotations"
    );
    Ok(annotations)
}

#[derive(Debug)]
enum DomainEntry {
    Loaded(Arc<DomainAnnotations>),
    Missing(PathBuf),
    Invalid(String),
}

/// Immutable map of curated annotations per domain, shared by reference
/// across worker threads.
#[derive(Debug, Default)]
pub struct AnnotationRegistry {
    resource_dir: Option<PathBuf>,
    entries: HashMap<String, DomainEntry>,
}

impl AnnotationRegistry {
    /// Load every listed domain up front. Missing and unreadable domains
    /// are remembered and reported again by [`AnnotationRegistry::load`].
    pub fn preload<P, I, S>(resource_dir: P, domains: I) -> Self
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let resource_dir = resource_dir.as_ref().to_path_buf();
        let mut names: Vec<String> = domains.into_iter().map(|d| d.as_ref().to_string()).collect();
        names.sort();
        names.dedup();

        let entries: HashMap<String, DomainEntry> = names
            .par_iter()
            .map(|domain| {
                let entry = match load_domain(&resource_dir, domain) {
                    Ok(annotations) => DomainEntry::Loaded(Arc::new(annotations)),
                    Err(TransferError::MissingDomainData { path, .. }) => {
                        warn!(domain = %domain, path = %path.display(), "No curated annotations for domain");
                        DomainEntry::Missing(path)
                    }
                    Err(e) => {
                        error!(domain = %domain, error = %e, "Failed to load curated annotations");
                        DomainEntry::Invalid(e.to_string())
                    }
                };
                (domain.clone(), entry)
            })
            .collect();

        let loaded = entries.values().filter(|e| matches!(e, DomainEntry::Loaded(_))).count();
        info!(
            resource_dir = %resource_dir.display(),
            domains = entries.len(),
            loaded,
            "Annotation registry ready"
        );

        Self { resource_dir: Some(resource_dir), entries }
    }

    /// Build a registry from in-memory annotations
    pub fn from_domains<I>(domains: I) -> Self
    where
        I: IntoIterator<Item = DomainAnnotations>,
    {
        let entries = domains
            .into_iter()
            .map(|d| (d.domain.clone(), DomainEntry::Loaded(Arc::new(d))))
            .collect();
        Self { resource_dir: None, entries }
    }

    /// Curated annotations for a domain.
    ///
    /// Fails with `MissingDomainData` when the domain has no curated source.
    pub fn load(&self, domain: &str) -> TransferResult<Arc<DomainAnnotations>> {
        match self.entries.get(domain) {
            Some(DomainEntry::Loaded(annotations)) => Ok(Arc::clone(annotations)),
            Some(DomainEntry::Invalid(message)) => Err(TransferError::Parse(message.clone())),
            Some(DomainEntry::Missing(path)) => Err(TransferError::MissingDomainData {
                domain: domain.to_string(),
                path: path.clone(),
            }),
            None => Err(TransferError::MissingDomainData {
                domain: domain.to_string(),
                path: self
                    .resource_dir
                    .as_deref()
                    .map(|dir| annotation_path(dir, domain))
                    .unwrap_or_default(),
            }),
        }
    }

    pub fn contains(&self, domain: &str) -> bool {
        matches!(self.entries.get(domain), Some(DomainEntry::Loaded(_)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
