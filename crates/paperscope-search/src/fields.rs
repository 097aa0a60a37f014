//! Research-field detection and source routing.
//!
//! A query is scored against a static table of field profiles
//! (weighted keyword lists), and the top fields decide which corpora
//! are worth asking. Both operations are pure and deterministic.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use paperscope_common::SourceId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedKeyword {
    pub phrase: String,
    pub weight: f64,
}

/// One research-topic category: keywords, a priority weight used for
/// scaling and tie-breaks, and the corpora that cover it, best first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldProfile {
    pub name: String,
    pub priority: f64,
    pub keywords: Vec<WeightedKeyword>,
    pub sources: Vec<SourceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldScore {
    pub field: String,
    /// Normalized to the best-matching field (top field = 1.0).
    pub confidence: f64,
}

/// Loaded once at process start; read-only thereafter.
pub struct FieldDetector {
    profiles: Vec<FieldProfile>,
    default_sources: Vec<SourceId>,
    confidence_threshold: f64,
}

impl FieldDetector {
    pub fn new(profiles: Vec<FieldProfile>, default_sources: Vec<SourceId>) -> Self {
        Self {
            profiles,
            default_sources,
            confidence_threshold: 0.3,
        }
    }

    pub fn profiles(&self) -> &[FieldProfile] {
        &self.profiles
    }

    pub fn default_sources(&self) -> &[SourceId] {
        &self.default_sources
    }

    /// Score the sanitized query against every profile. Substring
    /// matches count the full keyword weight; single-word keywords
    /// that only match as a standalone word count 0.8 of it. Scores
    /// are normalized by each profile's total keyword weight so long
    /// profiles are not favored, then scaled by the profile priority.
    pub fn detect(&self, query: &str) -> Vec<FieldScore> {
        let query_lower = query.to_lowercase();
        let query_words: HashSet<&str> = query_lower.split_whitespace().collect();

        // (insertion index, name, raw score, priority)
        let mut scored: Vec<(usize, &str, f64, f64)> = Vec::new();

        for (idx, profile) in self.profiles.iter().enumerate() {
            let total_weight: f64 = profile.keywords.iter().map(|k| k.weight).sum();
            if total_weight <= 0.0 {
                continue;
            }

            let mut matched_weight = 0.0;
            for kw in &profile.keywords {
                let phrase = kw.phrase.to_lowercase();
                if query_lower.contains(&phrase) {
                    matched_weight += kw.weight;
                } else if !phrase.contains(' ') && query_words.contains(phrase.as_str()) {
                    matched_weight += 0.8 * kw.weight;
                }
            }

            if matched_weight > 0.0 {
                let score = matched_weight / total_weight * profile.priority;
                scored.push((idx, &profile.name, score, profile.priority));
            }
        }

        let max_score = scored.iter().map(|(_, _, s, _)| *s).fold(0.0f64, f64::max);
        if max_score <= 0.0 {
            return Vec::new();
        }

        // Descending score, ties by priority then configuration order
        scored.sort_by(|a, b| {
            b.2.total_cmp(&a.2)
                .then(b.3.total_cmp(&a.3))
                .then(a.0.cmp(&b.0))
        });

        scored
            .into_iter()
            .map(|(_, name, score, _)| FieldScore {
                field: name.to_string(),
                confidence: score / max_score,
            })
            .filter(|fs| fs.confidence >= self.confidence_threshold)
            .collect()
    }

    /// Walk the top-k detected fields and build one ordered,
    /// deduplicated source list. No detection means the configured
    /// defaults.
    pub fn recommend_sources(&self, fields: &[FieldScore], top_k: usize) -> Vec<SourceId> {
        let mut out: Vec<SourceId> = Vec::new();

        for fs in fields.iter().take(top_k) {
            let Some(profile) = self.profiles.iter().find(|p| p.name == fs.field) else {
                continue;
            };
            for source in &profile.sources {
                if !out.contains(source) {
                    out.push(*source);
                }
            }
        }

        if out.is_empty() {
            out = self.default_sources.clone();
        }
        out
    }
}

fn kw(phrase: &str, weight: f64) -> WeightedKeyword {
    WeightedKeyword {
        phrase: phrase.to_string(),
        weight,
    }
}

fn profile(
    name: &str,
    priority: f64,
    keywords: Vec<WeightedKeyword>,
    sources: Vec<SourceId>,
) -> FieldProfile {
    FieldProfile {
        name: name.to_string(),
        priority,
        keywords,
        sources,
    }
}

impl Default for FieldDetector {
    /// Built-in profile table. Overridable from configuration, but the
    /// engine works out of the box with these.
    fn default() -> Self {
        use SourceId::*;

        let profiles = vec![
            profile(
                "epilepsy_ieeg",
                1.2,
                vec![
                    kw("epilepsy", 10.0),
                    kw("seizure", 10.0),
                    kw("interictal", 9.0),
                    kw("ictal", 9.0),
                    kw("epileptiform", 9.0),
                    kw("seeg", 8.0),
                    kw("ieeg", 8.0),
                    kw("ecog", 8.0),
                    kw("intracranial eeg", 8.0),
                    kw("depth electrode", 7.0),
                    kw("phase amplitude coupling", 7.0),
                    kw("high-frequency oscillation", 7.0),
                    kw("seizure onset zone", 7.0),
                    kw("thalamus", 6.0),
                    kw("hippocampus", 6.0),
                    kw("deep brain stimulation", 6.0),
                    kw("responsive neurostimulation", 6.0),
                ],
                vec![PubMed, SemanticScholar, BioRxiv, LocalKb],
            ),
            profile(
                "signal_processing",
                1.0,
                vec![
                    kw("signal processing", 9.0),
                    kw("wavelet", 8.0),
                    kw("spectrogram", 7.0),
                    kw("fourier", 7.0),
                    kw("fft", 7.0),
                    kw("hilbert transform", 7.0),
                    kw("filter", 5.0),
                    kw("spectral", 6.0),
                    kw("coherence", 6.0),
                    kw("phase locking", 7.0),
                    kw("eeg", 6.0),
                    kw("time series", 5.0),
                ],
                vec![Arxiv, SemanticScholar, PubMed],
            ),
            profile(
                "machine_learning",
                1.0,
                vec![
                    kw("machine learning", 9.0),
                    kw("deep learning", 9.0),
                    kw("neural network", 8.0),
                    kw("transformer", 7.0),
                    kw("lstm", 7.0),
                    kw("foundation model", 8.0),
                    kw("self-supervised", 7.0),
                    kw("classification", 5.0),
                    kw("prediction", 4.0),
                    kw("benchmark", 4.0),
                ],
                vec![Arxiv, SemanticScholar],
            ),
            profile(
                "dynamical_systems",
                1.0,
                vec![
                    kw("dynamical system", 9.0),
                    kw("koopman", 8.0),
                    kw("neural ode", 8.0),
                    kw("sindy", 8.0),
                    kw("attractor", 7.0),
                    kw("bifurcation", 7.0),
                    kw("lyapunov", 7.0),
                    kw("chaos", 6.0),
                    kw("nonlinear dynamics", 8.0),
                    kw("state space", 5.0),
                ],
                vec![Arxiv, SemanticScholar, PubMed],
            ),
            profile(
                "clinical_neuroscience",
                1.0,
                vec![
                    kw("clinical trial", 8.0),
                    kw("patient", 6.0),
                    kw("surgery", 6.0),
                    kw("resection", 7.0),
                    kw("treatment outcome", 7.0),
                    kw("drug-resistant", 7.0),
                    kw("therapy", 5.0),
                    kw("diagnosis", 5.0),
                    kw("neurology", 6.0),
                ],
                vec![PubMed, SemanticScholar, BioRxiv],
            ),
            profile(
                "genomics",
                1.0,
                vec![
                    kw("gene expression", 8.0),
                    kw("genomics", 8.0),
                    kw("transcriptomics", 8.0),
                    kw("mutation", 6.0),
                    kw("crispr", 7.0),
                    kw("sequencing", 6.0),
                    kw("variant", 5.0),
                    kw("protein structure", 6.0),
                ],
                vec![PubMed, BioRxiv, SemanticScholar],
            ),
            profile(
                "research_funding",
                1.0,
                vec![
                    kw("grant", 9.0),
                    kw("funding", 9.0),
                    kw("nih", 8.0),
                    kw("nsf", 8.0),
                    kw("award", 6.0),
                    kw("principal investigator", 7.0),
                    kw("r01", 7.0),
                ],
                vec![NihReporter, SemanticScholar],
            ),
            profile(
                "economics",
                1.0,
                vec![
                    kw("economics", 9.0),
                    kw("market", 6.0),
                    kw("inflation", 7.0),
                    kw("monetary policy", 8.0),
                    kw("gdp", 7.0),
                    kw("labor market", 7.0),
                    kw("econometric", 8.0),
                ],
                vec![SemanticScholar],
            ),
        ];

        Self::new(profiles, vec![SemanticScholar, PubMed])
    }
}
