//! Cross-source deduplication.
//!
//! Staged identity: DOI first, then PMID, then arXiv id, and for
//! papers with no identifiers at all, normalized title + publication
//! year (with a fuzzy-title guard for small formatting differences).
//! Duplicates merge into the richer record, keeping the union of
//! populated fields; first-seen output order is preserved.

use std::collections::HashMap;

use paperscope_common::{Paper, SourceId};

/// Jaro-Winkler similarity above which two normalized same-year titles
/// are treated as the same paper.
const TITLE_SIMILARITY_THRESHOLD: f64 = 0.93;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IdentityKey {
    Doi(String),
    Pmid(String),
    ArxivId(String),
}

fn nonempty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Every identifier a record carries. A record indexed under all of
/// them merges with any other record sharing any one — the common case
/// being one corpus reporting only a PMID while another reports that
/// PMID alongside a DOI.
fn identity_keys(paper: &Paper) -> Vec<IdentityKey> {
    let mut keys = Vec::new();
    if let Some(doi) = nonempty(&paper.doi) {
        keys.push(IdentityKey::Doi(doi.to_lowercase()));
    }
    if let Some(pmid) = nonempty(&paper.pmid) {
        keys.push(IdentityKey::Pmid(pmid.to_string()));
    }
    if let Some(arxiv_id) = nonempty(&paper.arxiv_id) {
        // Strip the version suffix so v1/v2 of the same preprint merge
        let base = arxiv_id
            .rsplit_once('v')
            .filter(|(_, v)| !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()))
            .map(|(base, _)| base)
            .unwrap_or(arxiv_id);
        keys.push(IdentityKey::ArxivId(base.to_lowercase()));
    }
    keys
}

/// Lowercase, strip punctuation, collapse whitespace.
fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn source_rank(source: SourceId, order: &[SourceId]) -> usize {
    order.iter().position(|s| *s == source).unwrap_or(usize::MAX)
}

/// Merge two records for the same paper: the one with more populated
/// fields wins, ties prefer the source earliest in `order`, and the
/// winner's gaps are filled from the loser.
fn merge(a: Paper, b: Paper, order: &[SourceId]) -> Paper {
    let a_rich = a.populated_fields();
    let b_rich = b.populated_fields();

    let (mut winner, loser) = if a_rich > b_rich {
        (a, b)
    } else if b_rich > a_rich {
        (b, a)
    } else if source_rank(a.source, order) <= source_rank(b.source, order) {
        (a, b)
    } else {
        (b, a)
    };

    winner.citation_count = winner.citation_count.or(loser.citation_count);
    winner.abstract_text = winner.abstract_text.or(loser.abstract_text);
    winner.venue = winner.venue.or(loser.venue);
    winner.doi = winner.doi.or(loser.doi);
    winner.pmid = winner.pmid.or(loser.pmid);
    winner.arxiv_id = winner.arxiv_id.or(loser.arxiv_id);
    winner.url = winner.url.or(loser.url);
    winner.year = winner.year.or(loser.year);
    if winner.authors.is_empty() {
        winner.authors = loser.authors;
    }
    winner
}

/// Deduplicate the merged multi-source result set. `order` is the
/// recommended-source order used for merge tie-breaks.
pub fn dedupe(papers: Vec<Paper>, order: &[SourceId]) -> Vec<Paper> {
    let mut out: Vec<Option<Paper>> = Vec::with_capacity(papers.len());
    let mut by_key: HashMap<IdentityKey, usize> = HashMap::new();
    // (normalized title, year, output slot) for identifier-less papers
    let mut by_title: Vec<(String, Option<i32>, usize)> = Vec::new();

    for paper in papers {
        let keys = identity_keys(&paper);
        if !keys.is_empty() {
            // All slots any of this record's identifiers resolve to.
            // Vacated slots (left behind by an earlier bridging merge)
            // are skipped.
            let mut slots: Vec<usize> = keys
                .iter()
                .filter_map(|k| by_key.get(k).copied())
                .filter(|&slot| out[slot].is_some())
                .collect();
            slots.sort_unstable();
            slots.dedup();

            match slots.first() {
                Some(&slot) => {
                    // A record carrying several identifiers can bridge
                    // entries seen as distinct so far; fold them all
                    // into the earliest slot.
                    let mut merged = paper;
                    for &s in &slots {
                        if let Some(entry) = out[s].take() {
                            merged = merge(entry, merged, order);
                        }
                    }
                    // Identifiers gained in the merge index here too
                    for key in identity_keys(&merged) {
                        by_key.insert(key, slot);
                    }
                    out[slot] = Some(merged);
                }
                None => {
                    out.push(Some(paper));
                    for key in keys {
                        by_key.insert(key, out.len() - 1);
                    }
                }
            }
            continue;
        }

        let title = normalize_title(&paper.title);
        let matched = by_title.iter().find(|(existing, year, _)| {
            *year == paper.year
                && (existing == &title
                    || strsim::jaro_winkler(existing, &title) >= TITLE_SIMILARITY_THRESHOLD)
        });

        match matched {
            Some(&(_, _, slot)) => {
                let existing = out[slot].take().expect("slot occupied");
                out[slot] = Some(merge(existing, paper, order));
            }
            None => {
                out.push(Some(paper));
                by_title.push((title, out[out.len() - 1].as_ref().and_then(|p| p.year), out.len() - 1));
            }
        }
    }

    out.into_iter().flatten().collect()
}
