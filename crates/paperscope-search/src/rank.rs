//! Impact scoring and deterministic ranking.
//!
//! `impact_score = citation_base * journal_multiplier * recency_bonus`.
//! The sort key is total (score, then year, then title), so ranking is
//! reproducible across runs and input permutations.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use paperscope_common::Paper;

/// Recent papers (publication year within the last 3 years) get a 20%
/// bonus.
const RECENCY_BONUS: f64 = 1.2;
const RECENCY_WINDOW_YEARS: i32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalTier {
    pub venues: Vec<String>,
    pub multiplier: f64,
}

/// Venue-name → tier-multiplier lookup. Case-insensitive substring
/// match, checked tier by tier in declaration order; unlisted venues
/// get the base multiplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalTierTable {
    pub tiers: Vec<JournalTier>,
    pub unlisted_multiplier: f64,
}

impl JournalTierTable {
    pub fn multiplier_for(&self, venue: Option<&str>) -> f64 {
        let Some(venue) = venue else {
            return self.unlisted_multiplier;
        };
        let venue_lower = venue.to_lowercase();

        for tier in &self.tiers {
            for name in &tier.venues {
                if venue_lower.contains(&name.to_lowercase()) {
                    return tier.multiplier;
                }
            }
        }
        self.unlisted_multiplier
    }
}

fn tier(multiplier: f64, venues: &[&str]) -> JournalTier {
    JournalTier {
        venues: venues.iter().map(|v| v.to_string()).collect(),
        multiplier,
    }
}

impl Default for JournalTierTable {
    fn default() -> Self {
        Self {
            tiers: vec![
                tier(3.0, &[
                    "Nature", "Science", "Cell", "Neuron", "PNAS",
                    "Nature Neuroscience", "Nature Communications",
                    "Nature Methods", "Nature Medicine", "Nature Biotechnology",
                    "Nature Computational Science",
                ]),
                tier(2.0, &[
                    "Brain", "Epilepsia", "NeuroImage", "Journal of Neuroscience",
                    "PLOS Computational Biology", "eLife", "Current Biology",
                    "Annals of Neurology", "Neurology", "Brain Stimulation",
                ]),
                tier(1.5, &[
                    "Clinical Neurophysiology",
                    "IEEE Transactions on Biomedical Engineering",
                    "Journal of Neural Engineering", "Epilepsy Research",
                    "Epilepsy & Behavior", "Scientific Reports", "PLOS ONE",
                    "Frontiers in Neuroscience", "Journal of Neuroscience Methods",
                ]),
            ],
            unlisted_multiplier: 1.0,
        }
    }
}

pub struct RelevanceRanker {
    tiers: JournalTierTable,
}

impl RelevanceRanker {
    pub fn new(tiers: JournalTierTable) -> Self {
        Self { tiers }
    }

    /// Missing citation counts score as 0 — the paper is ranked, not
    /// excluded.
    pub fn score(&self, paper: &Paper) -> f64 {
        self.score_at(paper, Utc::now().year())
    }

    fn score_at(&self, paper: &Paper, current_year: i32) -> f64 {
        let citation_base = paper.citation_count.unwrap_or(0) as f64;
        let journal_multiplier = self.tiers.multiplier_for(paper.venue.as_deref());
        let recency_bonus = match paper.year {
            Some(year) if year > current_year - RECENCY_WINDOW_YEARS => RECENCY_BONUS,
            _ => 1.0,
        };

        citation_base * journal_multiplier * recency_bonus
    }

    /// Totally ordered ranking: impact desc, year desc (absent year
    /// last), title lexical asc.
    pub fn rank(&self, mut papers: Vec<Paper>) -> Vec<Paper> {
        let current_year = Utc::now().year();
        for paper in &mut papers {
            paper.impact_score = self.score_at(paper, current_year);
        }

        papers.sort_by(|a, b| {
            b.impact_score
                .total_cmp(&a.impact_score)
                .then_with(|| b.year.unwrap_or(i32::MIN).cmp(&a.year.unwrap_or(i32::MIN)))
                .then_with(|| a.title.cmp(&b.title))
        });
        papers
    }
}

impl Default for RelevanceRanker {
    fn default() -> Self {
        Self::new(JournalTierTable::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paperscope_common::SourceId;

    fn paper(title: &str, venue: Option<&str>, year: Option<i32>, citations: Option<u32>) -> Paper {
        Paper {
            title: title.to_string(),
            authors: vec![],
            year,
            abstract_text: None,
            citation_count: citations,
            venue: venue.map(String::from),
            doi: None,
            pmid: None,
            arxiv_id: None,
            url: None,
            source: SourceId::PubMed,
            impact_score: 0.0,
        }
    }

    #[test]
    fn test_tier_lookup_is_case_insensitive() {
        let table = JournalTierTable::default();
        assert_eq!(table.multiplier_for(Some("NATURE COMMUNICATIONS")), 3.0);
        assert_eq!(table.multiplier_for(Some("Nature Computational Science")), 3.0);
        assert_eq!(table.multiplier_for(Some("epilepsia")), 2.0);
        assert_eq!(table.multiplier_for(Some("PLOS ONE")), 1.5);
        assert_eq!(table.multiplier_for(Some("Obscure Journal")), 1.0);
        assert_eq!(table.multiplier_for(None), 1.0);
    }

    #[test]
    fn test_impact_score_formula() {
        let ranker = RelevanceRanker::default();

        // Tier-1 recent paper: 100 * 3.0 * 1.2
        let p = paper("a", Some("Nature"), Some(2025), Some(100));
        assert!((ranker.score_at(&p, 2026) - 360.0).abs() < 1e-9);

        // Old unlisted venue: 10 * 1.0 * 1.0
        let p = paper("b", Some("Some Journal"), Some(2015), Some(10));
        assert!((ranker.score_at(&p, 2026) - 10.0).abs() < 1e-9);

        // Exactly at the window edge gets no bonus
        let p = paper("c", None, Some(2023), Some(10));
        assert!((ranker.score_at(&p, 2026) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_citations_score_zero_not_excluded() {
        let ranker = RelevanceRanker::default();
        let ranked = ranker.rank(vec![
            paper("uncited", Some("Nature"), Some(2024), None),
            paper("cited", None, Some(2010), Some(1)),
        ]);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].title, "cited");
        assert_eq!(ranked[1].impact_score, 0.0);
    }

    #[test]
    fn test_rank_is_permutation_invariant() {
        let ranker = RelevanceRanker::default();
        let papers = vec![
            paper("alpha", Some("Nature"), Some(2024), Some(50)),
            paper("beta", Some("Epilepsia"), Some(2024), Some(75)),
            paper("gamma", None, Some(2020), Some(10)),
            paper("delta", None, Some(2020), Some(10)),
            paper("epsilon", Some("PLOS ONE"), None, Some(100)),
        ];

        let mut reversed = papers.clone();
        reversed.reverse();

        let a: Vec<String> = ranker.rank(papers).into_iter().map(|p| p.title).collect();
        let b: Vec<String> = ranker.rank(reversed).into_iter().map(|p| p.title).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tie_break_year_then_title() {
        let ranker = RelevanceRanker::default();
        // Identical scores: same citations, unlisted venues, old years
        let ranked = ranker.rank(vec![
            paper("b-title", None, Some(2010), Some(10)),
            paper("a-title", None, Some(2012), Some(10)),
            paper("c-title", None, Some(2012), Some(10)),
        ]);
        let titles: Vec<&str> = ranked.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["a-title", "c-title", "b-title"]);
    }
}
