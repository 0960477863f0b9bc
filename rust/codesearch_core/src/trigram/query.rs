//! Trigram filter construction from patterns and regex.
//!
//! A `TrigramQuery` is a conservative filter: every file the regex can match
//! satisfies the query, but files satisfying the query may still fail
//! verification. Literal runs of at least three bytes are the only source of
//! constraints; anything the analysis cannot reason about degrades to `All`.

use regex_syntax::hir::{Hir, HirKind};

use super::extract::literal_trigrams;
use super::Trigram;
use crate::search::literal::is_literal_pattern;

/// A boolean trigram filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrigramQuery {
    /// All trigrams must be present (conjunction).
    And(Vec<Trigram>),
    /// Every sub-query must match (conjunction of filters).
    AndAll(Vec<TrigramQuery>),
    /// At least one sub-query must match (disjunction).
    Or(Vec<TrigramQuery>),
    /// No constraint — all files are candidates.
    All,
}

impl TrigramQuery {
    /// Returns true if this query matches all files (no filtering).
    pub fn is_all(&self) -> bool {
        matches!(self, TrigramQuery::All)
    }

    /// Conjunction of literal trigrams and nested sub-queries, simplified.
    fn conjoin(mut trigrams: Vec<Trigram>, mut subs: Vec<TrigramQuery>) -> TrigramQuery {
        trigrams.sort_unstable();
        trigrams.dedup();
        subs.retain(|q| !q.is_all());

        if !trigrams.is_empty() {
            if subs.is_empty() {
                return TrigramQuery::And(trigrams);
            }
            subs.insert(0, TrigramQuery::And(trigrams));
        }
        match subs.len() {
            0 => TrigramQuery::All,
            1 => subs.pop().unwrap_or(TrigramQuery::All),
            _ => TrigramQuery::AndAll(subs),
        }
    }
}

/// Build a `TrigramQuery` from a search pattern.
///
/// Literal patterns produce their trigrams directly; anything else is parsed
/// with `regex_syntax` and walked. A pattern the parser rejects yields `All`;
/// the caller has already validated the pattern with the real regex engine.
pub fn build_trigram_query(pattern: &str) -> TrigramQuery {
    if pattern.len() < 3 {
        return TrigramQuery::All;
    }

    if is_literal_pattern(pattern) {
        return TrigramQuery::conjoin(literal_trigrams(pattern.as_bytes()), Vec::new());
    }

    // `utf8(false)` mirrors `regex::bytes`, which accepts byte-oriented classes.
    let parsed = regex_syntax::ParserBuilder::new()
        .utf8(false)
        .build()
        .parse(pattern);
    match parsed {
        Ok(hir) => extract_from_hir(&hir),
        Err(_) => TrigramQuery::All,
    }
}

/// Recursively derive a trigram filter from an HIR node.
fn extract_from_hir(hir: &Hir) -> TrigramQuery {
    match hir.kind() {
        HirKind::Literal(lit) => TrigramQuery::conjoin(literal_trigrams(&lit.0), Vec::new()),
        HirKind::Concat(subs) => {
            // Adjacent literal nodes form one run; trigrams may span them.
            let mut trigrams = Vec::new();
            let mut nested = Vec::new();
            let mut run: Vec<u8> = Vec::new();

            for sub in subs {
                if let HirKind::Literal(lit) = sub.kind() {
                    run.extend_from_slice(&lit.0);
                    continue;
                }
                trigrams.extend(literal_trigrams(&run));
                run.clear();

                match extract_from_hir(sub) {
                    TrigramQuery::All => {}
                    TrigramQuery::And(more) => trigrams.extend(more),
                    other => nested.push(other),
                }
            }
            trigrams.extend(literal_trigrams(&run));

            TrigramQuery::conjoin(trigrams, nested)
        }
        HirKind::Alternation(alts) => {
            let sub_queries: Vec<TrigramQuery> = alts.iter().map(extract_from_hir).collect();

            // One unconstrained branch makes the whole alternation unconstrained.
            if sub_queries.iter().any(|q| q.is_all()) {
                return TrigramQuery::All;
            }
            TrigramQuery::Or(sub_queries)
        }
        HirKind::Repetition(rep) => {
            // Only a repetition that must occur at least once constrains the file.
            if rep.min >= 1 {
                extract_from_hir(&rep.sub)
            } else {
                TrigramQuery::All
            }
        }
        HirKind::Capture(cap) => extract_from_hir(&cap.sub),
        // Class, Look, Empty — no useful trigrams.
        _ => TrigramQuery::All,
    }
}
