//! Duplicate collapse for both record streams.
//!
//! Transactions: the same deal reported by several outlets, collapsed by
//! normalized property + date, keeping the most complete record. News: exact
//! topic dedup first, then a sequential LLM-assisted pass for same-story
//! rewrites, guarded by a cheap character-overlap check.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, warn};

use propsift_common::{NewsRecord, PipelineConfig, TransactionRecord};

use crate::traits::LlmClient;

/// Lowercase and strip all whitespace, including full-width U+3000.
pub fn normalize_key(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// How many of the optional facts a record actually carries.
fn completeness(record: &TransactionRecord) -> usize {
    [
        record.district.is_some(),
        record.floor.is_some(),
        record.unit.is_some(),
        record.price.is_some(),
        record.area.is_some(),
        record.unit_price.is_some(),
        record.buyer.is_some(),
        record.seller.is_some(),
        record.yield_rate.is_some(),
    ]
    .into_iter()
    .filter(|b| *b)
    .count()
}

/// Collapse duplicate transactions. Group order follows first occurrence;
/// within a group the most complete record wins, earliest record on ties.
/// Groups that actually collapsed get a dedup_flag for human review;
/// singleton flags are left untouched, so a second pass is a no-op.
pub fn dedup_transactions(records: Vec<TransactionRecord>) -> Vec<TransactionRecord> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<TransactionRecord>> = HashMap::new();

    for record in records {
        let key = format!("{}|{}", normalize_key(&record.property), record.date);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(record);
    }

    let mut out = Vec::with_capacity(order.len());
    for key in order {
        let Some(group) = groups.remove(&key) else {
            continue;
        };
        let n = group.len();
        let mut best: Option<TransactionRecord> = None;
        for record in group {
            match &best {
                Some(current) if completeness(current) >= completeness(&record) => {}
                _ => best = Some(record),
            }
        }
        if let Some(mut winner) = best {
            if n > 1 {
                winner.dedup_flag = format!("REVIEW: {n} duplicates found");
            }
            out.push(winner);
        }
    }
    out
}

/// Share of characters the shorter normalized topic has in common with the
/// longer one. 0.0 when either topic normalizes to nothing.
pub fn topic_overlap(a: &str, b: &str) -> f64 {
    let set_a: HashSet<char> = normalize_key(a).chars().collect();
    let set_b: HashSet<char> = normalize_key(b).chars().collect();
    let min = set_a.len().min(set_b.len());
    if min == 0 {
        return 0.0;
    }
    let shared = set_a.intersection(&set_b).count();
    shared as f64 / min as f64
}

pub struct Deduplicator {
    llm: Arc<dyn LlmClient>,
    config: Arc<PipelineConfig>,
}

impl Deduplicator {
    pub fn new(llm: Arc<dyn LlmClient>, config: Arc<PipelineConfig>) -> Self {
        Self { llm, config }
    }

    /// Exact pass first (normalized topic, first occurrence wins), then a
    /// sequential scan where each candidate is compared against the already
    /// accepted set. The LLM is only consulted when the overlap guard says
    /// the topics could plausibly be the same story.
    pub async fn dedup_news(&self, records: Vec<NewsRecord>) -> Vec<NewsRecord> {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for record in records {
            if seen.insert(normalize_key(&record.topic)) {
                unique.push(record);
            }
        }

        let mut kept: Vec<NewsRecord> = Vec::new();
        'candidates: for candidate in unique {
            for accepted in &kept {
                if topic_overlap(&candidate.topic, &accepted.topic) < self.config.topic_overlap_min {
                    continue;
                }
                if self.same_story(&candidate, accepted).await {
                    debug!(dropped = %candidate.topic, kept = %accepted.topic, "semantic duplicate");
                    continue 'candidates;
                }
            }
            kept.push(candidate);
        }
        kept
    }

    /// Yes/no LLM check. Any failure counts as "different story": losing a
    /// duplicate row is cheaper than losing a real article.
    async fn same_story(&self, a: &NewsRecord, b: &NewsRecord) -> bool {
        let prompt = format!(
            "以下兩個香港地產新聞標題是否報導同一件事?只回答 yes 或 no。\n\n\
             標題一: {}\n\
             標題二: {}",
            a.topic, b.topic
        );
        let call = self.llm.complete(
            &prompt,
            self.config.similarity_max_tokens,
            self.config.similarity_temperature,
        );

        match timeout(self.config.llm_timeout, call).await {
            Ok(Ok(response)) => {
                let answer = response.trim().to_lowercase();
                answer.contains("yes") || answer.contains('是')
            }
            Ok(Err(e)) => {
                warn!(error = %e, "similarity check failed, keeping both");
                false
            }
            Err(_) => {
                warn!("similarity check timed out, keeping both");
                false
            }
        }
    }
}
