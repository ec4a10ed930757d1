//! Relevance ranking for the news set when it overflows the report budget.

use std::sync::Arc;

use regex::Regex;
use std::sync::LazyLock;
use tokio::time::timeout;
use tracing::{debug, warn};

use propsift_common::{NewsRecord, PipelineConfig};

use crate::parallel::parallel_map;
use crate::traits::LlmClient;

/// Score given to an item whose scoring call failed: middle of the scale, so
/// an outage neither promotes nor buries it.
const NEUTRAL_SCORE: u8 = 5;

static RE_FIRST_INT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

pub struct RelevanceRanker {
    llm: Arc<dyn LlmClient>,
    config: Arc<PipelineConfig>,
}

impl RelevanceRanker {
    pub fn new(llm: Arc<dyn LlmClient>, config: Arc<PipelineConfig>) -> Self {
        Self { llm, config }
    }

    /// Trim an overflowing news set to the configured target. Sets at or
    /// under the target pass through untouched, in their original order.
    ///
    /// Kept items come back in rank order: scored 0-10, stable-sorted
    /// descending, top `news_target` kept, then scores below
    /// `relevance_cutoff` dropped — unless that leaves fewer than
    /// `news_floor` items, in which case the floor is filled by rank
    /// regardless of score.
    pub async fn rank(&self, records: Vec<NewsRecord>) -> Vec<NewsRecord> {
        if records.len() <= self.config.news_target {
            return records;
        }

        let indexed: Vec<(usize, NewsRecord)> = records.into_iter().enumerate().collect();
        let mut scored: Vec<((usize, NewsRecord), u8)> =
            parallel_map(indexed, self.config.llm_workers, |(idx, record)| async move {
                let score = self.score(&record).await;
                ((idx, record), score)
            })
            .await;

        // restore input order so the descending sort has a stable tie-break
        scored.sort_by_key(|((idx, _), _)| *idx);
        scored.sort_by(|(_, a), (_, b)| b.cmp(a));

        let ranked: Vec<(NewsRecord, u8)> = scored
            .into_iter()
            .map(|((_, record), score)| (record, score))
            .collect();

        let strict: Vec<&(NewsRecord, u8)> = ranked
            .iter()
            .take(self.config.news_target)
            .filter(|(_, score)| *score >= self.config.relevance_cutoff)
            .collect();

        if strict.len() >= self.config.news_floor {
            strict.into_iter().map(|(record, _)| record.clone()).collect()
        } else {
            debug!(
                strict = strict.len(),
                floor = self.config.news_floor,
                "relevance cutoff too aggressive, relaxing to rank order"
            );
            ranked
                .into_iter()
                .take(self.config.news_floor)
                .map(|(record, _)| record)
                .collect()
        }
    }

    async fn score(&self, record: &NewsRecord) -> u8 {
        let prompt = format!(
            "為以下香港地產新聞的重要性評分,0至10分,只回答一個整數。\n\
             評分準則: 重大成交、政策變動、影響物業估值的消息給高分;\n\
             例行數據、人事消息給低分。\n\n\
             標題: {}\n\
             摘要: {}",
            record.topic, record.summary
        );
        let call = self.llm.complete(
            &prompt,
            self.config.score_max_tokens,
            self.config.score_temperature,
        );

        match timeout(self.config.llm_timeout, call).await {
            Ok(Ok(response)) => parse_score(&response).unwrap_or_else(|| {
                debug!(topic = %record.topic, response = %response, "unparseable score, using neutral");
                NEUTRAL_SCORE
            }),
            Ok(Err(e)) => {
                warn!(topic = %record.topic, error = %e, "scoring call failed, using neutral");
                NEUTRAL_SCORE
            }
            Err(_) => {
                warn!(topic = %record.topic, "scoring call timed out, using neutral");
                NEUTRAL_SCORE
            }
        }
    }
}

/// First integer in the response, accepted only if it is on the 0-10 scale.
fn parse_score(response: &str) -> Option<u8> {
    let m = RE_FIRST_INT.find(response)?;
    let value: u32 = m.as_str().parse().ok()?;
    if value <= 10 {
        Some(value as u8)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use propsift_common::{AssetCategory, PropsiftError};
    use std::collections::HashMap;

    fn news(topic: &str) -> NewsRecord {
        NewsRecord {
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            source: "852.house".to_string(),
            asset_category: AssetCategory::Commercial,
            topic: topic.to_string(),
            summary: String::new(),
            url: format!("https://example.com/{topic}"),
        }
    }

    /// Answers with a per-topic score; unknown topics get an unparseable
    /// response, exercising the neutral fallback.
    struct ScoreTable {
        scores: HashMap<String, &'static str>,
    }

    #[async_trait]
    impl LlmClient for ScoreTable {
        async fn complete(&self, prompt: &str, _m: u32, _t: f32) -> Result<String, PropsiftError> {
            for (topic, answer) in &self.scores {
                if prompt.contains(topic.as_str()) {
                    return Ok(answer.to_string());
                }
            }
            Ok("無法評分".to_string())
        }
    }

    fn ranker(scores: Vec<(&str, &'static str)>) -> RelevanceRanker {
        RelevanceRanker::new(
            Arc::new(ScoreTable {
                scores: scores
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            }),
            Arc::new(PipelineConfig::default()),
        )
    }

    #[test]
    fn score_parsing() {
        assert_eq!(parse_score("8"), Some(8));
        assert_eq!(parse_score("評分: 10分"), Some(10));
        assert_eq!(parse_score("50"), None);
        assert_eq!(parse_score("沒有數字"), None);
    }

    #[tokio::test]
    async fn under_target_passes_through_unchanged() {
        let ranker = ranker(vec![]);
        let records: Vec<NewsRecord> = (0..20).map(|i| news(&format!("新聞{i}"))).collect();
        let out = ranker.rank(records.clone()).await;
        assert_eq!(out.len(), 20);
        for (a, b) in records.iter().zip(out.iter()) {
            assert_eq!(a.topic, b.topic);
        }
    }

    #[tokio::test]
    async fn overflow_keeps_exactly_target_when_all_score_high() {
        // 25 items, all scoring 8: top 20 by rank, all clear the cutoff
        let topics: Vec<String> = (0..25).map(|i| format!("新聞{i:02}")).collect();
        let scores: Vec<(&str, &'static str)> =
            topics.iter().map(|t| (t.as_str(), "8")).collect();
        let ranker = ranker(scores);
        let out = ranker.rank(topics.iter().map(|t| news(t)).collect()).await;
        assert_eq!(out.len(), 20);
        // equal scores: rank order falls back to input order
        assert_eq!(out[0].topic, "新聞00");
        assert_eq!(out[19].topic, "新聞19");
    }

    #[tokio::test]
    async fn aggressive_cutoff_relaxes_to_floor() {
        // 25 items, only 10 score above the cutoff: relax to top 15 by rank
        let topics: Vec<String> = (0..25).map(|i| format!("新聞{i:02}")).collect();
        let scores: Vec<(&str, &'static str)> = topics
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), if i < 10 { "9" } else { "2" }))
            .collect();
        let ranker = ranker(scores);
        let out = ranker.rank(topics.iter().map(|t| news(t)).collect()).await;
        assert_eq!(out.len(), 15);
        // the ten high scorers lead, low scorers fill the floor in input order
        assert_eq!(out[0].topic, "新聞00");
        assert_eq!(out[9].topic, "新聞09");
        assert_eq!(out[10].topic, "新聞10");
    }

    #[tokio::test]
    async fn unscorable_items_get_neutral_score() {
        // nothing in the table: every item scores neutral 5, below the
        // cutoff, so the floor rule keeps the top 15 by input order
        let ranker = ranker(vec![]);
        let records: Vec<NewsRecord> = (0..25).map(|i| news(&format!("新聞{i:02}"))).collect();
        let out = ranker.rank(records).await;
        assert_eq!(out.len(), 15);
        assert_eq!(out[0].topic, "新聞00");
        assert_eq!(out[14].topic, "新聞14");
    }
}
