//! End-to-end orchestration: discover, gate, classify, enrich, extract,
//! filter, dedup, rank.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use propsift_common::{
    ArticleStub, AssetCategory, Category, ClassifiedArticle, EnrichedArticle, NewsRecord,
    PipelineConfig, PropsiftError, TransactionRecord,
};

use crate::classifier::Classifier;
use crate::dedup::{self, Deduplicator};
use crate::extractor::DetailExtractor;
use crate::parallel::parallel_map;
use crate::post_filter;
use crate::prefilter::{self, PreFilter};
use crate::ranker::RelevanceRanker;
use crate::traits::{Fetcher, Lister, LlmClient};

#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub transactions: Vec<TransactionRecord>,
    pub news: Vec<NewsRecord>,
}

pub struct Pipeline {
    fetcher: Arc<dyn Fetcher>,
    lister: Arc<dyn Lister>,
    classifier: Classifier,
    extractor: DetailExtractor,
    deduplicator: Deduplicator,
    ranker: RelevanceRanker,
    config: Arc<PipelineConfig>,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        lister: Arc<dyn Lister>,
        llm: Arc<dyn LlmClient>,
        config: PipelineConfig,
    ) -> Self {
        let config = Arc::new(config);
        Self {
            fetcher,
            lister,
            classifier: Classifier::new(llm.clone(), config.clone()),
            extractor: DetailExtractor::new(llm.clone(), config.clone()),
            deduplicator: Deduplicator::new(llm.clone(), config.clone()),
            ranker: RelevanceRanker::new(llm, config.clone()),
            config,
        }
    }

    /// Walk the article index page by page until the fetcher reports the end
    /// or a page yields nothing. Stubs are unique by URL, first wins.
    pub async fn discover(&self, max_pages: u32) -> Result<Vec<ArticleStub>, PropsiftError> {
        let mut seen = HashSet::new();
        let mut stubs = Vec::new();
        for page in 1..=max_pages {
            let Some(html) = self.fetcher.fetch_page(page).await? else {
                break;
            };
            let found = self.lister.extract_stubs(&html);
            if found.is_empty() {
                break;
            }
            for stub in found {
                if seen.insert(stub.url.clone()) {
                    stubs.push(stub);
                }
            }
        }
        info!(count = stubs.len(), "discovered article stubs");
        Ok(stubs)
    }

    /// Run every stage over a set of stubs. Per-article failures degrade to
    /// fallbacks inside the stages; this method itself cannot fail.
    pub async fn run(&self, stubs: Vec<ArticleStub>) -> PipelineOutput {
        let total = stubs.len();

        // asking-price listings never survive any path, so drop them before
        // spending LLM calls
        let stubs: Vec<ArticleStub> = stubs
            .into_iter()
            .filter(|s| !prefilter::is_listing(&s.gate_text()))
            .collect();
        debug!(dropped = total - stubs.len(), "dropped asking-price listings");

        let classified = self.classifier.categorize_batch(stubs).await;

        let gate = PreFilter::new(&self.config);
        let mut routed: Vec<ClassifiedArticle> = Vec::new();
        for article in classified {
            match article.category {
                Category::Transactions => {
                    if gate.admit(&article.stub) {
                        routed.push(article);
                    } else {
                        debug!(url = %article.stub.url, "transaction below thresholds, dropped");
                    }
                }
                Category::News => routed.push(article),
                Category::NewProperty | Category::Exclude => {
                    debug!(url = %article.stub.url, category = %article.category, "out of scope, dropped");
                }
            }
        }

        let enriched = self.enrich(routed).await;
        let (tx_articles, news_articles): (Vec<EnrichedArticle>, Vec<EnrichedArticle>) = enriched
            .into_iter()
            .partition(|a| a.category == Category::Transactions);

        let transactions = self.transaction_stream(tx_articles).await;
        let news = self.news_stream(news_articles).await;

        info!(
            transactions = transactions.len(),
            news = news.len(),
            "pipeline complete"
        );
        PipelineOutput { transactions, news }
    }

    /// Fetch full bodies. A failed fetch falls back to the preview text so
    /// one dead link never aborts the batch.
    async fn enrich(&self, articles: Vec<ClassifiedArticle>) -> Vec<EnrichedArticle> {
        let fetched = parallel_map(articles, self.config.llm_workers, |article| async move {
            let result = self.fetcher.fetch_article(&article.stub.url).await;
            (article, result)
        })
        .await;

        fetched
            .into_iter()
            .map(|(article, result)| match result {
                Ok(page) => EnrichedArticle {
                    source_name: resolve_source(&article.stub, page.source_name, &self.config),
                    stub: article.stub,
                    category: article.category,
                    full_content: page.content,
                },
                Err(e) => {
                    warn!(url = %article.stub.url, error = %e, "fetch failed, using preview text");
                    EnrichedArticle {
                        source_name: resolve_source(&article.stub, None, &self.config),
                        full_content: article.stub.preview_text.clone(),
                        stub: article.stub,
                        category: article.category,
                    }
                }
            })
            .collect()
    }

    async fn transaction_stream(&self, articles: Vec<EnrichedArticle>) -> Vec<TransactionRecord> {
        let extracted = parallel_map(articles, self.config.llm_workers, |article| async move {
            let record = self.extractor.extract_transaction(&article).await;
            (article, record)
        })
        .await;

        let before = extracted.len();
        let passing: Vec<TransactionRecord> = extracted
            .into_iter()
            .map(|(_, record)| record)
            .filter(|record| post_filter::passes(record, &self.config))
            .collect();
        debug!(
            rejected = before - passing.len(),
            "transactions below extracted thresholds"
        );

        dedup::dedup_transactions(passing)
    }

    async fn news_stream(&self, articles: Vec<EnrichedArticle>) -> Vec<NewsRecord> {
        let extracted = parallel_map(articles, self.config.llm_workers, |article| async move {
            let record = self.extractor.extract_news(&article).await;
            (article, record)
        })
        .await;

        let relevant: Vec<NewsRecord> = extracted
            .into_iter()
            .map(|(_, record)| record)
            .filter(|record| record.asset_category != AssetCategory::General)
            .collect();

        let deduped = self.deduplicator.dedup_news(relevant).await;
        self.ranker.rank(deduped).await
    }
}

/// Source attribution chain: page metadata, then a tag matching a known
/// publication, then the configured placeholder.
fn resolve_source(stub: &ArticleStub, from_page: Option<String>, config: &PipelineConfig) -> String {
    if let Some(name) = from_page {
        let name = name.trim();
        if !name.is_empty() && name != config.default_source {
            return name.to_string();
        }
    }
    for tag in &stub.tags {
        for known in &config.sources {
            if tag.contains(known.as_str()) {
                return known.clone();
            }
        }
    }
    config.default_source.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(tags: &[&str]) -> ArticleStub {
        ArticleStub {
            title: "標題".to_string(),
            url: "https://example.com/a".to_string(),
            preview_text: String::new(),
            published_date: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn page_metadata_wins() {
        let config = PipelineConfig::default();
        let got = resolve_source(&stub(&["信報財經"]), Some("明報".to_string()), &config);
        assert_eq!(got, "明報");
    }

    #[test]
    fn placeholder_metadata_falls_through_to_tags() {
        let config = PipelineConfig::default();
        let got = resolve_source(&stub(&["信報財經"]), Some("852.house".to_string()), &config);
        assert_eq!(got, "信報");
    }

    #[test]
    fn no_attribution_uses_default() {
        let config = PipelineConfig::default();
        let got = resolve_source(&stub(&["豪宅", "成交"]), None, &config);
        assert_eq!(got, "852.house");
    }
}
