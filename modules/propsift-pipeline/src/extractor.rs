//! Structured fact extraction over full article bodies.
//!
//! One LLM call per article, strict-JSON prompt, then the coercion layer.
//! Extraction never propagates an error: whatever goes wrong, the article
//! yields a placeholder record that keeps its title, date and URL so a human
//! can still chase it in the output.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio::time::timeout;
use tracing::{debug, warn};

use ai_client::util::truncate_chars;
use propsift_common::{
    AssetCategory, EnrichedArticle, NewsRecord, PipelineConfig, TransactionRecord,
};

use crate::coerce;
use crate::traits::LlmClient;

/// Body text beyond this many characters adds cost, not facts.
const CONTENT_CAP: usize = 3_000;

pub struct DetailExtractor {
    llm: Arc<dyn LlmClient>,
    config: Arc<PipelineConfig>,
}

impl DetailExtractor {
    pub fn new(llm: Arc<dyn LlmClient>, config: Arc<PipelineConfig>) -> Self {
        Self { llm, config }
    }

    pub async fn extract_transaction(&self, article: &EnrichedArticle) -> TransactionRecord {
        let date = record_date(article);
        let prompt = transaction_prompt(article);
        let call = self.llm.complete(
            &prompt,
            self.config.extract_max_tokens,
            self.config.extract_temperature,
        );

        match timeout(self.config.llm_timeout, call).await {
            Ok(Ok(response)) => match coerce::json_payload(&response) {
                Some(payload) => coerce::transaction_record(&payload, article, date),
                None => {
                    debug!(url = %article.stub.url, "no JSON in extraction response, using placeholder");
                    fallback_transaction(article, date)
                }
            },
            Ok(Err(e)) => {
                warn!(url = %article.stub.url, error = %e, "transaction extraction failed, using placeholder");
                fallback_transaction(article, date)
            }
            Err(_) => {
                warn!(url = %article.stub.url, "transaction extraction timed out, using placeholder");
                fallback_transaction(article, date)
            }
        }
    }

    pub async fn extract_news(&self, article: &EnrichedArticle) -> NewsRecord {
        let date = record_date(article);
        let prompt = news_prompt(article);
        let call = self.llm.complete(
            &prompt,
            self.config.summary_max_tokens,
            self.config.summary_temperature,
        );

        match timeout(self.config.llm_timeout, call).await {
            Ok(Ok(response)) => match coerce::json_payload(&response) {
                Some(payload) => coerce::news_record(&payload, article, date),
                None => {
                    debug!(url = %article.stub.url, "no JSON in summary response, using placeholder");
                    fallback_news(article, date)
                }
            },
            Ok(Err(e)) => {
                warn!(url = %article.stub.url, error = %e, "news extraction failed, using placeholder");
                fallback_news(article, date)
            }
            Err(_) => {
                warn!(url = %article.stub.url, "news extraction timed out, using placeholder");
                fallback_news(article, date)
            }
        }
    }
}

fn record_date(article: &EnrichedArticle) -> NaiveDate {
    article
        .stub
        .published_date
        .unwrap_or_else(|| Utc::now().date_naive())
}

fn transaction_prompt(article: &EnrichedArticle) -> String {
    format!(
        "從以下香港物業成交報導中抽取交易資料,以JSON回答,不要加任何說明。\n\n\
         標題: {}\n\
         內文: {}\n\n\
         JSON欄位:\n\
         {{\n\
           \"district\": \"地區,如 中環\",\n\
           \"property\": \"物業名稱,如有座號請一併寫入,如 名門 2座\",\n\
           \"asset_type\": \"寫字樓/商鋪/住宅/洋房/工廈/酒店/停車位/商業\",\n\
           \"floor\": \"樓層,全幢交易寫 全幢\",\n\
           \"unit\": \"單位,全幢交易寫 N/A\",\n\
           \"nature\": \"Sales 或 Lease\",\n\
           \"price\": 成交價(港元數字),\n\
           \"area\": 面積(平方呎數字),\n\
           \"unit_price\": 呎價(港元數字),\n\
           \"yield_rate\": \"回報率,如 7厘\",\n\
           \"seller\": \"賣方\",\n\
           \"buyer\": \"買方\"\n\
         }}\n\n\
         內文沒有提及的欄位一律填 \"N/A\"。",
        article.stub.title,
        truncate_chars(&article.full_content, CONTENT_CAP)
    )
}

fn news_prompt(article: &EnrichedArticle) -> String {
    format!(
        "請根據以下新聞提供一段總結,大約120中文字,需要事實,毋需你的評語,\
         如果有數據或引用,請儘量包括在總結中,但不需要提及當前報章的名字:\n\n\
         標題: {}\n\
         內容: {}\n\n\
         另外,請判斷這則新聞的物業類別(選擇一個):\n\
         - Residential (住宅市場相關,包括住宅交易趨勢、估值、市場分析)\n\
         - Commercial (商業物業相關,包括寫字樓、商鋪、工廈市場趨勢和估值)\n\n\
         重要過濾規則:\n\
         1. 只選擇與物業估值、市場趨勢、價格分析直接相關的新聞\n\
         2. 排除以下類型:\n\
         - 專欄作家文章 (專欄作家、專欄作者等)\n\
         - 單一物業交易詳情 (只講某個物業的成交,沒有市場分析)\n\
         - 非香港地產新聞 (內地、海外地產新聞)\n\
         - 與估值無關的一般新聞 (如社會新聞、政治新聞等)\n\
         - 物業質素問題、投訴、驗收問題 (如樓花質素差誤、手工粗糙、空鼓、用料問題等,除非涉及估值影響)\n\
         - 物業管理相關 (管理費、業主會、法團等,除非涉及估值)\n\
         3. 必須是關於香港地產市場的估值、價格趨勢、市場分析\n\
         4. 政策新聞如果影響物業估值或市場價格,選Residential或Commercial;如果只是一般政策不涉及估值,選General\n\
         5. 如果新聞不符合以上條件,請選擇\"General\"以排除\n\n\
         請以JSON格式回覆:\n\
         {{\n\
           \"summary\": \"您的120字總結\",\n\
           \"asset_category\": \"Residential/Commercial/General\"\n\
         }}",
        article.stub.title,
        truncate_chars(&article.full_content, CONTENT_CAP)
    )
}

fn fallback_transaction(article: &EnrichedArticle, date: NaiveDate) -> TransactionRecord {
    TransactionRecord {
        date,
        district: None,
        property: truncate_chars(&article.stub.title, 50).to_string(),
        asset_type: None,
        floor: None,
        unit: None,
        nature: None,
        price: None,
        area: None,
        unit_price: None,
        yield_rate: None,
        seller: None,
        buyer: None,
        source: article.source_name.clone(),
        url: article.stub.url.clone(),
        dedup_flag: String::new(),
    }
}

fn fallback_news(article: &EnrichedArticle, date: NaiveDate) -> NewsRecord {
    NewsRecord {
        date,
        source: article.source_name.clone(),
        asset_category: AssetCategory::General,
        topic: article.stub.title.clone(),
        summary: truncate_chars(&article.full_content, 120).to_string(),
        url: article.stub.url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use propsift_common::{ArticleStub, Category, PropsiftError};

    struct ScriptedLlm {
        response: Result<String, String>,
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(
            &self,
            _prompt: &str,
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<String, PropsiftError> {
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(msg) => Err(PropsiftError::Llm(msg.clone())),
            }
        }
    }

    fn article() -> EnrichedArticle {
        EnrichedArticle {
            stub: ArticleStub {
                title: "觀塘工廈高層2,100萬沽".to_string(),
                url: "https://example.com/kt".to_string(),
                preview_text: String::new(),
                published_date: NaiveDate::from_ymd_opt(2024, 6, 1),
                tags: Vec::new(),
            },
            category: Category::Transactions,
            full_content: "觀塘成業街一工廈高層全層以2,100萬元沽出,面積約3,200方呎。".to_string(),
            source_name: "852.house".to_string(),
        }
    }

    fn extractor(response: Result<String, String>) -> DetailExtractor {
        DetailExtractor::new(
            Arc::new(ScriptedLlm { response }),
            Arc::new(PipelineConfig::default()),
        )
    }

    #[tokio::test]
    async fn well_formed_response_yields_full_record() {
        let ex = extractor(Ok(r#"{"district": "觀塘", "property": "成業街工廈",
            "asset_type": "工廈", "floor": "高層", "unit": "全層",
            "nature": "Sales", "price": 21000000, "area": 3200,
            "unit_price": 6563, "yield_rate": "N/A",
            "seller": "N/A", "buyer": "N/A"}"#
            .to_string()));
        let record = ex.extract_transaction(&article()).await;
        assert_eq!(record.district.as_deref(), Some("觀塘"));
        assert_eq!(record.price, Some(21_000_000));
        assert_eq!(record.area, Some(3200));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[tokio::test]
    async fn transport_error_yields_placeholder() {
        let ex = extractor(Err("connection reset".to_string()));
        let record = ex.extract_transaction(&article()).await;
        assert_eq!(record.property, "觀塘工廈高層2,100萬沽");
        assert_eq!(record.price, None);
        assert_eq!(record.url, "https://example.com/kt");
    }

    #[tokio::test]
    async fn garbage_response_yields_placeholder() {
        let ex = extractor(Ok("抱歉,我無法處理這篇文章。".to_string()));
        let record = ex.extract_transaction(&article()).await;
        assert_eq!(record.price, None);
        assert_eq!(record.property, "觀塘工廈高層2,100萬沽");
    }

    #[test]
    fn news_prompt_keeps_valuation_relevant_policy() {
        let prompt = news_prompt(&article());

        // policy that moves valuations stays Residential/Commercial
        assert!(prompt.contains("政策新聞如果影響物業估值或市場價格,選Residential或Commercial"));
        assert!(prompt.contains("專欄作家文章"));
        assert!(prompt.contains("單一物業交易詳情"));
        assert!(prompt.contains("物業質素問題"));
        assert!(prompt.contains("物業管理相關"));
    }

    #[tokio::test]
    async fn news_placeholder_is_general_with_truncated_summary() {
        let ex = extractor(Err("boom".to_string()));
        let record = ex.extract_news(&article()).await;
        assert_eq!(record.asset_category, AssetCategory::General);
        assert!(record.summary.starts_with("觀塘成業街"));
        assert_eq!(record.topic, "觀塘工廈高層2,100萬沽");
    }
}
