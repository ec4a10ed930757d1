//! LLM article classification with a deterministic keyword fallback.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, warn};

use propsift_common::{ArticleStub, Category, ClassifiedArticle, PipelineConfig};

use crate::parallel::parallel_map;
use crate::traits::LlmClient;

pub struct Classifier {
    llm: Arc<dyn LlmClient>,
    config: Arc<PipelineConfig>,
}

impl Classifier {
    pub fn new(llm: Arc<dyn LlmClient>, config: Arc<PipelineConfig>) -> Self {
        Self { llm, config }
    }

    /// Classify one stub. LLM transport errors, timeouts and unparseable
    /// answers all degrade to the keyword fallback; this never fails.
    pub async fn categorize(&self, stub: &ArticleStub) -> Category {
        let prompt = classify_prompt(stub);
        let call = self.llm.complete(
            &prompt,
            self.config.classify_max_tokens,
            self.config.classify_temperature,
        );

        match timeout(self.config.llm_timeout, call).await {
            Ok(Ok(response)) => match Category::parse(&response) {
                Some(category) => category,
                None => {
                    debug!(url = %stub.url, response = %response, "unparseable category, using fallback");
                    fallback_classify(stub)
                }
            },
            Ok(Err(e)) => {
                warn!(url = %stub.url, error = %e, "classification call failed, using fallback");
                fallback_classify(stub)
            }
            Err(_) => {
                warn!(url = %stub.url, "classification call timed out, using fallback");
                fallback_classify(stub)
            }
        }
    }

    /// Classify a batch with the configured worker count. Results carry their
    /// stub, so completion order does not matter.
    pub async fn categorize_batch(&self, stubs: Vec<ArticleStub>) -> Vec<ClassifiedArticle> {
        let classified = parallel_map(stubs, self.config.llm_workers, |stub| async move {
            let category = self.categorize(&stub).await;
            (stub, category)
        })
        .await;

        classified
            .into_iter()
            .map(|(stub, category)| ClassifiedArticle { stub, category })
            .collect()
    }
}

fn classify_prompt(stub: &ArticleStub) -> String {
    format!(
        "請將以下香港地產新聞分類到以下四個類別之一:\n\n\
         類別1: transactions (交易/成交) - 關於房地產買賣交易、租賃、成交記錄、價格交易等\n\
         類別2: news (地產新聞) - 一般房地產市場新聞、政策、趨勢、分析、估值相關等\n\
         (重要: news類別必須是關於市場整體趨勢、政策影響、估值分析等,不能是單一物業的成交詳情)\n\
         類別3: new_property (新盤) - 關於新樓盤、新項目發售、新盤消息等\n\
         類別4: exclude (排除) - 以下類型的新聞應分類為exclude:\n\
         - 單一物業交易詳情 (只講某個物業的成交,沒有市場分析或趨勢討論)\n\
         - 物業質素問題、投訴、驗收問題 (如樓花質素差誤、手工粗糙、空鼓、用料問題等,除非涉及估值影響)\n\
         - 物業管理相關 (管理費、業主會、法團等,除非涉及估值)\n\
         - 專欄作家文章\n\
         - 與物業估值、市場趨勢、價格分析無關的一般新聞\n\
         - 非香港地產新聞\n\n\
         重要規則:\n\
         1. 只有與物業估值、市場趨勢、價格分析直接相關的新聞才應分類為news\n\
         2. 如果新聞主要是關於單一物業的成交詳情(如\"某物業以X價格成交\"),沒有市場分析,應分類為transactions或exclude,不是news\n\
         3. 如果新聞主要是關於質素問題、投訴、管理費等,且不涉及估值,應分類為exclude\n\n\
         新聞標題: {}\n\n\
         描述: {}\n\n\
         標籤: {}\n\n\
         請只回答以下其中一個類別名稱: transactions, news, new_property, exclude\n\
         不要添加任何解釋,只需回答類別名稱。",
        stub.title,
        stub.preview_text,
        stub.tags.join(", ")
    )
}

/// Transaction vocabulary used when the LLM cannot be reached.
const FALLBACK_TRANSACTION_KEYS: [&str; 9] = [
    "成交", "交易", "沽", "售", "租", "蝕讓", "銀主", "收購", "撻訂",
];
/// Strong new-development vocabulary; wins over transaction keys.
const FALLBACK_NEW_PROPERTY_KEYS: [&str; 4] = ["新盤", "開售", "首輪", "發售"];
/// Weaker new-development hints, only consulted when nothing else matched.
const FALLBACK_NEW_PROPERTY_HINTS: [&str; 2] = ["樓盤", "項目"];

/// Keyword classification for when the LLM is unavailable. Deliberately
/// conservative: it never answers Exclude, so a transport outage cannot
/// silently discard articles.
pub fn fallback_classify(stub: &ArticleStub) -> Category {
    let text = stub.gate_text();

    if FALLBACK_NEW_PROPERTY_KEYS.iter().any(|k| text.contains(k)) {
        return Category::NewProperty;
    }
    if FALLBACK_TRANSACTION_KEYS.iter().any(|k| text.contains(k)) {
        return Category::Transactions;
    }
    if FALLBACK_NEW_PROPERTY_HINTS.iter().any(|k| text.contains(k)) {
        return Category::NewProperty;
    }
    Category::News
}
