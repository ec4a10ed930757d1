//! Keyword gate that runs before any LLM spend on the transaction path.

use propsift_common::{ArticleStub, PipelineConfig};

use crate::value_parser;

/// Asking-price vocabulary: the deal has not happened yet.
const LISTING_MARKERS: [&str; 6] = ["叫價", "放盤", "招租", "放售", "開價", "意向價"];

/// Completed-deal vocabulary.
const TRANSACTION_MARKERS: [&str; 7] = ["成交", "沽", "售出", "租出", "易手", "賣", "買入"];

pub fn is_listing(text: &str) -> bool {
    LISTING_MARKERS.iter().any(|m| text.contains(m))
}

pub fn has_transaction_marker(text: &str) -> bool {
    TRANSACTION_MARKERS.iter().any(|m| text.contains(m))
}

pub struct PreFilter<'a> {
    config: &'a PipelineConfig,
}

impl<'a> PreFilter<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Admit a stub onto the transaction path: no asking-price vocabulary,
    /// at least one completed-deal marker, and a headline figure that clears
    /// the price or area threshold.
    pub fn admit(&self, stub: &ArticleStub) -> bool {
        let text = stub.gate_text();
        if is_listing(&text) {
            return false;
        }
        if !has_transaction_marker(&text) {
            return false;
        }
        let price_ok = value_parser::parse_price(&text)
            .is_some_and(|p| p >= self.config.min_price_hkd);
        let area_ok = value_parser::parse_area(&text)
            .is_some_and(|a| a >= self.config.min_area_sqft);
        price_ok || area_ok
    }
}
