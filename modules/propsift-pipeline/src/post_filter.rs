//! Threshold re-check on extracted figures.
//!
//! The keyword gate ran over headline text; this pass runs over what the
//! extractor actually found in the body, so a stub admitted on a misleading
//! headline figure still gets rejected here. Records with neither figure
//! fail closed.

use propsift_common::{PipelineConfig, TransactionRecord};

pub fn passes(record: &TransactionRecord, config: &PipelineConfig) -> bool {
    let price_ok = record.price.is_some_and(|p| p >= config.min_price_hkd);
    let area_ok = record.area.is_some_and(|a| a >= config.min_area_sqft);
    price_ok || area_ok
}
