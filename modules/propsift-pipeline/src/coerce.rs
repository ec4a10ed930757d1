//! Repair and coercion of loose LLM JSON into typed records.
//!
//! Extraction answers arrive as strings that are usually JSON, sometimes
//! fenced, occasionally wrapped in prose or an array. Everything funnels
//! through `json_payload` and then one coercion function per record type, so
//! no field-level cleverness leaks into the extractor.

use chrono::NaiveDate;
use serde_json::Value;

use ai_client::util::{strip_code_fence, truncate_chars};
use propsift_common::{
    AssetCategory, AssetType, EnrichedArticle, Nature, NewsRecord, TransactionRecord,
};

use crate::value_parser;

/// Pull the JSON object out of a raw LLM response. Handles code fences,
/// a top-level array (first element), and prose around the object (first
/// `{` to last `}`).
pub fn json_payload(response: &str) -> Option<Value> {
    let text = strip_code_fence(response);
    if let Ok(v) = serde_json::from_str::<Value>(text) {
        return top_object(v);
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok().and_then(top_object)
}

fn top_object(v: Value) -> Option<Value> {
    match v {
        Value::Object(_) => Some(v),
        Value::Array(items) => items.into_iter().next().filter(Value::is_object),
        _ => None,
    }
}

fn is_absent(s: &str) -> bool {
    let t = s.trim();
    t.is_empty()
        || t.eq_ignore_ascii_case("n/a")
        || t.eq_ignore_ascii_case("null")
        || t.eq_ignore_ascii_case("none")
        || t == "無"
        || t == "不詳"
}

fn opt_string(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) if !is_absent(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Money fields: bare numbers pass through, strings go through the value
/// parser so "1,950萬" and "19500000" coerce alike.
fn money(payload: &Value, key: &str) -> Option<i64> {
    numeric(payload, key, value_parser::parse_price)
}

fn sqft(payload: &Value, key: &str) -> Option<i64> {
    numeric(payload, key, value_parser::parse_area)
}

fn numeric(payload: &Value, key: &str, parse: fn(&str) -> Option<i64>) -> Option<i64> {
    match payload.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .filter(|v| *v > 0),
        Value::String(s) if !is_absent(s) => {
            let plain = s.trim().replace(',', "");
            match plain.parse::<f64>() {
                Ok(v) if v > 0.0 => Some(v.trunc() as i64),
                _ => parse(s),
            }
        }
        _ => None,
    }
}

/// Yield arrives as 7, "7%", "7厘", "逾7厘" or already as 0.07. Anything
/// above 1 is a percentage and divides by 100.
fn yield_rate(payload: &Value) -> Option<f64> {
    let raw = match payload.get("yield_rate")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) if !is_absent(s) => {
            let digits: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            digits.parse::<f64>().ok()?
        }
        _ => return None,
    };
    if raw <= 0.0 {
        return None;
    }
    Some(if raw > 1.0 { raw / 100.0 } else { raw })
}

pub fn transaction_record(
    payload: &Value,
    article: &EnrichedArticle,
    date: NaiveDate,
) -> TransactionRecord {
    let property = opt_string(payload, "property")
        .unwrap_or_else(|| truncate_chars(&article.stub.title, 50).to_string());

    let floor = opt_string(payload, "floor");
    // a whole-block deal has no meaningful unit
    let unit = if floor.as_deref().is_some_and(|f| f.contains("全幢")) {
        None
    } else {
        opt_string(payload, "unit")
    };

    TransactionRecord {
        date,
        district: opt_string(payload, "district"),
        property,
        asset_type: opt_string(payload, "asset_type")
            .as_deref()
            .and_then(AssetType::from_label),
        floor,
        unit,
        nature: opt_string(payload, "nature")
            .as_deref()
            .and_then(Nature::from_label),
        price: money(payload, "price"),
        area: sqft(payload, "area"),
        unit_price: money(payload, "unit_price"),
        yield_rate: yield_rate(payload),
        seller: opt_string(payload, "seller"),
        buyer: opt_string(payload, "buyer"),
        source: article.source_name.clone(),
        url: article.stub.url.clone(),
        dedup_flag: String::new(),
    }
}

pub fn news_record(payload: &Value, article: &EnrichedArticle, date: NaiveDate) -> NewsRecord {
    let summary = opt_string(payload, "summary")
        .unwrap_or_else(|| truncate_chars(&article.full_content, 120).to_string());
    let asset_category = opt_string(payload, "asset_category")
        .map(|label| AssetCategory::from_label(&label))
        .unwrap_or(AssetCategory::General);

    NewsRecord {
        date,
        source: article.source_name.clone(),
        asset_category,
        topic: article.stub.title.clone(),
        summary,
        url: article.stub.url.clone(),
    }
}
