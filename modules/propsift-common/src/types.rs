use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// --- Article lifecycle ---
//
// ArticleStub → ClassifiedArticle → EnrichedArticle are one-way promotions.
// An article is either discarded at some stage or becomes exactly one
// TransactionRecord or NewsRecord.

/// A discovered article before full-content retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleStub {
    pub title: String,
    /// Unique key; results are re-associated by URL, never by position.
    pub url: String,
    #[serde(default)]
    pub preview_text: String,
    pub published_date: Option<NaiveDate>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ArticleStub {
    /// Title + preview, the text the keyword gate and fallback classifier see.
    pub fn gate_text(&self) -> String {
        format!("{} {}", self.title, self.preview_text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Transactions,
    News,
    NewProperty,
    Exclude,
}

impl Category {
    /// Interpret an LLM answer: exact token match first, then substring.
    /// Returns None when the answer names no category at all.
    pub fn parse(response: &str) -> Option<Category> {
        let normalized = response.trim().to_lowercase();
        const TOKENS: [(&str, Category); 4] = [
            ("transactions", Category::Transactions),
            ("news", Category::News),
            ("new_property", Category::NewProperty),
            ("exclude", Category::Exclude),
        ];
        for (token, category) in TOKENS {
            if normalized == token {
                return Some(category);
            }
        }
        for (token, category) in TOKENS {
            if normalized.contains(token) {
                return Some(category);
            }
        }
        None
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Transactions => write!(f, "transactions"),
            Category::News => write!(f, "news"),
            Category::NewProperty => write!(f, "new_property"),
            Category::Exclude => write!(f, "exclude"),
        }
    }
}

/// ArticleStub plus its category. Assigned exactly once; never revised.
#[derive(Debug, Clone)]
pub struct ClassifiedArticle {
    pub stub: ArticleStub,
    pub category: Category,
}

/// ClassifiedArticle plus full body text and resolved source name.
#[derive(Debug, Clone)]
pub struct EnrichedArticle {
    pub stub: ArticleStub,
    pub category: Category,
    pub full_content: String,
    pub source_name: String,
}

// --- Record enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Office,
    Retail,
    Residential,
    House,
    Industrial,
    Hotel,
    Parking,
    Commercial,
}

impl AssetType {
    /// Coerce a free-text label (Chinese or English) from the LLM.
    pub fn from_label(label: &str) -> Option<AssetType> {
        let l = label.trim().to_lowercase();
        if l.is_empty() || l == "n/a" {
            return None;
        }
        if l.contains("寫字樓") || l.contains("商廈") || l.contains("office") {
            Some(AssetType::Office)
        } else if l.contains("商鋪") || l.contains("商舖") || l.contains("舖位") || l.contains("retail") || l.contains("shop") {
            Some(AssetType::Retail)
        } else if l.contains("洋房") || l.contains("house") {
            Some(AssetType::House)
        } else if l.contains("住宅") || l.contains("residential") {
            Some(AssetType::Residential)
        } else if l.contains("工廈") || l.contains("工業") || l.contains("industrial") {
            Some(AssetType::Industrial)
        } else if l.contains("酒店") || l.contains("hotel") {
            Some(AssetType::Hotel)
        } else if l.contains("車位") || l.contains("parking") {
            Some(AssetType::Parking)
        } else if l.contains("商業") || l.contains("commercial") {
            Some(AssetType::Commercial)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Nature {
    Sales,
    Lease,
}

impl Nature {
    pub fn from_label(label: &str) -> Option<Nature> {
        let l = label.trim().to_lowercase();
        if l.starts_with("sale") || l.contains("買賣") || l.contains("出售") {
            Some(Nature::Sales)
        } else if l.starts_with("lease") || l.contains("租賃") || l.contains("租") {
            Some(Nature::Lease)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetCategory {
    Residential,
    Commercial,
    /// Not relevant to valuation; dropped after extraction.
    General,
}

impl AssetCategory {
    pub fn from_label(label: &str) -> AssetCategory {
        let l = label.trim().to_lowercase();
        if l.contains("residential") {
            AssetCategory::Residential
        } else if l.contains("commercial") {
            AssetCategory::Commercial
        } else {
            AssetCategory::General
        }
    }
}

// --- Output records ---

/// Canonical output unit for category=transactions.
///
/// price/area are always canonical HKD/sqft integers; None means the source
/// never stated a value ("N/A" downstream), never a confirmed zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    pub district: Option<String>,
    /// Includes any block/tower suffix from the source ("名門 2座").
    pub property: String,
    pub asset_type: Option<AssetType>,
    pub floor: Option<String>,
    pub unit: Option<String>,
    pub nature: Option<Nature>,
    pub price: Option<i64>,
    pub area: Option<i64>,
    pub unit_price: Option<i64>,
    /// Fraction, e.g. 0.07 for "7厘".
    pub yield_rate: Option<f64>,
    pub seller: Option<String>,
    pub buyer: Option<String>,
    pub source: String,
    pub url: String,
    /// Human-audit annotation set by the deduplicator; empty by default.
    #[serde(default)]
    pub dedup_flag: String,
}

/// Canonical output unit for category=news.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsRecord {
    pub date: NaiveDate,
    pub source: String,
    pub asset_category: AssetCategory,
    /// The original article title.
    pub topic: String,
    /// ~120 CJK characters, factual, no editorializing.
    pub summary: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parse_exact() {
        assert_eq!(Category::parse("transactions"), Some(Category::Transactions));
        assert_eq!(Category::parse(" News "), Some(Category::News));
        assert_eq!(Category::parse("new_property"), Some(Category::NewProperty));
        assert_eq!(Category::parse("exclude"), Some(Category::Exclude));
    }

    #[test]
    fn category_parse_substring() {
        assert_eq!(
            Category::parse("類別: transactions"),
            Some(Category::Transactions)
        );
        assert_eq!(
            Category::parse("this is new_property"),
            Some(Category::NewProperty)
        );
    }

    #[test]
    fn category_parse_garbage() {
        assert_eq!(Category::parse("I cannot classify this"), None);
        assert_eq!(Category::parse(""), None);
    }

    #[test]
    fn asset_type_chinese_labels() {
        assert_eq!(AssetType::from_label("寫字樓"), Some(AssetType::Office));
        assert_eq!(AssetType::from_label("商舖"), Some(AssetType::Retail));
        assert_eq!(AssetType::from_label("洋房"), Some(AssetType::House));
        assert_eq!(AssetType::from_label("住宅"), Some(AssetType::Residential));
        assert_eq!(AssetType::from_label("工廈"), Some(AssetType::Industrial));
        assert_eq!(AssetType::from_label("停車位"), Some(AssetType::Parking));
        assert_eq!(AssetType::from_label("N/A"), None);
        assert_eq!(AssetType::from_label(""), None);
    }

    #[test]
    fn house_beats_residential_for_mixed_label() {
        // 洋房住宅 is a house listing, not generic residential
        assert_eq!(AssetType::from_label("洋房住宅"), Some(AssetType::House));
    }

    #[test]
    fn nature_labels() {
        assert_eq!(Nature::from_label("Sales"), Some(Nature::Sales));
        assert_eq!(Nature::from_label("Lease"), Some(Nature::Lease));
        assert_eq!(Nature::from_label("租賃"), Some(Nature::Lease));
        assert_eq!(Nature::from_label("N/A"), None);
    }

    #[test]
    fn asset_category_defaults_to_general() {
        assert_eq!(AssetCategory::from_label("Residential"), AssetCategory::Residential);
        assert_eq!(AssetCategory::from_label("Commercial"), AssetCategory::Commercial);
        assert_eq!(AssetCategory::from_label("General"), AssetCategory::General);
        assert_eq!(AssetCategory::from_label("whatever"), AssetCategory::General);
    }
}
