//! Free-text money and area parsing for mixed Chinese/English property copy.
//!
//! Both parsers answer Option: absence of a figure is not an error and is
//! never reported as zero.

use regex::Regex;
use std::sync::LazyLock;

const NUM: &str = r"([0-9][0-9,]*(?:\.[0-9]+)?)";

static RE_YI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"{NUM}\s*億")).unwrap());
static RE_WAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"{NUM}\s*萬")).unwrap());
static RE_MILLION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i){NUM}\s*million")).unwrap());
static RE_BILLION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i){NUM}\s*billion")).unwrap());
static RE_DOLLAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"\$\s*{NUM}")).unwrap());
static RE_HKD_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"{NUM}\s*(?:HKD|港元|港幣|元)")).unwrap());
// no \b anchors: CJK ideographs are word characters, so a figure flanked by
// them has no word boundary
static RE_GROUPED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9,])([0-9]{1,3}(?:,[0-9]{3})+)(?:[^0-9]|$)").unwrap()
});

static RE_SQFT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"{NUM}\s*(?:平方呎|平方尺|方呎|呎|尺|(?i:sq\.?\s*ft\.?|sqft|ft²|ft2))"
    ))
    .unwrap()
});
static RE_SQM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"{NUM}\s*(?:平方米|平米|(?i:sq\.?\s*m\.?|sqm|m²|m2))"
    ))
    .unwrap()
});

const SQM_TO_SQFT: f64 = 10.764;

/// Parse a price in HKD. Unit patterns are tried in a fixed priority order
/// (億, 萬, million, billion, then literal dollar figures); the first match
/// wins even when a later pattern would also match.
pub fn parse_price(text: &str) -> Option<i64> {
    for (re, multiplier) in [
        (&*RE_YI, 100_000_000.0),
        (&*RE_WAN, 10_000.0),
        (&*RE_MILLION, 1_000_000.0),
        (&*RE_BILLION, 1_000_000_000.0),
        (&*RE_DOLLAR, 1.0),
        (&*RE_HKD_SUFFIX, 1.0),
        (&*RE_GROUPED, 1.0),
    ] {
        if let Some(value) = capture_number(re, text) {
            return scale(value, multiplier);
        }
    }
    None
}

/// Parse an area in square feet. Square-metre figures are converted at
/// 10.764 sqft/sqm and truncated toward zero.
pub fn parse_area(text: &str) -> Option<i64> {
    if let Some(value) = capture_number(&RE_SQFT, text) {
        return scale(value, 1.0);
    }
    if let Some(value) = capture_number(&RE_SQM, text) {
        return scale(value, SQM_TO_SQFT);
    }
    None
}

fn capture_number(re: &Regex, text: &str) -> Option<f64> {
    let raw = re.captures(text)?.get(1)?.as_str().replace(',', "");
    raw.parse::<f64>().ok()
}

/// Multiply and drop to an integer. Values that are a float hair away from a
/// whole number (2.05 * 1e8 = 204999999.999…) snap to it; genuinely
/// fractional results truncate toward zero.
fn scale(value: f64, multiplier: f64) -> Option<i64> {
    let scaled = value * multiplier;
    if !scaled.is_finite() || scaled <= 0.0 || scaled >= i64::MAX as f64 {
        return None;
    }
    let snapped = if (scaled - scaled.round()).abs() < 1e-3 {
        scaled.round()
    } else {
        scaled.trunc()
    };
    Some(snapped as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_wan() {
        assert_eq!(parse_price("$1,950萬"), Some(19_500_000));
        assert_eq!(parse_price("以1950萬元易手"), Some(19_500_000));
    }

    #[test]
    fn price_yi_fractional() {
        assert_eq!(parse_price("2.05億"), Some(205_000_000));
        assert_eq!(parse_price("作價1.2億元"), Some(120_000_000));
    }

    #[test]
    fn price_english_units() {
        assert_eq!(parse_price("sold for 25 million"), Some(25_000_000));
        assert_eq!(parse_price("a 1.5 billion deal"), Some(1_500_000_000));
    }

    #[test]
    fn price_literal_dollars() {
        assert_eq!(parse_price("$1,234,567"), Some(1_234_567));
        assert_eq!(parse_price("21,000,000港元"), Some(21_000_000));
        assert_eq!(parse_price("price was 20,500,000"), Some(20_500_000));
    }

    #[test]
    fn grouped_number_between_ideographs() {
        assert_eq!(parse_price("以21,000,000易手"), Some(21_000_000));
        assert_eq!(parse_price("25,000,000"), Some(25_000_000));
        // malformed grouping is not a price
        assert_eq!(parse_price("編號123,4567號"), None);
    }

    #[test]
    fn price_priority_yi_over_wan() {
        // both units present; 億 wins
        assert_eq!(parse_price("1億5000萬"), Some(100_000_000));
    }

    #[test]
    fn price_absent() {
        assert_eq!(parse_price("no numbers here"), None);
        assert_eq!(parse_price(""), None);
        // ungrouped bare number is not a price
        assert_eq!(parse_price("第3座高層"), None);
    }

    #[test]
    fn area_sqft() {
        assert_eq!(parse_area("2,016呎"), Some(2016));
        assert_eq!(parse_area("面積約3000平方呎"), Some(3000));
        assert_eq!(parse_area("1,200 sq ft"), Some(1200));
    }

    #[test]
    fn area_sqm_converted() {
        // 187 * 10.764 = 2012.868, truncated
        assert_eq!(parse_area("187平方米"), Some(2012));
        assert_eq!(parse_area("100 sqm"), Some(1076));
    }

    #[test]
    fn area_sqft_preferred_over_sqm() {
        assert_eq!(parse_area("2012呎 (187平方米)"), Some(2012));
    }

    #[test]
    fn area_absent() {
        assert_eq!(parse_area("三房套間"), None);
    }
}
