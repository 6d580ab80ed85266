//! OCR tag-text parsing
//!
//! The physical asset tags are printed with a fixed label layout:
//!
//! ```text
//! ┌─────────────────────────┐
//! │ 資編：040400275         │
//! │ 類別：資訊-可攜式電腦    │
//! │ 名稱：ASUS筆記型電腦     │
//! │ 取得年月：2023/9        │
//! └─────────────────────────┘
//! ```
//!
//! Recognition happens upstream; this module only interprets the already
//! extracted text. Each label may be followed by a halfwidth `:` or
//! fullwidth `：` colon. Fields that cannot be found stay `None`; a text
//! with no recognizable tag number is still a valid, classifiable scan.

use once_cell::sync::Lazy;
use regex::Regex;

use itam_common::models::OcrFields;

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"資編[：:]\s*(\d{6,12})").unwrap());
static CATEGORY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)類別[：:][ \t]*(.+?)[ \t]*$").unwrap());
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)名稱[：:][ \t]*(.+?)[ \t]*$").unwrap());
static ACQUIRED_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"取得年月[：:]\s*(\d{4}/\d{1,2})").unwrap());

/// Fields extracted from one tag's recognized text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTag {
    /// Asset tag number (6–12 digits), if the label was found
    pub tag: Option<String>,
    pub category: Option<String>,
    pub name: Option<String>,
    /// Acquisition year/month as printed, e.g. "2023/9"
    pub acquired: Option<String>,
    /// The full input text, kept for audit
    pub raw: String,
}

impl ParsedTag {
    /// The parsed attributes in storable form
    pub fn to_fields(&self) -> OcrFields {
        OcrFields {
            raw_text: self.raw.clone(),
            category: self.category.clone(),
            name: self.name.clone(),
            acquired: self.acquired.clone(),
        }
    }
}

/// Extract the labeled fields from raw recognized text.
pub fn parse_tag_text(text: &str) -> ParsedTag {
    let capture = |pattern: &Regex| {
        pattern
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    };

    ParsedTag {
        tag: capture(&TAG_PATTERN),
        category: capture(&CATEGORY_PATTERN),
        name: capture(&NAME_PATTERN),
        acquired: capture(&ACQUIRED_PATTERN),
        raw: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_label() {
        let text = "資編：040400275\n類別：資訊-可攜式電腦\n名稱：ASUS筆記型電腦\n取得年月：2023/9";
        let parsed = parse_tag_text(text);

        assert_eq!(parsed.tag.as_deref(), Some("040400275"));
        assert_eq!(parsed.category.as_deref(), Some("資訊-可攜式電腦"));
        assert_eq!(parsed.name.as_deref(), Some("ASUS筆記型電腦"));
        assert_eq!(parsed.acquired.as_deref(), Some("2023/9"));
        assert_eq!(parsed.raw, text);
    }

    #[test]
    fn accepts_halfwidth_colons_and_padding() {
        let text = "資編: 040400275\n名稱:  ThinkPad X1  \n取得年月: 2021/12";
        let parsed = parse_tag_text(text);

        assert_eq!(parsed.tag.as_deref(), Some("040400275"));
        assert_eq!(parsed.name.as_deref(), Some("ThinkPad X1"));
        assert_eq!(parsed.acquired.as_deref(), Some("2021/12"));
        assert_eq!(parsed.category, None);
    }

    #[test]
    fn missing_tag_number_is_none() {
        let parsed = parse_tag_text("類別：家具\n名稱：辦公椅");

        assert_eq!(parsed.tag, None);
        assert_eq!(parsed.category.as_deref(), Some("家具"));
        assert_eq!(parsed.name.as_deref(), Some("辦公椅"));
    }

    #[test]
    fn tag_shorter_than_six_digits_is_rejected() {
        let parsed = parse_tag_text("資編：12345");
        assert_eq!(parsed.tag, None);
    }

    #[test]
    fn empty_text_yields_empty_parse() {
        let parsed = parse_tag_text("");
        assert_eq!(parsed, ParsedTag {
            raw: String::new(),
            ..Default::default()
        });
    }
}
