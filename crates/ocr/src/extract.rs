use std::sync::OnceLock;

use regex::Regex;

use insight_core::parse_arabic_numerals;

use crate::fuzzy::partial_ratio;
use crate::types::{Extraction, Field, FieldKey};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_phone, r"(?:\+|\b)\d[\d\s\-]{6,}\d\b");
re!(re_email, r"[\w.\-]+@[\w.\-]+\.[a-zA-Z]{2,}");
re!(re_date, r"\b\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}\b");
re!(re_currency, r"(?i)\b(USD|EUR|SAR|AED|EGP|QAR|KWD|OMR|GBP)\b");
re!(re_amount, r"\d{1,3}(?:[, ]\d{3})*(?:\.\d{1,2})?");

/// Labels that suggest a grand total is present, English and Arabic.
pub const TOTAL_LABELS: &[&str] = &[
    "total",
    "amount",
    "grand total",
    "vat",
    "tax",
    "الاجمالي",
    "المجموع",
    "المبلغ",
];

const PHONE_CONFIDENCE: f32 = 0.8;
const EMAIL_CONFIDENCE: f32 = 0.9;
const DATE_CONFIDENCE: f32 = 0.7;
const CURRENCY_CONFIDENCE: f32 = 0.75;
const AMOUNT_CONFIDENCE: f32 = 0.6;

// ── Public extraction API ─────────────────────────────────────────────────────

pub struct Extractor;

impl Extractor {
    /// Extract candidate fields from raw OCR text.
    ///
    /// Emits at most one field per key, always in the order phone, email,
    /// date, currency, amount, total. Keys whose pattern finds nothing are
    /// omitted. `schema` is accepted for API compatibility and ignored.
    /// The function is pure.
    pub fn extract(text: &str, schema: Option<&str>, locale: &str) -> Extraction {
        let _ = (schema, locale);
        let plain = parse_arabic_numerals(text);
        let mut fields = Vec::with_capacity(FieldKey::ALL.len());

        if let Some(m) = re_phone().find(&plain) {
            fields.push(Field::new(FieldKey::Phone, m.as_str(), PHONE_CONFIDENCE));
        }
        if let Some(m) = re_email().find(&plain) {
            fields.push(Field::new(FieldKey::Email, m.as_str(), EMAIL_CONFIDENCE));
        }
        if let Some(m) = re_date().find(&plain) {
            fields.push(Field::new(FieldKey::Date, m.as_str(), DATE_CONFIDENCE));
        }
        if let Some(c) = re_currency().captures(&plain) {
            fields.push(Field::new(FieldKey::Currency, &c[1], CURRENCY_CONFIDENCE));
        }

        // Totals conventionally follow line items, so the last amount wins.
        let last_amount = last_amount(&plain);
        if let Some(amount) = last_amount {
            fields.push(Field::new(FieldKey::Amount, amount, AMOUNT_CONFIDENCE));
        }

        if let (Some(amount), Some(score)) = (last_amount, best_label_score(&plain)) {
            let confidence = (0.5 + score / 2.0).min(1.0) as f32;
            fields.push(Field::new(FieldKey::Total, amount, confidence));
        }

        Extraction {
            text: text.to_string(),
            fields,
        }
    }
}

// ── Amounts ───────────────────────────────────────────────────────────────────

/// The last grouped numeral that stands on its own.
///
/// Numerals glued to digits, signs, slashes or dots are pieces of phone
/// numbers, dates or identifiers and are skipped. Letters may touch an
/// amount, so `SAR1,250.00` and `1,250.00USD` still count.
fn last_amount(text: &str) -> Option<&str> {
    re_amount()
        .find_iter(text)
        .filter(|m| {
            let before = text[..m.start()].chars().next_back();
            let mut rest = text[m.end()..].chars();
            let glued_after = match rest.next() {
                // A sentence-ending dot is fine; `1.2.3` is not.
                Some('.') => rest.next().is_some_and(|c| c.is_numeric()),
                Some(c) => is_amount_glue(c),
                None => false,
            };
            !before.is_some_and(is_amount_glue) && !glued_after
        })
        .last()
        .map(|m| m.as_str())
}

fn is_amount_glue(c: char) -> bool {
    c.is_numeric() || matches!(c, '+' | '-' | '/' | '.')
}

// ── Total labels ──────────────────────────────────────────────────────────────

/// Best partial-ratio score of any total label against the text, if any
/// label scores above zero.
fn best_label_score(text: &str) -> Option<f64> {
    let lowered = text.to_lowercase();
    TOTAL_LABELS
        .iter()
        .map(|label| partial_ratio(&label.to_lowercase(), &lowered))
        .filter(|score| *score > 0.0)
        .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
