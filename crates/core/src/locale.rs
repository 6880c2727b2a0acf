//! Display helpers for Arabic/English output: digit shaping, grouping,
//! dates, money and text direction.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

const ARABIC_INDIC_ZERO: u32 = 0x0660;

/// True for right-to-left locales (`ar`, `ar-SA`, ...).
pub fn is_rtl(locale: &str) -> bool {
    locale.starts_with("ar")
}

/// Map ASCII digits to Arabic-Indic digits for RTL locales; other locales
/// pass through untouched.
pub fn localize_digits(text: &str, locale: &str) -> String {
    if !is_rtl(locale) {
        return text.to_string();
    }
    text.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) if c.is_ascii_digit() => {
                char::from_u32(ARABIC_INDIC_ZERO + d).unwrap_or(c)
            }
            _ => c,
        })
        .collect()
}

/// Translate Arabic-Indic digits (٠–٩) to ASCII. Everything else is kept.
pub fn parse_arabic_numerals(text: &str) -> String {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if (ARABIC_INDIC_ZERO..=ARABIC_INDIC_ZERO + 9).contains(&code) {
                char::from(b'0' + (code - ARABIC_INDIC_ZERO) as u8)
            } else {
                c
            }
        })
        .collect()
}

/// Grouped decimal with at most three fraction digits, e.g. `1,234.568`.
pub fn to_locale_number(value: f64, locale: &str) -> String {
    localize_digits(&format_decimal(value), locale)
}

/// `Jan 15, 2024` for English, `١٥/٠١/٢٠٢٤` for Arabic.
pub fn to_locale_date(date: NaiveDate, locale: &str) -> String {
    if is_rtl(locale) {
        localize_digits(&date.format("%d/%m/%Y").to_string(), locale)
    } else {
        date.format("%b %-d, %Y").to_string()
    }
}

pub fn to_locale_datetime(value: NaiveDateTime, locale: &str) -> String {
    if is_rtl(locale) {
        localize_digits(&value.format("%d/%m/%Y, %H:%M:%S").to_string(), locale)
    } else {
        value.format("%b %-d, %Y, %-I:%M:%S %p").to_string()
    }
}

/// Format an amount in the given ISO currency.
///
/// English puts the symbol (or code) in front; Arabic puts the code after the
/// amount and shapes the digits.
pub fn format_money(amount: Decimal, currency_code: &str, locale: &str) -> String {
    let code = currency_code.trim().to_ascii_uppercase();
    let dp = minor_units(&code);
    let rounded = amount.round_dp(dp);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    let fixed = format!("{:.*}", dp as usize, rounded.abs());
    let number = match fixed.split_once('.') {
        Some((int_part, frac)) => format!("{}.{}", group_thousands(int_part), frac),
        None => group_thousands(&fixed),
    };
    let sign = if negative { "-" } else { "" };

    if is_rtl(locale) {
        return localize_digits(&format!("{sign}{number} {code}"), locale);
    }
    match currency_symbol(&code) {
        Some(symbol) => format!("{sign}{symbol}{number}"),
        None => format!("{sign}{code} {number}"),
    }
}

fn minor_units(code: &str) -> u32 {
    match code {
        "KWD" | "OMR" | "BHD" | "JOD" => 3,
        "JPY" => 0,
        _ => 2,
    }
}

fn currency_symbol(code: &str) -> Option<&'static str> {
    match code {
        "USD" => Some("$"),
        "EUR" => Some("€"),
        "GBP" => Some("£"),
        _ => None,
    }
}

fn format_decimal(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac = frac.trim_end_matches('0');

    let mut out = String::new();
    if value < 0.0 && (int_part != "0" || !frac.is_empty()) {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn rtl_detection() {
        assert!(is_rtl("ar"));
        assert!(is_rtl("ar-SA"));
        assert!(!is_rtl("en"));
        assert!(!is_rtl(""));
    }

    #[test]
    fn arabic_numerals_parse_to_ascii() {
        assert_eq!(parse_arabic_numerals("٠١٢٣٤٥٦٧٨٩"), "0123456789");
        assert_eq!(parse_arabic_numerals("المبلغ ١٬٢٥٠"), "المبلغ 1٬250");
        assert_eq!(parse_arabic_numerals("no digits"), "no digits");
    }

    #[test]
    fn localize_then_parse_is_identity() {
        let text = "Total 1,250.00";
        assert_eq!(parse_arabic_numerals(&localize_digits(text, "ar")), text);
    }

    #[test]
    fn number_grouping_english() {
        assert_eq!(to_locale_number(1234567.0, "en"), "1,234,567");
        assert_eq!(to_locale_number(1234.5678, "en"), "1,234.568");
        assert_eq!(to_locale_number(-0.5, "en"), "-0.5");
        assert_eq!(to_locale_number(12.0, "en"), "12");
    }

    #[test]
    fn number_grouping_arabic_digits() {
        assert_eq!(to_locale_number(1250.0, "ar"), "١,٢٥٠");
    }

    #[test]
    fn dates_per_locale() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(to_locale_date(d, "en"), "Jan 15, 2024");
        assert_eq!(to_locale_date(d, "ar"), "١٥/٠١/٢٠٢٤");

        let dt = d.and_hms_opt(15, 4, 5).unwrap();
        assert_eq!(to_locale_datetime(dt, "en"), "Jan 15, 2024, 3:04:05 PM");
    }

    #[test]
    fn money_english_symbols_and_codes() {
        let amount = Decimal::from_str("1234.5").unwrap();
        assert_eq!(format_money(amount, "USD", "en"), "$1,234.50");
        assert_eq!(format_money(amount, "sar", "en"), "SAR 1,234.50");
        assert_eq!(format_money(-amount, "GBP", "en"), "-£1,234.50");
    }

    #[test]
    fn money_three_decimal_currencies() {
        let amount = Decimal::from_str("10.5").unwrap();
        assert_eq!(format_money(amount, "KWD", "en"), "KWD 10.500");
    }

    #[test]
    fn money_arabic_places_code_after_amount() {
        let amount = Decimal::from_str("99.9").unwrap();
        assert_eq!(format_money(amount, "AED", "ar"), "٩٩.٩٠ AED");
    }
}
