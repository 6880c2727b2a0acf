pub mod config;
pub mod locale;

pub use config::{ConfigError, Settings};
pub use locale::{
    format_money, is_rtl, localize_digits, parse_arabic_numerals, to_locale_date,
    to_locale_datetime, to_locale_number,
};
