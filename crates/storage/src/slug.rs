use deunicode::deunicode_char;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Case-preserving slug safe for flat directories.
///
/// Accents are folded to their base letter, other scripts (Arabic, CJK, …)
/// are transliterated to ASCII, quotes vanish, and every other run of
/// non-alphanumeric characters collapses to a single `-`.
pub fn safe_filename(name: &str) -> String {
    let mut slug = Slug::default();

    for c in name.nfkd() {
        if is_combining_mark(c) {
            continue;
        }
        if c.is_ascii() {
            slug.push(c);
        } else if let Some(ascii) = deunicode_char(c) {
            ascii.chars().for_each(|a| slug.push(a));
        } else {
            slug.push(' ');
        }
    }

    if slug.out.is_empty() {
        "file".to_string()
    } else {
        slug.out
    }
}

#[derive(Default)]
struct Slug {
    out: String,
    pending_sep: bool,
}

impl Slug {
    fn push(&mut self, c: char) {
        if matches!(c, '\'' | '"') {
            return;
        }
        if c.is_ascii_alphanumeric() {
            if self.pending_sep && !self.out.is_empty() {
                self.out.push('-');
            }
            self.pending_sep = false;
            self.out.push(c);
        } else {
            self.pending_sep = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_case_and_replaces_dots() {
        assert_eq!(safe_filename("Invoice March.pdf"), "Invoice-March-pdf");
    }

    #[test]
    fn folds_accents() {
        assert_eq!(safe_filename("Café Reçu.png"), "Cafe-Recu-png");
    }

    #[test]
    fn collapses_and_trims_separators() {
        assert_eq!(safe_filename("  --a  //  b--  "), "a-b");
    }

    #[test]
    fn drops_quotes_without_separator() {
        assert_eq!(safe_filename("Don't panic"), "Dont-panic");
    }

    #[test]
    fn path_components_cannot_escape() {
        assert_eq!(safe_filename("../../etc/passwd"), "etc-passwd");
    }

    #[test]
    fn empty_or_symbol_only_falls_back() {
        assert_eq!(safe_filename(""), "file");
        assert_eq!(safe_filename("..//--"), "file");
    }

    #[test]
    fn arabic_names_are_transliterated() {
        let invoice = safe_filename("فاتورة.pdf");
        let receipt = safe_filename("إيصال.pdf");
        for slug in [&invoice, &receipt] {
            assert_ne!(slug.as_str(), "file");
            assert!(slug.ends_with("-pdf"), "{slug}");
            assert!(slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'), "{slug}");
        }
        assert_ne!(invoice, receipt);
    }
}
