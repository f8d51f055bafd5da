//! Key normalization: canonicalize free-text entity names into stable
//! matching keys.
//!
//! Municipal source data spells the same place several ways (`"St. Paul"`,
//! `"Saint Paul "`, `"Saint Paul ††"`), and joins only work if all of them
//! collapse to one key. `normalize_key` is pure and idempotent:
//! `normalize_key(normalize_key(x)) == normalize_key(x)`.

/// Trailing dagger flags on a city name.
///
/// One dagger marks a county seat, two mark the state capital. The capital
/// is also a county seat, so `††` sets both flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NameMarkers {
    pub county_seat: bool,
    pub state_capital: bool,
}

/// Split a raw name into its clean form and any trailing dagger markers.
pub fn strip_markers(raw: &str) -> (String, NameMarkers) {
    let trimmed = raw.trim();
    let daggers = trimmed
        .chars()
        .rev()
        .take_while(|c| *c == '\u{2020}' || c.is_whitespace())
        .filter(|c| *c == '\u{2020}')
        .count();
    let clean = trimmed
        .trim_end_matches(|c: char| c == '\u{2020}' || c.is_whitespace())
        .to_string();
    (
        clean,
        NameMarkers {
            county_seat: daggers >= 1,
            state_capital: daggers >= 2,
        },
    )
}

/// Canonical matching key for a display name.
///
/// Ordered rules: strip trailing daggers and whitespace, lowercase, treat
/// periods as spaces, fold common diacritics, contract the word `saint` to
/// `st`, collapse whitespace runs. Empty input yields an empty key, which
/// never matches anything.
pub fn normalize_key(display_name: &str) -> String {
    let (clean, _) = strip_markers(display_name);
    let folded: String = clean
        .to_lowercase()
        .chars()
        .map(|c| if c == '.' { ' ' } else { fold_diacritic(c) })
        .collect();

    folded
        .split_whitespace()
        .map(|word| if word == "saint" { "st" } else { word })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fold common accented Latin letters to their ASCII base.
fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        'ñ' => 'n',
        'ç' => 'c',
        _ => c,
    }
}

/// Remove a dataset-specific label (e.g. `"Demographic Statistics"`) before
/// normalization. Exact match, first occurrence only.
pub fn strip_suffix_label(raw: &str, suffix: &str) -> String {
    match raw.find(suffix) {
        Some(pos) if !suffix.is_empty() => {
            let mut out = String::with_capacity(raw.len() - suffix.len());
            out.push_str(&raw[..pos]);
            out.push_str(&raw[pos + suffix.len()..]);
            out.trim().to_string()
        }
        _ => raw.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saint_contracts_to_st() {
        assert_eq!(normalize_key("St. Paul"), "st paul");
        assert_eq!(normalize_key("Saint Paul "), "st paul");
        assert_eq!(normalize_key("St. Paul"), normalize_key("Saint Paul "));
    }

    #[test]
    fn daggers_stripped() {
        assert_eq!(normalize_key("Minneapolis \u{2020}"), "minneapolis");
        assert_eq!(normalize_key("Saint Paul \u{2020}\u{2020}"), "st paul");
    }

    #[test]
    fn idempotent() {
        for name in ["St. Paul", "Minneapolis \u{2020}", "  NEW   ULM  ", "Montevidéo"] {
            let once = normalize_key(name);
            assert_eq!(normalize_key(&once), once);
        }
    }

    #[test]
    fn whitespace_collapsed() {
        assert_eq!(normalize_key("  New    Ulm "), "new ulm");
    }

    #[test]
    fn diacritics_folded() {
        assert_eq!(normalize_key("Montevidéo"), "montevideo");
    }

    #[test]
    fn empty_input_empty_key() {
        assert_eq!(normalize_key(""), "");
        assert_eq!(normalize_key("   "), "");
        assert_eq!(normalize_key("\u{2020}\u{2020}"), "");
    }

    #[test]
    fn saint_only_contracts_whole_words() {
        // "Saintfield" is not "St.field"
        assert_eq!(normalize_key("Saintfield"), "saintfield");
    }

    #[test]
    fn markers_flags() {
        let (name, m) = strip_markers("Glencoe \u{2020}");
        assert_eq!(name, "Glencoe");
        assert!(m.county_seat);
        assert!(!m.state_capital);

        let (name, m) = strip_markers("Saint Paul \u{2020}\u{2020}");
        assert_eq!(name, "Saint Paul");
        assert!(m.county_seat);
        assert!(m.state_capital);

        let (name, m) = strip_markers("Edina");
        assert_eq!(name, "Edina");
        assert!(!m.county_seat);
    }

    #[test]
    fn suffix_label_stripped() {
        assert_eq!(
            strip_suffix_label("Duluth Demographic Statistics", "Demographic Statistics"),
            "Duluth"
        );
        assert_eq!(strip_suffix_label("Duluth", "Demographic Statistics"), "Duluth");
    }
}
