//! Text normalisation for expressive-feature values
//!
//! Every value that reaches the vocabulary goes through one of these helpers,
//! so the same marking written as "Dolce", "dolce " or "DOLCE" ends up as the
//! same label.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::encoding::vocabulary::{ARTICULATION, TRILL};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static LOWER_TO_UPPER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").unwrap());
static ACRONYM_TO_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Z]+)([A-Z][a-z])").unwrap());
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_]+").unwrap());
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w-]").unwrap());
static ARTICULATION_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)artic|below|above|ornament|strings|up|down|inverted").unwrap());

/// Collapse whitespace, tighten `", "` and `": "`, trim
pub fn check_text(text: &str) -> String {
    WHITESPACE
        .replace_all(text.trim(), " ")
        .replace(", ", ",")
        .replace(": ", ":")
        .trim()
        .to_string()
}

/// `"articStaccatoAbove"` -> `"artic-staccato-above"`
pub fn split_camel_case(text: &str) -> String {
    let text = LOWER_TO_UPPER.replace_all(text, "$1-$2");
    let text = ACRONYM_TO_WORD.replace_all(&text, "$1-$2");
    SEPARATORS.replace_all(text.trim(), "-").to_lowercase()
}

/// Lowercase, hyphen-separated form with punctuation removed
pub fn clean_up_text(text: &str) -> String {
    let text = split_camel_case(text).replace('-', " ");
    let text = check_text(&text).replace(' ', "-");
    NON_WORD.replace_all(&text, "").to_lowercase()
}

/// Label for a chunk of articulations with the given subtype
///
/// Returns `None` for lute fingerings, which are not articulations in the
/// expressive sense.
pub fn articulation_label(subtype: Option<&str>) -> Option<String> {
    let Some(subtype) = subtype else {
        return Some(ARTICULATION.to_string());
    };
    let stripped = ARTICULATION_NOISE.replace_all(subtype, "");
    let mut value = split_camel_case(&check_text(&stripped));

    if value.contains("lutefingering") || value.contains("lute-fingering") {
        return None;
    }
    if value.contains("prall") {
        value = TRILL.to_string();
    } else if let Some(rest) = value.strip_prefix("u-").or_else(|| value.strip_prefix("d-")) {
        value = rest.to_string();
    }

    let value = clean_up_text(&value);
    if value.is_empty() {
        Some(ARTICULATION.to_string())
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::Encoding;

    #[test]
    fn test_check_text() {
        assert_eq!(check_text("  a   tempo  "), "a tempo");
        assert_eq!(check_text("rit. ,  molto"), "rit. ,molto");
        assert_eq!(check_text("Tempo: 120,  slow"), "Tempo:120,slow");
    }

    #[test]
    fn test_split_camel_case() {
        assert_eq!(split_camel_case("articStaccatoAbove"), "artic-staccato-above");
        assert_eq!(split_camel_case("HairPin"), "hair-pin");
        assert_eq!(split_camel_case("OtherDynamics"), "other-dynamics");
        assert_eq!(split_camel_case("MIDIText"), "midi-text");
        assert_eq!(split_camel_case("con_sord"), "con-sord");
        assert_eq!(split_camel_case("mf"), "mf");
    }

    #[test]
    fn test_clean_up_text() {
        assert_eq!(clean_up_text("Allegro con brio!"), "allegro-con-brio");
        assert_eq!(clean_up_text("  a  tempo "), "a-tempo");
        assert_eq!(clean_up_text("rit. --- "), "rit");
        assert_eq!(clean_up_text("sempreLegato"), "sempre-legato");
    }

    #[test]
    fn test_vocabulary_labels_are_fixed_points() {
        let encoding = Encoding::default();
        for label in encoding.value_labels() {
            assert_eq!(clean_up_text(label), label, "label `{}` changes when cleaned", label);
        }
    }

    #[test]
    fn test_articulation_labels() {
        assert_eq!(articulation_label(Some("articStaccatoAbove")).as_deref(), Some("staccato"));
        assert_eq!(articulation_label(Some("articAccentBelow")).as_deref(), Some("accent"));
        assert_eq!(articulation_label(Some("ornamentPrallMordent")).as_deref(), Some("trill"));
        assert_eq!(articulation_label(Some("ornamentTurnInverted")).as_deref(), Some("turn"));
        assert_eq!(articulation_label(Some("stringsUpBow")).as_deref(), Some("bow"));
        assert_eq!(articulation_label(Some("uStaccatissimo")).as_deref(), Some("staccatissimo"));
        assert_eq!(articulation_label(Some("articAbove")).as_deref(), Some("articulation"));
        assert_eq!(articulation_label(None).as_deref(), Some("articulation"));
        assert_eq!(articulation_label(Some("luteFingering1st")), None);
    }
}
