//! Address normalization
//!
//! Reduces the free-text `fulladdress` of a registry entry to something a
//! geocoder can use. The stages run in a fixed order:
//!
//! 1. status-only short-circuit
//! 2. symbol cleanup and the early bracket pass
//! 3. region / municipality stripping
//! 4. leading enumeration stripping
//! 5. stop-word cutoff (see [`crate::core::stopwords`])
//! 6. late bracket / slash pass
//! 7. targeted fixes
//! 8. whitespace and comma canonicalization
//! 9. edge trim
//! 10. sanity fallback
//!
//! Region and municipality phrases have to go before the cutoff, otherwise a
//! stop-word inside them would cut away the street.

use crate::core::stopwords;
use crate::domain::model::NormalizedAddress;
use regex::Regex;
use std::sync::LazyLock;

/// Inputs shorter than this (in characters) are checked for status markers.
pub const METADATA_MAX_CHARS: usize = 25;

/// Results shorter than this (in characters) trigger the fallback.
pub const MIN_RESULT_CHARS: usize = 3;

/// Lowercase markers of status-only entries.
pub const STATUS_MARKERS: &[&str] = &[
    "заличен",
    "закрит",
    "прекратен",
    "няма данни",
    "липсва",
    "партер",
    "сутерен",
    "здравна служба",
    "здравен пункт",
];

static NUMBER_SIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"№|\bN[oо]\.|\bNr\.").unwrap());

static QUOTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"["„“”«»'`‘’]"#).unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static PAREN_GROUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^()]*?\)").unwrap());

// 只刪含字母的斜線段，保留 "5/6/7" 這種號碼
static SLASH_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/[^/,;]*?\p{L}[^/,;]*?/").unwrap());

static STRAY_PAREN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[()]").unwrap());

static ADMIN_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|\b)(?:обл\.|област\b|общ\.|община\b)[^,;]*").unwrap()
});

static LEADING_ENUMERATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d{1,3}[.)]\s+").unwrap());

static NUMBER_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bномер\b").unwrap());

static TRAILING_BARE_ABBREVIATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\s,])(?:ул\.?|улица|бул\.|с\.|село)[\s,.\-/]*$").unwrap()
});

static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

static SPACE_BEFORE_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+,").unwrap());

static REPEATED_COMMAS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",(?:\s*,)+").unwrap());

// гр./град/с./село + name starting with a capital letter
static SETTLEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|[\s,(.])((?i:гр\.|град|с\.|село))\s*(\p{Lu}[\p{L}\-]*(?: \p{Lu}[\p{L}\-]*)*)",
    )
    .unwrap()
});

const EDGE_CHARS: &[char] = &[',', ';', '.', ' ', '-', '/'];

/// Normalizes one raw address. Total: every input yields a result.
pub fn normalize(raw: &str) -> NormalizedAddress {
    if is_status_only(raw) {
        return NormalizedAddress::NotAnAddress;
    }

    let text = normalize_symbols(raw);
    let text = strip_admin_units(&text);
    let text = strip_leading_enumeration(&text);
    let text = cut_at_stop_word(&text);
    let text = strip_brackets(&text);
    let text = apply_targeted_fixes(&text);
    let text = canonicalize_punctuation(&text);
    let text = trim_edges(&text);

    finalize(raw, text)
}

/// Stage 1: short text carrying a status marker.
pub fn is_status_only(text: &str) -> bool {
    if text.chars().count() >= METADATA_MAX_CHARS {
        return false;
    }
    let lower = text.to_lowercase();
    STATUS_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Stage 2: number sign, quotes, raw parentheticals, whitespace runs.
pub fn normalize_symbols(text: &str) -> String {
    let text = NUMBER_SIGN.replace_all(text, " ");
    let text = QUOTES.replace_all(&text, "");
    let text = remove_bracket_groups(&text);
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Stage 3: drop `обл. …` / `община …` up to the next `,` or `;`.
pub fn strip_admin_units(text: &str) -> String {
    ADMIN_UNIT.replace_all(text, "").into_owned()
}

/// Stage 4
pub fn strip_leading_enumeration(text: &str) -> String {
    LEADING_ENUMERATION.replace(text, "").into_owned()
}

/// Stage 5: single cut at the leftmost stop-word.
///
/// A settlement named only in the removed tail is kept, appended to the head.
pub fn cut_at_stop_word(text: &str) -> String {
    let Some(hit) = stopwords::find_leftmost(text) else {
        return text.to_string();
    };

    let (head, tail) = text.split_at(hit.start);
    tracing::trace!(
        category = ?hit.rule.category,
        pattern = hit.rule.pattern,
        "address cut at stop-word"
    );

    if find_settlement(head).is_some() {
        return head.to_string();
    }
    match find_settlement(tail) {
        Some(settlement) if head.trim_matches(EDGE_CHARS).is_empty() => settlement,
        Some(settlement) => format!("{}, {}", head.trim_end_matches(EDGE_CHARS), settlement),
        None => head.to_string(),
    }
}

/// Stage 6: groups exposed by earlier deletions, then unmatched parentheses.
pub fn strip_brackets(text: &str) -> String {
    let text = remove_bracket_groups(text);
    STRAY_PAREN.replace_all(&text, "").into_owned()
}

/// Stage 7
pub fn apply_targeted_fixes(text: &str) -> String {
    let text = NUMBER_WORD.replace_all(text, "");
    TRAILING_BARE_ABBREVIATION.replace(&text, "").into_owned()
}

/// Stage 8
pub fn canonicalize_punctuation(text: &str) -> String {
    let text = MULTI_SPACE.replace_all(text, " ");
    let text = SPACE_BEFORE_COMMA.replace_all(&text, ",");
    REPEATED_COMMAS.replace_all(&text, ",").into_owned()
}

/// Stage 9
pub fn trim_edges(text: &str) -> String {
    text.trim_matches(EDGE_CHARS).to_string()
}

/// Stage 10: fall back to a settlement named in the raw text, and never hand
/// out a result that would itself be classified as status-only.
fn finalize(raw: &str, cleaned: String) -> NormalizedAddress {
    let candidate = if cleaned.chars().count() < MIN_RESULT_CHARS {
        match find_settlement(raw) {
            Some(settlement) => settlement,
            None => return NormalizedAddress::TooShort,
        }
    } else {
        cleaned
    };

    if is_status_only(&candidate) {
        return NormalizedAddress::NotAnAddress;
    }
    NormalizedAddress::Valid(candidate)
}

/// First `гр. Име` / `с. Име` phrase, rendered as `marker name`.
pub fn find_settlement(text: &str) -> Option<String> {
    SETTLEMENT.captures(text).and_then(|caps| {
        let marker = caps.get(1)?.as_str();
        let name = caps.get(2)?.as_str();
        let phrase = format!("{} {}", marker, name);
        // 名稱本身若觸發截斷，就不算可用的地名
        if stopwords::find_leftmost(&phrase).is_some() {
            None
        } else {
            Some(phrase)
        }
    })
}

fn remove_bracket_groups(text: &str) -> String {
    let text = PAREN_GROUP.replace_all(text, " ");
    SLASH_GROUP.replace_all(&text, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(text: &str) -> NormalizedAddress {
        NormalizedAddress::Valid(text.to_string())
    }

    #[test]
    fn test_floor_cut_keeps_settlement_and_drops_region() {
        let raw = "ул. Иван Вазов 15, ет. 2, офис 3, гр. София, Обл. София-град";
        assert_eq!(normalize(raw), valid("ул. Иван Вазов 15, гр. София"));
    }

    #[test]
    fn test_status_only_entries() {
        assert_eq!(normalize("Здравна служба"), NormalizedAddress::NotAnAddress);
        assert_eq!(normalize("ЗАЛИЧЕН"), NormalizedAddress::NotAnAddress);
        assert_eq!(normalize("партер"), NormalizedAddress::NotAnAddress);
    }

    #[test]
    fn test_abbreviation_only_is_too_short() {
        assert_eq!(normalize("АПЗЗ"), NormalizedAddress::TooShort);
    }

    #[test]
    fn test_empty_and_blank_inputs() {
        assert_eq!(normalize(""), NormalizedAddress::TooShort);
        assert_eq!(normalize("   "), NormalizedAddress::TooShort);
        assert_eq!(normalize(",.-/"), NormalizedAddress::TooShort);
    }

    #[test]
    fn test_fallback_recovers_settlement_from_raw() {
        assert_eq!(normalize("АПЗЗ гр. Ловеч"), valid("гр. Ловеч"));
        assert_eq!(normalize("ДКЦ 1 с.Горна Малина"), valid("с. Горна Малина"));
    }

    #[test]
    fn test_number_sign_and_quotes() {
        assert_eq!(
            normalize("гр. Пловдив, ул. „Христо Ботев“ № 27"),
            valid("гр. Пловдив, ул. Христо Ботев 27")
        );
    }

    #[test]
    fn test_municipality_before_cutoff() {
        // "община" phrase holds "болница", which must not cut the street
        assert_eq!(
            normalize("Община Болница Тест; гр. Троян, ул. Васил Левски 2"),
            valid("гр. Троян, ул. Васил Левски 2")
        );
    }

    #[test]
    fn test_leading_enumeration() {
        assert_eq!(
            normalize("1. гр. Русе, ул. Борисова 10"),
            valid("гр. Русе, ул. Борисова 10")
        );
    }

    #[test]
    fn test_brackets_removed() {
        assert_eq!(
            normalize("гр. Варна (до пазара), бул. Сливница 5 /срещу БНБ/"),
            valid("гр. Варна, бул. Сливница 5")
        );
        assert_eq!(
            normalize("гр. Бургас, ж.к. Зорница, бл. 5/6/7"),
            valid("гр. Бургас, ж.к. Зорница, бл. 5/6/7")
        );
    }

    #[test]
    fn test_medical_abbreviation_cut() {
        assert_eq!(
            normalize("гр. Сливен, бул. Хаджи Димитър 1, МБАЛ Сливен"),
            valid("гр. Сливен, бул. Хаджи Димитър 1")
        );
    }

    #[test]
    fn test_trailing_bare_abbreviation() {
        assert_eq!(normalize("гр. Шумен, ул."), valid("гр. Шумен"));
        assert_eq!(apply_targeted_fixes("гр. Шумен, номер 5"), "гр. Шумен,  5");
    }

    #[test]
    fn test_trailing_bare_village_marker() {
        assert_eq!(
            normalize("гр. Шумен, ул. Първа 1, с."),
            valid("гр. Шумен, ул. Първа 1")
        );
        assert_eq!(
            normalize("гр. Шумен, ул. Първа 1, село"),
            valid("гр. Шумен, ул. Първа 1")
        );
        assert_eq!(
            apply_targeted_fixes("ул. Първа 1, СЕЛО -"),
            "ул. Първа 1,"
        );
        // a named village is not a bare marker
        assert_eq!(
            normalize("ул. Първа 1, с. Бяла"),
            valid("ул. Първа 1, с. Бяла")
        );
    }

    #[test]
    fn test_punctuation_canonicalization() {
        assert_eq!(
            canonicalize_punctuation("гр. Враца ,,  ул. Ботев , 3"),
            "гр. Враца, ул. Ботев, 3"
        );
        assert_eq!(trim_edges(" - гр. Враца, ./"), "гр. Враца");
    }

    #[test]
    fn test_status_only_threshold_is_in_characters() {
        // 24 Cyrillic characters: under the threshold even though it is 48 bytes
        let text = "закрит обект в град тест";
        assert_eq!(text.chars().count(), 24);
        assert!(is_status_only(text));
        assert!(!is_status_only("закрит обект в градината, ул. Дунав 3"));
    }

    #[test]
    fn test_results_are_fixed_points() {
        let inputs = [
            "ул. Иван Вазов 15, ет. 2, офис 3, гр. София, Обл. София-град",
            "гр. Пловдив, ул. „Христо Ботев“ № 27",
            "гр. Варна (до пазара), бул. Сливница 5 /срещу БНБ/",
            "1. гр. Русе, ул. Борисова 10",
            "АПЗЗ гр. Ловеч",
            "с. Лозен, УПИ IV-123, кв. 5",
            "партер, ул. Витоша 1, ет. 3, офис 5 и още текст",
        ];
        for input in inputs {
            if let NormalizedAddress::Valid(text) = normalize(input) {
                assert_eq!(normalize(&text), valid(&text), "not a fixed point: {input}");
            }
        }
    }

    #[test]
    fn test_valid_results_have_no_parentheses_or_stop_words() {
        let inputs = [
            "гр. Габрово (център) ул. Радецки 3 (вход от двора",
            "ж.к. Младост 1, бл. 5, вх. А, ап. 12, гр. София",
            "гр. Перник, ул. Кракра 1, в сградата на общината",
        ];
        for input in inputs {
            if let NormalizedAddress::Valid(text) = normalize(input) {
                assert!(!text.contains('(') && !text.contains(')'), "{text}");
                assert!(stopwords::find_leftmost(&text).is_none(), "{text}");
                assert!(!text.is_empty());
            }
        }
    }
}
