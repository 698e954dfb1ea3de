//! Cultural consistency (spec §4.6 tier 3): cross-checks fonts, language,
//! date/number format, calendar, and speech-synthesis voices against the
//! IP's resolved country. Outputs `_srv_culturalScore=0..100` and
//! `_srv_culturalFlags=<csv>`.

use std::collections::HashMap;

/// Expected browser-language prefixes for a resolved country (a small,
/// deliberately partial reference table — absence of a country here just
/// means that check is skipped, not penalized).
const EXPECTED_LANGUAGE_PREFIXES: &[(&str, &[&str])] = &[
    ("US", &["en"]),
    ("GB", &["en"]),
    ("CA", &["en", "fr"]),
    ("FR", &["fr"]),
    ("DE", &["de"]),
    ("ES", &["es"]),
    ("IT", &["it"]),
    ("JP", &["ja"]),
    ("CN", &["zh"]),
    ("BR", &["pt"]),
    ("RU", &["ru"]),
    ("KR", &["ko"]),
];

const PENALTY_LANGUAGE_MISMATCH: u32 = 30;
const PENALTY_NUMBER_FORMAT_MISMATCH: u32 = 20;
const PENALTY_NO_FONTS: u32 = 15;
const PENALTY_NO_VOICES_MATCH: u32 = 15;

fn resolved_country(params: &HashMap<String, String>) -> Option<&str> {
    params
        .get("_srv_mmCC")
        .or_else(|| params.get("_srv_ipapiCC"))
        .or_else(|| params.get("_srv_geoCC"))
        .map(String::as_str)
}

pub fn analyze(params: &HashMap<String, String>, pairs: &mut Vec<(&'static str, String)>) {
    let Some(country) = resolved_country(params) else {
        return;
    };
    let Some((_, expected_langs)) = EXPECTED_LANGUAGE_PREFIXES.iter().find(|(cc, _)| *cc == country) else {
        return;
    };

    let mut score: u32 = 100;
    let mut flags: Vec<&'static str> = Vec::new();

    if let Some(lang) = params.get("lang") {
        let prefix = lang.split(['-', '_']).next().unwrap_or(lang);
        if !expected_langs.contains(&prefix) {
            score = score.saturating_sub(PENALTY_LANGUAGE_MISMATCH);
            flags.push("langMismatch");
        }
    }

    if let Some(numfmt) = params.get("numberFormat") {
        let expects_comma_decimal = matches!(country, "FR" | "DE" | "ES" | "IT" | "RU" | "BR");
        let uses_comma_decimal = numfmt.contains(',') && !numfmt.contains('.');
        if expects_comma_decimal != uses_comma_decimal {
            score = score.saturating_sub(PENALTY_NUMBER_FORMAT_MISMATCH);
            flags.push("numberFormatMismatch");
        }
    }

    let font_count = params
        .get("fonts")
        .map(|f| f.split(',').filter(|s| !s.trim().is_empty()).count())
        .unwrap_or(0);
    if font_count == 0 {
        score = score.saturating_sub(PENALTY_NO_FONTS);
        flags.push("noFonts");
    }

    if let Some(voices) = params.get("voices") {
        let expects_any = expected_langs
            .iter()
            .any(|lang| voices.to_ascii_lowercase().contains(lang));
        if !expects_any {
            score = score.saturating_sub(PENALTY_NO_VOICES_MATCH);
            flags.push("voiceMismatch");
        }
    }

    pairs.push(("culturalScore", score.to_string()));
    if !flags.is_empty() {
        pairs.push(("culturalFlags", flags.join(",")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_country_is_a_no_op() {
        let mut pairs = Vec::new();
        analyze(&HashMap::new(), &mut pairs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn consistent_us_visitor_scores_full_minus_no_fonts() {
        let mut params = HashMap::new();
        params.insert("_srv_mmCC".to_string(), "US".to_string());
        params.insert("lang".to_string(), "en-US".to_string());
        params.insert("fonts".to_string(), "Arial,Helvetica".to_string());
        let mut pairs = Vec::new();
        analyze(&params, &mut pairs);
        assert!(pairs.contains(&("culturalScore", "100".to_string())));
    }

    #[test]
    fn mismatched_language_lowers_score_and_flags() {
        let mut params = HashMap::new();
        params.insert("_srv_mmCC".to_string(), "JP".to_string());
        params.insert("lang".to_string(), "en-US".to_string());
        params.insert("fonts".to_string(), "Arial".to_string());
        let mut pairs = Vec::new();
        analyze(&params, &mut pairs);
        let score: u32 = pairs.iter().find(|(k, _)| *k == "culturalScore").unwrap().1.parse().unwrap();
        assert!(score <= 70);
        let flags = pairs.iter().find(|(k, _)| *k == "culturalFlags").unwrap().1.clone();
        assert!(flags.contains("langMismatch"));
    }
}
