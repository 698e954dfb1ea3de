//! Bot-UA detection (spec §4.6 tier 1): a best-effort substring match
//! against known bot user-agent markers. No retry — a miss here just means
//! no `_srv_knownBot` pair, never a pipeline failure.

const KNOWN_BOTS: &[(&str, &str)] = &[
    ("googlebot", "Googlebot"),
    ("bingbot", "Bingbot"),
    ("duckduckbot", "DuckDuckBot"),
    ("slurp", "YahooSlurp"),
    ("baiduspider", "Baiduspider"),
    ("yandexbot", "YandexBot"),
    ("facebookexternalhit", "FacebookExternalHit"),
    ("twitterbot", "Twitterbot"),
    ("linkedinbot", "LinkedInBot"),
    ("ahrefsbot", "AhrefsBot"),
    ("semrushbot", "SemrushBot"),
    ("mj12bot", "MJ12bot"),
    ("pingdom", "Pingdom"),
    ("uptimerobot", "UptimeRobot"),
    ("curl/", "Curl"),
    ("python-requests", "PythonRequests"),
    ("headlesschrome", "HeadlessChrome"),
];

/// Append `_srv_knownBot`/`_srv_botName` when `user_agent` matches a known
/// bot marker (case-insensitive).
pub fn analyze(user_agent: &str, pairs: &mut Vec<(&'static str, String)>) {
    let lowered = user_agent.to_ascii_lowercase();
    if let Some((_, name)) = KNOWN_BOTS.iter().find(|(marker, _)| lowered.contains(marker)) {
        pairs.push(("knownBot", "1".to_string()));
        pairs.push(("botName", name.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_googlebot() {
        let mut pairs = Vec::new();
        analyze("Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)", &mut pairs);
        assert!(pairs.contains(&("knownBot", "1".to_string())));
        assert!(pairs.contains(&("botName", "Googlebot".to_string())));
    }

    #[test]
    fn ordinary_browser_produces_no_pairs() {
        let mut pairs = Vec::new();
        analyze("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36", &mut pairs);
        assert!(pairs.is_empty());
    }

    #[test]
    fn match_is_case_insensitive() {
        let mut pairs = Vec::new();
        analyze("GOOGLEBOT/2.1", &mut pairs);
        assert_eq!(pairs.len(), 2);
    }
}
