//! UA parsing (spec §4.6 tier 1): browser/OS/device classification via
//! `woothee`. Best-effort — an unparseable or empty user agent simply
//! contributes no `_srv_*` pairs.
//!
//! Grounded in `other_examples`'s Sparklytics `collect.rs::parse_user_agent`:
//! `woothee::parser::Parser::new().parse(ua)`, `category` mapped to a
//! device-type bucket, empty-string fields normalized to absent.

pub fn analyze(user_agent: &str, pairs: &mut Vec<(&'static str, String)>) {
    if user_agent.is_empty() {
        return;
    }
    let Some(result) = woothee::parser::Parser::new().parse(user_agent) else {
        return;
    };

    if !result.name.is_empty() && result.name != "UNKNOWN" {
        pairs.push(("browser", result.name.to_string()));
    }
    if !result.version.is_empty() {
        pairs.push(("browserVer", result.version.to_string()));
    }
    if !result.os.is_empty() && result.os != "UNKNOWN" {
        pairs.push(("os", result.os.to_string()));
    }
    if !result.os_version.is_empty() {
        pairs.push(("osVer", result.os_version.to_string()));
    }

    let device_type = match result.category {
        "smartphone" | "mobilephone" => "mobile",
        "tablet" => "tablet",
        "crawler" => "bot",
        "appliance" => "appliance",
        _ => "desktop",
    };
    pairs.push(("deviceType", device_type.to_string()));

    if !result.vendor.is_empty() && result.vendor != "UNKNOWN" {
        pairs.push(("deviceBrand", result.vendor.to_string()));
    }
    if !result.os.is_empty() && result.os != "UNKNOWN" && device_type != "desktop" {
        // woothee has no separate device-model field; the OS string for
        // mobile/tablet categories ("iPhone", "Android") doubles as the
        // closest available model signal.
        pairs.push(("deviceModel", result.os.to_string()));
    }
}
