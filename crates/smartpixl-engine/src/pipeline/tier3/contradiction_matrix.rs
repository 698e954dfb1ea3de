//! Contradiction matrix (spec §4.6 tier 3): a rule engine over a fixed set
//! of "impossible" tuples — mobile UA with a large desktop-class screen
//! and real mouse movement, macOS UA paired with a DirectX-named GPU,
//! desktop UA with a tiny screen. Outputs `_srv_contradictions=N`,
//! `_srv_contradictionList=<csv>`.

use std::collections::HashMap;

const DESKTOP_CLASS_WIDTH: u32 = 1920;
const TINY_SCREEN_WIDTH: u32 = 600;

fn screen_width(params: &HashMap<String, String>) -> Option<u32> {
    params.get("sw").and_then(|v| v.parse().ok())
}

fn has_mouse_movement(params: &HashMap<String, String>) -> bool {
    params.get("mousePath").map(|p| !p.is_empty()).unwrap_or(false)
}

type Rule = fn(&str, &HashMap<String, String>) -> bool;

const RULES: &[(&str, Rule)] = &[
    ("mobileWithDesktopScreenAndMouse", |device_type, params| {
        device_type == "mobile"
            && screen_width(params).map(|w| w >= DESKTOP_CLASS_WIDTH).unwrap_or(false)
            && has_mouse_movement(params)
    }),
    ("macosWithDirectxGpu", |_device_type, params| {
        let os = params.get("_srv_os").map(|s| s.to_ascii_lowercase()).unwrap_or_default();
        let gpu = params.get("gpu").map(|s| s.to_ascii_lowercase()).unwrap_or_default();
        os.contains("mac") && (gpu.contains("directx") || gpu.contains("direct3d"))
    }),
    ("desktopWithTinyScreen", |device_type, params| {
        device_type == "desktop" && screen_width(params).map(|w| w < TINY_SCREEN_WIDTH).unwrap_or(false)
    }),
];

pub fn analyze(params: &HashMap<String, String>, pairs: &mut Vec<(&'static str, String)>) {
    let device_type = pairs
        .iter()
        .find(|(k, _)| *k == "deviceType")
        .map(|(_, v)| v.as_str())
        .or_else(|| params.get("_srv_deviceType").map(String::as_str))
        .unwrap_or("");

    let matched: Vec<&'static str> = RULES
        .iter()
        .filter(|(_, rule)| rule(device_type, params))
        .map(|(name, _)| *name)
        .collect();

    if matched.is_empty() {
        return;
    }

    pairs.push(("contradictions", matched.len().to_string()));
    pairs.push(("contradictionList", matched.join(",")));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistent_device_yields_nothing() {
        let mut params = HashMap::new();
        params.insert("sw".to_string(), "390".to_string());
        let mut pairs = vec![("deviceType", "mobile".to_string())];
        analyze(&params, &mut pairs);
        assert!(!pairs.iter().any(|(k, _)| *k == "contradictions"));
    }

    #[test]
    fn mobile_with_desktop_screen_and_mouse_is_flagged() {
        let mut params = HashMap::new();
        params.insert("sw".to_string(), "2560".to_string());
        params.insert("mousePath".to_string(), "M1,1L2,2".to_string());
        let mut pairs = vec![("deviceType", "mobile".to_string())];
        analyze(&params, &mut pairs);
        let count: u32 = pairs.iter().find(|(k, _)| *k == "contradictions").unwrap().1.parse().unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn desktop_with_tiny_screen_is_flagged() {
        let mut params = HashMap::new();
        params.insert("sw".to_string(), "320".to_string());
        let mut pairs = vec![("deviceType", "desktop".to_string())];
        analyze(&params, &mut pairs);
        assert!(pairs.iter().any(|(k, v)| *k == "contradictionList" && v.contains("desktopWithTinyScreen")));
    }
}
