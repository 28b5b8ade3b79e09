//! User-agent parsing into a [`DeviceProfile`].

use crate::models::DeviceProfile;
use regex::Regex;
use std::sync::LazyLock;

// Order matters: Edge and Opera agents also contain "Chrome", Chrome agents contain "Safari".
static BROWSER_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("Edge", r"Edg(?:e|A|iOS)?/([\d.]+)"),
        ("Opera", r"(?:OPR|Opera)/([\d.]+)"),
        ("Samsung Internet", r"SamsungBrowser/([\d.]+)"),
        ("Chrome", r"(?:Chrome|CriOS)/([\d.]+)"),
        ("Firefox", r"(?:Firefox|FxiOS)/([\d.]+)"),
        ("Safari", r"Version/([\d.]+).*Safari/"),
        ("Internet Explorer", r"(?:MSIE |Trident/.*rv:)([\d.]+)"),
    ]
    .into_iter()
    .filter_map(|(name, pattern)| Regex::new(pattern).ok().map(|re| (name, re)))
    .collect()
});

static OS_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("Windows", r"Windows NT ([\d.]+)"),
        ("iOS", r"(?:iPhone|iPad|iPod).*? OS ([\d_]+)"),
        ("Android", r"Android ([\d.]+)"),
        ("macOS", r"Mac OS X ([\d_.]+)"),
        ("Chrome OS", r"CrOS \S+ ([\d.]+)"),
        ("Linux", r"Linux()"),
    ]
    .into_iter()
    .filter_map(|(name, pattern)| Regex::new(pattern).ok().map(|re| (name, re)))
    .collect()
});

static MOBILE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)mobi|iphone|ipod|android.*mobile|windows phone").ok());

/// Derive browser, operating system and form factor from a raw user-agent.
///
/// Unrecognized agents produce an empty profile.
pub fn parse_device_profile(user_agent: &str) -> DeviceProfile {
    let (browser_name, browser_version) = match_first(&BROWSER_PATTERNS, user_agent);
    let (os_name, os_version) = match_first(&OS_PATTERNS, user_agent);
    let is_mobile = MOBILE_PATTERN
        .as_ref()
        .is_some_and(|re| re.is_match(user_agent));

    DeviceProfile {
        is_mobile,
        browser_name,
        browser_version,
        os_name,
        os_version: os_version.map(|v| v.replace('_', ".")),
    }
}

fn match_first(patterns: &[(&'static str, Regex)], input: &str) -> (Option<String>, Option<String>) {
    for (name, re) in patterns {
        if let Some(captures) = re.captures(input) {
            let version = captures
                .get(1)
                .map(|m| m.as_str().to_string())
                .filter(|v| !v.is_empty());
            return (Some((*name).to_string()), version);
        }
    }
    (None, None)
}
