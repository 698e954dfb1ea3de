//! Script-template cache (spec §6.1): a single cached template with one
//! placeholder (the GIF URL) substituted per request. Bounded at 10 000
//! entries, evict-all-on-overflow — resolved in `SPEC_FULL.md` §2 exactly
//! as specified; a bounded LRU is flagged there as a known improvement,
//! not implemented.

use std::sync::Arc;

use dashmap::DashMap;

const PLACEHOLDER: &str = "__SMARTPIXL_GIF_URL__";
const MAX_CACHE_ENTRIES: usize = 10_000;

pub struct ScriptCache {
    template: String,
    cache: DashMap<String, Arc<str>>,
    max_entries: usize,
}

impl ScriptCache {
    pub fn new(template: String) -> Self {
        Self {
            template,
            cache: DashMap::new(),
            max_entries: MAX_CACHE_ENTRIES,
        }
    }

    #[cfg(test)]
    fn with_capacity(template: String, max_entries: usize) -> Self {
        Self {
            template,
            cache: DashMap::new(),
            max_entries,
        }
    }

    /// Render the template with `gif_url` substituted, serving from cache
    /// when the exact same URL has been substituted before.
    pub fn render(&self, gif_url: &str) -> Arc<str> {
        if let Some(existing) = self.cache.get(gif_url) {
            return existing.clone();
        }
        if self.cache.len() >= self.max_entries {
            self.cache.clear();
        }
        let rendered: Arc<str> = Arc::from(self.template.replace(PLACEHOLDER, gif_url));
        self.cache.insert(gif_url.to_string(), rendered.clone());
        rendered
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Build the GIF URL substituted into the script template for one
/// company/pixel/domain triple (spec `BaseUrl` config key, §6.3).
pub fn build_gif_url(base_url: &str, company: &str, pixel: &str, domain: &str) -> String {
    format!("{}/{}/{}_{}_SMART.GIF", base_url.trim_end_matches('/'), company, pixel, domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_placeholder() {
        let cache = ScriptCache::new(format!("var u = '{PLACEHOLDER}';"));
        let rendered = cache.render("https://example.com/ACME/42_x_SMART.GIF");
        assert_eq!(&*rendered, "var u = 'https://example.com/ACME/42_x_SMART.GIF';");
    }

    #[test]
    fn repeated_same_url_hits_cache() {
        let cache = ScriptCache::new(format!("{PLACEHOLDER}"));
        let a = cache.render("https://x/1");
        let b = cache.render("https://x/1");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn overflow_evicts_entire_cache() {
        let cache = ScriptCache::with_capacity(format!("{PLACEHOLDER}"), 2);
        cache.render("a");
        cache.render("b");
        assert_eq!(cache.len(), 2);
        cache.render("c");
        // evict-all-on-overflow: only the newest entry remains.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn build_gif_url_strips_trailing_slash_on_base() {
        assert_eq!(
            build_gif_url("https://example.com/", "ACME", "42", "x.com"),
            "https://example.com/ACME/42_x.com_SMART.GIF"
        );
    }
}
