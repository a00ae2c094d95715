//! Product image handling: one parser for the stored image field, URL
//! resolution through the image proxy, and a bounded, cached loader.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Shown when a product carries no usable image.
pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder-flower.jpg";

/// Normalizes a stored image field into an ordered list of URLs.
///
/// Accepted shapes:
/// - `null` → empty list
/// - an array → its non-blank string elements, in order (other elements are skipped)
/// - a string holding JSON → the JSON is parsed and normalized by the same rules
/// - any other string → a one-element list, unless blank
///
/// Numbers, booleans and objects yield an empty list.
pub fn parse_image_list(raw: &Value) -> Vec<String> {
    match raw {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return vec![];
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(parsed @ (Value::String(_) | Value::Array(_))) => parse_image_list(&parsed),
                _ => vec![trimmed.to_string()],
            }
        }
        _ => vec![],
    }
}

/// Like [`parse_image_list`], falling back to the placeholder when nothing is usable.
pub fn images_or_placeholder(raw: &Value) -> Vec<String> {
    let images = parse_image_list(raw);
    if images.is_empty() { vec![PLACEHOLDER_IMAGE.to_string()] } else { images }
}

/// Resolves a stored image path to the URL the storefront should load.
///
/// Absolute `http(s)` URLs go through `<api_base>/images/proxy?url=...`, site-local
/// paths (`/...`) are used as-is, everything else maps to the API placeholder.
pub fn image_url(api_base: &str, path: &str) -> String {
    let path = path.trim();
    let base = api_base.trim_end_matches('/');
    if path.starts_with("http") {
        return reqwest::Url::parse_with_params(&format!("{base}/images/proxy"), &[("url", path)])
            .map(|u| u.to_string())
            .unwrap_or_else(|_| placeholder_url(base));
    }
    if path.starts_with('/') {
        return path.to_string();
    }
    placeholder_url(base)
}

fn placeholder_url(base: &str) -> String { format!("{base}/images/placeholder") }

/// Checks whether a resolved image URL can actually be fetched.
#[async_trait]
pub trait ImageProbe: Send + Sync {
    async fn probe(&self, url: &str) -> bool;
}

#[derive(Debug)]
struct ImageCache {
    capacity: usize,
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl ImageCache {
    fn get(&self, key: &str) -> Option<String> { self.entries.get(key).cloned() }

    fn insert(&mut self, key: String, value: String) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(key.clone(), value).is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => { self.entries.remove(&oldest); }
                None => break,
            }
        }
    }
}

/// Loads images through an [`ImageProbe`] with at most `max_concurrent` probes in
/// flight and a FIFO-evicted cache of `capacity` resolved URLs.
pub struct ImageLoader {
    api_base: String,
    probe: Arc<dyn ImageProbe>,
    cache: Mutex<ImageCache>,
    permits: Semaphore,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader").field("api_base", &self.api_base).field("available", &self.permits.available_permits()).finish()
    }
}

impl ImageLoader {
    pub fn new(api_base: impl Into<String>, probe: Arc<dyn ImageProbe>, capacity: usize, max_concurrent: usize) -> Self {
        Self {
            api_base: api_base.into(),
            probe,
            cache: Mutex::new(ImageCache { capacity, entries: HashMap::new(), order: VecDeque::new() }),
            permits: Semaphore::new(max_concurrent.max(1)),
        }
    }

    pub fn placeholder(&self) -> String { placeholder_url(self.api_base.trim_end_matches('/')) }

    pub fn cached(&self, path: &str) -> Option<String> { self.lock().get(path) }

    pub fn cached_len(&self) -> usize { self.lock().entries.len() }

    pub fn clear_cache(&self) {
        let mut cache = self.lock();
        cache.entries.clear();
        cache.order.clear();
    }

    /// Resolves `path` to a loadable URL, or the placeholder if the probe fails.
    pub async fn load(&self, path: &str) -> String {
        if path.trim().is_empty() {
            return self.placeholder();
        }
        if let Some(hit) = self.cached(path) {
            return hit;
        }
        let url = image_url(&self.api_base, path);
        let ok = match self.permits.acquire().await {
            Ok(_permit) => self.probe.probe(&url).await,
            Err(_) => false,
        };
        let resolved = if ok {
            debug!(path, "image loaded");
            url
        } else {
            warn!(path, "image failed to load, using placeholder");
            self.placeholder()
        };
        self.lock().insert(path.to_string(), resolved.clone());
        resolved
    }

    /// Loads every distinct non-blank path; concurrency stays bounded by the loader.
    pub async fn preload(&self, paths: &[String]) -> HashMap<String, String> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = paths.iter().filter(|p| !p.trim().is_empty() && seen.insert(p.as_str())).collect();
        let loads = unique.iter().map(|p| async move { ((*p).clone(), self.load(p).await) });
        futures::future::join_all(loads).await.into_iter().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ImageCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProbe { calls: AtomicUsize, in_flight: AtomicUsize, peak: AtomicUsize, fail_on: &'static str }

    #[async_trait]
    impl ImageProbe for CountingProbe {
        async fn probe(&self, url: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            !url.contains(self.fail_on)
        }
    }

    fn probe(fail_on: &'static str) -> Arc<CountingProbe> {
        Arc::new(CountingProbe { calls: AtomicUsize::new(0), in_flight: AtomicUsize::new(0), peak: AtomicUsize::new(0), fail_on })
    }

    #[test]
    fn test_parse_image_shapes() {
        assert!(parse_image_list(&Value::Null).is_empty());
        assert_eq!(parse_image_list(&json!(["/a.jpg", "", "  ", 5, "/b.jpg"])), vec!["/a.jpg", "/b.jpg"]);
        assert_eq!(parse_image_list(&json!("[\"/a.jpg\",\"/b.jpg\"]")), vec!["/a.jpg", "/b.jpg"]);
        assert_eq!(parse_image_list(&json!("\"/a.jpg\"")), vec!["/a.jpg"]);
        assert_eq!(parse_image_list(&json!("https://cdn/x.png")), vec!["https://cdn/x.png"]);
        assert!(parse_image_list(&json!("   ")).is_empty());
        assert!(parse_image_list(&json!({"url": "/a.jpg"})).is_empty());
    }

    #[test]
    fn test_placeholder_fallback() {
        assert_eq!(images_or_placeholder(&Value::Null), vec![PLACEHOLDER_IMAGE]);
    }

    #[test]
    fn test_image_url_resolution() {
        let base = "http://localhost:5000/api";
        assert_eq!(image_url(base, "/images/rose.jpg"), "/images/rose.jpg");
        assert_eq!(image_url(base, "rose.jpg"), "http://localhost:5000/api/images/placeholder");
        let proxied = image_url(base, "https://cdn.example.com/a b.jpg");
        assert!(proxied.starts_with("http://localhost:5000/api/images/proxy?url=https%3A%2F%2Fcdn.example.com"));
    }

    #[tokio::test]
    async fn test_load_caches_and_falls_back() {
        let p = probe("broken");
        let loader = ImageLoader::new("http://localhost:5000/api", p.clone(), 8, 2);
        assert_eq!(loader.load("/ok.jpg").await, "/ok.jpg");
        assert_eq!(loader.load("/ok.jpg").await, "/ok.jpg");
        assert_eq!(p.calls.load(Ordering::SeqCst), 1);
        assert_eq!(loader.load("/broken.jpg").await, loader.placeholder());
        assert_eq!(loader.load("").await, loader.placeholder());
    }

    #[tokio::test]
    async fn test_cache_capacity_evicts_oldest() {
        let loader = ImageLoader::new("http://localhost:5000/api", probe("never"), 2, 1);
        for path in ["/1.jpg", "/2.jpg", "/3.jpg"] {
            loader.load(path).await;
        }
        assert_eq!(loader.cached_len(), 2);
        assert!(loader.cached("/1.jpg").is_none());
        assert!(loader.cached("/3.jpg").is_some());
    }

    #[tokio::test]
    async fn test_preload_bounds_concurrency() {
        let p = probe("never");
        let loader = ImageLoader::new("http://localhost:5000/api", p.clone(), 64, 3);
        let paths: Vec<String> = (0..10).map(|i| format!("/{i}.jpg")).chain(["/0.jpg".to_string(), String::new()]).collect();
        let results = loader.preload(&paths).await;
        assert_eq!(results.len(), 10);
        assert_eq!(p.calls.load(Ordering::SeqCst), 10);
        assert!(p.peak.load(Ordering::SeqCst) <= 3);
    }
}
