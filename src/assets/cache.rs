use crate::assets::{ModelLoader, ProgressFn};
use crate::scene::LoadedModel;
use std::collections::HashMap;
use std::sync::Arc;

/// Session-lifetime cache of parsed models, keyed by the raw URL as it
/// appears in the product record. At most one entry exists per distinct
/// URL. Loads run synchronously on the session thread, so a second
/// `get_or_load` for the same URL always observes the completed entry and
/// never issues a duplicate load.
#[derive(Default)]
pub struct ModelCache {
    entries: HashMap<String, Arc<LoadedModel>>,
    loads_issued: usize,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<Arc<LoadedModel>> {
        self.entries.get(url).cloned()
    }

    /// Cached handle if present, otherwise one loader invocation whose
    /// result (real model or fallback) is stored and returned. The returned
    /// `Arc` is cheap to place independently; the cached master stays
    /// read-only.
    pub fn get_or_load(
        &mut self,
        url: &str,
        loader: &ModelLoader,
        correlation: &str,
        progress: ProgressFn,
    ) -> Arc<LoadedModel> {
        if let Some(model) = self.entries.get(url) {
            log::debug!("[{correlation}] Model cache hit for {url}");
            return model.clone();
        }
        self.loads_issued += 1;
        let model = Arc::new(loader.load(url, correlation, progress));
        self.entries.insert(url.to_string(), model.clone());
        model
    }

    /// Stores a model produced outside `get_or_load` (a load that finished
    /// after its session closed). First writer wins.
    pub fn insert(&mut self, url: &str, model: Arc<LoadedModel>) {
        self.entries.entry(url.to_string()).or_insert(model);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn loads_issued(&self) -> usize {
        self.loads_issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{FetchError, Fetcher, ModelLoader, ObjParser};
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingFetcher {
        calls: Rc<Cell<usize>>,
    }

    impl Fetcher for CountingFetcher {
        fn fetch(&self, _url: &str, _progress: ProgressFn) -> Result<Vec<u8>, FetchError> {
            self.calls.set(self.calls.get() + 1);
            Ok(b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n".to_vec())
        }
    }

    fn counting_loader() -> (ModelLoader, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let loader = ModelLoader::with_parts(
            "https://storage.example/products",
            Box::new(CountingFetcher {
                calls: calls.clone(),
            }),
            Box::new(ObjParser),
        );
        (loader, calls)
    }

    #[test]
    fn repeated_get_or_load_issues_one_load() {
        let (loader, fetches) = counting_loader();
        let mut cache = ModelCache::new();

        let first = cache.get_or_load("door.obj", &loader, "t", &mut |_| {});
        let second = cache.get_or_load("door.obj", &loader, "t", &mut |_| {});

        assert_eq!(cache.loads_issued(), 1);
        assert_eq!(fetches.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn distinct_urls_get_distinct_entries() {
        let (loader, _) = counting_loader();
        let mut cache = ModelCache::new();

        cache.get_or_load("door.obj", &loader, "t", &mut |_| {});
        cache.get_or_load("window.obj", &loader, "t", &mut |_| {});

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.loads_issued(), 2);
    }

    #[test]
    fn failed_loads_are_cached_as_fallbacks() {
        struct BrokenFetcher;
        impl Fetcher for BrokenFetcher {
            fn fetch(&self, url: &str, _progress: ProgressFn) -> Result<Vec<u8>, FetchError> {
                Err(FetchError::Request(format!("down: {url}")))
            }
        }
        let loader = ModelLoader::with_parts(
            "https://storage.example/products",
            Box::new(BrokenFetcher),
            Box::new(ObjParser),
        );
        let mut cache = ModelCache::new();

        let model = cache.get_or_load("gone.obj", &loader, "t", &mut |_| {});
        assert!(model.fallback);
        // The fallback is cached too; no retry storm on re-open.
        cache.get_or_load("gone.obj", &loader, "t", &mut |_| {});
        assert_eq!(cache.loads_issued(), 1);
    }

    #[test]
    fn late_insert_does_not_clobber_existing_entry() {
        let (loader, _) = counting_loader();
        let mut cache = ModelCache::new();
        let existing = cache.get_or_load("door.obj", &loader, "t", &mut |_| {});

        cache.insert("door.obj", Arc::new(crate::assets::fallback_model("door.obj")));
        assert!(Arc::ptr_eq(&cache.get("door.obj").unwrap(), &existing));
    }
}
