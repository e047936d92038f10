//! Process-wide model loading and caching.

use std::sync::{Arc, Mutex};

use ort::session::Session;

use crate::error::Result;
use crate::model::loader::{ModelCache, ModelKind};

/// Bottleneck length the shipped transformer graph was built for.
pub const BOTTLENECK_LEN: usize = 100;

/// The pair of loaded inference graphs, shared read-only across invocations.
///
/// `ort` executes through `&mut Session`, so each graph sits behind its own
/// mutex; invocations within a session are already serialized by the
/// processing flag.
pub struct StyleModels {
    pub(crate) predictor: Mutex<Session>,
    pub(crate) transformer: Mutex<Session>,
}

impl StyleModels {
    /// Load both graphs, downloading them on first use.
    ///
    /// The two artifacts are independent, so they are fetched and parsed
    /// concurrently.
    ///
    /// # Errors
    ///
    /// Returns an error if either artifact cannot be downloaded or parsed.
    pub fn load(cache: &ModelCache) -> Result<Self> {
        tracing::info!("Loading style predictor and transformer...");

        let (predictor, transformer) = std::thread::scope(|scope| {
            let predictor = scope.spawn(|| cache.load_session(ModelKind::StylePredictor));
            let transformer = cache.load_session(ModelKind::StyleTransformer);
            (
                predictor.join().expect("predictor load thread panicked"),
                transformer,
            )
        });

        Ok(Self {
            predictor: Mutex::new(predictor?),
            transformer: Mutex::new(transformer?),
        })
    }
}

/// Capability interface handing out the loaded model pair.
pub trait ModelProvider {
    /// The concrete model bundle this provider yields.
    type Models;

    /// Return the cached models, loading them on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails; the failure is not cached, so a
    /// later call retries.
    fn models(&self) -> Result<Arc<Self::Models>>;
}

/// Lazy, at-most-once-successful model cache.
///
/// The first successful load is retained for the process lifetime. A failed
/// load leaves the slot empty, so the next call re-attempts the fetch instead
/// of serving a cached failure.
pub struct ModelRegistry<M, F> {
    load: F,
    loaded: Mutex<Option<Arc<M>>>,
}

impl<M, F> ModelRegistry<M, F>
where
    F: Fn() -> Result<M>,
{
    pub fn new(load: F) -> Self {
        Self {
            load,
            loaded: Mutex::new(None),
        }
    }

    /// Return the cached models, loading them on first use.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error without caching it.
    pub fn get(&self) -> Result<Arc<M>> {
        let mut slot = self.loaded.lock().unwrap();
        if let Some(models) = slot.as_ref() {
            return Ok(Arc::clone(models));
        }

        let models = Arc::new((self.load)()?);
        *slot = Some(Arc::clone(&models));
        Ok(models)
    }
}

impl<M, F> ModelProvider for ModelRegistry<M, F>
where
    F: Fn() -> Result<M>,
{
    type Models = M;

    fn models(&self) -> Result<Arc<M>> {
        self.get()
    }
}

/// Registry wired to the on-disk cache and the shipped artifact locations.
///
/// # Errors
///
/// Returns an error if the cache directory cannot be created. Model loading
/// itself is deferred to the first [`ModelProvider::models`] call.
pub fn default_registry() -> Result<ModelRegistry<StyleModels, impl Fn() -> Result<StyleModels>>> {
    let cache = ModelCache::new()?;
    Ok(ModelRegistry::new(move || StyleModels::load(&cache)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unavailable(name: &str) -> Error {
        Error::InvalidParameter {
            name: name.to_string(),
            reason: "artifact unavailable".to_string(),
        }
    }

    #[test]
    fn failed_load_is_retried_not_cached() {
        let attempts = AtomicUsize::new(0);
        let registry = ModelRegistry::new(|| {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(unavailable("predictor"))
            } else {
                Ok(41_u32)
            }
        });

        assert!(registry.get().is_err());
        assert_eq!(*registry.get().unwrap(), 41);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn successful_load_is_cached_for_later_calls() {
        let attempts = AtomicUsize::new(0);
        let registry = ModelRegistry::new(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            Ok(7_u8)
        });

        let first = registry.get().unwrap();
        let second = registry.get().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
