use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::warn;

use super::{CardCatalog, CardDefinition};
use crate::clock::Clock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The backing source could not be read.
    Unavailable(String),
    /// The source produced data that is not a list of card definitions.
    Malformed(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Unavailable(msg) => write!(f, "card catalog unavailable: {}", msg),
            CatalogError::Malformed(msg) => write!(f, "card catalog malformed: {}", msg),
        }
    }
}

impl std::error::Error for CatalogError {}

/// External card catalog: returns every definition it knows about.
pub trait CardSource: Send + Sync {
    fn get_all_cards(&self) -> Result<Vec<CardDefinition>, CatalogError>;
}

/// In-memory source, mostly for tests and the starter set.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    cards: Vec<CardDefinition>,
}

impl StaticSource {
    pub fn new(cards: Vec<CardDefinition>) -> Self {
        Self { cards }
    }
}

impl CardSource for StaticSource {
    fn get_all_cards(&self) -> Result<Vec<CardDefinition>, CatalogError> {
        Ok(self.cards.clone())
    }
}

/// Reads a JSON array of definitions from disk on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CardSource for JsonFileSource {
    fn get_all_cards(&self) -> Result<Vec<CardDefinition>, CatalogError> {
        let text = fs::read_to_string(&self.path)
            .map_err(|e| CatalogError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_str(&text).map_err(|e| CatalogError::Malformed(e.to_string()))
    }
}

struct CacheEntry {
    fetched_at: u64,
    catalog: Arc<CardCatalog>,
}

/// TTL cache in front of a [`CardSource`].
///
/// A refresh failure falls back to the stale catalog when one exists.
pub struct CachedCatalog {
    source: Box<dyn CardSource>,
    clock: Arc<dyn Clock>,
    ttl_ms: u64,
    entry: Mutex<Option<CacheEntry>>,
}

impl CachedCatalog {
    pub fn new(source: Box<dyn CardSource>, clock: Arc<dyn Clock>, ttl_ms: u64) -> Self {
        Self {
            source,
            clock,
            ttl_ms,
            entry: Mutex::new(None),
        }
    }

    pub fn catalog(&self) -> Result<Arc<CardCatalog>, CatalogError> {
        let now = self.clock.now_ms();
        let mut entry = self
            .entry
            .lock()
            .map_err(|_| CatalogError::Unavailable("catalog cache poisoned".to_string()))?;

        if let Some(cached) = entry.as_ref()
            && now.saturating_sub(cached.fetched_at) < self.ttl_ms
        {
            return Ok(Arc::clone(&cached.catalog));
        }

        match self.source.get_all_cards() {
            Ok(cards) => {
                let catalog = Arc::new(CardCatalog::from_cards(cards));
                *entry = Some(CacheEntry {
                    fetched_at: now,
                    catalog: Arc::clone(&catalog),
                });
                Ok(catalog)
            }
            Err(err) => match entry.as_ref() {
                Some(stale) => {
                    warn!(error = %err, "catalog refresh failed, serving stale catalog");
                    Ok(Arc::clone(&stale.catalog))
                }
                None => Err(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardDefinitionBuilder;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: Arc<AtomicUsize>,
        fail_after: usize,
    }

    impl CardSource for CountingSource {
        fn get_all_cards(&self) -> Result<Vec<CardDefinition>, CatalogError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call >= self.fail_after {
                return Err(CatalogError::Unavailable("down".to_string()));
            }
            Ok(vec![
                CardDefinitionBuilder::monster("a", "A", 1, 100, 100).build(),
            ])
        }
    }

    #[test]
    fn cache_hits_within_ttl_and_refreshes_after() {
        let calls = Arc::new(AtomicUsize::new(0));
        let clock = Arc::new(ManualClock::new(0));
        let cache = CachedCatalog::new(
            Box::new(CountingSource {
                calls: Arc::clone(&calls),
                fail_after: usize::MAX,
            }),
            clock.clone(),
            1000,
        );

        cache.catalog().unwrap();
        clock.advance(999);
        cache.catalog().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(1);
        cache.catalog().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_refresh_serves_stale_catalog() {
        let calls = Arc::new(AtomicUsize::new(0));
        let clock = Arc::new(ManualClock::new(0));
        let cache = CachedCatalog::new(
            Box::new(CountingSource {
                calls: Arc::clone(&calls),
                fail_after: 1,
            }),
            clock.clone(),
            10,
        );

        assert_eq!(cache.catalog().unwrap().len(), 1);
        clock.advance(50);
        assert_eq!(cache.catalog().unwrap().len(), 1);
    }

    #[test]
    fn first_fetch_failure_is_an_error() {
        let cache = CachedCatalog::new(
            Box::new(CountingSource {
                calls: Arc::new(AtomicUsize::new(0)),
                fail_after: 0,
            }),
            Arc::new(ManualClock::new(0)),
            10,
        );
        assert!(matches!(
            cache.catalog(),
            Err(CatalogError::Unavailable(_))
        ));
    }
}
