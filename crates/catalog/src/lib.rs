//! Plano catalog: where product metadata and fixture templates come from.
//!
//! Repositories are async so backends can be remote; the projection itself stays
//! synchronous and only ever sees a fully resolved `MetadataMap`.

#![forbid(unsafe_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use plano_core::{FixtureConfig, MetadataMap, ProductMetadata};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[async_trait::async_trait]
pub trait MetadataRepository: Send + Sync {
    /// `Ok(None)` when the sku is simply unknown.
    async fn get_by_sku(&self, sku: &str) -> Result<Option<Arc<ProductMetadata>>>;
}

#[async_trait::async_trait]
pub trait FixtureRepository: Send + Sync {
    async fn get_by_type(&self, fixture_type: &str) -> Result<Option<Arc<FixtureConfig>>>;
}

/// On-disk catalog shape, JSON or YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub products: Vec<ProductMetadata>,
    #[serde(default)]
    pub fixtures: Vec<FixtureConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    products: FxHashMap<String, Arc<ProductMetadata>>,
    fixtures: FxHashMap<String, Arc<FixtureConfig>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self { Self::default() }

    /// Later entries replace earlier ones with the same sku / fixture type.
    pub fn from_document(doc: CatalogDocument) -> Self {
        let mut c = Self::new();
        doc.products.into_iter().for_each(|p| c.insert_product(p));
        doc.fixtures.into_iter().for_each(|f| c.insert_fixture(f));
        c
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let doc: CatalogDocument = serde_json::from_str(s).context("parsing catalog json")?;
        Ok(Self::from_document(doc))
    }

    pub fn from_yaml(s: &str) -> Result<Self> {
        let doc: CatalogDocument = serde_yaml::from_str(s).context("parsing catalog yaml")?;
        Ok(Self::from_document(doc))
    }

    /// Load by extension: `.yaml`/`.yml` as YAML, anything else as JSON.
    pub fn load_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading catalog {}", path.display()))?;
        let yaml = matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"));
        let c = if yaml { Self::from_yaml(&raw)? } else { Self::from_json(&raw)? };
        info!(path = %path.display(), products = c.products.len(), fixtures = c.fixtures.len(), "catalog loaded");
        Ok(c)
    }

    pub fn insert_product(&mut self, p: ProductMetadata) { self.products.insert(p.sku.clone(), Arc::new(p)); }

    pub fn insert_fixture(&mut self, f: FixtureConfig) { self.fixtures.insert(f.fixture_type.clone(), Arc::new(f)); }

    pub fn product_count(&self) -> usize { self.products.len() }

    pub fn fixture_count(&self) -> usize { self.fixtures.len() }

    /// Fixture types in sorted order.
    pub fn fixture_types(&self) -> Vec<String> {
        let mut v: Vec<String> = self.fixtures.keys().cloned().collect();
        v.sort();
        v
    }
}

#[async_trait::async_trait]
impl MetadataRepository for InMemoryCatalog {
    async fn get_by_sku(&self, sku: &str) -> Result<Option<Arc<ProductMetadata>>> { Ok(self.products.get(sku).cloned()) }
}

#[async_trait::async_trait]
impl FixtureRepository for InMemoryCatalog {
    async fn get_by_type(&self, fixture_type: &str) -> Result<Option<Arc<FixtureConfig>>> {
        Ok(self.fixtures.get(fixture_type).cloned())
    }
}

/// Resolve every distinct sku once, concurrently. Unknown skus and lookup
/// failures are left out of the map; the pipeline reports them per product.
pub async fn resolve_metadata<R>(repo: &R, skus: &[String]) -> MetadataMap
where
    R: MetadataRepository + ?Sized,
{
    let t0 = Instant::now();
    let mut distinct: Vec<&str> = Vec::with_capacity(skus.len());
    for s in skus.iter() {
        if !distinct.contains(&s.as_str()) {
            distinct.push(s.as_str());
        }
    }
    let lookups = distinct.iter().map(|sku| async move { (*sku, repo.get_by_sku(sku).await) });
    let results = futures::future::join_all(lookups).await;

    let mut map = MetadataMap::default();
    let (mut misses, mut failures) = (0usize, 0usize);
    for (sku, res) in results {
        match res {
            Ok(Some(m)) => {
                metrics::counter!("catalog_lookups_total", 1u64, "outcome" => "hit");
                map.insert(sku.to_string(), m);
            }
            Ok(None) => {
                metrics::counter!("catalog_lookups_total", 1u64, "outcome" => "miss");
                debug!(sku, "sku not in catalog");
                misses += 1;
            }
            Err(e) => {
                metrics::counter!("catalog_lookups_total", 1u64, "outcome" => "error");
                warn!(sku, error = %e, "catalog lookup failed");
                failures += 1;
            }
        }
    }
    info!(requested = distinct.len(), resolved = map.len(), misses, failures, took_ms = %t0.elapsed().as_millis(), "catalog: metadata resolved");
    map
}
