#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::anyhow;
use plano_api::{PlanogramProjector, SuggestionRequest};
use plano_catalog::{FixtureRepository, InMemoryCatalog};
use plano_core::{ErrorCode, FacingConfig, FixtureConfig, PlanoError, PlanogramAction, PlanogramConfig, SemanticPosition, SourceProduct};

fn catalog() -> Arc<InMemoryCatalog> {
    let doc = serde_json::json!({
        "products": [
            { "sku": "COLA", "name": "Cola",
              "classification": { "category": "beverages" },
              "dimensions": { "physical": { "width": 80.0, "height": 120.0, "depth": 100.0 } },
              "visualProperties": { "spriteVariants": [{ "view": "front", "url": "cola.png" }] } },
            { "sku": "CHIPS", "name": "Chips",
              "classification": { "category": "snacks" },
              "dimensions": { "physical": { "width": 150.0, "height": 220.0, "depth": 60.0 } },
              "visualProperties": { "spriteVariants": [{ "view": "front", "url": "chips.png" }] },
              "pricing": { "unitPrice": 2.5, "promotionalPrice": 1.99 } }
        ],
        "fixtures": [
            { "type": "gondola", "placementModel": "shelf-surface",
              "dimensions": { "width": 1200.0, "height": 1800.0, "depth": 600.0 },
              "config": { "shelves": [
                  { "id": "s0", "index": 0, "baseHeight": 0.0 },
                  { "id": "s1", "index": 1, "baseHeight": 400.0 } ] } },
            { "type": "hover-rack", "placementModel": "shelf-surface",
              "dimensions": { "width": 10.0, "height": 10.0, "depth": 10.0 } }
        ]
    });
    Arc::new(InMemoryCatalog::from_json(&doc.to_string()).unwrap())
}

fn projector() -> PlanogramProjector {
    let c = catalog();
    PlanogramProjector::new(c.clone(), c)
}

fn add(id: &str, sku: &str, x: f64, shelf: u32) -> PlanogramAction {
    PlanogramAction::ProductAdd { product: SourceProduct::new(id, sku, SemanticPosition::shelf(x, shelf, 0)) }
}

fn log() -> Vec<PlanogramAction> {
    vec![
        add("a", "COLA", 0.0, 0),
        add("b", "CHIPS", 40.0, 0),
        add("c", "COLA", 0.0, 1),
        PlanogramAction::ProductUpdateFacings { product_id: "c".into(), facings: FacingConfig::new(3, 1) },
        add("d", "GHOST", 600.0, 1),
    ]
}

#[tokio::test]
async fn new_planogram_uses_fixture_templates() {
    let p = projector();
    let cfg = p.new_planogram("gondola").await.unwrap();
    assert!(cfg.products.is_empty());
    assert_eq!(cfg.fixture.config.shelves.len(), 2);

    assert!(matches!(p.new_planogram("igloo").await, Err(PlanoError::FixtureNotFound(_))));
    // template exists but its type is not a known fixture family
    assert!(matches!(p.new_planogram("hover-rack").await, Err(PlanoError::FixtureNotFound(_))));
}

#[tokio::test]
async fn project_resolves_metadata_and_isolates_failures() {
    let p = projector();
    let base = p.new_planogram("gondola").await.unwrap();
    let snap = p.project(&base, &log()).await.unwrap();

    assert_eq!(snap.epoch, 5);
    assert_eq!(snap.config.products.len(), 4);
    let summary = &snap.render.metadata;
    assert_eq!(summary.total_instances, 6);
    assert_eq!(summary.valid_instances, 5);
    assert_eq!(summary.processing_errors[0].code, ErrorCode::MetadataMissing);

    // catalog pricing marks CHIPS as promotional
    let chips = snap.render.render_instances.iter().find(|i| i.id == "b").unwrap();
    assert!(chips.promotional);

    let colliding: Vec<&str> = snap.collisions.keys().map(String::as_str).collect();
    assert_eq!(colliding, vec!["a", "b"]);
    // base untouched
    assert!(base.products.is_empty());
}

#[tokio::test]
async fn projection_is_deterministic() {
    let p = projector();
    let base = p.new_planogram("gondola").await.unwrap();

    let one = p.project(&base, &log()).await.unwrap();
    let two = p.project(&base, &log()).await.unwrap();
    assert_eq!(one, two);
    assert_eq!(serde_json::to_string(&one).unwrap(), serde_json::to_string(&two).unwrap());

    // the same edits as a single BATCH derive the same frame
    let batched = p.project(&base, &[PlanogramAction::Batch { actions: log() }]).await.unwrap();
    assert_eq!(batched.render, one.render);
    assert_eq!(batched.collisions, one.collisions);
    assert_eq!(one.epoch, log().len() as u64);
    assert_eq!(batched.epoch, 1);
}

#[tokio::test]
async fn validate_and_suggest_do_not_commit() {
    let p = projector();
    let base = p.new_planogram("gondola").await.unwrap();
    let actions = vec![add("a", "COLA", 0.0, 0)];

    let r = p.validate_intent(&base, &actions, &add("x", "COLA", 40.0, 0)).await;
    assert!(!r.valid);
    assert!(r.has_error(ErrorCode::Collision));

    let r = p.validate_intent(&base, &actions, &add("x", "CHIPS", 80.0, 0)).await;
    assert!(r.valid);

    let req = SuggestionRequest {
        pending: vec![add("x", "CHIPS", 80.0, 0)],
        ..SuggestionRequest::new("COLA")
    };
    let s = p.suggest_placement(&base, &actions, &req).await.unwrap();
    assert_eq!(s.position, SemanticPosition::shelf(230.0, 0, 0));

    let cfg = p.project(&base, &actions).await.unwrap().config;
    assert_eq!(cfg.products.len(), 1);
    let hits = p.check_collision(&cfg, &SemanticPosition::shelf(50.0, 0, 0), "COLA", None, None).await;
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn structural_errors_surface_from_project() {
    let p = projector();
    let mut base = p.new_planogram("gondola").await.unwrap();
    let mut f: FixtureConfig = (*base.fixture).clone();
    f.placement_model = "hex-grid".into();
    base = PlanogramConfig { fixture: Arc::new(f), ..base };
    let err = p.project(&base, &[]).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::PlacementModelNotFound);
}

struct Down;

#[async_trait::async_trait]
impl FixtureRepository for Down {
    async fn get_by_type(&self, _fixture_type: &str) -> anyhow::Result<Option<Arc<FixtureConfig>>> {
        Err(anyhow!("connection refused"))
    }
}

#[tokio::test]
async fn fixture_backend_errors_map_to_catalog_errors() {
    let p = PlanogramProjector::new(catalog(), Arc::new(Down));
    let err = p.new_planogram("gondola").await.unwrap_err();
    assert!(matches!(err, PlanoError::Catalog(ref m) if m.contains("connection refused")));
}
