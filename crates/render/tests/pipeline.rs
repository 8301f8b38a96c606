#![forbid(unsafe_code)]

use std::sync::Arc;

use plano_core::model::{FixtureLayout, PEGBOARD_GRID, SHELF_SURFACE};
use plano_core::{
    Dims3D, ErrorCode, FacingConfig, FixtureConfig, MaskType, MetadataMap, PlacementModelRegistry, PlanoError,
    PlanogramConfig, ProductMetadata, SemanticPosition, ShelfConfig, SourceProduct,
};
use plano_render::{PipelineConfig, PlanogramProcessor};
use serde_json::json;

fn meta(sku: &str, category: &str, w: f64, h: f64, d: f64, transparent: bool) -> Arc<ProductMetadata> {
    let m: ProductMetadata = serde_json::from_value(json!({
        "sku": sku,
        "name": sku,
        "classification": { "category": category },
        "dimensions": {
            "physical": { "width": w, "height": h, "depth": d },
            "visual": { "width": w, "height": h }
        },
        "visualProperties": {
            "spriteVariants": [{ "view": "front", "url": format!("sprites/{sku}.png") }],
            "hasTransparency": transparent
        }
    }))
    .unwrap();
    Arc::new(m)
}

fn catalog() -> MetadataMap {
    let mut m = MetadataMap::default();
    m.insert("COLA".into(), meta("COLA", "beverages", 80.0, 120.0, 100.0, false));
    m.insert("FLAKES".into(), meta("FLAKES", "cereal", 200.0, 300.0, 80.0, true));
    m
}

fn gondola(depth: f64, depth_spacing: Option<f64>) -> FixtureConfig {
    FixtureConfig {
        fixture_type: "gondola".into(),
        placement_model: SHELF_SURFACE.into(),
        dimensions: Dims3D::new(1200.0, 1800.0, depth),
        config: FixtureLayout {
            shelves: vec![
                ShelfConfig { id: "s0".into(), index: 0, base_height: 0.0 },
                ShelfConfig { id: "s1".into(), index: 1, base_height: 400.0 },
            ],
            depth_spacing,
        },
    }
}

fn processor() -> PlanogramProcessor { PlanogramProcessor::new(Arc::new(PlacementModelRegistry::with_builtins())) }

#[test]
fn facings_expand_side_by_side() {
    let cfg = PlanogramConfig::new(gondola(600.0, None))
        .with_product(SourceProduct::new("p1", "COLA", SemanticPosition::shelf(210.0, 0, 0)).with_facings(FacingConfig::new(3, 1)));
    let out = processor().process(&cfg, &catalog()).unwrap();

    let xs: Vec<f64> = out.render_instances.iter().map(|i| i.world_position.x).collect();
    assert_eq!(xs, vec![210.0, 290.0, 370.0]);
    let ids: Vec<&str> = out.render_instances.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["p1_h0_v0", "p1_h1_v0", "p1_h2_v0"]);
    assert!(out.render_instances.iter().all(|i| i.source_product_id == "p1"));
    assert_eq!(out.metadata.total_instances, 3);
    assert_eq!(out.metadata.valid_instances, 3);
}

#[test]
fn depth_scale_runs_from_front_to_back_row() {
    let cfg = PlanogramConfig::new(gondola(300.0, Some(100.0)))
        .with_product(SourceProduct::new("front", "COLA", SemanticPosition::shelf(0.0, 0, 0)))
        .with_product(SourceProduct::new("back", "COLA", SemanticPosition::shelf(300.0, 0, 3)));
    let out = processor().process(&cfg, &catalog()).unwrap();
    assert_eq!(out.metadata.invalid_count, 0);

    let front = &out.render_instances[0];
    let back = &out.render_instances[1];
    assert_eq!(front.render_scale, 1.0);
    assert_eq!(front.depth_ratio, 0.0);
    assert!((back.depth_ratio - 1.0).abs() < 1e-9);
    assert!((back.render_scale - 0.92).abs() < 1e-9);
    assert!(front.z_index > back.z_index);

    // back row shrinks around the bottom-centre anchor
    let expected_x = 300.0 + (80.0 - 80.0 * 0.92) * 0.5;
    assert!((back.world_position.x - expected_x).abs() < 1e-9);
    assert_eq!(back.world_position.y, 0.0);
    assert!((back.render_bounds.width - 73.6).abs() < 1e-9);
}

#[test]
fn upper_shelves_paint_over_lower_ones() {
    let mut low = SourceProduct::new("low", "COLA", SemanticPosition::shelf(0.0, 0, 0));
    low.pricing = Some(plano_core::model::Pricing { unit_price: 1.0, promotional_price: Some(0.8) });
    let cfg = PlanogramConfig::new(gondola(600.0, None))
        .with_product(low)
        .with_product(SourceProduct::new("high", "COLA", SemanticPosition::shelf(0.0, 1, 1)));
    let out = processor().process(&cfg, &catalog()).unwrap();

    let low = out.render_instances.iter().find(|i| i.id == "low").unwrap();
    let high = out.render_instances.iter().find(|i| i.id == "high").unwrap();
    assert!(low.promotional);
    assert_eq!(low.z_layer.promotion, 5);
    assert!(high.z_index > low.z_index);
    let order: Vec<&str> = out.paint_order().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(order, vec!["low", "high"]);
}

#[test]
fn one_missing_sku_fails_only_its_product() {
    let mut cfg = PlanogramConfig::new(gondola(600.0, None));
    for i in 0..10 {
        let sku = if i == 4 { "GHOST" } else { "COLA" };
        cfg = cfg.with_product(SourceProduct::new(format!("p{i}"), sku, SemanticPosition::shelf(i as f64 * 100.0, 0, 0)));
    }
    let out = processor().process(&cfg, &catalog()).unwrap();

    assert_eq!(out.render_instances.len(), 9);
    assert_eq!(out.metadata.total_instances, 10);
    assert_eq!(out.metadata.valid_instances, 9);
    assert_eq!(out.metadata.invalid_count, 1);
    let err = &out.metadata.processing_errors[0];
    assert_eq!(err.product_id, "p4");
    assert_eq!(err.code, ErrorCode::MetadataMissing);
    assert_eq!(err.stage, "hydrate");
    assert!(err.instance_id.is_none());
}

#[test]
fn out_of_bounds_instances_are_dropped_with_a_record() {
    let cfg = PlanogramConfig::new(gondola(600.0, None))
        .with_product(SourceProduct::new("edge", "COLA", SemanticPosition::shelf(1100.0, 0, 0)).with_facings(FacingConfig::new(2, 1)))
        .with_product(SourceProduct::new("ghost-shelf", "COLA", SemanticPosition::shelf(0.0, 7, 0)));
    let out = processor().process(&cfg, &catalog()).unwrap();

    let ids: Vec<&str> = out.render_instances.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["edge_h0_v0"]);
    assert_eq!(out.metadata.total_instances, 3);
    let codes: Vec<ErrorCode> = out.metadata.processing_errors.iter().map(|e| e.code).collect();
    assert_eq!(codes, vec![ErrorCode::OutOfBounds, ErrorCode::ShelfNotFound]);
    assert_eq!(out.metadata.processing_errors[0].instance_id.as_deref(), Some("edge_h1_v0"));
}

#[test]
fn structural_problems_abort_the_projection() {
    let mut bad_type = gondola(600.0, None);
    bad_type.fixture_type = "spaceship".into();
    let err = processor().process(&PlanogramConfig::new(bad_type), &catalog()).unwrap_err();
    assert!(matches!(err, PlanoError::FixtureNotFound(_)));

    let mut bad_model = gondola(600.0, None);
    bad_model.placement_model = "hex-grid".into();
    let err = processor().process(&PlanogramConfig::new(bad_model), &catalog()).unwrap_err();
    assert!(matches!(err, PlanoError::PlacementModelNotFound(_)));
    assert!(err.is_structural());
}

#[test]
fn processing_is_idempotent() {
    let cfg = PlanogramConfig::new(gondola(600.0, None))
        .with_product(SourceProduct::new("a", "COLA", SemanticPosition::shelf(0.0, 0, 1)).with_facings(FacingConfig::new(2, 2)))
        .with_product(SourceProduct::new("b", "FLAKES", SemanticPosition::shelf(400.0, 1, 0)))
        .with_product(SourceProduct::new("c", "MISSING", SemanticPosition::shelf(800.0, 1, 0)));
    let p = processor();
    let first = p.process(&cfg, &catalog()).unwrap();
    let second = p.process(&cfg, &catalog()).unwrap();
    assert_eq!(first, second);
    assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
}

#[test]
fn shadows_follow_fixture_family() {
    let cfg = PlanogramConfig::new(gondola(600.0, None))
        .with_product(SourceProduct::new("floor", "COLA", SemanticPosition::shelf(0.0, 0, 0)))
        .with_product(SourceProduct::new("upper", "COLA", SemanticPosition::shelf(0.0, 1, 0)));
    let out = processor().process(&cfg, &catalog()).unwrap();
    assert!(!out.render_instances[0].shadow.enabled);
    assert!(out.render_instances[1].shadow.enabled);
    assert!(!out.render_instances[1].shadow.contact);

    let peg = FixtureConfig {
        fixture_type: "pegboard".into(),
        placement_model: PEGBOARD_GRID.into(),
        dimensions: Dims3D::new(1000.0, 1000.0, 100.0),
        config: FixtureLayout::default(),
    };
    let pos: SemanticPosition = serde_json::from_value(json!({ "model": "pegboard-grid", "holeX": 4, "holeY": 10 })).unwrap();
    let cfg = PlanogramConfig::new(peg).with_product(SourceProduct::new("hook", "COLA", pos));
    let out = processor().process(&cfg, &catalog()).unwrap();
    let hook = &out.render_instances[0];
    assert!(hook.shadow.enabled && hook.shadow.contact);
    assert_eq!(hook.shadow.profile.blur, 4.0);
    assert!((hook.world_position.x - 4.0 * 25.4).abs() < 1e-9);
}

#[test]
fn mask_deny_list_beats_transparency() {
    let cfg = PlanogramConfig::new(gondola(600.0, None))
        .with_product(SourceProduct::new("cola", "COLA", SemanticPosition::shelf(0.0, 0, 0)))
        .with_product(SourceProduct::new("flakes", "FLAKES", SemanticPosition::shelf(300.0, 0, 0)));
    let out = processor().process(&cfg, &catalog()).unwrap();
    let cola = &out.render_instances[0];
    assert!(cola.mask.required);
    assert_eq!(cola.mask.mask_type, Some(MaskType::Outline));
    assert!(!out.render_instances[1].mask.required);

    let open = PipelineConfig { mask_deny: vec![], ..PipelineConfig::default() };
    let p = PlanogramProcessor::with_config(Arc::new(PlacementModelRegistry::with_builtins()), open);
    let out = p.process(&cfg, &catalog()).unwrap();
    assert_eq!(out.render_instances[1].mask.mask_type, Some(MaskType::AlphaChannel));
}

#[test]
fn unusual_facings_warn_but_still_render() {
    let cfg = PlanogramConfig::new(gondola(600.0, None))
        .with_product(SourceProduct::new("wide", "COLA", SemanticPosition::shelf(0.0, 0, 0)).with_facings(FacingConfig::new(12, 1)));
    let out = processor().process(&cfg, &catalog()).unwrap();
    assert_eq!(out.render_instances.len(), 12);
    let w = &out.render_instances[0].validation;
    assert!(w.valid);
    assert_eq!(w.warnings[0].code, ErrorCode::UnusualFacings);
}

#[test]
fn runaway_facings_fail_only_their_product() {
    let cfg = PlanogramConfig::new(gondola(600.0, None))
        .with_product(SourceProduct::new("runaway", "COLA", SemanticPosition::shelf(0.0, 0, 0)).with_facings(FacingConfig::new(65_536, 65_536)))
        .with_product(SourceProduct::new("ok", "COLA", SemanticPosition::shelf(600.0, 0, 0)));
    let out = processor().process(&cfg, &catalog()).unwrap();
    assert_eq!(out.render_instances.len(), 1);
    assert_eq!(out.render_instances[0].source_product_id, "ok");
    assert_eq!(out.metadata.total_instances, 2);
    let e = &out.metadata.processing_errors[0];
    assert_eq!(out.metadata.processing_errors.len(), 1);
    assert_eq!((e.product_id.as_str(), e.stage.as_str(), e.code), ("runaway", "expand", ErrorCode::ExpansionLimit));
    assert_eq!(e.instance_id, None);

    // the limit is a knob; exactly at it still expands
    let tight = PipelineConfig { max_instances_per_product: 12, ..PipelineConfig::default() };
    let p = PlanogramProcessor::with_config(Arc::new(PlacementModelRegistry::with_builtins()), tight);
    let twelve = PlanogramConfig::new(gondola(600.0, None))
        .with_product(SourceProduct::new("wide", "COLA", SemanticPosition::shelf(0.0, 0, 0)).with_facings(FacingConfig::new(12, 1)))
        .with_product(SourceProduct::new("taller", "COLA", SemanticPosition::shelf(0.0, 1, 0)).with_facings(FacingConfig::new(13, 1)));
    let out = p.process(&twelve, &catalog()).unwrap();
    assert_eq!(out.render_instances.len(), 12);
    assert_eq!(out.metadata.processing_errors[0].product_id, "taller");
}
