//! The seven transform stages. `hydrate` runs once per source product (expansion
//! needs its dimensions); the remaining six run per expanded instance, in the order
//! returned by `default_stages`.

use plano_core::geometry::{clamp01, lerp};
use plano_core::{
    Bounds, ErrorCode, FixtureKind, MaskSpec, MaskType, MetadataMap, PlanoError, PlanoResult, RenderInstance,
    SemanticPosition, ShadowSpec, ShadowType, SourceProduct, ValidationResult, Vector2, Vector3, ZLayer,
    COLLISION_TOLERANCE_MM,
};
use plano_core::instance::{AssetRefs, DepthBucket};

use crate::stage::{Stage, StageContext};

/// Stage 1: merge catalog metadata into a fresh instance for `product`.
pub fn hydrate(product: &SourceProduct, metadata: &MetadataMap) -> PlanoResult<RenderInstance> {
    let meta = metadata.get(&product.sku).ok_or_else(|| PlanoError::MetadataMissing(product.sku.clone()))?;
    let mut inst = RenderInstance::template(product.id.clone(), product.sku.clone(), product.placement.position.clone());
    inst.category = meta.classification.category.clone();
    inst.physical = meta.dimensions.physical;
    inst.visual = meta.dimensions.visual;
    let vp = &meta.visual_properties;
    inst.assets = AssetRefs {
        sprite_url: vp.primary_sprite().map(|s| s.url.clone()),
        mask_url: vp.mask_url.clone(),
        has_transparency: vp.has_transparency.unwrap_or(false),
    };
    inst.shadow_type = vp.shadow_type;
    let promo = |p: &plano_core::model::Pricing| p.promotional_price.is_some();
    inst.promotional = match &product.pricing {
        Some(p) => promo(p),
        None => meta.pricing.as_ref().map(promo).unwrap_or(false),
    };
    inst.facings = product.placement.facings;
    inst.pyramid = product.placement.pyramid.clone();
    Ok(inst)
}

pub fn default_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(PerspectiveStage),
        Box::new(ZLayerStage),
        Box::new(PositionStage),
        Box::new(ShadowStage),
        Box::new(MaskStage),
        Box::new(ValidateStage),
    ]
}

/// Stage 2: depth ratio and the linear front-100% / back-`back_row_scale` rule.
pub struct PerspectiveStage;

impl PerspectiveStage {
    pub fn physical_z(inst: &RenderInstance) -> f64 {
        match inst.semantic.absolute_z() {
            Some(z) => z + inst.expansion_offset.z,
            None => f64::from(inst.semantic.depth_row()) * inst.physical.depth + inst.expansion_offset.z,
        }
    }
}

impl Stage for PerspectiveStage {
    fn name(&self) -> &'static str { "perspective" }

    fn apply(&self, inst: &mut RenderInstance, ctx: &StageContext<'_>) -> PlanoResult<()> {
        let max_depth = ctx.fixture.dimensions.depth;
        let ratio = if max_depth > 0.0 { clamp01(Self::physical_z(inst) / max_depth) } else { 0.0 };
        inst.depth_ratio = ratio;
        inst.render_scale = lerp(1.0, ctx.config.back_row_scale, ratio);
        inst.scaled_dimensions = inst.physical.scaled(inst.render_scale);
        inst.depth_bucket = DepthBucket::for_ratio(ratio);
        Ok(())
    }
}

/// Stage 3: paint order. Higher shelves and front rows draw later.
pub struct ZLayerStage;

impl Stage for ZLayerStage {
    fn name(&self) -> &'static str { "z-layer" }

    fn apply(&self, inst: &mut RenderInstance, ctx: &StageContext<'_>) -> PlanoResult<()> {
        let c = ctx.config;
        let layer = ZLayer {
            shelf: i64::from(inst.semantic.shelf_index().unwrap_or(0)) * c.shelf_z_stride,
            depth: ((1.0 - inst.depth_ratio) * c.depth_z_range as f64).floor() as i64,
            promotion: if inst.promotional { c.promo_z_boost } else { 0 },
        };
        inst.z_layer = layer;
        inst.z_index = layer.total();
        Ok(())
    }
}

/// Stage 4: world placement through the fixture's model, recentred on the anchor.
pub struct PositionStage;

impl Stage for PositionStage {
    fn name(&self) -> &'static str { "position" }

    fn apply(&self, inst: &mut RenderInstance, ctx: &StageContext<'_>) -> PlanoResult<()> {
        let anchor = inst.visual.anchor;
        let raw = ctx.model.transform(&inst.semantic, ctx.fixture, &inst.physical, anchor, Some(inst.expansion_offset))?;
        let (phys, scaled) = (inst.physical, inst.scaled_dimensions);
        // anchor y is image-space (down), world y is up
        let dx = (phys.width - scaled.width) * anchor.x;
        let dy = (phys.height - scaled.height) * (1.0 - anchor.y);
        let world = Vector3::new(raw.x + dx, raw.y + dy, raw.z);
        inst.world_position = world;
        inst.render_bounds = Bounds::new(world.x, world.y, scaled.width, scaled.height);
        inst.baseline_point = Vector2::new(world.x + scaled.width * anchor.x, world.y);
        inst.collision_bounds = Bounds::new(raw.x, raw.y, phys.width, phys.height);
        Ok(())
    }
}

/// Stage 5: shadow profile per fixture family.
pub struct ShadowStage;

impl Stage for ShadowStage {
    fn name(&self) -> &'static str { "shadow" }

    fn apply(&self, inst: &mut RenderInstance, ctx: &StageContext<'_>) -> PlanoResult<()> {
        let mut enabled = inst.shadow_type != Some(ShadowType::None);
        let mut contact = inst.shadow_type == Some(ShadowType::Contact);
        let on_bottom = inst.semantic.shelf_index().is_some() && inst.semantic.shelf_index() == ctx.bottom_shelf;
        if ctx.kind.is_floor_standing() && on_bottom {
            enabled = false;
        }
        if ctx.kind == FixtureKind::Pegboard {
            enabled = true;
            contact = true;
        }
        inst.shadow = ShadowSpec { enabled, contact, profile: ctx.config.shadows.for_kind(ctx.kind).clone() };
        Ok(())
    }
}

/// Stage 6: alpha-mask decision from category lists and transparency.
pub struct MaskStage;

impl Stage for MaskStage {
    fn name(&self) -> &'static str { "mask" }

    fn apply(&self, inst: &mut RenderInstance, ctx: &StageContext<'_>) -> PlanoResult<()> {
        let listed = |list: &[String]| list.iter().any(|c| c.eq_ignore_ascii_case(&inst.category));
        let denied = listed(&ctx.config.mask_deny);
        let required = !denied && (listed(&ctx.config.mask_allow) || inst.assets.has_transparency);
        inst.mask = if !required {
            MaskSpec::default()
        } else {
            let mask_type = if inst.assets.has_transparency {
                MaskType::AlphaChannel
            } else if inst.assets.mask_url.is_some() {
                MaskType::Silhouette
            } else {
                MaskType::Outline
            };
            MaskSpec { required: true, mask_type: Some(mask_type), url: inst.assets.mask_url.clone() }
        };
        Ok(())
    }
}

/// Stage 7: physical validity. Hard errors exclude the instance; warnings ride along.
pub struct ValidateStage;

impl Stage for ValidateStage {
    fn name(&self) -> &'static str { "validate" }

    fn apply(&self, inst: &mut RenderInstance, ctx: &StageContext<'_>) -> PlanoResult<()> {
        let dims = ctx.fixture.dimensions;
        let c = ctx.config;
        let mut v = ValidationResult::ok();

        let z = inst.world_position.z;
        let in_plane = inst.collision_bounds.within(dims.width, dims.height, COLLISION_TOLERANCE_MM);
        let in_depth = z >= -COLLISION_TOLERANCE_MM && z <= dims.depth + COLLISION_TOLERANCE_MM;
        if !in_plane || !in_depth {
            let b = inst.collision_bounds;
            v.push_error(
                ErrorCode::OutOfBounds,
                format!(
                    "{} spans x {:.1}..{:.1}, y {:.1}..{:.1}, z {:.1} outside fixture {}x{}x{}",
                    inst.id, b.x, b.right(), b.y, b.top(), z, dims.width, dims.height, dims.depth
                ),
            );
        }

        match &inst.semantic {
            SemanticPosition::ShelfSurface(p) => {
                if ctx.fixture.shelf(p.shelf_index).is_none() {
                    v.push_error(ErrorCode::ShelfNotFound, format!("shelf {} does not exist on fixture", p.shelf_index));
                }
            }
            _ => {
                let y = inst.world_position.y;
                if !v.has_error(ErrorCode::OutOfBounds) && (y < -COLLISION_TOLERANCE_MM || y > dims.height + COLLISION_TOLERANCE_MM) {
                    v.push_error(ErrorCode::OutOfBounds, format!("{} sits at y {:.1} outside fixture height {}", inst.id, y, dims.height));
                }
            }
        }

        if let Some(f) = inst.facings {
            let h_ok = (1..=c.max_horizontal_facings).contains(&f.horizontal);
            let v_ok = (1..=c.max_vertical_facings).contains(&f.vertical);
            if !h_ok || !v_ok {
                v.push_warning(
                    ErrorCode::UnusualFacings,
                    format!("{}x{} facings outside 1..={}x1..={}", f.horizontal, f.vertical, c.max_horizontal_facings, c.max_vertical_facings),
                );
            }
        }

        if inst.render_scale < c.min_render_scale || inst.render_scale > c.max_render_scale {
            v.push_warning(ErrorCode::ExtremeScale, format!("render scale {:.3} outside {}..={}", inst.render_scale, c.min_render_scale, c.max_render_scale));
        }

        if inst.assets.is_empty() {
            v.push_error(ErrorCode::AssetMissing, format!("sku {} has no sprite or mask asset", inst.sku));
        }

        inst.validation = v;
        Ok(())
    }
}
