//! Instance expansion: one semantic placement becomes N physical copies.
//!
//! Pyramids win over facings. Output order is deterministic: facings are emitted
//! row-major by horizontal index then vertical index, pyramids layer by layer.

use plano_core::model::PyramidAlignment;
use plano_core::{PyramidConfig, RenderInstance, Vector3};

/// Preallocation ceiling; callers bound the real count with `instance_count`.
const PREALLOC_CAP: u64 = 1024;

/// How many instances `expand` would emit, without building them.
pub fn instance_count(template: &RenderInstance) -> u64 {
    if let Some(p) = &template.pyramid {
        let base_h = u64::from(p.base_facings.h.max(1));
        let base_v = u64::from(p.base_facings.v.max(1));
        let (dec, inc) = (u64::from(p.horizontal_decrement), u64::from(p.vertical_increment));
        return (0..u64::from(p.layers.max(1))).fold(0u64, |acc, layer| {
            let wide = base_h.saturating_sub(layer.saturating_mul(dec)).max(1);
            let high = base_v.saturating_add(layer.saturating_mul(inc));
            acc.saturating_add(wide.saturating_mul(high))
        });
    }
    match template.facings {
        Some(f) => {
            let f = f.clamped();
            u64::from(f.horizontal).saturating_mul(u64::from(f.vertical))
        }
        None => 1,
    }
}

fn capacity(template: &RenderInstance) -> usize { instance_count(template).min(PREALLOC_CAP) as usize }

pub fn expand(template: &RenderInstance) -> Vec<RenderInstance> {
    if let Some(pyramid) = &template.pyramid {
        return expand_pyramid(template, pyramid);
    }
    match template.facings {
        Some(f) => {
            let f = f.clamped();
            let (w, h) = (template.physical.width, template.physical.height);
            let mut out = Vec::with_capacity(capacity(template));
            for hi in 0..f.horizontal {
                for vi in 0..f.vertical {
                    out.push(copy(
                        template,
                        format!("{}_h{}_v{}", template.id, hi, vi),
                        Vector3::new(f64::from(hi) * w, f64::from(vi) * h, 0.0),
                    ));
                }
            }
            out
        }
        None => vec![copy(template, template.id.clone(), Vector3::ZERO)],
    }
}

fn expand_pyramid(template: &RenderInstance, p: &PyramidConfig) -> Vec<RenderInstance> {
    let (w, h) = (template.physical.width, template.physical.height);
    let layers = p.layers.max(1);
    let base_h = p.base_facings.h.max(1);
    let base_v = p.base_facings.v.max(1);
    let base_width = f64::from(base_h) * w;
    let gap = p.vertical_gap.unwrap_or(0.0);
    let shift = p.depth_shift.unwrap_or(0.0);

    let mut out = Vec::with_capacity(capacity(template));
    let mut current_y = 0.0;
    for layer in 0..layers {
        let items_wide = base_h.saturating_sub(layer.saturating_mul(p.horizontal_decrement)).max(1);
        let items_high = base_v.saturating_add(layer.saturating_mul(p.vertical_increment)).max(1);
        let layer_width = f64::from(items_wide) * w;
        let start_x = match p.alignment {
            PyramidAlignment::Left => 0.0,
            PyramidAlignment::Right => base_width - layer_width,
            PyramidAlignment::Center => (base_width - layer_width) / 2.0,
        };
        let z = f64::from(layer) * shift;
        for i in 0..items_wide {
            for j in 0..items_high {
                out.push(copy(
                    template,
                    format!("{}_l{}_h{}_v{}", template.id, layer, i, j),
                    Vector3::new(start_x + f64::from(i) * w, current_y + f64::from(j) * h, z),
                ));
            }
        }
        current_y += f64::from(items_high) * h + gap;
    }
    out
}

fn copy(template: &RenderInstance, id: String, offset: Vector3) -> RenderInstance {
    let mut inst = template.clone();
    inst.id = id;
    inst.expansion_offset = offset;
    inst
}
