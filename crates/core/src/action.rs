//! Planogram intent log. Actions are the durable wire format; applying them through
//! the reducer is the only way a configuration changes.

use serde::{Deserialize, Serialize};

use crate::geometry::Dims3D;
use crate::model::{FacingConfig, SemanticPosition, ShelfConfig, SourceProduct};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanogramAction {
    ProductAdd {
        product: SourceProduct,
    },
    #[serde(rename_all = "camelCase")]
    ProductRemove {
        product_id: String,
    },
    #[serde(rename_all = "camelCase")]
    ProductMove {
        product_id: String,
        to: SemanticPosition,
    },
    #[serde(rename_all = "camelCase")]
    ProductUpdateFacings {
        product_id: String,
        facings: FacingConfig,
    },
    FixtureUpdate {
        changes: FixtureChanges,
    },
    ShelfAdd {
        shelf: ShelfConfig,
    },
    #[serde(rename_all = "camelCase")]
    ShelfRemove {
        shelf_id: String,
    },
    #[serde(rename_all = "camelCase")]
    ShelfUpdate {
        shelf_id: String,
        changes: ShelfChanges,
    },
    Batch {
        actions: Vec<PlanogramAction>,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureChanges {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub fixture_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dims3D>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_spacing: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_height: Option<f64>,
}

impl PlanogramAction {
    pub fn kind(&self) -> &'static str {
        match self {
            PlanogramAction::ProductAdd { .. } => "PRODUCT_ADD",
            PlanogramAction::ProductRemove { .. } => "PRODUCT_REMOVE",
            PlanogramAction::ProductMove { .. } => "PRODUCT_MOVE",
            PlanogramAction::ProductUpdateFacings { .. } => "PRODUCT_UPDATE_FACINGS",
            PlanogramAction::FixtureUpdate { .. } => "FIXTURE_UPDATE",
            PlanogramAction::ShelfAdd { .. } => "SHELF_ADD",
            PlanogramAction::ShelfRemove { .. } => "SHELF_REMOVE",
            PlanogramAction::ShelfUpdate { .. } => "SHELF_UPDATE",
            PlanogramAction::Batch { .. } => "BATCH",
        }
    }

    /// Leaf actions in application order, with nested batches flattened.
    pub fn flatten(&self) -> Vec<&PlanogramAction> {
        let mut out = Vec::new();
        fn walk<'a>(a: &'a PlanogramAction, out: &mut Vec<&'a PlanogramAction>) {
            match a {
                PlanogramAction::Batch { actions } => actions.iter().for_each(|x| walk(x, out)),
                leaf => out.push(leaf),
            }
        }
        walk(self, &mut out);
        out
    }
}
