//! HIP taxonomy as a hierarchy
//!
//! Type, cluster and hazard ids come from different tables and may collide,
//! so node ids are namespaced: `type:ID`, `cluster:ID`, `hazard:ID`.

use super::{Hierarchy, HierarchyNode};
use crate::db::hip::HipTaxonomy;
use crate::HeResult;

pub fn type_node_id(id: &str) -> String {
    format!("type:{}", id)
}

pub fn cluster_node_id(id: &str) -> String {
    format!("cluster:{}", id)
}

pub fn hazard_node_id(id: &str) -> String {
    format!("hazard:{}", id)
}

/// Flatten the three levels into hierarchy nodes
pub fn hip_nodes(taxonomy: &HipTaxonomy) -> Vec<HierarchyNode> {
    let types = taxonomy.types.iter().map(|t| HierarchyNode {
        id: type_node_id(&t.id),
        parent_id: None,
        name: t.name.clone(),
    });
    let clusters = taxonomy.clusters.iter().map(|c| HierarchyNode {
        id: cluster_node_id(&c.id),
        parent_id: Some(type_node_id(&c.type_id)),
        name: c.name.clone(),
    });
    let hazards = taxonomy.hazards.iter().map(|h| HierarchyNode {
        id: hazard_node_id(&h.id),
        parent_id: Some(cluster_node_id(&h.cluster_id)),
        name: h.name.clone(),
    });

    types.chain(clusters).chain(hazards).collect()
}

/// Validated HIP hierarchy
pub fn hip_hierarchy(taxonomy: &HipTaxonomy) -> HeResult<Hierarchy> {
    Hierarchy::build(hip_nodes(taxonomy))
}
