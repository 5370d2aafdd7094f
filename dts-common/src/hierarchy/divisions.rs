//! Geographic divisions as a hierarchy, and GeoJSON output of roll-ups

use super::{AggregationNode, Hierarchy, HierarchyNode};
use crate::db::divisions::Division;
use crate::HeResult;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

pub fn division_nodes(divisions: &[Division]) -> Vec<HierarchyNode> {
    divisions
        .iter()
        .map(|d| HierarchyNode {
            id: d.id.clone(),
            parent_id: d.parent_id.clone(),
            name: d.name.clone(),
        })
        .collect()
}

pub fn division_hierarchy(divisions: &[Division]) -> HeResult<Hierarchy> {
    Hierarchy::build(division_nodes(divisions))
}

/// GeoJSON `FeatureCollection` with one feature per division
///
/// Divisions without geometry get `"geometry": null`, which GeoJSON allows.
pub fn rollup_feature_collection<V: Serialize>(
    divisions: &[Division],
    rollup: &[AggregationNode<V>],
) -> Value {
    let by_id: HashMap<&str, &AggregationNode<V>> = rollup.iter().map(|n| (n.id.as_str(), n)).collect();

    let features: Vec<Value> = divisions
        .iter()
        .filter_map(|d| {
            let node = by_id.get(d.id.as_str())?;
            let mut properties = Map::new();
            properties.insert("id".into(), json!(d.id));
            properties.insert("parentId".into(), json!(d.parent_id));
            properties.insert("name".into(), json!(d.name));
            properties.insert("level".into(), json!(d.level));
            properties.insert("ownValue".into(), json!(node.own_value));
            properties.insert("rolledUpValue".into(), json!(node.rolled_up_value));

            Some(json!({
                "type": "Feature",
                "id": d.id,
                "geometry": d.geometry.clone().unwrap_or(Value::Null),
                "properties": properties,
            }))
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn division(id: &str, parent: Option<&str>, geometry: Option<Value>) -> Division {
        Division {
            id: id.into(),
            parent_id: parent.map(str::to_string),
            name: id.to_uppercase(),
            level: if parent.is_some() { 2 } else { 1 },
            geometry,
        }
    }

    #[test]
    fn test_feature_collection_carries_values() {
        let divisions = vec![
            division("p", None, Some(json!({"type": "Point", "coordinates": [0.0, 0.0]}))),
            division("c", Some("p"), None),
        ];
        let hierarchy = division_hierarchy(&divisions).unwrap();
        let rollup = hierarchy.rollup(|n| if n.id == "c" { Some(2.5) } else { Some(1.0) });

        let fc = rollup_feature_collection(&divisions, &rollup);
        assert_eq!(fc["type"], "FeatureCollection");
        let features = fc["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["properties"]["rolledUpValue"], 3.5);
        assert_eq!(features[0]["geometry"]["type"], "Point");
        assert!(features[1]["geometry"].is_null());
        assert_eq!(features[1]["properties"]["parentId"], "p");
    }
}
