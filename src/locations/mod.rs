/*!
 * # Administrative Location Hierarchy
 *
 * Static reference data for the five-level administrative tree
 * (division → district → upazila → union → village). The tree is seeded
 * once at startup and read-only afterwards; every lookup the access layer
 * needs (anchor level, ancestor chains, child listings) is served from the
 * in-memory store built here.
 */

use std::collections::HashMap;
use std::str::FromStr;

use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use thiserror::Error;
use tracing::info;
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::entities::location;

/// The five administrative levels, broadest first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LocationLevel {
    Division,
    District,
    Upazila,
    Union,
    Village,
}

impl LocationLevel {
    /// The level one step up the tree, `None` for divisions.
    pub fn parent(self) -> Option<LocationLevel> {
        match self {
            LocationLevel::Division => None,
            LocationLevel::District => Some(LocationLevel::Division),
            LocationLevel::Upazila => Some(LocationLevel::District),
            LocationLevel::Union => Some(LocationLevel::Upazila),
            LocationLevel::Village => Some(LocationLevel::Union),
        }
    }

    /// Zero-based depth: division = 0, village = 4.
    pub fn depth(self) -> usize {
        match self {
            LocationLevel::Division => 0,
            LocationLevel::District => 1,
            LocationLevel::Upazila => 2,
            LocationLevel::Union => 3,
            LocationLevel::Village => 4,
        }
    }
}

/// One node of the administrative tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LocationNode {
    pub id: String,
    pub name: String,
    /// Bengali display name.
    pub bn_name: String,
    pub level: LocationLevel,
    pub parent_id: Option<String>,
}

/// A complete five-id ancestor tuple, as carried by every voter record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LocationPath {
    pub division_id: String,
    pub district_id: String,
    pub upazila_id: String,
    pub union_id: String,
    pub village_id: String,
}

impl LocationPath {
    pub fn id_at(&self, level: LocationLevel) -> &str {
        match level {
            LocationLevel::Division => &self.division_id,
            LocationLevel::District => &self.district_id,
            LocationLevel::Upazila => &self.upazila_id,
            LocationLevel::Union => &self.union_id,
            LocationLevel::Village => &self.village_id,
        }
    }
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("unknown location id '{id}'")]
    UnknownNode { id: String },

    #[error("location '{id}' is a {actual}, expected a {expected}")]
    WrongLevel {
        id: String,
        expected: LocationLevel,
        actual: LocationLevel,
    },

    #[error("location '{child}' is not inside '{parent}'")]
    BrokenChain { child: String, parent: String },

    #[error("invalid reference data: {0}")]
    InvalidReferenceData(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Read-only store over the seeded location tree.
///
/// Construction validates the whole tree; an inconsistent seed is a
/// deployment error and refuses to start rather than producing wrong
/// scoping decisions later.
#[derive(Debug, Default)]
pub struct LocationStore {
    nodes: HashMap<String, LocationNode>,
    children: HashMap<String, Vec<String>>,
    roots: Vec<String>,
}

impl LocationStore {
    /// Build a store from raw nodes, validating the tree invariants:
    /// every non-division parent exists exactly one level up, divisions
    /// have no parent, and ids are unique.
    pub fn from_nodes(raw: Vec<LocationNode>) -> Result<Self, LocationError> {
        let mut nodes: HashMap<String, LocationNode> = HashMap::with_capacity(raw.len());
        for node in raw {
            if nodes.insert(node.id.clone(), node.clone()).is_some() {
                return Err(LocationError::InvalidReferenceData(format!(
                    "duplicate location id '{}'",
                    node.id
                )));
            }
        }

        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        let mut roots = Vec::new();

        for node in nodes.values() {
            match (&node.parent_id, node.level.parent()) {
                (None, None) => roots.push(node.id.clone()),
                (None, Some(_)) => {
                    return Err(LocationError::InvalidReferenceData(format!(
                        "{} '{}' has no parent",
                        node.level, node.id
                    )));
                }
                (Some(_), None) => {
                    return Err(LocationError::InvalidReferenceData(format!(
                        "division '{}' must not have a parent",
                        node.id
                    )));
                }
                (Some(parent_id), Some(expected_level)) => {
                    let parent = nodes.get(parent_id).ok_or_else(|| {
                        LocationError::InvalidReferenceData(format!(
                            "{} '{}' references missing parent '{}'",
                            node.level, node.id, parent_id
                        ))
                    })?;
                    if parent.level != expected_level {
                        return Err(LocationError::InvalidReferenceData(format!(
                            "{} '{}' has parent '{}' at level {}, expected {}",
                            node.level, node.id, parent_id, parent.level, expected_level
                        )));
                    }
                    children
                        .entry(parent_id.clone())
                        .or_default()
                        .push(node.id.clone());
                }
            }
        }

        roots.sort();
        for list in children.values_mut() {
            list.sort();
        }

        Ok(Self {
            nodes,
            children,
            roots,
        })
    }

    /// Load the full location reference table and build the store.
    pub async fn load(db: &DbPool) -> Result<Self, LocationError> {
        let rows = location::Entity::find().all(db).await?;
        let nodes = rows
            .into_iter()
            .map(|row| {
                let level = LocationLevel::from_str(&row.level).map_err(|_| {
                    LocationError::InvalidReferenceData(format!(
                        "location '{}' has unknown level '{}'",
                        row.id, row.level
                    ))
                })?;
                Ok(LocationNode {
                    id: row.id,
                    name: row.name,
                    bn_name: row.bn_name,
                    level,
                    parent_id: row.parent_id,
                })
            })
            .collect::<Result<Vec<_>, LocationError>>()?;

        let store = Self::from_nodes(nodes)?;
        info!(
            nodes = store.nodes.len(),
            divisions = store.roots.len(),
            "location hierarchy loaded"
        );
        Ok(store)
    }

    pub fn node(&self, id: &str) -> Option<&LocationNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All divisions, sorted by id.
    pub fn divisions(&self) -> Vec<&LocationNode> {
        self.roots
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    /// Direct children of a node, sorted by id.
    pub fn children(&self, parent_id: &str) -> Vec<&LocationNode> {
        self.children
            .get(parent_id)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Ancestor chain of a node, broadest first, excluding the node itself.
    pub fn ancestors(&self, id: &str) -> Result<Vec<&LocationNode>, LocationError> {
        let mut node = self
            .nodes
            .get(id)
            .ok_or_else(|| LocationError::UnknownNode { id: id.to_string() })?;

        let mut chain = Vec::with_capacity(node.level.depth());
        while let Some(parent_id) = &node.parent_id {
            // Parent existence was proven at construction time.
            let parent = self
                .nodes
                .get(parent_id)
                .ok_or_else(|| LocationError::UnknownNode {
                    id: parent_id.clone(),
                })?;
            chain.push(parent);
            node = parent;
        }
        chain.reverse();
        Ok(chain)
    }

    fn expect_level(&self, id: &str, level: LocationLevel) -> Result<&LocationNode, LocationError> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| LocationError::UnknownNode { id: id.to_string() })?;
        if node.level != level {
            return Err(LocationError::WrongLevel {
                id: id.to_string(),
                expected: level,
                actual: node.level,
            });
        }
        Ok(node)
    }

    /// Verify a full five-id tuple: every id exists at its level and each
    /// node's parent is the id named one level up. Enforced at voter write
    /// time so records can never carry a tuple the tree does not contain.
    pub fn verify_path(&self, path: &LocationPath) -> Result<(), LocationError> {
        let mut expected_parent: Option<&str> = None;
        for level in LocationLevel::iter() {
            let id = path.id_at(level);
            let node = self.expect_level(id, level)?;
            if node.parent_id.as_deref() != expected_parent {
                return Err(LocationError::BrokenChain {
                    child: id.to_string(),
                    parent: expected_parent.unwrap_or("<root>").to_string(),
                });
            }
            expected_parent = Some(id);
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::test_fixtures::{sample_nodes, sample_store};
    use super::*;

    #[test]
    fn builds_valid_tree() {
        let store = sample_store();
        assert_eq!(store.len(), 10);
        assert_eq!(store.divisions().len(), 2);
        assert_eq!(store.children("t1")[0].id, "u1");
    }

    #[test]
    fn rejects_missing_parent() {
        let mut nodes = sample_nodes();
        nodes.push(LocationNode {
            id: "v9".into(),
            name: "V9".into(),
            bn_name: "bn-v9".into(),
            level: LocationLevel::Village,
            parent_id: Some("n-missing".into()),
        });
        assert!(LocationStore::from_nodes(nodes).is_err());
    }

    #[test]
    fn rejects_parent_at_wrong_level() {
        let mut nodes = sample_nodes();
        // A village parented directly by a district skips the union level.
        nodes.push(LocationNode {
            id: "v9".into(),
            name: "V9".into(),
            bn_name: "bn-v9".into(),
            level: LocationLevel::Village,
            parent_id: Some("t1".into()),
        });
        assert!(LocationStore::from_nodes(nodes).is_err());
    }

    #[test]
    fn rejects_parented_division() {
        let mut nodes = sample_nodes();
        nodes.push(LocationNode {
            id: "d9".into(),
            name: "D9".into(),
            bn_name: "bn-d9".into(),
            level: LocationLevel::Division,
            parent_id: Some("d1".into()),
        });
        assert!(LocationStore::from_nodes(nodes).is_err());
    }

    #[test]
    fn ancestors_are_broadest_first() {
        let store = sample_store();
        let chain: Vec<&str> = store
            .ancestors("v1")
            .unwrap()
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(chain, vec!["d1", "t1", "u1", "n1"]);
    }

    #[test]
    fn verify_path_accepts_consistent_tuple() {
        let store = sample_store();
        let path = LocationPath {
            division_id: "d1".into(),
            district_id: "t1".into(),
            upazila_id: "u1".into(),
            union_id: "n1".into(),
            village_id: "v1".into(),
        };
        assert!(store.verify_path(&path).is_ok());
    }

    #[test]
    fn verify_path_rejects_cross_branch_tuple() {
        let store = sample_store();
        // Village v2 does not live under union n1.
        let path = LocationPath {
            division_id: "d1".into(),
            district_id: "t1".into(),
            upazila_id: "u1".into(),
            union_id: "n1".into(),
            village_id: "v2".into(),
        };
        assert!(matches!(
            store.verify_path(&path),
            Err(LocationError::BrokenChain { .. })
        ));
    }
}
