//! Category Model

use serde::{Deserialize, Serialize};

/// Category node stored as a nested set
///
/// `lft`/`rght` bracket every descendant of the node inside its `tree_id`.
/// `level` is the depth (roots are 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
    pub is_visible: bool,
    pub sort_order: i64,
    pub lft: i64,
    pub rght: i64,
    pub tree_id: i64,
    pub level: i64,
    pub created_at: i64,
}

impl Category {
    /// True when `other` lies strictly inside this node's interval.
    pub fn contains(&self, other: &Category) -> bool {
        self.tree_id == other.tree_id && self.lft < other.lft && other.rght < self.rght
    }
}

/// Insert payload for a new category node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCreate {
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
    pub lft: i64,
    pub rght: i64,
    pub tree_id: i64,
    pub level: i64,
}
