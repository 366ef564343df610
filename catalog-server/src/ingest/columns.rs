//! Column classification
//!
//! The header is classified once per file. Every distinct header name ends
//! up in exactly one bucket: ignored (required or reserved), region, or
//! characteristic.

use super::IngestError;
use super::lookup::RegionIndex;
use std::collections::{HashMap, HashSet};

/// Header names with fixed meaning for one upload type
#[derive(Debug, Clone, Default)]
pub struct ColumnSpec {
    pub required: Vec<String>,
    pub reserved: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Ignored,
    Region,
    Characteristic,
}

/// A header name bound to its column position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedColumn {
    pub name: String,
    pub index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ColumnRoles {
    /// Position of every required or reserved column present in the header
    positions: HashMap<String, usize>,
    pub ignored: Vec<String>,
    pub regions: Vec<NamedColumn>,
    pub characteristics: Vec<NamedColumn>,
}

impl ColumnRoles {
    /// Column index of a required or reserved name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn role_of(&self, name: &str) -> Option<ColumnRole> {
        if self.ignored.iter().any(|n| n == name) {
            Some(ColumnRole::Ignored)
        } else if self.regions.iter().any(|c| c.name == name) {
            Some(ColumnRole::Region)
        } else if self.characteristics.iter().any(|c| c.name == name) {
            Some(ColumnRole::Characteristic)
        } else {
            None
        }
    }
}

/// Partition `header` against `spec` and the known regions
///
/// Duplicate header names keep their first position. Empty names are
/// ignored.
pub fn classify(
    header: &[String],
    spec: &ColumnSpec,
    regions: &RegionIndex,
) -> Result<ColumnRoles, IngestError> {
    let mut roles = ColumnRoles::default();
    let mut seen = HashSet::new();

    for (index, name) in header.iter().enumerate() {
        if !seen.insert(name.as_str()) {
            continue;
        }
        if name.is_empty() {
            roles.ignored.push(String::new());
            continue;
        }
        if spec.required.contains(name) || spec.reserved.contains(name) {
            roles.positions.insert(name.clone(), index);
            roles.ignored.push(name.clone());
        } else if regions.contains(name) {
            roles.regions.push(NamedColumn {
                name: name.clone(),
                index,
            });
        } else {
            roles.characteristics.push(NamedColumn {
                name: name.clone(),
                index,
            });
        }
    }

    if let Some(missing) = spec
        .required
        .iter()
        .find(|name| !roles.positions.contains_key(name.as_str()))
    {
        return Err(IngestError::MissingRequiredColumn(missing.clone()));
    }

    tracing::debug!(
        regions = roles.regions.len(),
        characteristics = roles.characteristics.len(),
        ignored = roles.ignored.len(),
        "Header classified"
    );
    Ok(roles)
}
