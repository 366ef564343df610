//! Ingestion settings

use crate::ingest::columns::ColumnSpec;
use std::str::FromStr;

/// Where characteristic identity lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharacteristicScope {
    /// One characteristic per (name, leaf category)
    #[default]
    PerCategory,
    /// One characteristic per name across the catalog
    Global,
}

impl FromStr for CharacteristicScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_category" | "category" => Ok(CharacteristicScope::PerCategory),
            "global" => Ok(CharacteristicScope::Global),
            other => Err(format!("unknown characteristic scope: {other}")),
        }
    }
}

/// What a complete products run does to products its file never named
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingItemsAction {
    #[default]
    Ignore,
    SetNotInStock,
    Delete,
}

impl FromStr for MissingItemsAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(MissingItemsAction::Ignore),
            "set_not_in_stock" => Ok(MissingItemsAction::SetNotInStock),
            "delete" => Ok(MissingItemsAction::Delete),
            other => Err(format!("unknown items-not-in-file action: {other}")),
        }
    }
}

/// Header names the engine understands
#[derive(Debug, Clone)]
pub struct ColumnNames {
    pub article: String,
    pub categories: String,
    pub title: String,
    pub description: String,
    pub priority: String,
    pub images: String,
    pub group: String,
    pub brand: String,
    pub in_stock: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            article: "SKU".into(),
            categories: "CATEGORIES".into(),
            title: "TITLE".into(),
            description: "DESCRIPTION".into(),
            priority: "PRIORITY".into(),
            images: "IMAGES".into(),
            group: "GROUP".into(),
            brand: "BRAND".into(),
            in_stock: "IN_STOCK".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub columns: ColumnNames,
    /// Extra header names that are never characteristics or regions
    pub extra_reserved: Vec<String>,
    /// Separator between category path segments, root first
    pub category_delimiter: String,
    pub group_delimiter: char,
    /// Field delimiter for text sources; sniffed from the header when unset
    pub csv_delimiter: Option<u8>,
    /// Nested-set tree shared by every root category
    pub tree_id: i64,
    pub characteristic_scope: CharacteristicScope,
    pub default_priority: i64,
    pub default_title: String,
    pub default_description: String,
    /// Delete the stored price when a region cell is empty
    pub clear_price_if_empty: bool,
    pub items_not_in_file_action: MissingItemsAction,
    /// Column holding the brand name in BRANDS uploads
    pub brand_name_column: String,
    pub brand_order_column: String,
}

impl IngestSettings {
    /// Required and reserved header names for product files
    pub fn product_columns(&self) -> ColumnSpec {
        let c = &self.columns;
        let mut reserved = vec![
            c.title.clone(),
            c.description.clone(),
            c.priority.clone(),
            c.images.clone(),
            c.group.clone(),
            c.brand.clone(),
            c.in_stock.clone(),
        ];
        reserved.extend(self.extra_reserved.iter().cloned());
        ColumnSpec {
            required: vec![c.article.clone(), c.categories.clone()],
            reserved,
        }
    }

    /// Required and reserved header names for brand files
    pub fn brand_columns(&self) -> ColumnSpec {
        ColumnSpec {
            required: vec![self.brand_name_column.clone()],
            reserved: vec![self.brand_order_column.clone()],
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            extra_reserved: vec!["CHARACTERISTIC".into()],
            category_delimiter: " | ".into(),
            group_delimiter: ',',
            csv_delimiter: None,
            tree_id: 1,
            characteristic_scope: CharacteristicScope::PerCategory,
            default_priority: 500,
            default_title: "TITLE".into(),
            default_description: "No description".into(),
            clear_price_if_empty: false,
            items_not_in_file_action: MissingItemsAction::Ignore,
            brand_name_column: "NAME".into(),
            brand_order_column: "ORDER".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_columns() {
        let spec = IngestSettings::default().product_columns();
        assert_eq!(spec.required, vec!["SKU".to_string(), "CATEGORIES".to_string()]);
        assert!(spec.reserved.contains(&"IMAGES".to_string()));
        assert!(spec.reserved.contains(&"CHARACTERISTIC".to_string()));
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!("global".parse(), Ok(CharacteristicScope::Global));
        assert_eq!("PER_CATEGORY".parse(), Ok(CharacteristicScope::PerCategory));
        assert!("tenant".parse::<CharacteristicScope>().is_err());
    }

    #[test]
    fn test_missing_items_action_parse() {
        assert_eq!("SET_NOT_IN_STOCK".parse(), Ok(MissingItemsAction::SetNotInStock));
        assert_eq!(" delete ".parse(), Ok(MissingItemsAction::Delete));
        assert_eq!(MissingItemsAction::default(), MissingItemsAction::Ignore);
        assert!("archive".parse::<MissingItemsAction>().is_err());
    }
}
