//! Name lookups over sorted reference data
//!
//! Reference sets (regions, groups) are sorted once per run and searched by
//! exact name with a binary search.

use shared::models::{ProductGroup, Region};

/// Index of the element whose key equals `key`, or `None`
///
/// `items` must be sorted ascending by `key_of`.
pub fn binary_search_by_key<T>(
    items: &[T],
    key: &str,
    key_of: impl Fn(&T) -> &str,
) -> Option<usize> {
    items.binary_search_by(|item| key_of(item).cmp(key)).ok()
}

/// Reference items kept sorted by name
#[derive(Debug, Clone)]
pub struct SortedIndex<T> {
    items: Vec<T>,
    key: fn(&T) -> &str,
}

impl<T> SortedIndex<T> {
    pub fn new(mut items: Vec<T>, key: fn(&T) -> &str) -> Self {
        items.sort_by(|a, b| key(a).cmp(key(b)));
        Self { items, key }
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        binary_search_by_key(&self.items, name, self.key).map(|i| &self.items[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

pub type RegionIndex = SortedIndex<Region>;
pub type GroupIndex = SortedIndex<ProductGroup>;

fn region_name(region: &Region) -> &str {
    &region.name
}

fn group_name(group: &ProductGroup) -> &str {
    &group.name
}

pub fn region_index(regions: Vec<Region>) -> RegionIndex {
    SortedIndex::new(regions, region_name)
}

pub fn group_index(groups: Vec<ProductGroup>) -> GroupIndex {
    SortedIndex::new(groups, group_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions(names: &[&str]) -> RegionIndex {
        region_index(
            names
                .iter()
                .enumerate()
                .map(|(i, n)| Region {
                    id: i as i64 + 1,
                    name: n.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn test_search_boundaries() {
        let names = ["a", "c", "e", "g"];
        let find = |k: &str| binary_search_by_key(&names, k, |s: &&str| *s);
        assert_eq!(find("a"), Some(0));
        assert_eq!(find("g"), Some(3));
        assert_eq!(find("e"), Some(2));
        assert_eq!(find("0"), None);
        assert_eq!(find("b"), None);
        assert_eq!(find("z"), None);
    }

    #[test]
    fn test_empty_and_single() {
        let empty: [&str; 0] = [];
        assert_eq!(binary_search_by_key(&empty, "a", |s: &&str| *s), None);

        let one = ["only"];
        assert_eq!(binary_search_by_key(&one, "only", |s: &&str| *s), Some(0));
        assert_eq!(binary_search_by_key(&one, "other", |s: &&str| *s), None);
    }

    #[test]
    fn test_index_sorts_before_search() {
        let index = regions(&["Samara", "Moscow", "Kazan"]);
        assert_eq!(index.len(), 3);
        assert_eq!(index.get("Moscow").map(|r| r.id), Some(2));
        assert_eq!(index.get("Kazan").map(|r| r.id), Some(3));
        assert!(index.contains("Samara"));
        assert!(!index.contains("Tver"));
        let sorted: Vec<_> = index.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(sorted, ["Kazan", "Moscow", "Samara"]);
    }

    #[test]
    fn test_exact_match_only() {
        let index = group_index(vec![ProductGroup {
            id: 1,
            name: "Sale".into(),
        }]);
        assert!(index.get("sale").is_none());
        assert!(index.get("Sale ").is_none());
        assert!(index.get("Sale").is_some());
    }
}
