//! The annotation document: class color to traced polygons.
//!
//! Entries are keyed by [`PixelColor`] and iterate in ascending color
//! order, so serializing the same document always produces the same
//! output. Polygon order within an entry is insertion order. Empty
//! polygons are never stored.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::types::{PixelColor, Polygon};

/// How freshly traced polygons combine with an existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Discard any existing polygons for the color.
    #[default]
    Replace,
    /// Keep existing polygons and add the new ones after them.
    Append,
}

impl MergeMode {
    /// [`Append`](Self::Append) when `append` is set, otherwise
    /// [`Replace`](Self::Replace).
    #[must_use]
    pub const fn from_append(append: bool) -> Self {
        if append { Self::Append } else { Self::Replace }
    }
}

/// Polygons per class color for one label image.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnnotationDocument {
    classes: BTreeMap<PixelColor, Vec<Polygon>>,
}

impl AnnotationDocument {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the document has no class entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Number of class entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Total number of polygons across all entries.
    #[must_use]
    pub fn polygon_count(&self) -> usize {
        self.classes.values().map(Vec::len).sum()
    }

    /// Polygons stored for `color`, if it has an entry.
    #[must_use]
    pub fn get(&self, color: PixelColor) -> Option<&[Polygon]> {
        self.classes.get(&color).map(Vec::as_slice)
    }

    /// Returns `true` if `color` has an entry.
    #[must_use]
    pub fn contains(&self, color: PixelColor) -> bool {
        self.classes.contains_key(&color)
    }

    /// Entries in ascending color order.
    pub fn iter(&self) -> impl Iterator<Item = (PixelColor, &[Polygon])> {
        self.classes.iter().map(|(c, p)| (*c, p.as_slice()))
    }

    /// Set the polygons for `color`, discarding any it already had.
    pub fn replace(&mut self, color: PixelColor, polygons: Vec<Polygon>) {
        self.classes.insert(color, non_empty(polygons));
    }

    /// Add polygons after any `color` already has, creating the entry if needed.
    pub fn append_polygons(&mut self, color: PixelColor, polygons: Vec<Polygon>) {
        match self.classes.entry(color) {
            Entry::Occupied(mut entry) => entry.get_mut().extend(non_empty(polygons)),
            Entry::Vacant(entry) => {
                entry.insert(non_empty(polygons));
            }
        }
    }

    /// [`replace`](Self::replace) or [`append_polygons`](Self::append_polygons)
    /// depending on `mode`.
    pub fn merge(&mut self, color: PixelColor, polygons: Vec<Polygon>, mode: MergeMode) {
        match mode {
            MergeMode::Replace => self.replace(color, polygons),
            MergeMode::Append => self.append_polygons(color, polygons),
        }
    }

    /// Remove the entry for `color`, returning its polygons.
    pub fn remove(&mut self, color: PixelColor) -> Option<Vec<Polygon>> {
        self.classes.remove(&color)
    }
}

impl IntoIterator for AnnotationDocument {
    type Item = (PixelColor, Vec<Polygon>);
    type IntoIter = std::collections::btree_map::IntoIter<PixelColor, Vec<Polygon>>;

    fn into_iter(self) -> Self::IntoIter {
        self.classes.into_iter()
    }
}

fn non_empty(polygons: Vec<Polygon>) -> Vec<Polygon> {
    polygons.into_iter().filter(|p| !p.is_empty()).collect()
}
