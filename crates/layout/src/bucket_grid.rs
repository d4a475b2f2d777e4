//! Uniform bucket grid over a bounded 2D region.
//!
//! Elements are stored together with their bounds in every cell their bounds touch. Cell
//! membership is only a coarse filter: queries re-test the stored bounds before yielding.
//! Elements taken with [`BucketGrid::remove_overlapping_elements`] are marked removed in a
//! side set instead of being unlinked from their cells, and are never yielded or accepted
//! again.

use std::collections::HashSet;
use std::hash::Hash;
use std::ops::RangeInclusive;

use smallvec::SmallVec;

use crate::types::{Bounds, GridError};

#[derive(Debug, Clone)]
struct Entry<T> {
    bounds: Bounds,
    element: T,
}

#[derive(Debug, Clone)]
pub struct BucketGrid<T> {
    region: Bounds,
    cols: usize,
    rows: usize,
    cells: Vec<SmallVec<[Entry<T>; 4]>>,
    removed: HashSet<T>,
}

impl<T: Clone + Eq + Hash> BucketGrid<T> {
    /// Creates a grid of `cols x rows` cells covering `region`. Zero cell counts are bumped
    /// to one.
    pub fn new(region: Bounds, [cols, rows]: [usize; 2]) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            region,
            cols,
            rows,
            cells: (0..cols * rows).map(|_| SmallVec::new()).collect(),
            removed: HashSet::new(),
        }
    }

    pub fn region(&self) -> Bounds {
        self.region
    }

    pub fn dimensions(&self) -> [usize; 2] {
        [self.cols, self.rows]
    }

    pub fn is_removed(&self, element: &T) -> bool {
        self.removed.contains(element)
    }

    pub fn insert(&mut self, bounds: Bounds, element: T) -> Result<(), GridError> {
        if !self.region.intersects(&bounds) {
            return Err(GridError::OutsideRegion(bounds));
        }
        if self.removed.contains(&element) {
            return Err(GridError::AlreadyRemoved);
        }
        let (xs, ys) = self.cell_range(&bounds);
        for y in ys {
            for x in xs.clone() {
                self.cells[y * self.cols + x].push(Entry {
                    bounds,
                    element: element.clone(),
                });
            }
        }
        Ok(())
    }

    /// Lazily yields every element whose bounds intersect `query`, each at most once.
    pub fn overlapping_elements<'a>(&'a self, query: &Bounds) -> impl Iterator<Item = &'a T> + 'a {
        let query = *query;
        let mut seen: HashSet<&'a T> = HashSet::new();
        let removed = &self.removed;
        self.candidates(&query)
            .filter(move |entry| {
                entry.bounds.intersects(&query)
                    && !removed.contains(&entry.element)
                    && seen.insert(&entry.element)
            })
            .map(|entry| &entry.element)
    }

    /// Like [`BucketGrid::overlapping_elements`], but every yielded element is marked as
    /// removed. Elements are only taken as the iterator is advanced.
    pub fn remove_overlapping_elements<'a>(
        &'a mut self,
        query: &Bounds,
    ) -> impl Iterator<Item = &'a T> + 'a {
        let query = *query;
        let range = self.region_range(&query);
        let cols = self.cols;
        let Self { cells, removed, .. } = self;
        let cells: &'a [SmallVec<[Entry<T>; 4]>] = cells;
        cell_indices(range, cols)
            .flat_map(move |i| cells[i].iter())
            .filter(move |entry| {
                entry.bounds.intersects(&query) && removed.insert(entry.element.clone())
            })
            .map(|entry| &entry.element)
    }

    fn candidates<'a>(&'a self, query: &Bounds) -> impl Iterator<Item = &'a Entry<T>> + use<'a, T> {
        let range = self.region_range(query);
        cell_indices(range, self.cols).flat_map(move |i| self.cells[i].iter())
    }

    fn region_range(&self, query: &Bounds) -> Option<(RangeInclusive<usize>, RangeInclusive<usize>)> {
        self.region
            .intersects(query)
            .then(|| self.cell_range(query))
    }

    fn cell_range(&self, bounds: &Bounds) -> (RangeInclusive<usize>, RangeInclusive<usize>) {
        let to_cell = |value: f64, origin: f64, extent: f64, count: usize| -> usize {
            let cell = ((value - origin) / extent * count as f64).floor();
            // NaN (zero-sized region) lands in cell 0
            cell.clamp(0.0, (count - 1) as f64) as usize
        };
        let width = self.region.width();
        let height = self.region.height();
        let min_x = to_cell(bounds.min.x, self.region.min.x, width, self.cols);
        let max_x = to_cell(bounds.max.x, self.region.min.x, width, self.cols);
        let min_y = to_cell(bounds.min.y, self.region.min.y, height, self.rows);
        let max_y = to_cell(bounds.max.y, self.region.min.y, height, self.rows);
        (min_x..=max_x, min_y..=max_y)
    }
}

fn cell_indices(
    range: Option<(RangeInclusive<usize>, RangeInclusive<usize>)>,
    cols: usize,
) -> impl Iterator<Item = usize> {
    range.into_iter().flat_map(move |(xs, ys)| {
        ys.flat_map(move |y| xs.clone().map(move |x| y * cols + x))
    })
}
