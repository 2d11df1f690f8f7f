//! Connected-component labeling of mask cells

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use landmask_core::{BinaryMask, Error};

/// Cell adjacency used when grouping true cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Connectivity {
    /// Edge neighbours only
    Four,
    /// Edge and corner neighbours
    #[default]
    Eight,
}

const N4: [(isize, isize); 4] = [(-1, 0), (0, -1), (0, 1), (1, 0)];
const N8: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

impl Connectivity {
    pub fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &N4,
            Connectivity::Eight => &N8,
        }
    }
}

impl TryFrom<u8> for Connectivity {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Connectivity::Four),
            8 => Ok(Connectivity::Eight),
            other => Err(Error::invalid_parameter(
                "connectivity",
                other,
                "expected 4 or 8",
            )),
        }
    }
}

impl From<Connectivity> for u8 {
    fn from(value: Connectivity) -> Self {
        match value {
            Connectivity::Four => 4,
            Connectivity::Eight => 8,
        }
    }
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Inclusive cell bounds of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBounds {
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

impl CellBounds {
    fn at(row: usize, col: usize) -> Self {
        Self {
            min_row: row,
            min_col: col,
            max_row: row,
            max_col: col,
        }
    }

    fn include(&mut self, row: usize, col: usize) {
        self.min_row = self.min_row.min(row);
        self.min_col = self.min_col.min(col);
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
    }
}

/// Label grid produced by [`label_components`]
///
/// Label 0 is background (false or no-data). Components are numbered from 1
/// in the order a row-major scan first reaches them.
#[derive(Debug, Clone)]
pub struct ComponentLabels {
    pub labels: Array2<u32>,
    sizes: Vec<usize>,
    bounds: Vec<CellBounds>,
}

impl ComponentLabels {
    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    /// Cell count of component `label` (1-based)
    pub fn size(&self, label: u32) -> usize {
        label
            .checked_sub(1)
            .and_then(|i| self.sizes.get(i as usize))
            .copied()
            .unwrap_or(0)
    }

    pub fn bounds(&self, label: u32) -> Option<CellBounds> {
        label
            .checked_sub(1)
            .and_then(|i| self.bounds.get(i as usize))
            .copied()
    }

    /// Cell counts indexed by `label - 1`
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn label_at(&self, row: usize, col: usize) -> u32 {
        self.labels.get((row, col)).copied().unwrap_or(0)
    }
}

/// Label 4- or 8-connected groups of true cells.
pub fn label_components(mask: &BinaryMask, connectivity: Connectivity) -> ComponentLabels {
    label_where(mask.shape(), connectivity, |row, col| mask.is_true(row, col))
}

/// Labeling over any cell predicate on a `rows x cols` grid.
pub(crate) fn label_where<F>(
    shape: (usize, usize),
    connectivity: Connectivity,
    member: F,
) -> ComponentLabels
where
    F: Fn(usize, usize) -> bool,
{
    let (rows, cols) = shape;
    let offsets = connectivity.offsets();
    let mut labels = Array2::<u32>::zeros((rows, cols));
    let mut sizes = Vec::new();
    let mut bounds = Vec::new();
    let mut stack = Vec::new();

    for row in 0..rows {
        for col in 0..cols {
            if labels[(row, col)] != 0 || !member(row, col) {
                continue;
            }

            let label = sizes.len() as u32 + 1;
            let mut size = 0usize;
            let mut bbox = CellBounds::at(row, col);

            labels[(row, col)] = label;
            stack.push((row, col));

            while let Some((cr, cc)) = stack.pop() {
                size += 1;
                bbox.include(cr, cc);

                for &(dr, dc) in offsets {
                    let nr = cr as isize + dr;
                    let nc = cc as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }
                    let (nr, nc) = (nr as usize, nc as usize);
                    if labels[(nr, nc)] == 0 && member(nr, nc) {
                        labels[(nr, nc)] = label;
                        stack.push((nr, nc));
                    }
                }
            }

            sizes.push(size);
            bounds.push(bbox);
        }
    }

    ComponentLabels {
        labels,
        sizes,
        bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landmask_core::GeoTransform;

    fn mask(rows: &[&str]) -> BinaryMask {
        let cols = rows[0].len();
        let values: Vec<bool> = rows
            .iter()
            .flat_map(|r| r.chars().map(|c| c == '#'))
            .collect();
        BinaryMask::from_bools(&values, rows.len(), cols, GeoTransform::default()).unwrap()
    }

    #[test]
    fn test_diagonal_pieces() {
        let m = mask(&["#..", ".#.", "..#"]);
        let four = label_components(&m, Connectivity::Four);
        assert_eq!(four.count(), 3);
        assert_eq!(four.sizes(), &[1, 1, 1]);

        let eight = label_components(&m, Connectivity::Eight);
        assert_eq!(eight.count(), 1);
        assert_eq!(eight.size(1), 3);
        let b = eight.bounds(1).unwrap();
        assert_eq!((b.min_row, b.min_col, b.max_row, b.max_col), (0, 0, 2, 2));
    }

    #[test]
    fn test_labels_in_scan_order() {
        let m = mask(&["..#", "#..", "##."]);
        let labels = label_components(&m, Connectivity::Four);
        assert_eq!(labels.label_at(0, 2), 1);
        assert_eq!(labels.label_at(1, 0), 2);
        assert_eq!(labels.label_at(2, 1), 2);
        assert_eq!(labels.size(2), 3);
        assert_eq!(labels.label_at(0, 0), 0);
        assert_eq!(labels.size(0), 0);
    }

    #[test]
    fn test_connectivity_serde() {
        assert_eq!(Connectivity::try_from(4).unwrap(), Connectivity::Four);
        assert!(Connectivity::try_from(6).is_err());
        assert_eq!(u8::from(Connectivity::Eight), 8);
        assert_eq!(Connectivity::default(), Connectivity::Eight);
    }
}
