use crate::error::{CfpqError, Result};
use rayon::prelude::*;
use roaring::RoaringBitmap;

/// Sparse boolean matrix over the (OR, AND) semiring.
///
/// Each row is a Roaring bitmap of the column indices set in that row, so
/// row unions (the inner loop of multiplication) are bitmap ORs.
#[derive(Debug, Clone, PartialEq)]
pub struct BoolMatrix {
    n_cols: u32,
    rows: Vec<RoaringBitmap>,
}

impl BoolMatrix {
    /// All-false matrix with the given shape.
    ///
    /// Indices are `u32`, so neither dimension may exceed `u32::MAX`.
    pub fn try_new(n_rows: usize, n_cols: usize) -> Result<Self> {
        let limit = u32::MAX as usize;
        let too_large = || CfpqError::dimension_mismatch((n_rows, n_cols), (limit, limit));
        u32::try_from(n_rows).map_err(|_| too_large())?;
        let cols = u32::try_from(n_cols).map_err(|_| too_large())?;
        Ok(BoolMatrix {
            n_cols: cols,
            rows: vec![RoaringBitmap::new(); n_rows],
        })
    }

    pub fn try_square(n: usize) -> Result<Self> {
        Self::try_new(n, n)
    }

    pub fn try_identity(n: usize) -> Result<Self> {
        let mut m = Self::try_square(n)?;
        for (i, row) in (0..m.n_cols).zip(m.rows.iter_mut()) {
            row.insert(i);
        }
        Ok(m)
    }

    /// Infallible [`try_new`](Self::try_new) for shapes already bounded by a
    /// [`StateIndex`](crate::index::StateIndex).
    ///
    /// Panics if a dimension exceeds `u32::MAX`.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        match Self::try_new(n_rows, n_cols) {
            Ok(m) => m,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn square(n: usize) -> Self {
        Self::new(n, n)
    }

    pub fn identity(n: usize) -> Self {
        match Self::try_identity(n) {
            Ok(m) => m,
            Err(e) => panic!("{e}"),
        }
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.n_cols as usize)
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.rows.len() == self.n_cols as usize
    }

    #[inline]
    pub fn get(&self, i: u32, j: u32) -> bool {
        self.rows
            .get(i as usize)
            .map_or(false, |row| row.contains(j))
    }

    /// Set entry `[i, j]`. Returns true if the entry was previously false.
    ///
    /// Panics if `(i, j)` is out of bounds.
    #[inline]
    pub fn set(&mut self, i: u32, j: u32) -> bool {
        assert!(j < self.n_cols, "column {j} out of bounds ({})", self.n_cols);
        self.rows[i as usize].insert(j)
    }

    #[inline]
    pub fn row(&self, i: u32) -> &RoaringBitmap {
        &self.rows[i as usize]
    }

    /// Number of true entries.
    pub fn nnz(&self) -> u64 {
        self.rows.iter().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.is_empty())
    }

    /// True entries in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(i, row)| row.iter().map(move |j| (i as u32, j)))
    }

    fn check_same_shape(&self, other: &BoolMatrix) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(CfpqError::dimension_mismatch(self.shape(), other.shape()));
        }
        Ok(())
    }

    /// `self |= other`. Returns the number of entries that flipped to true.
    pub fn union_with(&mut self, other: &BoolMatrix) -> Result<u64> {
        self.check_same_shape(other)?;
        let before = self.nnz();
        for (dst, src) in self.rows.iter_mut().zip(&other.rows) {
            *dst |= src;
        }
        Ok(self.nnz() - before)
    }

    /// Entries set in `self` but not in `other`.
    pub fn difference(&self, other: &BoolMatrix) -> Result<BoolMatrix> {
        self.check_same_shape(other)?;
        let rows = self
            .rows
            .iter()
            .zip(&other.rows)
            .map(|(a, b)| a - b)
            .collect();
        Ok(BoolMatrix {
            n_cols: self.n_cols,
            rows,
        })
    }

    /// Boolean product: `C[i, k] = OR_j (A[i, j] AND B[j, k])`.
    ///
    /// Rows of the result are independent and computed in parallel.
    pub fn multiply(&self, other: &BoolMatrix) -> Result<BoolMatrix> {
        if self.n_cols as usize != other.rows.len() {
            return Err(CfpqError::dimension_mismatch(self.shape(), other.shape()));
        }
        let rows: Vec<RoaringBitmap> = self
            .rows
            .par_iter()
            .map(|row| {
                let mut acc = RoaringBitmap::new();
                for j in row {
                    acc |= &other.rows[j as usize];
                }
                acc
            })
            .collect();
        Ok(BoolMatrix {
            n_cols: other.n_cols,
            rows,
        })
    }

    /// Kronecker product. Entry `[i, j]` of `self` and `[k, l]` of `other`
    /// land at `[i * other.rows + k, j * other.cols + l]`.
    pub fn kron(&self, other: &BoolMatrix) -> Result<BoolMatrix> {
        let (ar, ac) = self.shape();
        let (br, bc) = other.shape();
        let overflow = || CfpqError::dimension_mismatch(self.shape(), other.shape());
        let n_rows = ar.checked_mul(br).ok_or_else(overflow)?;
        let n_cols = ac.checked_mul(bc).ok_or_else(overflow)?;
        let mut out = BoolMatrix::try_new(n_rows, n_cols).map_err(|_| overflow())?;
        for (i, a_row) in self.rows.iter().enumerate() {
            if a_row.is_empty() {
                continue;
            }
            for (k, b_row) in other.rows.iter().enumerate() {
                if b_row.is_empty() {
                    continue;
                }
                let dst = &mut out.rows[i * br + k];
                for j in a_row {
                    let base = j * bc as u32;
                    dst.extend(b_row.iter().map(|l| base + l));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(n: usize, pairs: &[(u32, u32)]) -> BoolMatrix {
        let mut m = BoolMatrix::square(n);
        for &(i, j) in pairs {
            m.set(i, j);
        }
        m
    }

    #[test]
    fn test_set_reports_new_entries() {
        let mut m = BoolMatrix::square(3);
        assert!(m.set(0, 2));
        assert!(!m.set(0, 2));
        assert!(m.get(0, 2));
        assert!(!m.get(2, 0));
        assert_eq!(m.nnz(), 1);
    }

    #[test]
    fn test_multiply_path() {
        // 0 -> 1 -> 2
        let m = from_pairs(3, &[(0, 1), (1, 2)]);
        let sq = m.multiply(&m).unwrap();
        assert_eq!(sq.iter().collect::<Vec<_>>(), vec![(0, 2)]);
    }

    #[test]
    fn test_multiply_shape_mismatch() {
        let a = BoolMatrix::new(2, 3);
        let b = BoolMatrix::new(2, 3);
        assert_eq!(
            a.multiply(&b),
            Err(CfpqError::dimension_mismatch((2, 3), (2, 3)))
        );
    }

    #[test]
    fn test_union_counts_new_entries() {
        let mut a = from_pairs(2, &[(0, 0)]);
        let b = from_pairs(2, &[(0, 0), (1, 0)]);
        assert_eq!(a.union_with(&b).unwrap(), 1);
        assert_eq!(a.nnz(), 2);
        assert!(a.union_with(&BoolMatrix::square(3)).is_err());
    }

    #[test]
    fn test_difference() {
        let a = from_pairs(2, &[(0, 0), (0, 1), (1, 1)]);
        let b = from_pairs(2, &[(0, 1)]);
        let d = a.difference(&b).unwrap();
        assert_eq!(d.iter().collect::<Vec<_>>(), vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_kron_indexing() {
        // A = [[0,1],[0,0]], B = [[1,0,0],[0,0,1],[0,0,0]]
        let a = from_pairs(2, &[(0, 1)]);
        let b = from_pairs(3, &[(0, 0), (1, 2)]);
        let k = a.kron(&b).unwrap();
        assert_eq!(k.shape(), (6, 6));
        // (0,1)x(0,0) -> (0, 3); (0,1)x(1,2) -> (1, 5)
        assert_eq!(k.iter().collect::<Vec<_>>(), vec![(0, 3), (1, 5)]);
    }

    #[test]
    fn test_identity() {
        let id = BoolMatrix::identity(4);
        assert_eq!(id.nnz(), 4);
        assert!((0..4).all(|i| id.get(i, i)));
        let m = from_pairs(4, &[(0, 3), (2, 1)]);
        assert_eq!(m.multiply(&id).unwrap(), m);
    }

    #[test]
    fn test_oversized_shapes_are_rejected() {
        if let Some(wide) = (u32::MAX as usize).checked_add(1) {
            assert!(matches!(
                BoolMatrix::try_new(1, wide),
                Err(CfpqError::DimensionMismatch { .. })
            ));
            assert!(BoolMatrix::try_square(wide).is_err());
        }
        assert!(BoolMatrix::try_new(2, 3).is_ok());
        let big = BoolMatrix::square(70_000);
        assert!(matches!(big.kron(&big), Err(CfpqError::DimensionMismatch { .. })));
    }
}
