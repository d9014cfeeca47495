use vecjoin_common::error::{Error, Result};
use vecjoin_common::types::DataType;

use crate::ColumnVector;

/// Borrowed view of the live rows of a batch: `size` logical rows, either
/// `0..size` or `selected[..size]`.
#[derive(Debug, Clone, Copy)]
pub struct RowSelection<'a> {
    size: usize,
    selected: Option<&'a [usize]>,
}

impl<'a> RowSelection<'a> {
    /// `size` is clamped to the length of `selected` when one is given.
    pub fn new(size: usize, selected: Option<&'a [usize]>) -> Self {
        match selected {
            Some(sel) => {
                let size = size.min(sel.len());
                Self {
                    size,
                    selected: Some(&sel[..size]),
                }
            }
            None => Self {
                size,
                selected: None,
            },
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn selected(&self) -> Option<&'a [usize]> {
        self.selected
    }

    /// Calls `f` with every effective row index. The selected and dense cases
    /// are separate loops so each stays branch-free.
    #[inline(always)]
    pub fn for_each<F: FnMut(usize)>(&self, mut f: F) {
        match self.selected {
            Some(sel) => {
                for &i in sel {
                    f(i);
                }
            }
            None => {
                for i in 0..self.size {
                    f(i);
                }
            }
        }
    }

    pub fn iter(&self) -> ActiveRows<'a> {
        match self.selected {
            Some(sel) => ActiveRows::Selected(sel.iter()),
            None => ActiveRows::Dense(0..self.size),
        }
    }
}

pub enum ActiveRows<'a> {
    Selected(std::slice::Iter<'a, usize>),
    Dense(std::ops::Range<usize>),
}

impl Iterator for ActiveRows<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            ActiveRows::Selected(it) => it.next().copied(),
            ActiveRows::Dense(range) => range.next(),
        }
    }
}

/// Logical row count plus the optional selection vector of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    size: usize,
    selected: Vec<usize>,
    in_use: bool,
}

impl Selection {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            size: 0,
            selected: vec![0; capacity],
            in_use: false,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn in_use(&self) -> bool {
        self.in_use
    }

    pub fn rows(&self) -> RowSelection<'_> {
        if self.in_use {
            RowSelection::new(self.size, Some(&self.selected))
        } else {
            RowSelection::new(self.size, None)
        }
    }

    /// Keeps only the rows for which `keep` returns true, compacting the
    /// selection in place. Enables the selection when rows are dropped from
    /// a dense batch.
    pub fn retain<F: FnMut(usize) -> bool>(&mut self, mut keep: F) {
        let n = self.size;
        let mut new_size = 0;
        if self.in_use {
            for j in 0..n {
                let i = self.selected[j];
                if keep(i) {
                    self.selected[new_size] = i;
                    new_size += 1;
                }
            }
            self.size = new_size;
        } else {
            for i in 0..n {
                if keep(i) {
                    self.selected[new_size] = i;
                    new_size += 1;
                }
            }
            if new_size < n {
                self.size = new_size;
                self.in_use = true;
            }
        }
    }

    /// Drops every row.
    pub fn clear_rows(&mut self) {
        self.size = 0;
    }

    fn validate(&self, capacity: usize) -> Result<()> {
        if self.size > capacity {
            return Err(Error::invariant(format!(
                "batch size {} exceeds capacity {}",
                self.size, capacity
            )));
        }
        if self.in_use && self.size > self.selected.len() {
            return Err(Error::invariant(format!(
                "batch size {} exceeds selection vector length {}",
                self.size,
                self.selected.len()
            )));
        }
        Ok(())
    }
}

/// Input columns (shared) and the output column (exclusive) of one
/// expression evaluation, with the rows it must cover.
pub struct ColumnIo<'a, const N: usize> {
    pub rows: RowSelection<'a>,
    pub inputs: [&'a ColumnVector; N],
    pub output: &'a mut ColumnVector,
}

/// A fixed-capacity set of column vectors sharing one row count and
/// selection. Batches are reused across calls; `reset` readies one for the
/// next fill.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBatch {
    columns: Vec<ColumnVector>,
    selection: Selection,
    capacity: usize,
}

impl ColumnBatch {
    pub fn new(capacity: usize, types: &[DataType]) -> Self {
        Self {
            columns: types
                .iter()
                .map(|t| ColumnVector::new(*t, capacity))
                .collect(),
            selection: Selection::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn size(&self) -> usize {
        self.selection.size
    }

    pub fn is_empty(&self) -> bool {
        self.selection.size == 0
    }

    /// Makes rows `0..size` live. Any installed selection is dropped so that
    /// stale selected indices never become active.
    pub fn set_size(&mut self, size: usize) -> Result<()> {
        if size > self.capacity {
            return Err(Error::invariant(format!(
                "batch size {} exceeds capacity {}",
                size, self.capacity
            )));
        }
        self.selection.size = size;
        self.selection.in_use = false;
        Ok(())
    }

    /// Installs a selection vector. `size` becomes the number of selected rows.
    pub fn set_selected(&mut self, selected: &[usize]) -> Result<()> {
        if selected.len() > self.capacity {
            return Err(Error::invariant(format!(
                "selection of {} rows exceeds capacity {}",
                selected.len(),
                self.capacity
            )));
        }
        let mut prev: Option<usize> = None;
        for &i in selected {
            if i >= self.capacity {
                return Err(Error::invariant(format!(
                    "selected row {} is outside capacity {}",
                    i, self.capacity
                )));
            }
            if prev.is_some_and(|p| p >= i) {
                return Err(Error::invariant(
                    "selection vector must be strictly increasing",
                ));
            }
            prev = Some(i);
        }
        self.selection.selected[..selected.len()].copy_from_slice(selected);
        self.selection.size = selected.len();
        self.selection.in_use = true;
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.in_use = false;
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn rows(&self) -> RowSelection<'_> {
        self.selection.rows()
    }

    /// Effective row indices: `0..size`, or the selected prefix.
    pub fn active_rows(&self) -> ActiveRows<'_> {
        self.selection.rows().iter()
    }

    /// Resets every column's flags and drops the selection and rows.
    pub fn reset(&mut self) {
        for col in &mut self.columns {
            col.reset();
        }
        self.selection.size = 0;
        self.selection.in_use = false;
    }

    /// Appends a scratch column and returns its index.
    pub fn add_column(&mut self, data_type: DataType) -> usize {
        self.columns.push(ColumnVector::new(data_type, self.capacity));
        self.columns.len() - 1
    }

    pub fn columns(&self) -> &[ColumnVector] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Result<&ColumnVector> {
        let count = self.columns.len();
        self.columns.get(index).ok_or_else(|| {
            Error::configuration(format!(
                "column {} out of range for batch with {} columns",
                index, count
            ))
        })
    }

    pub fn column_mut(&mut self, index: usize) -> Result<&mut ColumnVector> {
        let count = self.columns.len();
        self.columns.get_mut(index).ok_or_else(|| {
            Error::configuration(format!(
                "column {} out of range for batch with {} columns",
                index, count
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.selection.validate(self.capacity)
    }

    /// Borrows `inputs` shared and `output` exclusively, together with the
    /// active rows. The output must not alias an input.
    pub fn io_columns<const N: usize>(
        &mut self,
        inputs: [usize; N],
        output: usize,
    ) -> Result<ColumnIo<'_, N>> {
        self.validate()?;
        let count = self.columns.len();
        if output >= count {
            return Err(Error::configuration(format!(
                "output column {} out of range for batch with {} columns",
                output, count
            )));
        }
        for &i in &inputs {
            if i >= count {
                return Err(Error::configuration(format!(
                    "input column {} out of range for batch with {} columns",
                    i, count
                )));
            }
            if i == output {
                return Err(Error::configuration(format!(
                    "output column {} is also an input",
                    output
                )));
            }
        }
        let (before, rest) = self.columns.split_at_mut(output);
        let (out, after) = rest
            .split_first_mut()
            .ok_or_else(|| Error::internal("output column vanished during split"))?;
        let before: &[ColumnVector] = before;
        let after: &[ColumnVector] = after;
        let inputs = inputs.map(move |i| {
            if i < output {
                &before[i]
            } else {
                &after[i - output - 1]
            }
        });
        Ok(ColumnIo {
            rows: self.selection.rows(),
            inputs,
            output: out,
        })
    }

    /// Borrows one column for reading alongside the selection for narrowing.
    pub fn filter_parts(&mut self, input: usize) -> Result<(&ColumnVector, &mut Selection)> {
        self.validate()?;
        let count = self.columns.len();
        let col = self.columns.get(input).ok_or_else(|| {
            Error::configuration(format!(
                "input column {} out of range for batch with {} columns",
                input, count
            ))
        })?;
        Ok((col, &mut self.selection))
    }
}
