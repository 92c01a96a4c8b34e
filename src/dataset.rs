use std::fmt;

use crate::error::{Error, Result};
use crate::types::{VarId, VarLabel, Value};
use crate::variable::{JointVariable, Variable};

/// A column-major matrix of categorical samples.
///
/// The matrix owns its columns; the variables it hands out borrow them.
pub struct DatasetMatrix {
    label: String,
    columns: Vec<Vec<Value>>,
    column_values: Vec<Vec<Value>>,
    n_rows: usize,
}

impl DatasetMatrix {
    /// Builds a matrix from columns, which must all have the same length.
    pub fn from_columns(label: impl Into<String>, columns: Vec<Vec<Value>>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, |c| c.len());
        for (i, column) in columns.iter().enumerate() {
            if column.len() != n_rows {
                return Err(Error::UnequalInstanceCount {
                    first: "0".to_string(),
                    second: i.to_string(),
                    first_len: n_rows,
                    second_len: column.len(),
                });
            }
        }

        let column_values = columns
            .iter()
            .map(|column| {
                let mut values = column.clone();
                values.sort_unstable();
                values.dedup();
                values
            })
            .collect();

        Ok(Self {
            label: label.into(),
            columns,
            column_values,
            n_rows,
        })
    }

    /// Builds a matrix from rows, which must all have the same length.
    pub fn from_rows(label: impl Into<String>, rows: &[Vec<Value>]) -> Result<Self> {
        let n_cols = rows.first().map_or(0, |r| r.len());
        let mut columns = vec![Vec::with_capacity(rows.len()); n_cols];
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(Error::UnequalInstanceCount {
                    first: "row 0".to_string(),
                    second: format!("row {}", i),
                    first_len: n_cols,
                    second_len: row.len(),
                });
            }
            for (column, &value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        Self::from_columns(label, columns)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of samples, `N`.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, id: VarId) -> Result<&[Value]> {
        self.columns
            .get(id)
            .map(|c| c.as_slice())
            .ok_or(Error::UnknownVariable(id))
    }

    /// Sorted distinct values observed in column `id`.
    pub fn column_values(&self, id: VarId) -> Result<&[Value]> {
        self.column_values
            .get(id)
            .map(|c| c.as_slice())
            .ok_or(Error::UnknownVariable(id))
    }

    /// Sorted distinct values of every column.
    pub fn values_per_column(&self) -> &[Vec<Value>] {
        &self.column_values
    }

    /// Iterates over the samples as rows.
    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        (0..self.n_rows).map(move |r| self.columns.iter().map(|c| c[r]).collect())
    }

    pub fn get_variable(&self, id: VarId) -> Result<Variable<'_>> {
        let column = self.column(id)?;
        Ok(Variable::borrowed(VarLabel::Column(id), id.to_string(), column))
    }

    /// The joint variable of the given columns, in the given order.
    pub fn get_variables(&self, ids: &[VarId]) -> Result<JointVariable<'_>> {
        let variables = ids
            .iter()
            .map(|&id| self.get_variable(id))
            .collect::<Result<Vec<_>>>()?;
        JointVariable::new(variables)
    }

    /// The universal variable Ω spanning all samples.
    pub fn omega(&self) -> Variable<'static> {
        Variable::omega(self.n_rows)
    }
}

impl fmt::Debug for DatasetMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetMatrix")
            .field("label", &self.label)
            .field("rows", &self.n_rows)
            .field("cols", &self.columns.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::key::Key;
    use crate::variable::Observed;

    fn sample() -> DatasetMatrix {
        DatasetMatrix::from_rows("sample", &[vec![0, 1, 2], vec![1, 1, 0], vec![0, 0, 2], vec![1, 1, 2]]).unwrap()
    }

    #[test]
    fn test_shape_and_domains() {
        let dm = sample();
        assert_eq!(dm.n_rows(), 4);
        assert_eq!(dm.n_cols(), 3);
        assert_eq!(dm.column(0).unwrap(), &[0, 1, 0, 1]);
        assert_eq!(dm.column_values(2).unwrap(), &[0, 2]);
        assert_eq!(dm.rows().nth(1), Some(vec![1, 1, 0]));
    }

    #[test]
    fn test_unknown_column() {
        let dm = sample();
        assert!(matches!(dm.column(3), Err(Error::UnknownVariable(3))));
        assert!(matches!(dm.get_variables(&[0, 7]), Err(Error::UnknownVariable(7))));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = DatasetMatrix::from_rows("bad", &[vec![0, 1], vec![1]]).unwrap_err();
        assert!(matches!(err, Error::UnequalInstanceCount { .. }));
    }

    #[test]
    fn test_variables_borrow_columns() {
        let dm = sample();
        let v = dm.get_variable(1).unwrap();
        assert_eq!(v.label(), VarLabel::Column(1));
        assert_eq!(v.values(), &[0, 1]);

        let joint = dm.get_variables(&[2, 0]).unwrap();
        assert_eq!(joint.ids(), vec![2, 0]);
        assert_eq!(joint.key_at(1), Key::from_values(vec![0, 1]));
        assert_eq!(dm.omega().len(), 4);
    }
}
