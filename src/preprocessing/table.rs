//! Raw feature extraction from data frames and JSON records
//!
//! Both the training path (a `DataFrame` read from an upload) and the inference
//! path (a single JSON object) are lowered into a [`RawTable`] laid out in schema
//! order, so every fitted stage downstream has exactly one code path.

use crate::error::{ClassifierError, Result};
use polars::prelude::*;
use serde_json::Value;

use super::schema::Schema;

/// A single raw observation as it arrives from a client
pub type Record = serde_json::Map<String, Value>;

/// Raw, untransformed feature values aligned with a [`Schema`]
///
/// `numeric[j]` holds the values of `schema.numeric_features[j]` with `NaN`
/// marking a missing entry; `categorical[j]` holds the values of
/// `schema.categorical_features[j]` with `None` marking a missing entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub numeric: Vec<Vec<f64>>,
    pub categorical: Vec<Vec<Option<String>>>,
    n_rows: usize,
}

impl RawTable {
    /// Extract the schema's feature columns from a data frame.
    /// Columns absent from the frame are synthesized as entirely missing.
    pub fn from_frame(df: &DataFrame, schema: &Schema) -> Result<Self> {
        let n_rows = df.height();

        let numeric = schema
            .numeric_features
            .iter()
            .map(|name| match df.column(name) {
                Ok(column) => numeric_values(column.as_materialized_series()),
                Err(_) => Ok(vec![f64::NAN; n_rows]),
            })
            .collect::<Result<Vec<_>>>()?;

        let categorical = schema
            .categorical_features
            .iter()
            .map(|name| match df.column(name) {
                Ok(column) => string_values(column.as_materialized_series()),
                Err(_) => Ok(vec![None; n_rows]),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { numeric, categorical, n_rows })
    }

    /// Lower one JSON record into a single-row table.
    ///
    /// Missing fields and `null` become missing values, extra fields are ignored.
    /// A numeric feature carrying a non-numeric value is rejected.
    pub fn from_record(record: &Record, schema: &Schema) -> Result<Self> {
        let numeric = schema
            .numeric_features
            .iter()
            .map(|name| record_numeric(name, record.get(name)).map(|v| vec![v]))
            .collect::<Result<Vec<_>>>()?;

        let categorical = schema
            .categorical_features
            .iter()
            .map(|name| record_category(name, record.get(name)).map(|v| vec![v]))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { numeric, categorical, n_rows: 1 })
    }

    /// Build a table directly from column vectors
    pub fn from_columns(numeric: Vec<Vec<f64>>, categorical: Vec<Vec<Option<String>>>) -> Result<Self> {
        let n_rows = numeric
            .first()
            .map(Vec::len)
            .or_else(|| categorical.first().map(Vec::len))
            .unwrap_or(0);

        let ragged = numeric.iter().any(|c| c.len() != n_rows)
            || categorical.iter().any(|c| c.len() != n_rows);
        if ragged {
            return Err(ClassifierError::DataError(
                "all raw columns must have the same length".to_string(),
            ));
        }

        Ok(Self { numeric, categorical, n_rows })
    }

    /// Keep only the given rows, in the given order (repeats allowed)
    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            numeric: self
                .numeric
                .iter()
                .map(|col| indices.iter().map(|&i| col[i]).collect())
                .collect(),
            categorical: self
                .categorical
                .iter()
                .map(|col| indices.iter().map(|&i| col[i].clone()).collect())
                .collect(),
            n_rows: indices.len(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }
}

// ============================================================================
// Series helpers
// ============================================================================

/// Whether a polars dtype holds numbers
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Read a series as `f64`, with `NaN` for nulls, non-finite and unparsable entries
pub fn numeric_values(series: &Series) -> Result<Vec<f64>> {
    let values = match series.dtype() {
        DataType::Null => vec![f64::NAN; series.len()],
        DataType::String => series
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_number).unwrap_or(f64::NAN))
            .collect(),
        _ => series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()).unwrap_or(f64::NAN))
            .collect(),
    };
    Ok(values)
}

/// Read a series as strings, with `None` for nulls and blank entries
pub fn string_values(series: &Series) -> Result<Vec<Option<String>>> {
    if matches!(series.dtype(), DataType::Null) {
        return Ok(vec![None; series.len()]);
    }

    let casted = series.cast(&DataType::String)?;
    let values = casted
        .str()?
        .into_iter()
        .map(|v| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect();
    Ok(values)
}

/// Parse a textual number, treating blanks as missing
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

// ============================================================================
// Record helpers
// ============================================================================

fn record_numeric(column: &str, value: Option<&Value>) -> Result<f64> {
    match value {
        None | Some(Value::Null) => Ok(f64::NAN),
        Some(Value::Number(n)) => Ok(n.as_f64().filter(|v| v.is_finite()).unwrap_or(f64::NAN)),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(f64::NAN),
        Some(Value::String(s)) => parse_number(s).ok_or_else(|| ClassifierError::InvalidValue {
            column: column.to_string(),
            reason: format!("expected a number, got '{}'", s),
        }),
        Some(other) => Err(ClassifierError::InvalidValue {
            column: column.to_string(),
            reason: format!("expected a number, got {}", json_kind(other)),
        }),
    }
}

fn record_category(column: &str, value: Option<&Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(ClassifierError::InvalidValue {
            column: column.to_string(),
            reason: format!("expected a category, got {}", json_kind(other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new(
            "label",
            vec!["period".to_string(), "depth".to_string()],
            vec!["band".to_string()],
            vec!["period".to_string(), "band".to_string(), "depth".to_string()],
        )
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_frame_synthesizes_missing_columns() {
        let df = df!(
            "period" => &[Some(1.5), None, Some(3.0)],
            "band" => &["r", "g", "r"],
            "label" => &["a", "b", "a"]
        )
        .unwrap();

        let table = RawTable::from_frame(&df, &schema()).unwrap();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.numeric[0][0], 1.5);
        assert!(table.numeric[0][1].is_nan());
        assert!(table.numeric[1].iter().all(|v| v.is_nan()));
        assert_eq!(table.categorical[0][1].as_deref(), Some("g"));
    }

    #[test]
    fn test_from_record_ignores_extra_fields() {
        let rec = record(json!({"depth": 120, "band": "i", "unused": [1, 2]}));
        let table = RawTable::from_record(&rec, &schema()).unwrap();

        assert!(table.numeric[0][0].is_nan());
        assert_eq!(table.numeric[1][0], 120.0);
        assert_eq!(table.categorical[0][0].as_deref(), Some("i"));
    }

    #[test]
    fn test_from_record_accepts_numeric_strings() {
        let rec = record(json!({"period": " 4.25 ", "depth": ""}));
        let table = RawTable::from_record(&rec, &schema()).unwrap();
        assert_eq!(table.numeric[0][0], 4.25);
        assert!(table.numeric[1][0].is_nan());
        assert_eq!(table.categorical[0][0], None);
    }

    #[test]
    fn test_from_record_rejects_wrong_numeric_type() {
        let rec = record(json!({"period": "not a number"}));
        let err = RawTable::from_record(&rec, &schema()).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidValue { ref column, .. } if column == "period"));

        let rec = record(json!({"depth": true}));
        assert!(RawTable::from_record(&rec, &schema()).is_err());
    }

    #[test]
    fn test_take_repeats_rows() {
        let table = RawTable::from_columns(
            vec![vec![1.0, 2.0, 3.0]],
            vec![vec![Some("x".to_string()), None, Some("z".to_string())]],
        )
        .unwrap();

        let taken = table.take(&[2, 2, 0]);
        assert_eq!(taken.n_rows(), 3);
        assert_eq!(taken.numeric[0], vec![3.0, 3.0, 1.0]);
        assert_eq!(taken.categorical[0][0].as_deref(), Some("z"));
    }

    #[test]
    fn test_from_columns_rejects_ragged_input() {
        let result = RawTable::from_columns(vec![vec![1.0, 2.0], vec![1.0]], vec![]);
        assert!(result.is_err());
    }
}
