use std::{fmt, ops::Index, str::FromStr};

use crate::{decode::decode_result_set, CrateDbError, Result, Value};

/// One result row; cells are aligned with [`ResultSet::columns`].
pub type Row = Vec<Value>;

/// Outcome of one value set of a bulk request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkResult {
    /// Rows affected by this value set; `-2` when it failed.
    pub row_count: i64,
    pub error_message: Option<String>,
}

impl BulkResult {
    pub fn is_failure(&self) -> bool {
        self.row_count == -2 || self.error_message.is_some()
    }
}

/// Tabular result of a successful SQL request.
///
/// Rows keep the order in which the server returned them. Apart from
/// [`ResultSet::append_row`] the result is read-only.
#[derive(Clone, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Row>,
    row_count: i64,
    duration: f64,
    bulk_results: Option<Vec<BulkResult>>,
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("row_count", &self.row_count)
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

impl ResultSet {
    pub(crate) fn new(
        columns: Vec<String>,
        rows: Vec<Row>,
        row_count: i64,
        duration: f64,
        bulk_results: Option<Vec<BulkResult>>,
    ) -> Self {
        Self {
            columns,
            rows,
            row_count,
            duration,
            bulk_results,
        }
    }

    /// Parses a raw `/_sql` response body.
    ///
    /// The body must be a JSON object with `cols`, `duration` and either
    /// `rows` plus `rowcount` or the per-value-set `results` of a bulk
    /// request; anything else is [`CrateDbError::MalformedResult`].
    pub fn from_json(body: &str) -> Result<Self> {
        decode_result_set(body)
    }

    /// Column names in the order declared by the server.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// All rows; alias of [`ResultSet::rows`].
    pub fn values(&self) -> &[Row] {
        &self.rows
    }

    /// Row count as reported by the server. Not cross-checked against the
    /// buffered rows; DDL statements report `-1`. For bulk replies without
    /// a top-level count this is the sum of the successful value sets.
    pub fn row_count(&self) -> i64 {
        self.row_count
    }

    /// Server-side execution time in milliseconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Per-value-set outcomes; only present for bulk requests.
    pub fn bulk_results(&self) -> Option<&[BulkResult]> {
        self.bulk_results.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Returns the row at `index` or [`CrateDbError::RowIndex`].
    pub fn row(&self, index: usize) -> Result<&Row> {
        self.rows.get(index).ok_or(CrateDbError::RowIndex {
            index,
            len: self.rows.len(),
        })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Projects every row onto the named columns.
    ///
    /// Names are resolved once; names not present in the result are
    /// skipped, so the projected rows only contain the known columns in
    /// the requested order.
    pub fn select_columns<S: AsRef<str>>(&self, names: &[S]) -> Vec<Row> {
        let indexes: Vec<usize> = names
            .iter()
            .filter_map(|name| self.column_index(name.as_ref()))
            .collect();

        self.rows
            .iter()
            .map(|row| {
                indexes
                    .iter()
                    .map(|&idx| row.get(idx).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect()
    }

    /// Appends a row to the buffered rows.
    ///
    /// Neither the column shape nor `row_count`/`duration` are touched.
    pub fn append_row(&mut self, row: Row) {
        self.rows.push(row);
    }
}

impl FromStr for ResultSet {
    type Err = CrateDbError;

    fn from_str(body: &str) -> Result<Self> {
        Self::from_json(body)
    }
}

impl Index<usize> for ResultSet {
    type Output = Row;

    fn index(&self, index: usize) -> &Row {
        &self.rows[index]
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::{CrateDbError, ResultSet, Value};

    const RESULT: &str =
        r#"{"cols":["my_column","my_integer_col"],"rows":[["Foo",5],["Bar",5]],"rowcount":1,"duration":4}"#;
    const RESULT_WITH_ARRAY_COL: &str = r#"{"cols":["id","tags","title"],"rows":[[1,["awesome","freaky"],"My life with crate"]],"rowcount":1,"duration":2}"#;
    const RESULT_WITH_OBJECT: &str = r#"{"cols":["address","id","name"],"rows":[[{"street":"1010 W 2nd Ave","city":"Vancouver"},"fb7183ac-d049-462c-85a9-732aca59a1c1","Mad Max"]],"rowcount":1,"duration":3}"#;

    fn result_set() -> ResultSet {
        ResultSet::from_json(RESULT).expect("must parse")
    }

    #[test]
    fn parses_metadata() {
        let result = result_set();
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.duration(), 4.0);
        assert_eq!(result.columns(), ["my_column", "my_integer_col"]);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn indexes_rows() {
        let result = result_set();
        assert_eq!(result[1][0], Value::text("Bar"));
        assert_eq!(result.row(0).expect("row 0")[1], Value::Integer(5));
    }

    #[test]
    fn out_of_range_row_is_an_error() {
        let err = result_set().row(2).expect_err("must fail");
        assert!(matches!(err, CrateDbError::RowIndex { index: 2, len: 2 }));
        assert!(result_set().get(2).is_none());
    }

    #[test]
    fn iteration_restarts_from_first_row() {
        let result = result_set();
        let first: Vec<_> = result.iter().map(|row| row[0].clone()).collect();
        let second: Vec<_> = (&result).into_iter().map(|row| row[0].clone()).collect();
        assert_eq!(first, vec![Value::text("Foo"), Value::text("Bar")]);
        assert_eq!(first, second);
    }

    #[test]
    fn parses_array_column_into_array() {
        let result = ResultSet::from_json(RESULT_WITH_ARRAY_COL).expect("must parse");
        assert_eq!(
            result[0][1],
            Value::Array(vec![Value::text("awesome"), Value::text("freaky")])
        );
    }

    #[test]
    fn parses_object_column_into_object() {
        let result = ResultSet::from_json(RESULT_WITH_OBJECT).expect("must parse");
        let address = result[0][0].as_object().expect("must be an object");
        assert_eq!(address["street"], Value::text("1010 W 2nd Ave"));
        assert_eq!(address["city"], Value::text("Vancouver"));
    }

    #[test]
    fn decoding_is_repeatable() {
        let first = result_set();
        let second: ResultSet = RESULT.parse().expect("must parse");
        assert_eq!(first, second);
    }

    #[test]
    fn every_row_matches_column_count() {
        let result = ResultSet::from_json(RESULT_WITH_OBJECT).expect("must parse");
        assert!(result.iter().all(|row| row.len() == result.columns().len()));
    }

    #[test]
    fn select_columns_projects_rows() {
        let projected = result_set().select_columns(&["my_column"]);
        assert_eq!(
            projected,
            vec![vec![Value::text("Foo")], vec![Value::text("Bar")]]
        );
    }

    #[test]
    fn select_columns_skips_unknown_names() {
        let projected = result_set().select_columns(&["invalid", "my_integer_col", "my_column"]);
        assert_eq!(
            projected,
            vec![
                vec![Value::Integer(5), Value::text("Foo")],
                vec![Value::Integer(5), Value::text("Bar")],
            ]
        );
        assert!(result_set()
            .select_columns(&["missing"])
            .iter()
            .all(|row| row.is_empty()));
    }

    #[test]
    fn append_row_keeps_metadata() {
        let mut result = result_set();
        result.append_row(vec![Value::text("Baz"), Value::Integer(6)]);
        assert_eq!(result.len(), 3);
        assert_eq!(result[2][0], Value::text("Baz"));
        assert_eq!(result.row_count(), 1);
        assert_eq!(result.duration(), 4.0);
    }

    #[test]
    fn values_returns_all_rows() {
        let result = result_set();
        assert_eq!(result.values(), result.rows());
        assert_eq!(result.values().len(), 2);
    }

    #[test]
    fn debug_omits_rows() {
        let debug = format!("{:?}", result_set());
        assert!(debug.contains("row_count: 1"));
        assert!(!debug.contains("Foo"));
    }
}
