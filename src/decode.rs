use crate::{
    wire::{SqlRequest, SqlResponse},
    BulkResult, CrateDbError, Params, ResultSet, Value,
};

pub(crate) fn build_sql_request(sql: &str, params: Params) -> Result<SqlRequest, CrateDbError> {
    match params {
        Params::None => Ok(SqlRequest {
            stmt: sql.to_owned(),
            args: None,
            bulk_args: None,
        }),
        Params::Positional(values) => Ok(SqlRequest {
            stmt: sql.to_owned(),
            args: Some(encode_values(values)?),
            bulk_args: None,
        }),
        Params::Bulk(rows) => {
            let bulk_args = rows
                .into_iter()
                .map(encode_values)
                .collect::<Result<Vec<_>, _>>()?;

            Ok(SqlRequest {
                stmt: sql.to_owned(),
                args: None,
                bulk_args: Some(bulk_args),
            })
        }
    }
}

pub(crate) fn decode_result_set(body: &str) -> Result<ResultSet, CrateDbError> {
    let response = serde_json::from_str::<SqlResponse>(body).map_err(|err| {
        CrateDbError::MalformedResult(format!("invalid sql response JSON: {err}; body: {body}"))
    })?;

    let bulk_results: Option<Vec<BulkResult>> = response.results.map(|results| {
        results
            .into_iter()
            .map(|result| BulkResult {
                row_count: result.rowcount,
                error_message: result.error_message,
            })
            .collect()
    });

    let (rows, row_count) = match bulk_results.as_deref() {
        Some(results) => {
            let row_count = response.rowcount.unwrap_or_else(|| {
                results.iter().map(|result| result.row_count.max(0)).sum()
            });
            (response.rows.unwrap_or_default(), row_count)
        }
        None => match (response.rows, response.rowcount) {
            (Some(rows), Some(row_count)) => (rows, row_count),
            _ => {
                return Err(CrateDbError::MalformedResult(format!(
                    "sql response has neither rows and rowcount nor bulk results; body: {body}"
                )))
            }
        },
    };

    let rows = rows
        .into_iter()
        .map(|row| row.into_iter().map(Value::from).collect())
        .collect();

    Ok(ResultSet::new(
        response.cols,
        rows,
        row_count,
        response.duration,
        bulk_results,
    ))
}

fn encode_values(values: Vec<Value>) -> Result<Vec<serde_json::Value>, CrateDbError> {
    values.into_iter().map(encode_value).collect()
}

pub(crate) fn encode_value(value: Value) -> Result<serde_json::Value, CrateDbError> {
    match value {
        Value::Null => Ok(serde_json::Value::Null),
        Value::Bool(value) => Ok(serde_json::Value::Bool(value)),
        Value::Integer(value) => Ok(value.into()),
        Value::Float(value) => serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .ok_or_else(|| {
                CrateDbError::Encode(format!("non-finite float value '{value}' is unsupported"))
            }),
        Value::Text(value) => Ok(serde_json::Value::String(value)),
        Value::Array(values) => encode_values(values).map(serde_json::Value::Array),
        Value::Object(entries) => entries
            .into_iter()
            .map(|(key, value)| encode_value(value).map(|value| (key, value)))
            .collect::<Result<serde_json::Map<_, _>, _>>()
            .map(serde_json::Value::Object),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{decode, CrateDbError, Params, Value};

    #[test]
    fn build_without_params_omits_arg_keys() {
        let request = decode::build_sql_request("select 1", Params::None).expect("must build");
        let body = serde_json::to_value(&request).expect("must serialize");
        assert_eq!(body, json!({ "stmt": "select 1" }));
    }

    #[test]
    fn build_positional_sets_args_only() {
        let request = decode::build_sql_request(
            "insert into t_test (id, tags) values (?, ?)",
            Params::Positional(vec![Value::integer(1), Value::array(["awesome", "freaky"])]),
        )
        .expect("must build");
        let body = serde_json::to_value(&request).expect("must serialize");

        assert_eq!(
            body,
            json!({
                "stmt": "insert into t_test (id, tags) values (?, ?)",
                "args": [1, ["awesome", "freaky"]]
            })
        );
    }

    #[test]
    fn build_bulk_sets_bulk_args_only() {
        let request = decode::build_sql_request(
            "insert into t_test (id, name) values (?, ?)",
            Params::bulk([
                vec![Value::integer(1), Value::text("Post 1")],
                vec![Value::integer(2), Value::text("Post 2")],
            ]),
        )
        .expect("must build");
        let body = serde_json::to_value(&request).expect("must serialize");

        assert!(body.get("args").is_none());
        assert_eq!(body["bulk_args"], json!([[1, "Post 1"], [2, "Post 2"]]));
    }

    #[test]
    fn build_rejects_non_finite_float() {
        let err = decode::build_sql_request(
            "select ?",
            Params::Positional(vec![Value::object([("score", f64::NAN)])]),
        )
        .expect_err("must fail");

        assert!(matches!(err, CrateDbError::Encode(_)));
    }

    #[test]
    fn decode_rejects_missing_keys() {
        let err = decode::decode_result_set(r#"{"cols":["a"],"rows":[[1]]}"#)
            .expect_err("must fail");
        assert!(matches!(err, CrateDbError::MalformedResult(_)));
    }

    #[test]
    fn decode_rejects_rows_without_rowcount() {
        let err = decode::decode_result_set(r#"{"cols":["a"],"rows":[[1]],"duration":1}"#)
            .expect_err("must fail");
        assert!(matches!(err, CrateDbError::MalformedResult(_)));
    }

    #[test]
    fn decode_rejects_non_object_reply() {
        let err = decode::decode_result_set("[1, 2]").expect_err("must fail");
        assert!(matches!(err, CrateDbError::MalformedResult(_)));
    }

    #[test]
    fn decode_bulk_reply_sums_successful_rowcounts() {
        let result = decode::decode_result_set(
            r#"{"cols":[],"duration":2.5,"results":[{"rowcount":1},{"rowcount":-2,"error_message":"DuplicateKeyException"},{"rowcount":1}]}"#,
        )
        .expect("must decode");

        assert!(result.is_empty());
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.duration(), 2.5);

        let results = result.bulk_results().expect("must carry bulk results");
        assert_eq!(results.len(), 3);
        assert!(!results[0].is_failure());
        assert!(results[1].is_failure());
        assert_eq!(
            results[1].error_message.as_deref(),
            Some("DuplicateKeyException")
        );
    }

    #[test]
    fn decode_single_reply_has_no_bulk_results() {
        let result = decode::decode_result_set(
            r#"{"cols":["a"],"rows":[[1]],"rowcount":1,"duration":1}"#,
        )
        .expect("must decode");
        assert!(result.bulk_results().is_none());
    }

    #[test]
    fn decode_rejects_invalid_json() {
        let err = decode::decode_result_set("<html>bad gateway</html>").expect_err("must fail");
        assert!(matches!(err, CrateDbError::MalformedResult(_)));
    }

    #[test]
    fn decode_accepts_negative_rowcount_and_float_duration() {
        let result = decode::decode_result_set(
            r#"{"cols":[],"rows":[],"rowcount":-1,"duration":1.25}"#,
        )
        .expect("must decode");
        assert_eq!(result.row_count(), -1);
        assert_eq!(result.duration(), 1.25);
        assert!(result.is_empty());
    }
}
