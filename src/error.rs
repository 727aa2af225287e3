/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum CrateDbError {
    /// Network or request execution error from `reqwest` (refused
    /// connection, DNS failure, timeout).
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status from the SQL endpoint with raw response body.
    #[error("query failed with http {status}: {body}")]
    Query { status: u16, body: String },
    /// A successful response whose body does not have the result shape.
    #[error("malformed result: {0}")]
    MalformedResult(String),
    /// Row access outside of the buffered result rows.
    #[error("row index {index} out of range for result with {len} rows")]
    RowIndex { index: usize, len: usize },
    /// A bind value that cannot be represented in the JSON request body.
    #[error("encode error: {0}")]
    Encode(String),
}
