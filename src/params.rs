use crate::Value;

/// Bind values sent along with a statement.
///
/// A request carries either a single set of positional values (`args`) or
/// a list of value sets for batch execution (`bulk_args`), never both.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Params {
    /// Statement without bind values.
    #[default]
    None,
    /// Positional values mapped to `?` or `$n` placeholders.
    Positional(Vec<Value>),
    /// One value set per execution of the statement.
    Bulk(Vec<Vec<Value>>),
}

impl Params {
    /// Builds positional parameters.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Builds bulk parameters, one inner sequence per execution.
    pub fn bulk<I, R, V>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Bulk(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Self::None
    }
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Self::Positional(values)
    }
}

impl<const N: usize> From<[Value; N]> for Params {
    fn from(values: [Value; N]) -> Self {
        Self::Positional(values.into())
    }
}

impl From<Vec<Vec<Value>>> for Params {
    fn from(rows: Vec<Vec<Value>>) -> Self {
        Self::Bulk(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Params, Value};

    #[test]
    fn positional_from_array() {
        let params: Params = [Value::integer(1), Value::text("Post 1")].into();
        match params {
            Params::Positional(values) => assert_eq!(values.len(), 2),
            _ => panic!("expected positional"),
        }
    }

    #[test]
    fn unit_means_no_params() {
        assert_eq!(Params::from(()), Params::None);
        assert_eq!(Params::default(), Params::None);
    }

    #[test]
    fn bulk_builder_keeps_row_order() {
        let params = Params::bulk([vec![1, 2], vec![3]]);
        match params {
            Params::Bulk(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0], vec![Value::Integer(1), Value::Integer(2)]);
                assert_eq!(rows[1], vec![Value::Integer(3)]);
            }
            _ => panic!("expected bulk"),
        }
    }

    #[test]
    fn positional_builder_converts_scalars() {
        let params = Params::positional(["doc", "posts"]);
        assert_eq!(
            params,
            Params::Positional(vec![Value::text("doc"), Value::text("posts")])
        );
    }
}
