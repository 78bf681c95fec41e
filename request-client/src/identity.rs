use std::collections::HashMap;
use std::fmt::{self, Display};

/// Scalar value of a query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(value) => f.write_str(value),
            ParamValue::Integer(value) => write!(f, "{}", value),
            // `1.0` renders as `1`
            ParamValue::Float(value) => write!(f, "{}", value),
            ParamValue::Bool(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Integer(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// Query parameters of a request. Iteration order is irrelevant, identities
/// are always built from the sorted encoded keys.
pub type Params = HashMap<String, ParamValue>;

/// Build the canonical identity of a GET request: the base url followed by
/// the percent-encoded parameters sorted by encoded key.
///
/// Two parameter sets holding the same pairs always produce the same
/// identity. Without parameters the base url is returned untouched.
pub fn build_identity(base_url: &str, params: Option<&Params>) -> String {
    let params = match params {
        Some(params) if !params.is_empty() => params,
        _ => return base_url.to_string(),
    };

    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| {
            (
                urlencoding::encode(key).into_owned(),
                urlencoding::encode(&value.to_string()).into_owned(),
            )
        })
        .collect();
    encoded.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut identity = String::from(base_url);
    for (index, (key, value)) in encoded.iter().enumerate() {
        identity.push(if index == 0 { '?' } else { '&' });
        identity.push_str(key);
        identity.push('=');
        identity.push_str(value);
    }
    identity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, ParamValue)]) -> Params {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_identity_is_order_independent() {
        let first = params(&[("b", 2.into()), ("a", 1.into())]);
        let second = params(&[("a", 1.into()), ("b", 2.into())]);

        assert_eq!(build_identity("/x", Some(&first)), "/x?a=1&b=2");
        assert_eq!(
            build_identity("/x", Some(&first)),
            build_identity("/x", Some(&second))
        );
    }

    #[test]
    fn test_identity_without_params() {
        assert_eq!(build_identity("/x", None), "/x");
        assert_eq!(build_identity("/x", Some(&Params::new())), "/x");
    }

    #[test]
    fn test_identity_percent_encodes_keys_and_values() {
        let query = params(&[("q", "a b".into())]);
        assert_eq!(build_identity("/search", Some(&query)), "/search?q=a%20b");

        let tricky = params(&[("a&b", "c=d".into())]);
        assert_eq!(build_identity("/x", Some(&tricky)), "/x?a%26b=c%3Dd");
    }

    #[test]
    fn test_identity_renders_scalars() {
        let scalars = params(&[
            ("flag", true.into()),
            ("ratio", 1.5.into()),
            ("whole", 2.0.into()),
            ("count", (-3).into()),
        ]);
        assert_eq!(
            build_identity("/x", Some(&scalars)),
            "/x?count=-3&flag=true&ratio=1.5&whole=2"
        );
    }

    #[test]
    fn test_identity_sorts_by_encoded_key() {
        // raw "a-" < "a/", encoded "a%2F" < "a-"
        let query = params(&[("a-", "2".into()), ("a/", "1".into())]);
        assert_eq!(build_identity("/x", Some(&query)), "/x?a%2F=1&a-=2");
    }
}
