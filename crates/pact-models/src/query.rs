//! Query string handling
//!
//! Queries are kept as an insertion-ordered multi-map so that repeated keys
//! (`?tag=a&tag=b`) survive and reports list parameters in the order they
//! were written.

use indexmap::IndexMap;

/// Ordered multi-map of query parameter name to values
pub type QueryParams = IndexMap<String, Vec<String>>;

/// Parse a raw (percent-encoded) query string, with or without a leading `?`
pub fn parse_query(raw: &str) -> QueryParams {
    let raw = raw.strip_prefix('?').unwrap_or(raw);
    let mut params = QueryParams::new();
    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        params
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    params
}

/// Render a multi-map back into an encoded query string (no leading `?`)
pub fn encode_query(params: &QueryParams) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, values) in params {
        for value in values {
            serializer.append_pair(key, value);
        }
    }
    serializer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repeated_keys() {
        let params = parse_query("tag=a&active=true&tag=b");
        assert_eq!(params["tag"], vec!["a".to_string(), "b".to_string()]);
        assert_eq!(params["active"], vec!["true".to_string()]);
        let keys: Vec<_> = params.keys().cloned().collect();
        assert_eq!(keys, vec!["tag", "active"]);
    }

    #[test]
    fn test_parse_decodes_and_strips_question_mark() {
        let params = parse_query("?name=John%20Doe&q=a+b");
        assert_eq!(params["name"], vec!["John Doe".to_string()]);
        assert_eq!(params["q"], vec!["a b".to_string()]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_query("").is_empty());
        assert!(parse_query("?").is_empty());
    }

    #[test]
    fn test_encode() {
        let params = parse_query("b=2&a=1&b=3");
        assert_eq!(encode_query(&params), "b=2&b=3&a=1");
    }
}
