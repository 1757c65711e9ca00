//! Inventory list filters
//!
//! Pure helpers applied to an inventory snapshot before it is returned
//! to a client. Both filters preserve the input list's order and
//! compose in either direction.

use regex::Regex;
use seriesio_common::{Error, Result};
use std::collections::HashSet;

/// Keep the names matching a regex pattern
///
/// An invalid pattern is a client error; the input is returned
/// untouched only through the error path (the caller keeps its list).
pub fn filter_regex(pattern: &str, names: &[String]) -> Result<Vec<String>> {
    let re = Regex::new(pattern).map_err(|e| Error::Pattern(e.to_string()))?;
    Ok(names
        .iter()
        .filter(|name| re.is_match(name))
        .cloned()
        .collect())
}

/// Keep the names also present in `requested`, preserving `names` order
#[must_use]
pub fn filter_list(requested: &[String], names: &[String]) -> Vec<String> {
    let wanted: HashSet<&str> = requested.iter().map(String::as_str).collect();
    names
        .iter()
        .filter(|name| wanted.contains(name.as_str()))
        .cloned()
        .collect()
}

/// Decode the `list=` request parameter, a JSON array of metric names
pub fn decode_name_list(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| Error::ListDecode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_filter_regex_matches() {
        let input = names(&["abc", "xyz"]);
        assert_eq!(filter_regex("^a", &input).unwrap(), names(&["abc"]));
        // Untouched input still usable after filtering
        assert_eq!(input.len(), 2);
    }

    #[test]
    fn test_filter_regex_preserves_order() {
        let input = names(&["b.cpu", "a.cpu", "a.mem"]);
        assert_eq!(
            filter_regex("cpu$", &input).unwrap(),
            names(&["b.cpu", "a.cpu"])
        );
    }

    #[test]
    fn test_filter_regex_invalid_pattern() {
        let input = names(&["abc"]);
        let err = filter_regex("(", &input).unwrap_err();
        assert!(matches!(err, Error::Pattern(_)));
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn test_filter_list_intersection() {
        let requested = names(&["abc"]);
        let input = names(&["abc", "xyz"]);
        assert_eq!(filter_list(&requested, &input), names(&["abc"]));
    }

    #[test]
    fn test_filter_list_preserves_inventory_order() {
        let requested = names(&["z", "a", "m"]);
        let input = names(&["a", "m", "z"]);
        assert_eq!(filter_list(&requested, &input), names(&["a", "m", "z"]));
    }

    #[test]
    fn test_decode_name_list() {
        assert_eq!(
            decode_name_list(r#"["a.b","c.d"]"#).unwrap(),
            names(&["a.b", "c.d"])
        );

        let err = decode_name_list("a,b,c").unwrap_err();
        assert!(matches!(err, Error::ListDecode(_)));
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn test_filters_compose() {
        let input = names(&["servers.web01.cpu", "servers.web02.cpu", "servers.web01.mem"]);
        let by_regex = filter_regex("cpu$", &input).unwrap();
        let by_list = filter_list(&names(&["servers.web01.cpu"]), &by_regex);
        assert_eq!(by_list, names(&["servers.web01.cpu"]));
    }
}
