use std::str::FromStr;

use thiserror::Error;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Splits a separated list (e.g. `"CN, KR,,JP"`) into its trimmed, non-empty items.
pub fn parse_list(value: &str, separator: char) -> Vec<String> {
    value.split(separator).map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{item}' is not a valid numeric identifier")]
pub struct ListParseError {
    pub item: String,
}

/// Parses a comma-separated list of numeric identifiers. A single bad item fails the whole list.
pub fn parse_id_list<T: FromStr>(value: &str) -> Result<Vec<T>, ListParseError> {
    parse_list(value, ',')
        .into_iter()
        .map(|item| item.parse::<T>().map_err(|_| ListParseError { item }))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boolean_flags() {
        assert!(parse_boolean_flag(Some("Yes".into()), false));
        assert!(!parse_boolean_flag(Some(" off ".into()), true));
        assert!(parse_boolean_flag(Some("maybe".into()), true));
        assert!(!parse_boolean_flag(None, false));
    }

    #[test]
    fn lists() {
        assert_eq!(parse_list(" CN, KR,, ", ','), vec!["CN", "KR"]);
        assert!(parse_list("", ',').is_empty());
        assert_eq!(parse_list("a|b", '|'), vec!["a", "b"]);
    }

    #[test]
    fn id_lists() {
        assert_eq!(parse_id_list::<i64>("1, 22 ,333").unwrap(), vec![1, 22, 333]);
        let err = parse_id_list::<i64>("1,abc").unwrap_err();
        assert_eq!(err.item, "abc");
    }
}
