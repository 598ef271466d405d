use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;

use crate::db_types::OrderId;

// A 1-3 letter prefix that starts a word, at least one dash-like separator, then an alphanumeric suffix. The suffix
// may itself contain dash-like separators; they are dropped rather than ending the match.
const ORDER_ID_PATTERN: &str = r"(?i)(?:^|[^\p{L}\p{N}])(\p{L}{1,3})[ \-–—_]+([A-Z0-9]+(?:[\-–—_]+[A-Z0-9]+)*)";

fn order_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ORDER_ID_PATTERN).expect("order id pattern is a valid regex"))
}

/// Extracts the first well-formed order id from `text`, normalised to `PREFIX-SUFFIX` in upper case.
///
/// `"cn 1001"`, `"#kr—77"` and `"Order CN-1001 please"` all resolve. `"CN-1001-B"` resolves to `CN-1001B`, never to
/// the shorter `CN-1001`. Text without a separator between the prefix and the suffix (e.g. `"garbage"`) does not
/// resolve.
pub fn extract_order_id(text: &str) -> Option<OrderId> {
    order_id_regex().captures(text).map(|caps| {
        let prefix = caps[1].to_uppercase();
        let suffix = caps[2].chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>().to_uppercase();
        OrderId(format!("{prefix}-{suffix}"))
    })
}

/// Splits a free-text blob on commas and whitespace.
pub fn split_tokens(blob: &str) -> Vec<&str> {
    blob.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty()).collect()
}

/// Resolves each token to an order id, dropping tokens that do not parse and duplicates (first occurrence wins).
pub fn extract_order_ids<I, S>(tokens: I) -> Vec<OrderId>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    tokens
        .into_iter()
        .filter_map(|token| extract_order_id(token.as_ref()))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_ids() {
        assert_eq!(extract_order_id("cn-1001"), Some(OrderId("CN-1001".into())));
        assert_eq!(extract_order_id("  kr 55 "), Some(OrderId("KR-55".into())));
        assert_eq!(extract_order_id("Order #cn—7a, thanks"), Some(OrderId("CN-7A".into())));
        assert_eq!(extract_order_id("cn_x1"), Some(OrderId("CN-X1".into())));
        assert_eq!(extract_order_id("кр-12"), Some(OrderId("КР-12".into())));
        assert_eq!(extract_order_id("garbage"), None);
        assert_eq!(extract_order_id("garbage-1"), None);
        assert_eq!(extract_order_id("1001"), None);
        assert_eq!(extract_order_id(""), None);
    }

    #[test]
    fn suffixes_are_never_truncated() {
        assert_eq!(extract_order_id("CN-1001-B"), Some(OrderId("CN-1001B".into())));
        assert_eq!(extract_order_id("kr 20_24—7"), Some(OrderId("KR-20247".into())));
        assert_eq!(extract_order_id("CN-1001- B"), Some(OrderId("CN-1001".into())));
        assert_eq!(extract_order_id("CN-1001-"), Some(OrderId("CN-1001".into())));
        let ids = extract_order_ids(split_tokens("CN-1001-B, cn-1001"));
        assert_eq!(ids, vec![OrderId("CN-1001B".into()), OrderId("CN-1001".into())]);
    }

    #[test]
    fn bulk_tokens_are_deduplicated_in_order() {
        let ids = extract_order_ids(["cn-1", "garbage", "CN-1", "kr-9"]);
        assert_eq!(ids, vec![OrderId("CN-1".into()), OrderId("KR-9".into())]);
    }

    #[test]
    fn splitting_blobs() {
        let tokens = split_tokens("CN-1, kr-2\nCN-3\t,,  KR-4");
        assert_eq!(tokens, vec!["CN-1", "kr-2", "CN-3", "KR-4"]);
        let ids = extract_order_ids(split_tokens("cn-1 cn-1,kr-2 ???"));
        assert_eq!(ids, vec![OrderId("CN-1".into()), OrderId("KR-2".into())]);
    }
}
