use crate::data::{HeaderItem, HeaderList};

const WHITESPACE: &[char] = &[' ', '\t', '\r', '\n'];

/// Split raw response header text into name/value pairs.
///
/// Each line is split on its first colon and both halves are trimmed. Lines
/// without a colon (status lines, blank separators) are dropped. Headers from
/// every response in a redirect chain are kept in received order.
pub fn parse_response_headers(raw: &str) -> HeaderList {
    raw.split('\n')
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            let name = name.trim_matches(WHITESPACE);
            if name.is_empty() {
                return None;
            }
            Some(HeaderItem::new(name, value.trim_matches(WHITESPACE)))
        })
        .collect()
}
