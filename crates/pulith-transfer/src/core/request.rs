use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::data::{HeaderItem, HeaderList, ParamStore, RequestMethod};

/// Everything except RFC 3986 unreserved characters.
const URL_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-escape a string for use in a URL or urlencoded body.
///
/// ```
/// assert_eq!(pulith_transfer::core::escape("x y/z"), "x%20y%2Fz");
/// ```
pub fn escape(input: &str) -> String {
    utf8_percent_encode(input, URL_ENCODE_SET).to_string()
}

/// Urlencoded `name=value&` pairs from the non-file params, in order.
///
/// Every pair is followed by `&`, including the last one.
pub fn form_body(params: &ParamStore, escape: impl Fn(&str) -> String) -> String {
    params
        .text_params()
        .map(|p| format!("{}={}&", escape(&p.name), escape(&p.value)))
        .collect()
}

/// Serialize a request header for the transport's header list.
///
/// `Name: value` in general, `Name: ` (removal) for an empty value and `Name;`
/// for [`EMPTY_HEADER_VALUE`](crate::EMPTY_HEADER_VALUE).
pub fn header_line(item: &HeaderItem) -> String {
    if item.is_empty_value() {
        format!("{};", item.name)
    } else {
        format!("{}: {}", item.name, item.value)
    }
}

/// What a serialized header line asks the transport to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderDirective<'a> {
    Set { name: &'a str, value: &'a str },
    /// Send the name with an empty value.
    Empty { name: &'a str },
    /// Leave the header out, including one the transport would add itself.
    Remove { name: &'a str },
}

/// Inverse of [`header_line`], for transports consuming the header list.
pub fn parse_header_line(line: &str) -> Option<HeaderDirective<'_>> {
    if let Some((name, value)) = line.split_once(':') {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let value = value.trim();
        return Some(if value.is_empty() {
            HeaderDirective::Remove { name }
        } else {
            HeaderDirective::Set { name, value }
        });
    }

    let name = line.trim_end_matches(['\n', '\r']).strip_suffix(';')?.trim();
    (!name.is_empty()).then_some(HeaderDirective::Empty { name })
}

/// An explicit method string wins over the call's implicit method.
pub fn select_method(explicit: &str, implicit: RequestMethod) -> RequestMethod {
    RequestMethod::parse(explicit).unwrap_or(implicit)
}

/// Suppress `Expect: 100-continue` unless the caller set an `Expect` header.
///
/// Returns `true` when the override was added.
pub fn install_expect_override(headers: &mut HeaderList) -> bool {
    if headers.contains("Expect") {
        return false;
    }
    headers.push("Expect", "");
    true
}
