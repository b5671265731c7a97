//! Query parameters and headers accumulated between transfers.

use std::path::Path;

/// Header value meaning "send the header name with no value".
///
/// An empty string means the opposite: the header is removed from the request.
pub const EMPTY_HEADER_VALUE: &str = "\n";

/// A form field or file attachment for the next transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParam {
    pub name: String,
    /// Field value, or the path on disk when `is_file` is set.
    pub value: String,
    pub is_file: bool,
    /// File name reported to the server for file params.
    pub display_name: String,
    pub content_type: String,
}

impl QueryParam {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            is_file: false,
            display_name: String::new(),
            content_type: String::new(),
        }
    }

    pub fn file(
        name: impl Into<String>,
        path: impl Into<String>,
        display_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: path.into(),
            is_file: true,
            display_name: display_name.into(),
            content_type: content_type.into(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.is_file.then(|| Path::new(&self.value))
    }
}

/// Ordered list of query params. Duplicate names are kept and all are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamStore {
    params: Vec<QueryParam>,
}

impl ParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, param: QueryParam) {
        self.params.push(param);
    }

    pub fn add_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.push(QueryParam::text(name, value));
    }

    pub fn add_file(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
        display_name: impl Into<String>,
        content_type: impl Into<String>,
    ) {
        self.push(QueryParam::file(name, path, display_name, content_type));
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryParam> {
        self.params.iter()
    }

    /// Non-file params in insertion order.
    pub fn text_params(&self) -> impl Iterator<Item = &QueryParam> {
        self.params.iter().filter(|p| !p.is_file)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn clear(&mut self) {
        self.params.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderItem {
    pub name: String,
    pub value: String,
}

impl HeaderItem {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// An empty value asks for the header to be left out of the request.
    pub fn is_removal(&self) -> bool {
        self.value.is_empty()
    }

    pub fn is_empty_value(&self) -> bool {
        self.value == EMPTY_HEADER_VALUE
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Ordered header collection with case-insensitive lookup.
///
/// Used both for the caller's request headers and for parsed response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    items: Vec<HeaderItem>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.items.push(HeaderItem::new(name, value));
    }

    /// First value whose name matches `name`, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|h| h.is_named(name))
            .map(|h| h.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|h| h.is_named(name))
    }

    pub fn get_index(&self, index: usize) -> Option<&HeaderItem> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeaderItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl FromIterator<HeaderItem> for HeaderList {
    fn from_iter<I: IntoIterator<Item = HeaderItem>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
