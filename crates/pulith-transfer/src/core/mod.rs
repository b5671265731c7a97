//! Pure transformations for transfers.
//!
//! Nothing here touches the network or the filesystem.

mod headers;
mod progress;
mod request;

pub use headers::parse_response_headers;
pub use progress::{NormalizeContext, normalize_progress};
pub use request::{
    HeaderDirective, escape, form_body, header_line, install_expect_override, parse_header_line,
    select_method,
};
