//! Data types for transfer operations.
//!
//! Parameters and headers accumulated between calls, the options handed to a
//! transport, per-transfer state and client configuration. Nothing in here
//! performs I/O.

pub mod config;
pub mod options;
pub mod params;
pub mod progress;
pub mod transfer;

pub use config::{ClientConfig, ProxyConfig};
pub use options::{FormPart, ProxyKind, RawValue, RequestBody, RequestMethod, TransportOption};
pub use params::{EMPTY_HEADER_VALUE, HeaderItem, HeaderList, ParamStore, QueryParam};
pub use progress::{Progress, ProgressControl};
pub use transfer::{ActionType, ChunkWindow, OutputTarget, TransferPhase, TransferState};
