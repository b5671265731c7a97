//! Per-transfer state owned by a single client.

use std::fmt;
use std::path::PathBuf;

/// Kind of transfer in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionType {
    #[default]
    None,
    Get,
    Post,
    Upload,
}

/// Where the response body goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    #[default]
    Memory,
    File(PathBuf),
}

/// Byte range `[offset, offset + size)` of a file sent as the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkWindow {
    pub offset: u64,
    pub size: u64,
}

impl ChunkWindow {
    /// A window exists only when both bounds are set and the size is non-zero.
    pub fn from_bounds(offset: Option<u64>, size: Option<u64>) -> Option<Self> {
        match (offset, size) {
            (Some(offset), Some(size)) if size > 0 => Some(Self { offset, size }),
            _ => None,
        }
    }

    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

/// Phases of one `do_*` call.
///
/// Idle → Configuring → InFlight → Completing → Idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferPhase {
    #[default]
    Idle,
    /// Assembling headers, method and body options.
    Configuring,
    /// The transport is performing the exchange.
    InFlight,
    /// Parsing headers and resetting per-transfer state.
    Completing,
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferPhase::Idle => write!(f, "Idle"),
            TransferPhase::Configuring => write!(f, "Configuring"),
            TransferPhase::InFlight => write!(f, "InFlight"),
            TransferPhase::Completing => write!(f, "Completing"),
        }
    }
}

/// Everything that lives for exactly one transfer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransferState {
    pub action: ActionType,
    pub output: OutputTarget,
    /// Explicit method string; empty selects the call's implicit method.
    pub method: String,
    pub url: String,
    /// Full size of the upload source, when one is known.
    pub current_file_size: Option<u64>,
    /// Size declared to the transport for the request body.
    pub current_upload_size: Option<u64>,
    pub chunk_offset: Option<u64>,
    pub chunk_size: Option<u64>,
}

impl TransferState {
    pub fn chunk_window(&self) -> Option<ChunkWindow> {
        ChunkWindow::from_bounds(self.chunk_offset, self.chunk_size)
    }

    /// Drop everything except the URL, which persists across transfers.
    pub fn reset(&mut self) {
        let url = std::mem::take(&mut self.url);
        *self = Self {
            url,
            ..Self::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_window_requires_both_bounds() {
        assert_eq!(ChunkWindow::from_bounds(None, Some(10)), None);
        assert_eq!(ChunkWindow::from_bounds(Some(5), None), None);
        assert_eq!(ChunkWindow::from_bounds(Some(5), Some(0)), None);

        let window = ChunkWindow::from_bounds(Some(0), Some(10)).unwrap();
        assert_eq!(window.end(), 10);
    }

    #[test]
    fn test_reset_keeps_url() {
        let mut state = TransferState {
            action: ActionType::Upload,
            output: OutputTarget::File("out.bin".into()),
            method: "PUT".into(),
            url: "http://example.test/".into(),
            current_file_size: Some(100),
            current_upload_size: Some(10),
            chunk_offset: Some(20),
            chunk_size: Some(10),
        };
        state.reset();

        assert_eq!(state.url, "http://example.test/");
        assert_eq!(state.action, ActionType::None);
        assert_eq!(state.output, OutputTarget::Memory);
        assert!(state.method.is_empty());
        assert_eq!(state.chunk_window(), None);
        assert_eq!(state.current_upload_size, None);
    }
}
