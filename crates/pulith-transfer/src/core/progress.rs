use crate::data::{ActionType, ChunkWindow, Progress};

/// What the normalizer needs to know about the transfer in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizeContext {
    pub action: ActionType,
    pub chunk: Option<ChunkWindow>,
    /// Size of the whole upload source.
    pub file_size: Option<u64>,
}

/// Rewrite transport-reported upload counters to whole-file terms.
///
/// A chunked upload only ever sees its own window, so the total becomes the
/// file size and the current position is shifted by the chunk offset. When the
/// transport cannot tell the total but the file size is known, the file size is
/// used. Download counters pass through untouched.
pub fn normalize_progress(raw: Progress, ctx: &NormalizeContext) -> Progress {
    if ctx.action != ActionType::Upload {
        return raw;
    }

    match (ctx.chunk, ctx.file_size) {
        (Some(chunk), Some(file_size)) => Progress {
            upload_total: file_size,
            upload_now: chunk.offset.saturating_add(raw.upload_now),
            ..raw
        },
        (None, Some(file_size)) if raw.upload_total == 0 && file_size > 0 => Progress {
            upload_total: file_size,
            ..raw
        },
        _ => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload_ctx(chunk: Option<ChunkWindow>, file_size: Option<u64>) -> NormalizeContext {
        NormalizeContext {
            action: ActionType::Upload,
            chunk,
            file_size,
        }
    }

    #[test]
    fn test_chunked_upload_reports_whole_file() {
        let ctx = upload_ctx(
            Some(ChunkWindow {
                offset: 5000,
                size: 3000,
            }),
            Some(20000),
        );
        let adjusted = normalize_progress(Progress::upload(3000, 1200), &ctx);
        assert_eq!(adjusted.upload_total, 20000);
        assert_eq!(adjusted.upload_now, 6200);
    }

    #[test]
    fn test_unknown_total_uses_file_size() {
        let ctx = upload_ctx(None, Some(4096));
        let adjusted = normalize_progress(Progress::upload(0, 100), &ctx);
        assert_eq!(adjusted, Progress::upload(4096, 100));
    }

    #[test]
    fn test_known_total_passes_through() {
        let ctx = upload_ctx(None, Some(4096));
        let raw = Progress::upload(4096, 100);
        assert_eq!(normalize_progress(raw, &ctx), raw);
    }

    #[test]
    fn test_download_is_untouched() {
        let ctx = NormalizeContext {
            action: ActionType::Get,
            chunk: Some(ChunkWindow { offset: 10, size: 10 }),
            file_size: Some(100),
        };
        let raw = Progress::download(500, 20);
        assert_eq!(normalize_progress(raw, &ctx), raw);
    }

    #[test]
    fn test_download_counters_survive_chunk_rewrite() {
        let ctx = upload_ctx(Some(ChunkWindow { offset: 100, size: 50 }), Some(1000));
        let raw = Progress {
            download_total: 7,
            download_now: 3,
            upload_total: 50,
            upload_now: 50,
        };
        let adjusted = normalize_progress(raw, &ctx);
        assert_eq!(adjusted.download_total, 7);
        assert_eq!(adjusted.download_now, 3);
        assert_eq!(adjusted.upload_now, 150);
    }
}
