/// Byte counters reported during a transfer.
///
/// Totals are zero when unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub download_total: u64,
    pub download_now: u64,
    pub upload_total: u64,
    pub upload_now: u64,
}

impl Progress {
    pub fn download(total: u64, now: u64) -> Self {
        Self {
            download_total: total,
            download_now: now,
            ..Self::default()
        }
    }

    pub fn upload(total: u64, now: u64) -> Self {
        Self {
            upload_total: total,
            upload_now: now,
            ..Self::default()
        }
    }

    /// Upload completion in percent, `None` while the total is unknown.
    #[must_use]
    pub fn upload_percentage(&self) -> Option<f64> {
        (self.upload_total > 0).then(|| self.upload_now as f64 / self.upload_total as f64 * 100.0)
    }

    #[must_use]
    pub fn download_percentage(&self) -> Option<f64> {
        (self.download_total > 0)
            .then(|| self.download_now as f64 / self.download_total as f64 * 100.0)
    }
}

/// Returned by a progress callback to keep going or stop the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressControl {
    #[default]
    Continue,
    Abort,
}
