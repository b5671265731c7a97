use indicatif::{ProgressBar, ProgressStyle};
use once_cell::sync::Lazy;
use pulith_transfer::{Progress, ProgressControl};

const PB_STYLE: &str = "{spinner:.blue} {prefix:>10.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const PB_CHARS: &str = "█▓▒░  ";

static PB_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    let pb_style = match ProgressStyle::with_template(PB_STYLE) {
        Ok(pb_style) => pb_style.tick_chars(TICK).progress_chars(PB_CHARS),
        Err(_) => return None,
    };

    Some(pb_style)
});

/// Progress bar fed from transfer callbacks. Shows upload progress while a body
/// is going out and switches to the download once bytes come back.
#[derive(Debug, Clone)]
pub struct TransferTracker {
    pb: ProgressBar,
}

impl TransferTracker {
    pub fn new(prefix: &str) -> Self {
        let pb = ProgressBar::new(0);
        let pb = match PB_TEMPLATE.as_ref() {
            Some(style) => pb.with_style(style.clone()),
            None => pb,
        };
        pb.set_prefix(prefix.to_string());
        Self { pb }
    }

    /// Callback for [`TransferClient::set_progress_callback`](pulith_transfer::TransferClient::set_progress_callback).
    pub fn callback(&self) -> impl FnMut(&Progress) -> ProgressControl + Send + 'static {
        let pb = self.pb.clone();
        move |progress: &Progress| {
            let (total, now) = if progress.download_now > 0 || progress.download_total > 0 {
                (progress.download_total, progress.download_now)
            } else {
                (progress.upload_total, progress.upload_now)
            };
            if total > 0 {
                pb.set_length(total);
            }
            pb.set_position(now);
            ProgressControl::Continue
        }
    }

    pub fn finish(self) {
        self.pb.finish_and_clear();
    }
}
