use indicatif::{ProgressBar, ProgressStyle};

/// Receives `(completed, total)` after every unit of work.
pub trait ProgressSink: Send + Sync {
    fn update(&self, completed: usize, total: usize);

    fn finish(&self, _message: &str) {}
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _completed: usize, _total: usize) {}
}

impl ProgressSink for ProgressBar {
    fn update(&self, completed: usize, total: usize) {
        self.set_length(total as u64);
        self.set_position(completed as u64);
    }

    fn finish(&self, message: &str) {
        self.finish_with_message(message.to_string());
    }
}

pub fn phase_bar(label: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar().template("{msg:12} {bar:40} {pos}/{len}") {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb.set_message(label.to_string());
    pb
}
