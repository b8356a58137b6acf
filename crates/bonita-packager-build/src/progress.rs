use indicatif::{ProgressBar, ProgressStyle};

/// ビルド中のスピナー表示（非verbose時）
pub struct BuildProgress {
    progress_bar: ProgressBar,
}

impl BuildProgress {
    pub fn new(tag: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            pb.set_style(style);
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        pb.set_message(format!("Building {}...", tag));

        Self { progress_bar: pb }
    }

    /// ビルドの `stream` 行を反映（ステップ行のみ表示）
    pub fn update(&self, line: &str) {
        let line = line.trim();
        if line.starts_with("Step ") || line.starts_with('#') {
            self.progress_bar.set_message(line.to_string());
        }
    }

    pub fn finish_success(&self) {
        self.progress_bar.finish_with_message("Build completed ✓");
    }

    pub fn finish_error(&self, error: &str) {
        self.progress_bar
            .finish_with_message(format!("Build failed: {}", error));
    }
}
