//! Course progress derived from the position in the resource sequence

use serde::Serialize;

/// Percentage of the course reached when viewing resource `index` of `total`.
///
/// `None` while the resource list is empty or the index is unknown.
pub fn percentage(index: usize, total: usize) -> Option<f64> {
    if total == 0 {
        return None;
    }
    Some(((index + 1) as f64 / total as f64) * 100.0)
}

/// Position of the open resource inside its course
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CourseProgress {
    pub index: usize,
    pub total: usize,
}

impl CourseProgress {
    pub fn new(index: usize, total: usize) -> Self {
        Self { index, total }
    }

    pub fn percent(&self) -> Option<f64> {
        percentage(self.index, self.total)
    }

    /// Whole-number value shown on the progress bar
    pub fn rounded(&self) -> u8 {
        self.percent()
            .map(|p| p.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(0)
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.total > 0 && self.index + 1 == self.total
    }

    /// Text bar used by the terminal views, e.g. `[#####-----] 50%`
    pub fn render_bar(&self, width: usize) -> String {
        let filled = self
            .percent()
            .map(|p| ((p / 100.0) * width as f64).round() as usize)
            .unwrap_or(0)
            .min(width);
        format!(
            "[{}{}] {}%",
            "#".repeat(filled),
            "-".repeat(width - filled),
            self.rounded()
        )
    }
}
