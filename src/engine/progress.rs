use std::collections::HashMap;

use crate::util::progress_percent;

/// Resume checkpoints per batch: one every tenth of the files.
pub const SAVE_POINTS_PER_BATCH: usize = 10;

/// Byte- and file-weighted completion of the current batch.
#[derive(Debug, Default)]
pub(crate) struct Progress {
    total_to_download: usize,
    total_wait_to_download: usize,
    percent: f32,
    percent_by_file: f32,
    downloaded: HashMap<String, u64>,
    total_size: u64,
    size_collected: usize,
    total_enabled: bool,
    next_save_point: usize,
}

impl Progress {
    /// Start a batch of `units` files.
    pub(crate) fn reset(&mut self, units: usize) {
        *self = Self {
            total_to_download: units,
            total_wait_to_download: units,
            ..Self::default()
        };
    }

    /// Sizes known from the manifest before any transfer starts.
    pub(crate) fn seed_known_sizes(&mut self, bytes: u64, units: usize) {
        self.total_size += bytes;
        self.size_collected += units;
        self.total_enabled = self.size_collected == self.total_to_download;
    }

    /// Record bytes received for a unit. Returns the new byte percentage when
    /// it crosses an integer boundary and the total is known.
    ///
    /// `first_report` is set when the unit had not reported before.
    pub(crate) fn record_bytes(
        &mut self,
        id: &str,
        received: u64,
        expected: Option<u64>,
        unit_size: u64,
    ) -> (Option<f32>, bool) {
        let first_report = !self.downloaded.contains_key(id);
        self.downloaded.insert(id.to_owned(), received);
        if first_report && unit_size == 0 {
            self.total_size += expected.unwrap_or(0);
            self.size_collected += 1;
            if self.size_collected == self.total_to_download {
                self.total_enabled = true;
            }
        }

        if !self.total_enabled {
            return (None, first_report);
        }
        let total_downloaded: u64 = self.downloaded.values().sum();
        let current = progress_percent(total_downloaded, Some(self.total_size)).min(100.0);
        if current as i32 != self.percent as i32 {
            self.percent = current;
            return (Some(current), first_report);
        }
        (None, first_report)
    }

    /// Progress of a control document (version or manifest) download.
    pub(crate) fn record_document(&mut self, received: u64, expected: Option<u64>) -> f32 {
        self.percent = match expected {
            Some(total) if total > 0 => progress_percent(received, Some(total)),
            _ => self.percent_by_file,
        };
        self.percent
    }

    /// One unit completed successfully; returns the file-count percentage.
    pub(crate) fn complete_one(&mut self) -> f32 {
        self.total_wait_to_download = self.total_wait_to_download.saturating_sub(1);
        let done = self.total_to_download - self.total_wait_to_download;
        self.percent_by_file = 100.0 * done as f32 / self.total_to_download.max(1) as f32;
        self.percent_by_file
    }

    /// One unit finished with an error.
    pub(crate) fn fail_one(&mut self) {
        self.total_wait_to_download = self.total_wait_to_download.saturating_sub(1);
    }

    pub(crate) fn is_drained(&self) -> bool {
        self.total_wait_to_download == 0
    }

    /// Whether file progress passed the next save point; advances it if so.
    pub(crate) fn checkpoint_due(&mut self) -> bool {
        let done = self.total_to_download - self.total_wait_to_download;
        // done / total > next / SAVE_POINTS_PER_BATCH, kept in integers.
        if done * SAVE_POINTS_PER_BATCH > self.next_save_point * self.total_to_download {
            self.next_save_point += 1;
            return true;
        }
        false
    }

    pub(crate) fn percent(&self) -> f32 {
        self.percent
    }

    pub(crate) fn percent_by_file(&self) -> f32 {
        self.percent_by_file
    }

    pub(crate) fn total_to_download(&self) -> usize {
        self.total_to_download
    }

    pub(crate) fn waiting(&self) -> usize {
        self.total_wait_to_download
    }
}
