// Progress reporting for a pipeline run.

/// Snapshot emitted after every chunk read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Bytes consumed from the source so far.
    pub bytes_consumed: u64,
    /// Total size of the source.
    pub total: u64,
    /// True once `bytes_consumed >= total`.
    pub is_finished: bool,
    /// Completion percentage, 0..=100.
    pub percent: u8,
}

/// Percentage of `consumed` over `total`, rounded down and clamped to 100.
///
/// Rounding down means 100 is only reported once every byte is consumed.
/// A zero `total` is complete from the start and reports 100.
pub fn percent(consumed: u64, total: u64) -> u8 {
    if total == 0 || consumed >= total {
        return 100;
    }
    ((consumed as u128 * 100) / total as u128) as u8
}

/// Derives monotonic progress events for one run.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    consumed: u64,
    last_percent: u8,
}

impl ProgressTracker {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            consumed: 0,
            last_percent: 0,
        }
    }

    /// Record that the reader has reached `consumed` bytes.
    ///
    /// Neither the byte count nor the percentage ever goes backwards.
    pub fn advance(&mut self, consumed: u64) -> ProgressEvent {
        self.consumed = self.consumed.max(consumed);
        self.last_percent = self.last_percent.max(percent(self.consumed, self.total));
        ProgressEvent {
            bytes_consumed: self.consumed,
            total: self.total,
            is_finished: self.consumed >= self.total,
            percent: self.last_percent,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }
}
