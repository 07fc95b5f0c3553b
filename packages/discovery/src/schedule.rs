//! Progressive load schedule.
//!
//! Early rounds are small so the first results render quickly; once the
//! user keeps scrolling, pages grow to cut round trips.

/// Page-size schedule keyed by the session's round counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSchedule {
    /// `limit` for the first page of every fresh search.
    pub first_page_limit: u32,
    /// Page size while `round < early_rounds`.
    pub early_page_size: u32,
    pub early_rounds: u32,
    /// Page size once the early rounds are done.
    pub steady_page_size: u32,
}

impl Default for LoadSchedule {
    fn default() -> Self {
        Self {
            first_page_limit: 5,
            early_page_size: 5,
            early_rounds: 3,
            steady_page_size: 10,
        }
    }
}

impl LoadSchedule {
    /// Page size for the fetch that follows `round` completed rounds.
    pub fn page_size(&self, round: u32) -> u32 {
        if round < self.early_rounds {
            self.early_page_size
        } else {
            self.steady_page_size
        }
    }

    /// Size of the next "load more" page, capped at what is still outstanding.
    pub fn next_batch(&self, round: u32, total: u64, held: usize) -> u32 {
        let remaining = remaining(total, held);
        let size = u64::from(self.page_size(round)).min(remaining);
        // `size` never exceeds `page_size`, which is a u32
        size as u32
    }
}

/// Results the server still has beyond what is held, clamped at zero.
pub fn remaining(total: u64, held: usize) -> u64 {
    total.saturating_sub(held as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_schedule() {
        let schedule = LoadSchedule::default();
        assert_eq!(schedule.page_size(0), 5);
        assert_eq!(schedule.page_size(1), 5);
        assert_eq!(schedule.page_size(2), 5);
        assert_eq!(schedule.page_size(3), 10);
        assert_eq!(schedule.page_size(100), 10);
    }

    #[test]
    fn test_next_batch_caps_at_remaining() {
        let schedule = LoadSchedule::default();
        assert_eq!(schedule.next_batch(1, 12, 5), 5);
        assert_eq!(schedule.next_batch(2, 12, 10), 2);
        assert_eq!(schedule.next_batch(5, 40, 15), 10);
    }

    #[test]
    fn test_next_batch_is_zero_when_nothing_remains() {
        let schedule = LoadSchedule::default();
        assert_eq!(schedule.next_batch(1, 5, 5), 0);
        assert_eq!(schedule.next_batch(1, 0, 0), 0);
    }

    #[test]
    fn test_remaining_clamps_at_zero() {
        assert_eq!(remaining(12, 5), 7);
        assert_eq!(remaining(3, 8), 0);
    }
}
