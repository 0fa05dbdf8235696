//! Wall-clock page rotation. The active page is a pure function of time;
//! nothing is stored between ticks, so rotation never drifts.

use std::time::Duration;

/// Content pages, in rotation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    /// CPU, RAM and temperature with gauges; health state in the footer.
    #[default]
    Overview,
    /// Disk and network counters; uptime in the footer.
    Host,
}

impl Page {
    pub const ALL: [Page; 2] = [Page::Overview, Page::Host];

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }
}

/// `floor(now / page_duration) mod page_count`, on whole seconds.
pub fn page_index(now: Duration, page_duration: Duration, page_count: u8) -> usize {
    let count = page_count.max(1) as u64;
    let span = page_duration.as_secs().max(1);
    ((now.as_secs() / span) % count) as usize
}

/// The page to show at `now`.
pub fn page_at(now: Duration, page_duration: Duration, page_count: u8) -> Page {
    Page::from_index(page_index(now, page_duration, page_count))
}
