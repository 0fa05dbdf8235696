use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use super::{
    clock::Clock,
    health::HealthProbe,
    indicator,
    lifecycle::shutdown_panel,
    sampler::{MetricsProvider, Sampler},
    Logger,
};
use crate::{
    config::{BlinkPolicy, DEFAULT_ERROR_PAUSE, DEFAULT_FRAME_INTERVAL, DEFAULT_REINIT_AFTER},
    display::{Composer, Panel},
    pages::{page_at, Page},
    state::LatestState,
    Result,
};

/// Cadences and policies for the per-frame stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopSettings {
    pub frame_interval: Duration,
    pub error_pause: Duration,
    pub reinit_after: u32,
    pub blink_policy: BlinkPolicy,
    pub page_count: u8,
    pub page_duration: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL,
            error_pause: DEFAULT_ERROR_PAUSE,
            reinit_after: DEFAULT_REINIT_AFTER,
            blink_policy: BlinkPolicy::default(),
            page_count: crate::config::DEFAULT_PAGE_COUNT,
            page_duration: crate::config::DEFAULT_PAGE_DURATION,
        }
    }
}

/// Counters for what the loop has done so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopStats {
    pub ticks: u64,
    pub frames_presented: u64,
    pub present_failures: u64,
    pub reinits: u64,
}

/// Single-threaded tick loop: sample, indicator, page, compose, present, sleep.
pub struct RenderLoop<'a, P, M, H, C> {
    panel: P,
    sampler: Sampler<M, H>,
    composer: Composer,
    settings: LoopSettings,
    clock: C,
    logger: &'a Logger,
    state: LatestState,
    consecutive_failures: u32,
    stats: LoopStats,
}

impl<'a, P, M, H, C> RenderLoop<'a, P, M, H, C>
where
    P: Panel,
    M: MetricsProvider,
    H: HealthProbe,
    C: Clock,
{
    pub fn new(
        panel: P,
        sampler: Sampler<M, H>,
        composer: Composer,
        settings: LoopSettings,
        clock: C,
        logger: &'a Logger,
    ) -> Self {
        let state = LatestState::new(clock.monotonic());
        Self {
            panel,
            sampler,
            composer,
            settings,
            clock,
            logger,
            state,
            consecutive_failures: 0,
            stats: LoopStats::default(),
        }
    }

    pub fn state(&self) -> &LatestState {
        &self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn sampler(&self) -> &Sampler<M, H> {
        &self.sampler
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    /// One iteration. Never fails: present errors are logged and paused on.
    pub fn tick(&mut self) {
        self.stats.ticks += 1;
        self.sampler
            .tick(self.clock.monotonic(), &mut self.state, self.logger);

        // The health call may have taken a while.
        indicator::tick(
            &mut self.state.blink,
            &self.state.health.state,
            &self.settings.blink_policy,
            self.clock.monotonic(),
        );
        let page = self.current_page(self.clock.now());
        let frame = self.composer.compose(
            self.state.metrics.as_ref(),
            &self.state.health,
            &self.state.blink,
            page,
        );

        match self.panel.present(&frame) {
            Ok(()) => {
                if self.consecutive_failures > 0 {
                    self.logger.info(format!(
                        "display recovered after {} failed frames",
                        self.consecutive_failures
                    ));
                }
                self.consecutive_failures = 0;
                self.stats.frames_presented += 1;
                self.clock.sleep(self.settings.frame_interval);
            }
            Err(err) => {
                self.consecutive_failures += 1;
                self.stats.present_failures += 1;
                self.logger.warn(format!(
                    "present failed ({} in a row): {err}",
                    self.consecutive_failures
                ));
                if self.consecutive_failures >= self.settings.reinit_after {
                    self.reinit();
                }
                self.clock.sleep(self.settings.error_pause);
            }
        }
    }

    fn current_page(&self, now: Duration) -> Page {
        page_at(now, self.settings.page_duration, self.settings.page_count)
    }

    fn reinit(&mut self) {
        self.stats.reinits += 1;
        match self.panel.init() {
            Ok(()) => self.logger.info("display re-initialized"),
            Err(err) => self.logger.warn(format!("display re-init failed: {err}")),
        }
    }

    /// Tick until `running` is cleared, then blank the panel.
    pub fn run(&mut self, running: &AtomicBool) -> Result<()> {
        self.logger.info("render loop started");
        while running.load(Ordering::SeqCst) {
            self.tick();
        }
        self.logger.info(format!(
            "shutting down after {} frames ({} samples)",
            self.stats.frames_presented,
            self.sampler.samples()
        ));
        shutdown_panel(&mut self.panel, self.logger);
        Ok(())
    }
}
