use crate::{
    cli::RunOptions,
    config::{
        BlinkPolicy, BusBackend, HeaderMode, I2cAddr, DEFAULT_BUS_BACKEND, DEFAULT_ERROR_PAUSE,
        DEFAULT_FRAME_INTERVAL, DEFAULT_HEALTH_TIMEOUT, DEFAULT_HEALTH_URL, DEFAULT_I2C_ADDR,
        DEFAULT_I2C_BUS, DEFAULT_INIT_ATTEMPTS, DEFAULT_INIT_DELAY, DEFAULT_PAGE_COUNT,
        DEFAULT_PAGE_DURATION, DEFAULT_REINIT_AFTER, DEFAULT_SAMPLE_INTERVAL,
        DEFAULT_THERMAL_PATH,
    },
    display::{Composer, Panel},
    oled_driver::{bus::LinuxBus, Ssd1306},
    pages::Page,
    state::LatestState,
    Error, Result,
};
use std::{fs, str::FromStr, time::Duration};

pub mod bootstrap;
pub mod clock;
pub mod health;
pub mod indicator;
mod lifecycle;
mod logger;
pub mod render_loop;
pub mod sampler;

use clock::{Clock, SystemClock};
use health::SupervisorProbe;
pub use logger::{LogLevel, Logger};
use render_loop::{LoopSettings, RenderLoop};
use sampler::{Credentials, Sampler, SysinfoProvider};

/// Config for the daemon: defaults merged with CLI flags, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub i2c_bus: u8,
    pub i2c_addr: I2cAddr,
    pub bus_backend: BusBackend,
    pub init_attempts: u32,
    pub init_delay: Duration,
    pub sample_interval: Duration,
    pub frame_interval: Duration,
    pub error_pause: Duration,
    pub reinit_after: u32,
    pub health_url: String,
    pub health_timeout: Duration,
    pub blink_policy: BlinkPolicy,
    pub pages: u8,
    pub page_duration: Duration,
    pub header: HeaderMode,
    pub thermal_path: String,
    pub log_level: LogLevel,
    pub log_file: Option<String>,
    pub syslog: bool,
    pub render_once: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            i2c_bus: DEFAULT_I2C_BUS,
            i2c_addr: DEFAULT_I2C_ADDR,
            bus_backend: DEFAULT_BUS_BACKEND,
            init_attempts: DEFAULT_INIT_ATTEMPTS,
            init_delay: DEFAULT_INIT_DELAY,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            error_pause: DEFAULT_ERROR_PAUSE,
            reinit_after: DEFAULT_REINIT_AFTER,
            health_url: DEFAULT_HEALTH_URL.to_string(),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            blink_policy: BlinkPolicy::default(),
            pages: DEFAULT_PAGE_COUNT,
            page_duration: DEFAULT_PAGE_DURATION,
            header: HeaderMode::default(),
            thermal_path: DEFAULT_THERMAL_PATH.to_string(),
            log_level: LogLevel::default(),
            log_file: None,
            syslog: false,
            render_once: None,
        }
    }
}

impl AppConfig {
    pub fn from_options(opts: RunOptions) -> Result<Self> {
        let defaults = Self::default();
        let log_level = resolve_log_level(
            opts.log_level.as_deref(),
            std::env::var("PANELWATCH_LOG_LEVEL").ok(),
        )?;
        let config = Self {
            i2c_bus: opts.i2c_bus.unwrap_or(defaults.i2c_bus),
            i2c_addr: opts.i2c_addr.unwrap_or(defaults.i2c_addr),
            bus_backend: opts.bus_backend.unwrap_or(defaults.bus_backend),
            init_attempts: opts.init_attempts.unwrap_or(defaults.init_attempts),
            init_delay: opts.init_delay.unwrap_or(defaults.init_delay),
            sample_interval: opts.sample_interval.unwrap_or(defaults.sample_interval),
            frame_interval: opts.frame_interval.unwrap_or(defaults.frame_interval),
            error_pause: defaults.error_pause,
            reinit_after: defaults.reinit_after,
            health_url: opts.health_url.unwrap_or(defaults.health_url),
            health_timeout: opts.health_timeout.unwrap_or(defaults.health_timeout),
            blink_policy: opts.blink_policy.unwrap_or(defaults.blink_policy),
            pages: opts.pages.unwrap_or(defaults.pages),
            page_duration: opts.page_duration.unwrap_or(defaults.page_duration),
            header: opts.header.unwrap_or(defaults.header),
            thermal_path: opts.thermal_path.unwrap_or(defaults.thermal_path),
            log_level,
            log_file: opts.log_file,
            syslog: opts.syslog,
            render_once: opts.render_once,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let non_zero = [
            ("sample-interval", self.sample_interval),
            ("frame-interval", self.frame_interval),
            ("health-timeout", self.health_timeout),
        ];
        for (name, value) in non_zero {
            if value.is_zero() {
                return Err(Error::InvalidArgs(format!("{name} must be greater than zero")));
            }
        }
        if self.init_attempts == 0 {
            return Err(Error::InvalidArgs("init-attempts must be at least 1".into()));
        }
        if self.pages == 0 || self.pages as usize > Page::ALL.len() {
            return Err(Error::InvalidArgs(format!(
                "pages must be between 1 and {}",
                Page::ALL.len()
            )));
        }
        if self.page_duration < Duration::from_secs(1) || self.page_duration.subsec_nanos() != 0
        {
            return Err(Error::InvalidArgs(
                "page-duration must be a whole number of seconds".into(),
            ));
        }
        if self.health_url.trim().is_empty() {
            return Err(Error::InvalidArgs("health-url must not be empty".into()));
        }
        Ok(())
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            frame_interval: self.frame_interval,
            error_pause: self.error_pause,
            reinit_after: self.reinit_after,
            blink_policy: self.blink_policy.clone(),
            page_count: self.pages,
            page_duration: self.page_duration,
        }
    }
}

pub struct App {
    config: AppConfig,
    logger: Logger,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let mut logger = Logger::new(config.log_level, config.log_file.clone());
        if config.syslog {
            logger = logger.with_syslog();
        }
        Self { config, logger }
    }

    pub fn from_options(opts: RunOptions) -> Result<Self> {
        Ok(Self::new(AppConfig::from_options(opts)?))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Entry point for the daemon: acquire the panel, then tick until shutdown.
    pub fn run(&self) -> Result<()> {
        let config = &self.config;
        if let Some(path) = &config.render_once {
            return self.render_once(path);
        }

        self.logger.info(format!(
            "daemon start (bus={}, addr={}, backend={:?}, sample={:?}, frame={:?})",
            config.i2c_bus,
            config.i2c_addr,
            config.bus_backend,
            config.sample_interval,
            config.frame_interval
        ));
        let running = lifecycle::create_shutdown_flag()?;
        let clock = SystemClock::new();

        let panel = bootstrap::acquire_display(
            || open_panel(config),
            config.init_attempts,
            config.init_delay,
            &clock,
            &self.logger,
        )?;

        let credentials = Credentials::from_env();
        if credentials.token().is_none() {
            self.logger
                .warn("no supervisor token in the environment; health shows no_auth");
        }
        let sampler = Sampler::new(
            SysinfoProvider::new(&config.thermal_path),
            SupervisorProbe::new(&config.health_url, config.health_timeout),
            credentials,
            config.sample_interval,
        );
        let mut render = RenderLoop::new(
            panel,
            sampler,
            Composer::new(config.header.clone()),
            config.loop_settings(),
            clock,
            &self.logger,
        );
        render.run(&running)
    }

    /// Sample once, compose the first page and write it as a PBM image.
    fn render_once(&self, path: &str) -> Result<()> {
        let config = &self.config;
        let clock = SystemClock::new();
        let now = clock.monotonic();
        let mut sampler = Sampler::new(
            SysinfoProvider::new(&config.thermal_path),
            SupervisorProbe::new(&config.health_url, config.health_timeout),
            Credentials::from_env(),
            config.sample_interval,
        );
        let mut state = LatestState::new(now);
        sampler.sample(now, &mut state, &self.logger);
        let frame = Composer::new(config.header.clone()).compose(
            state.metrics.as_ref(),
            &state.health,
            &state.blink,
            Page::Overview,
        );
        fs::write(path, frame.to_pbm())?;
        self.logger.info(format!("frame written to {path}"));
        Ok(())
    }
}

/// The flag wins over the environment; an unparseable environment value is
/// ignored, an unparseable flag is an error.
fn resolve_log_level(flag: Option<&str>, env: Option<String>) -> Result<LogLevel> {
    match flag {
        Some(raw) => LogLevel::from_str(raw)
            .map_err(|_| Error::InvalidArgs(format!("unknown log level '{raw}'"))),
        None => Ok(env
            .and_then(|raw| LogLevel::from_str(&raw).ok())
            .unwrap_or_default()),
    }
}

fn open_panel(config: &AppConfig) -> Result<Ssd1306<LinuxBus>> {
    let bus = LinuxBus::open(config.bus_backend, config.i2c_bus)?;
    let mut panel = Ssd1306::new(bus, config.i2c_addr.0);
    panel.init()?;
    Ok(panel)
}
