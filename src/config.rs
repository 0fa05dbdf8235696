use std::{str::FromStr, time::Duration};

use crate::state::HealthState;

pub const DEFAULT_I2C_BUS: u8 = 1;
pub const DEFAULT_I2C_ADDR: I2cAddr = I2cAddr(0x3C);
pub const DEFAULT_BUS_BACKEND: BusBackend = BusBackend::Rppal;
pub const DEFAULT_INIT_ATTEMPTS: u32 = 5;
pub const DEFAULT_INIT_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_ERROR_PAUSE: Duration = Duration::from_secs(1);
pub const DEFAULT_REINIT_AFTER: u32 = 5;
pub const DEFAULT_HEALTH_URL: &str = "http://supervisor/info";
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);
pub const TOKEN_ENV_VARS: [&str; 2] = ["SUPERVISOR_TOKEN", "HASSIO_TOKEN"];
pub const DEFAULT_BLINK_FAST: Duration = Duration::from_millis(100);
pub const DEFAULT_BLINK_SLOW: Duration = Duration::from_millis(250);
pub const DEFAULT_PAGE_COUNT: u8 = 2;
pub const DEFAULT_PAGE_DURATION: Duration = Duration::from_secs(5);
pub const DEFAULT_HEADER_LABEL: &str = "System Monitor";
pub const DEFAULT_THERMAL_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// 7-bit I2C device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cAddr(pub u8);

impl FromStr for I2cAddr {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parsed = match raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
        {
            Some(hex) => u8::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u8>().ok(),
        };
        match parsed {
            Some(value) if value <= 0x7F => Ok(I2cAddr(value)),
            Some(value) => Err(format!("address {value:#04x} is outside the 7-bit range")),
            None => Err("expected a hex or decimal address (e.g., 0x3c)".to_string()),
        }
    }
}

impl std::fmt::Display for I2cAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// Which Linux I2C stack opens the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusBackend {
    Rppal,
    I2cdev,
}

impl FromStr for BusBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rppal" => Ok(BusBackend::Rppal),
            "i2cdev" | "linux-embedded-hal" => Ok(BusBackend::I2cdev),
            other => Err(format!("unknown bus backend '{other}' (expected rppal or i2cdev)")),
        }
    }
}

/// Content of the header strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderMode {
    Label(String),
    Ip,
}

impl Default for HeaderMode {
    fn default() -> Self {
        HeaderMode::Label(DEFAULT_HEADER_LABEL.to_string())
    }
}

impl FromStr for HeaderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ip") {
            return Ok(HeaderMode::Ip);
        }
        if s.trim().is_empty() {
            return Err("header label must not be empty".into());
        }
        Ok(HeaderMode::Label(s.to_string()))
    }
}

/// Maps a health state to the indicator's toggle interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlinkPolicy {
    pub fast: Duration,
    pub slow: Duration,
    rule: BlinkRule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BlinkRule {
    /// Slow only for the listed states.
    SlowFor(Vec<HealthState>),
    /// Fast only for the listed states.
    FastFor(Vec<HealthState>),
}

impl BlinkPolicy {
    /// Only `running` blinks slowly.
    pub fn not_running() -> Self {
        Self {
            fast: DEFAULT_BLINK_FAST,
            slow: DEFAULT_BLINK_SLOW,
            rule: BlinkRule::SlowFor(vec![HealthState::Running]),
        }
    }

    /// Only explicit failures (`error`, `unknown`, `no_auth`) blink fast.
    pub fn failures() -> Self {
        Self {
            fast: DEFAULT_BLINK_FAST,
            slow: DEFAULT_BLINK_SLOW,
            rule: BlinkRule::FastFor(vec![
                HealthState::Error,
                HealthState::Unknown,
                HealthState::NoAuth,
            ]),
        }
    }

    pub fn interval_for(&self, state: &HealthState) -> Duration {
        let slow = match &self.rule {
            BlinkRule::SlowFor(states) => states.contains(state),
            BlinkRule::FastFor(states) => !states.contains(state),
        };
        if slow {
            self.slow
        } else {
            self.fast
        }
    }
}

impl Default for BlinkPolicy {
    fn default() -> Self {
        Self::not_running()
    }
}

impl FromStr for BlinkPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "not-running" => Ok(BlinkPolicy::not_running()),
            "failures" => Ok(BlinkPolicy::failures()),
            other => Err(format!(
                "unknown blink policy '{other}' (expected not-running or failures)"
            )),
        }
    }
}

/// Parse a CLI duration such as `250ms` or `2s`.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    humantime::parse_duration(raw).map_err(|e| format!("invalid duration '{raw}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal_addresses() {
        assert_eq!("0x3c".parse::<I2cAddr>().unwrap(), I2cAddr(0x3C));
        assert_eq!("0X3D".parse::<I2cAddr>().unwrap(), I2cAddr(0x3D));
        assert_eq!("60".parse::<I2cAddr>().unwrap(), I2cAddr(60));
        assert!("0x80".parse::<I2cAddr>().is_err());
        assert!("oled".parse::<I2cAddr>().is_err());
        assert_eq!(I2cAddr(0x3C).to_string(), "0x3c");
    }

    #[test]
    fn header_mode_accepts_ip_keyword() {
        assert_eq!("IP".parse::<HeaderMode>().unwrap(), HeaderMode::Ip);
        assert_eq!(
            "Pi Rack".parse::<HeaderMode>().unwrap(),
            HeaderMode::Label("Pi Rack".into())
        );
        assert!(" ".parse::<HeaderMode>().is_err());
    }

    #[test]
    fn default_policy_only_slows_for_running() {
        let policy = BlinkPolicy::default();
        assert_eq!(policy.interval_for(&HealthState::Running), DEFAULT_BLINK_SLOW);
        for state in [
            HealthState::Unknown,
            HealthState::Error,
            HealthState::NoAuth,
            HealthState::Connecting,
            HealthState::Other("freeze".into()),
        ] {
            assert_eq!(policy.interval_for(&state), DEFAULT_BLINK_FAST, "{state}");
        }
    }

    #[test]
    fn failures_policy_keeps_transitional_states_slow() {
        let policy: BlinkPolicy = "failures".parse().unwrap();
        assert_eq!(policy.interval_for(&HealthState::Error), DEFAULT_BLINK_FAST);
        assert_eq!(policy.interval_for(&HealthState::NoAuth), DEFAULT_BLINK_FAST);
        assert_eq!(policy.interval_for(&HealthState::Connecting), DEFAULT_BLINK_SLOW);
        assert_eq!(policy.interval_for(&HealthState::Running), DEFAULT_BLINK_SLOW);
    }

    #[test]
    fn durations_use_humantime_syntax() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert!(parse_duration("soon").is_err());
    }
}
