use std::{fmt, net::IpAddr, time::Duration};

/// Why a single metric read produced no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    ReadFailed(String),
    Unparseable(String),
    NotPresent,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::ReadFailed(msg) => write!(f, "read failed: {msg}"),
            FallbackReason::Unparseable(raw) => write!(f, "unparseable value '{raw}'"),
            FallbackReason::NotPresent => write!(f, "source not present"),
        }
    }
}

/// Outcome of one metric read: a fresh value or the reason there is none.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading<T> {
    Value(T),
    Unavailable(FallbackReason),
}

/// What a field falls back to when its read is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    LastKnown,
    Zero,
}

impl<T> Reading<T> {
    pub fn failed(msg: impl Into<String>) -> Self {
        Reading::Unavailable(FallbackReason::ReadFailed(msg.into()))
    }

    pub fn reason(&self) -> Option<&FallbackReason> {
        match self {
            Reading::Value(_) => None,
            Reading::Unavailable(reason) => Some(reason),
        }
    }

    /// Resolve against the previous value using `policy`.
    pub fn resolve(self, previous: T, zero: T, policy: Fallback) -> T {
        match (self, policy) {
            (Reading::Value(value), _) => value,
            (Reading::Unavailable(_), Fallback::LastKnown) => previous,
            (Reading::Unavailable(_), Fallback::Zero) => zero,
        }
    }
}

impl<T> From<Result<T, FallbackReason>> for Reading<T> {
    fn from(value: Result<T, FallbackReason>) -> Self {
        match value {
            Ok(v) => Reading::Value(v),
            Err(reason) => Reading::Unavailable(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DiskUsage {
    pub used_percent: f32,
    pub free_gb: f32,
}

/// Cumulative interface counters, in megabytes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NetworkTotals {
    pub in_mb: f64,
    pub out_mb: f64,
}

/// One raw pass over every host source; each field may fail on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct HostReadings {
    pub cpu_percent: Reading<f32>,
    pub ram_percent: Reading<f32>,
    pub temp_celsius: Reading<f32>,
    pub disk: Reading<DiskUsage>,
    pub network: Reading<NetworkTotals>,
    pub uptime: Reading<Duration>,
    pub host_ip: Reading<IpAddr>,
}

impl HostReadings {
    /// Names of the fields that came back unavailable, with the reason.
    pub fn failures(&self) -> Vec<(&'static str, &FallbackReason)> {
        let candidates = [
            ("cpu", self.cpu_percent.reason()),
            ("ram", self.ram_percent.reason()),
            ("temperature", self.temp_celsius.reason()),
            ("disk", self.disk.reason()),
            ("network", self.network.reason()),
            ("uptime", self.uptime.reason()),
            ("ip", self.host_ip.reason()),
        ];
        candidates
            .into_iter()
            .filter_map(|(name, reason)| reason.map(|r| (name, r)))
            .collect()
    }
}

/// Temperature falls back to zero; everything else keeps its last known value.
pub const TEMPERATURE_FALLBACK: Fallback = Fallback::Zero;
pub const DEFAULT_FALLBACK: Fallback = Fallback::LastKnown;

/// Latest host telemetry. Replaced wholesale on every sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    pub cpu_percent: f32,
    pub ram_percent: f32,
    pub temp_celsius: f32,
    pub disk_percent: f32,
    pub disk_free_gb: f32,
    pub net_in_mb: f64,
    pub net_out_mb: f64,
    pub uptime: Duration,
    pub host_ip: IpAddr,
    /// Loop-clock time of the sample.
    pub timestamp: Duration,
}

impl MetricsSnapshot {
    /// All-zero snapshot used as the "previous" value before the first sample.
    pub fn zero() -> Self {
        Self {
            cpu_percent: 0.0,
            ram_percent: 0.0,
            temp_celsius: 0.0,
            disk_percent: 0.0,
            disk_free_gb: 0.0,
            net_in_mb: 0.0,
            net_out_mb: 0.0,
            uptime: Duration::ZERO,
            host_ip: IpAddr::from([127, 0, 0, 1]),
            timestamp: Duration::ZERO,
        }
    }

    /// Build the next snapshot from fresh readings, falling back per field.
    pub fn merge(previous: Option<&MetricsSnapshot>, readings: HostReadings, now: Duration) -> Self {
        let zero = Self::zero();
        let prev = previous.unwrap_or(&zero);
        let disk = readings.disk.resolve(
            DiskUsage {
                used_percent: prev.disk_percent,
                free_gb: prev.disk_free_gb,
            },
            DiskUsage::default(),
            DEFAULT_FALLBACK,
        );
        let network = readings.network.resolve(
            NetworkTotals {
                in_mb: prev.net_in_mb,
                out_mb: prev.net_out_mb,
            },
            NetworkTotals::default(),
            DEFAULT_FALLBACK,
        );
        Self {
            cpu_percent: readings
                .cpu_percent
                .resolve(prev.cpu_percent, 0.0, DEFAULT_FALLBACK),
            ram_percent: readings
                .ram_percent
                .resolve(prev.ram_percent, 0.0, DEFAULT_FALLBACK),
            temp_celsius: readings
                .temp_celsius
                .resolve(prev.temp_celsius, 0.0, TEMPERATURE_FALLBACK),
            disk_percent: disk.used_percent,
            disk_free_gb: disk.free_gb,
            net_in_mb: network.in_mb,
            net_out_mb: network.out_mb,
            uptime: readings
                .uptime
                .resolve(prev.uptime, Duration::ZERO, DEFAULT_FALLBACK),
            host_ip: readings
                .host_ip
                .resolve(prev.host_ip, zero.host_ip, DEFAULT_FALLBACK),
            timestamp: now,
        }
    }
}

/// Run state reported by the orchestration platform's health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthState {
    Running,
    Unknown,
    Error,
    NoAuth,
    Connecting,
    Other(String),
}

impl HealthState {
    pub fn as_str(&self) -> &str {
        match self {
            HealthState::Running => "running",
            HealthState::Unknown => "unknown",
            HealthState::Error => "error",
            HealthState::NoAuth => "no_auth",
            HealthState::Connecting => "connecting",
            HealthState::Other(raw) => raw.as_str(),
        }
    }

    /// Map the literal reported by the endpoint; unlisted literals are kept verbatim.
    pub fn from_reported(raw: &str) -> Self {
        match raw {
            "running" => HealthState::Running,
            "unknown" => HealthState::Unknown,
            "error" => HealthState::Error,
            "no_auth" => HealthState::NoAuth,
            "connecting" => HealthState::Connecting,
            other => HealthState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub state: HealthState,
    pub version: Option<String>,
}

impl HealthStatus {
    pub fn new(state: HealthState) -> Self {
        Self {
            state,
            version: None,
        }
    }

    pub fn connecting() -> Self {
        Self::new(HealthState::Connecting)
    }
}

/// On/off phase of the status indicator glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkState {
    pub on: bool,
    pub last_toggle: Duration,
}

impl BlinkState {
    pub fn new(now: Duration) -> Self {
        Self {
            on: false,
            last_toggle: now,
        }
    }
}

/// The "latest known" triplet shared by every stage of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestState {
    pub metrics: Option<MetricsSnapshot>,
    pub health: HealthStatus,
    pub blink: BlinkState,
}

impl LatestState {
    pub fn new(now: Duration) -> Self {
        Self {
            metrics: None,
            health: HealthStatus::connecting(),
            blink: BlinkState::new(now),
        }
    }
}
