//! Host metric collection plus the health poll, on their own cadence.

use std::{
    fs,
    net::{IpAddr, UdpSocket},
    path::{Path, PathBuf},
    time::Duration,
};

use sysinfo::{Disks, Networks, System};

use super::{
    health::{classify, HealthProbe},
    Logger,
};
use crate::{
    config::TOKEN_ENV_VARS,
    state::{
        DiskUsage, FallbackReason, HealthState, HealthStatus, HostReadings, LatestState,
        MetricsSnapshot, NetworkTotals, Reading,
    },
};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Source of per-field host readings. Each field fails independently.
pub trait MetricsProvider {
    fn read(&mut self) -> HostReadings;
}

/// Reads CPU, memory, disk, network and uptime through `sysinfo`, temperature
/// from a sysfs thermal file and the outbound IP from a connected UDP socket.
pub struct SysinfoProvider {
    system: System,
    disks: Disks,
    networks: Networks,
    thermal_path: PathBuf,
}

impl SysinfoProvider {
    pub fn new(thermal_path: impl Into<PathBuf>) -> Self {
        let mut system = System::new();
        // Baseline for the first usage delta.
        system.refresh_cpu_usage();
        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            thermal_path: thermal_path.into(),
        }
    }

    fn cpu_percent(&mut self) -> Reading<f32> {
        self.system.refresh_cpu_usage();
        if self.system.cpus().is_empty() {
            return Reading::Unavailable(FallbackReason::NotPresent);
        }
        Reading::Value(self.system.global_cpu_usage().max(0.0))
    }

    fn ram_percent(&mut self) -> Reading<f32> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Reading::Unavailable(FallbackReason::NotPresent);
        }
        let used = self.system.used_memory();
        Reading::Value((used as f64 / total as f64 * 100.0) as f32)
    }

    fn disk(&mut self) -> Reading<DiskUsage> {
        self.disks.refresh(false);
        let disk = self
            .disks
            .list()
            .iter()
            .find(|disk| disk.mount_point() == Path::new("/"))
            .or_else(|| self.disks.list().first());
        let Some(disk) = disk else {
            return Reading::Unavailable(FallbackReason::NotPresent);
        };
        let total = disk.total_space();
        let available = disk.available_space();
        if total == 0 {
            return Reading::Unavailable(FallbackReason::NotPresent);
        }
        Reading::Value(DiskUsage {
            used_percent: (total.saturating_sub(available) as f64 / total as f64 * 100.0) as f32,
            free_gb: (available as f64 / BYTES_PER_GB) as f32,
        })
    }

    fn network(&mut self) -> Reading<NetworkTotals> {
        self.networks.refresh(true);
        let (received, transmitted) = self
            .networks
            .iter()
            .filter(|(name, _)| name.as_str() != "lo")
            .fold((0u64, 0u64), |(rx, tx), (_, data)| {
                (
                    rx.saturating_add(data.total_received()),
                    tx.saturating_add(data.total_transmitted()),
                )
            });
        Reading::Value(NetworkTotals {
            in_mb: received as f64 / BYTES_PER_MB,
            out_mb: transmitted as f64 / BYTES_PER_MB,
        })
    }
}

impl MetricsProvider for SysinfoProvider {
    fn read(&mut self) -> HostReadings {
        HostReadings {
            cpu_percent: self.cpu_percent(),
            ram_percent: self.ram_percent(),
            temp_celsius: read_temperature(&self.thermal_path),
            disk: self.disk(),
            network: self.network(),
            uptime: Reading::Value(Duration::from_secs(System::uptime())),
            host_ip: discover_ip(),
        }
    }
}

/// Parse a sysfs thermal file (milli-degrees Celsius).
pub fn read_temperature(path: &Path) -> Reading<f32> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => return Reading::failed(format!("{}: {err}", path.display())),
    };
    match raw.trim().parse::<i64>() {
        Ok(milli) => Reading::Value(milli as f32 / 1000.0),
        Err(_) => Reading::Unavailable(FallbackReason::Unparseable(raw.trim().to_string())),
    }
}

/// Address of the interface that routes outward. Connecting a UDP socket
/// picks a route without sending anything.
pub fn discover_ip() -> Reading<IpAddr> {
    let socket = match UdpSocket::bind(("0.0.0.0", 0)) {
        Ok(socket) => socket,
        Err(err) => return Reading::failed(err.to_string()),
    };
    if let Err(err) = socket.connect(("8.8.8.8", 80)) {
        return Reading::failed(err.to_string());
    }
    match socket.local_addr() {
        Ok(addr) => Reading::Value(addr.ip()),
        Err(err) => Reading::failed(err.to_string()),
    }
}

/// Bearer credential, looked up once at start-up.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    token: Option<String>,
}

impl Credentials {
    /// First non-empty value among the accepted variable names.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = TOKEN_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty());
        Self { token }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// Pulls host readings and health into the latest-known state whenever
/// `sample_interval` has elapsed since the previous sample.
pub struct Sampler<M, H> {
    metrics: M,
    probe: H,
    credentials: Credentials,
    interval: Duration,
    last_sample: Option<Duration>,
    samples: u64,
}

impl<M: MetricsProvider, H: HealthProbe> Sampler<M, H> {
    pub fn new(metrics: M, probe: H, credentials: Credentials, interval: Duration) -> Self {
        Self {
            metrics,
            probe,
            credentials,
            interval,
            last_sample: None,
            samples: 0,
        }
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn is_due(&self, now: Duration) -> bool {
        match self.last_sample {
            None => true,
            // A clock that went backwards re-anchors on the next sample.
            Some(last) => now < last || now - last >= self.interval,
        }
    }

    /// Sample if due. Returns whether a sample was taken.
    pub fn tick(&mut self, now: Duration, state: &mut LatestState, logger: &Logger) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.sample(now, state, logger);
        true
    }

    /// Sample unconditionally.
    pub fn sample(&mut self, now: Duration, state: &mut LatestState, logger: &Logger) {
        let readings = self.metrics.read();
        for (field, reason) in readings.failures() {
            logger.debug(format!("{field} unavailable ({reason}); using fallback"));
        }
        state.metrics = Some(MetricsSnapshot::merge(
            state.metrics.as_ref(),
            readings,
            now,
        ));

        let health = self.poll_health(logger);
        if health.state != state.health.state {
            match health.version.as_deref() {
                Some(version) => logger.info(format!(
                    "health {} -> {} (version {version})",
                    state.health.state, health.state
                )),
                None => logger.info(format!("health {} -> {}", state.health.state, health.state)),
            }
        }
        state.health = health;

        self.last_sample = Some(now);
        self.samples += 1;
    }

    fn poll_health(&mut self, logger: &Logger) -> HealthStatus {
        let Some(token) = self.credentials.token() else {
            return HealthStatus::new(HealthState::NoAuth);
        };
        let outcome = self.probe.fetch(token);
        if let Err(err) = &outcome {
            logger.debug(format!("health probe failed: {err}"));
        }
        classify(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{
        health::{ProbeError, ProbeResponse},
        LogLevel,
    };
    use std::{cell::Cell, collections::VecDeque, io::Write, rc::Rc};

    fn quiet() -> Logger {
        Logger::new(LogLevel::Error, None)
    }

    struct ScriptedMetrics {
        script: VecDeque<HostReadings>,
    }

    impl MetricsProvider for ScriptedMetrics {
        fn read(&mut self) -> HostReadings {
            self.script.pop_front().unwrap_or_else(|| readings(1.0))
        }
    }

    fn readings(cpu: f32) -> HostReadings {
        HostReadings {
            cpu_percent: Reading::Value(cpu),
            ram_percent: Reading::Value(30.0),
            temp_celsius: Reading::Value(48.0),
            disk: Reading::Value(DiskUsage {
                used_percent: 60.0,
                free_gb: 12.0,
            }),
            network: Reading::Value(NetworkTotals {
                in_mb: 10.0,
                out_mb: 2.0,
            }),
            uptime: Reading::Value(Duration::from_secs(3_600)),
            host_ip: Reading::Value(IpAddr::from([192, 168, 1, 20])),
        }
    }

    fn all_failed() -> HostReadings {
        HostReadings {
            cpu_percent: Reading::failed("x"),
            ram_percent: Reading::failed("x"),
            temp_celsius: Reading::failed("x"),
            disk: Reading::failed("x"),
            network: Reading::failed("x"),
            uptime: Reading::failed("x"),
            host_ip: Reading::failed("x"),
        }
    }

    #[derive(Clone)]
    struct CountingProbe {
        calls: Rc<Cell<u32>>,
        outcome: Result<ProbeResponse, ProbeError>,
    }

    impl CountingProbe {
        fn new(outcome: Result<ProbeResponse, ProbeError>) -> Self {
            Self {
                calls: Rc::new(Cell::new(0)),
                outcome,
            }
        }
    }

    impl HealthProbe for CountingProbe {
        fn fetch(&mut self, _token: &str) -> Result<ProbeResponse, ProbeError> {
            self.calls.set(self.calls.get() + 1);
            self.outcome.clone()
        }
    }

    fn token() -> Credentials {
        Credentials::from_lookup(|name| (name == "SUPERVISOR_TOKEN").then(|| "abc".to_string()))
    }

    fn running() -> Result<ProbeResponse, ProbeError> {
        Ok(ProbeResponse::Body(
            r#"{"data":{"state":"running","version":"2024.3.1"}}"#.into(),
        ))
    }

    #[test]
    fn no_credential_means_no_auth_without_network() {
        let probe = CountingProbe::new(running());
        let calls = probe.calls.clone();
        let mut sampler = Sampler::new(
            ScriptedMetrics {
                script: VecDeque::new(),
            },
            probe,
            Credentials::from_lookup(|_| None),
            Duration::from_secs(1),
        );
        let mut state = LatestState::new(Duration::ZERO);
        sampler.tick(Duration::ZERO, &mut state, &quiet());
        assert_eq!(state.health.state, HealthState::NoAuth);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn probe_failure_is_error_and_metrics_keep_previous_values() {
        let probe = CountingProbe::new(Err(ProbeError::Timeout));
        let mut sampler = Sampler::new(
            ScriptedMetrics {
                script: VecDeque::from([readings(20.0), all_failed()]),
            },
            probe,
            token(),
            Duration::from_secs(1),
        );
        let mut state = LatestState::new(Duration::ZERO);
        sampler.tick(Duration::ZERO, &mut state, &quiet());
        sampler.tick(Duration::from_secs(1), &mut state, &quiet());
        assert_eq!(state.health.state, HealthState::Error);
        let metrics = state.metrics.unwrap();
        assert_eq!(metrics.cpu_percent, 20.0);
        assert_eq!(metrics.ram_percent, 30.0);
        assert_eq!(metrics.disk_free_gb, 12.0);
        // Temperature falls back to zero, not last known.
        assert_eq!(metrics.temp_celsius, 0.0);
        assert_eq!(metrics.timestamp, Duration::from_secs(1));
    }

    #[test]
    fn temperature_failure_does_not_suppress_other_fields() {
        let mut partial = readings(75.0);
        partial.temp_celsius = Reading::failed("missing sensor");
        let mut sampler = Sampler::new(
            ScriptedMetrics {
                script: VecDeque::from([partial]),
            },
            CountingProbe::new(running()),
            token(),
            Duration::from_secs(1),
        );
        let mut state = LatestState::new(Duration::ZERO);
        sampler.tick(Duration::ZERO, &mut state, &quiet());
        let metrics = state.metrics.unwrap();
        assert_eq!(metrics.cpu_percent, 75.0);
        assert_eq!(metrics.temp_celsius, 0.0);
        assert_eq!(state.health.state, HealthState::Running);
        assert_eq!(state.health.version.as_deref(), Some("2024.3.1"));
    }

    #[test]
    fn samples_only_when_interval_elapsed() {
        let probe = CountingProbe::new(running());
        let calls = probe.calls.clone();
        let mut sampler = Sampler::new(
            ScriptedMetrics {
                script: VecDeque::new(),
            },
            probe,
            token(),
            Duration::from_secs(1),
        );
        let mut state = LatestState::new(Duration::ZERO);
        assert!(sampler.tick(Duration::ZERO, &mut state, &quiet()));
        assert!(!sampler.tick(Duration::from_millis(500), &mut state, &quiet()));
        assert!(!sampler.tick(Duration::from_millis(999), &mut state, &quiet()));
        assert!(sampler.tick(Duration::from_millis(1_000), &mut state, &quiet()));
        assert_eq!(sampler.samples(), 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn earlier_time_than_last_sample_is_due() {
        let mut sampler = Sampler::new(
            ScriptedMetrics {
                script: VecDeque::new(),
            },
            CountingProbe::new(running()),
            token(),
            Duration::from_secs(1),
        );
        let mut state = LatestState::new(Duration::ZERO);
        assert!(sampler.tick(Duration::from_secs(3_600), &mut state, &quiet()));
        assert!(sampler.tick(Duration::from_secs(60), &mut state, &quiet()));
        assert!(!sampler.tick(Duration::from_millis(60_500), &mut state, &quiet()));
        assert!(sampler.tick(Duration::from_secs(61), &mut state, &quiet()));
        assert_eq!(sampler.samples(), 3);
    }

    #[test]
    fn credentials_prefer_first_non_empty_variable() {
        let creds = Credentials::from_lookup(|name| match name {
            "SUPERVISOR_TOKEN" => Some("  ".into()),
            "HASSIO_TOKEN" => Some("fallback".into()),
            _ => None,
        });
        assert_eq!(creds.token(), Some("fallback"));

        let creds = Credentials::from_lookup(|name| Some(format!("{name}-value")));
        assert_eq!(creds.token(), Some("SUPERVISOR_TOKEN-value"));

        assert_eq!(Credentials::from_lookup(|_| None).token(), None);
    }

    #[test]
    fn thermal_file_is_read_in_millidegrees() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "51234").unwrap();
        assert_eq!(read_temperature(file.path()), Reading::Value(51.234));
    }

    #[test]
    fn thermal_read_failures_are_reported_not_raised() {
        let missing = read_temperature(Path::new("/nonexistent/thermal_zone9/temp"));
        assert!(matches!(
            missing,
            Reading::Unavailable(FallbackReason::ReadFailed(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "hot").unwrap();
        assert_eq!(
            read_temperature(file.path()),
            Reading::Unavailable(FallbackReason::Unparseable("hot".into()))
        );
    }
}
