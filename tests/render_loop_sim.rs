use panelwatch::{
    app::{
        clock::{Clock, FakeClock},
        health::{HealthProbe, ProbeError, ProbeResponse},
        render_loop::{LoopSettings, RenderLoop},
        sampler::{Credentials, MetricsProvider, Sampler},
        LogLevel, Logger,
    },
    display::{layout, Composer, Frame, Panel},
    state::{DiskUsage, HealthState, HostReadings, NetworkTotals, Reading},
    Result,
};
use std::{
    net::IpAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

const START: Duration = Duration::from_secs(1_700_000_000);
const RUN: Duration = Duration::from_secs(10);

struct SteadyHost;

impl MetricsProvider for SteadyHost {
    fn read(&mut self) -> HostReadings {
        HostReadings {
            cpu_percent: Reading::Value(23.4),
            ram_percent: Reading::Value(61.0),
            temp_celsius: Reading::Value(52.3),
            disk: Reading::Value(DiskUsage {
                used_percent: 44.0,
                free_gb: 17.2,
            }),
            network: Reading::Value(NetworkTotals {
                in_mb: 812.4,
                out_mb: 96.1,
            }),
            uptime: Reading::Value(Duration::from_secs(3 * 86_400 + 4 * 3_600)),
            host_ip: Reading::Value(IpAddr::from([192, 168, 1, 42])),
        }
    }
}

struct FixedProbe(&'static str);

impl HealthProbe for FixedProbe {
    fn fetch(&mut self, _token: &str) -> std::result::Result<ProbeResponse, ProbeError> {
        Ok(ProbeResponse::Body(format!(
            r#"{{"data":{{"state":"{}","version":"2024.3.1"}}}}"#,
            self.0
        )))
    }
}

/// Checks every presented frame for the fixed regions and counts them.
#[derive(Default)]
struct InspectingPanel {
    frames: u64,
    missing_regions: Vec<(u64, &'static str)>,
    stop_after: Option<(u64, Arc<AtomicBool>)>,
    powered_off: bool,
}

impl Panel for InspectingPanel {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        let mut required = vec![
            ("header", layout::HEADER),
            ("indicator", layout::INDICATOR),
        ];
        for row in layout::ROWS {
            required.push(("row", row));
        }
        for (name, region) in required {
            if frame.lit_in(&region) == 0 {
                self.missing_regions.push((self.frames, name));
            }
        }
        self.frames += 1;
        if let Some((limit, running)) = &self.stop_after {
            if self.frames >= *limit {
                running.store(false, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    fn power_off(&mut self) -> Result<()> {
        self.powered_off = true;
        Ok(())
    }
}

fn build<'a>(
    probe: FixedProbe,
    panel: InspectingPanel,
    clock: &'a FakeClock,
    logger: &'a Logger,
) -> RenderLoop<'a, InspectingPanel, SteadyHost, FixedProbe, &'a FakeClock> {
    let sampler = Sampler::new(
        SteadyHost,
        probe,
        Credentials::from_lookup(|name| (name == "SUPERVISOR_TOKEN").then(|| "t0ken".into())),
        Duration::from_secs(1),
    );
    let settings = LoopSettings {
        frame_interval: Duration::from_millis(50),
        ..LoopSettings::default()
    };
    RenderLoop::new(panel, sampler, Composer::default(), settings, clock, logger)
}

/// Drive the loop for `RUN` of simulated time; returns rising blink edges.
fn simulate<'a>(
    render: &mut RenderLoop<'a, InspectingPanel, SteadyHost, FixedProbe, &'a FakeClock>,
    clock: &FakeClock,
) -> u32 {
    let mut rising = 0;
    let mut was_on = render.state().blink.on;
    let end = clock.monotonic() + RUN;
    while clock.monotonic() < end {
        render.tick();
        let on = render.state().blink.on;
        if on && !was_on {
            rising += 1;
        }
        was_on = on;
    }
    rising
}

#[test]
fn ten_second_run_while_running() {
    let clock = FakeClock::new(START);
    let logger = Logger::new(LogLevel::Error, None);
    let mut render = build(FixedProbe("running"), InspectingPanel::default(), &clock, &logger);

    let rising = simulate(&mut render, &clock);

    let samples = render.sampler().samples();
    let frames = render.panel().frames;
    assert!((9..=11).contains(&samples), "samples = {samples}");
    assert!((195..=205).contains(&frames), "frames = {frames}");
    assert!((18..=22).contains(&rising), "blink cycles = {rising}");
    assert!(
        render.panel().missing_regions.is_empty(),
        "frames without required regions: {:?}",
        render.panel().missing_regions
    );
    assert_eq!(render.state().health.state, HealthState::Running);
    assert_eq!(render.stats().present_failures, 0);
}

#[test]
fn non_running_health_blinks_fast() {
    let clock = FakeClock::new(START);
    let logger = Logger::new(LogLevel::Error, None);
    let mut render = build(FixedProbe("setup"), InspectingPanel::default(), &clock, &logger);

    let rising = simulate(&mut render, &clock);

    assert_eq!(
        render.state().health.state,
        HealthState::Other("setup".into())
    );
    // 0.1 s interval: 99 toggles in 10 s, 50 of them rising.
    assert!((48..=52).contains(&rising), "blink cycles = {rising}");
}

#[test]
fn shutdown_flag_ends_run_and_blanks_panel() {
    let clock = FakeClock::new(START);
    let logger = Logger::new(LogLevel::Error, None);
    let running = Arc::new(AtomicBool::new(true));
    let panel = InspectingPanel {
        stop_after: Some((40, running.clone())),
        ..InspectingPanel::default()
    };
    let mut render = build(FixedProbe("running"), panel, &clock, &logger);

    render.run(&running).unwrap();

    assert_eq!(render.panel().frames, 40);
    assert!(render.panel().powered_off);
    assert_eq!(clock.now(), START + Duration::from_secs(2));
    assert_eq!(render.sampler().samples(), 2);
}

#[test]
fn wall_clock_stepping_back_keeps_sampling_and_blinking() {
    let clock = FakeClock::new(START);
    let logger = Logger::new(LogLevel::Error, None);
    let mut render = build(FixedProbe("running"), InspectingPanel::default(), &clock, &logger);
    render.tick();
    assert_eq!(render.sampler().samples(), 1);

    // NTP pulls the wall clock back an hour.
    clock.set_wall(START - Duration::from_secs(3_600));
    let rising = simulate(&mut render, &clock);

    let samples = render.sampler().samples();
    assert!((10..=12).contains(&samples), "samples = {samples}");
    assert!((18..=22).contains(&rising), "blink cycles = {rising}");
    assert!(render.panel().missing_regions.is_empty());
}
