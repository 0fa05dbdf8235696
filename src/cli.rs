use std::time::Duration;

use crate::{
    config::{parse_duration, BlinkPolicy, BusBackend, HeaderMode, I2cAddr},
    Error, Result,
};

/// Options for the `run` command; values are `None` when not provided on CLI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunOptions {
    pub i2c_bus: Option<u8>,
    pub i2c_addr: Option<I2cAddr>,
    pub bus_backend: Option<BusBackend>,
    pub init_attempts: Option<u32>,
    pub init_delay: Option<Duration>,
    pub sample_interval: Option<Duration>,
    pub frame_interval: Option<Duration>,
    pub health_url: Option<String>,
    pub health_timeout: Option<Duration>,
    pub blink_policy: Option<BlinkPolicy>,
    pub pages: Option<u8>,
    pub page_duration: Option<Duration>,
    pub header: Option<HeaderMode>,
    pub thermal_path: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    pub syslog: bool,
    pub render_once: Option<String>,
}

/// Parsed command-line intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(Box<RunOptions>),
    ShowHelp,
    ShowVersion,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut iter = args.iter();
        match iter.next().map(|s| s.as_str()) {
            None => Ok(Command::Run(Box::default())),
            Some("run") => Ok(Command::Run(Box::new(parse_run_options(&mut iter)?))),
            Some("--help") | Some("-h") => Ok(Command::ShowHelp),
            Some("--version") | Some("-V") => Ok(Command::ShowVersion),
            Some(flag) if flag.starts_with('-') => {
                // `run` may be omitted: re-parse from the first flag.
                let mut iter = args.iter();
                Ok(Command::Run(Box::new(parse_run_options(&mut iter)?)))
            }
            Some(cmd) => Err(Error::InvalidArgs(format!(
                "unknown command '{cmd}', try --help"
            ))),
        }
    }

    pub fn help() -> &'static str {
        concat!(
            "panelwatch - host health on a 128x64 I2C OLED panel\n",
            "\n",
            "USAGE:\n",
            "  panelwatch [run] [OPTIONS]\n",
            "  panelwatch --help\n",
            "  panelwatch --version\n",
            "\n",
            "OPTIONS:\n",
            "  --i2c-bus <n>              I2C bus number (default: 1)\n",
            "  --i2c-addr <addr>          Panel address, hex or decimal (default: 0x3c)\n",
            "  --bus-backend <name>       rppal | i2cdev (default: rppal)\n",
            "  --init-attempts <n>        Display init attempts before giving up (default: 5)\n",
            "  --init-delay <dur>         Pause between init attempts (default: 2s)\n",
            "  --sample-interval <dur>    Metric and health sampling cadence (default: 1s)\n",
            "  --frame-interval <dur>     Sleep between frames (default: 50ms)\n",
            "  --health-url <url>         Health endpoint (default: http://supervisor/info)\n",
            "  --health-timeout <dur>     Health request timeout (default: 2s)\n",
            "  --blink-policy <name>      not-running | failures (default: not-running)\n",
            "  --pages <n>                Number of rotating pages, 1 or 2 (default: 2)\n",
            "  --page-duration <dur>      Time each page stays visible (default: 5s)\n",
            "  --header <text|ip>         Header label, or 'ip' for the host address\n",
            "  --thermal-path <path>      CPU temperature sensor file\n",
            "  --log-level <level>        error | warn | info | debug | trace (default: warn)\n",
            "  --log-file <path>          Append log lines to a file\n",
            "  --syslog                   Also send log lines to the local syslog\n",
            "  --render-once <path>       Sample once, write the frame as PBM and exit\n",
            "  -h, --help                 Show this help\n",
            "  -V, --version              Show version\n",
            "\n",
            "ENVIRONMENT:\n",
            "  SUPERVISOR_TOKEN / HASSIO_TOKEN   Bearer token for the health endpoint\n",
            "  PANELWATCH_LOG_LEVEL              Log level when --log-level is absent\n",
            "  PANELWATCH_LOG_PATH               Log file when --log-file is absent\n",
        )
    }

    pub fn print_help() {
        println!("{}", Self::help());
    }
}

fn parse_run_options(iter: &mut std::slice::Iter<String>) -> Result<RunOptions> {
    let mut opts = RunOptions::default();

    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--i2c-bus" => {
                opts.i2c_bus = Some(parse_number(flag, iter, "i2c-bus")?);
            }
            "--i2c-addr" => {
                let raw = take_value(flag, iter)?;
                opts.i2c_addr = Some(
                    raw.parse()
                        .map_err(|e: String| Error::InvalidArgs(format!("i2c-addr: {e}")))?,
                );
            }
            "--bus-backend" => {
                let raw = take_value(flag, iter)?;
                opts.bus_backend = Some(raw.parse().map_err(Error::InvalidArgs)?);
            }
            "--init-attempts" => {
                opts.init_attempts = Some(parse_number(flag, iter, "init-attempts")?);
            }
            "--init-delay" => {
                opts.init_delay = Some(take_duration(flag, iter)?);
            }
            "--sample-interval" => {
                opts.sample_interval = Some(take_duration(flag, iter)?);
            }
            "--frame-interval" => {
                opts.frame_interval = Some(take_duration(flag, iter)?);
            }
            "--health-url" => {
                opts.health_url = Some(take_value(flag, iter)?);
            }
            "--health-timeout" => {
                opts.health_timeout = Some(take_duration(flag, iter)?);
            }
            "--blink-policy" => {
                let raw = take_value(flag, iter)?;
                opts.blink_policy = Some(raw.parse().map_err(Error::InvalidArgs)?);
            }
            "--pages" => {
                opts.pages = Some(parse_number(flag, iter, "pages")?);
            }
            "--page-duration" => {
                opts.page_duration = Some(take_duration(flag, iter)?);
            }
            "--header" => {
                let raw = take_value(flag, iter)?;
                opts.header = Some(raw.parse().map_err(Error::InvalidArgs)?);
            }
            "--thermal-path" => {
                opts.thermal_path = Some(take_value(flag, iter)?);
            }
            "--log-level" => {
                opts.log_level = Some(take_value(flag, iter)?);
            }
            "--log-file" => {
                opts.log_file = Some(take_value(flag, iter)?);
            }
            "--syslog" => {
                opts.syslog = true;
            }
            "--render-once" => {
                opts.render_once = Some(take_value(flag, iter)?);
            }
            other => {
                return Err(Error::InvalidArgs(format!(
                    "unknown flag '{other}', try --help"
                )));
            }
        }
    }

    Ok(opts)
}

fn take_value(flag: &str, iter: &mut std::slice::Iter<String>) -> Result<String> {
    iter.next()
        .cloned()
        .ok_or_else(|| Error::InvalidArgs(format!("{flag} expects a value")))
}

fn take_duration(flag: &str, iter: &mut std::slice::Iter<String>) -> Result<Duration> {
    let raw = take_value(flag, iter)?;
    parse_duration(&raw).map_err(|e| Error::InvalidArgs(format!("{flag}: {e}")))
}

fn parse_number<T: std::str::FromStr>(
    flag: &str,
    iter: &mut std::slice::Iter<String>,
    name: &str,
) -> Result<T> {
    let raw = take_value(flag, iter)?;
    raw.parse()
        .map_err(|_| Error::InvalidArgs(format!("{name} must be a non-negative integer")))
}
