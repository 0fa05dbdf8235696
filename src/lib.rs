pub mod app;
pub mod cli;
pub mod config;
pub mod display;
pub mod oled_driver;
pub mod pages;
pub mod state;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    InvalidArgs(String),
    Io(std::io::Error),
    Bus(String),
    DisplayUnavailable { attempts: u32, last_error: String },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidArgs(msg) => write!(f, "invalid arguments: {msg}"),
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::Bus(msg) => write!(f, "i2c bus error: {msg}"),
            Error::DisplayUnavailable {
                attempts,
                last_error,
            } => write!(
                f,
                "display unavailable after {attempts} attempts (last error: {last_error})"
            ),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}
