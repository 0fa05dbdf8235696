use std::time::Duration;

use super::{clock::Clock, Logger};
use crate::{Error, Result};

/// Try `open` up to `max_attempts` times, sleeping `retry_delay` between
/// attempts. Returns the first handle that opens; exhaustion is fatal.
pub fn acquire_display<P, F>(
    mut open: F,
    max_attempts: u32,
    retry_delay: Duration,
    clock: &dyn Clock,
    logger: &Logger,
) -> Result<P>
where
    F: FnMut() -> Result<P>,
{
    let max_attempts = max_attempts.max(1);
    let mut last_error = String::new();
    for attempt in 1..=max_attempts {
        match open() {
            Ok(handle) => {
                if attempt > 1 {
                    logger.info(format!("display ready after {attempt} attempts"));
                }
                return Ok(handle);
            }
            Err(err) => {
                logger.warn(format!(
                    "display init attempt {attempt}/{max_attempts} failed: {err}"
                ));
                last_error = err.to_string();
            }
        }
        if attempt < max_attempts {
            clock.sleep(retry_delay);
        }
    }
    logger.error(format!(
        "giving up on display after {max_attempts} attempts"
    ));
    Err(Error::DisplayUnavailable {
        attempts: max_attempts,
        last_error,
    })
}
