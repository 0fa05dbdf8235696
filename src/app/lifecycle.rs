use super::Logger;
use crate::{display::Panel, Error, Result};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Install a ctrl-c/SIGTERM handler that flips the shared running flag instead of exiting immediately.
pub(super) fn create_shutdown_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let running_handle = running.clone();

    ctrlc::set_handler(move || {
        running_handle.store(false, Ordering::SeqCst);
    })
    .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;

    Ok(running)
}

/// Blank the panel before exiting; failures are logged only.
pub(super) fn shutdown_panel<P: Panel>(panel: &mut P, logger: &Logger) {
    if let Err(err) = panel.power_off() {
        logger.warn(format!("display power-off failed: {err}"));
    }
}
