use std::time::Duration;

use crate::{
    config::BlinkPolicy,
    state::{BlinkState, HealthState},
};

/// Toggle the indicator when the interval for `health` has elapsed since the
/// last toggle. A time earlier than the last toggle counts as elapsed.
/// Returns whether the phase changed.
pub fn tick(blink: &mut BlinkState, health: &HealthState, policy: &BlinkPolicy, now: Duration) -> bool {
    let interval = policy.interval_for(health);
    if now >= blink.last_toggle && now - blink.last_toggle < interval {
        return false;
    }
    blink.on = !blink.on;
    blink.last_toggle = now;
    true
}
