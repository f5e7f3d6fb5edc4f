use battery::{Manager, State};

/// A snapshot of the system's battery state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PowerReading {
    /// Charge level as a whole-number percentage (0–100).
    pub percent: u8,
    /// True while the battery reports it is charging.
    pub charging: bool,
    /// Estimated seconds until empty, when the OS provides one.
    pub remaining_secs: Option<u64>,
}

/// Source of [`PowerReading`]s.
///
/// The overlay only ever talks to this trait, so the rendering logic can be
/// exercised without a battery in the machine.
pub trait PowerStatusProvider: Send {
    fn read(&self) -> Option<PowerReading>;
}

/// Live provider backed by the `battery` crate.
///
/// Queries the first battery the OS reports. A fresh manager is created per
/// read so unplugging or docking between ticks is picked up.
pub struct SystemPowerSource;

impl SystemPowerSource {
    pub fn new() -> Self {
        Self
    }
}

impl PowerStatusProvider for SystemPowerSource {
    fn read(&self) -> Option<PowerReading> {
        let manager = match Manager::new() {
            Ok(manager) => manager,
            Err(e) => {
                tracing::debug!("battery manager unavailable: {e}");
                return None;
            }
        };
        let battery = match manager.batteries() {
            Ok(mut batteries) => batteries.next()?.ok()?,
            Err(e) => {
                tracing::debug!("battery enumeration failed: {e}");
                return None;
            }
        };

        let percent = (battery.state_of_charge().value * 100.0).round() as u8;
        let charging = battery.state() == State::Charging;
        let remaining_secs = if charging {
            None
        } else {
            battery.time_to_empty().map(|t| t.value as u64)
        };

        Some(PowerReading {
            percent: percent.min(100),
            charging,
            remaining_secs,
        })
    }
}
