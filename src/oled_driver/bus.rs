use crate::{config::BusBackend, oled_driver::I2cBus, Error, Result};

#[cfg(target_os = "linux")]
use embedded_hal::i2c::{I2c as EmbeddedHalI2c, SevenBitAddress};
#[cfg(target_os = "linux")]
use linux_embedded_hal::I2cdev;

#[cfg(target_os = "linux")]
fn map_rppal_err(err: rppal::i2c::Error) -> Error {
    Error::Bus(err.to_string())
}

#[cfg(target_os = "linux")]
fn map_i2cdev_err<E: std::fmt::Debug>(err: E) -> Error {
    Error::Bus(format!("{err:?}"))
}

/// Host I2C adapter, either through rppal or a plain `/dev/i2c-N` handle.
#[cfg(target_os = "linux")]
pub enum LinuxBus {
    Rppal(rppal::i2c::I2c),
    I2cdev(I2cdev),
}

#[cfg(target_os = "linux")]
impl LinuxBus {
    /// Open bus `bus` (1 => /dev/i2c-1) with the chosen backend.
    pub fn open(backend: BusBackend, bus: u8) -> Result<Self> {
        match backend {
            BusBackend::Rppal => rppal::i2c::I2c::with_bus(bus)
                .map(LinuxBus::Rppal)
                .map_err(map_rppal_err),
            BusBackend::I2cdev => I2cdev::new(format!("/dev/i2c-{bus}"))
                .map(LinuxBus::I2cdev)
                .map_err(map_i2cdev_err),
        }
    }
}

#[cfg(target_os = "linux")]
impl I2cBus for LinuxBus {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()> {
        match self {
            LinuxBus::Rppal(bus) => {
                bus.set_slave_address(addr.into()).map_err(map_rppal_err)?;
                let written = bus.write(bytes).map_err(map_rppal_err)?;
                if written != bytes.len() {
                    return Err(Error::Bus(format!(
                        "short write: {written} of {} bytes",
                        bytes.len()
                    )));
                }
                Ok(())
            }
            LinuxBus::I2cdev(dev) => {
                EmbeddedHalI2c::<SevenBitAddress>::write(dev, addr, bytes).map_err(map_i2cdev_err)
            }
        }
    }
}

/// Non-Linux stub to satisfy builds on dev hosts; returns errors at runtime.
#[cfg(not(target_os = "linux"))]
pub struct LinuxBus;

#[cfg(not(target_os = "linux"))]
impl LinuxBus {
    pub fn open(_backend: BusBackend, _bus: u8) -> Result<Self> {
        Err(Error::Bus("i2c is only supported on Linux".into()))
    }
}

#[cfg(not(target_os = "linux"))]
impl I2cBus for LinuxBus {
    fn write(&mut self, _addr: u8, _bytes: &[u8]) -> Result<()> {
        Err(Error::Bus("i2c is only supported on Linux".into()))
    }
}
