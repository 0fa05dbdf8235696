//! SSD1306 128x64 driver over a swappable I2C bus.
//! Commands go out as `[0x00, cmd..]`, display data as `[0x40, data..]`.

use crate::{
    display::{
        frame::{Frame, PAGES, WIDTH},
        Panel,
    },
    Result,
};

pub mod bus;

/// Minimal trait to allow swapping the I2C backend (for tests, rppal or i2cdev).
pub trait I2cBus {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()>;
}

const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;

const DISPLAY_OFF: u8 = 0xAE;
const DISPLAY_ON: u8 = 0xAF;
const SET_CLOCK_DIV: u8 = 0xD5;
const SET_MULTIPLEX: u8 = 0xA8;
const SET_DISPLAY_OFFSET: u8 = 0xD3;
const SET_START_LINE: u8 = 0x40;
const CHARGE_PUMP: u8 = 0x8D;
const MEMORY_MODE: u8 = 0x20;
const SEGMENT_REMAP: u8 = 0xA1;
const COM_SCAN_DEC: u8 = 0xC8;
const SET_COM_PINS: u8 = 0xDA;
const SET_CONTRAST: u8 = 0x81;
const SET_PRECHARGE: u8 = 0xD9;
const SET_VCOM_DETECT: u8 = 0xDB;
const RESUME_FROM_RAM: u8 = 0xA4;
const NORMAL_DISPLAY: u8 = 0xA6;
const SCROLL_OFF: u8 = 0x2E;
const COLUMN_ADDR: u8 = 0x21;
const PAGE_ADDR: u8 = 0x22;

/// Power-up sequence for a 128x64 panel with the internal charge pump.
const INIT_SEQUENCE: &[u8] = &[
    DISPLAY_OFF,
    SET_CLOCK_DIV,
    0x80,
    SET_MULTIPLEX,
    0x3F,
    SET_DISPLAY_OFFSET,
    0x00,
    SET_START_LINE,
    CHARGE_PUMP,
    0x14,
    MEMORY_MODE,
    0x00,
    SEGMENT_REMAP,
    COM_SCAN_DEC,
    SET_COM_PINS,
    0x12,
    SET_CONTRAST,
    0xCF,
    SET_PRECHARGE,
    0xF1,
    SET_VCOM_DETECT,
    0x40,
    RESUME_FROM_RAM,
    NORMAL_DISPLAY,
    SCROLL_OFF,
    DISPLAY_ON,
];

pub struct Ssd1306<B: I2cBus> {
    bus: B,
    addr: u8,
}

impl<B: I2cBus> Ssd1306<B> {
    /// Wrap a bus; call [`Panel::init`] before presenting.
    pub fn new(bus: B, addr: u8) -> Self {
        Self { bus, addr }
    }

    fn write_commands(&mut self, commands: &[u8]) -> Result<()> {
        let mut packet = Vec::with_capacity(commands.len() + 1);
        packet.push(CONTROL_COMMAND);
        packet.extend_from_slice(commands);
        self.bus.write(self.addr, &packet)
    }

    fn write_data(&mut self, data: &[u8]) -> Result<()> {
        let mut packet = Vec::with_capacity(data.len() + 1);
        packet.push(CONTROL_DATA);
        packet.extend_from_slice(data);
        self.bus.write(self.addr, &packet)
    }
}

impl<B: I2cBus> Panel for Ssd1306<B> {
    fn init(&mut self) -> Result<()> {
        self.write_commands(INIT_SEQUENCE)
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.write_commands(&[COLUMN_ADDR, 0, (WIDTH - 1) as u8])?;
        self.write_commands(&[PAGE_ADDR, 0, (PAGES - 1) as u8])?;
        for page in 0..PAGES {
            self.write_data(frame.page(page))?;
        }
        Ok(())
    }

    fn power_off(&mut self) -> Result<()> {
        self.write_commands(&[DISPLAY_OFF])
    }
}
