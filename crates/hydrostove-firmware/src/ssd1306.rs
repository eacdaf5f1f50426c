//! Minimal async SSD1306 driver for a 128×64 panel on I2C
//!
//! Drawing happens in a [`MonoFrameBuffer`]; this driver only initializes the
//! controller and pushes the changed pages. Horizontal addressing mode lets a
//! whole dirty rectangle be sent after a single column/page window command.

use embedded_hal_async::i2c::{Error as _, ErrorKind, I2c};
use hydrostove_core::framebuffer::{DirtyRegion, MonoFrameBuffer};
use log::{debug, error};
use thiserror_no_std::Error;

/// Default 7-bit I2C address (SA0 low).
pub const DEFAULT_ADDRESS: u8 = 0x3C;

/// Control byte: the rest of the transfer is commands
const CONTROL_COMMAND: u8 = 0x00;
/// Control byte: the rest of the transfer is display RAM data
const CONTROL_DATA: u8 = 0x40;

const WIDTH: usize = 128;

#[rustfmt::skip]
const INIT_SEQUENCE: &[u8] = &[
    0xAE,       // display off
    0xD5, 0x80, // clock divide ratio / oscillator frequency
    0xA8, 0x3F, // multiplex ratio: 64 rows
    0xD3, 0x00, // display offset
    0x40,       // start line 0
    0x8D, 0x14, // charge pump on (internal VCC)
    0x20, 0x00, // horizontal addressing mode
    0xA1,       // segment remap: column 127 is SEG0
    0xC8,       // COM scan direction remapped
    0xDA, 0x12, // COM pins: alternative, no left/right remap
    0x81, 0xCF, // contrast
    0xD9, 0xF1, // pre-charge period
    0xDB, 0x40, // VCOMH deselect level
    0xA4,       // display follows RAM
    0xA6,       // normal, not inverted
    0x2E,       // scrolling off
    0xAF,       // display on
];

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    #[error("I2C transfer to the display failed: {0:?}")]
    Bus(ErrorKind),
}

pub struct Ssd1306<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Ssd1306<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Configure the controller and switch the panel on.
    pub async fn init(&mut self) -> Result<(), DisplayError> {
        self.send_commands(INIT_SEQUENCE).await?;
        debug!("SSD1306 at {:#04x} initialized", self.address);
        Ok(())
    }

    /// Send the changed part of the framebuffer.
    ///
    /// On a bus error the whole panel is marked dirty so the next flush
    /// repaints it completely.
    pub async fn flush(&mut self, framebuffer: &mut MonoFrameBuffer) -> Result<(), DisplayError> {
        let Some(region) = framebuffer.take_dirty() else {
            return Ok(());
        };

        if let Err(e) = self.write_region(framebuffer, &region).await {
            error!("Display flush failed: {}", e);
            framebuffer.invalidate();
            return Err(e);
        }
        Ok(())
    }

    async fn write_region(
        &mut self,
        framebuffer: &MonoFrameBuffer,
        region: &DirtyRegion,
    ) -> Result<(), DisplayError> {
        self.send_commands(&[
            0x21,
            region.first_column as u8,
            region.last_column as u8,
            0x22,
            region.first_page as u8,
            region.last_page as u8,
        ])
        .await?;

        let mut transfer = [0u8; WIDTH + 1];
        transfer[0] = CONTROL_DATA;
        for page in region.first_page..=region.last_page {
            let bytes = framebuffer.page_bytes(page, region);
            transfer[1..=bytes.len()].copy_from_slice(bytes);
            self.write(&transfer[..=bytes.len()]).await?;
        }
        Ok(())
    }

    async fn send_commands(&mut self, commands: &[u8]) -> Result<(), DisplayError> {
        let mut transfer = [0u8; 32];
        for chunk in commands.chunks(transfer.len() - 1) {
            transfer[0] = CONTROL_COMMAND;
            transfer[1..=chunk.len()].copy_from_slice(chunk);
            self.write(&transfer[..=chunk.len()]).await?;
        }
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        self.i2c
            .write(self.address, bytes)
            .await
            .map_err(|e| DisplayError::Bus(e.kind()))
    }
}
