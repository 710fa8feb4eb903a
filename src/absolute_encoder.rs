use log::{info, warn};
use rppal::i2c::I2c;
use std::f64::consts::TAU;

use crate::angle;
use crate::error::{Error, Result};
use crate::hardware::AbsoluteAngleSensor;

const AS5600_ADDR: u16 = 0x36;

// AS5600 Register addresses
const STATUS: u8 = 0x0B;
const RAW_ANGLE_H: u8 = 0x0C;

// STATUS bits
const MAGNET_DETECTED: u8 = 0x20;
const MAGNET_TOO_WEAK: u8 = 0x10;
const MAGNET_TOO_STRONG: u8 = 0x08;

const COUNTS_PER_REV: f64 = 4096.0;

/// AS5600 magnetic angle sensor on the steering shaft.
pub struct MagneticAbsoluteEncoder {
    i2c: I2c,
    /// Raw angle (radians) that should read as zero.
    offset: f64,
}

impl MagneticAbsoluteEncoder {
    pub fn new(bus: u8, offset: f64) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus)?;
        i2c.set_slave_address(AS5600_ADDR)?;

        let status = i2c.smbus_read_byte(STATUS)?;
        if status & MAGNET_DETECTED == 0 {
            return Err(Error::Device(format!(
                "No magnet detected on I2C bus {} (status 0x{:02X})",
                bus, status
            )));
        }
        if status & MAGNET_TOO_WEAK != 0 {
            warn!("Steer magnet too weak on I2C bus {}", bus);
        }
        if status & MAGNET_TOO_STRONG != 0 {
            warn!("Steer magnet too strong on I2C bus {}", bus);
        }

        info!("✓ Absolute encoder (AS5600) initialized on I2C bus {}", bus);
        Ok(Self { i2c, offset })
    }

    /// 12-bit raw angle, 0..4096.
    pub fn read_raw_counts(&mut self) -> Result<u16> {
        let mut data = [0u8; 2];
        self.i2c.write_read(&[RAW_ANGLE_H], &mut data)?;
        Ok(decode_raw_angle(data[0], data[1]))
    }

    /// Shaft angle before the offset is applied (for calibration).
    pub fn read_raw_angle(&mut self) -> Result<f64> {
        Ok(counts_to_radians(self.read_raw_counts()?))
    }
}

impl AbsoluteAngleSensor for MagneticAbsoluteEncoder {
    fn read_angle(&mut self) -> Result<f64> {
        Ok(apply_offset(self.read_raw_angle()?, self.offset))
    }
}

fn decode_raw_angle(high: u8, low: u8) -> u16 {
    (u16::from(high & 0x0F) << 8) | u16::from(low)
}

fn counts_to_radians(counts: u16) -> f64 {
    f64::from(counts) * TAU / COUNTS_PER_REV
}

fn apply_offset(raw: f64, offset: f64) -> f64 {
    angle::normalize(raw - offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_decode_masks_reserved_bits() {
        assert_eq!(decode_raw_angle(0x00, 0x00), 0);
        assert_eq!(decode_raw_angle(0x0F, 0xFF), 4095);
        assert_eq!(decode_raw_angle(0xF4, 0x00), 1024);
    }

    #[test]
    fn test_counts_to_radians() {
        assert_eq!(counts_to_radians(0), 0.0);
        assert_abs_diff_eq!(counts_to_radians(1024), PI / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(counts_to_radians(2048), PI, epsilon = 1e-12);
        assert!(counts_to_radians(4095) < TAU);
    }

    #[test]
    fn test_offset_wraps() {
        // raw 10° with a 20° offset reads 350°
        let raw = 10.0_f64.to_radians();
        let offset = 20.0_f64.to_radians();
        assert_abs_diff_eq!(apply_offset(raw, offset).to_degrees(), 350.0, epsilon = 1e-9);
        assert_abs_diff_eq!(apply_offset(offset, offset), 0.0);
    }
}
