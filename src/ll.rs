//! Low-level register and bit definitions for the TSL2591

/// I2C address of the TSL2591
pub const I2C_ADDRESS: u8 = 0x29;

/// Value of the ID register on a genuine TSL2591
pub const DEVICE_ID: u8 = 0x50;

/// Command bit (CMD | normal transaction) OR'd into every register address
pub const COMMAND_BIT: u8 = 0xA0;

/// Register addresses
pub mod reg {
    /// Power, ADC and interrupt enables
    pub const ENABLE: u8 = 0x00;
    /// Gain (bits 5:4) and integration time (bits 2:0)
    pub const CONTROL: u8 = 0x01;
    /// Persist-filtered low threshold, low byte
    pub const AILTL: u8 = 0x04;
    /// Persist-filtered low threshold, high byte
    pub const AILTH: u8 = 0x05;
    /// Persist-filtered high threshold, low byte
    pub const AIHTL: u8 = 0x06;
    /// Persist-filtered high threshold, high byte
    pub const AIHTH: u8 = 0x07;
    /// No-persist low threshold, low byte
    pub const NPAILTL: u8 = 0x08;
    /// No-persist low threshold, high byte
    pub const NPAILTH: u8 = 0x09;
    /// No-persist high threshold, low byte
    pub const NPAIHTL: u8 = 0x0A;
    /// No-persist high threshold, high byte
    pub const NPAIHTH: u8 = 0x0B;
    /// Interrupt persistence filter
    pub const PERSIST: u8 = 0x0C;
    /// Device identification
    pub const ID: u8 = 0x12;
    /// Device status (read only)
    pub const STATUS: u8 = 0x13;
    /// Channel 0 count, low byte (high byte follows at 0x15)
    pub const C0DATAL: u8 = 0x14;
    /// Channel 1 count, low byte (high byte follows at 0x17)
    pub const C1DATAL: u8 = 0x16;
    /// Special function address that clears the interrupt flags
    pub const CLEAR_INT: u8 = 0xE7;
}

/// ENABLE register bits: NPIEN:7 | SAI:6 | AIEN:4 | AEN:1 | PON:0
pub mod enable {
    /// Power on
    pub const PON: u8 = 0x01;
    /// ALS ADC enable
    pub const AEN: u8 = 0x02;
    /// ALS interrupt enable
    pub const AIEN: u8 = 0x10;
    /// No-persist interrupt enable
    pub const NPIEN: u8 = 0x80;
    /// Everything off
    pub const POWER_OFF: u8 = 0x00;
    /// Value written by the driver whenever it powers the device up
    pub const ACTIVE: u8 = PON | AEN | AIEN | NPIEN;
}

/// CONTROL register fields
pub mod control {
    /// AGAIN field mask
    pub const GAIN_MASK: u8 = 0b0011_0000;
    /// AGAIN field position
    pub const GAIN_SHIFT: u8 = 4;
    /// ATIME field mask
    pub const ATIME_MASK: u8 = 0b0000_0111;
}

/// STATUS register bits
pub mod status {
    /// ALS cycle complete since the last enable
    pub const AVALID: u8 = 0x01;
    /// Persist-filtered ALS interrupt asserted
    pub const AINT: u8 = 0x10;
    /// No-persist ALS interrupt asserted
    pub const NPINTR: u8 = 0x20;
}

/// Byte written to [`reg::CLEAR_INT`] to clear pending interrupt flags
pub const CLEAR_INT_VALUE: u8 = 0x13;

/// Saturation count when the integration time is 100ms
pub const MAX_COUNT_100MS: u16 = 36863;

/// Saturation count for all longer integration times
pub const MAX_COUNT: u16 = 65535;

/// Glass attenuation scaled lux divisor for this package
pub const LUX_DF: u32 = 762;

/// Full command byte for a register address
#[inline]
pub const fn command(register: u8) -> u8 {
    COMMAND_BIT | register
}
