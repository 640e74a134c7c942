//! # TSL2591 Ambient Light Sensor Driver
//!
//! This is a platform-agnostic Rust driver for the TSL2591 dual-photodiode ambient light
//! sensor, built using the [`embedded-hal`] traits for I2C communication.
//!
//! The TSL2591 provides:
//! - A full-spectrum (visible + IR) channel and an IR channel, 16 bits each
//! - Programmable gain (1x, 25x, 428x, 9876x)
//! - Programmable integration time (100ms to 600ms)
//! - Persist-filtered threshold interrupts
//! - I2C interface (address 0x29)
//!
//! ## Features
//!
//! - **Lux calculation** with automatic gain reduction on saturation
//! - **Interrupt thresholds** programmed directly in lux
//! - **Async/await support** with feature gating (optional)
//! - **Power management**: the device is powered down between measurements
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tsl2591::{Gain, IntegrationTime, Tsl2591};
//!
//! # fn main() -> Result<(), tsl2591::Error<embedded_hal::i2c::ErrorKind>> {
//! # let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! # let delay = embedded_hal_mock::eh1::delay::NoopDelay::new();
//! // Verifies the chip ID and applies the default configuration
//! let mut sensor = Tsl2591::new(i2c, delay)?;
//!
//! sensor.set_gain(Gain::High)?;
//! sensor.set_integration_time(IntegrationTime::Ms200)?;
//!
//! let lux = sensor.read_lux()?;
//!
//! // Interrupt when the light leaves the 50..200 lux window
//! sensor.set_lux_interrupt(50, 200)?;
//! # let _ = lux;
//! # Ok(())
//! # }
//! ```
//!
//! ## Async Usage
//!
//! Enable the `async` feature to use async/await patterns:
//!
//! ```toml
//! [dependencies]
//! tsl2591 = { version = "0.1", features = ["async"] }
//! ```
//!
//! ```rust,ignore
//! let mut sensor = Tsl2591::new_async(i2c, delay).await?;
//! let lux = sensor.read_lux_async().await?;
//! ```
//!
//! [`embedded-hal`]: https://crates.io/crates/embedded-hal

#![no_std]
#![deny(missing_docs)]

use core::convert::Infallible;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin};
use embedded_hal::i2c::I2c;

#[cfg(feature = "async")]
use embedded_hal_async::{delay::DelayNs as AsyncDelayNs, i2c::I2c as AsyncI2c};

pub mod ll;
pub mod lux;

use ll::{command, control, enable, reg};
pub use ll::I2C_ADDRESS;
pub use lux::InterruptThresholds;

/// Persistence filter written during initialization: one out-of-range cycle
const DEFAULT_PERSIST: u8 = 0x01;

/// Pause between channel polls after a saturation gain step
const OVERFLOW_POLL_MS: u32 = 100;

/// Number of polls after a saturation gain step before giving up
pub const OVERFLOW_RETRY_LIMIT: u8 = 50;

/// Analog gain settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Gain {
    /// 1x gain
    Low = 0b00,
    /// 25x gain
    Medium = 0b01,
    /// 428x gain
    High = 0b10,
    /// 9876x gain
    Max = 0b11,
}

impl Gain {
    /// Gain for a 2-bit AGAIN field value
    pub const fn from_field(field: u8) -> Option<Self> {
        match field {
            0b00 => Some(Gain::Low),
            0b01 => Some(Gain::Medium),
            0b10 => Some(Gain::High),
            0b11 => Some(Gain::Max),
            _ => None,
        }
    }

    /// AGAIN field value
    pub const fn field(self) -> u8 {
        self as u8
    }

    /// Field value shifted into CONTROL register position
    pub const fn bits(self) -> u8 {
        self.field() << control::GAIN_SHIFT
    }

    /// Nominal analog gain factor
    pub const fn factor(self) -> u32 {
        match self {
            Gain::Low => 1,
            Gain::Medium => 25,
            Gain::High => 428,
            Gain::Max => 9876,
        }
    }

    /// Nominal analog gain factor as a float
    pub const fn multiplier(self) -> f32 {
        self.factor() as f32
    }

    /// The next lower gain, or `None` at [`Gain::Low`]
    pub const fn step_down(self) -> Option<Self> {
        match self.field().checked_sub(1) {
            Some(field) => Self::from_field(field),
            None => None,
        }
    }
}

/// ADC integration time settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum IntegrationTime {
    /// 100ms integration, 36863 max count
    Ms100 = 0b000,
    /// 200ms integration
    Ms200 = 0b001,
    /// 300ms integration
    Ms300 = 0b010,
    /// 400ms integration
    Ms400 = 0b011,
    /// 500ms integration
    Ms500 = 0b100,
    /// 600ms integration
    Ms600 = 0b101,
}

impl IntegrationTime {
    /// Integration time for an ATIME field value; fields 6 and 7 are invalid
    pub const fn from_field(field: u8) -> Option<Self> {
        match field {
            0b000 => Some(IntegrationTime::Ms100),
            0b001 => Some(IntegrationTime::Ms200),
            0b010 => Some(IntegrationTime::Ms300),
            0b011 => Some(IntegrationTime::Ms400),
            0b100 => Some(IntegrationTime::Ms500),
            0b101 => Some(IntegrationTime::Ms600),
            _ => None,
        }
    }

    /// ATIME field value
    pub const fn field(self) -> u8 {
        self as u8
    }

    /// Integration duration in milliseconds
    pub const fn millis(self) -> u32 {
        100 * self.field() as u32 + 100
    }
}

/// Cached measurement configuration, mirroring the CONTROL register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Config {
    /// Analog gain
    pub gain: Gain,
    /// ADC integration time
    pub integration_time: IntegrationTime,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gain: Gain::Medium,
            integration_time: IntegrationTime::Ms100,
        }
    }
}

/// Raw photodiode counts from a single acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ChannelCounts {
    /// Channel 0, visible + IR photodiode
    pub ch0: u16,
    /// Channel 1, IR photodiode
    pub ch1: u16,
}

impl ChannelCounts {
    /// Both channels packed as `(ch1 << 16) | ch0`
    pub fn full_spectrum(&self) -> u32 {
        (u32::from(self.ch1) << 16) | u32::from(self.ch0)
    }

    /// Channel 0 as is
    pub fn infrared(&self) -> u16 {
        self.ch0
    }

    /// Full spectrum with channel 1 subtracted
    pub fn visible(&self) -> u32 {
        self.full_spectrum() - u32::from(self.ch1)
    }
}

/// Device status information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct StatusInfo {
    /// True once an integration cycle completed since the ADC was enabled
    pub valid: bool,
    /// True if the persist-filtered interrupt is asserted
    pub interrupt: bool,
    /// True if the no-persist interrupt is asserted
    pub no_persist_interrupt: bool,
}

impl StatusInfo {
    fn from_register(status: u8) -> Self {
        Self {
            valid: status & ll::status::AVALID != 0,
            interrupt: status & ll::status::AINT != 0,
            no_persist_interrupt: status & ll::status::NPINTR != 0,
        }
    }
}

/// All possible errors in this crate
#[derive(Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error<E> {
    /// I2C communication error
    I2c(E),
    /// Invalid device ID detected, the sensor was not found
    InvalidDeviceId {
        /// Expected device ID
        expected: u8,
        /// Found device ID
        found: u8,
    },
    /// Invalid configuration parameter, nothing was written
    InvalidConfig(&'static str),
    /// Channels saturated at the lowest gain
    Overflow,
    /// Channels never settled after a saturation gain step
    Timeout,
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C error: {:?}", e),
            Error::InvalidDeviceId { expected, found } => write!(
                f,
                "device not found: expected ID 0x{:02x}, found 0x{:02x}",
                expected, found
            ),
            Error::InvalidConfig(what) => write!(f, "invalid configuration: {}", what),
            Error::Overflow => f.write_str("numerical overflow at lowest gain"),
            Error::Timeout => f.write_str("channels did not settle after gain change"),
        }
    }
}

impl<E: core::fmt::Debug> core::error::Error for Error<E> {}

/// Placeholder for a driver without an interrupt pin attached
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl InputPin for NoPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

/// Register writes programming the persist-filtered thresholds and
/// disabling the no-persist pair
fn threshold_writes(high: u16, low: u16) -> [(u8, u8); 8] {
    let [low_l, low_h] = low.to_le_bytes();
    let [high_l, high_h] = high.to_le_bytes();
    [
        (reg::AILTL, low_l),
        (reg::AILTH, low_h),
        (reg::AIHTL, high_l),
        (reg::AIHTH, high_h),
        (reg::NPAILTL, 0x00),
        (reg::NPAILTH, 0x00),
        (reg::NPAIHTL, 0xFF),
        (reg::NPAIHTH, 0xFF),
    ]
}

/// High-level TSL2591 driver
///
/// The device is kept powered down between operations; every measurement
/// enables it, reads, and disables it again.
pub struct Tsl2591<I2C, Delay, IntPin = NoPin> {
    i2c: I2C,
    delay: Delay,
    int_pin: Option<IntPin>,
    config: Config,
}

impl<I2C, E, Delay> Tsl2591<I2C, Delay, NoPin>
where
    I2C: I2c<Error = E>,
    Delay: DelayNs,
{
    /// Create a driver, verify the chip ID and apply the default configuration
    ///
    /// Leaves the device at medium gain, 100ms integration, persistence 1,
    /// powered down.
    pub fn new(i2c: I2C, delay: Delay) -> Result<Self, Error<E>> {
        let mut sensor = Self {
            i2c,
            delay,
            int_pin: None,
            config: Config::default(),
        };
        sensor.init()?;
        Ok(sensor)
    }
}

impl<I2C, Delay, IntPin> Tsl2591<I2C, Delay, IntPin> {
    /// Attach the interrupt line, sampled for diagnostics during measurements
    pub fn with_interrupt_pin<P: InputPin>(self, pin: P) -> Tsl2591<I2C, Delay, P> {
        Tsl2591 {
            i2c: self.i2c,
            delay: self.delay,
            int_pin: Some(pin),
            config: self.config,
        }
    }

    /// Cached gain and integration time
    pub fn config(&self) -> Config {
        self.config
    }

    /// Destroy the driver and return the I2C interface
    pub fn destroy(self) -> I2C {
        self.i2c
    }
}

impl<I2C, Delay, IntPin> Tsl2591<I2C, Delay, IntPin>
where
    IntPin: InputPin,
{
    fn sample_interrupt_pin(&mut self) {
        if let Some(pin) = self.int_pin.as_mut() {
            // INT is active low
            match pin.is_low() {
                Ok(_pending) => {
                    #[cfg(feature = "defmt-03")]
                    defmt::debug!("TSL2591 interrupt pending: {}", _pending);
                }
                Err(_) => {
                    #[cfg(feature = "defmt-03")]
                    defmt::debug!("TSL2591 interrupt pin unreadable");
                }
            }
        }
    }
}

impl<I2C, E, Delay, IntPin> Tsl2591<I2C, Delay, IntPin>
where
    I2C: I2c<Error = E>,
    Delay: DelayNs,
    IntPin: InputPin,
{
    fn init(&mut self) -> Result<(), Error<E>> {
        let id = self.read_byte(reg::ID)?;
        if id != ll::DEVICE_ID {
            #[cfg(feature = "defmt-03")]
            defmt::error!("TSL2591 not found, ID = {:#x}", id);
            return Err(Error::InvalidDeviceId {
                expected: ll::DEVICE_ID,
                found: id,
            });
        }

        self.enable()?;
        self.set_gain(Gain::Medium)?;
        self.set_integration_time(IntegrationTime::Ms100)?;
        self.write_byte(reg::PERSIST, DEFAULT_PERSIST)?;
        self.disable()
    }

    /// Power on with the ADC and both interrupt sources enabled
    pub fn enable(&mut self) -> Result<(), Error<E>> {
        self.write_byte(reg::ENABLE, enable::ACTIVE)
    }

    /// Power the device down
    pub fn disable(&mut self) -> Result<(), Error<E>> {
        self.write_byte(reg::ENABLE, enable::POWER_OFF)
    }

    /// Read the gain currently programmed in the device
    pub fn get_gain(&mut self) -> Result<Gain, Error<E>> {
        let ctrl = self.read_byte(reg::CONTROL)?;
        Gain::from_field((ctrl & control::GAIN_MASK) >> control::GAIN_SHIFT)
            .ok_or(Error::InvalidConfig("gain"))
    }

    /// Set the analog gain
    pub fn set_gain(&mut self, gain: Gain) -> Result<(), Error<E>> {
        let ctrl = self.read_byte(reg::CONTROL)?;
        self.write_byte(reg::CONTROL, (ctrl & !control::GAIN_MASK) | gain.bits())?;
        self.config.gain = gain;
        Ok(())
    }

    /// Set the analog gain from a raw AGAIN field value (0..=3)
    pub fn set_gain_raw(&mut self, field: u8) -> Result<(), Error<E>> {
        match Gain::from_field(field) {
            Some(gain) => self.set_gain(gain),
            None => {
                #[cfg(feature = "defmt-03")]
                defmt::warn!("TSL2591 gain field {} rejected", field);
                Err(Error::InvalidConfig("gain field out of range"))
            }
        }
    }

    /// Read the integration time currently programmed in the device
    pub fn get_integration_time(&mut self) -> Result<IntegrationTime, Error<E>> {
        let ctrl = self.read_byte(reg::CONTROL)?;
        IntegrationTime::from_field(ctrl & control::ATIME_MASK)
            .ok_or(Error::InvalidConfig("integration time field out of range"))
    }

    /// Set the ADC integration time
    pub fn set_integration_time(&mut self, time: IntegrationTime) -> Result<(), Error<E>> {
        let ctrl = self.read_byte(reg::CONTROL)?;
        self.write_byte(reg::CONTROL, (ctrl & !control::ATIME_MASK) | time.field())?;
        self.config.integration_time = time;
        Ok(())
    }

    /// Set the integration time from a raw ATIME field value (0..=5)
    pub fn set_integration_time_raw(&mut self, field: u8) -> Result<(), Error<E>> {
        match IntegrationTime::from_field(field) {
            Some(time) => self.set_integration_time(time),
            None => {
                #[cfg(feature = "defmt-03")]
                defmt::warn!("TSL2591 integration time field {} rejected", field);
                Err(Error::InvalidConfig("integration time field out of range"))
            }
        }
    }

    /// Set the interrupt persistence filter (0..=15)
    pub fn set_persist(&mut self, filter: u8) -> Result<(), Error<E>> {
        if filter > 0x0F {
            #[cfg(feature = "defmt-03")]
            defmt::warn!("TSL2591 persistence filter {} rejected", filter);
            return Err(Error::InvalidConfig("persistence filter out of range"));
        }
        self.write_byte(reg::PERSIST, filter)
    }

    /// Read the device ID register
    pub fn device_id(&mut self) -> Result<u8, Error<E>> {
        self.read_byte(reg::ID)
    }

    /// Read the status register
    pub fn read_status(&mut self) -> Result<StatusInfo, Error<E>> {
        let status = self.read_byte(reg::STATUS)?;
        Ok(StatusInfo::from_register(status))
    }

    /// Read the channel 0 (visible + IR) count without power cycling
    pub fn read_channel0(&mut self) -> Result<u16, Error<E>> {
        self.read_word(reg::C0DATAL)
    }

    /// Read the channel 1 (IR) count without power cycling
    pub fn read_channel1(&mut self) -> Result<u16, Error<E>> {
        self.read_word(reg::C1DATAL)
    }

    /// Enable, read both channels, disable
    pub fn read_channels(&mut self) -> Result<ChannelCounts, Error<E>> {
        self.enable()?;
        let ch0 = self.read_channel0()?;
        let ch1 = self.read_channel1()?;
        self.disable()?;
        Ok(ChannelCounts { ch0, ch1 })
    }

    /// Read `(ch1 << 16) | ch0`
    pub fn read_full_spectrum(&mut self) -> Result<u32, Error<E>> {
        self.enable()?;
        let ch1 = self.read_channel1()?;
        let ch0 = self.read_channel0()?;
        self.disable()?;
        Ok(ChannelCounts { ch0, ch1 }.full_spectrum())
    }

    /// Read channel 0 alone
    pub fn read_infrared(&mut self) -> Result<u16, Error<E>> {
        self.enable()?;
        let ch0 = self.read_channel0()?;
        self.disable()?;
        Ok(ch0)
    }

    /// Read the full spectrum value minus channel 1
    pub fn read_visible(&mut self) -> Result<u32, Error<E>> {
        self.enable()?;
        let ch1 = self.read_channel1()?;
        let ch0 = self.read_channel0()?;
        self.disable()?;
        Ok(ChannelCounts { ch0, ch1 }.visible())
    }

    /// Clear pending interrupt flags
    pub fn clear_interrupt(&mut self) -> Result<(), Error<E>> {
        self.enable()?;
        self.write_byte(reg::CLEAR_INT, ll::CLEAR_INT_VALUE)?;
        self.disable()
    }

    /// Measure illuminance in lux
    ///
    /// Waits one integration period, reads both channels and clears the
    /// interrupt flags. If a channel saturated, the gain is lowered one step
    /// and the channels are polled until both report a reading.
    pub fn read_lux(&mut self) -> Result<u32, Error<E>> {
        self.enable()?;
        self.delay.delay_ms(self.config.integration_time.millis());
        self.sample_interrupt_pin();
        let ch0 = self.read_channel0()?;
        let ch1 = self.read_channel1()?;
        self.disable()?;
        self.clear_interrupt()?;

        let mut counts = ChannelCounts { ch0, ch1 };
        if lux::is_saturated(counts, self.config.integration_time) {
            counts = self.recover_from_saturation()?;
        }

        let lux = lux::lux(counts, self.config);
        #[cfg(feature = "defmt-03")]
        defmt::debug!("TSL2591 {} -> {} lux", counts, lux);
        Ok(lux)
    }

    fn recover_from_saturation(&mut self) -> Result<ChannelCounts, Error<E>> {
        let gain = self.config.gain.step_down().ok_or(Error::Overflow)?;
        #[cfg(feature = "defmt-03")]
        defmt::warn!("TSL2591 saturated, lowering gain to {}", gain);
        self.set_gain(gain)?;

        // The ADC stays enabled for the whole poll
        self.enable()?;
        let mut settled = None;
        for _ in 0..OVERFLOW_RETRY_LIMIT {
            let ch0 = self.read_channel0()?;
            let ch1 = self.read_channel1()?;
            self.delay.delay_ms(OVERFLOW_POLL_MS);
            if ch0 > 0 && ch1 > 0 {
                settled = Some(ChannelCounts { ch0, ch1 });
                break;
            }
        }
        self.disable()?;
        settled.ok_or(Error::Timeout)
    }

    /// Program interrupt thresholds in raw channel 0 counts
    ///
    /// The no-persist thresholds are set to 0..0xFFFF, which never fires.
    pub fn set_interrupt_threshold(&mut self, high: u16, low: u16) -> Result<(), Error<E>> {
        self.enable()?;
        for (register, value) in threshold_writes(high, low) {
            self.write_byte(register, value)?;
        }
        self.disable()
    }

    /// Program interrupt thresholds as a lux window around the current IR level
    ///
    /// Uses the cached gain and integration time; channel 1 is read once.
    pub fn set_lux_interrupt(
        &mut self,
        low_lux: u32,
        high_lux: u32,
    ) -> Result<InterruptThresholds, Error<E>> {
        let ch1 = self.read_channel1()?;
        let thresholds = lux::interrupt_window(low_lux, high_lux, ch1, self.config);
        #[cfg(feature = "defmt-03")]
        defmt::debug!("TSL2591 interrupt window {}", thresholds);
        self.set_interrupt_threshold(thresholds.high, thresholds.low)?;
        Ok(thresholds)
    }

    // Helper methods for register access
    fn read_byte(&mut self, register: u8) -> Result<u8, Error<E>> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(I2C_ADDRESS, &[command(register)], &mut buffer)
            .map_err(Error::I2c)?;
        Ok(buffer[0])
    }

    fn read_word(&mut self, register: u8) -> Result<u16, Error<E>> {
        let mut buffer = [0u8; 2];
        self.i2c
            .write_read(I2C_ADDRESS, &[command(register)], &mut buffer)
            .map_err(Error::I2c)?;
        Ok(u16::from_le_bytes(buffer))
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(I2C_ADDRESS, &[command(register), value])
            .map_err(Error::I2c)
    }
}

#[cfg(feature = "async")]
impl<I2C, E, Delay> Tsl2591<I2C, Delay, NoPin>
where
    I2C: AsyncI2c<Error = E>,
    Delay: AsyncDelayNs,
{
    /// Create a driver, verify the chip ID and apply the default configuration (async version)
    pub async fn new_async(i2c: I2C, delay: Delay) -> Result<Self, Error<E>> {
        let mut sensor = Self {
            i2c,
            delay,
            int_pin: None,
            config: Config::default(),
        };
        sensor.init_async().await?;
        Ok(sensor)
    }
}

#[cfg(feature = "async")]
impl<I2C, E, Delay, IntPin> Tsl2591<I2C, Delay, IntPin>
where
    I2C: AsyncI2c<Error = E>,
    Delay: AsyncDelayNs,
    IntPin: InputPin,
{
    async fn init_async(&mut self) -> Result<(), Error<E>> {
        let id = self.read_byte_async(reg::ID).await?;
        if id != ll::DEVICE_ID {
            #[cfg(feature = "defmt-03")]
            defmt::error!("TSL2591 not found, ID = {:#x}", id);
            return Err(Error::InvalidDeviceId {
                expected: ll::DEVICE_ID,
                found: id,
            });
        }

        self.enable_async().await?;
        self.set_gain_async(Gain::Medium).await?;
        self.set_integration_time_async(IntegrationTime::Ms100)
            .await?;
        self.write_byte_async(reg::PERSIST, DEFAULT_PERSIST).await?;
        self.disable_async().await
    }

    /// Power on with the ADC and both interrupt sources enabled (async version)
    pub async fn enable_async(&mut self) -> Result<(), Error<E>> {
        self.write_byte_async(reg::ENABLE, enable::ACTIVE).await
    }

    /// Power the device down (async version)
    pub async fn disable_async(&mut self) -> Result<(), Error<E>> {
        self.write_byte_async(reg::ENABLE, enable::POWER_OFF).await
    }

    /// Read the gain currently programmed in the device (async version)
    pub async fn get_gain_async(&mut self) -> Result<Gain, Error<E>> {
        let ctrl = self.read_byte_async(reg::CONTROL).await?;
        Gain::from_field((ctrl & control::GAIN_MASK) >> control::GAIN_SHIFT)
            .ok_or(Error::InvalidConfig("gain"))
    }

    /// Set the analog gain (async version)
    pub async fn set_gain_async(&mut self, gain: Gain) -> Result<(), Error<E>> {
        let ctrl = self.read_byte_async(reg::CONTROL).await?;
        self.write_byte_async(reg::CONTROL, (ctrl & !control::GAIN_MASK) | gain.bits())
            .await?;
        self.config.gain = gain;
        Ok(())
    }

    /// Set the analog gain from a raw AGAIN field value (async version)
    pub async fn set_gain_raw_async(&mut self, field: u8) -> Result<(), Error<E>> {
        match Gain::from_field(field) {
            Some(gain) => self.set_gain_async(gain).await,
            None => {
                #[cfg(feature = "defmt-03")]
                defmt::warn!("TSL2591 gain field {} rejected", field);
                Err(Error::InvalidConfig("gain field out of range"))
            }
        }
    }

    /// Read the integration time currently programmed in the device (async version)
    pub async fn get_integration_time_async(&mut self) -> Result<IntegrationTime, Error<E>> {
        let ctrl = self.read_byte_async(reg::CONTROL).await?;
        IntegrationTime::from_field(ctrl & control::ATIME_MASK)
            .ok_or(Error::InvalidConfig("integration time field out of range"))
    }

    /// Set the ADC integration time (async version)
    pub async fn set_integration_time_async(
        &mut self,
        time: IntegrationTime,
    ) -> Result<(), Error<E>> {
        let ctrl = self.read_byte_async(reg::CONTROL).await?;
        self.write_byte_async(reg::CONTROL, (ctrl & !control::ATIME_MASK) | time.field())
            .await?;
        self.config.integration_time = time;
        Ok(())
    }

    /// Set the integration time from a raw ATIME field value (async version)
    pub async fn set_integration_time_raw_async(&mut self, field: u8) -> Result<(), Error<E>> {
        match IntegrationTime::from_field(field) {
            Some(time) => self.set_integration_time_async(time).await,
            None => {
                #[cfg(feature = "defmt-03")]
                defmt::warn!("TSL2591 integration time field {} rejected", field);
                Err(Error::InvalidConfig("integration time field out of range"))
            }
        }
    }

    /// Set the interrupt persistence filter (async version)
    pub async fn set_persist_async(&mut self, filter: u8) -> Result<(), Error<E>> {
        if filter > 0x0F {
            #[cfg(feature = "defmt-03")]
            defmt::warn!("TSL2591 persistence filter {} rejected", filter);
            return Err(Error::InvalidConfig("persistence filter out of range"));
        }
        self.write_byte_async(reg::PERSIST, filter).await
    }

    /// Read the device ID register (async version)
    pub async fn device_id_async(&mut self) -> Result<u8, Error<E>> {
        self.read_byte_async(reg::ID).await
    }

    /// Read the status register (async version)
    pub async fn read_status_async(&mut self) -> Result<StatusInfo, Error<E>> {
        let status = self.read_byte_async(reg::STATUS).await?;
        Ok(StatusInfo::from_register(status))
    }

    /// Read the channel 0 count without power cycling (async version)
    pub async fn read_channel0_async(&mut self) -> Result<u16, Error<E>> {
        self.read_word_async(reg::C0DATAL).await
    }

    /// Read the channel 1 count without power cycling (async version)
    pub async fn read_channel1_async(&mut self) -> Result<u16, Error<E>> {
        self.read_word_async(reg::C1DATAL).await
    }

    /// Enable, read both channels, disable (async version)
    pub async fn read_channels_async(&mut self) -> Result<ChannelCounts, Error<E>> {
        self.enable_async().await?;
        let ch0 = self.read_channel0_async().await?;
        let ch1 = self.read_channel1_async().await?;
        self.disable_async().await?;
        Ok(ChannelCounts { ch0, ch1 })
    }

    /// Read `(ch1 << 16) | ch0` (async version)
    pub async fn read_full_spectrum_async(&mut self) -> Result<u32, Error<E>> {
        self.enable_async().await?;
        let ch1 = self.read_channel1_async().await?;
        let ch0 = self.read_channel0_async().await?;
        self.disable_async().await?;
        Ok(ChannelCounts { ch0, ch1 }.full_spectrum())
    }

    /// Read channel 0 alone (async version)
    pub async fn read_infrared_async(&mut self) -> Result<u16, Error<E>> {
        self.enable_async().await?;
        let ch0 = self.read_channel0_async().await?;
        self.disable_async().await?;
        Ok(ch0)
    }

    /// Read the full spectrum value minus channel 1 (async version)
    pub async fn read_visible_async(&mut self) -> Result<u32, Error<E>> {
        self.enable_async().await?;
        let ch1 = self.read_channel1_async().await?;
        let ch0 = self.read_channel0_async().await?;
        self.disable_async().await?;
        Ok(ChannelCounts { ch0, ch1 }.visible())
    }

    /// Clear pending interrupt flags (async version)
    pub async fn clear_interrupt_async(&mut self) -> Result<(), Error<E>> {
        self.enable_async().await?;
        self.write_byte_async(reg::CLEAR_INT, ll::CLEAR_INT_VALUE)
            .await?;
        self.disable_async().await
    }

    /// Measure illuminance in lux (async version)
    pub async fn read_lux_async(&mut self) -> Result<u32, Error<E>> {
        self.enable_async().await?;
        self.delay
            .delay_ms(self.config.integration_time.millis())
            .await;
        self.sample_interrupt_pin();
        let ch0 = self.read_channel0_async().await?;
        let ch1 = self.read_channel1_async().await?;
        self.disable_async().await?;
        self.clear_interrupt_async().await?;

        let mut counts = ChannelCounts { ch0, ch1 };
        if lux::is_saturated(counts, self.config.integration_time) {
            counts = self.recover_from_saturation_async().await?;
        }

        let lux = lux::lux(counts, self.config);
        #[cfg(feature = "defmt-03")]
        defmt::debug!("TSL2591 {} -> {} lux", counts, lux);
        Ok(lux)
    }

    async fn recover_from_saturation_async(&mut self) -> Result<ChannelCounts, Error<E>> {
        let gain = self.config.gain.step_down().ok_or(Error::Overflow)?;
        #[cfg(feature = "defmt-03")]
        defmt::warn!("TSL2591 saturated, lowering gain to {}", gain);
        self.set_gain_async(gain).await?;

        // The ADC stays enabled for the whole poll
        self.enable_async().await?;
        let mut settled = None;
        for _ in 0..OVERFLOW_RETRY_LIMIT {
            let ch0 = self.read_channel0_async().await?;
            let ch1 = self.read_channel1_async().await?;
            self.delay.delay_ms(OVERFLOW_POLL_MS).await;
            if ch0 > 0 && ch1 > 0 {
                settled = Some(ChannelCounts { ch0, ch1 });
                break;
            }
        }
        self.disable_async().await?;
        settled.ok_or(Error::Timeout)
    }

    /// Program interrupt thresholds in raw channel 0 counts (async version)
    pub async fn set_interrupt_threshold_async(
        &mut self,
        high: u16,
        low: u16,
    ) -> Result<(), Error<E>> {
        self.enable_async().await?;
        for (register, value) in threshold_writes(high, low) {
            self.write_byte_async(register, value).await?;
        }
        self.disable_async().await
    }

    /// Program interrupt thresholds as a lux window (async version)
    pub async fn set_lux_interrupt_async(
        &mut self,
        low_lux: u32,
        high_lux: u32,
    ) -> Result<InterruptThresholds, Error<E>> {
        let ch1 = self.read_channel1_async().await?;
        let thresholds = lux::interrupt_window(low_lux, high_lux, ch1, self.config);
        #[cfg(feature = "defmt-03")]
        defmt::debug!("TSL2591 interrupt window {}", thresholds);
        self.set_interrupt_threshold_async(thresholds.high, thresholds.low)
            .await?;
        Ok(thresholds)
    }

    // Helper methods for async register access
    async fn read_byte_async(&mut self, register: u8) -> Result<u8, Error<E>> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(I2C_ADDRESS, &[command(register)], &mut buffer)
            .await
            .map_err(Error::I2c)?;
        Ok(buffer[0])
    }

    async fn read_word_async(&mut self, register: u8) -> Result<u16, Error<E>> {
        let mut buffer = [0u8; 2];
        self.i2c
            .write_read(I2C_ADDRESS, &[command(register)], &mut buffer)
            .await
            .map_err(Error::I2c)?;
        Ok(u16::from_le_bytes(buffer))
    }

    async fn write_byte_async(&mut self, register: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(I2C_ADDRESS, &[command(register), value])
            .await
            .map_err(Error::I2c)
    }
}
