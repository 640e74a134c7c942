//! Continuous lux monitoring example
//!
//! This example demonstrates how to:
//! - Initialize the TSL2591 sensor
//! - Read lux with automatic gain reduction on saturation
//! - Program a lux interrupt window
//! - Read the raw infrared, visible and full spectrum values

use embedded_hal::delay::DelayNs;
use tsl2591::{Error, Tsl2591};

// This example uses linux-embedded-hal for demonstration
// Replace with your platform's I2C implementation
#[cfg(target_os = "linux")]
use linux_embedded_hal::{Delay, I2cdev};

#[cfg(target_os = "linux")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let i2c = I2cdev::new("/dev/i2c-1")?;

    println!("Initializing TSL2591 sensor...");
    let mut sensor = Tsl2591::new(i2c, Delay)?;
    let config = sensor.config();
    println!(
        "Sensor ready: gain {:?}, integration {} ms",
        config.gain,
        config.integration_time.millis()
    );

    let mut pause = Delay;
    loop {
        match sensor.read_lux() {
            Ok(lux) => println!("Lux: {}", lux),
            Err(Error::Overflow) => println!("Lux: saturated at lowest gain"),
            Err(e) => return Err(e.into()),
        }

        let thresholds = sensor.set_lux_interrupt(50, 200)?;
        println!(
            "Interrupt window: {}..{} counts",
            thresholds.low, thresholds.high
        );

        println!("Infrared light: {}", sensor.read_infrared()?);
        println!("Visible light: {}", sensor.read_visible()?);
        println!(
            "Full spectrum (IR + visible) light: {}",
            sensor.read_full_spectrum()?
        );

        pause.delay_ms(1000);
    }
}

#[cfg(not(target_os = "linux"))]
fn main() {
    println!("This example requires Linux with I2C support.");
    println!("Please adapt the I2C initialization for your platform.");
}
