//! Lux and interrupt-threshold conversions
//!
//! Everything here is a pure function of the cached [`Config`] and a pair of
//! channel counts, so the same math backs both the blocking and the async
//! driver and can be used offline on logged counts.

use crate::ll::{LUX_DF, MAX_COUNT, MAX_COUNT_100MS};
use crate::{ChannelCounts, Config, IntegrationTime};

/// Interrupt thresholds in raw channel 0 counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct InterruptThresholds {
    /// Lower bound of the no-interrupt window
    pub low: u16,
    /// Upper bound of the no-interrupt window
    pub high: u16,
}

/// Saturation count for an integration time
///
/// The 100ms setting has a reduced ADC ceiling.
pub const fn max_counts(integration_time: IntegrationTime) -> u16 {
    match integration_time {
        IntegrationTime::Ms100 => MAX_COUNT_100MS,
        _ => MAX_COUNT,
    }
}

/// True when either channel reached the ADC ceiling
pub fn is_saturated(counts: ChannelCounts, integration_time: IntegrationTime) -> bool {
    let max = max_counts(integration_time);
    counts.ch0 >= max || counts.ch1 >= max
}

/// Counts per lux (Cpl) for the given gain and integration time
///
/// Approximate. [`lux`] and [`interrupt_window`] work on the exact integer
/// ratio instead.
pub fn counts_per_lux(config: Config) -> f32 {
    scale(config) as f32 / LUX_DF as f32
}

/// Integration time in ms times the analog gain factor, the numerator of Cpl
fn scale(config: Config) -> i64 {
    i64::from(config.integration_time.millis()) * i64::from(config.gain.factor())
}

/// Convert raw channel counts to lux
///
/// `lux = floor((ch0 - 2 * ch1) / Cpl)`, clamped at zero.
pub fn lux(counts: ChannelCounts, config: Config) -> u32 {
    let visible = i64::from(counts.ch0) - 2 * i64::from(counts.ch1);
    let lux = (visible * i64::from(LUX_DF)).div_euclid(scale(config));
    lux.clamp(0, i64::from(u32::MAX)) as u32
}

/// Convert a lux window into channel 0 thresholds around the current IR level
///
/// The window is widened by one count on each side. Results outside the
/// 16-bit register range saturate.
pub fn interrupt_window(
    low_lux: u32,
    high_lux: u32,
    ch1: u16,
    config: Config,
) -> InterruptThresholds {
    let ir = 2 * i64::from(ch1);
    let low = lux_to_counts(low_lux, config) + ir + 1;
    let high = lux_to_counts(high_lux, config) + ir - 1;

    InterruptThresholds {
        low: saturate(low),
        high: saturate(high),
    }
}

/// `floor(Cpl * lux)`
fn lux_to_counts(lux: u32, config: Config) -> i64 {
    (i64::from(lux) * scale(config)).div_euclid(i64::from(LUX_DF))
}

fn saturate(value: i64) -> u16 {
    value.clamp(0, i64::from(u16::MAX)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gain;

    fn config(gain: Gain, integration_time: IntegrationTime) -> Config {
        Config {
            gain,
            integration_time,
        }
    }

    #[test]
    fn test_counts_per_lux() {
        assert_eq!(counts_per_lux(Config::default()), 2500.0 / 762.0);
        assert_eq!(
            counts_per_lux(config(Gain::Max, IntegrationTime::Ms600)),
            5_925_600.0 / 762.0
        );
    }

    #[test]
    fn test_lux_medium_gain_100ms() {
        let counts = ChannelCounts { ch0: 1000, ch1: 100 };
        assert_eq!(lux(counts, Config::default()), 243);
    }

    #[test]
    fn test_lux_clamped_to_zero() {
        let counts = ChannelCounts { ch0: 0, ch1: 500 };
        assert_eq!(lux(counts, Config::default()), 0);

        let counts = ChannelCounts { ch0: 200, ch1: 100 };
        assert_eq!(lux(counts, Config::default()), 0);
    }

    #[test]
    fn test_lux_low_gain() {
        // 798 / (100 / 762) = 6080.76
        let counts = ChannelCounts { ch0: 1000, ch1: 101 };
        assert_eq!(lux(counts, config(Gain::Low, IntegrationTime::Ms100)), 6080);
    }

    #[test]
    fn test_lux_exact_quotients_are_not_rounded_down() {
        // 100 / (100 / 762) is exactly 762
        let counts = ChannelCounts { ch0: 100, ch1: 0 };
        assert_eq!(lux(counts, config(Gain::Low, IntegrationTime::Ms100)), 762);

        let counts = ChannelCounts { ch0: 50, ch1: 0 };
        assert_eq!(lux(counts, config(Gain::Low, IntegrationTime::Ms100)), 381);

        let counts = ChannelCounts { ch0: 1200, ch1: 100 };
        assert_eq!(lux(counts, config(Gain::Low, IntegrationTime::Ms200)), 3810);
    }

    #[test]
    fn test_lux_full_scale_at_lowest_sensitivity() {
        let counts = ChannelCounts { ch0: u16::MAX, ch1: 0 };
        assert_eq!(
            lux(counts, config(Gain::Low, IntegrationTime::Ms100)),
            65535 * 762 / 100
        );
    }

    #[test]
    fn test_saturation_ceiling_depends_on_integration_time() {
        let counts = ChannelCounts { ch0: 36863, ch1: 0 };
        assert!(is_saturated(counts, IntegrationTime::Ms100));
        assert!(!is_saturated(counts, IntegrationTime::Ms200));

        let counts = ChannelCounts { ch0: 0, ch1: 65535 };
        assert!(is_saturated(counts, IntegrationTime::Ms600));

        let counts = ChannelCounts { ch0: 36862, ch1: 36862 };
        assert!(!is_saturated(counts, IntegrationTime::Ms100));
    }

    #[test]
    fn test_interrupt_window() {
        // Cpl = 3.2808: 50 lux -> 164 counts, 200 lux -> 656 counts
        let thresholds = interrupt_window(50, 200, 100, Config::default());
        assert_eq!(
            thresholds,
            InterruptThresholds {
                low: 164 + 200 + 1,
                high: 656 + 200 - 1,
            }
        );
    }

    #[test]
    fn test_interrupt_window_uses_exact_counts_per_lux() {
        // 887 * 42800 / 762 = 49820.997..., floored to 49820
        let thresholds = interrupt_window(
            887,
            887,
            0,
            config(Gain::High, IntegrationTime::Ms100),
        );
        assert_eq!(
            thresholds,
            InterruptThresholds {
                low: 49821,
                high: 49819,
            }
        );

        // 381 lux at 1x / 100ms is exactly 50 counts
        let thresholds = interrupt_window(
            381,
            762,
            10,
            config(Gain::Low, IntegrationTime::Ms100),
        );
        assert_eq!(
            thresholds,
            InterruptThresholds {
                low: 50 + 20 + 1,
                high: 100 + 20 - 1,
            }
        );
    }

    #[test]
    fn test_interrupt_window_saturates() {
        let thresholds = interrupt_window(0, 0, 0, Config::default());
        assert_eq!(thresholds.low, 1);
        assert_eq!(thresholds.high, 0);

        let thresholds = interrupt_window(
            1_000,
            100_000,
            60_000,
            config(Gain::Max, IntegrationTime::Ms600),
        );
        assert_eq!(thresholds.low, u16::MAX);
        assert_eq!(thresholds.high, u16::MAX);
    }
}
