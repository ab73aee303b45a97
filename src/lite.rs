//! Timekeeping-only SD3078 driver.
//!
//! [`SD3078Lite`] exposes the subset of [`SD3078`] needed to keep a clock:
//! set and read the time and check the power-lost flag. It shares the
//! register codec and write-enable sequence with the full driver.
//!
//! # Example
//!
//! ```rust,ignore
//! use sd3078::SD3078Lite;
//!
//! let mut rtc = SD3078Lite::with_host_clock(i2c, system_clock);
//! if rtc.power_lost()? {
//!     rtc.set_time_fields(&[2023, 6, 30, 12, 17, 40, 4, 0])?;
//! }
//! rtc.time()?;
//! ```

use embedded_hal::i2c::I2c;

use crate::{Config, HostClock, SD3078Error, Timestamp, SD3078};

/// SD3078 driver restricted to timekeeping.
pub struct SD3078Lite<I2C: I2c, CLK: HostClock = ()> {
    inner: SD3078<I2C, CLK>,
}

impl<I2C: I2c> SD3078Lite<I2C> {
    /// Creates a driver with no host clock and the lenient policy.
    pub fn new(i2c: I2C) -> Self {
        Self {
            inner: SD3078::new(i2c),
        }
    }
}

impl<I2C: I2c, CLK: HostClock> SD3078Lite<I2C, CLK> {
    /// Creates a driver that forwards every time read to `clock`.
    pub fn with_host_clock(i2c: I2C, clock: CLK) -> Self {
        Self {
            inner: SD3078::with_host_clock(i2c, clock),
        }
    }

    pub fn configure(&mut self, config: &Config) {
        self.inner.configure(config);
    }

    /// Releases the bus.
    pub fn destroy(self) -> I2C {
        self.inner.destroy()
    }

    /// See [`SD3078::set_time`].
    pub fn set_time(&mut self, timestamp: &Timestamp) -> Result<(), SD3078Error<I2C::Error>> {
        self.inner.set_time(timestamp)
    }

    /// See [`SD3078::set_time_fields`].
    pub fn set_time_fields(&mut self, fields: &[u16]) -> Result<(), SD3078Error<I2C::Error>> {
        self.inner.set_time_fields(fields)
    }

    /// See [`SD3078::time`].
    pub fn time(&mut self) -> Result<Timestamp, SD3078Error<I2C::Error>> {
        self.inner.time()
    }

    /// See [`SD3078::power_lost`].
    pub fn power_lost(&mut self) -> Result<bool, SD3078Error<I2C::Error>> {
        self.inner.power_lost()
    }
}
