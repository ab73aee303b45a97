//! A platform-agnostic driver for the SD3078 real-time clock.
//!
//! The SD3078 is an I2C real-time clock with a temperature sensor, a
//! rechargeable backup battery monitor, 70 bytes of battery-backed user RAM
//! and an 8-byte factory identity block. This driver is built on the
//! blocking `embedded-hal` 1.0 I2C traits.
//!
//! # Features
//!
//! - Read and set the date and time, optionally seeding a host clock on read
//! - Power-lost detection, so callers know when the held time is stale
//! - Battery voltage, charge control and I2C-under-battery control
//! - Current temperature plus the recorded extremes and when they happened
//! - Bounds-checked access to the user RAM
//! - A timekeeping-only variant, [`SD3078Lite`]
//! - Optional `log` or `defmt` logging
//!
//! # Write protection
//!
//! The chip ignores writes unless three write-enable bits spread over the
//! two control registers are set, and the order matters: CTR2 first, then
//! CTR1. Every write this driver performs runs inside that sequence and the
//! bits are cleared again (CTR1, then CTR2) before the call returns, whether
//! the write succeeded or not.
//!
//! # Concurrency
//!
//! The write-enable state lives on the chip, so two callers interleaving
//! transactions on one chip will corrupt the sequence. The driver takes
//! `&mut self` for every operation; callers sharing a bus must serialize
//! all access to one driver instance themselves.
//!
//! # Example
//!
//! ```rust,ignore
//! use sd3078::{Timestamp, SD3078};
//!
//! let mut rtc = SD3078::with_host_clock(i2c, system_clock);
//!
//! if rtc.power_lost()? {
//!     rtc.set_time(&Timestamp {
//!         year: 2023,
//!         month: 6,
//!         day: 30,
//!         hour: 12,
//!         minute: 31,
//!         second: 20,
//!         weekday: 4,
//!         yearday: 0,
//!     })?;
//! }
//!
//! // Also seeds `system_clock`
//! let now = rtc.time()?;
//! let volts = f32::from(rtc.battery_voltage()?) / 100.0;
//! ```

#![no_std]

use embedded_hal::i2c::I2c;
use heapless::Vec;
use paste::paste;

cfg_if::cfg_if! {
    if #[cfg(feature = "log")] {
        use log::{debug, warn};
    } else if #[cfg(feature = "defmt")] {
        use defmt::{debug, warn};
    } else {
        macro_rules! debug {
            ($($arg:tt)*) => {};
        }
        macro_rules! warn {
            ($($arg:tt)*) => {};
        }
    }
}

pub mod bcd;
pub mod datetime;
pub mod identity;
pub mod lite;
pub mod registers;

pub use bcd::{CodecError, CodecPolicy};
pub use datetime::{EventTime, FieldCountError, HostClock, Timestamp};
pub use identity::DeviceId;
pub use lite::SD3078Lite;
pub use registers::*;

use datetime::{SD3078DateTime, SD3078EventTime};

/// Fixed I2C address of the SD3078.
pub const DEFAULT_ADDRESS: u8 = 0x32;

/// Driver configuration.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Whether invalid values and out-of-range requests are silently
    /// zeroed/ignored or reported as errors
    pub codec_policy: CodecPolicy,
}

/// Errors returned by the driver.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SD3078Error<I2CE> {
    /// Bus error, passed through from the I2C implementation
    I2c(I2CE),
    /// A date/time field could not be encoded or a register could not be
    /// decoded (strict policy only)
    Codec(CodecError),
    /// User RAM access outside 0-69 (strict policy only)
    OutOfRange,
    /// Host timestamp tuple with the wrong number of fields (strict policy only)
    InvalidFieldCount(usize),
}

impl<I2CE> From<I2CE> for SD3078Error<I2CE> {
    fn from(e: I2CE) -> Self {
        SD3078Error::I2c(e)
    }
}

/// Current temperature and the recorded extremes, in degrees Celsius.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperatures {
    /// Current temperature
    pub current: i8,
    /// Highest temperature recorded, see [`SD3078::temperature_event_times`]
    pub high: i8,
    /// Lowest temperature recorded
    pub low: i8,
}

/// SD3078 Real-Time Clock driver.
///
/// `CLK` receives every timestamp read by [`SD3078::time`]; the default `()`
/// discards it.
pub struct SD3078<I2C: I2c, CLK: HostClock = ()> {
    i2c: I2C,
    address: u8,
    config: Config,
    clock: CLK,
}

impl<I2C: I2c> SD3078<I2C> {
    /// Creates a driver with no host clock and the lenient policy.
    pub fn new(i2c: I2C) -> Self {
        Self::with_host_clock(i2c, ())
    }
}

impl<I2C: I2c, CLK: HostClock> SD3078<I2C, CLK> {
    /// Creates a driver that forwards every time read to `clock`.
    pub fn with_host_clock(i2c: I2C, clock: CLK) -> Self {
        Self {
            i2c,
            address: DEFAULT_ADDRESS,
            config: Config::default(),
            clock,
        }
    }

    /// Applies `config`. Nothing is written to the chip.
    pub fn configure(&mut self, config: &Config) {
        debug!("SD3078: codec policy {:?}", config.codec_policy);
        self.config = *config;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Releases the bus.
    pub fn destroy(self) -> I2C {
        self.i2c
    }

    fn read_registers(
        &mut self,
        register: u8,
        data: &mut [u8],
    ) -> Result<(), SD3078Error<I2C::Error>> {
        self.i2c.write_read(self.address, &[register], data)?;
        Ok(())
    }

    fn read_register(&mut self, register: RegAddr) -> Result<u8, SD3078Error<I2C::Error>> {
        let mut data = [0];
        self.read_registers(register as u8, &mut data)?;
        Ok(data[0])
    }

    fn write_register(
        &mut self,
        register: RegAddr,
        value: u8,
    ) -> Result<(), SD3078Error<I2C::Error>> {
        self.i2c.write(self.address, &[register as u8, value])?;
        Ok(())
    }

    /// Writes `data` to consecutive registers in a single transaction.
    fn write_registers(
        &mut self,
        register: u8,
        data: &[u8],
    ) -> Result<(), SD3078Error<I2C::Error>> {
        let mut frame = [0; USER_RAM_LEN + 1];
        let payload = frame
            .get_mut(1..=data.len())
            .ok_or(SD3078Error::OutOfRange)?;
        payload.copy_from_slice(data);
        frame[0] = register;
        self.i2c.write(self.address, &frame[..=data.len()])?;
        Ok(())
    }

    fn read_controls(&mut self) -> Result<(Control1, Control2), SD3078Error<I2C::Error>> {
        let mut data = [0; 2];
        self.read_registers(RegAddr::Control1 as u8, &mut data)?;
        Ok((Control1::from(data[0]), Control2::from(data[1])))
    }

    /// Sets WRTC1 (CTR2) and then WRTC2/WRTC3 (CTR1). The chip only unlocks
    /// when CTR2 is committed first.
    fn write_enable(&mut self) -> Result<(), SD3078Error<I2C::Error>> {
        let (mut ctr1, mut ctr2) = self.read_controls()?;
        ctr2.set_write_enable1(true);
        self.write_register(RegAddr::Control2, ctr2.into())?;
        ctr1.set_write_enable2(true);
        ctr1.set_write_enable3(true);
        self.write_register(RegAddr::Control1, ctr1.into())?;
        debug!("SD3078: write enabled ctr1={:?} ctr2={:?}", ctr1, ctr2);
        Ok(())
    }

    /// Clears WRTC2/WRTC3 (CTR1) and then WRTC1 (CTR2).
    ///
    /// CTR2 is written even when the CTR1 write fails; the first error is
    /// returned.
    fn write_disable(&mut self) -> Result<(), SD3078Error<I2C::Error>> {
        let (mut ctr1, mut ctr2) = self.read_controls()?;
        ctr1.set_write_enable2(false);
        ctr1.set_write_enable3(false);
        let ctr1_cleared = self.write_register(RegAddr::Control1, ctr1.into());
        ctr2.set_write_enable1(false);
        let ctr2_cleared = self.write_register(RegAddr::Control2, ctr2.into());
        ctr1_cleared?;
        ctr2_cleared?;
        debug!("SD3078: write disabled ctr1={:?} ctr2={:?}", ctr1, ctr2);
        Ok(())
    }

    /// Runs `write` with the chip unlocked and locks it again on every path.
    ///
    /// An error from `write` takes precedence over an error while locking.
    fn with_write_enabled<T>(
        &mut self,
        write: impl FnOnce(&mut Self) -> Result<T, SD3078Error<I2C::Error>>,
    ) -> Result<T, SD3078Error<I2C::Error>> {
        if let Err(e) = self.write_enable() {
            // part of the latch may already be set
            if self.write_disable().is_err() {
                warn!("SD3078: relock after failed unlock also failed");
            }
            return Err(e);
        }
        let result = write(self);
        let locked = self.write_disable();
        let value = result?;
        locked?;
        Ok(value)
    }

    /// Sets the date and time.
    ///
    /// The seven time registers are written in one transaction starting at
    /// the seconds register, hours in 24-hour mode. `yearday` is not stored.
    ///
    /// With the lenient policy a field the codec cannot represent is written
    /// as zero; with the strict policy it is rejected before any bus traffic.
    pub fn set_time(&mut self, timestamp: &Timestamp) -> Result<(), SD3078Error<I2C::Error>> {
        let raw = SD3078DateTime::from_timestamp(timestamp, self.config.codec_policy)
            .map_err(SD3078Error::Codec)?;
        let data: [u8; DATETIME_LEN] = (&raw).into();
        debug!("SD3078: set time {:?} -> {:?}", timestamp, data);
        self.with_write_enabled(|dev| dev.write_registers(RegAddr::Seconds as u8, &data))
    }

    /// Sets the date and time from the 8-field host tuple
    /// `(year, month, day, hour, minute, second, weekday, yearday)`.
    ///
    /// A tuple with any other number of fields is ignored, or reported as
    /// [`SD3078Error::InvalidFieldCount`] with the strict policy.
    pub fn set_time_fields(&mut self, fields: &[u16]) -> Result<(), SD3078Error<I2C::Error>> {
        match Timestamp::try_from(fields) {
            Ok(timestamp) => self.set_time(&timestamp),
            Err(FieldCountError(count)) if self.config.codec_policy.is_strict() => {
                Err(SD3078Error::InvalidFieldCount(count))
            }
            Err(FieldCountError(_count)) => {
                warn!("SD3078: ignoring time with {} fields", _count);
                Ok(())
            }
        }
    }

    /// Reads the date and time and hands it to the host clock.
    ///
    /// `yearday` is always 0.
    pub fn time(&mut self) -> Result<Timestamp, SD3078Error<I2C::Error>> {
        let mut data = [0; DATETIME_LEN];
        self.read_registers(RegAddr::Seconds as u8, &mut data)?;
        let timestamp = SD3078DateTime::from(data)
            .into_timestamp(self.config.codec_policy)
            .map_err(SD3078Error::Codec)?;
        debug!("SD3078: time {:?} -> {:?}", data, timestamp);
        self.clock.set_time(&timestamp);
        Ok(timestamp)
    }

    /// Whether backup power was lost since the time was last set.
    ///
    /// When this returns `true` the time held by the chip is stale and
    /// should be set again.
    pub fn power_lost(&mut self) -> Result<bool, SD3078Error<I2C::Error>> {
        Ok(self.control1()?.power_lost())
    }

    /// Battery voltage in hundredths of a volt (301 is 3.01 V).
    ///
    /// Bit 8 comes from [`Control5`] and the low byte from
    /// [`RegAddr::BatteryVoltage`], read together in one burst.
    pub fn battery_voltage(&mut self) -> Result<u16, SD3078Error<I2C::Error>> {
        let mut data = [0; 2];
        self.read_registers(RegAddr::Control5 as u8, &mut data)?;
        let bit8 = u16::from(Control5::from(data[0]).battery_voltage_bit8());
        Ok((bit8 << 8) | u16::from(data[1]))
    }

    /// Reads the factory identity block.
    pub fn device_id(&mut self) -> Result<DeviceId, SD3078Error<I2C::Error>> {
        let mut data = [0; DEVICE_ID_LEN];
        self.read_registers(RegAddr::DeviceId as u8, &mut data)?;
        Ok(DeviceId::from(data))
    }

    pub fn battery_charge_enabled(&mut self) -> Result<bool, SD3078Error<I2C::Error>> {
        Ok(self.charge_control()?.charge_enable())
    }

    /// Enables or disables trickle charging of the backup battery.
    pub fn set_battery_charge_enabled(
        &mut self,
        enabled: bool,
    ) -> Result<(), SD3078Error<I2C::Error>> {
        self.set_charge_control(if enabled {
            ChargeControl::ENABLED
        } else {
            ChargeControl::DISABLED
        })
    }

    pub fn battery_iic_enabled(&mut self) -> Result<bool, SD3078Error<I2C::Error>> {
        Ok(self.iic_control()?.battery_iic_enable())
    }

    /// Enables or disables the I2C interface while running from battery.
    pub fn set_battery_iic_enabled(&mut self, enabled: bool) -> Result<(), SD3078Error<I2C::Error>> {
        self.set_iic_control(if enabled {
            IicControl::ENABLED
        } else {
            IicControl::DISABLED
        })
    }

    /// Reads the current, highest and lowest recorded temperatures.
    pub fn temperature(&mut self) -> Result<Temperatures, SD3078Error<I2C::Error>> {
        let current = Temperature::from(self.read_register(RegAddr::Temperature)?);
        let high = Temperature::from(self.read_register(RegAddr::TemperatureHigh)?);
        let low = Temperature::from(self.read_register(RegAddr::TemperatureLow)?);
        Ok(Temperatures {
            current: current.temperature(),
            high: high.temperature(),
            low: low.temperature(),
        })
    }

    /// Reads when the highest and lowest temperatures were recorded, as
    /// `(high, low)`.
    ///
    /// The blocks hold garbage until an extreme has been recorded and are
    /// always decoded leniently.
    pub fn temperature_event_times(
        &mut self,
    ) -> Result<(EventTime, EventTime), SD3078Error<I2C::Error>> {
        let high = self.read_event_time(RegAddr::TemperatureHighTime)?;
        let low = self.read_event_time(RegAddr::TemperatureLowTime)?;
        Ok((high, low))
    }

    fn read_event_time(&mut self, register: RegAddr) -> Result<EventTime, SD3078Error<I2C::Error>> {
        let mut data = [0; EVENT_TIME_LEN];
        self.read_registers(register as u8, &mut data)?;
        Ok(SD3078EventTime::from(data).into_event_time())
    }

    /// Maps a user RAM range to its first register, `None` if the range
    /// does not fit and the policy is lenient.
    fn user_ram_register(
        &self,
        offset: usize,
        len: usize,
    ) -> Result<Option<u8>, SD3078Error<I2C::Error>> {
        match offset.checked_add(len) {
            Some(end) if end <= USER_RAM_LEN => {
                let offset = u8::try_from(offset).map_err(|_| SD3078Error::OutOfRange)?;
                Ok(Some(RegAddr::UserRam as u8 + offset))
            }
            _ if self.config.codec_policy.is_strict() => Err(SD3078Error::OutOfRange),
            _ => {
                warn!("SD3078: user RAM range {}+{} rejected", offset, len);
                Ok(None)
            }
        }
    }

    /// Reads `len` bytes of user RAM starting at `offset`.
    ///
    /// Returns `None` when `offset + len` exceeds the 70-byte region
    /// ([`SD3078Error::OutOfRange`] with the strict policy).
    pub fn read_scratch(
        &mut self,
        offset: usize,
        len: usize,
    ) -> Result<Option<Vec<u8, USER_RAM_LEN>>, SD3078Error<I2C::Error>> {
        let Some(register) = self.user_ram_register(offset, len)? else {
            return Ok(None);
        };
        let mut data = Vec::new();
        data.resize(len, 0).map_err(|_| SD3078Error::OutOfRange)?;
        if !data.is_empty() {
            self.read_registers(register, &mut data)?;
        }
        Ok(Some(data))
    }

    /// Writes `data` to user RAM starting at `offset`.
    ///
    /// Nothing is written when `offset + data.len()` exceeds the 70-byte
    /// region ([`SD3078Error::OutOfRange`] with the strict policy). Callers
    /// wanting to store structured values serialize them first.
    pub fn write_scratch(
        &mut self,
        offset: usize,
        data: &[u8],
    ) -> Result<(), SD3078Error<I2C::Error>> {
        let Some(register) = self.user_ram_register(offset, data.len())? else {
            return Ok(());
        };
        if data.is_empty() {
            return Ok(());
        }
        debug!("SD3078: user RAM write {}+{}", offset, data.len());
        self.with_write_enabled(|dev| dev.write_registers(register, data))
    }

    /// Writes a single byte of user RAM.
    pub fn write_scratch_byte(
        &mut self,
        offset: usize,
        value: u8,
    ) -> Result<(), SD3078Error<I2C::Error>> {
        self.write_scratch(offset, &[value])
    }
}

// Read-only register access
macro_rules! impl_register_read {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        impl<I2C: I2c, CLK: HostClock> SD3078<I2C, CLK> {
            $(
                #[doc = concat!("Reads the ", stringify!($name), " register.")]
                pub fn $name(&mut self) -> Result<$typ, SD3078Error<I2C::Error>> {
                    Ok(<$typ>::from(self.read_register($regaddr)?))
                }
            )+
        }
    };
}

// Read/write register access, writes always run inside the write-enable sequence
macro_rules! impl_register_access {
    ($(($name:ident, $regaddr:expr, $typ:ty)),+) => {
        impl<I2C: I2c, CLK: HostClock> SD3078<I2C, CLK> {
            $(
                paste! {
                    #[doc = concat!("Reads the ", stringify!($name), " register.")]
                    pub fn $name(&mut self) -> Result<$typ, SD3078Error<I2C::Error>> {
                        Ok(<$typ>::from(self.read_register($regaddr)?))
                    }

                    #[doc = concat!("Writes the ", stringify!($name), " register with the chip unlocked.")]
                    pub fn [<set_ $name>](&mut self, value: $typ) -> Result<(), SD3078Error<I2C::Error>> {
                        self.with_write_enabled(|dev| dev.write_register($regaddr, value.into()))
                    }
                }
            )+
        }
    };
}

impl_register_read!(
    (control1, RegAddr::Control1, Control1),
    (control2, RegAddr::Control2, Control2),
    (control5, RegAddr::Control5, Control5)
);

impl_register_access!(
    (charge_control, RegAddr::ChargeControl, ChargeControl),
    (iic_control, RegAddr::IicControl, IicControl)
);

#[cfg(test)]
mod tests {
    extern crate alloc;
    use super::*;
    use alloc::vec;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};

    const DEVICE_ADDRESS: u8 = DEFAULT_ADDRESS;

    fn setup_mock(expectations: &[I2cTrans]) -> I2cMock {
        I2cMock::new(expectations)
    }

    /// Unlock sequence for control registers currently holding `ctr1`/`ctr2`.
    fn unlock(ctr1: u8, ctr2: u8) -> [I2cTrans; 3] {
        [
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::Control1 as u8],
                vec![ctr1, ctr2],
            ),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control2 as u8, ctr2 | 0x80]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control1 as u8, ctr1 | 0x84]),
        ]
    }

    /// Relock sequence for control registers currently holding `ctr1`/`ctr2`.
    fn relock(ctr1: u8, ctr2: u8) -> [I2cTrans; 3] {
        [
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::Control1 as u8],
                vec![ctr1, ctr2],
            ),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control1 as u8, ctr1 & !0x84]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control2 as u8, ctr2 & !0x80]),
        ]
    }

    /// A write bracketed by unlock/relock, starting from locked registers
    /// with the power-lost flag set.
    fn locked_write(write: I2cTrans) -> vec::Vec<I2cTrans> {
        let mut expectations = vec::Vec::new();
        expectations.extend(unlock(0x01, 0x00));
        expectations.push(write);
        expectations.extend(relock(0x85, 0x80));
        expectations
    }

    fn sample() -> Timestamp {
        Timestamp {
            year: 2023,
            month: 6,
            day: 30,
            hour: 12,
            minute: 31,
            second: 20,
            weekday: 4,
            yearday: 0,
        }
    }

    const SAMPLE_REGISTERS: [u8; 7] = [0x20, 0x31, 0x92, 0x05, 0x30, 0x06, 0x23];

    fn strict() -> Config {
        Config {
            codec_policy: CodecPolicy::Strict,
        }
    }

    #[test]
    fn test_set_time_writes_registers_inside_unlock() {
        let mut data = vec![RegAddr::Seconds as u8];
        data.extend_from_slice(&SAMPLE_REGISTERS);
        let mock = setup_mock(&locked_write(I2cTrans::write(DEVICE_ADDRESS, data)));
        let mut dev = SD3078::new(mock);

        dev.set_time(&sample()).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_set_time_weekday_is_shifted() {
        let ts = Timestamp {
            weekday: 3,
            ..sample()
        };
        let mut data = vec![RegAddr::Seconds as u8];
        data.extend_from_slice(&SAMPLE_REGISTERS);
        data[4] = 0x04;
        let mock = setup_mock(&locked_write(I2cTrans::write(DEVICE_ADDRESS, data)));
        let mut dev = SD3078::new(mock);

        dev.set_time(&ts).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_set_time_strict_rejects_before_bus_traffic() {
        let mock = setup_mock(&[]);
        let mut dev = SD3078::new(mock);
        dev.configure(&strict());

        let ts = Timestamp {
            hour: 24,
            ..sample()
        };
        assert!(matches!(
            dev.set_time(&ts),
            Err(SD3078Error::Codec(CodecError::OutOfRange))
        ));
        dev.i2c.done();
    }

    #[test]
    fn test_set_time_fields() {
        let mut data = vec![RegAddr::Seconds as u8];
        data.extend_from_slice(&SAMPLE_REGISTERS);
        let mock = setup_mock(&locked_write(I2cTrans::write(DEVICE_ADDRESS, data)));
        let mut dev = SD3078::new(mock);

        // Wrong field count is ignored
        dev.set_time_fields(&[2023, 6, 30, 12, 31, 20, 4]).unwrap();
        dev.set_time_fields(&[2023, 6, 30, 12, 31, 20, 4, 0]).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_set_time_fields_strict_reports_count() {
        let mock = setup_mock(&[]);
        let mut dev = SD3078::new(mock);
        dev.configure(&strict());

        assert!(matches!(
            dev.set_time_fields(&[2023, 6, 30]),
            Err(SD3078Error::InvalidFieldCount(3))
        ));
        dev.i2c.done();
    }

    struct RecordingClock {
        last: Option<Timestamp>,
        calls: usize,
    }

    impl HostClock for RecordingClock {
        fn set_time(&mut self, timestamp: &Timestamp) {
            self.last = Some(*timestamp);
            self.calls += 1;
        }
    }

    #[test]
    fn test_time_decodes_and_seeds_host_clock() {
        let mut registers = SAMPLE_REGISTERS;
        registers[1] |= 0x80; // unused high bits are masked off
        let mock = setup_mock(&[I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8],
            registers.to_vec(),
        )]);
        let mut clock = RecordingClock {
            last: None,
            calls: 0,
        };
        let mut dev = SD3078::with_host_clock(mock, &mut clock);

        let ts = dev.time().unwrap();
        assert_eq!(ts, sample());
        assert_eq!(ts.yearday, 0);
        dev.destroy().done();

        assert_eq!(clock.last, Some(sample()));
        assert_eq!(clock.calls, 1);
    }

    #[test]
    fn test_time_is_idempotent() {
        let read = I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8],
            SAMPLE_REGISTERS.to_vec(),
        );
        let mock = setup_mock(&[read.clone(), read]);
        let mut dev = SD3078::new(mock);

        let first = dev.time().unwrap();
        let second = dev.time().unwrap();
        assert_eq!(first, second);
        dev.i2c.done();
    }

    #[test]
    fn test_time_strict_reports_malformed_registers() {
        let mut registers = SAMPLE_REGISTERS;
        registers[0] = 0x5F;
        let read = I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8],
            registers.to_vec(),
        );
        let mock = setup_mock(&[read.clone(), read]);
        let mut clock = RecordingClock {
            last: None,
            calls: 0,
        };
        let mut dev = SD3078::with_host_clock(mock, &mut clock);

        // Lenient decodes arithmetically
        assert_eq!(dev.time().unwrap().second, 65);
        dev.configure(&strict());
        assert!(matches!(
            dev.time(),
            Err(SD3078Error::Codec(CodecError::MalformedEncoding))
        ));
        dev.destroy().done();

        // The failed read is not forwarded
        assert_eq!(clock.calls, 1);
    }

    #[test]
    fn test_time_strict_reports_out_of_range_fields() {
        let mut registers = SAMPLE_REGISTERS;
        registers[2] = 0xA9; // 24-hour mode, hour 29
        registers[5] = 0x19; // month 19
        let read = I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::Seconds as u8],
            registers.to_vec(),
        );
        let mock = setup_mock(&[read.clone(), read]);
        let mut dev = SD3078::new(mock);

        let ts = dev.time().unwrap();
        assert_eq!((ts.hour, ts.month), (29, 19));
        dev.configure(&strict());
        assert!(matches!(
            dev.time(),
            Err(SD3078Error::Codec(CodecError::OutOfRange))
        ));
        dev.i2c.done();
    }

    #[test]
    fn test_power_lost() {
        let mock = setup_mock(&[
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Control1 as u8], vec![0x01]),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Control1 as u8], vec![0x84]),
        ]);
        let mut dev = SD3078::new(mock);

        assert!(dev.power_lost().unwrap());
        assert!(!dev.power_lost().unwrap());
        dev.i2c.done();
    }

    #[test]
    fn test_battery_voltage() {
        let mock = setup_mock(&[
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::Control5 as u8],
                vec![0x80, 0x2D],
            ),
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::Control5 as u8],
                vec![0x7F, 0xFF],
            ),
        ]);
        let mut dev = SD3078::new(mock);

        assert_eq!(dev.battery_voltage().unwrap(), 301);
        assert_eq!(dev.battery_voltage().unwrap(), 255);
        dev.i2c.done();
    }

    #[test]
    fn test_device_id() {
        let id = [0x21, 0x09, 0x17, 0x03, 0x12, 0x34, 0x00, 0x56];
        let mock = setup_mock(&[I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::DeviceId as u8],
            id.to_vec(),
        )]);
        let mut dev = SD3078::new(mock);

        let device_id = dev.device_id().unwrap();
        assert_eq!(device_id.bytes(), &id);
        assert_eq!(device_id.production_order(), 1234);
        dev.i2c.done();
    }

    #[test]
    fn test_battery_charge_control() {
        let mut expectations = vec![I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::ChargeControl as u8],
            vec![0x82],
        )];
        expectations.extend(locked_write(I2cTrans::write(
            DEVICE_ADDRESS,
            vec![RegAddr::ChargeControl as u8, 0x00],
        )));
        expectations.extend(locked_write(I2cTrans::write(
            DEVICE_ADDRESS,
            vec![RegAddr::ChargeControl as u8, 0x82],
        )));
        let mock = setup_mock(&expectations);
        let mut dev = SD3078::new(mock);

        assert!(dev.battery_charge_enabled().unwrap());
        dev.set_battery_charge_enabled(false).unwrap();
        dev.set_battery_charge_enabled(true).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_battery_iic_control() {
        let mut expectations = vec![I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::IicControl as u8],
            vec![0x00],
        )];
        expectations.extend(locked_write(I2cTrans::write(
            DEVICE_ADDRESS,
            vec![RegAddr::IicControl as u8, 0x80],
        )));
        let mock = setup_mock(&expectations);
        let mut dev = SD3078::new(mock);

        assert!(!dev.battery_iic_enabled().unwrap());
        dev.set_battery_iic_enabled(true).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_temperature_is_sign_corrected() {
        let mock = setup_mock(&[
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Temperature as u8], vec![0xFB]),
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::TemperatureHigh as u8],
                vec![0x28],
            ),
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::TemperatureLow as u8],
                vec![0xF0],
            ),
        ]);
        let mut dev = SD3078::new(mock);

        assert_eq!(
            dev.temperature().unwrap(),
            Temperatures {
                current: -5,
                high: 40,
                low: -16,
            }
        );
        dev.i2c.done();
    }

    #[test]
    fn test_temperature_event_times() {
        let mock = setup_mock(&[
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::TemperatureHighTime as u8],
                vec![0x31, 0x12, 0x05, 0x30, 0x06, 0x23],
            ),
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::TemperatureLowTime as u8],
                vec![0x05, 0x84, 0x00, 0x02, 0x01, 0x24],
            ),
        ]);
        let mut dev = SD3078::new(mock);
        dev.configure(&strict());

        let (high, low) = dev.temperature_event_times().unwrap();
        assert_eq!(
            high,
            EventTime {
                year: 2023,
                month: 6,
                day: 30,
                weekday: 4,
                hour: 12,
                minute: 31,
            }
        );
        assert_eq!(
            low,
            EventTime {
                year: 2024,
                month: 1,
                day: 2,
                weekday: 6,
                hour: 4,
                minute: 5,
            }
        );
        dev.i2c.done();
    }

    #[test]
    fn test_write_scratch_bounds() {
        let mock = setup_mock(&locked_write(I2cTrans::write(
            DEVICE_ADDRESS,
            vec![RegAddr::UserRam as u8 + 68, 0xFF, 0xFF],
        )));
        let mut dev = SD3078::new(mock);

        // One byte past the end: nothing reaches the bus
        dev.write_scratch(69, &[0xFF, 0xFF]).unwrap();
        dev.write_scratch(usize::MAX, &[0xFF]).unwrap();
        // Exactly fills the region
        dev.write_scratch(68, &[0xFF, 0xFF]).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_write_scratch_full_region() {
        let payload = [0xA5; USER_RAM_LEN];
        let mut data = vec![RegAddr::UserRam as u8];
        data.extend_from_slice(&payload);
        let mock = setup_mock(&locked_write(I2cTrans::write(DEVICE_ADDRESS, data)));
        let mut dev = SD3078::new(mock);

        dev.write_scratch(0, &payload).unwrap();
        // Empty writes never unlock the chip
        dev.write_scratch(10, &[]).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_write_scratch_strict_out_of_range() {
        let mock = setup_mock(&[]);
        let mut dev = SD3078::new(mock);
        dev.configure(&strict());

        assert!(matches!(
            dev.write_scratch(69, &[0xFF, 0xFF]),
            Err(SD3078Error::OutOfRange)
        ));
        assert!(matches!(
            dev.write_scratch_byte(70, 0x01),
            Err(SD3078Error::OutOfRange)
        ));
        dev.i2c.done();
    }

    #[test]
    fn test_write_scratch_byte() {
        let mock = setup_mock(&locked_write(I2cTrans::write(
            DEVICE_ADDRESS,
            vec![RegAddr::UserRam as u8 + 40, 6],
        )));
        let mut dev = SD3078::new(mock);

        dev.write_scratch_byte(40, 6).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_read_scratch() {
        let mock = setup_mock(&[I2cTrans::write_read(
            DEVICE_ADDRESS,
            vec![RegAddr::UserRam as u8 + 10],
            b"world".to_vec(),
        )]);
        let mut dev = SD3078::new(mock);

        let data = dev.read_scratch(10, 5).unwrap().unwrap();
        assert_eq!(&data[..], b"world");
        assert_eq!(dev.read_scratch(80, 1).unwrap(), None);
        assert_eq!(dev.read_scratch(66, 5).unwrap(), None);
        assert_eq!(dev.read_scratch(70, 0).unwrap().map(|d| d.len()), Some(0));
        dev.i2c.done();
    }

    #[test]
    fn test_read_scratch_strict_out_of_range() {
        let mock = setup_mock(&[]);
        let mut dev = SD3078::new(mock);
        dev.configure(&strict());

        assert!(matches!(
            dev.read_scratch(66, 5),
            Err(SD3078Error::OutOfRange)
        ));
        dev.i2c.done();
    }

    #[test]
    fn test_relock_after_failed_write() {
        let mut data = vec![RegAddr::Seconds as u8];
        data.extend_from_slice(&SAMPLE_REGISTERS);
        let mock = setup_mock(&locked_write(
            I2cTrans::write(DEVICE_ADDRESS, data).with_error(ErrorKind::Other),
        ));
        let mut dev = SD3078::new(mock);

        assert!(matches!(
            dev.set_time(&sample()),
            Err(SD3078Error::I2c(ErrorKind::Other))
        ));
        dev.i2c.done();
    }

    #[test]
    fn test_relock_after_failed_unlock() {
        let mut expectations = vec![
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::Control1 as u8],
                vec![0x00, 0x00],
            ),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control2 as u8, 0x80]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control1 as u8, 0x84])
                .with_error(ErrorKind::Other),
        ];
        // CTR2 was committed, so it is cleared again
        expectations.extend(relock(0x00, 0x80));
        let mock = setup_mock(&expectations);
        let mut dev = SD3078::new(mock);

        assert!(matches!(
            dev.set_battery_charge_enabled(true),
            Err(SD3078Error::I2c(ErrorKind::Other))
        ));
        dev.i2c.done();
    }

    #[test]
    fn test_relock_clears_ctr2_when_ctr1_write_fails() {
        let mut expectations = vec::Vec::new();
        expectations.extend(unlock(0x01, 0x00));
        expectations.push(I2cTrans::write(
            DEVICE_ADDRESS,
            vec![RegAddr::IicControl as u8, 0x80],
        ));
        expectations.extend([
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::Control1 as u8],
                vec![0x85, 0x80],
            ),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control1 as u8, 0x01])
                .with_error(ErrorKind::Other),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control2 as u8, 0x00]),
        ]);
        let mock = setup_mock(&expectations);
        let mut dev = SD3078::new(mock);

        assert!(matches!(
            dev.set_battery_iic_enabled(true),
            Err(SD3078Error::I2c(ErrorKind::Other))
        ));
        dev.i2c.done();
    }

    #[test]
    fn test_write_error_wins_over_relock_error() {
        let mut expectations = vec::Vec::new();
        expectations.extend(unlock(0x01, 0x00));
        expectations.push(
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::ChargeControl as u8, 0x82])
                .with_error(ErrorKind::Other),
        );
        expectations.extend([
            I2cTrans::write_read(
                DEVICE_ADDRESS,
                vec![RegAddr::Control1 as u8],
                vec![0x85, 0x80],
            ),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control1 as u8, 0x01])
                .with_error(ErrorKind::Bus),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control2 as u8, 0x00]),
        ]);
        let mock = setup_mock(&expectations);
        let mut dev = SD3078::new(mock);

        assert!(matches!(
            dev.set_battery_charge_enabled(true),
            Err(SD3078Error::I2c(ErrorKind::Other))
        ));
        dev.i2c.done();
    }

    #[test]
    fn test_relock_preserves_other_control_bits() {
        let mut expectations = vec::Vec::new();
        expectations.extend(unlock(0x31, 0x4A));
        expectations.push(I2cTrans::write(
            DEVICE_ADDRESS,
            vec![RegAddr::IicControl as u8, 0x00],
        ));
        expectations.extend(relock(0xB5, 0xCA));
        let mock = setup_mock(&expectations);
        let mut dev = SD3078::new(mock);

        dev.set_battery_iic_enabled(false).unwrap();
        dev.i2c.done();
    }

    #[test]
    fn test_raw_register_access() {
        let mock = setup_mock(&[
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Control2 as u8], vec![0x80]),
            I2cTrans::write_read(DEVICE_ADDRESS, vec![RegAddr::Control5 as u8], vec![0x80]),
        ]);
        let mut dev = SD3078::new(mock);

        assert!(dev.control2().unwrap().write_enable1());
        assert!(dev.control5().unwrap().battery_voltage_bit8());
        dev.i2c.done();
    }
}
