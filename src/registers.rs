//! Register definitions and bitfield structures for the SD3078 RTC.
//!
//! This module contains the register map, the sizes of the multi-byte
//! blocks, and bitfield definitions for every register the driver touches.
//! The bit ranges of the date/time registers are the masks applied before
//! packed-decimal decoding, so `Hours::bcd()` is `raw & 0x3F`, `Month::bcd()`
//! is `raw & 0x1F` and so on.

use bitfield::bitfield;

/// Register addresses for the SD3078 RTC.
///
/// Alarm and countdown registers (0x07-0x0E, 0x11-0x15) are not driven.
#[allow(unused)]
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegAddr {
    /// Seconds register (0-59)
    Seconds = 0x00,
    /// Minutes register (0-59)
    Minutes = 0x01,
    /// Hours register (0-23, bit 7 selects 24-hour mode)
    Hours = 0x02,
    /// Weekday register (0-6, 0 = Sunday)
    Weekday = 0x03,
    /// Day of month register (1-31)
    Day = 0x04,
    /// Month register (1-12)
    Month = 0x05,
    /// Year register (0-99, offset from 2000)
    Year = 0x06,
    /// Control register 1 (CTR1): write-enable bits 7 and 2, power-lost flag
    Control1 = 0x0F,
    /// Control register 2 (CTR2): write-enable bit 7
    Control2 = 0x10,
    /// Current temperature, two's complement degrees Celsius
    Temperature = 0x16,
    /// I2C interface control while running from battery
    IicControl = 0x17,
    /// Battery charge control
    ChargeControl = 0x18,
    /// Control register 5 (CTR5): bit 7 is bit 8 of the battery voltage
    Control5 = 0x1A,
    /// Battery voltage, low eight bits
    BatteryVoltage = 0x1B,
    /// Lowest temperature seen
    TemperatureLow = 0x1E,
    /// Highest temperature seen
    TemperatureHigh = 0x1F,
    /// First register (minutes) of the lowest-temperature timestamp block
    TemperatureLowTime = 0x20,
    /// First register (minutes) of the highest-temperature timestamp block
    TemperatureHighTime = 0x26,
    /// First byte of the general purpose user RAM
    UserRam = 0x2C,
    /// First byte of the factory identity block
    DeviceId = 0x72,
}

/// Number of contiguous date/time registers starting at [`RegAddr::Seconds`].
pub const DATETIME_LEN: usize = 7;
/// Length of each temperature event timestamp block (no seconds register).
pub const EVENT_TIME_LEN: usize = 6;
/// Size of the general purpose user RAM (0x2C..=0x71).
pub const USER_RAM_LEN: usize = 70;
/// Size of the factory identity block (0x72..=0x79).
pub const DEVICE_ID_LEN: usize = 8;

// This macro generates the From<u8> and Into<u8> implementations for the
// register type
macro_rules! from_register_u8 {
    ($typ:ty) => {
        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                Self(v)
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v.0
            }
        }
        #[cfg(feature = "defmt")]
        impl defmt::Format for $typ {
            fn format(&self, f: defmt::Formatter) {
                defmt::write!(f, "{}({=u8:#x})", stringify!($typ), self.0);
            }
        }
    };
}

bitfield! {
    /// Seconds register (0-59), packed decimal.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Seconds(u8);
    impl Debug;
    /// Packed decimal seconds (mask 0x7F)
    pub bcd, set_bcd: 6, 0;
}
from_register_u8!(Seconds);

bitfield! {
    /// Minutes register (0-59), packed decimal.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Minutes(u8);
    impl Debug;
    /// Packed decimal minutes (mask 0x7F)
    pub bcd, set_bcd: 6, 0;
}
from_register_u8!(Minutes);

bitfield! {
    /// Hours register, packed decimal with the 12/24 select bit.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Hours(u8);
    impl Debug;
    /// Set for 24-hour mode; the driver always writes it set
    pub twenty_four_hour, set_twenty_four_hour: 7;
    /// Packed decimal hours (mask 0x3F)
    pub bcd, set_bcd: 5, 0;
}
from_register_u8!(Hours);

bitfield! {
    /// Weekday register (0-6), packed decimal.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Weekday(u8);
    impl Debug;
    /// Weekday (mask 0x07)
    pub bcd, set_bcd: 2, 0;
}
from_register_u8!(Weekday);

bitfield! {
    /// Day of month register (1-31), packed decimal.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Day(u8);
    impl Debug;
    /// Packed decimal day (mask 0x3F)
    pub bcd, set_bcd: 5, 0;
}
from_register_u8!(Day);

bitfield! {
    /// Month register (1-12), packed decimal.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Month(u8);
    impl Debug;
    /// Packed decimal month (mask 0x1F)
    pub bcd, set_bcd: 4, 0;
}
from_register_u8!(Month);

bitfield! {
    /// Year register (0-99), packed decimal offset from 2000.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Year(u8);
    impl Debug;
    /// Packed decimal year (mask 0x7F)
    pub bcd, set_bcd: 6, 0;
}
from_register_u8!(Year);

bitfield! {
    /// Control register 1 (CTR1).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Control1(u8);
    impl Debug;
    /// WRTC3 write-enable bit
    pub write_enable3, set_write_enable3: 7;
    /// WRTC2 write-enable bit
    pub write_enable2, set_write_enable2: 2;
    /// RTCF, set when backup power was lost since the clock was last written
    pub power_lost, set_power_lost: 0;
}
from_register_u8!(Control1);

bitfield! {
    /// Control register 2 (CTR2).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Control2(u8);
    impl Debug;
    /// WRTC1 write-enable bit
    pub write_enable1, set_write_enable1: 7;
}
from_register_u8!(Control2);

bitfield! {
    /// Control register 5 (CTR5).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Control5(u8);
    impl Debug;
    /// Bit 8 of the 9-bit battery voltage
    pub battery_voltage_bit8, set_battery_voltage_bit8: 7;
}
from_register_u8!(Control5);

bitfield! {
    /// Battery charge control register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct ChargeControl(u8);
    impl Debug;
    /// Trickle charge enable
    pub charge_enable, set_charge_enable: 7;
    /// Charge current limiting resistor select
    pub charge_resistor, set_charge_resistor: 1, 0;
}
from_register_u8!(ChargeControl);

impl ChargeControl {
    /// Register value written to enable charging.
    pub const ENABLED: ChargeControl = ChargeControl(0x82);
    /// Register value written to disable charging.
    pub const DISABLED: ChargeControl = ChargeControl(0x00);
}

bitfield! {
    /// I2C-under-battery control register.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct IicControl(u8);
    impl Debug;
    /// Keep the I2C interface alive while running from battery
    pub battery_iic_enable, set_battery_iic_enable: 7;
}
from_register_u8!(IicControl);

impl IicControl {
    /// Register value written to enable I2C under battery power.
    pub const ENABLED: IicControl = IicControl(0x80);
    /// Register value written to disable I2C under battery power.
    pub const DISABLED: IicControl = IicControl(0x00);
}

bitfield! {
    /// Temperature register, signed degrees Celsius.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Temperature(u8);
    impl Debug;
    /// Temperature in degrees Celsius
    pub i8, temperature, set_temperature: 7, 0;
}
from_register_u8!(Temperature);
