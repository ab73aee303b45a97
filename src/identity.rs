//! Factory identity block of the SD3078.
//!
//! The 8 read-only bytes at 0x72 hold packed decimal production data:
//!
//! | byte | content                 |
//! |------|-------------------------|
//! | 0-2  | production date (Y M D) |
//! | 3    | machine id              |
//! | 4-5  | production order        |
//! | 6-7  | index within the order  |

use chrono::NaiveDate;

use crate::bcd::bcd_to_dec;
use crate::datetime::BASE_YEAR;
use crate::registers::DEVICE_ID_LEN;

/// Raw factory identity of one chip.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceId(pub [u8; DEVICE_ID_LEN]);

impl DeviceId {
    /// The identity bytes as read from the chip.
    pub fn bytes(&self) -> &[u8; DEVICE_ID_LEN] {
        &self.0
    }

    /// Production date, `None` if the stored bytes are not a valid date.
    pub fn production_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(
            i32::from(BASE_YEAR) + i32::from(bcd_to_dec(self.0[0])),
            u32::from(bcd_to_dec(self.0[1])),
            u32::from(bcd_to_dec(self.0[2])),
        )
    }

    pub fn machine_id(&self) -> u8 {
        bcd_to_dec(self.0[3])
    }

    /// Production order number, four decimal digits.
    pub fn production_order(&self) -> u16 {
        self.pair(4)
    }

    /// Index of the chip within its production order, four decimal digits.
    pub fn order_index(&self) -> u16 {
        self.pair(6)
    }

    fn pair(&self, at: usize) -> u16 {
        u16::from(bcd_to_dec(self.0[at])) * 100 + u16::from(bcd_to_dec(self.0[at + 1]))
    }
}

impl From<[u8; DEVICE_ID_LEN]> for DeviceId {
    fn from(data: [u8; DEVICE_ID_LEN]) -> Self {
        DeviceId(data)
    }
}
