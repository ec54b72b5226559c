//! FAT packed date/time fields <-> `chrono::NaiveDateTime`.
//!
//! Date: bits 15-9 year offset from 1980, bits 8-5 month (1-12), bits 4-0 day
//! (1-31). Time: bits 15-11 hours, bits 10-5 minutes, bits 4-0 seconds/2.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

pub fn pack_date(date: NaiveDate) -> u16 {
    let year_offset = (date.year() - 1980).clamp(0, 127) as u16;
    (year_offset << 9) | ((date.month() as u16) << 5) | date.day() as u16
}

pub fn pack_time(time: NaiveTime) -> u16 {
    ((time.hour() as u16) << 11) | ((time.minute() as u16) << 5) | (time.second() as u16 / 2)
}

pub fn unpack_date(raw: u16) -> NaiveDate {
    let year = 1980 + (raw >> 9) as i32;
    let month = ((raw >> 5) & 0x0F).max(1) as u32;
    let day = (raw & 0x1F).max(1) as u32;
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| NaiveDate::from_ymd_opt(1980, 1, 1).unwrap())
}

pub fn unpack_time(raw: u16) -> NaiveTime {
    let hour = (raw >> 11) & 0x1F;
    let minute = (raw >> 5) & 0x3F;
    let second = (raw & 0x1F) * 2;
    NaiveTime::from_hms_opt(hour as u32, minute as u32, second as u32).unwrap_or_default()
}

/// `create_time_tenth` holds hundredths of a second beyond `pack_time`'s
/// two-second resolution, in [0, 199].
pub fn pack_tenth(time: NaiveTime) -> u8 {
    ((time.second() % 2) * 100 + time.nanosecond() / 10_000_000) as u8
}

pub fn to_naive(date_raw: u16, time_raw: u16) -> NaiveDateTime {
    NaiveDateTime::new(unpack_date(date_raw), unpack_time(time_raw))
}

pub fn from_naive(dt: NaiveDateTime) -> (u16, u16) {
    (pack_date(dt.date()), pack_time(dt.time()))
}

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}
