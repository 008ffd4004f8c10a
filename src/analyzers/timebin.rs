use chrono::{NaiveTime, Timelike};
use serde::Serialize;

/// A 3-hour partition of the day, index 0 (midnight to 3am) through 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimeBin(u8);

impl TimeBin {
    pub const COUNT: usize = 8;
    pub const HOURS: u32 = 3;

    pub fn of(time: NaiveTime) -> Self {
        TimeBin((time.hour() / Self::HOURS) as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl Iterator<Item = TimeBin> {
        (0..Self::COUNT as u8).map(TimeBin)
    }

    /// Column label used in heatmap output.
    ///
    /// | Bin | Label               |
    /// |-----|---------------------|
    /// | 0   | 12:00am - 3:00am    |
    /// | 1   | 3:00am - 6:00am     |
    /// | 2   | 6:00am - 9:00am     |
    /// | 3   | 9:00am - 12:00pm    |
    /// | 4   | 12:00pm - 3:00pm    |
    /// | 5   | 3:00pm - 6:00pm     |
    /// | 6   | 6:00pm - 9:00pm     |
    /// | 7   | 9:00pm - 12:00am    |
    pub fn label(self) -> &'static str {
        match self.0 {
            0 => "12:00am - 3:00am",
            1 => "3:00am - 6:00am",
            2 => "6:00am - 9:00am",
            3 => "9:00am - 12:00pm",
            4 => "12:00pm - 3:00pm",
            5 => "3:00pm - 6:00pm",
            6 => "6:00pm - 9:00pm",
            _ => "9:00pm - 12:00am",
        }
    }
}
