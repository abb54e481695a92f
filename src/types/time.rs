use crate::error::SchedulerError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Earliest schedulable minute of a working day (08:00).
pub const DAY_START: TimeOfDay = TimeOfDay(8 * 60);
/// Latest minute a session may end (18:00).
pub const DAY_END: TimeOfDay = TimeOfDay(18 * 60);

/// Length of one occupancy segment in minutes. All session durations
/// are multiples of this.
pub const SEGMENT_MINUTES: u16 = 30;

/// Working day of the week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Day {
    pub const ALL: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
        }
    }

    pub fn short(&self) -> &'static str {
        &self.name()[..3]
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Day {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(Day::Monday),
            "tuesday" | "tue" => Ok(Day::Tuesday),
            "wednesday" | "wed" => Ok(Day::Wednesday),
            "thursday" | "thu" => Ok(Day::Thursday),
            "friday" | "fri" => Ok(Day::Friday),
            other => Err(SchedulerError::InvalidTime(format!(
                "unknown day '{other}'"
            ))),
        }
    }
}

/// A time of day, stored as minutes since midnight.
///
/// Serialized as a 24-hour `"HH:MM"` string. Must sit on the half-hour
/// grid to be usable as a session boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeOfDay(pub u16);

impl TimeOfDay {
    pub fn from_hm(hour: u16, minute: u16) -> Self {
        TimeOfDay(hour * 60 + minute)
    }

    pub fn hour(&self) -> u16 {
        self.0 / 60
    }

    pub fn minute(&self) -> u16 {
        self.0 % 60
    }

    /// Minutes since midnight
    pub fn minutes(&self) -> u16 {
        self.0
    }

    /// Index of the half-hour segment beginning at this time
    pub fn segment(&self) -> u16 {
        self.0 / SEGMENT_MINUTES
    }

    pub fn is_on_grid(&self) -> bool {
        self.0 % SEGMENT_MINUTES == 0
    }

    pub fn plus_minutes(&self, minutes: u16) -> TimeOfDay {
        TimeOfDay(self.0 + minutes)
    }

    /// Parse a 12-hour clock string like `"9:30 AM"` or `"12:00PM"`.
    ///
    /// Used only at the I/O boundary for user-declared fixed schedules;
    /// everything internal is 24-hour minutes.
    pub fn parse_12h(s: &str) -> Result<Self, SchedulerError> {
        let s = s.trim();
        let upper = s.to_ascii_uppercase();
        let (time_part, pm) = if let Some(rest) = upper.strip_suffix("PM") {
            (rest.trim().to_string(), true)
        } else if let Some(rest) = upper.strip_suffix("AM") {
            (rest.trim().to_string(), false)
        } else {
            return Err(SchedulerError::InvalidTime(format!(
                "expected AM/PM suffix in '{s}'"
            )));
        };

        let (h, m) = split_hm(&time_part)
            .ok_or_else(|| SchedulerError::InvalidTime(format!("malformed time '{s}'")))?;
        if h == 0 || h > 12 || m > 59 {
            return Err(SchedulerError::InvalidTime(format!(
                "12-hour time out of range: '{s}'"
            )));
        }

        let hour24 = match (h, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, false) => h,
            (h, true) => h + 12,
        };
        Ok(TimeOfDay::from_hm(hour24, m))
    }
}

fn split_hm(s: &str) -> Option<(u16, u16)> {
    let (h, m) = s.split_once(':')?;
    Some((h.trim().parse().ok()?, m.trim().parse().ok()?))
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = split_hm(s)
            .ok_or_else(|| SchedulerError::InvalidTime(format!("malformed time '{s}'")))?;
        if h > 23 || m > 59 {
            return Err(SchedulerError::InvalidTime(format!(
                "time out of range: '{s}'"
            )));
        }
        Ok(TimeOfDay::from_hm(h, m))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Half-hour segment indices covered by `[start, end)`.
///
/// Both bounds must sit on the half-hour grid; a 2-hour window yields
/// four segments.
pub fn segments(start: TimeOfDay, end: TimeOfDay) -> impl Iterator<Item = u16> {
    start.segment()..end.segment()
}

/// Whether the two half-open ranges share any minute
pub fn overlaps(a_start: TimeOfDay, a_end: TimeOfDay, b_start: TimeOfDay, b_end: TimeOfDay) -> bool {
    a_start < b_end && b_start < a_end
}

/// Validate a session window: on-grid bounds, positive duration, inside
/// the working day.
pub fn check_window(start: TimeOfDay, end: TimeOfDay) -> Result<(), SchedulerError> {
    if !start.is_on_grid() || !end.is_on_grid() {
        return Err(SchedulerError::InvalidTime(format!(
            "window {start}-{end} is not aligned to the half-hour grid"
        )));
    }
    if end <= start {
        return Err(SchedulerError::InvalidDuration(format!(
            "window {start}-{end} has non-positive duration"
        )));
    }
    if start < DAY_START || end > DAY_END {
        return Err(SchedulerError::InvalidTime(format!(
            "window {start}-{end} is outside {DAY_START}-{DAY_END}",
        )));
    }
    Ok(())
}
