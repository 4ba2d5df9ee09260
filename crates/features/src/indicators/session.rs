use chrono::{DateTime, Timelike, Utc};

/// Coarse UTC time-of-day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Session {
    Asia,
    London,
    NewYork,
    AfterHours,
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Session::Asia => write!(f, "Asia"),
            Session::London => write!(f, "London"),
            Session::NewYork => write!(f, "NewYork"),
            Session::AfterHours => write!(f, "AfterHours"),
        }
    }
}

/// `[0,7)` Asia, `[7,13)` London, `[13,22)` New York, otherwise after hours.
pub fn session_for_hour(hour: u32) -> Session {
    match hour {
        0..=6 => Session::Asia,
        7..=12 => Session::London,
        13..=21 => Session::NewYork,
        _ => Session::AfterHours,
    }
}

pub fn session_label(now: DateTime<Utc>) -> Session {
    session_for_hour(now.hour())
}
