use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::Serialize;

use crate::error::ScheduleError;
use crate::model::{DaySchedule, Station};

/// Earliest opening and latest closing across all stations for one service
/// day, in local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperatingWindow {
    pub open: NaiveDateTime,
    pub close: NaiveDateTime,
}

impl OperatingWindow {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.open <= at && at <= self.close
    }
}

/// Places a day's opening and last departure on `date`.
///
/// A last departure that is not strictly after the opening time belongs to
/// the following calendar day.
pub fn resolve_day(date: NaiveDate, open: NaiveTime, last: NaiveTime) -> OperatingWindow {
    let open_at = date.and_time(open);
    let mut close_at = date.and_time(last);
    if last <= open {
        close_at += TimeDelta::days(1);
    }
    OperatingWindow {
        open: open_at,
        close: close_at,
    }
}

/// Computes the global window for the service day starting on `date`.
///
/// Fails when there are no stations or any station lacks a complete entry
/// for the weekday of `date`.
pub fn compute_operating_window(
    stations: &[Station],
    date: NaiveDate,
) -> Result<OperatingWindow, ScheduleError> {
    let weekday = date.weekday();
    let mut window: Option<OperatingWindow> = None;

    for station in stations {
        let day: &DaySchedule = station.schedule.day(weekday);
        let (open, last) = day.bounds().ok_or_else(|| ScheduleError::MissingDay {
            station: station.code.clone(),
            day: weekday,
        })?;
        let own = resolve_day(date, open, last);

        window = Some(match window {
            None => own,
            Some(w) => OperatingWindow {
                open: w.open.min(own.open),
                close: w.close.max(own.close),
            },
        });
    }

    window.ok_or(ScheduleError::NoStations)
}

/// The window relevant at `now`: the previous service day's window while
/// its after-midnight service is still running, tomorrow's once today's
/// has closed, today's otherwise.
pub fn current_window(
    stations: &[Station],
    now: NaiveDateTime,
) -> Result<OperatingWindow, ScheduleError> {
    let today = now.date();
    if let Some(yesterday) = today.pred_opt() {
        if let Ok(window) = compute_operating_window(stations, yesterday) {
            if window.contains(now) {
                return Ok(window);
            }
        }
    }

    let window = compute_operating_window(stations, today)?;
    if now > window.close {
        if let Some(next) = today
            .succ_opt()
            .and_then(|tomorrow| compute_operating_window(stations, tomorrow).ok())
        {
            return Ok(next);
        }
    }
    Ok(window)
}
