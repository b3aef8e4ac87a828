//! Month calendar: month arithmetic and the week-row grid.

pub mod grid;
pub mod month;

pub use grid::{
    CalendarDay, DAYS_PER_WEEK, MAX_WEEKS, Week, build_calendar, group_by_due_date, leading_days,
};
pub use month::MonthRef;
