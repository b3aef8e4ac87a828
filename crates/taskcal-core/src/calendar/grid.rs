//! Month grid construction.
//!
//! Lays a month onto at most six 7-day rows starting at the configured
//! first weekday. Leading cells spill over from the previous month,
//! trailing cells from the next; a row made only of next-month days is
//! never emitted.

use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::Serialize;

use taskcal_db::models::Task;

/// Maximum number of week rows generated before trimming.
pub const MAX_WEEKS: usize = 6;

/// Days in a week row.
pub const DAYS_PER_WEEK: usize = 7;

/// One cell of the calendar grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// `false` for spillover days from the adjacent months.
    pub in_month: bool,
    pub tasks: Vec<Task>,
}

impl CalendarDay {
    pub fn has_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }
}

/// Seven consecutive days, starting on the configured week start.
pub type Week = Vec<CalendarDay>;

/// Number of days between the start of the week row and `date`.
///
/// With a Sunday start, Sunday is 0 and Saturday is 6.
pub fn leading_days(date: NaiveDate, week_start: Weekday) -> u64 {
    let from_monday = u64::from(date.weekday().num_days_from_monday());
    let start_from_monday = u64::from(week_start.num_days_from_monday());
    (from_monday + 7 - start_from_monday) % 7
}

/// Build the week rows for the month whose first day is `first_day`.
///
/// `first_day` is normalised to the first of its month. Each cell carries
/// the tasks found under its date in `tasks_by_date`.
pub fn build_calendar(
    first_day: NaiveDate,
    tasks_by_date: &HashMap<NaiveDate, Vec<Task>>,
    week_start: Weekday,
) -> Vec<Week> {
    let first_day = first_day.with_day(1).unwrap_or(first_day);
    let (year, month) = (first_day.year(), first_day.month());

    let offset = leading_days(first_day, week_start);
    let Some(mut current) = first_day.checked_sub_days(Days::new(offset)) else {
        return Vec::new();
    };

    let mut weeks = Vec::with_capacity(MAX_WEEKS);
    'rows: for _ in 0..MAX_WEEKS {
        let mut row = Vec::with_capacity(DAYS_PER_WEEK);
        let mut has_current_or_previous = false;

        for _ in 0..DAYS_PER_WEEK {
            let in_month = current.year() == year && current.month() == month;
            if in_month || current < first_day {
                has_current_or_previous = true;
            }

            row.push(CalendarDay {
                date: current,
                in_month,
                tasks: tasks_by_date.get(&current).cloned().unwrap_or_default(),
            });

            match current.succ_opt() {
                Some(next) => current = next,
                None => {
                    if has_current_or_previous && row.len() == DAYS_PER_WEEK {
                        weeks.push(row);
                    }
                    break 'rows;
                }
            }
        }

        if has_current_or_previous {
            weeks.push(row);
        }
    }

    weeks
}

/// Group tasks by due date, keeping their relative order within a day.
/// Tasks without a due date are skipped.
pub fn group_by_due_date(tasks: Vec<Task>) -> HashMap<NaiveDate, Vec<Task>> {
    let mut grouped: HashMap<NaiveDate, Vec<Task>> = HashMap::new();
    for task in tasks {
        if let Some(date) = task.due_date {
            grouped.entry(date).or_default().push(task);
        }
    }
    grouped
}
