//! `taskcal calendar` and `taskcal upcoming`: terminal views of the store.

use anyhow::Result;
use chrono::{Datelike, Local, Weekday};

use taskcal_core::calendar::DAYS_PER_WEEK;
use taskcal_core::workflow::{self, CalendarView};
use taskcal_db::TaskStore;
use taskcal_db::models::Task;

/// Render `view` as a fixed-width grid. Days with tasks carry a `*`;
/// spillover days are dotted. The tasks themselves are listed below.
pub fn render_month(view: &CalendarView) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:^28}\n", view.month.to_string()));

    let mut day = view.week_start;
    for _ in 0..DAYS_PER_WEEK {
        out.push_str(&format!(" {:>3}", day.to_string()));
        day = day.succ();
    }
    out.push('\n');

    for week in &view.weeks {
        for cell in week {
            if cell.in_month {
                let mark = if cell.has_tasks() { '*' } else { ' ' };
                out.push_str(&format!("{:>3}{mark}", cell.date.day()));
            } else {
                out.push_str("  . ");
            }
        }
        out.push('\n');
    }

    let dated: Vec<&Task> = view
        .weeks
        .iter()
        .flatten()
        .filter(|c| c.in_month)
        .flat_map(|c| c.tasks.iter())
        .collect();
    if !dated.is_empty() {
        out.push('\n');
        for task in dated {
            out.push_str(&task_line(task));
        }
    }
    out
}

fn task_line(task: &Task) -> String {
    let due = task
        .due_date
        .map_or_else(|| "----------".to_string(), |d| d.to_string());
    format!("{due}  #{:<4} {}\n", task.id, task.title)
}

pub fn render_upcoming(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks.\n".to_string();
    }
    tasks.iter().map(task_line).collect()
}

pub async fn run_calendar(
    store: &dyn TaskStore,
    year: Option<i32>,
    month: Option<u32>,
    week_start: Weekday,
) -> Result<()> {
    let today = Local::now().date_naive();
    let view = workflow::calendar_view(store, year, month, today, week_start).await?;
    print!("{}", render_month(&view));
    Ok(())
}

pub async fn run_upcoming(store: &dyn TaskStore) -> Result<()> {
    let tasks = workflow::upcoming_tasks(store).await?;
    print!("{}", render_upcoming(&tasks));
    Ok(())
}
