//! Inline HTML for the web UI.
//!
//! Every interpolated user value goes through [`escape`].

use chrono::{Datelike, NaiveDate, Weekday};

use taskcal_core::calendar::{CalendarDay, DAYS_PER_WEEK};
use taskcal_core::plan::{DEFAULT_DEADLINE_WEEKS, DEFAULT_WEEKLY_FREQUENCY, DraftTask};
use taskcal_core::workflow::{CalendarView, PlanReview};
use taskcal_db::models::Task;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\
<html><head><meta charset=\"utf-8\"><title>{title} - taskcal</title>\
<style>\
table.calendar{{border-collapse:collapse;width:100%}}\
table.calendar td{{border:1px solid #ccc;vertical-align:top;height:5em;width:14%}}\
td.spill{{color:#999;background:#f6f6f6}}\
td.today{{background:#fff7d6}}\
.error{{color:#b00}}\
</style></head><body>\
<nav><a href=\"/tasks/calendar\">Calendar</a> | <a href=\"/tasks/list\">All tasks</a> | \
<a href=\"/tasks/upcoming\">Upcoming</a> | <a href=\"/tasks/new\">New task</a> | \
<a href=\"/tasks/ai-plan\">AI plan</a></nav>\
<h1>{title}</h1>{body}</body></html>",
        title = escape(title),
    )
}

pub fn error_page(status: u16, message: &str) -> String {
    layout(
        &format!("Error {status}"),
        &format!("<p class=\"error\">{}</p>", escape(message)),
    )
}

fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

fn day_cell(day: &CalendarDay, today: NaiveDate) -> String {
    let mut class = Vec::new();
    if !day.in_month {
        class.push("spill");
    }
    if day.date == today {
        class.push("today");
    }

    let mut cell = format!(
        "<td class=\"{}\"><a href=\"/tasks/date/{date}\">{}</a>",
        class.join(" "),
        day.date.day(),
        date = day.date,
    );
    if day.has_tasks() {
        cell.push_str("<ul>");
        for task in &day.tasks {
            cell.push_str(&format!(
                "<li><a href=\"/tasks/edit/{}\">{}</a></li>",
                task.id,
                escape(&task.title)
            ));
        }
        cell.push_str("</ul>");
    }
    cell.push_str("</td>");
    cell
}

pub fn calendar_page(view: &CalendarView, today: NaiveDate) -> String {
    let mut body = format!(
        "<p><a href=\"/tasks/calendar?year={}&month={}\">&laquo; {prev}</a> | \
<a href=\"/tasks/calendar\">Today</a> | \
<a href=\"/tasks/calendar?year={}&month={}\">{next} &raquo;</a></p>",
        view.prev.year(),
        view.prev.month(),
        view.next.year(),
        view.next.month(),
        prev = view.prev,
        next = view.next,
    );

    body.push_str("<table class=\"calendar\"><tr>");
    let mut day = view.week_start;
    for _ in 0..DAYS_PER_WEEK {
        body.push_str(&format!("<th>{}</th>", weekday_label(day)));
        day = day.succ();
    }
    body.push_str("</tr>");

    for week in &view.weeks {
        body.push_str("<tr>");
        for cell in week {
            body.push_str(&day_cell(cell, today));
        }
        body.push_str("</tr>");
    }
    body.push_str("</table>");

    layout(&format!("Calendar {}", view.month), &body)
}

fn task_rows(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "<p>No tasks.</p>".to_string();
    }

    let mut rows = String::from(
        "<table><tr><th>Title</th><th>Description</th><th>Due</th><th></th></tr>",
    );
    for task in tasks {
        let due = task
            .due_date
            .map_or_else(String::new, |d| format!("<a href=\"/tasks/date/{d}\">{d}</a>"));
        rows.push_str(&format!(
            "<tr><td><a href=\"/tasks/edit/{id}\">{title}</a></td><td>{description}</td>\
<td>{due}</td><td><form method=\"post\" action=\"/tasks/delete/{id}\">\
<button type=\"submit\">Delete</button></form></td></tr>",
            id = task.id,
            title = escape(&task.title),
            description = escape(task.description.as_deref().unwrap_or_default()),
        ));
    }
    rows.push_str("</table>");
    rows
}

pub fn task_list_page(title: &str, tasks: &[Task]) -> String {
    layout(title, &task_rows(tasks))
}

pub fn date_page(date: NaiveDate, tasks: &[Task]) -> String {
    let mut body = task_rows(tasks);
    body.push_str("<h2>Add a task</h2>");
    body.push_str(&task_form_fields(None, "", "", Some(date), None));
    layout(&format!("Tasks due {date}"), &body)
}

fn task_form_fields(
    id: Option<i64>,
    title: &str,
    description: &str,
    due_date: Option<NaiveDate>,
    error: Option<&str>,
) -> String {
    let mut form = String::new();
    if let Some(error) = error {
        form.push_str(&format!("<p class=\"error\">{}</p>", escape(error)));
    }
    form.push_str("<form method=\"post\" action=\"/tasks/save\">");
    if let Some(id) = id {
        form.push_str(&format!("<input type=\"hidden\" name=\"id\" value=\"{id}\">"));
    }
    form.push_str(&format!(
        "<p><label>Title <input name=\"title\" required value=\"{}\"></label></p>\
<p><label>Description <textarea name=\"description\">{}</textarea></label></p>\
<p><label>Due date <input type=\"date\" name=\"dueDate\" value=\"{}\"></label></p>\
<p><button type=\"submit\">Save</button></p></form>",
        escape(title),
        escape(description),
        due_date.map(|d| d.to_string()).unwrap_or_default(),
    ));
    form
}

/// Create form, optionally with the due date filled in.
pub fn new_task_page(due_date: Option<NaiveDate>) -> String {
    layout("New task", &task_form_fields(None, "", "", due_date, None))
}

pub fn edit_task_page(task: &Task) -> String {
    layout(
        "Edit task",
        &task_form_fields(
            Some(task.id),
            &task.title,
            task.description.as_deref().unwrap_or_default(),
            task.due_date,
            None,
        ),
    )
}

/// Form re-shown after a rejected save.
pub fn invalid_task_page(
    id: Option<i64>,
    title: &str,
    description: &str,
    due_date: Option<NaiveDate>,
    error: &str,
) -> String {
    let heading = if id.is_some() { "Edit task" } else { "New task" };
    layout(
        heading,
        &task_form_fields(id, title, description, due_date, Some(error)),
    )
}

// ---------------------------------------------------------------------------
// AI plan
// ---------------------------------------------------------------------------

/// Disable every button once the form is on its way. Deferred so a named
/// submit button still contributes its value.
const SUBMIT_ONCE: &str = "var f=this;setTimeout(function(){\
f.querySelectorAll('button').forEach(function(b){b.disabled=true})},0)";

/// Values shown in the generation form. Numbers are kept as typed so a
/// rejected entry is shown back unchanged.
pub struct PlanFormValues<'a> {
    pub goal: &'a str,
    pub weekly_frequency: String,
    pub deadline_weeks: String,
    pub error: Option<&'a str>,
}

impl Default for PlanFormValues<'_> {
    fn default() -> Self {
        Self {
            goal: "",
            weekly_frequency: DEFAULT_WEEKLY_FREQUENCY.to_string(),
            deadline_weeks: DEFAULT_DEADLINE_WEEKS.to_string(),
            error: None,
        }
    }
}

pub fn ai_plan_page(values: &PlanFormValues<'_>) -> String {
    let mut body = String::new();
    if let Some(error) = values.error {
        body.push_str(&format!("<p class=\"error\">{}</p>", escape(error)));
    }
    body.push_str(&format!(
        "<form method=\"post\" action=\"/tasks/generate-plan\" onsubmit=\"{SUBMIT_ONCE}\">\
<p><label>Goal <textarea name=\"goal\" required>{}</textarea></label></p>\
<p><label>Sessions per week \
<input type=\"number\" min=\"1\" name=\"weeklyFrequency\" value=\"{}\"></label></p>\
<p><label>Deadline (weeks) \
<input type=\"number\" min=\"1\" name=\"deadlineWeeks\" value=\"{}\"></label></p>\
<p><button type=\"submit\">Generate plan</button></p></form>",
        escape(values.goal),
        escape(&values.weekly_frequency),
        escape(&values.deadline_weeks),
    ));
    layout("AI plan", &body)
}

fn draft_row(index: usize, draft: &DraftTask) -> String {
    format!(
        "<tr><td><input name=\"tasks[{index}].title\" required value=\"{}\"></td>\
<td><textarea name=\"tasks[{index}].description\">{}</textarea></td>\
<td><input type=\"date\" name=\"tasks[{index}].dueDate\" value=\"{}\"></td>\
<td><label><input type=\"checkbox\" name=\"tasks[{index}].remove\"> Remove</label></td></tr>",
        escape(&draft.title),
        escape(&draft.description),
        draft.due_date.map(|d| d.to_string()).unwrap_or_default(),
    )
}

/// Editable review of generated drafts. Rows ticked "Remove" are left out
/// of the save, or dropped from the page by "Remove checked".
pub fn plan_review_page(review: &PlanReview) -> String {
    let mut body = format!(
        "<p>Goal: {goal}</p>\
<form method=\"post\" action=\"/tasks/save-generated-tasks\" onsubmit=\"{SUBMIT_ONCE}\">\
<input type=\"hidden\" name=\"goal\" value=\"{goal}\">\
<input type=\"hidden\" name=\"tasksJson\" value=\"{}\">",
        escape(&review.drafts_json),
        goal = escape(&review.goal),
    );

    if review.drafts.is_empty() {
        body.push_str(
            "<p>No tasks left to save.</p>\
<p><button type=\"submit\" name=\"action\" value=\"save\" disabled>Save tasks</button> \
<a href=\"/tasks/ai-plan\">Start over</a></p></form>",
        );
        return layout("Review plan", &body);
    }

    body.push_str(&format!(
        "<p>{} tasks proposed. Edit them, tick Remove on any you do not want, then save.</p>\
<table><tr><th>Title</th><th>Description</th><th>Due</th><th></th></tr>",
        review.drafts.len(),
    ));
    for (index, draft) in review.drafts.iter().enumerate() {
        body.push_str(&draft_row(index, draft));
    }
    body.push_str(
        "</table><p><button type=\"submit\" name=\"action\" value=\"save\">Save tasks</button> \
<button type=\"submit\" name=\"action\" value=\"remove\">Remove checked</button> \
<a href=\"/tasks/ai-plan\">Start over</a></p></form>",
    );
    layout("Review plan", &body)
}
