use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate, Weekday};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use taskcal_core::plan::{
    DEFAULT_DEADLINE_WEEKS, DEFAULT_WEEKLY_FREQUENCY, DraftTask, PlanGenerator, PlanRequest,
};
use taskcal_core::workflow::ai_plan::NOT_A_NUMBER_MESSAGE;
use taskcal_core::workflow::{self, ConfirmError, PlanOutcome, PlanReview, WorkflowError};
use taskcal_db::TaskStore;
use taskcal_db::models::TaskDraft;

use crate::views::{self, PlanFormValues};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    pub generator: Arc<dyn PlanGenerator>,
    pub week_start: Weekday,
    /// Source of "today" for calendar defaults and plan offsets.
    pub today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl AppState {
    pub fn new(
        store: Arc<dyn TaskStore>,
        generator: Arc<dyn PlanGenerator>,
        week_start: Weekday,
    ) -> Self {
        Self {
            store,
            generator,
            week_start,
            today: local_today,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
    json: bool,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            json: false,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, msg)
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    }

    /// Render as `{"error": ...}` instead of an HTML page.
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidMonth { .. } => Self::bad_request(err.to_string()),
            WorkflowError::BlankTitle | WorkflowError::Confirm(_) => {
                Self::unprocessable(err.to_string())
            }
            WorkflowError::Store(e) => Self::internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "request failed: {}", self.message);
        }
        if self.json {
            let body = serde_json::json!({ "error": self.message });
            (self.status, Json(body)).into_response()
        } else {
            let page = views::error_page(self.status.as_u16(), &self.message);
            (self.status, Html(page)).into_response()
        }
    }
}

fn see_other(next: workflow::Redirect) -> Response {
    Redirect::to(&next.location()).into_response()
}

// ---------------------------------------------------------------------------
// Forms and queries
// ---------------------------------------------------------------------------

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    value.parse().ok()
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    year: Option<i32>,
    month: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AddQuery {
    date: Option<String>,
}

/// Task create/edit form. Blank strings mean "not given".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskForm {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
}

impl TaskForm {
    fn to_draft(&self) -> Result<TaskDraft, AppError> {
        let id = non_blank(self.id.as_deref())
            .map(|id| {
                id.parse::<i64>()
                    .map_err(|_| AppError::bad_request(format!("invalid task id {id:?}")))
            })
            .transpose()?;
        let due_date = non_blank(self.due_date.as_deref())
            .map(|d| {
                parse_date(d)
                    .ok_or_else(|| AppError::unprocessable(format!("invalid due date {d:?}")))
            })
            .transpose()?;

        Ok(TaskDraft {
            id,
            title: self.title.clone(),
            description: non_blank(self.description.as_deref()).map(str::to_string),
            due_date,
        })
    }
}

/// Plan generation form. Numbers arrive as text so a blank or mistyped
/// entry can be handled instead of failing extraction.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanForm {
    #[serde(default)]
    goal: String,
    #[serde(default)]
    weekly_frequency: Option<String>,
    #[serde(default)]
    deadline_weeks: Option<String>,
}

/// Blank means the default; anything else must be an integer.
fn plan_number(raw: Option<&str>, default: i32) -> Option<i32> {
    match non_blank(raw) {
        None => Some(default),
        Some(value) => value.parse().ok(),
    }
}

fn shown_number(raw: Option<&str>, default: i32) -> String {
    non_blank(raw).map_or_else(|| default.to_string(), str::to_string)
}

impl PlanForm {
    fn to_request(&self) -> Option<PlanRequest> {
        let weekly_frequency =
            plan_number(self.weekly_frequency.as_deref(), DEFAULT_WEEKLY_FREQUENCY)?;
        let deadline_weeks = plan_number(self.deadline_weeks.as_deref(), DEFAULT_DEADLINE_WEEKS)?;
        Some(PlanRequest::new(self.goal.trim(), weekly_frequency, deadline_weeks))
    }

    fn values<'a>(&self, goal: &'a str, error: &'a str) -> PlanFormValues<'a> {
        PlanFormValues {
            goal,
            weekly_frequency: shown_number(
                self.weekly_frequency.as_deref(),
                DEFAULT_WEEKLY_FREQUENCY,
            ),
            deadline_weeks: shown_number(self.deadline_weeks.as_deref(), DEFAULT_DEADLINE_WEEKS),
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(to_calendar))
        .route("/tasks", get(to_calendar).post(save_task))
        .route("/tasks/calendar", get(calendar))
        .route("/tasks/date/{date}", get(tasks_on_date))
        .route("/tasks/list", get(list_tasks))
        .route("/tasks/upcoming", get(upcoming_tasks))
        .route("/tasks/new", get(new_task))
        .route("/tasks/add", get(add_task))
        .route("/tasks/edit/{id}", get(edit_task))
        .route("/tasks/save", post(save_task))
        .route("/tasks/delete/{id}", post(delete_task))
        .route("/tasks/ai-plan", get(ai_plan_form))
        .route("/tasks/generate-plan", post(generate_plan))
        .route("/tasks/save-generated-tasks", post(save_generated_tasks))
        .route("/api/tasks", get(api_list_tasks))
        .route("/api/plans/confirm", post(api_confirm_plan))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {bind}:{port}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("taskcal serve listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("taskcal serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to install Ctrl+C handler: {e}");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Task handlers
// ---------------------------------------------------------------------------

async fn to_calendar() -> Response {
    see_other(workflow::Redirect::Calendar)
}

async fn calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> Result<Html<String>, AppError> {
    let today = (state.today)();
    let view = workflow::calendar_view(
        state.store.as_ref(),
        query.year,
        query.month,
        today,
        state.week_start,
    )
    .await?;
    Ok(Html(views::calendar_page(&view, today)))
}

async fn tasks_on_date(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> Result<Html<String>, AppError> {
    let tasks = workflow::tasks_due_on(state.store.as_ref(), date).await?;
    Ok(Html(views::date_page(date, &tasks)))
}

async fn list_tasks(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let tasks = workflow::list_tasks(state.store.as_ref()).await?;
    Ok(Html(views::task_list_page("All tasks", &tasks)))
}

async fn upcoming_tasks(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let tasks = workflow::upcoming_tasks(state.store.as_ref()).await?;
    Ok(Html(views::task_list_page("Upcoming", &tasks)))
}

async fn new_task() -> Html<String> {
    Html(views::new_task_page(None))
}

async fn add_task(Query(query): Query<AddQuery>) -> Html<String> {
    let date = non_blank(query.date.as_deref()).and_then(parse_date);
    Html(views::new_task_page(date))
}

async fn edit_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    match workflow::find_task(state.store.as_ref(), id).await? {
        Some(task) => Ok(Html(views::edit_task_page(&task)).into_response()),
        None => Ok(see_other(workflow::Redirect::Calendar)),
    }
}

async fn save_task(
    State(state): State<AppState>,
    Form(form): Form<TaskForm>,
) -> Result<Response, AppError> {
    let draft = form.to_draft()?;
    match workflow::save_task(state.store.as_ref(), draft.clone()).await {
        Ok(next) => Ok(see_other(next)),
        Err(WorkflowError::BlankTitle) => {
            let page = views::invalid_task_page(
                draft.id,
                &draft.title,
                draft.description.as_deref().unwrap_or_default(),
                draft.due_date,
                "Title is required.",
            );
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let next = workflow::delete_task(state.store.as_ref(), id).await?;
    Ok(see_other(next))
}

// ---------------------------------------------------------------------------
// AI plan handlers
// ---------------------------------------------------------------------------

async fn ai_plan_form() -> Html<String> {
    Html(views::ai_plan_page(&PlanFormValues::default()))
}

async fn generate_plan(
    State(state): State<AppState>,
    Form(form): Form<PlanForm>,
) -> Html<String> {
    let Some(request) = form.to_request() else {
        return Html(views::ai_plan_page(&form.values(form.goal.trim(), NOT_A_NUMBER_MESSAGE)));
    };
    let outcome =
        workflow::generate_plan(state.generator.as_ref(), &request, (state.today)()).await;

    match outcome {
        PlanOutcome::Review(review) => Html(views::plan_review_page(&review)),
        PlanOutcome::Rejected { goal, error } => {
            Html(views::ai_plan_page(&form.values(&goal, &error)))
        }
    }
}

fn field<'a>(fields: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    fields.get(name).map(String::as_str)
}

/// Drafts to persist. The hidden `tasksJson` copy is read only when the
/// submission says `encoding=json`; otherwise the indexed fields are the
/// whole answer, so removed rows stay unsaved.
fn drafts_for_commit(fields: &HashMap<String, String>) -> Result<Vec<DraftTask>, WorkflowError> {
    if field(fields, "encoding") == Some("json") {
        let json = field(fields, "tasksJson").unwrap_or_default();
        return Ok(workflow::drafts_from_json(json)?);
    }
    Ok(workflow::drafts_from_form(fields)?)
}

/// The submitted review minus its removed rows, renumbered from 0.
fn compact_review(fields: &HashMap<String, String>) -> Result<PlanReview, ConfirmError> {
    let goal = field(fields, "goal").unwrap_or_default().trim();
    let drafts = workflow::drafts_from_form(fields)?;
    Ok(PlanReview::new(goal, drafts)?)
}

async fn save_generated_tasks(
    State(state): State<AppState>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    if field(&fields, "action") == Some("remove") {
        return match compact_review(&fields) {
            Ok(review) => {
                info!(remaining = review.drafts.len(), "drafts removed from review");
                Html(views::plan_review_page(&review)).into_response()
            }
            Err(e) => {
                error!("failed to rebuild plan review: {e}");
                see_other(workflow::Redirect::AiPlanForm)
            }
        };
    }

    let committed = match drafts_for_commit(&fields) {
        Ok(drafts) => workflow::confirm_plan(state.store.as_ref(), drafts).await,
        Err(e) => Err(e),
    };

    match committed {
        Ok(saved) => {
            info!(saved, "generated tasks saved");
            see_other(workflow::Redirect::Calendar)
        }
        Err(e) => {
            error!("failed to save generated tasks: {e:#}");
            see_other(workflow::Redirect::AiPlanForm)
        }
    }
}

// ---------------------------------------------------------------------------
// JSON API
// ---------------------------------------------------------------------------

async fn api_list_tasks(State(state): State<AppState>) -> Result<Response, AppError> {
    let tasks = workflow::list_tasks(state.store.as_ref())
        .await
        .map_err(|e| AppError::from(e).json())?;
    Ok(Json(tasks).into_response())
}

async fn api_confirm_plan(
    State(state): State<AppState>,
    body: String,
) -> Result<Response, AppError> {
    let drafts = workflow::drafts_from_json(&body)
        .map_err(|e| AppError::from(WorkflowError::from(e)).json())?;
    let saved = workflow::confirm_plan(state.store.as_ref(), drafts)
        .await
        .map_err(|e| AppError::from(e).json())?;
    Ok(Json(serde_json::json!({ "saved": saved })).into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use taskcal_core::plan::PlanClientError;
    use taskcal_core::workflow::ai_plan::{NO_RESPONSE_MESSAGE, NO_TASKS_MESSAGE};
    use taskcal_test_utils::{MemoryTaskStore, ScriptedPlanGenerator};

    use super::*;

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 10).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct Harness {
        store: Arc<MemoryTaskStore>,
        generator: Arc<ScriptedPlanGenerator>,
        app: Router,
    }

    fn harness_with(store: MemoryTaskStore, generator: ScriptedPlanGenerator) -> Harness {
        let store = Arc::new(store);
        let generator = Arc::new(generator);
        let state = AppState {
            store: store.clone(),
            generator: generator.clone(),
            week_start: Weekday::Sun,
            today: fixed_today,
        };
        Harness {
            store,
            generator,
            app: build_router(state),
        }
    }

    fn harness() -> Harness {
        harness_with(MemoryTaskStore::new(), ScriptedPlanGenerator::new())
    }

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    async fn get(app: &Router, uri: &str) -> Response {
        app.clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn encode(pairs: &[(&str, &str)]) -> String {
        pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v.replace(' ', "+")))
            .collect::<Vec<_>>()
            .join("&")
    }

    async fn post_form(app: &Router, uri: &str, pairs: &[(&str, &str)]) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(encode(pairs)))
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn post_json(app: &Router, uri: &str, body: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> &str {
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        response
            .headers()
            .get(header::LOCATION)
            .expect("redirect should have a location")
            .to_str()
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn root_and_tasks_redirect_to_calendar() {
        let h = harness();
        assert_eq!(location(&get(&h.app, "/").await), "/tasks/calendar");
        assert_eq!(location(&get(&h.app, "/tasks").await), "/tasks/calendar");
    }

    #[tokio::test]
    async fn calendar_defaults_to_current_month() {
        let store = MemoryTaskStore::with_tasks(&[
            TaskDraft::new("Dentist").with_due_date(date(2025, 4, 22)),
            TaskDraft::new("Next month").with_due_date(date(2025, 5, 2)),
        ]);
        let h = harness_with(store, ScriptedPlanGenerator::new());

        let resp = get(&h.app, "/tasks/calendar").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("Calendar 2025-04"));
        assert!(html.contains("Dentist"));
        assert!(!html.contains("Next month"));
        assert!(html.contains("year=2025&month=3"));
        assert!(html.contains("year=2025&month=5"));
    }

    #[tokio::test]
    async fn calendar_honors_explicit_month() {
        let store = MemoryTaskStore::with_tasks(&[
            TaskDraft::new("New year").with_due_date(date(2026, 1, 1)),
        ]);
        let h = harness_with(store, ScriptedPlanGenerator::new());

        let html = body_text(get(&h.app, "/tasks/calendar?year=2026&month=1").await).await;
        assert!(html.contains("Calendar 2026-01"));
        assert!(html.contains("New year"));
        assert!(html.contains("year=2025&month=12"));
    }

    #[tokio::test]
    async fn calendar_rejects_invalid_month() {
        let h = harness();
        let resp = get(&h.app, "/tasks/calendar?year=2025&month=13").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn date_page_lists_only_that_day() {
        let store = MemoryTaskStore::with_tasks(&[
            TaskDraft::new("Today one").with_due_date(date(2025, 4, 10)),
            TaskDraft::new("Other day").with_due_date(date(2025, 4, 11)),
        ]);
        let h = harness_with(store, ScriptedPlanGenerator::new());

        let html = body_text(get(&h.app, "/tasks/date/2025-04-10").await).await;
        assert!(html.contains("Today one"));
        assert!(!html.contains("Other day"));
        assert!(html.contains("value=\"2025-04-10\""), "add form should prefill the date");
    }

    #[tokio::test]
    async fn add_form_prefills_date() {
        let h = harness();
        let html = body_text(get(&h.app, "/tasks/add?date=2025-06-01").await).await;
        assert!(html.contains("value=\"2025-06-01\""));

        let resp = get(&h.app, "/tasks/add?date=").await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_redirects_to_due_date() {
        let h = harness();
        let resp = post_form(
            &h.app,
            "/tasks/save",
            &[("title", "Buy milk"), ("description", ""), ("dueDate", "2025-04-12")],
        )
        .await;
        assert_eq!(location(&resp), "/tasks/date/2025-04-12");

        let tasks = h.store.tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Buy milk");
        assert_eq!(tasks[0].description, None);
    }

    #[tokio::test]
    async fn create_without_date_redirects_to_calendar() {
        let h = harness();
        let resp = post_form(&h.app, "/tasks", &[("title", "Someday"), ("dueDate", "")]).await;
        assert_eq!(location(&resp), "/tasks/calendar");
        assert_eq!(h.store.tasks()[0].due_date, None);
    }

    #[tokio::test]
    async fn update_without_date_keeps_existing_date() {
        let store =
            MemoryTaskStore::with_tasks(&[TaskDraft::new("Old").with_due_date(date(2025, 4, 20))]);
        let h = harness_with(store, ScriptedPlanGenerator::new());

        let resp = post_form(
            &h.app,
            "/tasks/save",
            &[("id", "1"), ("title", "Renamed"), ("dueDate", "")],
        )
        .await;
        assert_eq!(location(&resp), "/tasks/date/2025-04-20");

        let task = &h.store.tasks()[0];
        assert_eq!(task.title, "Renamed");
        assert_eq!(task.due_date, Some(date(2025, 4, 20)));
    }

    #[tokio::test]
    async fn update_of_unknown_id_changes_nothing() {
        let h = harness();
        let resp = post_form(
            &h.app,
            "/tasks/save",
            &[("id", "99"), ("title", "Ghost"), ("dueDate", "2025-04-12")],
        )
        .await;
        assert_eq!(location(&resp), "/tasks/calendar");
        assert!(h.store.tasks().is_empty());
    }

    #[tokio::test]
    async fn blank_title_rerenders_form() {
        let h = harness();
        let resp = post_form(
            &h.app,
            "/tasks/save",
            &[("title", "  "), ("dueDate", "2025-04-12")],
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_text(resp).await.contains("Title is required."));
        assert!(h.store.tasks().is_empty());
    }

    #[tokio::test]
    async fn bad_due_date_is_rejected() {
        let h = harness();
        let resp = post_form(
            &h.app,
            "/tasks/save",
            &[("title", "A"), ("dueDate", "tomorrow")],
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(h.store.tasks().is_empty());
    }

    #[tokio::test]
    async fn edit_form_and_unknown_edit() {
        let store = MemoryTaskStore::with_tasks(&[TaskDraft::new("Edit me")]);
        let h = harness_with(store, ScriptedPlanGenerator::new());

        let html = body_text(get(&h.app, "/tasks/edit/1").await).await;
        assert!(html.contains("value=\"Edit me\""));

        assert_eq!(location(&get(&h.app, "/tasks/edit/42").await), "/tasks/calendar");
    }

    #[tokio::test]
    async fn delete_redirects_to_captured_date() {
        let store =
            MemoryTaskStore::with_tasks(&[TaskDraft::new("Gone").with_due_date(date(2025, 4, 15))]);
        let h = harness_with(store, ScriptedPlanGenerator::new());

        let resp = post_form(&h.app, "/tasks/delete/1", &[]).await;
        assert_eq!(location(&resp), "/tasks/date/2025-04-15");
        assert!(h.store.tasks().is_empty());

        let resp = post_form(&h.app, "/tasks/delete/1", &[]).await;
        assert_eq!(location(&resp), "/tasks/calendar");
    }

    #[tokio::test]
    async fn upcoming_orders_undated_last() {
        let store = MemoryTaskStore::with_tasks(&[
            TaskDraft::new("No date"),
            TaskDraft::new("Later").with_due_date(date(2025, 5, 1)),
            TaskDraft::new("Sooner").with_due_date(date(2025, 4, 11)),
        ]);
        let h = harness_with(store, ScriptedPlanGenerator::new());

        let html = body_text(get(&h.app, "/tasks/upcoming").await).await;
        let sooner = html.find("Sooner").unwrap();
        let later = html.find("Later").unwrap();
        let undated = html.find("No date").unwrap();
        assert!(sooner < later && later < undated);
    }

    #[tokio::test]
    async fn store_failure_is_500() {
        let h = harness();
        h.store.fail_writes(true);
        let resp = post_form(&h.app, "/tasks/save", &[("title", "A")]).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    // -----------------------------------------------------------------------
    // AI plan
    // -----------------------------------------------------------------------

    const TWO_TASKS: &str = r#"```json
[{"title":"Jog","description":"Easy 2 km","daysFromNow":1},
 {"title":"Run","description":"5 km","daysFromNow":7}]
```"#;

    #[tokio::test]
    async fn plan_form_has_defaults() {
        let h = harness();
        let html = body_text(get(&h.app, "/tasks/ai-plan").await).await;
        assert!(html.contains("name=\"weeklyFrequency\" value=\"3\""));
        assert!(html.contains("name=\"deadlineWeeks\" value=\"4\""));
    }

    #[tokio::test]
    async fn generate_shows_review() {
        let h = harness_with(MemoryTaskStore::new(), ScriptedPlanGenerator::replying(TWO_TASKS));

        let resp = post_form(
            &h.app,
            "/tasks/generate-plan",
            &[("goal", "Run 5k"), ("weeklyFrequency", "2"), ("deadlineWeeks", "3")],
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("name=\"tasks[0].title\" required value=\"Jog\""));
        assert!(html.contains("name=\"tasks[0].dueDate\" value=\"2025-04-11\""));
        assert!(html.contains("name=\"tasks[1].dueDate\" value=\"2025-04-17\""));

        let requests = h.generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].goal, "Run 5k");
        assert_eq!(requests[0].weekly_frequency, 2);
        assert_eq!(requests[0].deadline_weeks, 3);
        assert!(h.store.tasks().is_empty(), "generation must not persist anything");
    }

    #[tokio::test]
    async fn generate_failure_keeps_goal() {
        let generator = ScriptedPlanGenerator::failing(PlanClientError::Timeout);
        let h = harness_with(MemoryTaskStore::new(), generator);

        let html =
            body_text(post_form(&h.app, "/tasks/generate-plan", &[("goal", "Learn piano")]).await)
                .await;
        assert!(html.contains(NO_RESPONSE_MESSAGE));
        assert!(html.contains("Learn piano"));
    }

    #[tokio::test]
    async fn generate_with_unparseable_reply() {
        let generator = ScriptedPlanGenerator::replying("Sure! Here are some ideas.");
        let h = harness_with(MemoryTaskStore::new(), generator);

        let html =
            body_text(post_form(&h.app, "/tasks/generate-plan", &[("goal", "Write a book")]).await)
                .await;
        assert!(html.contains(NO_TASKS_MESSAGE));
    }

    #[tokio::test]
    async fn confirm_form_saves_all() {
        let h = harness();
        let resp = post_form(
            &h.app,
            "/tasks/save-generated-tasks",
            &[
                ("tasks[0].title", "Jog"),
                ("tasks[0].description", "Easy"),
                ("tasks[0].dueDate", "2025-04-11"),
                ("tasks[1].title", "Run"),
                ("tasks[1].description", ""),
                ("tasks[1].dueDate", "2025-04-17"),
            ],
        )
        .await;
        assert_eq!(location(&resp), "/tasks/calendar");

        let tasks = h.store.tasks();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].title, "Run");
        assert_eq!(tasks[1].due_date, Some(date(2025, 4, 17)));
    }

    #[tokio::test]
    async fn confirm_form_with_bad_row_saves_nothing() {
        let h = harness();
        let resp = post_form(
            &h.app,
            "/tasks/save-generated-tasks",
            &[
                ("tasks[0].title", "Jog"),
                ("tasks[1].title", ""),
                ("tasks[1].dueDate", "2025-04-17"),
            ],
        )
        .await;
        assert_eq!(location(&resp), "/tasks/ai-plan");
        assert!(h.store.tasks().is_empty());
    }

    #[tokio::test]
    async fn confirm_form_store_failure_saves_nothing() {
        let h = harness();
        h.store.fail_writes(true);
        let resp = post_form(
            &h.app,
            "/tasks/save-generated-tasks",
            &[("tasks[0].title", "Jog")],
        )
        .await;
        assert_eq!(location(&resp), "/tasks/ai-plan");
        h.store.fail_writes(false);
        assert!(h.store.tasks().is_empty());
    }

    async fn post_raw_form(app: &Router, uri: &str, body: &str) -> Response {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    const JOG_RUN_JSON: &str = concat!(
        r#"[{"title":"Jog","description":"","dueDate":"2025-04-11"},"#,
        r#"{"title":"Run","description":"","dueDate":"2025-04-17"}]"#,
    );

    fn json_field() -> String {
        format!("tasksJson={}", JOG_RUN_JSON.replace('"', "%22"))
    }

    #[tokio::test]
    async fn json_copy_alone_saves_nothing() {
        let h = harness();
        let resp = post_raw_form(&h.app, "/tasks/save-generated-tasks", &json_field()).await;
        assert_eq!(location(&resp), "/tasks/calendar");
        assert!(h.store.tasks().is_empty());
    }

    #[tokio::test]
    async fn json_copy_is_ignored_when_every_row_is_removed() {
        let h = harness();
        let body = format!(
            "{}&tasks[0].title=Jog&tasks[0].remove=on&tasks[1].title=Run&tasks[1].remove=on\
&action=save",
            json_field()
        );
        let resp = post_raw_form(&h.app, "/tasks/save-generated-tasks", &body).await;
        assert_eq!(location(&resp), "/tasks/calendar");
        assert!(h.store.tasks().is_empty());
    }

    #[tokio::test]
    async fn explicit_json_encoding_saves_the_copy() {
        let h = harness();
        let body = format!("encoding=json&{}", json_field());
        let resp = post_raw_form(&h.app, "/tasks/save-generated-tasks", &body).await;
        assert_eq!(location(&resp), "/tasks/calendar");
        let titles: Vec<String> = h.store.tasks().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["Jog", "Run"]);
    }

    const THREE_ROWS_MIDDLE_REMOVED: &[(&str, &str)] = &[
        ("goal", "Get fit"),
        ("tasks[0].title", "Stretch"),
        ("tasks[0].dueDate", "2025-04-11"),
        ("tasks[1].title", "Jog"),
        ("tasks[1].dueDate", "2025-04-12"),
        ("tasks[1].remove", "on"),
        ("tasks[2].title", "Swim"),
        ("tasks[2].dueDate", "2025-04-13"),
    ];

    #[tokio::test]
    async fn confirm_skips_removed_middle_row() {
        let h = harness();
        let mut pairs = THREE_ROWS_MIDDLE_REMOVED.to_vec();
        pairs.push(("action", "save"));
        let resp = post_form(&h.app, "/tasks/save-generated-tasks", &pairs).await;
        assert_eq!(location(&resp), "/tasks/calendar");

        let tasks = h.store.tasks();
        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Stretch", "Swim"]);
        assert_eq!(tasks[1].due_date, Some(date(2025, 4, 13)));
    }

    #[tokio::test]
    async fn remove_action_rerenders_compacted_review() {
        let h = harness();
        let mut pairs = THREE_ROWS_MIDDLE_REMOVED.to_vec();
        pairs.push(("action", "remove"));
        let resp = post_form(&h.app, "/tasks/save-generated-tasks", &pairs).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let html = body_text(resp).await;
        assert!(html.contains("name=\"tasks[0].title\" required value=\"Stretch\""));
        assert!(html.contains("name=\"tasks[1].title\" required value=\"Swim\""));
        assert!(html.contains("name=\"tasks[1].dueDate\" value=\"2025-04-13\""));
        assert!(!html.contains("value=\"Jog\""));
        assert!(!html.contains("tasks[2]"));
        assert!(html.contains("name=\"goal\" value=\"Get fit\""));
        assert!(h.store.tasks().is_empty(), "removing rows must not persist anything");
    }

    #[tokio::test]
    async fn removing_every_row_shows_empty_state() {
        let h = harness();
        let resp = post_form(
            &h.app,
            "/tasks/save-generated-tasks",
            &[
                ("goal", "Get fit"),
                ("tasks[0].title", "Jog"),
                ("tasks[0].remove", "on"),
                ("action", "remove"),
            ],
        )
        .await;
        let html = body_text(resp).await;
        assert!(html.contains("No tasks left to save."));
        assert!(html.contains("disabled>Save tasks"));
        assert!(h.store.tasks().is_empty());
    }

    #[tokio::test]
    async fn blank_numbers_use_defaults() {
        let h = harness_with(MemoryTaskStore::new(), ScriptedPlanGenerator::replying(TWO_TASKS));
        let resp = post_form(
            &h.app,
            "/tasks/generate-plan",
            &[("goal", "Run 5k"), ("weeklyFrequency", ""), ("deadlineWeeks", "")],
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("tasks[0].title"));

        let requests = h.generator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].weekly_frequency, DEFAULT_WEEKLY_FREQUENCY);
        assert_eq!(requests[0].deadline_weeks, DEFAULT_DEADLINE_WEEKS);
    }

    #[tokio::test]
    async fn non_numeric_input_rerenders_form() {
        let h = harness_with(MemoryTaskStore::new(), ScriptedPlanGenerator::replying(TWO_TASKS));
        let resp = post_form(
            &h.app,
            "/tasks/generate-plan",
            &[("goal", "Learn piano"), ("weeklyFrequency", "often"), ("deadlineWeeks", "")],
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let html = body_text(resp).await;
        assert!(html.contains(NOT_A_NUMBER_MESSAGE));
        assert!(html.contains("Learn piano"));
        assert!(html.contains("name=\"weeklyFrequency\" value=\"often\""));
        assert!(html.contains("name=\"deadlineWeeks\" value=\"4\""));
        assert!(h.generator.requests().is_empty());
    }

    // -----------------------------------------------------------------------
    // JSON API
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn api_confirm_reports_count() {
        let h = harness();
        let resp = post_json(
            &h.app,
            "/api/plans/confirm",
            r#"[{"title":"A","description":"","dueDate":"2025-04-11"},
                {"title":"B","description":"x","dueDate":null}]"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(json, serde_json::json!({ "saved": 2 }));
        assert_eq!(h.store.tasks().len(), 2);
    }

    #[tokio::test]
    async fn api_confirm_rejects_bad_payload() {
        let h = harness();
        let resp = post_json(&h.app, "/api/plans/confirm", r#"{"title":"A"}"#).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert!(json.get("error").is_some());
        assert!(h.store.tasks().is_empty());
    }

    #[tokio::test]
    async fn api_confirm_store_failure_is_500() {
        let h = harness();
        h.store.fail_writes(true);
        let resp = post_json(
            &h.app,
            "/api/plans/confirm",
            r#"[{"title":"A","description":"","dueDate":null}]"#,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn api_lists_tasks() {
        let store = MemoryTaskStore::with_tasks(&[TaskDraft::new("One"), TaskDraft::new("Two")]);
        let h = harness_with(store, ScriptedPlanGenerator::new());

        let json: serde_json::Value =
            serde_json::from_str(&body_text(get(&h.app, "/api/tasks").await).await).unwrap();
        let arr = json.as_array().expect("response should be an array");
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0]["title"], "One");
    }
}
