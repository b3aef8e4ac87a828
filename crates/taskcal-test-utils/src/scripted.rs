use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use taskcal_core::plan::{PlanClientError, PlanGenerator, PlanRequest};

/// [`PlanGenerator`] that replays canned responses in order and records
/// every request it receives. Runs out with `EmptyResponse`.
#[derive(Default)]
pub struct ScriptedPlanGenerator {
    responses: Mutex<VecDeque<Result<String, PlanClientError>>>,
    requests: Mutex<Vec<PlanRequest>>,
}

impl ScriptedPlanGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replying(text: impl Into<String>) -> Self {
        Self::new().then_reply(text)
    }

    pub fn failing(error: PlanClientError) -> Self {
        Self::new().then_fail(error)
    }

    pub fn then_reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()))
    }

    pub fn then_fail(self, error: PlanClientError) -> Self {
        self.push(Err(error))
    }

    fn push(self, response: Result<String, PlanClientError>) -> Self {
        self.responses
            .lock()
            .expect("responses lock")
            .push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<PlanRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl PlanGenerator for ScriptedPlanGenerator {
    async fn generate_plan(&self, request: &PlanRequest) -> Result<String, PlanClientError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .unwrap_or(Err(PlanClientError::EmptyResponse))
    }
}
