use crate::client::{ApiClient, ApiError};

use super::models::{
    CaseExport, CaseExportRequest, CaseHistory, CaseMessageRequest, CaseResponse, CaseState,
    DebriefDetail, DescribeCaseResponse, DescribeCaseState, FrameworkList, LearnerLevel,
    PostDebriefQuestionRequest, PostDebriefQuestionResponse, QuestionAnswer, StartCaseRequest,
};

impl ApiClient {
    pub async fn start_case(&self, request: &StartCaseRequest) -> Result<CaseResponse, ApiError> {
        self.post("/case/start", request).await
    }

    /// Generate a fresh patient from a teaching framework. Honors the
    /// variant controls on `request`.
    pub async fn start_dynamic_case(
        &self,
        request: &StartCaseRequest,
    ) -> Result<CaseResponse, ApiError> {
        self.post("/case/start/dynamic", request).await
    }

    /// Conditions that can be requested with `condition_key`.
    pub async fn list_frameworks(&self) -> Result<FrameworkList, ApiError> {
        self.get("/case/frameworks").await
    }

    pub async fn send_case_message(
        &self,
        message: &str,
        case_state: &CaseState,
    ) -> Result<CaseResponse, ApiError> {
        let body = CaseMessageRequest {
            message,
            case_state,
        };
        self.post("/case/message", &body).await
    }

    /// Ends the case. The whole case state is the request body.
    pub async fn get_debrief(&self, case_state: &CaseState) -> Result<CaseResponse, ApiError> {
        self.post("/case/debrief", case_state).await
    }

    pub async fn start_describe_case(
        &self,
        learner_level: LearnerLevel,
    ) -> Result<DescribeCaseResponse, ApiError> {
        let body = serde_json::json!({ "learner_level": learner_level });
        self.post("/case/describe/start", &body).await
    }

    pub async fn send_describe_message(
        &self,
        message: &str,
        state: &DescribeCaseState,
    ) -> Result<DescribeCaseResponse, ApiError> {
        let body = serde_json::json!({ "message": message, "state": state });
        self.post("/case/describe/message", &body).await
    }

    pub async fn export_case(
        &self,
        case_state: &CaseState,
        include_reading_list: bool,
    ) -> Result<CaseExport, ApiError> {
        let body = CaseExportRequest {
            case_state,
            include_reading_list,
        };
        self.post("/case/export", &body).await
    }

    pub async fn get_case_history(&self) -> Result<CaseHistory, ApiError> {
        self.get("/case/history").await
    }

    pub async fn get_case_detail(&self, session_id: &str) -> Result<CaseExport, ApiError> {
        let endpoint = format!("/case/history/{}", urlencoding::encode(session_id));
        self.get(&endpoint).await
    }

    pub async fn get_active_cases(&self) -> Result<CaseHistory, ApiError> {
        self.get("/case/me/active").await
    }

    /// Full state of a case so it can be resumed.
    pub async fn get_case(&self, session_id: &str) -> Result<CaseResponse, ApiError> {
        let endpoint = format!("/case/{}", urlencoding::encode(session_id));
        self.get(&endpoint).await
    }

    pub async fn get_case_debrief(&self, session_id: &str) -> Result<DebriefDetail, ApiError> {
        let endpoint = format!("/case/{}/debrief", urlencoding::encode(session_id));
        self.get(&endpoint).await
    }

    pub async fn ask_debrief_question(
        &self,
        session_id: &str,
        question: &str,
        previous_questions: Vec<QuestionAnswer>,
    ) -> Result<PostDebriefQuestionResponse, ApiError> {
        let endpoint = format!("/case/{}/question", urlencoding::encode(session_id));
        let body = PostDebriefQuestionRequest {
            question: question.to_string(),
            previous_questions,
        };
        self.post(&endpoint, &body).await
    }
}
