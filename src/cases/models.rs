//! Wire types for the `/case` endpoints and the local transcript.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core::ServerTimestamp;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LearnerLevel {
    #[default]
    Student,
    Resident,
    NpStudent,
    Fellow,
    Attending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum VisitType {
    #[default]
    Sick,
    WellChild,
}

/// Stage of a case. Only the server moves a case between phases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasePhase {
    #[default]
    Intro,
    History,
    #[serde(alias = "examination")]
    Exam,
    #[serde(alias = "differential")]
    Assessment,
    Plan,
    Debrief,
    Complete,
    // Well-child visits
    GrowthReview,
    DevelopmentalScreening,
    AnticipatoryGuidance,
    Immunizations,
    ParentQuestions,
}

impl CasePhase {
    pub fn is_complete(&self) -> bool {
        *self == CasePhase::Complete
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CasePhase::Intro => "intro",
            CasePhase::History => "history",
            CasePhase::Exam => "exam",
            CasePhase::Assessment => "assessment",
            CasePhase::Plan => "plan",
            CasePhase::Debrief => "debrief",
            CasePhase::Complete => "complete",
            CasePhase::GrowthReview => "growth_review",
            CasePhase::DevelopmentalScreening => "developmental_screening",
            CasePhase::AnticipatoryGuidance => "anticipatory_guidance",
            CasePhase::Immunizations => "immunizations",
            CasePhase::ParentQuestions => "parent_questions",
        }
    }
}

impl std::fmt::Display for CasePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who authored a turn. The backend calls the tutor "echo".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    Learner,
    #[serde(rename = "echo")]
    Tutor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CaseSeverity {
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AgeBracket {
    /// 0-28 days
    Neonate,
    /// 1-12 months
    Infant,
    /// 1-3 years
    Toddler,
    /// 3-12 years
    Child,
    /// 12-18 years
    Adolescent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CasePresentation {
    Typical,
    Atypical,
    Early,
    Late,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CaseComplexity {
    Straightforward,
    Nuanced,
    Challenging,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Patient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub age: u32,
    pub age_unit: String,
    pub sex: String,
    pub weight_kg: f64,
    pub chief_complaint: Option<String>,
    pub parent_name: String,
    pub parent_style: String,
    pub condition_key: String,
    pub condition_display: String,
    pub symptoms: Vec<String>,
    pub vitals: BTreeMap<String, f64>,
    pub exam_findings: Vec<Value>,
    // Well-child fields and anything else the server adds
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Patient {
    pub fn age_display(&self) -> String {
        if self.age_unit.is_empty() {
            self.age.to_string()
        } else {
            format!("{} {}", self.age, self.age_unit)
        }
    }
}

/// One entry of the server-side conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The server's full snapshot of a case.
///
/// It is only ever replaced wholesale by the server's answer and is
/// posted back as-is on the next turn, so unknown fields are kept in
/// `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseState {
    pub session_id: String,
    #[serde(default)]
    pub phase: CasePhase,
    #[serde(default)]
    pub patient: Patient,
    #[serde(default)]
    pub learner_level: LearnerLevel,
    #[serde(default)]
    pub visit_type: VisitType,
    #[serde(default)]
    pub history_gathered: Vec<String>,
    #[serde(default)]
    pub exam_performed: Vec<String>,
    #[serde(default)]
    pub differential: Vec<String>,
    #[serde(default)]
    pub plan_proposed: Vec<String>,
    #[serde(default)]
    pub hints_given: u32,
    #[serde(default)]
    pub teaching_moments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<ServerTimestamp>,
    #[serde(default)]
    pub time_constraint: Option<u32>,
    #[serde(default)]
    pub conversation: Vec<ConversationTurn>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainScore {
    pub score: u8,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellChildScores {
    pub growth_interpretation: DomainScore,
    pub milestone_assessment: DomainScore,
    pub exam_thoroughness: DomainScore,
    pub anticipatory_guidance: DomainScore,
    pub immunization_knowledge: DomainScore,
    pub communication_skill: DomainScore,
}

/// End of case feedback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Debrief {
    pub summary: String,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub missed_items: Vec<String>,
    pub teaching_points: Vec<String>,
    pub follow_up_resources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub well_child_scores: Option<WellChildScores>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseImage {
    pub key: String,
    pub url: String,
    pub caption: String,
    pub phase: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Shared answer of start, message, debrief, and resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResponse {
    pub message: String,
    pub case_state: CaseState,
    #[serde(default)]
    pub teaching_moment: Option<String>,
    #[serde(default)]
    pub debrief: Option<Debrief>,
    #[serde(default)]
    pub hint_offered: bool,
    #[serde(default)]
    pub images: Vec<CaseImage>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StartCaseRequest {
    pub learner_level: LearnerLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_constraint: Option<u32>,
    pub visit_type: VisitType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit_age_months: Option<u32>,
    // Variant controls, left for the server to pick when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<CaseSeverity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_bracket: Option<AgeBracket>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation: Option<CasePresentation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<CaseComplexity>,
}

/// A teaching framework the dynamic generator can build a case from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Framework {
    pub key: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub age_range: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkList {
    pub frameworks: Vec<Framework>,
    pub total: u32,
}

#[derive(Debug, Serialize)]
pub struct CaseMessageRequest<'a> {
    pub message: &'a str,
    pub case_state: &'a CaseState,
}

#[derive(Debug, Serialize)]
pub struct CaseExportRequest<'a> {
    pub case_state: &'a CaseState,
    pub include_reading_list: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedCaseSummary {
    pub session_id: String,
    pub condition_display: String,
    pub patient_name: String,
    pub patient_age: String,
    pub learner_level: String,
    pub completed_at: Option<ServerTimestamp>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub teaching_moments_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseHistory {
    pub cases: Vec<CompletedCaseSummary>,
    pub total_count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningMaterials {
    pub teaching_goals: Vec<String>,
    pub clinical_pearls: Vec<String>,
    pub common_mistakes: Vec<String>,
    pub red_flags: Vec<String>,
    pub reading_list: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseExport {
    pub session_id: String,
    pub condition: String,
    pub condition_display: String,
    pub patient_summary: Map<String, Value>,
    pub case_summary: Map<String, Value>,
    #[serde(default)]
    pub teaching_moments: Vec<String>,
    #[serde(default)]
    pub learning_materials: LearningMaterials,
    #[serde(default)]
    pub conversation_transcript: Vec<Value>,
    #[serde(default)]
    pub completed_at: Option<ServerTimestamp>,
}

/// Debrief of a completed case as stored by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebriefDetail {
    pub session_id: String,
    pub condition_display: String,
    pub patient_name: String,
    pub patient_age: String,
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
    #[serde(default)]
    pub missed_items: Vec<String>,
    #[serde(default)]
    pub teaching_points: Vec<String>,
    #[serde(default)]
    pub follow_up_resources: Vec<String>,
    #[serde(default)]
    pub completed_at: Option<ServerTimestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDebriefQuestionRequest {
    pub question: String,
    pub previous_questions: Vec<QuestionAnswer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDebriefQuestionResponse {
    pub answer: String,
    #[serde(default)]
    pub related_teaching_points: Vec<String>,
    #[serde(default)]
    pub citations: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescribeCasePhase {
    #[default]
    Listening,
    Discussing,
    Teaching,
    Complete,
}

/// A real case the learner walks the tutor through.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DescribedCase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub chief_complaint: Option<String>,
    pub age_description: Option<String>,
    pub key_history: Vec<String>,
    pub key_findings: Vec<String>,
    pub learner_assessment: Option<String>,
    pub learner_plan: Option<String>,
    pub actual_outcome: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeCaseState {
    pub session_id: String,
    #[serde(default)]
    pub phase: DescribeCasePhase,
    #[serde(default)]
    pub learner_level: LearnerLevel,
    #[serde(default)]
    pub case: DescribedCase,
    #[serde(default)]
    pub topics_covered: Vec<String>,
    #[serde(default)]
    pub teaching_points: Vec<String>,
    #[serde(default)]
    pub citations: Vec<Value>,
    #[serde(default)]
    pub conversation: Vec<ConversationTurn>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeCaseResponse {
    pub message: String,
    pub state: DescribeCaseState,
    #[serde(default)]
    pub citations: Option<Vec<Value>>,
}

/// A turn in the local transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub phase: CasePhase,
    pub created_at: DateTime<Utc>,
    // Set when a learner message never reached the server
    #[serde(default)]
    pub failed: bool,
}

impl Message {
    pub fn new(session_id: &str, role: Role, content: &str, phase: CasePhase) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            phase,
            created_at: Utc::now(),
            failed: false,
        }
    }

    pub fn learner(session_id: &str, content: &str, phase: CasePhase) -> Self {
        Self::new(session_id, Role::Learner, content, phase)
    }

    pub fn tutor(session_id: &str, content: &str, phase: CasePhase) -> Self {
        Self::new(session_id, Role::Tutor, content, phase)
    }
}
