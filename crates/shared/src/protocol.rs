use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ApplicationId, ApplicationStatus, CommentId, DocumentId, DocumentType, RiskLevel, Role,
    SecurityPosture, UserId,
};

/// Timestamps arrive either as RFC 3339 or as naive ISO-8601 strings that are
/// implicitly UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{raw}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub flagged: u64,
    #[serde(default)]
    pub avg_risk_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub summary: DashboardSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationListQuery {
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApplicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ExportQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApplicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub id: ApplicationId,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub company_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub fraud_score: Option<f64>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub submitted_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationListResponse {
    #[serde(default)]
    pub applications: Vec<ApplicationSummary>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Structured verdict produced by the external scoring service. Any field
/// may be missing from a partial result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAssessment {
    #[serde(default)]
    pub is_fraud: Option<bool>,
    #[serde(default)]
    pub fraud_score: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    #[serde(rename = "comment")]
    pub text: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentListResponse {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddCommentRequest {
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub filename: String,
    #[serde(default)]
    pub file_type: DocumentType,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub uploaded_by: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUploadResponse {
    pub document: DocumentRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Full record returned by `GET /applications/{id}`. The dependent
/// collections are `None` when the payload did not carry them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationDetail {
    pub id: ApplicationId,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub company_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub fraud_score: Option<f64>,
    #[serde(default)]
    pub fraud_detection: Option<FraudAssessment>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub submitted_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub security_controls: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub audit_logs: Vec<AuditEntry>,
    #[serde(default)]
    pub comments: Option<Vec<Comment>>,
    #[serde(default)]
    pub documents: Option<Vec<DocumentRecord>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ApplicationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub company_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub tax_id: String,
    pub industry: String,
    pub description: String,
}

/// Numeric inputs consumed by the legacy scoring model. Absent values are
/// filled with the service defaults before submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyRiskInputs {
    pub age: Option<u32>,
    pub account_age_years: Option<f64>,
    pub annual_income: Option<f64>,
    pub credit_score: Option<u32>,
    pub num_devices: Option<u32>,
    pub hours_since_registration: Option<f64>,
    pub failed_login_attempts: Option<u32>,
    pub transaction_amount: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRiskInputs {
    pub age: u32,
    pub account_age_years: f64,
    pub annual_income: f64,
    pub credit_score: u32,
    pub num_devices: u32,
    pub hours_since_registration: f64,
    pub failed_login_attempts: u32,
    pub transaction_amount: f64,
}

impl LegacyRiskInputs {
    pub fn resolve(&self) -> ResolvedRiskInputs {
        ResolvedRiskInputs {
            age: self.age.unwrap_or(30),
            account_age_years: self.account_age_years.unwrap_or(0.0),
            annual_income: self.annual_income.unwrap_or(50_000.0),
            credit_score: self.credit_score.unwrap_or(650),
            num_devices: self.num_devices.unwrap_or(1),
            hours_since_registration: self.hours_since_registration.unwrap_or(0.0),
            failed_login_attempts: self.failed_login_attempts.unwrap_or(0),
            transaction_amount: self.transaction_amount.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewApplication {
    #[serde(flatten)]
    pub profile: CompanyProfile,
    #[serde(flatten)]
    pub security: SecurityPosture,
    #[serde(flatten)]
    pub legacy: LegacyRiskInputs,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateApplicationRequest {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(flatten)]
    pub profile: CompanyProfile,
    #[serde(flatten)]
    pub security: SecurityPosture,
    #[serde(flatten)]
    pub legacy: ResolvedRiskInputs,
}

impl CreateApplicationRequest {
    pub const VENDOR: &'static str = "vendor";

    pub fn vendor(application: &NewApplication) -> Self {
        Self {
            kind: Self::VENDOR,
            profile: application.profile.clone(),
            security: application.security,
            legacy: application.legacy.resolve(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateApplicationResponse {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub risk_score: Option<f64>,
    #[serde(default)]
    pub fraud_score: Option<f64>,
    #[serde(default)]
    pub fraud_detection: Option<FraudAssessment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponse {
    #[serde(default)]
    pub users: Vec<UserProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateUserResponse {
    pub user: UserProfile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusBreakdown {
    pub flagged: u64,
    pub pending: u64,
    pub approved: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportResponse {
    pub imported: u64,
    #[serde(default)]
    pub skipped: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub status_breakdown: Option<StatusBreakdown>,
}
