use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ApplicationId);
id_newtype!(UserId);
id_newtype!(CommentId);
id_newtype!(DocumentId);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Lifecycle of an onboarding application. Every new application starts in
/// `PendingReview`; `Approved` is terminal for the review workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    PendingReview,
    Approved,
    Flagged,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 3] = [
        ApplicationStatus::PendingReview,
        ApplicationStatus::Approved,
        ApplicationStatus::Flagged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::PendingReview => "pending_review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Flagged => "flagged",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ApplicationStatus::PendingReview => "PENDING REVIEW",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Flagged => "FLAGGED",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ApplicationStatus::Approved
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "status",
                value: s.to_string(),
            })
    }
}

/// The only transitions a reviewer can ask for. Keeping this separate from
/// [`ApplicationStatus`] means "move back to pending" cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewDecision {
    Approve,
    Flag,
}

impl ReviewDecision {
    pub fn target_status(self) -> ApplicationStatus {
        match self {
            ReviewDecision::Approve => ApplicationStatus::Approved,
            ReviewDecision::Flag => ApplicationStatus::Flagged,
        }
    }
}

impl FromStr for ReviewDecision {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" => Ok(ReviewDecision::Approve),
            "flag" | "flagged" => Ok(ReviewDecision::Flag),
            _ => Err(UnknownVariant {
                kind: "review decision",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Reviewer,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Reviewer, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Reviewer => "reviewer",
            Role::Admin => "admin",
        }
    }

    pub fn can_review(self) -> bool {
        matches!(self, Role::Reviewer | Role::Admin)
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "role",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[default]
    Document,
    Certificate,
    Contract,
    Other,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::Document,
        DocumentType::Certificate,
        DocumentType::Contract,
        DocumentType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Document => "document",
            DocumentType::Certificate => "certificate",
            DocumentType::Contract => "contract",
            DocumentType::Other => "other",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "document type",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named list views offered by the dashboard cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterView {
    #[default]
    All,
    Pending,
    Approved,
    Flagged,
}

impl FilterView {
    pub fn status(self) -> Option<ApplicationStatus> {
        match self {
            FilterView::All => None,
            FilterView::Pending => Some(ApplicationStatus::PendingReview),
            FilterView::Approved => Some(ApplicationStatus::Approved),
            FilterView::Flagged => Some(ApplicationStatus::Flagged),
        }
    }
}

impl FromStr for FilterView {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FilterView::All),
            "pending" | "pending_review" => Ok(FilterView::Pending),
            "approved" => Ok(FilterView::Approved),
            "flagged" => Ok(FilterView::Flagged),
            _ => Err(UnknownVariant {
                kind: "view",
                value: s.to_string(),
            }),
        }
    }
}

/// Informational capability flags submitted with an application. The review
/// workflow never mutates these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityPosture {
    pub mfa_enabled: bool,
    pub sso_support: bool,
    pub rbac_implemented: bool,
    pub encryption_at_rest: bool,
    pub encryption_in_transit: bool,
    pub key_management: bool,
    pub firewall_enabled: bool,
    pub vpn_required: bool,
    pub ip_whitelisting: bool,
    pub audit_logging: bool,
    pub siem_integration: bool,
    pub alerting_enabled: bool,
    pub gdpr_compliant: bool,
    pub soc2_certified: bool,
    pub iso_compliant: bool,
}

impl SecurityPosture {
    pub fn enabled_controls(&self) -> Vec<&'static str> {
        [
            (self.mfa_enabled, "multi-factor auth"),
            (self.sso_support, "single sign-on"),
            (self.rbac_implemented, "role-based access control"),
            (self.encryption_at_rest, "encryption at rest"),
            (self.encryption_in_transit, "encryption in transit"),
            (self.key_management, "key management"),
            (self.firewall_enabled, "firewall"),
            (self.vpn_required, "VPN required"),
            (self.ip_whitelisting, "IP allow-listing"),
            (self.audit_logging, "audit logging"),
            (self.siem_integration, "SIEM integration"),
            (self.alerting_enabled, "alerting"),
            (self.gdpr_compliant, "GDPR"),
            (self.soc2_certified, "SOC 2"),
            (self.iso_compliant, "ISO 27001"),
        ]
        .into_iter()
        .filter_map(|(enabled, name)| enabled.then_some(name))
        .collect()
    }
}
