//! Reduces the two fraud-result shapes the API returns to one presented
//! verdict.
//!
//! The scoring service sometimes returns a structured assessment and
//! sometimes only a bare `fraud_score`. Both are normalized by [`normalize`];
//! call sites never branch on the shape themselves.
//!
//! The risk score (0-100, higher is safer) and the fraud score (0.0-1.0,
//! higher is riskier) are kept on separate scales throughout.

use shared::{
    domain::RiskLevel,
    protocol::{ApplicationDetail, ApplicationSummary, CreateApplicationResponse, FraudAssessment},
};

/// `fraud_score >= FRAUD_THRESHOLD` is treated as fraud.
pub const FRAUD_THRESHOLD: f64 = 0.5;
/// Scores below this are low risk.
pub const LOW_RISK_CEILING: f64 = 0.3;
/// Scores below this (and at or above [`LOW_RISK_CEILING`]) are medium risk.
pub const MEDIUM_RISK_CEILING: f64 = 0.7;

const ELEVATED_SEVERITY_FLOOR: f64 = 0.7;
const MODERATE_SEVERITY_FLOOR: f64 = 0.4;

#[derive(Debug, Clone, PartialEq)]
pub enum FraudSignal {
    Structured(RiskVerdict),
    ScoreOnly(f64),
}

impl FraudSignal {
    /// Prefers a complete structured assessment. A partial one contributes
    /// only its score. `None` when the application has not been scored.
    pub fn from_parts(
        assessment: Option<&FraudAssessment>,
        fraud_score: Option<f64>,
    ) -> Option<Self> {
        if let Some(verdict) = assessment.and_then(structured_verdict) {
            return Some(FraudSignal::Structured(verdict));
        }
        assessment
            .and_then(|assessment| assessment.fraud_score)
            .or(fraud_score)
            .map(FraudSignal::ScoreOnly)
    }
}

fn structured_verdict(assessment: &FraudAssessment) -> Option<RiskVerdict> {
    Some(RiskVerdict {
        is_fraud: assessment.is_fraud?,
        fraud_score: assessment.fraud_score?,
        risk_level: assessment.risk_level?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskVerdict {
    pub is_fraud: bool,
    pub fraud_score: f64,
    pub risk_level: RiskLevel,
}

pub fn risk_level_for(fraud_score: f64) -> RiskLevel {
    if fraud_score < LOW_RISK_CEILING {
        RiskLevel::Low
    } else if fraud_score < MEDIUM_RISK_CEILING {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

pub fn normalize(signal: &FraudSignal) -> RiskVerdict {
    match signal {
        FraudSignal::Structured(verdict) => *verdict,
        FraudSignal::ScoreOnly(fraud_score) => {
            let is_fraud = *fraud_score >= FRAUD_THRESHOLD;
            RiskVerdict {
                is_fraud,
                fraud_score: *fraud_score,
                risk_level: risk_level_for(*fraud_score),
            }
        }
    }
}

/// Display band for the fraud score gauge. Not part of the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FraudSeverity {
    Low,
    Moderate,
    Elevated,
}

pub fn severity_for(fraud_score: f64) -> FraudSeverity {
    if fraud_score > ELEVATED_SEVERITY_FLOOR {
        FraudSeverity::Elevated
    } else if fraud_score > MODERATE_SEVERITY_FLOOR {
        FraudSeverity::Moderate
    } else {
        FraudSeverity::Low
    }
}

pub fn format_risk_score(risk_score: f64) -> String {
    format!("{risk_score:.1}")
}

pub fn format_fraud_score(fraud_score: f64) -> String {
    format!("{:.1}%", fraud_score * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RiskPresentation {
    pub verdict: Option<RiskVerdict>,
    pub risk_score: Option<f64>,
}

impl RiskPresentation {
    pub fn new(
        assessment: Option<&FraudAssessment>,
        fraud_score: Option<f64>,
        risk_score: Option<f64>,
    ) -> Self {
        Self {
            verdict: FraudSignal::from_parts(assessment, fraud_score).map(|s| normalize(&s)),
            risk_score,
        }
    }

    pub fn from_detail(detail: &ApplicationDetail) -> Self {
        Self::new(
            detail.fraud_detection.as_ref(),
            detail.fraud_score,
            detail.risk_score,
        )
    }

    pub fn from_summary(summary: &ApplicationSummary) -> Self {
        Self::new(None, summary.fraud_score, summary.risk_score)
    }

    pub fn from_submission(response: &CreateApplicationResponse) -> Self {
        Self::new(
            response.fraud_detection.as_ref(),
            response.fraud_score,
            response.risk_score,
        )
    }

    pub fn risk_score_label(&self) -> Option<String> {
        self.risk_score.map(format_risk_score)
    }

    pub fn fraud_score_label(&self) -> Option<String> {
        self.verdict.map(|verdict| format_fraud_score(verdict.fraud_score))
    }

    pub fn severity(&self) -> Option<FraudSeverity> {
        self.verdict.map(|verdict| severity_for(verdict.fraud_score))
    }
}

#[cfg(test)]
#[path = "tests/risk_tests.rs"]
mod tests;
