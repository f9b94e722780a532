use std::fmt;

use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{FeatureVector, Label, LoadedModel, ModelEngine, ModelError, FRAUD_LABEL};

use super::format::format_currency;

/// Amounts strictly above this are always flagged, whatever the model says.
pub const FRAUD_AMOUNT_THRESHOLD: f64 = 25_000.0;

/// Final outcome shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Fraudulent,
    Secure,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Fraudulent => "FRAUDULENT",
            Verdict::Secure => "SECURE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which rule produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    /// Model flagged the transaction; amount was within the threshold.
    Model,
    /// Amount above the threshold; model did not flag it.
    AmountThreshold,
    /// Both the model and the threshold flagged it.
    ModelAndAmountThreshold,
    /// Nothing flagged it.
    None,
}

/// User-supplied transaction details.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub amount: f64,
    pub elapsed_time: f64,
}

impl Transaction {
    pub fn new(amount: f64, elapsed_time: f64) -> Self {
        Self {
            amount,
            elapsed_time,
        }
    }

    pub fn features(&self) -> FeatureVector {
        FeatureVector::from_transaction(self.amount, self.elapsed_time)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    pub verdict: Verdict,
    pub reason: Reason,
    pub amount: f64,
    pub formatted_amount: String,
}

impl Assessment {
    /// Message shown under the verdict banner.
    pub fn message(&self) -> String {
        match self.verdict {
            Verdict::Fraudulent => format!(
                "High risk detected for transaction of {}. The system has flagged this account.",
                self.formatted_amount
            ),
            Verdict::Secure => format!(
                "Transaction of {} has been approved successfully.",
                self.formatted_amount
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("elapsed time must be a non-negative number")]
    InvalidElapsedTime,

    #[error("inference failed: {0}")]
    Inference(#[from] ModelError),
}

/// Reject inputs the model must never see.
pub fn validate_transaction(tx: &Transaction) -> Result<(), EvaluationError> {
    if !tx.amount.is_finite() || tx.amount <= 0.0 {
        return Err(EvaluationError::InvalidAmount);
    }
    if !tx.elapsed_time.is_finite() || tx.elapsed_time < 0.0 {
        return Err(EvaluationError::InvalidElapsedTime);
    }
    Ok(())
}

/// Combine the model label with the amount threshold: fraud if either says so.
pub fn apply_override(label: Label, amount: f64) -> (Verdict, Reason) {
    let model_flag = label == FRAUD_LABEL;
    let amount_flag = amount > FRAUD_AMOUNT_THRESHOLD;

    match (model_flag, amount_flag) {
        (true, true) => (Verdict::Fraudulent, Reason::ModelAndAmountThreshold),
        (true, false) => (Verdict::Fraudulent, Reason::Model),
        (false, true) => (Verdict::Fraudulent, Reason::AmountThreshold),
        (false, false) => (Verdict::Secure, Reason::None),
    }
}

/// Score one transaction with the cached model.
///
/// Input is validated before the model is touched, so invalid amounts never
/// reach inference.
pub fn evaluate(
    engine: &ModelEngine,
    model: &LoadedModel,
    tx: &Transaction,
) -> Result<Assessment, EvaluationError> {
    validate_transaction(tx)?;

    let labels = engine.predict(model, &[tx.features()])?;
    let label = labels
        .first()
        .copied()
        .ok_or(ModelError::BatchMismatch {
            expected: 1,
            got: 0,
        })?;

    let (verdict, reason) = apply_override(label, tx.amount);

    counter!("evaluations_total").increment(1);
    match verdict {
        Verdict::Fraudulent => counter!("verdicts_fraudulent_total").increment(1),
        Verdict::Secure => counter!("verdicts_secure_total").increment(1),
    }
    if matches!(reason, Reason::AmountThreshold) {
        counter!("threshold_overrides_total").increment(1);
    }

    tracing::info!(
        verdict = %verdict,
        reason = ?reason,
        model_label = label,
        amount = tx.amount,
        elapsed_time = tx.elapsed_time,
        "Transaction evaluated"
    );

    Ok(Assessment {
        verdict,
        reason,
        amount: tx.amount,
        formatted_amount: format_currency(tx.amount),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
