use serde::Serialize;

/// Number of inputs the classifier expects per row.
pub const FEATURE_COUNT: usize = 30;
/// Position of the transaction amount.
pub const AMOUNT_INDEX: usize = 28;
/// Position of the elapsed time (seconds).
pub const ELAPSED_TIME_INDEX: usize = 29;

/// Fixed-width model input.
///
/// Positions 0..28 are placeholders for features the form does not collect
/// and are always zero. The layout must match the trained artifact exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Build the vector for a single transaction.
    pub fn from_transaction(amount: f64, elapsed_time: f64) -> Self {
        let mut values = [0.0; FEATURE_COUNT];
        values[AMOUNT_INDEX] = amount;
        values[ELAPSED_TIME_INDEX] = elapsed_time;
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    pub fn amount(&self) -> f64 {
        self.0[AMOUNT_INDEX]
    }

    pub fn elapsed_time(&self) -> f64 {
        self.0[ELAPSED_TIME_INDEX]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
