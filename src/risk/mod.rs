pub mod evaluator;
pub mod format;

pub use evaluator::{
    apply_override, evaluate, validate_transaction, Assessment, EvaluationError, Reason,
    Transaction, Verdict, FRAUD_AMOUNT_THRESHOLD,
};
pub use format::format_currency;
