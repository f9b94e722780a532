use rust_decimal::{Decimal, RoundingStrategy};

/// Render an amount as dollars with thousands separators, e.g. `$12,345.67`.
pub fn format_currency(amount: f64) -> String {
    if !amount.is_finite() {
        return format!("${amount}");
    }

    let (negative, fixed) = match Decimal::from_f64_retain(amount) {
        Some(value) => {
            let value = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            (value.is_sign_negative() && !value.is_zero(), format!("{:.2}", value.abs()))
        }
        // Past Decimal's range f64 has no fractional part.
        None => (amount < 0.0, format!("{:.2}", amount.abs())),
    };

    let sign = if negative { "-" } else { "" };
    format!("{sign}${}", group_thousands(&fixed))
}

/// `1234567.89` -> `1,234,567.89`. Expects an unsigned fixed-point string.
fn group_thousands(fixed: &str) -> String {
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3 + 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped.push('.');
    grouped.push_str(cents);
    grouped
}
