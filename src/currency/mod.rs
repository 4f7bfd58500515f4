//! 가격 표시 포맷터
//! USD 금액을 고정 환율의 INR 금액과 함께 표시한다.
//! 예: `$12,500.00 (₹1,062,500.00)`

/// 고정 환율 (1 USD 당 INR)
pub const INR_PER_USD: f64 = 85.0;

/// 달러 + 루피 병기 표시
pub fn format_price_display(usd: f64) -> String {
    format!("{} ({})", format_usd(usd), format_inr(usd * INR_PER_USD))
}

pub fn format_usd(amount: f64) -> String {
    format_currency("$", amount)
}

pub fn format_inr(amount: f64) -> String {
    format_currency("₹", amount)
}

fn format_currency(symbol: &str, amount: f64) -> String {
    // NaN, 무한대는 그대로 출력
    if !amount.is_finite() {
        return format!("{}{}", symbol, amount);
    }

    let cents = (amount.abs() * 100.0).round() as u128;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{}{}{}.{:02}",
        sign,
        symbol,
        group_thousands(cents / 100),
        cents % 100
    )
}

fn group_thousands(value: u128) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
