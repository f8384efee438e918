//! Stateless numeric and text helpers shared by the normalizer and allocator.

/// Round to `n_decimals` places, ties to even.
pub fn round_to_decimals(x: f64, n_decimals: u32) -> f64 {
    let n_scale = 10f64.powi(n_decimals as i32);
    let n_scaled = x * n_scale;
    if !n_scaled.is_finite() {
        return x;
    }
    n_scaled.round_ties_even() / n_scale
}

/// Quantity carved out at `pct` percent, rounded to a whole unit (ties to even).
pub fn calculate_quota_qty(qty: f64, pct: u32) -> f64 {
    (qty * (f64::from(pct) / 100.0)).round_ties_even()
}

/// Render a number without a trailing `.0` when it is integral.
pub fn format_number_text(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Brazilian-real currency text: `R$ 1.234,56`.
pub fn format_currency_brl(x: f64) -> String {
    let c_sign = if x < 0.0 { "-" } else { "" };
    let c_fixed = format!("{:.2}", x.abs());
    let (c_int, c_frac) = c_fixed.split_once('.').unwrap_or((c_fixed.as_str(), "00"));

    let n_len = c_int.len();
    let mut c_grouped = String::with_capacity(n_len + n_len / 3);
    for (n_idx, chr) in c_int.chars().enumerate() {
        if n_idx > 0 && (n_len - n_idx) % 3 == 0 {
            c_grouped.push('.');
        }
        c_grouped.push(chr);
    }

    format!("{c_sign}R$ {c_grouped},{c_frac}")
}
