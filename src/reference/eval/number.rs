//! 数值与字符串之间的转换、精确整数幂

/// Number::toString(10)
pub(crate) fn number_to_string(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value < 0.0 {
        return format!("-{}", number_to_string(-value));
    }

    // `{:e}` 给出最短往返表示：d[.ddd]e<exp>
    let formatted = format!("{:e}", value);
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((formatted.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let n = exponent + 1;

    if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{}.{}", int, frac)
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let sign = if n - 1 >= 0 { '+' } else { '-' };
        let magnitude = (n - 1).abs();
        if k == 1 {
            format!("{}e{}{}", digits, sign, magnitude)
        } else {
            format!("{}.{}e{}{}", &digits[..1], &digits[1..], sign, magnitude)
        }
    }
}

/// StringToNumber，无法解析时为 NaN
pub(crate) fn string_to_number(units: &[u16]) -> f64 {
    let text = String::from_utf16_lossy(units);
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}');
    if text.is_empty() {
        return 0.0;
    }
    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix = match text.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let body = &text[2..];
        if body.is_empty() {
            return f64::NAN;
        }
        let mut value = 0f64;
        for c in body.chars() {
            match c.to_digit(radix) {
                Some(digit) => value = value * f64::from(radix) + f64::from(digit),
                None => return f64::NAN,
            }
        }
        return value;
    }

    // 排除 Rust 额外接受的 "inf"/"nan" 等写法
    if !text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    text.parse::<f64>().unwrap_or(f64::NAN)
}

/// `base ** exponent`
pub(crate) fn power(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() {
        return f64::NAN;
    }
    if exponent == 0.0 {
        return 1.0;
    }
    if base.abs() == 1.0 && exponent.is_infinite() {
        return f64::NAN;
    }
    exact_integer_power(base, exponent).unwrap_or_else(|| base.powf(exponent))
}

/// 整数底数与非负整数指数的正确舍入结果
///
/// 把底数拆成 `odd * 2^twos`，奇数部分在 u128 中精确求幂，
/// 转换为 f64 时只舍入一次，再乘以 2 的幂（不引入误差）。
fn exact_integer_power(base: f64, exponent: f64) -> Option<f64> {
    const MAX_SAFE: f64 = 9_007_199_254_740_992.0;
    if base == 0.0
        || base.fract() != 0.0
        || base.abs() > MAX_SAFE
        || exponent.fract() != 0.0
        || !(1.0..=2048.0).contains(&exponent)
    {
        return None;
    }

    let exp = exponent as u32;
    let magnitude = base.abs() as u64;
    let twos = magnitude.trailing_zeros();
    let odd = u128::from(magnitude >> twos);
    let odd_power = odd.checked_pow(exp)?;

    let mut result = odd_power as f64;
    let mut shift = i64::from(twos) * i64::from(exp);
    while shift > 0 {
        let step = shift.min(1000);
        result *= 2f64.powi(step as i32);
        shift -= step;
    }

    let negative = base < 0.0 && exp % 2 == 1;
    Some(if negative { -result } else { result })
}
