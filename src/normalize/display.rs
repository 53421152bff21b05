//! Number-format rendering: the text a spreadsheet shows for a number.

use super::date::serial_date;
use crate::model::{
    format_number, Elapsed, NumberFormat, Placeholder, Section, SectionKind, Token,
};

/// Largest serial with a calendar date (9999-12-31).
const MAX_DATE_SERIAL: f64 = 2_958_466.0;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// Render a number in the General format.
///
/// Output fits an 11-character cell: up to ten significant digits, falling
/// back to `1.23457E+11` style when the fixed form does not fit.
pub fn format_general(n: f64) -> String {
    if !n.is_finite() {
        return format_number(n);
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let width = if n < 0.0 { 12 } else { 11 };
    let exponent = n.abs().log10().floor() as i32;
    match exponent {
        -4..=-1 => trim_fraction(format!("{:.9}", n)),
        -9..=9 => {
            let fixed = trim_fraction(format!("{:.12}", n));
            if fixed.len() <= width {
                fixed
            } else if exponent >= 0 {
                trim_fraction(format!("{:.*}", (9 - exponent) as usize, n))
            } else {
                format_general_exponential(n)
            }
        }
        10 => format!("{:.0}", n.trunc()),
        _ => format_general_exponential(n),
    }
}

fn format_general_exponential(n: f64) -> String {
    let formatted = format!("{:.5e}", n);
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((&formatted, "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    format!(
        "{}E{}{:02}",
        trim_fraction(mantissa.to_string()),
        if exponent < 0 { '-' } else { '+' },
        exponent.abs()
    )
}

fn trim_fraction(s: String) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Render a number through a cell number format.
pub fn format_value(n: f64, format: &NumberFormat) -> String {
    if format.is_general() || !n.is_finite() {
        return format_general(n);
    }

    let Some((section, signed)) = select_section(format.sections(), n) else {
        return format_general(n);
    };
    let value = if signed { n } else { n.abs() };

    match section.kind {
        SectionKind::DateTime => {
            format_datetime(value, section).unwrap_or_else(|| format_general(n))
        }
        SectionKind::Number => format_numeric(value, section),
        SectionKind::Literal => format_literal(value, section),
    }
}

/// Pick the section for `n`; the flag says whether the value keeps its sign.
fn select_section(sections: &[Section], n: f64) -> Option<(&Section, bool)> {
    let numeric = &sections[..sections.len().min(3)];
    let first = numeric.first()?;

    if numeric.iter().any(|s| s.condition.is_some()) {
        let chosen = numeric
            .iter()
            .take(2)
            .find(|s| s.condition.is_some_and(|c| c.matches(n)))
            .or_else(|| numeric.get(2))
            .or_else(|| numeric.iter().find(|s| s.condition.is_none()))
            .unwrap_or(first);
        return Some((chosen, true));
    }

    Some(if n < 0.0 {
        match numeric.get(1) {
            Some(negative) => (negative, false),
            None => (first, true),
        }
    } else if n == 0.0 {
        (numeric.get(2).unwrap_or(first), true)
    } else {
        (first, true)
    })
}

fn format_literal(n: f64, section: &Section) -> String {
    let mut out = String::new();
    for token in &section.tokens {
        match token {
            Token::Literal(s) => out.push_str(s),
            Token::TextValue => out.push_str(&format_general(n)),
            _ => {}
        }
    }
    out
}

fn format_numeric(n: f64, section: &Section) -> String {
    if section
        .tokens
        .iter()
        .any(|t| matches!(t, Token::Exponent { .. }))
    {
        return format_scientific(n, section);
    }

    let tokens = &section.tokens;
    let magnitude = n.abs() / 1000f64.powi(section.scale) * 100f64.powi(section.percent);

    let point = tokens.iter().position(|t| *t == Token::DecimalPoint);
    let (int_tokens, frac_tokens) = match point {
        Some(p) => (&tokens[..p], &tokens[p + 1..]),
        None => (&tokens[..], &tokens[tokens.len()..]),
    };
    let int_places = int_tokens.iter().filter(|t| matches!(t, Token::Digit(_))).count();
    let frac_places = frac_tokens.iter().filter(|t| matches!(t, Token::Digit(_))).count();

    let rounded = format!("{:.*}", frac_places, round_half_away(magnitude, frac_places));
    let (int_digits, frac_digits) = rounded.split_once('.').unwrap_or((&rounded, ""));
    let int_digits = if int_digits == "0" { "" } else { int_digits };
    let is_zero = rounded.bytes().all(|b| matches!(b, b'0' | b'.'));

    let grouped = int_tokens
        .iter()
        .skip_while(|t| !matches!(t, Token::Digit(_)))
        .any(|t| *t == Token::Comma);

    let mut out = String::new();
    if n < 0.0 && !is_zero {
        out.push('-');
    }

    render_integer(&mut out, int_tokens, int_digits, int_places, grouped, magnitude);
    if point.is_some() {
        out.push('.');
        render_fraction(&mut out, frac_tokens, frac_digits, magnitude);
    }
    out
}

/// Emit the integer placeholders, right-aligned against the digits.
///
/// The first placeholder also takes any digits beyond the placeholder count.
fn render_integer(
    out: &mut String,
    tokens: &[Token],
    digits: &str,
    places: usize,
    grouped: bool,
    magnitude: f64,
) {
    let digits = digits.as_bytes();
    let mut seen = 0;

    for token in tokens {
        match token {
            Token::Digit(placeholder) => {
                if seen == 0 {
                    for extra in (places..digits.len()).rev() {
                        push_digit(out, digits, extra, None, grouped);
                    }
                }
                let filler = match placeholder {
                    Placeholder::Zero => Some('0'),
                    Placeholder::Hash => None,
                    Placeholder::Space => Some(' '),
                };
                push_digit(out, digits, places - 1 - seen, filler, grouped);
                seen += 1;
            }
            Token::Literal(s) => out.push_str(s),
            Token::Percent => out.push('%'),
            Token::General => out.push_str(&format_general(magnitude)),
            _ => {}
        }
    }
}

/// Push the digit at `position` (counted from the right), or the filler
/// when the number has no digit there.
fn push_digit(out: &mut String, digits: &[u8], position: usize, filler: Option<char>, grouped: bool) {
    let ch = if position < digits.len() {
        Some(digits[digits.len() - 1 - position] as char)
    } else {
        filler
    };

    if let Some(ch) = ch {
        out.push(ch);
        if grouped && position > 0 && position % 3 == 0 && ch != ' ' {
            out.push(',');
        }
    }
}

/// Round to `places` decimals with ties away from zero.
fn round_half_away(value: f64, places: usize) -> f64 {
    let factor = 10f64.powi(places as i32);
    let scaled = value * factor;
    if scaled.is_finite() {
        scaled.round() / factor
    } else {
        value
    }
}

fn render_fraction(out: &mut String, tokens: &[Token], digits: &str, magnitude: f64) {
    let digits = digits.as_bytes();
    let placeholders: Vec<Placeholder> = tokens
        .iter()
        .filter_map(|t| match t {
            Token::Digit(p) => Some(*p),
            _ => None,
        })
        .collect();

    // Trailing zeros are dropped for `#` and blanked for `?`
    let mut shown: Vec<Option<char>> = digits.iter().map(|&d| Some(d as char)).collect();
    for i in (0..shown.len()).rev() {
        if digits[i] != b'0' {
            break;
        }
        shown[i] = match placeholders.get(i) {
            Some(Placeholder::Hash) => None,
            Some(Placeholder::Space) => Some(' '),
            _ => break,
        };
    }

    let mut index = 0;
    for token in tokens {
        match token {
            Token::Digit(_) => {
                if let Some(Some(ch)) = shown.get(index) {
                    out.push(*ch);
                }
                index += 1;
            }
            Token::Literal(s) => out.push_str(s),
            Token::Percent => out.push('%'),
            Token::General => out.push_str(&format_general(magnitude)),
            _ => {}
        }
    }
}

fn format_scientific(n: f64, section: &Section) -> String {
    let tokens = &section.tokens;
    let Some(exp_at) = tokens
        .iter()
        .position(|t| matches!(t, Token::Exponent { .. }))
    else {
        return format_general(n);
    };
    let plus = matches!(tokens[exp_at], Token::Exponent { plus: true });

    let mantissa_tokens = &tokens[..exp_at];
    let point = mantissa_tokens.iter().position(|t| *t == Token::DecimalPoint);
    let count = |ts: &[Token]| ts.iter().filter(|t| matches!(t, Token::Digit(_))).count();
    let int_places = count(&mantissa_tokens[..point.unwrap_or(mantissa_tokens.len())]).max(1);
    let frac_places = point.map_or(0, |p| count(&mantissa_tokens[p + 1..]));
    let exp_places = count(&tokens[exp_at + 1..]).max(1);

    let magnitude = n.abs();
    let step = int_places as i32;
    let mut exponent = if magnitude == 0.0 {
        0
    } else {
        let raw = magnitude.log10().floor() as i32;
        // Engineering formats such as ##0.0E+0 keep exponents in multiples
        if step > 1 {
            raw.div_euclid(step) * step
        } else {
            raw
        }
    };
    let mut mantissa = round_half_away(magnitude / 10f64.powi(exponent), frac_places);
    let limit = 10f64.powi(step);
    if mantissa >= limit {
        exponent += step;
        mantissa = round_half_away(mantissa / limit, frac_places);
    }

    let prefix: String = mantissa_tokens
        .iter()
        .take_while(|t| !matches!(t, Token::Digit(_)))
        .filter_map(|t| match t {
            Token::Literal(s) => Some(s.as_str()),
            _ => None,
        })
        .collect();
    let suffix: String = tokens[exp_at + 1..]
        .iter()
        .filter_map(|t| match t {
            Token::Literal(s) => Some(s.as_str()),
            _ => None,
        })
        .collect();

    let sign = if n < 0.0 { "-" } else { "" };
    let exp_sign = if exponent < 0 {
        "-"
    } else if plus {
        "+"
    } else {
        ""
    };
    format!(
        "{}{}{:.*}E{}{:0>width$}{}",
        sign,
        prefix,
        frac_places,
        mantissa,
        exp_sign,
        exponent.abs(),
        suffix,
        width = exp_places
    )
}

/// Render a date/time section; `None` when the serial has no calendar date.
fn format_datetime(serial: f64, section: &Section) -> Option<String> {
    if !(0.0..MAX_DATE_SERIAL).contains(&serial) {
        return None;
    }

    let tokens = &section.tokens;
    // Fractional seconds: zeros after a decimal point
    let sub_digits = tokens
        .iter()
        .skip_while(|t| **t != Token::DecimalPoint)
        .filter(|t| **t == Token::Digit(Placeholder::Zero))
        .count()
        .min(3) as u32;
    let per_second = 10i64.pow(sub_digits);

    let ticks = (serial * 86_400.0 * per_second as f64).round() as i64;
    let ticks_per_day = 86_400 * per_second;
    let date = serial_date(ticks.div_euclid(ticks_per_day))?;
    let time_ticks = ticks.rem_euclid(ticks_per_day);
    let second_of_day = time_ticks / per_second;
    let sub_second = time_ticks % per_second;
    let total_seconds = ticks / per_second;

    let hour = second_of_day / 3600;
    let minute = (second_of_day / 60) % 60;
    let second = second_of_day % 60;
    let twelve_hour = tokens.iter().any(|t| matches!(t, Token::AmPm { .. }));

    let mut out = String::new();
    let mut after_point = false;
    for token in tokens {
        match token {
            Token::Year(run) if *run <= 2 => {
                out.push_str(&format!("{:02}", date.year.rem_euclid(100)))
            }
            Token::Year(_) => out.push_str(&format!("{:04}", date.year)),
            Token::Month(1) => out.push_str(&date.month.to_string()),
            Token::Month(2) => out.push_str(&format!("{:02}", date.month)),
            Token::Month(run) => {
                let name = MONTHS[(date.month as usize).saturating_sub(1) % 12];
                match run {
                    3 => out.push_str(&name[..3]),
                    4 => out.push_str(name),
                    _ => out.push_str(&name[..1]),
                }
            }
            Token::Day(1) => out.push_str(&date.day.to_string()),
            Token::Day(2) => out.push_str(&format!("{:02}", date.day)),
            Token::Day(3) => out.push_str(&WEEKDAYS[date.weekday as usize][..3]),
            Token::Day(_) => out.push_str(WEEKDAYS[date.weekday as usize]),
            Token::Hour(run) => {
                let shown = if twelve_hour {
                    match hour % 12 {
                        0 => 12,
                        h => h,
                    }
                } else {
                    hour
                };
                push_padded(&mut out, shown, *run);
            }
            Token::Minute(run) => push_padded(&mut out, minute, *run),
            Token::Second(run) => push_padded(&mut out, second, *run),
            Token::AmPm { short } => {
                let marker = if hour < 12 { "AM" } else { "PM" };
                out.push_str(if *short { &marker[..1] } else { marker });
            }
            Token::Elapsed(Elapsed::Hours) => out.push_str(&(total_seconds / 3600).to_string()),
            Token::Elapsed(Elapsed::Minutes) => out.push_str(&(total_seconds / 60).to_string()),
            Token::Elapsed(Elapsed::Seconds) => out.push_str(&total_seconds.to_string()),
            Token::DecimalPoint => {
                after_point = true;
                out.push('.');
                if sub_digits > 0 {
                    out.push_str(&format!("{:0>width$}", sub_second, width = sub_digits as usize));
                }
            }
            // Consumed by the fractional seconds above
            Token::Digit(_) if after_point => {}
            Token::Digit(_) => out.push('0'),
            Token::Literal(s) => out.push_str(s),
            _ => {}
        }
    }

    Some(out)
}

fn push_padded(out: &mut String, value: i64, run: usize) {
    if run >= 2 {
        out.push_str(&format!("{:02}", value));
    } else {
        out.push_str(&value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(n: f64, code: &str) -> String {
        format_value(n, &NumberFormat::new(164, code))
    }

    fn builtin(n: f64, id: u32) -> String {
        format_value(n, &NumberFormat::builtin(id))
    }

    #[test]
    fn test_general() {
        assert_eq!(format_general(0.1 + 0.2), "0.3");
        assert_eq!(format_general(1234.0), "1234");
        assert_eq!(format_general(-7.25), "-7.25");
        assert_eq!(format_general(1.0 / 3.0), "0.333333333");
        assert_eq!(format_general(123456789012.0), "1.23457E+11");
        assert_eq!(format_general(0.00001), "0.00001");
        assert_eq!(format_general(1.23456789e-7), "1.23457E-07");
        assert_eq!(format_general(1234567890.5), "1234567891");
        assert_eq!(format_general(0.0001), "0.0001");
        assert_eq!(format_general(-0.0), "0");
    }

    #[test]
    fn test_builtin_decimal_formats() {
        assert_eq!(builtin(1234.5, 1), "1235");
        assert_eq!(builtin(1234.5, 2), "1234.50");
        assert_eq!(builtin(1234.0, 3), "1,234");
        assert_eq!(builtin(1234567.891, 4), "1,234,567.89");
        assert_eq!(builtin(12.0, 3), "12");
        assert_eq!(builtin(0.0, 3), "0");
        assert_eq!(builtin(-1234.0, 3), "-1,234");
    }

    #[test]
    fn test_builtin_percent_formats() {
        assert_eq!(builtin(0.5, 9), "50%");
        assert_eq!(builtin(0.1234, 10), "12.34%");
        assert_eq!(builtin(-0.05, 9), "-5%");
    }

    #[test]
    fn test_builtin_time_formats() {
        let half_past_three_pm = 0.6462962962962963; // 15:30:40
        assert_eq!(builtin(half_past_three_pm, 18), "3:30 PM");
        assert_eq!(builtin(half_past_three_pm, 19), "3:30:40 PM");
        assert_eq!(builtin(half_past_three_pm, 20), "15:30");
        assert_eq!(builtin(half_past_three_pm, 21), "15:30:40");
        assert_eq!(builtin(0.0, 18), "12:00 AM");
    }

    #[test]
    fn test_builtin_duration_formats() {
        assert_eq!(builtin(1.5, 46), "36:00:00");
        assert_eq!(builtin(0.5, 46), "12:00:00");
        assert_eq!(builtin(90.5 / 86_400.0, 45), "01:31");
        assert_eq!(builtin(90.2 / 86_400.0, 47), "0130.2");
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(builtin(45306.0, 14), "1/15/24");
        assert_eq!(builtin(45306.0, 15), "15-Jan-24");
        assert_eq!(builtin(45306.0, 16), "15-Jan");
        assert_eq!(builtin(45306.0, 17), "Jan-24");
        assert_eq!(builtin(45306.75, 22), "1/15/24 18:00");
        assert_eq!(render(45306.0, "yyyy-mm-dd"), "2024-01-15");
        assert_eq!(render(45306.0, "dddd, mmmm d, yyyy"), "Monday, January 15, 2024");
        assert_eq!(render(45306.0, "[$-409]mmmmm"), "J");
        assert_eq!(builtin(60.0, 14), "2/29/00");
    }

    #[test]
    fn test_dates_out_of_range_fall_back_to_general() {
        assert_eq!(builtin(-1.0, 14), "-1");
        assert_eq!(builtin(3_000_000.0, 15), "3000000");
    }

    #[test]
    fn test_custom_number_formats() {
        assert_eq!(render(1234.5, r##""$"#,##0.00"##), "$1,234.50");
        assert_eq!(render(-1234.5, r#"#,##0.00;(#,##0.00)"#), "(1,234.50)");
        assert_eq!(render(0.0, r#"0.00;-0.00;"zero""#), "zero");
        assert_eq!(render(1500.0, r#"#,##0,"K""#), "2K");
        assert_eq!(render(5551234.0, "000-0000"), "555-1234");
        assert_eq!(render(0.5, "#.##"), ".5");
        assert_eq!(render(2.0, "0.0#"), "2.0");
        assert_eq!(render(7.0, "00"), "07");
        assert_eq!(render(1234.0, "[$€-407]#,##0"), "€1,234");
    }

    #[test]
    fn test_accounting_format_pads_with_spaces() {
        assert_eq!(builtin(1234.0, 41), " 1,234 ");
        assert_eq!(builtin(-1234.0, 41), " (1,234)");
    }

    #[test]
    fn test_scientific() {
        assert_eq!(builtin(12345.0, 11), "1.23E+04");
        assert_eq!(builtin(0.00012, 11), "1.20E-04");
        assert_eq!(builtin(12345.0, 48), "12.3E+3");
    }

    #[test]
    fn test_conditional_sections() {
        let code = r#"[>=1000]#,##0,"K";0"#;
        assert_eq!(render(25000.0, code), "25K");
        assert_eq!(render(999.0, code), "999");
    }

    #[test]
    fn test_text_format_shows_general() {
        assert_eq!(builtin(42.5, 49), "42.5");
    }
}
