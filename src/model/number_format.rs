//! Cell number formats.
//!
//! A format code such as `#,##0.00;[Red](#,##0.00)` is parsed once into up
//! to four sections (positive, negative, zero, text). Rendering lives in
//! [`crate::normalize::format_value`].

use std::fmt;

/// Format code of the General format.
pub const GENERAL: &str = "General";

/// A number format attached to a cell through its style.
#[derive(Clone)]
pub struct NumberFormat {
    id: u32,
    code: String,
    sections: Vec<Section>,
}

impl NumberFormat {
    /// Create a format from its id and format code.
    pub fn new(id: u32, code: impl Into<String>) -> Self {
        let code = code.into();
        let sections = parse_sections(&code);
        Self { id, code, sections }
    }

    /// Create a built-in format; unknown ids fall back to General.
    pub fn builtin(id: u32) -> Self {
        Self::new(id, builtin_format_code(id).unwrap_or(GENERAL))
    }

    /// The numFmtId.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The format code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Check whether this is the General format.
    pub fn is_general(&self) -> bool {
        self.code.eq_ignore_ascii_case(GENERAL)
    }

    pub(crate) fn sections(&self) -> &[Section] {
        &self.sections
    }
}

impl PartialEq for NumberFormat {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.code == other.code
    }
}

impl fmt::Debug for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumberFormat")
            .field("id", &self.id)
            .field("code", &self.code)
            .finish()
    }
}

/// Format code for a built-in numFmtId.
///
/// Locale-dependent ids (5-8, 23-36, 50+) have no fixed code.
pub fn builtin_format_code(id: u32) -> Option<&'static str> {
    let code = match id {
        0 => GENERAL,
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "m/d/yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        41 => r#"_(* #,##0_);_(* \(#,##0\);_(* "-"_);_(@_)"#,
        42 => r#"_("$"* #,##0_);_("$"* \(#,##0\);_("$"* "-"_);_(@_)"#,
        43 => r#"_(* #,##0.00_);_(* \(#,##0.00\);_(* "-"??_);_(@_)"#,
        44 => r#"_("$"* #,##0.00_);_("$"* \(#,##0.00\);_("$"* "-"??_);_(@_)"#,
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    };
    Some(code)
}

/// Digit placeholder kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placeholder {
    /// `0`: always shown
    Zero,
    /// `#`: shown only when significant
    Hash,
    /// `?`: a space when not significant
    Space,
}

/// Units of bracketed elapsed-time tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Elapsed {
    Hours,
    Minutes,
    Seconds,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Digit(Placeholder),
    DecimalPoint,
    Comma,
    Percent,
    Exponent { plus: bool },
    Literal(String),
    /// `@`
    TextValue,
    /// `General` used inside a custom code
    General,
    // Date and time fields carry their letter count
    Year(usize),
    Month(usize),
    Day(usize),
    Hour(usize),
    Minute(usize),
    Second(usize),
    AmPm { short: bool },
    Elapsed(Elapsed),
}

impl Token {
    fn is_datetime(&self) -> bool {
        matches!(
            self,
            Token::Year(_)
                | Token::Month(_)
                | Token::Day(_)
                | Token::Hour(_)
                | Token::Minute(_)
                | Token::Second(_)
                | Token::AmPm { .. }
                | Token::Elapsed(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A `[>100]` style section condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Condition {
    pub op: Comparison,
    pub value: f64,
}

impl Condition {
    fn parse(content: &str) -> Option<Self> {
        let (op, rest) = [
            ("<=", Comparison::Le),
            (">=", Comparison::Ge),
            ("<>", Comparison::Ne),
            ("<", Comparison::Lt),
            (">", Comparison::Gt),
            ("=", Comparison::Eq),
        ]
        .into_iter()
        .find_map(|(prefix, op)| content.strip_prefix(prefix).map(|rest| (op, rest)))?;

        let value = rest.trim().parse().ok()?;
        Some(Self { op, value })
    }

    pub fn matches(&self, n: f64) -> bool {
        match self.op {
            Comparison::Eq => n == self.value,
            Comparison::Ne => n != self.value,
            Comparison::Lt => n < self.value,
            Comparison::Le => n <= self.value,
            Comparison::Gt => n > self.value,
            Comparison::Ge => n >= self.value,
        }
    }
}

/// What a section renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SectionKind {
    DateTime,
    Number,
    /// Literals and `@` only
    Literal,
}

/// One `;`-separated part of a format code.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Section {
    pub tokens: Vec<Token>,
    pub condition: Option<Condition>,
    pub kind: SectionKind,
    /// Trailing commas after the last digit; each divides by 1000
    pub scale: i32,
    pub percent: i32,
}

fn parse_sections(code: &str) -> Vec<Section> {
    split_sections(code)
        .into_iter()
        .take(4)
        .map(|s| parse_section(&s))
        .collect()
}

/// Split on `;` outside quotes, brackets and escapes.
fn split_sections(code: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current = String::new();
    let mut chars = code.chars();
    let mut in_quote = false;
    let mut in_bracket = false;

    while let Some(c) = chars.next() {
        match c {
            '"' if !in_bracket => in_quote = !in_quote,
            '[' if !in_quote => in_bracket = true,
            ']' if !in_quote => in_bracket = false,
            '\\' | '_' | '*' if !in_quote && !in_bracket => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                continue;
            }
            ';' if !in_quote && !in_bracket => {
                sections.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }

    sections.push(current);
    sections
}

fn parse_section(source: &str) -> Section {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut condition = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&q| q == '"')
                    .map_or(chars.len(), |p| i + 1 + p);
                push_literal(&mut tokens, chars[i + 1..end].iter().collect());
                i = end + 1;
            }
            '\\' => {
                if let Some(&next) = chars.get(i + 1) {
                    push_literal(&mut tokens, next.to_string());
                }
                i += 2;
            }
            // Padding the width of the next character
            '_' => {
                push_literal(&mut tokens, " ".to_string());
                i += 2;
            }
            // Fill repeats to the column width; nothing to repeat into
            '*' => i += 2,
            '[' => {
                let Some(end) = chars[i..].iter().position(|&b| b == ']').map(|p| i + p) else {
                    push_literal(&mut tokens, "[".to_string());
                    i += 1;
                    continue;
                };
                let content: String = chars[i + 1..end].iter().collect();
                let lower = content.to_ascii_lowercase();
                if !lower.is_empty() && lower.chars().all(|l| l == 'h') {
                    tokens.push(Token::Elapsed(Elapsed::Hours));
                } else if !lower.is_empty() && lower.chars().all(|l| l == 'm') {
                    tokens.push(Token::Elapsed(Elapsed::Minutes));
                } else if !lower.is_empty() && lower.chars().all(|l| l == 's') {
                    tokens.push(Token::Elapsed(Elapsed::Seconds));
                } else if let Some(currency) = content.strip_prefix('$') {
                    // [$€-407]: currency symbol with a locale suffix
                    let symbol = currency.split('-').next().unwrap_or_default();
                    push_literal(&mut tokens, symbol.to_string());
                } else if let Some(parsed) = Condition::parse(&content) {
                    condition = Some(parsed);
                }
                // Colors and other modifiers do not affect text
                i = end + 1;
            }
            '0' => {
                tokens.push(Token::Digit(Placeholder::Zero));
                i += 1;
            }
            '#' => {
                tokens.push(Token::Digit(Placeholder::Hash));
                i += 1;
            }
            '?' => {
                tokens.push(Token::Digit(Placeholder::Space));
                i += 1;
            }
            '.' => {
                tokens.push(Token::DecimalPoint);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '@' => {
                tokens.push(Token::TextValue);
                i += 1;
            }
            'E' | 'e' if matches!(chars.get(i + 1), Some('+') | Some('-')) => {
                tokens.push(Token::Exponent {
                    plus: chars[i + 1] == '+',
                });
                i += 2;
            }
            'G' | 'g' if starts_with_ignore_case(&chars[i..], "general") => {
                tokens.push(Token::General);
                i += GENERAL.len();
            }
            'A' | 'a' if starts_with_ignore_case(&chars[i..], "am/pm") => {
                tokens.push(Token::AmPm { short: false });
                i += 5;
            }
            'A' | 'a' if starts_with_ignore_case(&chars[i..], "a/p") => {
                tokens.push(Token::AmPm { short: true });
                i += 3;
            }
            'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => {
                let lower = c.to_ascii_lowercase();
                let run = chars[i..]
                    .iter()
                    .take_while(|ch| ch.to_ascii_lowercase() == lower)
                    .count();
                tokens.push(match lower {
                    'y' => Token::Year(run),
                    'm' => Token::Month(run),
                    'd' => Token::Day(run),
                    'h' => Token::Hour(run),
                    _ => Token::Second(run),
                });
                i += run;
            }
            _ => {
                push_literal(&mut tokens, c.to_string());
                i += 1;
            }
        }
    }

    resolve_minutes(&mut tokens);
    let scale = strip_scaling_commas(&mut tokens);
    let percent = tokens.iter().filter(|t| **t == Token::Percent).count() as i32;

    let kind = if tokens.iter().any(Token::is_datetime) {
        SectionKind::DateTime
    } else if tokens
        .iter()
        .any(|t| matches!(t, Token::Digit(_) | Token::General))
    {
        SectionKind::Number
    } else {
        SectionKind::Literal
    };

    Section {
        tokens,
        condition,
        kind,
        scale,
        percent,
    }
}

fn starts_with_ignore_case(chars: &[char], word: &str) -> bool {
    chars.len() >= word.len()
        && chars
            .iter()
            .zip(word.chars())
            .all(|(a, b)| a.to_ascii_lowercase() == b)
}

fn push_literal(tokens: &mut Vec<Token>, text: String) {
    if text.is_empty() {
        return;
    }
    if let Some(Token::Literal(last)) = tokens.last_mut() {
        last.push_str(&text);
    } else {
        tokens.push(Token::Literal(text));
    }
}

/// `m`/`mm` right after an hour or right before a second means minutes.
fn resolve_minutes(tokens: &mut [Token]) {
    let significant = |t: &Token| !matches!(t, Token::Literal(_));

    for i in 0..tokens.len() {
        let Token::Month(run) = tokens[i] else {
            continue;
        };
        if run > 2 {
            continue;
        }

        let after_hour = tokens[..i]
            .iter()
            .rev()
            .find(|t| significant(t))
            .is_some_and(|t| matches!(t, Token::Hour(_) | Token::Elapsed(Elapsed::Hours)));
        let before_second = tokens[i + 1..]
            .iter()
            .find(|t| significant(t))
            .is_some_and(|t| matches!(t, Token::Second(_) | Token::Elapsed(Elapsed::Seconds)));

        if after_hour || before_second {
            tokens[i] = Token::Minute(run);
        }
    }
}

/// Remove commas directly after the last digit placeholder and return
/// how many there were.
fn strip_scaling_commas(tokens: &mut Vec<Token>) -> i32 {
    let Some(last_digit) = tokens
        .iter()
        .rposition(|t| matches!(t, Token::Digit(_) | Token::DecimalPoint))
    else {
        return 0;
    };

    let count = tokens[last_digit + 1..]
        .iter()
        .take_while(|t| **t == Token::Comma)
        .count();
    tokens.drain(last_digit + 1..last_digit + 1 + count);
    count as i32
}
