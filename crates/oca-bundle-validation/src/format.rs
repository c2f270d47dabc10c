//! Value formats: date/time patterns, text patterns and character encodings.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::format::{parse, Parsed, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// `YYYY-MM-DD` with an optional `Thh:mm:ss[.fff]` tail, digits only.
static ISO_NAIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}(?:T\d{2}:\d{2}:\d{2}(?:\.\d+)?)?$").expect("valid iso regex")
});

/// A date/time pattern such as `YYYY-MM-DD` or `DD/MM/YYYY hh:mm`.
///
/// Recognized tokens: `YYYY`, `YY`, `MM` (month), `DD`, `hh` or `HH`,
/// `mm` (minute), `ss`. Everything else, `T` and `Z` included, must appear
/// literally in the value. Every numeric token is fixed width, so
/// `2020-1-5` or `+2020-01-15` do not match `YYYY-MM-DD`.
#[derive(Debug, Clone)]
pub struct DateTimeFormat {
    strftime: String,
    shape: Option<Regex>,
    has_date: bool,
    has_time: bool,
}

impl DateTimeFormat {
    pub fn from_pattern(pattern: &str) -> Self {
        const TOKENS: [(&str, &str, usize); 8] = [
            ("YYYY", "%Y", 4),
            ("YY", "%y", 2),
            ("MM", "%m", 2),
            ("DD", "%d", 2),
            ("hh", "%H", 2),
            ("HH", "%H", 2),
            ("mm", "%M", 2),
            ("ss", "%S", 2),
        ];

        let mut strftime = String::with_capacity(pattern.len() * 2);
        let mut shape = String::from("^");
        let (mut year, mut month, mut day, mut hour, mut minute) = (false, false, false, false, false);
        let mut rest = pattern;
        'outer: while !rest.is_empty() {
            for (token, directive, width) in TOKENS {
                if let Some(tail) = rest.strip_prefix(token) {
                    match token {
                        "YYYY" | "YY" => year = true,
                        "MM" => month = true,
                        "DD" => day = true,
                        "hh" | "HH" => hour = true,
                        "mm" => minute = true,
                        _ => {}
                    }
                    strftime.push_str(directive);
                    shape.push_str(&format!("[0-9]{{{width}}}"));
                    rest = tail;
                    continue 'outer;
                }
            }
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                if c == '%' {
                    strftime.push_str("%%");
                } else {
                    strftime.push(c);
                }
                shape.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
            }
            rest = chars.as_str();
        }
        shape.push('$');

        Self {
            strftime,
            shape: Regex::new(&shape).ok(),
            has_date: year && month && day,
            has_time: hour && minute,
        }
    }

    /// The equivalent strftime format string.
    pub fn strftime(&self) -> &str {
        &self.strftime
    }

    /// Whether `value` matches the pattern and denotes a real date/time.
    pub fn matches(&self, value: &str) -> bool {
        let Some(shape) = &self.shape else {
            return false;
        };
        if !shape.is_match(value) {
            return false;
        }
        if self.has_date && self.has_time {
            NaiveDateTime::parse_from_str(value, &self.strftime).is_ok()
        } else if self.has_date {
            NaiveDate::parse_from_str(value, &self.strftime).is_ok()
        } else {
            let mut parsed = Parsed::new();
            parse(&mut parsed, value, StrftimeItems::new(&self.strftime)).is_ok()
        }
    }
}

impl PartialEq for DateTimeFormat {
    fn eq(&self, other: &Self) -> bool {
        self.strftime == other.strftime
    }
}

impl Eq for DateTimeFormat {}

/// Default check for DateTime values without a format: RFC 3339,
/// `YYYY-MM-DDThh:mm:ss[.fff]` or `YYYY-MM-DD`.
pub fn is_iso8601(value: &str) -> bool {
    if DateTime::parse_from_rfc3339(value).is_ok() {
        return true;
    }
    ISO_NAIVE_RE.is_match(value)
        && (NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
            || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok())
}

/// Compile a text format as a whole-value regular expression.
pub fn text_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// Character encodings with an enforceable value check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterEncoding {
    Utf8,
    Ascii,
    Latin1,
    Base64,
}

impl CharacterEncoding {
    /// Look up an encoding label. Unknown labels are not enforced.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "ascii" | "us-ascii" => Some(Self::Ascii),
            "iso-8859-1" | "latin1" | "latin-1" => Some(Self::Latin1),
            "base64" => Some(Self::Base64),
            _ => None,
        }
    }

    pub fn accepts(self, value: &str) -> bool {
        match self {
            Self::Utf8 => true,
            Self::Ascii => value.is_ascii(),
            Self::Latin1 => value.chars().all(|c| u32::from(c) <= 0xff),
            Self::Base64 => STANDARD.decode(value).is_ok(),
        }
    }
}
