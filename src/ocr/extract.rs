//! Extraction of the wave number from a "第X波" banner.
//!
//! Parsing runs an ordered cascade of independent strategies; the first one
//! that produces a number wins. A miss is `None`, never an error.

use std::sync::LazyLock;

use regex::Regex;

/// 第, 1-4 digits (whitespace may separate them), 波.
static DIGIT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"第\s*((?:[0-9]\s*){1,4})波").expect("digit wave pattern is valid")
});

/// 第, a run of Chinese numerals, 波.
static CHINESE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"第\s*((?:[零一二三四五六七八九十两]\s*)+)波")
        .expect("chinese wave pattern is valid")
});

/// Digits between the usual misreads of the marker (弟) and unit (坡).
static LOOSE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[第弟]\s*((?:[0-9]\s*){1,4})[波坡]").expect("loose wave pattern is valid")
});

/// One step of the parse cascade.
pub struct Strategy {
    pub name: &'static str,
    pub find: fn(&str) -> Option<String>,
}

/// Parse strategies in priority order.
pub const CASCADE: &[Strategy] = &[
    Strategy {
        name: "digits",
        find: find_digit_wave,
    },
    Strategy {
        name: "chinese",
        find: find_chinese_wave,
    },
    Strategy {
        name: "loose",
        find: find_loose_wave,
    },
];

/// Parses the wave number out of OCR text.
///
/// Returns the number as an ASCII digit string, or `None` when no strategy
/// finds a "第X波" phrase.
pub fn parse_wave_number(text: &str) -> Option<String> {
    CASCADE.iter().find_map(|strategy| {
        let found = (strategy.find)(text)?;
        tracing::debug!("Wave {} matched by {} strategy", found, strategy.name);
        Some(found)
    })
}

/// Rewrites glyphs OCR commonly confuses with digits: `I`, `l`, `|` become
/// `1`; `O`, `o` become `0`.
pub fn normalize_misreads(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'I' | 'l' | '|' => '1',
            'O' | 'o' => '0',
            other => other,
        })
        .collect()
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// `第 12 波` on misread-normalized text.
pub fn find_digit_wave(text: &str) -> Option<String> {
    let normalized = normalize_misreads(text);
    let caps = DIGIT_PATTERN.captures(&normalized)?;
    Some(strip_whitespace(&caps[1]))
}

/// `第十二波` on the raw text.
pub fn find_chinese_wave(text: &str) -> Option<String> {
    let caps = CHINESE_PATTERN.captures(text)?;
    let value = chinese_numeral_to_int(&strip_whitespace(&caps[1]))?;
    Some(value.to_string())
}

/// `弟12坡` and friends on misread-normalized text.
pub fn find_loose_wave(text: &str) -> Option<String> {
    let normalized = normalize_misreads(text);
    let caps = LOOSE_PATTERN.captures(&normalized)?;
    Some(strip_whitespace(&caps[1]))
}

fn chinese_digit(c: char) -> Option<u32> {
    match c {
        '零' => Some(0),
        '一' => Some(1),
        '二' => Some(2),
        '三' => Some(3),
        '四' => Some(4),
        '五' => Some(5),
        '六' => Some(6),
        '七' => Some(7),
        '八' => Some(8),
        '九' => Some(9),
        _ => None,
    }
}

/// Parses exactly one Chinese digit glyph.
fn single_chinese_digit(s: &str) -> Option<u32> {
    let mut chars = s.chars();
    let digit = chinese_digit(chars.next()?)?;
    match chars.next() {
        None => Some(digit),
        Some(_) => None,
    }
}

/// Converts a simple Chinese numeral in 0..=99 to an integer.
///
/// - 两 counts as 二.
/// - One or two bare digit glyphs concatenate positionally: 二三 is 23.
/// - With 十: an empty prefix means one ten (十 = 10, 十二 = 12); otherwise the
///   prefix and the optional suffix must each be a single digit glyph. Only
///   the text before the second 十 is read, so 十十 is 10 and 三十十 is 30.
///
/// Anything else, including unknown glyphs and longer digit runs, yields `None`.
pub fn chinese_numeral_to_int(s: &str) -> Option<u32> {
    let s = s.replace('两', "二");
    if s.is_empty() {
        return None;
    }

    if !s.contains('十') {
        let digits: Vec<u32> = s.chars().map(chinese_digit).collect::<Option<_>>()?;
        if digits.len() > 2 {
            return None;
        }
        return Some(digits.iter().fold(0, |acc, d| acc * 10 + d));
    }

    let mut parts = s.split('十');
    let prefix = parts.next().unwrap_or_default();
    let suffix = parts.next().unwrap_or_default();

    let tens = if prefix.is_empty() {
        1
    } else {
        single_chinese_digit(prefix)?
    };
    let ones = if suffix.is_empty() {
        0
    } else {
        single_chinese_digit(suffix)?
    };

    Some(tens * 10 + ones)
}
