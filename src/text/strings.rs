use crate::utils::error::{Result, TourError};
use regex::{Captures, Regex};
use std::collections::HashMap;

/// 以連續空白切割，忽略頭尾空白
pub fn fields(s: &str) -> Vec<&str> {
    s.split_whitespace().collect()
}

/// 以 `is_sep` 為 true 的字元切割，空片段會被丟掉
pub fn fields_func<F>(s: &str, is_sep: F) -> Vec<&str>
where
    F: Fn(char) -> bool,
{
    s.split(is_sep).filter(|part| !part.is_empty()).collect()
}

/// Non-overlapping occurrences of `needle`. An empty needle matches before and
/// after every character.
pub fn count(s: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return s.chars().count() + 1;
    }
    s.matches(needle).count()
}

pub fn index(s: &str, needle: &str) -> Option<usize> {
    s.find(needle)
}

pub fn index_any(s: &str, chars: &str) -> Option<usize> {
    s.find(|c: char| chars.contains(c))
}

pub fn index_func<F: Fn(char) -> bool>(s: &str, f: F) -> Option<usize> {
    s.find(f)
}

pub fn last_index(s: &str, needle: &str) -> Option<usize> {
    s.rfind(needle)
}

pub fn last_index_any(s: &str, chars: &str) -> Option<usize> {
    s.rfind(|c: char| chars.contains(c))
}

pub fn last_index_func<F: Fn(char) -> bool>(s: &str, f: F) -> Option<usize> {
    s.rfind(f)
}

/// 最多切成 `n` 段：`n < 0` 全部切開，`n == 0` 回傳空集合。
/// 空分隔字元會把字串拆成單一字元。
pub fn split_n<'a>(s: &'a str, sep: &str, n: isize) -> Vec<&'a str> {
    generic_split(s, sep, 0, n)
}

/// 切割後每一段保留結尾的分隔字元
pub fn split_after<'a>(s: &'a str, sep: &str) -> Vec<&'a str> {
    generic_split(s, sep, sep.len(), -1)
}

pub fn split_after_n<'a>(s: &'a str, sep: &str, n: isize) -> Vec<&'a str> {
    generic_split(s, sep, sep.len(), n)
}

fn generic_split<'a>(s: &'a str, sep: &str, keep: usize, n: isize) -> Vec<&'a str> {
    if n == 0 {
        return Vec::new();
    }
    let limit = if n < 0 { usize::MAX } else { n as usize };

    if sep.is_empty() {
        return explode(s, limit);
    }

    let mut parts = Vec::new();
    let mut rest = s;
    while parts.len() + 1 < limit {
        let Some(at) = rest.find(sep) else {
            break;
        };
        parts.push(&rest[..at + keep]);
        rest = &rest[at + sep.len()..];
    }
    parts.push(rest);
    parts
}

fn explode(s: &str, limit: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        if parts.len() + 1 == limit {
            parts.push(rest);
            return parts;
        }
        let width = rest.chars().next().map_or(1, char::len_utf8);
        parts.push(&rest[..width]);
        rest = &rest[width..];
    }
    parts
}

/// 忽略大小寫比較
pub fn equal_fold(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// 每個單字的第一個字母轉成大寫
pub fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_is_separator = true;
    for c in s.chars() {
        if prev_is_separator {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_is_separator = is_separator(c);
    }
    out
}

fn is_separator(c: char) -> bool {
    if c.is_ascii() {
        return !(c.is_ascii_alphanumeric() || c == '_');
    }
    if c.is_alphanumeric() {
        return false;
    }
    c.is_whitespace()
}

/// Replaces a list of old/new pairs in one left-to-right pass.
///
/// Matches never overlap, and when several `old` strings start at the same
/// position the pair listed first wins.
#[derive(Debug, Clone)]
pub struct Replacer {
    pattern: Option<Regex>,
    replacements: HashMap<String, String>,
}

impl Replacer {
    pub fn new<S: AsRef<str>>(pairs: &[(S, S)]) -> Result<Self> {
        let mut replacements = HashMap::new();
        for (old, new) in pairs {
            replacements
                .entry(old.as_ref().to_string())
                .or_insert_with(|| new.as_ref().to_string());
        }

        // regex 的 alternation 是 leftmost-first，順序即優先權
        let pattern = if pairs.is_empty() {
            None
        } else {
            let alternation = pairs
                .iter()
                .map(|(old, _)| regex::escape(old.as_ref()))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&alternation).map_err(|e| TourError::ConfigError {
                message: format!("Invalid replacer pattern: {}", e),
            })?)
        };

        Ok(Self {
            pattern,
            replacements,
        })
    }

    pub fn replace(&self, s: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return s.to_string();
        };
        pattern
            .replace_all(s, |caps: &Captures| {
                self.replacements
                    .get(&caps[0])
                    .cloned()
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

/// 語系特例的大小寫對應
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSpecial {
    /// 有點的 i / İ 與無點的 ı / I 是兩組不同字母
    Turkish,
}

pub fn to_upper_special(case: CaseSpecial, s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match (case, c) {
            (CaseSpecial::Turkish, 'i') => out.push('\u{0130}'),
            (CaseSpecial::Turkish, '\u{0131}') => out.push('I'),
            _ => out.extend(c.to_uppercase()),
        }
    }
    out
}

pub fn to_lower_special(case: CaseSpecial, s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match (case, c) {
            (CaseSpecial::Turkish, 'I') => out.push('\u{0131}'),
            (CaseSpecial::Turkish, '\u{0130}') => out.push('i'),
            _ => out.extend(c.to_lowercase()),
        }
    }
    out
}

pub fn rot13(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'A'..='Z' => (b'A' + (c as u8 - b'A' + 13) % 26) as char,
            'a'..='z' => (b'a' + (c as u8 - b'a' + 13) % 26) as char,
            _ => c,
        })
        .collect()
}
