/// 把 `$NAME` 與 `${NAME}` 換成 `mapper(NAME)` 的回傳值。
///
/// 名稱由英數字與底線組成；`$` 後面直接接一個 shell 特殊字元（`$1`、`$?`…）
/// 時只取那一個字元。`$` 後面沒有合法名稱時原樣保留，`${}` 這種錯誤語法則整段丟棄。
pub fn expand<F>(template: &str, mut mapper: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(at) = rest.find('$') {
        out.push_str(&rest[..at]);
        let after = &rest[at + 1..];

        match shell_name(after) {
            Some((name, consumed)) if !name.is_empty() => {
                out.push_str(&mapper(name));
                rest = &after[consumed..];
            }
            Some((_, consumed)) => {
                // bad syntax such as `${}`: drop it
                rest = &after[consumed..];
            }
            None => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Returns the variable name and how many bytes it spans, or `None` when `$`
/// is not followed by anything that could start a name.
fn shell_name(s: &str) -> Option<(&str, usize)> {
    let first = s.chars().next()?;

    if first == '{' {
        if s.len() > 2 && is_special_var(s.as_bytes()[1]) && s.as_bytes()[2] == b'}' {
            return Some((&s[1..2], 3));
        }
        return match s[1..].find('}') {
            // `${}` and an unterminated `${` are both invalid
            Some(0) => Some(("", 2)),
            Some(end) => Some((&s[1..1 + end], end + 2)),
            None => Some(("", 1)),
        };
    }

    if first.is_ascii() && is_special_var(first as u8) {
        return Some((&s[..1], 1));
    }

    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    if end == 0 {
        None
    } else {
        Some((&s[..end], end))
    }
}

fn is_special_var(b: u8) -> bool {
    matches!(b, b'*' | b'#' | b'$' | b'@' | b'!' | b'?' | b'-' | b'0'..=b'9')
}

/// 用目前的環境變數展開，未設定的變數視為空字串
pub fn expand_env(template: &str) -> String {
    expand(template, |name| std::env::var(name).unwrap_or_default())
}

/// 區分「設定為空字串」與「未設定」
pub fn lookup_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
