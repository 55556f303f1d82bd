// src/exec/shell.rs

//! POSIX shell quoting helpers used when composing command strings.

/// Quote `word` for a POSIX shell, leaving "plain" words untouched so the
/// composed commands stay readable in logs (`--ncpu=32` stays `--ncpu=32`).
pub fn quote(word: &str) -> String {
    if !word.is_empty() && word.bytes().all(is_plain) {
        return word.to_string();
    }
    single_quote(word)
}

/// Wrap `text` in single quotes, escaping embedded single quotes as `'\''`.
pub fn single_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

fn is_plain(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'/' | b'=' | b':' | b',' | b'+' | b'@' | b'%')
}
