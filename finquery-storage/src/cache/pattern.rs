//! Glob matching for cache key patterns.
//!
//! Supports `*` (any run of characters, including none), `?` (exactly one
//! character) and `\` (match the next character literally).

/// Whether `key` matches the glob `pattern`.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern = tokenize(pattern);
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0usize, 0usize);
    // Position of the last `*` seen and the key index it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;

    while k < key.len() {
        match pattern.get(p) {
            Some(Token::Star) => {
                backtrack = Some((p, k));
                p += 1;
            }
            Some(Token::Any) => {
                p += 1;
                k += 1;
            }
            Some(Token::Literal(c)) if *c == key[k] => {
                p += 1;
                k += 1;
            }
            _ => match backtrack {
                Some((star, tried)) => {
                    p = star + 1;
                    k = tried + 1;
                    backtrack = Some((star, tried + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|t| matches!(t, Token::Star))
}

/// Escape glob metacharacters so `text` matches only itself.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Star,
    Any,
    Literal(char),
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '*' => Token::Star,
            '?' => Token::Any,
            // A trailing backslash matches itself.
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            c => Token::Literal(c),
        });
    }
    tokens
}
