//! Natural ("human") ordering.
//!
//! Strings are split into alternating runs of non-digits and digits, always
//! starting with a (possibly empty) non-digit run, so two token sequences line
//! up kind-for-kind. Digit runs compare by numeric value without parsing into a
//! fixed-width integer; text runs compare case-insensitively. Equal sequences
//! fall back to a raw comparison so the order stays total.

use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Number(&'a str),
}

fn tokenize(value: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_digits = false;
    for (idx, ch) in value.char_indices() {
        let is_digit = ch.is_ascii_digit();
        if is_digit != in_digits {
            tokens.push(make_token(&value[start..idx], in_digits));
            start = idx;
            in_digits = is_digit;
        }
    }
    tokens.push(make_token(&value[start..], in_digits));
    tokens
}

fn make_token(run: &str, digits: bool) -> Token<'_> {
    if digits {
        Token::Number(run)
    } else {
        Token::Text(run)
    }
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        .then_with(|| a.len().cmp(&b.len()))
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Compare two strings in natural order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = tokenize(a);
    let right = tokenize(b);
    for (l, r) in left.iter().zip(right.iter()) {
        let ord = match (l, r) {
            (Token::Number(x), Token::Number(y)) => compare_numbers(x, y),
            (Token::Text(x), Token::Text(y)) => compare_text(x, y),
            // Sequences always alternate from a text run, so kinds align by
            // position; keep a defined answer anyway.
            (Token::Number(_), Token::Text(_)) => Ordering::Less,
            (Token::Text(_), Token::Number(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

/// Sort a slice of strings in natural order.
pub fn natural_sort<S: AsRef<str>>(values: &mut [S]) {
    values.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}
