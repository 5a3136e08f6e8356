//! Brace-expanding glob patterns for item ids.
//!
//! A pattern is a shell glob (`*`, `?`, `[...]`) that may also carry any
//! number of `{a,b,c}` groups. Groups are expanded into the cartesian product
//! of their alternatives first; each expansion is then an ordinary glob.
//!
//! Known limitation: groups do not nest, and a comma inside `[...]` within a
//! group still splits the group.
//!
//! Unbalanced input: an unclosed `{` drops the trailing group text and a stray
//! `}` is ignored, so every expansion is brace-free.

use globset::{GlobBuilder, GlobMatcher};

/// Expand every brace group in `pattern`.
///
/// `{}` contributes a single empty alternative. The number of expansions is
/// the product of the group sizes.
pub fn preprocess(pattern: &str) -> Vec<String> {
    let mut out = vec![String::new()];
    let mut options: Vec<String> = Vec::new();
    let mut in_group = false;

    for ch in pattern.chars() {
        match ch {
            '{' if !in_group => {
                in_group = true;
                options = vec![String::new()];
            }
            '}' if in_group => {
                in_group = false;
                out = out
                    .iter()
                    .flat_map(|prefix| options.iter().map(move |opt| format!("{prefix}{opt}")))
                    .collect();
            }
            '}' => {}
            ',' if in_group => options.push(String::new()),
            _ if in_group => {
                if let Some(last) = options.last_mut() {
                    last.push(ch);
                }
            }
            _ => {
                for prefix in &mut out {
                    prefix.push(ch);
                }
            }
        }
    }
    out
}

#[derive(Debug, Clone)]
enum Matcher {
    Glob(GlobMatcher),
    // Expansions globset rejects (e.g. an unclosed `[`) match literally, the
    // way fnmatch degrades them.
    Literal(String),
}

impl Matcher {
    fn compile(expansion: &str) -> Self {
        let glob = GlobBuilder::new(expansion)
            .literal_separator(false)
            .backslash_escape(false)
            .build();
        match glob {
            Ok(glob) => Matcher::Glob(glob.compile_matcher()),
            Err(_) => Matcher::Literal(expansion.to_string()),
        }
    }

    fn is_match(&self, name: &str) -> bool {
        match self {
            Matcher::Glob(glob) => glob.is_match(name),
            Matcher::Literal(literal) => literal == name,
        }
    }
}

/// A compiled pattern: one matcher per brace expansion.
#[derive(Debug, Clone)]
pub struct Pattern {
    raw: String,
    matchers: Vec<Matcher>,
}

impl Pattern {
    pub fn new(raw: &str) -> Self {
        let matchers = preprocess(raw)
            .iter()
            .map(|expansion| Matcher::compile(expansion))
            .collect();
        Self {
            raw: raw.to_string(),
            matchers,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.matchers.iter().any(|m| m.is_match(name))
    }

    /// Lazily yield the names that match, in input order.
    pub fn filter<'a, I, S>(&'a self, names: I) -> impl Iterator<Item = S> + 'a
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: 'a,
        S: AsRef<str> + 'a,
    {
        names
            .into_iter()
            .filter(move |name| self.is_match(name.as_ref()))
    }
}

/// True when `name` matches any expansion of `pattern`.
pub fn pattern_match(name: &str, pattern: &str) -> bool {
    Pattern::new(pattern).is_match(name)
}

/// Names matching `pattern`, in input order.
pub fn pattern_filter<I, S>(names: I, pattern: &str) -> impl Iterator<Item = S>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let compiled = Pattern::new(pattern);
    names
        .into_iter()
        .filter(move |name| compiled.is_match(name.as_ref()))
}
