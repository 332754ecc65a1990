//! Path template compilation.
//!
//! Templates use OpenAPI brace syntax (`/pet/{petId}`) but Express-style
//! `:name` segments are understood as well, since they show up in real
//! definitions. Matching is case-insensitive and tolerates a trailing slash.

use regex::Regex;
use smallvec::SmallVec;

/// Most paths carry a handful of parameters.
pub const MAX_INLINE_SLUGS: usize = 4;

/// Captured `(":name", value)` pairs in template order.
pub type Slugs = SmallVec<[(String, String); MAX_INLINE_SLUGS]>;

/// Pattern for one parameter value: anything up to the next `/`, `#` or `?`.
const PARAM_PATTERN: &str = "([^/#?]+?)";

enum Token {
    Literal(String),
    Param(String),
}

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    regex: Regex,
    names: Vec<String>,
    normalized: String,
}

impl PathTemplate {
    /// Compile `template`, or `None` when it is too malformed to match anything.
    ///
    /// Anything after a `?` is ignored. Parameter names are reduced to word
    /// characters (`{dlc-release}` captures as `dlcrelease`) and a stray `}`
    /// directly after a parameter is dropped. Any other unbalanced brace
    /// rejects the template.
    #[must_use]
    pub fn compile(template: &str) -> Option<Self> {
        let pruned = template.split('?').next().unwrap_or_default();
        let tokens = tokenize(pruned)?;

        let mut pattern = String::with_capacity(pruned.len() + 16);
        pattern.push_str("(?i)^");
        let mut normalized = String::with_capacity(pruned.len());
        let mut names = Vec::new();

        for token in &tokens {
            match token {
                Token::Literal(text) => {
                    pattern.push_str(&regex::escape(text));
                    normalized.push_str(text);
                }
                Token::Param(name) => {
                    pattern.push_str(PARAM_PATTERN);
                    normalized.push(':');
                    normalized.push_str(name);
                    names.push(name.clone());
                }
            }
        }
        pattern.push_str("/?$");

        let regex = Regex::new(&pattern).ok()?;
        Some(Self {
            regex,
            names,
            normalized,
        })
    }

    /// The template with `{name}` rewritten to `:name`.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Match a concrete path, returning URL-decoded slugs.
    ///
    /// A name that appears twice keeps its first captured value.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<Slugs> {
        let caps = self.regex.captures(path)?;
        let mut slugs = Slugs::new();
        for (index, name) in self.names.iter().enumerate() {
            let key = format!(":{name}");
            if slugs.iter().any(|(existing, _)| *existing == key) {
                continue;
            }
            let raw = caps.get(index + 1).map_or("", |m| m.as_str());
            let value = urlencoding::decode(raw)
                .map_or_else(|_| raw.to_string(), |decoded| decoded.into_owned());
            slugs.push((key, value));
        }
        Some(slugs)
    }
}

fn clean_name(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric() || *c == '_').collect()
}

fn tokenize(template: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = template.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        match c {
            '{' => {
                let rest = &template[index + 1..];
                let close = rest.find('}')?;
                let name = clean_name(&rest[..close]);
                if name.is_empty() {
                    return None;
                }
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(Token::Param(name));
                while chars.peek().is_some_and(|(i, _)| *i <= index + 1 + close) {
                    chars.next();
                }
            }
            '}' => {
                if literal.is_empty() && matches!(tokens.last(), Some(Token::Param(_))) {
                    continue;
                }
                return None;
            }
            ':' if chars
                .peek()
                .is_some_and(|(_, next)| next.is_ascii_alphanumeric() || *next == '_') =>
            {
                let mut name = String::new();
                while let Some((_, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || *next == '_' {
                        name.push(*next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(Token::Param(name));
            }
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Some(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slugs(template: &str, path: &str) -> Option<Vec<(String, String)>> {
        PathTemplate::compile(template)
            .and_then(|t| t.captures(path))
            .map(|s| s.into_vec())
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn braces_become_colons() {
        let t = PathTemplate::compile("/pet/{petId}").unwrap();
        assert_eq!(t.normalized(), "/pet/:petId");
        assert_eq!(slugs("/pet/{petId}", "/pet/1"), Some(vec![pair(":petId", "1")]));
    }

    #[test]
    fn trailing_slash_and_case_are_tolerated() {
        assert!(slugs("/pet/{petId}", "/pet/1/").is_some());
        assert!(slugs("/Pet/findByStatus", "/pet/FINDBYSTATUS").is_some());
        assert!(slugs("/pet/{petId}", "/pet/1/extra").is_none());
    }

    #[test]
    fn malformed_templates() {
        assert!(PathTemplate::compile("/}/v1/endpoint").is_none());
        assert!(PathTemplate::compile("/{unterminated").is_none());
        assert!(PathTemplate::compile("/{}").is_none());

        let t = PathTemplate::compile("/games/{game}/dlc/{dlcrelease}}").unwrap();
        assert_eq!(t.normalized(), "/games/:game/dlc/:dlcrelease");

        let t = PathTemplate::compile("/dlc/{dlc-release}").unwrap();
        assert_eq!(t.normalized(), "/dlc/:dlcrelease");
    }

    #[test]
    fn adjacent_colon_parameters() {
        let t = PathTemplate::compile("/people/{personIdType}:{personId}").unwrap();
        assert_eq!(t.normalized(), "/people/:personIdType::personId");
        assert_eq!(
            t.captures("/people/GWID:3").map(|s| s.into_vec()),
            Some(vec![pair(":personIdType", "GWID"), pair(":personId", "3")])
        );
    }

    #[test]
    fn express_style_parameters() {
        assert_eq!(slugs("/pets/:id", "/pets/:id"), Some(vec![pair(":id", ":id")]));
    }

    #[test]
    fn query_is_pruned_and_hash_is_literal() {
        let t = PathTemplate::compile("/rating_stats?listing_ids[]=1234567").unwrap();
        assert_eq!(t.normalized(), "/rating_stats");
        assert!(slugs("/listings#hash", "/listings#hash").is_some());
        assert!(slugs("/listings", "/listings#hash").is_none());
    }

    #[test]
    fn values_are_decoded_and_duplicates_collapse() {
        assert_eq!(slugs("/files/{name}", "/files/a%20b"), Some(vec![pair(":name", "a b")]));
        assert_eq!(
            slugs("/{id}/child/{id}", "/1/child/1"),
            Some(vec![pair(":id", "1")])
        );
    }

    #[test]
    fn root_template() {
        assert_eq!(slugs("/", "/"), Some(vec![]));
    }
}
