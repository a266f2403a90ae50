//! Minimal reader for parenthesised fragments such as `(at player room1)`.

use std::fmt;

use crate::WorldError;

/// A parsed fragment: either a bare symbol or a list of fragments.
#[derive(Debug, Clone, PartialEq)]
pub enum SExpr {
    Atom(String),
    List(Vec<SExpr>),
}

impl SExpr {
    /// Symbol text, if this is an atom.
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExpr::Atom(symbol) => Some(symbol),
            SExpr::List(_) => None,
        }
    }

    /// Child expressions, if this is a list.
    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(items) => Some(items),
            SExpr::Atom(_) => None,
        }
    }

    /// Head symbol of a list, e.g. `and` for `(and ...)`.
    pub fn head(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(SExpr::as_atom)
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExpr::Atom(symbol) => write!(f, "{symbol}"),
            SExpr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Open(usize),
    Close(usize),
    Symbol(String),
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_comment = false;

    for (offset, ch) in text.char_indices() {
        if in_comment {
            in_comment = ch != '\n';
            continue;
        }
        match ch {
            '(' | ')' | ';' => {
                if !current.is_empty() {
                    tokens.push(Token::Symbol(std::mem::take(&mut current)));
                }
                match ch {
                    '(' => tokens.push(Token::Open(offset)),
                    ')' => tokens.push(Token::Close(offset)),
                    _ => in_comment = true,
                }
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(Token::Symbol(std::mem::take(&mut current)));
                }
            }
            c => current.push(c.to_ascii_lowercase()),
        }
    }
    if !current.is_empty() {
        tokens.push(Token::Symbol(current));
    }
    tokens
}

/// Parse every top-level expression in `text`.
pub fn parse_all(text: &str) -> Result<Vec<SExpr>, WorldError> {
    let mut stack: Vec<(usize, Vec<SExpr>)> = Vec::new();
    let mut top = Vec::new();

    for token in tokenize(text) {
        match token {
            Token::Open(offset) => stack.push((offset, Vec::new())),
            Token::Close(offset) => {
                let (_, items) = stack.pop().ok_or_else(|| WorldError::Parse {
                    offset,
                    message: "unbalanced `)`".to_string(),
                })?;
                let list = SExpr::List(items);
                match stack.last_mut() {
                    Some((_, parent)) => parent.push(list),
                    None => top.push(list),
                }
            }
            Token::Symbol(symbol) => match stack.last_mut() {
                Some((_, parent)) => parent.push(SExpr::Atom(symbol)),
                None => top.push(SExpr::Atom(symbol)),
            },
        }
    }

    if let Some((offset, _)) = stack.pop() {
        return Err(WorldError::Parse {
            offset,
            message: "unclosed `(`".to_string(),
        });
    }
    Ok(top)
}

/// Parse exactly one expression.
pub fn parse_one(text: &str) -> Result<SExpr, WorldError> {
    let mut exprs = parse_all(text)?;
    match exprs.len() {
        1 => Ok(exprs.remove(0)),
        0 => Err(WorldError::Parse {
            offset: 0,
            message: "empty fragment".to_string(),
        }),
        n => Err(WorldError::Parse {
            offset: 0,
            message: format!("expected one expression, found {n}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let expr = parse_one("(and (at Player Room1) (not (locked door)))").unwrap();
        assert_eq!(expr.head(), Some("and"));
        assert_eq!(expr.as_list().unwrap().len(), 3);
        assert_eq!(expr.to_string(), "(and (at player room1) (not (locked door)))");
    }

    #[test]
    fn test_comments_are_skipped() {
        let exprs = parse_all("; header\n(a b) ; trailing\n(c)").unwrap();
        assert_eq!(exprs.len(), 2);
    }

    #[test]
    fn test_unbalanced() {
        assert!(matches!(parse_one("(a (b)"), Err(WorldError::Parse { .. })));
        assert!(matches!(parse_one("a)"), Err(WorldError::Parse { .. })));
        assert!(parse_one("   ").is_err());
    }
}
