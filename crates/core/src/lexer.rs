//! Tokenizer for the type syntax accepted in goal descriptions
//! (`HashMap<K, Vec<V>>`, `(A, B)`, `std::rc::Rc<T>`).

use crate::error::StructuralError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier segment of a path or a type variable name
    Word(String),
    Lt,
    Gt,
    Comma,
    LParen,
    RParen,
    /// `::`
    PathSep,
    Eof,
}

pub fn lex(src: &str) -> Result<Vec<Token>, StructuralError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push(Token::Word(chars[start..pos].iter().collect()));
            continue;
        }

        if c == ':' {
            if pos + 1 < chars.len() && chars[pos + 1] == ':' {
                tokens.push(Token::PathSep);
                pos += 2;
                continue;
            }
            return Err(invalid(src, "single ':' is not valid in a type"));
        }

        let token = match c {
            '<' => Token::Lt,
            '>' => Token::Gt,
            ',' => Token::Comma,
            '(' => Token::LParen,
            ')' => Token::RParen,
            other => {
                return Err(invalid(src, format!("unexpected character '{}'", other)));
            }
        };
        tokens.push(token);
        pos += 1;
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

pub(crate) fn invalid(src: &str, reason: impl Into<String>) -> StructuralError {
    StructuralError::InvalidType {
        text: src.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_generic_path() {
        let tokens = lex("std::vec::Vec<T>").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Word("std".into()),
                Token::PathSep,
                Token::Word("vec".into()),
                Token::PathSep,
                Token::Word("Vec".into()),
                Token::Lt,
                Token::Word("T".into()),
                Token::Gt,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_nested_closing_brackets_are_separate() {
        let tokens = lex("Vec<Vec<u8>>").unwrap();
        let gts = tokens.iter().filter(|t| **t == Token::Gt).count();
        assert_eq!(gts, 2);
    }

    #[test]
    fn test_lex_rejects_references() {
        let err = lex("&str").unwrap_err();
        assert!(matches!(err, StructuralError::InvalidType { .. }));
    }

    #[test]
    fn test_lex_rejects_single_colon() {
        assert!(lex("a:b").is_err());
    }
}
