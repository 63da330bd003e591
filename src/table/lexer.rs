/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

//! Hand-written lexer for table files. Produces a flat token stream with
//! a line number attached to every token, which is what lets
//! `TABLE_PARSE_ERROR` reference a useful line. `#` begins a comment that
//! runs to end of line; it is stripped before tokenizing.

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Symbol(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

pub struct LexError {
    pub line: usize,
    pub message: String,
}

fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for line in input.lines() {
        let mut in_quote = false;
        let mut end = line.len();
        for (i, c) in line.char_indices() {
            if c == '"' {
                in_quote = !in_quote;
            }
            if c == '#' && !in_quote {
                end = i;
                break;
            }
        }
        out.push_str(&line[..end]);
        out.push('\n');
    }
    out
}

const TWO_CHAR_SYMBOLS: &[&str] = &["==", "!=", "<=", ">=", "&&", "||"];
const ONE_CHAR_SYMBOLS: &[char] = &['(', ')', '{', '}', ',', '=', '<', '>', ':'];

pub fn lex(input: &str) -> Result<Vec<Token>, LexError> {
    let stripped = strip_comments(input);
    let mut tokens = vec![];
    let mut line = 1usize;
    let chars: Vec<char> = stripped.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '"' {
            let mut value = String::new();
            i += 1;
            while i < chars.len() && chars[i] != '"' {
                if chars[i] == '\n' {
                    line += 1;
                }
                value.push(chars[i]);
                i += 1;
            }
            if i >= chars.len() {
                return Err(LexError {
                    line,
                    message: "unterminated string literal".to_string(),
                });
            }
            i += 1; // closing quote
            tokens.push(Token {
                kind: TokenKind::Str(value),
                line,
            });
            continue;
        }
        if i + 1 < chars.len() {
            let two: String = chars[i..i + 2].iter().collect();
            if TWO_CHAR_SYMBOLS.contains(&two.as_str()) {
                let leaked: &'static str = TWO_CHAR_SYMBOLS
                    .iter()
                    .find(|s| **s == two)
                    .copied()
                    .unwrap();
                tokens.push(Token {
                    kind: TokenKind::Symbol(leaked),
                    line,
                });
                i += 2;
                continue;
            }
        }
        if ONE_CHAR_SYMBOLS.contains(&c) {
            let leaked: &'static str = ONE_CHAR_SYMBOLS
                .iter()
                .position(|s| *s == c)
                .map(|idx| match idx {
                    0 => "(",
                    1 => ")",
                    2 => "{",
                    3 => "}",
                    4 => ",",
                    5 => "=",
                    6 => "<",
                    7 => ">",
                    8 => ":",
                    _ => unreachable!(),
                })
                .unwrap();
            tokens.push(Token {
                kind: TokenKind::Symbol(leaked),
                line,
            });
            i += 1;
            continue;
        }
        // Bare identifier/value token: runs until whitespace or a
        // recognized symbol/comment boundary. `${VAR}`/`$?{VAR}` is kept
        // atomic within this run -- `{`/`}` are one-char symbols
        // elsewhere, but splitting a `$`-brace reference across several
        // tokens would make `parse_args` reassemble it with spurious
        // spaces (e.g. `${PRODUCT_DIR}/lib` must stay one token, not
        // `$ { PRODUCT_DIR } /lib`), and `eval::substitute` expects the
        // literal `${`/`$?{` text intact.
        let start = i;
        while i < chars.len() {
            let cc = chars[i];
            if cc == '$' && chars.get(i + 1) == Some(&'{') {
                i += 2;
                while i < chars.len() && chars[i] != '}' {
                    i += 1;
                }
                if i < chars.len() {
                    i += 1; // closing brace
                }
                continue;
            }
            if cc == '$' && chars.get(i + 1) == Some(&'?') && chars.get(i + 2) == Some(&'{') {
                i += 3;
                while i < chars.len() && chars[i] != '}' {
                    i += 1;
                }
                if i < chars.len() {
                    i += 1;
                }
                continue;
            }
            if cc.is_whitespace() || cc == '"' || ONE_CHAR_SYMBOLS.contains(&cc) {
                break;
            }
            if i + 1 < chars.len() {
                let two: String = chars[i..i + 2].iter().collect();
                if TWO_CHAR_SYMBOLS.contains(&two.as_str()) {
                    break;
                }
            }
            i += 1;
        }
        let ident: String = chars[start..i].iter().collect();
        tokens.push(Token {
            kind: TokenKind::Ident(ident),
            line,
        });
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_action_line() {
        let toks = lex("envSet(FOO, bar)\n").unwrap();
        let kinds: Vec<&TokenKind> = toks.iter().map(|t| &t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                &TokenKind::Ident("envSet".to_string()),
                &TokenKind::Symbol("("),
                &TokenKind::Ident("FOO".to_string()),
                &TokenKind::Symbol(","),
                &TokenKind::Ident("bar".to_string()),
                &TokenKind::Symbol(")"),
                &TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn strips_comments_outside_quotes() {
        let toks = lex("envSet(FOO, \"a#b\") # trailing comment\n").unwrap();
        assert!(toks
            .iter()
            .any(|t| t.kind == TokenKind::Str("a#b".to_string())));
    }

    #[test]
    fn dollar_brace_reference_stays_one_token() {
        let toks = lex("envPrepend(PATH, ${PRODUCT_DIR}/lib)\n").unwrap();
        let kinds: Vec<&TokenKind> = toks.iter().map(|t| &t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                &TokenKind::Ident("envPrepend".to_string()),
                &TokenKind::Symbol("("),
                &TokenKind::Ident("PATH".to_string()),
                &TokenKind::Symbol(","),
                &TokenKind::Ident("${PRODUCT_DIR}/lib".to_string()),
                &TokenKind::Symbol(")"),
                &TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn optional_dollar_brace_reference_stays_one_token() {
        let toks = lex("envSet(FOO, $?{MISSING})\n").unwrap();
        assert!(toks
            .iter()
            .any(|t| t.kind == TokenKind::Ident("$?{MISSING}".to_string())));
    }
}
