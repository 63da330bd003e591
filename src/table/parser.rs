/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

//! Recursive-descent parser over the token stream from `lexer`, producing
//! the `TableAst` defined in `ast`. Both the Grouped (`Group:`/`Common:`/
//! `End:`) and Flat (`Flavor = x` scoping to the next `Flavor =`) source
//! styles are accepted and folded down into the same `FlavorSection`
//! list, since the evaluator only needs "which sections apply to this
//! flavor, in file order".

use super::ast::*;
use super::lexer::{lex, Token, TokenKind};
use crate::error::EupsError;

struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
    path: String,
}

impl Cursor {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_ident(&self) -> Option<&str> {
        match &self.peek().kind {
            TokenKind::Ident(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn err(&self, message: impl Into<String>) -> EupsError {
        EupsError::TableParseError {
            path: self.path.clone(),
            line: self.peek().line,
            message: message.into(),
        }
    }

    fn expect_symbol(&mut self, sym: &'static str) -> Result<(), EupsError> {
        if self.peek().kind == TokenKind::Symbol(sym) {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected `{}`", sym)))
        }
    }

    fn expect_ident(&mut self, word: &str) -> Result<(), EupsError> {
        if self.peek_ident() == Some(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected `{}`", word)))
        }
    }

    fn is_ident(&self, word: &str) -> bool {
        self.peek_ident() == Some(word)
    }

    fn token_text(tok: &Token) -> String {
        match &tok.kind {
            TokenKind::Ident(s) => s.clone(),
            TokenKind::Str(s) => s.clone(),
            TokenKind::Symbol(s) => s.to_string(),
            TokenKind::Eof => String::new(),
        }
    }
}

pub fn parse(path: &str, source: &str) -> Result<TableAst, EupsError> {
    let tokens = lex(source).map_err(|e| EupsError::TableParseError {
        path: path.to_string(),
        line: e.line,
        message: e.message,
    })?;
    let mut cur = Cursor {
        tokens,
        pos: 0,
        path: path.to_string(),
    };
    let mut sections = vec![];
    while !cur.at_eof() {
        if cur.is_ident("Group") {
            sections.extend(parse_group(&mut cur)?);
        } else if cur.is_ident("Flavor") {
            sections.push(parse_flat_flavor(&mut cur)?);
        } else {
            return Err(cur.err("expected `Group:` or `Flavor =` at top level"));
        }
    }
    Ok(TableAst { sections })
}

fn parse_flavor_list(cur: &mut Cursor) -> Result<Vec<String>, EupsError> {
    let mut flavors = vec![];
    loop {
        cur.expect_ident("Flavor")?;
        cur.expect_symbol("=")?;
        let tok = cur.advance();
        flavors.push(Cursor::token_text(&tok));
        if !cur.is_ident("Flavor") {
            break;
        }
    }
    Ok(flavors)
}

fn parse_group(cur: &mut Cursor) -> Result<Vec<FlavorSection>, EupsError> {
    cur.expect_ident("Group")?;
    cur.expect_symbol(":")?;
    let flavors = parse_flavor_list(cur)?;
    cur.expect_ident("Common")?;
    cur.expect_symbol(":")?;
    let body = parse_stmts(cur, &["End"])?;
    cur.expect_ident("End")?;
    if cur.peek().kind == TokenKind::Symbol(":") {
        cur.advance();
    }
    cur.expect_ident("End")?;
    if cur.peek().kind == TokenKind::Symbol(":") {
        cur.advance();
    }
    Ok(vec![FlavorSection { flavors, body }])
}

fn parse_flat_flavor(cur: &mut Cursor) -> Result<FlavorSection, EupsError> {
    cur.expect_ident("Flavor")?;
    cur.expect_symbol("=")?;
    let tok = cur.advance();
    let flavor = Cursor::token_text(&tok);
    let body = parse_stmts(cur, &["Flavor"])?;
    Ok(FlavorSection {
        flavors: vec![flavor],
        body,
    })
}

fn parse_stmts(cur: &mut Cursor, terminators: &[&str]) -> Result<Vec<Stmt>, EupsError> {
    let mut stmts = vec![];
    loop {
        if cur.at_eof() {
            break;
        }
        if let Some(word) = cur.peek_ident() {
            if terminators.contains(&word) {
                break;
            }
        }
        if cur.peek().kind == TokenKind::Symbol("}") {
            break;
        }
        if cur.is_ident("if") {
            stmts.push(parse_if(cur)?);
        } else {
            stmts.push(Stmt::Action(parse_action(cur)?));
        }
    }
    Ok(stmts)
}

fn parse_if(cur: &mut Cursor) -> Result<Stmt, EupsError> {
    cur.expect_ident("if")?;
    cur.expect_symbol("(")?;
    let expr = parse_expr(cur)?;
    cur.expect_symbol(")")?;
    cur.expect_symbol("{")?;
    let body = parse_stmts(cur, &[])?;
    cur.expect_symbol("}")?;
    Ok(Stmt::If(expr, body))
}

fn parse_expr(cur: &mut Cursor) -> Result<Expr, EupsError> {
    let mut left = parse_and(cur)?;
    while cur.peek().kind == TokenKind::Symbol("||") {
        cur.advance();
        let right = parse_and(cur)?;
        left = Expr::Or(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_and(cur: &mut Cursor) -> Result<Expr, EupsError> {
    let mut left = parse_comparison(cur)?;
    while cur.peek().kind == TokenKind::Symbol("&&") {
        cur.advance();
        let right = parse_comparison(cur)?;
        left = Expr::And(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_comparison(cur: &mut Cursor) -> Result<Expr, EupsError> {
    if cur.peek().kind == TokenKind::Symbol("(") {
        cur.advance();
        let inner = parse_expr(cur)?;
        cur.expect_symbol(")")?;
        return Ok(Expr::Paren(Box::new(inner)));
    }
    let left = parse_term(cur)?;
    let op = parse_cmpop(cur)?;
    let right = parse_term(cur)?;
    Ok(Expr::Compare(left, op, right))
}

fn parse_term(cur: &mut Cursor) -> Result<Term, EupsError> {
    let tok = cur.advance();
    match &tok.kind {
        TokenKind::Ident(s) => Ok(Term::Token(s.clone())),
        TokenKind::Str(s) => Ok(Term::Token(s.clone())),
        _ => Err(cur.err("expected a term in conditional expression")),
    }
}

fn parse_cmpop(cur: &mut Cursor) -> Result<CmpOp, EupsError> {
    let tok = cur.advance();
    match tok.kind {
        TokenKind::Symbol("==") => Ok(CmpOp::Eq),
        TokenKind::Symbol("!=") => Ok(CmpOp::Ne),
        TokenKind::Symbol("<=") => Ok(CmpOp::Le),
        TokenKind::Symbol(">=") => Ok(CmpOp::Ge),
        TokenKind::Symbol("<") => Ok(CmpOp::Lt),
        TokenKind::Symbol(">") => Ok(CmpOp::Gt),
        _ => Err(cur.err("expected a comparison operator")),
    }
}

/// Parses one `Name(arg, arg, ...)` payload line. `setupRequired`/
/// `setupOptional`'s single logical argument is reconstructed by joining
/// every token up to the closing paren with a single space, since its
/// contents are a whole `<product> [version-expr] [opts]` spec that may
/// or may not have been wrapped in quotes by the table file's author.
fn parse_action(cur: &mut Cursor) -> Result<Action, EupsError> {
    let name_tok = cur.advance();
    let name = match &name_tok.kind {
        TokenKind::Ident(s) => s.clone(),
        _ => return Err(cur.err("expected an action name")),
    };
    cur.expect_symbol("(")?;
    let args = parse_args(cur)?;
    cur.expect_symbol(")")?;

    build_action(cur, &name, args)
}

fn parse_args(cur: &mut Cursor) -> Result<Vec<String>, EupsError> {
    let mut args = vec![];
    if cur.peek().kind == TokenKind::Symbol(")") {
        return Ok(args);
    }
    loop {
        let mut piece = String::new();
        loop {
            match &cur.peek().kind {
                TokenKind::Symbol(",") | TokenKind::Symbol(")") => break,
                _ => {
                    let tok = cur.advance();
                    if !piece.is_empty() {
                        piece.push(' ');
                    }
                    piece.push_str(&Cursor::token_text(&tok));
                }
            }
        }
        args.push(piece);
        if cur.peek().kind == TokenKind::Symbol(",") {
            cur.advance();
            continue;
        }
        break;
    }
    Ok(args)
}

fn build_action(cur: &Cursor, name: &str, mut args: Vec<String>) -> Result<Action, EupsError> {
    let missing = || EupsError::TableParseError {
        path: cur.path.clone(),
        line: cur.peek().line,
        message: format!("`{}` missing required argument", name),
    };
    Ok(match name {
        "envSet" => Action::EnvSet {
            var: args.remove(0),
            value: args.into_iter().next().ok_or_else(missing)?,
        },
        "envUnset" => Action::EnvUnset {
            var: args.into_iter().next().ok_or_else(missing)?,
        },
        "envPrepend" | "envAppend" | "envRemove" => {
            let var = args.remove(0);
            let value = args.remove(0);
            let delim = args.into_iter().next().unwrap_or_else(|| ":".to_string());
            match name {
                "envPrepend" => Action::EnvPrepend { var, value, delim },
                "envAppend" => Action::EnvAppend { var, value, delim },
                _ => Action::EnvRemove { var, value, delim },
            }
        }
        "pathPrepend" => Action::PathPrepend {
            var: args.remove(0),
            value: args.into_iter().next().ok_or_else(missing)?,
        },
        "pathAppend" => Action::PathAppend {
            var: args.remove(0),
            value: args.into_iter().next().ok_or_else(missing)?,
        },
        "pathRemove" => Action::PathRemove {
            var: args.remove(0),
            value: args.into_iter().next().ok_or_else(missing)?,
        },
        "addAlias" => Action::AddAlias {
            name: args.remove(0),
            value: args.into_iter().next().ok_or_else(missing)?,
        },
        "setupRequired" => Action::SetupRequired {
            spec: args.into_iter().next().ok_or_else(missing)?,
        },
        "setupOptional" => Action::SetupOptional {
            spec: args.into_iter().next().ok_or_else(missing)?,
        },
        "proddir" | "setupenv" => Action::Deprecated {
            directive: name.to_string(),
        },
        other => {
            return Err(EupsError::TableParseError {
                path: cur.path.clone(),
                line: cur.peek().line,
                message: format!("unknown action `{}`", other),
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_style() {
        let src = "Flavor = Linux64\n  envSet(FOO, bar)\n  setupRequired(\"baz >= 1.0\")\n";
        let ast = parse("test.table", src).unwrap();
        assert_eq!(ast.sections.len(), 1);
        assert_eq!(ast.sections[0].flavors, vec!["Linux64"]);
        assert_eq!(ast.sections[0].body.len(), 2);
    }

    #[test]
    fn parses_grouped_style() {
        let src = "Group:\n  Flavor = Linux64\n  Flavor = ANY\n  Common:\n    envSet(FOO, bar)\n  End:\nEnd:\n";
        let ast = parse("test.table", src).unwrap();
        assert_eq!(ast.sections.len(), 1);
        assert_eq!(ast.sections[0].flavors, vec!["Linux64", "ANY"]);
    }

    #[test]
    fn parses_if_block() {
        let src = "Flavor = ANY\n  if (FLAVOR == Linux64) {\n    envSet(FOO, bar)\n  }\n";
        let ast = parse("test.table", src).unwrap();
        match &ast.sections[0].body[0] {
            Stmt::If(Expr::Compare(Term::Token(a), CmpOp::Eq, Term::Token(b)), body) => {
                assert_eq!(a, "FLAVOR");
                assert_eq!(b, "Linux64");
                assert_eq!(body.len(), 1);
            }
            other => panic!("unexpected stmt: {:?}", other),
        }
    }
}
