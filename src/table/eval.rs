/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

//! Evaluates a parsed `TableAst` against a flavor/build and a substitution
//! bag, producing the ordered list of `Action`s the first matching
//! `FlavorSection` contributes. `${VAR}` is substituted from the bag, then
//! from the process environment, defaulting to empty; `$?{VAR}` drops the
//! whole action silently when `VAR` is undefined in both.

use std::collections::HashMap;

use super::ast::{Action, CmpOp, Expr, Stmt, TableAst, Term};
use crate::version;

pub struct EvalContext<'a> {
    pub flavor: &'a str,
    pub build_type: Option<&'a str>,
    /// `PRODUCT_NAME`, `PRODUCT_DIR`, `PRODUCT_VERSION`, `PRODUCT_FLAVOR`,
    /// `PRODUCTS`, `UPS_DIR`, `UPS_DB`, and any legacy `UPS_PROD_*`
    /// synonyms the caller wants visible to `${VAR}` substitution.
    pub vars: &'a HashMap<String, String>,
    pub env: &'a HashMap<String, String>,
}

impl<'a> EvalContext<'a> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.vars
            .get(name)
            .or_else(|| self.env.get(name))
            .cloned()
    }
}

/// Walks `s` applying `${VAR}`/`$?{VAR}` substitution. Returns `None` if a
/// `$?{VAR}` names a variable that is undefined anywhere, signaling that
/// the action containing this string must be skipped entirely.
fn substitute(s: &str, ctx: &EvalContext) -> Option<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '$' && chars.get(i + 1) == Some(&'?') && chars.get(i + 2) == Some(&'{') {
            let start = i + 3;
            let end = find_close_brace(&chars, start)?;
            let var: String = chars[start..end].iter().collect();
            match ctx.lookup(&var) {
                Some(val) => out.push_str(&val),
                None => return None,
            }
            i = end + 1;
            continue;
        }
        if chars[i] == '$' && chars.get(i + 1) == Some(&'{') {
            let start = i + 2;
            let end = find_close_brace(&chars, start)?;
            let var: String = chars[start..end].iter().collect();
            out.push_str(&ctx.lookup(&var).unwrap_or_default());
            i = end + 1;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    Some(out)
}

fn find_close_brace(chars: &[char], start: usize) -> Option<usize> {
    (start..chars.len()).find(|&j| chars[j] == '}')
}

fn substitute_action(action: &Action, ctx: &EvalContext) -> Option<Action> {
    Some(match action {
        Action::EnvSet { var, value } => Action::EnvSet {
            var: var.clone(),
            value: substitute(value, ctx)?,
        },
        Action::EnvUnset { var } => Action::EnvUnset { var: var.clone() },
        Action::EnvPrepend { var, value, delim } => Action::EnvPrepend {
            var: var.clone(),
            value: substitute(value, ctx)?,
            delim: delim.clone(),
        },
        Action::EnvAppend { var, value, delim } => Action::EnvAppend {
            var: var.clone(),
            value: substitute(value, ctx)?,
            delim: delim.clone(),
        },
        Action::EnvRemove { var, value, delim } => Action::EnvRemove {
            var: var.clone(),
            value: substitute(value, ctx)?,
            delim: delim.clone(),
        },
        Action::PathPrepend { var, value } => Action::PathPrepend {
            var: var.clone(),
            value: substitute(value, ctx)?,
        },
        Action::PathAppend { var, value } => Action::PathAppend {
            var: var.clone(),
            value: substitute(value, ctx)?,
        },
        Action::PathRemove { var, value } => Action::PathRemove {
            var: var.clone(),
            value: substitute(value, ctx)?,
        },
        Action::AddAlias { name, value } => Action::AddAlias {
            name: name.clone(),
            value: substitute(value, ctx)?,
        },
        Action::SetupRequired { spec } => Action::SetupRequired {
            spec: substitute(spec, ctx)?,
        },
        Action::SetupOptional { spec } => Action::SetupOptional {
            spec: substitute(spec, ctx)?,
        },
        Action::Deprecated { directive } => Action::Deprecated {
            directive: directive.clone(),
        },
    })
}

/// `FLAVOR`/`BUILD` are substituted as the special conditional terminals
/// named in §4.2; anything else is substituted as a `${VAR}` reference if
/// it looks like one, and otherwise taken as a literal.
fn term_value(term: &Term, ctx: &EvalContext) -> String {
    let Term::Token(tok) = term;
    match tok.as_str() {
        "FLAVOR" => ctx.flavor.to_string(),
        "BUILD" => ctx.build_type.unwrap_or("").to_string(),
        _ if tok.contains("${") => substitute(tok, ctx).unwrap_or_default(),
        _ => tok.clone(),
    }
}

fn eval_expr(expr: &Expr, ctx: &EvalContext) -> bool {
    match expr {
        Expr::Compare(left, op, right) => {
            let l = term_value(left, ctx);
            let r = term_value(right, ctx);
            let ord = version::compare(&l, &r);
            match op {
                CmpOp::Eq => l == r,
                CmpOp::Ne => l != r,
                CmpOp::Lt => ord == std::cmp::Ordering::Less,
                CmpOp::Le => ord != std::cmp::Ordering::Greater,
                CmpOp::Gt => ord == std::cmp::Ordering::Greater,
                CmpOp::Ge => ord != std::cmp::Ordering::Less,
            }
        }
        Expr::And(a, b) => eval_expr(a, ctx) && eval_expr(b, ctx),
        Expr::Or(a, b) => eval_expr(a, ctx) || eval_expr(b, ctx),
        Expr::Paren(inner) => eval_expr(inner, ctx),
    }
}

fn eval_stmts(stmts: &[Stmt], ctx: &EvalContext, out: &mut Vec<Action>) {
    for stmt in stmts {
        match stmt {
            Stmt::Action(action) => {
                if let Some(substituted) = substitute_action(action, ctx) {
                    out.push(substituted);
                }
            }
            Stmt::If(expr, body) => {
                if eval_expr(expr, ctx) {
                    eval_stmts(body, ctx, out);
                }
            }
        }
    }
}

/// Finds the first `FlavorSection` applicable to `ctx.flavor` and returns
/// its fully-substituted actions, in file order. Returns an empty list if
/// no section applies -- that is `NO_MATCHING_FLAVOR` territory, but the
/// caller decides that, since whether an empty table is an error depends
/// on why it was loaded (e.g. `expandtable` wants to show it regardless).
pub fn evaluate(ast: &TableAst, ctx: &EvalContext) -> Vec<Action> {
    let mut out = vec![];
    if let Some(section) = ast.sections.iter().find(|s| s.applies_to(ctx.flavor)) {
        eval_stmts(&section.body, ctx, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parser::parse;

    fn ctx<'a>(
        flavor: &'a str,
        vars: &'a HashMap<String, String>,
        env: &'a HashMap<String, String>,
    ) -> EvalContext<'a> {
        EvalContext {
            flavor,
            build_type: None,
            vars,
            env,
        }
    }

    #[test]
    fn substitutes_product_dir() {
        let ast = parse("t", "Flavor = ANY\n  envSet(FOO, ${PRODUCT_DIR}/lib)\n").unwrap();
        let mut vars = HashMap::new();
        vars.insert("PRODUCT_DIR".to_string(), "/opt/foo".to_string());
        let env = HashMap::new();
        let actions = evaluate(&ast, &ctx("Linux64", &vars, &env));
        assert_eq!(
            actions,
            vec![Action::EnvSet {
                var: "FOO".to_string(),
                value: "/opt/foo/lib".to_string(),
            }]
        );
    }

    #[test]
    fn skips_action_on_undefined_optional_var() {
        let ast = parse("t", "Flavor = ANY\n  envSet(FOO, $?{MISSING})\n").unwrap();
        let vars = HashMap::new();
        let env = HashMap::new();
        let actions = evaluate(&ast, &ctx("Linux64", &vars, &env));
        assert!(actions.is_empty());
    }

    #[test]
    fn first_matching_flavor_section_wins() {
        let src = "Flavor = Linux64\n  envSet(A, one)\nFlavor = ANY\n  envSet(A, two)\n";
        let ast = parse("t", src).unwrap();
        let vars = HashMap::new();
        let env = HashMap::new();
        let actions = evaluate(&ast, &ctx("Linux64", &vars, &env));
        assert_eq!(
            actions,
            vec![Action::EnvSet {
                var: "A".to_string(),
                value: "one".to_string(),
            }]
        );
    }

    #[test]
    fn conditional_on_flavor_terminal() {
        let src = "Flavor = ANY\n  if (FLAVOR == Linux64) {\n    envSet(A, yes)\n  }\n";
        let ast = parse("t", src).unwrap();
        let vars = HashMap::new();
        let env = HashMap::new();
        assert_eq!(evaluate(&ast, &ctx("Linux64", &vars, &env)).len(), 1);
        assert_eq!(evaluate(&ast, &ctx("Darwin64", &vars, &env)).len(), 0);
    }
}
