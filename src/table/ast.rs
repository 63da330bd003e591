/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

//! AST nodes produced by the table-file parser. Kept separate from the
//! parser itself so the evaluator (`eval.rs`) and the `expandtable`
//! diagnostic command can depend on the shape without the parsing code.

/// One `Action(args, ...)` payload line.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    EnvSet { var: String, value: String },
    EnvUnset { var: String },
    EnvPrepend { var: String, value: String, delim: String },
    EnvAppend { var: String, value: String, delim: String },
    EnvRemove { var: String, value: String, delim: String },
    PathPrepend { var: String, value: String },
    PathAppend { var: String, value: String },
    PathRemove { var: String, value: String },
    AddAlias { name: String, value: String },
    SetupRequired { spec: String },
    SetupOptional { spec: String },
    /// Deprecated/absorbed `proddir`/`setupenv` directives: always
    /// interpreted as "set `<PRODUCT>_DIR` and `SETUP_<PRODUCT>`".
    Deprecated { directive: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A term in an `if (...)` conditional: either a bare token (a variable
/// name, `FLAVOR`, `BUILD`, or a literal) that gets substituted before
/// comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Token(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare(Term, CmpOp, Term),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Paren(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Action(Action),
    If(Expr, Vec<Stmt>),
}

/// One applicability section: a list of flavor names this section's body
/// applies to (possibly including the `ANY`/`NULL` wildcards), and the
/// ordered statements that make up its body. Both the Grouped
/// (`Group:`/`Common:`/`End:`) and Flat (`Flavor = x` until the next
/// `Flavor =`) source syntaxes are parsed down into this one shape; the
/// evaluator only ever sees `FlavorSection`s.
#[derive(Debug, Clone, PartialEq)]
pub struct FlavorSection {
    pub flavors: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableAst {
    pub sections: Vec<FlavorSection>,
}

pub const WILDCARD_FLAVORS: &[&str] = &["ANY", "NULL"];

impl FlavorSection {
    pub fn applies_to(&self, flavor: &str) -> bool {
        self.flavors
            .iter()
            .any(|f| f == flavor || WILDCARD_FLAVORS.contains(&f.as_str()))
    }
}
