/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

/*!
  Table-file parser and evaluator (C2). A table file is read once into a
  `Table` (a path plus its parsed `TableAst`); the same `Table` can then
  be evaluated for as many `(flavor, build_type, vars)` combinations as a
  caller needs without re-lexing the source, which matters for
  `expandtable` walking every known flavor against one file.
*/

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub use ast::{Action, TableAst};
pub use eval::EvalContext;

use crate::error::EupsResult;

#[derive(Debug, Clone)]
pub struct Table {
    pub path: PathBuf,
    pub ast: TableAst,
}

impl Table {
    pub fn from_file(path: impl AsRef<Path>) -> EupsResult<Table> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        Table::from_str(path, &contents)
    }

    pub fn from_str(path: impl AsRef<Path>, contents: &str) -> EupsResult<Table> {
        let path = path.as_ref().to_path_buf();
        let ast = parser::parse(&path.display().to_string(), contents)?;
        Ok(Table { path, ast })
    }

    pub fn evaluate(
        &self,
        flavor: &str,
        build_type: Option<&str>,
        vars: &HashMap<String, String>,
        env: &HashMap<String, String>,
    ) -> Vec<Action> {
        let ctx = EvalContext {
            flavor,
            build_type,
            vars,
            env,
        };
        eval::evaluate(&self.ast, &ctx)
    }

    /// True if some section of this table applies to `flavor`, regardless
    /// of whether its body contributes any actions once evaluated. Used to
    /// distinguish `NO_MATCHING_FLAVOR` (no section at all) from "matched
    /// but produced nothing".
    pub fn has_flavor(&self, flavor: &str) -> bool {
        self.ast.sections.iter().any(|s| s.applies_to(flavor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_simple_table() {
        let src = "Flavor = ANY\n  setupRequired(\"cfitsio >= 3.370\")\n  envPrepend(LD_LIBRARY_PATH, ${PRODUCT_DIR}/lib)\n";
        let table = Table::from_str("cfitsio.table", src).unwrap();
        assert!(table.has_flavor("Linux64"));
        let mut vars = HashMap::new();
        vars.insert("PRODUCT_DIR".to_string(), "/opt/cfitsio".to_string());
        let env = HashMap::new();
        let actions = table.evaluate("Linux64", None, &vars, &env);
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn missing_flavor_reports_no_section() {
        let src = "Flavor = Darwin64\n  envSet(FOO, bar)\n";
        let table = Table::from_str("t.table", src).unwrap();
        assert!(!table.has_flavor("Linux64"));
    }
}
