/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

//! Parser for the sectioned `<product>/<version>.version` and
//! `<product>/<tag>.chain` files: a sequence of `FLAVOR = <name>` headers,
//! each followed by `KEY = VALUE` lines until the next header or EOF.
//! Keys are case-insensitive; `#` begins a comment to end of line.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::EupsResult;

#[derive(Debug, Clone, Default)]
pub struct Section {
    pub flavor: String,
    pub fields: HashMap<String, String>,
}

impl Section {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(&key.to_ascii_lowercase()).map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DbFile {
    pub sections: Vec<Section>,
}

fn strip_comment(line: &str) -> &str {
    let mut in_quote = false;
    for (i, c) in line.char_indices() {
        if c == '"' {
            in_quote = !in_quote;
        }
        if c == '#' && !in_quote {
            return &line[..i];
        }
    }
    line
}

impl DbFile {
    pub fn parse(contents: &str) -> DbFile {
        let mut sections: Vec<Section> = vec![];
        for raw_line in contents.lines() {
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = match line.find('=') {
                Some(idx) => (line[..idx].trim(), line[idx + 1..].trim()),
                None => continue,
            };
            let value = value.trim_matches('"');
            if key.eq_ignore_ascii_case("FLAVOR") {
                sections.push(Section {
                    flavor: value.to_string(),
                    fields: HashMap::new(),
                });
                continue;
            }
            if let Some(section) = sections.last_mut() {
                section
                    .fields
                    .insert(key.to_ascii_lowercase(), value.to_string());
            }
        }
        DbFile { sections }
    }

    pub fn load(path: impl AsRef<Path>) -> EupsResult<DbFile> {
        let contents = fs::read_to_string(path)?;
        Ok(DbFile::parse(&contents))
    }

    /// The first section whose `FLAVOR` matches exactly, falling back to
    /// an `ANY`/`NULL` wildcard section, mirroring the table file's
    /// first-match-wins rule.
    pub fn section_for(&self, flavor: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.flavor == flavor)
            .or_else(|| {
                self.sections
                    .iter()
                    .find(|s| s.flavor == "ANY" || s.flavor == "NULL")
            })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            out.push_str(&format!("FLAVOR = {}\n", section.flavor));
            let mut keys: Vec<&String> = section.fields.keys().collect();
            keys.sort();
            for key in keys {
                out.push_str(&format!(
                    "{} = \"{}\"\n",
                    key.to_uppercase(),
                    section.fields[key]
                ));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_section() {
        let src = "FLAVOR = Linux64\nPROD_DIR = /opt/foo\nUPS_DIR = ups\n# a comment\nTABLE_FILE = foo.table\n";
        let db = DbFile::parse(src);
        assert_eq!(db.sections.len(), 1);
        let section = db.section_for("Linux64").unwrap();
        assert_eq!(section.get("prod_dir"), Some("/opt/foo"));
        assert_eq!(section.get("TABLE_FILE"), Some("foo.table"));
    }

    #[test]
    fn falls_back_to_any() {
        let src = "FLAVOR = ANY\nPROD_DIR = /opt/foo\n";
        let db = DbFile::parse(src);
        assert!(db.section_for("Darwin64").is_some());
    }

    #[test]
    fn round_trips_through_render() {
        let src = "FLAVOR = Linux64\nPROD_DIR = /opt/foo\n";
        let db = DbFile::parse(src);
        let rendered = db.render();
        let reparsed = DbFile::parse(&rendered);
        assert_eq!(
            reparsed.section_for("Linux64").unwrap().get("prod_dir"),
            Some("/opt/foo")
        );
    }
}
