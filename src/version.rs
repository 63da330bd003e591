/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

/*!
  Version algebra (C1): decomposing version strings into comparable parts
  and evaluating version expressions against a candidate version.

  This replaces the regex-substitution approach a legacy implementation
  would use with one canonical `decompose` and a single recursive
  comparator, per the redesign notes: version comparison should not be
  spread across ad-hoc string surgery.
*/

use std::cmp::Ordering;

/// Splits `version` into its `VVV[-EEE][+FFF]` parts on the first
/// unescaped `-` and `+`. A backslash escapes the following character so
/// that product versions containing a literal `-`/`+` can still be
/// expressed.
pub fn decompose(version: &str) -> (String, Option<String>, Option<String>) {
    let mut base = String::new();
    let mut epoch: Option<String> = None;
    let mut build: Option<String> = None;
    let mut current = &mut base;
    let mut chars = version.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                current.push(next);
            }
            continue;
        }
        if epoch.is_none() && build.is_none() && c == '-' {
            epoch = Some(String::new());
            current = epoch.as_mut().unwrap();
            continue;
        }
        if build.is_none() && c == '+' {
            build = Some(String::new());
            current = build.as_mut().unwrap();
            continue;
        }
        current.push(c);
    }
    (base, epoch, build)
}

fn split_components(s: &str) -> Vec<&str> {
    if s.is_empty() {
        return vec![];
    }
    s.split(|c| c == '.' || c == '_').collect()
}

/// Splits a leading run of non-digit characters off the front of a string,
/// e.g. `"v12"` -> `("v", "12")`.
fn split_leading_prefix(s: &str) -> (&str, &str) {
    let idx = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(idx)
}

fn compare_component(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Compares the `VVV` portion of two decomposed versions: component-wise
/// on `[._]`-separated parts, numeric comparison when both components
/// parse as integers, otherwise lexicographic. A leading alphabetic prefix
/// on the very first component must agree between both sides; a
/// mismatched prefix always sorts the side that carries it low. A version
/// that runs out of components before the other sorts low (shorter
/// common-prefix version sorts low).
fn compare_base(a: &str, b: &str) -> Ordering {
    let a_parts = split_components(a);
    let b_parts = split_components(b);

    if let (Some(&first_a), Some(&first_b)) = (a_parts.first(), b_parts.first()) {
        let (prefix_a, rest_a) = split_leading_prefix(first_a);
        let (prefix_b, rest_b) = split_leading_prefix(first_b);
        if prefix_a != prefix_b {
            return if !prefix_a.is_empty() {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
        let ord = compare_component(rest_a, rest_b);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    let len = a_parts.len().max(b_parts.len());
    for i in 1..len {
        match (a_parts.get(i), b_parts.get(i)) {
            (Some(x), Some(y)) => {
                let ord = compare_component(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => break,
        }
    }
    Ordering::Equal
}

/// Compares two version strings per §4.1: base comparison first, then the
/// epoch suffix (absence sorts high, i.e. `1.0-rc1 < 1.0`), then the build
/// suffix (absence sorts low, i.e. `1.0 < 1.0+patch1`), each suffix
/// recursing back into the same algorithm.
pub fn compare(a: &str, b: &str) -> Ordering {
    let (base_a, epoch_a, build_a) = decompose(a);
    let (base_b, epoch_b, build_b) = decompose(b);

    let base_ord = compare_base(&base_a, &base_b);
    if base_ord != Ordering::Equal {
        return base_ord;
    }

    let epoch_ord = match (&epoch_a, &epoch_b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => compare(x, y),
    };
    if epoch_ord != Ordering::Equal {
        return epoch_ord;
    }

    match (&build_a, &build_b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare(x, y),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Relation {
    fn matches(self, ord: Ordering) -> bool {
        match self {
            Relation::Eq => ord == Ordering::Equal,
            Relation::Ne => ord != Ordering::Equal,
            Relation::Lt => ord == Ordering::Less,
            Relation::Le => ord != Ordering::Greater,
            Relation::Gt => ord == Ordering::Greater,
            Relation::Ge => ord != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Primary {
    pub relation: Relation,
    pub version: String,
}

/// A `||`-separated list of primary relations, as used both in `setup`
/// requests and inside table-file conditionals. An empty expression
/// (no primaries) signals "resolve via tag" to the resolver rather than
/// "match nothing" -- callers must check `is_empty` before calling
/// `matches`.
#[derive(Debug, Clone)]
pub struct VersionExpr {
    pub primaries: Vec<Primary>,
}

const OPERATORS: &[(&str, Relation)] = &[
    ("==", Relation::Eq),
    ("!=", Relation::Ne),
    ("<=", Relation::Le),
    (">=", Relation::Ge),
    ("<", Relation::Lt),
    (">", Relation::Gt),
];

impl VersionExpr {
    pub fn parse(input: &str) -> VersionExpr {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return VersionExpr { primaries: vec![] };
        }
        let primaries = trimmed
            .split("||")
            .map(|clause| {
                let clause = clause.trim();
                for (op, relation) in OPERATORS {
                    if let Some(rest) = clause.strip_prefix(op) {
                        return Primary {
                            relation: *relation,
                            version: rest.trim().to_string(),
                        };
                    }
                }
                Primary {
                    relation: Relation::Eq,
                    version: clause.to_string(),
                }
            })
            .collect();
        VersionExpr { primaries }
    }

    pub fn is_empty(&self) -> bool {
        self.primaries.is_empty()
    }

    /// True if this expression names exactly one `==` primary, i.e. it is
    /// a bare version string rather than a relational range. The resolver
    /// uses this to decide between an exact-lookup and a
    /// highest-match-passing-the-expression search.
    pub fn as_bare_version(&self) -> Option<&str> {
        match self.primaries.as_slice() {
            [Primary {
                relation: Relation::Eq,
                version,
            }] => Some(version.as_str()),
            _ => None,
        }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.primaries
            .iter()
            .any(|p| p.relation.matches(compare(candidate, &p.version)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_numeric_ordering() {
        assert_eq!(compare("1.2.3", "1.2.4"), Ordering::Less);
        assert_eq!(compare("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare("1.2", "1.2"), Ordering::Equal);
    }

    #[test]
    fn epoch_sorts_left_of_absence() {
        assert_eq!(compare("1.0-rc1", "1.0"), Ordering::Less);
    }

    #[test]
    fn build_sorts_right_of_absence() {
        assert_eq!(compare("1.0", "1.0+patch1"), Ordering::Less);
    }

    #[test]
    fn antisymmetry_and_transitivity() {
        let versions = ["1.0", "1.0-rc1", "1.0+patch1", "2.0", "1.10", "1.9"];
        for a in versions.iter() {
            for b in versions.iter() {
                assert_eq!(compare(a, b), compare(b, a).reverse());
            }
        }
    }

    #[test]
    fn cfitsio_scenario() {
        // §8 scenario 1
        let versions = ["3.370", "3.450", "3.450+hack1"];
        let highest = versions.iter().max_by(|a, b| compare(a, b)).unwrap();
        assert_eq!(*highest, "3.450+hack1");

        let expr = VersionExpr::parse(">= 3.450");
        let passing: Vec<&&str> = versions.iter().filter(|v| expr.matches(v)).collect();
        let best = passing.iter().max_by(|a, b| compare(a, b)).unwrap();
        assert_eq!(***best, "3.450+hack1");
    }

    #[test]
    fn daf_base_scenario() {
        // §8 scenario 2
        let expr_lo = VersionExpr::parse(">= 11.0");
        let expr_hi = VersionExpr::parse("<= 12.0");
        let versions = ["11.1", "12.1"];
        let passing: Vec<&&str> = versions
            .iter()
            .filter(|v| expr_lo.matches(v) && expr_hi.matches(v))
            .collect();
        assert_eq!(passing, vec![&"11.1"]);
    }

    #[test]
    fn bare_version_is_eq() {
        let expr = VersionExpr::parse("3.450");
        assert!(expr.matches("3.450"));
        assert!(!expr.matches("3.451"));
        assert_eq!(expr.as_bare_version(), Some("3.450"));
    }

    #[test]
    fn or_expression() {
        let expr = VersionExpr::parse("1.0 || 2.0");
        assert!(expr.matches("1.0"));
        assert!(expr.matches("2.0"));
        assert!(!expr.matches("1.5"));
    }
}
