/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

/*!
  Session / `SETUP_*` state (C6). Per §9's redesign notes, the wire
  format of `SETUP_<PRODUCT>` is kept byte-for-byte as specified in §6 --
  it is the ABI a calling shell session relies on across separate `eups`
  invocations -- but internally it is parsed into a typed
  `SessionMarker` rather than split ad hoc with `value.split(" ")`, the
  way the teacher's `list.rs::find_setup_products` did it.
*/

use crate::error::{EupsError, EupsResult};

pub const LOCAL_PREFIX: &str = "LOCAL:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMarker {
    pub product: String,
    pub version: String,
    pub flavor: String,
    pub stack_root: String,
    pub tag: Option<String>,
}

impl SessionMarker {
    pub fn env_var_name(product: &str) -> String {
        format!("SETUP_{}", product.to_ascii_uppercase())
    }

    pub fn product_dir_var_name(product: &str) -> String {
        format!("{}_DIR", product.to_ascii_uppercase())
    }

    /// True if this marker's version encodes a `setup -r <dir>` local
    /// setup rather than a database-declared version (§4.6, §9 Open
    /// Question: local setups are environment-only, never written to the
    /// database).
    pub fn is_local(&self) -> bool {
        self.version.starts_with(LOCAL_PREFIX)
    }

    pub fn local_dir(&self) -> Option<&str> {
        self.version.strip_prefix(LOCAL_PREFIX)
    }

    /// Formats the `SETUP_<PRODUCT>` value: `"<product> <version> -f
    /// <flavor> -Z <stack-root> [-t <tag>]"`.
    pub fn encode(&self) -> String {
        let mut out = format!(
            "{} {} -f {} -Z {}",
            self.product, self.version, self.flavor, self.stack_root
        );
        if let Some(tag) = &self.tag {
            out.push_str(" -t ");
            out.push_str(tag);
        }
        out
    }

    /// Parses a `SETUP_<PRODUCT>` value back into a marker. `product` is
    /// passed in rather than re-derived, since the env var name only
    /// carries the upper-cased form.
    pub fn decode(product: &str, value: &str) -> EupsResult<SessionMarker> {
        let mut tokens = value.split_whitespace();
        let parsed_product = tokens.next().ok_or_else(|| malformed(product, value))?;
        let version = tokens.next().ok_or_else(|| malformed(product, value))?;
        let mut flavor = None;
        let mut stack_root = None;
        let mut tag = None;
        while let Some(tok) = tokens.next() {
            match tok {
                "-f" => flavor = tokens.next(),
                "-Z" => stack_root = tokens.next(),
                "-t" => tag = tokens.next(),
                _ => {}
            }
        }
        Ok(SessionMarker {
            product: parsed_product.to_string(),
            version: version.to_string(),
            flavor: flavor.ok_or_else(|| malformed(product, value))?.to_string(),
            stack_root: stack_root
                .ok_or_else(|| malformed(product, value))?
                .to_string(),
            tag: tag.map(|s| s.to_string()),
        })
    }
}

fn malformed(product: &str, value: &str) -> EupsError {
    EupsError::StateMismatch {
        product: product.to_string(),
        message: format!("could not parse SETUP_{} value `{}`", product, value),
    }
}

/// Scans `vars` for every `SETUP_<PRODUCT>` entry, returning the decoded
/// marker for each. Malformed markers are skipped with their error kept
/// alongside so callers (e.g. `list --setup`) can surface a warning
/// instead of aborting the whole listing.
pub fn active_products(
    vars: &std::collections::HashMap<String, String>,
) -> Vec<(String, EupsResult<SessionMarker>)> {
    let mut out = vec![];
    for (key, value) in vars {
        if let Some(product_upper) = key.strip_prefix("SETUP_") {
            out.push((
                product_upper.to_string(),
                SessionMarker::decode(product_upper, value),
            ));
        }
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let marker = SessionMarker {
            product: "cfitsio".to_string(),
            version: "3.450".to_string(),
            flavor: "Linux64".to_string(),
            stack_root: "/opt/stack".to_string(),
            tag: Some("current".to_string()),
        };
        let encoded = marker.encode();
        assert_eq!(encoded, "cfitsio 3.450 -f Linux64 -Z /opt/stack -t current");
        let decoded = SessionMarker::decode("CFITSIO", &encoded).unwrap();
        assert_eq!(decoded, marker);
    }

    #[test]
    fn round_trips_without_tag() {
        let marker = SessionMarker {
            product: "foo".to_string(),
            version: "1.0".to_string(),
            flavor: "Linux64".to_string(),
            stack_root: "/opt/stack".to_string(),
            tag: None,
        };
        let decoded = SessionMarker::decode("FOO", &marker.encode()).unwrap();
        assert_eq!(decoded, marker);
    }

    #[test]
    fn local_setup_version_is_recognized() {
        let marker = SessionMarker {
            product: "foo".to_string(),
            version: "LOCAL:/home/user/foo".to_string(),
            flavor: "Linux64".to_string(),
            stack_root: "none".to_string(),
            tag: None,
        };
        assert!(marker.is_local());
        assert_eq!(marker.local_dir(), Some("/home/user/foo"));
    }

    #[test]
    fn malformed_marker_reports_state_mismatch() {
        let err = SessionMarker::decode("FOO", "garbage").unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
