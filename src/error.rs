/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

/*!
  The error module defines the single error type threaded through every
  component of eups_core. Each variant corresponds to one entry of the
  error taxonomy; `exit_code` maps a variant onto the process exit status
  a CLI front end should use.
*/

use std::fmt;
use thiserror::Error;

/// One frame of context accumulated as an error propagates up through the
/// resolver. Printed as the "chain of product frames" mentioned alongside
/// the FATAL message.
#[derive(Debug, Clone)]
pub struct Frame {
    pub product: String,
    pub version: Option<String>,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{} {}", self.product, v),
            None => write!(f, "{}", self.product),
        }
    }
}

#[derive(Debug, Error)]
pub enum EupsError {
    #[error("{0}")]
    Usage(String),

    #[error("product `{0}` is not known to any stack")]
    NoSuchProduct(String),

    #[error("product `{product}` has no declared version `{version}`")]
    NoSuchVersion { product: String, version: String },

    #[error("product `{product}` version `{version}` has no record for flavor `{flavor}`")]
    NoMatchingFlavor {
        product: String,
        version: String,
        flavor: String,
    },

    #[error("{path}:{line}: {message}")]
    TableParseError {
        path: String,
        line: usize,
        message: String,
    },

    #[error("no table file found for `{product}` `{version}`")]
    TableMissing { product: String, version: String },

    #[error("no declared version of `{product}` satisfies `{expr}`")]
    NoMatchingVersion { product: String, expr: String },

    #[error("inconsistent version constraints on `{product}`: `{first}` conflicts with `{second}`")]
    InconsistentVersions {
        product: String,
        first: String,
        second: String,
    },

    #[error("dependency cycle detected on required edges: {0}")]
    Cycle(String),

    #[error("`{product}` state mismatch: {message}")]
    StateMismatch { product: String, message: String },

    #[error("could not acquire lock on `{0}`")]
    LockBusy(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EupsError {
    /// Exit code per §6's table. The spec names six broad buckets (success,
    /// general failure, usage error, resolution failure, database
    /// inconsistency, internal error) without spelling out which taxonomy
    /// entry maps to which bucket; the assignment below is the resolved
    /// interpretation (recorded in DESIGN.md): lookup/resolution-time
    /// failures are "resolution failure", malformed on-disk state is
    /// "database inconsistency", and anything touching the filesystem
    /// unexpectedly is "internal error".
    pub fn exit_code(&self) -> i32 {
        match self {
            EupsError::Usage(_) => 2,
            EupsError::NoSuchProduct(_)
            | EupsError::NoSuchVersion { .. }
            | EupsError::NoMatchingFlavor { .. }
            | EupsError::NoMatchingVersion { .. }
            | EupsError::InconsistentVersions { .. }
            | EupsError::Cycle(_) => 3,
            EupsError::TableParseError { .. }
            | EupsError::TableMissing { .. }
            | EupsError::StateMismatch { .. } => 4,
            EupsError::LockBusy(_) => 1,
            EupsError::Io(_) => 9,
        }
    }
}

pub type EupsResult<T> = Result<T, EupsError>;

/// Renders the FATAL message and the frame chain that produced it, as
/// described in §7: "a single FATAL message on stderr with the root cause,
/// followed by the chain of product frames that led to it".
pub fn report_fatal(err: &EupsError, frames: &[Frame]) -> String {
    let mut out = format!("FATAL: {}", err);
    if !frames.is_empty() {
        out.push_str("\n  while setting up:");
        for frame in frames.iter().rev() {
            out.push_str(&format!("\n    {}", frame));
        }
    }
    out
}
