/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

/*!
  The only place in the crate that knows shell syntax (§9's redesign
  note: "a per-shell printer in C7 is the only place that knows
  syntax"). Takes the shell-neutral `env_engine::Mutation` list C5
  produces and renders it as a single line of shell-evalable text in the
  syntax named by `EUPS_SHELL`/`-Z`.
*/

use crate::config::Shell;
use crate::env_engine::Mutation;

/// Wraps `value` in single quotes, escaping any embedded `'` the POSIX
/// way (`'\''`) so the emitted line is safe to `eval` regardless of its
/// contents.
fn single_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

fn render_one(mutation: &Mutation, shell: Shell) -> String {
    match (mutation, shell) {
        (Mutation::SetVar(k, v), Shell::Sh) | (Mutation::SetVar(k, v), Shell::Zsh) => {
            format!("export {}={};", k, single_quote(v))
        }
        (Mutation::SetVar(k, v), Shell::Csh) => format!("setenv {} {};", k, single_quote(v)),
        (Mutation::SetVar(k, v), Shell::Fish) => format!("set -gx {} {};", k, single_quote(v)),

        (Mutation::UnsetVar(k), Shell::Sh) | (Mutation::UnsetVar(k), Shell::Zsh) => {
            format!("unset {};", k)
        }
        (Mutation::UnsetVar(k), Shell::Csh) => format!("unsetenv {};", k),
        (Mutation::UnsetVar(k), Shell::Fish) => format!("set -e {};", k),

        (Mutation::SetAlias(n, v), Shell::Sh) | (Mutation::SetAlias(n, v), Shell::Zsh) => {
            format!("alias {}={};", n, single_quote(v))
        }
        (Mutation::SetAlias(n, v), Shell::Csh) => format!("alias {} {};", n, single_quote(v)),
        (Mutation::SetAlias(n, v), Shell::Fish) => {
            format!("alias {} {};", n, single_quote(v))
        }

        (Mutation::UnsetAlias(n), Shell::Sh) | (Mutation::UnsetAlias(n), Shell::Zsh) => {
            format!("unalias {} 2>/dev/null;", n)
        }
        (Mutation::UnsetAlias(n), Shell::Csh) => format!("unalias {};", n),
        (Mutation::UnsetAlias(n), Shell::Fish) => format!("functions -e {};", n),
    }
}

/// Renders the full mutation list as one shell-evalable line, the form
/// §6 says is consumed by the calling shell wrapper via `eval`.
pub fn render(mutations: &[Mutation], shell: Shell) -> String {
    mutations
        .iter()
        .map(|m| render_one(m, shell))
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sh_set_and_unset() {
        let muts = vec![
            Mutation::SetVar("FOO".to_string(), "bar".to_string()),
            Mutation::UnsetVar("BAZ".to_string()),
        ];
        assert_eq!(render(&muts, Shell::Sh), "export FOO='bar'; unset BAZ;");
    }

    #[test]
    fn csh_uses_setenv() {
        let muts = vec![Mutation::SetVar("FOO".to_string(), "bar".to_string())];
        assert_eq!(render(&muts, Shell::Csh), "setenv FOO 'bar';");
    }

    #[test]
    fn fish_uses_set_gx() {
        let muts = vec![Mutation::SetVar("FOO".to_string(), "bar".to_string())];
        assert_eq!(render(&muts, Shell::Fish), "set -gx FOO 'bar';");
    }

    #[test]
    fn quoting_escapes_embedded_single_quote() {
        let muts = vec![Mutation::SetVar(
            "FOO".to_string(),
            "it's here".to_string(),
        )];
        assert_eq!(render(&muts, Shell::Sh), "export FOO='it'\\''s here';");
    }
}
