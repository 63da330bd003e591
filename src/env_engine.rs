/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

/*!
  The environment-mutation engine (C5): a pure value type over a process
  environment snapshot. Per §9's first redesign point, `Env` never
  touches `std::env` itself -- only the CLI layer does that, by
  constructing an `Env` from a snapshot and serializing its `diff()`
  back out through `cli::shell`.

  `Env` keeps a per-variable undo stack of values clobbered by a forward
  mutation. Within one process this makes inversion exact (used when a
  resolve must roll an already-active product back before reactivating a
  different version, and when a failed resolve must discard everything
  it had provisionally applied). A freshly constructed `Env` -- the case
  for a standalone `unsetup` invocation, which is a new process with no
  memory of the `setup` that preceded it -- has an empty undo stack, so
  inversion falls back to the documented default: `envSet`/`addAlias`
  invert to removal, `envUnset` inverts to a no-op, since there is
  nothing to restore without history. The list-action inverses
  (`envPrepend`/`envAppend`/`envRemove`) need no history at all; they are
  computed directly from whatever the variable holds right now.
*/

use std::collections::HashMap;

use crate::table::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Forward,
    Inverse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SetVar(String, String),
    UnsetVar(String),
    SetAlias(String, String),
    UnsetAlias(String),
}

pub struct Env {
    vars: HashMap<String, String>,
    aliases: HashMap<String, String>,
    snapshot_vars: HashMap<String, String>,
    snapshot_aliases: HashMap<String, String>,
    undo: HashMap<String, Vec<Option<String>>>,
    alias_undo: HashMap<String, Vec<Option<String>>>,
}

impl Env {
    pub fn new(vars: HashMap<String, String>, aliases: HashMap<String, String>) -> Env {
        Env {
            snapshot_vars: vars.clone(),
            snapshot_aliases: aliases.clone(),
            vars,
            aliases,
            undo: HashMap::new(),
            alias_undo: HashMap::new(),
        }
    }

    pub fn from_process() -> Env {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Env::new(vars, HashMap::new())
    }

    pub fn get(&self, var: &str) -> Option<&str> {
        self.vars.get(var).map(|s| s.as_str())
    }

    pub fn vars(&self) -> &HashMap<String, String> {
        &self.vars
    }

    fn push_var_undo(&mut self, var: &str, prior: Option<String>) {
        self.undo.entry(var.to_string()).or_default().push(prior);
    }

    fn push_alias_undo(&mut self, name: &str, prior: Option<String>) {
        self.alias_undo
            .entry(name.to_string())
            .or_default()
            .push(prior);
    }

    fn set_var(&mut self, var: &str, value: String) {
        let prior = self.vars.insert(var.to_string(), value);
        self.push_var_undo(var, prior);
    }

    fn unset_var(&mut self, var: &str) {
        let prior = self.vars.remove(var);
        self.push_var_undo(var, prior);
    }

    fn set_alias(&mut self, name: &str, value: String) {
        let prior = self.aliases.insert(name.to_string(), value);
        self.push_alias_undo(name, prior);
    }

    fn unset_alias(&mut self, name: &str) {
        let prior = self.aliases.remove(name);
        self.push_alias_undo(name, prior);
    }

    /// Applies one table-file action in the given direction. `action` is
    /// expected to already have been stripped of `SetupRequired`/
    /// `SetupOptional`/`Deprecated` variants by the resolver -- this layer
    /// only ever sees concrete environment mutations.
    pub fn apply(&mut self, action: &Action, mode: Mode) {
        match (action, mode) {
            (Action::EnvSet { var, value }, Mode::Forward) => self.set_var(var, value.clone()),
            (Action::EnvSet { var, .. }, Mode::Inverse) => self.invert_set(var),

            (Action::EnvUnset { var }, Mode::Forward) => self.unset_var(var),
            (Action::EnvUnset { var }, Mode::Inverse) => self.invert_unset(var),

            (Action::EnvPrepend { var, value, delim }, Mode::Forward) => {
                self.list_insert(var, value, delim, true)
            }
            (Action::EnvPrepend { var, value, delim }, Mode::Inverse) => {
                self.list_remove_one(var, value, delim)
            }

            (Action::EnvAppend { var, value, delim }, Mode::Forward) => {
                self.list_insert(var, value, delim, false)
            }
            (Action::EnvAppend { var, value, delim }, Mode::Inverse) => {
                self.list_remove_one(var, value, delim)
            }

            (Action::EnvRemove { var, value, delim }, Mode::Forward) => {
                self.list_remove_all(var, value, delim)
            }
            (Action::EnvRemove { var, value, delim }, Mode::Inverse) => {
                self.list_insert(var, value, delim, false)
            }

            (Action::PathPrepend { var, value }, Mode::Forward) => {
                self.list_insert(var, value, ":", true)
            }
            (Action::PathPrepend { var, value }, Mode::Inverse) => {
                self.list_remove_one(var, value, ":")
            }

            (Action::PathAppend { var, value }, Mode::Forward) => {
                self.list_insert(var, value, ":", false)
            }
            (Action::PathAppend { var, value }, Mode::Inverse) => {
                self.list_remove_one(var, value, ":")
            }

            (Action::PathRemove { var, value }, Mode::Forward) => {
                self.list_remove_all(var, value, ":")
            }
            (Action::PathRemove { var, value }, Mode::Inverse) => {
                self.list_insert(var, value, ":", false)
            }

            (Action::AddAlias { name, value }, Mode::Forward) => {
                self.set_alias(name, value.clone())
            }
            (Action::AddAlias { name, .. }, Mode::Inverse) => self.invert_alias(name),

            // Recursion markers and the legacy directive are handled by
            // the resolver before actions reach this layer.
            (Action::SetupRequired { .. }, _)
            | (Action::SetupOptional { .. }, _)
            | (Action::Deprecated { .. }, _) => {}
        }
    }

    fn invert_set(&mut self, var: &str) {
        match self.undo.get_mut(var).and_then(|stack| stack.pop()) {
            Some(Some(prior)) => self.vars.insert(var.to_string(), prior),
            Some(None) | None => self.vars.remove(var),
        };
    }

    fn invert_unset(&mut self, var: &str) {
        if let Some(Some(prior)) = self.undo.get_mut(var).and_then(|stack| stack.pop()) {
            self.vars.insert(var.to_string(), prior);
        }
    }

    fn invert_alias(&mut self, name: &str) {
        match self
            .alias_undo
            .get_mut(name)
            .and_then(|stack| stack.pop())
        {
            Some(Some(prior)) => self.aliases.insert(name.to_string(), prior),
            Some(None) | None => self.aliases.remove(name),
        };
    }

    fn list_insert(&mut self, var: &str, value: &str, delim: &str, front: bool) {
        let current = self.vars.get(var).cloned();
        let existing = split_elems(current.as_deref(), delim);
        let incoming: Vec<String> = split_elems(Some(value), delim)
            .into_iter()
            .filter(|e| !existing.contains(e))
            .collect();
        let merged = if front {
            let mut v = incoming;
            v.extend(existing);
            v
        } else {
            let mut v = existing;
            v.extend(incoming);
            v
        };
        self.set_var(var, merged.join(delim));
    }

    /// Removes exactly one occurrence of `value`'s elements from `var`,
    /// used to invert a prepend/append. No history needed: operates
    /// purely on the variable's current contents.
    fn list_remove_one(&mut self, var: &str, value: &str, delim: &str) {
        let current = self.vars.get(var).cloned();
        let mut existing = split_elems(current.as_deref(), delim);
        for target in split_elems(Some(value), delim) {
            if let Some(pos) = existing.iter().position(|e| *e == target) {
                existing.remove(pos);
            }
        }
        self.set_var(var, existing.join(delim));
    }

    /// Strips every occurrence of `value`'s elements, collapsing adjacent
    /// separators (empty elements dropped). Per the resolved Open
    /// Question in DESIGN.md, a variable left with no elements is set to
    /// the empty string rather than unset.
    fn list_remove_all(&mut self, var: &str, value: &str, delim: &str) {
        let current = self.vars.get(var).cloned();
        let targets = split_elems(Some(value), delim);
        let remaining: Vec<String> = split_elems(current.as_deref(), delim)
            .into_iter()
            .filter(|e| !e.is_empty() && !targets.contains(e))
            .collect();
        self.set_var(var, remaining.join(delim));
    }

    /// The shell-neutral delta between the current state and the
    /// snapshot this `Env` was constructed from.
    pub fn diff(&self) -> Vec<Mutation> {
        let mut out = vec![];
        for (k, v) in &self.vars {
            if self.snapshot_vars.get(k) != Some(v) {
                out.push(Mutation::SetVar(k.clone(), v.clone()));
            }
        }
        for k in self.snapshot_vars.keys() {
            if !self.vars.contains_key(k) {
                out.push(Mutation::UnsetVar(k.clone()));
            }
        }
        for (k, v) in &self.aliases {
            if self.snapshot_aliases.get(k) != Some(v) {
                out.push(Mutation::SetAlias(k.clone(), v.clone()));
            }
        }
        for k in self.snapshot_aliases.keys() {
            if !self.aliases.contains_key(k) {
                out.push(Mutation::UnsetAlias(k.clone()));
            }
        }
        out.sort_by(|a, b| mutation_key(a).cmp(&mutation_key(b)));
        out
    }
}

fn mutation_key(m: &Mutation) -> &str {
    match m {
        Mutation::SetVar(k, _) => k,
        Mutation::UnsetVar(k) => k,
        Mutation::SetAlias(k, _) => k,
        Mutation::UnsetAlias(k) => k,
    }
}

fn split_elems(value: Option<&str>, delim: &str) -> Vec<String> {
    match value {
        None => vec![],
        Some(s) if s.is_empty() => vec![],
        Some(s) => s.split(delim).map(|e| e.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_with(var: &str, value: &str) -> Env {
        let mut vars = HashMap::new();
        vars.insert(var.to_string(), value.to_string());
        Env::new(vars, HashMap::new())
    }

    #[test]
    fn prepend_suppresses_duplicate() {
        let mut env = env_with("DYLD_LIBRARY_PATH", "/a/b:/c");
        env.apply(
            &Action::EnvPrepend {
                var: "DYLD_LIBRARY_PATH".to_string(),
                value: "/a/b".to_string(),
                delim: ":".to_string(),
            },
            Mode::Forward,
        );
        assert_eq!(env.get("DYLD_LIBRARY_PATH"), Some("/a/b:/c"));
    }

    #[test]
    fn prepend_preserves_remaining_order() {
        let mut env = env_with("PATH", "/c:/d");
        env.apply(
            &Action::EnvPrepend {
                var: "PATH".to_string(),
                value: "/a:/b".to_string(),
                delim: ":".to_string(),
            },
            Mode::Forward,
        );
        assert_eq!(env.get("PATH"), Some("/a:/b:/c:/d"));
    }

    #[test]
    fn round_trip_set_then_unset() {
        let mut env = Env::new(HashMap::new(), HashMap::new());
        let action = Action::EnvSet {
            var: "FOO".to_string(),
            value: "1".to_string(),
        };
        env.apply(&action, Mode::Forward);
        assert_eq!(env.get("FOO"), Some("1"));
        env.apply(&action, Mode::Inverse);
        assert_eq!(env.get("FOO"), None);
        assert!(env.diff().is_empty());
    }

    #[test]
    fn round_trip_restores_prior_value() {
        let mut env = env_with("FOO", "original");
        let action = Action::EnvSet {
            var: "FOO".to_string(),
            value: "new".to_string(),
        };
        env.apply(&action, Mode::Forward);
        assert_eq!(env.get("FOO"), Some("new"));
        env.apply(&action, Mode::Inverse);
        assert_eq!(env.get("FOO"), Some("original"));
    }

    #[test]
    fn remove_collapses_and_leaves_empty_string() {
        let mut env = env_with("FOO", "a");
        env.apply(
            &Action::EnvRemove {
                var: "FOO".to_string(),
                value: "a".to_string(),
                delim: ":".to_string(),
            },
            Mode::Forward,
        );
        assert_eq!(env.get("FOO"), Some(""));
    }

    #[test]
    fn stateless_inverse_of_set_unsets() {
        // A fresh Env (as a standalone `unsetup` process would construct)
        // has no undo history, so inverting envSet falls back to unset.
        let mut env = env_with("SETUP_FOO", "foo 1.0 -f Linux64 -Z /stack");
        env.apply(
            &Action::EnvSet {
                var: "SETUP_FOO".to_string(),
                value: "foo 1.0 -f Linux64 -Z /stack".to_string(),
            },
            Mode::Inverse,
        );
        assert_eq!(env.get("SETUP_FOO"), None);
    }
}
