/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

/*!
  The product database (C3): an ordered list of stacks (one per
  `EUPS_PATH` entry, plus the user's own stack) backed by the
  `<stack>/ups_db/<product>/{<version>.version,<tag>.chain}` layout from
  §4.3. Reads are synchronous -- the teacher's worker-pool-backed loader
  was dropped, since §5 rules out background tasks entirely -- and writes
  go through `write_atomic`, which always writes to a temp file in the
  destination directory and renames over the target.
*/

pub mod dbfile;

use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{EupsError, EupsResult};
use self::dbfile::DbFile;

/// One `ups_db` root, either a system stack entry from `EUPS_PATH` or the
/// user's own `~/.eups` override stack.
#[derive(Debug, Clone)]
pub struct Stack {
    pub root: PathBuf,
    pub is_user: bool,
}

impl Stack {
    pub fn new(root: impl Into<PathBuf>, is_user: bool) -> Stack {
        Stack {
            root: root.into(),
            is_user,
        }
    }

    fn ups_db(&self) -> PathBuf {
        self.root.join("ups_db")
    }

    fn product_dir(&self, product: &str) -> PathBuf {
        self.ups_db().join(product)
    }

    fn version_path(&self, product: &str, version: &str) -> PathBuf {
        self.product_dir(product).join(format!("{}.version", version))
    }

    fn chain_path(&self, product: &str, tag: &str) -> PathBuf {
        self.product_dir(product).join(format!("{}.chain", tag))
    }

    fn lock_dir(&self) -> PathBuf {
        self.ups_db().join("_locks")
    }

    /// Names of every product this stack has a `ups_db/<product>/`
    /// directory for.
    pub fn products(&self) -> Vec<String> {
        let mut out = vec![];
        if let Ok(entries) = fs::read_dir(self.ups_db()) {
            for entry in entries.flatten() {
                if entry.path().is_dir() && entry.file_name() != "_locks" {
                    if let Some(name) = entry.file_name().to_str() {
                        out.push(name.to_string());
                    }
                }
            }
        }
        out.sort();
        out
    }

    fn listing(&self, product: &str, suffix: &str) -> Vec<String> {
        let mut out = vec![];
        if let Ok(entries) = fs::read_dir(self.product_dir(product)) {
            for entry in entries.flatten() {
                if let Some(name) = entry.file_name().to_str() {
                    if let Some(stripped) = name.strip_suffix(suffix) {
                        out.push(stripped.to_string());
                    }
                }
            }
        }
        out
    }

    pub fn versions(&self, product: &str) -> Vec<String> {
        self.listing(product, ".version")
    }

    pub fn tags(&self, product: &str) -> Vec<String> {
        self.listing(product, ".chain")
    }

    pub fn has_product(&self, product: &str) -> bool {
        self.product_dir(product).is_dir()
    }

    pub fn has_version(&self, product: &str, version: &str) -> bool {
        self.version_path(product, version).is_file()
    }

    pub fn read_version(&self, product: &str, version: &str) -> EupsResult<DbFile> {
        DbFile::load(self.version_path(product, version))
    }

    pub fn read_chain(&self, product: &str, tag: &str) -> EupsResult<DbFile> {
        DbFile::load(self.chain_path(product, tag))
    }

    pub fn write_version(&self, product: &str, version: &str, db: &DbFile) -> EupsResult<()> {
        write_atomic(&self.version_path(product, version), &db.render())
    }

    pub fn write_chain(&self, product: &str, tag: &str, db: &DbFile) -> EupsResult<()> {
        write_atomic(&self.chain_path(product, tag), &db.render())
    }

    pub fn remove_version(&self, product: &str, version: &str) -> EupsResult<()> {
        let path = self.version_path(product, version);
        if path.is_file() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn remove_chain(&self, product: &str, tag: &str) -> EupsResult<()> {
        let path = self.chain_path(product, tag);
        if path.is_file() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Takes an advisory exclusive lock on `ups_db/_locks/<product>.lock`
    /// for the duration the returned guard is held, as required for
    /// declare/undeclare/tag/untag by §5.
    pub fn lock(&self, product: &str) -> EupsResult<LockGuard> {
        let dir = self.lock_dir();
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.lock", product));
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&path)?;
        file.try_lock_exclusive()
            .map_err(|_| EupsError::LockBusy(path.display().to_string()))?;
        Ok(LockGuard { file })
    }
}

pub struct LockGuard {
    file: fs::File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Writes `contents` to `path` via a sibling temp file plus rename, so a
/// reader never observes a partially-written file.
pub fn write_atomic(path: &Path, contents: &str) -> EupsResult<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let tmp = dir.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("db")
    ));
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// One product's full declaration as seen through one stack: the fields
/// needed to build a resolver's substitution bag and locate its table
/// file.
pub struct ProductRecord<'a> {
    pub prod_dir: String,
    pub ups_dir: String,
    pub table_file: String,
    pub stack: &'a Stack,
    pub shadowed: Vec<&'a Stack>,
}

/// `PROD_DIR` may reference `${VAR}` against the process environment
/// (§3); this is the one place that substitution happens, since nowhere
/// else in C3 needs it.
fn substitute_env(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '$' && chars.get(i + 1) == Some(&'{') {
            if let Some(end) = (i + 2..chars.len()).find(|&j| chars[j] == '}') {
                let var: String = chars[i + 2..end].iter().collect();
                out.push_str(&std::env::var(&var).unwrap_or_default());
                i = end + 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// `table_file` is either the literal `none`, an absolute path, or a path
/// relative to `<prod_dir>/<ups_dir>`.
pub fn resolved_table_path(record: &ProductRecord) -> PathBuf {
    let table_file = Path::new(&record.table_file);
    if table_file.is_absolute() {
        table_file.to_path_buf()
    } else {
        Path::new(&record.prod_dir)
            .join(&record.ups_dir)
            .join(table_file)
    }
}

/// The full, ordered set of stacks a resolver session sees: every
/// `EUPS_PATH` entry (highest priority first) plus, if present, the
/// caller's user stack.
pub struct DB {
    pub stacks: Vec<Stack>,
    pub user_stack: Option<Stack>,
}

impl DB {
    pub fn new(paths: Vec<PathBuf>, user_root: Option<PathBuf>) -> DB {
        DB {
            stacks: paths.into_iter().map(|p| Stack::new(p, false)).collect(),
            user_stack: user_root.map(|p| Stack::new(p, true)),
        }
    }

    /// System stacks first (in `EUPS_PATH` order), user stack last -- used
    /// for version/product lookups, where a declared product always beats
    /// a synthetic user override.
    fn system_then_user(&self) -> Vec<&Stack> {
        let mut out: Vec<&Stack> = self.stacks.iter().collect();
        if let Some(user) = &self.user_stack {
            out.push(user);
        }
        out
    }

    /// User stack first, then system stacks -- used for tag lookups, since
    /// a user's own `.eups/ups_db` tag assignment should shadow the system
    /// one.
    fn user_then_system(&self) -> Vec<&Stack> {
        let mut out = vec![];
        if let Some(user) = &self.user_stack {
            out.push(user);
        }
        out.extend(self.stacks.iter());
        out
    }

    pub fn all_products(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .system_then_user()
            .iter()
            .flat_map(|s| s.products())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn product_versions(&self, product: &str) -> Vec<String> {
        let mut versions: Vec<String> = self
            .system_then_user()
            .iter()
            .flat_map(|s| s.versions(product))
            .collect();
        versions.sort();
        versions.dedup();
        versions
    }

    pub fn product_tags(&self, product: &str) -> Vec<String> {
        let mut tags: Vec<String> = self
            .user_then_system()
            .iter()
            .flat_map(|s| s.tags(product))
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    /// Resolves `(product, version)` to the declared `DbFile` plus the
    /// stack it was found on. When more than one stack declares the same
    /// version, the first one in priority order wins; this is the
    /// resolved interpretation of the ambiguous-declaration case (recorded
    /// in DESIGN.md), and the caller is expected to log a warning about
    /// the shadowed stacks.
    pub fn locate_version<'a>(
        &'a self,
        product: &str,
        version: &str,
    ) -> EupsResult<(DbFile, &'a Stack, Vec<&'a Stack>)> {
        let mut hits: Vec<&Stack> = vec![];
        for stack in self.system_then_user() {
            if stack.has_version(product, version) {
                hits.push(stack);
            }
        }
        let winner = *hits.first().ok_or_else(|| EupsError::NoSuchVersion {
            product: product.to_string(),
            version: version.to_string(),
        })?;
        let db = winner.read_version(product, version)?;
        let shadowed = hits[1..].to_vec();
        Ok((db, winner, shadowed))
    }

    /// Resolves a tag to a concrete version string for `product`, checking
    /// the user stack before system stacks per §4.3.
    pub fn resolve_tag(&self, product: &str, tag: &str) -> EupsResult<String> {
        for stack in self.user_then_system() {
            if stack.tags(product).iter().any(|t| t == tag) {
                let db = stack.read_chain(product, tag)?;
                if let Some(section) = db.sections.first() {
                    if let Some(version) = section.get("version") {
                        return Ok(version.to_string());
                    }
                }
            }
        }
        Err(EupsError::NoSuchVersion {
            product: product.to_string(),
            version: format!("tag:{}", tag),
        })
    }

    /// Resolves `(product, version)`'s declaration to the path of its
    /// table file, honoring the declared `PROD_DIR`/`UPS_DIR`/`TABLE_FILE`
    /// fields for `flavor`.
    pub fn table_path(&self, product: &str, version: &str, flavor: &str) -> EupsResult<PathBuf> {
        let record = self.locate_product(product, version, flavor)?;
        Ok(resolved_table_path(&record))
    }

    /// Index of the first stack (system stacks then user stack, matching
    /// `system_then_user`'s priority order) that declares `(product,
    /// version)`. Used by the resolver's tie-break rule (§4.4 step 1) when
    /// two distinct version strings compare equal under §4.1's ordering.
    pub fn first_stack_index_with(&self, product: &str, version: &str) -> usize {
        self.system_then_user()
            .iter()
            .position(|s| s.has_version(product, version))
            .unwrap_or(usize::MAX)
    }

    /// Full per-flavor declaration for `(product, version)`: product
    /// directory (with `${VAR}` references resolved against the process
    /// environment, per §3), ups dir, table file, and which stacks
    /// shadowed the winner.
    pub fn locate_product<'a>(
        &'a self,
        product: &str,
        version: &str,
        flavor: &str,
    ) -> EupsResult<ProductRecord<'a>> {
        let (db, stack, shadowed) = self.locate_version(product, version)?;
        let section = db
            .section_for(flavor)
            .ok_or_else(|| EupsError::NoMatchingFlavor {
                product: product.to_string(),
                version: version.to_string(),
                flavor: flavor.to_string(),
            })?;
        let prod_dir = substitute_env(section.get("prod_dir").unwrap_or(""));
        let ups_dir = section.get("ups_dir").unwrap_or("ups").to_string();
        let table_file = section
            .get("table_file")
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("{}.table", product));
        Ok(ProductRecord {
            prod_dir,
            ups_dir,
            table_file,
            stack,
            shadowed,
        })
    }

    pub fn product_tag_summaries(&self, product: &str) -> Vec<(String, String, bool)> {
        let mut out = vec![];
        for stack in self.user_then_system() {
            for tag in stack.tags(product) {
                if let Ok(db) = stack.read_chain(product, &tag) {
                    if let Some(section) = db.sections.first() {
                        if let Some(version) = section.get("version") {
                            out.push((tag.clone(), version.to_string(), stack.is_user));
                        }
                    }
                }
            }
        }
        out
    }

    pub fn declare(
        &self,
        stack: &Stack,
        product: &str,
        version: &str,
        flavor: &str,
        prod_dir: &str,
        ups_dir: &str,
        table_file: &str,
    ) -> EupsResult<()> {
        let _lock = stack.lock(product)?;
        let mut db = if stack.has_version(product, version) {
            stack.read_version(product, version)?
        } else {
            DbFile::default()
        };
        let mut fields = std::collections::HashMap::new();
        fields.insert("prod_dir".to_string(), prod_dir.to_string());
        fields.insert("ups_dir".to_string(), ups_dir.to_string());
        fields.insert("table_file".to_string(), table_file.to_string());
        if let Some(section) = db
            .sections
            .iter_mut()
            .find(|s| s.flavor == flavor)
        {
            section.fields.extend(fields);
        } else {
            db.sections.push(dbfile::Section {
                flavor: flavor.to_string(),
                fields,
            });
        }
        stack.write_version(product, version, &db)
    }

    pub fn undeclare(&self, stack: &Stack, product: &str, version: &str) -> EupsResult<()> {
        let _lock = stack.lock(product)?;
        stack.remove_version(product, version)
    }

    pub fn tag(&self, stack: &Stack, product: &str, version: &str, tag: &str) -> EupsResult<()> {
        let _lock = stack.lock(product)?;
        let mut fields = std::collections::HashMap::new();
        fields.insert("version".to_string(), version.to_string());
        let db = DbFile {
            sections: vec![dbfile::Section {
                flavor: "ANY".to_string(),
                fields,
            }],
        };
        stack.write_chain(product, tag, &db)
    }

    pub fn untag(&self, stack: &Stack, product: &str, tag: &str) -> EupsResult<()> {
        let _lock = stack.lock(product)?;
        stack.remove_chain(product, tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn declare_fixture(stack: &Stack, product: &str, version: &str, flavor: &str) {
        stack
            .lock(product)
            .map(|g| drop(g))
            .unwrap_or(());
        let mut fields = std::collections::HashMap::new();
        fields.insert("prod_dir".to_string(), "/opt/foo".to_string());
        fields.insert("ups_dir".to_string(), "ups".to_string());
        fields.insert("table_file".to_string(), "foo.table".to_string());
        let db = DbFile {
            sections: vec![dbfile::Section {
                flavor: flavor.to_string(),
                fields,
            }],
        };
        stack.write_version(product, version, &db).unwrap();
    }

    #[test]
    fn locates_declared_version() {
        let dir = tempdir().unwrap();
        let stack = Stack::new(dir.path(), false);
        declare_fixture(&stack, "foo", "1.0", "Linux64");
        let db = DB::new(vec![dir.path().to_path_buf()], None);
        let (found, winner, shadowed) = db.locate_version("foo", "1.0").unwrap();
        assert!(!winner.is_user);
        assert!(shadowed.is_empty());
        assert!(found.section_for("Linux64").is_some());
    }

    #[test]
    fn first_stack_wins_on_duplicate_declaration() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        let first_stack = Stack::new(first.path(), false);
        let second_stack = Stack::new(second.path(), false);
        declare_fixture(&first_stack, "foo", "1.0", "Linux64");
        declare_fixture(&second_stack, "foo", "1.0", "Linux64");
        let db = DB::new(
            vec![first.path().to_path_buf(), second.path().to_path_buf()],
            None,
        );
        let (_found, winner, shadowed) = db.locate_version("foo", "1.0").unwrap();
        assert_eq!(winner.root, first.path());
        assert_eq!(shadowed.len(), 1);
    }

    #[test]
    fn tag_round_trips_to_resolve() {
        let dir = tempdir().unwrap();
        let stack = Stack::new(dir.path(), false);
        declare_fixture(&stack, "foo", "1.0", "Linux64");
        let db = DB::new(vec![dir.path().to_path_buf()], None);
        db.tag(&stack, "foo", "1.0", "current").unwrap();
        assert_eq!(db.resolve_tag("foo", "current").unwrap(), "1.0");
    }
}
