/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.
 * Copyright Nate Lust 2019*/

/*!
  The dependency resolver (C4): walks a product's table file, selecting
  one version per product and recursing into its declared dependencies,
  producing a flat, ordered `Plan` that C5 can apply. `setup` and
  `unsetup` share almost all of this logic (§4.4's closing paragraph:
  "Unsetup resolution mirrors the above") -- they differ only in how the
  *next* node to visit is chosen: `setup` picks a version by evaluating a
  `VersionExpr` against the database, `unsetup` trusts whatever
  `SETUP_<PRODUCT>` says is currently active.
*/

pub mod graph;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::db::DB;
use crate::error::{EupsError, EupsResult, Frame};
use crate::session::SessionMarker;
use crate::table::{Action, Table};
use crate::version::VersionExpr;

use self::graph::DepGraph;

/// One env-mutation action tagged with the product/version that
/// contributed it, for the audit trail §4.4 step 5 asks for.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub product: String,
    pub version: String,
    pub action: Action,
}

/// One product activated (or deactivated, for an unsetup plan) by this
/// resolve, in dependency-before-dependent order.
#[derive(Debug, Clone)]
pub struct ResolvedProduct {
    pub product: String,
    pub version: String,
    pub flavor: String,
    pub stack_root: String,
    pub prod_dir: String,
    pub tag: Option<String>,
    pub local: bool,
}

#[derive(Debug, Default)]
pub struct Plan {
    pub actions: Vec<PlannedAction>,
    pub products: Vec<ResolvedProduct>,
    pub warnings: Vec<String>,
    /// The root product's resolved version, captured before `-D` strips
    /// its frame out of `products` below.
    pub root_version: Option<String>,
}

/// The root request driving one `setup` resolve.
pub struct ResolveRequest<'a> {
    pub product: &'a str,
    pub version_expr: VersionExpr,
    pub tag: Option<&'a str>,
    pub flavor: &'a str,
    pub build_type: Option<&'a str>,
    /// `setup -r <dir>`: anchor the root to a local directory instead of
    /// a database-declared version (§4.6's `LOCAL:<dir>` versions).
    pub local_root: Option<&'a Path>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    pub just_this: bool,       // -j
    pub only_dependencies: bool, // -D
    pub ignore_explicit: bool, // -i
}

struct Selected {
    version: String,
}

struct Resolver<'a> {
    db: &'a DB,
    env_snapshot: &'a HashMap<String, String>,
    options: ResolveOptions,
    selected: HashMap<String, Selected>,
    visiting: HashSet<String>,
    frames: Vec<Frame>,
    graph: DepGraph,
    plan: Plan,
    root_flavor: &'a str,
    build_type: Option<&'a str>,
    /// Frame chain captured at the deepest point a fatal error occurred,
    /// for `report_fatal` to print alongside it (§7).
    error_frames: Option<Vec<Frame>>,
}

fn product_name_upper(product: &str) -> String {
    product.to_ascii_uppercase()
}

pub fn substitution_vars(
    product: &str,
    version: &str,
    flavor: &str,
    prod_dir: &str,
    ups_dir: &str,
    stack_root: &str,
) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    let upper = product_name_upper(product);
    vars.insert("PRODUCT_NAME".to_string(), product.to_string());
    vars.insert("PRODUCT_DIR".to_string(), prod_dir.to_string());
    vars.insert("PRODUCT_VERSION".to_string(), version.to_string());
    vars.insert("PRODUCT_FLAVOR".to_string(), flavor.to_string());
    vars.insert("PRODUCTS".to_string(), stack_root.to_string());
    vars.insert("UPS_DIR".to_string(), ups_dir.to_string());
    vars.insert(
        "UPS_DB".to_string(),
        Path::new(stack_root)
            .join("ups_db")
            .to_string_lossy()
            .to_string(),
    );
    // Legacy synonyms (§4.2's "Inputs" paragraph).
    vars.insert("UPS_PROD_NAME".to_string(), product.to_string());
    vars.insert("UPS_PROD_DIR".to_string(), prod_dir.to_string());
    vars.insert("UPS_PROD_VERSION".to_string(), version.to_string());
    vars.insert("UPS_PROD_FLAVOR".to_string(), flavor.to_string());
    vars.insert(format!("{}_DIR", upper), prod_dir.to_string());
    vars
}

/// Parses one `setupRequired`/`setupOptional` spec string:
/// `"<product> [version-expr] [-f <flavor>] [-t <tag>] [-v] [-r <root>]"`.
/// The version expression itself may contain spaces (`">= 3.450"`, `"1.0
/// || 2.0"`), so anything that is not a recognized flag token is folded
/// into it in order.
struct SetupSpec {
    product: String,
    version_expr: String,
    flavor: Option<String>,
    tag: Option<String>,
    root: Option<String>,
}

fn parse_setup_spec(spec: &str) -> Option<SetupSpec> {
    let tokens: Vec<&str> = spec.split_whitespace().collect();
    let (product, rest) = tokens.split_first()?;
    let mut flavor = None;
    let mut tag = None;
    let mut root = None;
    let mut expr_tokens = vec![];
    let mut i = 0;
    while i < rest.len() {
        match rest[i] {
            "-f" => {
                flavor = rest.get(i + 1).map(|s| s.to_string());
                i += 2;
            }
            "-t" => {
                tag = rest.get(i + 1).map(|s| s.to_string());
                i += 2;
            }
            "-r" => {
                root = rest.get(i + 1).map(|s| s.to_string());
                i += 2;
            }
            "-v" => {
                i += 1;
            }
            other => {
                expr_tokens.push(other);
                i += 1;
            }
        }
    }
    Some(SetupSpec {
        product: product.to_string(),
        version_expr: expr_tokens.join(" "),
        flavor,
        tag,
        root,
    })
}

impl<'a> Resolver<'a> {
    /// §4.4 step 1: selects a version for `product` given a (possibly
    /// empty/relational) expression and an optional explicit tag.
    fn select_version(
        &self,
        product: &str,
        expr: &VersionExpr,
        tag: Option<&str>,
    ) -> EupsResult<String> {
        if let Some(bare) = expr.as_bare_version() {
            if self.db.product_versions(product).iter().any(|v| v == bare) {
                return Ok(bare.to_string());
            }
            return Err(EupsError::NoMatchingVersion {
                product: product.to_string(),
                expr: bare.to_string(),
            });
        }
        if !expr.is_empty() {
            let candidates: Vec<String> = self
                .db
                .product_versions(product)
                .into_iter()
                .filter(|v| expr.matches(v))
                .collect();
            if candidates.is_empty() {
                return Err(EupsError::NoMatchingVersion {
                    product: product.to_string(),
                    expr: format!("{:?}", expr.primaries),
                });
            }
            return Ok(self.pick_best(product, candidates));
        }
        let tag_name = tag.unwrap_or("current");
        self.db.resolve_tag(product, tag_name)
    }

    /// Picks the version::compare-maximal candidate, tie-breaking by
    /// earlier stack order then lexicographically lower string (§4.4
    /// step 1's resolved tie-break rule; see DESIGN.md).
    fn pick_best(&self, product: &str, candidates: Vec<String>) -> String {
        candidates
            .into_iter()
            .reduce(|best, v| {
                use std::cmp::Ordering::*;
                match crate::version::compare(&v, &best) {
                    Greater => v,
                    Less => best,
                    Equal => {
                        let best_idx = self.db.first_stack_index_with(product, &best);
                        let v_idx = self.db.first_stack_index_with(product, &v);
                        match v_idx.cmp(&best_idx) {
                            Less => v,
                            Greater => best,
                            Equal => {
                                if v < best {
                                    v
                                } else {
                                    best
                                }
                            }
                        }
                    }
                }
            })
            .expect("candidates is non-empty")
    }

    /// Loads and evaluates `product`'s table file, recursing into its
    /// `setupRequired`/`setupOptional` lines in source order. Appends the
    /// resulting actions (and, for new products, a synthesized
    /// `SETUP_<PRODUCT>`/`<PRODUCT>_DIR` pair) to `self.plan`.
    fn visit(
        &mut self,
        product: &str,
        expr: &VersionExpr,
        tag: Option<&str>,
        required: bool,
        parent: Option<&str>,
    ) -> EupsResult<()> {
        if self.visiting.contains(product) {
            self.graph
                .add_edge(product, parent.unwrap_or(product), required);
            if let Some(cycle_product) = self.graph.required_cycle() {
                return Err(EupsError::Cycle(cycle_product));
            }
            return Ok(());
        }

        if let Some(existing) = self.selected.get(product) {
            let desired = self.select_version(product, expr, tag)?;
            if desired == existing.version {
                log::info!(
                    "`{}` already setup at `{}`; new constraint is also satisfied",
                    product,
                    desired
                );
                self.graph
                    .add_edge(product, parent.unwrap_or(product), required);
                return Ok(());
            }
            let msg = format!(
                "`{}`: existing selection `{}` conflicts with new constraint on `{}`",
                product, existing.version, desired
            );
            if required {
                return Err(EupsError::InconsistentVersions {
                    product: product.to_string(),
                    first: existing.version.clone(),
                    second: desired,
                });
            }
            self.plan.warnings.push(msg);
            return Ok(());
        }

        self.visiting.insert(product.to_string());
        self.frames.push(Frame {
            product: product.to_string(),
            version: None,
        });

        let result = self.visit_new(product, expr, tag);

        if result.is_err() && self.error_frames.is_none() {
            self.error_frames = Some(self.frames.clone());
        }
        self.frames.pop();
        self.visiting.remove(product);

        match result {
            Ok(version) => {
                self.selected.insert(product.to_string(), Selected { version });
                self.graph
                    .add_edge(product, parent.unwrap_or(product), required);
                Ok(())
            }
            Err(e) => {
                if required {
                    Err(e)
                } else {
                    self.plan.warnings.push(format!(
                        "optional dependency `{}` could not be satisfied: {}",
                        product, e
                    ));
                    Ok(())
                }
            }
        }
    }

    fn visit_new(
        &mut self,
        product: &str,
        expr: &VersionExpr,
        tag: Option<&str>,
    ) -> EupsResult<String> {
        let version = self.select_version(product, expr, tag)?;
        let record = self.db.locate_product(product, &version, self.flavor())?;
        if !record.shadowed.is_empty() {
            self.plan.warnings.push(format!(
                "`{}` `{}` is declared in more than one stack; using the first",
                product, version
            ));
        }
        let prod_dir = record.prod_dir.clone();
        let ups_dir = record.ups_dir.clone();
        let stack_root = record.stack.root.to_string_lossy().to_string();
        let table_file_is_none = record.table_file == "none";

        let flavor = self.flavor().to_string();
        let vars = substitution_vars(product, &version, &flavor, &prod_dir, &ups_dir, &stack_root);

        if !table_file_is_none {
            let table_path = crate::db::resolved_table_path(&record);
            let table = Table::from_file(&table_path)?;
            if !table.has_flavor(&flavor) {
                return Err(EupsError::NoMatchingFlavor {
                    product: product.to_string(),
                    version: version.clone(),
                    flavor: flavor.clone(),
                });
            }
            let actions = table.evaluate(&flavor, self.build_type, &vars, self.env_snapshot);
            self.run_actions(product, &version, actions)?;
        }

        self.plan.actions.push(PlannedAction {
            product: product.to_string(),
            version: version.clone(),
            action: Action::EnvSet {
                var: SessionMarker::product_dir_var_name(product),
                value: prod_dir.clone(),
            },
        });
        self.plan.actions.push(PlannedAction {
            product: product.to_string(),
            version: version.clone(),
            action: Action::EnvSet {
                var: SessionMarker::env_var_name(product),
                value: SessionMarker {
                    product: product.to_string(),
                    version: version.clone(),
                    flavor: flavor.clone(),
                    stack_root: stack_root.clone(),
                    tag: tag.map(|s| s.to_string()),
                }
                .encode(),
            },
        });
        self.plan.products.push(ResolvedProduct {
            product: product.to_string(),
            version: version.clone(),
            flavor,
            stack_root,
            prod_dir,
            tag: tag.map(|s| s.to_string()),
            local: false,
        });
        Ok(version)
    }

    fn run_actions(&mut self, product: &str, version: &str, actions: Vec<Action>) -> EupsResult<()> {
        for action in actions {
            match action {
                Action::SetupRequired { spec } => {
                    self.recurse_child(product, &spec, true)?;
                }
                Action::SetupOptional { spec } => {
                    self.recurse_child(product, &spec, false)?;
                }
                Action::Deprecated { directive } => {
                    log::info!(
                        "`{}`: `{}` directive absorbed into PRODUCT_DIR/SETUP_{} handling",
                        product,
                        directive,
                        product_name_upper(product)
                    );
                }
                other => {
                    self.plan.actions.push(PlannedAction {
                        product: product.to_string(),
                        version: version.to_string(),
                        action: other,
                    });
                }
            }
        }
        Ok(())
    }

    fn recurse_child(&mut self, parent: &str, spec: &str, required: bool) -> EupsResult<()> {
        let parsed = parse_setup_spec(spec).ok_or_else(|| EupsError::TableParseError {
            path: format!("{} table", parent),
            line: 0,
            message: format!("malformed setup spec `{}`", spec),
        })?;
        let expr_str = if self.options.ignore_explicit {
            String::new()
        } else {
            parsed.version_expr
        };
        let expr = VersionExpr::parse(&expr_str);
        self.visit(
            &parsed.product,
            &expr,
            parsed.tag.as_deref(),
            required,
            Some(parent),
        )
    }

    fn flavor(&self) -> &str {
        self.root_flavor
    }
}

/// A resolution failure together with the chain of product frames active
/// when it occurred, so the CLI can feed both straight into
/// `crate::error::report_fatal` (§7).
#[derive(Debug)]
pub struct ResolveError {
    pub error: EupsError,
    pub frames: Vec<Frame>,
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", crate::error::report_fatal(&self.error, &self.frames))
    }
}

impl std::error::Error for ResolveError {}

/// Resolves `request` against `db`, producing the full ordered `Plan`.
/// `env_snapshot` supplies `${VAR}` fallback values to the table
/// evaluator and is typically a copy of the calling process's
/// environment.
pub fn resolve(
    db: &DB,
    env_snapshot: &HashMap<String, String>,
    request: &ResolveRequest,
    options: ResolveOptions,
) -> Result<Plan, ResolveError> {
    let mut resolver = Resolver {
        db,
        env_snapshot,
        options,
        selected: HashMap::new(),
        visiting: HashSet::new(),
        frames: vec![],
        graph: DepGraph::new(),
        plan: Plan::default(),
        root_flavor: request.flavor,
        build_type: request.build_type,
        error_frames: None,
    };

    let outcome = if let Some(root_dir) = request.local_root {
        resolver.visit_local(request.product, root_dir).map(|_| ())
    } else {
        resolver.visit(request.product, &request.version_expr, request.tag, true, None)
    };

    if let Err(error) = outcome {
        let frames = resolver.error_frames.unwrap_or_default();
        return Err(ResolveError { error, frames });
    }

    resolver.plan.root_version = resolver
        .plan
        .products
        .iter()
        .find(|p| p.product == request.product)
        .map(|p| p.version.clone());

    if options.just_this {
        let root = request.product;
        resolver.plan.actions.retain(|a| a.product == root);
        resolver.plan.products.retain(|p| p.product == root);
    }
    if options.only_dependencies {
        let root = request.product;
        resolver.plan.actions.retain(|a| a.product != root);
        resolver.plan.products.retain(|p| p.product != root);
    }

    Ok(resolver.plan)
}

impl<'a> Resolver<'a> {
    fn visit_local(&mut self, product: &str, root_dir: &Path) -> EupsResult<String> {
        let abs = if root_dir.is_absolute() {
            root_dir.to_path_buf()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(root_dir)
        };
        let prod_dir = abs.to_string_lossy().to_string();
        let version = format!("{}{}", crate::session::LOCAL_PREFIX, prod_dir);
        let flavor = self.flavor().to_string();
        let table_path = abs.join("ups").join(format!("{}.table", product));

        let vars = substitution_vars(product, &version, &flavor, &prod_dir, "ups", "none");
        if table_path.is_file() {
            let table = Table::from_file(&table_path)?;
            let actions = table.evaluate(&flavor, self.build_type, &vars, self.env_snapshot);
            self.run_actions(product, &version, actions)?;
        }

        self.plan.actions.push(PlannedAction {
            product: product.to_string(),
            version: version.clone(),
            action: Action::EnvSet {
                var: SessionMarker::product_dir_var_name(product),
                value: prod_dir.clone(),
            },
        });
        self.plan.actions.push(PlannedAction {
            product: product.to_string(),
            version: version.clone(),
            action: Action::EnvSet {
                var: SessionMarker::env_var_name(product),
                value: SessionMarker {
                    product: product.to_string(),
                    version: version.clone(),
                    flavor: flavor.clone(),
                    stack_root: "none".to_string(),
                    tag: None,
                }
                .encode(),
            },
        });
        self.plan.products.push(ResolvedProduct {
            product: product.to_string(),
            version: version.clone(),
            flavor,
            stack_root: "none".to_string(),
            prod_dir,
            tag: None,
            local: true,
        });
        self.selected.insert(
            product.to_string(),
            Selected {
                version: version.clone(),
            },
        );
        Ok(version)
    }
}

/// Rebuilds the dependency tree an *active* product's `SETUP_<PRODUCT>`
/// implies, trusting the currently-exported markers rather than
/// re-evaluating version expressions -- the "traverses the recorded
/// graph" half of §4.4. Each child is found by looking for its own
/// `SETUP_<CHILD>` in `env_snapshot`; a child with no such marker is
/// assumed already torn down and is skipped with a warning, rather than
/// treated as a hard error, since a prior partial `unsetup` or manual
/// `unset` can legitimately produce that state.
pub fn resolve_unsetup(
    db: &DB,
    env_snapshot: &HashMap<String, String>,
    root_product: &str,
    root_marker: &SessionMarker,
) -> EupsResult<Plan> {
    let mut plan = Plan::default();
    let mut visiting = HashSet::new();
    visit_unsetup(db, env_snapshot, root_product, root_marker, &mut plan, &mut visiting);
    Ok(plan)
}

fn visit_unsetup(
    db: &DB,
    env_snapshot: &HashMap<String, String>,
    product: &str,
    marker: &SessionMarker,
    plan: &mut Plan,
    visiting: &mut HashSet<String>,
) {
    if visiting.contains(product) {
        return;
    }
    visiting.insert(product.to_string());

    let recorded_dir_var = SessionMarker::product_dir_var_name(product);
    let env_prod_dir = env_snapshot.get(&recorded_dir_var).cloned();

    let (prod_dir, ups_dir) = if marker.is_local() {
        (
            marker.local_dir().unwrap_or("").to_string(),
            "ups".to_string(),
        )
    } else {
        match db.locate_product(product, &marker.version, &marker.flavor) {
            Ok(record) => (record.prod_dir, record.ups_dir),
            Err(_) => (env_prod_dir.clone().unwrap_or_default(), "ups".to_string()),
        }
    };

    if let Some(env_dir) = &env_prod_dir {
        if *env_dir != prod_dir {
            plan.warnings.push(format!(
                "`{}`: recorded {} (`{}`) does not match current `{}` (`{}`)",
                product, recorded_dir_var, env_dir, recorded_dir_var, prod_dir
            ));
        }
    }

    let table_path = PathBuf::from(&prod_dir)
        .join(&ups_dir)
        .join(format!("{}.table", product));
    let mut children: Vec<(String, bool)> = vec![];
    if table_path.is_file() {
        if let Ok(table) = Table::from_file(&table_path) {
            let vars = substitution_vars(
                product,
                &marker.version,
                &marker.flavor,
                &prod_dir,
                &ups_dir,
                &marker.stack_root,
            );
            let actions = table.evaluate(&marker.flavor, None, &vars, env_snapshot);
            for action in actions {
                match action {
                    Action::SetupRequired { spec } => {
                        if let Some(parsed) = parse_setup_spec(&spec) {
                            children.push((parsed.product, true));
                        }
                    }
                    Action::SetupOptional { spec } => {
                        if let Some(parsed) = parse_setup_spec(&spec) {
                            children.push((parsed.product, false));
                        }
                    }
                    Action::Deprecated { .. } => {}
                    other => plan.actions.push(PlannedAction {
                        product: product.to_string(),
                        version: marker.version.clone(),
                        action: other,
                    }),
                }
            }
        }
    }

    plan.actions.push(PlannedAction {
        product: product.to_string(),
        version: marker.version.clone(),
        action: Action::EnvSet {
            var: recorded_dir_var,
            value: prod_dir.clone(),
        },
    });
    plan.actions.push(PlannedAction {
        product: product.to_string(),
        version: marker.version.clone(),
        action: Action::EnvSet {
            var: SessionMarker::env_var_name(product),
            value: marker.encode(),
        },
    });
    plan.products.push(ResolvedProduct {
        product: product.to_string(),
        version: marker.version.clone(),
        flavor: marker.flavor.clone(),
        stack_root: marker.stack_root.clone(),
        prod_dir,
        tag: marker.tag.clone(),
        local: marker.is_local(),
    });

    for (child, required) in children {
        let child_var = SessionMarker::env_var_name(&child);
        match env_snapshot
            .get(&child_var)
            .map(|v| SessionMarker::decode(&child.to_ascii_uppercase(), v))
        {
            Some(Ok(child_marker)) => {
                visit_unsetup(db, env_snapshot, &child, &child_marker, plan, visiting);
            }
            Some(Err(_)) => plan.warnings.push(format!(
                "`{}`: dependency `{}` has a malformed {} and was skipped",
                product, child, child_var
            )),
            None => {
                if required {
                    plan.warnings.push(format!(
                        "`{}`: required dependency `{}` is not currently setup",
                        product, child
                    ));
                }
            }
        }
    }

    visiting.remove(product);
}
