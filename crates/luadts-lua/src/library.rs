//! The whole-tree analysis: registry, passes, overlay lookups and output.
//!
//! A [`Library`] owns every [`SourceUnit`], the [`Registry`] of containers
//! the units populate, and the overlay [`ModelStore`]. [`Library::parse`]
//! runs the passes with hard barriers between them; [`Library::generate`]
//! renders every output surface from the result.
//!
//! ```
//! use luadts_core::config::GeneratorConfig;
//! use luadts_lua::Library;
//!
//! let mut lib = Library::new(GeneratorConfig::default()).unwrap();
//! lib.add_source("client/Foo.lua", "Foo = ISBaseObject:derive(\"Foo\")\n");
//! lib.parse();
//! let output = lib.generate();
//! assert!(output.declarations["client/Foo.d.ts"].contains("export class Foo"));
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use luadts_core::config::{ConfigError, GeneratorConfig};
use luadts_core::files::{collect_files, read_relative, ExcludeFilter, FileError};
use luadts_core::naming::module_key;
use serde::Serialize;
use thiserror::Error;

use crate::container::Container;
use crate::order::{order_units, DependencyOrder, OrderError};
use crate::overlay::{
    test_signature, CallableModel, ClassModel, ContainerModel, FieldModel, ModelDocument,
    ModelError, ModelStore, SaveReport, TableModel,
};
use crate::unit::SourceUnit;

/// Source file extension.
pub const SOURCE_EXTENSION: &str = "lua";

/// Markers framing the API partial.
pub const PARTIAL_START: &str = "// [PARTIAL:START]";
pub const PARTIAL_STOP: &str = "// [PARTIAL:STOP]";

/// Errors from library-level operations.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Order(#[from] OrderError),
}

pub type LibraryResult<T> = Result<T, LibraryError>;

// ============================================================================
// Registry
// ============================================================================

/// Every class and table, keyed by name.
///
/// Classes and tables live in separate maps until the audit removes tables
/// that collide with a class. Lookups prefer the class.
#[derive(Debug, Clone)]
pub struct Registry {
    root: String,
    classes: BTreeMap<String, Container>,
    tables: BTreeMap<String, Container>,
}

impl Registry {
    /// A registry seeded with the synthetic root class.
    pub fn with_root(root: &str) -> Self {
        let mut classes = BTreeMap::new();
        classes.insert(root.to_string(), Container::class(root, None, None));
        Registry {
            root: root.to_string(),
            classes,
            tables: BTreeMap::new(),
        }
    }

    pub fn root_class(&self) -> &str {
        &self.root
    }

    /// Attribute the root class to the file that declares it. The first
    /// claim wins.
    pub fn claim_root(&mut self, path: &str) {
        let Some(root) = self.classes.get_mut(&self.root) else {
            return;
        };
        if let Some(existing) = &root.file {
            if existing != path {
                tracing::warn!(
                    "{}: root class {} already declared in {}",
                    path,
                    root.name,
                    existing
                );
            }
            return;
        }
        root.file = Some(path.to_string());
    }

    pub fn class(&self, name: &str) -> Option<&Container> {
        self.classes.get(name)
    }

    pub fn table(&self, name: &str) -> Option<&Container> {
        self.tables.get(name)
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name) || self.tables.contains_key(name)
    }

    /// The class named `name`, else the table.
    pub fn lookup(&self, name: &str) -> Option<&Container> {
        self.classes.get(name).or_else(|| self.tables.get(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Container> {
        match self.classes.get_mut(name) {
            Some(class) => Some(class),
            None => self.tables.get_mut(name),
        }
    }

    pub fn insert_class(&mut self, class: Container) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn insert_table(&mut self, table: Container) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn classes(&self) -> impl Iterator<Item = &Container> {
        self.classes.values()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Container> {
        self.tables.values()
    }

    fn containers_mut(&mut self) -> impl Iterator<Item = &mut Container> {
        self.classes.values_mut().chain(self.tables.values_mut())
    }

    /// Ancestors of `container` along resolved superclass links, nearest
    /// first. Stops at an unresolved link or a loop.
    pub fn superclass_chain(&self, container: &Container) -> Vec<&Container> {
        let mut chain = Vec::new();
        let mut visited = BTreeSet::new();
        visited.insert(container.name.clone());
        let mut next = container.superclass();
        while let Some(name) = next {
            if !visited.insert(name.to_string()) {
                tracing::warn!("{}: superclass loop at {}", container.name, name);
                break;
            }
            let Some(class) = self.classes.get(name) else {
                break;
            };
            chain.push(class);
            next = class.superclass();
        }
        chain
    }

    /// Names of every field and method declared up the emitted part of the
    /// chain. Collection stops at the first ancestor no file declares, the
    /// same point where [`Registry::emitted_superclass`] stops extending.
    pub fn inherited_member_names(&self, container: &Container) -> BTreeSet<String> {
        self.superclass_chain(container)
            .into_iter()
            .take_while(|class| class.file.is_some())
            .flat_map(|class| class.member_names().map(str::to_string))
            .collect()
    }

    /// The superclass to render in `extends`, if it is declared in a file.
    pub fn emitted_superclass(&self, container: &Container) -> Option<&str> {
        let class = self.classes.get(container.superclass()?)?;
        class.file.is_some().then_some(class.name.as_str())
    }
}

// ============================================================================
// Reports and output
// ============================================================================

/// A unit that could not be read or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUnit {
    pub path: String,
    pub message: String,
}

/// Summary of the last [`Library::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    pub parsed: usize,
    pub failed: Vec<FailedUnit>,
    pub classes: usize,
    pub tables: usize,
    /// Callable overlays whose parameter ids matched.
    pub overlay_matched: usize,
    /// Callable overlays ignored because their parameter ids did not match.
    pub overlay_ignored: usize,
}

/// Every output surface, keyed by path relative to the output directory
/// where it is a file of its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedOutput {
    /// `<unit id>.d.ts` to contents.
    pub declarations: BTreeMap<String, String>,
    pub reference: String,
    pub bindings: String,
    pub api: String,
}

impl GeneratedOutput {
    /// All files with their paths, declarations first.
    pub fn files<'a>(&'a self, config: &'a GeneratorConfig) -> Vec<(&'a str, &'a str)> {
        let mut files: Vec<(&str, &str)> = self
            .declarations
            .iter()
            .map(|(path, text)| (path.as_str(), text.as_str()))
            .collect();
        files.push((config.reference_file.as_str(), self.reference.as_str()));
        files.push((config.bindings_file.as_str(), self.bindings.as_str()));
        files.push((config.api_file.as_str(), self.api.as_str()));
        files
    }
}

// ============================================================================
// Library
// ============================================================================

#[derive(Debug)]
pub struct Library {
    config: GeneratorConfig,
    units: Vec<SourceUnit>,
    unit_index: BTreeMap<String, usize>,
    registry: Registry,
    models: ModelStore,
    report: ParseReport,
    read_failures: Vec<FailedUnit>,
}

impl Library {
    pub fn new(config: GeneratorConfig) -> LibraryResult<Self> {
        config.validate()?;
        let registry = Registry::with_root(&config.root_class);
        Ok(Library {
            config,
            units: Vec::new(),
            unit_index: BTreeMap::new(),
            registry,
            models: ModelStore::new(),
            report: ParseReport::default(),
            read_failures: Vec::new(),
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn models(&self) -> &ModelStore {
        &self.models
    }

    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    pub fn unit(&self, id: &str) -> Option<&SourceUnit> {
        self.unit_index.get(id).map(|&i| &self.units[i])
    }

    pub fn report(&self) -> &ParseReport {
        &self.report
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    /// Sorted `.lua` paths below `root`, relative and `/`-separated.
    pub fn scan(&self, root: &Path) -> LibraryResult<Vec<String>> {
        let filter = ExcludeFilter::new(&self.config.exclude)?;
        Ok(collect_files(
            root,
            &self.config.subtrees,
            SOURCE_EXTENSION,
            &filter,
        )?)
    }

    /// Scan `root` and read every source. Unreadable files are reported in
    /// the next [`ParseReport`] and otherwise skipped. Returns the number of
    /// sources added.
    pub fn load_sources(&mut self, root: &Path) -> LibraryResult<usize> {
        let paths = self.scan(root)?;
        let mut added = 0;
        for path in paths {
            match read_relative(root, &path) {
                Ok(text) => {
                    self.add_source(path, text);
                    added += 1;
                }
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path, e);
                    self.read_failures.push(FailedUnit {
                        path,
                        message: e.to_string(),
                    });
                }
            }
        }
        tracing::debug!("loaded {} sources from {}", added, root.display());
        Ok(added)
    }

    /// Add a source, replacing any earlier one with the same path.
    pub fn add_source(&mut self, path: impl Into<String>, text: impl Into<String>) {
        let unit = SourceUnit::new(path, text);
        match self.units.iter_mut().find(|u| u.path() == unit.path()) {
            Some(existing) => *existing = unit,
            None => self.units.push(unit),
        }
    }

    pub fn set_models(&mut self, models: ModelStore) {
        self.models = models;
    }

    /// Load overlay documents from `dir`. Broken documents are skipped.
    pub fn load_models(&mut self, dir: &Path) -> LibraryResult<()> {
        self.models = ModelStore::load_dir(dir)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Analysis
    // ------------------------------------------------------------------------

    /// Run every pass over every unit. Calling it again starts over.
    pub fn parse(&mut self) {
        self.registry = Registry::with_root(&self.config.root_class);
        self.report = ParseReport {
            failed: self.read_failures.clone(),
            ..Default::default()
        };
        self.units.sort_by(|a, b| a.path().cmp(b.path()));
        self.unit_index = self
            .units
            .iter()
            .enumerate()
            .map(|(i, unit)| (unit.id().to_string(), i))
            .collect();

        // ====================================================================
        // Pass 1: parse and collect requires
        // ====================================================================
        for unit in &mut self.units {
            match unit.parse() {
                Ok(()) => {
                    unit.scan_requires();
                    self.report.parsed += 1;
                }
                Err(message) => {
                    tracing::warn!("skipping unparsable source\n{}", message);
                    self.report.failed.push(FailedUnit {
                        path: unit.path().to_string(),
                        message,
                    });
                }
            }
        }
        tracing::debug!("pass 1: parsed {} units", self.report.parsed);

        // ====================================================================
        // Pass 2: classes, tables, proxies
        // ====================================================================
        for unit in &mut self.units {
            unit.scan_globals(&mut self.registry);
        }
        tracing::debug!(
            "pass 2: {} classes, {} tables",
            self.registry.classes.len(),
            self.registry.tables.len()
        );

        // ====================================================================
        // Pass 3: members
        // ====================================================================
        for unit in &mut self.units {
            unit.scan_members(&mut self.registry);
        }

        for container in self.registry.containers_mut() {
            container.infer_fields();
        }
        self.link_classes();
        self.audit();
        self.merge_overlay();

        self.report.classes = self.registry.classes.len();
        self.report.tables = self.registry.tables.len();
        tracing::info!(
            "parsed {} units ({} failed): {} classes, {} tables",
            self.report.parsed,
            self.report.failed.len(),
            self.report.classes,
            self.report.tables
        );
    }

    /// Resolve every class's superclass name: a registered class, else a
    /// proxy alias of one in any unit.
    fn link_classes(&mut self) {
        let pending: Vec<(String, String)> = self
            .registry
            .classes
            .values()
            .filter_map(|class| {
                let super_name = class.class_info()?.super_name.clone()?;
                Some((class.name.clone(), super_name))
            })
            .collect();

        for (name, super_name) in pending {
            let resolved = if self.registry.is_class(&super_name) {
                Some(super_name.clone())
            } else {
                self.units.iter().find_map(|unit| {
                    unit.proxies()
                        .get(&super_name)
                        .filter(|target| self.registry.is_class(target))
                        .cloned()
                })
            };
            let resolved = match resolved {
                Some(target) if target == name => {
                    tracing::warn!("class {} derives from itself, emitting without superclass", name);
                    None
                }
                Some(target) => Some(target),
                None => {
                    tracing::warn!(
                        "class {}: superclass {} not found (expected `{} = Base:derive(\"{}\")`), emitting without superclass",
                        name,
                        super_name,
                        super_name,
                        super_name
                    );
                    None
                }
            };
            if let Some(info) = self
                .registry
                .classes
                .get_mut(&name)
                .and_then(Container::class_info_mut)
            {
                info.superclass = resolved;
            }
        }
    }

    /// Drop tables named like a class, then fields named like a method.
    fn audit(&mut self) {
        let colliding: Vec<String> = self
            .registry
            .tables
            .keys()
            .filter(|name| self.registry.classes.contains_key(*name))
            .cloned()
            .collect();
        for name in colliding {
            tracing::debug!("audit: table {} collides with class, dropping table", name);
            self.registry.tables.remove(&name);
        }
        for container in self.registry.containers_mut() {
            let removed = container.remove_shadowed_fields();
            if !removed.is_empty() {
                tracing::debug!(
                    "audit: {} fields shadowed by methods: {}",
                    container.name,
                    removed.join(", ")
                );
            }
        }
    }

    /// Count callable overlays that apply and that are ignored.
    fn merge_overlay(&mut self) {
        let mut matched = 0;
        let mut ignored = 0;
        let mut tally = |model: Option<&CallableModel>, ok: bool| match model {
            Some(_) if ok => matched += 1,
            Some(_) => ignored += 1,
            None => {}
        };

        for container in self.registry.classes().chain(self.registry.tables()) {
            let Some((_, model)) = self.container_model(&container.name) else {
                continue;
            };
            for method in container.methods.values() {
                let node = model.methods().get(method.name());
                tally(node, node.is_some_and(|n| test_signature(n, &method.signature)));
            }
            if let Some(constructor) = container.constructor() {
                let node = model.constructor();
                tally(node, node.is_some_and(|n| test_signature(n, &constructor.signature)));
            }
        }
        for unit in &self.units {
            let Some(document) = self.models.document(unit.id()) else {
                continue;
            };
            for function in unit.functions().values() {
                let node = document.global_functions.get(&function.signature.name);
                tally(node, node.is_some_and(|n| test_signature(n, &function.signature)));
            }
        }

        self.report.overlay_matched = matched;
        self.report.overlay_ignored = ignored;
        if ignored > 0 {
            tracing::debug!("{} callable overlays ignored on signature mismatch", ignored);
        }
    }

    // ------------------------------------------------------------------------
    // Overlay lookups
    // ------------------------------------------------------------------------

    fn document_for(&self, container: &Container) -> Option<&ModelDocument> {
        let file = container.file.as_deref()?;
        self.models.document(&module_key(file))
    }

    fn container_model(&self, name: &str) -> Option<(&Container, &dyn ContainerModel)> {
        let container = self.registry.lookup(name)?;
        let document = self.document_for(container)?;
        let model = if container.is_class() {
            document.classes.get(name)? as &dyn ContainerModel
        } else {
            document.tables.get(name)? as &dyn ContainerModel
        };
        Some((container, model))
    }

    pub fn class_model(&self, name: &str) -> Option<&ClassModel> {
        let class = self.registry.class(name)?;
        self.document_for(class)?.classes.get(name)
    }

    pub fn table_model(&self, name: &str) -> Option<&TableModel> {
        if self.registry.is_class(name) {
            return None;
        }
        let table = self.registry.table(name)?;
        self.document_for(table)?.tables.get(name)
    }

    pub fn field_model(&self, container: &str, field: &str) -> Option<&FieldModel> {
        let (_, model) = self.container_model(container)?;
        model.fields().get(field)
    }

    /// The method overlay, if its parameter ids match the inferred method.
    pub fn method_model(&self, container: &str, method: &str) -> Option<&CallableModel> {
        let (owner, model) = self.container_model(container)?;
        let inferred = owner.methods.get(method)?;
        let node = model.methods().get(method)?;
        test_signature(node, &inferred.signature).then_some(node)
    }

    pub fn constructor_model(&self, class: &str) -> Option<&CallableModel> {
        let (owner, model) = self.container_model(class)?;
        let inferred = owner.constructor()?;
        let node = model.constructor()?;
        test_signature(node, &inferred.signature).then_some(node)
    }

    pub fn function_model(&self, unit_id: &str, name: &str) -> Option<&CallableModel> {
        let inferred = self.unit(unit_id)?.functions().get(name)?;
        let node = self.models.document(unit_id)?.global_functions.get(name)?;
        test_signature(node, &inferred.signature).then_some(node)
    }

    pub fn global_field_model(&self, unit_id: &str, name: &str) -> Option<&FieldModel> {
        self.models.document(unit_id)?.global_fields.get(name)
    }

    // ------------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------------

    /// Render every output surface.
    pub fn generate(&self) -> GeneratedOutput {
        let mut output = GeneratedOutput::default();
        let mut api_seen = BTreeSet::new();
        let mut binding_seen = BTreeSet::new();
        let mut api_body = String::new();
        let mut binding_body = String::new();

        for unit in self.units.iter().filter(|u| u.is_parsed()) {
            if let Some(text) = unit.generate_definition_file(self) {
                output
                    .declarations
                    .insert(format!("{}.d.ts", unit.id()), text);
            }
            api_body.push_str(&unit.generate_api(self, &mut api_seen));
            binding_body.push_str(&unit.generate_lua_interface(self, &mut binding_seen));
        }

        for path in output.declarations.keys() {
            output
                .reference
                .push_str(&format!("/// <reference path=\"{}\" />\n", path));
        }

        output.api = format!("{}\n{}{}\n", PARTIAL_START, api_body, PARTIAL_STOP);
        output.bindings = render_bindings(&binding_body);
        tracing::debug!(
            "generated {} declaration files, {} bound names",
            output.declarations.len(),
            binding_seen.len()
        );
        output
    }

    /// Units ordered so each follows the units it requires.
    pub fn dependency_order(&self) -> LibraryResult<DependencyOrder> {
        let units: Vec<(String, Vec<String>)> = self
            .units
            .iter()
            .filter(|u| u.is_parsed())
            .map(|u| (u.id().to_string(), u.requires().to_vec()))
            .collect();
        let cap = self.config.order_iteration_cap(units.len());
        Ok(order_units(&units, cap)?)
    }

    // ------------------------------------------------------------------------
    // Editor surface
    // ------------------------------------------------------------------------

    /// Add a default overlay node for every inferred entity that has none.
    /// Existing nodes are left untouched. Returns the number of documents
    /// touched.
    pub fn populate_models(&mut self) -> usize {
        let mut touched = 0;
        for unit in self.units.iter().filter(|u| u.is_parsed()) {
            let generated = unit.generate_model(&self.registry);
            if generated.is_empty() {
                continue;
            }
            self.models.document_mut(unit.id()).fill_from(generated);
            touched += 1;
        }
        tracing::debug!("populated {} model documents", touched);
        touched
    }

    /// Write overlays to `dir` in minimal form.
    pub fn save_models(&self, dir: &Path) -> LibraryResult<SaveReport> {
        Ok(self.models.save_dir(dir)?)
    }
}

fn render_bindings(entries: &str) -> String {
    let mut out = String::new();
    out.push_str("local Exports = {}\n\n");
    out.push_str("local Bindings = {\n");
    out.push_str(entries);
    out.push_str("}\n\n");
    out.push_str("setmetatable(Exports, {\n");
    out.push_str("  __index = function(_, key)\n");
    out.push_str("    local name = Bindings[key]\n");
    out.push_str("    if name == nil then\n");
    out.push_str("      return nil\n");
    out.push_str("    end\n");
    out.push_str("    return _G[name]\n");
    out.push_str("  end,\n");
    out.push_str("})\n\n");
    out.push_str("return Exports\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library(sources: &[(&str, &str)]) -> Library {
        let mut lib = Library::new(GeneratorConfig::default()).unwrap();
        for (path, text) in sources {
            lib.add_source(*path, *text);
        }
        lib.parse();
        lib
    }

    #[test]
    fn test_registry_lookup_prefers_class() {
        let mut registry = Registry::with_root("Root");
        registry.insert_table(Container::table("Foo", None));
        registry.insert_class(Container::class("Foo", Some("Root".into()), None));
        assert!(registry.lookup("Foo").unwrap().is_class());
        assert!(registry.contains("Root"));
        assert!(!registry.contains("Bar"));
    }

    #[test]
    fn test_superclass_chain_stops_on_loop() {
        let mut registry = Registry::with_root("Root");
        let mut a = Container::class("A", Some("B".into()), None);
        a.class_info_mut().unwrap().superclass = Some("B".into());
        let mut b = Container::class("B", Some("A".into()), None);
        b.class_info_mut().unwrap().superclass = Some("A".into());
        registry.insert_class(a);
        registry.insert_class(b);
        let a = registry.class("A").unwrap();
        let chain: Vec<&str> = registry
            .superclass_chain(a)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(chain, vec!["B"]);
    }

    #[test]
    fn test_link_through_proxy() {
        let lib = library(&[
            ("client/Base.lua", "Base = ISBaseObject:derive(\"Base\")\n"),
            ("client/Child.lua", "local B = Base\nChild = B:derive(\"Child\")\n"),
        ]);
        let child = lib.registry().class("Child").unwrap();
        assert_eq!(child.superclass(), Some("Base"));
    }

    #[test]
    fn test_unresolved_superclass_is_tolerated() {
        let lib = library(&[("client/Orphan.lua", "Orphan = Nowhere:derive(\"Orphan\")\n")]);
        let orphan = lib.registry().class("Orphan").unwrap();
        assert_eq!(orphan.superclass(), None);
        let output = lib.generate();
        assert!(output.declarations["client/Orphan.d.ts"].contains("export class Orphan {"));
    }

    #[test]
    fn test_audit_drops_colliding_table() {
        let lib = library(&[
            ("client/A.lua", "Thing = ISBaseObject:derive(\"Thing\")\n"),
            ("client/B.lua", "Thing = {}\n"),
        ]);
        assert!(lib.registry().table("Thing").is_none());
        assert!(lib.registry().class("Thing").is_some());
        assert!(!lib.generate().declarations.contains_key("client/B.d.ts"));
    }

    #[test]
    fn test_render_bindings_shape() {
        let text = render_bindings("  -- client/Foo.lua\n  Foo = 'Foo',\n");
        assert!(text.starts_with("local Exports = {}\n\nlocal Bindings = {\n  -- client/Foo.lua\n"));
        assert!(text.contains("return _G[name]"));
        assert!(text.ends_with("return Exports\n"));
    }

    #[test]
    fn test_parse_report_counts() {
        let lib = library(&[
            ("client/Good.lua", "Good = {}\n"),
            ("client/Bad.lua", "function (\n"),
        ]);
        let report = lib.report();
        assert_eq!(report.parsed, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, "client/Bad.lua");
        assert_eq!(report.tables, 1);
        assert_eq!(report.classes, 1);
    }
}
