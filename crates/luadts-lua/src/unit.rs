//! One source file and its three scan passes.
//!
//! Passes run in lockstep across every unit of a library:
//!
//! 1. [`SourceUnit::parse`] + [`SourceUnit::scan_requires`]
//! 2. [`SourceUnit::scan_globals`]: classes, tables and proxy aliases
//! 3. [`SourceUnit::scan_members`]: methods, static fields, global fields and
//!    free functions
//!
//! Pass 3 of any unit may attach members to a container declared by another
//! unit, which is why every unit finishes pass 2 first.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use luadts_core::naming::{module_key, namespace_path, sanitize_name};
use luadts_cst::{parse_chunk, prettify_error, Chunk, StatKind};

use crate::container::{Container, FreeFunction, GeneratedModel, Method, Signature, CONSTRUCTOR_NAME};
use crate::emit::{render_field, render_namespace_function, INDENT};
use crate::library::{Library, Registry};
use crate::overlay::{CallableModel, FieldModel, ModelDocument};
use crate::patterns::{
    match_derive, match_field_assigns, match_function_decl, match_proxy, match_table_literal,
    top_level_reassignments, DeclTarget, FieldAssign, RequireCollector,
};

/// Free function names that never become exported functions.
pub const RESERVED_FUNCTION_NAMES: &[&str] = &["new", "toString", "__tostring"];

#[derive(Debug, Clone)]
pub struct SourceUnit {
    path: String,
    id: String,
    namespace: String,
    text: String,
    chunk: Option<Chunk>,
    requires: Vec<String>,
    containers: BTreeSet<String>,
    proxies: BTreeMap<String, String>,
    fields: BTreeSet<String>,
    functions: BTreeMap<String, FreeFunction>,
}

impl SourceUnit {
    /// `path` is relative to the source root, with `/` separators.
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        let path = path.into();
        SourceUnit {
            id: module_key(&path),
            namespace: namespace_path(&path),
            path,
            text: text.into(),
            chunk: None,
            requires: Vec::new(),
            containers: BTreeSet::new(),
            proxies: BTreeMap::new(),
            fields: BTreeSet::new(),
            functions: BTreeMap::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Module key: the path without extension.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Dotted namespace for free fields and functions.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn is_parsed(&self) -> bool {
        self.chunk.is_some()
    }

    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    /// Names of containers this unit declared.
    pub fn containers(&self) -> &BTreeSet<String> {
        &self.containers
    }

    pub fn proxies(&self) -> &BTreeMap<String, String> {
        &self.proxies
    }

    pub fn global_fields(&self) -> &BTreeSet<String> {
        &self.fields
    }

    pub fn functions(&self) -> &BTreeMap<String, FreeFunction> {
        &self.functions
    }

    // ========================================================================
    // Passes
    // ========================================================================

    /// Parse the source text, discarding results of any earlier scan. On
    /// failure the unit keeps no tree and every later pass is a no-op; the
    /// error comes back rendered with source context.
    pub fn parse(&mut self) -> Result<(), String> {
        self.chunk = None;
        self.requires.clear();
        self.containers.clear();
        self.proxies.clear();
        self.fields.clear();
        self.functions.clear();
        match parse_chunk(&self.text) {
            Ok(chunk) => {
                self.chunk = Some(chunk);
                Ok(())
            }
            Err(e) => {
                let fixed = luadts_cst::apply_dialect_fixes(&self.text);
                Err(prettify_error(&e, &fixed, &self.path))
            }
        }
    }

    /// Pass 1: collect `require` paths, nested ones included.
    pub fn scan_requires(&mut self) {
        self.requires = match &self.chunk {
            Some(chunk) => RequireCollector::collect(chunk),
            None => Vec::new(),
        };
    }

    /// Pass 2: register classes and tables, record proxy aliases of classes.
    pub fn scan_globals(&mut self, registry: &mut Registry) {
        let Some(chunk) = &self.chunk else {
            return;
        };
        let reassigned = top_level_reassignments(chunk);
        let root = registry.root_class().to_string();

        for stat in &chunk.block.stats {
            if let Some(derive) = match_derive(stat) {
                let name = derive.class_name;
                if name == root {
                    registry.claim_root(&self.path);
                    self.containers.insert(name);
                } else if let Some(existing) = registry.class(&name) {
                    tracing::warn!(
                        "{}: class {} already declared in {}, keeping the first declaration",
                        self.path,
                        name,
                        existing.file.as_deref().unwrap_or("<root>")
                    );
                } else {
                    let class = Container::class(
                        name.clone(),
                        Some(derive.super_name),
                        Some(self.path.clone()),
                    )
                    .with_local(derive.is_local);
                    registry.insert_class(class);
                    self.containers.insert(name);
                }
                continue;
            }

            if let Some((name, is_local)) = match_table_literal(stat) {
                if name == root {
                    registry.claim_root(&self.path);
                    self.containers.insert(name);
                } else if reassigned.contains(&name) {
                    tracing::debug!("{}: {} is reassigned, not a table", self.path, name);
                } else if registry.table(&name).is_none() {
                    let table = Container::table(name.clone(), Some(self.path.clone()))
                        .with_local(is_local);
                    registry.insert_table(table);
                    self.containers.insert(name);
                }
                continue;
            }

            if let Some((alias, target)) = match_proxy(stat, |name| registry.is_class(name)) {
                self.proxies.insert(alias, target);
            }
        }
    }

    /// Pass 3: attach methods and static fields to containers, collect
    /// global fields and free functions.
    pub fn scan_members(&mut self, registry: &mut Registry) {
        let Some(chunk) = &self.chunk else {
            return;
        };
        let locals = top_level_locals(chunk);

        for stat in &chunk.block.stats {
            if let Some((target, body)) = match_function_decl(stat) {
                match target {
                    DeclTarget::Member {
                        container,
                        name,
                        is_static,
                    } => {
                        let resolved = self.proxies.get(&container).unwrap_or(&container);
                        let Some(owner) = registry.lookup_mut(resolved) else {
                            tracing::warn!(
                                "{}: dropping {}{}{}: no class or table named {} (expected `{} = Base:derive(..)` or `{} = {{}}`)",
                                self.path,
                                container,
                                if is_static { "." } else { ":" },
                                name,
                                resolved,
                                resolved,
                                resolved
                            );
                            continue;
                        };
                        if !is_static && name == CONSTRUCTOR_NAME && owner.is_class() {
                            owner.set_constructor(Method::new(name, body, false));
                        } else {
                            owner.add_method(Method::new(name, body, is_static));
                        }
                    }
                    DeclTarget::Free { name, is_local } => {
                        if RESERVED_FUNCTION_NAMES.contains(&name.as_str())
                            || registry.contains(&name)
                        {
                            continue;
                        }
                        let is_local = is_local || locals.contains(&name);
                        self.functions.insert(
                            name.clone(),
                            FreeFunction {
                                signature: Signature::from_body(name, body),
                                is_local,
                            },
                        );
                    }
                }
                continue;
            }

            for assign in match_field_assigns(stat) {
                match assign {
                    FieldAssign::Static { container, field } => {
                        let resolved = self.proxies.get(&container).unwrap_or(&container);
                        match registry.lookup_mut(resolved) {
                            Some(owner) => {
                                owner.add_field(&field, true);
                            }
                            None => tracing::warn!(
                                "{}: dropping field {}.{}: no class or table named {}",
                                self.path,
                                container,
                                field,
                                resolved
                            ),
                        }
                    }
                    FieldAssign::Global { name } => {
                        if !registry.contains(&name) && !locals.contains(&name) {
                            self.fields.insert(name);
                        }
                    }
                }
            }
        }

        // a name bound to a function is not also a field
        self.fields.retain(|name| !self.functions.contains_key(name));
    }

    // ========================================================================
    // Emission
    // ========================================================================

    /// Containers this unit still owns after the audit, sorted by name.
    fn owned_containers<'a>(&self, registry: &'a Registry) -> Vec<&'a Container> {
        self.containers
            .iter()
            .filter_map(|name| registry.lookup(name))
            .filter(|c| c.file.as_deref() == Some(self.path.as_str()))
            .collect()
    }

    fn exported_functions(&self) -> impl Iterator<Item = &FreeFunction> {
        self.functions.values().filter(|f| !f.is_local)
    }

    /// The per-file declaration, or `None` when the unit declares nothing.
    pub fn generate_definition_file(&self, lib: &Library) -> Option<String> {
        let config = lib.config();
        let containers = self.owned_containers(lib.registry());
        let has_namespace = !self.fields.is_empty() || self.exported_functions().next().is_some();
        if containers.is_empty() && !has_namespace {
            return None;
        }

        let depth = self.id.matches('/').count();
        let up = if depth == 0 {
            "./".to_string()
        } else {
            "../".repeat(depth)
        };

        let mut out = String::new();
        out.push_str("/** @noSelfInFile */\n");
        let _ = writeln!(out, "/// <reference path=\"{}{}\" />", up, config.reference_file);
        out.push('\n');
        let _ = writeln!(out, "declare module '{}' {{", config.module_name);

        let level1 = INDENT;
        let level2 = INDENT.repeat(2);
        if !containers.is_empty() {
            let _ = writeln!(out, "{}export namespace {} {{", level1, config.root_namespace);
            for (i, container) in containers.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                out.push_str(&container.compile(lib, &level2));
            }
            let _ = writeln!(out, "{}}}", level1);
        }
        if has_namespace {
            let _ = writeln!(out, "{}export namespace {} {{", level1, self.namespace);
            for name in &self.fields {
                let model = lib.global_field_model(&self.id, name);
                render_field(&mut out, &level2, "export let ", name, model);
            }
            for function in self.exported_functions() {
                let model = lib.function_model(&self.id, &function.signature.name);
                render_namespace_function(&mut out, &level2, &function.signature, model);
            }
            let _ = writeln!(out, "{}}}", level1);
        }
        out.push_str("}\n");
        Some(out)
    }

    /// Names this unit binds at runtime, with the type-side path of each:
    /// `(name, value path, is_type)`.
    fn exports(&self, lib: &Library) -> Vec<(String, String, bool)> {
        let root_ns = &lib.config().root_namespace;
        let mut exports = Vec::new();
        for container in self.owned_containers(lib.registry()) {
            if container.is_local {
                continue;
            }
            let name = sanitize_name(&container.name).into_owned();
            let path = format!("{}.{}", root_ns, name);
            exports.push((container.name.clone(), path, container.is_class()));
        }
        for name in &self.fields {
            let path = format!("{}.{}", self.namespace, sanitize_name(name));
            exports.push((name.clone(), path, false));
        }
        for function in self.exported_functions() {
            let name = &function.signature.name;
            let path = format!("{}.{}", self.namespace, sanitize_name(name));
            exports.push((name.clone(), path, false));
        }
        exports
    }

    /// This unit's lines of the public API partial. Names already in `seen`
    /// are skipped; new names are added.
    pub fn generate_api(&self, lib: &Library, seen: &mut BTreeSet<String>) -> String {
        let mut out = String::new();
        for (raw, path, is_type) in self.exports(lib) {
            let name = sanitize_name(&raw).into_owned();
            if !seen.insert(name.clone()) {
                tracing::debug!("{}: {} already exported, skipping in API", self.path, name);
                continue;
            }
            if out.is_empty() {
                let _ = writeln!(out, "/* {} */", self.path);
            }
            if is_type {
                let _ = writeln!(out, "export type {} = {};", name, path);
            }
            let _ = writeln!(out, "export declare const {}: typeof {};", name, path);
        }
        out
    }

    /// This unit's entries of the runtime binding table.
    pub fn generate_lua_interface(&self, lib: &Library, seen: &mut BTreeSet<String>) -> String {
        let mut out = String::new();
        for (raw, _, _) in self.exports(lib) {
            let name = sanitize_name(&raw).into_owned();
            if !seen.insert(name.clone()) {
                continue;
            }
            if out.is_empty() {
                let _ = writeln!(out, "{}-- {}", INDENT, self.path);
            }
            let _ = writeln!(out, "{}{} = '{}',", INDENT, name, raw);
        }
        out
    }

    /// Default overlay nodes for everything this unit declares.
    pub fn generate_model(&self, registry: &Registry) -> ModelDocument {
        let mut document = ModelDocument::default();
        for container in self.owned_containers(registry) {
            match container.generate_model() {
                GeneratedModel::Class(model) => {
                    document.classes.insert(container.name.clone(), model);
                }
                GeneratedModel::Table(model) => {
                    document.tables.insert(container.name.clone(), model);
                }
            }
        }
        for name in &self.fields {
            document
                .global_fields
                .insert(name.clone(), FieldModel::default());
        }
        for function in self.exported_functions() {
            document.global_functions.insert(
                function.signature.name.clone(),
                CallableModel::for_params(&function.signature.params),
            );
        }
        document
    }
}

/// Every name declared `local` at file top level.
fn top_level_locals(chunk: &Chunk) -> BTreeSet<String> {
    let mut locals = BTreeSet::new();
    for stat in &chunk.block.stats {
        match &stat.kind {
            StatKind::Local { names, .. } => locals.extend(names.iter().cloned()),
            StatKind::LocalFunction { name, .. } => {
                locals.insert(name.clone());
            }
            _ => {}
        }
    }
    locals
}
