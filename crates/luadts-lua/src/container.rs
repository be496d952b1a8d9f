//! The inferred entity model: containers and their members.
//!
//! A [`Container`] is either a class (declared through `derive`) or a plain
//! table (`Name = {}`). Both own name-keyed maps of fields and methods; a
//! class additionally knows its superclass by name and may have a
//! constructor.
//!
//! Superclass links are names, not references. The library resolves them
//! after every file has been scanned, so a subclass may be declared before
//! its superclass.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use luadts_core::naming::sanitize_name;
use luadts_cst::FuncBody;

use crate::emit::{
    render_constructor, render_field, render_member_callable, DocBlock, INDENT, INDEX_SIGNATURE,
};
use crate::library::Library;
use crate::overlay::{CallableModel, ClassModel, ContainerModel, FieldModel, TableModel};
use crate::params::body_params;
use crate::patterns::{constructor_receiver, FieldScanner};

/// Name given to constructors.
pub const CONSTRUCTOR_NAME: &str = "new";

// ============================================================================
// Members
// ============================================================================

/// Name plus normalized parameter ids; the identity overlays match on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<String>,
}

impl Signature {
    pub fn from_body(name: impl Into<String>, body: &FuncBody) -> Self {
        Signature {
            name: name.into(),
            params: body_params(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    /// Name of the owning container.
    pub owner: String,
    pub is_static: bool,
}

/// A method or constructor. The body is kept for field inference.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub signature: Signature,
    pub is_static: bool,
    pub body: FuncBody,
}

impl Method {
    pub fn new(name: impl Into<String>, body: &FuncBody, is_static: bool) -> Self {
        Method {
            signature: Signature::from_body(name, body),
            is_static,
            body: body.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }
}

/// A file-scoped function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeFunction {
    pub signature: Signature,
    pub is_local: bool,
}

/// Borrowed view over any member, in emission order.
#[derive(Debug, Clone, Copy)]
pub enum Member<'a> {
    Field(&'a Field),
    Method(&'a Method),
    Constructor(&'a Method),
}

impl<'a> Member<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            Member::Field(field) => &field.name,
            Member::Method(method) | Member::Constructor(method) => method.name(),
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            Member::Field(field) => field.is_static,
            Member::Method(method) => method.is_static,
            Member::Constructor(_) => false,
        }
    }
}

// ============================================================================
// Containers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassInfo {
    /// Superclass name as written in the `derive` call.
    pub super_name: Option<String>,
    /// Registered class the superclass name resolved to.
    pub superclass: Option<String>,
    pub constructor: Option<Method>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContainerKind {
    Class(ClassInfo),
    Table,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub name: String,
    /// Relative path of the declaring file; `None` for the synthetic root
    /// class until a file claims it.
    pub file: Option<String>,
    pub is_local: bool,
    pub fields: BTreeMap<String, Field>,
    pub methods: BTreeMap<String, Method>,
    pub kind: ContainerKind,
}

/// A default overlay node for one container.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedModel {
    Class(ClassModel),
    Table(TableModel),
}

impl Container {
    pub fn class(name: impl Into<String>, super_name: Option<String>, file: Option<String>) -> Self {
        Container {
            name: name.into(),
            file,
            is_local: false,
            fields: BTreeMap::new(),
            methods: BTreeMap::new(),
            kind: ContainerKind::Class(ClassInfo {
                super_name,
                ..Default::default()
            }),
        }
    }

    pub fn table(name: impl Into<String>, file: Option<String>) -> Self {
        Container {
            name: name.into(),
            file,
            is_local: false,
            fields: BTreeMap::new(),
            methods: BTreeMap::new(),
            kind: ContainerKind::Table,
        }
    }

    pub fn with_local(mut self, is_local: bool) -> Self {
        self.is_local = is_local;
        self
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, ContainerKind::Class(_))
    }

    pub fn class_info(&self) -> Option<&ClassInfo> {
        match &self.kind {
            ContainerKind::Class(info) => Some(info),
            ContainerKind::Table => None,
        }
    }

    pub fn class_info_mut(&mut self) -> Option<&mut ClassInfo> {
        match &mut self.kind {
            ContainerKind::Class(info) => Some(info),
            ContainerKind::Table => None,
        }
    }

    pub fn constructor(&self) -> Option<&Method> {
        self.class_info().and_then(|info| info.constructor.as_ref())
    }

    /// Resolved superclass name.
    pub fn superclass(&self) -> Option<&str> {
        self.class_info().and_then(|info| info.superclass.as_deref())
    }

    /// Add a field unless one with the same name exists. Returns whether it
    /// was added.
    pub fn add_field(&mut self, name: &str, is_static: bool) -> bool {
        if self.fields.contains_key(name) {
            return false;
        }
        self.fields.insert(
            name.to_string(),
            Field {
                name: name.to_string(),
                owner: self.name.clone(),
                is_static,
            },
        );
        true
    }

    /// Add a method; a later declaration with the same name replaces the
    /// earlier one, as it would at runtime.
    pub fn add_method(&mut self, method: Method) {
        if self.methods.contains_key(method.name()) {
            tracing::debug!("{}: method {} redeclared", self.name, method.name());
        }
        self.methods.insert(method.name().to_string(), method);
    }

    /// Install a constructor. Returns false for tables.
    pub fn set_constructor(&mut self, constructor: Method) -> bool {
        match self.class_info_mut() {
            Some(info) => {
                info.constructor = Some(constructor);
                true
            }
            None => false,
        }
    }

    /// Scan the constructor and every method body for field assignments.
    ///
    /// The constructor's receiver is the local it returns (`self` when it
    /// returns none); methods use `self`. Static fields are always written
    /// through the container name.
    pub fn infer_fields(&mut self) {
        let mut found = Vec::new();
        if let Some(constructor) = self.constructor() {
            let receiver = constructor_receiver(&constructor.body);
            found.extend(FieldScanner::collect(&constructor.body, receiver, &self.name));
        }
        for method in self.methods.values() {
            found.extend(FieldScanner::collect(&method.body, "self", &self.name));
        }
        for field in found {
            self.add_field(&field.name, field.is_static);
        }
    }

    /// Remove fields shadowed by a method or the constructor. Returns the
    /// removed names.
    pub fn remove_shadowed_fields(&mut self) -> Vec<String> {
        let has_constructor = self.constructor().is_some();
        let shadowed: Vec<String> = self
            .fields
            .keys()
            .filter(|name| {
                self.methods.contains_key(*name)
                    || (has_constructor && name.as_str() == CONSTRUCTOR_NAME)
            })
            .cloned()
            .collect();
        for name in &shadowed {
            self.fields.remove(name);
        }
        shadowed
    }

    /// Names of every field and method (constructor excluded).
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .keys()
            .chain(self.methods.keys())
            .map(String::as_str)
    }

    /// Members in emission order: static fields, instance fields,
    /// constructor, instance methods, static methods. Each group is
    /// alphabetical; names in `suppressed` are left out (the constructor is
    /// never suppressed).
    pub fn ordered_members(&self, suppressed: &BTreeSet<String>) -> Vec<Member<'_>> {
        let keep = |name: &str| !suppressed.contains(name);
        let mut members = Vec::new();
        for is_static in [true, false] {
            members.extend(
                self.fields
                    .values()
                    .filter(|f| f.is_static == is_static && keep(f.name.as_str()))
                    .map(Member::Field),
            );
        }
        if let Some(constructor) = self.constructor() {
            members.push(Member::Constructor(constructor));
        }
        for is_static in [false, true] {
            members.extend(
                self.methods
                    .values()
                    .filter(|m| m.is_static == is_static && keep(m.name()))
                    .map(Member::Method),
            );
        }
        members
    }

    // ------------------------------------------------------------------------
    // Emission
    // ------------------------------------------------------------------------

    /// Render the container declaration at indentation `prefix`.
    pub fn compile(&self, lib: &Library, prefix: &str) -> String {
        let mut out = String::new();
        let name = sanitize_name(&self.name);
        let model: Option<&dyn ContainerModel> = if self.is_class() {
            lib.class_model(&self.name).map(|m| m as &dyn ContainerModel)
        } else {
            lib.table_model(&self.name).map(|m| m as &dyn ContainerModel)
        };
        if let Some(model) = model {
            DocBlock::from_documentation(model.documentation()).render(&mut out, prefix);
        }

        let suppressed = lib.registry().inherited_member_names(self);
        let members = self.ordered_members(&suppressed);

        let (open, close) = if self.is_class() {
            let extends = lib
                .registry()
                .emitted_superclass(self)
                .map(|s| format!(" extends {}", sanitize_name(s)))
                .unwrap_or_default();
            (format!("export class {}{} {{", name, extends), "}")
        } else {
            (format!("export const {}: {{", name), "};")
        };

        if members.is_empty() {
            let _ = writeln!(out, "{}{} {} {}", prefix, open, INDEX_SIGNATURE, close);
            return out;
        }

        let _ = writeln!(out, "{}{}", prefix, open);
        let inner = format!("{}{}", prefix, INDENT);
        for member in members {
            // `static` only means something inside a class body
            let keyword = if self.is_class() && member.is_static() {
                "static "
            } else {
                ""
            };
            match member {
                Member::Field(field) => {
                    let model = lib.field_model(&self.name, &field.name);
                    render_field(&mut out, &inner, keyword, &field.name, model);
                }
                Member::Method(method) => {
                    let model = lib.method_model(&self.name, method.name());
                    render_member_callable(&mut out, &inner, keyword, &method.signature, model);
                }
                Member::Constructor(constructor) => {
                    let model = lib.constructor_model(&self.name);
                    render_constructor(&mut out, &inner, &constructor.signature, model);
                }
            }
        }
        let _ = writeln!(out, "{}{}", prefix, close);
        out
    }

    /// A default overlay node covering every member.
    pub fn generate_model(&self) -> GeneratedModel {
        let fields: BTreeMap<String, FieldModel> = self
            .fields
            .keys()
            .map(|name| (name.clone(), FieldModel::default()))
            .collect();
        let methods: BTreeMap<String, CallableModel> = self
            .methods
            .values()
            .map(|m| (m.name().to_string(), CallableModel::for_params(&m.signature.params)))
            .collect();
        match &self.kind {
            ContainerKind::Class(info) => GeneratedModel::Class(ClassModel {
                fields,
                methods,
                constructor: info
                    .constructor
                    .as_ref()
                    .map(|c| CallableModel::for_params(&c.signature.params)),
                ..Default::default()
            }),
            ContainerKind::Table => GeneratedModel::Table(TableModel {
                fields,
                methods,
                ..Default::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luadts_cst::{parse_chunk, StatKind};

    fn body(source: &str) -> FuncBody {
        match parse_chunk(source).unwrap().block.stats.remove(0).kind {
            StatKind::Function { body, .. } => body,
            other => panic!("expected function, got {:?}", other),
        }
    }

    fn sample() -> Container {
        let mut foo = Container::class("Foo", Some("Base".into()), Some("client/Foo.lua".into()));
        foo.add_method(Method::new("zeta", &body("function f() end"), false));
        foo.add_method(Method::new("alpha", &body("function f() end"), false));
        foo.add_method(Method::new("make", &body("function f() end"), true));
        foo.set_constructor(Method::new("new", &body("function f(x) end"), false));
        foo.add_field("b", false);
        foo.add_field("a", false);
        foo.add_field("COUNT", true);
        foo
    }

    #[test]
    fn test_ordered_members() {
        let foo = sample();
        let names: Vec<&str> = foo
            .ordered_members(&BTreeSet::new())
            .iter()
            .map(|m| m.name())
            .collect();
        assert_eq!(names, vec!["COUNT", "a", "b", "new", "alpha", "zeta", "make"]);
    }

    #[test]
    fn test_ordered_members_suppressed() {
        let foo = sample();
        let suppressed: BTreeSet<String> = ["a".to_string(), "alpha".to_string(), "new".to_string()]
            .into_iter()
            .collect();
        let names: Vec<&str> = foo
            .ordered_members(&suppressed)
            .iter()
            .map(|m| m.name())
            .collect();
        assert_eq!(names, vec!["COUNT", "b", "new", "zeta", "make"]);
    }

    #[test]
    fn test_add_field_first_seen_wins() {
        let mut foo = Container::table("Foo", None);
        assert!(foo.add_field("x", true));
        assert!(!foo.add_field("x", false));
        assert!(foo.fields["x"].is_static);
        assert_eq!(foo.fields["x"].owner, "Foo");
    }

    #[test]
    fn test_remove_shadowed_fields() {
        let mut foo = sample();
        foo.add_field("alpha", false);
        foo.add_field("new", false);
        let removed = foo.remove_shadowed_fields();
        assert_eq!(removed, vec!["alpha", "new"]);
        assert!(!foo.fields.contains_key("alpha"));
        assert!(foo.methods.contains_key("alpha"));
    }

    #[test]
    fn test_tables_have_no_constructor() {
        let mut bar = Container::table("Bar", None);
        assert!(!bar.set_constructor(Method::new("new", &body("function f() end"), false)));
        assert!(bar.constructor().is_none());
    }

    #[test]
    fn test_infer_fields_from_constructor_and_methods() {
        let mut foo = Container::class("Foo", None, None);
        foo.set_constructor(Method::new(
            "new",
            &body("function Foo:new()\n local o = {}\n o.width = 1\n return o\nend"),
            false,
        ));
        foo.add_method(Method::new(
            "bar",
            &body("function Foo:bar(a)\n self.x = a\n Foo.instances = 1\nend"),
            false,
        ));
        foo.infer_fields();
        assert!(!foo.fields["width"].is_static);
        assert!(!foo.fields["x"].is_static);
        assert!(foo.fields["instances"].is_static);
    }

    #[test]
    fn test_generate_model_defaults() {
        let foo = sample();
        let GeneratedModel::Class(model) = foo.generate_model() else {
            panic!("expected class model");
        };
        assert!(model.is_default());
        assert_eq!(model.methods["alpha"].parameters.len(), 0);
        assert_eq!(model.constructor.unwrap().parameters[0].id, "x");
        assert_eq!(model.fields.len(), 3);
    }
}
