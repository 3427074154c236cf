//! What validation needs to know about the world outside the document.
//!
//! Beans, their methods, classes and sibling flows live outside a flow
//! definition. The host supplies them through [`ValidationContext`];
//! [`StaticContext`] is an in-memory implementation for tests and tools
//! that already know the answers.

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::base::constants;

/// Shape of a resolved class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeShape {
    Concrete,
    Interface,
    Abstract,
}

impl TypeShape {
    pub fn is_instantiable(&self) -> bool {
        matches!(self, TypeShape::Concrete)
    }
}

/// Collaborator queried by the validation rules.
pub trait ValidationContext: Send + Sync {
    fn bean_exists(&self, name: &str) -> bool;

    /// Factory beans expose the product's methods, which are not checked.
    fn is_factory_bean(&self, _name: &str) -> bool {
        false
    }

    /// Names of the action methods a bean offers.
    fn bean_methods(&self, name: &str) -> Vec<SmolStr>;

    /// Resolve a fully qualified class name.
    fn resolve_type(&self, class_name: &str) -> Option<TypeShape>;

    /// True if a flow with this id is known outside the document.
    fn flow_exists(&self, flow_id: &str) -> bool;
}

/// Resolve a class-valued attribute: the alias table first, then the
/// context. Names that are not syntactically valid never resolve.
pub fn resolve_class(context: &dyn ValidationContext, name: &str) -> Option<TypeShape> {
    let class_name = constants::resolve_alias(name).unwrap_or(name);
    if !is_class_name(class_name) {
        return None;
    }
    context.resolve_type(class_name)
}

/// Dotted identifiers with an optional `[]` suffix and `$` for nested
/// classes.
pub fn is_class_name(name: &str) -> bool {
    let name = name.strip_suffix("[]").unwrap_or(name);
    !name.is_empty()
        && name.split(|c: char| c == '.' || c == '$').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| unicode_ident::is_xid_start(c) || c == '_')
                && chars.all(unicode_ident::is_xid_continue)
        })
}

// ============================================================================
// STATIC CONTEXT
// ============================================================================

/// In-memory [`ValidationContext`].
///
/// ```
/// use flowdef::validation::{StaticContext, TypeShape, ValidationContext};
///
/// let ctx = StaticContext::new()
///     .with_bean("orders", ["place", "cancel"])
///     .with_type("com.acme.Cart", TypeShape::Concrete)
///     .with_flow("shipping");
/// assert!(ctx.bean_exists("orders"));
/// assert!(ctx.flow_exists("shipping"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct StaticContext {
    beans: FxHashMap<SmolStr, Vec<SmolStr>>,
    factory_beans: FxHashSet<SmolStr>,
    types: FxHashMap<SmolStr, TypeShape>,
    flows: FxHashSet<SmolStr>,
}

impl StaticContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bean with its action methods.
    pub fn with_bean<I, S>(mut self, name: &str, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.beans.insert(
            SmolStr::new(name),
            methods.into_iter().map(|m| SmolStr::new(m.as_ref())).collect(),
        );
        self
    }

    /// Add a factory bean; its methods are not checked.
    pub fn with_factory_bean(mut self, name: &str) -> Self {
        self.beans.entry(SmolStr::new(name)).or_default();
        self.factory_beans.insert(SmolStr::new(name));
        self
    }

    pub fn with_type(mut self, class_name: &str, shape: TypeShape) -> Self {
        self.types.insert(SmolStr::new(class_name), shape);
        self
    }

    /// Register every alias target as a concrete type.
    pub fn with_alias_types(mut self) -> Self {
        for (_, class_name) in constants::TYPE_ALIASES {
            self.types.insert(SmolStr::new(class_name), TypeShape::Concrete);
        }
        self
    }

    pub fn with_flow(mut self, flow_id: &str) -> Self {
        self.flows.insert(SmolStr::new(flow_id));
        self
    }
}

impl ValidationContext for StaticContext {
    fn bean_exists(&self, name: &str) -> bool {
        self.beans.contains_key(name)
    }

    fn is_factory_bean(&self, name: &str) -> bool {
        self.factory_beans.contains(name)
    }

    fn bean_methods(&self, name: &str) -> Vec<SmolStr> {
        self.beans.get(name).cloned().unwrap_or_default()
    }

    fn resolve_type(&self, class_name: &str) -> Option<TypeShape> {
        self.types.get(class_name).copied()
    }

    fn flow_exists(&self, flow_id: &str) -> bool {
        self.flows.contains(flow_id)
    }
}
