//! Function library
//!
//! A function is a name, an argument count, and a [`FunctionHandler`] that
//! decides how its arguments are resolved. The resolver checks the argument
//! count before the handler runs.

pub mod passthrough;
pub mod reduce;

use std::fmt;
use std::sync::{Arc, OnceLock};

use ahash::AHashMap;

use crate::ast::Expr;
use crate::error::{Arity, FormulaResult};
use crate::resolver::ResolveContext;
use crate::value::{Comparison, ResolvedValue};

pub use passthrough::PassThrough;
pub use reduce::Extremum;

/// How a function's arguments are resolved
pub trait FunctionHandler: Send + Sync {
    /// Resolve a call to `name` with the given (unresolved) arguments
    fn resolve(
        &self,
        name: &str,
        args: &[Expr],
        ctx: &mut ResolveContext<'_>,
    ) -> FormulaResult<ResolvedValue>;
}

/// Function definition
#[derive(Clone)]
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: String,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub handler: Arc<dyn FunctionHandler>,
}

impl FunctionDef {
    pub fn new(
        name: &str,
        min_args: usize,
        max_args: Option<usize>,
        handler: impl FunctionHandler + 'static,
    ) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            min_args,
            max_args,
            handler: Arc::new(handler),
        }
    }

    pub fn arity(&self) -> Arity {
        Arity::from_bounds(self.min_args, self.max_args)
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("arity", &self.arity())
            .finish_non_exhaustive()
    }
}

/// Function registry
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

/// The built-in registry, shared by every resolver that is not given one
pub fn builtin_functions() -> &'static FunctionRegistry {
    static BUILTINS: OnceLock<FunctionRegistry> = OnceLock::new();
    BUILTINS.get_or_init(FunctionRegistry::new)
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_logical_functions();
        registry.register_math_functions();
        registry.register_lookup_functions();
        registry.register_date_functions();

        registry
    }

    /// Create a registry with no functions at all
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_ascii_uppercase())
    }

    /// Register a function, replacing any previous definition of the name
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.clone(), def);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    fn register_logical_functions(&mut self) {
        // IF resolves every branch; which one is taken is an evaluation concern
        self.register(FunctionDef::new("IF", 3, Some(3), PassThrough));
        self.register(FunctionDef::new("IFERROR", 2, Some(2), PassThrough));
        self.register(FunctionDef::new("AND", 1, None, PassThrough));
        self.register(FunctionDef::new("OR", 1, None, PassThrough));
        self.register(FunctionDef::new("NOT", 1, Some(1), PassThrough));
        self.register(FunctionDef::new("ISERROR", 1, Some(1), PassThrough));
    }

    fn register_math_functions(&mut self) {
        self.register(FunctionDef::new("SUM", 1, None, PassThrough));
        self.register(FunctionDef::new("AVERAGE", 1, None, PassThrough));
        self.register(FunctionDef::new("AVG", 1, None, PassThrough));
        self.register(FunctionDef::new("COUNT", 1, None, PassThrough));
        self.register(FunctionDef::new("ROUND", 2, Some(2), PassThrough));
        self.register(FunctionDef::new("PI", 0, Some(0), PassThrough));

        self.register(FunctionDef::new(
            "MAX",
            1,
            None,
            Extremum::new(Comparison::Greater),
        ));
        self.register(FunctionDef::new(
            "MIN",
            1,
            None,
            Extremum::new(Comparison::Less),
        ));
    }

    fn register_lookup_functions(&mut self) {
        self.register(FunctionDef::new("VLOOKUP", 3, Some(4), PassThrough));
    }

    fn register_date_functions(&mut self) {
        self.register(FunctionDef::new("DATE", 3, Some(3), PassThrough));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RECOGNIZED_FUNCTIONS;

    #[test]
    fn test_every_recognized_function_is_registered() {
        let registry = FunctionRegistry::new();
        for name in RECOGNIZED_FUNCTIONS {
            assert!(registry.contains(name), "{} is not registered", name);
        }
        assert_eq!(registry.len(), RECOGNIZED_FUNCTIONS.len());
    }

    #[test]
    fn test_arities() {
        let registry = builtin_functions();
        assert_eq!(registry.get("IF").map(FunctionDef::arity), Some(Arity::Exact(3)));
        assert_eq!(registry.get("iferror").map(FunctionDef::arity), Some(Arity::Exact(2)));
        assert_eq!(registry.get("SUM").map(FunctionDef::arity), Some(Arity::AtLeast(1)));
        assert_eq!(
            registry.get("VLOOKUP").map(FunctionDef::arity),
            Some(Arity::Between(3, 4))
        );
        assert_eq!(registry.get("PI").map(FunctionDef::arity), Some(Arity::Exact(0)));
        assert!(registry.get("LOOKUP").is_none());
    }

    #[test]
    fn test_custom_registry() {
        let mut registry = FunctionRegistry::empty();
        assert!(registry.is_empty());

        registry.register(FunctionDef::new("lookup", 2, Some(3), PassThrough));
        assert_eq!(registry.names(), vec!["LOOKUP"]);
        assert!(registry.contains("Lookup"));
    }
}
