use crate::Expr;
use num_complex::Complex64;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

/// Definition of a built-in function: numeric evaluation and derivative rule
#[derive(Clone)]
pub(crate) struct FunctionDefinition {
    /// Canonical name of the function (e.g., "sin", "sqrt")
    pub name: &'static str,

    /// Alternative spellings accepted by the parser
    pub aliases: &'static [&'static str],

    /// Principal-branch evaluation over the complex plane
    pub eval: fn(Complex64) -> Complex64,

    /// Symbolic derivative by the chain rule
    /// Arguments: (the function argument u, its derivative u')
    pub derivative: fn(&Expr, Expr) -> Expr,
}

/// Static registry storing all function definitions, keyed by every spelling
static REGISTRY: OnceLock<FxHashMap<&'static str, FunctionDefinition>> = OnceLock::new();

fn init_registry() -> FxHashMap<&'static str, FunctionDefinition> {
    let mut map = FxHashMap::default();

    for def in crate::functions::definitions::all_definitions() {
        for alias in def.aliases {
            map.insert(*alias, def.clone());
        }
        map.insert(def.name, def);
    }

    map
}

/// Central registry for getting function definitions
pub(crate) struct Registry;

impl Registry {
    /// Get a function definition by name or alias
    pub(crate) fn get(name: &str) -> Option<&'static FunctionDefinition> {
        REGISTRY.get_or_init(init_registry).get(name)
    }

    pub(crate) fn contains(name: &str) -> bool {
        Self::get(name).is_some()
    }

    /// Canonical spelling for `name`
    pub(crate) fn canonical(name: &str) -> Option<&'static str> {
        Self::get(name).map(|def| def.name)
    }
}
