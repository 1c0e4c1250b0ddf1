//! Standard-library modules and their initialization order.

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use crate::{ast::ExprRef, parser};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    #[error("module `{0}` is declared more than once")]
    Duplicate(String),
    #[error("module `{module}` depends on unknown module `{dependency}`")]
    UnknownDependency { module: String, dependency: String },
    #[error("dependency cycle between modules: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    #[error("module `{module}` failed to parse: {message}")]
    Source { module: String, message: String },
}

/// A named group of expressions run once when a context is bootstrapped.
///
/// `dependencies` must be initialized first. `runtime_dependencies` are only
/// looked up by name while the module's functions run, so they may point back
/// at modules that depend on this one.
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub dependencies: Vec<String>,
    pub runtime_dependencies: Vec<String>,
    pub expressions: Vec<ExprRef>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            runtime_dependencies: Vec::new(),
            expressions: Vec::new(),
        }
    }

    pub fn depends_on(mut self, names: &[&str]) -> Self {
        self.dependencies
            .extend(names.iter().map(|name| name.to_string()));
        self
    }

    pub fn uses_at_runtime(mut self, names: &[&str]) -> Self {
        self.runtime_dependencies
            .extend(names.iter().map(|name| name.to_string()));
        self
    }

    pub fn with_expressions(mut self, expressions: impl IntoIterator<Item = ExprRef>) -> Self {
        self.expressions.extend(expressions);
        self
    }

    /// Appends expressions written in the language itself. They are frozen so
    /// editors never offer to rewrite library code.
    pub fn with_source(mut self, source: &str) -> Result<Self, ModuleError> {
        let parsed = parser::parse(source);
        let Some(ast) = parsed.ast else {
            let message = parsed
                .errors()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ModuleError::Source {
                module: self.name,
                message,
            });
        };
        for expr in &ast {
            expr.mark_frozen();
        }
        self.expressions.extend(ast);
        Ok(self)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Orders modules so every hard dependency comes before its dependents.
/// Declaration order is kept where dependencies allow it.
pub fn initialization_order(modules: &[Module]) -> Result<Vec<&Module>, ModuleError> {
    let mut by_name: IndexMap<&str, &Module> = IndexMap::new();
    for module in modules {
        if by_name.insert(module.name.as_str(), module).is_some() {
            return Err(ModuleError::Duplicate(module.name.clone()));
        }
    }
    for module in modules {
        for dependency in module.dependencies.iter().chain(&module.runtime_dependencies) {
            if !by_name.contains_key(dependency.as_str()) {
                return Err(ModuleError::UnknownDependency {
                    module: module.name.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }

    let mut marks: IndexMap<&str, Mark> = IndexMap::new();
    let mut path: IndexSet<&str> = IndexSet::new();
    let mut order = Vec::with_capacity(modules.len());
    for module in modules {
        visit(module, &by_name, &mut marks, &mut path, &mut order)?;
    }
    Ok(order)
}

fn visit<'a>(
    module: &'a Module,
    by_name: &IndexMap<&'a str, &'a Module>,
    marks: &mut IndexMap<&'a str, Mark>,
    path: &mut IndexSet<&'a str>,
    order: &mut Vec<&'a Module>,
) -> Result<(), ModuleError> {
    match marks.get(module.name.as_str()) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            let start = path.get_index_of(module.name.as_str()).unwrap_or(0);
            let mut cycle: Vec<String> = path
                .iter()
                .skip(start)
                .map(|name| name.to_string())
                .collect();
            cycle.push(module.name.clone());
            return Err(ModuleError::Cycle(cycle));
        }
        None => {}
    }
    marks.insert(module.name.as_str(), Mark::Visiting);
    path.insert(module.name.as_str());
    for dependency in &module.dependencies {
        if let Some(dependency) = by_name.get(dependency.as_str()) {
            visit(*dependency, by_name, marks, path, order)?;
        }
    }
    path.pop();
    marks.insert(module.name.as_str(), Mark::Done);
    order.push(module);
    Ok(())
}
