//! Built-in tool adapters.

mod audit;
mod biome;
mod dependencies;
mod eslint;
mod generic;
mod prettier;
mod test_runner;
mod typescript;

pub(crate) use generic::GenericAdapter;
pub use generic::CommandAdapter;

use crate::registry::ToolRegistry;
use std::sync::Arc;

pub(crate) fn register_builtin(registry: &mut ToolRegistry) {
    registry.register(["eslint"], Arc::new(eslint::Eslint));
    registry.register(["biome", "@biomejs/biome"], Arc::new(biome::Biome));
    registry.register(["prettier"], Arc::new(prettier::Prettier));
    registry.register(["typescript", "tsc"], Arc::new(typescript::TypeScript));
    registry.register(["jest"], Arc::new(test_runner::TestRunner::Jest));
    registry.register(["vitest"], Arc::new(test_runner::TestRunner::Vitest));
    registry.register(["mocha"], Arc::new(test_runner::TestRunner::Mocha));
    registry.register(["npm-audit", "audit"], Arc::new(audit::NpmAudit));
    registry.register(["retire", "retirejs", "retire.js"], Arc::new(audit::Retire));
    registry.register(["madge"], Arc::new(dependencies::Madge));
    registry.register(["depcheck"], Arc::new(dependencies::Depcheck));
}
