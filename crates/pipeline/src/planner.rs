use codeguard_discovery::Provider;
use codeguard_protocol::{Capability, Category, ExecutionRequest};
use std::path::Path;
use std::sync::Arc;

/// Which capability ids may run in a category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ToolSelection {
    #[default]
    All,
    Only(Vec<String>),
}

impl ToolSelection {
    /// A list containing `"*"` selects everything.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        if ids.iter().any(|id| id == "*") {
            Self::All
        } else {
            Self::Only(ids)
        }
    }

    pub fn allows(&self, id: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(ids) => ids.iter().any(|allowed| allowed == id),
        }
    }
}

/// Requests for every enabled capability of `category`, mutators first.
/// Relative order inside each group follows provider order, then
/// capability order.
pub fn plan_category(
    providers: &[Arc<dyn Provider>],
    category: Category,
    cwd: &Path,
    enabled: &ToolSelection,
) -> Vec<ExecutionRequest> {
    let matching = providers.iter().flat_map(|provider| {
        provider
            .capabilities()
            .iter()
            .filter(move |cap| cap.category == category)
            .map(move |cap| (provider.name(), cap))
    });
    mutators_first(matching.filter(|(_, cap)| enabled.allows(&cap.id)), cwd)
}

/// Requests for every capability of one provider, mutators first.
pub fn plan_provider(provider: &dyn Provider, cwd: &Path) -> Vec<ExecutionRequest> {
    let name = provider.name();
    mutators_first(provider.capabilities().iter().map(|cap| (name, cap)), cwd)
}

fn mutators_first<'a>(
    pairs: impl Iterator<Item = (&'a str, &'a Capability)>,
    cwd: &Path,
) -> Vec<ExecutionRequest> {
    let (mut mutators, readers): (Vec<_>, Vec<_>) = pairs
        .filter_map(|(provider, cap)| match cap.default_command() {
            Some(command) => Some(ExecutionRequest::new(provider, cap, command, cwd)),
            None => {
                log::warn!("Capability {} of {provider} has no commands; skipping", cap.id);
                None
            }
        })
        .partition(|request| request.mutates);
    mutators.extend(readers);
    mutators
}
