//! Ordering of renderer providers by their delegate declarations.
//!
//! A provider that declares delegates must be registered after those
//! delegates, so its handlers wrap theirs.

use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::RenderError;
use crate::handler::{NodeRendererFactory, ProviderKind};

/// Provider plus the lazily computed set of providers it must follow.
pub struct DelegatingFactoryWrapper {
    factory: Arc<dyn NodeRendererFactory>,
    providers: Option<Rc<[ProviderKind]>>,
    before: Option<HashSet<ProviderKind>>,
}

impl DelegatingFactoryWrapper {
    /// Wrap `factory`; `providers` lists the kinds of every provider in the session.
    pub fn new(providers: Rc<[ProviderKind]>, factory: Arc<dyn NodeRendererFactory>) -> Self {
        Self {
            factory,
            providers: Some(providers),
            before: None,
        }
    }

    #[must_use]
    pub fn factory(&self) -> &Arc<dyn NodeRendererFactory> {
        &self.factory
    }

    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        self.factory.kind()
    }

    /// Providers in the session whose kind this provider declares as delegate.
    ///
    /// Computed on first call; the provider list is released afterwards and
    /// later calls return the same result. `None` when the provider declares
    /// no delegates.
    pub fn before_dependents(&mut self) -> Option<&HashSet<ProviderKind>> {
        if self.before.is_none()
            && let Some(providers) = self.providers.take()
            && let Some(delegates) = self.factory.delegates()
        {
            let own = self.kind();
            self.before = Some(
                providers
                    .iter()
                    .filter(|kind| **kind != own && delegates.contains(kind))
                    .copied()
                    .collect(),
            );
        }
        self.before.as_ref()
    }

    /// Whether the session provider list is still referenced.
    #[must_use]
    pub fn holds_provider_list(&self) -> bool {
        self.providers.is_some()
    }
}

/// Order providers so that every provider follows its delegates.
///
/// Unrelated providers keep their input order.
///
/// # Errors
///
/// Returns `RenderError::ProviderCycle` when delegate declarations are cyclic.
pub fn resolve_order(
    factories: &[Arc<dyn NodeRendererFactory>],
) -> Result<Vec<DelegatingFactoryWrapper>, RenderError> {
    let kinds: Rc<[ProviderKind]> = factories.iter().map(|f| f.kind()).collect();
    let mut wrappers: Vec<DelegatingFactoryWrapper> = factories
        .iter()
        .map(|f| DelegatingFactoryWrapper::new(Rc::clone(&kinds), Arc::clone(f)))
        .collect();

    // Indices of the providers each provider has to wait for.
    let waits_for: Vec<Vec<usize>> = wrappers
        .iter_mut()
        .map(|wrapper| match wrapper.before_dependents() {
            Some(before) => kinds
                .iter()
                .enumerate()
                .filter(|(_, kind)| before.contains(kind))
                .map(|(index, _)| index)
                .collect(),
            None => Vec::new(),
        })
        .collect();

    let mut placed = vec![false; wrappers.len()];
    let mut order = Vec::with_capacity(wrappers.len());
    while order.len() < wrappers.len() {
        let ready = (0..wrappers.len())
            .find(|&i| !placed[i] && waits_for[i].iter().all(|&j| placed[j]));
        let Some(next) = ready else {
            let cycle = (0..wrappers.len())
                .filter(|&i| !placed[i])
                .map(|i| kinds[i])
                .collect();
            return Err(RenderError::ProviderCycle(cycle));
        };
        placed[next] = true;
        order.push(next);
    }

    tracing::debug!(
        order = ?order.iter().map(|&i| kinds[i].name()).collect::<Vec<_>>(),
        "Resolved renderer provider order"
    );

    let mut slots: Vec<Option<DelegatingFactoryWrapper>> = wrappers.drain(..).map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use mdita_config::OptionSource;

    use super::*;
    use crate::handler::NodeRenderingHandler;

    struct Provider {
        name: &'static str,
        delegates: Option<&'static [&'static str]>,
    }

    impl NodeRendererFactory for Provider {
        fn kind(&self) -> ProviderKind {
            ProviderKind::new(self.name)
        }

        fn create(&self, _options: &dyn OptionSource) -> Vec<NodeRenderingHandler> {
            Vec::new()
        }

        fn delegates(&self) -> Option<HashSet<ProviderKind>> {
            self.delegates
                .map(|names| names.iter().copied().map(ProviderKind::new).collect())
        }
    }

    fn provider(
        name: &'static str,
        delegates: Option<&'static [&'static str]>,
    ) -> Arc<dyn NodeRendererFactory> {
        Arc::new(Provider { name, delegates })
    }

    fn names(wrappers: &[DelegatingFactoryWrapper]) -> Vec<&'static str> {
        wrappers.iter().map(|w| w.kind().name()).collect()
    }

    #[test]
    fn test_before_set_is_subset_of_session() {
        let kinds: Rc<[ProviderKind]> = ["a", "b", "c"].map(ProviderKind::new).into();
        let mut wrapper = DelegatingFactoryWrapper::new(
            kinds,
            provider("c", Some(&["a", "missing"])),
        );
        let before = wrapper.before_dependents().cloned();
        assert_eq!(before, Some(HashSet::from([ProviderKind::new("a")])));
        assert!(!wrapper.holds_provider_list());
        assert_eq!(wrapper.before_dependents().cloned(), before);
    }

    #[test]
    fn test_no_delegates_is_absent_not_empty() {
        let kinds: Rc<[ProviderKind]> = ["a", "b"].map(ProviderKind::new).into();
        let mut absent = DelegatingFactoryWrapper::new(Rc::clone(&kinds), provider("a", None));
        let mut empty = DelegatingFactoryWrapper::new(kinds, provider("b", Some(&[])));

        assert!(absent.before_dependents().is_none());
        assert!(!absent.holds_provider_list());
        assert_eq!(empty.before_dependents().map(HashSet::len), Some(0));
    }

    #[test]
    fn test_delegate_registered_first() {
        let factories = [provider("b", Some(&["a"])), provider("a", None)];
        let order = resolve_order(&factories).unwrap();
        assert_eq!(names(&order), vec!["a", "b"]);
    }

    #[test]
    fn test_unrelated_providers_keep_input_order() {
        let factories = [
            provider("x", None),
            provider("c", Some(&["a", "b"])),
            provider("b", Some(&["a"])),
            provider("a", None),
            provider("y", None),
        ];
        let order = resolve_order(&factories).unwrap();
        assert_eq!(names(&order), vec!["x", "a", "b", "c", "y"]);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let factories = [
            provider("c", Some(&["a"])),
            provider("a", None),
            provider("b", Some(&["a", "c"])),
        ];
        let first = names(&resolve_order(&factories).unwrap());
        for _ in 0..10 {
            assert_eq!(names(&resolve_order(&factories).unwrap()), first);
        }
    }

    #[test]
    fn test_self_delegate_ignored() {
        let factories = [provider("a", Some(&["a"]))];
        let order = resolve_order(&factories).unwrap();
        assert_eq!(names(&order), vec!["a"]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let factories = [
            provider("free", None),
            provider("a", Some(&["b"])),
            provider("b", Some(&["a"])),
        ];
        let err = resolve_order(&factories).err().unwrap();
        match err {
            RenderError::ProviderCycle(kinds) => {
                assert_eq!(kinds, vec![ProviderKind::new("a"), ProviderKind::new("b")]);
            }
            other => panic!("expected ProviderCycle, got {other:?}"),
        }
    }
}
