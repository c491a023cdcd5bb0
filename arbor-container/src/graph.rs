//! The build pass: dependency-graph validation fused with eager singleton
//! instantiation.
//!
//! A single depth-first, memoized walk over every unnamed provider detects
//! cycles and missing providers, and constructs each singleton exactly once
//! in dependency order — every singleton input is already cached before its
//! dependent's constructor runs. Named providers are validated for input
//! satisfiability only; their construction is deferred to resolution time.
//!
//! The pass is transactional: its output is committed by the container only
//! when the whole walk succeeds, so a partially built singleton can never
//! be observed.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::container::ResolveCtx;
use crate::error::{
    ArborError, CircularDependencyError, ProviderNotFoundError, ProviderSlot, Result,
};
use crate::key::TypeKey;
use crate::provider::{Closeable, ProviderRecord, SingletonEntry};
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Visiting,
    Visited,
}

/// What a successful pass hands back to the container.
pub(crate) struct BuildOutput {
    pub singletons: HashMap<TypeKey, SingletonEntry>,
    /// Closers in construction order; shutdown drains them in reverse.
    pub closers: Vec<Box<dyn Closeable>>,
}

impl fmt::Debug for BuildOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildOutput")
            .field("singletons", &self.singletons.keys().collect::<Vec<_>>())
            .field("closers", &self.closers.len())
            .finish()
    }
}

/// One-shot walk over the registry. Visitation state and the diagnostic
/// path stack live only as long as the pass.
pub(crate) struct BuildPass<'a> {
    registry: &'a Registry,
    states: HashMap<TypeKey, VisitState>,
    path: Vec<TypeKey>,
    singletons: HashMap<TypeKey, SingletonEntry>,
    closers: Vec<Box<dyn Closeable>>,
}

impl<'a> BuildPass<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            states: HashMap::new(),
            path: Vec::new(),
            singletons: HashMap::new(),
            closers: Vec::new(),
        }
    }

    pub fn run(mut self) -> Result<BuildOutput> {
        debug!(providers = self.registry.len(), "starting build pass");

        let keys: Vec<TypeKey> = self.registry.providers().keys().copied().collect();
        for key in keys {
            self.visit(key)?;
        }

        for (name, record) in self.registry.named_providers() {
            validate_named(self.registry, name, record)?;
        }

        debug!(
            singletons = self.singletons.len(),
            closers = self.closers.len(),
            "build pass complete"
        );
        Ok(BuildOutput {
            singletons: self.singletons,
            closers: self.closers,
        })
    }

    fn visit(&mut self, key: TypeKey) -> Result<()> {
        match self.states.get(&key) {
            Some(VisitState::Visited) => return Ok(()),
            Some(VisitState::Visiting) => return Err(self.cycle_error(key)),
            None => {}
        }

        let record = self.registry.get(&key).cloned().ok_or_else(|| {
            ArborError::ProviderNotFound(ProviderNotFoundError {
                slot: ProviderSlot::Type(key),
                required_by: self.path.last().copied(),
                owner: None,
            })
        })?;

        self.states.insert(key, VisitState::Visiting);
        self.path.push(key);

        for dep in &record.dependencies {
            self.visit(*dep)?;
        }

        if record.lifetime.is_singleton() {
            self.instantiate(&record)?;
        }

        self.path.pop();
        self.states.insert(key, VisitState::Visited);
        Ok(())
    }

    /// Runs the constructor with every singleton input already cached by the
    /// recursive visits, then caches the result.
    fn instantiate(&mut self, record: &ProviderRecord) -> Result<()> {
        let ctx = ResolveCtx::new(&self.singletons, self.registry);
        let boxed = (record.construct)(&ctx)?;
        let (entry, closer) = (record.cache)(boxed)?;

        debug!(key = %record.key, "singleton constructed");
        self.singletons.insert(record.key, entry);
        if let Some(closer) = closer {
            self.closers.push(closer);
        }
        Ok(())
    }

    /// Builds the cycle chain from the first still-in-progress ancestor
    /// through the repeated key.
    fn cycle_error(&self, key: TypeKey) -> ArborError {
        let start = self.path.iter().position(|k| *k == key).unwrap_or(0);
        let mut chain: Vec<TypeKey> = self.path[start..].to_vec();
        chain.push(key);

        warn!(cycle = ?chain, "circular dependency detected");
        ArborError::CircularDependency(CircularDependencyError { chain })
    }
}

/// Named providers are never built eagerly; only their declared inputs must
/// be satisfiable from the unnamed registry.
fn validate_named(registry: &Registry, name: &str, record: &ProviderRecord) -> Result<()> {
    for dep in &record.dependencies {
        if registry.get(dep).is_none() {
            return Err(ArborError::ProviderNotFound(ProviderNotFoundError {
                slot: ProviderSlot::Type(*dep),
                required_by: Some(record.key),
                owner: Some(name.to_owned()),
            }));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Options;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn registry_of(records: Vec<ProviderRecord>) -> Registry {
        let mut registry = Registry::new();
        for record in records {
            registry.register(record).unwrap();
        }
        registry
    }

    #[derive(Clone)]
    struct Leaf;
    #[derive(Clone)]
    struct Mid(#[allow(dead_code)] Leaf);
    #[derive(Clone)]
    struct Top(#[allow(dead_code)] Mid);

    fn new_leaf() -> Leaf {
        Leaf
    }
    fn new_mid(leaf: Leaf) -> Mid {
        Mid(leaf)
    }
    fn new_top(mid: Mid) -> Top {
        Top(mid)
    }

    #[test]
    fn valid_chain_builds_all_singletons() {
        let registry = registry_of(vec![
            ProviderRecord::new(new_leaf, None, Options::new()),
            ProviderRecord::new(new_mid, None, Options::new()),
            ProviderRecord::new(new_top, None, Options::new()),
        ]);

        let output = BuildPass::new(&registry).run().unwrap();
        assert_eq!(output.singletons.len(), 3);
        assert!(output.singletons.contains_key(&TypeKey::of::<Top>()));
    }

    #[test]
    fn singleton_constructed_exactly_once_in_dependency_order() {
        let order: Arc<std::sync::Mutex<Vec<&'static str>>> = Arc::default();

        let leaf_order = order.clone();
        let mid_order = order.clone();
        let registry = registry_of(vec![
            ProviderRecord::new(
                move || {
                    leaf_order.lock().unwrap().push("leaf");
                    Leaf
                },
                None,
                Options::new(),
            ),
            ProviderRecord::new(
                move |leaf: Leaf| {
                    mid_order.lock().unwrap().push("mid");
                    Mid(leaf)
                },
                None,
                Options::new(),
            ),
        ]);

        BuildPass::new(&registry).run().unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["leaf", "mid"]);
    }

    #[test]
    fn build_output_debug_lists_singletons() {
        let registry = registry_of(vec![ProviderRecord::new(new_leaf, None, Options::new())]);

        let output = BuildPass::new(&registry).run().unwrap();
        let debug = format!("{output:?}");
        assert!(debug.contains("BuildOutput"));
        assert!(debug.contains("Leaf"));
    }

    #[test]
    fn transient_validated_but_not_instantiated() {
        let calls = Arc::new(AtomicU32::new(0));
        let ctor_calls = calls.clone();

        let registry = registry_of(vec![ProviderRecord::new(
            move || {
                ctor_calls.fetch_add(1, Ordering::SeqCst);
                Leaf
            },
            None,
            Options::transient(),
        )]);

        let output = BuildPass::new(&registry).run().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(output.singletons.is_empty());
    }

    #[test]
    fn missing_dependency_reports_dependent() {
        let registry = registry_of(vec![ProviderRecord::new(new_mid, None, Options::new())]);

        let err = BuildPass::new(&registry).run().unwrap_err();
        match err {
            ArborError::ProviderNotFound(e) => {
                assert!(matches!(e.slot, ProviderSlot::Type(k) if k == TypeKey::of::<Leaf>()));
                assert_eq!(e.required_by, Some(TypeKey::of::<Mid>()));
            }
            other => panic!("expected ProviderNotFound, got: {other:?}"),
        }
    }

    #[derive(Clone)]
    struct CircA(#[allow(dead_code)] Box<CircB>);
    #[derive(Clone)]
    struct CircB(#[allow(dead_code)] Box<CircC>);
    #[derive(Clone)]
    struct CircC;

    #[test]
    fn cycle_detected_with_full_chain() {
        // A → B → C → A
        let registry = registry_of(vec![
            ProviderRecord::new(|b: CircB| CircA(Box::new(b)), None, Options::new()),
            ProviderRecord::new(|c: CircC| CircB(Box::new(c)), None, Options::new()),
            ProviderRecord::new(|_a: CircA| CircC, None, Options::new()),
        ]);

        let err = BuildPass::new(&registry).run().unwrap_err();
        match err {
            ArborError::CircularDependency(e) => {
                assert_eq!(e.chain.len(), 4);
                assert_eq!(e.chain.first(), e.chain.last());
                for key in [TypeKey::of::<CircA>(), TypeKey::of::<CircB>(), TypeKey::of::<CircC>()] {
                    assert!(e.chain.contains(&key), "chain missing {key}");
                }
            }
            other => panic!("expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn self_cycle_detected() {
        let registry = registry_of(vec![ProviderRecord::new(
            |leaf: Leaf| leaf,
            None,
            Options::new(),
        )]);

        let err = BuildPass::new(&registry).run().unwrap_err();
        assert!(matches!(err, ArborError::CircularDependency(_)));
    }

    #[derive(Clone)]
    struct DiaA;
    #[derive(Clone)]
    struct DiaB;
    #[derive(Clone)]
    struct DiaC;
    #[derive(Clone)]
    struct DiaD;

    #[test]
    fn diamond_is_not_a_cycle() {
        //     A
        //    / \
        //   B   C
        //    \ /
        //     D
        let registry = registry_of(vec![
            ProviderRecord::new(|| DiaD, None, Options::new()),
            ProviderRecord::new(|_d: DiaD| DiaB, None, Options::new()),
            ProviderRecord::new(|_d: DiaD| DiaC, None, Options::new()),
            ProviderRecord::new(|_b: DiaB, _c: DiaC| DiaA, None, Options::new()),
        ]);

        assert!(BuildPass::new(&registry).run().is_ok());
    }

    #[test]
    fn constructor_error_aborts_build_with_breadcrumb() {
        let registry = registry_of(vec![
            ProviderRecord::new(new_leaf, None, Options::new()),
            ProviderRecord::new(
                |_leaf: Leaf| -> std::result::Result<Mid, std::io::Error> {
                    Err(std::io::Error::other("connection failed"))
                },
                None,
                Options::new(),
            ),
        ]);

        let err = BuildPass::new(&registry).run().unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Mid"));
        assert!(msg.contains("connection failed"));
    }

    #[test]
    fn named_provider_missing_dependency_fails_validation() {
        let registry = registry_of(vec![ProviderRecord::new(
            new_mid,
            Some("special".to_owned()),
            Options::new(),
        )]);

        let err = BuildPass::new(&registry).run().unwrap_err();
        match err {
            ArborError::ProviderNotFound(e) => {
                assert_eq!(e.owner.as_deref(), Some("special"));
            }
            other => panic!("expected ProviderNotFound, got: {other:?}"),
        }
    }

    #[test]
    fn named_provider_never_instantiated_at_build() {
        let calls = Arc::new(AtomicU32::new(0));
        let ctor_calls = calls.clone();

        let registry = registry_of(vec![ProviderRecord::new(
            move || {
                ctor_calls.fetch_add(1, Ordering::SeqCst);
                Leaf
            },
            Some("lazy".to_owned()),
            Options::new(),
        )]);

        let output = BuildPass::new(&registry).run().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(output.singletons.is_empty());
    }
}
