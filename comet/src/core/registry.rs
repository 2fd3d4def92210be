//! The system registry.
//!
//! The [`Registry`] owns every declared system. Each system type receives a dense [`Id`] at
//! declaration time, and the registry keeps per-id bitsets of which systems are lazy, internal and
//! initialized.
//!
//! # Construction
//!
//! Eager systems are constructed inside [`Registry::declare`]. Lazy systems (and every internal
//! system) are constructed the first time another system resolves them, which can only happen
//! from inside a constructor through [`Dependencies::resolve`]. The registry keeps a stack of the
//! systems currently under construction:
//!
//! - resolving with an empty stack fails with [`Error::DependencyOutsideConstructor`]
//! - resolving the system on top of the stack fails with [`Error::SelfDependency`]
//! - resolving any other system on the stack fails with [`Error::CircularDependency`]
//!
//! Every successful resolution appends an [`Edge`]. Edges of a freshly constructed dependency are
//! appended after its own dependencies' edges, so replaying them in order initializes the deepest
//! systems first.
//!
//! # Example
//!
//! ```rust,ignore
//! impl System for Toolbar {
//!     fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
//!         // Constructs `Gui` now if it was declared lazy and nobody needed it yet.
//!         let gui = deps.resolve::<Gui>()?;
//!         Ok(Self { gui })
//!     }
//! }
//! ```

use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};

use fixedbitset::FixedBitSet;

use crate::core::{
    capability::{Capability, implements},
    error::{Error, Result},
    state::AppState,
    system::{Id, Lifecycle, System, SystemConfig, SystemRef},
    tasks::CancelToken,
    tracker::{Trackable, Tracker},
};

type Construct = fn(&mut Dependencies<'_>) -> anyhow::Result<Instance>;
type Start = fn(Arc<dyn Any + Send + Sync>, &'static str, CancelToken) -> anyhow::Result<()>;

struct Declaration {
    name: &'static str,
    construct: Construct,
    start: Start,
}

/// A constructed system, viewed both as its concrete type and as a [`Lifecycle`].
struct Instance {
    any: Arc<dyn Any + Send + Sync>,
    lifecycle: Arc<Mutex<dyn Lifecycle>>,
}

fn construct<T: System>(deps: &mut Dependencies<'_>) -> anyhow::Result<Instance> {
    let system = Arc::new(Mutex::new(T::new(deps)?));
    Ok(Instance {
        any: system.clone(),
        lifecycle: system,
    })
}

fn start<T: System>(
    any: Arc<dyn Any + Send + Sync>,
    name: &'static str,
    cancel: CancelToken,
) -> anyhow::Result<()> {
    let inner = any
        .downcast::<Mutex<T>>()
        .map_err(|_| Error::InvalidSystem(name))?;
    T::run_start(SystemRef::new(name, inner), cancel)
}

/// The `on_start` hook of a constructed system, bound to its instance.
///
/// Running it does not lock the system. See [`OnStart`](crate::core::OnStart).
pub struct Starter {
    name: &'static str,
    any: Arc<dyn Any + Send + Sync>,
    start: Start,
}

impl Starter {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn run(self, cancel: CancelToken) -> anyhow::Result<()> {
        (self.start)(self.any, self.name, cancel)
    }
}

impl fmt::Debug for Starter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Starter").field("name", &self.name).finish()
    }
}

/// `a::b::Foo<c::Bar>` becomes `Foo<c::Bar>`.
fn short_name(full: &'static str) -> &'static str {
    let head = full.find('<').map_or(full, |generics| &full[..generics]);
    match head.rfind("::") {
        Some(separator) => &full[separator + 2..],
        None => full,
    }
}

/// A recorded resolution: `dependent`'s constructor resolved `dependency`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Edge {
    pub dependent: Id,
    pub dependency: Id,
}

/// Owner of every declared system.
#[derive(Default)]
pub struct Registry {
    ids: HashMap<TypeId, Id>,
    declarations: Vec<Declaration>,
    instances: Vec<Option<Instance>>,
    // Ids in the order they finished constructing
    constructed: Vec<Id>,
    lazy: FixedBitSet,
    internal: FixedBitSet,
    initialized: FixedBitSet,
    edges: Vec<Edge>,
    // Systems whose constructors are currently running, innermost last
    stack: Vec<Id>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a system type.
    ///
    /// Internal systems and systems declared with [`SystemConfig::lazy`] are only recorded.
    /// Anything else is constructed before this returns.
    pub fn declare<T: System>(
        &mut self,
        state: &Arc<AppState>,
        internal: bool,
        config: SystemConfig,
    ) -> Result<Id> {
        let name = short_name(type_name::<T>());
        let type_id = TypeId::of::<T>();
        if self.ids.contains_key(&type_id) {
            return Err(Error::DuplicateSystem(name));
        }

        let id = Id::new(self.declarations.len() as u32);
        self.ids.insert(type_id, id);
        self.declarations.push(Declaration {
            name,
            construct: construct::<T>,
            start: start::<T>,
        });
        self.instances.push(None);

        let len = self.declarations.len();
        self.lazy.grow(len);
        self.internal.grow(len);
        self.initialized.grow(len);

        if internal {
            self.internal.insert(id.index());
        }
        if internal || config.lazy {
            self.lazy.insert(id.index());
            log::trace!("Declared lazy System ({name})");
            return Ok(id);
        }

        log::trace!("Declared System ({name})");
        self.construct(id, state)?;
        Ok(id)
    }

    /// Resolve `T` on behalf of the system currently under construction.
    ///
    /// Constructs `T` first if it is lazy and was not needed before.
    pub fn resolve<T: System>(&mut self, state: &Arc<AppState>) -> Result<SystemRef<T>> {
        let name = short_name(type_name::<T>());
        let Some(&dependent) = self.stack.last() else {
            return Err(Error::DependencyOutsideConstructor);
        };
        let Some(id) = self.id_of::<T>() else {
            return Err(Error::SystemNotFound(name));
        };
        if id == dependent {
            return Err(Error::SelfDependency(name));
        }

        if self.instances[id.index()].is_none() {
            if let Some(position) = self.stack.iter().position(|&open| open == id) {
                let mut chain: Vec<&'static str> = self.stack[position..]
                    .iter()
                    .map(|&open| self.name(open))
                    .collect();
                chain.push(name);
                return Err(Error::CircularDependency(chain));
            }
            if !self.lazy.contains(id.index()) {
                return Err(Error::InvalidSystem(name));
            }
            self.construct(id, state)?;
        }

        let system = self.get::<T>().ok_or(Error::InvalidSystem(name))?;
        self.edges.push(Edge {
            dependent,
            dependency: id,
        });
        log::trace!(
            "Resolved dependency ({} depends on {name})",
            self.name(dependent)
        );
        Ok(system)
    }

    fn construct(&mut self, id: Id, state: &Arc<AppState>) -> Result<()> {
        let Declaration {
            name, construct, ..
        } = self.declarations[id.index()];
        let internal = self.internal.contains(id.index());

        self.stack.push(id);
        let result = construct(&mut Dependencies {
            registry: &mut *self,
            state,
            internal,
        });
        self.stack.pop();

        // Contract violations from nested resolution keep their own variant.
        let instance = result.map_err(|source| match source.downcast::<Error>() {
            Ok(error) => error,
            Err(source) => Error::Construction {
                system: name,
                source,
            },
        })?;

        self.instances[id.index()] = Some(instance);
        self.constructed.push(id);
        log::trace!("Constructed System ({name})");
        Ok(())
    }

    /// Run the `on_init` hook of a system unless it already ran.
    ///
    /// Returns `true` if the system was initialized by this call.
    pub fn initialize(&mut self, id: Id) -> Result<bool> {
        let name = self.name(id);
        if self.initialized.put(id.index()) {
            return Ok(false);
        }

        let instance = self
            .instances
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(Error::SystemNotFound(name))?;

        let mut system = instance.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        if implements(&*system, Capability::Init) {
            if let Some(hook) = system.as_on_init() {
                hook.on_init();
            }
        }
        log::trace!("Initialized System ({name})");
        Ok(true)
    }

    /// A handle to a constructed system.
    pub fn get<T: System>(&self) -> Option<SystemRef<T>> {
        let id = self.id_of::<T>()?;
        let instance = self.instances[id.index()].as_ref()?;
        let inner = Arc::clone(&instance.any).downcast::<Mutex<T>>().ok()?;
        Some(SystemRef::new(self.name(id), inner))
    }

    /// The id `T` was declared under.
    pub fn id_of<T: 'static>(&self) -> Option<Id> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    /// The short type name of a declared system.
    ///
    /// # Panics
    /// If `id` was not issued by this registry.
    pub fn name(&self, id: Id) -> &'static str {
        self.declarations[id.index()].name
    }

    /// Returns `true` if `id` refers to a constructed system.
    pub fn is_constructed(&self, id: Id) -> bool {
        self.instances
            .get(id.index())
            .is_some_and(|instance| instance.is_some())
    }

    pub fn is_lazy(&self, id: Id) -> bool {
        self.lazy.contains(id.index())
    }

    pub fn is_internal(&self, id: Id) -> bool {
        self.internal.contains(id.index())
    }

    pub fn is_initialized(&self, id: Id) -> bool {
        self.initialized.contains(id.index())
    }

    /// Recorded resolutions in the order they completed.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Constructed systems in construction order.
    pub fn constructed(&self) -> &[Id] {
        &self.constructed
    }

    /// The lifecycle view of a constructed system.
    pub fn lifecycle(&self, id: Id) -> Option<SystemRef<dyn Lifecycle>> {
        let instance = self.instances.get(id.index())?.as_ref()?;
        Some(SystemRef::new(
            self.name(id),
            Arc::clone(&instance.lifecycle),
        ))
    }

    /// Lifecycle views of every constructed system, in construction order.
    pub fn lifecycles(&self) -> impl Iterator<Item = SystemRef<dyn Lifecycle>> + '_ {
        self.constructed.iter().filter_map(|&id| self.lifecycle(id))
    }

    /// The `on_start` hook of a constructed system.
    pub fn starter(&self, id: Id) -> Option<Starter> {
        let instance = self.instances.get(id.index())?.as_ref()?;
        let Declaration { name, start, .. } = self.declarations[id.index()];
        Some(Starter {
            name,
            any: Arc::clone(&instance.any),
            start,
        })
    }

    /// Number of declared systems.
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field(
                "systems",
                &self.declarations.iter().map(|d| d.name).collect::<Vec<_>>(),
            )
            .field("constructed", &self.constructed.len())
            .field("edges", &self.edges.len())
            .finish()
    }
}

/// The resolver handed to [`System::new`].
///
/// It only exists while a constructor runs, which is what limits resolution to constructors.
pub struct Dependencies<'a> {
    registry: &'a mut Registry,
    state: &'a Arc<AppState>,
    internal: bool,
}

impl Dependencies<'_> {
    /// Resolve another system, constructing it if it is lazy.
    pub fn resolve<T: System>(&mut self) -> Result<SystemRef<T>> {
        self.registry.resolve::<T>(self.state)
    }

    /// The shared app state. Only internal systems receive it.
    pub fn state(&self) -> Option<&Arc<AppState>> {
        self.internal.then_some(self.state)
    }

    /// The app's tracker.
    pub fn tracker(&self) -> &Arc<Tracker> {
        self.state.tracker()
    }

    /// Hand `object` to the tracker, disposing it when the plugin unloads.
    pub fn track(&self, object: impl Into<Trackable>) {
        self.state.tracker().handle(object);
    }

    /// Name of the system being constructed.
    pub fn system_name(&self) -> &'static str {
        self.registry
            .stack
            .last()
            .map_or("<none>", |&id| self.registry.name(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HeadlessHost;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new("Test", Arc::new(HeadlessHost::new()), false))
    }

    #[derive(crate::Lifecycle)]
    struct Leaf;

    impl System for Leaf {
        fn new(_: &mut Dependencies<'_>) -> anyhow::Result<Self> {
            Ok(Self)
        }
    }

    #[derive(crate::Lifecycle)]
    struct Root {
        leaf: SystemRef<Leaf>,
    }

    impl System for Root {
        fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
            Ok(Self {
                leaf: deps.resolve::<Leaf>()?,
            })
        }
    }

    #[test]
    fn eager_system_exists_after_declare() {
        // Given
        let state = state();
        let mut registry = Registry::new();

        // When
        let id = registry
            .declare::<Leaf>(&state, false, SystemConfig::default())
            .unwrap();

        // Then
        assert!(registry.is_constructed(id));
        assert!(registry.get::<Leaf>().is_some());
        assert_eq!(registry.name(id), "Leaf");
    }

    #[test]
    fn lazy_system_waits_for_first_resolution() {
        // Given
        let state = state();
        let mut registry = Registry::new();
        let leaf = registry
            .declare::<Leaf>(&state, false, SystemConfig::lazy())
            .unwrap();
        assert!(!registry.is_constructed(leaf));
        assert!(registry.get::<Leaf>().is_none());

        // When
        let root = registry
            .declare::<Root>(&state, false, SystemConfig::default())
            .unwrap();

        // Then
        assert!(registry.is_constructed(leaf));
        assert_eq!(registry.constructed(), &[leaf, root]);
        assert_eq!(
            registry.edges(),
            &[Edge {
                dependent: root,
                dependency: leaf
            }]
        );
        let root_ref = registry.get::<Root>().unwrap();
        assert!(root_ref.lock().leaf.ptr_eq(&registry.get::<Leaf>().unwrap()));
    }

    #[test]
    fn internal_systems_are_lazy_and_receive_state() {
        #[derive(crate::Lifecycle)]
        struct Internal {
            app_name: String,
        }

        impl System for Internal {
            fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
                let state = deps.state().ok_or_else(|| anyhow::anyhow!("no state"))?;
                Ok(Self {
                    app_name: state.name().to_string(),
                })
            }
        }

        #[derive(crate::Lifecycle)]
        struct User {
            saw_state: bool,
            internal: SystemRef<Internal>,
        }

        impl System for User {
            fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
                Ok(Self {
                    saw_state: deps.state().is_some(),
                    internal: deps.resolve::<Internal>()?,
                })
            }
        }

        // Given
        let state = state();
        let mut registry = Registry::new();
        let internal = registry
            .declare::<Internal>(&state, true, SystemConfig::default())
            .unwrap();
        assert!(registry.is_lazy(internal));
        assert!(registry.is_internal(internal));
        assert!(!registry.is_constructed(internal));

        // When
        registry
            .declare::<User>(&state, false, SystemConfig::default())
            .unwrap();

        // Then
        let user = registry.get::<User>().unwrap();
        let user = user.lock();
        assert!(!user.saw_state);
        assert_eq!(user.internal.lock().app_name, "Test");
    }

    #[test]
    fn self_dependency_fails_at_declaration() {
        #[derive(crate::Lifecycle)]
        struct Narcissus;

        impl System for Narcissus {
            fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
                deps.resolve::<Narcissus>()?;
                Ok(Self)
            }
        }

        let state = state();
        let mut registry = Registry::new();

        let err = registry
            .declare::<Narcissus>(&state, false, SystemConfig::default())
            .unwrap_err();

        assert!(matches!(err, Error::SelfDependency("Narcissus")));
        assert!(registry.get::<Narcissus>().is_none());
    }

    #[test]
    fn longer_cycles_report_the_chain() {
        #[derive(crate::Lifecycle)]
        struct Ping;
        #[derive(crate::Lifecycle)]
        struct Pong;

        impl System for Ping {
            fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
                deps.resolve::<Pong>()?;
                Ok(Self)
            }
        }

        impl System for Pong {
            fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
                deps.resolve::<Ping>()?;
                Ok(Self)
            }
        }

        // Given
        let state = state();
        let mut registry = Registry::new();
        registry
            .declare::<Pong>(&state, false, SystemConfig::lazy())
            .unwrap();

        // When
        let err = registry
            .declare::<Ping>(&state, false, SystemConfig::default())
            .unwrap_err();

        // Then
        match err {
            Error::CircularDependency(chain) => assert_eq!(chain, vec!["Ping", "Pong", "Ping"]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(registry.edges().is_empty());
    }

    #[test]
    fn resolving_outside_a_constructor_fails() {
        let state = state();
        let mut registry = Registry::new();
        registry
            .declare::<Leaf>(&state, false, SystemConfig::default())
            .unwrap();

        let err = registry.resolve::<Leaf>(&state).unwrap_err();

        assert!(matches!(err, Error::DependencyOutsideConstructor));
    }

    #[test]
    fn resolving_undeclared_system_fails() {
        // Given - Leaf was never declared
        let state = state();
        let mut registry = Registry::new();

        // When
        let err = registry
            .declare::<Root>(&state, false, SystemConfig::default())
            .unwrap_err();

        // Then
        assert!(matches!(err, Error::SystemNotFound("Leaf")));
        assert_eq!(err.to_string(), "System 'Leaf' was not found.");
    }

    #[test]
    fn resolving_a_failed_eager_system_is_invalid() {
        #[derive(crate::Lifecycle)]
        struct Broken;

        impl System for Broken {
            fn new(_: &mut Dependencies<'_>) -> anyhow::Result<Self> {
                anyhow::bail!("no toolbar")
            }
        }

        #[derive(crate::Lifecycle)]
        struct NeedsBroken;

        impl System for NeedsBroken {
            fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
                deps.resolve::<Broken>()?;
                Ok(Self)
            }
        }

        // Given
        let state = state();
        let mut registry = Registry::new();
        let err = registry
            .declare::<Broken>(&state, false, SystemConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Construction { system: "Broken", .. }));

        // When
        let err = registry
            .declare::<NeedsBroken>(&state, false, SystemConfig::default())
            .unwrap_err();

        // Then
        assert!(matches!(err, Error::InvalidSystem("Broken")));
    }

    #[test]
    fn duplicate_declaration_fails() {
        let state = state();
        let mut registry = Registry::new();
        registry
            .declare::<Leaf>(&state, false, SystemConfig::lazy())
            .unwrap();

        let err = registry
            .declare::<Leaf>(&state, false, SystemConfig::default())
            .unwrap_err();

        assert!(matches!(err, Error::DuplicateSystem("Leaf")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolving_an_existing_system_records_another_edge() {
        #[derive(crate::Lifecycle)]
        struct Sibling {
            leaf: SystemRef<Leaf>,
        }

        impl System for Sibling {
            fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
                Ok(Self {
                    leaf: deps.resolve::<Leaf>()?,
                })
            }
        }

        // Given
        let state = state();
        let mut registry = Registry::new();
        let leaf = registry
            .declare::<Leaf>(&state, false, SystemConfig::lazy())
            .unwrap();

        // When
        registry
            .declare::<Root>(&state, false, SystemConfig::default())
            .unwrap();
        registry
            .declare::<Sibling>(&state, false, SystemConfig::default())
            .unwrap();

        // Then - one instance, two edges
        let edges: Vec<Id> = registry.edges().iter().map(|e| e.dependency).collect();
        assert_eq!(edges, vec![leaf, leaf]);
        let sibling = registry.get::<Sibling>().unwrap();
        let root = registry.get::<Root>().unwrap();
        assert!(sibling.lock().leaf.ptr_eq(&root.lock().leaf));
    }

    #[test]
    fn nested_lazy_edges_are_post_order() {
        #[derive(crate::Lifecycle)]
        struct Middle {
            _leaf: SystemRef<Leaf>,
        }

        impl System for Middle {
            fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
                Ok(Self {
                    _leaf: deps.resolve::<Leaf>()?,
                })
            }
        }

        #[derive(crate::Lifecycle)]
        struct Top {
            _middle: SystemRef<Middle>,
        }

        impl System for Top {
            fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
                Ok(Self {
                    _middle: deps.resolve::<Middle>()?,
                })
            }
        }

        // Given
        let state = state();
        let mut registry = Registry::new();
        let leaf = registry
            .declare::<Leaf>(&state, false, SystemConfig::lazy())
            .unwrap();
        let middle = registry
            .declare::<Middle>(&state, false, SystemConfig::lazy())
            .unwrap();

        // When
        let top = registry
            .declare::<Top>(&state, false, SystemConfig::default())
            .unwrap();

        // Then
        assert_eq!(
            registry.edges(),
            &[
                Edge {
                    dependent: middle,
                    dependency: leaf
                },
                Edge {
                    dependent: top,
                    dependency: middle
                },
            ]
        );
        assert_eq!(registry.constructed(), &[leaf, middle, top]);
    }

    #[test]
    fn initialize_is_idempotent() {
        static INITS: AtomicUsize = AtomicUsize::new(0);

        #[derive(crate::Lifecycle)]
        #[lifecycle(init)]
        struct Counted;

        impl System for Counted {
            fn new(_: &mut Dependencies<'_>) -> anyhow::Result<Self> {
                Ok(Self)
            }
        }

        impl crate::core::OnInit for Counted {
            fn on_init(&mut self) {
                INITS.fetch_add(1, Ordering::SeqCst);
            }
        }

        // Given
        let state = state();
        let mut registry = Registry::new();
        let id = registry
            .declare::<Counted>(&state, false, SystemConfig::default())
            .unwrap();

        // When
        let first = registry.initialize(id).unwrap();
        let second = registry.initialize(id).unwrap();

        // Then
        assert!(first);
        assert!(!second);
        assert!(registry.is_initialized(id));
        assert_eq!(INITS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn initializing_an_unconstructed_system_fails() {
        let state = state();
        let mut registry = Registry::new();
        let id = registry
            .declare::<Leaf>(&state, false, SystemConfig::lazy())
            .unwrap();

        let err = registry.initialize(id).unwrap_err();

        assert!(matches!(err, Error::SystemNotFound("Leaf")));
    }

    #[test]
    fn constructors_can_track_resources() {
        #[derive(crate::Lifecycle)]
        struct Tracking;

        impl System for Tracking {
            fn new(deps: &mut Dependencies<'_>) -> anyhow::Result<Self> {
                assert_eq!(deps.system_name(), "Tracking");
                deps.track(Trackable::callback(|| {}));
                Ok(Self)
            }
        }

        let state = state();
        let mut registry = Registry::new();
        registry
            .declare::<Tracking>(&state, false, SystemConfig::default())
            .unwrap();

        assert_eq!(state.tracker().len(), 1);
    }

    #[test]
    fn starter_runs_on_start_without_holding_the_lock() {
        #[derive(crate::Lifecycle)]
        #[lifecycle(start)]
        struct Warmup {
            steps: u32,
        }

        impl System for Warmup {
            fn new(_: &mut Dependencies<'_>) -> anyhow::Result<Self> {
                Ok(Self { steps: 0 })
            }
        }

        impl crate::core::OnStart for Warmup {
            fn on_start(this: SystemRef<Self>, cancel: CancelToken) -> anyhow::Result<()> {
                // Frame hooks would see the system free between steps.
                assert!(this.try_lock().is_some());
                this.lock().steps += 1;
                assert!(!cancel.is_cancelled());
                Ok(())
            }
        }

        // Given
        let state = state();
        let mut registry = Registry::new();
        let lazy = registry
            .declare::<Leaf>(&state, false, SystemConfig::lazy())
            .unwrap();
        let warmup = registry
            .declare::<Warmup>(&state, false, SystemConfig::default())
            .unwrap();
        assert!(registry.starter(lazy).is_none());

        // When
        let starter = registry.starter(warmup).unwrap();
        assert_eq!(starter.name(), "Warmup");
        starter.run(CancelToken::new()).unwrap();

        // Then
        assert_eq!(registry.get::<Warmup>().unwrap().lock().steps, 1);
    }

    #[test]
    fn short_names() {
        assert_eq!(short_name("a::b::Foo"), "Foo");
        assert_eq!(short_name("Foo"), "Foo");
        assert_eq!(short_name("a::Foo<b::Bar>"), "Foo<b::Bar>");
    }
}
