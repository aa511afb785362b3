//! Ordered registry of pointer factories.
//!
//! Readers take a snapshot of the factory list without locking; registration
//! publishes a new sorted list.

use crate::error::{PathError, Result};
use crate::pointer::{
    BeanPointer, CollectionPointer, ContainerPointer, LeafPointer, MapPointer, NullPointer,
    PointerRef, PointerState,
};
use arc_swap::ArcSwap;
use log::{debug, trace};
use objpath_types::{Locale, QName, Value};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Everything a factory needs to build a pointer for a value.
pub struct PointerRequest<'a> {
    pub name: Option<&'a QName>,
    pub value: &'a Value,
    pub locale: &'a Locale,
    pub parent: Option<&'a PointerRef>,
    pub registry: &'a Arc<PointerRegistry>,
}

impl PointerRequest<'_> {
    pub fn state(&self) -> PointerState {
        PointerState::new(
            self.parent.cloned(),
            self.locale.clone(),
            self.registry.clone(),
        )
    }

    pub fn name(&self) -> Option<QName> {
        self.name.cloned()
    }
}

/// Builds pointers for the values it recognizes.
pub trait PointerFactory: Send + Sync {
    /// Factories are consulted in ascending order.
    fn order(&self) -> i32;

    fn create(&self, request: &PointerRequest<'_>) -> Option<PointerRef>;
}

#[derive(Clone)]
struct Registered {
    order: i32,
    seq: u64,
    factory: Arc<dyn PointerFactory>,
}

pub struct PointerRegistry {
    factories: ArcSwap<Vec<Registered>>,
    seq: AtomicU64,
}

impl PointerRegistry {
    /// A registry with no factories; every non-null value is unresolvable.
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            factories: ArcSwap::from_pointee(Vec::new()),
            seq: AtomicU64::new(0),
        })
    }

    /// A registry with the built-in factories for every [`Value`] variant except foreign ones.
    pub fn with_defaults() -> Arc<Self> {
        let registry = Self::empty();
        registry.register(Arc::new(CollectionFactory));
        registry.register(Arc::new(ContainerFactory));
        registry.register(Arc::new(MapFactory));
        registry.register(Arc::new(BeanFactory));
        registry.register(Arc::new(LeafFactory));
        registry
    }

    /// Adds a factory. Factories with equal order keep their registration order.
    pub fn register(&self, factory: Arc<dyn PointerFactory>) {
        let entry = Registered {
            order: factory.order(),
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            factory,
        };
        debug!("Registering pointer factory with order {}", entry.order);
        self.factories.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(entry.clone());
            next.sort_by_key(|r| (r.order, r.seq));
            next
        });
    }

    pub fn len(&self) -> usize {
        self.factories.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Orders of the registered factories, in consultation order.
    pub fn orders(&self) -> Vec<i32> {
        self.factories.load().iter().map(|r| r.order).collect()
    }

    /// Builds a pointer for `value`. Null values bypass the factories.
    pub fn create(
        self: &Arc<Self>,
        name: Option<&QName>,
        value: &Value,
        locale: &Locale,
        parent: Option<&PointerRef>,
    ) -> Result<PointerRef> {
        let request = PointerRequest {
            name,
            value,
            locale,
            parent,
            registry: self,
        };
        if value.is_null() {
            return Ok(Arc::new(NullPointer::new(request.state(), request.name())));
        }
        let snapshot = self.factories.load();
        let pointer = snapshot
            .iter()
            .find_map(|r| r.factory.create(&request))
            .ok_or_else(|| PathError::UnresolvableValue {
                kind: value.kind_name(),
            })?;
        trace!("Allocated {} pointer for a {}", pointer.kind(), value.kind_name());
        Ok(pointer)
    }

    pub fn root(self: &Arc<Self>, value: &Value, locale: &Locale) -> Result<PointerRef> {
        self.create(None, value, locale, None)
    }
}

impl fmt::Debug for PointerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerRegistry")
            .field("orders", &self.orders())
            .finish()
    }
}

struct CollectionFactory;

impl PointerFactory for CollectionFactory {
    fn order(&self) -> i32 {
        10
    }

    fn create(&self, request: &PointerRequest<'_>) -> Option<PointerRef> {
        let list = request.value.as_list()?;
        Some(Arc::new(CollectionPointer::new(
            request.state(),
            request.name(),
            list.clone(),
        )))
    }
}

struct ContainerFactory;

impl PointerFactory for ContainerFactory {
    fn order(&self) -> i32 {
        200
    }

    fn create(&self, request: &PointerRequest<'_>) -> Option<PointerRef> {
        match request.value {
            Value::Cell(cell) => Some(Arc::new(ContainerPointer::new(
                request.state(),
                request.name(),
                cell.clone(),
            ))),
            _ => None,
        }
    }
}

struct MapFactory;

impl PointerFactory for MapFactory {
    fn order(&self) -> i32 {
        800
    }

    fn create(&self, request: &PointerRequest<'_>) -> Option<PointerRef> {
        let map = request.value.as_map()?;
        Some(Arc::new(MapPointer::new(
            request.state(),
            request.name(),
            map.clone(),
        )))
    }
}

struct BeanFactory;

impl PointerFactory for BeanFactory {
    fn order(&self) -> i32 {
        900
    }

    fn create(&self, request: &PointerRequest<'_>) -> Option<PointerRef> {
        let bean = request.value.as_bean()?;
        Some(Arc::new(BeanPointer::new(
            request.state(),
            request.name(),
            bean.clone(),
        )))
    }
}

struct LeafFactory;

impl PointerFactory for LeafFactory {
    fn order(&self) -> i32 {
        950
    }

    fn create(&self, request: &PointerRequest<'_>) -> Option<PointerRef> {
        request.value.is_scalar().then(|| {
            Arc::new(LeafPointer::new(
                request.state(),
                request.name(),
                request.value.clone(),
            )) as PointerRef
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::NodePointer;
    use objpath_types::Foreign;

    struct ForeignFactory(i32);

    impl PointerFactory for ForeignFactory {
        fn order(&self) -> i32 {
            self.0
        }

        fn create(&self, request: &PointerRequest<'_>) -> Option<PointerRef> {
            match request.value {
                Value::Foreign(_) => Some(Arc::new(LeafPointer::new(
                    request.state(),
                    request.name(),
                    Value::from("foreign"),
                ))),
                _ => None,
            }
        }
    }

    #[test]
    fn test_defaults_are_sorted_by_order() {
        let registry = PointerRegistry::with_defaults();
        assert_eq!(registry.orders(), vec![10, 200, 800, 900, 950]);
        registry.register(Arc::new(ForeignFactory(500)));
        assert_eq!(registry.orders(), vec![10, 200, 500, 800, 900, 950]);
    }

    #[test]
    fn test_null_bypasses_factories() {
        let registry = PointerRegistry::empty();
        let pointer = registry.root(&Value::Null, &Locale::default()).unwrap();
        assert_eq!(pointer.kind(), "null");
    }

    #[test]
    fn test_unresolvable_value() {
        let registry = PointerRegistry::with_defaults();
        let value = Value::Foreign(Foreign::new("socket", 7u8));
        let err = registry.root(&value, &Locale::default()).unwrap_err();
        assert_eq!(
            err,
            PathError::UnresolvableValue {
                kind: "socket".to_string()
            }
        );

        registry.register(Arc::new(ForeignFactory(1000)));
        let pointer = registry.root(&value, &Locale::default()).unwrap();
        assert_eq!(pointer.immediate_node(), Value::from("foreign"));
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = PointerRegistry::with_defaults();
        std::thread::scope(|s| {
            for i in 0..8 {
                let registry = &registry;
                s.spawn(move || registry.register(Arc::new(ForeignFactory(300 + i))));
            }
        });
        let orders = registry.orders();
        assert_eq!(orders.len(), 13);
        assert!(orders.windows(2).all(|w| w[0] <= w[1]));
    }
}
