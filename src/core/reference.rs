use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;

use crate::core::types::{BuiltInTypeKind, ResourceType, TypeBase};

/// Handle to a node in a [`TypeFactory`] or [`TypeGraph`].
///
/// A handle is the node's slot in the owning sequence. Two handles are the
/// same node if and only if they are equal; structurally identical nodes
/// created separately get distinct handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeRef(usize);

impl TypeRef {
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Type {0} was reserved but never defined")]
    Undefined(TypeRef),

    #[error("Type {0} is already defined")]
    AlreadyDefined(TypeRef),

    #[error("Type {0} does not exist")]
    UnknownType(TypeRef),

    #[error("Type {from} references {target}, which does not exist")]
    DanglingReference { from: TypeRef, target: TypeRef },
}

/// Producer-side allocator for type nodes.
///
/// `create` is the eager discipline: the node exists when its handle is
/// returned. `reserve` + `define` is the deferred discipline used for
/// recursive definitions, where a node's fields must reference the node
/// itself (or a not yet built sibling) before it is complete.
#[derive(Debug, Default)]
pub struct TypeFactory {
    types: Vec<Option<TypeBase>>,
    builtins: HashMap<BuiltInTypeKind, TypeRef>,
}

impl TypeFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fully built node
    pub fn create(&mut self, node: TypeBase) -> TypeRef {
        let handle = TypeRef(self.types.len());
        self.types.push(Some(node));
        handle
    }

    /// Allocate a slot whose node will be supplied later with [`Self::define`]
    pub fn reserve(&mut self) -> TypeRef {
        let handle = TypeRef(self.types.len());
        self.types.push(None);
        handle
    }

    /// Fill a slot handed out by [`Self::reserve`]
    ///
    /// # Errors
    ///
    /// Returns an error if the handle is unknown or its slot is already filled.
    pub fn define(&mut self, handle: TypeRef, node: TypeBase) -> Result<(), ModelError> {
        match self.types.get_mut(handle.0) {
            None => Err(ModelError::UnknownType(handle)),
            Some(Some(_)) => Err(ModelError::AlreadyDefined(handle)),
            Some(slot) => {
                *slot = Some(node);
                Ok(())
            }
        }
    }

    /// Shared handle for a built-in kind; the node is allocated on first use
    pub fn builtin(&mut self, kind: BuiltInTypeKind) -> TypeRef {
        if let Some(&handle) = self.builtins.get(&kind) {
            return handle;
        }
        let handle = self.create(TypeBase::builtin(kind));
        self.builtins.insert(kind, handle);
        handle
    }

    /// Look up a node while the graph is still under construction.
    /// Returns `None` for reserved slots that are not yet defined.
    #[must_use]
    pub fn get(&self, handle: TypeRef) -> Option<&TypeBase> {
        self.types.get(handle.0).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Freeze the factory into an immutable graph
    ///
    /// # Errors
    ///
    /// Returns an error if a reserved slot was never defined or if any
    /// reference points outside the factory.
    pub fn finish(self) -> Result<TypeGraph, ModelError> {
        let count = self.types.len();
        let mut types = Vec::with_capacity(count);

        for (index, slot) in self.types.into_iter().enumerate() {
            let node = slot.ok_or(ModelError::Undefined(TypeRef(index)))?;
            if let Some(target) = node.references().into_iter().find(|r| r.0 >= count) {
                return Err(ModelError::DanglingReference {
                    from: TypeRef(index),
                    target,
                });
            }
            types.push(node);
        }

        Ok(TypeGraph { types })
    }
}

/// An immutable, fully resolved sequence of type nodes.
///
/// Every reference held by a node in the graph is a valid handle into the
/// same graph, so resolution is a slot lookup and cycles never recurse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeGraph {
    types: Vec<TypeBase>,
}

impl TypeGraph {
    /// Caller guarantees every reference is in range.
    pub(crate) fn from_resolved(types: Vec<TypeBase>) -> Self {
        Self { types }
    }

    #[must_use]
    pub fn get(&self, handle: TypeRef) -> Option<&TypeBase> {
        self.types.get(handle.0)
    }

    /// Resolve a handle obtained from this graph.
    ///
    /// # Panics
    ///
    /// Panics if the handle belongs to a different, smaller graph.
    #[must_use]
    pub fn resolve(&self, handle: TypeRef) -> &TypeBase {
        &self.types[handle.0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Handles in graph order
    pub fn handles(&self) -> impl Iterator<Item = TypeRef> {
        (0..self.types.len()).map(TypeRef)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeRef, &TypeBase)> {
        self.types
            .iter()
            .enumerate()
            .map(|(index, node)| (TypeRef(index), node))
    }

    /// Top-level resource nodes with their positions
    pub fn resources(&self) -> impl Iterator<Item = (TypeRef, &ResourceType)> {
        self.iter()
            .filter_map(|(handle, node)| node.as_resource().map(|r| (handle, r)))
    }

    /// Handles reachable from `roots`, breadth-first, roots first, each once.
    /// Handles outside the graph are skipped.
    #[must_use]
    pub fn reachable(&self, roots: &[TypeRef]) -> Vec<TypeRef> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<TypeRef> = roots.iter().copied().collect();

        while let Some(handle) = queue.pop_front() {
            let Some(node) = self.get(handle) else {
                continue;
            };
            if !seen.insert(handle) {
                continue;
            }
            order.push(handle);
            queue.extend(node.references());
        }

        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ArrayType, ObjectType, PropertyFlags};

    #[test]
    fn test_builtin_handles_are_shared() {
        let mut factory = TypeFactory::new();
        let a = factory.builtin(BuiltInTypeKind::String);
        let b = factory.builtin(BuiltInTypeKind::String);
        let c = factory.builtin(BuiltInTypeKind::Int);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(factory.len(), 2);
    }

    #[test]
    fn test_structurally_equal_nodes_stay_distinct() {
        let mut factory = TypeFactory::new();
        let a = factory.create(TypeBase::string_literal("x"));
        let b = factory.create(TypeBase::string_literal("x"));
        assert_ne!(a, b);
        assert_eq!(factory.finish().unwrap().len(), 2);
    }

    #[test]
    fn test_deferred_self_reference() {
        let mut factory = TypeFactory::new();
        let node = factory.reserve();
        assert!(factory.get(node).is_none());

        factory
            .define(node, TypeBase::Array(ArrayType::named("cyclic", node)))
            .unwrap();

        let graph = factory.finish().unwrap();
        match graph.resolve(node) {
            TypeBase::Array(array) => assert_eq!(array.item_type, node),
            other => panic!("unexpected node: {other:?}"),
        }
    }

    #[test]
    fn test_define_twice_fails() {
        let mut factory = TypeFactory::new();
        let node = factory.reserve();
        factory.define(node, TypeBase::string_literal("a")).unwrap();
        let err = factory
            .define(node, TypeBase::string_literal("b"))
            .unwrap_err();
        assert_eq!(err, ModelError::AlreadyDefined(node));
    }

    #[test]
    fn test_finish_rejects_undefined_slot() {
        let mut factory = TypeFactory::new();
        let node = factory.reserve();
        assert_eq!(factory.finish().unwrap_err(), ModelError::Undefined(node));
    }

    #[test]
    fn test_finish_rejects_dangling_reference() {
        let mut factory = TypeFactory::new();
        let from = factory.create(TypeBase::Array(ArrayType::of(TypeRef::from_index(7))));
        let err = factory.finish().unwrap_err();
        assert_eq!(
            err,
            ModelError::DanglingReference {
                from,
                target: TypeRef::from_index(7)
            }
        );
    }

    #[test]
    fn test_reachable_handles_cycles() {
        let mut factory = TypeFactory::new();
        let unrelated = factory.builtin(BuiltInTypeKind::Bool);
        let string = factory.builtin(BuiltInTypeKind::String);
        let a = factory.reserve();
        let b = factory.create(TypeBase::Array(ArrayType::of(a)));
        factory
            .define(
                a,
                TypeBase::Object(
                    ObjectType::new("a")
                        .with_property("next", b, PropertyFlags::empty())
                        .with_property("id", string, PropertyFlags::REQUIRED),
                ),
            )
            .unwrap();
        let root = factory.create(TypeBase::Resource(ResourceType::new("Foo/bar", a)));
        let graph = factory.finish().unwrap();

        let order = graph.reachable(&[root]);
        assert_eq!(order, vec![root, a, b, string]);
        assert!(!order.contains(&unrelated));
    }
}
