use std::collections::HashMap;
use std::hash::Hash;

/// Conversion of a boxed concrete type into its boxed base (trait object).
pub trait Upcast<B: ?Sized> {
    fn upcast(self: Box<Self>) -> Box<B>;
}

/// Registry of zero-argument constructors keyed by `K`, producing `Box<B>`.
///
/// Populated once up front, then only read. Lookups of unregistered keys
/// return `None`; callers decide what a miss means.
pub struct ObjectFactory<K, B: ?Sized> {
    entries: HashMap<K, fn() -> Box<B>>,
}

fn construct<D, B>() -> Box<B>
where
    D: Default + Upcast<B>,
    B: ?Sized,
{
    Box::new(D::default()).upcast()
}

impl<K: Eq + Hash, B: ?Sized> ObjectFactory<K, B> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register `D`'s default constructor under `key`, replacing any
    /// previous entry.
    pub fn add_entry<D>(&mut self, key: K)
    where
        D: Default + Upcast<B> + 'static,
    {
        self.entries.insert(key, construct::<D, B>);
    }

    /// Construct a fresh instance for `key`.
    pub fn create(&self, key: &K) -> Option<Box<B>> {
        self.entries.get(key).map(|ctor| ctor())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash, B: ?Sized> Default for ObjectFactory<K, B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape {
        fn sides(&self) -> u32;
    }

    #[derive(Default)]
    struct Triangle;

    #[derive(Default)]
    struct Square;

    impl Shape for Triangle {
        fn sides(&self) -> u32 {
            3
        }
    }

    impl Shape for Square {
        fn sides(&self) -> u32 {
            4
        }
    }

    impl<T: Shape + 'static> Upcast<dyn Shape> for T {
        fn upcast(self: Box<Self>) -> Box<dyn Shape> {
            self
        }
    }

    #[test]
    fn creates_registered_types() {
        let mut factory: ObjectFactory<u8, dyn Shape> = ObjectFactory::new();
        factory.add_entry::<Triangle>(3);
        factory.add_entry::<Square>(4);
        assert_eq!(factory.len(), 2);
        assert_eq!(factory.create(&3).map(|s| s.sides()), Some(3));
        assert_eq!(factory.create(&4).map(|s| s.sides()), Some(4));
    }

    #[test]
    fn unknown_key_is_none() {
        let factory: ObjectFactory<u8, dyn Shape> = ObjectFactory::new();
        assert!(factory.create(&9).is_none());
        assert!(!factory.contains(&9));
    }

    #[test]
    fn later_entry_replaces_earlier() {
        let mut factory: ObjectFactory<u8, dyn Shape> = ObjectFactory::new();
        factory.add_entry::<Triangle>(1);
        factory.add_entry::<Square>(1);
        assert_eq!(factory.create(&1).map(|s| s.sides()), Some(4));
    }
}
