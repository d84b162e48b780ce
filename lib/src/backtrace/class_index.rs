use crate::jvm::UnqualifiedName;
use crate::runtime::{ClassData, WeakId};
use crate::util::WeakKeyedMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

static INDEXES: OnceLock<WeakKeyedMap<WeakId<ClassData>, Arc<ClassIndex>>> = OnceLock::new();

fn indexes() -> &'static WeakKeyedMap<WeakId<ClassData>, Arc<ClassIndex>> {
    INDEXES.get_or_init(WeakKeyedMap::new)
}

/// Per-class lookup tables derived from the declared methods
///
/// Computed once per class and shared process-wide. Entries are dropped once the class is.
#[derive(Debug)]
pub struct ClassIndex {
    /// Slot number to index in `ClassData::methods`
    slots: HashMap<u16, usize>,

    /// Names declared by more than one method
    overloaded: HashSet<UnqualifiedName>,

    constructors: usize,
}

impl ClassIndex {
    /// Get the (memoized) index of a class
    pub fn of(class: &Arc<ClassData>) -> Arc<ClassIndex> {
        let key = WeakId::new(class);
        if let Some(index) = indexes().get(&key) {
            return index;
        }
        indexes().insert(key, Arc::new(ClassIndex::build(class)))
    }

    fn build(class: &ClassData) -> ClassIndex {
        let mut slots = HashMap::new();
        let mut seen = HashSet::new();
        let mut overloaded = HashSet::new();
        let mut constructors = 0;

        for (index, method) in class.methods.iter().enumerate() {
            slots.entry(method.slot).or_insert(index);
            if method.name.is_constructor() {
                constructors += 1;
            } else if !seen.insert(&method.name) {
                overloaded.insert(method.name.clone());
            }
        }

        ClassIndex {
            slots,
            overloaded,
            constructors,
        }
    }

    pub fn method_for_slot(&self, slot: u16) -> Option<usize> {
        self.slots.get(&slot).copied()
    }

    /// Would the name alone fail to identify the method?
    ///
    /// Class initializers are always unique, constructors are ambiguous when there is more
    /// than one.
    pub fn is_ambiguous(&self, name: &UnqualifiedName) -> bool {
        if name.is_class_initializer() {
            false
        } else if name.is_constructor() {
            self.constructors > 1
        } else {
            self.overloaded.contains(name)
        }
    }

    /// Drop the indexes of classes that have been unloaded
    pub fn purge() -> usize {
        indexes().purge()
    }

    /// Drop the index of one class
    pub fn forget(class: &Arc<ClassData>) {
        indexes().remove_where(|key| key.refers_to(class));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::*;
    use crate::runtime::ClassLoader;

    fn name(value: &str) -> UnqualifiedName {
        UnqualifiedName::from_string(String::from(value)).unwrap()
    }

    #[test]
    fn overloads_and_constructors() {
        let mut class = ClassData::new(
            BinaryName::from_dotted("a.B").unwrap(),
            ClassLoader::Application(None),
        );
        let void = MethodDescriptor::<BinaryName>::parse("()V").unwrap();
        let int = MethodDescriptor::<BinaryName>::parse("(I)V").unwrap();
        class.add_method(UnqualifiedName::INIT, void.clone(), MethodAccessFlags::PUBLIC, 0);
        class.add_method(UnqualifiedName::CLINIT, void.clone(), MethodAccessFlags::STATIC, 1);
        class.add_method(name("go"), void.clone(), MethodAccessFlags::PUBLIC, 7);
        class.add_method(name("go"), int, MethodAccessFlags::PUBLIC, 8);
        class.add_method(name("stop"), void, MethodAccessFlags::PUBLIC, 9);
        let class = Arc::new(class);

        let index = ClassIndex::of(&class);
        assert!(index.is_ambiguous(&name("go")));
        assert!(!index.is_ambiguous(&name("stop")));
        assert!(!index.is_ambiguous(&UnqualifiedName::INIT));
        assert!(!index.is_ambiguous(&UnqualifiedName::CLINIT));
        assert_eq!(index.method_for_slot(8), Some(3));
        assert_eq!(index.method_for_slot(2), None);

        assert!(Arc::ptr_eq(&index, &ClassIndex::of(&class)));
    }
}
