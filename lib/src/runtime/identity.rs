use super::ClassData;
use crate::util::WeakKey;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// Weak reference whose "identity" for equality and hashing is the address of the shared
/// allocation, not the underlying data.
///
/// The allocation stays reserved as long as any `Weak` to it lives, so an address cannot be
/// reused by another `Arc` while a `WeakId` still refers to it.
pub struct WeakId<T>(Weak<T>);

impl<T> WeakId<T> {
    pub fn new(target: &Arc<T>) -> WeakId<T> {
        WeakId(Arc::downgrade(target))
    }

    pub fn upgrade(&self) -> Option<Arc<T>> {
        self.0.upgrade()
    }

    /// Does the referent still have strong references?
    pub fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Does this refer to the same allocation as `target`?
    pub fn refers_to(&self, target: &Arc<T>) -> bool {
        std::ptr::eq(self.0.as_ptr(), Arc::as_ptr(target))
    }
}

impl<T> Clone for WeakId<T> {
    fn clone(&self) -> Self {
        WeakId(self.0.clone())
    }
}

impl<T> Hash for WeakId<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self.0.as_ptr(), state)
    }
}

impl<T> PartialEq for WeakId<T> {
    fn eq(&self, other: &WeakId<T>) -> bool {
        std::ptr::eq(self.0.as_ptr(), other.0.as_ptr())
    }
}

impl<T> Eq for WeakId<T> {}

impl<T> Debug for WeakId<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "WeakId({:p})", self.0.as_ptr())
    }
}

impl<T> WeakKey for WeakId<T> {
    fn is_live(&self) -> bool {
        WeakId::is_live(self)
    }
}

/// Which member of the declaring class a frame refers to
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Member {
    /// Index into `ClassData::methods`
    Index(usize),

    /// Handle or slot that the runtime could not map to a declared method
    Unresolved(u64),
}

/// Stable identity of a method, independent of which backtrace shape produced it
///
/// Holds the declaring class weakly: an identity never keeps a class loaded.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodIdentity {
    pub class: WeakId<ClassData>,
    pub member: Member,
}

impl MethodIdentity {
    pub fn new(class: &Arc<ClassData>, member: Member) -> MethodIdentity {
        MethodIdentity {
            class: WeakId::new(class),
            member,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.member, Member::Index(_))
    }
}
