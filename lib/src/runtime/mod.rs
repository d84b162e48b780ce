//! Contract between the renderer and the host runtime that captured the exceptions
//!
//! The host owns class metadata (handed out as `Arc<ClassData>`) and knows how to map the opaque
//! handles stored inside backtrace tokens back to classes and methods. Nothing here reads VM
//! memory: every lookup goes through [`Runtime`].

mod identity;

pub use identity::*;

use crate::backtrace::BackTrace;
use crate::frame::RawFrame;
use crate::jvm::{
    BinaryName, ClassAccessFlags, MethodAccessFlags, MethodDescriptor, UnqualifiedName,
};
use std::sync::Arc;

/// Class loader that defined a class
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ClassLoader {
    /// Bootstrap loader (`java.*` and friends)
    Boot,

    /// System (platform) loader
    System,

    /// Any other loader, possibly with a user-visible name
    Application(Option<String>),
}

impl ClassLoader {
    /// Name shown in front of frames when class loader names are visible
    pub fn name(&self) -> Option<&str> {
        match self {
            ClassLoader::Application(name) => name.as_deref(),
            _ => None,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, ClassLoader::Boot | ClassLoader::System)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModuleInfo {
    pub name: String,
    pub version: Option<String>,
}

impl ModuleInfo {
    pub fn new(name: impl Into<String>) -> ModuleInfo {
        ModuleInfo {
            name: name.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> ModuleInfo {
        self.version = Some(version.into());
        self
    }
}

#[derive(Clone, Debug)]
pub struct MethodData {
    /// Name of the method (`<init>` for constructors)
    pub name: UnqualifiedName,

    /// Type of the method
    pub descriptor: MethodDescriptor<BinaryName>,

    /// Method access flags
    pub access_flags: MethodAccessFlags,

    /// Runtime-specific slot number (index into the vtable or method array)
    pub slot: u16,
}

impl MethodData {
    pub fn is_synthetic(&self) -> bool {
        self.access_flags.is_synthetic()
    }
}

/// Metadata of a loaded class
///
/// Classes are shared as `Arc<ClassData>`. Caches inside the crate only ever keep weak references
/// to them, so dropping the last `Arc` is how the host signals that a class has been unloaded.
#[derive(Clone, Debug)]
pub struct ClassData {
    /// Name of the class
    pub name: BinaryName,

    /// Class access flags
    pub access_flags: ClassAccessFlags,

    /// Defining loader
    pub loader: ClassLoader,

    /// Is this a dynamically generated proxy class?
    pub is_proxy: bool,

    /// Source file attribute, used when a raw frame has no file name
    pub source_file: Option<String>,

    /// Module the class belongs to, if the runtime knows
    pub module: Option<ModuleInfo>,

    /// Declared methods and constructors
    pub methods: Vec<MethodData>,
}

impl ClassData {
    pub fn new(name: BinaryName, loader: ClassLoader) -> ClassData {
        ClassData {
            name,
            access_flags: ClassAccessFlags::PUBLIC,
            loader,
            is_proxy: false,
            source_file: None,
            module: None,
            methods: vec![],
        }
    }

    /// Declare a method, returning its index in `methods`
    pub fn add_method(
        &mut self,
        name: UnqualifiedName,
        descriptor: MethodDescriptor<BinaryName>,
        access_flags: MethodAccessFlags,
        slot: u16,
    ) -> usize {
        self.methods.push(MethodData {
            name,
            descriptor,
            access_flags,
            slot,
        });
        self.methods.len() - 1
    }

    pub fn is_synthetic(&self) -> bool {
        self.access_flags.is_synthetic()
    }

    /// Defined by a builtin loader, and not a proxy
    pub fn is_boot(&self) -> bool {
        self.loader.is_builtin() && !self.is_proxy
    }

    pub fn method(&self, index: usize) -> Option<&MethodData> {
        self.methods.get(index)
    }
}

/// Host runtime that owns the classes referenced from backtrace tokens
pub trait Runtime: Send + Sync {
    /// Resolve a class handle
    fn class(&self, handle: u64) -> Option<Arc<ClassData>>;

    /// Resolve a method handle into its declaring class and the index in `ClassData::methods`
    fn method(&self, handle: u64) -> Option<(Arc<ClassData>, usize)>;

    /// Re-derive the textual frames of a backtrace so that there are exactly `depth` of them
    ///
    /// Called when a decoder reports a different depth than the number of raw frames the
    /// exception carries. Runtimes that cannot do this return `None`, in which case the
    /// exception is printed from its raw frames.
    fn raw_frames(&self, back_trace: &BackTrace, depth: usize) -> Option<Vec<RawFrame>> {
        let _ = (back_trace, depth);
        None
    }
}

/// Guesses the module of a class from its name (eg. `java.base` for `java.lang.String`)
pub trait ModuleClassifier: Send + Sync {
    fn classify(&self, class_name: &str) -> Option<String>;
}

/// Runtime that resolves nothing
///
/// Useful for rendering exceptions that only have raw frames (for instance, ones parsed back
/// from text).
#[derive(Copy, Clone, Debug, Default)]
pub struct Detached;

impl Runtime for Detached {
    fn class(&self, _handle: u64) -> Option<Arc<ClassData>> {
        None
    }

    fn method(&self, _handle: u64) -> Option<(Arc<ClassData>, usize)> {
        None
    }
}
