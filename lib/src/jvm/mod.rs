//! Vocabulary of the managed runtime whose frames get rendered
//!
//! Classes are named by [`BinaryName`] (`java/lang/Object`), members by [`UnqualifiedName`], and
//! methods carry a [`MethodDescriptor`] that the styles render either in the compact descriptor
//! syntax or in source syntax.
//!
//! ```
//! use trex::jvm::*;
//!
//! let descriptor = MethodDescriptor::<BinaryName>::parse("(I[Ljava/lang/String;)V").unwrap();
//! assert_eq!(descriptor.parameters.len(), 2);
//! assert_eq!(descriptor.render(), "(I[Ljava/lang/String;)V");
//! ```

mod access_flags;
mod descriptors;
mod names;

pub use access_flags::*;
pub use descriptors::*;
pub use names::*;
