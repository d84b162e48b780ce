//! Render exception trees with precise, cached stack frame descriptors
//!
//! An exception is an [`ExceptionNode`] holding the textual frames captured by the host runtime
//! and, optionally, an opaque [`BackTrace`] token. Tokens are decoded through the host
//! [`Runtime`](runtime::Runtime) into method identities, whose descriptors are memoized in a
//! process-wide [`FrameCache`](frame::cache::FrameCache). The printer then walks cause and
//! suppressed links, folding frames shared with the enclosing trace and compressing repeated
//! blocks of frames.
//!
//! ```
//! use trex::frame::{LineNumber, RawFrame};
//! use trex::{ExceptionGraph, ExceptionNode, Platform, Settings};
//!
//! let mut graph = ExceptionGraph::new();
//! let root = graph.add(
//!     ExceptionNode::new("java.lang.IllegalStateException", Some("boom")).with_frames(vec![
//!         RawFrame::new("com.example.Main", "run", Some("Main.java"), LineNumber::Line(42)),
//!     ]),
//! );
//!
//! let settings = Settings::default();
//! let text = Platform::detached().render(&graph, root, Some(&settings)).unwrap();
//! assert_eq!(
//!     text,
//!     "java.lang.IllegalStateException: boom\n    -> Lcom/example/Main;->run(?)?  [Main.java:42]\n"
//! );
//! ```

pub mod backtrace;
mod errors;
pub mod frame;
pub mod graph;
pub mod jvm;
pub mod platform;
pub mod printer;
pub mod runtime;
pub mod settings;
pub mod style;
pub mod util;

pub use backtrace::BackTrace;
pub use errors::Error;
pub use graph::{ExceptionGraph, ExceptionNode, NodeId};
pub use platform::Platform;
pub use settings::{ColorScheme, Settings, SettingsBuilder};
pub use style::Style;
