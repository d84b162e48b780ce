//! Exceptions linked by cause and suppression
//!
//! Nodes live in an [`ExceptionGraph`] and refer to each other by [`NodeId`]. Nothing prevents
//! the links from forming a cycle.

use crate::backtrace::BackTrace;
use crate::errors::Error;
use crate::frame::{RawFrame, ResolvedFrame};
use parking_lot::Mutex;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

pub struct ExceptionNode {
    /// Class of the exception, in dotted form
    pub class_name: String,
    pub message: Option<String>,

    /// Opaque token captured alongside the raw frames
    pub back_trace: Option<BackTrace>,
    pub raw_frames: Arc<[RawFrame]>,

    pub cause: Option<NodeId>,
    pub suppressed: Vec<NodeId>,

    /// Frames set explicitly, used instead of decoding
    pub(crate) pinned: Option<Arc<[ResolvedFrame]>>,

    /// Last resolved frames, with the platform and descriptor hash they were resolved under
    pub(crate) frame_cache: Mutex<Option<FrameMemo>>,
}

/// Frames a platform resolved for a node under one descriptor hash
pub(crate) struct FrameMemo {
    pub platform: u64,
    pub descriptor_hash: u64,
    pub frames: Arc<[ResolvedFrame]>,
}

impl ExceptionNode {
    pub fn new(class_name: impl Into<String>, message: Option<&str>) -> ExceptionNode {
        ExceptionNode {
            class_name: class_name.into(),
            message: message.map(String::from),
            back_trace: None,
            raw_frames: Arc::from(Vec::new()),
            cause: None,
            suppressed: vec![],
            pinned: None,
            frame_cache: Mutex::new(None),
        }
    }

    pub fn with_frames(mut self, frames: Vec<RawFrame>) -> ExceptionNode {
        self.raw_frames = Arc::from(frames);
        self
    }

    pub fn with_back_trace(mut self, back_trace: BackTrace) -> ExceptionNode {
        self.back_trace = Some(back_trace);
        self
    }

    pub fn pinned_frames(&self) -> Option<&Arc<[ResolvedFrame]>> {
        self.pinned.as_ref()
    }

    /// Forget memoized frames
    pub fn invalidate_frames(&self) {
        *self.frame_cache.lock() = None;
    }
}

impl Display for ExceptionNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.class_name, message),
            None => f.write_str(&self.class_name),
        }
    }
}

#[derive(Default)]
pub struct ExceptionGraph {
    nodes: Vec<ExceptionNode>,
}

impl ExceptionGraph {
    pub fn new() -> ExceptionGraph {
        ExceptionGraph::default()
    }

    pub fn add(&mut self, node: ExceptionNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&ExceptionNode> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> Result<&ExceptionNode, Error> {
        self.get(id).ok_or(Error::NullGraphNode)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut ExceptionNode, Error> {
        self.nodes.get_mut(id.0).ok_or(Error::NullGraphNode)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Set (or clear) the cause of `node`
    pub fn set_cause(&mut self, node: NodeId, cause: Option<NodeId>) -> Result<(), Error> {
        if let Some(cause) = cause {
            self.node(cause)?;
        }
        self.node_mut(node)?.cause = cause;
        Ok(())
    }

    pub fn add_suppressed(&mut self, node: NodeId, suppressed: NodeId) -> Result<(), Error> {
        self.node(suppressed)?;
        self.node_mut(node)?.suppressed.push(suppressed);
        Ok(())
    }

    /// Pin (or with `None`, unpin) an explicit frame list on a node
    pub fn pin_frames(
        &mut self,
        node: NodeId,
        frames: Option<Vec<ResolvedFrame>>,
    ) -> Result<(), Error> {
        let node = self.node_mut(node)?;
        node.pinned = frames.map(Arc::from);
        node.invalidate_frames();
        Ok(())
    }
}
