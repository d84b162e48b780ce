//! Entry points
//!
//! A [`Platform`] ties together the host runtime, the optional module classifier, and the frame
//! cache. Every entry point takes an optional [`Settings`]; without one, a snapshot of the
//! process-wide default is taken once for the whole call.

use crate::errors::Error;
use crate::frame::cache::FrameCache;
use crate::frame::{FrameList, ResolvedFrame};
use crate::graph::{ExceptionGraph, ExceptionNode, FrameMemo, NodeId};
use crate::printer::{Sink, TreePrinter};
use crate::runtime::{Detached, ModuleClassifier, Runtime};
use crate::settings::Settings;
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone)]
pub struct Platform {
    /// Identity of this combination of collaborators
    id: u64,
    runtime: Arc<dyn Runtime>,
    classifier: Option<Arc<dyn ModuleClassifier>>,
    cache: Arc<FrameCache>,
}

impl Platform {
    /// Platform over a host runtime, sharing the process-wide frame cache
    pub fn new(runtime: Arc<dyn Runtime>) -> Platform {
        Platform {
            id: next_id(),
            runtime,
            classifier: None,
            cache: FrameCache::global(),
        }
    }

    /// Platform that resolves nothing and prints raw frames
    pub fn detached() -> Platform {
        Platform::new(Arc::new(Detached))
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ModuleClassifier>) -> Platform {
        self.classifier = Some(classifier);
        self.id = next_id();
        self
    }

    /// Use a private frame cache instead of the process-wide one
    pub fn with_cache(mut self, cache: Arc<FrameCache>) -> Platform {
        self.cache = cache;
        self.id = next_id();
        self
    }

    pub fn cache(&self) -> &Arc<FrameCache> {
        &self.cache
    }

    /// Render the tree rooted at `root` into a string
    pub fn render(
        &self,
        graph: &ExceptionGraph,
        root: NodeId,
        settings: Option<&Settings>,
    ) -> Result<String, Error> {
        let mut out = String::new();
        self.render_to(graph, root, settings, &mut out)?;
        Ok(out)
    }

    /// Render the tree rooted at `root` into a sink
    ///
    /// If the sink has a lock, it is held for the whole render.
    pub fn render_to(
        &self,
        graph: &ExceptionGraph,
        root: NodeId,
        settings: Option<&Settings>,
        sink: &mut dyn Sink,
    ) -> Result<(), Error> {
        graph.node(root)?;
        let settings = snapshot(settings);

        let lock = sink.lock();
        let _guard = lock.as_ref().map(|lock| lock.lock());
        TreePrinter::new(self, graph, &settings, &mut *sink).print(root)
    }

    /// Header of a node (with merged causes), without any frames
    pub fn describe(
        &self,
        graph: &ExceptionGraph,
        node: NodeId,
        settings: Option<&Settings>,
    ) -> Result<String, Error> {
        graph.node(node)?;
        let settings = snapshot(settings);

        let mut out = String::new();
        TreePrinter::new(self, graph, &settings, &mut out).describe(node)?;
        Ok(out)
    }

    /// Resolved frames of a node
    ///
    /// Nodes without a backtrace token get frames built from their raw text. Unlike rendering,
    /// a malformed token is reported instead of falling back.
    pub fn resolve_frames(
        &self,
        graph: &ExceptionGraph,
        node: NodeId,
        settings: Option<&Settings>,
    ) -> Result<Vec<ResolvedFrame>, Error> {
        let node = graph.node(node)?;
        let settings = snapshot(settings);

        if let Some(pinned) = &node.pinned {
            return Ok(pinned.to_vec());
        }
        match &node.back_trace {
            Some(back_trace) => self.cache.resolve_all(
                self.runtime.as_ref(),
                back_trace,
                &node.raw_frames,
                &settings,
                self.classifier.as_deref(),
            ),
            None => Ok(node
                .raw_frames
                .iter()
                .map(|frame| ResolvedFrame::from_raw(frame, settings.style()))
                .collect()),
        }
    }

    /// Pin an explicit frame list on a node (or unpin with `None`)
    ///
    /// Pinned frames are printed as they are, whatever the settings.
    pub fn pin_frames(
        &self,
        graph: &mut ExceptionGraph,
        node: NodeId,
        frames: Option<Vec<ResolvedFrame>>,
    ) -> Result<(), Error> {
        graph.pin_frames(node, frames)
    }

    /// Frames to print for a node
    ///
    /// Resolved frames are memoized on the node together with the platform and the descriptor
    /// hash they were computed under. A token that cannot be decoded falls back to the raw frames.
    pub(crate) fn frame_list(&self, node: &ExceptionNode, settings: &Settings) -> FrameList {
        if let Some(pinned) = &node.pinned {
            return FrameList::Resolved(pinned.clone());
        }
        let back_trace = match &node.back_trace {
            Some(back_trace) => back_trace,
            None => return FrameList::Raw(node.raw_frames.clone()),
        };

        let hash = settings.descriptor_hash();
        if settings.cache_enabled() {
            if let Some(memo) = &*node.frame_cache.lock() {
                if memo.platform == self.id && memo.descriptor_hash == hash {
                    return FrameList::Resolved(memo.frames.clone());
                }
            }
        }

        let resolved = self.cache.resolve_all(
            self.runtime.as_ref(),
            back_trace,
            &node.raw_frames,
            settings,
            self.classifier.as_deref(),
        );
        match resolved {
            Ok(frames) => {
                let frames: Arc<[ResolvedFrame]> = Arc::from(frames);
                if settings.cache_enabled() {
                    *node.frame_cache.lock() = Some(FrameMemo {
                        platform: self.id,
                        descriptor_hash: hash,
                        frames: frames.clone(),
                    });
                }
                FrameList::Resolved(frames)
            }
            Err(err) => {
                log::warn!("Printing raw frames of {}: {}", node.class_name, err);
                FrameList::Raw(node.raw_frames.clone())
            }
        }
    }
}

impl Default for Platform {
    fn default() -> Platform {
        Platform::detached()
    }
}

fn snapshot(settings: Option<&Settings>) -> Cow<'_, Settings> {
    match settings {
        Some(settings) => Cow::Borrowed(settings),
        None => Cow::Owned(Settings::global().as_ref().clone()),
    }
}
