//! Process-wide memo of frame descriptors
//!
//! Descriptors are keyed on the method identity and on the part of the settings that changes
//! descriptor text. Keys hold their declaring class weakly, so entries go away once the host
//! drops the class.

use super::{FrameInfo, RawFrame, ResolvedFrame};
use crate::backtrace::{self, BackTrace, ClassIndex, DecodedFrame, Decoder};
use crate::errors::Error;
use crate::runtime::{ClassData, Member, MethodIdentity, ModuleClassifier, Runtime};
use crate::settings::Settings;
use crate::util::{WeakKey, WeakKeyedMap};
use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<Arc<FrameCache>> = OnceLock::new();

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: MethodIdentity,

    /// See [`Settings::descriptor_hash`]
    pub settings_hash: u64,

    /// Was the frame rendered from its raw text?
    pub hidden: bool,
}

impl WeakKey for CacheKey {
    fn is_live(&self) -> bool {
        self.method.class.is_live()
    }
}

pub struct FrameCache {
    entries: WeakKeyedMap<CacheKey, Arc<FrameInfo>>,
    computations: AtomicUsize,
}

impl FrameCache {
    pub fn new() -> FrameCache {
        FrameCache {
            entries: WeakKeyedMap::new(),
            computations: AtomicUsize::new(0),
        }
    }

    /// Cache shared by the whole process
    pub fn global() -> Arc<FrameCache> {
        GLOBAL.get_or_init(|| Arc::new(FrameCache::new())).clone()
    }

    /// Resolve frame `index` of a decoder
    ///
    /// `raw` is the textual frame at the same index. It provides the position of this occurrence
    /// and the text used for hidden or unresolved methods.
    pub fn resolve(
        &self,
        decoder: &dyn Decoder,
        index: usize,
        raw: &RawFrame,
        settings: &Settings,
        classifier: Option<&dyn ModuleClassifier>,
    ) -> ResolvedFrame {
        let decoded = decoder.frame_at(index, settings);
        let key = match &decoded.method {
            Some(method) if settings.cache_enabled() => Some(CacheKey {
                method: method.clone(),
                settings_hash: settings.descriptor_hash(),
                hidden: !decoded.hidden.is_empty(),
            }),
            _ => None,
        };

        let info = match key.as_ref().and_then(|key| self.entries.get(key)) {
            Some(info) => info,
            None => {
                let info = Arc::new(self.describe(&decoded, raw, settings));
                match key {
                    Some(key) => self.entries.insert(key, info),
                    None => info,
                }
            }
        };

        // Entries are shared by every platform, so the classifier only applies to this stamp
        let module = match (&info.module_name, classifier) {
            (None, Some(classifier)) => classifier.classify(&raw.class_name),
            _ => None,
        };
        ResolvedFrame::stamped(info, raw.line_number, decoded.byte_index).classified(module)
    }

    /// Resolve every frame of a backtrace token
    ///
    /// When the token has a different depth than `raw_frames`, the raw frames are re-derived
    /// from the runtime. If that is not possible the token is reported as malformed.
    pub fn resolve_all(
        &self,
        runtime: &dyn Runtime,
        back_trace: &BackTrace,
        raw_frames: &[RawFrame],
        settings: &Settings,
        classifier: Option<&dyn ModuleClassifier>,
    ) -> Result<Vec<ResolvedFrame>, Error> {
        let mut decoder = backtrace::decode(back_trace, runtime, raw_frames.len())?;
        let depth = decoder.depth();

        let raw_frames: Cow<[RawFrame]> = if depth == raw_frames.len() {
            Cow::Borrowed(raw_frames)
        } else {
            log::debug!(
                "Backtrace has {} frames but the exception carries {}, re-deriving raw frames",
                depth,
                raw_frames.len()
            );
            match runtime.raw_frames(back_trace, depth) {
                Some(frames) if frames.len() == depth => {
                    decoder.realign(depth);
                    Cow::Owned(frames)
                }
                _ => {
                    return Err(Error::MalformedBackTrace(format!(
                        "depth {} does not match the {} raw frames",
                        depth,
                        raw_frames.len()
                    )))
                }
            }
        };

        Ok(raw_frames
            .iter()
            .enumerate()
            .map(|(index, raw)| self.resolve(&decoder, index, raw, settings, classifier))
            .collect())
    }

    fn describe(
        &self,
        decoded: &DecodedFrame,
        raw: &RawFrame,
        settings: &Settings,
    ) -> FrameInfo {
        self.computations.fetch_add(1, Ordering::Relaxed);

        let class = decoded.class.as_deref();
        let method = match (class, &decoded.method) {
            (
                Some(class),
                Some(MethodIdentity {
                    member: Member::Index(index),
                    ..
                }),
            ) => class.method(*index),
            _ => None,
        };

        let style = settings.style();
        let descriptor = match (class, method) {
            (Some(class), Some(method)) if decoded.hidden.is_empty() => {
                style.method_descriptor(class, method)
            }
            _ => style.fallback_descriptor(raw, decoded.hidden),
        };

        let module = class.and_then(|class| class.module.as_ref());
        FrameInfo {
            descriptor,
            class_name: raw.class_name.clone(),
            method_name: raw.method_name.clone(),
            file_name: raw
                .file_name
                .clone()
                .or_else(|| class.and_then(|class| class.source_file.clone())),
            class_loader_name: class
                .and_then(|class| class.loader.name())
                .map(String::from)
                .or_else(|| raw.class_loader_name.clone()),
            module_name: module
                .map(|module| module.name.clone())
                .or_else(|| raw.module_name.clone()),
            module_version: module
                .and_then(|module| module.version.clone())
                .or_else(|| raw.module_version.clone()),
            method: decoded.method.clone(),
        }
    }

    /// Drop entries (and class indexes) of classes that have been unloaded
    pub fn purge(&self) -> usize {
        let removed = self.entries.purge();
        let indexes = ClassIndex::purge();
        log::debug!(
            "Purged {} frame descriptors and {} class indexes",
            removed,
            indexes
        );
        removed
    }

    /// Host notification that a class is being unloaded
    pub fn class_unloaded(&self, class: &Arc<ClassData>) {
        let removed = self
            .entries
            .remove_where(|key| key.method.class.refers_to(class));
        ClassIndex::forget(class);
        log::trace!("Unloading {} dropped {} frame descriptors", class.name, removed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of descriptors computed so far (hits do not count)
    pub fn descriptor_computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }
}

impl Default for FrameCache {
    fn default() -> FrameCache {
        FrameCache::new()
    }
}
