//! Frames, before and after resolution
//!
//! A [`RawFrame`] is the textual view of a frame that every exception carries. A
//! [`ResolvedFrame`] adds a descriptor computed from the resolved method, and is what the
//! frame cache hands out.

pub mod cache;

use crate::backtrace::HiddenFlags;
use crate::runtime::MethodIdentity;
use crate::style::{Style, StyledText};
use std::collections::hash_map::DefaultHasher;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Source line of a frame
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum LineNumber {
    #[default]
    Unknown,

    /// Frame of a native method
    Native,

    Line(u32),
}

impl LineNumber {
    /// Convert from the integer encoding used by the runtime (`-2` native, other negatives unknown)
    pub fn from_java(line: i32) -> LineNumber {
        match line {
            -2 => LineNumber::Native,
            line if line < 0 => LineNumber::Unknown,
            line => LineNumber::Line(line as u32),
        }
    }

    pub fn to_java(self) -> i32 {
        match self {
            LineNumber::Unknown => -1,
            LineNumber::Native => -2,
            LineNumber::Line(line) => i32::try_from(line).unwrap_or(i32::MAX),
        }
    }

    pub fn line(self) -> Option<u32> {
        match self {
            LineNumber::Line(line) => Some(line),
            _ => None,
        }
    }
}

/// Frame as text, the way the runtime captured it
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RawFrame {
    /// Declaring class, in dotted form
    pub class_name: String,
    pub method_name: String,
    pub file_name: Option<String>,
    pub line_number: LineNumber,
    pub class_loader_name: Option<String>,
    pub module_name: Option<String>,
    pub module_version: Option<String>,
}

impl RawFrame {
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        file_name: Option<&str>,
        line_number: LineNumber,
    ) -> RawFrame {
        RawFrame {
            class_name: class_name.into(),
            method_name: method_name.into(),
            file_name: file_name.map(String::from),
            line_number,
            class_loader_name: None,
            module_name: None,
            module_version: None,
        }
    }

    pub fn with_class_loader(mut self, name: impl Into<String>) -> RawFrame {
        self.class_loader_name = Some(name.into());
        self
    }

    pub fn with_module(mut self, name: impl Into<String>, version: Option<&str>) -> RawFrame {
        self.module_name = Some(name.into());
        self.module_version = version.map(String::from);
        self
    }

    pub fn is_native(&self) -> bool {
        self.line_number == LineNumber::Native
    }
}

/// Part of a resolved frame shared by every occurrence of the same method
#[derive(Clone, Debug)]
pub struct FrameInfo {
    pub descriptor: StyledText,
    pub class_name: String,
    pub method_name: String,
    pub file_name: Option<String>,
    pub class_loader_name: Option<String>,
    pub module_name: Option<String>,
    pub module_version: Option<String>,

    /// Method the descriptor was computed from, if any
    pub method: Option<MethodIdentity>,
}

/// Frame with a precomputed descriptor
///
/// The descriptor (with the rest of the per-method data) is shared: stamping the frame with
/// another position only copies a pointer.
#[derive(Clone, Debug)]
pub struct ResolvedFrame {
    info: Arc<FrameInfo>,
    line_number: LineNumber,
    byte_index: Option<u32>,

    /// Module named by the platform's classifier when the frame itself has none
    classified_module: Option<Arc<str>>,
}

impl ResolvedFrame {
    pub fn new(info: FrameInfo, line_number: LineNumber, byte_index: Option<u32>) -> ResolvedFrame {
        ResolvedFrame::stamped(Arc::new(info), line_number, byte_index)
    }

    pub(crate) fn stamped(
        info: Arc<FrameInfo>,
        line_number: LineNumber,
        byte_index: Option<u32>,
    ) -> ResolvedFrame {
        ResolvedFrame {
            info,
            line_number,
            byte_index,
            classified_module: None,
        }
    }

    /// Fill in a module for frames that do not know theirs
    pub(crate) fn classified(mut self, module: Option<String>) -> ResolvedFrame {
        if self.info.module_name.is_none() {
            self.classified_module = module.map(Arc::from);
        }
        self
    }

    /// Frame whose descriptor is the fallback descriptor of a raw frame
    pub fn from_raw(frame: &RawFrame, style: Style) -> ResolvedFrame {
        ResolvedFrame::new(
            FrameInfo {
                descriptor: style.fallback_descriptor(frame, HiddenFlags::empty()),
                class_name: frame.class_name.clone(),
                method_name: frame.method_name.clone(),
                file_name: frame.file_name.clone(),
                class_loader_name: frame.class_loader_name.clone(),
                module_name: frame.module_name.clone(),
                module_version: frame.module_version.clone(),
                method: None,
            },
            frame.line_number,
            None,
        )
    }

    /// Same method at another position
    pub fn with_position(&self, line_number: LineNumber, byte_index: Option<u32>) -> ResolvedFrame {
        ResolvedFrame {
            line_number,
            byte_index,
            ..self.clone()
        }
    }

    pub fn descriptor(&self) -> &StyledText {
        &self.info.descriptor
    }

    pub fn class_name(&self) -> &str {
        &self.info.class_name
    }

    pub fn method_name(&self) -> &str {
        &self.info.method_name
    }

    pub fn file_name(&self) -> Option<&str> {
        self.info.file_name.as_deref()
    }

    pub fn class_loader_name(&self) -> Option<&str> {
        self.info.class_loader_name.as_deref()
    }

    pub fn module_name(&self) -> Option<&str> {
        self.info
            .module_name
            .as_deref()
            .or(self.classified_module.as_deref())
    }

    pub fn module_version(&self) -> Option<&str> {
        self.info.module_version.as_deref()
    }

    pub fn method(&self) -> Option<&MethodIdentity> {
        self.info.method.as_ref()
    }

    pub fn line_number(&self) -> LineNumber {
        self.line_number
    }

    pub fn byte_index(&self) -> Option<u32> {
        self.byte_index
    }

    pub fn is_native(&self) -> bool {
        self.line_number == LineNumber::Native
    }

    /// Do both frames use the very same descriptor allocation?
    pub fn shares_descriptor(&self, other: &ResolvedFrame) -> bool {
        Arc::ptr_eq(&self.info, &other.info)
    }

    pub fn to_raw_frame(&self) -> RawFrame {
        RawFrame {
            class_name: self.info.class_name.clone(),
            method_name: self.info.method_name.clone(),
            file_name: self.info.file_name.clone(),
            line_number: self.line_number,
            class_loader_name: self.info.class_loader_name.clone(),
            module_name: self.module_name().map(String::from),
            module_version: self.info.module_version.clone(),
        }
    }
}

impl PartialEq for ResolvedFrame {
    fn eq(&self, other: &ResolvedFrame) -> bool {
        self.line_number == other.line_number
            && self.byte_index == other.byte_index
            && (self.shares_descriptor(other)
                || (self.info.descriptor.as_str() == other.info.descriptor.as_str()
                    && self.info.file_name == other.info.file_name))
    }
}

impl Eq for ResolvedFrame {}

impl Hash for ResolvedFrame {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.line_number.hash(state);
        self.byte_index.hash(state);
        self.info.descriptor.as_str().hash(state);
        self.info.file_name.hash(state);
    }
}

impl Display for ResolvedFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.info.descriptor.as_str())?;
        if let Some(file_name) = self.file_name() {
            write!(f, " ({}", file_name)?;
            if let Some(line) = self.line_number.line() {
                write!(f, ":{}", line)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Either kind of frame, as seen by elision and duplicate detection
#[derive(Copy, Clone, Debug)]
pub enum Trace<'a> {
    Resolved(&'a ResolvedFrame),
    Raw(&'a RawFrame),
}

impl<'a> Trace<'a> {
    pub fn class_name(self) -> &'a str {
        match self {
            Trace::Resolved(frame) => frame.class_name(),
            Trace::Raw(frame) => &frame.class_name,
        }
    }

    pub fn method_name(self) -> &'a str {
        match self {
            Trace::Resolved(frame) => frame.method_name(),
            Trace::Raw(frame) => &frame.method_name,
        }
    }

    pub fn file_name(self) -> Option<&'a str> {
        match self {
            Trace::Resolved(frame) => frame.file_name(),
            Trace::Raw(frame) => frame.file_name.as_deref(),
        }
    }

    pub fn line_number(self) -> LineNumber {
        match self {
            Trace::Resolved(frame) => frame.line_number(),
            Trace::Raw(frame) => frame.line_number,
        }
    }

    /// Same class, method, file and line (whatever the kind of either frame)
    pub fn is_similar(self, other: Trace<'_>) -> bool {
        self.line_number() == other.line_number()
            && self.method_name() == other.method_name()
            && self.class_name() == other.class_name()
            && self.file_name() == other.file_name()
    }

    /// Hash consistent with [`Trace::duplicate_eq`]
    pub fn duplicate_hash(self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match self {
            Trace::Resolved(frame) => frame.hash(&mut hasher),
            Trace::Raw(frame) => frame.hash(&mut hasher),
        }
        hasher.finish()
    }

    /// Structural equality used to find repeated blocks
    pub fn duplicate_eq(self, other: Trace<'_>) -> bool {
        match (self, other) {
            (Trace::Resolved(a), Trace::Resolved(b)) => a == b,
            (Trace::Raw(a), Trace::Raw(b)) => a == b,
            _ => false,
        }
    }
}

/// Frames of one exception
#[derive(Clone, Debug)]
pub enum FrameList {
    Resolved(Arc<[ResolvedFrame]>),

    /// Frames that could not be (or were not) resolved
    Raw(Arc<[RawFrame]>),
}

impl FrameList {
    pub fn len(&self) -> usize {
        match self {
            FrameList::Resolved(frames) => frames.len(),
            FrameList::Raw(frames) => frames.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Trace<'_>> {
        match self {
            FrameList::Resolved(frames) => frames.get(index).map(Trace::Resolved),
            FrameList::Raw(frames) => frames.get(index).map(Trace::Raw),
        }
    }

    /// Frame `index`, which must be below `len()`
    pub fn at(&self, index: usize) -> Trace<'_> {
        match self {
            FrameList::Resolved(frames) => Trace::Resolved(&frames[index]),
            FrameList::Raw(frames) => Trace::Raw(&frames[index]),
        }
    }

    pub fn traces(&self) -> impl DoubleEndedIterator<Item = Trace<'_>> + ExactSizeIterator + '_ {
        (0..self.len()).map(move |index| self.at(index))
    }
}
