//! Decoding opaque backtrace tokens into method identities
//!
//! Different runtimes lay out their captured call stacks differently. Each layout is one variant
//! of [`BackTrace`] and gets its own decoder, but all of them answer the same questions through
//! [`Decoder`]: how many frames are there, and which method (and byte index) is frame `i`.

mod class_index;
pub mod method_table;
pub mod pc_pairs;
pub mod slot_chunks;
pub mod split_words;

pub use class_index::ClassIndex;
pub use method_table::MethodTable;
pub use pc_pairs::PcPairs;
pub use slot_chunks::SlotChunks;
pub use split_words::{PointerWidth, SplitWords};

use crate::errors::Error;
use crate::runtime::{ClassData, Member, MethodIdentity, Runtime};
use crate::settings::Settings;
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// Reasons for rendering a frame from its raw text instead of from the resolved method
    pub struct HiddenFlags: u8 {
        /// Declared by a class from the boot or system class loader
        const BOOT_CLASS_LOADER = 0x01;

        /// Declaring class is synthetic
        const CLASS_SYNTHETIC = 0x02;

        /// Method is synthetic or a bridge
        const METHOD_SYNTHETIC = 0x04;

        /// More than one method of the declaring class has this name
        const AMBIGUOUS_NAME = 0x08;

        /// The runtime could not resolve the method
        const UNRESOLVED = 0x10;
    }
}

/// Opaque backtrace token, in one of the supported physical shapes
///
/// All integers inside the tokens are little-endian.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BackTrace {
    /// Chunks of `(slot, class handle)` entries, see [`slot_chunks`]
    SlotChunks(Vec<u8>),

    /// Flat `(method handle, pc)` pairs, see [`pc_pairs`]
    PcPairs(Vec<u8>),

    /// Counted method handle table followed by a pc table, see [`method_table`]
    MethodTable(Vec<u8>),

    /// Class handles followed by a word array of method handles and pcs, see [`split_words`]
    SplitWords {
        pointer_width: PointerWidth,
        bytes: Vec<u8>,
    },
}

impl BackTrace {
    /// Encode `(class handle, slot)` frames into chunks holding up to `chunk_capacity` entries
    pub fn slot_chunks(frames: &[(u32, u16)], chunk_capacity: u16) -> std::io::Result<BackTrace> {
        let mut bytes = vec![];
        slot_chunks::encode(frames, chunk_capacity, &mut bytes)?;
        Ok(BackTrace::SlotChunks(bytes))
    }

    /// Encode `(method handle, pc)` frames
    pub fn pc_pairs(frames: &[(u32, u32)]) -> std::io::Result<BackTrace> {
        let mut bytes = vec![];
        pc_pairs::encode(frames, &mut bytes)?;
        Ok(BackTrace::PcPairs(bytes))
    }

    /// Encode `(method handle, pc)` frames
    pub fn method_table(frames: &[(u64, u32)]) -> std::io::Result<BackTrace> {
        let mut bytes = vec![];
        method_table::encode(frames, &mut bytes)?;
        Ok(BackTrace::MethodTable(bytes))
    }

    /// Encode `(class handle, method handle, pc)` frames
    pub fn split_words(
        frames: &[(u32, u64, u32)],
        pointer_width: PointerWidth,
    ) -> std::io::Result<BackTrace> {
        let mut bytes = vec![];
        split_words::encode(frames, pointer_width, &mut bytes)?;
        Ok(BackTrace::SplitWords {
            pointer_width,
            bytes,
        })
    }
}

/// One decoded frame
#[derive(Clone, Debug)]
pub struct DecodedFrame {
    /// Identity of the method, when at least the declaring class is known
    pub method: Option<MethodIdentity>,

    /// Declaring class, if resolved
    pub class: Option<Arc<ClassData>>,

    /// Reasons to render from raw text, computed under the visibility toggles of the settings
    pub hidden: HiddenFlags,

    /// Byte code index or native pc
    pub byte_index: Option<u32>,
}

impl DecodedFrame {
    /// Frame for a method the runtime resolved
    fn resolved(
        class: Arc<ClassData>,
        index: usize,
        byte_index: Option<u32>,
        settings: &Settings,
    ) -> DecodedFrame {
        let hidden = hidden_flags(&class, Some(index), settings);
        DecodedFrame {
            method: Some(MethodIdentity::new(&class, Member::Index(index))),
            class: Some(class),
            hidden,
            byte_index,
        }
    }

    /// Frame for a method that did not resolve (see [`Error::UnresolvableMethod`])
    fn unresolved(
        class: Option<Arc<ClassData>>,
        handle: u64,
        byte_index: Option<u32>,
        settings: &Settings,
        error: Error,
    ) -> DecodedFrame {
        log::debug!("{}", error);
        let hidden = match &class {
            Some(class) => hidden_flags(class, None, settings),
            None => HiddenFlags::empty(),
        };
        DecodedFrame {
            method: class
                .as_ref()
                .map(|class| MethodIdentity::new(class, Member::Unresolved(handle))),
            class,
            hidden: hidden | HiddenFlags::UNRESOLVED,
            byte_index,
        }
    }
}

/// Access to the frames of a backtrace token
pub trait Decoder {
    /// Number of frames the token describes
    fn depth(&self) -> usize;

    /// Decode frame `index` (which must be below `depth()`)
    ///
    /// Decoding is deterministic: the same index under the same settings always produces the same
    /// identity and hidden flags.
    fn frame_at(&self, index: usize, settings: &Settings) -> DecodedFrame;

    /// Tell the decoder how many raw frames the exception now carries
    ///
    /// Only shapes whose layout depends on the raw frame count care about this.
    fn realign(&mut self, raw_frame_count: usize) {
        let _ = raw_frame_count;
    }
}

/// Decoder for any of the supported shapes
pub enum BackTraceDecoder<'a> {
    SlotChunks(SlotChunks<'a>),
    PcPairs(PcPairs<'a>),
    MethodTable(MethodTable<'a>),
    SplitWords(SplitWords<'a>),
}

impl<'a> Decoder for BackTraceDecoder<'a> {
    fn depth(&self) -> usize {
        match self {
            BackTraceDecoder::SlotChunks(decoder) => decoder.depth(),
            BackTraceDecoder::PcPairs(decoder) => decoder.depth(),
            BackTraceDecoder::MethodTable(decoder) => decoder.depth(),
            BackTraceDecoder::SplitWords(decoder) => decoder.depth(),
        }
    }

    fn frame_at(&self, index: usize, settings: &Settings) -> DecodedFrame {
        match self {
            BackTraceDecoder::SlotChunks(decoder) => decoder.frame_at(index, settings),
            BackTraceDecoder::PcPairs(decoder) => decoder.frame_at(index, settings),
            BackTraceDecoder::MethodTable(decoder) => decoder.frame_at(index, settings),
            BackTraceDecoder::SplitWords(decoder) => decoder.frame_at(index, settings),
        }
    }

    fn realign(&mut self, raw_frame_count: usize) {
        match self {
            BackTraceDecoder::SlotChunks(decoder) => decoder.realign(raw_frame_count),
            BackTraceDecoder::PcPairs(decoder) => decoder.realign(raw_frame_count),
            BackTraceDecoder::MethodTable(decoder) => decoder.realign(raw_frame_count),
            BackTraceDecoder::SplitWords(decoder) => decoder.realign(raw_frame_count),
        }
    }
}

/// Parse a token into a decoder
///
/// `raw_frame_count` is the number of textual frames the exception carries.
pub fn decode<'a>(
    back_trace: &BackTrace,
    runtime: &'a dyn Runtime,
    raw_frame_count: usize,
) -> Result<BackTraceDecoder<'a>, Error> {
    Ok(match back_trace {
        BackTrace::SlotChunks(bytes) => {
            BackTraceDecoder::SlotChunks(SlotChunks::parse(bytes, runtime)?)
        }
        BackTrace::PcPairs(bytes) => BackTraceDecoder::PcPairs(PcPairs::parse(bytes, runtime)?),
        BackTrace::MethodTable(bytes) => {
            BackTraceDecoder::MethodTable(MethodTable::parse(bytes, runtime)?)
        }
        BackTrace::SplitWords {
            pointer_width,
            bytes,
        } => BackTraceDecoder::SplitWords(SplitWords::parse(
            bytes,
            *pointer_width,
            raw_frame_count,
            runtime,
        )?),
    })
}

/// Compute the hidden flags of a method of `class` (or of an unknown member when `index` is
/// `None`) under the visibility toggles of `settings`
pub fn hidden_flags(class: &Arc<ClassData>, index: Option<usize>, settings: &Settings) -> HiddenFlags {
    let mut flags = HiddenFlags::empty();
    let method = index.and_then(|index| class.method(index));

    if !settings.boot_method_type_visible() && class.is_boot() {
        flags |= HiddenFlags::BOOT_CLASS_LOADER;
    }

    if !settings.synthesized_method_type_visible() {
        if class.is_synthetic() {
            flags |= HiddenFlags::CLASS_SYNTHETIC;
        }
        if method.map_or(false, |method| method.is_synthetic()) {
            flags |= HiddenFlags::METHOD_SYNTHETIC;
        }
    }

    if !settings.unique_method_type_visible() {
        if let Some(method) = method {
            if ClassIndex::of(class).is_ambiguous(&method.name) {
                flags |= HiddenFlags::AMBIGUOUS_NAME;
            }
        }
    }

    flags
}

/// Byte index stored in a token, with the all-ones pattern meaning "unknown"
fn byte_index(raw: u32) -> Option<u32> {
    if raw == u32::MAX {
        None
    } else {
        Some(raw)
    }
}

fn malformed(shape: &str, err: std::io::Error) -> Error {
    Error::MalformedBackTrace(format!("{} token is truncated ({})", shape, err))
}
