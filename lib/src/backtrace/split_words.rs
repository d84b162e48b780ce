//! Backtraces split into a class handle array and a word array
//!
//! ```text
//! token := count:u32  class handle:u32 × count  word*
//! ```
//!
//! Words are `u32` or `u64` depending on the pointer width of the runtime. The word array is laid
//! out relative to the number of raw frames `n` of the exception: words `[0, n)` are method
//! handles, and the pc of frame `i` is word `n + i`. Because of this, the decoder has to be
//! realigned whenever the raw frames of the exception are re-derived.

use super::{byte_index, malformed, DecodedFrame, Decoder};
use crate::errors::Error;
use crate::runtime::Runtime;
use crate::settings::Settings;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PointerWidth {
    Bits32,
    Bits64,
}

impl PointerWidth {
    pub const fn bytes(self) -> usize {
        match self {
            PointerWidth::Bits32 => 4,
            PointerWidth::Bits64 => 8,
        }
    }
}

pub struct SplitWords<'a> {
    runtime: &'a dyn Runtime,
    classes: Vec<u32>,
    words: Vec<u64>,
    raw_frame_count: usize,
}

impl<'a> SplitWords<'a> {
    pub fn parse(
        bytes: &[u8],
        pointer_width: PointerWidth,
        raw_frame_count: usize,
        runtime: &'a dyn Runtime,
    ) -> Result<SplitWords<'a>, Error> {
        let mut cursor = Cursor::new(bytes);
        let count = cursor
            .read_u32::<LittleEndian>()
            .map_err(|err| malformed("split word", err))? as usize;

        let mut classes = Vec::with_capacity(count.min(bytes.len() / 4));
        for _ in 0..count {
            classes.push(
                cursor
                    .read_u32::<LittleEndian>()
                    .map_err(|err| malformed("split word", err))?,
            );
        }

        let remaining = bytes.len() - cursor.position() as usize;
        if remaining % pointer_width.bytes() != 0 {
            return Err(Error::MalformedBackTrace(format!(
                "split word token has {} trailing bytes, which is not a whole number of words",
                remaining
            )));
        }
        let mut words = Vec::with_capacity(remaining / pointer_width.bytes());
        for _ in 0..remaining / pointer_width.bytes() {
            let word = match pointer_width {
                PointerWidth::Bits32 => cursor.read_u32::<LittleEndian>().map(u64::from),
                PointerWidth::Bits64 => cursor.read_u64::<LittleEndian>(),
            };
            words.push(word.map_err(|err| malformed("split word", err))?);
        }

        if words.len() < count {
            return Err(Error::MalformedBackTrace(format!(
                "split word token has {} classes but only {} words",
                count,
                words.len()
            )));
        }

        Ok(SplitWords {
            runtime,
            classes,
            words,
            raw_frame_count,
        })
    }
}

impl<'a> Decoder for SplitWords<'a> {
    fn depth(&self) -> usize {
        self.classes.len()
    }

    fn frame_at(&self, index: usize, settings: &Settings) -> DecodedFrame {
        let method = self.words[index];
        let pc = self
            .words
            .get(self.raw_frame_count + index)
            .and_then(|pc| byte_index(*pc as u32));

        if let Some((class, method)) = self.runtime.method(method) {
            return DecodedFrame::resolved(class, method, pc, settings);
        }

        let class_handle = self.classes[index];
        let class = self.runtime.class(class_handle as u64);
        let err = Error::UnresolvableMethod(format!(
            "method handle {:#x} (class handle {:#x})",
            method, class_handle
        ));
        DecodedFrame::unresolved(class, method, pc, settings, err)
    }

    fn realign(&mut self, raw_frame_count: usize) {
        log::debug!(
            "Realigning split word backtrace from {} to {} raw frames",
            self.raw_frame_count,
            raw_frame_count
        );
        self.raw_frame_count = raw_frame_count;
    }
}

/// Write `(class handle, method handle, pc)` frames, laid out for as many raw frames as there are
/// frames
pub fn encode<W: WriteBytesExt>(
    frames: &[(u32, u64, u32)],
    pointer_width: PointerWidth,
    writer: &mut W,
) -> std::io::Result<()> {
    let write_word = |writer: &mut W, word: u64| match pointer_width {
        PointerWidth::Bits32 => writer.write_u32::<LittleEndian>(word as u32),
        PointerWidth::Bits64 => writer.write_u64::<LittleEndian>(word),
    };

    writer.write_u32::<LittleEndian>(frames.len() as u32)?;
    for (class, _, _) in frames {
        writer.write_u32::<LittleEndian>(*class)?;
    }
    for (_, method, _) in frames {
        write_word(writer, *method)?;
    }
    for (_, _, pc) in frames {
        write_word(writer, *pc as u64)?;
    }
    Ok(())
}
