//! Backtraces stored as chunks of `(slot, class)` entries
//!
//! ```text
//! chunk := capacity:u16  slot:u16 × capacity  class handle:u32 × capacity
//! token := chunk*
//! ```
//!
//! The last chunk is usually only partially filled: a zero class handle marks the first unused
//! entry, and so the depth of the backtrace. This shape carries no byte indices.

use super::{malformed, ClassIndex, DecodedFrame, Decoder};
use crate::errors::Error;
use crate::runtime::Runtime;
use crate::settings::Settings;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

pub struct SlotChunks<'a> {
    runtime: &'a dyn Runtime,
    entries: Vec<Entry>,
}

#[derive(Copy, Clone, Debug)]
struct Entry {
    slot: u16,
    class: u32,
}

impl<'a> SlotChunks<'a> {
    pub fn parse(bytes: &[u8], runtime: &'a dyn Runtime) -> Result<SlotChunks<'a>, Error> {
        let mut cursor = Cursor::new(bytes);
        let mut entries = vec![];
        let mut finished = false;

        while (cursor.position() as usize) < bytes.len() {
            let capacity = cursor
                .read_u16::<LittleEndian>()
                .map_err(|err| malformed("slot chunk", err))?;
            let mut slots = Vec::with_capacity(capacity as usize);
            for _ in 0..capacity {
                slots.push(
                    cursor
                        .read_u16::<LittleEndian>()
                        .map_err(|err| malformed("slot chunk", err))?,
                );
            }
            for slot in slots {
                let class = cursor
                    .read_u32::<LittleEndian>()
                    .map_err(|err| malformed("slot chunk", err))?;
                if class == 0 {
                    finished = true;
                }
                if !finished {
                    entries.push(Entry { slot, class });
                }
            }
        }

        Ok(SlotChunks { runtime, entries })
    }
}

impl<'a> Decoder for SlotChunks<'a> {
    fn depth(&self) -> usize {
        self.entries.len()
    }

    fn frame_at(&self, index: usize, settings: &Settings) -> DecodedFrame {
        let Entry { slot, class } = self.entries[index];

        let class_data = match self.runtime.class(class as u64) {
            Some(class_data) => class_data,
            None => {
                let err = Error::UnresolvableMethod(format!("class handle {:#x}", class));
                return DecodedFrame::unresolved(None, slot as u64, None, settings, err);
            }
        };

        match ClassIndex::of(&class_data).method_for_slot(slot) {
            Some(method) => DecodedFrame::resolved(class_data, method, None, settings),
            None => {
                let err = Error::UnresolvableMethod(format!(
                    "slot {} of {}",
                    slot, class_data.name
                ));
                DecodedFrame::unresolved(Some(class_data), slot as u64, None, settings, err)
            }
        }
    }
}

/// Write `(class handle, slot)` frames as chunks of `chunk_capacity` entries
///
/// The final chunk is padded with unused entries.
pub fn encode<W: WriteBytesExt>(
    frames: &[(u32, u16)],
    chunk_capacity: u16,
    writer: &mut W,
) -> std::io::Result<()> {
    let capacity = chunk_capacity.max(1) as usize;
    for chunk in frames.chunks(capacity) {
        writer.write_u16::<LittleEndian>(capacity as u16)?;
        for index in 0..capacity {
            let slot = chunk.get(index).map_or(0, |(_, slot)| *slot);
            writer.write_u16::<LittleEndian>(slot)?;
        }
        for index in 0..capacity {
            let class = chunk.get(index).map_or(0, |(class, _)| *class);
            writer.write_u32::<LittleEndian>(class)?;
        }
    }
    Ok(())
}
