//! Backtraces stored as a counted table of method handles followed by their pcs
//!
//! ```text
//! token := count:u32  method handle:u64 × (count - 1)  pc:u32 × (count - 1)
//! ```
//!
//! The count includes the header entry itself, so an empty backtrace has a count of 1.

use super::{byte_index, malformed, DecodedFrame, Decoder};
use crate::errors::Error;
use crate::runtime::Runtime;
use crate::settings::Settings;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

pub struct MethodTable<'a> {
    runtime: &'a dyn Runtime,
    methods: Vec<u64>,
    pcs: Vec<u32>,
}

impl<'a> MethodTable<'a> {
    pub fn parse(bytes: &[u8], runtime: &'a dyn Runtime) -> Result<MethodTable<'a>, Error> {
        let mut cursor = Cursor::new(bytes);
        let count = cursor
            .read_u32::<LittleEndian>()
            .map_err(|err| malformed("method table", err))?;
        let depth = match count.checked_sub(1) {
            Some(depth) => depth as usize,
            None => {
                let msg = String::from("method table count must include the header entry");
                return Err(Error::MalformedBackTrace(msg));
            }
        };

        let expected = match depth.checked_mul(12).and_then(|body| body.checked_add(4)) {
            Some(expected) => expected,
            None => {
                let msg = format!("method table of {} frames does not fit in memory", depth);
                return Err(Error::MalformedBackTrace(msg));
            }
        };
        if bytes.len() != expected {
            return Err(Error::MalformedBackTrace(format!(
                "method table of {} frames should have {} bytes, but has {}",
                depth,
                expected,
                bytes.len()
            )));
        }

        let mut methods = Vec::with_capacity(depth);
        for _ in 0..depth {
            methods.push(
                cursor
                    .read_u64::<LittleEndian>()
                    .map_err(|err| malformed("method table", err))?,
            );
        }
        let mut pcs = Vec::with_capacity(depth);
        for _ in 0..depth {
            pcs.push(
                cursor
                    .read_u32::<LittleEndian>()
                    .map_err(|err| malformed("method table", err))?,
            );
        }

        Ok(MethodTable {
            runtime,
            methods,
            pcs,
        })
    }
}

impl<'a> Decoder for MethodTable<'a> {
    fn depth(&self) -> usize {
        self.methods.len()
    }

    fn frame_at(&self, index: usize, settings: &Settings) -> DecodedFrame {
        let method = self.methods[index];
        let pc = byte_index(self.pcs[index]);
        match self.runtime.method(method) {
            Some((class, method)) => DecodedFrame::resolved(class, method, pc, settings),
            None => {
                let err = Error::UnresolvableMethod(format!("method handle {:#x}", method));
                DecodedFrame::unresolved(None, method, pc, settings, err)
            }
        }
    }
}

pub fn encode<W: WriteBytesExt>(frames: &[(u64, u32)], writer: &mut W) -> std::io::Result<()> {
    writer.write_u32::<LittleEndian>(frames.len() as u32 + 1)?;
    for (method, _) in frames {
        writer.write_u64::<LittleEndian>(*method)?;
    }
    for (_, pc) in frames {
        writer.write_u32::<LittleEndian>(*pc)?;
    }
    Ok(())
}
