//! Backtraces stored as a flat array of `(method handle:u32, pc:u32)` pairs

use super::{byte_index, malformed, DecodedFrame, Decoder};
use crate::errors::Error;
use crate::runtime::Runtime;
use crate::settings::Settings;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

pub struct PcPairs<'a> {
    runtime: &'a dyn Runtime,
    pairs: Vec<(u32, u32)>,
}

impl<'a> PcPairs<'a> {
    pub fn parse(bytes: &[u8], runtime: &'a dyn Runtime) -> Result<PcPairs<'a>, Error> {
        if bytes.len() % 8 != 0 {
            return Err(Error::MalformedBackTrace(format!(
                "pc pair token has {} bytes, which is not a whole number of pairs",
                bytes.len()
            )));
        }

        let mut cursor = Cursor::new(bytes);
        let mut pairs = Vec::with_capacity(bytes.len() / 8);
        for _ in 0..bytes.len() / 8 {
            let method = cursor
                .read_u32::<LittleEndian>()
                .map_err(|err| malformed("pc pair", err))?;
            let pc = cursor
                .read_u32::<LittleEndian>()
                .map_err(|err| malformed("pc pair", err))?;
            pairs.push((method, pc));
        }

        Ok(PcPairs { runtime, pairs })
    }
}

impl<'a> Decoder for PcPairs<'a> {
    fn depth(&self) -> usize {
        self.pairs.len()
    }

    fn frame_at(&self, index: usize, settings: &Settings) -> DecodedFrame {
        let (method, pc) = self.pairs[index];
        match self.runtime.method(method as u64) {
            Some((class, method)) => {
                DecodedFrame::resolved(class, method, byte_index(pc), settings)
            }
            None => {
                let err = Error::UnresolvableMethod(format!("method handle {:#x}", method));
                DecodedFrame::unresolved(None, method as u64, byte_index(pc), settings, err)
            }
        }
    }
}

pub fn encode<W: WriteBytesExt>(frames: &[(u32, u32)], writer: &mut W) -> std::io::Result<()> {
    for (method, pc) in frames {
        writer.write_u32::<LittleEndian>(*method)?;
        writer.write_u32::<LittleEndian>(*pc)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::runtime::Detached;

    #[test]
    fn pairs() {
        let mut bytes = vec![];
        encode(&[(0x10, 4), (0x20, u32::MAX)], &mut bytes).unwrap();
        assert_eq!(&bytes[..8], &[0x10, 0, 0, 0, 4, 0, 0, 0]);

        let decoder = PcPairs::parse(&bytes, &Detached).unwrap();
        assert_eq!(decoder.depth(), 2);
        assert_eq!(decoder.frame_at(0, &Settings::default()).byte_index, Some(4));
        assert_eq!(decoder.frame_at(1, &Settings::default()).byte_index, None);
    }

    #[test]
    fn partial_pair() {
        assert!(matches!(
            PcPairs::parse(&[1, 0, 0, 0, 2], &Detached),
            Err(Error::MalformedBackTrace(_))
        ));
    }
}
