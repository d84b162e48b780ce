//! Output side of rendering: sinks, colors, and the exception tree walk

mod duplicates;
mod tree;

pub use duplicates::{find_duplicates, DuplicateItem};
pub(crate) use tree::TreePrinter;

use crate::errors::Error;
use crate::settings::ColorScheme;
use crate::style::{ColorRole, StyledText};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// Destination of rendered text
pub trait Sink {
    fn print(&mut self, text: &str) -> Result<(), Error>;

    fn print_char(&mut self, c: char) -> Result<(), Error> {
        let mut buffer = [0; 4];
        self.print(c.encode_utf8(&mut buffer))
    }

    fn println(&mut self) -> Result<(), Error> {
        self.print_char('\n')
    }

    /// Lock to hold for the duration of one render, when several threads share the destination
    fn lock(&self) -> Option<Arc<Mutex<()>>> {
        None
    }
}

impl Sink for String {
    fn print(&mut self, text: &str) -> Result<(), Error> {
        self.push_str(text);
        Ok(())
    }

    fn print_char(&mut self, c: char) -> Result<(), Error> {
        self.push(c);
        Ok(())
    }
}

/// Sink over any writer
pub struct WriteSink<W> {
    writer: W,
    lock: Option<Arc<Mutex<()>>>,
}

impl<W: Write> WriteSink<W> {
    pub fn new(writer: W) -> WriteSink<W> {
        WriteSink { writer, lock: None }
    }

    /// Serialize renders onto this writer with renders of every other sink sharing `lock`
    pub fn with_lock(writer: W, lock: Arc<Mutex<()>>) -> WriteSink<W> {
        WriteSink {
            writer,
            lock: Some(lock),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for WriteSink<W> {
    fn print(&mut self, text: &str) -> Result<(), Error> {
        self.writer.write_all(text.as_bytes())?;
        Ok(())
    }

    fn println(&mut self) -> Result<(), Error> {
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn lock(&self) -> Option<Arc<Mutex<()>>> {
        self.lock.clone()
    }
}

/// Wraps a sink, emitting color escapes in front of segments
///
/// An escape identical to the last one emitted is skipped.
pub struct ColorWriter<'a> {
    sink: &'a mut dyn Sink,
    scheme: Option<&'a ColorScheme>,
    last: Option<&'a str>,
}

impl<'a> ColorWriter<'a> {
    pub fn new(sink: &'a mut dyn Sink, scheme: Option<&'a ColorScheme>) -> ColorWriter<'a> {
        ColorWriter {
            sink,
            scheme,
            last: None,
        }
    }

    /// Switch to the color of `role`
    pub fn color(&mut self, role: ColorRole) -> Result<(), Error> {
        if let Some(scheme) = self.scheme {
            let escape = scheme.escape(role);
            if self.last != Some(escape) {
                self.sink.print(escape)?;
                self.last = Some(escape);
            }
        }
        Ok(())
    }

    /// Print text in the current color
    pub fn plain(&mut self, text: &str) -> Result<(), Error> {
        self.sink.print(text)
    }

    pub fn print(&mut self, role: ColorRole, text: &str) -> Result<(), Error> {
        self.color(role)?;
        self.sink.print(text)
    }

    pub fn styled(&mut self, text: &StyledText) -> Result<(), Error> {
        for (role, segment) in text.segments() {
            self.print(role, segment)?;
        }
        Ok(())
    }

    pub fn println(&mut self) -> Result<(), Error> {
        self.sink.println()
    }

    /// Forget which color was emitted last, so the next color is always emitted
    pub fn reset_last_color(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn repeated_escapes_are_skipped() {
        let scheme = ColorScheme::base();
        let mut out = String::new();
        let mut writer = ColorWriter::new(&mut out, Some(&scheme));

        writer.print(ColorRole::Number, "1").unwrap();
        writer.print(ColorRole::Number, "2").unwrap();
        writer.print(ColorRole::Text, "").unwrap();
        writer.print(ColorRole::Caption, "x").unwrap();
        writer.reset_last_color();
        writer.print(ColorRole::Caption, "y").unwrap();

        assert_eq!(out, "\x1b[38;5;250m12\x1b[0mx\x1b[0my");
    }

    #[test]
    fn no_scheme_means_no_escapes() {
        let mut out = String::new();
        let mut writer = ColorWriter::new(&mut out, None);
        writer.print(ColorRole::Message, "boom").unwrap();
        writer.println().unwrap();
        assert_eq!(out, "boom\n");
    }

    #[test]
    fn write_sink() {
        let mut sink = WriteSink::new(Vec::new());
        sink.print("a").unwrap();
        sink.print_char('b').unwrap();
        sink.println().unwrap();
        assert!(sink.lock().is_none());
        assert_eq!(sink.into_inner(), b"ab\n");
    }
}
