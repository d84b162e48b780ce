use super::{find_duplicates, ColorWriter, DuplicateItem, Sink};
use crate::errors::Error;
use crate::frame::{FrameList, Trace};
use crate::graph::{ExceptionGraph, NodeId};
use crate::platform::Platform;
use crate::settings::Settings;
use crate::style::ColorRole;
use std::collections::HashSet;
use std::sync::Arc;

/// One walk over an exception graph
///
/// Visited nodes and display ids live as long as the printer, so a printer is used for exactly
/// one render.
pub(crate) struct TreePrinter<'a> {
    platform: &'a Platform,
    graph: &'a ExceptionGraph,
    settings: &'a Settings,
    out: ColorWriter<'a>,
    visited: HashSet<NodeId>,

    /// Nodes in the order they got their display id
    display_ids: Vec<NodeId>,
}

impl<'a> TreePrinter<'a> {
    pub fn new(
        platform: &'a Platform,
        graph: &'a ExceptionGraph,
        settings: &'a Settings,
        sink: &'a mut dyn Sink,
    ) -> TreePrinter<'a> {
        TreePrinter {
            platform,
            graph,
            settings,
            out: ColorWriter::new(sink, settings.color_scheme()),
            visited: HashSet::new(),
            display_ids: vec![],
        }
    }

    /// Print the tree rooted at `root`
    pub fn print(&mut self, root: NodeId) -> Result<(), Error> {
        let enclosing = if self.settings.fold_enabled() {
            Some(FrameList::Raw(Arc::from(Vec::new())))
        } else {
            None
        };
        self.visit(root, enclosing.as_ref(), "")
    }

    /// Print the header of `node` alone
    pub fn describe(&mut self, node: NodeId) -> Result<(), Error> {
        self.header(node, "")?;
        Ok(())
    }

    fn visit(
        &mut self,
        id: NodeId,
        enclosing: Option<&FrameList>,
        prefix: &str,
    ) -> Result<(), Error> {
        let graph = self.graph;
        let settings = self.settings;
        let node = graph.node(id)?;

        if !self.visited.insert(id) {
            return self.circular_reference(id, prefix);
        }
        if settings.throwable_id_visible() {
            self.display_id(id);
        }

        let frames = self.platform.frame_list(node, settings);
        let in_common = match enclosing {
            Some(enclosing) => frames
                .traces()
                .rev()
                .zip(enclosing.traces().rev())
                .take_while(|(trace, enclosing)| trace.is_similar(*enclosing))
                .count(),
            None => 0,
        };
        let explicit = frames.len() - in_common;

        self.header(id, prefix)?;
        self.out.println()?;

        let duplicates = if settings.check_duplicate_trace_enabled() {
            self.duplicates(&frames, explicit)
        } else {
            vec![]
        };

        let style = settings.style();
        let mut duplicates = duplicates.into_iter().peekable();
        let mut index = 0;
        while index < explicit {
            match duplicates.next_if(|item| item.start == index) {
                Some(item) => {
                    for offset in 0..item.size {
                        self.frame_line(frames.at(index + offset), prefix, style.at_duplicate())?;
                    }
                    self.more_line(prefix, Some(style.at_duplicate()), item.count - 1)?;
                    index = item.end();
                }
                None => {
                    self.frame_line(frames.at(index), prefix, style.at())?;
                    index += 1;
                }
            }
        }
        if in_common != 0 {
            self.more_line(prefix, None, in_common)?;
        }

        let enclosing = enclosing.map(|_| &frames);
        let nested_prefix = format!("{}{}", prefix, settings.tab());
        for suppressed in &node.suppressed {
            self.out.plain(&nested_prefix)?;
            self.out.print(ColorRole::Caption, "Suppressed")?;
            self.out.print(ColorRole::Punctuation, ": ")?;
            self.visit(*suppressed, enclosing, &nested_prefix)?;
        }
        if let Some(cause) = node.cause {
            self.out.plain(prefix)?;
            self.out.print(ColorRole::Caption, "Caused by")?;
            self.out.print(ColorRole::Punctuation, ": ")?;
            self.visit(cause, enclosing, prefix)?;
        }
        Ok(())
    }

    /// Repeated blocks among the first `explicit` frames
    fn duplicates(&self, frames: &FrameList, explicit: usize) -> Vec<DuplicateItem> {
        let max_size = self.settings.duplicate_trace_max_size();
        if self.settings.only_compare_hash_code_enabled() {
            let hashes: Vec<u64> = frames
                .traces()
                .take(explicit)
                .map(Trace::duplicate_hash)
                .collect();
            find_duplicates(explicit, max_size, |a, b| hashes[a] == hashes[b])
        } else {
            find_duplicates(explicit, max_size, |a, b| {
                frames.at(a).duplicate_eq(frames.at(b))
            })
        }
    }

    fn frame_line(&mut self, trace: Trace<'_>, prefix: &str, at: &str) -> Result<(), Error> {
        let text = self.settings.style().render_trace(trace, self.settings);
        self.out.plain(prefix)?;
        self.out.plain(self.settings.tab())?;
        self.out.print(ColorRole::At, at)?;
        self.out.styled(&text)?;
        self.out.color(ColorRole::Text)?;
        self.out.reset_last_color();
        self.out.println()
    }

    /// `... N more`, after a repeated block (with its marker) or after the explicit frames
    fn more_line(&mut self, prefix: &str, at: Option<&str>, count: usize) -> Result<(), Error> {
        self.out.plain(prefix)?;
        self.out.plain(self.settings.tab())?;
        if let Some(at) = at {
            self.out.print(ColorRole::At, at)?;
        }
        self.out.print(ColorRole::Punctuation, "... ")?;
        self.out.print(ColorRole::Number, &count.to_string())?;
        self.out.print(ColorRole::Text, " more")?;
        self.out.println()
    }

    fn circular_reference(&mut self, id: NodeId, prefix: &str) -> Result<(), Error> {
        self.out.print(ColorRole::Punctuation, "[")?;
        self.out.print(ColorRole::Caption, "CIRCULAR REFERENCE")?;
        self.out.print(ColorRole::Punctuation, ": ")?;
        if !self.header(id, prefix)? {
            self.out.println()?;
            self.out.plain(prefix)?;
        }
        self.out.print(ColorRole::Punctuation, "]")?;
        self.out.color(ColorRole::Text)?;
        self.out.println()
    }

    /// Print the header of a node, returning whether it fit on one line
    ///
    /// Causes whose `class: message` text already appears in the text of the node are merged
    /// into the header, one per line. A message that only repeats the text of the next merged
    /// cause is left out.
    fn header(&mut self, id: NodeId, prefix: &str) -> Result<bool, Error> {
        let graph = self.graph;
        let root = graph.node(id)?;
        let root_string = root.to_string();

        let mut chain = vec![(id, root)];
        let mut strings = vec![root_string.clone()];
        let mut next = root.cause;
        while let Some(cause_id) = next {
            if chain.iter().any(|(seen, _)| *seen == cause_id) {
                break;
            }
            let cause = graph.node(cause_id)?;
            let cause_string = cause.to_string();
            if !root_string.contains(&cause_string) {
                break;
            }
            chain.push((cause_id, cause));
            strings.push(cause_string);
            next = cause.cause;
        }

        let mut messages: Vec<Option<&str>> = chain
            .iter()
            .map(|(_, node)| node.message.as_deref())
            .collect();
        for index in 0..chain.len() - 1 {
            if messages[index] == Some(strings[index + 1].as_str()) {
                messages[index] = None;
            }
        }

        for (index, (id, node)) in chain.iter().enumerate() {
            if index != 0 {
                self.out.plain(prefix)?;
                self.out.plain(self.settings.tab())?;
            }

            let (package, simple) = match node.class_name.rsplit_once('.') {
                Some((package, simple)) => (Some(package), simple),
                None => (None, node.class_name.as_str()),
            };
            for segment in package.into_iter().flat_map(|package| package.split('.')) {
                self.out.print(ColorRole::PackageName, segment)?;
                self.out.print(ColorRole::Punctuation, ".")?;
            }
            self.out.print(ColorRole::ClassName, simple)?;

            if self.settings.throwable_id_visible() {
                let display_id = self.display_id(*id);
                self.out.print(ColorRole::Punctuation, "<")?;
                self.out.print(ColorRole::Number, &display_id.to_string())?;
                self.out.print(ColorRole::Punctuation, ">")?;
            }

            if let Some(message) = messages[index] {
                self.out.print(ColorRole::Punctuation, ": ")?;
                self.out.print(ColorRole::Message, message)?;
            }

            if index + 1 != chain.len() {
                self.out.println()?;
            }
        }
        Ok(chain.len() == 1)
    }

    /// Display id of a node, assigning the next one on first sight
    fn display_id(&mut self, id: NodeId) -> usize {
        match self.display_ids.iter().position(|seen| *seen == id) {
            Some(display_id) => display_id,
            None => {
                self.display_ids.push(id);
                self.display_ids.len() - 1
            }
        }
    }
}
