use crate::error::FmtError;
use trex::frame::{LineNumber, RawFrame};
use trex::{ExceptionGraph, ExceptionNode, NodeId};

/// Exception read from a dump, not yet placed in a graph
#[derive(Debug)]
struct Dumped {
    class_name: String,
    message: Option<String>,
    frames: Vec<RawFrame>,

    /// Exception this one is the cause or a suppressed exception of
    parent: Option<usize>,
    cause: Option<Link>,
    suppressed: Vec<Link>,

    /// Whether the next unstructured line still belongs to the message
    open_message: bool,
}

impl Dumped {
    fn new(header: &str, parent: Option<usize>) -> Dumped {
        let (class_name, message) = parse_header(header);
        Dumped {
            class_name: String::from(class_name),
            message: message.map(String::from),
            frames: vec![],
            parent,
            cause: None,
            suppressed: vec![],
            open_message: true,
        }
    }

    fn header(&self) -> String {
        match &self.message {
            Some(message) => format!("{}: {}", self.class_name, message),
            None => self.class_name.clone(),
        }
    }
}

#[derive(Debug)]
enum Link {
    Node(usize),

    /// `[CIRCULAR REFERENCE: header]`, matched against earlier headers
    Circular(String),
}

/// Exceptions of a textual stack trace dump
///
/// Nesting follows the leading tabs: a `Caused by:` line belongs to the last exception whose
/// header has the same indentation, a `Suppressed:` line to the last one indented one tab less.
#[derive(Debug, Default)]
pub struct Dump {
    exceptions: Vec<Dumped>,
    roots: Vec<usize>,
}

impl Dump {
    pub fn parse(text: &str) -> Result<Dump, FmtError> {
        let mut dump = Dump::default();

        // Exceptions still accepting causes and suppressed exceptions, with their indentation
        let mut open: Vec<(usize, usize)> = vec![];
        let mut current: Option<usize> = None;

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            let indent = line.chars().take_while(|c| *c == '\t').count();
            let indented = line.starts_with(char::is_whitespace);
            let body = line.trim();
            if body.is_empty() {
                continue;
            }

            if let (true, Some(frame)) = (indented, body.strip_prefix("at ")) {
                let current = dump.close_message(current, line_number)?;
                let frame = parse_frame(frame)
                    .ok_or_else(|| FmtError::dump(line_number, "unrecognized frame"))?;
                dump.exceptions[current].frames.push(frame);
            } else if let Some(count) = parse_more(body) {
                let current = dump.close_message(current, line_number)?;
                dump.expand_common_frames(current, count, line_number)?;
            } else if let Some(header) = body.strip_prefix("Caused by: ") {
                dump.close_message(current, line_number).ok();
                while open.last().map_or(false, |(open_indent, _)| *open_indent > indent) {
                    open.pop();
                }
                let owner = match open.last() {
                    Some((open_indent, owner)) if *open_indent == indent => *owner,
                    _ => return Err(FmtError::dump(line_number, "cause without an exception")),
                };
                let (link, added) = dump.add_linked(header, owner);
                dump.exceptions[owner].cause = Some(link);
                if let (Some(added), Some(top)) = (added, open.last_mut()) {
                    *top = (indent, added);
                }
                current = added;
            } else if let Some(header) = body.strip_prefix("Suppressed: ") {
                dump.close_message(current, line_number).ok();
                while open.last().map_or(false, |(open_indent, _)| *open_indent >= indent) {
                    open.pop();
                }
                let owner = match open.last() {
                    Some((open_indent, owner)) if *open_indent + 1 == indent => *owner,
                    _ => {
                        return Err(FmtError::dump(
                            line_number,
                            "suppressed exception without an exception",
                        ))
                    }
                };
                let (link, added) = dump.add_linked(header, owner);
                dump.exceptions[owner].suppressed.push(link);
                if let Some(added) = added {
                    open.push((indent, added));
                }
                current = added;
            } else if let Some(dumped) = current
                .map(|current| &mut dump.exceptions[current])
                .filter(|dumped| dumped.open_message)
            {
                let message = dumped.message.get_or_insert_with(String::new);
                message.push('\n');
                message.push_str(line);
            } else if indent == 0 {
                let added = dump.exceptions.len();
                dump.exceptions.push(Dumped::new(line.trim(), None));
                dump.roots.push(added);
                open.clear();
                open.push((0, added));
                current = Some(added);
            } else {
                return Err(FmtError::dump(line_number, "unexpected line"));
            }
        }

        log::debug!(
            "Parsed {} exception(s) under {} root(s)",
            dump.exceptions.len(),
            dump.roots.len()
        );
        Ok(dump)
    }

    /// Exception receiving frames, which stops extending its message
    fn close_message(&mut self, current: Option<usize>, line: usize) -> Result<usize, FmtError> {
        let current = current.ok_or_else(|| FmtError::dump(line, "frame outside of an exception"))?;
        self.exceptions[current].open_message = false;
        Ok(current)
    }

    /// Add the exception behind a `Caused by:` or `Suppressed:` caption
    fn add_linked(&mut self, header: &str, owner: usize) -> (Link, Option<usize>) {
        let circular = header
            .strip_prefix("[CIRCULAR REFERENCE: ")
            .and_then(|header| header.strip_suffix(']'));
        match circular {
            Some(header) => (Link::Circular(String::from(header)), None),
            None => {
                let added = self.exceptions.len();
                self.exceptions.push(Dumped::new(header, Some(owner)));
                (Link::Node(added), Some(added))
            }
        }
    }

    /// `... N more` repeats the last `N` frames of the enclosing exception
    fn expand_common_frames(
        &mut self,
        current: usize,
        count: usize,
        line: usize,
    ) -> Result<(), FmtError> {
        let parent = self.exceptions[current]
            .parent
            .ok_or_else(|| FmtError::dump(line, "common frames without an enclosing exception"))?;
        let enclosing = &self.exceptions[parent].frames;
        if count > enclosing.len() {
            return Err(FmtError::dump(
                line,
                format!(
                    "{} common frames, but the enclosing exception has {}",
                    count,
                    enclosing.len()
                ),
            ));
        }
        let common = enclosing[enclosing.len() - count..].to_vec();
        self.exceptions[current].frames.extend(common);
        Ok(())
    }

    /// Build the exception graph, returning the nodes of the top-level exceptions
    pub fn into_graph(self) -> Result<(ExceptionGraph, Vec<NodeId>), FmtError> {
        let headers: Vec<String> = self.exceptions.iter().map(Dumped::header).collect();

        let mut graph = ExceptionGraph::new();
        let mut ids = vec![];
        let mut links = vec![];
        for dumped in self.exceptions {
            let node = ExceptionNode::new(dumped.class_name, dumped.message.as_deref())
                .with_frames(dumped.frames);
            ids.push(graph.add(node));
            links.push((dumped.cause, dumped.suppressed));
        }

        let resolve = |link: Link| -> Option<NodeId> {
            match link {
                Link::Node(index) => Some(ids[index]),
                Link::Circular(header) => {
                    let found = headers.iter().position(|seen| *seen == header);
                    if found.is_none() {
                        log::warn!("Dropping circular reference to unknown '{}'", header);
                    }
                    found.map(|index| ids[index])
                }
            }
        };

        for (index, (cause, suppressed)) in links.into_iter().enumerate() {
            if let Some(cause) = cause.and_then(resolve) {
                graph.set_cause(ids[index], Some(cause))?;
            }
            for suppressed in suppressed.into_iter().filter_map(resolve) {
                graph.add_suppressed(ids[index], suppressed)?;
            }
        }

        let roots = self.roots.iter().map(|root| ids[*root]).collect();
        Ok((graph, roots))
    }
}

/// Split `class: message`, dropping an `Exception in thread "name"` prefix
fn parse_header(header: &str) -> (&str, Option<&str>) {
    let header = header
        .strip_prefix("Exception in thread \"")
        .and_then(|rest| rest.split_once("\" "))
        .map_or(header, |(_, rest)| rest);
    match header.split_once(": ") {
        Some((class_name, message)) => (class_name, Some(message)),
        None => match header.strip_suffix(':') {
            Some(class_name) => (class_name, Some("")),
            None => (header, None),
        },
    }
}

fn parse_more(body: &str) -> Option<usize> {
    body.strip_prefix("... ")?
        .strip_suffix(" more")?
        .parse()
        .ok()
}

/// Parse `[loader/][module[@version]/]class.method(location)`
fn parse_frame(text: &str) -> Option<RawFrame> {
    let (target, location) = text.strip_suffix(')')?.split_once('(')?;

    let mut parts = target.rsplitn(3, '/');
    let qualified = parts.next()?;
    let (class_loader, module) = match (parts.next(), parts.next()) {
        (Some(module), Some(class_loader)) => (Some(class_loader), Some(module)),
        (Some(module), None) => (None, Some(module)),
        _ => (None, None),
    };
    let (class_name, method_name) = qualified.rsplit_once('.')?;

    let (file_name, line_number) = match location {
        "Native Method" => (None, LineNumber::Native),
        "Unknown Source" => (None, LineNumber::Unknown),
        _ => match location.rsplit_once(':') {
            Some((file_name, line)) => match line.parse() {
                Ok(line) => (Some(file_name), LineNumber::Line(line)),
                Err(_) => (Some(location), LineNumber::Unknown),
            },
            None => (Some(location), LineNumber::Unknown),
        },
    };

    let mut frame = RawFrame::new(class_name, method_name, file_name, line_number);
    if let Some(class_loader) = class_loader.filter(|name| !name.is_empty()) {
        frame = frame.with_class_loader(class_loader);
    }
    if let Some(module) = module.filter(|name| !name.is_empty()) {
        frame = match module.split_once('@') {
            Some((name, version)) => frame.with_module(name, Some(version)),
            None => frame.with_module(module, None),
        };
    }
    Some(frame)
}
