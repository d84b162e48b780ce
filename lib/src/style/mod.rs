//! How frames and method descriptors are spelled
//!
//! [`Style::Default`] uses the compact descriptor syntax:
//!
//! ```text
//! -> Lcom/example/Main;->run(ILjava/lang/String;)V  [app.jar/Main.java:12:34]
//! ```
//!
//! [`Style::Jni`] uses source syntax and the layout of the standard runtime:
//!
//! ```text
//! at void com.example.Main.run(int, java.lang.String) (Main.java:12)
//! ```

mod text;

pub use text::*;

use crate::backtrace::HiddenFlags;
use crate::frame::{RawFrame, ResolvedFrame, Trace};
use crate::jvm::{BinaryName, FieldType, Name, RefType, RenderDescriptor};
use crate::runtime::{ClassData, MethodData};
use crate::settings::Settings;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Style {
    /// Descriptor syntax (`Lcom/example/Main;->run()V`)
    #[default]
    Default,

    /// Source syntax (`void com.example.Main.run()`)
    Jni,
}

impl Style {
    /// Indentation of frame lines
    pub const fn tab(self) -> &'static str {
        match self {
            Style::Default => "    ",
            Style::Jni => "\t",
        }
    }

    /// Marker in front of frame lines
    pub const fn at(self) -> &'static str {
        match self {
            Style::Default => "-> ",
            Style::Jni => "at ",
        }
    }

    /// Marker in front of the frames of a repeated block
    pub const fn at_duplicate(self) -> &'static str {
        match self {
            Style::Default => "-> -- ",
            Style::Jni => "at -- ",
        }
    }

    /// Descriptor of a resolved method
    pub fn method_descriptor(self, class: &ClassData, method: &MethodData) -> StyledText {
        let mut out = StyledText::new();
        let class_synthetic = class.is_synthetic();
        let (package, simple) = class.name.split_package();

        match self {
            Style::Default => {
                out.push(ColorRole::DescriptorL, "L");
                push_qualified(&mut out, package.split('/'), simple, "/", class_synthetic);
                out.push(ColorRole::DescriptorSemicolon, ";");
                out.push(ColorRole::DescriptorArrow, "->");
                out.push(
                    ColorRole::method_name(method.is_synthetic()),
                    method.name.as_str(),
                );
                method.descriptor.render_to(&mut out);
            }
            Style::Jni => {
                push_canonical(&mut out, method.descriptor.return_type.as_ref());
                out.push(ColorRole::Punctuation, " ");
                push_qualified(&mut out, package.split('/'), simple, ".", class_synthetic);
                out.push(ColorRole::DescriptorArrow, ".");
                out.push(
                    ColorRole::method_name(method.is_synthetic()),
                    method.name.as_str(),
                );
                out.push(ColorRole::Punctuation, "(");
                for (i, parameter) in method.descriptor.parameters.iter().enumerate() {
                    if i != 0 {
                        out.push(ColorRole::Punctuation, ", ");
                    }
                    push_canonical(&mut out, Some(parameter));
                }
                out.push(ColorRole::Punctuation, ")");
            }
        }
        out
    }

    /// Descriptor built only from the raw text of a frame
    ///
    /// Used for frames that are hidden or whose method could not be resolved.
    pub fn fallback_descriptor(self, frame: &RawFrame, hidden: HiddenFlags) -> StyledText {
        let mut out = StyledText::new();
        let class_synthetic = hidden.contains(HiddenFlags::CLASS_SYNTHETIC);
        let method_role = ColorRole::method_name(hidden.contains(HiddenFlags::METHOD_SYNTHETIC));
        let (package, simple) = match frame.class_name.rsplit_once('.') {
            Some((package, simple)) => (package, simple),
            None => ("", frame.class_name.as_str()),
        };

        match self {
            Style::Default => {
                out.push(ColorRole::DescriptorL, "L");
                push_qualified(&mut out, package.split('.'), simple, "/", class_synthetic);
                out.push(ColorRole::DescriptorSemicolon, ";");
                out.push(ColorRole::DescriptorArrow, "->");
                out.push(method_role, &frame.method_name);
                out.push(ColorRole::Punctuation, "(?)?");
            }
            Style::Jni => {
                push_qualified(&mut out, package.split('.'), simple, ".", class_synthetic);
                out.push(ColorRole::DescriptorArrow, ".");
                out.push(method_role, &frame.method_name);
            }
        }
        out
    }

    /// Body of a frame line for a resolved frame (without the indentation and marker)
    pub fn render_frame(self, frame: &ResolvedFrame, settings: &Settings) -> StyledText {
        let mut out = frame.descriptor().clone();
        match self {
            Style::Default => {
                out.push(ColorRole::Punctuation, "  [");
                push_location_prefix(
                    &mut out,
                    frame.class_loader_name(),
                    frame.module_name(),
                    frame.module_version(),
                    settings,
                );
                match frame.file_name() {
                    Some(file_name) => out.push(ColorRole::FileName, file_name),
                    None => out.push(ColorRole::Punctuation, "???"),
                }
                if frame.is_native() {
                    out.push(ColorRole::Punctuation, "::");
                    out.push(ColorRole::Text, "native");
                } else {
                    let byte_index = frame.byte_index();
                    let line = frame
                        .line_number()
                        .line()
                        .filter(|line| *line > 0 && Some(*line) != byte_index);
                    let pc = byte_index.filter(|pc| settings.byte_code_index_visible() && *pc != 0);
                    match (line, pc) {
                        (Some(line), pc) => {
                            out.push(ColorRole::Punctuation, ":");
                            out.push_display(ColorRole::LineNumber, line);
                            if let Some(pc) = pc {
                                out.push(ColorRole::Punctuation, ":");
                                out.push_display(ColorRole::Number, pc);
                            }
                        }
                        (None, Some(pc)) => {
                            out.push(ColorRole::Punctuation, "::");
                            out.push(ColorRole::Text, "PC");
                            out.push(ColorRole::Punctuation, "-");
                            out.push_display(ColorRole::Number, pc);
                        }
                        (None, None) => (),
                    }
                }
                out.push(ColorRole::Punctuation, "]");
            }
            Style::Jni => {
                out.push(ColorRole::Punctuation, " (");
                push_location_prefix(
                    &mut out,
                    frame.class_loader_name(),
                    frame.module_name(),
                    frame.module_version(),
                    settings,
                );
                match frame.file_name() {
                    Some(file_name) => out.push(ColorRole::FileName, file_name),
                    None => {
                        out.push(ColorRole::Punctuation, "(");
                        out.push(ColorRole::FileName, "null");
                        out.push(ColorRole::Punctuation, ")");
                    }
                }
                out.push(ColorRole::Punctuation, ":");
                out.push_display(ColorRole::LineNumber, frame.line_number().to_java());
                out.push(ColorRole::Punctuation, ")");
            }
        }
        out
    }

    /// Body of a frame line for a frame that was never resolved
    pub fn render_raw_frame(self, frame: &RawFrame, settings: &Settings) -> StyledText {
        match self {
            Style::Default => {
                let mut out = self.fallback_descriptor(frame, HiddenFlags::empty());
                out.push(ColorRole::Punctuation, "  [");
                push_location_prefix(
                    &mut out,
                    frame.class_loader_name.as_deref(),
                    frame.module_name.as_deref(),
                    frame.module_version.as_deref(),
                    settings,
                );
                match &frame.file_name {
                    Some(file_name) => out.push(ColorRole::FileName, file_name),
                    None => out.push(ColorRole::Punctuation, "???"),
                }
                if frame.is_native() {
                    out.push(ColorRole::Punctuation, "::");
                    out.push(ColorRole::Text, "native");
                } else if let Some(line) = frame.line_number.line().filter(|line| *line > 0) {
                    out.push(ColorRole::Punctuation, ":");
                    out.push_display(ColorRole::LineNumber, line);
                }
                out.push(ColorRole::Punctuation, "]");
                out
            }
            Style::Jni => {
                let mut out = StyledText::new();
                push_location_prefix(
                    &mut out,
                    frame.class_loader_name.as_deref(),
                    frame.module_name.as_deref(),
                    frame.module_version.as_deref(),
                    settings,
                );
                out.push(ColorRole::Text, &frame.class_name);
                out.push(ColorRole::Text, ".");
                out.push(ColorRole::Text, &frame.method_name);
                out.push(ColorRole::Text, "(");
                match (&frame.file_name, frame.line_number.line()) {
                    _ if frame.is_native() => out.push(ColorRole::Text, "Native Method"),
                    (Some(file_name), Some(line)) => {
                        out.push(ColorRole::Text, file_name);
                        out.push(ColorRole::Text, ":");
                        out.push_display(ColorRole::Text, line);
                    }
                    (Some(file_name), None) => out.push(ColorRole::Text, file_name),
                    (None, _) => out.push(ColorRole::Text, "Unknown Source"),
                }
                out.push(ColorRole::Text, ")");
                out
            }
        }
    }

    pub fn render_trace(self, trace: Trace<'_>, settings: &Settings) -> StyledText {
        match trace {
            Trace::Resolved(frame) => self.render_frame(frame, settings),
            Trace::Raw(frame) => self.render_raw_frame(frame, settings),
        }
    }
}

impl Display for Style {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Style::Default => f.write_str("default"),
            Style::Jni => f.write_str("jni"),
        }
    }
}

impl FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> Result<Style, String> {
        match s {
            "default" => Ok(Style::Default),
            "jni" => Ok(Style::Jni),
            other => Err(format!("Unknown style '{}' (expected 'default' or 'jni')", other)),
        }
    }
}

/// Class name as package segments, each followed by `separator`, and then the simple name
pub(crate) fn push_qualified<'s>(
    out: &mut StyledText,
    package: impl Iterator<Item = &'s str>,
    simple: &str,
    separator: &str,
    synthetic: bool,
) {
    for segment in package.filter(|segment| !segment.is_empty()) {
        out.push(ColorRole::package_name(synthetic), segment);
        out.push(ColorRole::Punctuation, separator);
    }
    out.push(ColorRole::class_name(synthetic), simple);
}

/// Source spelling of a type, with `None` standing for `void`
fn push_canonical(out: &mut StyledText, field_type: Option<&FieldType<BinaryName>>) {
    let push_class = |out: &mut StyledText, class: &BinaryName| {
        let (package, simple) = class.split_package();
        push_qualified(out, package.split('/'), simple, ".", false);
    };

    match field_type {
        None => out.push(ColorRole::DescriptorPrimitive, "void"),
        Some(FieldType::Base(base_type)) => {
            out.push(ColorRole::DescriptorPrimitive, base_type.keyword())
        }
        Some(FieldType::Ref(RefType::Object(class))) => push_class(out, class),
        Some(FieldType::Ref(RefType::ObjectArray(array))) => {
            push_class(out, &array.element_type);
            out.push(ColorRole::Punctuation, &"[]".repeat(array.dimensions()));
        }
        Some(FieldType::Ref(RefType::PrimitiveArray(array))) => {
            out.push(ColorRole::DescriptorPrimitive, array.element_type.keyword());
            out.push(ColorRole::Punctuation, &"[]".repeat(array.dimensions()));
        }
    }
}

/// `loader/module@version/` prefix inside the location of a frame
fn push_location_prefix(
    out: &mut StyledText,
    class_loader_name: Option<&str>,
    module_name: Option<&str>,
    module_version: Option<&str>,
    settings: &Settings,
) {
    fn present(value: Option<&str>) -> Option<&str> {
        value.filter(|value| !value.is_empty())
    }

    if settings.class_loader_name_visible() {
        if let Some(class_loader_name) = present(class_loader_name) {
            out.push(ColorRole::ClassLoaderName, class_loader_name);
            out.push(ColorRole::Punctuation, "/");
        }
    }
    if settings.module_name_visible() {
        if let Some(module_name) = present(module_name) {
            out.push(ColorRole::ModuleName, module_name);
            if settings.module_version_visible() {
                if let Some(module_version) = present(module_version) {
                    out.push(ColorRole::Punctuation, "@");
                    out.push(ColorRole::ModuleVersion, module_version);
                }
            }
            out.push(ColorRole::Punctuation, "/");
        }
    }
}
