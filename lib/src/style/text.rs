use std::fmt::{Display, Formatter, Result as FmtResult};

/// Part of the output that can be given its own color
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColorRole {
    Text,
    PackageName,
    ClassName,
    FileName,
    LineNumber,
    ClassLoaderName,
    ModuleName,
    ModuleVersion,
    Number,
    Message,
    Caption,
    At,
    Punctuation,
    DescriptorL,
    DescriptorPackageName,
    DescriptorPackageNameSynthetic,
    DescriptorClassName,
    DescriptorClassNameSynthetic,
    DescriptorMethodName,
    DescriptorMethodNameSynthetic,
    DescriptorPrimitive,
    DescriptorSemicolon,
    DescriptorArrow,
}

impl ColorRole {
    pub const COUNT: usize = 23;

    pub const ALL: [ColorRole; ColorRole::COUNT] = [
        ColorRole::Text,
        ColorRole::PackageName,
        ColorRole::ClassName,
        ColorRole::FileName,
        ColorRole::LineNumber,
        ColorRole::ClassLoaderName,
        ColorRole::ModuleName,
        ColorRole::ModuleVersion,
        ColorRole::Number,
        ColorRole::Message,
        ColorRole::Caption,
        ColorRole::At,
        ColorRole::Punctuation,
        ColorRole::DescriptorL,
        ColorRole::DescriptorPackageName,
        ColorRole::DescriptorPackageNameSynthetic,
        ColorRole::DescriptorClassName,
        ColorRole::DescriptorClassNameSynthetic,
        ColorRole::DescriptorMethodName,
        ColorRole::DescriptorMethodNameSynthetic,
        ColorRole::DescriptorPrimitive,
        ColorRole::DescriptorSemicolon,
        ColorRole::DescriptorArrow,
    ];

    /// Position in [`ColorRole::ALL`]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn package_name(synthetic: bool) -> ColorRole {
        if synthetic {
            ColorRole::DescriptorPackageNameSynthetic
        } else {
            ColorRole::DescriptorPackageName
        }
    }

    pub const fn class_name(synthetic: bool) -> ColorRole {
        if synthetic {
            ColorRole::DescriptorClassNameSynthetic
        } else {
            ColorRole::DescriptorClassName
        }
    }

    pub const fn method_name(synthetic: bool) -> ColorRole {
        if synthetic {
            ColorRole::DescriptorMethodNameSynthetic
        } else {
            ColorRole::DescriptorMethodName
        }
    }
}

/// Text annotated with the color role of each of its segments
///
/// Colors are only looked up when the text is printed, so the same `StyledText` serves plain and
/// colored output alike.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct StyledText {
    text: String,

    /// Start offset (in `text`) and role of every segment, in order
    spans: Vec<(usize, ColorRole)>,
}

impl StyledText {
    pub fn new() -> StyledText {
        StyledText::default()
    }

    pub fn plain(text: impl Into<String>) -> StyledText {
        let text = text.into();
        let spans = if text.is_empty() {
            vec![]
        } else {
            vec![(0, ColorRole::Text)]
        };
        StyledText { text, spans }
    }

    pub fn push(&mut self, role: ColorRole, text: &str) {
        if text.is_empty() {
            return;
        }
        if self.spans.last().map(|(_, last)| *last) != Some(role) {
            self.spans.push((self.text.len(), role));
        }
        self.text.push_str(text);
    }

    pub fn push_char(&mut self, role: ColorRole, c: char) {
        let mut buffer = [0; 4];
        self.push(role, c.encode_utf8(&mut buffer));
    }

    pub fn push_display(&mut self, role: ColorRole, value: impl Display) {
        self.push(role, &value.to_string());
    }

    pub fn append(&mut self, other: &StyledText) {
        for (role, text) in other.segments() {
            self.push(role, text);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Iterate over maximal runs of text sharing a role
    pub fn segments(&self) -> impl Iterator<Item = (ColorRole, &str)> + '_ {
        self.spans.iter().enumerate().map(move |(i, (start, role))| {
            let end = self
                .spans
                .get(i + 1)
                .map_or(self.text.len(), |(next, _)| *next);
            (*role, &self.text[*start..end])
        })
    }
}

impl Display for StyledText {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.text)
    }
}
