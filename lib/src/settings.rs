//! Rendering configuration
//!
//! A [`Settings`] value is an immutable snapshot. Build one with [`SettingsBuilder`], or derive a
//! variation of an existing one with [`Settings::to_builder`].

use crate::errors::Error;
use crate::style::{ColorRole, Style};
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<RwLock<Arc<Settings>>> = OnceLock::new();

fn global() -> &'static RwLock<Arc<Settings>> {
    GLOBAL.get_or_init(|| RwLock::new(Arc::new(Settings::default())))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    style: Style,
    tab: Option<String>,
    cache_enabled: bool,
    fold_enabled: bool,
    boot_method_type_visible: bool,
    synthesized_method_type_visible: bool,
    unique_method_type_visible: bool,
    throwable_id_visible: bool,
    class_loader_name_visible: bool,
    module_name_visible: bool,
    module_version_visible: bool,
    byte_code_index_visible: bool,
    check_duplicate_trace_enabled: bool,
    only_compare_hash_code_enabled: bool,
    duplicate_trace_max_size: usize,
    color_scheme: Option<ColorScheme>,

    /// Hash of the fields that change descriptor text
    descriptor_hash: u64,
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Builder starting from the values of these settings
    pub fn to_builder(&self) -> SettingsBuilder {
        SettingsBuilder {
            style: self.style,
            tab: self.tab.clone(),
            cache_enabled: self.cache_enabled,
            fold_enabled: self.fold_enabled,
            boot_method_type_visible: self.boot_method_type_visible,
            synthesized_method_type_visible: self.synthesized_method_type_visible,
            unique_method_type_visible: self.unique_method_type_visible,
            throwable_id_visible: self.throwable_id_visible,
            class_loader_name_visible: self.class_loader_name_visible,
            module_name_visible: self.module_name_visible,
            module_version_visible: self.module_version_visible,
            byte_code_index_visible: self.byte_code_index_visible,
            check_duplicate_trace_enabled: self.check_duplicate_trace_enabled,
            only_compare_hash_code_enabled: self.only_compare_hash_code_enabled,
            duplicate_trace_max_size: self.duplicate_trace_max_size,
            color_scheme: self.color_scheme.clone(),
        }
    }

    /// Snapshot of the process-wide default
    pub fn global() -> Arc<Settings> {
        global().read().clone()
    }

    /// Replace the process-wide default
    ///
    /// Renders already in progress keep the snapshot they started with.
    pub fn set_global(settings: Settings) {
        *global().write() = Arc::new(settings);
    }

    pub fn style(&self) -> Style {
        self.style
    }

    /// Indentation of frame lines (the custom tab, or the tab of the style)
    pub fn tab(&self) -> &str {
        self.tab.as_deref().unwrap_or_else(|| self.style.tab())
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    pub fn fold_enabled(&self) -> bool {
        self.fold_enabled
    }

    pub fn boot_method_type_visible(&self) -> bool {
        self.boot_method_type_visible
    }

    pub fn synthesized_method_type_visible(&self) -> bool {
        self.synthesized_method_type_visible
    }

    pub fn unique_method_type_visible(&self) -> bool {
        self.unique_method_type_visible
    }

    pub fn throwable_id_visible(&self) -> bool {
        self.throwable_id_visible
    }

    pub fn class_loader_name_visible(&self) -> bool {
        self.class_loader_name_visible
    }

    pub fn module_name_visible(&self) -> bool {
        self.module_name_visible
    }

    pub fn module_version_visible(&self) -> bool {
        self.module_version_visible
    }

    pub fn byte_code_index_visible(&self) -> bool {
        self.byte_code_index_visible
    }

    pub fn check_duplicate_trace_enabled(&self) -> bool {
        self.check_duplicate_trace_enabled
    }

    pub fn only_compare_hash_code_enabled(&self) -> bool {
        self.only_compare_hash_code_enabled
    }

    pub fn duplicate_trace_max_size(&self) -> usize {
        self.duplicate_trace_max_size
    }

    /// Colors to emit, if any
    pub fn color_scheme(&self) -> Option<&ColorScheme> {
        self.color_scheme.as_ref()
    }

    /// Partition of the frame cache that descriptors rendered under these settings belong to
    ///
    /// Only covers fields that change descriptor text. Layout fields (tab, colors, location
    /// prefixes, byte indices) are applied around cached descriptors and are left out.
    pub fn descriptor_hash(&self) -> u64 {
        self.descriptor_hash
    }
}

impl Default for Settings {
    fn default() -> Settings {
        SettingsBuilder::default().finish()
    }
}

#[derive(Clone, Debug)]
pub struct SettingsBuilder {
    style: Style,
    tab: Option<String>,
    cache_enabled: bool,
    fold_enabled: bool,
    boot_method_type_visible: bool,
    synthesized_method_type_visible: bool,
    unique_method_type_visible: bool,
    throwable_id_visible: bool,
    class_loader_name_visible: bool,
    module_name_visible: bool,
    module_version_visible: bool,
    byte_code_index_visible: bool,
    check_duplicate_trace_enabled: bool,
    only_compare_hash_code_enabled: bool,
    duplicate_trace_max_size: usize,
    color_scheme: Option<ColorScheme>,
}

impl Default for SettingsBuilder {
    fn default() -> SettingsBuilder {
        SettingsBuilder {
            style: Style::Default,
            tab: None,
            cache_enabled: true,
            fold_enabled: true,
            boot_method_type_visible: false,
            synthesized_method_type_visible: false,
            unique_method_type_visible: true,
            throwable_id_visible: false,
            class_loader_name_visible: false,
            module_name_visible: true,
            module_version_visible: false,
            byte_code_index_visible: true,
            check_duplicate_trace_enabled: true,
            only_compare_hash_code_enabled: true,
            duplicate_trace_max_size: 8,
            color_scheme: None,
        }
    }
}

impl SettingsBuilder {
    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Override the indentation of the style (`None` restores it)
    pub fn tab(mut self, tab: Option<String>) -> Self {
        self.tab = tab;
        self
    }

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn fold_enabled(mut self, enabled: bool) -> Self {
        self.fold_enabled = enabled;
        self
    }

    pub fn boot_method_type_visible(mut self, visible: bool) -> Self {
        self.boot_method_type_visible = visible;
        self
    }

    pub fn synthesized_method_type_visible(mut self, visible: bool) -> Self {
        self.synthesized_method_type_visible = visible;
        self
    }

    pub fn unique_method_type_visible(mut self, visible: bool) -> Self {
        self.unique_method_type_visible = visible;
        self
    }

    pub fn throwable_id_visible(mut self, visible: bool) -> Self {
        self.throwable_id_visible = visible;
        self
    }

    pub fn class_loader_name_visible(mut self, visible: bool) -> Self {
        self.class_loader_name_visible = visible;
        self
    }

    pub fn module_name_visible(mut self, visible: bool) -> Self {
        self.module_name_visible = visible;
        self
    }

    pub fn module_version_visible(mut self, visible: bool) -> Self {
        self.module_version_visible = visible;
        self
    }

    pub fn byte_code_index_visible(mut self, visible: bool) -> Self {
        self.byte_code_index_visible = visible;
        self
    }

    pub fn check_duplicate_trace_enabled(mut self, enabled: bool) -> Self {
        self.check_duplicate_trace_enabled = enabled;
        self
    }

    pub fn only_compare_hash_code_enabled(mut self, enabled: bool) -> Self {
        self.only_compare_hash_code_enabled = enabled;
        self
    }

    /// Largest repeating block that duplicate detection looks for (must be positive)
    pub fn duplicate_trace_max_size(mut self, size: usize) -> Self {
        self.duplicate_trace_max_size = size;
        self
    }

    /// Turn colors on (with the base scheme, unless one is already set) or off
    pub fn color_scheme_enabled(mut self, enabled: bool) -> Self {
        if !enabled {
            self.color_scheme = None;
        } else if self.color_scheme.is_none() {
            self.color_scheme = Some(ColorScheme::base());
        }
        self
    }

    pub fn color_scheme(mut self, scheme: ColorScheme) -> Self {
        self.color_scheme = Some(scheme);
        self
    }

    pub fn build(self) -> Result<Settings, Error> {
        if self.duplicate_trace_max_size == 0 {
            return Err(Error::InvalidConfiguration(String::from(
                "duplicate trace max size must be positive",
            )));
        }
        if matches!(&self.tab, Some(tab) if tab.contains('\n')) {
            return Err(Error::InvalidConfiguration(String::from(
                "tab cannot contain a line break",
            )));
        }
        Ok(self.finish())
    }

    fn finish(self) -> Settings {
        let mut hasher = DefaultHasher::new();
        self.style.hash(&mut hasher);
        self.boot_method_type_visible.hash(&mut hasher);
        self.synthesized_method_type_visible.hash(&mut hasher);
        self.unique_method_type_visible.hash(&mut hasher);

        Settings {
            style: self.style,
            tab: self.tab,
            cache_enabled: self.cache_enabled,
            fold_enabled: self.fold_enabled,
            boot_method_type_visible: self.boot_method_type_visible,
            synthesized_method_type_visible: self.synthesized_method_type_visible,
            unique_method_type_visible: self.unique_method_type_visible,
            throwable_id_visible: self.throwable_id_visible,
            class_loader_name_visible: self.class_loader_name_visible,
            module_name_visible: self.module_name_visible,
            module_version_visible: self.module_version_visible,
            byte_code_index_visible: self.byte_code_index_visible,
            check_duplicate_trace_enabled: self.check_duplicate_trace_enabled,
            only_compare_hash_code_enabled: self.only_compare_hash_code_enabled,
            duplicate_trace_max_size: self.duplicate_trace_max_size,
            color_scheme: self.color_scheme,
            descriptor_hash: hasher.finish(),
        }
    }
}

/// Escape sequence emitted in front of each color role
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorScheme {
    escapes: [String; ColorRole::COUNT],
}

impl ColorScheme {
    /// Scheme where every role resets to the terminal's default
    pub fn plain() -> ColorScheme {
        ColorScheme {
            escapes: std::array::from_fn(|_| String::from("\x1b[0m")),
        }
    }

    /// 256-color scheme used when colors are enabled without choosing a scheme
    pub fn base() -> ColorScheme {
        let mut scheme = ColorScheme::plain();
        for (role, color) in [
            (ColorRole::PackageName, 208),
            (ColorRole::ClassName, 196),
            (ColorRole::FileName, 105),
            (ColorRole::ClassLoaderName, 246),
            (ColorRole::ModuleName, 246),
            (ColorRole::ModuleVersion, 246),
            (ColorRole::Number, 250),
            (ColorRole::Message, 208),
            (ColorRole::At, 208),
            (ColorRole::Punctuation, 252),
            (ColorRole::DescriptorL, 252),
            (ColorRole::DescriptorPackageName, 246),
            (ColorRole::DescriptorPackageNameSynthetic, 246),
            (ColorRole::DescriptorClassName, 39),
            (ColorRole::DescriptorClassNameSynthetic, 252),
            (ColorRole::DescriptorMethodName, 208),
            (ColorRole::DescriptorMethodNameSynthetic, 252),
            (ColorRole::DescriptorPrimitive, 39),
            (ColorRole::DescriptorSemicolon, 252),
            (ColorRole::DescriptorArrow, 196),
        ] {
            scheme.set_ansi256(role, color);
        }
        scheme
    }

    /// Set a role to `ESC[x;y;zm`, or to a reset when all three are zero
    pub fn set_sgr(&mut self, role: ColorRole, x: u32, y: u32, z: u32) -> Result<(), Error> {
        if let Some(bad) = [x, y, z].into_iter().find(|value| *value > 255) {
            return Err(Error::InvalidConfiguration(format!(
                "color component {} of {:?} is out of range",
                bad, role
            )));
        }
        self.escapes[role.index()] = if (x, y, z) == (0, 0, 0) {
            String::from("\x1b[0m")
        } else {
            format!("\x1b[{};{};{}m", x, y, z)
        };
        Ok(())
    }

    /// Set a role to foreground color `color` of the 256-color palette
    pub fn set_ansi256(&mut self, role: ColorRole, color: u8) {
        self.escapes[role.index()] = format!("\x1b[38;5;{}m", color);
    }

    /// Set a role to an arbitrary escape sequence
    pub fn set_escape(&mut self, role: ColorRole, escape: impl Into<String>) {
        self.escapes[role.index()] = escape.into();
    }

    pub fn escape(&self, role: ColorRole) -> &str {
        &self.escapes[role.index()]
    }
}

impl Default for ColorScheme {
    fn default() -> ColorScheme {
        ColorScheme::base()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_empty_duplicate_blocks() {
        let result = Settings::builder().duplicate_trace_max_size(0).build();
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn descriptor_hash_ignores_layout() {
        let base = Settings::default();
        let layout = base
            .to_builder()
            .tab(Some(String::from("  ")))
            .color_scheme_enabled(true)
            .module_name_visible(false)
            .byte_code_index_visible(false)
            .fold_enabled(false)
            .build()
            .unwrap();
        assert_eq!(base.descriptor_hash(), layout.descriptor_hash());
        assert_eq!(layout.tab(), "  ");

        let jni = base.to_builder().style(Style::Jni).build().unwrap();
        let boot = base.to_builder().boot_method_type_visible(true).build().unwrap();
        assert_ne!(base.descriptor_hash(), jni.descriptor_hash());
        assert_ne!(base.descriptor_hash(), boot.descriptor_hash());
        assert_ne!(jni.descriptor_hash(), boot.descriptor_hash());
    }

    #[test]
    fn base_scheme() {
        let scheme = ColorScheme::base();
        assert_eq!(scheme.escape(ColorRole::Text), "\x1b[0m");
        assert_eq!(scheme.escape(ColorRole::Caption), "\x1b[0m");
        assert_eq!(scheme.escape(ColorRole::ClassName), "\x1b[38;5;196m");
        assert_eq!(scheme.escape(ColorRole::DescriptorArrow), "\x1b[38;5;196m");
    }

    #[test]
    fn sgr_components() {
        let mut scheme = ColorScheme::base();
        scheme.set_sgr(ColorRole::Message, 1, 38, 5).unwrap();
        assert_eq!(scheme.escape(ColorRole::Message), "\x1b[1;38;5m");
        scheme.set_sgr(ColorRole::Message, 0, 0, 0).unwrap();
        assert_eq!(scheme.escape(ColorRole::Message), "\x1b[0m");

        assert!(matches!(
            scheme.set_sgr(ColorRole::At, 38, 5, 256),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn enabling_colors_installs_base_scheme() {
        let settings = Settings::builder().color_scheme_enabled(true).build().unwrap();
        assert_eq!(settings.color_scheme(), Some(&ColorScheme::base()));

        let off = settings.to_builder().color_scheme_enabled(false).build().unwrap();
        assert_eq!(off.color_scheme(), None);
    }
}
