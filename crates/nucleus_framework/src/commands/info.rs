//! Immutable command metadata and its builder.

use crate::permissions::PermissionDefault;
use crate::utils::normalize_name;
use std::collections::HashMap;
use std::fmt;

/// Value type a parameter is validated against before the command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamKind {
    #[default]
    Text,
    /// Letters, digits and underscores, at most 16 characters.
    Name,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            ParamKind::Text => true,
            ParamKind::Name => {
                !value.is_empty()
                    && value.chars().count() <= 16
                    && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            ParamKind::Integer => value.parse::<i64>().is_ok(),
            ParamKind::Number => value.parse::<f64>().map(f64::is_finite).unwrap_or(false),
            ParamKind::Boolean => parse_bool(value).is_some(),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Text => f.write_str("text"),
            ParamKind::Name => f.write_str("a name of at most 16 letters, digits or underscores"),
            ParamKind::Integer => f.write_str("a whole number"),
            ParamKind::Number => f.write_str("a number"),
            ParamKind::Boolean => f.write_str("true or false"),
        }
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// A static (positional) or floating (named) parameter.
///
/// Declared as `"name"` (required), `"name=default"` (optional with a default)
/// or `"name="` (optional, absent unless given).
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub default: Option<String>,
}

impl ParameterSpec {
    pub fn parse(declaration: &str) -> Self {
        match declaration.split_once('=') {
            Some((name, default)) => Self {
                name: normalize_name(name),
                default: Some(default.trim().to_string()),
            },
            None => Self {
                name: normalize_name(declaration),
                default: None,
            },
        }
    }

    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }

    /// The default value, if it is not empty.
    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref().filter(|d| !d.is_empty())
    }
}

/// Metadata of one command node.
///
/// Built once per registration with [`CommandInfo::builder`]; the first name is
/// the primary name, the rest are aliases.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInfo {
    names: Vec<String>,
    parent: Option<String>,
    description: String,
    static_params: Vec<ParameterSpec>,
    floating_params: Vec<ParameterSpec>,
    flags: Vec<String>,
    param_descriptions: HashMap<String, String>,
    param_kinds: HashMap<String, ParamKind>,
    permission_default: PermissionDefault,
    help_visible: bool,
}

impl CommandInfo {
    /// Starts a builder for a command whose primary name is `name`.
    pub fn builder(name: &str) -> CommandInfoBuilder {
        CommandInfoBuilder {
            info: CommandInfo {
                names: vec![name.trim().to_string()],
                parent: None,
                description: String::new(),
                static_params: Vec::new(),
                floating_params: Vec::new(),
                flags: Vec::new(),
                param_descriptions: HashMap::new(),
                param_kinds: HashMap::new(),
                permission_default: PermissionDefault::Op,
                help_visible: true,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.names[0]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn aliases(&self) -> &[String] {
        &self.names[1..]
    }

    /// Case-insensitive match against the primary name and aliases.
    pub fn has_name(&self, name: &str) -> bool {
        let name = name.trim();
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    /// Declared parent name, if the command must live under a specific parent.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn static_params(&self) -> &[ParameterSpec] {
        &self.static_params
    }

    pub fn floating_params(&self) -> &[ParameterSpec] {
        &self.floating_params
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    pub fn static_param(&self, name: &str) -> Option<&ParameterSpec> {
        self.static_params.iter().find(|p| p.name == name)
    }

    pub fn floating_param(&self, name: &str) -> Option<&ParameterSpec> {
        self.floating_params.iter().find(|p| p.name == name)
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.iter().any(|f| f == name)
    }

    pub fn param_description(&self, name: &str) -> Option<&str> {
        self.param_descriptions.get(name).map(String::as_str)
    }

    pub fn param_kind(&self, name: &str) -> ParamKind {
        self.param_kinds.get(name).copied().unwrap_or_default()
    }

    pub fn permission_default(&self) -> PermissionDefault {
        self.permission_default
    }

    pub fn is_help_visible(&self) -> bool {
        self.help_visible
    }
}

/// Builder for [`CommandInfo`].
///
/// # Examples
///
/// ```rust
/// use nucleus_framework::commands::{CommandInfo, ParamKind};
///
/// let info = CommandInfo::builder("send")
///     .alias("pay")
///     .parent("bank")
///     .description("Send money to another player.")
///     .static_param("player")
///     .floating_param("amount")
///     .floating_param("bank=")
///     .flag("silent")
///     .param_kind("amount", ParamKind::Number)
///     .param_description("amount", "The amount to send.")
///     .build();
///
/// assert_eq!(info.name(), "send");
/// assert!(info.has_name("PAY"));
/// assert!(info.floating_param("bank").unwrap().is_optional());
/// ```
#[derive(Debug, Clone)]
pub struct CommandInfoBuilder {
    info: CommandInfo,
}

impl CommandInfoBuilder {
    pub fn alias(mut self, alias: &str) -> Self {
        self.info.names.push(alias.trim().to_string());
        self
    }

    pub fn parent(mut self, parent: &str) -> Self {
        self.info.parent = Some(parent.trim().to_string());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.info.description = description.into();
        self
    }

    pub fn static_param(mut self, declaration: &str) -> Self {
        self.info.static_params.push(ParameterSpec::parse(declaration));
        self
    }

    pub fn floating_param(mut self, declaration: &str) -> Self {
        self.info.floating_params.push(ParameterSpec::parse(declaration));
        self
    }

    pub fn flag(mut self, name: &str) -> Self {
        self.info.flags.push(normalize_name(name));
        self
    }

    pub fn param_description(mut self, param: &str, description: impl Into<String>) -> Self {
        self.info.param_descriptions.insert(normalize_name(param), description.into());
        self
    }

    pub fn param_kind(mut self, param: &str, kind: ParamKind) -> Self {
        self.info.param_kinds.insert(normalize_name(param), kind);
        self
    }

    pub fn permission_default(mut self, default: PermissionDefault) -> Self {
        self.info.permission_default = default;
        self
    }

    /// Leaves the command out of help listings.
    pub fn hidden(mut self) -> Self {
        self.info.help_visible = false;
        self
    }

    /// # Panics
    ///
    /// Panics if a name is empty or a parameter or flag name is declared twice.
    pub fn build(self) -> CommandInfo {
        let info = self.info;
        assert!(
            info.names.iter().all(|n| !n.is_empty()),
            "command names cannot be empty: {:?}",
            info.names
        );

        let mut seen = std::collections::HashSet::new();
        let declared = info
            .static_params
            .iter()
            .chain(info.floating_params.iter())
            .map(|p| p.name.as_str())
            .chain(info.flags.iter().map(String::as_str));
        for name in declared {
            assert!(
                !name.is_empty() && seen.insert(name.to_string()),
                "command '{}' declares parameter '{}' twice or with an empty name",
                info.names[0],
                name
            );
        }

        info
    }
}
