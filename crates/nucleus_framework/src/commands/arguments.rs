//! Coercion of raw tokens into a validated argument bag.
//!
//! Token forms, after quoted tokens (`"two words"`) are joined:
//!
//! - `value` fills the next static parameter
//! - `name=value` or `--name value` sets a floating parameter
//! - `--name` sets a flag

use super::error::CommandError;
use super::info::{parse_bool, CommandInfo, ParamKind, ParameterSpec};
use crate::utils::normalize_name;
use std::collections::{HashMap, HashSet};

/// Validated arguments of one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandArguments {
    values: HashMap<String, String>,
    flags: HashSet<String>,
    raw: Vec<String>,
}

impl CommandArguments {
    /// Coerces `raw` against the parameters declared in `info`.
    ///
    /// `usage` is quoted back to the sender when arguments are missing or in excess.
    ///
    /// # Errors
    ///
    /// - [`CommandError::TooManyArguments`] for positional tokens past the last static parameter
    /// - [`CommandError::MissingArgument`] for a required parameter that was not given
    /// - [`CommandError::DuplicateParameter`] for a floating parameter or flag given twice
    /// - [`CommandError::InvalidParameterName`] for an undeclared floating parameter or flag
    /// - [`CommandError::InvalidArgumentValue`] for a value its [`ParamKind`] rejects
    pub fn parse(info: &CommandInfo, usage: &str, raw: &[String]) -> Result<Self, CommandError> {
        let tokens = join_quoted(raw);

        let mut positional: Vec<String> = Vec::new();
        let mut named: HashMap<String, String> = HashMap::new();
        let mut flags: HashSet<String> = HashSet::new();

        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            i += 1;

            if let Some(stripped) = token.strip_prefix("--") {
                if let Some((key, value)) = stripped.split_once('=') {
                    insert_named(info, &mut named, key, value)?;
                    continue;
                }

                let name = normalize_name(stripped);
                if info.has_flag(&name) {
                    if !flags.insert(name.clone()) {
                        return Err(CommandError::DuplicateParameter { name });
                    }
                } else if info.floating_param(&name).is_some() {
                    match tokens.get(i).filter(|next| !next.starts_with("--")) {
                        Some(value) => {
                            i += 1;
                            insert_named(info, &mut named, &name, value)?;
                        }
                        None => {
                            return Err(CommandError::MissingArgument {
                                parameter: name,
                                usage: usage.to_string(),
                            })
                        }
                    }
                } else {
                    return Err(CommandError::InvalidParameterName {
                        name: stripped.trim().to_string(),
                    });
                }
                continue;
            }

            if let Some((key, value)) = token.split_once('=').filter(|(key, _)| is_parameter_name(key)) {
                insert_named(info, &mut named, key, value)?;
                continue;
            }

            if positional.len() >= info.static_params().len() {
                return Err(CommandError::TooManyArguments {
                    usage: usage.to_string(),
                });
            }
            positional.push(token.clone());
        }

        let mut values = HashMap::new();
        let statics = info
            .static_params()
            .iter()
            .enumerate()
            .map(|(index, spec)| (spec, positional.get(index).cloned()));
        let floating = info
            .floating_params()
            .iter()
            .map(|spec| (spec, named.remove(&spec.name)));

        for (spec, given) in statics.chain(floating) {
            match given {
                Some(value) => {
                    let kind = info.param_kind(&spec.name);
                    if !kind.accepts(&value) {
                        return Err(CommandError::wrong_kind(
                            &spec.name,
                            kind,
                            info.param_description(&spec.name),
                        ));
                    }
                    values.insert(spec.name.clone(), value);
                }
                None => bind_default(spec, usage, &mut values)?,
            }
        }

        Ok(Self {
            values,
            flags,
            raw: raw.to_vec(),
        })
    }

    /// Raw value of a parameter, `None` when it was optional and not given.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }

    pub fn string(&self, name: &str) -> Result<&str, CommandError> {
        self.get(name)
            .ok_or_else(|| CommandError::invalid_value(name, format!("No value given for '{}'.", name)))
    }

    /// A value declared as [`ParamKind::Name`].
    pub fn name(&self, name: &str) -> Result<&str, CommandError> {
        self.convert(name, ParamKind::Name, |v| ParamKind::Name.accepts(v).then_some(v))
    }

    pub fn integer(&self, name: &str) -> Result<i64, CommandError> {
        self.convert(name, ParamKind::Integer, |v| v.parse().ok())
    }

    pub fn number(&self, name: &str) -> Result<f64, CommandError> {
        self.convert(name, ParamKind::Number, |v| v.parse().ok())
    }

    pub fn boolean(&self, name: &str) -> Result<bool, CommandError> {
        self.convert(name, ParamKind::Boolean, parse_bool)
    }

    /// The tokens as typed, before quote joining.
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    fn convert<'a, T>(
        &'a self,
        name: &str,
        kind: ParamKind,
        f: impl FnOnce(&'a str) -> Option<T>,
    ) -> Result<T, CommandError> {
        let value = self.string(name)?;
        f(value).ok_or_else(|| CommandError::wrong_kind(name, kind, None))
    }
}

fn insert_named(
    info: &CommandInfo,
    named: &mut HashMap<String, String>,
    key: &str,
    value: &str,
) -> Result<(), CommandError> {
    let name = normalize_name(key);
    if info.floating_param(&name).is_none() {
        return Err(CommandError::InvalidParameterName {
            name: key.trim().to_string(),
        });
    }
    if named.contains_key(&name) {
        return Err(CommandError::DuplicateParameter { name });
    }
    named.insert(name, value.to_string());
    Ok(())
}

fn bind_default(spec: &ParameterSpec, usage: &str, values: &mut HashMap<String, String>) -> Result<(), CommandError> {
    if !spec.is_optional() {
        return Err(CommandError::MissingArgument {
            parameter: spec.name.clone(),
            usage: usage.to_string(),
        });
    }
    if let Some(default) = spec.default_value() {
        values.insert(spec.name.clone(), default.to_string());
    }
    Ok(())
}

fn is_parameter_name(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Splits off the text before an opening quote, for `"value` and `name="value`.
fn quote_start(token: &str) -> Option<(&str, &str)> {
    if let Some(rest) = token.strip_prefix('"') {
        return Some(("", rest));
    }
    let (key, value) = token.split_once('=')?;
    let rest = value.strip_prefix('"')?;
    Some((&token[..key.len() + 1], rest))
}

fn join_quoted(raw: &[String]) -> Vec<String> {
    let mut tokens = Vec::with_capacity(raw.len());
    let mut open: Option<String> = None;

    for token in raw {
        if let Some(mut buffer) = open.take() {
            buffer.push(' ');
            match token.strip_suffix('"') {
                Some(end) => {
                    buffer.push_str(end);
                    tokens.push(buffer);
                }
                None => {
                    buffer.push_str(token);
                    open = Some(buffer);
                }
            }
            continue;
        }

        match quote_start(token) {
            Some((prefix, rest)) => match rest.strip_suffix('"') {
                Some(inner) if !rest.is_empty() => tokens.push(format!("{}{}", prefix, inner)),
                _ => open = Some(format!("{}{}", prefix, rest)),
            },
            None => tokens.push(token.clone()),
        }
    }

    // An unterminated quote takes the rest of the line.
    if let Some(buffer) = open {
        tokens.push(buffer);
    }
    tokens
}
