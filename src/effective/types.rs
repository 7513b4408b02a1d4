//! Type resolution
//!
//! Every `type` statement is resolved to an [`EffectiveType`]: the built-in
//! base type at the bottom of its typedef chain plus the accumulated
//! restrictions. A restriction may only narrow what the base allows.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;
use serde::Serialize;
use tracing::trace;

use crate::error::{ReactorError, Result};
use crate::reactor::{DeclaredModel, SourceIdx, StmtId};
use crate::stmt::StatementKind;

use super::scope::{find_definition, Definition, Scope};

/// Built-in YANG types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuiltinType {
    Binary,
    Bits,
    Boolean,
    Decimal64,
    Empty,
    Enumeration,
    Identityref,
    InstanceIdentifier,
    Int8,
    Int16,
    Int32,
    Int64,
    Leafref,
    String,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Union,
}

impl BuiltinType {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "binary" => Self::Binary,
            "bits" => Self::Bits,
            "boolean" => Self::Boolean,
            "decimal64" => Self::Decimal64,
            "empty" => Self::Empty,
            "enumeration" => Self::Enumeration,
            "identityref" => Self::Identityref,
            "instance-identifier" => Self::InstanceIdentifier,
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "leafref" => Self::Leafref,
            "string" => Self::String,
            "uint8" => Self::Uint8,
            "uint16" => Self::Uint16,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            "union" => Self::Union,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Bits => "bits",
            Self::Boolean => "boolean",
            Self::Decimal64 => "decimal64",
            Self::Empty => "empty",
            Self::Enumeration => "enumeration",
            Self::Identityref => "identityref",
            Self::InstanceIdentifier => "instance-identifier",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Leafref => "leafref",
            Self::String => "string",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Union => "union",
        }
    }

    fn integer_bounds(&self) -> Option<Interval> {
        let (min, max) = match self {
            Self::Int8 => (i8::MIN as i128, i8::MAX as i128),
            Self::Int16 => (i16::MIN as i128, i16::MAX as i128),
            Self::Int32 => (i32::MIN as i128, i32::MAX as i128),
            Self::Int64 => (i64::MIN as i128, i64::MAX as i128),
            Self::Uint8 => (0, u8::MAX as i128),
            Self::Uint16 => (0, u16::MAX as i128),
            Self::Uint32 => (0, u32::MAX as i128),
            Self::Uint64 => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(Interval { min, max })
    }

    /// Types accepting a `range` restriction
    pub fn is_numeric(&self) -> bool {
        self.integer_bounds().is_some() || *self == Self::Decimal64
    }

    /// Types accepting a `length` restriction
    pub fn has_length(&self) -> bool {
        matches!(self, Self::String | Self::Binary)
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Closed interval of a range or length restriction.
///
/// decimal64 bounds are stored scaled by 10^fraction-digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub min: i128,
    pub max: i128,
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}..{}", self.min, self.max)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternRestriction {
    pub expression: String,
    pub inverted: bool,
}

/// A fully resolved type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveType {
    /// Name as referenced by the `type` statement
    pub name: String,
    pub base: BuiltinType,
    /// Typedef chain as `module:name`, nearest first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub typedefs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ranges: Vec<Interval>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lengths: Vec<Interval>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraction_digits: Option<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<PatternRestriction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bits: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<EffectiveType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_instance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl EffectiveType {
    pub fn builtin(base: BuiltinType) -> Self {
        let ranges = match base {
            BuiltinType::Decimal64 => vec![Interval {
                min: i64::MIN as i128,
                max: i64::MAX as i128,
            }],
            _ => base.integer_bounds().into_iter().collect(),
        };
        let lengths = if base.has_length() {
            vec![Interval {
                min: 0,
                max: u64::MAX as i128,
            }]
        } else {
            Vec::new()
        };
        Self {
            name: base.name().to_string(),
            base,
            typedefs: Vec::new(),
            ranges,
            lengths,
            fraction_digits: None,
            patterns: Vec::new(),
            enums: Vec::new(),
            bits: Vec::new(),
            members: Vec::new(),
            path: None,
            bases: Vec::new(),
            require_instance: None,
            units: None,
            default: None,
        }
    }

    /// Whether a value is accepted by the range restriction; integers only
    pub fn range_contains(&self, value: i128) -> bool {
        self.ranges.iter().any(|i| i.min <= value && value <= i.max)
    }

    /// Whether a string of `length` characters is accepted
    pub fn length_allows(&self, length: usize) -> bool {
        let length = length as i128;
        self.lengths.iter().any(|i| i.min <= length && length <= i.max)
    }
}

/// Parse a range/length bound, scaling decimals to `scale` fraction digits
pub(crate) fn parse_number(text: &str, scale: Option<u8>) -> Option<i128> {
    let text = text.trim();
    let Some(digits) = scale else {
        return text.parse::<i128>().ok();
    };

    let (negative, magnitude) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (int, frac) = magnitude.split_once('.').unwrap_or((magnitude, ""));
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if int.is_empty() || frac.len() > digits as usize || !all_digits(int) || !all_digits(frac) {
        return None;
    }

    let mut value: i128 = int.parse().ok()?;
    for i in 0..digits as usize {
        let digit = frac.as_bytes().get(i).map_or(0, |b| (b - b'0') as i128);
        value = value.checked_mul(10)?.checked_add(digit)?;
    }
    Some(if negative { -value } else { value })
}

/// Parse `a..b | c | min..max`; `min`/`max` refer to the bounds of `parent`.
///
/// Intervals must be ascending and disjoint.
pub(crate) fn parse_intervals(text: &str, parent: &[Interval], scale: Option<u8>) -> Option<Vec<Interval>> {
    let lowest = parent.first()?.min;
    let highest = parent.last()?.max;
    let bound = |s: &str| match s.trim() {
        "min" => Some(lowest),
        "max" => Some(highest),
        other => parse_number(other, scale),
    };

    let mut out: Vec<Interval> = Vec::new();
    for part in text.split('|') {
        let (min, max) = match part.split_once("..") {
            Some((lo, hi)) => (bound(lo)?, bound(hi)?),
            None => {
                let value = bound(part)?;
                (value, value)
            }
        };
        if min > max || out.last().is_some_and(|prev| min <= prev.max) {
            return None;
        }
        out.push(Interval { min, max });
    }
    Some(out)
}

pub(crate) fn is_subset(child: &[Interval], parent: &[Interval]) -> bool {
    child
        .iter()
        .all(|c| parent.iter().any(|p| p.min <= c.min && c.max <= p.max))
}

fn describe(intervals: &[Interval]) -> String {
    intervals
        .iter()
        .map(Interval::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Resolves `type` statements of one module build, memoizing typedefs
pub(crate) struct TypeResolver<'m> {
    model: &'m DeclaredModel,
    resolved: HashMap<(SourceIdx, StmtId), EffectiveType>,
    in_progress: Vec<((SourceIdx, StmtId), String)>,
}

impl<'m> TypeResolver<'m> {
    pub fn new(model: &'m DeclaredModel) -> Self {
        Self {
            model,
            resolved: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Resolve the `type` statement `stmt` of `source`, written in `scope`
    pub fn resolve(&mut self, source: SourceIdx, stmt: StmtId, scope: &Scope) -> Result<EffectiveType> {
        let model = self.model;
        let src = &model.sources()[source];
        let decl = src.statement(stmt);
        let name = decl.argument().unwrap_or_default();
        let restriction = |message: String| ReactorError::Restriction {
            source_id: src.id().clone(),
            location: decl.location().clone(),
            type_name: name.to_string(),
            message,
        };
        let child = |kind| src.first_child(stmt, kind).map(|c| src.statement(c));
        let arguments = |kind| -> Vec<String> {
            src.children_of_kind(stmt, kind)
                .filter_map(|c| src.statement(c).argument().map(str::to_string))
                .collect()
        };

        let builtin = if name.contains(':') {
            None
        } else {
            BuiltinType::from_name(name)
        };
        let (mut ty, derived) = match builtin {
            Some(base) => (EffectiveType::builtin(base), false),
            None => {
                let def = find_definition(model, source, name, scope, StatementKind::Typedef, decl.location())?;
                (self.resolve_typedef(def)?, true)
            }
        };
        ty.name = name.to_string();
        let base = ty.base;

        match child(StatementKind::FractionDigits) {
            Some(fd) => {
                if base != BuiltinType::Decimal64 || derived {
                    return Err(restriction("fraction-digits is only allowed on decimal64 itself".into()));
                }
                let digits = fd
                    .argument()
                    .and_then(|a| a.parse::<u8>().ok())
                    .ok_or_else(|| restriction("invalid fraction-digits".into()))?;
                ty.fraction_digits = Some(digits);
            }
            None if base == BuiltinType::Decimal64 && !derived => {
                return Err(restriction("decimal64 requires fraction-digits".into()));
            }
            None => {}
        }

        if let Some(range) = child(StatementKind::Range) {
            if !base.is_numeric() {
                return Err(restriction(format!("range is not allowed on {}", base)));
            }
            let text = range.argument().unwrap_or_default();
            let intervals = parse_intervals(text, &ty.ranges, ty.fraction_digits)
                .ok_or_else(|| restriction(format!("malformed range '{}'", text)))?;
            if !is_subset(&intervals, &ty.ranges) {
                return Err(restriction(format!(
                    "range '{}' is not within {}",
                    text,
                    describe(&ty.ranges)
                )));
            }
            ty.ranges = intervals;
        }

        if let Some(length) = child(StatementKind::Length) {
            if !base.has_length() {
                return Err(restriction(format!("length is not allowed on {}", base)));
            }
            let text = length.argument().unwrap_or_default();
            let intervals = parse_intervals(text, &ty.lengths, None)
                .ok_or_else(|| restriction(format!("malformed length '{}'", text)))?;
            if !is_subset(&intervals, &ty.lengths) {
                return Err(restriction(format!(
                    "length '{}' is not within {}",
                    text,
                    describe(&ty.lengths)
                )));
            }
            ty.lengths = intervals;
        }

        for pattern in src.children_of_kind(stmt, StatementKind::Pattern) {
            if base != BuiltinType::String {
                return Err(restriction(format!("pattern is not allowed on {}", base)));
            }
            let expression = src.statement(pattern).argument().unwrap_or_default();
            Regex::new(&format!("^(?:{})$", expression))
                .map_err(|e| restriction(format!("invalid pattern '{}': {}", expression, e)))?;
            ty.patterns.push(PatternRestriction {
                expression: expression.to_string(),
                inverted: src.first_child(pattern, StatementKind::Modifier).is_some(),
            });
        }

        let enums = arguments(StatementKind::Enum);
        if !enums.is_empty() {
            if base != BuiltinType::Enumeration {
                return Err(restriction(format!("enum is not allowed on {}", base)));
            }
            restrict_names(&enums, &ty.enums, derived, "enum").map_err(restriction)?;
            ty.enums = enums;
        } else if base == BuiltinType::Enumeration && !derived {
            return Err(restriction("enumeration requires at least one enum".into()));
        }

        let bits = arguments(StatementKind::Bit);
        if !bits.is_empty() {
            if base != BuiltinType::Bits {
                return Err(restriction(format!("bit is not allowed on {}", base)));
            }
            restrict_names(&bits, &ty.bits, derived, "bit").map_err(restriction)?;
            ty.bits = bits;
        } else if base == BuiltinType::Bits && !derived {
            return Err(restriction("bits requires at least one bit".into()));
        }

        let members: Vec<StmtId> = src.children_of_kind(stmt, StatementKind::Type).collect();
        if !members.is_empty() {
            if base != BuiltinType::Union || derived {
                return Err(restriction("member types are only allowed on union itself".into()));
            }
            for member in members {
                ty.members.push(self.resolve(source, member, scope)?);
            }
        } else if base == BuiltinType::Union && !derived {
            return Err(restriction("union requires member types".into()));
        }

        match child(StatementKind::Path) {
            Some(path) if base == BuiltinType::Leafref && !derived => {
                ty.path = path.argument().map(str::to_string);
            }
            Some(_) => return Err(restriction("path is only allowed on leafref itself".into())),
            None if base == BuiltinType::Leafref && !derived => {
                return Err(restriction("leafref requires path".into()));
            }
            None => {}
        }

        let bases = arguments(StatementKind::Base);
        if !bases.is_empty() {
            if base != BuiltinType::Identityref || derived {
                return Err(restriction("base is only allowed on identityref itself".into()));
            }
            ty.bases = bases;
        } else if base == BuiltinType::Identityref && !derived {
            return Err(restriction("identityref requires base".into()));
        }

        if let Some(require) = child(StatementKind::RequireInstance) {
            if !matches!(base, BuiltinType::Leafref | BuiltinType::InstanceIdentifier) {
                return Err(restriction(format!("require-instance is not allowed on {}", base)));
            }
            ty.require_instance = Some(require.argument() == Some("true"));
        }

        Ok(ty)
    }

    fn resolve_typedef(&mut self, def: Definition) -> Result<EffectiveType> {
        let key = (def.source, def.stmt);
        if let Some(resolved) = self.resolved.get(&key) {
            return Ok(resolved.clone());
        }

        let model = self.model;
        let src = &model.sources()[def.source];
        let decl = src.statement(def.stmt);
        let owner = &model.sources()[model.owner(def.source)];
        let qualified = format!("{}:{}", owner.id().name(), decl.argument().unwrap_or_default());

        if let Some(start) = self.in_progress.iter().position(|(k, _)| *k == key) {
            let mut cycle: Vec<String> = self.in_progress[start..].iter().map(|(_, n)| n.clone()).collect();
            cycle.push(qualified);
            return Err(ReactorError::TypeCycle {
                source_id: src.id().clone(),
                location: decl.location().clone(),
                cycle,
            });
        }

        let type_stmt = src.first_child(def.stmt, StatementKind::Type).ok_or_else(|| {
            ReactorError::cardinality(src.id(), "typedef", decl.location(), "missing 'type' substatement")
        })?;

        trace!(typedef = %qualified, "resolving typedef");
        self.in_progress.push((key, qualified.clone()));
        let scope = def.scope.with(def.source, def.stmt);
        let result = self.resolve(def.source, type_stmt, &scope);
        self.in_progress.pop();

        let mut ty = result?;
        ty.typedefs.insert(0, qualified);
        if let Some(units) = src.child_argument(def.stmt, StatementKind::Units) {
            ty.units = Some(units.to_string());
        }
        if let Some(default) = src.child_argument(def.stmt, StatementKind::Default) {
            ty.default = Some(default.to_string());
        }
        self.resolved.insert(key, ty.clone());
        Ok(ty)
    }
}

/// Check a list of enum/bit names: unique, and a subset of `inherited` when derived
fn restrict_names(names: &[String], inherited: &[String], derived: bool, what: &str) -> std::result::Result<(), String> {
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(format!("{} '{}' is defined twice", what, name));
        }
        if derived && !inherited.contains(name) {
            return Err(format!("{} '{}' is not defined by the base type", what, name));
        }
    }
    Ok(())
}
