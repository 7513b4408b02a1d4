//! Statement definitions
//!
//! Closed set of YANG statement kinds together with their grammar:
//! argument presence, substatement cardinality and module section order.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::YangVersion;

/// How often a substatement may appear under its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// 0..1
    Optional,
    /// exactly 1
    One,
    /// 0..n
    Many,
    /// 1..n
    AtLeastOne,
}

impl Cardinality {
    pub fn allows(&self, count: usize) -> bool {
        match self {
            Self::Optional => count <= 1,
            Self::One => count == 1,
            Self::Many => true,
            Self::AtLeastOne => count >= 1,
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Self::One | Self::AtLeastOne)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optional => write!(f, "0..1"),
            Self::One => write!(f, "1"),
            Self::Many => write!(f, "0..n"),
            Self::AtLeastOne => write!(f, "1..n"),
        }
    }
}

/// Module/submodule body sections, which must appear in this order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    Header,
    Linkage,
    Meta,
    Revision,
    Body,
}

macro_rules! statement_kinds {
    ($($variant:ident => $keyword:literal),* $(,)?) => {
        /// Every statement the reactor understands
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum StatementKind {
            $($variant),*
        }

        impl StatementKind {
            pub const ALL: &'static [StatementKind] = &[$(StatementKind::$variant),*];

            pub fn keyword(&self) -> &'static str {
                match self {
                    $(Self::$variant => $keyword),*
                }
            }

            fn from_keyword_any_version(keyword: &str) -> Option<Self> {
                match keyword {
                    $($keyword => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

statement_kinds! {
    Action => "action",
    Anydata => "anydata",
    Anyxml => "anyxml",
    Argument => "argument",
    Augment => "augment",
    Base => "base",
    BelongsTo => "belongs-to",
    Bit => "bit",
    Case => "case",
    Choice => "choice",
    Config => "config",
    Contact => "contact",
    Container => "container",
    Default => "default",
    Description => "description",
    Deviate => "deviate",
    Deviation => "deviation",
    Enum => "enum",
    ErrorAppTag => "error-app-tag",
    ErrorMessage => "error-message",
    Extension => "extension",
    Feature => "feature",
    FractionDigits => "fraction-digits",
    Grouping => "grouping",
    Identity => "identity",
    IfFeature => "if-feature",
    Import => "import",
    Include => "include",
    Input => "input",
    Key => "key",
    Leaf => "leaf",
    LeafList => "leaf-list",
    Length => "length",
    List => "list",
    Mandatory => "mandatory",
    MaxElements => "max-elements",
    MinElements => "min-elements",
    Modifier => "modifier",
    Module => "module",
    Must => "must",
    Namespace => "namespace",
    Notification => "notification",
    OrderedBy => "ordered-by",
    Organization => "organization",
    Output => "output",
    Path => "path",
    Pattern => "pattern",
    Position => "position",
    Prefix => "prefix",
    Presence => "presence",
    Range => "range",
    Reference => "reference",
    Refine => "refine",
    RequireInstance => "require-instance",
    Revision => "revision",
    RevisionDate => "revision-date",
    Rpc => "rpc",
    Status => "status",
    Submodule => "submodule",
    Type => "type",
    Typedef => "typedef",
    Unique => "unique",
    Units => "units",
    Uses => "uses",
    Value => "value",
    When => "when",
    YangVersion => "yang-version",
    YinElement => "yin-element",
}

impl StatementKind {
    /// Bind a keyword for a source of the given language version
    pub fn from_keyword(keyword: &str, version: YangVersion) -> Option<Self> {
        let kind = Self::from_keyword_any_version(keyword)?;
        if kind.since() > version {
            return None;
        }
        Some(kind)
    }

    /// First language version defining this statement
    pub fn since(&self) -> YangVersion {
        match self {
            Self::Action | Self::Anydata | Self::Modifier => YangVersion::V1_1,
            _ => YangVersion::V1,
        }
    }

    pub fn takes_argument(&self) -> bool {
        !matches!(self, Self::Input | Self::Output)
    }

    /// Statements that define data nodes
    pub fn is_data_definition(&self) -> bool {
        matches!(
            self,
            Self::Container
                | Self::Leaf
                | Self::LeafList
                | Self::List
                | Self::Choice
                | Self::Anydata
                | Self::Anyxml
                | Self::Uses
        )
    }

    /// Statements that become nodes of the schema tree (and get a qualified name)
    pub fn is_schema_node(&self) -> bool {
        matches!(
            self,
            Self::Container
                | Self::Leaf
                | Self::LeafList
                | Self::List
                | Self::Choice
                | Self::Case
                | Self::Anydata
                | Self::Anyxml
                | Self::Rpc
                | Self::Action
                | Self::Input
                | Self::Output
                | Self::Notification
        )
    }

    /// Schema nodes that may be the target of an `augment`
    pub fn is_augmentable(&self) -> bool {
        matches!(
            self,
            Self::Container
                | Self::List
                | Self::Choice
                | Self::Case
                | Self::Input
                | Self::Output
                | Self::Notification
        )
    }

    /// Section of a module/submodule body this statement belongs to
    pub fn section(&self) -> Section {
        match self {
            Self::YangVersion | Self::Namespace | Self::Prefix | Self::BelongsTo => Section::Header,
            Self::Import | Self::Include => Section::Linkage,
            Self::Organization | Self::Contact | Self::Description | Self::Reference => Section::Meta,
            Self::Revision => Section::Revision,
            _ => Section::Body,
        }
    }

    /// Allowed cardinality of `child` under `self`, `None` if not allowed at all
    pub fn substatement(&self, child: StatementKind) -> Option<Cardinality> {
        use Cardinality::*;
        use StatementKind as K;

        let documented = matches!(child, K::Description | K::Reference);
        let data_def = child.is_data_definition();

        match self {
            K::Module | K::Submodule => match child {
                K::YangVersion => Some(Optional),
                K::Namespace | K::Prefix if *self == K::Module => Some(One),
                K::BelongsTo if *self == K::Submodule => Some(One),
                K::Import | K::Include | K::Revision => Some(Many),
                K::Organization | K::Contact | K::Description | K::Reference => Some(Optional),
                K::Extension | K::Feature | K::Identity | K::Typedef | K::Grouping => Some(Many),
                K::Augment | K::Rpc | K::Notification | K::Deviation => Some(Many),
                _ if data_def => Some(Many),
                _ => None,
            },
            K::Import => match child {
                K::Prefix => Some(One),
                K::RevisionDate => Some(Optional),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::Include => match child {
                K::RevisionDate => Some(Optional),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::BelongsTo => match child {
                K::Prefix => Some(One),
                _ => None,
            },
            K::Revision => documented.then_some(Optional),
            K::Extension => match child {
                K::Argument | K::Status => Some(Optional),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::Argument => (child == K::YinElement).then_some(Optional),
            K::Feature => match child {
                K::IfFeature => Some(Many),
                K::Status => Some(Optional),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::Identity => match child {
                K::IfFeature | K::Base => Some(Many),
                K::Status => Some(Optional),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::Typedef => match child {
                K::Type => Some(One),
                K::Units | K::Default | K::Status => Some(Optional),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::Type => match child {
                K::FractionDigits | K::Range | K::Length | K::Path | K::RequireInstance => {
                    Some(Optional)
                }
                K::Pattern | K::Enum | K::Bit | K::Base | K::Type => Some(Many),
                _ => None,
            },
            K::Range | K::Length | K::Must => match child {
                K::ErrorMessage | K::ErrorAppTag => Some(Optional),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::Pattern => match child {
                K::Modifier | K::ErrorMessage | K::ErrorAppTag => Some(Optional),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::When => documented.then_some(Optional),
            K::Enum | K::Bit => match child {
                K::IfFeature => Some(Many),
                K::Value if *self == K::Enum => Some(Optional),
                K::Position if *self == K::Bit => Some(Optional),
                K::Status => Some(Optional),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::Grouping => match child {
                K::Typedef | K::Grouping | K::Action | K::Notification => Some(Many),
                K::Status => Some(Optional),
                _ if documented => Some(Optional),
                _ if data_def => Some(Many),
                _ => None,
            },
            K::Container => match child {
                K::When | K::Presence | K::Config | K::Status => Some(Optional),
                K::IfFeature | K::Must | K::Typedef | K::Grouping | K::Action | K::Notification => {
                    Some(Many)
                }
                _ if documented => Some(Optional),
                _ if data_def => Some(Many),
                _ => None,
            },
            K::Leaf => match child {
                K::Type => Some(One),
                K::When | K::Units | K::Default | K::Config | K::Mandatory | K::Status => {
                    Some(Optional)
                }
                K::IfFeature | K::Must => Some(Many),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::LeafList => match child {
                K::Type => Some(One),
                K::When
                | K::Units
                | K::Config
                | K::MinElements
                | K::MaxElements
                | K::OrderedBy
                | K::Status => Some(Optional),
                K::IfFeature | K::Must | K::Default => Some(Many),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::List => match child {
                K::When
                | K::Key
                | K::Config
                | K::MinElements
                | K::MaxElements
                | K::OrderedBy
                | K::Status => Some(Optional),
                K::IfFeature
                | K::Must
                | K::Unique
                | K::Typedef
                | K::Grouping
                | K::Action
                | K::Notification => Some(Many),
                _ if documented => Some(Optional),
                _ if data_def => Some(Many),
                _ => None,
            },
            K::Choice => match child {
                K::When | K::Default | K::Config | K::Mandatory | K::Status => Some(Optional),
                K::IfFeature | K::Case => Some(Many),
                K::Uses => None,
                _ if documented => Some(Optional),
                _ if data_def => Some(Many),
                _ => None,
            },
            K::Case => match child {
                K::When | K::Status => Some(Optional),
                K::IfFeature => Some(Many),
                _ if documented => Some(Optional),
                _ if data_def => Some(Many),
                _ => None,
            },
            K::Anydata | K::Anyxml => match child {
                K::When | K::Config | K::Mandatory | K::Status => Some(Optional),
                K::IfFeature | K::Must => Some(Many),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::Uses => match child {
                K::When | K::Status => Some(Optional),
                K::IfFeature | K::Refine | K::Augment => Some(Many),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::Refine => match child {
                K::Presence | K::Config | K::Mandatory | K::MinElements | K::MaxElements => {
                    Some(Optional)
                }
                K::IfFeature | K::Must | K::Default => Some(Many),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::Augment => match child {
                K::When | K::Status => Some(Optional),
                K::IfFeature | K::Case | K::Action | K::Notification => Some(Many),
                _ if documented => Some(Optional),
                _ if data_def => Some(Many),
                _ => None,
            },
            K::Rpc | K::Action => match child {
                K::Input | K::Output | K::Status => Some(Optional),
                K::IfFeature | K::Typedef | K::Grouping => Some(Many),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::Input | K::Output => match child {
                K::Must | K::Typedef | K::Grouping => Some(Many),
                _ if data_def => Some(Many),
                _ => None,
            },
            K::Notification => match child {
                K::Status => Some(Optional),
                K::IfFeature | K::Must | K::Typedef | K::Grouping => Some(Many),
                _ if documented => Some(Optional),
                _ if data_def => Some(Many),
                _ => None,
            },
            K::Deviation => match child {
                K::Deviate => Some(AtLeastOne),
                _ if documented => Some(Optional),
                _ => None,
            },
            K::Deviate => match child {
                K::Units
                | K::Config
                | K::Mandatory
                | K::MinElements
                | K::MaxElements
                | K::Type => Some(Optional),
                K::Must | K::Unique | K::Default => Some(Many),
                _ => None,
            },
            _ => None,
        }
    }

    /// Substatements that must be present under `self`
    pub fn required_substatements(&self) -> impl Iterator<Item = StatementKind> + '_ {
        Self::ALL
            .iter()
            .copied()
            .filter(move |child| self.substatement(*child).is_some_and(|c| c.is_required()))
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_round_trip() {
        for kind in StatementKind::ALL {
            assert_eq!(
                StatementKind::from_keyword(kind.keyword(), YangVersion::V1_1),
                Some(*kind)
            );
        }
    }

    #[test]
    fn test_version_gated_keywords() {
        assert_eq!(StatementKind::from_keyword("action", YangVersion::V1), None);
        assert_eq!(StatementKind::from_keyword("anydata", YangVersion::V1), None);
        assert_eq!(
            StatementKind::from_keyword("anydata", YangVersion::V1_1),
            Some(StatementKind::Anydata)
        );
        assert_eq!(StatementKind::from_keyword("frobnicate", YangVersion::V1_1), None);
    }

    #[test]
    fn test_required_substatements() {
        let module: Vec<_> = StatementKind::Module.required_substatements().collect();
        assert_eq!(module, vec![StatementKind::Namespace, StatementKind::Prefix]);

        let leaf: Vec<_> = StatementKind::Leaf.required_substatements().collect();
        assert_eq!(leaf, vec![StatementKind::Type]);

        assert_eq!(
            StatementKind::Deviation.substatement(StatementKind::Deviate),
            Some(Cardinality::AtLeastOne)
        );
    }

    #[test]
    fn test_grammar_rejects_misplaced() {
        assert_eq!(StatementKind::Leaf.substatement(StatementKind::Container), None);
        assert_eq!(StatementKind::Choice.substatement(StatementKind::Uses), None);
        assert_eq!(StatementKind::Submodule.substatement(StatementKind::Namespace), None);
        assert!(Cardinality::Optional.allows(1));
        assert!(!Cardinality::Optional.allows(2));
    }
}
