//! FULL_DECLARATION: grammar and argument checks over bound statements

use std::collections::BTreeMap;

use crate::error::{ReactorError, Result};
use crate::identifier::{Revision, SourceIdentifier};
use crate::stmt::{Section, StatementKind, YangVersion};

use super::declared::{DeclaredKind, DeclaredStatement, StmtId};
use super::SourceIdx;

pub(crate) struct Checker<'a> {
    pub id: &'a SourceIdentifier,
    pub statements: &'a [DeclaredStatement],
    pub prefixes: &'a BTreeMap<String, SourceIdx>,
    pub enforce_order: bool,
}

impl Checker<'_> {
    pub fn check(&self) -> Result<()> {
        for (idx, stmt) in self.statements.iter().enumerate() {
            let DeclaredKind::Statement(kind) = stmt.kind else {
                continue;
            };
            self.check_argument(kind, stmt)?;
            self.check_substatements(kind, stmt)?;
            if idx == StmtId::ROOT.0 && self.enforce_order {
                self.check_section_order(stmt)?;
            }
        }
        Ok(())
    }

    fn error(&self, stmt: &DeclaredStatement, message: impl Into<String>) -> ReactorError {
        ReactorError::cardinality(self.id, &stmt.keyword, &stmt.location, message)
    }

    fn check_substatements(&self, kind: StatementKind, stmt: &DeclaredStatement) -> Result<()> {
        let mut counts: BTreeMap<StatementKind, usize> = BTreeMap::new();
        for &child in &stmt.children {
            let child = &self.statements[child.0];
            let DeclaredKind::Statement(child_kind) = child.kind else {
                continue;
            };
            if kind.substatement(child_kind).is_none() {
                return Err(self.error(child, format!("not allowed under '{}'", kind)));
            }
            *counts.entry(child_kind).or_default() += 1;
        }

        for (&child_kind, &count) in &counts {
            if let Some(cardinality) = kind.substatement(child_kind) {
                if !cardinality.allows(count) {
                    return Err(self.error(
                        stmt,
                        format!("'{}' appears {} times, allowed {}", child_kind, count, cardinality),
                    ));
                }
            }
        }

        for required in kind.required_substatements() {
            if !counts.contains_key(&required) {
                return Err(self.error(stmt, format!("missing '{}' substatement", required)));
            }
        }
        Ok(())
    }

    fn check_section_order(&self, root: &DeclaredStatement) -> Result<()> {
        let mut current = Section::Header;
        for &child in &root.children {
            let child = &self.statements[child.0];
            let section = match child.kind {
                DeclaredKind::Statement(kind) => kind.section(),
                _ => continue,
            };
            if section < current {
                return Err(self.error(
                    child,
                    format!("{:?} statement after the {:?} section", section, current),
                ));
            }
            current = section;
        }
        Ok(())
    }

    fn check_argument(&self, kind: StatementKind, stmt: &DeclaredStatement) -> Result<()> {
        let argument = match (kind.takes_argument(), stmt.argument.as_deref()) {
            (true, Some(arg)) => arg,
            (true, None) => return Err(self.error(stmt, "missing argument")),
            (false, Some(_)) => return Err(self.error(stmt, "takes no argument")),
            (false, None) => return Ok(()),
        };

        let valid = match kind {
            StatementKind::Config
            | StatementKind::Mandatory
            | StatementKind::RequireInstance
            | StatementKind::YinElement => matches!(argument, "true" | "false"),
            StatementKind::Status => matches!(argument, "current" | "deprecated" | "obsolete"),
            StatementKind::OrderedBy => matches!(argument, "system" | "user"),
            StatementKind::Deviate => matches!(argument, "not-supported" | "add" | "replace" | "delete"),
            StatementKind::Modifier => argument == "invert-match",
            StatementKind::MinElements => argument.parse::<u32>().is_ok(),
            StatementKind::MaxElements => argument == "unbounded" || argument.parse::<u32>().is_ok_and(|n| n > 0),
            StatementKind::FractionDigits => argument.parse::<u8>().is_ok_and(|n| (1..=18).contains(&n)),
            StatementKind::YangVersion => YangVersion::parse(argument).is_some(),
            StatementKind::Revision | StatementKind::RevisionDate => {
                Revision::parse(argument)?;
                true
            }
            StatementKind::Uses | StatementKind::Type | StatementKind::Base => {
                return self.check_prefix(stmt, argument);
            }
            StatementKind::Augment | StatementKind::Deviation | StatementKind::Refine => {
                for step in argument.split('/').filter(|s| !s.is_empty()) {
                    self.check_prefix(stmt, step.trim())?;
                }
                true
            }
            _ => true,
        };

        if valid {
            Ok(())
        } else {
            Err(self.error(stmt, format!("invalid argument '{}'", argument)))
        }
    }

    fn check_prefix(&self, stmt: &DeclaredStatement, name: &str) -> Result<()> {
        match name.split_once(':') {
            Some((prefix, _)) if !self.prefixes.contains_key(prefix) => Err(ReactorError::linkage(
                self.id,
                format!("unknown prefix '{}' in '{}' at {}", prefix, name, stmt.location),
            )),
            _ => Ok(()),
        }
    }
}
