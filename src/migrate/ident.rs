use std::fmt;
use std::str::FromStr;

use crate::error::{MigrateError, Result};

/// File stem suffix of a package body source, e.g. `PKG_REPORTS_BODY.sql`.
pub const BODY_SUFFIX: &str = "_BODY";

/// The stored object families the engine migrates. Each kind carries its
/// naming prefix, source directory and DDL keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Package,
    Function,
    Procedure,
    View,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 4] = [
        ObjectKind::Package,
        ObjectKind::Function,
        ObjectKind::Procedure,
        ObjectKind::View,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            ObjectKind::Package => "PKG_",
            ObjectKind::Function => "FNC_",
            ObjectKind::Procedure => "SP_",
            ObjectKind::View => "VW_",
        }
    }

    pub fn directory(&self) -> &'static str {
        match self {
            ObjectKind::Package => "packages",
            ObjectKind::Function => "functions",
            ObjectKind::Procedure => "procedures",
            ObjectKind::View => "views",
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            ObjectKind::Package => "PACKAGE",
            ObjectKind::Function => "FUNCTION",
            ObjectKind::Procedure => "PROCEDURE",
            ObjectKind::View => "VIEW",
        }
    }

    /// Packages are the only kind split into a specification and a body,
    /// each kept in its own source file.
    pub fn has_body(&self) -> bool {
        matches!(self, ObjectKind::Package)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Package => "package",
            ObjectKind::Function => "function",
            ObjectKind::Procedure => "procedure",
            ObjectKind::View => "view",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ObjectKind {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "package" => Ok(ObjectKind::Package),
            "function" => Ok(ObjectKind::Function),
            "procedure" => Ok(ObjectKind::Procedure),
            "view" => Ok(ObjectKind::View),
            other => Err(MigrateError::Config(format!(
                "unknown object kind: {} (expected package, function, procedure or view)",
                other
            ))),
        }
    }
}

/// Uppercases `name` and prepends the kind prefix unless it is already
/// there. Applying it twice yields the same identifier.
pub fn canonical_name(kind: ObjectKind, name: &str) -> String {
    let upped = name.to_uppercase();
    if upped.starts_with(kind.prefix()) {
        upped
    } else {
        format!("{}{}", kind.prefix(), upped)
    }
}

/// Rejects table names longer than the configured ceiling. The ceiling is
/// optional; schemas predating long identifier support keep a low one so
/// the derived SEQ_/TRG_ names still fit.
pub fn validate_table_name(name: &str, limit: Option<usize>) -> Result<()> {
    if let Some(limit) = limit {
        if name.len() > limit {
            return Err(MigrateError::IdentifierTooLong {
                name: name.to_string(),
                limit,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_missing_kind_marker() {
        assert_eq!(canonical_name(ObjectKind::Package, "reports"), "PKG_REPORTS");
        assert_eq!(canonical_name(ObjectKind::Function, "calc"), "FNC_CALC");
        assert_eq!(canonical_name(ObjectKind::Procedure, "nightly"), "SP_NIGHTLY");
        assert_eq!(canonical_name(ObjectKind::View, "balance"), "VW_BALANCE");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        for kind in ObjectKind::ALL {
            let once = canonical_name(kind, "sales");
            assert_eq!(canonical_name(kind, &once), once);
        }
    }

    #[test]
    fn detects_prefix_case_insensitively() {
        assert_eq!(canonical_name(ObjectKind::Package, "pkg_reports"), "PKG_REPORTS");
        assert_eq!(canonical_name(ObjectKind::View, "vw_Balance"), "VW_BALANCE");
    }

    #[test]
    fn table_name_ceiling_is_inclusive() {
        let at_limit = "A".repeat(23);
        assert!(validate_table_name(&at_limit, Some(23)).is_ok());

        let over_limit = "A".repeat(24);
        match validate_table_name(&over_limit, Some(23)) {
            Err(MigrateError::IdentifierTooLong { name, limit }) => {
                assert_eq!(name, over_limit);
                assert_eq!(limit, 23);
            }
            other => panic!("expected IdentifierTooLong, got {:?}", other),
        }
    }

    #[test]
    fn no_ceiling_accepts_long_names() {
        let long = "A".repeat(120);
        assert!(validate_table_name(&long, None).is_ok());
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Package".parse::<ObjectKind>().unwrap(), ObjectKind::Package);
        assert_eq!("VIEW".parse::<ObjectKind>().unwrap(), ObjectKind::View);
        assert!("table".parse::<ObjectKind>().is_err());
    }
}
