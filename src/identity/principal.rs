use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Admin,
}

/// Sub-classification of an admin account; decides which back-office screens it reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Position {
    Executive,
    Finance,
    General,
}

impl Position {
    pub const ALL: [Position; 3] = [Position::Executive, Position::Finance, Position::General];
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self { Role::Student => "STUDENT", Role::Admin => "ADMIN" })
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Position::Executive => "EXECUTIVE",
            Position::Finance => "FINANCE",
            Position::General => "GENERAL",
        })
    }
}

impl FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STUDENT" => Ok(Role::Student),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

impl FromStr for Position {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EXECUTIVE" => Ok(Position::Executive),
            "FINANCE" => Ok(Position::Finance),
            "GENERAL" => Ok(Position::General),
            other => Err(format!("unknown position '{}'", other)),
        }
    }
}

/// The authenticated principal. A position exists only on the admin variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Identity {
    Student { id: String },
    Admin { id: String, position: Position },
}

impl Identity {
    pub fn student<S: Into<String>>(id: S) -> Self { Identity::Student { id: id.into() } }
    pub fn admin<S: Into<String>>(id: S, position: Position) -> Self { Identity::Admin { id: id.into(), position } }

    /// Build from loose wire data (login response or token claims).
    ///
    /// An admin without a position is treated as `General`; a student carrying a
    /// position loses it. Both cases are logged.
    pub fn from_parts(id: String, role: Role, position: Option<Position>) -> Self {
        match (role, position) {
            (Role::Admin, Some(position)) => Identity::Admin { id, position },
            (Role::Admin, None) => {
                warn!(target: "identity", user = %id, "admin identity without position; treating as GENERAL");
                Identity::Admin { id, position: Position::General }
            }
            (Role::Student, Some(p)) => {
                warn!(target: "identity", user = %id, position = %p, "student identity carried a position; ignoring it");
                Identity::Student { id }
            }
            (Role::Student, None) => Identity::Student { id },
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Identity::Student { id } | Identity::Admin { id, .. } => id.as_str(),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Identity::Student { .. } => Role::Student,
            Identity::Admin { .. } => Role::Admin,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            Identity::Student { .. } => None,
            Identity::Admin { position, .. } => Some(*position),
        }
    }

    pub fn is_admin(&self) -> bool { matches!(self, Identity::Admin { .. }) }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Identity::Student { id } => write!(f, "{} (STUDENT)", id),
            Identity::Admin { id, position } => write!(f, "{} (ADMIN/{})", id, position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_without_position_defaults_to_general() {
        let id = Identity::from_parts("a1".into(), Role::Admin, None);
        assert_eq!(id, Identity::admin("a1", Position::General));
    }

    #[test]
    fn student_position_is_dropped() {
        let id = Identity::from_parts("s1".into(), Role::Student, Some(Position::Executive));
        assert_eq!(id.position(), None);
        assert_eq!(id.role(), Role::Student);
    }

    #[test]
    fn wire_names_are_screaming_case() {
        assert_eq!(serde_json::to_string(&Position::Finance).unwrap(), "\"FINANCE\"");
        assert_eq!(serde_json::from_str::<Role>("\"ADMIN\"").unwrap(), Role::Admin);
        assert_eq!("executive".parse::<Position>().unwrap(), Position::Executive);
        assert!("treasurer".parse::<Position>().is_err());
    }

    #[test]
    fn identity_serializes_with_role_tag() {
        let v = serde_json::to_value(Identity::admin("x", Position::Executive)).unwrap();
        assert_eq!(v["role"], "ADMIN");
        assert_eq!(v["position"], "EXECUTIVE");
    }
}
