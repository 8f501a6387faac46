//! # Caller Context
//!
//! Who is calling and which branch they may touch. Every engine operation
//! takes a `CallerContext` explicitly; nothing reads identity from ambient
//! state.
//!
//! ## Branch Scoping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Role        branch_id    reads             writes                      │
//! │  ──────────  ──────────   ───────────────   ──────────────────────────  │
//! │  Owner       None         all branches      branch given explicitly     │
//! │  Manager     Some(b)      b only            b (client value ignored)    │
//! │  Cashier     Some(b)      b only            b                           │
//! │  Kitchen     Some(b)      b only            b                           │
//! │  Waiter      Some(b)      b only            b                           │
//! │  Guest       Some(b)      b only            b, WEB orders only          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::OrderSource;

/// Staff role carried by the caller's token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Manager,
    Cashier,
    Kitchen,
    Waiter,
    /// Unauthenticated web menu visitor.
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Manager => "MANAGER",
            Role::Cashier => "CASHIER",
            Role::Kitchen => "KITCHEN",
            Role::Waiter => "WAITER",
            Role::Guest => "GUEST",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OWNER" => Ok(Role::Owner),
            "MANAGER" => Ok(Role::Manager),
            "CASHIER" => Ok(Role::Cashier),
            "KITCHEN" => Ok(Role::Kitchen),
            "WAITER" => Ok(Role::Waiter),
            "GUEST" => Ok(Role::Guest),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: ["OWNER", "MANAGER", "CASHIER", "KITCHEN", "WAITER", "GUEST"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

/// Identity and branch scope of the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    /// Staff user id, or `"guest"` for web visitors.
    pub user_id: String,
    pub role: Role,
    /// Home branch. `None` only for owners, who span every branch.
    pub branch_id: Option<String>,
}

impl CallerContext {
    pub const GUEST_USER_ID: &'static str = "guest";

    pub fn new(user_id: impl Into<String>, role: Role, branch_id: Option<String>) -> Self {
        CallerContext {
            user_id: user_id.into(),
            role,
            branch_id,
        }
    }

    /// Staff member bound to one branch.
    pub fn staff(user_id: impl Into<String>, role: Role, branch_id: impl Into<String>) -> Self {
        Self::new(user_id, role, Some(branch_id.into()))
    }

    pub fn owner(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Owner, None)
    }

    /// Unauthenticated web visitor ordering at `branch_id`.
    pub fn guest(branch_id: impl Into<String>) -> Self {
        Self::new(Self::GUEST_USER_ID, Role::Guest, Some(branch_id.into()))
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    pub fn is_guest(&self) -> bool {
        self.role == Role::Guest
    }

    /// Branch filter for reads. `None` means every branch.
    pub fn read_scope(&self) -> Option<&str> {
        if self.is_owner() {
            None
        } else {
            self.branch_id.as_deref()
        }
    }

    /// Whether an entity in `branch_id` is visible to this caller.
    pub fn can_access(&self, branch_id: &str) -> bool {
        match self.read_scope() {
            None => self.is_owner(),
            Some(scope) => scope == branch_id,
        }
    }

    /// Resolves the branch a write lands in.
    ///
    /// Scoped callers always write to their own branch and `requested` is
    /// ignored. Owners must name the branch.
    pub fn write_branch(&self, requested: Option<&str>) -> CoreResult<String> {
        if self.is_owner() {
            return match requested.map(str::trim) {
                Some(branch) if !branch.is_empty() => Ok(branch.to_string()),
                _ => Err(ValidationError::required("branch_id").into()),
            };
        }
        self.branch_id
            .clone()
            .ok_or_else(|| CoreError::PermissionDenied("caller has no branch".to_string()))
    }

    /// Void (and cancel) is reserved for owners and managers.
    pub fn can_void(&self) -> bool {
        matches!(self.role, Role::Owner | Role::Manager)
    }

    pub fn require_void(&self) -> CoreResult<()> {
        if self.can_void() {
            Ok(())
        } else {
            Err(CoreError::PermissionDenied(format!(
                "{} cannot void orders",
                self.role
            )))
        }
    }

    /// Staff-only operations (payment, status changes, stock adjustments).
    pub fn require_staff(&self) -> CoreResult<()> {
        if self.is_guest() {
            Err(CoreError::PermissionDenied(
                "authentication required".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    /// Guests may only place web orders.
    pub fn require_can_create(&self, source: OrderSource) -> CoreResult<()> {
        if self.is_guest() && source != OrderSource::Web {
            return Err(CoreError::PermissionDenied(
                "guests can only place WEB orders".to_string(),
            ));
        }
        Ok(())
    }

    /// Actor id written to audit rows.
    pub fn actor_id(&self) -> &str {
        &self.user_id
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
