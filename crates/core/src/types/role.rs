//! Back-office roles and the capabilities they grant.
//!
//! The bookstore API reports a user's roles as free-form strings from its
//! user-info endpoint (`"Product Manager"`, `"sales_manager"`, ...). They are
//! folded into the closed [`Role`] enumeration here; names that match no known
//! role are dropped rather than rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A role the bookstore API can grant to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    ProductManager,
    SalesManager,
    Admin,
}

/// A role name that does not match any known [`Role`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct RoleParseError(pub String);

impl Role {
    /// All roles, in privilege order.
    pub const ALL: [Self; 4] = [
        Self::Customer,
        Self::ProductManager,
        Self::SalesManager,
        Self::Admin,
    ];

    /// Wire name as the bookstore API spells it.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::ProductManager => "product manager",
            Self::SalesManager => "sales manager",
            Self::Admin => "admin",
        }
    }

    /// Capabilities this role grants on its own.
    #[must_use]
    pub const fn capabilities(&self) -> &'static [Capability] {
        match self {
            Self::Customer => &[],
            Self::ProductManager => &[
                Capability::ManageCatalog,
                Capability::ManageStock,
                Capability::ModerateReviews,
                Capability::ManageOrders,
                Capability::ViewInvoices,
            ],
            Self::SalesManager => &[
                Capability::ManagePricing,
                Capability::ManageDiscounts,
                Capability::ProcessRefunds,
                Capability::ViewRevenue,
                Capability::ViewInvoices,
            ],
            Self::Admin => &Capability::ALL,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    /// Case-insensitive; spaces, underscores and hyphens are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter_map(|c| match c {
                ' ' | '_' | '-' => None,
                c => Some(c.to_ascii_lowercase()),
            })
            .collect();

        match folded.as_str() {
            "customer" => Ok(Self::Customer),
            "productmanager" => Ok(Self::ProductManager),
            "salesmanager" => Ok(Self::SalesManager),
            "admin" => Ok(Self::Admin),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

/// Something a back-office screen lets a user do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ManageCatalog,
    ManageStock,
    ModerateReviews,
    ManageOrders,
    ViewInvoices,
    ManagePricing,
    ManageDiscounts,
    ProcessRefunds,
    ViewRevenue,
}

impl Capability {
    pub const ALL: [Self; 9] = [
        Self::ManageCatalog,
        Self::ManageStock,
        Self::ModerateReviews,
        Self::ManageOrders,
        Self::ViewInvoices,
        Self::ManagePricing,
        Self::ManageDiscounts,
        Self::ProcessRefunds,
        Self::ViewRevenue,
    ];
}

/// The set of roles held by one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    /// Build a role set from raw role names, ignoring unknown names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roles: Vec<Role> = names
            .into_iter()
            .filter_map(|name| name.as_ref().parse().ok())
            .collect();
        roles.sort_unstable();
        roles.dedup();
        Self(roles)
    }

    /// Whether the user holds `role`.
    #[must_use]
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// Whether any held role grants `capability`.
    #[must_use]
    pub fn can(&self, capability: Capability) -> bool {
        self.0
            .iter()
            .any(|role| role.capabilities().contains(&capability))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        let mut roles: Vec<Role> = iter.into_iter().collect();
        roles.sort_unstable();
        roles.dedup();
        Self(roles)
    }
}
