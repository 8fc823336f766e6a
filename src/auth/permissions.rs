//! Role to permission mapping.
//!
//! Permissions are `resource:action` strings. A grant of `resource:*` covers
//! every action on that resource and `*` covers everything.

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::entities::user::UserRole;

/// Permission string constants for compile-time safety
pub mod consts {
    pub const ORDERS_READ: &str = "orders:read";
    /// See every order, not only the ones assigned to you
    pub const ORDERS_READ_ALL: &str = "orders:read_all";
    pub const ORDERS_CREATE: &str = "orders:create";
    pub const ORDERS_UPDATE: &str = "orders:update";
    pub const ORDERS_UPDATE_STATUS: &str = "orders:update_status";
    pub const ORDERS_ASSIGN: &str = "orders:assign";
    pub const ORDERS_NOTE: &str = "orders:note";
    pub const ORDERS_DELETE: &str = "orders:delete";

    pub const QUOTATIONS_READ: &str = "quotations:read";
    pub const QUOTATIONS_CREATE: &str = "quotations:create";
    pub const QUOTATIONS_UPDATE: &str = "quotations:update";
    pub const QUOTATIONS_APPROVE: &str = "quotations:approve";
    pub const QUOTATIONS_CONVERT: &str = "quotations:convert";
    pub const QUOTATIONS_DELETE: &str = "quotations:delete";

    pub const INVOICES_READ: &str = "invoices:read";
    pub const INVOICES_CREATE: &str = "invoices:create";
    pub const INVOICES_RECORD_PAYMENT: &str = "invoices:record_payment";
    pub const INVOICES_CANCEL: &str = "invoices:cancel";
    pub const INVOICES_DELETE: &str = "invoices:delete";

    pub const CUSTOMERS_READ: &str = "customers:read";
    pub const CUSTOMERS_CREATE: &str = "customers:create";
    pub const CUSTOMERS_UPDATE: &str = "customers:update";
    pub const CUSTOMERS_DELETE: &str = "customers:delete";

    pub const INVENTORY_READ: &str = "inventory:read";
    pub const INVENTORY_CREATE: &str = "inventory:create";
    pub const INVENTORY_UPDATE: &str = "inventory:update";
    pub const INVENTORY_ADJUST: &str = "inventory:adjust";
    pub const INVENTORY_DELETE: &str = "inventory:delete";

    pub const MATERIAL_REQUESTS_READ: &str = "material_requests:read";
    pub const MATERIAL_REQUESTS_READ_ALL: &str = "material_requests:read_all";
    pub const MATERIAL_REQUESTS_CREATE: &str = "material_requests:create";
    pub const MATERIAL_REQUESTS_APPROVE: &str = "material_requests:approve";
    pub const MATERIAL_REQUESTS_FULFIL: &str = "material_requests:fulfil";

    pub const USERS_READ: &str = "users:read";
    pub const USERS_MANAGE: &str = "users:manage";

    pub const DASHBOARD_READ: &str = "dashboard:read";

    pub const FILES_READ: &str = "files:read";
    pub const FILES_UPLOAD: &str = "files:upload";

    pub const CHAT_USE: &str = "chat:use";
    pub const CALLS_USE: &str = "calls:use";
}

/// Grants shared by every signed-in staff member
const STAFF_BASE: &[&str] = &[
    "chat:*",
    "calls:*",
    "files:*",
    consts::MATERIAL_REQUESTS_READ,
    consts::MATERIAL_REQUESTS_CREATE,
];

lazy_static! {
    static ref ROLE_PERMISSIONS: HashMap<UserRole, Vec<&'static str>> = {
        let mut roles = HashMap::new();

        roles.insert(UserRole::Admin, vec!["*"]);

        roles.insert(
            UserRole::Ceo,
            vec![
                consts::ORDERS_READ,
                consts::ORDERS_READ_ALL,
                consts::ORDERS_CREATE,
                consts::ORDERS_UPDATE,
                consts::ORDERS_UPDATE_STATUS,
                consts::ORDERS_ASSIGN,
                consts::ORDERS_NOTE,
                "quotations:*",
                consts::INVOICES_READ,
                consts::INVOICES_CREATE,
                consts::INVOICES_RECORD_PAYMENT,
                consts::INVOICES_CANCEL,
                "customers:*",
                consts::INVENTORY_READ,
                "material_requests:*",
                consts::USERS_READ,
                consts::DASHBOARD_READ,
            ],
        );

        roles.insert(
            UserRole::Accountant,
            vec![
                consts::ORDERS_READ,
                consts::ORDERS_READ_ALL,
                consts::ORDERS_UPDATE_STATUS,
                consts::ORDERS_NOTE,
                consts::QUOTATIONS_READ,
                consts::INVOICES_READ,
                consts::INVOICES_CREATE,
                consts::INVOICES_RECORD_PAYMENT,
                consts::INVOICES_CANCEL,
                consts::CUSTOMERS_READ,
                consts::CUSTOMERS_CREATE,
                consts::CUSTOMERS_UPDATE,
                consts::INVENTORY_READ,
                consts::DASHBOARD_READ,
            ],
        );

        roles.insert(
            UserRole::Sales,
            vec![
                consts::ORDERS_READ,
                consts::ORDERS_READ_ALL,
                consts::ORDERS_CREATE,
                consts::ORDERS_UPDATE,
                consts::ORDERS_UPDATE_STATUS,
                consts::ORDERS_ASSIGN,
                consts::ORDERS_NOTE,
                consts::QUOTATIONS_READ,
                consts::QUOTATIONS_CREATE,
                consts::QUOTATIONS_UPDATE,
                consts::QUOTATIONS_CONVERT,
                consts::QUOTATIONS_DELETE,
                consts::INVOICES_READ,
                consts::INVOICES_CREATE,
                consts::CUSTOMERS_READ,
                consts::CUSTOMERS_CREATE,
                consts::CUSTOMERS_UPDATE,
                consts::INVENTORY_READ,
            ],
        );

        let floor_staff = vec![
            consts::ORDERS_READ,
            consts::ORDERS_UPDATE_STATUS,
            consts::ORDERS_NOTE,
            consts::CUSTOMERS_READ,
            consts::INVENTORY_READ,
        ];
        roles.insert(UserRole::Designer, floor_staff.clone());
        roles.insert(UserRole::Printing, floor_staff);

        roles.insert(
            UserRole::Inventory,
            vec![
                "inventory:*",
                consts::MATERIAL_REQUESTS_READ_ALL,
                consts::MATERIAL_REQUESTS_FULFIL,
            ],
        );

        for grants in roles.values_mut() {
            grants.extend_from_slice(STAFF_BASE);
        }
        roles
    };
}

/// Every permission granted to `role`
pub fn permissions_for(role: UserRole) -> Vec<String> {
    ROLE_PERMISSIONS
        .get(&role)
        .map(|grants| grants.iter().map(|p| p.to_string()).collect())
        .unwrap_or_default()
}

/// Whether a single grant covers the required permission
pub fn permission_matches(granted: &str, required: &str) -> bool {
    if granted == "*" || granted == required {
        return true;
    }
    match granted.strip_suffix(":*") {
        Some(resource) => required
            .split_once(':')
            .map_or(false, |(required_resource, _)| required_resource == resource),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::consts::*;
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("*", ORDERS_DELETE, true)]
    #[case("orders:*", ORDERS_DELETE, true)]
    #[case("orders:*", "ordersx:read", false)]
    #[case("orders:read", ORDERS_READ, true)]
    #[case("orders:read", ORDERS_READ_ALL, false)]
    #[case("quotations:*", ORDERS_READ, false)]
    fn wildcard_matching(#[case] granted: &str, #[case] required: &str, #[case] expected: bool) {
        assert_eq!(permission_matches(granted, required), expected);
    }

    #[test]
    fn every_role_can_chat_and_request_material() {
        use sea_orm::Iterable;
        for role in UserRole::iter() {
            let grants = permissions_for(role);
            assert!(grants.iter().any(|g| permission_matches(g, CHAT_USE)), "{role}");
            assert!(
                grants
                    .iter()
                    .any(|g| permission_matches(g, MATERIAL_REQUESTS_CREATE)),
                "{role}"
            );
        }
    }

    #[test]
    fn only_management_approves_quotations() {
        let approvers: Vec<UserRole> = [
            UserRole::Admin,
            UserRole::Ceo,
            UserRole::Accountant,
            UserRole::Sales,
            UserRole::Designer,
            UserRole::Printing,
            UserRole::Inventory,
        ]
        .into_iter()
        .filter(|role| {
            permissions_for(*role)
                .iter()
                .any(|g| permission_matches(g, QUOTATIONS_APPROVE))
        })
        .collect();
        assert_eq!(approvers, vec![UserRole::Admin, UserRole::Ceo]);
    }
}
