//! Built-in route table, used unless `ROUTE_TABLE` points at a JSON document.

use gatehouse_auth::{RouteRule, RouteTable, RouteTableError};

pub fn default_rules() -> Vec<RouteRule> {
    vec![
        RouteRule::public("/"),
        RouteRule::public("/about"),
        RouteRule::public("/health"),
        RouteRule::guest_only("/login"),
        RouteRule::guest_only("/register"),
        RouteRule::guest_only("/forgot-password"),
        RouteRule::private("/dashboard"),
        RouteRule::private("/change-password"),
        RouteRule::private("/forbidden"),
        RouteRule::private("/roles").requiring(["roles:view"]),
        RouteRule::private("/roles/new").requiring(["roles:create"]),
        RouteRule::private("/users").requiring(["users:view"]),
        RouteRule::private("/tasks").requiring(["tasks:view"]),
        RouteRule::private("/curricula").requiring(["curricula:view"]),
        RouteRule::private("/expenses").requiring(["expenses:view"]),
        RouteRule::private("/api/session"),
        // Reads the session itself; a pending password change must still reach it.
        RouteRule::public("/api/session/landing"),
        RouteRule::private("/api/tasks").requiring(["tasks:view"]),
    ]
}

pub fn default_table() -> Result<RouteTable, RouteTableError> {
    RouteTable::new(default_rules())
}
