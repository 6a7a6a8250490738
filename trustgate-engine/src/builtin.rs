//! Built-in trust types, seeded into the registry on first access.

use trustgate_types::{AclRule, AllowDenyRule, PatternRule, PermissionSet, TrustTypeDefinition};

pub const ASSOCIATE: &str = "associate";
pub const VIEWER: &str = "viewer";
pub const FRIEND: &str = "friend";
pub const PARTNER: &str = "partner";
pub const ADMIN: &str = "admin";
pub const MCP_CLIENT: &str = "mcp_client";

pub const BUILTIN_NAMES: [&str; 6] = [ASSOCIATE, VIEWER, FRIEND, PARTNER, ADMIN, MCP_CLIENT];

/// Reserved names cannot be unregistered or redefined.
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

fn scope(name: &str) -> String {
    format!("trustgate.{name}")
}

/// Returns the six built-in definitions.
pub fn builtin_trust_types() -> Vec<TrustTypeDefinition> {
    vec![associate(), viewer(), friend(), partner(), admin(), mcp_client()]
}

fn associate() -> TrustTypeDefinition {
    TrustTypeDefinition::new(ASSOCIATE, "Associate")
        .with_description("Basic acquaintance with read access to public data")
        .with_permissions(
            PermissionSet::new().with_properties(
                PatternRule::new()
                    .with_patterns(["public/*"])
                    .with_operations(["read"])
                    .with_excluded(["private/*", "_*"]),
            ),
        )
        .with_acl_rules(vec![
            AclRule::allow("meta*", "GET"),
            AclRule::allow("properties*", "GET"),
        ])
        .with_oauth_scope(scope(ASSOCIATE))
}

fn viewer() -> TrustTypeDefinition {
    TrustTypeDefinition::new(VIEWER, "Viewer")
        .with_description("Read-only access to public and shared data")
        .with_permissions(
            PermissionSet::new()
                .with_properties(
                    PatternRule::new()
                        .with_patterns(["public/*", "shared/*"])
                        .with_operations(["read"])
                        .with_excluded(["private/*", "_*"]),
                )
                .with_methods(AllowDenyRule::new().with_allowed(["get_*", "list_*"]))
                .with_tools(AllowDenyRule::new().with_allowed(["search", "fetch"]))
                .with_resources(
                    PatternRule::new()
                        .with_patterns(["data://public/*"])
                        .with_operations(["read"]),
                ),
        )
        .with_acl_rules(vec![
            AclRule::allow("meta*", "GET"),
            AclRule::allow("properties*", "GET"),
        ])
        .with_oauth_scope(scope(VIEWER))
}

fn friend() -> TrustTypeDefinition {
    TrustTypeDefinition::new(FRIEND, "Friend")
        .with_description("Trusted peer with broad read access and subscriptions")
        .with_permissions(
            PermissionSet::new()
                .with_properties(
                    PatternRule::new()
                        .with_patterns(["*"])
                        .with_operations(["read"])
                        .with_excluded(["private/*", "_*", "security*"]),
                )
                .with_methods(
                    AllowDenyRule::new()
                        .with_allowed(["get_*", "list_*", "search_*"])
                        .with_denied(["delete_*", "admin_*"]),
                )
                .with_actions(AllowDenyRule::new().with_allowed(["subscribe", "notify"]))
                .with_tools(AllowDenyRule::new().with_allowed(["search", "fetch"]))
                .with_resources(
                    PatternRule::new()
                        .with_patterns(["data://*"])
                        .with_operations(["read"]),
                )
                .with_prompts(AllowDenyRule::new().with_allowed(["*"])),
        )
        .with_acl_rules(vec![
            AclRule::allow("meta*", "GET"),
            AclRule::allow("properties*", "GET"),
            AclRule::allow("subscriptions/<id>", "POST"),
            AclRule::allow("subscriptions*", "GET"),
        ])
        .with_oauth_scope(scope(FRIEND))
}

fn partner() -> TrustTypeDefinition {
    TrustTypeDefinition::new(PARTNER, "Partner")
        .with_description("Business partner with read-write access to shared data")
        .with_permissions(
            PermissionSet::new()
                .with_properties(
                    PatternRule::new()
                        .with_patterns(["*"])
                        .with_operations(["read", "write"])
                        .with_excluded(["private/*", "_*"]),
                )
                .with_methods(AllowDenyRule::new().with_allowed(["*"]).with_denied(["admin_*"]))
                .with_actions(AllowDenyRule::new().with_allowed(["*"]).with_denied(["admin_*"]))
                .with_tools(AllowDenyRule::new().with_allowed(["*"]).with_denied(["admin_*"]))
                .with_resources(
                    PatternRule::new()
                        .with_patterns(["data://*"])
                        .with_operations(["read", "write"]),
                )
                .with_prompts(AllowDenyRule::new().with_allowed(["*"])),
        )
        .with_acl_rules(vec![
            AclRule::allow("meta*", ""),
            AclRule::allow("properties*", ""),
            AclRule::allow("subscriptions*", ""),
            AclRule::allow("callbacks*", "POST"),
        ])
        .with_oauth_scope(scope(PARTNER))
}

fn admin() -> TrustTypeDefinition {
    TrustTypeDefinition::new(ADMIN, "Administrator")
        .with_description("Full access to every resource")
        .with_permissions(
            PermissionSet::new()
                .with_properties(
                    PatternRule::new()
                        .with_patterns(["*"])
                        .with_operations(["read", "write", "delete"]),
                )
                .with_methods(AllowDenyRule::new().with_allowed(["*"]))
                .with_actions(AllowDenyRule::new().with_allowed(["*"]))
                .with_tools(AllowDenyRule::new().with_allowed(["*"]))
                .with_resources(
                    PatternRule::new()
                        .with_patterns(["*"])
                        .with_operations(["read", "write", "delete"]),
                )
                .with_prompts(AllowDenyRule::new().with_allowed(["*"])),
        )
        .with_acl_rules(vec![AclRule::allow("*", "")])
        .with_oauth_scope(scope(ADMIN))
}

fn mcp_client() -> TrustTypeDefinition {
    TrustTypeDefinition::new(MCP_CLIENT, "MCP Client")
        .with_description("AI assistant connected over the Model Context Protocol")
        .with_permissions(
            PermissionSet::new()
                .with_properties(
                    PatternRule::new()
                        .with_patterns(["public/*", "shared/*"])
                        .with_operations(["read"])
                        .with_excluded(["private/*"]),
                )
                .with_methods(AllowDenyRule::new().with_allowed(["get_*", "list_*", "search_*"]))
                .with_tools(AllowDenyRule::new().with_allowed(["search", "fetch"]))
                .with_resources(
                    PatternRule::new()
                        .with_patterns(["data://public/*"])
                        .with_operations(["read"]),
                )
                .with_prompts(AllowDenyRule::new().with_allowed(["*"])),
        )
        .with_acl_rules(vec![
            AclRule::allow("mcp*", ""),
            AclRule::allow("meta*", "GET"),
        ])
        .with_oauth_scope(scope(MCP_CLIENT))
}
