use std::collections::BTreeSet;
use std::time::Duration;

use diesel::connection::SimpleConnection;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Integer, Nullable, Text};
use tracing::{debug, warn};

use crate::catalog::{CatalogError, CatalogReader, StatementExecutor};
use crate::generator::statement::Statement;
use crate::model::principal::parse_password_expiry;
use crate::model::{
    Membership, ObjectType, Principal, PrincipalAttributes, PrincipalKind, PrivilegeGrant,
    PrivilegeType, SchemaInventory,
};

const PRINCIPAL_PRIVILEGES: &str = "
    SELECT r.namespace_name                  AS schema_name,
           r.relation_name                   AS object_name,
           COALESCE(t.table_type, 'TABLE')   AS object_type,
           r.privilege_type                  AS privilege_type,
           COALESCE(r.admin_option, FALSE)   AS grantable
    FROM svv_relation_privileges r
    LEFT JOIN svv_tables t
           ON t.table_schema = r.namespace_name
          AND t.table_name   = r.relation_name
    WHERE r.identity_name = $1 AND r.identity_type = $2
    UNION ALL
    SELECT f.namespace_name,
           f.function_name,
           CASE WHEN p.prokind = 'p' THEN 'PROCEDURE' ELSE 'FUNCTION' END,
           f.privilege_type,
           COALESCE(f.admin_option, FALSE)
    FROM svv_function_privileges f
    LEFT JOIN pg_proc_info p ON p.prooid = f.function_id
    WHERE f.identity_name = $1 AND f.identity_type = $2
    UNION ALL
    SELECT s.namespace_name,
           '',
           'SCHEMA',
           s.privilege_type,
           COALESCE(s.admin_option, FALSE)
    FROM svv_schema_privileges s
    WHERE s.identity_name = $1 AND s.identity_type = $2;";

const USER_GROUPS: &str = "
    SELECT g.groname AS name
    FROM pg_group g
    JOIN pg_user u ON u.usesysid = ANY(g.grolist)
    WHERE u.usename = $1;";

const USER_ROLES: &str = "SELECT role_name AS name FROM svv_user_grants WHERE user_name = $1;";

const GROUP_USERS: &str = "
    SELECT u.usename AS name
    FROM pg_group g
    JOIN pg_user u ON u.usesysid = ANY(g.grolist)
    WHERE g.groname = $1;";

const ROLE_USERS: &str = "SELECT user_name AS name FROM svv_user_grants WHERE role_name = $1;";

const ROLE_NESTED_ROLES: &str =
    "SELECT granted_role_name AS name FROM svv_role_grants WHERE role_name = $1;";

const USER_ATTRIBUTES: &str = "
    SELECT u.usesuper                       AS super_user,
           u.usecreatedb                    AS can_create_db,
           u.usecatupd                      AS can_update_catalog,
           u.valuntil::timestamp::varchar   AS password_expiry,
           u.useconnlimit::varchar          AS connection_limit,
           i.syslog_access                  AS syslog_access,
           i.session_timeout                AS session_timeout
    FROM pg_user_info u
    LEFT JOIN svv_user_info i ON i.user_id = u.usesysid
    WHERE u.usename = $1;";

const USER_EXISTS: &str = "SELECT usename AS name FROM pg_user WHERE usename = $1;";
const GROUP_EXISTS: &str = "SELECT groname AS name FROM pg_group WHERE groname = $1;";
const ROLE_EXISTS: &str = "SELECT role_name AS name FROM svv_roles WHERE role_name = $1;";

const SCHEMA_TABLES: &str = "
    SELECT table_name AS name FROM svv_tables
    WHERE table_schema = $1 AND table_type = 'BASE TABLE';";

const SCHEMA_VIEWS: &str = "
    SELECT table_name AS name FROM svv_tables
    WHERE table_schema = $1 AND table_type = 'VIEW';";

const SCHEMA_FUNCTIONS: &str = "
    SELECT p.proname AS name
    FROM pg_proc_info p
    JOIN pg_namespace n ON n.oid = p.pronamespace
    WHERE n.nspname = $1 AND p.prokind = 'f';";

const SCHEMA_PROCEDURES: &str = "
    SELECT p.proname AS name
    FROM pg_proc_info p
    JOIN pg_namespace n ON n.oid = p.pronamespace
    WHERE n.nspname = $1 AND p.prokind = 'p';";

const ALL_SCHEMAS: &str = "
    SELECT nspname AS name FROM pg_namespace
    WHERE nspname NOT LIKE 'pg\\_%' AND nspname <> 'information_schema'
    ORDER BY nspname;";

#[derive(QueryableByName)]
struct NameRow {
    #[diesel(sql_type = Text)]
    name: String,
}

#[derive(QueryableByName)]
struct GrantRow {
    #[diesel(sql_type = Text)]
    schema_name: String,
    #[diesel(sql_type = Text)]
    object_name: String,
    #[diesel(sql_type = Text)]
    object_type: String,
    #[diesel(sql_type = Text)]
    privilege_type: String,
    #[diesel(sql_type = Bool)]
    grantable: bool,
}

#[derive(QueryableByName)]
struct AttributeRow {
    #[diesel(sql_type = Bool)]
    super_user: bool,
    #[diesel(sql_type = Bool)]
    can_create_db: bool,
    #[diesel(sql_type = Bool)]
    can_update_catalog: bool,
    #[diesel(sql_type = Nullable<Text>)]
    password_expiry: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    connection_limit: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    syslog_access: Option<String>,
    #[diesel(sql_type = Nullable<Integer>)]
    session_timeout: Option<i32>,
}

fn query_error(context: &str, error: impl std::fmt::Display) -> CatalogError {
    CatalogError::Query {
        context: context.to_string(),
        message: error.to_string(),
    }
}

fn identity_type(kind: PrincipalKind) -> &'static str {
    match kind {
        PrincipalKind::User => "user",
        PrincipalKind::Group => "group",
        PrincipalKind::Role => "role",
    }
}

/// Live catalog and executor over a single Postgres-wire session.
pub struct PgCatalog {
    conn: PgConnection,
}

impl PgCatalog {
    /// Open a session and bound every statement by `statement_timeout`.
    pub fn connect(url: &str, statement_timeout: Duration) -> Result<Self, CatalogError> {
        let mut conn =
            PgConnection::establish(url).map_err(|e| query_error("connecting to warehouse", e))?;
        conn.batch_execute(&format!(
            "SET statement_timeout TO {};",
            statement_timeout.as_millis()
        ))
        .map_err(|e| query_error("setting statement timeout", e))?;
        Ok(Self { conn })
    }

    fn names(&mut self, query: &str, arg: &str, context: &str) -> Result<BTreeSet<String>, CatalogError> {
        let rows = diesel::sql_query(query)
            .bind::<Text, _>(arg)
            .load::<NameRow>(&mut self.conn)
            .map_err(|e| query_error(context, e))?;
        Ok(rows.into_iter().map(|row| row.name).collect())
    }
}

impl CatalogReader for PgCatalog {
    fn privileges(&mut self, principal: &Principal) -> Result<Vec<PrivilegeGrant>, CatalogError> {
        let rows = diesel::sql_query(PRINCIPAL_PRIVILEGES)
            .bind::<Text, _>(principal.name.as_str())
            .bind::<Text, _>(identity_type(principal.kind))
            .load::<GrantRow>(&mut self.conn)
            .map_err(|e| query_error("reading privileges", e))?;

        let mut grants = Vec::with_capacity(rows.len());
        for row in rows {
            let (object_type, privilege) =
                match (
                    row.object_type.parse::<ObjectType>(),
                    row.privilege_type.parse::<PrivilegeType>(),
                ) {
                    (Ok(object_type), Ok(privilege)) => (object_type, privilege),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!(
                            schema = %row.schema_name,
                            object = %row.object_name,
                            error = %e,
                            "skipping unrecognised catalog privilege row"
                        );
                        continue;
                    }
                };
            let grant = PrivilegeGrant {
                schema: row.schema_name,
                object: row.object_name,
                object_type,
                privilege,
                grantable: row.grantable,
            };
            // Joins may surface one privilege twice.
            if !grants.iter().any(|g: &PrivilegeGrant| g.key() == grant.key()) {
                grants.push(grant);
            }
        }
        Ok(grants)
    }

    fn membership(&mut self, principal: &Principal) -> Result<Membership, CatalogError> {
        let name = principal.name.as_str();
        let membership = match principal.kind {
            PrincipalKind::User => Membership {
                groups: self.names(USER_GROUPS, name, "reading user groups")?,
                roles: self.names(USER_ROLES, name, "reading user roles")?,
                ..Membership::default()
            },
            PrincipalKind::Group => Membership {
                users: self.names(GROUP_USERS, name, "reading group users")?,
                ..Membership::default()
            },
            PrincipalKind::Role => Membership {
                users: self.names(ROLE_USERS, name, "reading role users")?,
                roles: self.names(ROLE_NESTED_ROLES, name, "reading nested roles")?,
                ..Membership::default()
            },
        };
        Ok(membership)
    }

    fn attributes(
        &mut self,
        principal: &Principal,
    ) -> Result<Option<PrincipalAttributes>, CatalogError> {
        if principal.kind != PrincipalKind::User {
            return Ok(None);
        }
        let row = diesel::sql_query(USER_ATTRIBUTES)
            .bind::<Text, _>(principal.name.as_str())
            .get_result::<AttributeRow>(&mut self.conn)
            .optional()
            .map_err(|e| query_error("reading user attributes", e))?
            .ok_or_else(|| CatalogError::UnknownPrincipal(principal.clone()))?;

        let password_expiry = match row.password_expiry.as_deref() {
            Some(text) => parse_password_expiry(text)
                .map_err(|e| query_error("decoding password expiry", e))?,
            None => None,
        };
        let connection_limit = row
            .connection_limit
            .as_deref()
            .and_then(|text| text.trim().parse::<u32>().ok());
        let syslog_access = row
            .syslog_access
            .as_deref()
            .and_then(|text| text.parse().ok());
        let session_timeout = row
            .session_timeout
            .and_then(|seconds| u32::try_from(seconds).ok());

        Ok(Some(PrincipalAttributes {
            super_user: row.super_user,
            can_create_db: row.can_create_db,
            can_update_catalog: row.can_update_catalog,
            password_expiry,
            connection_limit,
            syslog_access,
            session_timeout,
        }))
    }

    fn schema_inventory(&mut self, schema: &str) -> Result<SchemaInventory, CatalogError> {
        debug!(schema, "loading schema inventory");
        Ok(SchemaInventory {
            tables: self.names(SCHEMA_TABLES, schema, "reading schema tables")?,
            views: self.names(SCHEMA_VIEWS, schema, "reading schema views")?,
            functions: self.names(SCHEMA_FUNCTIONS, schema, "reading schema functions")?,
            procedures: self.names(SCHEMA_PROCEDURES, schema, "reading schema procedures")?,
        })
    }

    fn all_schemas(&mut self) -> Result<Vec<String>, CatalogError> {
        let rows = diesel::sql_query(ALL_SCHEMAS)
            .load::<NameRow>(&mut self.conn)
            .map_err(|e| query_error("listing schemas", e))?;
        Ok(rows.into_iter().map(|row| row.name).collect())
    }

    fn exists(&mut self, principal: &Principal) -> Result<bool, CatalogError> {
        let query = match principal.kind {
            PrincipalKind::User => USER_EXISTS,
            PrincipalKind::Group => GROUP_EXISTS,
            PrincipalKind::Role => ROLE_EXISTS,
        };
        Ok(!self
            .names(query, &principal.name, "looking up principal")?
            .is_empty())
    }
}

impl StatementExecutor for PgCatalog {
    fn execute(&mut self, statement: &Statement) -> bool {
        match self.conn.batch_execute(&statement.sql) {
            Ok(()) => true,
            Err(error) => {
                warn!(sql = %statement.sql, %error, "statement failed");
                false
            }
        }
    }
}
