/// Diff keys, held privileges, and desired privilege selections.
pub mod grant;
/// Per-schema object name lists used for object-kind resolution.
pub mod inventory;
/// Object kinds, resolution certainty, and privilege types.
pub mod object;
/// Principals, memberships, and scalar user attributes.
pub mod principal;

pub use grant::{DesiredPrivilege, GrantKey, PrivilegeGrant};
pub use inventory::SchemaInventory;
pub use object::{ObjectType, PrivilegeType, Resolution};
pub use principal::{
    AttributePatch, Membership, Principal, PrincipalAttributes, PrincipalKind, PrincipalState,
    SyslogAccess,
};
