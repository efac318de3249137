//! Capability enumeration
//!
//! Capabilities form a closed set. `GlobalRoot` implies every other
//! capability and is only ever granted by bootstrap or by an existing
//! holder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::GatehouseError;

/// A single privilege from the closed capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    GlobalRoot,
    CreateEntity,
    DestroyEntity,
    ModifyEntityMeta,
    ModifyEntityKeys,
    ChangeEntitySecret,
    LockEntity,
    UnlockEntity,
    CreateGroup,
    DestroyGroup,
    ModifyGroupMeta,
    ModifyGroupMembers,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::GlobalRoot => "GLOBAL_ROOT",
            Capability::CreateEntity => "CREATE_ENTITY",
            Capability::DestroyEntity => "DESTROY_ENTITY",
            Capability::ModifyEntityMeta => "MODIFY_ENTITY_META",
            Capability::ModifyEntityKeys => "MODIFY_ENTITY_KEYS",
            Capability::ChangeEntitySecret => "CHANGE_ENTITY_SECRET",
            Capability::LockEntity => "LOCK_ENTITY",
            Capability::UnlockEntity => "UNLOCK_ENTITY",
            Capability::CreateGroup => "CREATE_GROUP",
            Capability::DestroyGroup => "DESTROY_GROUP",
            Capability::ModifyGroupMeta => "MODIFY_GROUP_META",
            Capability::ModifyGroupMembers => "MODIFY_GROUP_MEMBERS",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Capability {
    type Err = GatehouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GLOBAL_ROOT" => Ok(Capability::GlobalRoot),
            "CREATE_ENTITY" => Ok(Capability::CreateEntity),
            "DESTROY_ENTITY" => Ok(Capability::DestroyEntity),
            "MODIFY_ENTITY_META" => Ok(Capability::ModifyEntityMeta),
            "MODIFY_ENTITY_KEYS" => Ok(Capability::ModifyEntityKeys),
            "CHANGE_ENTITY_SECRET" => Ok(Capability::ChangeEntitySecret),
            "LOCK_ENTITY" => Ok(Capability::LockEntity),
            "UNLOCK_ENTITY" => Ok(Capability::UnlockEntity),
            "CREATE_GROUP" => Ok(Capability::CreateGroup),
            "DESTROY_GROUP" => Ok(Capability::DestroyGroup),
            "MODIFY_GROUP_META" => Ok(Capability::ModifyGroupMeta),
            "MODIFY_GROUP_MEMBERS" => Ok(Capability::ModifyGroupMembers),
            _ => Err(GatehouseError::UnknownCapability),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_display_parse() {
        let caps = [
            Capability::GlobalRoot,
            Capability::CreateEntity,
            Capability::ModifyGroupMembers,
        ];
        for c in caps {
            assert_eq!(c.to_string().parse::<Capability>().unwrap(), c);
        }
    }

    #[test]
    fn unknown_capability_rejected() {
        assert_eq!(
            "HACK_THE_PLANET".parse::<Capability>(),
            Err(GatehouseError::UnknownCapability)
        );
    }
}
