use serde::{Deserialize, Serialize};

use expenseshare_core::{DomainError, DomainResult, Entity, UserId};

/// A participant in a group.
///
/// The member id is the user's account id, so the same person keeps one
/// identity across every group they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    id: UserId,
    display_name: String,
}

impl Member {
    pub fn new(id: UserId, display_name: impl Into<String>) -> DomainResult<Self> {
        let display_name = display_name.into().trim().to_string();
        if display_name.is_empty() {
            return Err(DomainError::invalid_input("member display name cannot be empty"));
        }
        Ok(Self { id, display_name })
    }

    pub fn user_id(&self) -> UserId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

impl Entity for Member {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
