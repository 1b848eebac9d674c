//! Request and response shapes for the `updateUserRole` mutation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{GraphQlError, GraphQlResponse};
use crate::models::Permission;
use crate::services::RoleUpdateOutcome;

pub const UPDATE_USER_ROLE_FIELD: &str = "updateUserRole";

/// Mutation input.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRoleInput {
    #[validate(length(min = 1, max = 254))]
    pub user_name: String,
    pub org_id: Uuid,
    pub role: Permission,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRoleData {
    pub update_user_role: Option<UpdateUserRolePayload>,
}

#[derive(Debug, Serialize)]
pub struct UpdateUserRolePayload {
    pub result: RoleUpdateOutcome,
}

pub type UpdateUserRoleResponse = GraphQlResponse<UpdateUserRoleData>;

impl UpdateUserRoleResponse {
    /// Resolved mutation: a success or a business rejection.
    pub fn resolved(result: RoleUpdateOutcome) -> Self {
        Self {
            data: UpdateUserRoleData {
                update_user_role: Some(UpdateUserRolePayload { result }),
            },
            errors: Vec::new(),
        }
    }

    /// Failed mutation: null field plus one error entry.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            data: UpdateUserRoleData {
                update_user_role: None,
            },
            errors: vec![GraphQlError {
                message: message.into(),
                path: vec![UPDATE_USER_ROLE_FIELD.to_string()],
            }],
        }
    }
}
