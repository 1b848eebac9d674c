//! `updateUserRole` mutation handler.

use axum::{extract::State, Json};
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::affiliation::{UpdateUserRoleInput, UpdateUserRoleResponse};
use crate::middleware::{AuthUser, RequestLocale};
use crate::services::RoleUpdateRequest;
use crate::AppState;

/// Change a user's permission in an organization.
///
/// POST /graphql/mutations/updateUserRole
///
/// Business rejections resolve the field with an `AffiliationError`. Storage
/// failures null the field and add an `errors` entry with a generic message.
pub async fn update_user_role(
    State(state): State<AppState>,
    auth: AuthUser,
    locale: RequestLocale,
    Json(input): Json<UpdateUserRoleInput>,
) -> Result<Json<UpdateUserRoleResponse>, AppError> {
    input.validate()?;

    let request = RoleUpdateRequest {
        requester_key: auth.user_key,
        user_name: input.user_name.trim().to_string(),
        org_key: input.org_id,
        role: input.role,
        locale: locale.or(state.config.i18n.default_locale),
    };

    let response = match state.authorizer.update_user_role(&request).await {
        Ok(outcome) => UpdateUserRoleResponse::resolved(outcome),
        Err(failure) => UpdateUserRoleResponse::failed(failure.message()),
    };

    Ok(Json(response))
}
