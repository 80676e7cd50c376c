//! HTTP API handlers for mealplan-server

pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod health;
pub mod images;
pub mod meals;
pub mod planned_meals;
pub mod weekly_plans;

pub use auth::{auth_middleware, get_session, login, logout, update_password};
pub use categories::{create_category, delete_category, list_categories, update_category};
pub use dashboard::{get_calendar, get_day_detail, get_metrics};
pub use health::health_routes;
pub use images::{delete_upload, serve_image, upload_image};
pub use meals::{create_meal, delete_meal, get_meal, list_meals, update_meal};
pub use planned_meals::{create_planned_meal, delete_planned_meal, update_planned_meal};
pub use weekly_plans::{create_weekly_plan, get_ingredients, get_weekly_plan};

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::{Deserialize, Deserializer};

use crate::error::ApiError;

/// JSON body extractor whose rejections render as `{"error": ...}`
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// Tell an absent field (`None`) from an explicit `null` (`Some(None)`)
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub(crate) fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Parse a numeric path id, naming the entity in the error
pub(crate) fn parse_id(raw: &str, entity: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {} ID", entity)))
}
