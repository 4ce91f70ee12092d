//! Category routes.

use axum::{extract::State, Json};
use bazaar_core::{Capability, Category, CategoryCount, CategorySaleTotal};

use crate::auth::Authenticated;
use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::routes::items::SelectionQuery;
use crate::state::AppState;

/// `GET /categories`: readable by every role.
pub async fn list_categories(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Category>>> {
    identity.require(Capability::Browse)?;
    Ok(Json(state.db.categories().list().await?))
}

/// `GET /categories/counts?selection=`
pub async fn category_counts(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SelectionQuery>,
) -> ApiResult<Json<Vec<CategoryCount>>> {
    identity.require(Capability::Administer)?;
    Ok(Json(state.db.categories().counts(query.selection).await?))
}

/// `GET /categories/sales-overview`: items sold and revenue per category.
pub async fn sales_overview(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CategorySaleTotal>>> {
    identity.require(Capability::Administer)?;
    Ok(Json(state.db.categories().sales_overview().await?))
}
