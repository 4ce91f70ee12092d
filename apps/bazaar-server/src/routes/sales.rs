//! Sale routes: the HTTP face of the sale transaction manager.
//!
//! Cashiers record sales and read back their own; admins see and undo all.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bazaar_core::{
    Capability, CoreError, Id, Item, MultiplySoldItem, Role, Sale, SaleItemInfo, SaleSummary,
    Timestamp,
};
use serde::{Deserialize, Serialize};

use crate::auth::Authenticated;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSaleRequest {
    pub item_ids: Vec<Id>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSale {
    pub sale_id: Id,
}

/// A sale with its items.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetails {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<Item>,
}

/// `GET /sales`
pub async fn list_sales(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<SaleSummary>>> {
    identity.require(Capability::Administer)?;
    Ok(Json(state.db.sales().list_summaries().await?))
}

/// `GET /sales/items/{id}`: checkout lookup of a scanned item, including
/// whether it was already sold.
pub async fn sale_item_info(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    ApiPath(item_id): ApiPath<Id>,
) -> ApiResult<Json<SaleItemInfo>> {
    identity.require(Capability::LookUpItems)?;
    Ok(Json(state.db.items().sale_info(item_id).await?))
}

/// `GET /sales/{id}`: admins, or the cashier who recorded it.
pub async fn get_sale(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    ApiPath(sale_id): ApiPath<Id>,
) -> ApiResult<Json<SaleDetails>> {
    identity
        .require(Capability::Administer)
        .or_else(|_| identity.require(Capability::RecordSales))?;

    let sales = state.db.sales();
    let sale = sales.get_sale(sale_id).await?;
    if identity.role == Role::Cashier && sale.cashier_id != identity.user_id {
        return Err(CoreError::NotOwnData {
            caller: identity.user_id,
            owner: sale.cashier_id,
        }
        .into());
    }

    let items = sales.get_sale_items(sale_id).await?;
    Ok(Json(SaleDetails { sale, items }))
}

/// `POST /sales`: records a sale by the calling cashier, timestamped now.
pub async fn add_sale(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddSaleRequest>,
) -> ApiResult<impl IntoResponse> {
    identity.require(Capability::RecordSales)?;

    let sale_id = state
        .db
        .sales()
        .add_sale(identity.user_id, Timestamp::now(), &request.item_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedSale { sale_id })))
}

/// `DELETE /sales/{id}`
pub async fn remove_sale(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    ApiPath(sale_id): ApiPath<Id>,
) -> ApiResult<StatusCode> {
    identity.require(Capability::Administer)?;
    state.db.sales().remove_sale(sale_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /cashiers/{id}/sales`: a cashier's own sales.
pub async fn cashier_sales(
    auth: Authenticated,
    State(state): State<AppState>,
    ApiPath(cashier_id): ApiPath<Id>,
) -> ApiResult<Json<Vec<Sale>>> {
    auth.0.require(Capability::RecordSales)?;
    auth.require_self_or_admin(cashier_id)?;
    Ok(Json(state.db.sales().get_sales_with_cashier(cashier_id).await?))
}

/// `GET /sold-items`
pub async fn sold_items(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Item>>> {
    identity.require(Capability::Administer)?;
    Ok(Json(state.db.sales().get_sold_items().await?))
}

/// `GET /multiply-sold-items`
pub async fn multiply_sold_items(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<MultiplySoldItem>>> {
    identity.require(Capability::Administer)?;
    Ok(Json(state.db.sales().get_multiply_sold_items().await?))
}
