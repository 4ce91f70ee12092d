//! Item routes: the HTTP face of the item lifecycle guard.
//!
//! Sellers hold `ManageItems` for their own items only; admins for all.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bazaar_core::{
    Capability, CoreError, Id, Identity, Item, ItemFilter, ItemSelection, ItemUpdate,
    ItemWithSaleCount, MoneyInCents, NewItem, Role, SellerSummary, Timestamp,
};
use serde::{Deserialize, Serialize};

use crate::auth::Authenticated;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ItemsQuery {
    #[serde(default)]
    pub selection: ItemSelection,
    pub seller: Option<Id>,
    pub category: Option<Id>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SelectionQuery {
    #[serde(default)]
    pub selection: ItemSelection,
}

/// Body of `POST /sellers/{id}/items`. The seller comes from the path and
/// `addedAt` from the clock.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub description: String,
    pub price_in_cents: MoneyInCents,
    pub category_id: Id,
    #[serde(default)]
    pub donation: bool,
    #[serde(default)]
    pub charity: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedItem {
    pub item_id: Id,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrozenRequest {
    pub item_ids: Vec<Id>,
    pub frozen: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiddenRequest {
    pub item_ids: Vec<Id>,
    pub hidden: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /items?selection=&seller=&category=`
pub async fn list_items(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ItemsQuery>,
) -> ApiResult<Json<Vec<Item>>> {
    identity.require(Capability::Administer)?;

    let filter = ItemFilter {
        seller_id: query.seller,
        category_id: query.category,
    };
    Ok(Json(state.db.items().list(query.selection, filter).await?))
}

/// `GET /items/{id}`
pub async fn get_item(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    ApiPath(item_id): ApiPath<Id>,
) -> ApiResult<Json<Item>> {
    identity.require(Capability::LookUpItems)?;
    Ok(Json(state.db.items().get(item_id).await?))
}

/// `PUT /items/{id}`: partial update, returns the updated item.
pub async fn update_item(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    ApiPath(item_id): ApiPath<Id>,
    ApiJson(update): ApiJson<ItemUpdate>,
) -> ApiResult<Json<Item>> {
    identity.require(Capability::ManageItems)?;
    ensure_owns(&state, &identity, &[item_id]).await?;

    let items = state.db.items();
    items.update(item_id, &update).await?;
    Ok(Json(items.get(item_id).await?))
}

/// `DELETE /items/{id}`
pub async fn remove_item(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    ApiPath(item_id): ApiPath<Id>,
) -> ApiResult<StatusCode> {
    identity.require(Capability::Administer)?;
    state.db.items().remove(item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /items/frozen`
pub async fn set_frozen(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<FrozenRequest>,
) -> ApiResult<StatusCode> {
    identity.require(Capability::ManageItems)?;
    ensure_owns(&state, &identity, &request.item_ids).await?;

    state.db.items().set_frozen(&request.item_ids, request.frozen).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /items/hidden`
pub async fn set_hidden(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<HiddenRequest>,
) -> ApiResult<StatusCode> {
    identity.require(Capability::ManageItems)?;
    ensure_owns(&state, &identity, &request.item_ids).await?;

    state.db.items().set_hidden(&request.item_ids, request.hidden).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /sellers/{id}/items?selection=`
pub async fn list_seller_items(
    auth: Authenticated,
    State(state): State<AppState>,
    ApiPath(seller_id): ApiPath<Id>,
    ApiQuery(query): ApiQuery<SelectionQuery>,
) -> ApiResult<Json<Vec<ItemWithSaleCount>>> {
    auth.0.require(Capability::ManageItems)?;
    auth.require_self_or_admin(seller_id)?;

    let items = state
        .db
        .items()
        .list_by_seller_with_sale_counts(seller_id, query.selection)
        .await?;
    Ok(Json(items))
}

/// `GET /sellers/{id}/summary`: item counts and the total asking price of
/// the visible items.
pub async fn seller_summary(
    auth: Authenticated,
    State(state): State<AppState>,
    ApiPath(seller_id): ApiPath<Id>,
) -> ApiResult<Json<SellerSummary>> {
    auth.0.require(Capability::ManageItems)?;
    auth.require_self_or_admin(seller_id)?;
    Ok(Json(state.db.items().seller_summary(seller_id).await?))
}

/// `POST /sellers/{id}/items`
pub async fn create_item(
    auth: Authenticated,
    State(state): State<AppState>,
    ApiPath(seller_id): ApiPath<Id>,
    ApiJson(request): ApiJson<CreateItemRequest>,
) -> ApiResult<impl IntoResponse> {
    auth.0.require(Capability::ManageItems)?;
    auth.require_self_or_admin(seller_id)?;

    let item = NewItem {
        added_at: Timestamp::now(),
        description: request.description,
        price_in_cents: request.price_in_cents,
        category_id: request.category_id,
        seller_id,
        donation: request.donation,
        charity: request.charity,
    };
    let item_id = state.db.items().create(&item).await?;
    Ok((StatusCode::CREATED, Json(CreatedItem { item_id })))
}

/// Sellers may only act on items they consigned.
async fn ensure_owns(state: &AppState, identity: &Identity, item_ids: &[Id]) -> ApiResult<()> {
    if identity.role != Role::Seller {
        return Ok(());
    }
    for item in state.db.items().get_many(item_ids).await? {
        if item.seller_id != identity.user_id {
            return Err(CoreError::NotItemOwner {
                item_id: item.item_id,
                seller_id: identity.user_id,
            }
            .into());
        }
    }
    Ok(())
}
