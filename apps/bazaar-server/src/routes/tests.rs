//! Router tests: requests go through the full layer stack via `oneshot`.

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use bazaar_core::{Id, MoneyInCents, NewItem, Role, Timestamp, UPDATE_MESSAGE};
use bazaar_db::{Database, DbConfig};
use bazaar_live::{Broadcaster, BroadcasterConfig, BroadcasterHandle, ChannelClient, LiveConnection};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::router;
use crate::auth::SESSION_COOKIE;
use crate::config::ServerConfig;
use crate::state::AppState;

const ADMIN: Id = 1;
const SELLER: Id = 2;
const OTHER_SELLER: Id = 3;
const CASHIER: Id = 4;
const OTHER_CASHIER: Id = 5;
const TOYS: Id = 11;
const PASSWORD: &str = "secret";

struct TestApp {
    app: Router,
    db: Database,
    broadcaster: BroadcasterHandle,
}

impl TestApp {
    async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.categories().add_defaults().await.unwrap();
        for (id, role) in [
            (ADMIN, Role::Admin),
            (SELLER, Role::Seller),
            (OTHER_SELLER, Role::Seller),
            (CASHIER, Role::Cashier),
            (OTHER_CASHIER, Role::Cashier),
        ] {
            db.users()
                .add_with_id(id, role, Timestamp::from_secs(0), PASSWORD)
                .await
                .unwrap();
        }

        let broadcaster = Broadcaster::new(BroadcasterConfig::default()).start();
        let state = AppState::new(db.clone(), broadcaster.clone(), ServerConfig::default());
        TestApp {
            app: router(state),
            db,
            broadcaster,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Opens a session directly in the store and returns its cookie header.
    async fn cookie_for(&self, user_id: Id) -> String {
        let session_id = self
            .db
            .sessions()
            .add_session(user_id, Timestamp::now().plus_secs(3600))
            .await
            .unwrap();
        format!("bazaar_session={session_id}")
    }

    async fn listener(&self) -> ChannelClient {
        let (connection, client) = LiveConnection::channel(8);
        self.broadcaster.subscribe(connection).await.unwrap();
        client
    }

    /// Round-trips through the broadcaster, so every earlier post has been delivered.
    async fn settle(&self) {
        self.broadcaster.subscriber_count().await.unwrap();
    }

    async fn add_item(&self, seller_id: Id) -> Id {
        self.db
            .items()
            .create(&NewItem {
                added_at: Timestamp::from_secs(0),
                description: "Wooden train".to_string(),
                price_in_cents: MoneyInCents::from_cents(750),
                category_id: TOYS,
                seller_id,
                donation: false,
                charity: false,
            })
            .await
            .unwrap()
    }
}

fn request(method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_login_sets_cookie_and_session_works() {
    let app = TestApp::new().await;

    let response = app
        .send(request(
            Method::POST,
            "/api/v1/login",
            None,
            Some(json!({ "username": "4", "password": PASSWORD })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let cookie = Cookie::parse(cookie).unwrap();
    assert_eq!(cookie.name(), SESSION_COOKIE);
    assert_eq!(cookie.value().len(), 32);
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    let pair = cookie.stripped().to_string();

    let body = json_body(response).await;
    assert_eq!(body["role"], "cashier");
    assert_eq!(body["userId"], 4);

    let response = app
        .send(request(Method::GET, "/api/v1/categories", Some(&pair), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_with_form_body() {
    let app = TestApp::new().await;

    let response = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!("username=2&password={PASSWORD}")))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["role"], "seller");
}

#[tokio::test]
async fn test_login_failures() {
    let app = TestApp::new().await;

    let response = app
        .send(request(
            Method::POST,
            "/api/v1/login",
            None,
            Some(json!({ "username": "4", "password": "nope" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let response = app
        .send(request(
            Method::POST,
            "/api/v1/login",
            None,
            Some(json!({ "username": "99", "password": PASSWORD })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(request(
            Method::POST,
            "/api/v1/login",
            None,
            Some(json!({ "username": "four", "password": PASSWORD })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(app.db.sessions().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_or_expired_session_is_unauthenticated() {
    let app = TestApp::new().await;

    let response = app.send(request(Method::GET, "/api/v1/categories", None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["code"], "UNAUTHENTICATED");
    assert_eq!(body["tag"], "no_such_session");

    let expired = app
        .db
        .sessions()
        .add_session(ADMIN, Timestamp::now().plus_secs(-1))
        .await
        .unwrap();
    let response = app
        .send(request(
            Method::GET,
            "/api/v1/categories",
            Some(&format!("bazaar_session={expired}")),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout() {
    let app = TestApp::new().await;

    let response = app.send(request(Method::POST, "/api/v1/logout", None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let cookie = app.cookie_for(SELLER).await;
    let response = app
        .send(request(Method::POST, "/api/v1/logout", Some(&cookie), None))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cleared = response.headers().get(header::SET_COOKIE).unwrap();
    let cleared = Cookie::parse(cleared.to_str().unwrap()).unwrap();
    assert_eq!(cleared.name(), SESSION_COOKIE);
    assert_eq!(cleared.value(), "");
    assert_eq!(cleared.max_age(), Some(cookie::time::Duration::ZERO));

    let response = app
        .send(request(Method::GET, "/api/v1/categories", Some(&cookie), None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Capabilities
// =============================================================================

#[tokio::test]
async fn test_role_checks() {
    let app = TestApp::new().await;
    let seller = app.cookie_for(SELLER).await;
    let cashier = app.cookie_for(CASHIER).await;
    let admin = app.cookie_for(ADMIN).await;

    let response = app.send(request(Method::GET, "/api/v1/users", Some(&seller), None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["code"], "FORBIDDEN");

    let response = app
        .send(request(Method::GET, "/api/v1/sellers/2/items", Some(&cashier), None))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app.send(request(Method::GET, "/api/v1/users", Some(&admin), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_seller_cannot_touch_other_sellers_items() {
    let app = TestApp::new().await;
    let seller = app.cookie_for(SELLER).await;
    let theirs = app.add_item(OTHER_SELLER).await;

    let response = app
        .send(request(Method::GET, "/api/v1/sellers/3/items", Some(&seller), None))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(request(
            Method::PUT,
            &format!("/api/v1/items/{theirs}"),
            Some(&seller),
            Some(json!({ "description": "Mine now" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["tag"], "wrong_seller");

    assert_eq!(app.db.items().get(theirs).await.unwrap().description, "Wooden train");
}

#[tokio::test]
async fn test_cashier_reads_only_own_sales() {
    let app = TestApp::new().await;
    let item = app.add_item(SELLER).await;
    let sale_id = app
        .db
        .sales()
        .add_sale(OTHER_CASHIER, Timestamp::now(), &[item])
        .await
        .unwrap();

    let cashier = app.cookie_for(CASHIER).await;
    let response = app
        .send(request(Method::GET, &format!("/api/v1/sales/{sale_id}"), Some(&cashier), None))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(request(Method::GET, "/api/v1/cashiers/5/sales", Some(&cashier), None))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let owner = app.cookie_for(OTHER_CASHIER).await;
    let response = app
        .send(request(Method::GET, &format!("/api/v1/sales/{sale_id}"), Some(&owner), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["saleId"], sale_id);
    assert_eq!(body["items"][0]["itemId"], item);
}

// =============================================================================
// Mutations and broadcasts
// =============================================================================

#[tokio::test]
async fn test_create_item_broadcasts_update() {
    let app = TestApp::new().await;
    let mut listener = app.listener().await;
    let seller = app.cookie_for(SELLER).await;

    let response = app
        .send(request(
            Method::POST,
            "/api/v1/sellers/2/items",
            Some(&seller),
            Some(json!({ "description": "Lego set", "priceInCents": 1250, "categoryId": TOYS })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let item_id = json_body(response).await["itemId"].as_i64().unwrap();

    let message = tokio::time::timeout(Duration::from_secs(1), listener.recv())
        .await
        .unwrap();
    assert_eq!(message.as_deref(), Some(UPDATE_MESSAGE));

    let item = app.db.items().get(item_id).await.unwrap();
    assert_eq!(item.seller_id, SELLER);
    assert_eq!(item.price_in_cents, MoneyInCents::from_cents(1250));
}

#[tokio::test]
async fn test_failed_mutation_does_not_broadcast() {
    let app = TestApp::new().await;
    let mut listener = app.listener().await;
    let seller = app.cookie_for(SELLER).await;

    let response = app
        .send(request(
            Method::POST,
            "/api/v1/sellers/2/items",
            Some(&seller),
            Some(json!({ "description": "Free", "priceInCents": 0, "categoryId": TOYS })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "INVALID_INPUT");

    let response = app
        .send(request(Method::POST, "/api/v1/sales", None, Some(json!({ "itemIds": [1] }))))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.settle().await;
    assert_eq!(listener.try_recv(), None);
}

#[tokio::test]
async fn test_frozen_item_update_is_precondition_failed() {
    let app = TestApp::new().await;
    let seller = app.cookie_for(SELLER).await;
    let item = app.add_item(SELLER).await;

    let response = app
        .send(request(
            Method::POST,
            "/api/v1/items/frozen",
            Some(&seller),
            Some(json!({ "itemIds": [item], "frozen": true })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .send(request(
            Method::PUT,
            &format!("/api/v1/items/{item}"),
            Some(&seller),
            Some(json!({ "priceInCents": 100 })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    assert_eq!(json_body(response).await["tag"], "item_frozen");
}

#[tokio::test]
async fn test_sale_round_trip() {
    let app = TestApp::new().await;
    let mut listener = app.listener().await;
    let cashier = app.cookie_for(CASHIER).await;
    let admin = app.cookie_for(ADMIN).await;
    let first = app.add_item(SELLER).await;
    let second = app.add_item(OTHER_SELLER).await;

    let response = app
        .send(request(
            Method::POST,
            "/api/v1/sales",
            Some(&cashier),
            Some(json!({ "itemIds": [first, second] })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let sale_id = json_body(response).await["saleId"].as_i64().unwrap();

    let response = app
        .send(request(Method::GET, "/api/v1/cashiers/4/sales", Some(&cashier), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await[0]["saleId"], sale_id);

    let response = app
        .send(request(Method::DELETE, &format!("/api/v1/sales/{sale_id}"), Some(&admin), None))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .send(request(Method::GET, &format!("/api/v1/sales/{sale_id}"), Some(&admin), None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.settle().await;
    assert_eq!(listener.try_recv().as_deref(), Some(UPDATE_MESSAGE));
    assert_eq!(listener.try_recv().as_deref(), Some(UPDATE_MESSAGE));
    assert_eq!(listener.try_recv(), None);
}

#[tokio::test]
async fn test_sale_of_hidden_item_is_rejected() {
    let app = TestApp::new().await;
    let cashier = app.cookie_for(CASHIER).await;
    let item = app.add_item(SELLER).await;
    app.db.items().set_hidden(&[item], true).await.unwrap();

    let response = app
        .send(request(
            Method::POST,
            "/api/v1/sales",
            Some(&cashier),
            Some(json!({ "itemIds": [item] })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    assert!(app.db.sales().get_sold_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_item_lookup_reports_prior_sales() {
    let app = TestApp::new().await;
    let cashier = app.cookie_for(CASHIER).await;
    let seller = app.cookie_for(SELLER).await;
    let item = app.add_item(SELLER).await;
    let uri = format!("/api/v1/sales/items/{item}");

    let response = app.send(request(Method::GET, &uri, Some(&cashier), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["priceInCents"], 750);
    assert_eq!(body["categoryId"], TOYS);
    assert_eq!(body["hasBeenSold"], false);

    app.db.sales().add_sale(CASHIER, Timestamp::from_secs(1), &[item]).await.unwrap();
    let response = app.send(request(Method::GET, &uri, Some(&cashier), None)).await;
    let body = json_body(response).await;
    assert_eq!(body["hasBeenSold"], true);
    assert_eq!(body["saleCount"], 1);

    let response = app.send(request(Method::GET, &uri, Some(&seller), None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(request(Method::GET, "/api/v1/sales/items/999", Some(&cashier), None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Overviews
// =============================================================================

#[tokio::test]
async fn test_category_sales_overview() {
    let app = TestApp::new().await;
    let admin = app.cookie_for(ADMIN).await;
    let cashier = app.cookie_for(CASHIER).await;
    let first = app.add_item(SELLER).await;
    let second = app.add_item(OTHER_SELLER).await;
    app.db
        .sales()
        .add_sale(CASHIER, Timestamp::from_secs(1), &[first, second])
        .await
        .unwrap();

    let response = app
        .send(request(Method::GET, "/api/v1/categories/sales-overview", Some(&admin), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let toys = body
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["categoryId"] == TOYS)
        .unwrap();
    assert_eq!(toys["soldCount"], 2);
    assert_eq!(toys["totalInCents"], 1500);

    let response = app
        .send(request(Method::GET, "/api/v1/categories/sales-overview", Some(&cashier), None))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_seller_summary() {
    let app = TestApp::new().await;
    let seller = app.cookie_for(SELLER).await;
    let admin = app.cookie_for(ADMIN).await;
    let frozen = app.add_item(SELLER).await;
    let hidden = app.add_item(SELLER).await;
    app.add_item(SELLER).await;
    app.db.items().set_frozen(&[frozen], true).await.unwrap();
    app.db.items().set_hidden(&[hidden], true).await.unwrap();

    let response = app
        .send(request(Method::GET, "/api/v1/sellers/2/summary", Some(&seller), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({
            "itemCount": 2,
            "frozenItemCount": 1,
            "hiddenItemCount": 1,
            "totalPriceInCents": 1500
        })
    );

    let response = app
        .send(request(Method::GET, "/api/v1/sellers/3/summary", Some(&seller), None))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(request(Method::GET, "/api/v1/sellers/4/summary", Some(&admin), None))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["tag"], "wrong_role");
}

// =============================================================================
// Passwords
// =============================================================================

#[tokio::test]
async fn test_change_own_password() {
    let app = TestApp::new().await;
    let seller = app.cookie_for(SELLER).await;

    let response = app
        .send(request(
            Method::PUT,
            "/api/v1/users/2/password",
            Some(&seller),
            Some(json!({ "password": "new secret" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        app.db.users().authenticate(SELLER, "new secret").await.unwrap(),
        Role::Seller
    );

    // The session that changed the password keeps working
    let response = app
        .send(request(Method::GET, "/api/v1/sellers/2/items", Some(&seller), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(request(
            Method::PUT,
            "/api/v1/users/3/password",
            Some(&seller),
            Some(json!({ "password": "hijacked" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(app.db.users().authenticate(OTHER_SELLER, PASSWORD).await.is_ok());
}

#[tokio::test]
async fn test_admin_resets_password() {
    let app = TestApp::new().await;
    let admin = app.cookie_for(ADMIN).await;

    let response = app
        .send(request(
            Method::PUT,
            "/api/v1/users/4/password",
            Some(&admin),
            Some(json!({ "password": "reset" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.db.users().authenticate(CASHIER, "reset").await.is_ok());

    let response = app
        .send(request(
            Method::PUT,
            "/api/v1/users/4/password",
            Some(&admin),
            Some(json!({ "password": "" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(request(
            Method::PUT,
            "/api/v1/users/99/password",
            Some(&admin),
            Some(json!({ "password": "x" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Misc
// =============================================================================

#[tokio::test]
async fn test_bad_path_and_body_are_invalid_input() {
    let app = TestApp::new().await;
    let admin = app.cookie_for(ADMIN).await;

    let response = app
        .send(request(Method::GET, "/api/v1/items/abc", Some(&admin), None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(request(
            Method::POST,
            "/api/v1/sales",
            Some(&admin),
            Some(json!({ "items": "none" })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new().await;
    let _listener = app.listener().await;

    let response = app.send(request(Method::GET, "/api/v1/health", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
    assert_eq!(body["schemaVersion"], bazaar_db::migrations::latest_version());
    assert_eq!(body["subscribers"], 1);
}
