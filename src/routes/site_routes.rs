use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    middleware::session_context::SessionContext,
    models::*,
    services::LocationService,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/donation-sites", get(list_sites))
}

#[derive(Debug, Default, Deserialize)]
pub struct SiteQuery {
    /// Staff only: include inactive sites.
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
pub struct SiteList {
    pub sites: Vec<DonationSite>,
    pub options: Vec<SiteOption>,
}

async fn list_sites(
    State(state): State<AppState>,
    SessionContext(session): SessionContext,
    Query(q): Query<SiteQuery>,
) -> Result<Json<ApiOk<SiteList>>, ApiError> {
    let service = LocationService::new(state.api.clone(), session.bearer());
    let sites = if q.all && session.role().is_staff() {
        service.all_sites().await?
    } else {
        service.active_sites().await?
    };
    let options = sites.iter().map(SiteOption::from).collect();
    Ok(Json(ApiOk {
        data: SiteList { sites, options },
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::auth::test_tokens::*;
    use crate::backend::fake::FakeTransport;
    use crate::routes::test_support::*;

    #[tokio::test]
    async fn test_donor_only_sees_active_sites() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(
            Method::GET,
            "/donation-sites",
            json!([{ "id": 2, "name": "Cho Ray", "address": "201B Nguyen Chi Thanh", "isActive": true }]),
        );
        let (app, _) = app(&fake);
        let token = token_for("Donor");

        let reply = send(&app, request(Method::GET, "/api/donation-sites?all=true", Some(&token), None)).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.json["data"]["options"][0]["label"], "Cho Ray - 201B Nguyen Chi Thanh");
        let sent = &fake.calls_to(Method::GET, "/donation-sites")[0];
        assert_eq!(sent.query, vec![("active".to_string(), "true".to_string())]);
    }

    #[tokio::test]
    async fn test_staff_may_list_all_sites() {
        let fake = Arc::new(FakeTransport::new());
        fake.json(Method::GET, "/donation-sites", json!([]));
        let (app, _) = app(&fake);
        let token = token_for("Admin");

        let reply = send(&app, request(Method::GET, "/api/donation-sites?all=true", Some(&token), None)).await;

        assert_eq!(reply.status, StatusCode::OK);
        assert!(fake.calls_to(Method::GET, "/donation-sites")[0].query.is_empty());
    }
}
