use std::sync::Arc;

use super::Caller;
use crate::backend::{ApiRequest, ApiTransport, ClientError};
use crate::models::DonationSite;

#[derive(Clone)]
pub struct LocationService {
    caller: Caller,
}

impl LocationService {
    pub fn new(api: Arc<dyn ApiTransport>, bearer: Option<String>) -> Self {
        Self {
            caller: Caller::new(api, bearer),
        }
    }

    /// Sites a donor may pick.
    pub async fn active_sites(&self) -> Result<Vec<DonationSite>, ClientError> {
        self.caller
            .call(ApiRequest::get("/donation-sites").with_query("active", "true"))
            .await
    }

    pub async fn all_sites(&self) -> Result<Vec<DonationSite>, ClientError> {
        self.caller.call(ApiRequest::get("/donation-sites")).await
    }
}
