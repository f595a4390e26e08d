use std::sync::Arc;

use anyhow::Result;
use reqwest::Method;
use tracing::debug;

use shared_api_client::ApiClient;
use shared_config::AppConfig;

use crate::models::{DoctorDirectoryResponse, DoctorSearchQuery};

pub struct DoctorDirectoryService {
    client: Arc<ApiClient>,
}

impl DoctorDirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Arc::new(ApiClient::new(config)),
        }
    }

    pub fn with_client(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Query the doctor directory. Results are returned exactly as the directory
    /// filtered them.
    pub async fn search_doctors(
        &self,
        query: &DoctorSearchQuery,
        auth_token: Option<&str>,
    ) -> Result<DoctorDirectoryResponse> {
        debug!(
            "Searching doctors (search: {:?}, specialization: {:?})",
            query.search, query.specialization
        );

        let response: DoctorDirectoryResponse = self
            .client
            .request(
                Method::GET,
                "/api/doctors",
                &query.to_query_pairs(),
                auth_token,
                None,
            )
            .await?;

        debug!("Directory returned {} doctors", response.doctors.len());
        Ok(response)
    }
}
