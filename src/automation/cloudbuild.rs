//! Blocking Cloud Build REST client

use super::trigger::{BuildTriggerClient, Location, TOKEN_ENV, Trigger, TriggerPage};
use crate::core::error::{LibrarianError, LibrarianResult};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::collections::BTreeMap;

const API_URL: &str = "https://cloudbuild.googleapis.com/v1";
const SERVICE: &str = "Cloud Build";

pub struct CloudBuild {
  client: Client,
  api_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTrigger {
  id: String,
  #[serde(default)]
  name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTriggerList {
  #[serde(default)]
  triggers: Vec<ApiTrigger>,
  #[serde(default)]
  next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiBuild {
  id: String,
}

#[derive(Debug, Deserialize, Default)]
struct ApiOperationMetadata {
  build: Option<ApiBuild>,
}

#[derive(Debug, Deserialize)]
struct ApiOperation {
  #[serde(default)]
  name: String,
  #[serde(default)]
  metadata: Option<ApiOperationMetadata>,
}

impl ApiOperation {
  /// Build ID when the service reports one, else the operation name
  fn build_id(self) -> String {
    self
      .metadata
      .and_then(|m| m.build)
      .map(|b| b.id)
      .unwrap_or(self.name)
  }
}

impl CloudBuild {
  pub fn new(token: &str) -> LibrarianResult<Self> {
    let mut headers = HeaderMap::new();
    let auth = HeaderValue::from_str(&format!("Bearer {}", token))
      .map_err(|e| LibrarianError::invalid(format!("{} is not a valid header value: {}", TOKEN_ENV, e)))?;
    headers.insert(AUTHORIZATION, auth);
    headers.insert(USER_AGENT, HeaderValue::from_static("librarian"));

    let client = Client::builder().default_headers(headers).build()?;
    Ok(Self {
      client,
      api_url: API_URL.to_string(),
    })
  }

  /// Client using the token from `LIBRARIAN_GCP_TOKEN`
  pub fn from_env() -> LibrarianResult<Self> {
    let token = std::env::var(TOKEN_ENV).map_err(|_| {
      LibrarianError::with_help(
        format!("{} is not set", TOKEN_ENV),
        "Export an access token, e.g. LIBRARIAN_GCP_TOKEN=$(gcloud auth print-access-token).",
      )
    })?;
    Self::new(&token)
  }

  fn triggers_url(&self, location: &Location) -> String {
    format!(
      "{}/projects/{}/locations/{}/triggers",
      self.api_url, location.project, location.region
    )
  }

  fn send(request: RequestBuilder) -> LibrarianResult<Response> {
    let response = request.send()?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().unwrap_or_default();
      return Err(LibrarianError::external(SERVICE, format!("{}: {}", status, body)));
    }
    Ok(response)
  }
}

impl BuildTriggerClient for CloudBuild {
  fn list_page(&self, location: &Location, page_token: Option<&str>) -> LibrarianResult<TriggerPage> {
    let mut request = self.client.get(self.triggers_url(location));
    if let Some(token) = page_token {
      request = request.query(&[("pageToken", token)]);
    }
    let list: ApiTriggerList = Self::send(request)?.json()?;
    Ok(TriggerPage {
      triggers: list
        .triggers
        .into_iter()
        .map(|t| Trigger { id: t.id, name: t.name })
        .collect(),
      next_page_token: list.next_page_token,
    })
  }

  fn run_trigger(
    &self,
    location: &Location,
    trigger_id: &str,
    substitutions: &BTreeMap<String, String>,
  ) -> LibrarianResult<String> {
    let url = format!("{}/{}:run", self.triggers_url(location), trigger_id);
    let body = serde_json::json!({
      "projectId": location.project,
      "triggerId": trigger_id,
      "source": { "substitutions": substitutions },
    });
    let operation: ApiOperation = Self::send(self.client.post(url).json(&body))?.json()?;
    Ok(operation.build_id())
  }
}
