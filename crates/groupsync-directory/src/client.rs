//! Google Workspace directory client.
//!
//! Talks to the Admin SDK Directory API for groups and memberships and to the
//! Groups Settings API for behavioral settings.

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::auth::AccessTokenSource;
use crate::port::DirectoryPort;
use crate::types::{Group, Member, Role, SettingName, SettingsMap};
use crate::{DirectoryError, DirectoryResult};

/// Admin SDK Directory API base URL.
pub const DEFAULT_ADMIN_ENDPOINT: &str = "https://admin.googleapis.com/admin/directory/v1";

/// Groups Settings API base URL.
pub const DEFAULT_SETTINGS_ENDPOINT: &str = "https://www.googleapis.com/groups/v1";

/// Customer alias for the account the credentials belong to.
pub const DEFAULT_CUSTOMER: &str = "my_customer";

/// Largest page the directory hands out.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Connection settings for [`WorkspaceClient`].
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    pub admin_endpoint: String,
    pub settings_endpoint: String,
    /// Customer key used when listing groups.
    pub customer: String,
    /// `maxResults` for list calls.
    pub page_size: u32,
    pub request_timeout: Duration,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            admin_endpoint: DEFAULT_ADMIN_ENDPOINT.to_string(),
            settings_endpoint: DEFAULT_SETTINGS_ENDPOINT.to_string(),
            customer: DEFAULT_CUSTOMER.to_string(),
            page_size: MAX_PAGE_SIZE,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkspaceConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Config`] for an empty customer or an
    /// out-of-range page size, and [`DirectoryError::Url`] for bad endpoints.
    pub fn validate(&self) -> DirectoryResult<()> {
        if self.customer.trim().is_empty() {
            return Err(DirectoryError::Config("customer must not be empty".into()));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(DirectoryError::Config(format!(
                "page_size must be in 1..={MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        Url::parse(&self.admin_endpoint)?;
        Url::parse(&self.settings_endpoint)?;
        Ok(())
    }
}

/// Error envelope returned by Google APIs.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
}

impl From<GroupResource> for Group {
    fn from(resource: GroupResource) -> Self {
        Group {
            id: resource.id,
            email: resource.email,
            name: resource.name,
            description: resource.description,
        }
    }
}

impl From<&Group> for GroupResource {
    fn from(group: &Group) -> Self {
        GroupResource {
            id: None,
            email: group.email.clone(),
            name: group.name.clone(),
            description: group.description.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupsPage {
    #[serde(default)]
    groups: Vec<GroupResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberResource {
    #[serde(default)]
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    role: String,
}

impl TryFrom<MemberResource> for Member {
    type Error = DirectoryError;

    fn try_from(resource: MemberResource) -> DirectoryResult<Self> {
        let role = Role::parse(&resource.role).ok_or_else(|| {
            DirectoryError::UnexpectedResponse(format!(
                "unknown role {:?} for member {}",
                resource.role, resource.email
            ))
        })?;
        Ok(Member {
            id: resource.id,
            email: resource.email,
            role,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembersPage {
    #[serde(default)]
    members: Vec<MemberResource>,
    next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct MemberWrite<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    role: &'a str,
}

/// Converts a settings resource into typed settings; unknown fields are dropped.
pub(crate) fn settings_from_json(value: &Value) -> SettingsMap {
    let mut settings = SettingsMap::new();
    for name in SettingName::ALL {
        match value.get(name.api_field()) {
            Some(Value::String(s)) => {
                settings.insert(name, s.clone());
            }
            Some(Value::Bool(b)) => {
                settings.insert(name, b.to_string());
            }
            _ => {}
        }
    }
    settings
}

pub(crate) fn settings_to_json(settings: &SettingsMap) -> Value {
    let body: serde_json::Map<String, Value> = settings
        .iter()
        .map(|(name, value)| (name.api_field().to_string(), Value::String(value.clone())))
        .collect();
    Value::Object(body)
}

/// HTTP implementation of [`DirectoryPort`] for Google Workspace.
#[derive(Debug)]
pub struct WorkspaceClient {
    http: reqwest::Client,
    tokens: Arc<dyn AccessTokenSource>,
    config: WorkspaceConfig,
    admin_base: Url,
    settings_base: Url,
}

impl WorkspaceClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: WorkspaceConfig, tokens: Arc<dyn AccessTokenSource>) -> DirectoryResult<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DirectoryError::Config(format!("Failed to create HTTP client: {e}")))?;

        let admin_base = Url::parse(&config.admin_endpoint)?;
        let settings_base = Url::parse(&config.settings_endpoint)?;

        Ok(Self {
            http,
            tokens,
            config,
            admin_base,
            settings_base,
        })
    }

    #[must_use]
    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Appends percent-encoded path segments to `base`.
    fn endpoint(base: &Url, segments: &[&str]) -> DirectoryResult<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| DirectoryError::Config(format!("endpoint {base} cannot carry a path")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn admin_url(&self, segments: &[&str]) -> DirectoryResult<Url> {
        Self::endpoint(&self.admin_base, segments)
    }

    fn settings_url(&self, email_id: &str) -> DirectoryResult<Url> {
        let mut url = Self::endpoint(&self.settings_base, &["groups", email_id])?;
        url.query_pairs_mut().append_pair("alt", "json");
        Ok(url)
    }

    /// Sends a request with the bearer token and maps failures to errors.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
        resource: &str,
    ) -> DirectoryResult<Response> {
        let token = self.tokens.bearer_token().await?;

        debug!(%method, %url, "Directory request");
        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        Err(Self::error_from_response(response, resource).await)
    }

    async fn error_from_response(response: Response, resource: &str) -> DirectoryError {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return DirectoryError::not_found(resource);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return DirectoryError::RateLimited { retry_after_secs };
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ApiErrorEnvelope>(&body) {
            Ok(envelope) => match envelope.error.status {
                Some(code) => format!("{code}: {}", envelope.error.message),
                None => envelope.error.message,
            },
            Err(_) => body,
        };

        if status == StatusCode::UNAUTHORIZED {
            return DirectoryError::Auth(message);
        }

        DirectoryError::Api {
            status: status.as_u16(),
            message,
        }
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
        resource: &str,
    ) -> DirectoryResult<T> {
        let response = self.send(method, url, body, resource).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
        resource: &str,
    ) -> DirectoryResult<()> {
        self.send(method, url, body, resource).await?;
        Ok(())
    }
}

#[async_trait]
impl DirectoryPort for WorkspaceClient {
    #[instrument(skip(self))]
    async fn get_group(&self, email_id: &str) -> DirectoryResult<Group> {
        let url = self.admin_url(&["groups", email_id])?;
        let resource: GroupResource = self
            .fetch(Method::GET, url, None, &format!("group {email_id}"))
            .await?;
        Ok(resource.into())
    }

    #[instrument(skip(self, group), fields(email_id = %group.email))]
    async fn create_group(&self, group: &Group) -> DirectoryResult<Group> {
        let url = self.admin_url(&["groups"])?;
        let body = serde_json::to_value(GroupResource::from(group))?;
        let created: GroupResource = self
            .fetch(Method::POST, url, Some(body), &format!("group {}", group.email))
            .await?;
        Ok(created.into())
    }

    #[instrument(skip(self, group))]
    async fn update_group(&self, email_id: &str, group: &Group) -> DirectoryResult<Group> {
        let url = self.admin_url(&["groups", email_id])?;
        let body = serde_json::to_value(GroupResource::from(group))?;
        let updated: GroupResource = self
            .fetch(Method::PUT, url, Some(body), &format!("group {email_id}"))
            .await?;
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    async fn delete_group(&self, email_id: &str) -> DirectoryResult<()> {
        let url = self.admin_url(&["groups", email_id])?;
        self.execute(Method::DELETE, url, None, &format!("group {email_id}"))
            .await
    }

    #[instrument(skip(self))]
    async fn list_groups(&self) -> DirectoryResult<Vec<Group>> {
        let mut groups = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.admin_url(&["groups"])?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("customer", &self.config.customer)
                    .append_pair("orderBy", "email")
                    .append_pair("maxResults", &self.config.page_size.to_string());
                if let Some(ref token) = page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let page: GroupsPage = self.fetch(Method::GET, url, None, "groups").await?;
            debug!("Fetched page with {} groups", page.groups.len());
            groups.extend(page.groups.into_iter().map(Group::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(groups),
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_members(&self, email_id: &str) -> DirectoryResult<Vec<Member>> {
        let resource = format!("members of group {email_id}");
        let mut members = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.admin_url(&["groups", email_id, "members"])?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("maxResults", &self.config.page_size.to_string());
                if let Some(ref token) = page_token {
                    query.append_pair("pageToken", token);
                }
            }

            let page: MembersPage = self.fetch(Method::GET, url, None, &resource).await?;
            for member in page.members {
                members.push(Member::try_from(member)?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(members),
            }
        }
    }

    #[instrument(skip(self))]
    async fn insert_member(&self, email_id: &str, email: &str, role: Role) -> DirectoryResult<()> {
        let url = self.admin_url(&["groups", email_id, "members"])?;
        let body = serde_json::to_value(MemberWrite {
            email: Some(email),
            role: role.as_str(),
        })?;
        self.execute(Method::POST, url, Some(body), &format!("group {email_id}"))
            .await
    }

    #[instrument(skip(self))]
    async fn update_member_role(
        &self,
        email_id: &str,
        member_id: &str,
        role: Role,
    ) -> DirectoryResult<()> {
        let url = self.admin_url(&["groups", email_id, "members", member_id])?;
        let body = serde_json::to_value(MemberWrite {
            email: None,
            role: role.as_str(),
        })?;
        self.execute(
            Method::PUT,
            url,
            Some(body),
            &format!("member {member_id} of group {email_id}"),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_member(&self, email_id: &str, member_id: &str) -> DirectoryResult<()> {
        let url = self.admin_url(&["groups", email_id, "members", member_id])?;
        self.execute(
            Method::DELETE,
            url,
            None,
            &format!("member {member_id} of group {email_id}"),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_settings(&self, email_id: &str) -> DirectoryResult<SettingsMap> {
        let url = self.settings_url(email_id)?;
        let value: Value = self
            .fetch(Method::GET, url, None, &format!("settings of group {email_id}"))
            .await?;
        Ok(settings_from_json(&value))
    }

    #[instrument(skip(self, settings))]
    async fn patch_settings(&self, email_id: &str, settings: &SettingsMap) -> DirectoryResult<()> {
        let url = self.settings_url(email_id)?;
        self.execute(
            Method::PATCH,
            url,
            Some(settings_to_json(settings)),
            &format!("settings of group {email_id}"),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_encodes_segments() {
        let base = Url::parse("https://admin.example.com/admin/directory/v1/").unwrap();
        let url = WorkspaceClient::endpoint(&base, &["groups", "a b@example.com", "members"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://admin.example.com/admin/directory/v1/groups/a%20b@example.com/members"
        );
    }

    #[test]
    fn test_settings_json_round_trip_drops_unknown_fields() {
        let json = serde_json::json!({
            "kind": "groupsSettings#groups",
            "email": "team@example.com",
            "whoCanJoin": "INVITED_CAN_JOIN",
            "allowExternalMembers": "true",
            "membersCanPostAsTheGroup": false,
            "whoCanInvite": "ALL_MANAGERS_CAN_INVITE"
        });

        let settings = settings_from_json(&json);
        assert_eq!(settings.len(), 3);
        assert_eq!(settings[&SettingName::WhoCanJoin], "INVITED_CAN_JOIN");
        assert_eq!(settings[&SettingName::MembersCanPostAsTheGroup], "false");

        let body = settings_to_json(&settings);
        assert_eq!(body["allowExternalMembers"], "true");
        assert!(body.get("whoCanInvite").is_none());
    }

    #[test]
    fn test_member_with_unknown_role_is_rejected() {
        let resource = MemberResource {
            id: "1".into(),
            email: "a@example.com".into(),
            role: "SUPERUSER".into(),
        };
        assert!(matches!(
            Member::try_from(resource),
            Err(DirectoryError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_group_resource_omits_empty_fields() {
        let group = Group::new("team@example.com").with_name("Team");
        let json = serde_json::to_value(GroupResource::from(&group)).unwrap();
        assert_eq!(json["email"], "team@example.com");
        assert_eq!(json["name"], "Team");
        assert!(json.get("description").is_none());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_config_validation() {
        assert!(WorkspaceConfig::default().validate().is_ok());

        let config = WorkspaceConfig {
            page_size: 500,
            ..WorkspaceConfig::default()
        };
        assert!(config.validate().is_err());

        let config = WorkspaceConfig {
            admin_endpoint: "not a url".into(),
            ..WorkspaceConfig::default()
        };
        assert!(matches!(config.validate(), Err(DirectoryError::Url(_))));
    }
}
