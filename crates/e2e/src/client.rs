use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use famledger_api::{
    AcceptInviteRequest, AcceptInviteResponse, CreateInviteRequest, Invite, LoginRequest,
    RegisterFamilyRequest, RegisterFamilyResponse,
};

/// Holds connection info for a test run.
pub struct TestContext {
    client: reqwest::Client,
    base_url: String,
}

/// A signed-in test user.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub user_id: Uuid,
    pub family_id: Uuid,
    pub email: String,
    pub password: String,
    pub access_token: String,
}

/// A freshly registered family and its admin.
#[derive(Debug, Clone)]
pub struct TestFamily {
    pub family_id: Uuid,
    pub name: String,
    pub admin: TestUser,
}

pub const PASSWORD: &str = "testpass99";

impl TestContext {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a full API URL from a path like `/health`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Register a family with a unique name and admin email.
    pub async fn register_family(&self) -> Result<TestFamily> {
        let short = &Uuid::new_v4().simple().to_string()[..8];
        let email = format!("admin-{short}@e2e.local");
        let name = format!("e2e-{short}");
        let resp = self
            .post_json(
                "/families",
                &RegisterFamilyRequest {
                    family_name: name.clone(),
                    currency: "USD".into(),
                    email: email.clone(),
                    password: PASSWORD.into(),
                    first_name: "E2E".into(),
                    last_name: "Admin".into(),
                },
            )
            .await?;
        let created: RegisterFamilyResponse = json_with_status(resp, 201).await?;
        Ok(TestFamily {
            family_id: created.family.id,
            name,
            admin: TestUser {
                user_id: created.user.id,
                family_id: created.family.id,
                email,
                password: PASSWORD.into(),
                access_token: created.auth.access_token,
            },
        })
    }

    /// Log in again and return a fresh token.
    pub async fn login(&self, email: &str, password: &str) -> Result<reqwest::Response> {
        self.post_json(
            "/auth/login",
            &LoginRequest {
                email: email.into(),
                password: password.into(),
            },
        )
        .await
    }

    /// Invite a unique address into `family` with `role` and accept the
    /// invite, returning the new member.
    pub async fn join_family(&self, family: &TestFamily, role: &str) -> Result<TestUser> {
        let email = format!("{role}-{}@e2e.local", &Uuid::new_v4().simple().to_string()[..8]);
        let invite = self.invite(family, &email, role).await?;
        let resp = self
            .post_json(
                &format!("/invites/token/{}/accept", invite.token),
                &AcceptInviteRequest {
                    password: PASSWORD.into(),
                    first_name: "E2E".into(),
                    last_name: role.into(),
                },
            )
            .await?;
        let joined: AcceptInviteResponse = json_with_status(resp, 201).await?;
        Ok(TestUser {
            user_id: joined.user.id,
            family_id: joined.user.family_id,
            email,
            password: PASSWORD.into(),
            access_token: joined.auth.access_token,
        })
    }

    pub async fn invite(&self, family: &TestFamily, email: &str, role: &str) -> Result<Invite> {
        let resp = self
            .post_json_authed(
                "/invites",
                &family.admin.access_token,
                &CreateInviteRequest {
                    email: email.into(),
                    role: role.into(),
                    expires_in_hours: None,
                },
            )
            .await?;
        json_with_status(resp, 201).await
    }

    // ── HTTP convenience methods ──────────────────────────────────────

    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self.client.get(self.url(path)).send().await?)
    }

    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        Ok(self.client.post(self.url(path)).json(body).send().await?)
    }

    pub async fn get_authed(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await?)
    }

    pub async fn post_json_authed<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    pub async fn put_json_authed<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?)
    }

    pub async fn delete_authed(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        Ok(self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await?)
    }
}

/// Check the status and decode the JSON body.
pub async fn json_with_status<T: DeserializeOwned>(
    resp: reqwest::Response,
    expected: u16,
) -> Result<T> {
    let status = resp.status();
    if status.as_u16() != expected {
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow!("expected {expected}, got {status}: {body}"));
    }
    resp.json().await.context("decoding response body")
}
