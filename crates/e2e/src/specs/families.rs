use anyhow::{Result, ensure};
use uuid::Uuid;

use famledger_api::{
    AuthTokenResponse, Family, MeResponse, RegisterFamilyRequest, UpdateFamilyRequest,
};

use crate::client::{PASSWORD, TestContext, json_with_status};

/// POST /api/families → 201, then the admin can log in and see `/auth/me`.
pub async fn register_and_login(ctx: &TestContext) -> Result<()> {
    let family = ctx.register_family().await?;
    ensure!(!family.admin.access_token.is_empty(), "expected access_token");

    let resp = ctx
        .login(&family.admin.email.to_uppercase(), &family.admin.password)
        .await?;
    let token: AuthTokenResponse = json_with_status(resp, 200).await?;
    ensure!(token.token_type == "Bearer");
    ensure!(token.role == "admin", "expected admin, got {}", token.role);
    ensure!(token.family_id == family.family_id);

    let resp = ctx.get_authed("/auth/me", &token.access_token).await?;
    let me: MeResponse = json_with_status(resp, 200).await?;
    ensure!(me.family.name == family.name);
    ensure!(me.user.last_login.is_some(), "login must stamp last_login");
    Ok(())
}

/// An email already in use, in any family → 409.
pub async fn duplicate_email_conflicts(ctx: &TestContext) -> Result<()> {
    let family = ctx.register_family().await?;
    let resp = ctx
        .post_json(
            "/families",
            &RegisterFamilyRequest {
                family_name: "Other".into(),
                currency: "EUR".into(),
                email: family.admin.email.clone(),
                password: PASSWORD.into(),
                first_name: "Dup".into(),
                last_name: "Licate".into(),
            },
        )
        .await?;
    ensure!(resp.status() == 409, "expected 409, got {}", resp.status());
    Ok(())
}

/// Short password → 400; wrong password → 401.
pub async fn bad_password_rejected(ctx: &TestContext) -> Result<()> {
    let resp = ctx
        .post_json(
            "/families",
            &RegisterFamilyRequest {
                family_name: "Short".into(),
                currency: "USD".into(),
                email: format!("short-{}@e2e.local", Uuid::new_v4().simple()),
                password: "short".into(),
                first_name: "Short".into(),
                last_name: "Password".into(),
            },
        )
        .await?;
    ensure!(resp.status() == 400, "expected 400, got {}", resp.status());

    let family = ctx.register_family().await?;
    let resp = ctx.login(&family.admin.email, "wrong-password").await?;
    ensure!(resp.status() == 401, "expected 401, got {}", resp.status());
    Ok(())
}

pub async fn missing_token_unauthorized(ctx: &TestContext) -> Result<()> {
    for path in ["/family", "/transactions", "/budgets", "/reports"] {
        let resp = ctx.get(path).await?;
        ensure!(resp.status() == 401, "{path}: expected 401, got {}", resp.status());
        let body: serde_json::Value = resp.json().await?;
        ensure!(body["error"].is_string(), "{path}: expected error body");
    }
    Ok(())
}

/// Members cannot rename the family; admins can.
pub async fn update_family_admin_only(ctx: &TestContext) -> Result<()> {
    let family = ctx.register_family().await?;
    let member = ctx.join_family(&family, "member").await?;
    let rename = UpdateFamilyRequest {
        name: Some("Renamed".into()),
        currency: Some("eur".into()),
    };

    let resp = ctx.put_json_authed("/family", &member.access_token, &rename).await?;
    ensure!(resp.status() == 403, "expected 403, got {}", resp.status());

    let resp = ctx
        .put_json_authed("/family", &family.admin.access_token, &rename)
        .await?;
    let updated: Family = json_with_status(resp, 200).await?;
    ensure!(updated.name == "Renamed");
    ensure!(updated.currency == "EUR", "currency must be upper-cased");
    Ok(())
}
