use anyhow::{Result, ensure};

use famledger_api::{
    AcceptInviteRequest, Invite, InvitePreview, ListInvitesResponse, ListUsersResponse,
};

use crate::client::{PASSWORD, TestContext, json_with_status};
use crate::fixtures;

/// Invite → preview → accept → the new member logs in with the invited role.
pub async fn invite_accept_flow(ctx: &TestContext) -> Result<()> {
    let family = ctx.register_family().await?;
    let email = format!("{}-member@e2e.local", family.name);
    let invite = ctx.invite(&family, &email, "member").await?;
    ensure!(invite.token.len() >= 32, "token too short");

    let resp = ctx.get(&format!("/invites/token/{}", invite.token)).await?;
    let preview: InvitePreview = json_with_status(resp, 200).await?;
    ensure!(preview.family_name == family.name);
    ensure!(preview.status == "pending");

    let resp = ctx
        .post_json(
            &format!("/invites/token/{}/accept", invite.token),
            &AcceptInviteRequest {
                password: PASSWORD.into(),
                first_name: "New".into(),
                last_name: "Member".into(),
            },
        )
        .await?;
    ensure!(resp.status() == 201, "expected 201, got {}", resp.status());

    let resp = ctx.login(&email, PASSWORD).await?;
    let token: famledger_api::AuthTokenResponse = json_with_status(resp, 200).await?;
    ensure!(token.role == "member");
    ensure!(token.family_id == family.family_id);

    let resp = ctx.get_authed("/invites", &family.admin.access_token).await?;
    let listed: ListInvitesResponse = json_with_status(resp, 200).await?;
    ensure!(listed.invites.iter().any(|i| i.id == invite.id && i.accepted_by.is_some()));

    let resp = ctx.get_authed("/users", &token.access_token).await?;
    let users: ListUsersResponse = json_with_status(resp, 200).await?;
    ensure!(users.users.len() == 2);

    // An address that now belongs to a user cannot be invited again.
    let resp = ctx
        .post_json_authed(
            "/invites",
            &family.admin.access_token,
            &famledger_api::CreateInviteRequest {
                email,
                role: "member".into(),
                expires_in_hours: Some(24),
            },
        )
        .await?;
    ensure!(resp.status() == 409, "expected 409, got {}", resp.status());
    Ok(())
}

/// Children record their own spending but cannot manage categories or invites.
pub async fn child_cannot_manage_categories(ctx: &TestContext) -> Result<()> {
    let family = ctx.register_family().await?;
    let child = ctx.join_family(&family, "child").await?;

    let resp = ctx
        .post_json_authed(
            "/categories",
            &child.access_token,
            &fixtures::category("Toys", "expense"),
        )
        .await?;
    ensure!(resp.status() == 403, "expected 403, got {}", resp.status());

    let resp = ctx.get_authed("/invites", &child.access_token).await?;
    ensure!(resp.status() == 403, "expected 403, got {}", resp.status());

    let resp = ctx
        .post_json_authed(
            "/categories",
            &family.admin.access_token,
            &fixtures::category("Snacks", "expense"),
        )
        .await?;
    let snacks: famledger_api::Category = json_with_status(resp, 201).await?;
    let resp = ctx
        .post_json_authed(
            "/transactions",
            &child.access_token,
            &fixtures::expense(snacks.id, "2.50", "2024-01-04"),
        )
        .await?;
    let tx: famledger_api::Transaction = json_with_status(resp, 201).await?;
    ensure!(tx.user_id == child.user_id);
    Ok(())
}

/// A revoked invite can be neither accepted nor revoked again.
pub async fn revoked_invite_conflicts(ctx: &TestContext) -> Result<()> {
    let family = ctx.register_family().await?;
    let email = format!("{}-revoked@e2e.local", family.name);
    let invite = ctx.invite(&family, &email, "member").await?;

    let path = format!("/invites/{}", invite.id);
    let resp = ctx.delete_authed(&path, &family.admin.access_token).await?;
    let revoked: Invite = json_with_status(resp, 200).await?;
    ensure!(revoked.status.to_string() == "revoked");

    let resp = ctx.delete_authed(&path, &family.admin.access_token).await?;
    ensure!(resp.status() == 409, "expected 409, got {}", resp.status());

    let resp = ctx
        .post_json(
            &format!("/invites/token/{}/accept", invite.token),
            &AcceptInviteRequest {
                password: PASSWORD.into(),
                first_name: "Too".into(),
                last_name: "Late".into(),
            },
        )
        .await?;
    ensure!(resp.status() == 409, "expected 409, got {}", resp.status());
    Ok(())
}
