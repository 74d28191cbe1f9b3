//! Background invite maintenance.

use std::time::Duration;

use tokio::task::JoinHandle;

use famledger_api::service::{Repositories, invites};
use famledger_runtime_config::InviteSettings;

/// Run one pass: expire overdue pending invites, then purge settled ones
/// past retention. Returns `(expired, purged)`.
pub async fn run_once(repos: &Repositories, settings: &InviteSettings) -> (u64, u64) {
    let expired = invites::sweep_invites(repos).await.unwrap_or_else(|e| {
        tracing::warn!("invite sweep failed: {e}");
        0
    });
    let purged = if settings.purge_after_days == 0 {
        0
    } else {
        let retention = chrono::Duration::days(i64::from(settings.purge_after_days));
        invites::purge_invites(repos, retention)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("invite purge failed: {e}");
                0
            })
    };
    (expired, purged)
}

/// Spawn the periodic sweep. `None` when `sweep_interval_secs` is 0.
pub fn spawn(repos: Repositories, settings: InviteSettings) -> Option<JoinHandle<()>> {
    if settings.sweep_interval_secs == 0 {
        tracing::info!("invite sweep disabled");
        return None;
    }
    let period = Duration::from_secs(settings.sweep_interval_secs);
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_once(&repos, &settings).await;
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use famledger_core::{Invite, InviteStatus, Role, clock, testing};

    async fn overdue_invite(repos: &Repositories) -> Invite {
        let mut family = testing::family();
        repos.families.create(&mut family).await.unwrap();
        let mut admin = testing::user(&family, "admin", Role::Admin);
        repos.users.create(&mut admin).await.unwrap();
        let mut invite = Invite::new(
            family.id,
            admin.id,
            "late@example.com",
            Role::Member,
            "tokenoverdue",
            clock::now() - chrono::Duration::hours(2),
        );
        repos.invites.create(&mut invite).await.unwrap();
        invite
    }

    #[tokio::test]
    async fn pass_expires_then_keeps_within_retention() {
        let repos = famledger_store::in_memory().await.unwrap().repos;
        let invite = overdue_invite(&repos).await;

        let settings = InviteSettings::default();
        assert_eq!(run_once(&repos, &settings).await, (1, 0));
        let stored = repos.invites.get_by_id(invite.id).await.unwrap();
        assert_eq!(stored.status, InviteStatus::Expired);

        assert_eq!(run_once(&repos, &settings).await, (0, 0));
    }

    #[tokio::test]
    async fn zero_interval_disables_the_task() {
        let repos = famledger_store::in_memory().await.unwrap().repos;
        let settings = InviteSettings {
            sweep_interval_secs: 0,
            ..Default::default()
        };
        assert!(spawn(repos, settings).is_none());
    }
}
