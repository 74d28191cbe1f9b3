pub mod client;
pub mod fixtures;
pub mod specs;

/// Invoke `$mac!(module::name)` for every E2E spec.
///
/// This is the **single source of truth** for the spec list; `tests/server.rs`
/// turns each entry into a `#[tokio::test]`.
#[macro_export]
macro_rules! for_each_spec {
    ($mac:ident) => {
        // health (1)
        $mac!(health::health_check);

        // families & auth (5)
        $mac!(families::register_and_login);
        $mac!(families::duplicate_email_conflicts);
        $mac!(families::bad_password_rejected);
        $mac!(families::missing_token_unauthorized);
        $mac!(families::update_family_admin_only);

        // ledger (4)
        $mac!(ledger::record_and_summarize_budget);
        $mac!(ledger::transaction_filters);
        $mac!(ledger::category_type_mismatch_rejected);
        $mac!(ledger::other_family_not_found);

        // invites (3)
        $mac!(invites::invite_accept_flow);
        $mac!(invites::child_cannot_manage_categories);
        $mac!(invites::revoked_invite_conflicts);

        // reports (1)
        $mac!(reports::generate_breakdown_report);
    };
}
