mod common;

use atelier_app::admin::{NO_ARTISTS, NO_VISITORS};
use atelier_app::profile_form::LOGOUT_FAILED;
use atelier_app::session::PROFILE_READ_FAILED;
use atelier_app::{AdminDashboard, Confirmation, DashboardError, Navigator, Route};
use atelier_auth::{AuthError, AuthOp};
use atelier_core::{ProfileRecord, UserId};
use atelier_infra::{StoreError, StoreOp};

use common::{Harness, profile};

fn ids(records: &[ProfileRecord]) -> Vec<&str> {
    records.iter().map(|r| r.user_id.as_str()).collect()
}

#[tokio::test]
async fn admin_sees_artists_and_visitors_in_store_order() {
    let h = Harness::new();
    let admin = h.signed_in("root@example.com");
    h.seed(admin.id.as_str(), "Root", "admin");
    h.seed("u1", "One", "artist");
    h.seed("u2", "Two", "visitor");
    h.seed("u3", "Three", "artist");

    let mut dashboard = AdminDashboard::new(h.ctx.clone());
    dashboard.mount(&admin).await.unwrap();

    assert_eq!(ids(&dashboard.directory().artists), ["u1", "u3"]);
    assert_eq!(ids(&dashboard.directory().visitors), ["u2"]);
    assert_eq!(h.store.watcher_count(), 1);
}

#[tokio::test]
async fn directory_follows_live_changes() {
    let h = Harness::new();
    let admin = h.signed_in("root@example.com");
    h.seed(admin.id.as_str(), "Root", "admin");

    let mut dashboard = AdminDashboard::new(h.ctx.clone());
    dashboard.mount(&admin).await.unwrap();
    assert_eq!(dashboard.directory().artists_placeholder(), Some(NO_ARTISTS));
    assert_eq!(dashboard.directory().visitors_placeholder(), Some(NO_VISITORS));

    let newcomer = UserId::parse("u9").unwrap();
    h.ctx
        .profiles
        .save(&newcomer, &profile("Nine", "visitor"))
        .await
        .unwrap();
    assert!(dashboard.next().await);
    assert_eq!(ids(&dashboard.directory().visitors), ["u9"]);

    h.ctx.profiles.remove(&newcomer).await.unwrap();
    assert!(dashboard.refresh());
    assert!(dashboard.directory().visitors.is_empty());
}

#[tokio::test]
async fn undecodable_records_are_skipped() {
    let h = Harness::new();
    let admin = h.signed_in("root@example.com");
    h.seed(admin.id.as_str(), "Root", "admin");
    h.seed("u1", "One", "artist");
    h.store
        .set(
            &atelier_infra::StorePath::parse("/users/garbage").unwrap(),
            serde_json::json!("not a record"),
        )
        .unwrap();

    let mut dashboard = AdminDashboard::new(h.ctx.clone());
    dashboard.mount(&admin).await.unwrap();
    assert_eq!(ids(&dashboard.directory().artists), ["u1"]);
}

#[tokio::test]
async fn non_admin_gets_no_subscription() {
    let h = Harness::new();
    let artist = h.signed_in("art@example.com");
    h.seed(artist.id.as_str(), "Art", "artist");

    let mut dashboard = AdminDashboard::new(h.ctx.clone());
    assert_eq!(dashboard.mount(&artist).await, Err(DashboardError::NotAdmin));
    assert!(!dashboard.is_mounted());
    assert_eq!(h.store.watcher_count(), 0);
}

#[tokio::test]
async fn failed_viewer_read_is_reported_and_not_mounted() {
    let h = Harness::new();
    let admin = h.signed_in("root@example.com");
    h.seed(admin.id.as_str(), "Root", "admin");
    h.store
        .fail_next(StoreOp::Read, StoreError::backend("permission-denied"));

    let mut dashboard = AdminDashboard::new(h.ctx.clone());
    let result = dashboard.mount(&admin).await;

    assert!(matches!(result, Err(DashboardError::Store(_))));
    assert!(!dashboard.is_mounted());
    assert_eq!(h.store.watcher_count(), 0);
    assert_eq!(h.log.titles(), [PROFILE_READ_FAILED]);
}

#[tokio::test]
async fn unmount_releases_and_remount_resubscribes() {
    let h = Harness::new();
    let admin = h.signed_in("root@example.com");
    h.seed(admin.id.as_str(), "Root", "admin");

    let mut dashboard = AdminDashboard::new(h.ctx.clone());
    dashboard.mount(&admin).await.unwrap();
    dashboard.unmount();
    dashboard.unmount();
    assert_eq!(h.store.watcher_count(), 0);
    assert!(!dashboard.next().await);

    dashboard.mount(&admin).await.unwrap();
    dashboard.mount(&admin).await.unwrap();
    assert_eq!(h.store.watcher_count(), 1);
    drop(dashboard);
    assert_eq!(h.store.watcher_count(), 0);
}

#[tokio::test]
async fn logout_is_gated_on_success() {
    let h = Harness::new();
    let admin = h.signed_in("root@example.com");
    h.seed(admin.id.as_str(), "Root", "admin");
    h.nav.reset(Route::AdminDashboard);

    let dashboard = AdminDashboard::new(h.ctx.clone());
    h.provider
        .fail_next(AuthOp::SignOut, AuthError::unclassified("network"));
    dashboard.request_confirmation(Confirmation::Logout);
    assert!(dashboard.confirm().await.is_err());
    assert_eq!(h.nav.current(), Some(Route::AdminDashboard));
    assert_eq!(h.log.last().unwrap().title, LOGOUT_FAILED);

    dashboard.request_confirmation(Confirmation::Logout);
    dashboard.confirm().await.unwrap();
    assert_eq!(h.nav.history(), [Route::Landing]);
}
