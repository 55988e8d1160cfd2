// Copyright (c) 2025 - Cowboy AI, Inc.
//! Label policy commands, assets and org/instance resolution

mod fixtures;

use fixtures::*;
use pretty_assertions::assert_eq;

use iam_commands::domain::{LabelAsset, LabelPolicy};
use iam_commands::events::event_types;
use iam_commands::service::AssetUpload;
use iam_commands::{ErrorKind, PolicyScope};

fn org1() -> PolicyScope {
    PolicyScope::Org(ORG_1.to_string())
}

fn policy(primary_color: &str) -> LabelPolicy {
    LabelPolicy {
        primary_color: primary_color.to_string(),
        ..LabelPolicy::default()
    }
}

fn png(bytes: &[u8]) -> AssetUpload {
    AssetUpload {
        content_type: "image/png".to_string(),
        content: bytes.to_vec(),
    }
}

#[tokio::test]
async fn test_add_org_label_policy_then_duplicate_add_fails() {
    // Arrange
    let h = harness().await;

    // Act
    let details = h
        .commands
        .add_label_policy(&ctx(), org1(), policy("#000000"))
        .await
        .expect("first add succeeds");
    let err = h
        .commands
        .add_label_policy(&ctx(), org1(), policy("#000000"))
        .await
        .unwrap_err();

    // Assert
    assert_eq!(details.resource_owner, ORG_1);
    assert_eq!(details.aggregate_id, ORG_1);
    assert_eq!(details.sequence, 1);
    assert!(err.is(ErrorKind::AlreadyExists));
    assert_eq!(err.key(), "Errors.Org.LabelPolicy.AlreadyExists");
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn test_add_label_policy_rejects_malformed_color() {
    let h = harness().await;

    let err = h
        .commands
        .add_label_policy(&ctx(), org1(), policy("black"))
        .await
        .unwrap_err();

    assert!(err.is(ErrorKind::InvalidArgument));
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_add_label_policy_rejects_empty_org_id() {
    let h = harness().await;

    let err = h
        .commands
        .add_label_policy(&ctx(), PolicyScope::Org(String::new()), policy("#000000"))
        .await
        .unwrap_err();

    assert!(err.is(ErrorKind::InvalidArgument));
}

#[tokio::test]
async fn test_change_label_policy_requires_existing_policy_and_a_difference() {
    let h = harness().await;

    let missing = h
        .commands
        .change_label_policy(&ctx(), org1(), policy("#111111"))
        .await
        .unwrap_err();
    assert!(missing.is(ErrorKind::NotFound));

    h.commands
        .add_label_policy(&ctx(), org1(), policy("#000000"))
        .await
        .unwrap();
    let unchanged = h
        .commands
        .change_label_policy(&ctx(), org1(), policy("#000000"))
        .await
        .unwrap_err();
    assert!(unchanged.is(ErrorKind::PreconditionFailed));
    assert_eq!(unchanged.key(), "Errors.Org.LabelPolicy.NotChanged");

    let details = h
        .commands
        .change_label_policy(&ctx(), org1(), policy("#111111"))
        .await
        .unwrap();
    assert_eq!(details.sequence, 2);
}

#[tokio::test]
async fn test_change_resets_activation_until_activated_again() {
    let h = harness().await;
    h.commands
        .add_label_policy(&ctx(), org1(), policy("#000000"))
        .await
        .unwrap();
    h.commands.activate_label_policy(&ctx(), org1()).await.unwrap();
    assert!(h.commands.resolve_label_policy(&ctx(), ORG_1).await.unwrap().value.activated);

    h.commands
        .change_label_policy(&ctx(), org1(), policy("#222222"))
        .await
        .unwrap();
    let resolved = h.commands.resolve_label_policy(&ctx(), ORG_1).await.unwrap();

    assert!(!resolved.value.activated);
    assert_eq!(resolved.value.policy.primary_color, "#222222");
}

#[tokio::test]
async fn test_resolution_falls_back_to_instance_until_org_override_exists() {
    // Arrange
    let h = harness().await;
    h.commands
        .add_label_policy(&ctx(), PolicyScope::Instance, policy("#ffffff"))
        .await
        .unwrap();

    // Act
    let fallback = h.commands.resolve_label_policy(&ctx(), ORG_1).await.unwrap();
    h.commands
        .add_label_policy(&ctx(), org1(), policy("#000000"))
        .await
        .unwrap();
    let overridden = h.commands.resolve_label_policy(&ctx(), ORG_1).await.unwrap();

    // Assert
    assert!(fallback.is_default);
    assert_eq!(fallback.value.policy.primary_color, "#ffffff");
    assert_eq!(fallback.details.resource_owner, INSTANCE_ID);
    assert!(!overridden.is_default);
    assert_eq!(overridden.value.policy.primary_color, "#000000");
    assert_eq!(overridden.details.resource_owner, ORG_1);
}

#[tokio::test]
async fn test_resolution_without_any_policy_is_not_found() {
    let h = harness().await;

    let err = h.commands.resolve_label_policy(&ctx(), ORG_1).await.unwrap_err();

    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_removed_org_policy_resolves_to_instance_again() {
    let h = harness().await;
    h.commands
        .add_label_policy(&ctx(), PolicyScope::Instance, policy("#ffffff"))
        .await
        .unwrap();
    h.commands
        .add_label_policy(&ctx(), org1(), policy("#000000"))
        .await
        .unwrap();

    h.commands.remove_label_policy(&ctx(), ORG_1).await.unwrap();
    let resolved = h.commands.resolve_label_policy(&ctx(), ORG_1).await.unwrap();

    assert!(resolved.is_default);
    let again = h.commands.remove_label_policy(&ctx(), ORG_1).await.unwrap_err();
    assert!(again.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_asset_upload_is_stored_and_replaced() {
    // Arrange
    let h = harness().await;
    h.commands
        .add_label_policy(&ctx(), org1(), policy("#000000"))
        .await
        .unwrap();

    // Act
    h.commands
        .add_label_asset(&ctx(), org1(), LabelAsset::Logo, png(&[1, 2, 3]))
        .await
        .unwrap();
    h.commands
        .add_label_asset(&ctx(), org1(), LabelAsset::Logo, png(&[4, 5]))
        .await
        .unwrap();

    // Assert
    let first = format!("{INSTANCE_ID}/{ORG_1}/policy/label/logo-id1");
    let second = format!("{INSTANCE_ID}/{ORG_1}/policy/label/logo-id2");
    assert!(h.assets.get(&first).await.is_none());
    assert_eq!(h.assets.get(&second).await.map(|o| o.content), Some(vec![4, 5]));
    assert_eq!(h.assets.len().await, 1);

    let resolved = h.commands.resolve_label_policy(&ctx(), ORG_1).await.unwrap();
    assert_eq!(resolved.value.assets.get(&LabelAsset::Logo), Some(&second));
}

#[tokio::test]
async fn test_asset_upload_requires_content_and_policy() {
    let h = harness().await;

    let no_policy = h
        .commands
        .add_label_asset(&ctx(), org1(), LabelAsset::Icon, png(&[1]))
        .await
        .unwrap_err();
    let empty = h
        .commands
        .add_label_asset(&ctx(), org1(), LabelAsset::Icon, png(&[]))
        .await
        .unwrap_err();

    assert!(no_policy.is(ErrorKind::NotFound));
    assert!(empty.is(ErrorKind::InvalidArgument));
    assert!(h.assets.is_empty().await);
}

#[tokio::test]
async fn test_remove_asset_deletes_object_and_missing_asset_is_not_found() {
    let h = harness().await;
    h.commands
        .add_label_policy(&ctx(), org1(), policy("#000000"))
        .await
        .unwrap();
    h.commands
        .add_label_asset(&ctx(), org1(), LabelAsset::Font, png(&[9]))
        .await
        .unwrap();

    h.commands
        .remove_label_asset(&ctx(), org1(), LabelAsset::Font)
        .await
        .unwrap();
    let missing = h
        .commands
        .remove_label_asset(&ctx(), org1(), LabelAsset::Font)
        .await
        .unwrap_err();

    assert!(h.assets.is_empty().await);
    assert!(missing.is(ErrorKind::NotFound));
    assert_eq!(missing.key(), "Errors.Org.LabelPolicy.Asset.NotFound");
}

#[tokio::test]
async fn test_storage_failure_is_internal_and_appends_nothing() {
    // Arrange
    let h = harness().await;
    h.commands
        .add_label_policy(&ctx(), org1(), policy("#000000"))
        .await
        .unwrap();
    h.commands
        .add_label_asset(&ctx(), org1(), LabelAsset::Logo, png(&[1]))
        .await
        .unwrap();
    let before = h.position().await;
    h.assets.set_failing(true);

    // Act
    let upload = h
        .commands
        .add_label_asset(&ctx(), org1(), LabelAsset::Icon, png(&[2]))
        .await
        .unwrap_err();
    let removal = h.commands.remove_label_policy(&ctx(), ORG_1).await.unwrap_err();

    // Assert
    assert!(upload.is(ErrorKind::Internal));
    assert!(removal.is(ErrorKind::Internal));
    assert!(h.event_types_after(before).await.is_empty());
    assert!(!h.commands.resolve_label_policy(&ctx(), ORG_1).await.unwrap().is_default);
}

#[tokio::test]
async fn test_remove_org_policy_deletes_assets_first() {
    let h = harness().await;
    h.commands
        .add_label_policy(&ctx(), org1(), policy("#000000"))
        .await
        .unwrap();
    h.commands
        .add_label_asset(&ctx(), org1(), LabelAsset::Logo, png(&[1]))
        .await
        .unwrap();
    h.commands
        .add_label_asset(&ctx(), org1(), LabelAsset::IconDark, png(&[2]))
        .await
        .unwrap();
    let before = h.position().await;

    h.commands.remove_label_policy(&ctx(), ORG_1).await.unwrap();

    assert!(h.assets.is_empty().await);
    assert_eq!(
        h.event_types_after(before).await,
        vec![event_types::LABEL_POLICY_REMOVED.to_string()]
    );
}
