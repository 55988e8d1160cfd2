// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Removal
//!
//! Once an entity is removed, removing it again never appends to the log.
//! Depending on the entity a repeated removal either succeeds without a
//! push or is rejected as not found; nothing else is acceptable.

use proptest::prelude::*;

use iam_commands::aggregate::MemberTarget;
use iam_commands::domain::{LabelPolicy, PasswordAgePolicy};
use iam_commands::service::UserGrantInput;
use iam_commands::{CommandResult, ErrorKind, ObjectDetails, PolicyScope};

use crate::fixtures::*;

// ============================================================================
// Removable Entities
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Removable {
    OrgMember,
    ProjectRole,
    UserGrant,
    Project,
    LabelPolicy,
    PasswordAgePolicy,
}

fn removable() -> impl Strategy<Value = Removable> {
    prop_oneof![
        Just(Removable::OrgMember),
        Just(Removable::ProjectRole),
        Just(Removable::UserGrant),
        Just(Removable::Project),
        Just(Removable::LabelPolicy),
        Just(Removable::PasswordAgePolicy),
    ]
}

/// Create the entity and return the id its removal needs
async fn create(h: &Harness, kind: Removable) -> String {
    let c = &h.commands;
    match kind {
        Removable::OrgMember => {
            c.add_member(&ctx(), MemberTarget::org(ORG_1), USER_1, roles(&["ORG_OWNER"]))
                .await
                .unwrap();
            USER_1.to_string()
        }
        Removable::ProjectRole | Removable::Project => project_with_roles(h, &["key1"]).await,
        Removable::UserGrant => {
            let project_id = project_with_roles(h, &["key1"]).await;
            grant_project(h, &project_id).await
        }
        Removable::LabelPolicy => {
            c.add_label_policy(&ctx(), PolicyScope::Org(ORG_1.to_string()), LabelPolicy::default())
                .await
                .unwrap();
            ORG_1.to_string()
        }
        Removable::PasswordAgePolicy => {
            let policy = PasswordAgePolicy {
                expire_warn_days: 10,
                max_age_days: 90,
            };
            c.add_policy(&ctx(), PolicyScope::Org(ORG_1.to_string()), policy)
                .await
                .unwrap();
            ORG_1.to_string()
        }
    }
}

async fn grant_project(h: &Harness, project_id: &str) -> String {
    let input = UserGrantInput {
        user_id: USER_1.to_string(),
        project_id: project_id.to_string(),
        project_grant_id: None,
        role_keys: roles(&["key1"]),
    };
    h.commands
        .add_user_grant(&ctx(), ORG_1, input)
        .await
        .unwrap()
        .aggregate_id
}

async fn remove(h: &Harness, kind: Removable, id: &str) -> CommandResult<ObjectDetails> {
    let c = &h.commands;
    match kind {
        Removable::OrgMember => c.remove_member(&ctx(), MemberTarget::org(ORG_1), id).await,
        Removable::ProjectRole => c.remove_project_role(&ctx(), id, ORG_1, "key1", &[], &[], &[]).await,
        Removable::UserGrant => c.remove_user_grant(&ctx(), id, ORG_1).await,
        Removable::Project => c.remove_project(&ctx(), id, ORG_1, &[], &[]).await,
        Removable::LabelPolicy => c.remove_label_policy(&ctx(), id).await,
        Removable::PasswordAgePolicy => c.remove_policy::<PasswordAgePolicy>(&ctx(), id).await,
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: repeated removal appends nothing
    ///
    /// The first removal appends events; every later attempt leaves the
    /// log position untouched and ends in success or NotFound.
    #[test]
    fn prop_repeated_removal_is_idempotent(kind in removable(), repeats in 1usize..5) {
        tokio_test::block_on(async {
            let h = harness().await;
            let id = create(&h, kind).await;

            let before = h.position().await;
            let first = remove(&h, kind, &id).await;
            prop_assert!(first.is_ok(), "first removal of {:?} failed: {:?}", kind, first);
            let after_first = h.position().await;
            prop_assert!(after_first > before);

            for _ in 0..repeats {
                match remove(&h, kind, &id).await {
                    Ok(_) => {}
                    Err(err) => prop_assert!(err.is(ErrorKind::NotFound), "{:?}: {}", kind, err),
                }
                prop_assert_eq!(h.position().await, after_first);
            }
            Ok(())
        })?;
    }

    /// Property: a removed entity can be created again and removed again
    #[test]
    fn prop_removed_entity_can_be_recreated(kind in removable()) {
        tokio_test::block_on(async {
            let h = harness().await;
            let id = create(&h, kind).await;
            remove(&h, kind, &id).await.unwrap();

            let id = match kind {
                Removable::ProjectRole => {
                    h.commands
                        .add_project_role(
                            &ctx(),
                            &id,
                            ORG_1,
                            iam_commands::service::ProjectRole::new("key1", "KEY1"),
                        )
                        .await
                        .unwrap();
                    id
                }
                // the first project is the only one holding "key1"
                Removable::UserGrant => grant_project(&h, "id1").await,
                // the project name is free again, a new project gets a new id
                _ => create(&h, kind).await,
            };

            prop_assert!(remove(&h, kind, &id).await.is_ok());
            Ok(())
        })?;
    }
}
