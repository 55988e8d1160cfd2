// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Write Model Replay
//!
//! Random command sequences are run against projects, label policies,
//! memberships, user grants, custom texts and OIDC sessions.
//! Whatever the sequence, folding the persisted log must be deterministic,
//! and advancing a loaded model with the events a command persisted must
//! equal a fresh load.

use proptest::prelude::*;

use std::collections::BTreeMap;

use iam_commands::aggregate::{
    append_and_reduce, CustomTextWriteModel, LabelPolicyWriteModel, MemberTarget, MemberWriteModel,
    OidcSessionWriteModel, ProjectWriteModel, UserGrantWriteModel,
};
use iam_commands::domain::{LabelAsset, LabelPolicy};
use iam_commands::event_store::SearchQuery;
use iam_commands::events::oidc::ResponseType;
use iam_commands::service::{AssetUpload, NewAuthRequest, ProjectRole, SessionLink, UserGrantInput};
use iam_commands::{EventStore, PolicyScope, WriteModel};

use crate::fixtures::*;

// ============================================================================
// Command Sequences
// ============================================================================

const NAMES: [&str; 3] = ["alpha", "beta", "gamma"];
const KEYS: [&str; 3] = ["key1", "key2", "key3"];
const COLORS: [&str; 3] = ["#000000", "#ffffff", "#5469d4"];
const MEMBER_ROLES: [&[&str]; 3] = [&["ORG_OWNER"], &["ORG_USER_MANAGER"], &["ORG_OWNER", "ORG_PROJECT_CREATOR"]];
const GRANT_ROLES: [&[&str]; 3] = [&["key1"], &["key1", "key2"], &[]];
const LANGUAGES: [&str; 2] = ["de", "en"];
const TEXT_KEYS: [&str; 2] = ["Title", "Greeting"];
/// The empty text removes the key
const TEXTS: [&str; 3] = ["Hallo", "Hi", ""];

#[derive(Debug, Clone)]
enum ProjectOp {
    Rename(usize),
    AddRole(usize),
    ChangeRole(usize, bool),
    RemoveRole(usize),
    Deactivate,
    Reactivate,
}

#[derive(Debug, Clone)]
enum LabelOp {
    Add(usize),
    Change(usize),
    Activate,
    Remove,
    AddAsset(usize),
    RemoveAsset(usize),
}

#[derive(Debug, Clone)]
enum MemberOp {
    Add(usize),
    Change(usize),
    Remove,
}

#[derive(Debug, Clone)]
enum UserGrantOp {
    Change(usize),
    Deactivate,
    Reactivate,
    Remove,
}

#[derive(Debug, Clone)]
enum TextOp {
    Set { language: usize, key: usize, text: usize },
    Reset(usize),
}

#[derive(Debug, Clone)]
enum SessionOp {
    /// Exchange the newest refresh token
    Exchange,
    /// Exchange the token issued with the session
    ExchangeFirst,
    Terminate,
}

fn project_op() -> impl Strategy<Value = ProjectOp> {
    prop_oneof![
        (0..NAMES.len()).prop_map(ProjectOp::Rename),
        (0..KEYS.len()).prop_map(ProjectOp::AddRole),
        (0..KEYS.len(), any::<bool>()).prop_map(|(key, grouped)| ProjectOp::ChangeRole(key, grouped)),
        (0..KEYS.len()).prop_map(ProjectOp::RemoveRole),
        Just(ProjectOp::Deactivate),
        Just(ProjectOp::Reactivate),
    ]
}

fn label_op() -> impl Strategy<Value = LabelOp> {
    prop_oneof![
        (0..COLORS.len()).prop_map(LabelOp::Add),
        (0..COLORS.len()).prop_map(LabelOp::Change),
        Just(LabelOp::Activate),
        Just(LabelOp::Remove),
        (0..LabelAsset::ALL.len()).prop_map(LabelOp::AddAsset),
        (0..LabelAsset::ALL.len()).prop_map(LabelOp::RemoveAsset),
    ]
}

fn member_op() -> impl Strategy<Value = MemberOp> {
    prop_oneof![
        (0..MEMBER_ROLES.len()).prop_map(MemberOp::Add),
        (0..MEMBER_ROLES.len()).prop_map(MemberOp::Change),
        Just(MemberOp::Remove),
    ]
}

fn user_grant_op() -> impl Strategy<Value = UserGrantOp> {
    prop_oneof![
        (0..GRANT_ROLES.len()).prop_map(UserGrantOp::Change),
        Just(UserGrantOp::Deactivate),
        Just(UserGrantOp::Reactivate),
        Just(UserGrantOp::Remove),
    ]
}

fn text_op() -> impl Strategy<Value = TextOp> {
    prop_oneof![
        (0..LANGUAGES.len(), 0..TEXT_KEYS.len(), 0..TEXTS.len())
            .prop_map(|(language, key, text)| TextOp::Set { language, key, text }),
        (0..LANGUAGES.len()).prop_map(TextOp::Reset),
    ]
}

fn session_op() -> impl Strategy<Value = SessionOp> {
    prop_oneof![
        3 => Just(SessionOp::Exchange),
        1 => Just(SessionOp::ExchangeFirst),
        1 => Just(SessionOp::Terminate),
    ]
}

/// Run one project command; rejected commands are part of the sequence
async fn run_project_op(h: &Harness, project_id: &str, op: &ProjectOp) {
    let c = &h.commands;
    let _ = match op {
        ProjectOp::Rename(name) => c.change_project(&ctx(), project_id, ORG_1, NAMES[*name]).await,
        ProjectOp::AddRole(key) => {
            c.add_project_role(&ctx(), project_id, ORG_1, ProjectRole::new(KEYS[*key], "Role"))
                .await
        }
        ProjectOp::ChangeRole(key, grouped) => {
            let role = ProjectRole::new(KEYS[*key], "Role");
            let role = if *grouped { role.with_group("group") } else { role };
            c.change_project_role(&ctx(), project_id, ORG_1, role).await
        }
        ProjectOp::RemoveRole(key) => {
            c.remove_project_role(&ctx(), project_id, ORG_1, KEYS[*key], &[], &[], &[])
                .await
        }
        ProjectOp::Deactivate => c.deactivate_project(&ctx(), project_id, ORG_1).await,
        ProjectOp::Reactivate => c.reactivate_project(&ctx(), project_id, ORG_1).await,
    };
}

async fn run_label_op(h: &Harness, op: &LabelOp) {
    let c = &h.commands;
    let scope = PolicyScope::Org(ORG_1.to_string());
    let policy = |color: usize| LabelPolicy {
        primary_color: COLORS[color].to_string(),
        ..LabelPolicy::default()
    };
    let _ = match op {
        LabelOp::Add(color) => c.add_label_policy(&ctx(), scope, policy(*color)).await,
        LabelOp::Change(color) => c.change_label_policy(&ctx(), scope, policy(*color)).await,
        LabelOp::Activate => c.activate_label_policy(&ctx(), scope).await,
        LabelOp::Remove => c.remove_label_policy(&ctx(), ORG_1).await,
        LabelOp::AddAsset(asset) => {
            let upload = AssetUpload {
                content_type: "image/png".to_string(),
                content: vec![1, 2, 3],
            };
            c.add_label_asset(&ctx(), scope, LabelAsset::ALL[*asset], upload).await
        }
        LabelOp::RemoveAsset(asset) => {
            c.remove_label_asset(&ctx(), scope, LabelAsset::ALL[*asset]).await
        }
    };
}

async fn run_member_op(h: &Harness, op: &MemberOp) {
    let c = &h.commands;
    let target = MemberTarget::org(ORG_1);
    let _ = match op {
        MemberOp::Add(set) => c.add_member(&ctx(), target, USER_1, roles(MEMBER_ROLES[*set])).await,
        MemberOp::Change(set) => c.change_member(&ctx(), target, USER_1, roles(MEMBER_ROLES[*set])).await,
        MemberOp::Remove => c.remove_member(&ctx(), target, USER_1).await,
    };
}

async fn run_user_grant_op(h: &Harness, user_grant_id: &str, op: &UserGrantOp) {
    let c = &h.commands;
    let _ = match op {
        UserGrantOp::Change(set) => {
            c.change_user_grant(&ctx(), user_grant_id, ORG_1, roles(GRANT_ROLES[*set]))
                .await
        }
        UserGrantOp::Deactivate => c.deactivate_user_grant(&ctx(), user_grant_id, ORG_1).await,
        UserGrantOp::Reactivate => c.reactivate_user_grant(&ctx(), user_grant_id, ORG_1).await,
        UserGrantOp::Remove => c.remove_user_grant(&ctx(), user_grant_id, ORG_1).await,
    };
}

async fn run_text_op(h: &Harness, op: &TextOp) {
    let c = &h.commands;
    let _ = match op {
        TextOp::Set { language, key, text } => {
            let texts = BTreeMap::from([(TEXT_KEYS[*key].to_string(), TEXTS[*text].to_string())]);
            c.set_custom_texts(&ctx(), PolicyScope::Org(ORG_1.to_string()), "InitCode", LANGUAGES[*language], texts)
                .await
        }
        TextOp::Reset(language) => {
            c.reset_custom_texts(&ctx(), ORG_1, "InitCode", LANGUAGES[*language])
                .await
        }
    };
}

/// Refresh tokens handed out so far, oldest first
struct SessionTokens {
    oidc_session_id: String,
    issued: Vec<String>,
}

async fn run_session_op(h: &Harness, tokens: &mut SessionTokens, op: &SessionOp) {
    let c = &h.commands;
    let token = match op {
        SessionOp::Exchange => tokens.issued.last(),
        SessionOp::ExchangeFirst => tokens.issued.first(),
        SessionOp::Terminate => {
            let _ = c.terminate_oidc_session(&ctx(), &tokens.oidc_session_id).await;
            return;
        }
    };
    let Some(token) = token.cloned() else { return };
    if let Ok(Some(renewed)) = c
        .exchange_refresh_token(&ctx(), &token)
        .await
        .map(|exchanged| exchanged.refresh_token)
    {
        tokens.issued.push(renewed);
    }
}

/// Code flow session of USER_1 with a refresh token
async fn oidc_session(h: &Harness) -> SessionTokens {
    let c = &h.commands;
    let request = NewAuthRequest {
        login_client: "login".to_string(),
        client_id: "client1".to_string(),
        redirect_uri: "https://app.example.com/callback".to_string(),
        state: "state1".to_string(),
        nonce: "nonce1".to_string(),
        scope: roles(&["openid", "offline_access"]),
        audience: roles(&["client1"]),
        response_type: ResponseType::Code,
    };
    let auth_request_id = c.add_auth_request(&ctx(), request).await.unwrap().aggregate_id;
    let link = SessionLink {
        session_id: SESSION_1.to_string(),
        user_id: USER_1.to_string(),
        auth_methods: roles(&["password"]),
    };
    c.link_session_to_auth_request(&ctx(), &auth_request_id, link)
        .await
        .unwrap();
    c.add_auth_request_code(&ctx(), &auth_request_id).await.unwrap();
    let created = c
        .create_oidc_session_from_auth_request(&ctx(), &auth_request_id)
        .await
        .unwrap();
    SessionTokens {
        oidc_session_id: created.oidc_session_id,
        issued: created.refresh_token.into_iter().collect(),
    }
}

/// Fresh model folded from the whole log
async fn load<W: WriteModel>(h: &Harness, mut model: W) -> W {
    let events = h.store.filter(&model.query()).await.unwrap();
    model.fold(&events);
    model
}

/// Advance `model` with the events persisted after `cut`
async fn advance<W: WriteModel>(h: &Harness, mut model: W, cut: u64) -> W {
    let persisted = h
        .store
        .filter(&SearchQuery::new().position_after(cut))
        .await
        .unwrap();
    append_and_reduce(&mut model, &persisted).unwrap();
    model
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: replaying the same log gives the same write model
    ///
    /// Folding the unfiltered log must also match folding the filtered
    /// events, since reducers only see events matching the model's query.
    #[test]
    fn prop_project_replay_is_deterministic(ops in prop::collection::vec(project_op(), 0..25)) {
        tokio_test::block_on(async {
            let h = harness().await;
            let project_id = project_with_roles(&h, &[]).await;
            for op in &ops {
                run_project_op(&h, &project_id, op).await;
            }

            let first = load(&h, ProjectWriteModel::new(&project_id, ORG_1, INSTANCE_ID)).await;
            let second = load(&h, ProjectWriteModel::new(&project_id, ORG_1, INSTANCE_ID)).await;
            let mut unfiltered = ProjectWriteModel::new(&project_id, ORG_1, INSTANCE_ID);
            unfiltered.fold(&h.events().await);

            prop_assert_eq!(&first, &second);
            prop_assert_eq!(&first, &unfiltered);
            Ok(())
        })?;
    }

    /// Property: append-and-reduce equals a fresh load
    ///
    /// After every command, the model loaded before it and advanced with
    /// the events the command persisted matches a model loaded afterwards.
    #[test]
    fn prop_project_append_and_reduce_matches_load(ops in prop::collection::vec(project_op(), 1..25)) {
        tokio_test::block_on(async {
            let h = harness().await;
            let project_id = project_with_roles(&h, &[]).await;
            for op in &ops {
                let mut advanced = load(&h, ProjectWriteModel::new(&project_id, ORG_1, INSTANCE_ID)).await;
                let cut = h.position().await;
                run_project_op(&h, &project_id, op).await;

                let persisted = h
                    .store
                    .filter(&SearchQuery::new().position_after(cut))
                    .await
                    .unwrap();
                append_and_reduce(&mut advanced, &persisted).unwrap();
                let fresh = load(&h, ProjectWriteModel::new(&project_id, ORG_1, INSTANCE_ID)).await;

                prop_assert_eq!(advanced, fresh, "after {:?}", op);
            }
            Ok(())
        })?;
    }

    /// Property: label policy replay and append-and-reduce agree
    #[test]
    fn prop_label_policy_append_and_reduce_matches_load(ops in prop::collection::vec(label_op(), 1..25)) {
        tokio_test::block_on(async {
            let h = harness().await;
            let model = || LabelPolicyWriteModel::new(PolicyScope::Org(ORG_1.to_string()), INSTANCE_ID);
            for op in &ops {
                let mut advanced = load(&h, model()).await;
                let cut = h.position().await;
                run_label_op(&h, op).await;

                let persisted = h
                    .store
                    .filter(&SearchQuery::new().position_after(cut))
                    .await
                    .unwrap();
                append_and_reduce(&mut advanced, &persisted).unwrap();
                let fresh = load(&h, model()).await;

                prop_assert_eq!(advanced, fresh, "after {:?}", op);
            }
            let replayed = load(&h, model()).await;
            prop_assert_eq!(replayed, load(&h, model()).await);
            Ok(())
        })?;
    }

    /// Property: membership append-and-reduce equals a fresh load
    #[test]
    fn prop_member_append_and_reduce_matches_load(ops in prop::collection::vec(member_op(), 1..20)) {
        tokio_test::block_on(async {
            let h = harness().await;
            let model = || MemberWriteModel::new(MemberTarget::org(ORG_1), USER_1, INSTANCE_ID);
            for op in &ops {
                let loaded = load(&h, model()).await;
                let cut = h.position().await;
                run_member_op(&h, op).await;

                let advanced = advance(&h, loaded, cut).await;
                prop_assert_eq!(advanced, load(&h, model()).await, "after {:?}", op);
            }
            Ok(())
        })?;
    }

    /// Property: user grant append-and-reduce equals a fresh load
    ///
    /// Removal is terminal, so every later command is rejected and the
    /// model stays where the removal left it.
    #[test]
    fn prop_user_grant_append_and_reduce_matches_load(ops in prop::collection::vec(user_grant_op(), 1..20)) {
        tokio_test::block_on(async {
            let h = harness().await;
            let project_id = project_with_roles(&h, &["key1", "key2"]).await;
            let input = UserGrantInput {
                user_id: USER_1.to_string(),
                project_id,
                project_grant_id: None,
                role_keys: roles(&["key1"]),
            };
            let user_grant_id = h.commands.add_user_grant(&ctx(), ORG_1, input).await.unwrap().aggregate_id;
            let model = || UserGrantWriteModel::new(&user_grant_id, ORG_1, INSTANCE_ID);
            for op in &ops {
                let loaded = load(&h, model()).await;
                let cut = h.position().await;
                run_user_grant_op(&h, &user_grant_id, op).await;

                let advanced = advance(&h, loaded, cut).await;
                prop_assert_eq!(advanced, load(&h, model()).await, "after {:?}", op);
            }
            Ok(())
        })?;
    }

    /// Property: custom text append-and-reduce equals a fresh load
    ///
    /// Texts of both languages land on the same aggregate; the German model
    /// must skip the English ones whether folded or advanced.
    #[test]
    fn prop_custom_text_append_and_reduce_matches_load(ops in prop::collection::vec(text_op(), 1..25)) {
        tokio_test::block_on(async {
            let h = harness().await;
            let model = || CustomTextWriteModel::new(PolicyScope::Org(ORG_1.to_string()), "InitCode", "de", INSTANCE_ID);
            for op in &ops {
                let loaded = load(&h, model()).await;
                let cut = h.position().await;
                run_text_op(&h, op).await;

                let advanced = advance(&h, loaded, cut).await;
                let fresh = load(&h, model()).await;
                prop_assert_eq!(advanced.details(), fresh.details(), "after {:?}", op);
                prop_assert_eq!(advanced, fresh, "after {:?}", op);
            }
            Ok(())
        })?;
    }

    /// Property: OIDC session append-and-reduce equals a fresh load
    ///
    /// Stale refresh tokens are rejected without a push, so rotation and
    /// termination are the only events the sequence produces.
    #[test]
    fn prop_oidc_session_append_and_reduce_matches_load(ops in prop::collection::vec(session_op(), 1..15)) {
        tokio_test::block_on(async {
            let h = harness().await;
            let mut tokens = oidc_session(&h).await;
            let session_id = tokens.oidc_session_id.clone();
            let model = || OidcSessionWriteModel::new(&session_id, INSTANCE_ID);
            for op in &ops {
                let loaded = load(&h, model()).await;
                let cut = h.position().await;
                run_session_op(&h, &mut tokens, op).await;

                let advanced = advance(&h, loaded, cut).await;
                prop_assert_eq!(advanced, load(&h, model()).await, "after {:?}", op);
            }
            Ok(())
        })?;
    }
}
