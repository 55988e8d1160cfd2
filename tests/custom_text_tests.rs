// Copyright (c) 2025 - Cowboy AI, Inc.
//! Custom message texts

mod fixtures;

use std::collections::BTreeMap;

use fixtures::*;
use pretty_assertions::assert_eq;

use iam_commands::events::event_types;
use iam_commands::{ErrorKind, PolicyScope};

const TEMPLATE: &str = "InitCode";

fn texts(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(key, text)| (key.to_string(), text.to_string()))
        .collect()
}

fn org1() -> PolicyScope {
    PolicyScope::Org(ORG_1.to_string())
}

#[tokio::test]
async fn test_set_only_emits_events_for_differences() {
    // Arrange
    let h = harness().await;
    h.commands
        .set_custom_texts(&ctx(), org1(), TEMPLATE, "de", texts(&[("Title", "Hallo"), ("Greeting", "Hi")]))
        .await
        .unwrap();
    let before = h.position().await;

    // Act
    h.commands
        .set_custom_texts(
            &ctx(),
            org1(),
            TEMPLATE,
            "de",
            texts(&[("Title", "Hallo"), ("Greeting", ""), ("Footer", "Tschüss"), ("Unknown", "")]),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(
        h.event_types_after(before).await,
        vec![
            event_types::CUSTOM_TEXT_SET.to_string(),
            event_types::CUSTOM_TEXT_REMOVED.to_string(),
        ]
    );
    let resolved = h
        .commands
        .resolve_custom_texts(&ctx(), ORG_1, TEMPLATE, "de")
        .await
        .unwrap();
    assert_eq!(resolved.value, texts(&[("Footer", "Tschüss"), ("Title", "Hallo")]));
}

#[tokio::test]
async fn test_unchanged_texts_succeed_without_push() {
    let h = harness().await;
    let first = h
        .commands
        .set_custom_texts(&ctx(), org1(), TEMPLATE, "en", texts(&[("Title", "Welcome")]))
        .await
        .unwrap();

    let second = h
        .commands
        .set_custom_texts(&ctx(), org1(), TEMPLATE, "en", texts(&[("Title", "Welcome")]))
        .await
        .unwrap();

    assert_eq!(second, first);
    assert_eq!(h.store.len().await, 1);
}

#[test_case::test_case("english" ; "long primary tag")]
#[test_case::test_case("e" ; "short primary tag")]
#[test_case::test_case("de-" ; "empty subtag")]
#[tokio::test]
async fn test_malformed_language_is_invalid(language: &str) {
    let h = harness().await;

    let err = h
        .commands
        .set_custom_texts(&ctx(), org1(), TEMPLATE, language, texts(&[("Title", "x")]))
        .await
        .unwrap_err();

    assert!(err.is(ErrorKind::InvalidArgument));
}

#[tokio::test]
async fn test_org_texts_shadow_instance_texts() {
    let h = harness().await;
    h.commands
        .set_custom_texts(&ctx(), PolicyScope::Instance, TEMPLATE, "en", texts(&[("Title", "Default")]))
        .await
        .unwrap();

    let fallback = h
        .commands
        .resolve_custom_texts(&ctx(), ORG_1, TEMPLATE, "en")
        .await
        .unwrap();
    h.commands
        .set_custom_texts(&ctx(), org1(), TEMPLATE, "en", texts(&[("Title", "Org")]))
        .await
        .unwrap();
    let overridden = h
        .commands
        .resolve_custom_texts(&ctx(), ORG_1, TEMPLATE, "en")
        .await
        .unwrap();

    assert!(fallback.is_default);
    assert_eq!(fallback.value, texts(&[("Title", "Default")]));
    assert!(!overridden.is_default);
    assert_eq!(overridden.value, texts(&[("Title", "Org")]));
}

#[tokio::test]
async fn test_resolve_without_any_texts_is_empty() {
    let h = harness().await;

    let resolved = h
        .commands
        .resolve_custom_texts(&ctx(), ORG_1, TEMPLATE, "fr")
        .await
        .unwrap();

    assert!(resolved.is_default);
    assert!(resolved.value.is_empty());
}

#[tokio::test]
async fn test_reset_removes_org_texts_of_one_language() {
    // Arrange
    let h = harness().await;
    h.commands
        .set_custom_texts(&ctx(), org1(), TEMPLATE, "de", texts(&[("Title", "Hallo")]))
        .await
        .unwrap();
    h.commands
        .set_custom_texts(&ctx(), org1(), TEMPLATE, "en", texts(&[("Title", "Hello")]))
        .await
        .unwrap();

    // Act
    h.commands
        .reset_custom_texts(&ctx(), ORG_1, TEMPLATE, "de")
        .await
        .unwrap();
    let again = h
        .commands
        .reset_custom_texts(&ctx(), ORG_1, TEMPLATE, "de")
        .await
        .unwrap_err();

    // Assert
    assert!(again.is(ErrorKind::NotFound));
    assert_eq!(again.key(), "Errors.CustomText.NotFound");
    let english = h
        .commands
        .resolve_custom_texts(&ctx(), ORG_1, TEMPLATE, "en")
        .await
        .unwrap();
    assert_eq!(english.value, texts(&[("Title", "Hello")]));
}

#[tokio::test]
async fn test_unchanged_texts_report_last_event_of_their_language() {
    // Arrange
    let h = harness().await;
    let german = h
        .commands
        .set_custom_texts(&ctx(), org1(), TEMPLATE, "de", texts(&[("Title", "Hallo")]))
        .await
        .unwrap();
    h.commands
        .set_custom_texts(&ctx(), org1(), TEMPLATE, "en", texts(&[("Title", "Hello")]))
        .await
        .unwrap();
    let before = h.position().await;

    // Act
    let unchanged = h
        .commands
        .set_custom_texts(&ctx(), org1(), TEMPLATE, "de", texts(&[("Title", "Hallo")]))
        .await
        .unwrap();

    // Assert
    assert_eq!(h.position().await, before);
    assert_eq!(unchanged.sequence, german.sequence);
    assert_eq!(unchanged.event_date, german.event_date);
}
