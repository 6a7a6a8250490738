//! Per-relationship override storage.

mod support;

use chrono::{Duration, Utc};
use support::*;
use trustgate_storage::KvStore;
use trustgate_types::{AllowDenyPatch, PartialPermissionSet, PatternRulePatch, PermissionOverride};

fn memory_override(peer: &str) -> PermissionOverride {
    PermissionOverride::new(ACTOR, peer, "mcp_client")
        .with_permissions(
            PartialPermissionSet::new().with_properties(
                PatternRulePatch::new()
                    .with_patterns(["memory_*"])
                    .with_excluded(["memory_personal"]),
            ),
        )
        .with_created_by(ACTOR)
        .with_notes("assistant may read travel memories")
}

#[tokio::test]
async fn store_then_get() {
    let h = harness();
    let stored = h.engine.store_override(memory_override(PEER)).await.unwrap();
    let fetched = h.engine.get_override(ACTOR, PEER).await.unwrap().unwrap();
    assert_eq!(*fetched, *stored);
    assert_eq!(fetched.notes, "assistant may read travel memories");
}

#[tokio::test]
async fn missing_override_is_none() {
    let h = harness();
    assert!(h.engine.get_override(ACTOR, PEER).await.unwrap().is_none());
}

#[tokio::test]
async fn store_stamps_updated_at() {
    let h = harness();
    let mut ov = memory_override(PEER);
    ov.updated_at = Utc::now() - Duration::days(30);
    let before = Utc::now();
    let stored = h.engine.store_override(ov).await.unwrap();
    assert!(stored.updated_at >= before);
}

#[tokio::test]
async fn store_replaces_previous_override() {
    let h = harness();
    h.engine.store_override(memory_override(PEER)).await.unwrap();
    let replacement = PermissionOverride::new(ACTOR, PEER, "mcp_client").with_permissions(
        PartialPermissionSet::new().with_methods(AllowDenyPatch::new().with_allowed(["get_*"])),
    );
    h.engine.store_override(replacement.clone()).await.unwrap();
    let fetched = h.engine.get_override(ACTOR, PEER).await.unwrap().unwrap();
    assert_eq!(fetched.permissions, replacement.permissions);
}

#[tokio::test]
async fn override_is_persisted_in_actor_bucket() {
    let h = harness();
    h.engine.store_override(memory_override(PEER)).await.unwrap();
    let json = h
        .storage
        .inner()
        .get("_trust_permissions:actor-1", PEER)
        .await
        .unwrap()
        .unwrap();
    let decoded: PermissionOverride = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded.trust_type, "mcp_client");
}

#[tokio::test]
async fn store_reads_through_after_restart() {
    let h = harness();
    h.engine.store_override(memory_override(PEER)).await.unwrap();
    let second = trustgate_engine::PermissionEngine::new(
        trustgate_engine::EngineConfig::default(),
        h.storage.clone(),
        h.resolver.clone(),
    );
    let fetched = second.get_override(ACTOR, PEER).await.unwrap().unwrap();
    assert_eq!(fetched.permissions, memory_override(PEER).permissions);
}

#[tokio::test]
async fn empty_ids_are_rejected() {
    let h = harness();
    for ov in [
        PermissionOverride::new("", PEER, "friend"),
        PermissionOverride::new(ACTOR, "", "friend"),
        PermissionOverride::new(ACTOR, PEER, ""),
    ] {
        assert!(h.engine.store().store_override(ov).await.unwrap_err().is_validation());
    }
}

#[tokio::test]
async fn invalid_override_patterns_are_rejected() {
    let h = harness();
    let ov = PermissionOverride::new(ACTOR, PEER, "friend").with_permissions(
        PartialPermissionSet::new().with_tools(AllowDenyPatch::new().with_allowed(["x".repeat(257)])),
    );
    assert!(h.engine.store_override(ov).await.unwrap_err().is_validation());

    let ov = PermissionOverride::new(ACTOR, PEER, "friend").with_permissions(
        PartialPermissionSet::new().with_prompts(AllowDenyPatch::new().with_denied(["secret"])),
    );
    assert!(h.engine.store_override(ov).await.unwrap_err().is_validation());

    assert!(h.engine.get_override(ACTOR, PEER).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_trust_type_is_rejected_by_engine() {
    let h = harness();
    let err = h
        .engine
        .store_override(PermissionOverride::new(ACTOR, PEER, "stranger"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("stranger"));
}

#[tokio::test]
async fn delete_is_idempotent() {
    let h = harness();
    h.engine.store_override(memory_override(PEER)).await.unwrap();
    h.engine.delete_override(ACTOR, PEER).await.unwrap();
    assert!(h.engine.get_override(ACTOR, PEER).await.unwrap().is_none());
    h.engine.delete_override(ACTOR, PEER).await.unwrap();
}

#[tokio::test]
async fn list_is_ordered_by_peer() {
    let h = harness();
    for peer in ["peer-c", "peer-a", "peer-b"] {
        h.engine.store_override(memory_override(peer)).await.unwrap();
    }
    let peers: Vec<String> = h
        .engine
        .list_overrides(ACTOR)
        .await
        .unwrap()
        .iter()
        .map(|o| o.peer_id.clone())
        .collect();
    assert_eq!(peers, ["peer-a", "peer-b", "peer-c"]);
    assert!(h.engine.list_overrides("someone-else").await.unwrap().is_empty());
}

#[tokio::test]
async fn actor_deletion_clears_only_that_actor() {
    let h = harness();
    for peer in ["peer-a", "peer-b"] {
        h.engine.store_override(memory_override(peer)).await.unwrap();
    }
    h.engine
        .store_override(PermissionOverride::new("actor-2", "peer-a", "friend"))
        .await
        .unwrap();

    assert_eq!(h.engine.on_actor_deleted(ACTOR).await.unwrap(), 2);
    assert!(h.engine.get_override(ACTOR, "peer-a").await.unwrap().is_none());
    assert!(h.engine.list_overrides(ACTOR).await.unwrap().is_empty());
    assert!(h.engine.get_override("actor-2", "peer-a").await.unwrap().is_some());
    assert_eq!(h.engine.on_actor_deleted(ACTOR).await.unwrap(), 0);
}

#[tokio::test]
async fn relationship_deletion_drops_override() {
    let h = harness();
    h.engine.store_override(memory_override(PEER)).await.unwrap();
    h.engine.on_relationship_deleted(ACTOR, PEER).await.unwrap();
    assert!(h.engine.get_override(ACTOR, PEER).await.unwrap().is_none());
}

#[tokio::test]
async fn corrupted_record_surfaces_serialization_error() {
    let h = harness();
    h.storage
        .put("_trust_permissions:actor-1", PEER, "{not json")
        .await
        .unwrap();
    let err = h.engine.get_override(ACTOR, PEER).await.unwrap_err();
    assert!(matches!(err, trustgate_engine::PermissionError::Serialization(_)));
}

#[tokio::test]
async fn read_racing_a_delete_does_not_cache_the_deleted_override() {
    init_tracing();
    let storage = std::sync::Arc::new(GatedKvStore::new());
    let resolver = std::sync::Arc::new(trustgate_engine::StaticTrustResolver::new());
    resolver.set_relationship(ACTOR, PEER, "mcp_client").await;

    let writer = trustgate_engine::PermissionEngine::new(
        trustgate_engine::EngineConfig::default(),
        storage.clone(),
        resolver.clone(),
    );
    writer.store_override(memory_override(PEER)).await.unwrap();

    // Fresh engine: its override cache is empty, so the read goes to storage.
    let engine = std::sync::Arc::new(trustgate_engine::PermissionEngine::new(
        trustgate_engine::EngineConfig::default(),
        storage.clone(),
        resolver,
    ));
    storage.arm("_trust_permissions:actor-1");
    let reader = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.get_override(ACTOR, PEER).await })
    };
    storage.wait_parked().await;

    engine.delete_override(ACTOR, PEER).await.unwrap();
    storage.release();
    let raced = reader.await.unwrap().unwrap();
    assert!(raced.is_some());

    assert!(engine.get_override(ACTOR, PEER).await.unwrap().is_none());
    let d = engine
        .evaluate(
            ACTOR,
            PEER,
            trustgate_types::Category::Properties,
            "memory_travel",
            Some("read"),
        )
        .await;
    assert!(!d.allowed);
}

#[tokio::test]
async fn failed_actor_deletion_still_drops_cached_overrides() {
    let h = harness();
    for peer in ["peer-a", "peer-b"] {
        h.resolver.set_relationship(ACTOR, peer, "mcp_client").await;
        h.engine.store_override(memory_override(peer)).await.unwrap();
        let d = h
            .engine
            .evaluate(
                ACTOR,
                peer,
                trustgate_types::Category::Properties,
                "memory_travel",
                Some("read"),
            )
            .await;
        assert!(d.allowed);
    }

    h.storage.fail_deletes_after(1);
    assert!(h.engine.on_actor_deleted(ACTOR).await.is_err());

    // peer-a was deleted from storage before the failure.
    assert!(h.engine.get_override(ACTOR, "peer-a").await.unwrap().is_none());
    let d = h
        .engine
        .evaluate(
            ACTOR,
            "peer-a",
            trustgate_types::Category::Properties,
            "memory_travel",
            Some("read"),
        )
        .await;
    assert!(!d.allowed);
    // peer-b is still stored, and reads through to storage.
    assert!(h.engine.get_override(ACTOR, "peer-b").await.unwrap().is_some());
}
