//! Tests for the generation service: validation, caching and delivery.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{HEADLINE_FRAGMENTS, Script, ScriptedProvider, call_count, headline_reply};
use futures_util::StreamExt;
use headliner::transport::wait_terminal;
use headliner::{
    AttributeRecord, CacheConfig, CacheKey, Delivery, Headliner, HeadlinerError, ManualClock,
    TransportState,
};

fn google_cpc() -> AttributeRecord {
    AttributeRecord::new().source("google").medium("cpc")
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn empty_record_is_rejected_without_work() {
    let provider = headline_reply();
    let calls = provider.calls();
    let service = Headliner::builder().provider(provider).build().unwrap();

    let err = service.generate(&AttributeRecord::new()).await.unwrap_err();
    assert!(matches!(err, HeadlinerError::InvalidInput(_)));
    assert!(!err.is_provider_error());

    let err = service
        .generate_stream(&AttributeRecord::new())
        .await
        .err()
        .expect("stream request should be rejected");
    assert!(matches!(err, HeadlinerError::InvalidInput(_)));

    assert_eq!(call_count(&calls), 0);
    assert!(service.cache().is_empty());
}

// ============================================================================
// Complete mode
// ============================================================================

#[tokio::test]
async fn second_request_is_served_from_cache() {
    let provider = headline_reply();
    let calls = provider.calls();
    let service = Headliner::builder().provider(provider).build().unwrap();

    let first = service.generate(&google_cpc()).await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.message, HEADLINE_FRAGMENTS.concat());

    let second = service.generate(&google_cpc()).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.message, first.message);
    assert_eq!(call_count(&calls), 1);
}

#[tokio::test]
async fn truncated_completion_is_still_served_and_cached() {
    let provider = ScriptedProvider::new(Script::Truncated("**Headline:** Resolve incid"));
    let service = Headliner::builder().provider(provider).build().unwrap();

    let first = service.generate(&google_cpc()).await.unwrap();
    assert_eq!(first.message, "**Headline:** Resolve incid");
    assert!(service.generate(&google_cpc()).await.unwrap().cached);
}

#[tokio::test]
async fn different_records_generate_separately() {
    let provider = headline_reply();
    let calls = provider.calls();
    let service = Headliner::builder().provider(provider).build().unwrap();

    service.generate(&google_cpc()).await.unwrap();
    let other = service
        .generate(&AttributeRecord::new().source("bing"))
        .await
        .unwrap();
    assert!(!other.cached);
    assert_eq!(call_count(&calls), 2);
}

#[tokio::test]
async fn failure_is_not_cached() {
    let provider = ScriptedProvider::new(Script::Fail);
    let calls = provider.calls();
    let service = Headliner::builder().provider(provider).build().unwrap();

    let err = service.generate(&google_cpc()).await.unwrap_err();
    assert!(err.is_provider_error());
    assert!(service.cache().is_empty());

    // a retry is a fresh attempt
    let _ = service.generate(&google_cpc()).await;
    assert_eq!(call_count(&calls), 2);
}

#[tokio::test]
async fn expired_entry_is_regenerated() {
    let clock = Arc::new(ManualClock::new());
    let provider = headline_reply();
    let calls = provider.calls();
    let service = Headliner::builder()
        .provider(provider)
        .cache(CacheConfig::new().ttl(Duration::from_secs(3600)))
        .clock(clock.clone())
        .build()
        .unwrap();

    service.generate(&google_cpc()).await.unwrap();
    clock.advance(Duration::from_secs(3600));

    let again = service.generate(&google_cpc()).await.unwrap();
    assert!(!again.cached);
    assert_eq!(call_count(&calls), 2);
}

// ============================================================================
// Stream mode
// ============================================================================

#[tokio::test]
async fn stream_relays_fragments_then_caches() {
    let provider = headline_reply();
    let calls = provider.calls();
    let service = Headliner::builder().provider(provider).build().unwrap();

    let Delivery::Streaming(mut stream) = service.generate_stream(&google_cpc()).await.unwrap()
    else {
        panic!("expected a live stream on a cold cache");
    };
    let state = stream.state_watch();

    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next().await {
        chunks.push(String::from_utf8(chunk.unwrap().to_vec()).unwrap());
    }
    assert_eq!(chunks, HEADLINE_FRAGMENTS);
    assert_eq!(wait_terminal(state).await, TransportState::Completed);

    match service.generate_stream(&google_cpc()).await.unwrap() {
        Delivery::Cached(message) => assert_eq!(message, HEADLINE_FRAGMENTS.concat()),
        Delivery::Streaming(_) => panic!("expected a cache hit"),
    }
    // the JSON endpoint sees the same entry
    assert!(service.generate(&google_cpc()).await.unwrap().cached);
    assert_eq!(call_count(&calls), 1);
}

#[tokio::test]
async fn stream_mode_reuses_complete_mode_entry() {
    let service = Headliner::builder()
        .provider(headline_reply())
        .build()
        .unwrap();

    service.generate(&google_cpc()).await.unwrap();
    assert!(matches!(
        service.generate_stream(&google_cpc()).await.unwrap(),
        Delivery::Cached(_)
    ));
}

#[tokio::test]
async fn mid_stream_failure_keeps_prefix_and_caches_nothing() {
    let provider = ScriptedProvider::new(Script::FailMidStream(vec!["Headline: Par", "tial"]));
    let service = Headliner::builder().provider(provider).build().unwrap();

    let Delivery::Streaming(mut stream) = service.generate_stream(&google_cpc()).await.unwrap()
    else {
        panic!("expected a live stream");
    };
    let state = stream.state_watch();

    let mut received = String::new();
    let mut failed = false;
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => received.push_str(std::str::from_utf8(&bytes).unwrap()),
            Err(e) => {
                assert!(matches!(e, HeadlinerError::Stream(_)));
                failed = true;
            }
        }
    }
    assert!(failed);
    assert_eq!(received, "Headline: Partial");
    assert_eq!(wait_terminal(state).await, TransportState::Failed);
    assert_eq!(service.cache().lookup(&CacheKey::from(&google_cpc())), None);
}

#[tokio::test]
async fn upstream_refusal_fails_before_streaming() {
    let service = Headliner::builder()
        .provider(ScriptedProvider::new(Script::Fail))
        .build()
        .unwrap();

    let err = service
        .generate_stream(&google_cpc())
        .await
        .err()
        .expect("refused upstream should fail the request");
    assert!(err.is_provider_error());
}

// ============================================================================
// Builder
// ============================================================================

#[tokio::test]
async fn missing_api_key_builds_but_fails_generation() {
    let service = Headliner::builder().openai(None::<String>).build().unwrap();
    assert_eq!(service.provider_name(), "openai");

    let err = service.generate(&google_cpc()).await.unwrap_err();
    assert!(matches!(err, HeadlinerError::AuthenticationFailed));
    assert!(service.cache().is_empty());
}

#[test]
fn builder_applies_options() {
    let service = Headliner::builder()
        .provider(headline_reply())
        .model("gpt-4o")
        .temperature(0.2)
        .max_tokens(64)
        .build()
        .unwrap();
    assert_eq!(service.options().model, "gpt-4o");
    assert_eq!(service.options().temperature, Some(0.2));
    assert_eq!(service.options().max_tokens, Some(64));
}
