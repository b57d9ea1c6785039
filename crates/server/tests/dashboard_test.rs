//! Dashboard page and root redirect

mod common;

use common::{spawn_app, test_registry};
use sec_graphrag_server::dashboard::SAMPLE_QUESTIONS;

#[tokio::test]
async fn test_root_redirects_to_dashboard() {
    let base = spawn_app(test_registry()).await;
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let response = client.get(format!("{}/", base)).send().await.expect("Request failed");

    assert_eq!(response.status(), 307);
    assert_eq!(response.headers()["location"], "/dashboard");
}

#[tokio::test]
async fn test_dashboard_without_question() {
    let base = spawn_app(test_registry()).await;

    let response = reqwest::get(format!("{}/dashboard", base)).await.expect("Request failed");
    assert_eq!(response.status(), 200);
    let page = response.text().await.unwrap();

    assert!(page.contains("Vector &amp; Graph RAG"));
    assert!(page.contains("Baseline RAG (vector only)"));
    assert!(page.contains("GraphRAG (vector + graph)"));
    assert!(page.contains("Sample Questions to try out"));
    for sample in SAMPLE_QUESTIONS {
        assert!(page.contains(sample), "missing sample: {}", sample);
    }
    // Nothing to stream yet
    assert!(!page.contains("/completion/stream"));
}

#[tokio::test]
async fn test_dashboard_with_question() {
    let base = spawn_app(test_registry()).await;

    let response = reqwest::get(format!("{}/dashboard?q=Who%20owns%20NVIDIA", base))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), 200);
    let page = response.text().await.unwrap();

    assert!(page.contains("value=\"Who owns NVIDIA\""));
    assert!(page.contains("data-route=\"/completion/stream\""));
    assert!(page.contains("data-route=\"/completion-vector-only/stream\""));

    // Graph column: reshaped context, HTML-escaped
    assert!(page.contains("&quot;graphFacts&quot;"));
    assert!(page.contains("BLACKROCK INC - OWNS -&gt; NVIDIA CORP"));
    assert!(page.contains("NVIDIA designs GPUs."));

    // Vector column failed: inline error, page still renders
    assert!(page.contains("Could not retrieve context: LLM error: model unavailable"));
}
