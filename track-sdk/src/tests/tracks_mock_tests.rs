//! Mock tests for the track API client
//!
//! These tests use WireMock to simulate the track API and verify that the
//! client, the gateway and the reqwest transport work together.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::core::{IdentityProvider, ServiceClient, Session};
    use crate::diagnostics::{DiagnosticRecorder, Severity};
    use crate::error::ServiceError;
    use crate::gateway::AuthenticatedGateway;
    use crate::identity::InMemorySessionStore;
    use crate::services::tracks::{Article, NewTrack, TrackUpdate, TracksClient};
    use crate::transport::ReqwestTransport;

    fn track_json(id: &str, completed: [bool; 2]) -> Value {
        json!({
            "id": id,
            "user_id": "user-1",
            "title": "Graph theory",
            "description": "From bridges to networks",
            "is_public": false,
            "articles": [
                {
                    "title": "Seven Bridges of Königsberg",
                    "url": "https://en.wikipedia.org/wiki/Seven_Bridges_of_K%C3%B6nigsberg",
                    "completed": completed[0]
                },
                {
                    "title": "Graph theory",
                    "url": "https://en.wikipedia.org/wiki/Graph_theory",
                    "description": "Study of graphs",
                    "completed": completed[1]
                }
            ],
            "created_at": "2024-05-01T10:00:00.123456",
            "updated_at": "2024-05-02T08:30:00"
        })
    }

    struct Fixture {
        client: TracksClient,
        store: Arc<InMemorySessionStore>,
        recorder: Arc<DiagnosticRecorder>,
    }

    /// Creates a track client configured to use the mock server
    fn create_test_client(mock_server: &MockServer) -> Fixture {
        let store = Arc::new(
            InMemorySessionStore::with_session(Session::new("stale-token"))
                .with_refresher(|| Ok(Session::new("fresh-token"))),
        );
        let recorder = Arc::new(DiagnosticRecorder::new(100));

        let gateway = AuthenticatedGateway::builder()
            .base_url(mock_server.uri())
            .identity(store.clone())
            .transport(Arc::new(ReqwestTransport::new().expect("Failed to build transport")))
            .recorder(Arc::clone(&recorder))
            .build()
            .expect("Failed to build gateway");

        Fixture {
            client: TracksClient::new(gateway),
            store,
            recorder,
        }
    }

    #[tokio::test]
    async fn test_list_tracks() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tracks/"))
            .and(header("Authorization", "Bearer stale-token"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([track_json("t1", [true, false])])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fixture = create_test_client(&mock_server);
        let tracks = fixture.client.list_tracks().await.unwrap();

        assert_eq!(tracks.len(), 1);
        let track = &tracks[0];
        assert_eq!(track.id, "t1");
        assert_eq!(track.articles.len(), 2);
        assert_eq!(track.articles[1].description.as_deref(), Some("Study of graphs"));

        let progress = track.progress();
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.total, 2);
        assert!((progress.percent - 50.0).abs() < f64::EPSILON);
        assert!(!progress.is_finished());

        assert_eq!(fixture.recorder.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_once() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tracks/"))
            .and(header("Authorization", "Bearer stale-token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/tracks/"))
            .and(header("Authorization", "Bearer fresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fixture = create_test_client(&mock_server);
        let tracks = fixture.client.list_tracks().await.unwrap();

        assert!(tracks.is_empty());
        assert_eq!(fixture.store.refresh_count(), 1);

        let warnings: Vec<_> = fixture
            .recorder
            .snapshot()
            .into_iter()
            .filter(|e| e.severity == Severity::Warn)
            .collect();
        assert_eq!(warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_create_track() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/tracks/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(track_json("t9", [false, false])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fixture = create_test_client(&mock_server);
        let new_track = NewTrack::new("  Graph theory  ")
            .description("From bridges to networks")
            .article(Article::new(
                "Seven Bridges of Königsberg",
                "https://en.wikipedia.org/wiki/Seven_Bridges_of_K%C3%B6nigsberg",
            ))
            .unwrap()
            .article(Article::new("Graph theory", "https://en.wikipedia.org/wiki/Graph_theory"))
            .unwrap();

        let created = fixture.client.create_track(new_track).await.unwrap();
        assert_eq!(created.id, "t9");

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["title"], "Graph theory");
        assert_eq!(body["is_public"], false);
        assert_eq!(body["articles"].as_array().unwrap().len(), 2);
        assert_eq!(body["articles"][0]["completed"], false);
    }

    #[tokio::test]
    async fn test_create_track_validation_skips_network() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/tracks/"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&mock_server)
            .await;

        let fixture = create_test_client(&mock_server);

        let err = fixture.client.create_track(NewTrack::new("No articles")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let untitled = NewTrack::new("   ")
            .article(Article::new("Graph theory", "https://en.wikipedia.org/wiki/Graph_theory"))
            .unwrap();
        let err = fixture.client.create_track(untitled).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn test_duplicate_article_rejected() {
        let result = NewTrack::new("Dupes")
            .article(Article::new("Graph theory", "https://a"))
            .unwrap()
            .article(Article::new("Graph theory", "https://b"));
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_track_not_found() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tracks/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Track not found"})))
            .mount(&mock_server)
            .await;

        let fixture = create_test_client(&mock_server);
        let err = fixture.client.get_track("missing").await.unwrap_err();

        assert!(matches!(err.root(), ServiceError::NotFound(_)));
        assert_eq!(err.status_code(), Some(404));
        assert!(err.to_string().contains("Track not found"));

        let last = fixture.recorder.recent(1).pop().unwrap();
        assert_eq!(last.severity, Severity::Error);
        assert_eq!(last.status(), Some(404));
    }

    #[tokio::test]
    async fn test_toggle_article_completion() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tracks/t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(track_json("t1", [true, false])))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/api/tracks/t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(track_json("t1", [true, true])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fixture = create_test_client(&mock_server);
        let updated = fixture
            .client
            .toggle_article_completion("t1", "https://en.wikipedia.org/wiki/Graph_theory")
            .await
            .unwrap();

        assert!(updated.progress().is_finished());

        let requests = mock_server.received_requests().await.unwrap();
        let put = requests.iter().find(|r| r.method.to_string() == "PUT").unwrap();
        let body: Value = serde_json::from_slice(&put.body).unwrap();
        assert_eq!(body["articles"][1]["completed"], true);
        assert!(body.get("title").is_none());
    }

    #[tokio::test]
    async fn test_set_article_completed_unknown_article() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/tracks/t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(track_json("t1", [false, false])))
            .mount(&mock_server)
            .await;

        let fixture = create_test_client(&mock_server);
        let err = fixture
            .client
            .set_article_completed("t1", "https://example.com/nope", true)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_track_rejects_empty_update() {
        let mock_server = MockServer::start().await;
        let fixture = create_test_client(&mock_server);

        let err = fixture.client.update_track("t1", &TrackUpdate::new()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = fixture
            .client
            .update_track("t1", &TrackUpdate::new().title(" "))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_track_id_cannot_rewrite_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(track_json("t1", [false, false])))
            .expect(0)
            .mount(&mock_server)
            .await;

        let fixture = create_test_client(&mock_server);
        let err = fixture.client.get_track("t1?expand=all").await.unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(fixture.recorder.is_empty());
    }

    #[tokio::test]
    async fn test_delete_track() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/tracks/t1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fixture = create_test_client(&mock_server);
        fixture.client.delete_track("t1").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_public_tracks_newest_first() {
        let mock_server = MockServer::start().await;

        let public = |id: &str, created_at: &str| {
            json!({
                "id": id,
                "title": format!("Track {}", id),
                "creator": {"id": "u1", "name": "Ada"},
                "articles_count": 3,
                "created_at": created_at,
                "participant_count": 4
            })
        };

        Mock::given(method("GET"))
            .and(path("/api/explore/tracks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                public("old", "2023-01-01T00:00:00"),
                public("new", "2024-06-01T00:00:00"),
            ])))
            .mount(&mock_server)
            .await;

        let fixture = create_test_client(&mock_server);
        let tracks = fixture.client.list_public_tracks().await.unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, "new");
        assert_eq!(tracks[0].creator.name, "Ada");
        assert!(!tracks[0].is_joined);
    }

    #[tokio::test]
    async fn test_user_profile_display_name() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/user/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u1",
                "email": "ada@example.com"
            })))
            .mount(&mock_server)
            .await;

        let fixture = create_test_client(&mock_server);
        let profile = fixture.client.user_profile().await.unwrap();
        assert_eq!(profile.display_name(), "ada");
    }

    #[tokio::test]
    async fn test_health_check() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "healthy",
                "service": "learning-tracks-api"
            })))
            .mount(&mock_server)
            .await;

        let fixture = create_test_client(&mock_server);
        assert_eq!(fixture.client.name(), "tracks");
        assert!(fixture.client.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_sign_out_drops_session() {
        let mock_server = MockServer::start().await;
        let fixture = create_test_client(&mock_server);

        fixture.client.sign_out().await.unwrap();

        assert!(fixture.store.current_session().await.unwrap().is_none());
        let err = fixture.client.list_tracks().await.unwrap_err();
        assert!(err.requires_login());
    }
}
