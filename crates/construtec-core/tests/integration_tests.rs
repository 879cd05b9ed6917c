//! Integration tests for construtec-core
//!
//! These tests exercise the full search → persist → browse history workflow
//! through the public API, with the mock AI backend and a throwaway database.

use std::sync::Arc;
use std::time::Duration;

use construtec_core::{
    auth::{AuthProvider, LocalAuth, SignUpOutcome},
    history::{rehydrate, save_interaction, HistoryStore},
    table::TableState,
    AIClient, Advisor, Category, DataType, Database, MockBackend, PromptLibrary, StructuredData,
    UserSession,
};

fn advisor(mock: MockBackend) -> Advisor {
    Advisor::new(
        AIClient::Mock(mock),
        Arc::new(PromptLibrary::embedded_only()),
        Duration::from_secs(5),
    )
}

async fn signed_in(db: &Database) -> UserSession {
    let auth = LocalAuth::new(db.clone());
    match auth.sign_up("ana@obra.pt", "segredo123").await.unwrap() {
        SignUpOutcome::SignedIn(session) => session,
        other => panic!("expected a session, got {:?}", other),
    }
}

// =============================================================================
// Search → history round-trip
// =============================================================================

#[tokio::test]
async fn test_materials_search_is_saved_and_rehydrated() {
    let db = Database::in_memory().expect("Failed to create database");
    let user = signed_in(&db).await;

    let outcome = advisor(MockBackend::new())
        .search("tijolo 30x20", Category::Materiais)
        .await;
    assert_eq!(outcome.message.data_type, DataType::Materiais);
    let live = outcome.message.data.clone().expect("table data");
    assert_eq!(live.len(), 2);

    let result = outcome.result.expect("successful search");
    save_interaction(&db, &user, "tijolo 30x20", Category::Materiais, &result)
        .await
        .expect("Failed to save");

    let sessions = HistoryStore::list_sessions(&db, &user).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].title.as_deref(), Some("tijolo 30x20"));

    let stored = HistoryStore::list_messages(&db, &user, &sessions[0].id)
        .await
        .unwrap();
    let messages: Vec<_> = stored.iter().map(rehydrate).collect();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content.as_deref(), Some("tijolo 30x20"));
    assert_eq!(messages[1].data.as_ref(), Some(&live));
    assert_eq!(messages[1].data_type, DataType::Materiais);
}

#[tokio::test]
async fn test_legacy_rows_without_category_are_detected() {
    let db = Database::in_memory().unwrap();
    let user = signed_in(&db).await;

    let outcome = advisor(MockBackend::new())
        .search("canalizador Porto", Category::Empresas)
        .await;
    let json = outcome.message.data.unwrap().to_json().unwrap();

    // Rows written by an older client carry no category
    let session = db.create_session(&user.user_id, "canalizador Porto", "closed").unwrap();
    db.append_message(&session, construtec_core::Role::Assistant, &json, None)
        .unwrap();

    let stored = db.list_messages(&user.user_id, &session).unwrap();
    let message = rehydrate(&stored[0]);
    assert_eq!(message.data_type, DataType::Empresas);
    assert!(message.content.is_none());
}

#[tokio::test]
async fn test_prose_search_round_trip() {
    let db = Database::in_memory().unwrap();
    let user = signed_in(&db).await;

    let outcome = advisor(MockBackend::new())
        .search("isolamento fachada", Category::Solucoes)
        .await;
    let text = outcome.message.content.clone().unwrap();
    assert!(text.contains("ETICS"));

    save_interaction(&db, &user, "isolamento fachada", Category::Solucoes, &outcome.result.unwrap())
        .await
        .unwrap();
    let sessions = HistoryStore::list_sessions(&db, &user).await.unwrap();
    let stored = HistoryStore::list_messages(&db, &user, &sessions[0].id)
        .await
        .unwrap();
    assert_eq!(rehydrate(&stored[1]).content.as_deref(), Some(text.as_str()));
}

#[tokio::test]
async fn test_history_is_private_per_user() {
    let db = Database::in_memory().unwrap();
    let ana = signed_in(&db).await;
    let rui = match LocalAuth::new(db.clone())
        .sign_up("rui@obra.pt", "segredo456")
        .await
        .unwrap()
    {
        SignUpOutcome::SignedIn(session) => session,
        other => panic!("unexpected {:?}", other),
    };

    let outcome = advisor(MockBackend::new()).search("cimento", Category::Materiais).await;
    let session_id = save_interaction(&db, &ana, "cimento", Category::Materiais, &outcome.result.unwrap())
        .await
        .unwrap();

    assert!(HistoryStore::list_sessions(&db, &rui).await.unwrap().is_empty());
    assert!(HistoryStore::list_messages(&db, &rui, &session_id).await.is_err());

    HistoryStore::delete_session(&db, &ana, &session_id).await.unwrap();
    assert!(HistoryStore::list_sessions(&db, &ana).await.unwrap().is_empty());
}

// =============================================================================
// Table view over a live result
// =============================================================================

#[tokio::test]
async fn test_table_view_over_search_result() {
    let outcome = advisor(MockBackend::new()).search("tijolo", Category::Materiais).await;
    let data = outcome.message.data.unwrap();

    let mut state = TableState::default();
    state.request_sort("preco_numerico");
    state.request_sort("preco_numerico");
    let sorted = state.apply(&data);
    match &sorted {
        StructuredData::Materials(rows) => assert!(rows[0].preco_numerico >= rows[1].preco_numerico),
        other => panic!("expected materials, got {:?}", other),
    }

    state.filter = "maxmat".into();
    assert_eq!(state.apply(&data).len(), 1);
}

#[tokio::test]
async fn test_failed_search_is_prose_with_hint() {
    let outcome = advisor(MockBackend::new().failing("503 Service Unavailable"))
        .search("tijolo", Category::Materiais)
        .await;
    assert!(outcome.result.is_none());
    let content = outcome.message.content.unwrap();
    assert!(content.starts_with("### Erro na Pesquisa"));
    assert!(content.contains("503 Service Unavailable"));
    assert_eq!(outcome.message.data_type, DataType::Text);
}
