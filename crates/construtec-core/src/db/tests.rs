//! Database tests

use super::*;
use crate::error::Error;
use crate::models::{Category, Role};

#[test]
fn test_in_memory_db() {
    let db = Database::in_memory().unwrap();
    assert!(db.list_sessions("nobody").unwrap().is_empty());
}

#[test]
fn test_schema_has_category_column() {
    let db = Database::in_memory().unwrap();
    let conn = db.conn().unwrap();
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('messages') WHERE name IN ('id', 'session_id', 'role', 'content', 'category', 'created_at')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 6);
}

#[test]
fn test_user_signup_and_signin() {
    let db = Database::in_memory().unwrap();
    let user = db.create_user("ana@obra.pt", "segredo123").unwrap();
    assert_eq!(user.email, "ana@obra.pt");

    let found = db.verify_user("ANA@obra.pt", "segredo123").unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id.clone()));

    assert!(db.verify_user("ana@obra.pt", "errada").unwrap().is_none());
    assert!(db.verify_user("rui@obra.pt", "segredo123").unwrap().is_none());
}

#[test]
fn test_duplicate_email_rejected() {
    let db = Database::in_memory().unwrap();
    db.create_user("ana@obra.pt", "segredo123").unwrap();
    let err = db.create_user("ana@obra.pt", "outra-senha").unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
}

#[test]
fn test_weak_credentials_rejected() {
    let db = Database::in_memory().unwrap();
    assert!(matches!(db.create_user("sem-arroba", "segredo123"), Err(Error::Auth(_))));
    assert!(matches!(db.create_user("a@b.pt", "123"), Err(Error::Auth(_))));
}

#[test]
fn test_token_lifecycle() {
    let db = Database::in_memory().unwrap();
    let user = db.create_user("ana@obra.pt", "segredo123").unwrap();

    let token = db.create_token(&user.id).unwrap();
    let stored: String = db
        .conn()
        .unwrap()
        .query_row("SELECT token_hash FROM auth_tokens", [], |row| row.get(0))
        .unwrap();
    assert_ne!(stored, token);
    assert_eq!(stored.len(), 64);

    assert_eq!(db.user_for_token(&token).unwrap().unwrap().id, user.id);
    assert!(db.revoke_token(&token).unwrap());
    assert!(db.user_for_token(&token).unwrap().is_none());
    assert!(!db.revoke_token(&token).unwrap());
}

#[test]
fn test_ensure_user_is_idempotent() {
    let db = Database::in_memory().unwrap();
    let first = db.ensure_user("local", "local@construtec").unwrap();
    let second = db.ensure_user("local", "local@construtec").unwrap();
    assert_eq!(first, second);
    // No password was set, so password sign-in never succeeds
    assert!(db.verify_user("local@construtec", "").unwrap().is_none());
}

#[test]
fn test_history_roundtrip_and_ordering() {
    let db = Database::in_memory().unwrap();

    let first = db.create_session("u1", "tijolo", "closed").unwrap();
    let second = db.create_session("u1", "cimento", "closed").unwrap();
    db.create_session("u2", "outro utilizador", "closed").unwrap();

    let sessions = db.list_sessions("u1").unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, second);
    assert_eq!(sessions[1].id, first);
    assert_eq!(sessions[1].title.as_deref(), Some("tijolo"));
    assert_eq!(sessions[1].status, "closed");

    db.append_message(&first, Role::User, "tijolo", Some(Category::Materiais))
        .unwrap();
    db.append_message(&first, Role::Assistant, "[]", Some(Category::Materiais))
        .unwrap();
    db.append_message(&first, Role::Assistant, "antigo", None)
        .unwrap();

    let messages = db.list_messages("u1", &first).unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].content, "[]");
    assert_eq!(messages[1].category, Some(Category::Materiais));
    assert_eq!(messages[2].category, None);
}

#[test]
fn test_history_is_scoped_to_owner() {
    let db = Database::in_memory().unwrap();
    let session = db.create_session("u1", "tijolo", "closed").unwrap();

    assert!(matches!(db.list_messages("u2", &session), Err(Error::NotFound(_))));
    assert!(matches!(db.delete_session("u2", &session), Err(Error::NotFound(_))));
    assert_eq!(db.list_sessions("u1").unwrap().len(), 1);
}

#[test]
fn test_delete_session_cascades() {
    let db = Database::in_memory().unwrap();
    let session = db.create_session("u1", "tijolo", "closed").unwrap();
    db.append_message(&session, Role::User, "tijolo", None).unwrap();

    db.delete_session("u1", &session).unwrap();
    assert!(db.list_sessions("u1").unwrap().is_empty());

    let orphans: i64 = db
        .conn()
        .unwrap()
        .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
        .unwrap();
    assert_eq!(orphans, 0);
}
