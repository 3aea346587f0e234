use cloud_deck::api::MockApiClientTrait;
use cloud_deck::app::App;
use cloud_deck::types::InputMode;
use cloud_deck::ui::{handle_edit_input, handle_normal_input};
use crossterm::event::{KeyCode, KeyModifiers};

fn create_test_app() -> App {
    let mock_client = MockApiClientTrait::new();
    App::new(Box::new(mock_client), false)
}

#[tokio::test]
async fn test_handle_normal_input_toggle_help() {
    let mut app = create_test_app();
    assert!(!app.show_help);

    handle_normal_input(&mut app, KeyCode::Char('h'), KeyModifiers::NONE)
        .await
        .unwrap();
    assert!(app.show_help);

    handle_normal_input(&mut app, KeyCode::Char('h'), KeyModifiers::NONE)
        .await
        .unwrap();
    assert!(!app.show_help);
}

#[tokio::test]
async fn test_handle_normal_input_quit_clears_liveness() {
    let mut app = create_test_app();
    assert!(app.alive);

    handle_normal_input(&mut app, KeyCode::Char('q'), KeyModifiers::NONE)
        .await
        .unwrap();
    assert!(!app.alive);
}

#[tokio::test]
async fn test_handle_normal_input_escape_from_manual_input() {
    let mut app = create_test_app();
    app.start_manual_input("search");
    assert!(app.manual_input_active);

    // Editing mode routes Esc through the edit handler; the normal handler
    // still has to cope with a stale manual input flag.
    handle_normal_input(&mut app, KeyCode::Esc, KeyModifiers::NONE)
        .await
        .unwrap();
    assert!(!app.manual_input_active);
}

#[tokio::test]
async fn test_handle_normal_input_opens_and_closes_drawer() {
    let mut app = create_test_app();

    handle_normal_input(&mut app, KeyCode::Char('b'), KeyModifiers::NONE)
        .await
        .unwrap();
    assert!(app.store.backups.open);

    handle_normal_input(&mut app, KeyCode::Esc, KeyModifiers::NONE)
        .await
        .unwrap();
    assert!(!app.store.backups.open);
}

#[tokio::test]
async fn test_handle_normal_input_auto_enroll_only_in_drawer() {
    let mut app = create_test_app();

    handle_normal_input(&mut app, KeyCode::Char('a'), KeyModifiers::NONE)
        .await
        .unwrap();
    assert!(!app.store.backups.auto_enroll);

    app.open_backup_drawer();
    handle_normal_input(&mut app, KeyCode::Char('a'), KeyModifiers::NONE)
        .await
        .unwrap();
    assert!(app.store.backups.auto_enroll);
}

#[tokio::test]
async fn test_handle_edit_input_char_and_backspace() {
    let mut app = create_test_app();
    app.start_manual_input("search");

    handle_edit_input(&mut app, KeyCode::Char('a')).await.unwrap();
    assert_eq!(app.manual_input_buffer, "a");
    assert_eq!(app.search_query, "a");

    handle_edit_input(&mut app, KeyCode::Char('b')).await.unwrap();
    assert_eq!(app.manual_input_buffer, "ab");
    assert_eq!(app.search_query, "ab");

    handle_edit_input(&mut app, KeyCode::Backspace).await.unwrap();
    assert_eq!(app.manual_input_buffer, "a");
    assert_eq!(app.search_query, "a");

    handle_edit_input(&mut app, KeyCode::Backspace).await.unwrap();
    assert_eq!(app.manual_input_buffer, "");
    assert_eq!(app.search_query, "");
}

#[tokio::test]
async fn test_handle_edit_input_escape() {
    let mut app = create_test_app();
    app.start_manual_input("search");
    app.manual_input_buffer = "some text".to_string();

    handle_edit_input(&mut app, KeyCode::Esc).await.unwrap();
    assert!(!app.manual_input_active);
    assert_eq!(app.input_mode, InputMode::Normal);
    assert!(app.manual_input_buffer.is_empty());
}

#[tokio::test]
async fn test_cancel_alert_consumes_input() {
    let mut app = create_test_app();
    app.cancel_backups_alert_open = true;

    // Keys other than confirm/dismiss are swallowed while the alert is up.
    handle_normal_input(&mut app, KeyCode::Char('h'), KeyModifiers::NONE)
        .await
        .unwrap();
    assert!(!app.show_help);
    assert!(app.cancel_backups_alert_open);

    handle_normal_input(&mut app, KeyCode::Esc, KeyModifiers::NONE)
        .await
        .unwrap();
    assert!(!app.cancel_backups_alert_open);
}
