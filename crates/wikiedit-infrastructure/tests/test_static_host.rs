use wikiedit_core::config::UserPreferences;
use wikiedit_core::host::HostEnvironment;
use wikiedit_core::remote::UserIdentity;
use wikiedit_core::session::PageMetadata;
use wikiedit_infrastructure::StaticHost;

fn metadata() -> PageMetadata {
    PageMetadata {
        title: "Test".to_string(),
        exists: true,
        current_revision_id: Some(100),
        ..Default::default()
    }
}

#[test]
fn test_builders_shape_host() {
    let host = StaticHost::new(metadata())
        .with_preferences(UserPreferences {
            edit_on_double_click: true,
            ..Default::default()
        })
        .with_local_notices(vec!["Local notice".to_string()])
        .with_classic_editor()
        .with_preset_summary("typo");

    assert_eq!(host.page_metadata().current_revision_id, Some(100));
    assert!(host.has_classic_editor());
    assert_eq!(host.local_notices(), vec!["Local notice"]);
    assert_eq!(host.preset_summary().as_deref(), Some("typo"));
    assert!(host.edit_on_double_click());
}

#[test]
fn test_records_session_side_effects() {
    let host = StaticHost::new(metadata());
    assert!(!host.handlers_bound());

    host.bind_handlers();
    host.set_edit_on_double_click(false);
    host.set_user(UserIdentity::Registered {
        id: 3,
        name: "Other".to_string(),
    });
    assert!(host.handlers_bound());
    assert_eq!(host.user().name(), Some("Other"));

    host.unbind_handlers();
    assert!(!host.handlers_bound());
}
