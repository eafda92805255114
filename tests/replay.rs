use std::fs;
use std::path::Path;
use std::time::Duration;

use callscreen::background::BackgroundStyle;
use callscreen::config::ProfileStore;
use callscreen::corner::Corner;
use callscreen::script::{self, JsonLinesPresenter, Script};
use callscreen::slots::Role;

fn demo() -> Script {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/two_party.toml");
    Script::load(&path).unwrap()
}

#[test]
fn demo_call_ends_clean() {
    let dir = tempfile::tempdir().unwrap();
    let store = ProfileStore::open(dir.path()).unwrap();
    let screen = script::replay(&demo(), store.profile.clone(), JsonLinesPresenter::new(Vec::new()));

    assert_eq!(screen.now(), Duration::from_millis(6000));
    assert_eq!(screen.roles().expanded, None);
    assert!(!screen.video_available(Role::Incoming));
    assert!(!screen.video_available(Role::Outgoing));
    assert_eq!(screen.background(), BackgroundStyle::Neutral);
    assert_eq!(screen.transport().released.len(), 2);

    let snap = screen.snapshot();
    // flung left from the bottom-right rest
    assert_eq!(snap.pip_corner, Corner::BottomLeft);
    assert_eq!(snap.pip_fraction, 0.0);
    assert!(snap.chrome_visible);
}

#[test]
fn demo_output_is_json_lines() {
    let screen = script::replay(
        &demo(),
        ProfileStore::open(tempfile::tempdir().unwrap().path())
            .unwrap()
            .profile,
        JsonLinesPresenter::new(Vec::new()),
    );
    let relayouts = screen.presenter().relayouts;
    let text = String::from_utf8(screen.into_presenter().into_inner()).unwrap();

    let events: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let count = events.iter().filter(|e| e["event"] == "relayout").count();
    assert_eq!(count, relayouts);

    let fades: Vec<_> = events
        .iter()
        .filter(|e| e["event"] == "background")
        .map(|e| e["to"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fades, ["good", "degraded", "neutral"]);

    // the pull-down is tracked immediately, the release springs
    let hints: Vec<_> = events
        .iter()
        .filter(|e| e["event"] == "relayout")
        .map(|e| e["layout"]["transition"].as_str().unwrap().to_string())
        .collect();
    assert!(hints.iter().any(|h| h == "immediate"));
    assert!(hints.iter().any(|h| h == "spring"));
}

#[test]
fn custom_profile_changes_settle_delay() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ProfileStore::open(dir.path()).unwrap();
    fs::write(
        store.profiles_dir.join("slow.toml"),
        "[meta]\nname = \"slow\"\n\n[timing]\nincoming_settle_ms = 1000\n",
    )
    .unwrap();
    store.set_active("slow").unwrap();

    let text = r#"
        [[step]]
        at_ms = 0
        kind = "call"
        phase = "active"
        remote_video = "active"

        [[step]]
        at_ms = 10
        kind = "view_created"
        role = "incoming"

        [[step]]
        at_ms = 20
        kind = "first_frame"
        role = "incoming"

        [[step]]
        at_ms = 900
        kind = "interaction"
    "#;
    let script = Script::parse(text).unwrap();
    let screen = script::replay(&script, store.profile.clone(), JsonLinesPresenter::new(Vec::new()));
    assert!(!screen.video_available(Role::Incoming));

    let screen = script::replay(
        &Script {
            until_ms: Some(1020),
            ..script
        },
        store.profile,
        JsonLinesPresenter::new(Vec::new()),
    );
    assert!(screen.video_available(Role::Incoming));
}
