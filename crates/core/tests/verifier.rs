mod support;

use std::time::Duration;

use shopwatch_core::config::{OverlayConfig, VerifierConfig};
use shopwatch_core::verifier::SignalKind;
use shopwatch_core::{ActionPlan, ActionVerifier, OverlayDismisser, Signal};
use support::ScriptedSession;

const TRIGGER: &str = "button[name=\"add\"]";
const BADGE: &str = "[data-cart-count]";

fn fast_verifier() -> ActionVerifier {
    ActionVerifier::new(VerifierConfig {
        quiescence_ceiling_ms: 0,
        click_timeout_ms: 100,
        poll_interval_ms: 1,
        signal_timeout_ms: 0,
    })
}

fn fast_overlay(max_attempts: u32) -> OverlayDismisser {
    OverlayDismisser::new(OverlayConfig {
        max_attempts,
        probe_timeout_ms: 10,
        click_timeout_ms: 10,
        settle_ms: 0,
        retry_delay_ms: 0,
        appear_timeout_ms: 0,
        ..OverlayConfig::default()
    })
}

fn plan(signals: Vec<Signal>) -> ActionPlan {
    ActionPlan {
        name: "add-to-cart".to_string(),
        description: String::new(),
        trigger: TRIGGER.to_string(),
        signals,
        quiescence_ceiling_ms: None,
    }
}

fn badge_signal() -> Signal {
    Signal::IndicatorChange { selector: BADGE.to_string(), timeout_ms: None }
}

/// Add-to-cart confirmed purely by the cart badge incrementing
#[tokio::test]
async fn indicator_increment_confirms_action() {
    let session = ScriptedSession::new("https://shop.example/products/tee").texts(BADGE, &[Some("0"), Some("1")]);

    let outcome = fast_verifier().verify(&session, &plan(vec![badge_signal()])).await;

    assert!(outcome.success);
    assert!(outcome.triggered);
    assert_eq!(session.clicks(), vec![TRIGGER.to_string()]);
    let check = outcome.fired_signal().expect("a signal fired");
    assert_eq!(check.before.as_deref(), Some("0"));
    assert_eq!(check.after.as_deref(), Some("1"));
}

/// No indicator before or after and nothing else to look at
#[tokio::test]
async fn absent_indicator_is_not_success() {
    let session = ScriptedSession::new("https://shop.example/products/tee");

    let outcome = fast_verifier().verify(&session, &plan(vec![badge_signal()])).await;

    assert!(!outcome.success);
    assert_eq!(outcome.checks.len(), 1);
    assert!(outcome.checks[0].before.is_none());
    assert!(outcome.checks[0].after.is_none());
}

#[tokio::test]
async fn navigation_requires_confirmation_element() {
    let nav = || Signal::Navigation {
        url_pattern: r"/cart(\?|$)".to_string(),
        confirm_selector: ".cart-item".to_string(),
        timeout_ms: None,
    };

    // URL matches but the cart page never rendered a line item
    let loading = ScriptedSession::new("https://shop.example/products/tee").navigate_on_click("https://shop.example/cart");
    let outcome = fast_verifier().verify(&loading, &plan(vec![nav()])).await;
    assert!(!outcome.success);
    assert_eq!(outcome.checks[0].after.as_deref(), Some("https://shop.example/cart"));

    let rendered = ScriptedSession::new("https://shop.example/products/tee")
        .navigate_on_click("https://shop.example/cart")
        .visible(".cart-item", &[true]);
    let outcome = fast_verifier().verify(&rendered, &plan(vec![nav()])).await;
    assert!(outcome.success);
    assert_eq!(outcome.fired_signal().map(|c| c.kind), Some(SignalKind::Navigation));
}

#[tokio::test]
async fn stops_at_first_fired_signal() {
    let session = ScriptedSession::new("https://shop.example/products/tee")
        .texts(BADGE, &[Some("2"), Some("3")])
        .visible("#side-cart", &[true]);

    let signals = vec![
        Signal::Navigation {
            url_pattern: "/cart".to_string(),
            confirm_selector: ".cart-item".to_string(),
            timeout_ms: None,
        },
        badge_signal(),
        Signal::TransientAffordance { selector: "#side-cart".to_string(), timeout_ms: None },
    ];

    let outcome = fast_verifier().verify(&session, &plan(signals)).await;

    assert!(outcome.success);
    assert_eq!(outcome.checks.len(), 2);
    assert_eq!(outcome.checks[1].kind, SignalKind::IndicatorChange);
    assert_eq!(session.visibility_checks("#side-cart"), 0);
}

/// A toast that is only on screen briefly must be seen even when earlier
/// signals in the plan would each wait out their full timeout
#[tokio::test]
async fn short_lived_toast_seen_behind_slow_signals() {
    let session = ScriptedSession::new("https://shop.example/products/tee")
        .texts(BADGE, &[Some("1")])
        .flashes_after_click("#toast", Duration::from_millis(500));

    let signals = vec![
        Signal::Navigation {
            url_pattern: "/cart".to_string(),
            confirm_selector: ".cart-item".to_string(),
            timeout_ms: None,
        },
        badge_signal(),
        Signal::TransientAffordance { selector: "#toast".to_string(), timeout_ms: None },
    ];

    let outcome = ActionVerifier::new(VerifierConfig::default()).verify(&session, &plan(signals)).await;

    assert!(outcome.success);
    assert_eq!(outcome.fired_signal().map(|c| c.kind), Some(SignalKind::TransientAffordance));
    assert_eq!(outcome.checks.len(), 3);
    assert!(outcome.duration_ms < 500, "took {} ms", outcome.duration_ms);
}

/// Nothing on the first look; the indicator moves while being polled
#[tokio::test]
async fn late_indicator_caught_by_polling() {
    let session = ScriptedSession::new("https://shop.example/products/tee")
        .texts(BADGE, &[Some("0"), Some("0"), Some("1")]);

    let outcome = fast_verifier().verify(&session, &plan(vec![badge_signal()])).await;

    assert!(outcome.success);
    assert_eq!(outcome.checks.len(), 1);
    assert_eq!(outcome.checks[0].after.as_deref(), Some("1"));
}

#[tokio::test]
async fn control_attribute_flip_confirms_action() {
    let session = ScriptedSession::new("https://shop.example/products/tee").attribute(
        TRIGGER,
        "aria-pressed",
        &[Some("false"), Some("true")],
    );

    let signal = Signal::ControlStateChange {
        selector: TRIGGER.to_string(),
        attribute: Some("aria-pressed".to_string()),
        expected: Some("^true$".to_string()),
        timeout_ms: None,
    };
    let outcome = fast_verifier().verify(&session, &plan(vec![signal])).await;

    assert!(outcome.success);
}

#[tokio::test]
async fn failed_click_still_checks_signals() {
    let session = ScriptedSession::new("https://shop.example/products/tee")
        .failing_clicks()
        .visible("#toast", &[true]);

    let signal = Signal::TransientAffordance { selector: "#toast".to_string(), timeout_ms: None };
    let outcome = fast_verifier().verify(&session, &plan(vec![signal])).await;

    assert!(!outcome.triggered);
    assert!(outcome.success);
}

#[tokio::test]
async fn closed_session_degrades_to_false() {
    let session = ScriptedSession::new("https://shop.example/products/tee").texts(BADGE, &[Some("0"), Some("1")]);
    session.close();

    let outcome = fast_verifier().verify(&session, &plan(vec![badge_signal()])).await;

    assert!(!outcome.success);
    assert_eq!(outcome.checks[0].detail, "session closed");
}

#[tokio::test]
async fn invalid_pattern_degrades_to_false() {
    let session = ScriptedSession::new("https://shop.example/cart").visible(".cart-item", &[true]);
    let signal = Signal::Navigation {
        url_pattern: "/cart(".to_string(),
        confirm_selector: ".cart-item".to_string(),
        timeout_ms: None,
    };

    let outcome = fast_verifier().verify(&session, &plan(vec![signal])).await;
    assert!(!outcome.success);
}

// ============================================================================
// Overlay dismissal
// ============================================================================

#[tokio::test]
async fn overlay_gone_on_third_attempt() {
    let overlay = OverlayConfig::default().overlay_selector;
    let session = ScriptedSession::new("https://shop.example/").visible(&overlay, &[true, true, false]);

    let outcome = fast_overlay(5).dismiss(&session).await;

    assert!(outcome.dismissed);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(session.visibility_checks(&overlay), 3);
    assert_eq!(session.keys(), vec!["Escape"; 3]);
}

#[tokio::test]
async fn overlay_gives_up_after_max_attempts() {
    let overlay = OverlayConfig::default().overlay_selector;
    let session = ScriptedSession::new("https://shop.example/").visible(&overlay, &[true]);

    let outcome = fast_overlay(4).dismiss(&session).await;

    assert!(!outcome.dismissed);
    assert_eq!(outcome.attempts, 4);
}

#[tokio::test]
async fn overlay_close_control_is_clicked() {
    let config = OverlayConfig::default();
    let close = config.close_selectors[0].clone();
    let session = ScriptedSession::new("https://shop.example/")
        .visible(&config.overlay_selector, &[false])
        .visible(&close, &[true]);

    let outcome = fast_overlay(5).dismiss(&session).await;

    assert!(outcome.dismissed);
    assert_eq!(session.clicks(), vec![close]);
}

#[tokio::test]
async fn overlay_that_never_appears_counts_as_dismissed() {
    let session = ScriptedSession::new("https://shop.example/");

    let outcome = fast_overlay(5).wait_and_dismiss(&session).await;

    assert!(outcome.dismissed);
    assert_eq!(outcome.attempts, 0);
    assert!(session.keys().is_empty());
}

#[tokio::test]
async fn unclickable_close_control_falls_back_to_escape() {
    let config = OverlayConfig::default();
    let close = config.close_selectors[0].clone();
    let session = ScriptedSession::new("https://shop.example/")
        .failing_clicks()
        .visible(&config.overlay_selector, &[false])
        .visible(&close, &[true]);

    let outcome = fast_overlay(5).dismiss(&session).await;

    assert!(outcome.dismissed);
    assert_eq!(outcome.attempts, 1);
    assert!(session.clicks().is_empty());
    assert_eq!(session.keys(), vec!["Escape"]);
}
