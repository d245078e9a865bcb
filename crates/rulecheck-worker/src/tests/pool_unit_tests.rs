use super::*;

const WINDOW: Duration = Duration::from_millis(1000);

fn at(start: Instant, ms: u64) -> Instant {
    start + Duration::from_millis(ms)
}

#[test]
fn within_window_restarts_on_quick_repeat() {
    let mut policy = RestartPolicy::new(RestartMode::WithinWindow, WINDOW);
    let t0 = Instant::now();
    assert!(!policy.observe("/p/a.js", t0));
    assert!(!policy.observe("/p/b.js", at(t0, 100)));
    assert!(policy.observe("/p/a.js", at(t0, 500)));
    // The restart forgot `b.js`.
    assert!(!policy.observe("/p/b.js", at(t0, 600)));
    // `a.js` was last seen at 500ms.
    assert!(!policy.observe("/p/a.js", at(t0, 1600)));
}

#[test]
fn within_window_forgets_expired_requests() {
    let mut policy = RestartPolicy::new(RestartMode::WithinWindow, WINDOW);
    let t0 = Instant::now();
    assert!(!policy.observe("/p/a.js", t0));
    assert!(!policy.observe("/p/a.js", at(t0, 2500)));
    assert!(policy.observe("/p/a.js", at(t0, 2600)));
}

#[test]
fn after_window_restarts_once_the_address_is_armed() {
    let mut policy = RestartPolicy::new(RestartMode::AfterWindow, WINDOW);
    let t0 = Instant::now();
    assert!(!policy.observe("/p/a.js", t0));
    assert!(!policy.observe("/p/a.js", at(t0, 500)));
    assert!(policy.observe("/p/a.js", at(t0, 1200)));
    assert!(!policy.observe("/p/a.js", at(t0, 1300)));
    assert!(policy.observe("/p/a.js", at(t0, 2200)));
}

#[test]
fn reset_forgets_everything() {
    let mut policy = RestartPolicy::new(RestartMode::WithinWindow, WINDOW);
    let t0 = Instant::now();
    policy.observe("/p/a.js", t0);
    policy.reset();
    assert!(!policy.observe("/p/a.js", at(t0, 10)));
}
