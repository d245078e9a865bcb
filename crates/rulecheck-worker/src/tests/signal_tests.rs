use super::*;
use std::sync::Arc;
use std::thread;

#[test]
fn wait_returns_not_equal_when_value_already_moved() {
    let cell = SignalCell::new();
    cell.store(3);
    assert_eq!(cell.wait(0, None), WaitStatus::NotEqual);
}

#[test]
fn wait_times_out_without_notification() {
    let cell = SignalCell::new();
    let status = cell.wait(0, Some(Duration::from_millis(20)));
    assert_eq!(status, WaitStatus::TimedOut);
    assert_eq!(status.as_str(), "timed-out");
}

#[test]
fn add_wakes_a_blocked_waiter() {
    let cell = Arc::new(SignalCell::new());
    let notifier = {
        let cell = Arc::clone(&cell);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            cell.add(1)
        })
    };
    let status = cell.wait(0, None);
    assert!(matches!(status, WaitStatus::Ok | WaitStatus::NotEqual));
    assert_eq!(notifier.join().unwrap(), 0);
    assert_eq!(cell.load(), 1);
}
