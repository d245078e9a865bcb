use crate::tracing_config::{LogFormat, init_tracing};

#[test]
fn log_format_names() {
    assert_eq!(LogFormat::parse("tree"), LogFormat::Tree);
    assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
    assert_eq!(LogFormat::parse("text"), LogFormat::Text);
    assert_eq!(LogFormat::parse("bogus"), LogFormat::Text);
}

#[test]
fn init_tracing_can_run_twice() {
    init_tracing();
    init_tracing();
}
