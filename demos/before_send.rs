//! Wiring the throttle into an error-tracking client's pre-send hook.
//!
//! Run with `RUST_LOG=report_throttle=debug cargo run --example before_send`.

use report_throttle::{ErrorEvent, Exception, ReportThrottle};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Minimal stand-in for an error-tracking client.
struct Client<F> {
    before_send: F,
}

impl<F> Client<F>
where
    F: Fn(ErrorEvent) -> Option<ErrorEvent>,
{
    fn capture(&self, event: ErrorEvent) {
        match (self.before_send)(event) {
            Some(event) => println!("sent:    {:?}", event.primary_exception().and_then(|e| e.value.as_deref())),
            None => println!("dropped duplicate"),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let throttle = ReportThrottle::builder()
        .with_max_reports_per_window(3)
        .with_window(Duration::from_secs(60 * 60))
        .with_cleanup_interval(Duration::from_secs(15 * 60))
        .build()
        .expect("valid config");

    let client = Client {
        before_send: throttle.before_send::<ErrorEvent>(),
    };

    for attempt in 0..6 {
        let event = ErrorEvent::new().with_exception(
            Exception::new("ConnectionError", "upstream refused connection")
                .with_frame("src/db/pool.rs", 88)
                .with_frame("src/handlers/orders.rs", 41),
        );
        println!("attempt {}", attempt);
        client.capture(event);
    }

    let stats = throttle.stats();
    for error in &stats.errors {
        println!("{} seen {} times in current window", error.fingerprint, error.count);
    }

    let metrics = throttle.metrics().snapshot();
    println!(
        "admitted {}, dropped {} ({:.0}% dropped)",
        metrics.reports_admitted,
        metrics.reports_dropped,
        metrics.drop_rate() * 100.0
    );

    throttle.shutdown().await.expect("sweeper stops cleanly");
}
