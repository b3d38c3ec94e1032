use std::collections::BTreeMap;
use std::time::Duration;

use spanwire::{RawSpan, Recorder, RemoteCollector, SpanContext, SpanId};
use time::OffsetDateTime;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // Connect to a collector (e.g. `nc -l 7701` to watch the raw frames)
    let collector = RemoteCollector::connect("127.0.0.1:7701");
    let recorder = Recorder::new(collector.clone());

    println!("Recording 10 test spans...");
    for i in 0..10 {
        let start = OffsetDateTime::now_utc();

        // Simulate some work
        tokio::time::sleep(Duration::from_millis(100)).await;

        let id = SpanId::new_root();
        recorder.record_span(&RawSpan {
            context: SpanContext {
                trace_id: id.trace,
                span_id: id.span,
                parent_span_id: id.parent,
                sampled: true,
                baggage: BTreeMap::new(),
            },
            operation_name: "test_span".to_string(),
            start_time: start,
            duration: Duration::from_millis(100),
            tags: BTreeMap::from([("iteration".to_string(), i.to_string())]),
        });
        println!("  recorded span {}/10", i + 1);
    }

    // Wait for the pending batch to flush.
    tokio::time::sleep(Duration::from_secs(1)).await;
    println!("Done, {} packets still pending.", collector.pending());
}
