use std::sync::{Arc, Mutex};
use std::thread;

use sqlite_queue::prelude::*;

/// Submission order equals execution order equals commit order. Producers
/// take a global sequence number under a lock so the submission order is
/// known, then the stored rowid order must match it exactly.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn execution_order_matches_submission_order() -> Result<(), Box<dyn std::error::Error>> {
    let queue = SqliteQueue::open_in_memory()?;
    queue.submit_raw("CREATE TABLE tagged (seq INTEGER NOT NULL)", ParamMode::None)?;

    let next_seq = Arc::new(Mutex::new(0i64));
    let mut producers = Vec::new();
    for _ in 0..8 {
        let queue = queue.clone();
        let next_seq = Arc::clone(&next_seq);
        producers.push(thread::spawn(move || {
            for _ in 0..25 {
                // Hold the lock across the submission so the sequence number
                // really is the submission order.
                let mut guard = next_seq.lock().unwrap();
                let seq = *guard;
                *guard += 1;
                queue
                    .submit_raw(
                        "INSERT INTO tagged (seq) VALUES (?)",
                        ParamMode::Single(vec![SqlValue::Int(seq)]),
                    )
                    .unwrap();
            }
        }));
    }
    for producer in producers {
        producer.join().unwrap();
    }

    // Submitted after every insert, so FIFO guarantees it sees all of them.
    let rows = queue
        .submit_wait(
            "SELECT seq FROM tagged ORDER BY rowid",
            ParamMode::None,
            ResultOptions::rows(),
        )
        .await?
        .data
        .unwrap();
    assert_eq!(rows.len(), 200);
    for (i, row) in rows.rows.iter().enumerate() {
        assert_eq!(row.get("seq"), Some(&SqlValue::Int(i as i64)));
    }
    Ok(())
}
