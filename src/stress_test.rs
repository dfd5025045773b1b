use arbor_core::{Mark, Node, NodeId};
use arbor_sdk::{Editor, EditorConfig, LockConfigBuilder};
use arbor_store::{NodeStore, StoreConfigBuilder, TextRange, TraversalOptions};
use async_stream::stream;
use futures::stream::Stream;
use futures::stream::StreamExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};

const WORDS: &[&str] = &["lorem", "ipsum", "dolor", "sit", "amet", " ", "tree", "node"];

/// Statistics collected during stress testing
#[derive(Clone, Debug)]
pub struct StressTestStats {
    pub num_writers: usize,
    pub batches_per_writer: usize,
    pub total_operations: usize,
    pub failed_batches: usize,
    pub final_nodes: usize,
    pub total_time: Duration,
    pub avg_batch_time: Duration,
    pub mean_lock_wait: Duration,
    pub lock_timeouts: u64,
    pub ops_per_second: f64,
}

impl StressTestStats {
    pub fn print(&self) {
        println!("\n╔════════════════════════════════════════════════════════════╗");
        println!("║              Stress Test Statistics                         ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║  Number of Writers:         {:>38} ║", self.num_writers);
        println!("║  Batches per Writer:        {:>38} ║", self.batches_per_writer);
        println!("║  Committed Operations:      {:>38} ║", self.total_operations);
        println!("║  Failed Batches:            {:>38} ║", self.failed_batches);
        println!("║  Final Node Count:          {:>38} ║", self.final_nodes);
        println!("║  Total Time:                {:>39}s ║", format!("{:.3}", self.total_time.as_secs_f64()));
        println!("║  Average Batch Time:        {:>36}µs ║", self.avg_batch_time.as_micros());
        println!("║  Mean Lock Wait:            {:>36}µs ║", self.mean_lock_wait.as_micros());
        println!("║  Lock Timeouts:             {:>38} ║", self.lock_timeouts);
        println!("║  Operations/Second:         {:>38.0} ║", self.ops_per_second);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

/// One randomly planned edit; the target node is resolved inside the batch.
#[derive(Clone, Copy, Debug)]
enum Edit {
    Insert { pick: usize, offset: usize, word: &'static str },
    Delete { pick: usize, start: usize, len: usize },
    Bold { pick: usize, start: usize, len: usize },
    Split { pick: usize, offset: usize },
    Paragraph { word: &'static str },
}

/// Generator that yields random edits for one writer
fn edit_generator(num_edits: usize) -> impl Stream<Item = Edit> {
    stream! {
        let mut rng = StdRng::from_entropy();
        for _ in 0..num_edits {
            let pick = rng.gen_range(0..usize::MAX);
            let offset = rng.gen_range(0..64);
            let len = rng.gen_range(1..8);
            let word = WORDS[rng.gen_range(0..WORDS.len())];
            yield match rng.gen_range(0..100) {
                0..=44 => Edit::Insert { pick, offset, word },
                45..=64 => Edit::Delete { pick, start: offset, len },
                65..=84 => Edit::Bold { pick, start: offset, len },
                85..=92 => Edit::Split { pick, offset },
                _ => Edit::Paragraph { word },
            };
        }
    }
}

/// Resolve a pick to one of the document's paragraphs and its text length.
fn target(store: &NodeStore, paragraphs: &[NodeId], pick: usize) -> Option<(NodeId, usize)> {
    let id = paragraphs.get(pick % paragraphs.len().max(1))?.clone();
    let len = store.node(id.as_str())?.text_len();
    Some((id, len))
}

fn apply_edit(store: &mut NodeStore, doc: &NodeId, edit: Edit) -> arbor_store::Result<()> {
    let paragraphs = store.get_node(doc.as_str()).map(|n| n.content).unwrap_or_default();

    match edit {
        Edit::Insert { pick, offset, word } => {
            if let Some((id, len)) = target(store, &paragraphs, pick) {
                store.insert_text(id.as_str(), offset % (len + 1), word);
            }
        }
        Edit::Delete { pick, start, len: span } => {
            if let Some((id, len)) = target(store, &paragraphs, pick) {
                let start = start % (len + 1);
                store.delete_text(&TextRange::within(id, start, (start + span).min(len)));
            }
        }
        Edit::Bold { pick, start, len: span } => {
            if let Some((id, len)) = target(store, &paragraphs, pick) {
                let start = start % (len + 1);
                let range = TextRange::within(id, start, (start + span).min(len));
                store.apply_mark(&range, &Mark::new("bold"));
            }
        }
        Edit::Split { pick, offset } => {
            if let Some((id, len)) = target(store, &paragraphs, pick) {
                if len > 1 {
                    store.split_text_node(id.as_str(), offset % len)?;
                }
            }
        }
        Edit::Paragraph { word } => {
            store.add_child(doc.as_str(), Node::text_node("paragraph", word), None)?;
        }
    }
    Ok(())
}

fn new_editor(lock_wait: Duration) -> (Arc<Editor>, NodeId) {
    let mut store = NodeStore::with_config(StoreConfigBuilder::new().session_id("stress").build());
    let doc = store
        .create_node(Node::new("doc"))
        .and_then(|doc| {
            store.add_child(doc.as_str(), Node::text_node("paragraph", "seed"), None)?;
            Ok(doc)
        })
        .unwrap_or_default();
    let config = EditorConfig {
        owner_prefix: "stress".to_string(),
        lock: LockConfigBuilder::new().wait_timeout(lock_wait).build(),
        ..EditorConfig::default()
    };
    (Arc::new(Editor::with_config(store, config)), doc)
}

/// Concurrent writers contending on the mutation lock, each committing a
/// stream of random edit batches
pub async fn stress_test_editing(num_writers: usize, batches_per_writer: usize) -> StressTestStats {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Concurrent Editing Stress Test                      ║");
    println!("║  Writers: {} | Batches/Writer: {} ║", num_writers, batches_per_writer);
    println!("╚════════════════════════════════════════════════════════════╝");

    let start = Instant::now();
    let (editor, doc) = new_editor(Duration::from_secs(5));

    println!("\n[Phase 1/2] Writers committing batches...");

    let mut handles = vec![];
    for idx in 0..num_writers {
        let editor = Arc::clone(&editor);
        let doc = doc.clone();
        let handle = tokio::spawn(async move {
            let owner = format!("writer_{}", idx);
            let mut edits = Box::pin(edit_generator(batches_per_writer));
            let mut batch_times = Vec::with_capacity(batches_per_writer);
            let mut operations = 0;
            let mut failures = 0;
            while let Some(edit) = edits.next().await {
                let batch_start = Instant::now();
                let doc = doc.clone();
                match editor.batch(&owner, move |store| apply_edit(store, &doc, edit)).await {
                    Ok(((), ops)) => operations += ops.len(),
                    Err(err) => {
                        tracing::warn!(%owner, error = %err, "batch failed");
                        failures += 1;
                    }
                }
                batch_times.push(batch_start.elapsed());
            }
            (batch_times, operations, failures)
        });
        handles.push(handle);
    }

    let mut batch_times = vec![];
    let mut total_operations = 0;
    let mut failed_batches = 0;
    for handle in handles {
        match handle.await {
            Ok((times, ops, failures)) => {
                batch_times.extend(times);
                total_operations += ops;
                failed_batches += failures;
            }
            Err(err) => tracing::warn!(error = %err, "writer task failed"),
        }
    }

    println!("[Phase 1/2] ✓ Completed");
    println!("[Phase 2/2] Walking the document...");

    let (final_nodes, text_chars) = editor.read(|store| {
        let text: usize = store
            .traverse(TraversalOptions::new().filter(|n: &Node| n.is_text_bearing()))
            .map(|n| n.text_len())
            .sum();
        (store.node_count(), text)
    });
    tracing::info!(final_nodes, text_chars, "document walked");

    let total_time = start.elapsed();

    let avg_batch_time = if !batch_times.is_empty() {
        batch_times.iter().sum::<Duration>() / batch_times.len() as u32
    } else {
        Duration::ZERO
    };
    let lock_stats = editor.lock().stats();
    let ops_per_second = total_operations as f64 / total_time.as_secs_f64();

    println!("[Phase 2/2] ✓ Completed");

    StressTestStats {
        num_writers,
        batches_per_writer,
        total_operations,
        failed_batches,
        final_nodes,
        total_time,
        avg_batch_time,
        mean_lock_wait: lock_stats.mean_wait,
        lock_timeouts: lock_stats.timeouts,
        ops_per_second,
    }
}

/// Lock contention with a wait timeout short enough that some writers give up
pub async fn stress_test_contention(num_writers: usize) -> StressTestStats {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║        Lock Contention Test (short wait timeout)           ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let start = Instant::now();
    let (editor, doc) = new_editor(Duration::from_millis(20));

    let mut handles = vec![];
    for idx in 0..num_writers {
        let editor = Arc::clone(&editor);
        let doc = doc.clone();
        handles.push(tokio::spawn(async move {
            let owner = format!("slow_{}", idx);
            let holder = editor.lock().acquire(owner.as_str()).await?;
            tokio::time::sleep(Duration::from_millis(5)).await;
            editor.lock().release(&holder.lock_id)?;
            editor
                .batch(&owner, move |store| {
                    apply_edit(store, &doc, Edit::Paragraph { word: "late" })
                })
                .await
        }));
    }

    let mut total_operations = 0;
    let mut failed_batches = 0;
    for handle in handles {
        match handle.await {
            Ok(Ok(((), ops))) => total_operations += ops.len(),
            Ok(Err(err)) => {
                tracing::debug!(error = %err, "writer gave up");
                failed_batches += 1;
            }
            Err(err) => tracing::warn!(error = %err, "writer task failed"),
        }
    }

    let total_time = start.elapsed();
    let lock_stats = editor.lock().stats();
    StressTestStats {
        num_writers,
        batches_per_writer: 1,
        total_operations,
        failed_batches,
        final_nodes: editor.read(|store| store.node_count()),
        total_time,
        avg_batch_time: total_time / num_writers.max(1) as u32,
        mean_lock_wait: lock_stats.mean_wait,
        lock_timeouts: lock_stats.timeouts,
        ops_per_second: total_operations as f64 / total_time.as_secs_f64(),
    }
}

/// Stress test comparing different writer counts
pub async fn stress_test_scaling(max_writers: usize, step_size: usize) {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║      Scaling Analysis - Batch Latency vs Writers          ║");
    println!("╚════════════════════════════════════════════════════════════╝");

    let mut current_writers = step_size;
    while current_writers <= max_writers {
        let stats = stress_test_editing(current_writers, 50).await;
        stats.print();
        current_writers += step_size;
    }
}
