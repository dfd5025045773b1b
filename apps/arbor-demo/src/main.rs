//! # Arbor Demo
//!
//! A standalone CLI walking through the Arbor node store.
//!
//! ```text
//! doc
//! ├── paragraph "Hello World"   marks: bold[0,5)
//! └── paragraph "..."
//! ```
//!
//! Edits run either directly against the store, inside a transaction that
//! is replayed on commit, or as locked batches through the async editor.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use arbor_core::{AtomicOperation, Mark, Node, NodeId, NodeUpdate};
use arbor_sdk::{Editor, EditorConfig, LockConfigBuilder};
use arbor_store::{NodeStore, StoreConfigBuilder, TextRange};
use clap::{Parser, Subcommand};
use colored::*;

// ─── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "arbor-demo")]
#[command(about = "Transactional tree document store walkthrough")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Basic demo: build a document, edit text across nodes, apply marks
    Demo,
    /// Transactions: overlay reads, replay order on commit, rollback
    Transaction,
    /// Lock ordering: three writers queue on the mutation lock
    Lock,
    /// Interactive REPL for manual experimentation
    Interactive,
}

// ─── Pretty printing ──────────────────────────────────────────────────────

fn header(text: &str) {
    let bar = "═".repeat(60);
    println!("\n{}", bar.bright_cyan());
    println!("  {}", text.bold().bright_white());
    println!("{}", bar.bright_cyan());
}

fn section(text: &str) {
    println!("\n{} {}", "▸".bright_yellow(), text.bold());
}

fn step(text: &str) {
    println!("  {} {}", "•".bright_green(), text);
}

fn fail(text: &str) {
    println!("  {} {}", "!".bright_red(), text);
}

fn format_marks(marks: &[Mark]) -> String {
    marks
        .iter()
        .map(|m| match m.range {
            Some((s, e)) => format!("{}[{},{})", m.stype, s, e),
            None => m.stype.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn show_tree(store: &NodeStore) {
    match store.root_id() {
        Some(root) => show_node(store, &root, "", true, true),
        None => println!("  {}", "(empty document)".dimmed()),
    }
}

fn show_node(store: &NodeStore, id: &NodeId, prefix: &str, last: bool, top: bool) {
    let node = match store.node(id.as_str()) {
        Some(node) => node,
        None => return,
    };
    let branch = if top { "" } else if last { "└── " } else { "├── " };
    let mut line = format!("{}{}", node.stype.bright_yellow(), format!(" {}", node.sid).dimmed());
    if node.is_text_bearing() {
        line.push_str(&format!(" {:?}", node.text_str()).bright_white().to_string());
    }
    if !node.marks.is_empty() {
        line.push_str(&format!("  marks: {}", format_marks(&node.marks)).bright_magenta().to_string());
    }
    println!("  {}{}{}", prefix, branch, line);

    let child_prefix = if top {
        prefix.to_string()
    } else {
        format!("{}{}", prefix, if last { "    " } else { "│   " })
    };
    for (i, child) in node.content.iter().enumerate() {
        show_node(store, child, &child_prefix, i + 1 == node.content.len(), false);
    }
}

fn show_ops(ops: &[AtomicOperation]) {
    for op in ops {
        let parent = op
            .parent_id
            .as_ref()
            .map(|p| format!(" → {}", p))
            .unwrap_or_default();
        println!(
            "    {:<7} {}{}",
            op.op_type.as_str().bright_cyan(),
            op.node_id,
            parent.dimmed()
        );
    }
}

fn sample_store(session: &str) -> NodeStore {
    let mut store = NodeStore::with_config(StoreConfigBuilder::new().session_id(session).build());
    let built = store
        .create_node(Node::new("doc").with_id("doc"))
        .and_then(|_| store.add_child("doc", Node::text_node("paragraph", "Hello World").with_id("p1"), None))
        .and_then(|_| store.add_child("doc", Node::text_node("paragraph", "Second line").with_id("p2"), None));
    if let Err(err) = built {
        fail(&format!("could not build sample document: {}", err));
    }
    store
}

// ─── Demo ──────────────────────────────────────────────────────────────────

fn run_demo() {
    header("DEMO — Range Editing & Marks");

    section("Phase 1: Build a document");
    let mut store = sample_store("demo");
    show_tree(&store);

    section("Phase 2: Marks");
    store.apply_mark(&TextRange::within("p1", 0, 5), &Mark::new("bold"));
    step("bold over p1[0,5)");
    store.insert_text("p1", 5, ",");
    step("insert \",\" at p1:5 (bold does not grow at its end)");
    show_tree(&store);

    section("Phase 3: Cross-node delete");
    let removed = store.delete_text(&TextRange::new("p1", 7, "p2", 7));
    step(&format!("deleted {:?} across p1 and p2", removed));
    show_tree(&store);

    section("Phase 4: Split and merge");
    match store.split_text_node("p1", 6) {
        Ok(right) => {
            step(&format!("split p1 at 6 → new node {}", right));
            show_tree(&store);
            match store.merge_text_nodes("p1", right.as_str()) {
                Ok(merged) => step(&format!("merged back: {:?}", merged.text_str())),
                Err(err) => fail(&err.to_string()),
            }
        }
        Err(err) => fail(&err.to_string()),
    }

    section("Phase 5: Serialize a range as JSON");
    let range = TextRange::new("p1", 0, "p2", 4);
    match store.serialize_range_json(&range) {
        Ok(json) => println!("  {}", json.dimmed()),
        Err(err) => fail(&err.to_string()),
    }
}

// ─── Transaction ───────────────────────────────────────────────────────────

fn run_transaction() {
    header("TRANSACTION — Overlay, Replay Order, Rollback");

    let mut store = sample_store("tx");

    section("Phase 1: Edits inside a transaction");
    store.begin_transaction();
    let outcome = store
        .update_node("p1", NodeUpdate::new().text("Hello World!"))
        .and_then(|_| store.delete_node("p2"))
        .and_then(|_| store.add_child("doc", Node::text_node("paragraph", "Fresh").with_id("p3"), Some(0)));
    if let Err(err) = outcome {
        fail(&err.to_string());
        store.rollback_transaction();
        return;
    }
    step("update p1, delete p2, insert p3 at the front");
    step("reads see the overlay:");
    show_tree(&store);

    section("Phase 2: Commit replays create, update, move, delete");
    match store.commit_transaction() {
        Ok(ops) => {
            show_ops(&ops);
            show_tree(&store);
        }
        Err(err) => fail(&err.to_string()),
    }

    section("Phase 3: Rollback discards everything");
    store.begin_transaction();
    if let Err(err) = store.delete_node("p1") {
        fail(&err.to_string());
    }
    step(&format!("inside: p1 visible = {}", store.has_node("p1")));
    store.rollback_transaction();
    step(&format!("after rollback: p1 visible = {}", store.has_node("p1")));
    show_tree(&store);
}

// ─── Lock ──────────────────────────────────────────────────────────────────

async fn run_lock_async() {
    header("LOCK — FIFO Grants Across Concurrent Writers");

    let config = EditorConfig {
        owner_prefix: "demo".to_string(),
        lock: LockConfigBuilder::new()
            .wait_timeout(Duration::from_secs(2))
            .build(),
        ..EditorConfig::default()
    };
    let editor = Arc::new(Editor::with_config(sample_store("lock"), config));

    section("Phase 1: x holds the lock, y then z queue behind it");
    let holder = match editor.lock().acquire("x").await {
        Ok(holder) => holder,
        Err(err) => return fail(&err.to_string()),
    };
    step(&format!("x granted ({})", holder.lock_id));

    let mut writers = Vec::new();
    for name in ["y", "z"] {
        let editor = Arc::clone(&editor);
        writers.push(tokio::spawn(async move {
            editor
                .batch(name, move |store| {
                    store.add_child("doc", Node::text_node("paragraph", format!("written by {}", name)), None)
                })
                .await
        }));
        tokio::task::yield_now().await;
    }
    let queued: Vec<String> = editor.lock().queue().into_iter().map(|r| r.owner_id).collect();
    step(&format!("queue: [{}]", queued.join(", ")));

    section("Phase 2: x releases, grants follow arrival order");
    tokio::time::sleep(Duration::from_millis(50)).await;
    if let Err(err) = editor.lock().release(&holder.lock_id) {
        fail(&err.to_string());
    }
    for writer in writers {
        match writer.await {
            Ok(Ok((id, ops))) => step(&format!("committed {} ({} operations)", id, ops.len())),
            Ok(Err(err)) => fail(&err.to_string()),
            Err(err) => fail(&err.to_string()),
        }
    }
    editor.read(show_tree);

    let stats = editor.lock().stats();
    section("Lock statistics");
    step(&format!("acquisitions = {}", stats.acquisitions));
    step(&format!("releases     = {}", stats.releases));
    step(&format!("timeouts     = {}", stats.timeouts));
    step(&format!("mean wait    = {:?}", stats.mean_wait));
}

fn run_lock() {
    match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(rt) => rt.block_on(run_lock_async()),
        Err(err) => fail(&format!("could not start runtime: {}", err)),
    }
}

// ─── Interactive REPL ──────────────────────────────────────────────────────

/// Paragraphs are addressed by 1-based position under the root.
fn paragraph(store: &NodeStore, arg: Option<&&str>) -> Option<NodeId> {
    let index: usize = arg?.parse().ok()?;
    let root = store.root_id()?;
    store.node(root.as_str())?.content.get(index.checked_sub(1)?).cloned()
}

fn offsets(parts: &[&str], from: usize) -> Option<(usize, usize)> {
    Some((parts.get(from)?.parse().ok()?, parts.get(from + 1)?.parse().ok()?))
}

fn run_interactive() {
    header("INTERACTIVE REPL — Arbor Node Store");

    let mut store = sample_store("repl");

    println!();
    println!("  {}", "Commands:".bold().underline());
    println!("    {} <text>                  Append a paragraph", "add".bright_cyan());
    println!("    {} <n> <offset> <text>  Insert text into paragraph n", "insert".bright_cyan());
    println!("    {} <n> <start> <end>    Delete text in paragraph n", "delete".bright_cyan());
    println!("    {} <n> <start> <end>      Toggle bold in paragraph n", "bold".bright_cyan());
    println!("    {} <n> <pos>             Split paragraph n", "split".bright_cyan());
    println!("    {} <n>                   Merge paragraph n with the next", "merge".bright_cyan());
    println!("    {} | {} | {}      Transaction control", "begin".bright_cyan(), "commit".bright_cyan(), "rollback".bright_cyan());
    println!("    {}                         Show the document", "show".bright_cyan());
    println!("    {}                         Exit", "quit".bright_cyan());
    println!();

    loop {
        let prompt = if store.in_transaction() { "arbor(tx)> " } else { "arbor> " };
        print!("{}", prompt.bright_cyan().bold());
        let _ = io::stdout().flush();

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() || input.is_empty() {
            break;
        }
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        match parts[0] {
            "add" | "a" => {
                let text = parts[1..].join(" ");
                let root = store.root_id().unwrap_or_default();
                match store.add_child(root.as_str(), Node::text_node("paragraph", text), None) {
                    Ok(id) => step(&format!("added {}", id)),
                    Err(err) => fail(&err.to_string()),
                }
            }

            "insert" | "i" => match (paragraph(&store, parts.get(1)), parts.get(2).and_then(|s| s.parse().ok())) {
                (Some(id), Some(offset)) => {
                    let text = parts[3..].join(" ");
                    if !store.insert_text(id.as_str(), offset, &text) {
                        fail("offset out of range");
                    }
                }
                _ => fail("Usage: insert <n> <offset> <text>"),
            },

            "delete" | "del" => match (paragraph(&store, parts.get(1)), offsets(&parts, 2)) {
                (Some(id), Some((start, end))) => {
                    let removed = store.delete_text(&TextRange::within(id, start, end));
                    step(&format!("removed {:?}", removed));
                }
                _ => fail("Usage: delete <n> <start> <end>"),
            },

            "bold" | "b" => match (paragraph(&store, parts.get(1)), offsets(&parts, 2)) {
                (Some(id), Some((start, end))) => {
                    if !store.toggle_mark(&TextRange::within(id, start, end), &Mark::new("bold")) {
                        fail("nothing to toggle");
                    }
                }
                _ => fail("Usage: bold <n> <start> <end>"),
            },

            "split" => match (paragraph(&store, parts.get(1)), parts.get(2).and_then(|s| s.parse().ok())) {
                (Some(id), Some(pos)) => match store.split_text_node(id.as_str(), pos) {
                    Ok(right) => step(&format!("split off {}", right)),
                    Err(err) => fail(&err.to_string()),
                },
                _ => fail("Usage: split <n> <pos>"),
            },

            "merge" => {
                let next = parts
                    .get(1)
                    .and_then(|s| s.parse::<usize>().ok())
                    .map(|n| (n + 1).to_string());
                match (paragraph(&store, parts.get(1)), paragraph(&store, next.as_deref().as_ref())) {
                    (Some(left), Some(right)) => {
                        if let Err(err) = store.merge_text_nodes(left.as_str(), right.as_str()) {
                            fail(&err.to_string());
                        }
                    }
                    _ => fail("Usage: merge <n>  (paragraph n+1 must exist)"),
                }
            }

            "begin" => {
                store.begin_transaction();
                step("transaction open");
            }

            "commit" => match store.commit_transaction() {
                Ok(ops) => {
                    step(&format!("committed {} operations", ops.len()));
                    show_ops(&ops);
                }
                Err(err) => fail(&err.to_string()),
            },

            "rollback" => {
                store.rollback_transaction();
                step("rolled back");
            }

            "show" | "s" => show_tree(&store),

            "json" => match store.root_id().and_then(|root| store.to_tree_json(root.as_str())) {
                Some(tree) => match serde_json::to_string_pretty(&tree) {
                    Ok(json) => println!("{}", json),
                    Err(err) => fail(&err.to_string()),
                },
                None => println!("  {}", "(empty document)".dimmed()),
            },

            "quit" | "exit" | "q" => {
                println!("  {}", "Goodbye!".dimmed());
                break;
            }

            "help" | "h" | "?" => {
                println!("  add <text> | insert <n> <off> <text> | delete <n> <s> <e>");
                println!("  bold <n> <s> <e> | split <n> <pos> | merge <n>");
                println!("  begin | commit | rollback | show | json | quit");
            }

            other => {
                println!("  {} Unknown command '{}' — type 'help'", "?".bright_yellow(), other);
            }
        }
    }
}

// ─── Entry point ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo => run_demo(),
        Commands::Transaction => run_transaction(),
        Commands::Lock => run_lock(),
        Commands::Interactive => run_interactive(),
    }
}
