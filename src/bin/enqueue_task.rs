//! CLI tool to enqueue a background task by hand.
//!
//! Usage:
//!   cargo run --bin enqueue-task -- --name prune_old_results
//!   cargo run --bin enqueue-task -- --name update_run --args '["<run-id>"]'

use std::env;

use tally_lib::config::Config;
use tally_lib::db::DbPool;
use tally_lib::tasks::TaskRegistry;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let mut name: Option<String> = None;
    let mut task_args = "[]".to_string();
    let mut task_kwargs = "{}".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--name" | "-n" => {
                i += 1;
                if i < args.len() {
                    name = Some(args[i].clone());
                }
            }
            "--args" | "-a" => {
                i += 1;
                if i < args.len() {
                    task_args = args[i].clone();
                }
            }
            "--kwargs" | "-k" => {
                i += 1;
                if i < args.len() {
                    task_kwargs = args[i].clone();
                }
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    // Validate required arguments
    let name = match name {
        Some(n) => n,
        None => {
            eprintln!("Error: --name is required");
            print_usage();
            std::process::exit(1);
        }
    };

    // Only enqueue names the worker pool can actually handle
    if !TaskRegistry::builtin().contains(&name) {
        eprintln!("Error: Unknown task '{name}'. Run with --help for the task list.");
        std::process::exit(1);
    }

    let task_args: serde_json::Value = match serde_json::from_str(&task_args) {
        Ok(v @ serde_json::Value::Array(_)) => v,
        Ok(_) => {
            eprintln!("Error: --args must be a JSON array");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: --args is not valid JSON: {}", e);
            std::process::exit(1);
        }
    };

    let task_kwargs: serde_json::Value = match serde_json::from_str(&task_kwargs) {
        Ok(v @ serde_json::Value::Object(_)) => v,
        Ok(_) => {
            eprintln!("Error: --kwargs must be a JSON object");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: --kwargs is not valid JSON: {}", e);
            std::process::exit(1);
        }
    };

    // Load config and connect
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match DbPool::connect(&config.database_url).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };

    let task = match pool.enqueue_task(&name, task_args, task_kwargs).await {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error enqueueing task: {}", e);
            std::process::exit(1);
        }
    };

    // Output
    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("  Task Enqueued");
    println!("════════════════════════════════════════════════════════════════");
    println!();
    println!("  ID:    {}", task.id);
    println!("  Name:  {}", task.name);
    println!("  State: {}", task.state);
    println!("  Args:  {}", task.args);
    println!();
    println!("  Poll /api/v1/tasks/{} for the outcome.", task.id);
    println!("════════════════════════════════════════════════════════════════");
    println!();
}

fn print_usage() {
    eprintln!();
    eprintln!("Usage: enqueue-task --name <task> [--args <json-array>] [--kwargs <json-object>]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --name, -n    Task name (required)");
    eprintln!("  --args, -a    Positional arguments as a JSON array (default: [])");
    eprintln!("  --kwargs, -k  Keyword arguments as a JSON object (default: {{}})");
    eprintln!("  --help, -h    Show this help");
    eprintln!();
    eprintln!("Tasks:");
    eprintln!("  update_run           Recompute one run's summary; args: [\"<run-id>\"]");
    eprintln!("  sync_aborted_runs    Sweep recent runs with stale summaries");
    eprintln!("  run_import           Process an uploaded archive; args: [\"<import-id>\"]");
    eprintln!("  generate_report      Build a report artifact; args: [{{\"id\": \"<report-id>\"}}]");
    eprintln!("  prune_old_results    Delete results past the retention window");
    eprintln!("  prune_old_runs       Delete runs (and their results) past retention");
    eprintln!("  prune_old_imports    Delete import rows and archives past retention");
    eprintln!("  prune_old_artifacts  Delete report rows and artifacts past retention");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  enqueue-task --name prune_old_results");
    eprintln!("  enqueue-task --name update_run --args '[\"0198c6f2-...\"]'");
    eprintln!();
}
