//! Tally console client.
//!
//! Wires the HTTP remote store, the file cache, the list context and the
//! sync service together behind a small line-oriented console.

use std::sync::Arc;
use tally_client::{Config, FileCache, HttpRemote, ListContext, SyncService};
use tally_engine::{TodoId, TodoSnapshot};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=info,tally_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::info!(api_url = %config.api_url, cache_dir = %config.cache_dir.display(), "starting tally");

    let cache = Arc::new(FileCache::new(&config.cache_dir)?);
    let remote = Arc::new(HttpRemote::new(&config.api_url, config.auth_token.clone()));
    let context = ListContext::new(remote.clone(), cache.clone());
    let (handle, service) = SyncService::spawn(remote, cache, context.subscribe());

    // The last active list wins; TALLY_LIST only seeds a first run.
    context.restore_last_active().await;
    if context.current_id().is_none() {
        if let Some(list_id) = &config.initial_list {
            context.set_current(list_id).await;
        }
    }

    // Render every published snapshot as it arrives.
    let mut snapshots = handle.subscribe();
    tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            render(&snapshot);
        }
    });

    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "" => {}
            "help" => print_help(),
            "list" => render(&handle.snapshot()),
            "add" => {
                if rest.is_empty() {
                    println!("usage: add <title>");
                } else {
                    handle.add(rest)?;
                }
            }
            "toggle" => match rest.parse::<TodoId>() {
                Ok(id) => handle.toggle(id)?,
                Err(e) => println!("{e}"),
            },
            "del" => match rest.parse::<TodoId>() {
                Ok(id) => handle.delete(id)?,
                Err(e) => println!("{e}"),
            },
            "flush" => handle.flush()?,
            "switch" => {
                if rest.is_empty() {
                    println!("usage: switch <list-id>");
                } else {
                    context.set_current(rest).await;
                }
            }
            "lists" => {
                if rest.is_empty() {
                    println!("usage: lists <owner-guid>");
                } else {
                    match context.lists_for_owner(rest).await {
                        Ok(lists) => {
                            for list in lists {
                                println!("  {}  {}", list.id, list.name);
                            }
                        }
                        Err(e) => println!("error: {e}"),
                    }
                }
            }
            "newlist" => match rest.split_once(' ') {
                Some((owner, name)) if !name.trim().is_empty() => {
                    match context.create_list(name.trim(), owner).await {
                        Ok(list) => println!("created {}  {}", list.id, list.name),
                        Err(e) => println!("error: {e}"),
                    }
                }
                _ => println!("usage: newlist <owner-guid> <name>"),
            },
            "quit" | "exit" => break,
            _ => println!("unknown command, try 'help'"),
        }
    }

    // Dropping the context ends the service loop.
    drop(handle);
    drop(context);
    service.await?;
    Ok(())
}

fn render(snapshot: &TodoSnapshot) {
    match &snapshot.list_id {
        Some(list_id) => println!("-- list {list_id} --"),
        None => {
            println!("-- no list selected --");
            return;
        }
    }
    if snapshot.loading {
        println!("   loading...");
    }
    if let Some(error) = &snapshot.error {
        println!("   ! {error}");
    }
    if snapshot.todos.is_empty() && !snapshot.loading {
        println!("   (empty)");
    }
    for todo in &snapshot.todos {
        let mark = if todo.completed { "x" } else { " " };
        let created = chrono::DateTime::from_timestamp_millis(todo.created_at as i64)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!("   [{mark}] {:>10}  {}  ({created})", todo.id.to_string(), todo.title);
    }
}

fn print_help() {
    println!("commands:");
    println!("  list                      show the current list");
    println!("  add <title>               add a todo");
    println!("  toggle <id>               flip a todo's completed flag");
    println!("  del <id>                  delete a todo");
    println!("  flush                     retry queued changes");
    println!("  switch <list-id>          change the current list");
    println!("  lists <owner-guid>        show an owner's lists");
    println!("  newlist <owner> <name>    create a list");
    println!("  quit                      exit");
}
