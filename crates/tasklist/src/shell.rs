//! Interactive shell: one event loop over user input and store pushes.

use std::io::Write as _;

use anyhow::{Context, Result, anyhow, bail};
use tasklist_app::{Direction, ListView, TaskStore};
use tasklist_core::CompletionFilter;
use tasklist_store::{StorageProvider, WriteTicket};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::commands::{Intent, apply, screen, unsaved, write_error};

const HELP: &str = "\
commands:
  add <text>            add a task
  done <sel>            complete a task
  rm <sel>              delete a task
  up <sel> | down <sel> move an active task
  find [text]           search (no text clears the search)
  filter <all|active|completed>
  toggle                show or hide completed tasks
  ls                    redraw the list
  quit
<sel> is a row number or an id prefix";

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Intent(Intent),
    Search(String),
    Filter(CompletionFilter),
    ToggleCompleted,
    Redraw,
    Help,
    Quit,
}

enum Event {
    Input(Option<String>),
    Pushed(bool),
}

/// Run the shell until stdin closes or the user quits.
pub async fn run<P: StorageProvider>(mut store: TaskStore<P>, mut view: ListView) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    redraw(&store, &mut view)?;

    loop {
        let event = tokio::select! {
            line = lines.next_line() => Event::Input(line.context("failed to read input")?),
            alive = store.next_update() => Event::Pushed(alive),
        };

        match event {
            Event::Input(None) => break,
            Event::Input(Some(input)) => match parse(&input) {
                Ok(Line::Quit) => break,
                Ok(Line::Help) => {
                    println!("{HELP}");
                    prompt()?;
                }
                Ok(line) => {
                    if let Err(err) = execute(line, &mut store, &mut view) {
                        println!("error: {err}");
                    }
                    redraw(&store, &mut view)?;
                }
                Err(err) => {
                    println!("error: {err}");
                    prompt()?;
                }
            },
            Event::Pushed(true) => {
                debug!(revision = store.revision(), "Redrawing after push");
                println!();
                redraw(&store, &mut view)?;
            }
            Event::Pushed(false) => {
                println!("\nLive updates stopped; showing the last known list.");
                prompt()?;
            }
        }
    }

    store.close();
    Ok(())
}

fn execute<P: StorageProvider>(line: Line, store: &mut TaskStore<P>, view: &mut ListView) -> Result<()> {
    match line {
        Line::Intent(intent) => {
            let applied = apply(intent, store, view)?;
            println!("{}", applied.message);
            if let Some(write) = applied.write {
                tokio::spawn(report(write));
            }
        }
        Line::Search(query) => view.set_query(query),
        Line::Filter(filter) => view.set_filter(filter),
        Line::ToggleCompleted => {
            view.toggle_completed();
        }
        Line::Redraw | Line::Help | Line::Quit => {}
    }
    Ok(())
}

/// Warn about a failed write once it resolves, then restore the prompt.
/// Returns whether a warning was shown.
async fn report(write: WriteTicket) -> bool {
    let Some(err) = write_error(write).await else {
        return false;
    };
    println!("\n{}", unsaved(&err));
    if let Err(err) = prompt() {
        debug!(error = %err, "Failed to restore prompt");
    }
    true
}

fn parse(input: &str) -> Result<Line> {
    let words = shell_words::split(input).map_err(|err| anyhow!("cannot parse input: {err}"))?;
    let Some((command, args)) = words.split_first() else {
        return Ok(Line::Redraw);
    };

    let line = match command.to_ascii_lowercase().as_str() {
        "add" | "a" => Line::Intent(Intent::Add(args.join(" "))),
        "done" | "x" => Line::Intent(Intent::Complete(single(args)?)),
        "rm" | "del" => Line::Intent(Intent::Remove(single(args)?)),
        "up" => Line::Intent(Intent::Move(single(args)?, Direction::Up)),
        "down" => Line::Intent(Intent::Move(single(args)?, Direction::Down)),
        "find" | "search" | "/" => Line::Search(args.join(" ")),
        "filter" => Line::Filter(single(args)?.parse().map_err(anyhow::Error::msg)?),
        "toggle" => Line::ToggleCompleted,
        "ls" | "list" => Line::Redraw,
        "help" | "?" => Line::Help,
        "quit" | "exit" | "q" => Line::Quit,
        other => bail!("unknown command '{other}' (try help)"),
    };
    Ok(line)
}

fn single(args: &[String]) -> Result<String> {
    match args {
        [one] => Ok(one.clone()),
        [] => bail!("missing task selector"),
        _ => bail!("expected a single task selector"),
    }
}

fn redraw<P>(store: &TaskStore<P>, view: &mut ListView) -> Result<()> {
    print!("{}", screen(store, view));
    prompt()
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush().context("failed to flush stdout")
}
