use std::path::PathBuf;
use std::sync::Arc;

use futures::channel::mpsc;
use futures::StreamExt;
use serde_json::Value;

use contactbridge_lib::{init_logging, AppState, AuthorizationStatus, ListenerEvent};

const USAGE: &str = "usage: contactbridge <command>

commands:
  status                  print the contacts authorization status
  request-access          prompt for access if undecided
  list [extra...]         list all contacts
  find <name> [extra...]  list contacts matching a name
  add <json>              add a contact
  update <json>           update a contact
  delete <json>           delete by {\"name\"} or {\"identifier\"}
  watch                   print contact-changed until Ctrl-C";

fn data_dir() -> PathBuf {
    std::env::var_os("CONTACTBRIDGE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("contactbridge-data"))
}

fn extras(args: &[String]) -> Option<Value> {
    if args.is_empty() {
        None
    } else {
        Some(Value::Array(args.iter().cloned().map(Value::String).collect()))
    }
}

fn parse_json(arg: Option<&String>) -> Result<Value, Box<dyn std::error::Error>> {
    let raw = arg.ok_or(USAGE)?;
    Ok(serde_json::from_str(raw)?)
}

fn print(value: impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = data_dir();
    let _guard = init_logging(Some(&data_dir.join("logs")))?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let (state, authorization) = AppState::new_production(&data_dir)?;

    match command.as_str() {
        "status" => print(state.get_auth_status().as_str())?,
        "request-access" => {
            if !state.get_auth_status().is_determined() {
                eprintln!("Allow access to contacts? [y/n/limited]");
                let mut answer = String::new();
                std::io::stdin().read_line(&mut answer)?;
                let decision = match answer.trim() {
                    "y" | "yes" => AuthorizationStatus::Authorized,
                    "limited" => AuthorizationStatus::Limited,
                    _ => AuthorizationStatus::Denied,
                };
                // The terminal is the permission UI here
                authorization.respond(decision)?;
            }
            print(state.request_access().await.as_str())?
        }
        "list" => print(state.get_all_contacts(extras(&args[1..]).as_ref())?)?,
        "find" => {
            let name = args.get(1).ok_or(USAGE)?;
            let contacts = state
                .get_contacts_by_name(&Value::String(name.clone()), extras(&args[2..]).as_ref())?;
            print(contacts)?
        }
        "add" => print(state.add_new_contact(&parse_json(args.get(1))?)?)?,
        "update" => print(state.update_contact(&parse_json(args.get(1))?)?)?,
        "delete" => print(state.delete_contact(&parse_json(args.get(1))?)?)?,
        "watch" => {
            let (tx, mut rx) = mpsc::unbounded::<()>();
            state.listener().on(
                ListenerEvent::ContactChanged,
                Arc::new(move || {
                    let _ = tx.unbounded_send(());
                }),
            );
            if !state.listener().is_listening() {
                state.listener().setup()?;
            }
            eprintln!("Watching {} (Ctrl-C to stop)", data_dir.display());

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    event = rx.next() => match event {
                        Some(()) => println!("{}", ListenerEvent::ContactChanged.as_str()),
                        None => break,
                    },
                }
            }
            state.listener().remove()?;
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}
