#![forbid(unsafe_code)]

//! `checkpoint-relay-ctl` — controller-side CLI for `checkpoint-relay`.
//!
//! Starts conversations, sends human replies, and signs webhook bodies for
//! debugging receivers.

use std::io::Read;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use checkpoint_relay::notify::signature;

#[derive(Debug, Parser)]
#[command(
    name = "checkpoint-relay-ctl",
    about = "Controller CLI for checkpoint-relay",
    version,
    long_about = None
)]
struct Cli {
    /// Base URL of the checkpoint-relay server.
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a new conversation.
    Start {
        /// Task prompt.
        prompt: String,
        /// URL receiving lifecycle notifications.
        #[arg(long)]
        notify_url: String,
        /// Conversation id; generated when omitted.
        #[arg(long)]
        task_id: Option<String>,
    },

    /// Answer a conversation waiting for human input.
    Reply {
        /// Conversation id.
        task_id: String,
        /// Agent session id from the clarification notification.
        session_id: String,
        /// The answer.
        answer: String,
        /// URL receiving lifecycle notifications.
        #[arg(long)]
        notify_url: String,
    },

    /// Print the webhook signature for a body read from stdin.
    ///
    /// Uses the `WEBHOOK_SECRET` environment variable.
    Sign,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Cli::parse();

    let body = match args.command {
        Command::Start {
            prompt,
            notify_url,
            task_id,
        } => json!({
            "task_id": task_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            "prompt": prompt,
            "notify_url": notify_url,
        }),
        Command::Reply {
            task_id,
            session_id,
            answer,
            notify_url,
        } => json!({
            "task_id": task_id,
            "prompt": answer,
            "notify_url": notify_url,
            "resume_session_id": session_id,
        }),
        Command::Sign => {
            sign_stdin();
            return;
        }
    };

    match post_conversation(&args.server, &body).await {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
        }
        Err(err) => {
            eprintln!("Error: {err}");
            eprintln!("Is checkpoint-relay running at '{}'?", args.server);
            std::process::exit(1);
        }
    }
}

fn sign_stdin() {
    let Ok(secret) = std::env::var("WEBHOOK_SECRET") else {
        eprintln!("Error: WEBHOOK_SECRET is not set");
        std::process::exit(1);
    };
    let mut body = Vec::new();
    if let Err(err) = std::io::stdin().read_to_end(&mut body) {
        eprintln!("Error: failed to read stdin: {err}");
        std::process::exit(1);
    }
    match signature::sign(&secret, &body) {
        Ok(sig) => println!("{sig}"),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

/// POST a conversation request and return the JSON response.
async fn post_conversation(
    server: &str,
    body: &Value,
) -> std::result::Result<Value, Box<dyn std::error::Error>> {
    let url = format!("{}/conversations", server.trim_end_matches('/'));
    let response = reqwest::Client::new().post(url).json(body).send().await?;
    let status = response.status();
    let payload: Value = response.json().await?;
    if !status.is_success() {
        let message = payload
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(format!("{status}: {message}").into());
    }
    Ok(payload)
}
