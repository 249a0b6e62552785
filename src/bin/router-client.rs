//! Agent router client
//!
//! Talks to a running router: inspects and edits its agent registry through
//! the management API and sends requests through its JSON-RPC endpoint.
//!
//! ## Usage
//!
//! ```bash
//! # List registered agents
//! router-client list
//!
//! # Register and remove an agent
//! router-client register http://localhost:8001
//! router-client unregister MathAgent
//!
//! # Route a single request
//! router-client send "convert 100 usd to eur"
//!
//! # Interactive session against a remote router
//! router-client --router http://router.internal:8000 chat
//! ```

use agent_router::protocol::{JsonRpcRequest, JsonRpcResponse, Task};
use agent_router::server::{ListAgentsResponse, LIST_AGENTS_COMMAND};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::io::Write;
use std::process;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(
    name = "router-client",
    about = "Command-line client for a running agent router",
    version
)]
struct Args {
    /// Base URL of the router
    #[arg(long, env = "ROUTER_URL", default_value = "http://localhost:8000")]
    router: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered agents
    List,
    /// Register the agent served at ENDPOINT
    Register { endpoint: String },
    /// Unregister an agent by id, name or endpoint
    Unregister { identifier: String },
    /// Send one request and print the router's answer
    Send { text: String },
    /// Interactive session; `agents` lists agents, `quit` exits
    Chat,
}

struct RouterClient {
    client: reqwest::Client,
    base_url: String,
}

impl RouterClient {
    fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn management_url(&self, action: &str) -> String {
        format!("{}/management/api/v1/agents/{action}", self.base_url)
    }

    async fn list(&self) -> Result<ListAgentsResponse, Box<dyn std::error::Error>> {
        let response = self
            .client
            .get(self.management_url("list"))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn register(&self, endpoint: &str) -> Result<Value, Box<dyn std::error::Error>> {
        let response = self
            .client
            .post(self.management_url("register"))
            .json(&json!({ "endpoint": endpoint }))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn unregister(&self, identifier: &str) -> Result<Value, Box<dyn std::error::Error>> {
        let response = self
            .client
            .post(self.management_url("unregister"))
            .json(&json!({ "agent_identifier": identifier }))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn send(&self, text: &str) -> Result<String, Box<dyn std::error::Error>> {
        let response: JsonRpcResponse = self
            .client
            .post(format!("{}/", self.base_url))
            .json(&JsonRpcRequest::message_send(text))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(format!("Router returned error {}: {}", error.code, error.message).into());
        }

        let task: Task = serde_json::from_value(response.result.unwrap_or(Value::Null))?;
        Ok(task
            .artifact_text()
            .unwrap_or("Router returned no text")
            .to_string())
    }
}

fn print_agents(listing: &ListAgentsResponse) {
    println!("{}", listing.message);
    for agent in &listing.agents {
        println!();
        println!("  {} ({})", agent.name, agent.agent_id);
        println!("    endpoint: {}", agent.endpoint);
        if !agent.description.is_empty() {
            println!("    {}", agent.description);
        }
        for skill in &agent.skills {
            println!("    - {}: {}", skill.name, skill.description);
        }
    }
}

fn print_json(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn chat(client: &RouterClient) -> Result<(), Box<dyn std::error::Error>> {
    println!("Connected to {}. Type `agents` to list agents, `quit` to exit.", client.base_url);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "quit" | "exit" => break,
            "agents" => match client.send(LIST_AGENTS_COMMAND).await {
                Ok(listing) => println!("{listing}"),
                Err(e) => eprintln!("Error: {e}"),
            },
            text => match client.send(text).await {
                Ok(answer) => println!("{answer}"),
                Err(e) => eprintln!("Error: {e}"),
            },
        }
    }

    Ok(())
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let client = RouterClient::new(&args.router);

    match args.command {
        Command::List => print_agents(&client.list().await?),
        Command::Register { endpoint } => print_json(&client.register(&endpoint).await?)?,
        Command::Unregister { identifier } => print_json(&client.unregister(&identifier).await?)?,
        Command::Send { text } => println!("{}", client.send(&text).await?),
        Command::Chat => chat(&client).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
