use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use publicsphere_agents::{CitizenAssistant, LatencyProfile};
use publicsphere_core::{
    parse_markup, render_plain, scenario_catalog, ChatInput, ResponsePayload, ScenarioId,
};
use publicsphere_observability::{init_tracing, AppMetrics};
use publicsphere_storage::Store;

#[derive(Debug, Parser)]
#[command(name = "portal")]
#[command(about = "PublicSphere citizen services assistant")]
struct Cli {
    /// Transcript database; transcripts stay in memory when unset.
    #[arg(long, env = "PORTAL_DATABASE_URL")]
    database_url: Option<String>,

    #[arg(long, env = "PORTAL_LATENCY_MIN_MS", default_value_t = 400)]
    latency_min_ms: u64,

    #[arg(long, env = "PORTAL_LATENCY_MAX_MS", default_value_t = 800)]
    latency_max_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat against one scenario.
    Chat {
        #[arg(long, default_value = "home")]
        scenario: ScenarioId,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        session: Option<String>,
    },
    /// Answer a single query and print the payload as json.
    Ask {
        query: String,
        #[arg(long)]
        scenario: Option<ScenarioId>,
    },
    Scenarios,
    /// Show how response text markup is split and rendered.
    Render { text: String },
    Transcript {
        #[arg(long)]
        user: String,
        #[arg(long)]
        session: String,
        #[arg(long, default_value = "home")]
        scenario: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("publicsphere_cli");
    let cli = Cli::parse();

    let latency = LatencyProfile::from_millis(cli.latency_min_ms, cli.latency_max_ms);

    match cli.command {
        Command::Chat {
            scenario,
            user,
            session,
        } => {
            let assistant = build_assistant(cli.database_url.as_deref(), latency).await?;
            run_chat(assistant, scenario, user, session).await?;
        }
        Command::Ask { query, scenario } => {
            let assistant = build_assistant(cli.database_url.as_deref(), latency).await?;
            let resolution = assistant.answer(&query, scenario).await;
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        }
        Command::Scenarios => {
            let mut scenarios = vec![ScenarioId::Home.info()];
            scenarios.extend(scenario_catalog());
            println!("{}", serde_json::to_string_pretty(&scenarios)?);
        }
        Command::Render { text } => {
            println!("{}", serde_json::to_string_pretty(&parse_markup(&text))?);
            println!("{}", render_plain(&text));
        }
        Command::Transcript {
            user,
            session,
            scenario,
        } => {
            let assistant = build_assistant(cli.database_url.as_deref(), latency).await?;
            let messages = assistant.transcript(&user, &session, &scenario).await?;
            println!("{}", serde_json::to_string_pretty(&messages)?);
        }
    }

    Ok(())
}

async fn run_chat(
    assistant: CitizenAssistant<Store>,
    scenario: ScenarioId,
    user: Option<String>,
    session: Option<String>,
) -> Result<()> {
    let view = assistant
        .open_session(user, session, Some(scenario.as_code()))
        .await?;

    println!(
        "PublicSphere chat ({}, session {}). type 'exit' to quit.\n",
        view.scenario, view.session_id
    );
    for message in &view.messages {
        match &message.payload {
            Some(payload) => print_payload(payload),
            None => println!("> {}\n", message.content),
        }
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let reply = assistant
            .handle_chat(ChatInput {
                user_id: Some(view.user_id.clone()),
                session_id: Some(view.session_id.clone()),
                scenario: Some(view.scenario.clone()),
                text: message.to_string(),
            })
            .await?;

        println!();
        print_payload(&reply.payload);
    }

    Ok(())
}

fn print_payload(payload: &ResponsePayload) {
    println!("{}\n", render_plain(&payload.text));

    if let Some(diagnostics) = &payload.diagnostics {
        println!(
            "[{}] {} ({} sources)\n",
            diagnostics.process_label, diagnostics.reasoning_text, diagnostics.source_count
        );
    }

    for card in &payload.cards {
        println!("* {}: {} [{}]", card.title, card.description, card.action_label);
    }
    if !payload.cards.is_empty() {
        println!();
    }

    if !payload.topics.is_empty() {
        println!("Related topics:");
        for topic in &payload.topics {
            println!("- {topic}");
        }
        println!();
    }
}

async fn build_assistant(
    database_url: Option<&str>,
    latency: LatencyProfile,
) -> Result<CitizenAssistant<Store>> {
    let metrics = AppMetrics::shared();

    let store = match database_url {
        Some(database_url) => Store::sqlite(database_url).await?,
        None => Store::memory(),
    };

    Ok(CitizenAssistant::new(Arc::new(store), metrics, latency))
}
