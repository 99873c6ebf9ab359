//! pulse — MarketerPulse library CLI
//!
//! Talks to the MarketerPulse server first and degrades to a direct model
//! call and/or the local cache when the server is unavailable, so the
//! library keeps working offline.
//!
//! # Subcommands
//! - `analyze [FILE] [--url U] [--json]` — analyze a post and store it
//! - `posts [--topic T] [--search Q] [--json]` — list the library
//! - `show <ID> [--json]` — one post in full (id prefixes accepted)
//! - `topics` — the taxonomy with per-topic counts
//! - `chat [MESSAGE]` — one-shot answer, or an interactive session
//! - `status` — server health

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pulse_core::{
    ChatMessage, Credentials, FallbackClient, GeminiClient, LocalCache, Post, PulseConfig,
    ServerApi, Tier, Topic,
};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8765";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "pulse",
    version,
    about = "MarketerPulse — a structured library of LinkedIn marketing wisdom"
)]
struct Cli {
    /// MarketerPulse server URL (overrides PULSE_SERVER_URL env var)
    #[arg(long, env = "PULSE_SERVER_URL", default_value = DEFAULT_SERVER)]
    server: String,

    /// Fallback cache file (defaults to the configured path)
    #[arg(long)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Analyze a post and add it to the library
    Analyze {
        /// File containing the post text; reads stdin when omitted
        file: Option<PathBuf>,

        /// Source URL recorded with the post
        #[arg(long)]
        url: Option<String>,

        /// Print the stored post as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the library, newest first
    Posts {
        /// Keep only posts filed under this topic (primary or secondary)
        #[arg(long)]
        topic: Option<String>,

        /// Keep only posts whose title or takeaway contains this text
        #[arg(long)]
        search: Option<String>,

        /// Print the matching posts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one stored post in full
    Show {
        /// Post id, full or any unambiguous prefix
        id: String,

        /// Print the post as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the topic taxonomy with library counts
    Topics,

    /// Ask the strategist; omit the message for an interactive session
    Chat {
        /// One-shot question
        message: Option<String>,
    },

    /// Show MarketerPulse server status
    Status,
}

// ============================================================================
// View-layer helpers (pure)
// ============================================================================

/// Apply the `posts` filters locally to a fetched library.
fn filter_posts(
    posts: Vec<Post>,
    topic: Option<&str>,
    search: Option<&str>,
) -> Result<Vec<Post>, String> {
    let topic = match topic {
        Some(label) => Some(
            Topic::parse_lenient(label)
                .ok_or_else(|| format!("unknown topic {:?} (run `pulse topics`)", label))?,
        ),
        None => None,
    };
    let needle = search.map(str::to_lowercase);

    Ok(posts
        .into_iter()
        .filter(|post| {
            if let Some(topic) = topic {
                if post.primary_topic != topic && !post.secondary_topics.contains(&topic) {
                    return false;
                }
            }
            if let Some(needle) = &needle {
                let haystack = format!("{} {}", post.title, post.core_takeaway).to_lowercase();
                if !haystack.contains(needle) {
                    return false;
                }
            }
            true
        })
        .collect())
}

/// Find a post by full id or unambiguous prefix.
fn find_post(posts: &[Post], id: &str) -> Result<Post, String> {
    let matches: Vec<&Post> = posts
        .iter()
        .filter(|p| p.id.to_string().starts_with(id))
        .collect();

    match matches.as_slice() {
        [] => Err(format!("no post with id {:?}", id)),
        [post] => Ok((*post).clone()),
        many => Err(format!("id prefix {:?} matches {} posts", id, many.len())),
    }
}

fn render_post_line(post: &Post) -> String {
    let id = post.id.to_string();
    format!(
        "{}  {}  {:<28} {}",
        &id[..8],
        post.created_at.format("%Y-%m-%d"),
        post.primary_topic.name(),
        post.title
    )
}

fn render_post_detail(post: &Post) -> String {
    let mut out = String::new();
    out.push_str(&format!("Title:    {}\n", post.title));
    out.push_str(&format!("Id:       {}\n", post.id));
    out.push_str(&format!(
        "Added:    {}\n",
        post.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    out.push_str(&format!("Topic:    {}\n", post.primary_topic));
    if !post.secondary_topics.is_empty() {
        let secondary: Vec<&str> = post.secondary_topics.iter().map(|t| t.name()).collect();
        out.push_str(&format!("Also:     {}\n", secondary.join(", ")));
    }
    if let Some(url) = &post.url {
        out.push_str(&format!("Url:      {}\n", url));
    }
    out.push_str(&format!("Takeaway: {}\n", post.core_takeaway));

    if !post.summary.is_empty() {
        out.push_str("\nSummary:\n");
        for line in &post.summary {
            out.push_str(&format!("  - {}\n", line));
        }
    }
    if !post.key_insights.is_empty() {
        out.push_str("\nKey insights:\n");
        for line in &post.key_insights {
            out.push_str(&format!("  - {}\n", line));
        }
    }
    out
}

/// One-line stderr notice whenever a degraded tier answered.
fn tier_notice(tier: Tier) {
    if !tier.is_primary() {
        eprintln!("pulse: server unavailable, answered from the {}", tier.label());
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn do_analyze(
    client: &FallbackClient,
    file: Option<PathBuf>,
    url: Option<String>,
    json_output: bool,
) -> anyhow::Result<()> {
    let content = match &file {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let (post, tier) = client.analyze(&content, url.as_deref()).await?;
    tier_notice(tier);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&post)?);
    } else {
        print!("{}", render_post_detail(&post));
    }
    Ok(())
}

async fn do_posts(
    client: &FallbackClient,
    topic: Option<String>,
    search: Option<String>,
    json_output: bool,
) -> anyhow::Result<()> {
    let (posts, tier) = client.fetch_posts().await?;
    tier_notice(tier);

    let posts = filter_posts(posts, topic.as_deref(), search.as_deref())
        .map_err(|e| anyhow::anyhow!(e))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&posts)?);
        return Ok(());
    }

    if posts.is_empty() {
        println!("The library is empty. `pulse analyze` a post to get started.");
        return Ok(());
    }

    for post in &posts {
        println!("{}", render_post_line(post));
    }
    println!("\n{} post(s)", posts.len());
    Ok(())
}

async fn do_show(client: &FallbackClient, id: String, json_output: bool) -> anyhow::Result<()> {
    let (posts, tier) = client.fetch_posts().await?;
    tier_notice(tier);

    let post = find_post(&posts, &id).map_err(|e| anyhow::anyhow!(e))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&post)?);
    } else {
        print!("{}", render_post_detail(&post));
    }
    Ok(())
}

async fn do_topics(client: &FallbackClient) -> anyhow::Result<()> {
    let (posts, tier) = client.fetch_posts().await?;
    tier_notice(tier);

    for topic in Topic::all() {
        let count = posts.iter().filter(|p| p.primary_topic == *topic).count();
        println!("{:<32} {}", topic.name(), count);
    }
    Ok(())
}

async fn do_chat(client: &FallbackClient, message: Option<String>) -> anyhow::Result<()> {
    if let Some(message) = message {
        let (text, tier) = client.chat(&message, &[]).await?;
        tier_notice(tier);
        println!("{}", text);
        return Ok(());
    }

    // Interactive session. History stays in memory for the session and is
    // discarded on exit.
    println!("MarketerPulse strategist. Ask about your library; `exit` ends the session.");
    let mut history: Vec<ChatMessage> = Vec::new();
    let stdin = io::stdin();

    loop {
        print!("you> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        match client.chat(line, &history).await {
            Ok((text, tier)) => {
                tier_notice(tier);
                println!("strategist> {}\n", text);
                history.push(ChatMessage::user(line));
                history.push(ChatMessage::assistant(text));
            }
            Err(e) => {
                // Keep the session alive; render the failure as a labeled line.
                println!("strategist> [error] {}\n", e);
            }
        }
    }
    Ok(())
}

async fn do_status(client: &FallbackClient) -> anyhow::Result<()> {
    let Some(server) = client.server() else {
        eprintln!("pulse: no server configured");
        std::process::exit(1);
    };

    match server.health().await {
        Ok(report) => {
            println!("Server:  {}", server.base_url());
            println!("Status:  {}", report.status);
            println!("Version: {}", report.version.as_deref().unwrap_or("?"));
            match report.posts {
                Some(n) => println!("Posts:   {}", n),
                None => println!("Posts:   ?"),
            }
            let model = match report.model_credential {
                Some(true) => "configured",
                Some(false) => "missing",
                None => "?",
            };
            println!("Model:   {}", model);
        }
        Err(e) => {
            eprintln!("pulse: cannot reach {}: {}", server.base_url(), e);
            std::process::exit(1);
        }
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn build_client(cli: &Cli, config: &PulseConfig) -> anyhow::Result<FallbackClient> {
    let server = ServerApi::new(cli.server.trim_end_matches('/').to_string())?;

    let credentials = Credentials::from_env();
    let model = match &credentials.gemini_api_key {
        Some(key) => Some(GeminiClient::new(key.clone(), config.model.clone())?),
        None => None,
    };

    let cache_path = cli
        .cache
        .clone()
        .unwrap_or_else(|| config.cache.expanded_path());

    Ok(FallbackClient::new(
        Some(server),
        model,
        LocalCache::new(cache_path),
        config.chat.clone(),
    ))
}

#[tokio::main]
async fn main() {
    // Load .env file if present (dev convenience; production uses real env vars)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Logs go to stderr so --json stdout stays parseable
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    let config = match PulseConfig::load("pulse.toml") {
        Ok(c) => c,
        Err(e) => {
            eprintln!("pulse: failed to load pulse.toml: {}", e);
            std::process::exit(1);
        }
    };

    let client = match build_client(&cli, &config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("pulse: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Analyze { file, url, json } => do_analyze(&client, file, url, json).await,
        Commands::Posts { topic, search, json } => do_posts(&client, topic, search, json).await,
        Commands::Show { id, json } => do_show(&client, id, json).await,
        Commands::Topics => do_topics(&client).await,
        Commands::Chat { message } => do_chat(&client, message).await,
        Commands::Status => do_status(&client).await,
    };

    if let Err(e) = result {
        eprintln!("pulse: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
