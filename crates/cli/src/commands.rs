//! Command-line surface and command execution.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use client::XapiClient;
use protocol::{
    content_hash, Condition, ProfileKey, ProfileOwner, Reply, StateKey, StatementQuery, IF_MATCH,
    IF_NONE_MATCH,
};
use serde_json::{json, Value};

/// Learning-record store client.
#[derive(Debug, Parser)]
#[command(name = "xapi", version, about)]
pub struct Cli {
    /// Configuration file (defaults to `.xapi/config.toml` if present).
    #[arg(long, global = true, env = "XAPI_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read and write statements.
    Statements {
        #[command(subcommand)]
        action: StatementsCommand,
    },
    /// Read, write and delete state documents.
    State {
        #[command(subcommand)]
        action: StateCommand,
    },
    /// Read, write and delete activity or agent profiles.
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
    /// Print the entity tag a JSON document will carry once stored.
    Hash {
        /// JSON document.
        #[arg(long)]
        file: PathBuf,
    },
    /// Show the versions the record store supports.
    About,
}

#[derive(Debug, Subcommand)]
pub enum StatementsCommand {
    /// Query statements, following up to `--hops` continuation pages.
    Get {
        /// Page size.
        #[arg(long)]
        limit: Option<u32>,
        /// Continuation pages to follow after the first.
        #[arg(long, default_value_t = 0)]
        hops: usize,
        /// Only statements stored after this RFC 3339 timestamp.
        #[arg(long)]
        since: Option<String>,
        /// Only statements with this verb.
        #[arg(long)]
        verb: Option<String>,
    },
    /// Store one statement (a JSON object) or a batch (a JSON array).
    Post {
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
pub struct StateTarget {
    /// Activity identifier.
    #[arg(long)]
    pub activity: String,
    /// Agent as JSON, e.g. '{"mbox":"mailto:a@example.com"}'.
    #[arg(long)]
    pub agent: String,
    /// State document identifier.
    #[arg(long)]
    pub state_id: Option<String>,
    /// Registration identifier.
    #[arg(long)]
    pub registration: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum StateCommand {
    /// Fetch a document, or the list of state ids without `--state-id`.
    Get {
        #[command(flatten)]
        target: StateTarget,
        #[arg(long)]
        since: Option<String>,
    },
    /// Replace a document.
    Put {
        #[command(flatten)]
        target: StateTarget,
        #[arg(long)]
        file: PathBuf,
        /// Only replace if the current entity tag equals this hash.
        #[arg(long)]
        match_hash: Option<String>,
    },
    /// Delete a document, or all documents without `--state-id`.
    Delete {
        #[command(flatten)]
        target: StateTarget,
    },
}

#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct ProfileOwnerArgs {
    /// Owning activity identifier.
    #[arg(long)]
    pub activity: Option<String>,
    /// Owning agent as JSON.
    #[arg(long)]
    pub agent: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ProfileTarget {
    #[command(flatten)]
    pub owner: ProfileOwnerArgs,
    /// Profile document identifier.
    #[arg(long)]
    pub profile_id: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Fetch a profile, or the owner's profile ids without `--profile-id`.
    Get {
        #[command(flatten)]
        target: ProfileTarget,
        #[arg(long)]
        since: Option<String>,
    },
    /// Replace a profile, optionally under a precondition.
    Put {
        #[command(flatten)]
        target: ProfileTarget,
        #[arg(long)]
        file: PathBuf,
        /// Only write if the current entity tag matches (`*` for "exists").
        #[arg(long, conflicts_with = "if_none_match")]
        if_match: Option<String>,
        /// Only write if absent (`*`) or the tag differs.
        #[arg(long)]
        if_none_match: Option<String>,
    },
    /// Delete a profile.
    Delete {
        #[command(flatten)]
        target: ProfileTarget,
    },
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn parse_agent(raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).context("--agent must be a JSON object")
}

impl StateTarget {
    fn key(&self) -> anyhow::Result<StateKey> {
        Ok(StateKey {
            activity_id: self.activity.clone(),
            agent: parse_agent(&self.agent)?,
            state_id: self.state_id.clone(),
            registration: self.registration.clone(),
        })
    }
}

impl ProfileTarget {
    fn key(&self) -> anyhow::Result<ProfileKey> {
        let owner = match (&self.owner.activity, &self.owner.agent) {
            (Some(activity), None) => ProfileOwner::Activity(activity.clone()),
            (None, Some(agent)) => ProfileOwner::Agent(parse_agent(agent)?),
            _ => return Err(anyhow!("exactly one of --activity or --agent is required")),
        };
        Ok(ProfileKey {
            owner,
            profile_id: self.profile_id.clone(),
        })
    }
}

/// Output of a single-exchange command: the decoded body, or the status and
/// entity tag when there is none.
fn render(reply: Reply) -> Value {
    match reply.data {
        Some(data) => data,
        None => json!({
            "status": reply.response.status,
            "etag": reply.response.etag(),
        }),
    }
}

/// Runs a command that needs no record store.
pub fn run_offline(command: &Command) -> Option<anyhow::Result<Value>> {
    match command {
        Command::Hash { file } => Some(read_json(file).map(|doc| json!(content_hash(&doc)))),
        _ => None,
    }
}

/// Runs `command` against `client`.
pub async fn run(command: Command, client: &XapiClient) -> anyhow::Result<Value> {
    let reply = match command {
        Command::Statements { action } => match action {
            StatementsCommand::Get {
                limit,
                hops,
                since,
                verb,
            } => {
                let mut query = StatementQuery::new();
                if let Some(limit) = limit {
                    query = query.limit(limit);
                }
                if let Some(since) = since {
                    query = query.since(since);
                }
                if let Some(verb) = verb {
                    query = query.verb(verb);
                }
                let collection = client.get_more_statements(query, hops).await?;
                tracing::info!(
                    pages = collection.pages,
                    records = collection.statements.len(),
                    "statements fetched"
                );
                return Ok(collection.to_value());
            }
            StatementsCommand::Post { file } => {
                let document = read_json(&file)?;
                if document.is_array() {
                    client.post_statements(document).await?
                } else {
                    client.post_statement(document).await?
                }
            }
        },
        Command::State { action } => match action {
            StateCommand::Get { target, since } => client.get_state(target.key()?, since).await?,
            StateCommand::Put {
                target,
                file,
                match_hash,
            } => {
                client
                    .put_state(target.key()?, read_json(&file)?, match_hash)
                    .await?
            }
            StateCommand::Delete { target } => client.delete_state(target.key()?).await?,
        },
        Command::Profile { action } => match action {
            ProfileCommand::Get { target, since } => {
                client.get_profile(target.key()?, since).await?
            }
            ProfileCommand::Put {
                target,
                file,
                if_match,
                if_none_match,
            } => {
                let condition = match (if_match, if_none_match) {
                    (Some(tag), _) => Some(Condition::new(IF_MATCH, tag)),
                    (None, Some(tag)) => Some(Condition::new(IF_NONE_MATCH, tag)),
                    (None, None) => None,
                };
                client
                    .put_profile(target.key()?, read_json(&file)?, condition)
                    .await?
            }
            ProfileCommand::Delete { target } => client.delete_profile(target.key()?).await?,
        },
        Command::About => client.about().await?,
        Command::Hash { file } => return Ok(json!(content_hash(&read_json(&file)?))),
    };
    Ok(render(reply))
}
