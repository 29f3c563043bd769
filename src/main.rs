use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use gistghost::{
    Config, ContentFormat, DirectoryHost, Ghost, GhostError, GraphIndex, SearchField, ThoughtNode,
    ThoughtStatus, DEFAULT_RELATIONSHIP,
};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gistghost")]
#[command(
    author,
    version,
    about = "GistGhost - Thought network index for the Hydra network. \
             Track thoughts, their evolution, and the links between them."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new thought (content from --content or stdin)
    Create {
        /// Thought intent/purpose
        #[arg(short, long)]
        intent: String,

        /// Thought content
        #[arg(short, long)]
        content: Option<String>,

        /// Priority (1-10), defaults to the configured priority
        #[arg(short, long, allow_hyphen_values = true)]
        priority: Option<i64>,

        /// File format: md, json, txt
        #[arg(short, long, default_value = "md")]
        format: ContentFormat,

        /// Custom filename
        #[arg(long)]
        filename: Option<String>,
    },

    /// Evolve an existing thought into a successor
    Evolve {
        /// Parent thought id
        id: String,

        /// New content (or stdin; keeps the parent's content if empty)
        #[arg(short, long)]
        content: Option<String>,

        /// New intent
        #[arg(short, long)]
        intent: Option<String>,
    },

    /// Link two thoughts
    Link {
        from: String,
        to: String,

        /// Relationship type
        #[arg(short, long, default_value = DEFAULT_RELATIONSHIP)]
        relationship: String,
    },

    /// List thoughts, newest first
    List {
        /// Filter by status: new, processing, complete, evolving
        #[arg(short, long)]
        status: Option<ThoughtStatus>,

        /// Max results
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Search thoughts by intent, content or origin
    Search {
        query: String,

        /// Fields to search (repeatable): intent, content, origin
        #[arg(short, long)]
        field: Vec<SearchField>,
    },

    /// Show one thought as JSON
    Show { id: String },

    /// Show every thought linked from a thought
    Related { id: String },

    /// Show the evolution chain containing a thought
    Chain { id: String },

    /// Show every evolution chain
    Chains,

    /// Show network statistics
    Network {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update the status of a thought
    Status {
        id: String,
        /// new, processing, complete, evolving
        status: String,
    },

    /// Remove a thought and all its relationships (prefer evolving)
    Remove { id: String },

    /// Export the network
    Export {
        /// json or dot
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a backup of the index
    Backup { path: PathBuf },

    /// Replace the index with a backup
    Restore { path: PathBuf },

    /// Import a hosted document into the index
    Import { id: String },

    /// Generate shell completions
    Completion { shell: Shell },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Content from the flag, else from piped stdin
fn read_content(flag: Option<String>) -> io::Result<String> {
    if let Some(content) = flag {
        return Ok(content);
    }
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }
    let mut buf = String::new();
    stdin.lock().read_to_string(&mut buf)?;
    Ok(buf.trim().to_string())
}

fn status_label(status: ThoughtStatus) -> colored::ColoredString {
    match status {
        ThoughtStatus::New => status.as_str().cyan(),
        ThoughtStatus::Processing => status.as_str().yellow(),
        ThoughtStatus::Complete => status.as_str().green(),
        ThoughtStatus::Evolving => status.as_str().magenta(),
    }
}

fn print_thought_line(thought: &ThoughtNode) {
    println!(
        "{} | {} [{}]",
        thought.id.as_deref().unwrap_or("-").bold(),
        thought.intent,
        status_label(thought.status)
    );
    println!("   Priority: {} | {}", thought.priority, thought.timestamp.dimmed());
    if let Some(parent) = &thought.parent_id {
        println!("   Parent: {}", parent);
    }
}

fn print_chain(chain: &[String]) {
    println!("{}", chain.join(" -> "));
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let index = GraphIndex::open(config.index_path());
    let host = DirectoryHost::new(config.host_dir());
    let mut ghost = Ghost::new(config, host, index);

    match cli.command {
        Command::Create {
            intent,
            content,
            priority,
            format,
            filename,
        } => {
            let content = read_content(content)?;
            if content.is_empty() {
                return Err("No content provided (pass --content or pipe stdin)".into());
            }
            let (thought, record) =
                ghost.create_thought(&content, &intent, priority, format, filename)?;
            println!("{} {}", "Created thought:".green().bold(), record.id);
            println!("   Intent: {}", thought.intent);
            println!("   Priority: {}", thought.priority);
            println!("   URL: {}", record.url);
        }

        Command::Evolve { id, content, intent } => {
            let content = read_content(content)?;
            let content = (!content.is_empty()).then_some(content);
            let (thought, record) = ghost.evolve_thought(&id, content, intent)?;
            println!("{} {}", "Evolved thought:".green().bold(), record.id);
            println!("   Parent: {}", id);
            println!("   New Intent: {}", thought.intent);
            println!("   Version: {}", thought.version);
            println!("   URL: {}", record.url);
        }

        Command::Link { from, to, relationship } => {
            ghost.link_thoughts(&from, &to, &relationship)?;
            println!("{} {} -> {} ({})", "Linked thoughts:".green().bold(), from, to, relationship);
        }

        Command::List { status, limit } => {
            let thoughts = ghost.index().list_nodes(status, limit);
            if thoughts.is_empty() {
                println!("No thoughts found");
            } else {
                println!("{} ({}):", "Recent thoughts".bold(), thoughts.len());
                for thought in thoughts {
                    print_thought_line(thought);
                }
            }
        }

        Command::Search { query, field } => {
            let fields = if field.is_empty() {
                SearchField::DEFAULT.to_vec()
            } else {
                field
            };
            let hits = ghost.index().search_nodes(&query, &fields);
            println!("{} matching '{}':", hits.len(), query);
            for thought in hits {
                print_thought_line(thought);
            }
        }

        Command::Show { id } => {
            let thought = ghost
                .index()
                .get(&id)
                .ok_or_else(|| GhostError::NotFound(id.clone()))?;
            println!("{}", serde_json::to_string_pretty(thought)?);
        }

        Command::Related { id } => {
            if !ghost.index().contains(&id) {
                return Err(GhostError::NotFound(id).into());
            }
            for related in ghost.index().related(&id) {
                println!(
                    "{} {} | {}",
                    related.relationship.cyan(),
                    related.thought.id.as_deref().unwrap_or("-"),
                    related.thought.intent
                );
            }
        }

        Command::Chain { id } => {
            if !ghost.index().contains(&id) {
                return Err(GhostError::NotFound(id).into());
            }
            print_chain(&ghost.index().evolution_chain(&id));
        }

        Command::Chains => {
            let chains = ghost.index().evolution_chains();
            if chains.is_empty() {
                println!("No evolution chains");
            }
            for chain in &chains {
                print_chain(chain);
            }
        }

        Command::Network { json } => {
            let stats = ghost.index().network_stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", "Thought Network Status:".bold());
                println!("   Total thoughts: {}", stats.total_thoughts);
                println!("   Active thoughts: {}", stats.active_thoughts);
                println!("   Completed thoughts: {}", stats.completed_thoughts);
                println!("   Evolving thoughts: {}", stats.evolving_thoughts);
                println!("   Evolution chains: {}", stats.evolution_chains);
                println!("   Semantic links: {}", stats.semantic_links);
                println!("   Avg chain length: {:.2}", stats.avg_chain_length);
            }
        }

        Command::Status { id, status } => {
            let status: ThoughtStatus = status.parse()?;
            ghost.index_mut().set_status(&id, status)?;
            println!("{} {} -> {}", "Status updated:".green().bold(), id, status_label(status));
        }

        Command::Remove { id } => {
            ghost.index_mut().remove_node(&id)?;
            println!("{} {}", "Removed thought:".yellow().bold(), id);
        }

        Command::Export { format, output } => {
            let exported = ghost.index().export(&format)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, exported)?;
                    println!("{} {}", "Exported to".green().bold(), path.display());
                }
                None => println!("{}", exported),
            }
        }

        Command::Backup { path } => {
            ghost.index().backup(&path)?;
            println!("{} {}", "Backup written:".green().bold(), path.display());
        }

        Command::Restore { path } => {
            ghost.index_mut().restore(&path)?;
            println!(
                "{} {} ({} thoughts)",
                "Restored from".green().bold(),
                path.display(),
                ghost.index().len()
            );
        }

        Command::Import { id } => {
            let thought = ghost.import_thought(&id)?;
            println!("{} {}", "Imported thought:".green().bold(), thought);
        }

        Command::Completion { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "gistghost", &mut io::stdout());
        }
    }

    Ok(())
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
