use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};

use stash_client::{ApiClient, Dashboard, TokenStore};
use stash_types::models::{Link, LinkId};

#[derive(Parser, Debug)]
#[command(name = "stash", version, about = "Save, tag, and reorder links")]
struct Cli {
    /// Base URL of the Stash server
    #[arg(long, env = "STASH_SERVER_URL", default_value = "http://localhost:5000")]
    server: String,

    /// Where the access token is kept between runs
    #[arg(long, env = "STASH_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account
    Register {
        email: String,
        #[arg(long, env = "STASH_PASSWORD")]
        password: String,
    },
    /// Log in and remember the token
    Login {
        email: String,
        #[arg(long, env = "STASH_PASSWORD")]
        password: String,
    },
    /// Forget the stored token
    Logout,
    /// Show saved links in order
    List {
        #[arg(long)]
        tag: Option<String>,
    },
    /// Show every tag in use
    Tags,
    /// Save a link
    Add {
        url: String,
        /// Comma-separated, e.g. "tech, news"
        #[arg(long, default_value = "")]
        tags: String,
    },
    /// Delete a link by id
    Delete { id: LinkId },
    /// Move the link at position FROM to position TO (1-based, as shown by `list`)
    Move {
        from: usize,
        to: usize,
        /// Positions refer to the list filtered by this tag
        #[arg(long)]
        tag: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let token_path = match cli.token_file {
        Some(path) => path,
        None => TokenStore::default_path().context("no config directory for the token file")?,
    };
    let tokens = TokenStore::new(token_path);
    let api = ApiClient::new(&cli.server).with_token(tokens.load()?);

    match cli.command {
        Command::Register { email, password } => {
            api.register(&email, &password).await?;
            println!("Registered {email}. Log in with `stash login {email}`.");
        }
        Command::Login { email, password } => {
            let token = api.login(&email, &password).await?;
            tokens.save(&token)?;
            println!("Logged in as {email}.");
        }
        Command::Logout => {
            tokens.clear()?;
            println!("Logged out.");
        }
        Command::List { tag } => {
            let mut dashboard = Dashboard::new(api, tokens);
            dashboard.refresh().await?;
            dashboard.board_mut().set_filter(tag.as_deref());
            let visible = dashboard.board().visible();
            if visible.is_empty() {
                println!("No links saved yet. Add one with `stash add <url>`.");
            }
            for (position, link) in visible.into_iter().enumerate() {
                print_link(position + 1, link);
            }
        }
        Command::Tags => {
            let mut dashboard = Dashboard::new(api, tokens);
            for tag in dashboard.tags().await? {
                println!("{tag}");
            }
        }
        Command::Add { url, tags } => {
            let mut dashboard = Dashboard::new(api, tokens);
            let link = dashboard.save(&url, &tags).await?;
            print_link(link.order as usize + 1, &link);
        }
        Command::Delete { id } => {
            let mut dashboard = Dashboard::new(api, tokens);
            dashboard.delete(id).await?;
            println!("Deleted {id}.");
        }
        Command::Move { from, to, tag } => {
            if from == 0 || to == 0 {
                bail!("positions start at 1");
            }
            let mut dashboard = Dashboard::new(api, tokens);
            dashboard.refresh().await?;
            dashboard.board_mut().set_filter(tag.as_deref());
            dashboard.reorder(from - 1, to - 1).await?;
            for (position, link) in dashboard.board().visible().into_iter().enumerate() {
                print_link(position + 1, link);
            }
        }
    }

    Ok(())
}

fn print_link(position: usize, link: &Link) {
    let title = if link.title.is_empty() { &link.url } else { &link.title };
    println!("{position:>3}. {title}  <{}>  (id {})", link.url, link.id);
    if !link.tags.is_empty() {
        println!("     tags: {}", link.tags.join(", "));
    }
    if !link.summary.is_empty() {
        println!("     {}", link.summary.replace('\n', " "));
    }
}
