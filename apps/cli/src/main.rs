mod config;
mod forms;
mod render;
mod shell;

use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use client_core::{
    AvatarUpload, ClientError, DeleteOutcome, ListPage, QueryState, SessionContext, SsisClient,
};
use config::Settings;
use forms::Form;
use shared::{
    domain::{College, Program, Student},
    protocol::SortOrder,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ssis", version, about = "Client for the student information system")]
struct Cli {
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[arg(long, global = true)]
    page_size: Option<u32>,
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    #[arg(long, global = true)]
    username: Option<String>,
    #[arg(long, global = true)]
    password: Option<String>,
    /// Log filter, e.g. `debug` or `client_core=debug`.
    #[arg(long, global = true)]
    log: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with the configured credentials.
    Login,
    Signup {
        username: String,
        email: String,
    },
    Whoami,
    Logout,
    /// Record totals shown on the dashboard.
    Stats,
    Colleges {
        #[command(subcommand)]
        action: RecordAction,
    },
    Programs {
        #[command(subcommand)]
        action: RecordAction,
    },
    Students {
        #[command(subcommand)]
        action: RecordAction,
    },
    /// Interactive list view.
    Shell { entity: Entity },
}

#[derive(Subcommand, Debug)]
enum RecordAction {
    List(ListArgs),
    Show {
        key: String,
    },
    /// Values in form order, e.g. `colleges add CCS "College of Computer Studies"`.
    Add {
        values: Vec<String>,
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
    Edit {
        key: String,
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
        #[arg(long)]
        avatar: Option<PathBuf>,
    },
    Delete {
        key: String,
    },
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    sort: Option<String>,
    #[arg(long)]
    desc: bool,
    #[arg(long = "filter", value_name = "FACET=a,b")]
    filters: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Entity {
    Colleges,
    Programs,
    Students,
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let mut settings = config::load_settings(&self.config)?;
        if let Some(v) = &self.api_url {
            settings.api_url = v.clone();
        }
        if let Some(v) = self.page_size {
            settings.page_size = v;
        }
        if let Some(v) = self.timeout_secs {
            settings.timeout_secs = v;
        }
        if let Some(v) = &self.username {
            settings.username = Some(v.clone());
        }
        if let Some(v) = &self.password {
            settings.password = Some(v.clone());
        }
        if let Some(v) = &self.log {
            settings.log = v.clone();
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;
    init_logging(&settings.log);

    match cli.command {
        Command::Login => {
            settings
                .credentials()
                .context("no credentials: set SSIS_USERNAME and SSIS_PASSWORD or pass --username/--password")?;
            let session = connect(&settings).await?;
            if let Some(user) = session.current().await.user() {
                println!("Signed in as {}", user.username);
            }
        }
        Command::Signup { username, email } => {
            let password = settings
                .password
                .as_deref()
                .context("no password: set SSIS_PASSWORD or pass --password")?;
            let session = SessionContext::new(client(&settings)?);
            session
                .signup(&username, &email, password)
                .await
                .map_err(|err| failure(err, "Failed to create account"))?;
            println!("Account created for {username}. You can now sign in.");
        }
        Command::Whoami => {
            let session = connect(&settings).await?;
            match session.current().await.user() {
                Some(user) => println!("{} <{}>", user.username, user.email),
                None => println!("Not signed in."),
            }
        }
        Command::Logout => {
            let session = connect(&settings).await?;
            session
                .logout()
                .await
                .map_err(|err| failure(err, "Failed to sign out"))?;
            println!("Signed out.");
        }
        Command::Stats => {
            let session = connect(&settings).await?;
            let stats = session
                .client()
                .stats()
                .await
                .map_err(|err| failure(err, "Failed to load statistics"))?;
            print!("{}", render::stats(&stats));
        }
        Command::Colleges { action } => records::<College>(&settings, action).await?,
        Command::Programs { action } => records::<Program>(&settings, action).await?,
        Command::Students { action } => records::<Student>(&settings, action).await?,
        Command::Shell { entity } => {
            let session = connect(&settings).await?;
            let client = session.client().clone();
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            match entity {
                Entity::Colleges => {
                    shell::Shell::new(ListPage::<College>::new(client, settings.page_size), stdin)
                        .run()
                        .await?
                }
                Entity::Programs => {
                    shell::Shell::new(ListPage::<Program>::new(client, settings.page_size), stdin)
                        .run()
                        .await?
                }
                Entity::Students => {
                    let page = ListPage::<Student>::new(client, settings.page_size);
                    match page.facet_options().await {
                        Ok(options) => {
                            for (facet, values) in &options {
                                println!("{facet}: {}", values.join(", "));
                            }
                        }
                        Err(err) => println!("! {}", err.user_message("Failed to load filter options")),
                    }
                    shell::Shell::new(page, stdin).run().await?
                }
            }
        }
    }

    Ok(())
}

fn init_logging(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn client(settings: &Settings) -> Result<SsisClient> {
    SsisClient::with_timeout(
        &settings.api_url,
        Duration::from_secs(settings.timeout_secs),
    )
    .context("invalid api_url")
}

/// Cookies only live as long as the process, so every command signs in
/// first when credentials are configured.
async fn connect(settings: &Settings) -> Result<SessionContext> {
    let session = SessionContext::new(client(settings)?);
    match settings.credentials() {
        Some((username, password)) => {
            session
                .login(username, password)
                .await
                .map_err(|err| failure(err, "Invalid username or password"))?;
        }
        None => {
            session
                .initialize()
                .await
                .map_err(|err| failure(err, "Failed to check session"))?;
        }
    }
    info!(state = ?session.current().await, "session ready");
    Ok(session)
}

/// Keeps the server's message up front and the transport detail as cause.
fn failure(err: ClientError, fallback: &str) -> anyhow::Error {
    let message = err.user_message(fallback);
    anyhow::Error::new(err).context(message)
}

async fn records<E: Form>(settings: &Settings, action: RecordAction) -> Result<()> {
    let session = connect(settings).await?;
    let client = session.client().clone();

    match action {
        RecordAction::List(args) => {
            let mut query = QueryState::new(settings.page_size);
            query.page = args.page.max(1);
            query.sort_by = Some(args.sort.unwrap_or_else(|| E::DEFAULT_SORT.to_string()));
            if args.desc {
                query.sort_order = SortOrder::Desc;
            }
            query.search_text = args.search.unwrap_or_default();
            for raw in &args.filters {
                let (facet, values) = shell::parse_filter(raw).map_err(anyhow::Error::msg)?;
                query.filters.entry(facet).or_default().extend(values);
            }

            let page = ListPage::<E>::with_query(client, query)
                .map_err(|err| failure(err, "Invalid list options"))?;
            page.load()
                .await
                .map_err(|err| failure(err, &format!("Failed to load {}s.", E::LABEL)))?;
            print!("{}", render::snapshot(&page.snapshot().await));
        }
        RecordAction::Show { key } => {
            let record = client
                .get::<E>(&key)
                .await
                .map_err(|err| failure(err, &format!("Failed to load {}", E::LABEL)))?;
            print!("{}", render::record(&record));
        }
        RecordAction::Add { values, avatar } => {
            let mut draft = E::build(&values)
                .with_context(|| format!("fields: {}", E::FIELDS.join(" ")))?;
            if let Some(path) = avatar {
                draft = E::attach_avatar(draft, AvatarUpload::from_path(&path).await?)?;
            }
            let mut page = ListPage::<E>::new(client, settings.page_size);
            page.open_add(draft);
            submit(&mut page).await?;
        }
        RecordAction::Edit { key, set, avatar } => {
            let mut page = ListPage::<E>::new(client, settings.page_size);
            let editor = page
                .open_edit(&key)
                .await
                .map_err(|err| failure(err, &format!("Failed to load {}", E::LABEL)))?;
            let mut values = E::values(&editor.draft);
            forms::apply_overrides::<E>(&mut values, &set)?;
            let mut draft = E::build(&values)?;
            if let Some(path) = avatar {
                draft = E::attach_avatar(draft, AvatarUpload::from_path(&path).await?)?;
            }
            editor.draft = draft;
            submit(&mut page).await?;
        }
        RecordAction::Delete { key } => {
            let mut page = ListPage::<E>::new(client, settings.page_size);
            let pending = page.request_delete(&key, Instant::now());
            println!("{} Press Ctrl-C to abort.", pending.title());
            match shell::delete_pending(&mut page).await {
                DeleteOutcome::Deleted => println!("Deleted {key}."),
                DeleteOutcome::Failed => match page.error_dialog() {
                    Some(dialog) => bail!("{}: {}", dialog.title, dialog.description),
                    None => bail!("Failed to delete {}", E::LABEL),
                },
                DeleteOutcome::NothingPending => {}
            }
        }
    }
    Ok(())
}

async fn submit<E: Form>(page: &mut ListPage<E>) -> Result<()> {
    let Some(mode) = page.editor().map(|editor| editor.mode().clone()) else {
        return Ok(());
    };
    let verb = mode.verb();
    match page.submit().await {
        Ok(()) => {
            println!("{}", shell::saved_message::<E>(&mode));
            Ok(())
        }
        Err(err) => {
            let message = page
                .editor()
                .and_then(|editor| editor.error())
                .map(str::to_string)
                .unwrap_or_else(|| err.user_message(&format!("Failed to {verb} {}", E::LABEL)));
            Err(anyhow::Error::new(err).context(message))
        }
    }
}
