use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use noteboard::backend::{BackendError, NoteFilter};
use noteboard::config::{BackendConfig, BoardConfig};
use noteboard::doc::{Importance, NoteDraft, NoteId, NotePatch, TagId};
use noteboard::engine::{EngineCore, Role};
use noteboard::error::BoardError;
use noteboard::http::HttpBackend;
use noteboard::session::BoardSession;
use noteboard::sync::Notice;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} operation(s) failed to persist")]
    Persist(usize),
}

#[derive(Parser, Debug)]
#[command(name = "noteboard", about = "Spatial note board client")]
struct Cli {
    #[arg(long, env = "NOTEBOARD_ROLE", value_enum, default_value_t = RoleArg::Editor)]
    role: RoleArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    Viewer,
    Editor,
    Admin,
}

impl From<RoleArg> for Role {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Viewer => Role::Viewer,
            RoleArg::Editor => Role::Editor,
            RoleArg::Admin => Role::Admin,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    Notes(NotesCommand),
    Tags(TagsCommand),
}

#[derive(Args, Debug)]
struct NotesCommand {
    #[command(subcommand)]
    command: NotesSubcommand,
}

#[derive(Subcommand, Debug)]
enum NotesSubcommand {
    List {
        #[arg(long)]
        query: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<i64>,
        #[arg(long)]
        importance: Option<Importance>,
        #[arg(long)]
        locked: Option<bool>,
    },
    Add {
        content: String,
        #[arg(long, requires = "y")]
        x: Option<f64>,
        #[arg(long, requires = "x")]
        y: Option<f64>,
        #[arg(long, default_value = "medium")]
        importance: Importance,
        #[arg(long)]
        color: Option<String>,
    },
    Move {
        id: i64,
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

#[derive(Args, Debug)]
struct TagsCommand {
    #[command(subcommand)]
    command: TagsSubcommand,
}

#[derive(Subcommand, Debug)]
enum TagsSubcommand {
    List,
    Add { name: String, color: String },
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "no .env file loaded");
    }

    let cli = Cli::parse();
    let backend = Arc::new(HttpBackend::new(&BackendConfig::from_env()?)?);
    let engine = EngineCore::new(BoardConfig::from_env(), cli.role.into());
    let mut session = BoardSession::new(engine, backend.clone()).with_tags(backend);

    match cli.command {
        Command::Notes(notes) => run_notes(&mut session, notes).await,
        Command::Tags(tags) => run_tags(&mut session, tags).await,
    }
}

async fn run_notes(session: &mut BoardSession, notes: NotesCommand) -> Result<(), CliError> {
    match notes.command {
        NotesSubcommand::List { query, tags, importance, locked } => {
            let filter = NoteFilter { query, tag_ids: tags.into_iter().map(TagId).collect(), importance, locked };
            session.reload(&filter).await?;
            for note in session.engine().notes().all() {
                println!("{}", serde_json::to_string(note)?);
            }
            Ok(())
        }
        NotesSubcommand::Add { content, x, y, importance, color } => {
            session.reload(&NoteFilter::default()).await?;
            let config = *session.engine().config();
            let draft = NoteDraft {
                content,
                importance,
                color: color.unwrap_or_else(|| noteboard::consts::DEFAULT_NOTE_COLOR.to_owned()),
                x: x.unwrap_or(0.0),
                y: y.unwrap_or(0.0),
                width: config.default_width,
                height: config.default_height,
                z_index: 0,
                tag_ids: Default::default(),
            };
            let mut notices = session.try_dispatch(|e| e.add_note_with(draft))?;
            notices.extend(session.settle().await);
            report(&notices)
        }
        NotesSubcommand::Move { id, x, y } => {
            session.reload(&NoteFilter::default()).await?;
            let mut notices = session.try_dispatch(|e| e.update_note(NoteId(id), NotePatch::position(x, y)))?;
            notices.extend(session.settle().await);
            report(&notices)?;
            if let Some(note) = session.engine().note(NoteId(id)) {
                println!("{}", serde_json::to_string(note)?);
            }
            Ok(())
        }
        NotesSubcommand::Delete { ids } => {
            session.reload(&NoteFilter::default()).await?;
            let ids: Vec<NoteId> = ids.into_iter().map(NoteId).collect();
            let mut notices = match ids.as_slice() {
                [id] => session.try_dispatch(|e| e.delete_note(*id))?,
                _ => session.try_dispatch(|e| e.bulk_delete(&ids))?,
            };
            notices.extend(session.settle().await);
            report(&notices)
        }
    }
}

async fn run_tags(session: &mut BoardSession, tags: TagsCommand) -> Result<(), CliError> {
    match tags.command {
        TagsSubcommand::List => {
            session.refresh_tags().await?;
        }
        TagsSubcommand::Add { name, color } => {
            let tag = session.create_tag(&name, &color).await?;
            println!("created tag {}", tag.id);
        }
        TagsSubcommand::Delete { id } => {
            session.delete_tag(TagId(id)).await?;
            println!("deleted tag {id}");
        }
    }
    for tag in session.engine().tags() {
        println!("{}", serde_json::to_string(tag)?);
    }
    Ok(())
}

/// Print every notice and fail if any operation did not persist.
fn report(notices: &[Notice]) -> Result<(), CliError> {
    let mut failures = 0;
    for notice in notices {
        match notice {
            Notice::Created { provisional, id } => println!("created note {id} (was {provisional})"),
            Notice::Failed(f) => {
                failures += 1;
                eprintln!("{:?} of note {} failed: {}", f.op, f.id, f.error);
            }
            Notice::BulkDeleteFinished(r) => {
                failures += r.failed.len();
                println!("deleted {} note(s)", r.deleted.len());
                for (id, error) in &r.failed {
                    eprintln!("delete of note {id} failed: {error}");
                }
                for id in &r.skipped_locked {
                    eprintln!("note {id} is locked; skipped");
                }
            }
        }
    }
    if failures > 0 { Err(CliError::Persist(failures)) } else { Ok(()) }
}
