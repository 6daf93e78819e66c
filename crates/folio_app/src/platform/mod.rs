pub mod app;
pub mod config;
pub mod effects;
pub mod ui;
pub mod viewer;

use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use folio_core::{JobStatus, Msg, Scope};
use folio_engine::{ActionablesStatus, EngineHandle, HttpBackend, LocalDocumentStore, PollOutcome};
use folio_logging::{folio_info, LogDestination};
use log::LevelFilter;

use crate::cli::{Cli, Command};
use app::App;
use config::AppConfig;
use effects::EffectRunner;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::load(&cli.config)?;
    config.apply_env(|key| std::env::var(key).ok());
    config.apply_flags(cli.base_url.as_deref());

    let destination = if cli.verbose {
        LogDestination::Both
    } else {
        LogDestination::File
    };
    folio_logging::initialize(destination, LevelFilter::Info, &config.log_file);
    folio_info!("folio starting against {}", config.base_url);

    let backend = HttpBackend::new(config.client_settings())
        .with_context(|| format!("backend url {}", config.base_url))?;
    let (engine, events) = EngineHandle::new(
        Arc::new(backend),
        LocalDocumentStore::new(config.cache_dir.clone()),
    );
    let runner = EffectRunner::new(engine, config.navigation_settings());
    let mut app = App::new(runner, events, true);

    execute(&mut app, cli.command).await
}

/// Runs one command to completion against an assembled app.
pub async fn execute(app: &mut App, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Extract { document_id, force } => {
            app.dispatch(Msg::ExtractRequested { document_id, force });
            app.run_until_idle().await;
            match app.state().extraction().status() {
                JobStatus::Succeeded => Ok(()),
                JobStatus::Failed { reason } => bail!("extraction failed: {reason}"),
                other => bail!("extraction stopped while {other:?}"),
            }
        }
        Command::Actionables { document_id, open } => {
            app.fetch_actionables(document_id.clone());
            app.run_until_idle().await;
            let status = app
                .take_actionables()
                .ok_or_else(|| anyhow!("no actionables response"))??;
            if let Some(number) = open {
                let ActionablesStatus::Extracted(result) = &status else {
                    bail!("{document_id} has no extracted actionables");
                };
                let item = number
                    .checked_sub(1)
                    .and_then(|index| result.actionables.get(index))
                    .ok_or_else(|| anyhow!("no actionable #{number}"))?;
                let page_number = item
                    .source_page_number()
                    .ok_or_else(|| anyhow!("actionable #{number} has no source page"))?;
                open_page(app, document_id, page_number).await;
            }
            Ok(())
        }
        Command::Ask {
            scope,
            question,
            new,
            session,
            open_citation,
        } => {
            app.dispatch(Msg::ScopeSelected(Scope::from_key(&scope)));
            app.run_until_idle().await;
            if new {
                app.dispatch(Msg::NewSessionClicked);
            } else if let Some(conversation_id) = session {
                app.dispatch(Msg::SessionSelected { conversation_id });
                app.run_until_idle().await;
            }
            app.dispatch(Msg::QuestionSubmitted(question));
            app.run_until_idle().await;

            if let Some(error) = app.state().session().error() {
                bail!("{error}");
            }
            if let Some(number) = open_citation {
                let citation = app
                    .state()
                    .session()
                    .turns()
                    .last()
                    .and_then(|turn| turn.citations.get(number.checked_sub(1)?))
                    .cloned()
                    .ok_or_else(|| anyhow!("no citation #{number}"))?;
                app.dispatch(Msg::CitationSelected(citation));
                settle(app).await;
            }
            Ok(())
        }
        Command::Sessions { scope, delete } => {
            app.dispatch(Msg::ScopeSelected(Scope::from_key(&scope)));
            app.run_until_idle().await;
            if let Some(conversation_id) = delete {
                app.dispatch(Msg::DeleteSessionClicked { conversation_id });
                app.run_until_idle().await;
            }
            let session = app.state().session();
            let lines = ui::render::render_sessions(session.sessions(), session.conversation_id());
            let error = session.error().map(str::to_string);
            app.emit(lines);
            match error {
                Some(error) => bail!("{error}"),
                None => Ok(()),
            }
        }
        Command::Open { document_id, page } => {
            open_page(app, document_id, page).await;
            Ok(())
        }
        Command::Feedback {
            record_id,
            rating,
            text,
        } => {
            app.dispatch(Msg::FeedbackSubmitted {
                record_id,
                rating,
                text,
            });
            app.run_until_idle().await;
            app.take_feedback()
                .ok_or_else(|| anyhow!("no feedback response"))?
                .context("sending feedback")?;
            app.emit(vec!["Feedback sent".to_string()]);
            Ok(())
        }
    }
}

async fn open_page(app: &mut App, document_id: String, page_number: u32) {
    app.dispatch(Msg::NavigateRequested {
        document_id,
        page_number,
    });
    settle(app).await;
}

/// Waits for the viewer to mount and for its scroll poll to finish. A page
/// that never renders is not an error.
async fn settle(app: &mut App) {
    app.run_until_idle().await;
    let outcomes = app.runner().settle_navigation().await;
    let shown = app.runner().shown_pages();
    let path = app.runner().mounted_path().map(|path| path.display().to_string());
    let mut lines = Vec::new();
    if let Some(path) = path {
        lines.push(format!("Viewer: {path}"));
    }
    for (page_index, offset) in shown {
        lines.push(format!("Showing page {} (scroll {:.0})", page_index + 1, offset));
    }
    if outcomes.contains(&PollOutcome::Missed) {
        folio_info!("Page did not render in time; document opened without scrolling");
    }
    app.emit(lines);
}
