mod config;
mod effects;
mod render;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use postes_core::{parse_groups, EstablishmentId, Feedback, GroupId, Msg, SubmissionStatus};
use postes_engine::EngineHandle;
use postes_logging::{postes_info, LogDestination};

use config::AppConfig;
use effects::EffectRunner;
use session::SessionDriver;

#[derive(Parser, Debug)]
#[command(name = "postes", version, about = "Merge equivalent job labels of an establishment")]
struct Cli {
    /// Configuration file (RON). Defaults to ./postes.ron when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend API root, e.g. http://127.0.0.1:8080/api
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Directory for locally stored groupings.
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the saved grouping, the merged catalog and the indicators.
    Show { siret: String },
    /// List backend merge suggestions.
    Suggestions { siret: String },
    /// List the jobs selectable for a group.
    Options {
        siret: String,
        /// Existing group being edited; omit for a new group.
        #[arg(long)]
        group: Option<GroupId>,
        #[arg(long)]
        hide_merged: bool,
    },
    /// Save a grouping given as comma-separated label ids, one --group per merge.
    Merge {
        siret: String,
        #[arg(long = "group", required = true)]
        groups: Vec<String>,
        /// Keep the saved groups and add these ones.
        #[arg(long)]
        append: bool,
    },
    /// Accept suggestions by index and save.
    Accept {
        siret: String,
        #[arg(required = true)]
        indices: Vec<usize>,
    },
    /// Remove one saved group and save.
    Unmerge { siret: String, group: GroupId },
    /// Drop every group and clear the stored grouping.
    Reset { siret: String },
}

impl Command {
    fn siret(&self) -> &str {
        match self {
            Command::Show { siret }
            | Command::Suggestions { siret }
            | Command::Options { siret, .. }
            | Command::Merge { siret, .. }
            | Command::Accept { siret, .. }
            | Command::Unmerge { siret, .. }
            | Command::Reset { siret } => siret,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?
        .with_overrides(cli.base_url.clone(), cli.store_dir.clone());

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let destination = match &config.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    postes_logging::initialize(destination, level);

    let establishment = EstablishmentId::new(cli.command.siret());
    if establishment.as_str().is_empty() {
        bail!("establishment id must not be empty");
    }

    let engine = EngineHandle::new(config.engine_config()).context("starting engine")?;
    let mut driver = SessionDriver::new(establishment, EffectRunner::new(engine));
    let wait = config.wait();

    if config.hide_merged {
        driver.dispatch(Msg::HideMergedToggled(true));
    }
    if !driver.enter(wait) {
        bail!("backend did not answer within {}s", wait.as_secs());
    }
    if !driver.state().is_ready() {
        print!("{}", render::render_status(&driver.view()));
        driver.leave();
        return Ok(ExitCode::FAILURE);
    }

    let code = run_command(&mut driver, cli.command, &config)?;
    driver.leave();
    Ok(code)
}

fn run_command(
    driver: &mut SessionDriver,
    command: Command,
    config: &AppConfig,
) -> anyhow::Result<ExitCode> {
    let wait = config.wait();
    match command {
        Command::Show { .. } => {
            print!("{}", render::render_session(&driver.view()));
            Ok(ExitCode::SUCCESS)
        }
        Command::Suggestions { .. } => {
            print!("{}", render::render_suggestions(&driver.view()));
            Ok(ExitCode::SUCCESS)
        }
        Command::Options {
            group, hide_merged, ..
        } => {
            if hide_merged {
                driver.dispatch(Msg::HideMergedToggled(true));
            }
            if group.is_some() {
                driver.dispatch(Msg::GroupSelected(group));
            }
            let view = driver.view();
            if let Some(feedback @ Feedback::EditRejected(_)) = &view.feedback {
                println!("{}", render::render_feedback(feedback));
                return Ok(ExitCode::FAILURE);
            }
            print!("{}", render::render_options(&view.options));
            Ok(ExitCode::SUCCESS)
        }
        Command::Merge { groups, append, .. } => {
            let catalog = driver
                .state()
                .raw_catalog()
                .context("catalog not loaded")?;
            let parsed = parse_groups(driver.state().establishment().clone(), &groups, catalog)?;
            if append {
                for group in parsed.groups() {
                    driver.dispatch(Msg::CreateGroupClicked);
                    let Some(created) = driver.state().editing() else {
                        bail!("could not create a group");
                    };
                    driver.dispatch(Msg::MembersSet {
                        group: created,
                        labels: group.member_ids(),
                    });
                }
            } else {
                driver.dispatch(Msg::MergesReplaced(parsed));
            }
            save(driver, wait)
        }
        Command::Accept { indices, .. } => {
            for index in indices {
                driver.dispatch(Msg::SuggestionAccepted(index));
                if let Some(
                    feedback @ (Feedback::SuggestionRefused { .. } | Feedback::EditRejected(_)),
                ) = driver.state().feedback()
                {
                    println!("{}", render::render_feedback(feedback));
                    return Ok(ExitCode::FAILURE);
                }
            }
            save(driver, wait)
        }
        Command::Unmerge { group, .. } => {
            driver.dispatch(Msg::DeleteGroupClicked(group));
            if let Some(feedback @ Feedback::EditRejected(_)) = driver.state().feedback() {
                println!("{}", render::render_feedback(feedback));
                return Ok(ExitCode::FAILURE);
            }
            save(driver, wait)
        }
        Command::Reset { .. } => {
            driver.dispatch(Msg::ResetClicked);
            driver.settle(wait);
            postes_info!("Reset grouping for {}", driver.state().establishment());
            print!("{}", render::render_session(&driver.view()));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn save(driver: &mut SessionDriver, wait: std::time::Duration) -> anyhow::Result<ExitCode> {
    driver.dispatch(Msg::SaveClicked);
    if !driver.settle(wait) {
        bail!("backend did not answer within {}s", wait.as_secs());
    }
    let view = driver.view();
    print!("{}", render::render_session(&view));
    let failed = view.submission == SubmissionStatus::Failed
        || matches!(view.feedback, Some(Feedback::Conflict { .. }));
    Ok(if failed {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}
