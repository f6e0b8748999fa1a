use std::time::Instant;

use clap::Subcommand;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use standcue_core::storage::profiles::profile_spec;
use standcue_core::storage::NewSessionRecord;
use standcue_core::{
    AppConfig, Event, Profile, SessionConfig, SessionMachine, SessionState, SettingsProvider,
    SettingsStore, SoundPlayer,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::resolve_profile;
use crate::player;

type Machine = SessionMachine<Box<dyn SoundPlayer>>;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a session in the foreground.
    ///
    /// Enter (or `a`) acknowledges a prompt, `s` prints the current state,
    /// `q` or end of input stops the session.
    Run {
        /// Profile to use (defaults to the configured one)
        #[arg(long)]
        profile: Option<String>,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
        /// Seed interval and cue picks for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
        /// Play nothing, regardless of the configured backend
        #[arg(long)]
        silent: bool,
    },
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Run {
            profile,
            json,
            seed,
            silent,
        } => {
            let app = AppConfig::load()?;
            let profile = resolve_profile(profile.as_deref(), &app)?;
            let store = SettingsStore::open()?;
            let config = store.get(profile);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()?;
            let stopped = runtime.block_on(drive(&app, profile, config, seed, silent, json));
            // A pending stdin read would block a normal shutdown.
            runtime.shutdown_background();
            let stopped = stopped?;

            if let Some(record) = stopped {
                let id = store.database().record_session(&record)?;
                info!(id, completed = record.completed, "session recorded");
            }
        }
    }
    Ok(())
}

async fn drive(
    app: &AppConfig,
    profile: Profile,
    config: SessionConfig,
    seed: Option<u64>,
    silent: bool,
    json: bool,
) -> Result<Option<NewSessionRecord>, Box<dyn std::error::Error>> {
    let rng = match seed {
        Some(seed) => Pcg64::seed_from_u64(seed),
        None => Pcg64::from_entropy(),
    };
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let player = player::build(app, silent, done_tx);
    let mut machine: Machine = SessionMachine::with_rng(player, profile_spec(profile).cues, rng);

    info!(%profile, ?config, "starting session");
    machine.start(config, Instant::now())?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut record = None;
    loop {
        for event in machine.drain_events() {
            print_event(&event, json)?;
            if let Event::SessionStopped {
                completed,
                prompts_acknowledged,
                started_at,
                at,
            } = event
            {
                record = Some(NewSessionRecord {
                    profile,
                    started_at,
                    ended_at: at,
                    prompts_acknowledged,
                    completed,
                });
            }
        }
        if machine.state() == SessionState::Idle {
            break;
        }

        tokio::select! {
            () = wait_until(machine.next_deadline()) => machine.advance(Instant::now()),
            Some((ticket, result)) = done_rx.recv() => {
                machine.playback_finished(ticket, result, Instant::now());
            }
            line = lines.next_line() => match line? {
                Some(line) => handle_input(&mut machine, line.trim(), json)?,
                None => {
                    debug!("input closed");
                    machine.stop();
                }
            },
        }
    }
    Ok(record)
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

fn handle_input(
    machine: &mut Machine,
    input: &str,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match input {
        "" | "a" => {
            if !machine.acknowledge(Instant::now()) && !json {
                println!("nothing to acknowledge");
            }
        }
        "s" => print_event(&machine.snapshot(), json)?,
        "q" => machine.stop(),
        other => warn!(input = other, "unrecognised input (Enter/a, s, q)"),
    }
    Ok(())
}

fn print_event(event: &Event, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else if let Some(line) = describe(event) {
        println!("{line}");
    }
    Ok(())
}

fn describe(event: &Event) -> Option<String> {
    let line = match event {
        Event::SessionStarted {
            session_secs,
            first_interval_secs,
            ..
        } => format!(
            "Session started: {} min, first prompt in {first_interval_secs}s",
            session_secs / 60
        ),
        Event::PromptDue {
            prompt,
            final_prompt: true,
            ..
        } => format!("Prompt #{prompt} (final): stand up!"),
        Event::PromptDue { prompt, .. } => format!("Prompt #{prompt}: stand up!"),
        Event::SessionTimeElapsed { .. } => "Session time is up".to_string(),
        Event::CueStarted { .. } => return None,
        Event::CueSkipped { stage, reason, .. } => format!("  cue skipped ({stage:?}): {reason}"),
        Event::AwaitingAcknowledgement { .. } => "Press Enter to acknowledge".to_string(),
        Event::Acknowledged {
            next_interval_secs: Some(secs),
            ..
        } => format!("Acknowledged, next prompt in {secs}s"),
        Event::Acknowledged { .. } => "Acknowledged".to_string(),
        Event::SessionFinished {
            prompts_acknowledged,
            ..
        } => format!("Session finished: {prompts_acknowledged} prompts acknowledged"),
        Event::SessionStopped {
            completed: false,
            prompts_acknowledged,
            ..
        } => format!("Session stopped after {prompts_acknowledged} prompts"),
        Event::SessionStopped { .. } => return None,
        Event::StateSnapshot {
            state,
            session_secs_remaining,
            next_prompt_secs_remaining,
            cue_stage,
            ..
        } => format!(
            "{state:?}: {session_secs_remaining}s left in session, next prompt in \
             {next_prompt_secs_remaining}s, cue stage {cue_stage:?}"
        ),
    };
    Some(line)
}
