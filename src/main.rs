use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mentor_gateway::auth::AuthSession;
use mentor_gateway::sync::SyncStatus;
use mentor_gateway::voice::{
    AudioCapture, AudioPlayback, GeminiLive, LiveConfig, MentorAudioOut, MentorSession,
    OUTPUT_SAMPLE_RATE,
};
use mentor_gateway::{
    db, gen, Config, DocumentStoreClient, GenAiClient, IdentityClient, QuestionCache, Reconciler,
};

/// Mentor - interview-prep assistant with a live voice mentor
#[derive(Parser)]
#[command(name = "mentor", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account; a verification email is sent before first login
    Signup {
        /// Email address
        email: String,
        /// Display name
        #[arg(short, long)]
        name: String,
    },
    /// Sign in with email/password or a Google id token
    Login {
        /// Email address
        email: Option<String>,
        /// Sign in with a Google OAuth id token instead of a password
        #[arg(long)]
        google_id_token: Option<String>,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Reconcile with the remote store and list the question pool
    Sync {
        /// Only show questions in this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show the expert answer for a question, generating it if needed
    Ask {
        /// Question id
        id: String,
        /// Play the answer as synthesized speech
        #[arg(long)]
        speak: bool,
        /// Save the synthesized speech to a WAV file
        #[arg(long)]
        save: Option<std::path::PathBuf>,
    },
    /// Add a custom question
    Add {
        /// Question text
        text: String,
    },
    /// Delete a custom question (asks for confirmation)
    Delete {
        /// Question id
        id: String,
    },
    /// Start a live voice mentor session (Ctrl-C to end)
    Mentor,
    /// Test speaker output
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,mentor_gateway=info",
        1 => "info,mentor_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send, clippy::too_many_lines)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;

    match cli.command {
        Command::Signup { email, name } => {
            let password = dialoguer::Password::new()
                .with_prompt("Password")
                .with_confirmation("Confirm password", "Passwords don't match")
                .interact()?;

            let identity = IdentityClient::new(&config.identity.base_url, &config.identity.api_key);
            identity.sign_up(&email, &password, &name).await?;

            println!("Account created. We sent a verification email to {email}.");
            println!("Verify it, then run: mentor login {email}");
        }

        Command::Login {
            email,
            google_id_token,
        } => {
            let identity = IdentityClient::new(&config.identity.base_url, &config.identity.api_key);

            let profile = if let Some(token) = google_id_token {
                identity.sign_in_with_google(&token).await?
            } else {
                let email = email
                    .ok_or_else(|| anyhow::anyhow!("email is required for password login"))?;
                let password = dialoguer::Password::new().with_prompt("Password").interact()?;
                identity.sign_in(&email, &password).await?
            };

            let session = identity
                .session()
                .ok_or_else(|| anyhow::anyhow!("sign-in produced no session"))?;
            save_session(&config, &session)?;

            let greeting = profile
                .display_name
                .or(profile.email)
                .unwrap_or_else(|| profile.uid.clone());
            println!("Signed in as {greeting}. Ready to master Angular?");
        }

        Command::Logout => {
            let path = session_path(&config);
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
            println!("Signed out.");
        }

        Command::Sync { category } => {
            let (reconciler, session) = open_reconciler(&config)?;
            let outcome = reconciler.sync(&session.profile.uid).await?;

            if outcome.status != SyncStatus::Clean {
                println!("[{}]", outcome.status);
            }

            for question in outcome
                .questions
                .iter()
                .filter(|q| category.as_deref().map_or(true, |c| q.category.as_deref() == Some(c)))
            {
                let marker = if question.cached_answer.is_some() { "*" } else { " " };
                let category = question.category.as_deref().unwrap_or("-");
                println!("{marker} [{:>13}] {:<6} {}", category, question.id, question.text);
            }
        }

        Command::Ask { id, speak, save } => {
            let (reconciler, session) = open_reconciler(&config)?;
            let uid = &session.profile.uid;

            let outcome = reconciler.sync(uid).await?;
            let question = outcome
                .questions
                .iter()
                .find(|q| q.id == id)
                .ok_or_else(|| anyhow::anyhow!("no question with id {id}"))?;

            let answer = if let Some(cached) = &question.cached_answer {
                cached.clone()
            } else {
                println!("Consulting expert architect...");
                let genai = genai_client(&config)?;
                let answer = match genai.generate_expert_answer(&question.text).await {
                    Ok(answer) => answer,
                    Err(e) => {
                        tracing::warn!(error = %e, "answer generation failed");
                        gen::ANSWER_UNAVAILABLE.to_string()
                    }
                };
                reconciler.record_answer(uid, &id, &answer).await?;
                answer
            };

            println!("\n{}\n", question.text);
            println!("{answer}");

            if speak || save.is_some() {
                let genai = genai_client(&config)?;
                println!("\nGenerating audio...");
                // The answer is already on screen; a synthesis failure only
                // costs the audio
                match genai.generate_tts(&answer).await {
                    Ok(pcm) => {
                        let samples = mentor_gateway::voice::pcm16_to_samples(&pcm);

                        if let Some(path) = save {
                            let wav =
                                mentor_gateway::voice::samples_to_wav(&samples, OUTPUT_SAMPLE_RATE)?;
                            std::fs::write(&path, wav)?;
                            println!("Saved {}", path.display());
                        }

                        if speak {
                            let mut playback = AudioPlayback::new()?;
                            playback.play_frame(&samples);
                            playback.drain_blocking();
                            playback.teardown();
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "speech synthesis failed");
                        println!("Audio generation failed; the answer above is still saved.");
                    }
                }
            }
        }

        Command::Add { text } => {
            let (reconciler, session) = open_reconciler(&config)?;
            let question = reconciler.add_question(&session.profile.uid, &text).await?;
            println!("Added question {} in category Custom.", question.id);
        }

        Command::Delete { id } => {
            let (reconciler, session) = open_reconciler(&config)?;

            let confirmed = dialoguer::Confirm::new()
                .with_prompt(format!("Delete question {id}? This cannot be undone"))
                .default(false)
                .interact()?;
            if !confirmed {
                println!("Cancelled.");
                return Ok(());
            }

            reconciler.delete_question(&session.profile.uid, &id).await?;
            println!("Deleted {id}.");
        }

        Command::Mentor => run_mentor(&config).await?,

        Command::TestSpeaker => test_speaker()?,
    }

    Ok(())
}

/// Live mentor session: microphone in, mentor audio out, until Ctrl-C
#[allow(clippy::future_not_send)]
async fn run_mentor(config: &Config) -> anyhow::Result<()> {
    // Session must be valid before opening the microphone
    let _ = load_session(config)?;

    println!("Connecting to mentor...");

    let live_config = LiveConfig::mentor(
        &config.genai.live_url,
        &config.genai.live_model,
        &config.genai.live_voice,
    );

    let (frames_tx, mut frames_rx) = tokio::sync::mpsc::channel(32);
    let mut capture = AudioCapture::new()?;

    let transport = GeminiLive::connect(live_config).await?;
    let playback = AudioPlayback::new()?;

    let mut session = MentorSession::new(transport, playback)
        .with_close_callback(|| println!("\nMentor session ended."));

    // Microphone failure aborts the whole session
    if let Err(e) = capture.start(frames_tx) {
        session.abort_media(&e).await;
        return Err(e.into());
    }

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(()).await;
    });

    println!("Mock interview in progress. Talk freely! (Ctrl-C to end)");
    let result = session.run(&mut frames_rx, &mut shutdown_rx).await;
    capture.stop();

    result?;
    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let frequency = 440.0_f32;
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..OUTPUT_SAMPLE_RATE * 2)
        .map(|i| {
            let t = i as f32 / OUTPUT_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    let mut playback = AudioPlayback::new()?;
    playback.play_frame(&samples);
    playback.drain_blocking();
    playback.teardown();

    println!("If you heard the tone, your speakers are working!");
    Ok(())
}

fn session_path(config: &Config) -> std::path::PathBuf {
    config.data_dir.join("session.json")
}

fn save_session(config: &Config, session: &AuthSession) -> anyhow::Result<()> {
    let path = session_path(config);
    std::fs::write(&path, serde_json::to_vec_pretty(session)?)?;
    Ok(())
}

fn load_session(config: &Config) -> anyhow::Result<AuthSession> {
    let path = session_path(config);
    if !path.exists() {
        anyhow::bail!("not signed in; run: mentor login <email>");
    }
    let contents = std::fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn open_reconciler(config: &Config) -> anyhow::Result<(Reconciler, AuthSession)> {
    let session = load_session(config)?;

    let pool = db::init(config.db_path())?;
    let cache = QuestionCache::new(pool);
    let remote = DocumentStoreClient::new(&config.store.base_url)
        .with_auth_token(session.id_token.clone());

    Ok((Reconciler::new(cache, Arc::new(remote)), session))
}

fn genai_client(config: &Config) -> anyhow::Result<GenAiClient> {
    Ok(GenAiClient::new(
        &config.genai.base_url,
        &config.genai.api_key,
        &config.genai.text_model,
        &config.genai.tts_model,
        &config.genai.tts_voice,
    )?)
}
