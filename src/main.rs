use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voice_agent::agent::{EnterPrompt, NoPause, ScriptedQueries};
use voice_agent::config::CaptureConfig;
use voice_agent::voice::{AudioCapture, Listener, SpeechDetector, calculate_energy};
use voice_agent::{CommandLoop, Config, Console, LlmClient, LoopPolicy, Overrides};

/// Voice Agent - speak to a local Ollama model
#[derive(Parser)]
#[command(name = "voice-agent", version, about)]
struct Cli {
    /// Ollama API base address (overrides `OLLAMA_BASE_URL`)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Ollama model (overrides `OLLAMA_MODEL`)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Send literal queries to Ollama without using the microphone
    Test {
        /// Queries to send (defaults to a built-in set of three)
        queries: Vec<String>,
    },
    /// Test microphone input and calibration
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "warn,voice_agent=info",
        2 => "info,voice_agent=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to load .env"),
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            let mut console = Console::stdout();
            match e.downcast_ref::<voice_agent::Error>() {
                Some(err) => console.report(err),
                None => console.line(format_args!("❌ Произошла ошибка: {e:#}")),
            }
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let overrides = Overrides {
        base_url: cli.base_url,
        model: cli.model,
    };

    match cli.command {
        None => run_voice(&overrides).await,
        Some(Command::Test { queries }) => run_diagnostic(&overrides, queries).await,
        Some(Command::TestMic { duration }) => test_mic(duration).await,
    }
}

/// Interactive voice session
#[allow(clippy::future_not_send)]
async fn run_voice(overrides: &Overrides) -> anyhow::Result<()> {
    let config = Config::load(overrides)?;
    let mut console = Console::stdout();

    console.rule('=');
    console.line("🎙️  ГОЛОСОВОЙ АГЕНТ (Speech → Ollama → Text)");
    console.rule('=');
    print_config(&mut console, &config);
    console.line("\n📝 Инструкция:");
    console.line("1. Скажите команду в микрофон");
    console.line("2. Агент распознает речь и отправит в Ollama");
    console.line("3. Получите текстовый ответ");
    console.line("\nДля выхода скажите 'выход' или нажмите Ctrl+C");
    console.rule('=');

    tracing::info!(
        base_url = %config.llm.base_url,
        model = %config.llm.model,
        "starting voice agent"
    );

    // Fail before touching the microphone if Ollama is down
    let llm = LlmClient::connect(config.llm.clone()).await?;

    let listener = Listener::new(&config)?;
    let mut agent = CommandLoop::new(
        listener,
        llm,
        EnterPrompt::spawn(),
        LoopPolicy::voice(),
        console,
    );

    agent.run_until(shutdown_signal()).await;
    Ok(())
}

/// Literal queries, no microphone, no prompts
#[allow(clippy::future_not_send)]
async fn run_diagnostic(overrides: &Overrides, queries: Vec<String>) -> anyhow::Result<()> {
    let config = Config::load(overrides)?;
    let mut console = Console::stdout().with_response_bodies(true);

    console.rule('=');
    console.line("🧪 ТЕСТИРОВАНИЕ ГОЛОСОВОГО АГЕНТА (только Ollama, без речи)");
    console.rule('=');
    print_config(&mut console, &config);

    let source = if queries.is_empty() {
        ScriptedQueries::default()
    } else {
        ScriptedQueries::new(queries)
    };

    let llm = LlmClient::new(config.llm)?;
    let mut agent = CommandLoop::new(source, llm, NoPause, LoopPolicy::diagnostic(), console);

    agent.run_until(shutdown_signal()).await;
    Ok(())
}

fn print_config(console: &mut Console, config: &Config) {
    console.line("\n📋 Конфигурация:");
    console.line(format_args!("  Ollama URL: {}", config.llm.base_url));
    console.line(format_args!("  Модель: {}", config.llm.model));
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Stay quiet for the first half second (calibration), then speak!\n");

    let capture = AudioCapture::new()?;
    let session = capture.open()?;

    let sample_rate = session.sample_rate();
    println!("Sample rate: {sample_rate} Hz");

    let timing = CaptureConfig::default();
    tokio::time::sleep(timing.calibration + timing.poll_interval).await;
    let mut detector = SpeechDetector::new(&timing, sample_rate);
    detector.process(&session.take_buffer());
    let threshold = detector.threshold();
    println!("Speech threshold: {threshold:.4}");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = session.take_buffer();
        let energy = calculate_energy(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);
        let marker = if energy > threshold { "speech" } else { "quiet" };

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}] {}",
            i + 1,
            energy,
            peak,
            meter,
            marker
        );
    }

    drop(session);

    println!("\n---");
    println!("If lines showed \"speech\" while you talked, voice mode will hear you.");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");
    println!("  4. Try: pavucontrol (to check levels)");

    Ok(())
}
