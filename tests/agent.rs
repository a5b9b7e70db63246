//! Command loop integration tests
//!
//! Drives the loop with scripted sources and a stub Ollama endpoint

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use voice_agent::agent::{Acquired, NoPause, Pause, ScriptedQueries, UtteranceSource};
use voice_agent::{CommandLoop, Console, EndReason, Error, LoopPolicy, LoopState, Utterance};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{SharedOutput, chat_reply, llm_client};

/// Pause that counts how often the loop waited
#[derive(Clone, Default)]
struct CountingPause(Rc<Cell<usize>>);

impl CountingPause {
    fn count(&self) -> usize {
        self.0.get()
    }
}

#[async_trait(?Send)]
impl Pause for CountingPause {
    async fn wait(&mut self, _console: &mut Console) -> voice_agent::Result<bool> {
        self.0.set(self.0.get() + 1);
        Ok(true)
    }
}

/// Voice-like source replaying canned acquisitions
struct CannedSource {
    turns: VecDeque<Acquired>,
    transcripts: VecDeque<Option<&'static str>>,
}

impl CannedSource {
    fn new(turns: Vec<Acquired>) -> Self {
        Self {
            turns: turns.into(),
            transcripts: VecDeque::new(),
        }
    }

    fn with_transcripts(mut self, transcripts: Vec<Option<&'static str>>) -> Self {
        self.transcripts = transcripts.into();
        self
    }
}

#[async_trait(?Send)]
impl UtteranceSource for CannedSource {
    async fn acquire(&mut self, _console: &mut Console) -> Acquired {
        self.turns.pop_front().unwrap_or(Acquired::Exhausted)
    }

    async fn transcribe(&mut self, _audio: Vec<u8>, _console: &mut Console) -> Option<Utterance> {
        self.transcripts.pop_front().flatten().map(Utterance::from)
    }
}

/// Source that never produces input (someone thinking in silence)
struct SilentSource;

#[async_trait(?Send)]
impl UtteranceSource for SilentSource {
    async fn acquire(&mut self, _console: &mut Console) -> Acquired {
        std::future::pending().await
    }
}

/// Microphone whose every recording attempt fails the same way
struct BrokenMic {
    error: fn() -> Error,
    attempts: Rc<Cell<usize>>,
}

impl BrokenMic {
    fn new(error: fn() -> Error) -> Self {
        Self {
            error,
            attempts: Rc::default(),
        }
    }
}

#[async_trait(?Send)]
impl UtteranceSource for BrokenMic {
    async fn acquire(&mut self, console: &mut Console) -> Acquired {
        self.attempts.set(self.attempts.get() + 1);
        if self.attempts.get() > 3 {
            return Acquired::Exhausted;
        }
        Acquired::from_recording(Err((self.error)()), console)
    }
}

fn text(s: &str) -> Acquired {
    Acquired::Text(Utterance::new(s))
}

async fn mount_chat(server: &MockServer, template: ResponseTemplate, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(template)
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_diagnostic_single_query_prints_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{"role": "user", "content": "посчитай два плюс два"}]
        })))
        .respond_with(chat_reply("4"))
        .expect(1)
        .mount(&server)
        .await;

    let out = SharedOutput::default();
    let mut agent = CommandLoop::new(
        ScriptedQueries::new(["посчитай два плюс два"]),
        llm_client(&server),
        NoPause,
        LoopPolicy::diagnostic(),
        out.console().with_response_bodies(true),
    );

    let summary = agent.run().await;

    assert_eq!(summary.end, EndReason::Exhausted);
    assert_eq!(summary.replies, 1);
    let printed = out.text();
    assert!(printed.contains("📝 Запрос: посчитай два плюс два"));
    assert!(printed.contains("\n✅ Ответ LLM:\n4\n"));
}

#[tokio::test]
async fn test_diagnostic_three_queries_then_exit() {
    let server = MockServer::start().await;
    mount_chat(&server, chat_reply("готово"), 3).await;

    let out = SharedOutput::default();
    let mut agent = CommandLoop::new(
        ScriptedQueries::default(),
        llm_client(&server),
        NoPause,
        LoopPolicy::diagnostic(),
        out.console(),
    );

    let summary = agent.run().await;

    assert_eq!(summary.iterations, 3);
    assert_eq!(summary.replies, 3);
    assert_eq!(summary.end, EndReason::Exhausted);
    assert_eq!(agent.state(), LoopState::Terminated);

    let printed = out.text();
    assert_eq!(printed.matches("✅ Ответ LLM:").count(), 3);
    assert!(printed.contains("📌 Тест 1/3"));
    assert!(printed.contains("📌 Тест 3/3"));
    assert!(!printed.contains("Нажмите Enter"));
}

#[tokio::test]
async fn test_diagnostic_ignores_exit_words_and_shows_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{"role": "user", "content": "первый"}]
        })))
        .respond_with(chat_reply("exit"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{"role": "user", "content": "второй"}]
        })))
        .respond_with(ResponseTemplate::new(404).set_body_string("model 'llama3.2' not found"))
        .mount(&server)
        .await;

    let out = SharedOutput::default();
    let mut agent = CommandLoop::new(
        ScriptedQueries::new(["первый", "второй"]),
        llm_client(&server),
        NoPause,
        LoopPolicy::diagnostic(),
        out.console().with_response_bodies(true),
    );

    let summary = agent.run().await;

    assert_eq!(summary.end, EndReason::Exhausted);
    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.replies, 1);
    let printed = out.text();
    assert!(printed.contains("❌ Ошибка Ollama API: 404"));
    assert!(printed.contains("   Ответ: model 'llama3.2' not found"));
}

#[tokio::test]
async fn test_voice_exit_word_terminates_without_pause() {
    let server = MockServer::start().await;
    mount_chat(&server, chat_reply("Хорошо, ВЫХОД."), 1).await;

    let pause = CountingPause::default();
    let out = SharedOutput::default();
    let mut agent = CommandLoop::new(
        CannedSource::new(vec![text("закончим"), text("не дойдёт")]),
        llm_client(&server),
        pause.clone(),
        LoopPolicy::voice(),
        out.console(),
    );

    let summary = agent.run().await;

    assert_eq!(summary.end, EndReason::ExitWord);
    assert_eq!(summary.replies, 1);
    assert_eq!(pause.count(), 0);
    assert!(out.text().contains("👋 До свидания!"));
}

#[tokio::test]
async fn test_voice_reply_waits_for_confirmation() {
    let server = MockServer::start().await;
    mount_chat(&server, chat_reply("Два плюс два равно четыре"), 2).await;

    let pause = CountingPause::default();
    let mut agent = CommandLoop::new(
        CannedSource::new(vec![text("посчитай"), text("ещё раз")]),
        llm_client(&server),
        pause.clone(),
        LoopPolicy::voice(),
        SharedOutput::default().console(),
    );

    let summary = agent.run().await;

    assert_eq!(summary.replies, 2);
    assert_eq!(pause.count(), 2);
}

#[tokio::test]
async fn test_voice_no_input_skips_llm_and_pause() {
    let server = MockServer::start().await;
    mount_chat(&server, chat_reply("unused"), 0).await;

    let pause = CountingPause::default();
    let mut agent = CommandLoop::new(
        CannedSource::new(vec![Acquired::Nothing, Acquired::Audio(vec![0; 44])])
            .with_transcripts(vec![None]),
        llm_client(&server),
        pause.clone(),
        LoopPolicy::voice(),
        SharedOutput::default().console(),
    );

    let summary = agent.run().await;

    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.replies, 0);
    assert_eq!(pause.count(), 0);
}

#[tokio::test]
async fn test_voice_failed_reply_skips_pause() {
    let server = MockServer::start().await;
    mount_chat(&server, ResponseTemplate::new(500), 1).await;

    let pause = CountingPause::default();
    let out = SharedOutput::default();
    let mut agent = CommandLoop::new(
        CannedSource::new(vec![text("привет")]),
        llm_client(&server),
        pause.clone(),
        LoopPolicy::voice(),
        out.console(),
    );

    let summary = agent.run().await;

    assert_eq!(summary.replies, 0);
    assert_eq!(pause.count(), 0);
    let printed = out.text();
    assert!(printed.contains("❌ Ошибка Ollama API: 500"));
    assert!(!printed.contains("Ответ:"));
}

#[tokio::test]
async fn test_transcribed_audio_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{"role": "user", "content": "скажи анекдот"}],
            "stream": false
        })))
        .respond_with(chat_reply("Колобок повесился"))
        .expect(1)
        .mount(&server)
        .await;

    let pause = CountingPause::default();
    let mut agent = CommandLoop::new(
        CannedSource::new(vec![Acquired::Audio(vec![0; 44])])
            .with_transcripts(vec![Some("скажи анекдот")]),
        llm_client(&server),
        pause.clone(),
        LoopPolicy::voice(),
        SharedOutput::default().console(),
    );

    let summary = agent.run().await;

    assert_eq!(summary.replies, 1);
    assert_eq!(pause.count(), 1);
}

#[tokio::test]
async fn test_interrupt_terminates_listening() {
    let server = MockServer::start().await;
    mount_chat(&server, chat_reply("unused"), 0).await;

    let out = SharedOutput::default();
    let mut agent = CommandLoop::new(
        SilentSource,
        llm_client(&server),
        CountingPause::default(),
        LoopPolicy::voice(),
        out.console(),
    );

    let summary = agent
        .run_until(tokio::time::sleep(Duration::from_millis(50)))
        .await;

    assert_eq!(summary.end, EndReason::Interrupted);
    assert_eq!(summary.iterations, 0);
    assert_eq!(agent.state(), LoopState::Terminated);
    assert!(out.text().contains("👋 Работа завершена!"));
}

#[tokio::test]
async fn test_device_failure_ends_session() {
    let server = MockServer::start().await;
    mount_chat(&server, chat_reply("unused"), 0).await;

    let mic = BrokenMic::new(|| Error::Audio("device unplugged".to_string()));
    let attempts = Rc::clone(&mic.attempts);
    let out = SharedOutput::default();
    let mut agent = CommandLoop::new(
        mic,
        llm_client(&server),
        CountingPause::default(),
        LoopPolicy::voice(),
        out.console(),
    );

    let summary = agent
        .run_until(tokio::time::sleep(Duration::from_secs(5)))
        .await;

    assert_eq!(summary.end, EndReason::DeviceFailed);
    assert_eq!(summary.iterations, 1);
    assert_eq!(attempts.get(), 1);
    assert_eq!(agent.state(), LoopState::Terminated);
    assert_eq!(
        out.text().matches("❌ Ошибка микрофона: device unplugged").count(),
        1
    );
}

#[tokio::test]
async fn test_listen_timeout_prints_notice_and_skips_llm() {
    let server = MockServer::start().await;
    mount_chat(&server, chat_reply("unused"), 0).await;

    let pause = CountingPause::default();
    let out = SharedOutput::default();
    let mut agent = CommandLoop::new(
        BrokenMic::new(|| Error::NoSpeech { secs: 5.0 }),
        llm_client(&server),
        pause.clone(),
        LoopPolicy::voice(),
        out.console(),
    );

    let summary = agent.run().await;

    assert_eq!(summary.end, EndReason::Exhausted);
    assert_eq!(summary.iterations, 3);
    assert_eq!(summary.replies, 0);
    assert_eq!(pause.count(), 0);

    let printed = out.text();
    assert_eq!(printed.matches("❌ Тайм-аут: не услышал команду").count(), 3);
    assert!(!printed.contains("Отправляю запрос"));
}
