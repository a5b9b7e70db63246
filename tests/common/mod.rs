//! Shared test utilities

#![allow(dead_code)]

use std::io::Write;
use std::sync::{Arc, Mutex};

use voice_agent::config::LlmConfig;
use voice_agent::{Console, LlmClient};
use wiremock::{MockServer, ResponseTemplate};

/// Model name used by stub-backed clients
pub const TEST_MODEL: &str = "llama3.2";

/// Console sink whose contents can be read back
#[derive(Clone, Default)]
pub struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    /// Console writing into this buffer
    pub fn console(&self) -> Console {
        Console::new(self.clone())
    }

    /// Everything written so far
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().expect("output lock").clone()).expect("utf-8 output")
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("output lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Ollama-style config pointing at a stub server
pub fn llm_config(server: &MockServer) -> LlmConfig {
    LlmConfig::new(format!("{}/api", server.uri()), TEST_MODEL)
}

/// Client for a stub server, without the availability probe
pub fn llm_client(server: &MockServer) -> LlmClient {
    LlmClient::new(llm_config(server)).expect("failed to build client")
}

/// 200 response carrying `message.content`
pub fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "model": TEST_MODEL,
        "message": {"role": "assistant", "content": content},
        "done": true
    }))
}

/// Base address of a local port nothing listens on
pub fn closed_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}/api")
}
