use std::sync::Arc;

use shared::{catalog, domain::Language};
use thiserror::Error;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use uuid::Uuid;

use crate::session::Session;

#[derive(Debug, Error)]
pub enum LiteralError {
    #[error("failed to encode string literal: {0}")]
    Encode(serde_json::Error),
    #[error("malformed string literal: {0}")]
    Decode(serde_json::Error),
}

/// JSON string syntax is also valid Python string syntax.
pub fn quote_literal(text: &str) -> Result<String, LiteralError> {
    serde_json::to_string(text).map_err(LiteralError::Encode)
}

pub fn unquote_literal(literal: &str) -> Result<String, LiteralError> {
    serde_json::from_str(literal).map_err(LiteralError::Decode)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInputs {
    pub code: String,
    pub source_id: &'static str,
    pub target_id: &'static str,
    pub artifact: Option<String>,
}

impl RequestInputs {
    pub fn of(session: &Session, artifact: Option<&str>) -> Self {
        Self {
            code: session.committed_code.clone(),
            source_id: session.source_language.id,
            target_id: session.target_language.id,
            artifact: artifact.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub id: Uuid,
    pub code: String,
    pub source: &'static Language,
    pub target: &'static Language,
    pub artifact: Option<String>,
    pub output_location_id: String,
    script: String,
    config: String,
}

impl ExecutionRequest {
    pub fn script(&self) -> &str {
        &self.script
    }

    pub fn config_directive(&self) -> &str {
        &self.config
    }

    pub fn inputs(&self) -> RequestInputs {
        RequestInputs {
            code: self.code.clone(),
            source_id: self.source.id,
            target_id: self.target.id,
            artifact: self.artifact.clone(),
        }
    }
}

pub fn build_request(
    session: &Session,
    artifact: Option<&str>,
    output_location_id: &str,
) -> Result<ExecutionRequest, LiteralError> {
    let code = session.committed_code.clone();
    let source = session.source_language;
    let target = session.target_language;
    let script = render_script(&code, source, target, output_location_id)?;
    let config = format!("packages = [{}]", quote_literal(artifact.unwrap_or_default())?);

    Ok(ExecutionRequest {
        id: Uuid::new_v4(),
        code,
        source,
        target,
        artifact: artifact.map(str::to_string),
        output_location_id: output_location_id.to_string(),
        script,
        config,
    })
}

fn render_script(
    code: &str,
    source: &Language,
    target: &Language,
    output_location_id: &str,
) -> Result<String, LiteralError> {
    let canonical = quote_literal(catalog::CANONICAL_LANGUAGE_ID)?;
    let source_id = quote_literal(source.id)?;
    let source_code2 = quote_literal(source.code2)?;
    let target_id = quote_literal(target.id)?;
    let target_code2 = quote_literal(target.code2)?;
    let output_id = quote_literal(output_location_id)?;
    let code = quote_literal(code)?;

    Ok(format!(
        r#"from universalpython import run_module
from pyscript import document, display


def _lex(code, language, reverse):
    return run_module(
        mode="lex",
        code=code,
        args={{
            "translate": True,
            "dictionary": "",
            "source_language": language,
            "file": "",
            "reverse": reverse,
            "keep": False,
            "keep_only": False,
            "return": True,
        }},
    )


source_code = {code}

if {source_id} == {canonical}:
    canonical_code = source_code
else:
    canonical_code = _lex(source_code, {source_code2}, False)

print = display
try:
    exec(canonical_code)
except Exception as exc:
    display(f"[Runtime Error] {{exc}}")

if {target_id} == {canonical}:
    translated_code = canonical_code
else:
    translated_code = _lex(canonical_code, {target_code2}, True)

output_node = document.getElementById({output_id})
if output_node is not None:
    output_node.textContent = translated_code
"#
    ))
}

/// Fresh per request; writes from superseded runs go unobserved.
#[derive(Clone)]
pub struct OutputLocation {
    id: Arc<str>,
    generation: u64,
    text: Arc<watch::Sender<String>>,
}

impl OutputLocation {
    pub fn new(id: &str, generation: u64) -> Self {
        let (text, _) = watch::channel(String::new());
        Self {
            id: Arc::from(id),
            generation,
            text: Arc::new(text),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn write(&self, text: impl Into<String>) {
        let text = text.into();
        self.text.send_if_modified(|current| {
            if *current == text {
                return false;
            }
            *current = text;
            true
        });
    }

    pub fn append(&self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.text.send_modify(|current| current.push_str(chunk));
    }

    pub fn read(&self) -> String {
        self.text.borrow().clone()
    }
}

#[derive(Clone)]
pub struct DisplaySink {
    id: Arc<str>,
    lines: broadcast::Sender<String>,
}

impl DisplaySink {
    pub fn new(id: &str) -> Self {
        let (lines, _) = broadcast::channel(256);
        Self {
            id: Arc::from(id),
            lines,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn show(&self, line: impl Into<String>) {
        let _ = self.lines.send(line.into());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.lines.subscribe()
    }
}

#[derive(Clone)]
pub struct RuntimeSink {
    pub output: OutputLocation,
    pub display: DisplaySink,
}

pub struct OutputSubscription {
    generation: u64,
    task: JoinHandle<()>,
}

impl OutputSubscription {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn unsubscribe(self) {}
}

impl Drop for OutputSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Text already present is reported before this returns.
pub fn observe<F>(location: &OutputLocation, mut on_change: F) -> OutputSubscription
where
    F: FnMut(String) + Send + 'static,
{
    let mut rx = location.text.subscribe();
    let mut last_known = String::new();

    let initial = rx.borrow_and_update().clone();
    if !initial.is_empty() {
        last_known.clone_from(&initial);
        on_change(initial);
    }

    let task = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let latest = rx.borrow_and_update().clone();
            if latest != last_known {
                last_known.clone_from(&latest);
                on_change(latest);
            }
        }
    });

    OutputSubscription {
        generation: location.generation,
        task,
    }
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;
