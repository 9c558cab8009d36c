//! Command implementations.
//!
//! Each command writes its results to `out`. Interrupts (Ctrl-C in the
//! binary) are passed in as futures so that the commands can be driven from
//! tests.

use std::future::Future;
use std::io::Write;

use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::api::RagApiClient;
use crate::error::{RagResult, StreamError};
use crate::models::{delta_text, MessageRole};
use crate::sse::{SessionOutcome, StreamSession};
use crate::store::ChatStore;
use crate::traits::{HttpClient, StreamHandler};
use crate::validation::{article_title_from_url, is_wikipedia_article_url};

pub const QUIT_COMMAND: &str = "/quit";
pub const RESET_COMMAND: &str = "/reset";

/// `ragchat build <url>`
pub async fn build<C, W>(api: &RagApiClient<C>, url: &str, out: &mut W) -> Result<()>
where
    C: HttpClient,
    W: Write,
{
    let response = api.build_rag(url).await?;
    writeln!(out, "session: {}", response.session_id)?;
    writeln!(out, "status:  {}", response.status)?;
    if is_wikipedia_article_url(url) {
        writeln!(out, "article: {}", article_title_from_url(url))?;
    }
    Ok(())
}

/// `ragchat status <session-id>`
pub async fn status<C, W>(api: &RagApiClient<C>, session_id: &str, out: &mut W) -> Result<()>
where
    C: HttpClient,
    W: Write,
{
    let status = api.check_status(session_id).await?;
    writeln!(out, "status: {}", status.status)?;
    if let Some(message) = status.error_message() {
        writeln!(out, "error:  {}", message)?;
    }
    Ok(())
}

/// `ragchat ask <session-id> <query...>`
pub async fn ask<C, W>(
    api: &RagApiClient<C>,
    session_id: &str,
    query: &str,
    out: &mut W,
) -> Result<()>
where
    C: HttpClient,
    W: Write,
{
    let answer = api.chat_query(session_id, query).await?;
    writeln!(out, "{}", answer.response)?;
    Ok(())
}

/// `ragchat stream <session-id> <query...>`
///
/// Tokens are written as they arrive. When `interrupt` resolves the stream is
/// aborted and the command returns normally.
pub async fn stream<C, W, I>(
    api: &RagApiClient<C>,
    session_id: &str,
    query: &str,
    out: &mut W,
    interrupt: I,
) -> Result<()>
where
    C: HttpClient,
    W: Write + Send,
    I: Future<Output = ()>,
{
    let session = StreamSession::new();
    let handle = session.handle();
    let mut printer = Printer::new(out);

    let outcome = {
        let stream = api.stream_chat_session(session, session_id, query, &mut printer);
        let abort = async move {
            interrupt.await;
            handle.abort();
            std::future::pending::<RagResult<SessionOutcome>>().await
        };
        let result = tokio::select! {
            biased;
            outcome = stream => outcome,
            outcome = abort => outcome,
        };
        result?
    };

    match outcome {
        SessionOutcome::Completed => Ok(()),
        SessionOutcome::Aborted => {
            writeln!(printer.out)?;
            writeln!(printer.out, "[aborted]")?;
            Ok(())
        }
        SessionOutcome::Errored => match printer.error.take() {
            Some(err) => Err(err.into()),
            None => Err(eyre!("stream failed")),
        },
    }
}

/// `ragchat history <session-id>`
pub async fn history<C, W>(api: &RagApiClient<C>, session_id: &str, out: &mut W) -> Result<()>
where
    C: HttpClient,
    W: Write,
{
    let messages = api.get_history(session_id).await?;
    if messages.is_empty() {
        writeln!(out, "(no messages)")?;
    }
    for message in messages {
        writeln!(out, "{}: {}", role_label(message.role), message.content)?;
    }
    Ok(())
}

/// `ragchat chat <url>`
///
/// Builds a session, waits until it is ready, then answers queries read from
/// `input` one line at a time. An interrupt while an answer streams aborts
/// that answer; an interrupt at the prompt ends the loop.
pub async fn chat<C, W, R, F, Fut>(
    store: &ChatStore<C>,
    url: &str,
    input: R,
    out: &mut W,
    mut interrupt: F,
) -> Result<()>
where
    C: HttpClient,
    W: Write + Send,
    R: AsyncBufRead + Unpin,
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let response = store.build_rag(url).await?;
    writeln!(out, "Building session {} ...", response.session_id)?;
    out.flush()?;
    store.wait_until_ready().await?;
    writeln!(
        out,
        "Ready. Ask a question ({} to exit, {} to clear).",
        QUIT_COMMAND, RESET_COMMAND
    )?;

    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;

        let line = tokio::select! {
            biased;
            line = lines.next_line() => line?,
            _ = interrupt() => None,
        };
        let Some(line) = line else {
            writeln!(out)?;
            break;
        };

        let query = line.trim();
        match query {
            "" => continue,
            QUIT_COMMAND => break,
            RESET_COMMAND => {
                store.clear_transcript();
                writeln!(out, "Transcript cleared.")?;
                continue;
            }
            _ => {}
        }

        let outcome = {
            let stream = store.stream_query_with(query, |token| {
                let _ = write!(out, "{}", token);
                let _ = out.flush();
            });
            let abort = async {
                interrupt().await;
                store.abort_stream();
                std::future::pending::<SessionOutcome>().await
            };
            tokio::select! {
                biased;
                outcome = stream => outcome,
                outcome = abort => outcome,
            }
        };

        writeln!(out)?;
        match outcome {
            SessionOutcome::Completed => {}
            SessionOutcome::Aborted => writeln!(out, "[aborted]")?,
            SessionOutcome::Errored => {
                if let Some(last) = store.snapshot().messages.last() {
                    writeln!(out, "{}", last.content)?;
                }
            }
        }
    }

    Ok(())
}

fn role_label(role: MessageRole) -> &'static str {
    match role {
        MessageRole::User => "you",
        MessageRole::Assistant => "assistant",
        MessageRole::System => "system",
    }
}

/// Writes text deltas as they arrive and keeps the stream error, if any.
struct Printer<'a, W: Write> {
    out: &'a mut W,
    error: Option<StreamError>,
}

impl<'a, W: Write> Printer<'a, W> {
    fn new(out: &'a mut W) -> Self {
        Self { out, error: None }
    }
}

impl<W: Write + Send> StreamHandler for Printer<'_, W> {
    fn on_message(&mut self, payload: Value) {
        if let Some(token) = delta_text(&payload) {
            let _ = write!(self.out, "{}", token);
            let _ = self.out.flush();
        }
    }

    fn on_error(&mut self, error: StreamError) {
        self.error = Some(error);
    }

    fn on_complete(&mut self) {
        let _ = writeln!(self.out);
    }
}
